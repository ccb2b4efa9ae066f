//! HTTP access to the remote execution API.

mod client;
pub mod download;
mod error;

pub use client::ExecutionClient;
pub use error::ApiError;

//! Application-level orchestration.
//!
//! This module owns the dashboard state and everything that changes it: run
//! start, list refreshes and record resolution, the auto-refresh timer, and
//! artifact downloads. UI/CLI layers talk to it through `UiCommand`s and read
//! published `Dashboard` snapshots.

mod controller;
mod download;
mod poller;
pub(crate) mod resolve;
mod state;

pub(crate) use controller::{run_controller, UiCommand};
pub(crate) use download::{download_artifact, DownloadOutcome, DownloadSettings};
pub(crate) use state::{Dashboard, Notice};

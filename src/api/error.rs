use reqwest::StatusCode;
use thiserror::Error;

/// Failures talking to the execution API.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("{endpoint} returned HTTP {status}")]
    Status {
        endpoint: &'static str,
        status: StatusCode,
    },

    #[error("malformed {endpoint} response: {detail}")]
    Malformed {
        endpoint: &'static str,
        detail: String,
    },

    #[error("no download URL found in response")]
    MissingDownloadUrl,

    #[error("resolved download target is not an http(s) URL: {0}")]
    InvalidDownloadUrl(String),

    #[error("invalid endpoint URL {url}: {detail}")]
    InvalidEndpoint { url: String, detail: String },
}

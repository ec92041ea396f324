//! Client error types.

use thiserror::Error;

/// Errors returned by the Proxmox API client.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Network or protocol failure talking to the cluster.
    #[error("http: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with a non-success status code.
    #[error("api returned {status}: {message}")]
    Status { status: u16, message: String },

    /// Login was rejected or the ticket response was unusable.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Response body could not be decoded.
    #[error("decode: {0}")]
    Decode(String),

    /// Response envelope carried no `data` where one was required.
    #[error("response for {0} carried no data")]
    MissingData(String),

    /// The configured host could not be turned into a URL.
    #[error("invalid url: {0}")]
    InvalidUrl(String),
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, ApiError>;

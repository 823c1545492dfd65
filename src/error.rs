//! Common error type and alias for the image generation pipeline.
//!
//! Construction-time problems surface as `Configuration` and abort before any
//! run begins. Everything else aborts only the current run. Best-effort
//! canvas operations (note create/update/delete) log and swallow their
//! failures instead of surfacing here.
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Missing or invalid key, endpoint, or deployment. Raised at construction.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Empty or otherwise unusable prompt.
    #[error("invalid prompt: {0}")]
    Validation(String),

    /// Provider call failed or returned a malformed/empty response.
    #[error("image generation failed: {0}")]
    Generation(String),

    /// Download endpoint answered with a non-success status.
    #[error("download failed with status {0}")]
    DownloadStatus(u16),

    /// Transport failure or partial write while fetching the image.
    #[error("download failed: {0}")]
    Download(String),

    /// Canvas widget creation failed.
    #[error("canvas upload failed: {0}")]
    Upload(String),

    /// The run's deadline expired during generation or download.
    #[error("cancelled: {0}")]
    Cancelled(String),

    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Fold a transport error into the right flavor: timeouts become
    /// `Cancelled`, everything else keeps the given constructor.
    pub(crate) fn from_reqwest(err: reqwest::Error, wrap: fn(String) -> Error) -> Error {
        if err.is_timeout() {
            Error::Cancelled(err.to_string())
        } else {
            wrap(err.to_string())
        }
    }
}

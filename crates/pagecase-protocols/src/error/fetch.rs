//! Page fetch errors.

use thiserror::Error;

/// Failure to obtain usable markup for a page. Always fatal to a run.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Page load timed out after {0} seconds")]
    Timeout(u64),

    #[error("Page returned HTTP {status}: {url}")]
    Status { url: String, status: u16 },

    #[error("No interactive elements found on {url}")]
    NoElements { url: String },
}

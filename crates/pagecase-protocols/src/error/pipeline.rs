//! Stage-level pipeline errors.

use thiserror::Error;

use super::{FetchError, GenerationError, ParseError};

/// Errors that abort a whole run (or reject it before it starts).
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Invalid run request: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("Run cancelled")]
    Cancelled,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_fetch_error() {
        let err: PipelineError = FetchError::Network("refused".to_string()).into();
        assert!(matches!(err, PipelineError::Fetch(_)));
        assert!(err.to_string().contains("refused"));
    }

    #[test]
    fn test_from_parse_error() {
        let err: PipelineError = ParseError::EmptyResult { discarded: 0 }.into();
        assert!(matches!(err, PipelineError::Parse(_)));
    }

    #[test]
    fn test_invalid_request_display() {
        let err = PipelineError::InvalidRequest("count out of range".to_string());
        assert!(err.to_string().contains("count out of range"));
    }
}

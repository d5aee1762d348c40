//! Text-generation service errors.

use std::fmt;

use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum GenerationError {
    #[error("Rate limited{}", retry_hint(.retry_after_seconds))]
    RateLimited { retry_after_seconds: Option<u64> },

    #[error("Timeout after {0} seconds")]
    Timeout(u64),

    /// The service reported a timeout itself (HTTP 408 or 504).
    #[error("Service timed out (HTTP {status})")]
    ServiceTimeout { status: u16 },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Upstream error{}: {message}", status_hint(.status))]
    Upstream { status: Option<u16>, message: String },
}

fn retry_hint(retry_after: &Option<u64>) -> String {
    match retry_after {
        Some(secs) => format!(": retry after {} seconds", secs),
        None => String::new(),
    }
}

fn status_hint(status: &Option<u16>) -> String {
    match status {
        Some(code) => format!(" ({})", code),
        None => String::new(),
    }
}

/// Coarse classification used by the retry policy and in run logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationErrorKind {
    RateLimited,
    Timeout,
    Transport,
    UpstreamError,
}

impl fmt::Display for GenerationErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::RateLimited => "rate_limited",
            Self::Timeout => "timeout",
            Self::Transport => "transport",
            Self::UpstreamError => "upstream_error",
        };
        f.write_str(name)
    }
}

impl GenerationError {
    pub fn kind(&self) -> GenerationErrorKind {
        match self {
            Self::RateLimited { .. } => GenerationErrorKind::RateLimited,
            Self::Timeout(_) | Self::ServiceTimeout { .. } => GenerationErrorKind::Timeout,
            Self::Transport(_) => GenerationErrorKind::Transport,
            Self::Upstream { .. } => GenerationErrorKind::UpstreamError,
        }
    }

    /// Upstream errors describe a malformed request and are never retried.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::Upstream { .. })
    }

    /// Classify a non-success HTTP response from the generation service.
    pub fn from_status(status: u16, body: String, retry_after_seconds: Option<u64>) -> Self {
        match status {
            429 => Self::RateLimited { retry_after_seconds },
            408 | 504 => Self::ServiceTimeout { status },
            500..=599 => Self::Transport(format!("HTTP {}: {}", status, body)),
            _ => Self::Upstream {
                status: Some(status),
                message: body,
            },
        }
    }
}

#[cfg(test)]
#[path = "generation_tests.rs"]
mod tests;

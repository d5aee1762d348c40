//! Response parsing errors.

use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum ParseError {
    #[error("No JSON array found in response")]
    NoArray,

    #[error("Malformed JSON array: {0}")]
    Malformed(String),

    #[error("No valid test cases in response ({discarded} candidates discarded)")]
    EmptyResult { discarded: usize },

    #[error("No plausible source code in response")]
    NoSource,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorKind {
    NoArray,
    Malformed,
    EmptyResult,
    NoSource,
}

impl ParseError {
    pub fn kind(&self) -> ParseErrorKind {
        match self {
            Self::NoArray => ParseErrorKind::NoArray,
            Self::Malformed(_) => ParseErrorKind::Malformed,
            Self::EmptyResult { .. } => ParseErrorKind::EmptyResult,
            Self::NoSource => ParseErrorKind::NoSource,
        }
    }
}

//! # pagecase Protocols
//!
//! Core protocol definitions for the pagecase generation pipeline.
//! Contains only data types, error types and collaborator traits - no implementations.
//!
//! ## Collaborator Traits
//!
//! - [`PageSource`] - Fetches raw page markup for a URL
//! - [`TextGenerator`] - Text-generation service (one completion per call)
//! - [`ExportSink`] - Persists the records of a finished run
//! - [`ProgressSink`] - Receives run-log entries as they are produced

pub mod error;
pub mod generator;
pub mod page;
pub mod sink;
pub mod types;

pub use error::{
    ExportError, FetchError, GenerationError, GenerationErrorKind, ParseError, ParseErrorKind,
    PipelineError,
};
pub use generator::{GenerationRequest, TextGenerator};
pub use page::PageSource;
pub use sink::{ExportRecords, ExportSink, ProgressSink};
pub use types::*;

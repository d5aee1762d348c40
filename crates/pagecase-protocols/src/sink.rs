//! Export and progress sinks.

use std::path::PathBuf;

use crate::error::ExportError;
use crate::types::{PageElement, PipelineRun, RunFailure, RunState, ScriptResult, TestCase};

/// Borrowed view of the records a run hands to an export sink.
#[derive(Debug, Clone, Copy)]
pub struct ExportRecords<'a> {
    pub url: &'a str,
    pub elements: &'a [PageElement],
    pub test_cases: &'a [TestCase],
    pub scripts: &'a [ScriptResult],
    pub state: RunState,
    pub failure: Option<&'a RunFailure>,
}

impl<'a> From<&'a PipelineRun> for ExportRecords<'a> {
    fn from(run: &'a PipelineRun) -> Self {
        Self {
            url: &run.url,
            elements: &run.elements,
            test_cases: &run.test_cases,
            scripts: &run.scripts,
            state: run.state,
            failure: run.failure.as_ref(),
        }
    }
}

/// Persists run records. Format-agnostic; returns where the records went.
pub trait ExportSink: Send + Sync {
    fn write(&self, records: &ExportRecords<'_>) -> Result<PathBuf, ExportError>;
}

/// Receives run-log entries incrementally.
pub trait ProgressSink: Send + Sync {
    fn on_entry(&self, entry: &str);
}

//! Run request and the transient run aggregate.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::{PageElement, ScriptResult, TestCase};
use crate::error::PipelineError;

/// Upper bound on test cases per run.
pub const MAX_TEST_CASES: u32 = 10;

/// A validated request to run the pipeline once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRequest {
    url: String,
    desired_count: u32,
}

impl RunRequest {
    /// Validate and build a request. The URL must be absolute http(s) and
    /// `desired_count` must lie in `1..=MAX_TEST_CASES`.
    pub fn new(url: impl Into<String>, desired_count: u32) -> Result<Self, PipelineError> {
        let url = url.into();
        let parsed = url::Url::parse(&url)
            .map_err(|e| PipelineError::InvalidRequest(format!("invalid URL '{}': {}", url, e)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(PipelineError::InvalidRequest(format!(
                "unsupported URL scheme '{}'",
                parsed.scheme()
            )));
        }
        if !(1..=MAX_TEST_CASES).contains(&desired_count) {
            return Err(PipelineError::InvalidRequest(format!(
                "desired test case count must be between 1 and {}, got {}",
                MAX_TEST_CASES, desired_count
            )));
        }
        Ok(Self { url, desired_count })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn desired_count(&self) -> u32 {
        self.desired_count
    }
}

/// Orchestrator state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Idle,
    Extracting,
    GeneratingCases,
    GeneratingScripts,
    Done,
    Failed,
}

/// Stage that aborted a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Extraction,
    TestCases,
    Scripts,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Extraction => "extraction",
            Self::TestCases => "test case generation",
            Self::Scripts => "script generation",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunFailure {
    pub stage: Stage,
    pub reason: String,
}

/// Everything one invocation produced, including partial results when a
/// stage aborted the run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineRun {
    pub url: String,
    pub elements: Vec<PageElement>,
    pub test_cases: Vec<TestCase>,
    pub scripts: Vec<ScriptResult>,
    pub log: Vec<String>,
    pub state: RunState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<RunFailure>,
}

impl PipelineRun {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            elements: Vec::new(),
            test_cases: Vec::new(),
            scripts: Vec::new(),
            log: Vec::new(),
            state: RunState::Idle,
            failure: None,
        }
    }

    pub fn append_log(&mut self, entry: impl Into<String>) {
        self.log.push(entry.into());
    }

    pub fn is_done(&self) -> bool {
        self.state == RunState::Done
    }

    /// Number of scripts with `ok` status.
    pub fn scripts_ok(&self) -> usize {
        self.scripts.iter().filter(|s| s.is_ok()).count()
    }
}

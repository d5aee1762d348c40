//! Generated test cases and their scripts.

use serde::{Deserialize, Serialize};

/// A natural-language test case. `id` is assigned by the pipeline, 1-based
/// and contiguous within a run; never taken from the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCase {
    pub id: u32,
    pub title: String,
    pub steps: Vec<String>,
    pub expected_result: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScriptStatus {
    Ok,
    GenerationFailed,
}

/// Script slot for one test case. On failure `script` carries a
/// human-readable diagnostic instead of source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptResult {
    pub test_case_id: u32,
    pub script: String,
    pub status: ScriptStatus,
}

impl ScriptResult {
    pub fn ok(test_case_id: u32, script: impl Into<String>) -> Self {
        Self {
            test_case_id,
            script: script.into(),
            status: ScriptStatus::Ok,
        }
    }

    pub fn failed(test_case_id: u32, diagnostic: impl Into<String>) -> Self {
        Self {
            test_case_id,
            script: diagnostic.into(),
            status: ScriptStatus::GenerationFailed,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == ScriptStatus::Ok
    }
}

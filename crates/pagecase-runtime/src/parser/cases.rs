//! Test-case reply validation.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};
use tracing::debug;

use pagecase_protocols::error::ParseError;
use pagecase_protocols::types::TestCase;

use super::json::locate_array;

const TITLE_KEYS: &[&str] = &["title", "test_scenario", "scenario", "name", "description"];
const STEPS_KEYS: &[&str] = &["steps", "steps_to_execute", "test_steps"];
const EXPECTED_KEYS: &[&str] = &[
    "expected_result",
    "expectedresult",
    "expected",
    "expected_outcome",
];

static STEP_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:\d+[.)]|[-*•])\s+").expect("step marker pattern is valid")
});

/// Validated test cases plus the candidates that were dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCases {
    pub cases: Vec<TestCase>,
    pub skipped: Vec<SkippedRecord>,
}

/// A candidate record the parser refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRecord {
    /// 1-based position in the model's array.
    pub index: usize,
    pub reason: String,
}

impl fmt::Display for SkippedRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "candidate #{}: {}", self.index, self.reason)
    }
}

enum RecordOutcome {
    Accepted(Candidate),
    Skipped(String),
}

struct Candidate {
    title: String,
    steps: Vec<String>,
    expected_result: String,
}

/// Parse a test-case reply.
///
/// At most `desired_count` records are kept; ids are assigned `1..=n` in
/// reply order, ignoring any id the model supplied.
pub fn parse_test_cases(raw: &str, desired_count: u32) -> Result<ParsedCases, ParseError> {
    let (_, items) = locate_array(raw)?;
    let limit = desired_count as usize;

    let mut cases: Vec<TestCase> = Vec::new();
    let mut skipped = Vec::new();

    for (i, item) in items.iter().enumerate() {
        let index = i + 1;
        match validate_record(item) {
            RecordOutcome::Accepted(_) if cases.len() >= limit => skipped.push(SkippedRecord {
                index,
                reason: format!("exceeds requested count of {}", desired_count),
            }),
            RecordOutcome::Accepted(candidate) => cases.push(TestCase {
                id: cases.len() as u32 + 1,
                title: candidate.title,
                steps: candidate.steps,
                expected_result: candidate.expected_result,
            }),
            RecordOutcome::Skipped(reason) => {
                debug!(index, %reason, "Discarding test case candidate");
                skipped.push(SkippedRecord { index, reason });
            }
        }
    }

    if cases.is_empty() {
        return Err(ParseError::EmptyResult {
            discarded: skipped.len(),
        });
    }

    Ok(ParsedCases { cases, skipped })
}

fn validate_record(item: &Value) -> RecordOutcome {
    let Some(record) = item.as_object() else {
        return RecordOutcome::Skipped("not an object".to_string());
    };

    let title = match text_field(record, TITLE_KEYS) {
        Ok(title) => title,
        Err(reason) => return RecordOutcome::Skipped(format!("title {}", reason)),
    };
    let expected_result = match text_field(record, EXPECTED_KEYS) {
        Ok(expected) => expected,
        Err(reason) => return RecordOutcome::Skipped(format!("expected_result {}", reason)),
    };
    let steps = match steps_field(record) {
        Ok(steps) => steps,
        Err(reason) => return RecordOutcome::Skipped(format!("steps {}", reason)),
    };

    RecordOutcome::Accepted(Candidate {
        title,
        steps,
        expected_result,
    })
}

/// Normalize a key for alias lookup: `"Steps to Execute"` -> `"steps_to_execute"`.
fn normalize_key(key: &str) -> String {
    key.trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect()
}

fn lookup<'a>(record: &'a Map<String, Value>, aliases: &[&str]) -> Option<&'a Value> {
    aliases.iter().find_map(|alias| {
        record
            .iter()
            .find(|(key, value)| normalize_key(key) == *alias && !value.is_null())
            .map(|(_, value)| value)
    })
}

fn text_field(record: &Map<String, Value>, aliases: &[&str]) -> Result<String, &'static str> {
    match lookup(record, aliases) {
        None => Err("is missing"),
        Some(Value::String(s)) if s.trim().is_empty() => Err("is empty"),
        Some(Value::String(s)) => Ok(s.trim().to_string()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        Some(_) => Err("is not text"),
    }
}

fn steps_field(record: &Map<String, Value>) -> Result<Vec<String>, &'static str> {
    let steps: Vec<String> = match lookup(record, STEPS_KEYS) {
        None => return Err("is missing"),
        Some(Value::String(s)) => s.lines().filter_map(clean_step).collect(),
        Some(Value::Array(items)) => {
            let mut steps = Vec::with_capacity(items.len());
            for item in items {
                let text = match item {
                    Value::String(s) => s.clone(),
                    Value::Number(n) => n.to_string(),
                    Value::Bool(b) => b.to_string(),
                    _ => return Err("contains a non-text entry"),
                };
                steps.extend(text.lines().filter_map(clean_step));
            }
            steps
        }
        Some(_) => return Err("is not a list"),
    };

    if steps.is_empty() {
        return Err("is empty");
    }
    Ok(steps)
}

/// Trim a step and strip a leading enumeration marker. Blank steps vanish.
fn clean_step(line: &str) -> Option<String> {
    let line = line.trim();
    let line = STEP_MARKER.replace(line, "");
    let line = line.trim();
    (!line.is_empty()).then(|| line.to_string())
}

#[cfg(test)]
#[path = "cases_tests.rs"]
mod tests;

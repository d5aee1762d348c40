//! Stage-specific prompt rendering.
//!
//! Prompts are pure functions of their context: no I/O, no clock, no
//! randomness. The same context always renders the same text.

use std::fmt;
use std::fmt::Write as _;

use tracing::warn;

use pagecase_protocols::types::{PageElement, TestCase};

/// Sampling temperature for the test-case stage.
pub const CASE_TEMPERATURE: f32 = 0.5;
/// Sampling temperature for the script stage.
pub const SCRIPT_TEMPERATURE: f32 = 0.3;

const CASE_SYSTEM: &str =
    "You are an expert QA engineer generating test cases from UI elements.";
const SCRIPT_SYSTEM: &str =
    "You are an expert QA automation engineer generating Python Selenium scripts.";

/// Generation stage a prompt belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptStage {
    TestCases,
    Script,
}

impl fmt::Display for PromptStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TestCases => f.write_str("test_cases"),
            Self::Script => f.write_str("script"),
        }
    }
}

/// Inputs for one prompt. `elements` is the already-serialized element list
/// (see [`serialize_elements`]).
#[derive(Debug, Clone, Copy)]
pub enum PromptContext<'a> {
    TestCases {
        url: &'a str,
        elements: &'a str,
        desired_count: u32,
    },
    Script {
        url: &'a str,
        elements: &'a str,
        test_case: &'a TestCase,
    },
}

impl PromptContext<'_> {
    pub fn stage(&self) -> PromptStage {
        match self {
            Self::TestCases { .. } => PromptStage::TestCases,
            Self::Script { .. } => PromptStage::Script,
        }
    }
}

/// A rendered prompt: system instruction plus user message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub stage: PromptStage,
    pub system: String,
    pub user: String,
}

/// Render the prompt for a stage.
pub fn build_prompt(context: &PromptContext<'_>) -> Prompt {
    match *context {
        PromptContext::TestCases {
            url,
            elements,
            desired_count,
        } => Prompt {
            stage: PromptStage::TestCases,
            system: CASE_SYSTEM.to_string(),
            user: case_prompt(url, elements, desired_count),
        },
        PromptContext::Script {
            url,
            elements,
            test_case,
        } => Prompt {
            stage: PromptStage::Script,
            system: SCRIPT_SYSTEM.to_string(),
            user: script_prompt(url, elements, test_case),
        },
    }
}

/// Serialize the first `max` elements as pretty-printed JSON.
pub fn serialize_elements(elements: &[PageElement], max: usize) -> String {
    let shown = &elements[..elements.len().min(max)];
    serde_json::to_string_pretty(shown).unwrap_or_else(|e| {
        warn!("Failed to serialize page elements: {}", e);
        "[]".to_string()
    })
}

fn case_prompt(url: &str, elements: &str, desired_count: u32) -> String {
    format!(
        r#"Generate between 1 and {count} test cases for the web page at {url}.

The page contains these interactive elements (JSON):
{elements}

Rules:
- Ground every step in an element listed above. Do not invent elements, pages or data the page does not show.
- Return at least 1 and at most {count} test cases.
- Respond with ONLY a JSON array. No prose before or after it, no code fences.
- Each array item is an object with exactly these fields:
  "title": a short name for the scenario (string)
  "steps": the steps to execute, in order (array of strings)
  "expected_result": the observable outcome (string)"#,
        count = desired_count,
        url = url,
        elements = elements,
    )
}

fn script_prompt(url: &str, elements: &str, test_case: &TestCase) -> String {
    let mut steps = String::new();
    for (i, step) in test_case.steps.iter().enumerate() {
        let _ = writeln!(steps, "{}. {}", i + 1, step);
    }

    format!(
        r#"Write a Python Selenium script that automates the following test case against {url}.

Test case {id}: {title}
Steps:
{steps}Expected result: {expected}

Page elements available (JSON):
{elements}

Requirements:
- Set up a headless Chrome driver with webdriver-manager.
- Locate elements by ID first, then by name, then by CSS selector, then by link text. Use XPath only when nothing else identifies the element.
- Use explicit waits (WebDriverWait) before interacting with an element.
- Assert the expected result and print whether the test passed or failed.
- Call driver.quit() in a finally block.
- Respond with ONLY the source code. No explanation before or after it."#,
        url = url,
        id = test_case.id,
        title = test_case.title,
        steps = steps,
        expected = test_case.expected_result,
        elements = elements,
    )
}

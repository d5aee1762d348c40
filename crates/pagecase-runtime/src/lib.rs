//! # pagecase Runtime
//!
//! The generation pipeline: element extraction, prompt rendering, retrying
//! generation calls, reply parsing, and the orchestrator that ties them
//! together.

pub mod extract;
pub mod parser;
pub mod pipeline;
pub mod prompt;
pub mod retry;

pub use extract::{extract_elements, ElementExtractor, ElementSummary};
pub use parser::{
    extract_fenced_block, find_json_array, is_plausible_source_line, parse_script,
    parse_test_cases, ParsedCases, SkippedRecord,
};
pub use pipeline::{Pipeline, PipelineConfig};
pub use prompt::{
    build_prompt, serialize_elements, Prompt, PromptContext, PromptStage, CASE_TEMPERATURE,
    SCRIPT_TEMPERATURE,
};
pub use retry::{clamp_temperature, GenerationClient, RetryConfig, RetryNotice};

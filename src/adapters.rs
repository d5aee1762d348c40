//! Adapter types and utility functions for pagecase.

use std::path::PathBuf;
use std::time::Duration;

use pagecase_config::{Config, GenerationConfig};
use pagecase_protocols::ProgressSink;
use pagecase_runtime::{PipelineConfig, RetryConfig};

/// Environment variable consulted when the config carries no API key.
pub(crate) const API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Get the .pagecase directory path.
pub(crate) fn pagecase_dir() -> PathBuf {
    dirs::home_dir()
        .map(|h| h.join(".pagecase"))
        .unwrap_or_else(|| PathBuf::from(".pagecase"))
}

/// Resolve the API key: the config value wins, then the environment.
pub(crate) fn resolve_api_key(config: &Config) -> Option<String> {
    let present = |key: &String| !key.trim().is_empty();
    config
        .provider
        .api_key
        .clone()
        .filter(present)
        .or_else(|| std::env::var(API_KEY_ENV).ok().filter(present))
}

/// Translate the `[generation]` section into the orchestrator's config.
pub(crate) fn pipeline_config(generation: &GenerationConfig, model: &str) -> PipelineConfig {
    PipelineConfig {
        model: model.to_string(),
        retry: RetryConfig {
            max_attempts: generation.max_attempts,
            base_delay: Duration::from_millis(generation.base_delay_ms),
            max_delay: Duration::from_millis(generation.max_delay_ms),
            backoff_multiplier: generation.backoff_multiplier,
            jitter: true,
            attempt_timeout: Duration::from_secs(generation.attempt_timeout_seconds),
        },
        case_stage_attempts: generation.case_stage_attempts,
        script_concurrency: generation.script_concurrency,
        max_elements: generation.max_elements,
        case_max_tokens: generation.case_max_tokens,
        script_max_tokens: generation.script_max_tokens,
    }
}

/// Progress sink printing each run-log entry to stdout.
pub(crate) struct ConsoleProgress;

impl ProgressSink for ConsoleProgress {
    fn on_entry(&self, entry: &str) {
        println!("  > {}", entry);
    }
}

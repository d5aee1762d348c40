//! Configuration schema definitions.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub provider: ProviderConfig,

    #[serde(default)]
    pub fetch: FetchConfig,

    #[serde(default)]
    pub generation: GenerationConfig,

    #[serde(default)]
    pub export: ExportConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Text-generation service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_base_url(),
            model: default_model(),
            request_timeout_seconds: default_request_timeout(),
        }
    }
}

fn default_base_url() -> String {
    "https://api.openai.com/v1/chat/completions".to_string()
}

fn default_model() -> String {
    "gpt-4o".to_string()
}

fn default_request_timeout() -> u64 {
    60
}

/// Page fetch configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Wait after the page loads before its markup is returned.
    #[serde(default = "default_load_wait_ms")]
    pub load_wait_ms: u64,

    #[serde(default = "default_fetch_timeout")]
    pub timeout_seconds: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            load_wait_ms: default_load_wait_ms(),
            timeout_seconds: default_fetch_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_load_wait_ms() -> u64 {
    3000
}

fn default_fetch_timeout() -> u64 {
    30
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36".to_string()
}

/// Generation pipeline configuration.
///
/// Sampling temperature is not configurable; each stage uses a fixed value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Attempts per generation call, including the first.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    #[serde(default = "default_attempt_timeout")]
    pub attempt_timeout_seconds: u64,

    /// Times the test-case stage is prompted when its reply cannot be parsed.
    #[serde(default = "default_case_stage_attempts")]
    pub case_stage_attempts: u32,

    /// Script generations in flight at once (1 = sequential).
    #[serde(default = "default_script_concurrency")]
    pub script_concurrency: usize,

    /// Elements serialized into prompts.
    #[serde(default = "default_max_elements")]
    pub max_elements: usize,

    #[serde(default = "default_case_max_tokens")]
    pub case_max_tokens: u32,

    #[serde(default = "default_script_max_tokens")]
    pub script_max_tokens: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            backoff_multiplier: default_backoff_multiplier(),
            attempt_timeout_seconds: default_attempt_timeout(),
            case_stage_attempts: default_case_stage_attempts(),
            script_concurrency: default_script_concurrency(),
            max_elements: default_max_elements(),
            case_max_tokens: default_case_max_tokens(),
            script_max_tokens: default_script_max_tokens(),
        }
    }
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    500
}

fn default_max_delay_ms() -> u64 {
    30_000
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_attempt_timeout() -> u64 {
    90
}

fn default_case_stage_attempts() -> u32 {
    2
}

fn default_script_concurrency() -> usize {
    1
}

fn default_max_elements() -> usize {
    100
}

fn default_case_max_tokens() -> u32 {
    1500
}

fn default_script_max_tokens() -> u32 {
    2000
}

/// Export configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("outputs")
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Directory for rolling log files. Defaults to `~/.pagecase/logs`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            dir: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

#[cfg(test)]
#[path = "schema_tests.rs"]
mod tests;

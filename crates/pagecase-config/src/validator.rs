//! Configuration validation.

use crate::error::ConfigError;
use crate::schema::Config;

/// Upper bound for concurrent script generations.
pub const MAX_SCRIPT_CONCURRENCY: usize = 16;

/// Validation result.
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, warning: ValidationWarning) {
        self.warnings.push(warning);
    }

    /// Convert into a hard error when any validation error was recorded.
    pub fn into_result(self) -> Result<Vec<ValidationWarning>, ConfigError> {
        if self.is_valid() {
            return Ok(self.warnings);
        }
        let message = self
            .errors
            .iter()
            .map(|e| format!("{}: {}", e.path, e.message))
            .collect::<Vec<_>>()
            .join("; ");
        Err(ConfigError::Invalid(message))
    }
}

/// A validation error.
#[derive(Debug)]
pub struct ValidationError {
    pub path: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// A validation warning.
#[derive(Debug)]
pub struct ValidationWarning {
    pub path: String,
    pub message: String,
}

impl ValidationWarning {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Configuration validator.
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the configuration.
    pub fn validate(config: &Config) -> ValidationResult {
        let mut result = ValidationResult::default();

        Self::validate_provider(config, &mut result);
        Self::validate_fetch(config, &mut result);
        Self::validate_generation(config, &mut result);

        result
    }

    fn validate_provider(config: &Config, result: &mut ValidationResult) {
        let provider = &config.provider;

        if provider.model.trim().is_empty() {
            result.add_error(ValidationError::new("provider.model", "Model cannot be empty"));
        }

        if !provider.base_url.starts_with("http://") && !provider.base_url.starts_with("https://") {
            result.add_error(ValidationError::new(
                "provider.base_url",
                "base_url must start with http:// or https://",
            ));
        }

        if provider.api_key.is_none() {
            result.add_warning(ValidationWarning::new(
                "provider.api_key",
                "API key is not set, may need to be set via OPENAI_API_KEY",
            ));
        }

        if provider.request_timeout_seconds == 0 {
            result.add_error(ValidationError::new(
                "provider.request_timeout_seconds",
                "request_timeout_seconds must be greater than 0",
            ));
        }
    }

    fn validate_fetch(config: &Config, result: &mut ValidationResult) {
        if config.fetch.timeout_seconds == 0 {
            result.add_error(ValidationError::new(
                "fetch.timeout_seconds",
                "timeout_seconds must be greater than 0",
            ));
        }

        if config.fetch.load_wait_ms > 60_000 {
            result.add_warning(ValidationWarning::new(
                "fetch.load_wait_ms",
                "load_wait_ms is very high (>60s), every run will wait this long",
            ));
        }
    }

    fn validate_generation(config: &Config, result: &mut ValidationResult) {
        let generation = &config.generation;

        if generation.max_attempts < 2 {
            result.add_error(ValidationError::new(
                "generation.max_attempts",
                "max_attempts must be at least 2",
            ));
        }

        if generation.backoff_multiplier < 1.0 {
            result.add_error(ValidationError::new(
                "generation.backoff_multiplier",
                "backoff_multiplier must be at least 1.0",
            ));
        }

        if generation.attempt_timeout_seconds == 0 {
            result.add_error(ValidationError::new(
                "generation.attempt_timeout_seconds",
                "attempt_timeout_seconds must be greater than 0",
            ));
        }

        if generation.case_stage_attempts == 0 {
            result.add_error(ValidationError::new(
                "generation.case_stage_attempts",
                "case_stage_attempts must be greater than 0",
            ));
        }

        if !(1..=MAX_SCRIPT_CONCURRENCY).contains(&generation.script_concurrency) {
            result.add_error(ValidationError::new(
                "generation.script_concurrency",
                format!("script_concurrency must be between 1 and {}", MAX_SCRIPT_CONCURRENCY),
            ));
        }

        if generation.max_elements == 0 {
            result.add_error(ValidationError::new(
                "generation.max_elements",
                "max_elements must be greater than 0",
            ));
        }

        if generation.base_delay_ms > generation.max_delay_ms {
            result.add_warning(ValidationWarning::new(
                "generation.base_delay_ms",
                "base_delay_ms exceeds max_delay_ms, every retry will wait max_delay_ms",
            ));
        }
    }
}

#[cfg(test)]
#[path = "validator_tests.rs"]
mod tests;

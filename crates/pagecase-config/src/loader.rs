//! Configuration loader.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::schema::Config;

/// Configuration loader with environment variable substitution.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Config, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }
        let content = fs::read_to_string(path)?;
        Self::load_str(&content)
    }

    /// Load configuration from a file, or fall back to defaults when the
    /// file does not exist.
    pub fn load_or_default(path: &Path) -> Result<Config, ConfigError> {
        match Self::load(path) {
            Err(ConfigError::NotFound(_)) => Ok(Self::normalize(Config::default())),
            other => other,
        }
    }

    /// Load configuration from a string.
    pub fn load_str(content: &str) -> Result<Config, ConfigError> {
        let expanded = Self::expand_env_vars(content)?;
        let config: Config = toml::from_str(&expanded)?;
        Ok(Self::normalize(config))
    }

    /// Expand environment variables in the format `${VAR}`. Comment lines
    /// are left untouched.
    fn expand_env_vars(content: &str) -> Result<String, ConfigError> {
        let re = regex::Regex::new(r"\$\{([^}]+)\}")
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;

        let mut result = String::with_capacity(content.len());
        for line in content.split_inclusive('\n') {
            if line.trim_start().starts_with('#') {
                result.push_str(line);
                continue;
            }

            let mut expanded = line.to_string();
            for cap in re.captures_iter(line) {
                let var_name = &cap[1];
                let var_value = std::env::var(var_name)
                    .map_err(|_| ConfigError::EnvVarNotSet(var_name.to_string()))?;
                expanded = expanded.replace(&cap[0], &var_value);
            }
            result.push_str(&expanded);
        }

        Ok(result)
    }

    fn normalize(mut config: Config) -> Config {
        config.export.output_dir = Self::expand_path_buf(&config.export.output_dir);
        config.logging.dir = config.logging.dir.as_deref().map(Self::expand_path_buf);
        config
    }

    /// Expand shell-style paths (e.g., `~/.pagecase`).
    pub fn expand_path(path: &str) -> String {
        shellexpand::tilde(path).to_string()
    }

    fn expand_path_buf(path: &Path) -> PathBuf {
        PathBuf::from(Self::expand_path(&path.to_string_lossy()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_empty_config() {
        let config = ConfigLoader::load_str("").unwrap();
        assert_eq!(config.generation.max_attempts, 3);
        assert_eq!(config.provider.model, "gpt-4o");
    }

    #[test]
    fn test_load_basic_config() {
        let content = r#"
            [provider]
            model = "gpt-4o-mini"
            base_url = "http://localhost:8080/v1/chat/completions"

            [fetch]
            load_wait_ms = 0
        "#;
        let config = ConfigLoader::load_str(content).unwrap();
        assert_eq!(config.provider.model, "gpt-4o-mini");
        assert_eq!(config.provider.base_url, "http://localhost:8080/v1/chat/completions");
        assert_eq!(config.fetch.load_wait_ms, 0);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[generation]").unwrap();
        writeln!(file, "script_concurrency = 4").unwrap();

        let config = ConfigLoader::load(file.path()).unwrap();
        assert_eq!(config.generation.script_concurrency, 4);
    }

    #[test]
    fn test_load_nonexistent_file() {
        let result = ConfigLoader::load(Path::new("/nonexistent/path/pagecase.toml"));
        assert!(matches!(result, Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let config =
            ConfigLoader::load_or_default(Path::new("/nonexistent/path/pagecase.toml")).unwrap();
        assert_eq!(config.generation.max_elements, 100);
    }

    #[test]
    fn test_load_invalid_toml() {
        let result = ConfigLoader::load_str("invalid = [unclosed");
        assert!(matches!(result, Err(ConfigError::TomlParse(_))));
    }

    #[test]
    fn test_expand_env_vars() {
        // SAFETY: This test runs in isolation and sets a unique test-only env var
        unsafe {
            std::env::set_var("PAGECASE_TEST_API_KEY", "sk-test-value");
        }
        let content = "[provider]\napi_key = \"${PAGECASE_TEST_API_KEY}\"";
        let config = ConfigLoader::load_str(content).unwrap();
        assert_eq!(config.provider.api_key.as_deref(), Some("sk-test-value"));
        unsafe {
            std::env::remove_var("PAGECASE_TEST_API_KEY");
        }
    }

    #[test]
    fn test_expand_env_vars_skips_comments() {
        let content = "# api_key = \"${NONEXISTENT_PAGECASE_VAR_12345}\"\n[provider]\nmodel = \"m\"\n";
        let expanded = ConfigLoader::expand_env_vars(content).unwrap();
        assert_eq!(expanded, content);
    }

    #[test]
    fn test_load_shipped_config() {
        let config = ConfigLoader::load_str(include_str!("../../../config/pagecase.toml")).unwrap();
        assert_eq!(config.provider.model, "gpt-4o");
        assert_eq!(config.generation.max_attempts, 3);
        assert_eq!(config.export.output_dir, PathBuf::from("outputs"));
    }

    #[test]
    fn test_expand_env_vars_not_set() {
        let content = "value = \"${NONEXISTENT_PAGECASE_VAR_12345}\"";
        let result = ConfigLoader::expand_env_vars(content);
        assert!(matches!(result, Err(ConfigError::EnvVarNotSet(_))));
    }

    #[test]
    fn test_expand_env_vars_no_vars() {
        let content = "value = \"no variables here\"";
        let expanded = ConfigLoader::expand_env_vars(content).unwrap();
        assert_eq!(expanded, content);
    }

    #[test]
    fn test_output_dir_tilde_expanded() {
        let content = "[export]\noutput_dir = \"~/pagecase-out\"";
        let config = ConfigLoader::load_str(content).unwrap();
        assert!(!config.export.output_dir.to_string_lossy().starts_with('~'));
        assert!(config.export.output_dir.ends_with("pagecase-out"));
    }

    #[test]
    fn test_expand_path_no_tilde() {
        assert_eq!(ConfigLoader::expand_path("/usr/local/bin"), "/usr/local/bin");
    }
}

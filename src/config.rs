//! Pipeline configuration.
//!
//! This module provides configuration options for the generation pipeline:
//! completion API settings, per-stage output limits, the completion timeout,
//! the prompt template directory, and the database connection.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    /// An environment variable has an invalid value.
    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    /// Configuration validation failed.
    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

/// Configuration for the generation pipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    // Completion settings
    /// Base URL of the hosted completion API.
    pub api_base: String,
    /// API key for the completion API.
    pub api_key: Option<String>,
    /// Model identifier to use for generation.
    pub model: String,
    /// Output-token ceiling per stage call.
    pub max_output_tokens: u32,
    /// Fixed timeout for a single completion call. Generation calls can run
    /// for many minutes; callers must not assume sub-second latency.
    pub completion_timeout: Duration,

    // Prompt settings
    /// Directory of stage prompt template documents.
    pub template_dir: PathBuf,

    // Storage settings
    /// PostgreSQL connection URL, when persistence is enabled.
    pub database_url: Option<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.anthropic.com".to_string(),
            api_key: None,
            model: "claude-sonnet-4-20250514".to_string(),
            max_output_tokens: 8192,
            completion_timeout: Duration::from_secs(1800), // 30 minutes
            template_dir: PathBuf::from("prompts"),
            database_url: None,
        }
    }
}

impl PipelineConfig {
    /// Loads configuration from environment variables.
    ///
    /// Reads the following variables:
    /// - `ADFORGE_API_BASE`: completion API base URL (required)
    /// - `ADFORGE_API_KEY`: completion API key (optional)
    /// - `ADFORGE_MODEL`: model identifier (optional)
    /// - `ADFORGE_MAX_OUTPUT_TOKENS`: per-stage output ceiling (optional)
    /// - `ADFORGE_COMPLETION_TIMEOUT_SECS`: completion timeout (optional)
    /// - `ADFORGE_TEMPLATE_DIR`: prompt template directory (optional)
    /// - `DATABASE_URL`: PostgreSQL connection URL (optional)
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let api_base = std::env::var("ADFORGE_API_BASE")
            .map_err(|_| ConfigError::MissingEnvVar("ADFORGE_API_BASE".to_string()))?;

        let config = Self {
            api_base,
            api_key: std::env::var("ADFORGE_API_KEY").ok(),
            model: std::env::var("ADFORGE_MODEL").unwrap_or(defaults.model),
            max_output_tokens: parse_env_var(
                "ADFORGE_MAX_OUTPUT_TOKENS",
                defaults.max_output_tokens,
            )?,
            completion_timeout: Duration::from_secs(parse_env_var(
                "ADFORGE_COMPLETION_TIMEOUT_SECS",
                defaults.completion_timeout.as_secs(),
            )?),
            template_dir: std::env::var("ADFORGE_TEMPLATE_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.template_dir),
            database_url: std::env::var("DATABASE_URL").ok(),
        };

        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_base.is_empty() {
            return Err(ConfigError::ValidationFailed(
                "api_base must not be empty".to_string(),
            ));
        }
        if self.max_output_tokens == 0 {
            return Err(ConfigError::ValidationFailed(
                "max_output_tokens must be greater than zero".to_string(),
            ));
        }
        if self.completion_timeout.is_zero() {
            return Err(ConfigError::ValidationFailed(
                "completion_timeout must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Parses an environment variable, falling back to a default when unset.
fn parse_env_var<T: std::str::FromStr>(key: &str, default: T) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(value) => value.parse().map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("{}", e),
        }),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = PipelineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_output_tokens, 8192);
        assert_eq!(config.completion_timeout, Duration::from_secs(1800));
    }

    #[test]
    fn zero_max_tokens_rejected() {
        let config = PipelineConfig {
            max_output_tokens: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationFailed(_))
        ));
    }

    #[test]
    fn empty_api_base_rejected() {
        let config = PipelineConfig {
            api_base: String::new(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}

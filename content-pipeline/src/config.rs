//! Generation endpoint configuration, loaded from the environment

use std::time::Duration;

use crate::error::{PipelineError, Result};

pub const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";
pub const DEFAULT_MAX_TOKENS: u32 = 4096;
pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_BASE_DELAY_MS: u64 = 1000;

/// Configuration for the hosted generation endpoint and the retry loop
/// around it. Built once at startup; a missing or blank API credential is a
/// fatal error, never silently defaulted.
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    /// Per-call timeout enforced by the invoker
    pub request_timeout: Duration,
    /// Total attempts per generation call
    pub max_retries: u32,
    /// Base delay for exponential backoff between attempts
    pub base_delay: Duration,
}

impl GeneratorConfig {
    /// Load configuration from the environment (reads `.env` if present).
    ///
    /// Requires `ANTHROPIC_API_KEY`. Optional overrides:
    /// `CONTENT_PIPELINE_MODEL`, `CONTENT_PIPELINE_MAX_TOKENS`,
    /// `CONTENT_PIPELINE_TEMPERATURE`, `CONTENT_PIPELINE_TIMEOUT_SECS`.
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();

        let api_key = std::env::var("ANTHROPIC_API_KEY")
            .map_err(|_| PipelineError::Config("ANTHROPIC_API_KEY is not set".to_string()))?;

        let model = std::env::var("CONTENT_PIPELINE_MODEL")
            .unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        let max_tokens = std::env::var("CONTENT_PIPELINE_MAX_TOKENS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_MAX_TOKENS);
        let temperature = std::env::var("CONTENT_PIPELINE_TEMPERATURE")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_TEMPERATURE);
        let timeout_secs = std::env::var("CONTENT_PIPELINE_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        Self::new(api_key, model, max_tokens, temperature, timeout_secs)
    }

    pub fn new(
        api_key: String,
        model: String,
        max_tokens: u32,
        temperature: f32,
        timeout_secs: u64,
    ) -> Result<Self> {
        if api_key.trim().is_empty() {
            return Err(PipelineError::Config(
                "ANTHROPIC_API_KEY is empty".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&temperature) {
            return Err(PipelineError::Config(format!(
                "temperature {} outside [0.0, 1.0]",
                temperature
            )));
        }
        if max_tokens == 0 {
            return Err(PipelineError::Config("max_tokens must be positive".to_string()));
        }

        Ok(Self {
            api_key,
            base_url: "https://api.anthropic.com".to_string(),
            model,
            max_tokens,
            temperature,
            request_timeout: Duration::from_secs(timeout_secs),
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay: Duration::from_millis(DEFAULT_BASE_DELAY_MS),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> Result<GeneratorConfig> {
        GeneratorConfig::new(
            "sk-test".to_string(),
            DEFAULT_MODEL.to_string(),
            DEFAULT_MAX_TOKENS,
            DEFAULT_TEMPERATURE,
            DEFAULT_TIMEOUT_SECS,
        )
    }

    #[test]
    fn accepts_valid_config() {
        let config = valid().unwrap();
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.request_timeout, Duration::from_secs(60));
    }

    #[test]
    fn rejects_blank_api_key() {
        let err = GeneratorConfig::new(
            "   ".to_string(),
            DEFAULT_MODEL.to_string(),
            DEFAULT_MAX_TOKENS,
            DEFAULT_TEMPERATURE,
            DEFAULT_TIMEOUT_SECS,
        )
        .unwrap_err();
        assert!(matches!(err, PipelineError::Config(_)));
    }

    #[test]
    fn rejects_out_of_range_temperature() {
        let err = GeneratorConfig::new(
            "sk-test".to_string(),
            DEFAULT_MODEL.to_string(),
            DEFAULT_MAX_TOKENS,
            1.5,
            DEFAULT_TIMEOUT_SECS,
        )
        .unwrap_err();
        assert!(matches!(err, PipelineError::Config(_)));
    }
}

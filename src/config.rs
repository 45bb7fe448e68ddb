//! Configuration management for aquasense
//!
//! Settings are loaded from environment variables with sensible defaults.
//! Configuration covers both inference providers, the retry policy, and where
//! analysis history and telemetry datasets live.
//!
//! # Environment Variables
//!
//! ## Providers
//! - `AQUASENSE_PRIMARY_ENDPOINT`: forecast provider URL - default: DeepSeek chat completions
//! - `AQUASENSE_PRIMARY_API_KEY`: forecast provider key - falls back to `DEEPSEEK_API_KEY`
//! - `AQUASENSE_PRIMARY_MODEL`: model name sent in the body - default: "deepseek-reasoner"
//! - `AQUASENSE_PRIMARY_AUTH_HEADER`: send the key raw in this header (e.g. `api-key`)
//!   instead of `Authorization: Bearer`
//! - `AQUASENSE_VALIDATOR_ENDPOINT`, `AQUASENSE_VALIDATOR_API_KEY` (falls back to
//!   `O1_API_KEY`), `AQUASENSE_VALIDATOR_MODEL` (default "o1-mini"),
//!   `AQUASENSE_VALIDATOR_AUTH_HEADER`: same for the validation provider, which
//!   also serves chat
//!
//! ## Runtime
//! - `AQUASENSE_REQUEST_TIMEOUT`: per-attempt timeout in seconds - default: "30"
//! - `AQUASENSE_MAX_ATTEMPTS`: attempts per provider call - default: "3"
//! - `AQUASENSE_RETRY_DELAY_MS`: first analysis backoff delay - default: "2000"
//! - `AQUASENSE_CHAT_RETRY_DELAY_MS`: first chat backoff delay - default: "1000"
//! - `AQUASENSE_BACKOFF_MULTIPLIER`: backoff growth factor - default: "2.0"
//! - `AQUASENSE_CONFIDENCE_PRIMARY`, `AQUASENSE_CONFIDENCE_VALIDATOR`,
//!   `AQUASENSE_CONFIDENCE_ENSEMBLE`: confidence reported per analysis mode,
//!   each in 0..=1 - defaults: "0.78", "0.82", "0.87"
//! - `AQUASENSE_DATA_DIR`: history and telemetry root - default: "data"
//! - `AQUASENSE_LOG_LEVEL`: logging level - default: "info"
//!
//! # Example
//!
//! ```no_run
//! use aquasense::AquasenseConfig;
//!
//! let config = AquasenseConfig::default();
//! config.validate().expect("Invalid configuration");
//!
//! let primary = config.primary_provider();
//! println!("primary configured: {}", primary.is_configured());
//! ```

use crate::ai::{CredentialScheme, PromptPlacement, ProviderConfig, RetryPolicy, RetryPolicyError};
use crate::analysis::prompt::{CHAT_INSTRUCTIONS, PRIMARY_SYSTEM_PROMPT, VALIDATOR_SYSTEM_PROMPT};
use crate::analysis::ConfidencePolicy;
use std::collections::HashMap;
use std::env;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_PRIMARY_ENDPOINT: &str = "https://api.deepseek.com/v1/chat/completions";
const DEFAULT_PRIMARY_MODEL: &str = "deepseek-reasoner";
const DEFAULT_VALIDATOR_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";
const DEFAULT_VALIDATOR_MODEL: &str = "o1-mini";
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_MAX_ATTEMPTS: u32 = 3;
const DEFAULT_RETRY_DELAY_MS: u64 = 2000;
const DEFAULT_CHAT_RETRY_DELAY_MS: u64 = 1000;
const DEFAULT_BACKOFF_MULTIPLIER: f64 = 2.0;
const DEFAULT_DATA_DIR: &str = "data";

const PRIMARY_TEMPERATURE: f64 = 0.3;
const PRIMARY_TOKEN_LIMIT: u32 = 1000;
const VALIDATOR_TOKEN_LIMIT: u32 = 1500;
const CHAT_TOKEN_LIMIT: u32 = 5000;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),

    #[error("Failed to parse {field}: {error}")]
    ParseError { field: String, error: String },

    #[error("Invalid retry policy: {0}")]
    RetryPolicy(#[from] RetryPolicyError),
}

/// Connection settings for one provider
#[derive(Clone, PartialEq)]
pub struct ProviderSettings {
    pub endpoint: String,
    pub api_key: Option<String>,
    pub model: String,
    /// Raw-key header name; `None` means `Authorization: Bearer`
    pub auth_header: Option<String>,
}

impl ProviderSettings {
    fn from_env(prefix: &str, legacy_key: &str, endpoint: &str, model: &str) -> Self {
        let var = |name: &str| {
            env::var(format!("AQUASENSE_{}_{}", prefix, name))
                .ok()
                .filter(|v| !v.trim().is_empty())
        };

        Self {
            endpoint: var("ENDPOINT").unwrap_or_else(|| endpoint.to_string()),
            api_key: var("API_KEY").or_else(|| {
                env::var(legacy_key)
                    .ok()
                    .filter(|v| !v.trim().is_empty())
            }),
            model: var("MODEL").unwrap_or_else(|| model.to_string()),
            auth_header: var("AUTH_HEADER"),
        }
    }

    fn credential_scheme(&self) -> CredentialScheme {
        match &self.auth_header {
            Some(name) => CredentialScheme::Header { name: name.clone() },
            None => CredentialScheme::Bearer,
        }
    }

    fn provider(&self, name: &str, timeout: Duration) -> ProviderConfig {
        let mut config = ProviderConfig::new(name, self.endpoint.clone()).with_timeout(timeout);
        config.credential = self.api_key.clone();
        config.credential_scheme = self.credential_scheme();
        config.model = Some(self.model.clone());
        config
    }
}

impl fmt::Debug for ProviderSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderSettings")
            .field("endpoint", &self.endpoint)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("auth_header", &self.auth_header)
            .finish()
    }
}

/// Main configuration structure for aquasense
///
/// `Default::default()` loads from environment variables, falling back to
/// defaults for anything unset or unparseable.
#[derive(Debug, Clone)]
pub struct AquasenseConfig {
    /// Forecast provider
    pub primary: ProviderSettings,

    /// Validation provider, also used for chat
    pub validator: ProviderSettings,

    pub request_timeout_secs: u64,

    pub max_attempts: u32,

    /// First analysis backoff delay
    pub retry_delay_ms: u64,

    /// First chat backoff delay
    pub chat_retry_delay_ms: u64,

    pub backoff_multiplier: f64,

    /// Confidence reported per analysis mode
    pub confidence: ConfidencePolicy,

    /// Root for `analysis/` history and `telemetry/` datasets
    pub data_dir: PathBuf,

    /// Logging level (trace, debug, info, warn, error)
    pub log_level: String,
}

fn env_parsed<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

impl Default for AquasenseConfig {
    fn default() -> Self {
        let primary = ProviderSettings::from_env(
            "PRIMARY",
            "DEEPSEEK_API_KEY",
            DEFAULT_PRIMARY_ENDPOINT,
            DEFAULT_PRIMARY_MODEL,
        );
        let validator = ProviderSettings::from_env(
            "VALIDATOR",
            "O1_API_KEY",
            DEFAULT_VALIDATOR_ENDPOINT,
            DEFAULT_VALIDATOR_MODEL,
        );

        let data_dir = env::var("AQUASENSE_DATA_DIR")
            .ok()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));

        let log_level = env::var("AQUASENSE_LOG_LEVEL")
            .unwrap_or_else(|_| DEFAULT_LOG_LEVEL.to_string())
            .to_lowercase();

        let defaults = ConfidencePolicy::default();
        let confidence = ConfidencePolicy {
            primary_only: env_parsed("AQUASENSE_CONFIDENCE_PRIMARY", defaults.primary_only),
            validator_only: env_parsed("AQUASENSE_CONFIDENCE_VALIDATOR", defaults.validator_only),
            ensemble: env_parsed("AQUASENSE_CONFIDENCE_ENSEMBLE", defaults.ensemble),
        };

        Self {
            primary,
            validator,
            request_timeout_secs: env_parsed("AQUASENSE_REQUEST_TIMEOUT", DEFAULT_REQUEST_TIMEOUT_SECS),
            max_attempts: env_parsed("AQUASENSE_MAX_ATTEMPTS", DEFAULT_MAX_ATTEMPTS),
            retry_delay_ms: env_parsed("AQUASENSE_RETRY_DELAY_MS", DEFAULT_RETRY_DELAY_MS),
            chat_retry_delay_ms: env_parsed(
                "AQUASENSE_CHAT_RETRY_DELAY_MS",
                DEFAULT_CHAT_RETRY_DELAY_MS,
            ),
            backoff_multiplier: env_parsed(
                "AQUASENSE_BACKOFF_MULTIPLIER",
                DEFAULT_BACKOFF_MULTIPLIER,
            ),
            confidence,
            data_dir,
            log_level,
        }
    }
}

impl AquasenseConfig {
    /// Validates numeric ranges and the log level.
    ///
    /// Missing API keys are not an error here: an unconfigured provider is
    /// served from fallback data at call time.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::ValidationFailed(
                "Request timeout must be at least 1 second".to_string(),
            ));
        }
        if self.request_timeout_secs > 600 {
            return Err(ConfigError::ValidationFailed(
                "Request timeout cannot exceed 10 minutes".to_string(),
            ));
        }

        if self.max_attempts == 0 || self.max_attempts > 10 {
            return Err(ConfigError::ValidationFailed(format!(
                "Max attempts must be between 1 and 10, got {}",
                self.max_attempts
            )));
        }

        self.retry_policy()?;

        for (mode, score) in [
            ("primary", self.confidence.primary_only),
            ("validator", self.confidence.validator_only),
            ("ensemble", self.confidence.ensemble),
        ] {
            if !(0.0..=1.0).contains(&score) {
                return Err(ConfigError::ValidationFailed(format!(
                    "{} confidence must be between 0 and 1, got {}",
                    mode, score
                )));
            }
        }

        for (name, endpoint) in [
            ("primary", &self.primary.endpoint),
            ("validator", &self.validator.endpoint),
        ] {
            if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
                return Err(ConfigError::ValidationFailed(format!(
                    "Invalid {} endpoint: {}",
                    name, endpoint
                )));
            }
        }

        match self.log_level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(ConfigError::ValidationFailed(format!(
                    "Invalid log level: {}. Valid options: trace, debug, info, warn, error",
                    self.log_level
                )))
            }
        }

        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Retry policy for analysis calls
    pub fn retry_policy(&self) -> Result<RetryPolicy, ConfigError> {
        Ok(RetryPolicy::new(
            self.max_attempts,
            Duration::from_millis(self.retry_delay_ms),
            self.backoff_multiplier,
        )?)
    }

    /// Retry policy for chat turns
    pub fn chat_retry_policy(&self) -> Result<RetryPolicy, ConfigError> {
        Ok(self
            .retry_policy()?
            .with_initial_delay(Duration::from_millis(self.chat_retry_delay_ms)))
    }

    /// Forecast provider: system-role prompt, `max_tokens`
    pub fn primary_provider(&self) -> ProviderConfig {
        let mut config = self
            .primary
            .provider("primary", self.request_timeout())
            .with_system_prompt(PRIMARY_SYSTEM_PROMPT);
        config.temperature = Some(PRIMARY_TEMPERATURE);
        config.token_limit = PRIMARY_TOKEN_LIMIT;
        config
    }

    /// Validation provider: prompt as a leading user message, no temperature,
    /// `max_completion_tokens`
    pub fn validator_provider(&self) -> ProviderConfig {
        let mut config = self
            .validator
            .provider("validator", self.request_timeout())
            .with_system_prompt(VALIDATOR_SYSTEM_PROMPT);
        config.prompt_placement = PromptPlacement::LeadingUserMessage;
        config.token_limit_field = "max_completion_tokens".to_string();
        config.token_limit = VALIDATOR_TOKEN_LIMIT;
        config
    }

    /// Chat runs against the validation provider with its own instructions
    pub fn chat_provider(&self) -> ProviderConfig {
        let mut config = self.validator_provider().with_system_prompt(CHAT_INSTRUCTIONS);
        config.name = "chat".to_string();
        config.token_limit = CHAT_TOKEN_LIMIT;
        config
    }

    pub fn analysis_dir(&self) -> PathBuf {
        self.data_dir.join("analysis")
    }

    pub fn telemetry_dir(&self) -> PathBuf {
        self.data_dir.join("telemetry")
    }

    /// Configuration as a flat map for JSON/YAML output; keys are never included
    pub fn to_display_map(&self) -> HashMap<String, String> {
        let mut map = HashMap::new();

        for (name, settings) in [("primary", &self.primary), ("validator", &self.validator)] {
            map.insert(format!("{}_endpoint", name), settings.endpoint.clone());
            map.insert(format!("{}_model", name), settings.model.clone());
            map.insert(
                format!("{}_api_key", name),
                if settings.api_key.is_some() { "set" } else { "not set" }.to_string(),
            );
        }
        map.insert(
            "request_timeout_secs".to_string(),
            self.request_timeout_secs.to_string(),
        );
        map.insert("max_attempts".to_string(), self.max_attempts.to_string());
        map.insert("retry_delay_ms".to_string(), self.retry_delay_ms.to_string());
        map.insert(
            "chat_retry_delay_ms".to_string(),
            self.chat_retry_delay_ms.to_string(),
        );
        map.insert(
            "backoff_multiplier".to_string(),
            self.backoff_multiplier.to_string(),
        );
        map.insert(
            "confidence".to_string(),
            format!(
                "primary={} validator={} ensemble={}",
                self.confidence.primary_only,
                self.confidence.validator_only,
                self.confidence.ensemble
            ),
        );
        map.insert("data_dir".to_string(), self.data_dir.display().to_string());
        map.insert("log_level".to_string(), self.log_level.clone());

        map
    }
}

impl fmt::Display for AquasenseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Aquasense Configuration:")?;
        for (name, settings) in [("Primary", &self.primary), ("Validator", &self.validator)] {
            writeln!(
                f,
                "  {}: {} ({}, key {})",
                name,
                settings.endpoint,
                settings.model,
                if settings.api_key.is_some() { "set" } else { "not set" }
            )?;
        }
        writeln!(f, "  Request Timeout: {}s", self.request_timeout_secs)?;
        writeln!(
            f,
            "  Retries: {} attempts, {}ms x{}",
            self.max_attempts, self.retry_delay_ms, self.backoff_multiplier
        )?;
        writeln!(
            f,
            "  Confidence: primary {}, validator {}, ensemble {}",
            self.confidence.primary_only, self.confidence.validator_only, self.confidence.ensemble
        )?;
        writeln!(f, "  Data Dir: {}", self.data_dir.display())?;
        writeln!(f, "  Log Level: {}", self.log_level)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;

    /// Helper to temporarily set environment variables for testing
    struct EnvGuard {
        key: String,
        old_value: Option<String>,
    }

    impl EnvGuard {
        fn set(key: &str, value: &str) -> Self {
            let old_value = env::var(key).ok();
            env::set_var(key, value);
            Self {
                key: key.to_string(),
                old_value,
            }
        }

        fn unset(key: &str) -> Self {
            let old_value = env::var(key).ok();
            env::remove_var(key);
            Self {
                key: key.to_string(),
                old_value,
            }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            match &self.old_value {
                Some(v) => env::set_var(&self.key, v),
                None => env::remove_var(&self.key),
            }
        }
    }

    fn clear_env() -> Vec<EnvGuard> {
        [
            "AQUASENSE_PRIMARY_ENDPOINT",
            "AQUASENSE_PRIMARY_API_KEY",
            "AQUASENSE_PRIMARY_MODEL",
            "AQUASENSE_PRIMARY_AUTH_HEADER",
            "AQUASENSE_VALIDATOR_ENDPOINT",
            "AQUASENSE_VALIDATOR_API_KEY",
            "AQUASENSE_VALIDATOR_MODEL",
            "AQUASENSE_VALIDATOR_AUTH_HEADER",
            "DEEPSEEK_API_KEY",
            "O1_API_KEY",
            "AQUASENSE_REQUEST_TIMEOUT",
            "AQUASENSE_MAX_ATTEMPTS",
            "AQUASENSE_RETRY_DELAY_MS",
            "AQUASENSE_CHAT_RETRY_DELAY_MS",
            "AQUASENSE_BACKOFF_MULTIPLIER",
            "AQUASENSE_CONFIDENCE_PRIMARY",
            "AQUASENSE_CONFIDENCE_VALIDATOR",
            "AQUASENSE_CONFIDENCE_ENSEMBLE",
            "AQUASENSE_DATA_DIR",
            "AQUASENSE_LOG_LEVEL",
        ]
        .into_iter()
        .map(EnvGuard::unset)
        .collect()
    }

    #[test]
    #[serial]
    fn test_default_configuration() {
        let _guards = clear_env();

        let config = AquasenseConfig::default();

        assert_eq!(config.primary.endpoint, DEFAULT_PRIMARY_ENDPOINT);
        assert_eq!(config.primary.api_key, None);
        assert_eq!(config.validator.model, DEFAULT_VALIDATOR_MODEL);
        assert_eq!(config.request_timeout_secs, 30);
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.retry_delay_ms, 2000);
        assert_eq!(config.chat_retry_delay_ms, 1000);
        assert_eq!(config.data_dir, PathBuf::from("data"));
        assert_eq!(config.log_level, "info");
        assert_eq!(config.confidence, ConfidencePolicy::default());
        assert!(config.validate().is_ok());
        assert!(!config.primary_provider().is_configured());
    }

    #[test]
    #[serial]
    fn test_environment_variable_parsing() {
        let mut guards = clear_env();
        guards.extend([
            EnvGuard::set("AQUASENSE_PRIMARY_ENDPOINT", "https://primary.test/chat"),
            EnvGuard::set("AQUASENSE_PRIMARY_API_KEY", "p-key"),
            EnvGuard::set("AQUASENSE_PRIMARY_AUTH_HEADER", "api-key"),
            EnvGuard::set("AQUASENSE_MAX_ATTEMPTS", "5"),
            EnvGuard::set("AQUASENSE_RETRY_DELAY_MS", "250"),
            EnvGuard::set("AQUASENSE_REQUEST_TIMEOUT", "10"),
            EnvGuard::set("AQUASENSE_DATA_DIR", "/var/lib/aquasense"),
            EnvGuard::set("AQUASENSE_LOG_LEVEL", "DEBUG"),
        ]);

        let config = AquasenseConfig::default();

        assert_eq!(config.primary.endpoint, "https://primary.test/chat");
        assert_eq!(config.max_attempts, 5);
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.analysis_dir(), PathBuf::from("/var/lib/aquasense/analysis"));

        let provider = config.primary_provider();
        assert!(provider.is_configured());
        assert_eq!(provider.timeout, Duration::from_secs(10));
        assert!(provider
            .headers()
            .contains(&("api-key".to_string(), "p-key".to_string())));

        let policy = config.retry_policy().unwrap();
        assert_eq!(policy.max_attempts(), 5);
        assert_eq!(policy.initial_delay(), Duration::from_millis(250));
    }

    #[test]
    #[serial]
    fn test_confidence_from_environment() {
        let mut guards = clear_env();
        guards.extend([
            EnvGuard::set("AQUASENSE_CONFIDENCE_ENSEMBLE", "0.95"),
            EnvGuard::set("AQUASENSE_CONFIDENCE_PRIMARY", "not-a-number"),
        ]);

        let config = AquasenseConfig::default();

        assert_eq!(config.confidence.ensemble, 0.95);
        assert_eq!(config.confidence.primary_only, 0.78);
        assert_eq!(config.confidence.validator_only, 0.82);
        assert!(config.validate().is_ok());
        assert!(config.to_display_map()["confidence"].contains("ensemble=0.95"));
    }

    #[test]
    #[serial]
    fn test_legacy_key_fallback() {
        let mut guards = clear_env();
        guards.push(EnvGuard::set("O1_API_KEY", "legacy"));

        let config = AquasenseConfig::default();

        assert_eq!(config.validator.api_key.as_deref(), Some("legacy"));
        assert!(config
            .validator_provider()
            .headers()
            .contains(&("Authorization".to_string(), "Bearer legacy".to_string())));
    }

    #[test]
    #[serial]
    fn test_blank_key_is_ignored() {
        let mut guards = clear_env();
        guards.push(EnvGuard::set("AQUASENSE_PRIMARY_API_KEY", "   "));

        let config = AquasenseConfig::default();
        assert_eq!(config.primary.api_key, None);
    }

    #[test]
    #[serial]
    fn test_validation_rejects_bad_values() {
        let _guards = clear_env();

        let mut config = AquasenseConfig::default();
        config.request_timeout_secs = 0;
        assert!(config.validate().is_err());

        let mut config = AquasenseConfig::default();
        config.max_attempts = 0;
        assert!(config.validate().is_err());

        let mut config = AquasenseConfig::default();
        config.backoff_multiplier = 0.5;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::RetryPolicy(_))
        ));

        let mut config = AquasenseConfig::default();
        config.confidence.validator_only = 1.5;
        assert!(config.validate().is_err());

        let mut config = AquasenseConfig::default();
        config.log_level = "loud".to_string();
        assert!(config.validate().is_err());

        let mut config = AquasenseConfig::default();
        config.primary.endpoint = "ftp://nope".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    #[serial]
    fn test_provider_shapes() {
        let _guards = clear_env();
        let config = AquasenseConfig::default();

        let validator = config.validator_provider();
        assert_eq!(validator.prompt_placement, PromptPlacement::LeadingUserMessage);
        assert_eq!(validator.token_limit_field, "max_completion_tokens");
        assert_eq!(validator.temperature, None);
        assert_eq!(config.primary_provider().temperature, Some(0.3));

        let chat = config.chat_provider();
        assert_eq!(chat.system_prompt, CHAT_INSTRUCTIONS);
        assert_eq!(chat.token_limit, 5000);

        let chat_policy = config.chat_retry_policy().unwrap();
        assert_eq!(chat_policy.initial_delay(), Duration::from_secs(1));
    }

    #[test]
    #[serial]
    fn test_display_hides_keys() {
        let mut guards = clear_env();
        guards.push(EnvGuard::set("AQUASENSE_PRIMARY_API_KEY", "super-secret"));

        let config = AquasenseConfig::default();
        let display = format!("{}", config);
        assert!(display.contains("Aquasense Configuration:"));
        assert!(!display.contains("super-secret"));
        assert!(!format!("{:?}", config).contains("super-secret"));
        assert_eq!(config.to_display_map()["primary_api_key"], "set");
    }
}

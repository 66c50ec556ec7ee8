//! Configuration loading, validation, and management for FinGuru.
//!
//! Loads configuration from `~/.finguru/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.finguru/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key (can be overridden per-provider)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Default completion provider
    #[serde(default = "default_provider")]
    pub default_provider: String,

    /// Default model
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Default temperature
    #[serde(default = "default_temperature")]
    pub default_temperature: f32,

    /// Default max tokens per completion
    #[serde(default = "default_max_tokens")]
    pub default_max_tokens: u32,

    /// Retry and deadline policy for completion calls
    #[serde(default)]
    pub retry: RetryConfig,

    /// Conversation memory limits
    #[serde(default)]
    pub session: SessionConfig,

    /// Gateway configuration
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Assistant persona
    #[serde(default)]
    pub persona: PersonaConfig,

    /// FAQ collaborator
    #[serde(default)]
    pub faq: FaqConfig,

    /// Provider-specific configurations
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
}

fn default_provider() -> String {
    "mistral".into()
}
fn default_model() -> String {
    "mistral-tiny".into()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_max_tokens() -> u32 {
    600
}
fn default_true() -> bool {
    true
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("default_provider", &self.default_provider)
            .field("default_model", &self.default_model)
            .field("default_temperature", &self.default_temperature)
            .field("default_max_tokens", &self.default_max_tokens)
            .field("retry", &self.retry)
            .field("session", &self.session)
            .field("gateway", &self.gateway)
            .field("persona", &self.persona)
            .field("faq", &self.faq)
            .field("providers", &self.providers)
            .finish()
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("default_model", &self.default_model)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Attempts per completion call (not retries after the first)
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Delay before the second attempt; doubles after each rate-limited attempt
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    /// Overall deadline for one completion call, backoff included
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_max_retries() -> u32 {
    3
}
fn default_initial_backoff_ms() -> u64 {
    1_000
}
fn default_request_timeout_secs() -> u64 {
    60
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_backoff_ms: default_initial_backoff_ms(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Turns kept per user. Must be even so exchanges stay paired.
    #[serde(default = "default_history_cap")]
    pub history_cap: usize,

    /// Most recent turns sent along with each completion request
    #[serde(default = "default_context_window")]
    pub context_window: usize,
}

fn default_history_cap() -> usize {
    10
}
fn default_context_window() -> usize {
    6
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            history_cap: default_history_cap(),
            context_window: default_context_window(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,

    /// Allowed CORS origins. Empty allows any origin.
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

fn default_port() -> u16 {
    5000
}
fn default_host() -> String {
    "127.0.0.1".into()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            cors_origins: vec![],
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PersonaConfig {
    /// Replace the built-in advisor instructions entirely
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt_override: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaqConfig {
    /// Seed the FAQ store at startup
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Embedding model used to index FAQ questions. Unset skips embedding.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding_model: Option<String>,
}

impl Default for FaqConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            embedding_model: None,
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_model: Option<String>,
}

impl AppConfig {
    /// Load configuration from the default path (~/.finguru/config.toml).
    ///
    /// Also checks environment variables:
    /// - `FINGURU_API_KEY` (highest priority), then `MISTRAL_API_KEY`
    /// - `FINGURU_PROVIDER`, `FINGURU_MODEL`
    /// - `PORT` for the gateway port
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides through a lookup function.
    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        if self.api_key.is_none() {
            self.api_key = lookup("FINGURU_API_KEY").or_else(|| lookup("MISTRAL_API_KEY"));
        }

        if let Some(provider) = lookup("FINGURU_PROVIDER") {
            self.default_provider = provider;
        }

        if let Some(model) = lookup("FINGURU_MODEL") {
            self.default_model = model;
        }

        if let Some(port) = lookup("PORT") {
            self.gateway.port = port.parse().map_err(|_| {
                ConfigError::ValidationError(format!("PORT is not a valid port: {port}"))
            })?;
        }

        Ok(())
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".finguru")
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.default_temperature < 0.0 || self.default_temperature > 2.0 {
            return Err(ConfigError::ValidationError(
                "default_temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.session.history_cap < 2 || self.session.history_cap % 2 != 0 {
            return Err(ConfigError::ValidationError(
                "session.history_cap must be an even number of at least 2".into(),
            ));
        }

        if self.session.context_window > self.session.history_cap {
            return Err(ConfigError::ValidationError(
                "session.context_window cannot exceed session.history_cap".into(),
            ));
        }

        if self.retry.request_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "retry.request_timeout_secs must be > 0".into(),
            ));
        }

        Ok(())
    }

    /// Model used for completions: the default provider's own model if set,
    /// otherwise `default_model`.
    pub fn active_model(&self) -> &str {
        self.providers
            .get(&self.default_provider)
            .and_then(|p| p.default_model.as_deref())
            .unwrap_or(&self.default_model)
    }

    /// Whether an API key is present and plausibly real.
    pub fn has_api_key(&self) -> bool {
        self.api_key.as_ref().is_some_and(|k| k.len() > 10)
    }

    /// Generate a default config TOML string (for `onboard` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            default_provider: default_provider(),
            default_model: default_model(),
            default_temperature: default_temperature(),
            default_max_tokens: default_max_tokens(),
            retry: RetryConfig::default(),
            session: SessionConfig::default(),
            gateway: GatewayConfig::default(),
            persona: PersonaConfig::default(),
            faq: FaqConfig::default(),
            providers: HashMap::new(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert_eq!(config.default_provider, "mistral");
        assert_eq!(config.default_model, "mistral-tiny");
        assert_eq!(config.default_max_tokens, 600);
        assert_eq!(config.retry.max_retries, 3);
        assert_eq!(config.session.history_cap, 10);
        assert_eq!(config.session.context_window, 6);
        assert_eq!(config.gateway.port, 5000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.default_provider, config.default_provider);
        assert_eq!(parsed.gateway.port, config.gateway.port);
        assert_eq!(parsed.retry.initial_backoff_ms, 1_000);
    }

    #[test]
    fn invalid_temperature_rejected() {
        let config = AppConfig {
            default_temperature: 5.0,
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn odd_history_cap_rejected() {
        let config = AppConfig {
            session: SessionConfig {
                history_cap: 7,
                context_window: 6,
            },
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn window_larger_than_cap_rejected() {
        let config = AppConfig {
            session: SessionConfig {
                history_cap: 4,
                context_window: 6,
            },
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let result = AppConfig::load_from(Path::new("/nonexistent/config.toml"));
        assert!(result.is_ok());
        assert_eq!(result.unwrap().default_provider, "mistral");
    }

    #[test]
    fn partial_file_fills_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "default_model = \"mistral-small\"\n[retry]\nmax_retries = 5\n[gateway]\nport = 8080"
        )
        .unwrap();

        let config = AppConfig::load_from(file.path()).unwrap();
        assert_eq!(config.default_model, "mistral-small");
        assert_eq!(config.retry.max_retries, 5);
        assert_eq!(config.retry.initial_backoff_ms, 1_000);
        assert_eq!(config.gateway.port, 8080);
        assert_eq!(config.session.history_cap, 10);
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "default_model = [").unwrap();
        let result = AppConfig::load_from(file.path());
        assert!(matches!(result, Err(ConfigError::ParseError { .. })));
    }

    #[test]
    fn env_overrides_apply() {
        let mut config = AppConfig::default();
        config
            .apply_env(|key| match key {
                "MISTRAL_API_KEY" => Some("mk-0123456789abcdef".into()),
                "FINGURU_MODEL" => Some("mistral-large".into()),
                "PORT" => Some("9000".into()),
                _ => None,
            })
            .unwrap();
        assert_eq!(config.api_key.as_deref(), Some("mk-0123456789abcdef"));
        assert_eq!(config.default_model, "mistral-large");
        assert_eq!(config.gateway.port, 9000);
        assert!(config.has_api_key());
    }

    #[test]
    fn file_api_key_beats_env() {
        let mut config = AppConfig {
            api_key: Some("from-file-key-123".into()),
            ..AppConfig::default()
        };
        config
            .apply_env(|key| (key == "FINGURU_API_KEY").then(|| "from-env".to_string()))
            .unwrap();
        assert_eq!(config.api_key.as_deref(), Some("from-file-key-123"));
    }

    #[test]
    fn bad_port_env_rejected() {
        let mut config = AppConfig::default();
        let result = config.apply_env(|key| (key == "PORT").then(|| "not-a-port".to_string()));
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn short_api_key_counts_as_missing() {
        let config = AppConfig {
            api_key: Some("short".into()),
            ..AppConfig::default()
        };
        assert!(!config.has_api_key());
    }

    #[test]
    fn debug_redacts_api_key() {
        let config = AppConfig {
            api_key: Some("super-secret-key".into()),
            ..AppConfig::default()
        };
        let debug = format!("{config:?}");
        assert!(!debug.contains("super-secret-key"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn active_model_prefers_provider_setting() {
        let mut config = AppConfig::default();
        assert_eq!(config.active_model(), "mistral-tiny");

        config.providers.insert(
            "mistral".into(),
            ProviderConfig {
                api_key: None,
                api_url: None,
                default_model: Some("mistral-large-latest".into()),
            },
        );
        assert_eq!(config.active_model(), "mistral-large-latest");

        config.default_provider = "ollama".into();
        assert_eq!(config.active_model(), "mistral-tiny");
    }

    #[test]
    fn default_toml_generation() {
        let toml_str = AppConfig::default_toml();
        assert!(toml_str.contains("mistral"));
        assert!(toml_str.contains("5000"));
    }
}

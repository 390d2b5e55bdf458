//! Configuration types for the storefront assistant

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::assistant::retry::RetryConfig;
use crate::error::{Result, StorefrontError};

/// Default configuration file looked up in the working directory
pub const CONFIG_FILE: &str = "storefront.toml";

/// Environment variable naming an additional configuration file
pub const CONFIG_PATH_ENV: &str = "STOREFRONT_CONFIG_PATH";

/// Prefix for environment overrides (`STOREFRONT_ASSISTANT__REPLY_DELAY=2s`)
pub const ENV_PREFIX: &str = "STOREFRONT_";

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct StorefrontConfig {
    /// Assistant behaviour and backend selection
    pub assistant: AssistantConfig,

    /// Retry policy for backend requests
    pub retry: RetryConfig,

    /// Message log bounds
    pub history: HistoryConfig,

    /// Session event channel
    pub events: EventConfig,
}

/// Assistant configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistantConfig {
    /// Seeded greeting, always message id 1
    pub greeting: String,

    /// Fixed reply used by the placeholder backend
    pub placeholder_reply: String,

    /// Delay before the placeholder backend answers
    #[serde(with = "humantime_serde")]
    pub reply_delay: Duration,

    /// Upper bound on a single reply, retries included
    #[serde(with = "humantime_serde")]
    pub reply_timeout: Duration,

    /// Appended in place of a reply that failed or timed out
    pub failure_reply: String,

    /// System prompt prepended to backend context
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,

    /// Which backend produces replies
    pub backend: BackendConfig,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            greeting: "Hi! I'm your shopping assistant. What are you looking for today?"
                .to_string(),
            placeholder_reply: "Thanks for your message! I'm looking into that for you."
                .to_string(),
            reply_delay: Duration::from_millis(1000),
            reply_timeout: Duration::from_secs(30),
            failure_reply: "Sorry, I couldn't get an answer right now. Please try again."
                .to_string(),
            system_prompt: None,
            backend: BackendConfig::Placeholder,
        }
    }
}

/// Reply backend
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum BackendConfig {
    /// Fixed reply after a fixed delay
    #[default]
    Placeholder,

    /// OpenAI-compatible chat completions endpoint
    OpenAI {
        /// Model name
        model: String,

        /// API key (falls back to `OPENAI_API_KEY`)
        #[serde(default, skip_serializing_if = "Option::is_none")]
        api_key: Option<String>,

        /// Base URL for local or proxy deployments
        #[serde(default, skip_serializing_if = "Option::is_none")]
        base_url: Option<String>,
    },
}

/// Message log configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Cap on retained messages; `None` keeps everything
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_messages: Option<usize>,

    /// Token budget for context sent to a backend
    pub max_context_tokens: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_messages: None,
            max_context_tokens: 4096,
        }
    }
}

/// Event channel configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EventConfig {
    /// Broadcast buffer size per session
    pub buffer_size: usize,
}

impl Default for EventConfig {
    fn default() -> Self {
        Self { buffer_size: 100 }
    }
}

/// Builder for StorefrontConfig
pub struct ConfigBuilder {
    config: StorefrontConfig,
}

impl ConfigBuilder {
    /// Create a new configuration builder
    pub fn new() -> Self {
        Self {
            config: StorefrontConfig::default(),
        }
    }

    /// Set assistant configuration
    pub fn assistant(mut self, config: AssistantConfig) -> Self {
        self.config.assistant = config;
        self
    }

    /// Set retry configuration
    pub fn retry(mut self, config: RetryConfig) -> Self {
        self.config.retry = config;
        self
    }

    /// Set history configuration
    pub fn history(mut self, config: HistoryConfig) -> Self {
        self.config.history = config;
        self
    }

    /// Set event configuration
    pub fn events(mut self, config: EventConfig) -> Self {
        self.config.events = config;
        self
    }

    /// Build the configuration
    pub fn build(self) -> StorefrontConfig {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl StorefrontConfig {
    /// Load configuration from file and environment variables.
    ///
    /// Loads in this order:
    /// 1. Default configuration
    /// 2. `storefront.toml` in the working directory
    /// 3. The file named by `STOREFRONT_CONFIG_PATH`
    /// 4. `STOREFRONT_`-prefixed environment variables (`__` separates sections)
    ///
    /// # Errors
    ///
    /// Returns an error if a configuration source is invalid or the result
    /// fails validation.
    pub fn load() -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(StorefrontConfig::default()))
            .merge(Toml::file(CONFIG_FILE));

        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            figment = figment.merge(Toml::file(path));
        }

        Self::from_figment(figment.merge(Env::prefixed(ENV_PREFIX).split("__")))
    }

    /// Load configuration from a specific file path on top of the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be parsed or fails validation.
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        Self::from_figment(
            Figment::from(Serialized::defaults(StorefrontConfig::default()))
                .merge(Toml::file(path.as_ref())),
        )
    }

    /// Extract and validate from an arbitrary figment.
    pub fn from_figment(figment: Figment) -> Result<Self> {
        let config: StorefrontConfig = figment.extract().map_err(|e| {
            StorefrontError::Configuration(format!("Failed to load configuration: {}", e))
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error describing the first invalid setting.
    pub fn validate(&self) -> Result<()> {
        let assistant = &self.assistant;

        if assistant.greeting.trim().is_empty() {
            return Err(StorefrontError::Configuration(
                "assistant.greeting must not be empty".to_string(),
            ));
        }
        if assistant.placeholder_reply.trim().is_empty() {
            return Err(StorefrontError::Configuration(
                "assistant.placeholder_reply must not be empty".to_string(),
            ));
        }
        if assistant.failure_reply.trim().is_empty() {
            return Err(StorefrontError::Configuration(
                "assistant.failure_reply must not be empty".to_string(),
            ));
        }
        if assistant.reply_timeout.is_zero() {
            return Err(StorefrontError::Configuration(
                "assistant.reply_timeout must be greater than zero".to_string(),
            ));
        }
        if assistant.backend == BackendConfig::Placeholder
            && assistant.reply_delay >= assistant.reply_timeout
        {
            return Err(StorefrontError::Configuration(format!(
                "assistant.reply_delay ({:?}) must be shorter than assistant.reply_timeout ({:?})",
                assistant.reply_delay, assistant.reply_timeout
            )));
        }
        if let BackendConfig::OpenAI { model, .. } = &assistant.backend {
            if model.trim().is_empty() {
                return Err(StorefrontError::Configuration(
                    "assistant.backend.model must not be empty".to_string(),
                ));
            }
        }
        if let Some(max) = self.history.max_messages {
            // greeting plus at least one message
            if max < 2 {
                return Err(StorefrontError::Configuration(format!(
                    "history.max_messages must be at least 2, got {}",
                    max
                )));
            }
        }
        if self.events.buffer_size == 0 {
            return Err(StorefrontError::Configuration(
                "events.buffer_size must be greater than zero".to_string(),
            ));
        }
        if self.retry.max_attempts == 0 {
            return Err(StorefrontError::Configuration(
                "retry.max_attempts must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn with_toml(toml: &str) -> Result<StorefrontConfig> {
        StorefrontConfig::from_figment(
            Figment::from(Serialized::defaults(StorefrontConfig::default()))
                .merge(Toml::string(toml)),
        )
    }

    #[test]
    fn test_defaults_match_mock() {
        let config = StorefrontConfig::default();
        assert_eq!(config.assistant.reply_delay, Duration::from_millis(1000));
        assert_eq!(config.assistant.backend, BackendConfig::Placeholder);
        assert!(config.history.max_messages.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_toml_overrides() {
        let config = with_toml(
            r#"
            [assistant]
            reply_delay = "250ms"
            greeting = "Welcome back"

            [history]
            max_messages = 50
            "#,
        )
        .unwrap();

        assert_eq!(config.assistant.reply_delay, Duration::from_millis(250));
        assert_eq!(config.assistant.greeting, "Welcome back");
        assert_eq!(config.history.max_messages, Some(50));
        // untouched keys keep defaults
        assert_eq!(config.assistant.reply_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_openai_backend_section() {
        let config = with_toml(
            r#"
            [assistant.backend]
            type = "openai"
            model = "qwen3-8b"
            base_url = "http://localhost:8000/v1"
            "#,
        )
        .unwrap();

        assert_eq!(
            config.assistant.backend,
            BackendConfig::OpenAI {
                model: "qwen3-8b".to_string(),
                api_key: None,
                base_url: Some("http://localhost:8000/v1".to_string()),
            }
        );
    }

    #[test]
    fn test_validation_rejects_tiny_cap() {
        let err = with_toml("[history]\nmax_messages = 1\n").unwrap_err();
        assert!(matches!(err, StorefrontError::Configuration(_)));
    }

    #[test]
    fn test_validation_rejects_empty_greeting() {
        let err = with_toml("[assistant]\ngreeting = \"   \"\n").unwrap_err();
        assert!(err.to_string().contains("greeting"));
    }

    #[test]
    fn test_validation_rejects_placeholder_delay_past_timeout() {
        let err = with_toml("[assistant]\nreply_delay = \"45s\"\n").unwrap_err();
        assert!(matches!(err, StorefrontError::Configuration(_)));
        assert!(err.to_string().contains("reply_delay"));

        let err = with_toml("[assistant]\nreply_delay = \"5s\"\nreply_timeout = \"5s\"\n")
            .unwrap_err();
        assert!(err.to_string().contains("reply_timeout"));
    }

    #[test]
    fn test_slow_delay_allowed_with_longer_timeout() {
        let config =
            with_toml("[assistant]\nreply_delay = \"45s\"\nreply_timeout = \"60s\"\n").unwrap();
        assert_eq!(config.assistant.reply_delay, Duration::from_secs(45));
    }

    #[test]
    fn test_openai_backend_ignores_reply_delay() {
        let config = with_toml(
            r#"
            [assistant]
            reply_delay = "45s"

            [assistant.backend]
            type = "openai"
            model = "gpt-4o-mini"
            "#,
        )
        .unwrap();
        assert!(matches!(config.assistant.backend, BackendConfig::OpenAI { .. }));
    }

    #[test]
    fn test_retry_section_jitter_key() {
        let config = with_toml(
            r#"
            [retry]
            jitter = false
            max_attempts = 5
            initial_delay = "200ms"
            "#,
        )
        .unwrap();

        assert!(!config.retry.add_jitter);
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.retry.delay_for_attempt(0), Duration::from_millis(200));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[assistant]\nplaceholder_reply = \"On it!\"").unwrap();

        let config = StorefrontConfig::from_file(file.path()).unwrap();
        assert_eq!(config.assistant.placeholder_reply, "On it!");
    }

    #[test]
    fn test_builder() {
        let config = ConfigBuilder::new()
            .history(HistoryConfig {
                max_messages: Some(10),
                ..Default::default()
            })
            .build();
        assert_eq!(config.history.max_messages, Some(10));
    }
}

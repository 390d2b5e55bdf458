//! Factory for creating responders from configuration

use std::sync::Arc;

use crate::config::{AssistantConfig, BackendConfig, StorefrontConfig};
use crate::error::{Result, StorefrontError};

use super::openai::{DEFAULT_BASE_URL, OpenAIResponder};
use super::placeholder::PlaceholderResponder;
use super::Responder;

/// Factory for creating responders
pub struct ResponderFactory;

impl ResponderFactory {
    /// Create the responder selected by `assistant.backend`
    ///
    /// # Errors
    ///
    /// Returns an error if the backend needs an API key that is neither
    /// configured nor present in the environment.
    pub fn create(config: &StorefrontConfig) -> Result<Arc<dyn Responder>> {
        Self::create_for(&config.assistant, &config.retry.retryable_status_codes)
    }

    fn create_for(
        assistant: &AssistantConfig,
        retryable_status_codes: &[u16],
    ) -> Result<Arc<dyn Responder>> {
        match &assistant.backend {
            BackendConfig::Placeholder => {
                Ok(Arc::new(PlaceholderResponder::from_config(assistant)))
            }
            BackendConfig::OpenAI {
                model,
                api_key,
                base_url,
            } => {
                let responder = match (api_key, base_url) {
                    (Some(key), url) => OpenAIResponder::with_base_url(
                        key.clone(),
                        model.clone(),
                        url.clone().unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
                    ),
                    (None, Some(url)) => {
                        let key = std::env::var("OPENAI_API_KEY").map_err(|_| {
                            StorefrontError::Configuration(
                                "OpenAI backend needs assistant.backend.api_key or OPENAI_API_KEY"
                                    .to_string(),
                            )
                        })?;
                        OpenAIResponder::with_base_url(key, model.clone(), url.clone())
                    }
                    (None, None) => OpenAIResponder::from_env(Some(model.clone()))?,
                };

                tracing::info!(model = %model, base_url = %responder.base_url(), "Using OpenAI-compatible backend");
                Ok(Arc::new(
                    responder.with_retryable_status_codes(retryable_status_codes.to_vec()),
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_placeholder() {
        let responder = ResponderFactory::create(&StorefrontConfig::default()).unwrap();
        assert_eq!(responder.model_info().provider, "placeholder");
    }

    #[test]
    fn test_openai_with_inline_key() {
        let mut config = StorefrontConfig::default();
        config.assistant.backend = BackendConfig::OpenAI {
            model: "qwen3-8b".to_string(),
            api_key: Some("local".to_string()),
            base_url: Some("http://localhost:8000/v1".to_string()),
        };

        let responder = ResponderFactory::create(&config).unwrap();
        let info = responder.model_info();
        assert_eq!(info.provider, "openai");
        assert_eq!(info.model_name, "qwen3-8b");
    }
}

//! Scripted responder
//!
//! Waits a fixed delay and answers with a fixed string, whatever the user
//! said. This is the storefront widget's canned behaviour.

use async_trait::async_trait;
use std::time::Duration;

use crate::config::AssistantConfig;
use crate::error::Result;

use super::{ModelInfo, ReplyRequest, Responder};

/// Fixed reply after a fixed delay
#[derive(Debug, Clone)]
pub struct PlaceholderResponder {
    reply: String,
    delay: Duration,
}

impl PlaceholderResponder {
    /// Create a responder with the given reply and delay
    pub fn new(reply: impl Into<String>, delay: Duration) -> Self {
        Self {
            reply: reply.into(),
            delay,
        }
    }

    /// Build from assistant configuration
    pub fn from_config(config: &AssistantConfig) -> Self {
        Self::new(config.placeholder_reply.clone(), config.reply_delay)
    }

    pub fn reply(&self) -> &str {
        &self.reply
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }
}

impl Default for PlaceholderResponder {
    fn default() -> Self {
        Self::from_config(&AssistantConfig::default())
    }
}

#[async_trait]
impl Responder for PlaceholderResponder {
    async fn respond(&self, request: &ReplyRequest) -> Result<String> {
        tracing::debug!(
            request_id = %request.request_id,
            delay_ms = self.delay.as_millis() as u64,
            "Scheduling placeholder reply"
        );
        tokio::time::sleep(self.delay).await;
        Ok(self.reply.clone())
    }

    fn model_info(&self) -> ModelInfo {
        ModelInfo {
            provider: "placeholder".to_string(),
            model_name: "none".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_reply_ignores_user_text() {
        let responder = PlaceholderResponder::new("canned", Duration::from_millis(1000));

        let first = responder
            .respond(&ReplyRequest::from_text("red shoes"))
            .await
            .unwrap();
        let second = responder
            .respond(&ReplyRequest::from_text("blue hats"))
            .await
            .unwrap();

        assert_eq!(first, "canned");
        assert_eq!(second, "canned");
    }

    #[tokio::test(start_paused = true)]
    async fn test_reply_waits_for_delay() {
        let responder = PlaceholderResponder::new("canned", Duration::from_millis(1000));
        let start = tokio::time::Instant::now();

        responder.respond(&ReplyRequest::from_text("hi")).await.unwrap();

        assert!(start.elapsed() >= Duration::from_millis(1000));
    }

    #[test]
    fn test_defaults_from_config() {
        let responder = PlaceholderResponder::default();
        assert_eq!(responder.delay(), Duration::from_secs(1));
        assert_eq!(responder.model_info().provider, "placeholder");
    }
}

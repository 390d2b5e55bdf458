//! Assistant backends
//!
//! A [`Responder`] turns the conversation so far into a single reply. The
//! session never talks to a backend directly; it hands each submitted message
//! to a responder on a background task and appends whatever comes back.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::conversation::RequestId;
use crate::error::Result;

/// Reply text used when a backend answers with no content
pub const EMPTY_REPLY: &str = "No response generated.";

/// Role of a message in backend context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

/// A message as sent to a backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// Request handed to a responder for one user message
#[derive(Debug, Clone)]
pub struct ReplyRequest {
    /// Key of the in-flight reply
    pub request_id: RequestId,

    /// Text the user submitted
    pub user_text: String,

    /// Conversation context, system prompt first, ending with the user message
    pub context: Vec<ChatMessage>,
}

impl ReplyRequest {
    /// Request with no prior context
    pub fn from_text(text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            request_id: RequestId::new(),
            context: vec![ChatMessage::user(text.clone())],
            user_text: text,
        }
    }
}

/// Backend information
#[derive(Debug, Clone)]
pub struct ModelInfo {
    pub provider: String,
    pub model_name: String,
}

/// Produces assistant replies.
///
/// Implementations should return [`StorefrontError::Transient`] for failures
/// worth retrying and [`StorefrontError::Backend`] for everything else; the
/// session wraps calls in its retry policy and timeout.
///
/// [`StorefrontError::Transient`]: crate::error::StorefrontError::Transient
/// [`StorefrontError::Backend`]: crate::error::StorefrontError::Backend
#[async_trait]
pub trait Responder: Send + Sync {
    /// Produce the reply text for a request
    async fn respond(&self, request: &ReplyRequest) -> Result<String>;

    /// Get model information
    fn model_info(&self) -> ModelInfo {
        ModelInfo {
            provider: "unknown".to_string(),
            model_name: "unknown".to_string(),
        }
    }
}

pub mod factory;
pub mod openai;
pub mod placeholder;
pub mod retry;

pub use factory::ResponderFactory;
pub use openai::OpenAIResponder;
pub use placeholder::PlaceholderResponder;
pub use retry::{with_retry, RetryConfig, RetryState};

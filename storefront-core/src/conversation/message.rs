//! Message and identifier types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::assistant::ChatMessage;

/// Per-session message id, starting at 1 for the greeting
pub type MessageId = u64;

/// Session identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Key of one in-flight reply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(Uuid);

impl RequestId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Who wrote a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Author {
    User,
    Assistant,
}

/// One entry in the conversation log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Unique within the session, strictly increasing
    pub id: MessageId,
    /// Non-empty text
    pub content: String,
    pub author: Author,
    /// Captured when the message was appended
    pub created_at: DateTime<Utc>,
    /// For assistant replies, the user message being answered
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_reply_to: Option<MessageId>,
}

impl Message {
    pub fn is_user(&self) -> bool {
        self.author == Author::User
    }

    pub fn is_assistant(&self) -> bool {
        self.author == Author::Assistant
    }

    /// Rough token estimate (4 chars per token)
    pub fn estimate_tokens(&self) -> usize {
        self.content.len() / 4
    }

    /// Convert to backend context form
    pub fn to_chat_message(&self) -> ChatMessage {
        match self.author {
            Author::User => ChatMessage::user(self.content.clone()),
            Author::Assistant => ChatMessage::assistant(self.content.clone()),
        }
    }
}

/// A user message paired with its reply
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    /// Turn index (0-indexed, in submission order)
    pub index: usize,
    pub user: Message,
    /// `None` while the reply is still in flight
    pub reply: Option<Message>,
}

impl Turn {
    /// Check if the turn is complete
    pub fn is_complete(&self) -> bool {
        self.reply.is_some()
    }

    /// Estimate token count
    pub fn estimate_tokens(&self) -> usize {
        self.user.estimate_tokens()
            + self.reply.as_ref().map(|m| m.estimate_tokens()).unwrap_or(0)
    }
}

/// Returned by a successful submit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Submission {
    /// Id of the appended user message
    pub message_id: MessageId,
    /// Key of the scheduled reply
    pub request_id: RequestId,
}

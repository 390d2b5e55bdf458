//! # Storefront - chat sessions for the shop assistant widget
//!
//! Storefront provides the client-side half of a storefront's chat widget:
//! - Conversation sessions seeded with an assistant greeting
//! - Deferred replies from a pluggable assistant backend
//! - Timeout, retry and per-request cancellation for replies
//! - Session events for re-rendering without polling
//! - The product catalog contract behind the storefront grid
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use storefront_core::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = StorefrontConfig::load()?;
//!     let session = ConversationSession::from_config(&config)?;
//!
//!     session.submit("Do you have these in red?")?;
//!     session.wait_idle().await;
//!
//!     for message in session.messages() {
//!         println!("{}", message.content);
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Backends
//!
//! - `placeholder` (default): replies with fixed text after a fixed delay
//! - `openai`: any OpenAI-compatible chat completions endpoint

pub mod assistant;
pub mod catalog;
pub mod config;
pub mod conversation;
pub mod error;
pub mod events;

/// Current library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Re-export commonly used types
pub mod prelude {
    pub use crate::assistant::{
        ChatMessage, ChatRole, ModelInfo, OpenAIResponder, PlaceholderResponder, ReplyRequest,
        Responder, ResponderFactory, RetryConfig,
    };
    pub use crate::catalog::{
        CatalogQuery, CatalogService, Product, SortOrder, StaticCatalog, ViewMode,
    };
    pub use crate::config::{
        AssistantConfig, BackendConfig, ConfigBuilder, EventConfig, HistoryConfig,
        StorefrontConfig,
    };
    pub use crate::conversation::{
        Author, ConversationSession, FirstLastStrategy, Message, MessageId, MessageLog,
        ReplyOutcome, RequestId, SessionId, SessionState, SlidingWindowStrategy, Submission,
        TruncationStrategy, Turn,
    };
    pub use crate::error::{Result, StorefrontError};
    pub use crate::events::{event_channel, EventReceiver, EventSender, SessionEvent};
}

//! Conversation sessions
//!
//! A session owns an ordered message log seeded with an assistant greeting
//! and mediates the send/reply exchange with a [`Responder`].
//!
//! # Features
//!
//! - Session lifecycle (active, disposed)
//! - Deferred replies with timeout, retry and per-request cancellation
//! - Optional history cap that never reuses ids
//! - Context window truncation strategies
//!
//! # Example
//!
//! ```rust,ignore
//! use storefront_core::prelude::*;
//!
//! let config = StorefrontConfig::default();
//! let session = ConversationSession::from_config(&config)?;
//!
//! session.submit("Do you have these in red?")?;
//! session.wait_idle().await;
//!
//! for message in session.messages() {
//!     println!("[{}] {:?}: {}", message.id, message.author, message.content);
//! }
//! ```
//!
//! [`Responder`]: crate::assistant::Responder

mod history;
mod message;
mod reply;
mod session;
mod truncation;

pub use history::MessageLog;
pub use message::{Author, Message, MessageId, RequestId, SessionId, Submission, Turn};
pub use reply::ReplyOutcome;
pub use session::{ConversationSession, SessionState};
pub use truncation::{FirstLastStrategy, SlidingWindowStrategy, TruncationStrategy};

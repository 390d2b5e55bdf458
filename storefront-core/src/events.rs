//! Session events
//!
//! A session publishes an event whenever its log changes or a reply settles,
//! so a front end can re-render without polling.
//!
//! # Event Types
//!
//! - [`SessionEvent::MessageAppended`] - a message was added to the log
//! - [`SessionEvent::ReplyCompleted`] - an in-flight reply settled (any outcome)
//! - [`SessionEvent::SessionDisposed`] - the session was torn down
//!
//! # Example
//!
//! ```rust,ignore
//! let mut rx = session.subscribe();
//!
//! tokio::spawn(async move {
//!     while let Ok(event) = rx.recv().await {
//!         if let SessionEvent::MessageAppended { message, .. } = event {
//!             println!("{}: {}", message.id, message.content);
//!         }
//!     }
//! });
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::conversation::{Message, ReplyOutcome, RequestId, SessionId};

/// Events emitted by a conversation session
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    /// A message was appended to the log
    MessageAppended {
        session_id: SessionId,
        message: Message,
    },

    /// An in-flight reply settled
    ReplyCompleted {
        session_id: SessionId,
        request_id: RequestId,
        outcome: ReplyOutcome,
        timestamp: DateTime<Utc>,
    },

    /// The session was torn down
    SessionDisposed {
        session_id: SessionId,
        timestamp: DateTime<Utc>,
    },
}

impl SessionEvent {
    /// Get the event type as a string
    pub fn event_type(&self) -> &'static str {
        match self {
            SessionEvent::MessageAppended { .. } => "message_appended",
            SessionEvent::ReplyCompleted { .. } => "reply_completed",
            SessionEvent::SessionDisposed { .. } => "session_disposed",
        }
    }

    /// Get the session the event belongs to
    pub fn session_id(&self) -> SessionId {
        match self {
            SessionEvent::MessageAppended { session_id, .. }
            | SessionEvent::ReplyCompleted { session_id, .. }
            | SessionEvent::SessionDisposed { session_id, .. } => *session_id,
        }
    }
}

/// Sender half of an event channel
pub type EventSender = broadcast::Sender<SessionEvent>;

/// Receiver half of an event channel
pub type EventReceiver = broadcast::Receiver<SessionEvent>;

/// Creates a new event channel with the specified buffer capacity.
///
/// Slow receivers that fall more than `buffer_size` events behind observe
/// `RecvError::Lagged` and skip ahead.
pub fn event_channel(buffer_size: usize) -> (EventSender, EventReceiver) {
    broadcast::channel(buffer_size.max(1))
}

/// Emits events for one session
#[derive(Clone)]
pub(crate) struct EventEmitter {
    sender: EventSender,
    session_id: SessionId,
}

impl EventEmitter {
    pub(crate) fn new(sender: EventSender, session_id: SessionId) -> Self {
        Self { sender, session_id }
    }

    pub(crate) fn subscribe(&self) -> EventReceiver {
        self.sender.subscribe()
    }

    // send only fails when nobody is listening
    fn emit(&self, event: SessionEvent) {
        let _ = self.sender.send(event);
    }

    pub(crate) fn message_appended(&self, message: &Message) {
        self.emit(SessionEvent::MessageAppended {
            session_id: self.session_id,
            message: message.clone(),
        });
    }

    pub(crate) fn reply_completed(&self, request_id: RequestId, outcome: ReplyOutcome) {
        self.emit(SessionEvent::ReplyCompleted {
            session_id: self.session_id,
            request_id,
            outcome,
            timestamp: Utc::now(),
        });
    }

    pub(crate) fn session_disposed(&self) {
        self.emit(SessionEvent::SessionDisposed {
            session_id: self.session_id,
            timestamp: Utc::now(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::Author;

    fn sample_message() -> Message {
        Message {
            id: 2,
            content: "red shoes".to_string(),
            author: Author::User,
            created_at: Utc::now(),
            in_reply_to: None,
        }
    }

    #[test]
    fn test_event_serialization() {
        let event = SessionEvent::MessageAppended {
            session_id: SessionId::new(),
            message: sample_message(),
        };

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"message_appended\""));

        let parsed: SessionEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.event_type(), "message_appended");
    }

    #[tokio::test]
    async fn test_emitter_broadcasts_in_order() {
        let (tx, mut rx) = event_channel(10);
        let session_id = SessionId::new();
        let emitter = EventEmitter::new(tx, session_id);

        emitter.message_appended(&sample_message());
        emitter.reply_completed(RequestId::new(), ReplyOutcome::TimedOut);
        emitter.session_disposed();

        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }

        assert_eq!(events.len(), 3);
        assert_eq!(events[0].event_type(), "message_appended");
        assert_eq!(events[1].event_type(), "reply_completed");
        assert_eq!(events[2].event_type(), "session_disposed");
        assert!(events.iter().all(|e| e.session_id() == session_id));
    }

    #[test]
    fn test_emit_without_listeners_is_silent() {
        let (tx, rx) = event_channel(1);
        drop(rx);
        EventEmitter::new(tx, SessionId::new()).session_disposed();
    }
}

//! Conversation session

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::assistant::retry::RetryConfig;
use crate::assistant::{ChatMessage, ReplyRequest, Responder, ResponderFactory, EMPTY_REPLY};
use crate::config::StorefrontConfig;
use crate::error::{Result, StorefrontError};
use crate::events::{event_channel, EventEmitter, EventReceiver};

use super::history::MessageLog;
use super::message::{Author, Message, MessageId, RequestId, SessionId, Submission, Turn};
use super::reply::{ReplyJob, ReplyOutcome};
use super::truncation::{SlidingWindowStrategy, TruncationStrategy};

/// Session state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    /// Accepting messages
    Active,
    /// Torn down; submits are rejected and late replies dropped
    Disposed,
}

struct PendingReply {
    message_id: MessageId,
    token: CancellationToken,
}

struct SessionInner {
    log: MessageLog,
    state: SessionState,
    pending: HashMap<RequestId, PendingReply>,
}

/// State shared between a session and its reply tasks.
///
/// Reply tasks only ever hold a `Weak` to this.
pub(crate) struct SessionShared {
    id: SessionId,
    inner: Mutex<SessionInner>,
    events: EventEmitter,
    pending_count: watch::Sender<usize>,
    failure_reply: String,
}

impl SessionShared {
    fn lock(&self) -> MutexGuard<'_, SessionInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Settle an in-flight reply
    pub(crate) fn complete_reply(
        &self,
        request_id: RequestId,
        in_reply_to: MessageId,
        outcome: ReplyOutcome,
    ) {
        let mut inner = self.lock();

        if inner.state == SessionState::Disposed {
            return;
        }
        if inner.pending.remove(&request_id).is_none() {
            tracing::debug!(%request_id, "Reply already settled, ignoring");
            return;
        }
        self.pending_count.send_replace(inner.pending.len());

        let content = match &outcome {
            ReplyOutcome::Replied(text) if text.trim().is_empty() => Some(EMPTY_REPLY.to_string()),
            ReplyOutcome::Replied(text) => Some(text.clone()),
            ReplyOutcome::TimedOut | ReplyOutcome::Failed(_) => {
                tracing::warn!(
                    session_id = %self.id,
                    %request_id,
                    ?outcome,
                    "Reply failed, appending failure notice"
                );
                Some(self.failure_reply.clone())
            }
            ReplyOutcome::Cancelled => None,
        };

        if let Some(content) = content {
            let message = inner.log.append(Author::Assistant, content, Some(in_reply_to));
            tracing::debug!(session_id = %self.id, id = message.id, in_reply_to, "Appended reply");
            self.events.message_appended(message);
        }

        self.events.reply_completed(request_id, outcome);
    }
}

/// A conversation session.
///
/// Owns the message log and mediates the send/reply exchange. Created with a
/// seeded assistant greeting (id 1); every accepted [`submit`] appends a user
/// message right away and schedules exactly one assistant reply.
///
/// Dropping the session disposes it: in-flight replies are cancelled and
/// anything that still completes is discarded.
///
/// [`submit`]: ConversationSession::submit
pub struct ConversationSession {
    shared: Arc<SessionShared>,
    responder: Arc<dyn Responder>,
    strategy: Arc<dyn TruncationStrategy>,
    system_prompt: Option<String>,
    max_context_tokens: usize,
    retry: RetryConfig,
    reply_timeout: Duration,
    runtime: Handle,
    shutdown: CancellationToken,
}

impl ConversationSession {
    /// Create a session that gets replies from `responder`.
    ///
    /// # Errors
    ///
    /// Returns an error when called outside a Tokio runtime.
    pub fn new(config: &StorefrontConfig, responder: Arc<dyn Responder>) -> Result<Self> {
        let runtime = Handle::try_current().map_err(|_| {
            StorefrontError::Configuration(
                "ConversationSession must be created inside a Tokio runtime".to_string(),
            )
        })?;

        let id = SessionId::new();
        let (sender, _) = event_channel(config.events.buffer_size);
        let (pending_count, _) = watch::channel(0);

        let log = MessageLog::new(config.assistant.greeting.clone())
            .with_max_messages(config.history.max_messages);

        tracing::info!(
            session_id = %id,
            provider = %responder.model_info().provider,
            "Conversation session created"
        );

        Ok(Self {
            shared: Arc::new(SessionShared {
                id,
                inner: Mutex::new(SessionInner {
                    log,
                    state: SessionState::Active,
                    pending: HashMap::new(),
                }),
                events: EventEmitter::new(sender, id),
                pending_count,
                failure_reply: config.assistant.failure_reply.clone(),
            }),
            responder,
            strategy: Arc::new(SlidingWindowStrategy::new()),
            system_prompt: config.assistant.system_prompt.clone(),
            max_context_tokens: config.history.max_context_tokens,
            retry: config.retry.clone(),
            reply_timeout: config.assistant.reply_timeout,
            runtime,
            shutdown: CancellationToken::new(),
        })
    }

    /// Create a session with the backend named in the configuration
    pub fn from_config(config: &StorefrontConfig) -> Result<Self> {
        Self::new(config, ResponderFactory::create(config)?)
    }

    /// Use a different context truncation strategy
    pub fn with_truncation_strategy(mut self, strategy: Arc<dyn TruncationStrategy>) -> Self {
        self.strategy = strategy;
        self
    }

    /// Get the session ID
    pub fn id(&self) -> SessionId {
        self.shared.id
    }

    /// Get the session state
    pub fn state(&self) -> SessionState {
        self.shared.lock().state
    }

    /// Check if session is active
    pub fn is_active(&self) -> bool {
        self.state() == SessionState::Active
    }

    /// Submit user text.
    ///
    /// The trimmed text is appended as a user message and a reply is
    /// scheduled; this returns without waiting for the reply.
    ///
    /// # Errors
    ///
    /// - [`StorefrontError::InvalidInput`] if the text is empty or whitespace;
    ///   nothing is appended and no reply is scheduled.
    /// - [`StorefrontError::SessionDisposed`] after [`dispose`](Self::dispose).
    pub fn submit(&self, text: &str) -> Result<Submission> {
        let text = text.trim();
        if text.is_empty() {
            tracing::debug!(session_id = %self.shared.id, "Ignoring empty submission");
            return Err(StorefrontError::InvalidInput);
        }

        let mut inner = self.shared.lock();
        if inner.state == SessionState::Disposed {
            return Err(StorefrontError::SessionDisposed);
        }

        let message_id = inner.log.append(Author::User, text, None).id;
        let request_id = RequestId::new();
        let context = self.strategy.truncate(
            &inner.log,
            self.system_prompt.as_deref(),
            self.max_context_tokens,
        );

        let token = self.shutdown.child_token();
        inner.pending.insert(
            request_id,
            PendingReply {
                message_id,
                token: token.clone(),
            },
        );
        self.shared.pending_count.send_replace(inner.pending.len());

        if let Some(message) = inner.log.get(message_id) {
            self.shared.events.message_appended(message);
        }
        drop(inner);

        tracing::debug!(
            session_id = %self.shared.id,
            id = message_id,
            %request_id,
            "Appended user message, reply scheduled"
        );

        let job = ReplyJob {
            request: ReplyRequest {
                request_id,
                user_text: text.to_string(),
                context,
            },
            in_reply_to: message_id,
            responder: Arc::clone(&self.responder),
            retry: self.retry.clone(),
            timeout: self.reply_timeout,
            token,
        };
        self.runtime.spawn(job.run(Arc::downgrade(&self.shared)));

        Ok(Submission {
            message_id,
            request_id,
        })
    }

    /// Snapshot of the log in display order
    pub fn messages(&self) -> Vec<Message> {
        self.shared.lock().log.to_vec()
    }

    /// Number of messages in the log
    pub fn len(&self) -> usize {
        self.shared.lock().log.len()
    }

    /// Always false: the greeting is always present
    pub fn is_empty(&self) -> bool {
        false
    }

    /// User messages paired with their replies
    pub fn turns(&self) -> Vec<Turn> {
        self.shared.lock().log.turns()
    }

    /// Number of replies still in flight
    pub fn pending(&self) -> usize {
        self.shared.lock().pending.len()
    }

    /// The user message a pending request answers
    pub fn pending_message(&self, request_id: RequestId) -> Option<MessageId> {
        self.shared
            .lock()
            .pending
            .get(&request_id)
            .map(|p| p.message_id)
    }

    /// Cancel one in-flight reply.
    ///
    /// Returns false if the request already settled or never existed. A
    /// cancelled reply appends nothing.
    pub fn cancel(&self, request_id: RequestId) -> bool {
        let mut inner = self.shared.lock();
        let Some(pending) = inner.pending.remove(&request_id) else {
            return false;
        };
        pending.token.cancel();
        self.shared.pending_count.send_replace(inner.pending.len());
        drop(inner);

        tracing::debug!(session_id = %self.shared.id, %request_id, "Reply cancelled");
        self.shared
            .events
            .reply_completed(request_id, ReplyOutcome::Cancelled);
        true
    }

    /// Wait until no replies are in flight
    pub async fn wait_idle(&self) {
        let mut rx = self.shared.pending_count.subscribe();
        // the sender lives in `shared`, which outlives this borrow
        let _ = rx.wait_for(|pending| *pending == 0).await;
    }

    /// Subscribe to session events
    pub fn subscribe(&self) -> EventReceiver {
        self.shared.events.subscribe()
    }

    /// Backend context for the current log, as the next reply would see it
    pub fn context(&self) -> Vec<ChatMessage> {
        self.context_with(self.strategy.as_ref(), self.max_context_tokens)
    }

    /// Backend context built with an explicit strategy and token budget
    pub fn context_with(
        &self,
        strategy: &dyn TruncationStrategy,
        max_tokens: usize,
    ) -> Vec<ChatMessage> {
        let inner = self.shared.lock();
        strategy.truncate(&inner.log, self.system_prompt.as_deref(), max_tokens)
    }

    /// Tear the session down.
    ///
    /// Cancels every in-flight reply and rejects further submits. Idempotent.
    pub fn dispose(&self) {
        let mut inner = self.shared.lock();
        if inner.state == SessionState::Disposed {
            return;
        }
        inner.state = SessionState::Disposed;
        let cancelled = inner.pending.len();
        inner.pending.clear();
        self.shutdown.cancel();
        self.shared.pending_count.send_replace(0);
        drop(inner);

        tracing::info!(session_id = %self.shared.id, cancelled, "Conversation session disposed");
        self.shared.events.session_disposed();
    }
}

impl Drop for ConversationSession {
    fn drop(&mut self) {
        self.dispose();
    }
}

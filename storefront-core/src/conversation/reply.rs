//! Deferred reply tasks
//!
//! Each submitted message gets one task that asks the responder for a reply
//! under the session's timeout and retry policy. The task only holds a weak
//! reference to session state and a cancellation token, so a torn-down
//! session simply swallows the result.

use serde::{Deserialize, Serialize};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::assistant::retry::{with_retry, RetryConfig};
use crate::assistant::{ReplyRequest, Responder};
use crate::error::{Result, StorefrontError};

use super::message::MessageId;
use super::session::SessionShared;

/// How an in-flight reply ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum ReplyOutcome {
    /// Backend produced a reply
    Replied(String),
    /// Reply did not arrive within the timeout
    TimedOut,
    /// Backend failed after retries
    Failed(String),
    /// Reply was cancelled before it arrived
    Cancelled,
}

impl ReplyOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ReplyOutcome::Replied(_))
    }

    /// Reply text, or the error the reply ended with
    pub fn into_result(self) -> Result<String> {
        match self {
            ReplyOutcome::Replied(text) => Ok(text),
            ReplyOutcome::TimedOut => Err(StorefrontError::Timeout),
            ReplyOutcome::Failed(reason) => Err(StorefrontError::Backend(reason)),
            ReplyOutcome::Cancelled => Err(StorefrontError::Other("reply cancelled".to_string())),
        }
    }
}

/// Everything a reply task needs besides the session itself
pub(crate) struct ReplyJob {
    pub request: ReplyRequest,
    pub in_reply_to: MessageId,
    pub responder: Arc<dyn Responder>,
    pub retry: RetryConfig,
    pub timeout: Duration,
    pub token: CancellationToken,
}

impl ReplyJob {
    /// Ask the responder, honouring cancellation, timeout and retries
    pub(crate) async fn produce(&self) -> ReplyOutcome {
        let attempt = with_retry(&self.retry, || self.responder.respond(&self.request));

        tokio::select! {
            _ = self.token.cancelled() => ReplyOutcome::Cancelled,
            result = tokio::time::timeout(self.timeout, attempt) => match result {
                Ok(Ok(text)) => ReplyOutcome::Replied(text),
                Ok(Err(e)) => ReplyOutcome::Failed(e.to_string()),
                Err(_) => ReplyOutcome::TimedOut,
            },
        }
    }

    /// Run to completion and hand the outcome to the session, if it still exists
    pub(crate) async fn run(self, session: Weak<SessionShared>) {
        let outcome = self.produce().await;

        match session.upgrade() {
            Some(shared) => shared.complete_reply(self.request.request_id, self.in_reply_to, outcome),
            None => tracing::debug!(
                request_id = %self.request.request_id,
                "Session disposed before reply arrived, dropping it"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assistant::PlaceholderResponder;
    use async_trait::async_trait;

    struct Failing;

    #[async_trait]
    impl Responder for Failing {
        async fn respond(&self, _request: &ReplyRequest) -> Result<String> {
            Err(StorefrontError::Backend("model not found".into()))
        }
    }

    fn job(responder: Arc<dyn Responder>, timeout: Duration) -> ReplyJob {
        ReplyJob {
            request: ReplyRequest::from_text("red shoes"),
            in_reply_to: 2,
            responder,
            retry: RetryConfig::no_retry(),
            timeout,
            token: CancellationToken::new(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_produce_replied() {
        let responder = Arc::new(PlaceholderResponder::new("ok", Duration::from_millis(1000)));
        let outcome = job(responder, Duration::from_secs(5)).produce().await;
        assert_eq!(outcome, ReplyOutcome::Replied("ok".into()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_produce_timed_out() {
        let responder = Arc::new(PlaceholderResponder::new("late", Duration::from_secs(10)));
        let outcome = job(responder, Duration::from_secs(1)).produce().await;
        assert_eq!(outcome, ReplyOutcome::TimedOut);
    }

    #[tokio::test]
    async fn test_produce_failed() {
        let outcome = job(Arc::new(Failing), Duration::from_secs(1)).produce().await;
        assert!(matches!(outcome, ReplyOutcome::Failed(reason) if reason.contains("model not found")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_produce_cancelled() {
        let responder = Arc::new(PlaceholderResponder::new("ok", Duration::from_secs(1)));
        let job = job(responder, Duration::from_secs(5));
        job.token.cancel();
        assert_eq!(job.produce().await, ReplyOutcome::Cancelled);
    }

    #[test]
    fn test_outcome_serialization() {
        let json = serde_json::to_string(&ReplyOutcome::Failed("boom".into())).unwrap();
        assert_eq!(json, r#"{"status":"failed","detail":"boom"}"#);
        assert!(!ReplyOutcome::TimedOut.is_success());
        assert!(matches!(
            ReplyOutcome::TimedOut.into_result(),
            Err(StorefrontError::Timeout)
        ));
    }
}

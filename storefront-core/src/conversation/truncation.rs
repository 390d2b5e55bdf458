//! Context window truncation strategies
//!
//! The session keeps its full log for display; these strategies only decide
//! which part of it a backend gets to see.

use crate::assistant::ChatMessage;

use super::history::MessageLog;
use super::message::Message;

/// Trait for truncation strategies
pub trait TruncationStrategy: Send + Sync {
    /// Build backend context that fits within `max_tokens`
    fn truncate(
        &self,
        log: &MessageLog,
        system_prompt: Option<&str>,
        max_tokens: usize,
    ) -> Vec<ChatMessage>;

    /// Get the strategy name
    fn name(&self) -> &'static str;
}

fn system_tokens(system_prompt: Option<&str>) -> usize {
    system_prompt.map(|s| s.len() / 4).unwrap_or(0)
}

/// Sliding window strategy - keeps the most recent messages
#[derive(Debug, Clone)]
pub struct SlidingWindowStrategy {
    /// Minimum number of trailing messages to keep
    min_messages: usize,
}

impl SlidingWindowStrategy {
    pub fn new() -> Self {
        Self { min_messages: 1 }
    }

    /// Set minimum messages to keep
    pub fn with_min_messages(mut self, min: usize) -> Self {
        self.min_messages = min.max(1);
        self
    }
}

impl Default for SlidingWindowStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl TruncationStrategy for SlidingWindowStrategy {
    fn truncate(
        &self,
        log: &MessageLog,
        system_prompt: Option<&str>,
        max_tokens: usize,
    ) -> Vec<ChatMessage> {
        let messages: Vec<&Message> = log.iter().collect();
        let budget = max_tokens.saturating_sub(system_tokens(system_prompt));
        let max_start = messages.len().saturating_sub(self.min_messages);

        let mut start = 0;
        let mut total: usize = messages.iter().map(|m| m.estimate_tokens()).sum();
        while start < max_start && total > budget {
            total -= messages[start].estimate_tokens();
            start += 1;
        }

        log.messages_to_chat(system_prompt, messages[start..].iter().copied())
    }

    fn name(&self) -> &'static str {
        "sliding_window"
    }
}

/// First N + Last M strategy - keeps the opening and the latest exchange
#[derive(Debug, Clone)]
pub struct FirstLastStrategy {
    first_n: usize,
    last_m: usize,
}

impl FirstLastStrategy {
    pub fn new(first_n: usize, last_m: usize) -> Self {
        Self {
            first_n: first_n.max(1),
            last_m: last_m.max(1),
        }
    }
}

impl TruncationStrategy for FirstLastStrategy {
    fn truncate(
        &self,
        log: &MessageLog,
        system_prompt: Option<&str>,
        max_tokens: usize,
    ) -> Vec<ChatMessage> {
        let messages: Vec<&Message> = log.iter().collect();
        let total = messages.len();

        if total <= self.first_n + self.last_m {
            return log.to_chat_messages(system_prompt);
        }

        let tail = &messages[total - self.last_m..];
        let combined: Vec<&Message> = messages[..self.first_n]
            .iter()
            .chain(tail.iter())
            .copied()
            .collect();

        let tokens: usize = combined.iter().map(|m| m.estimate_tokens()).sum();
        if system_tokens(system_prompt) + tokens <= max_tokens {
            return log.messages_to_chat(system_prompt, combined);
        }

        // fall back to just the tail
        log.messages_to_chat(system_prompt, tail.iter().copied())
    }

    fn name(&self) -> &'static str {
        "first_last"
    }
}

//! Append-only message log

use chrono::Utc;
use std::collections::{HashMap, VecDeque};

use crate::assistant::ChatMessage;

use super::message::{Author, Message, MessageId, Turn};

/// Ordered message log with a pinned greeting.
///
/// Ids are assigned at append time from a counter that never goes backwards,
/// so eviction under a size cap never causes an id to be reused.
#[derive(Debug, Clone)]
pub struct MessageLog {
    greeting: Message,
    entries: VecDeque<Message>,
    last_id: MessageId,
    max_messages: Option<usize>,
    evicted: usize,
}

impl MessageLog {
    /// Create a log seeded with an assistant greeting (id 1)
    pub fn new(greeting: impl Into<String>) -> Self {
        Self {
            greeting: Message {
                id: 1,
                content: greeting.into(),
                author: Author::Assistant,
                created_at: Utc::now(),
                in_reply_to: None,
            },
            entries: VecDeque::new(),
            last_id: 1,
            max_messages: None,
            evicted: 0,
        }
    }

    /// Cap the number of retained messages, greeting included
    pub fn with_max_messages(mut self, max: Option<usize>) -> Self {
        self.max_messages = max.map(|m| m.max(2));
        self.enforce_cap();
        self
    }

    /// Append a message, assigning the next id
    pub fn append(
        &mut self,
        author: Author,
        content: impl Into<String>,
        in_reply_to: Option<MessageId>,
    ) -> &Message {
        self.last_id += 1;
        self.entries.push_back(Message {
            id: self.last_id,
            content: content.into(),
            author,
            created_at: Utc::now(),
            in_reply_to,
        });
        self.enforce_cap();

        // enforce_cap never evicts the newest entry because max >= 2
        &self.entries[self.entries.len() - 1]
    }

    fn enforce_cap(&mut self) {
        if let Some(max) = self.max_messages {
            while 1 + self.entries.len() > max {
                if let Some(dropped) = self.entries.pop_front() {
                    tracing::trace!(id = dropped.id, "Evicting message from log");
                    self.evicted += 1;
                }
            }
        }
    }

    /// The seeded greeting
    pub fn greeting(&self) -> &Message {
        &self.greeting
    }

    /// All retained messages in display order
    pub fn iter(&self) -> impl Iterator<Item = &Message> {
        std::iter::once(&self.greeting).chain(self.entries.iter())
    }

    /// Snapshot of the retained messages
    pub fn to_vec(&self) -> Vec<Message> {
        self.iter().cloned().collect()
    }

    /// Look up a retained message by id
    pub fn get(&self, id: MessageId) -> Option<&Message> {
        self.iter().find(|m| m.id == id)
    }

    /// Highest id handed out so far
    pub fn last_id(&self) -> MessageId {
        self.last_id
    }

    /// Number of retained messages
    pub fn len(&self) -> usize {
        1 + self.entries.len()
    }

    /// Always false: the greeting is always present
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Number of messages dropped by the cap
    pub fn evicted(&self) -> usize {
        self.evicted
    }

    /// Pair user messages with their replies.
    ///
    /// Replies whose user message was evicted are skipped.
    pub fn turns(&self) -> Vec<Turn> {
        let mut replies: HashMap<MessageId, &Message> = HashMap::new();
        for message in &self.entries {
            if let (Author::Assistant, Some(parent)) = (message.author, message.in_reply_to) {
                replies.insert(parent, message);
            }
        }

        self.entries
            .iter()
            .filter(|m| m.is_user())
            .enumerate()
            .map(|(index, user)| Turn {
                index,
                user: user.clone(),
                reply: replies.get(&user.id).map(|m| (*m).clone()),
            })
            .collect()
    }

    /// Convert to backend context
    pub fn to_chat_messages(&self, system_prompt: Option<&str>) -> Vec<ChatMessage> {
        self.messages_to_chat(system_prompt, self.iter())
    }

    /// Convert a subset of messages to backend context
    pub fn messages_to_chat<'a>(
        &self,
        system_prompt: Option<&str>,
        messages: impl IntoIterator<Item = &'a Message>,
    ) -> Vec<ChatMessage> {
        let mut chat = Vec::new();

        if let Some(system) = system_prompt {
            chat.push(ChatMessage::system(system));
        }

        chat.extend(messages.into_iter().map(Message::to_chat_message));
        chat
    }

    /// Estimate total token count
    pub fn estimate_tokens(&self) -> usize {
        self.iter().map(Message::estimate_tokens).sum()
    }
}

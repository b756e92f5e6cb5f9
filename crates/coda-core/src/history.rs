//! Append-only conversation history.

use crate::types::{ChatMessage, Role};
use std::fmt;

/// Ordered record of the exchange, replayed to the model on every request.
///
/// Messages can only be appended. [`ConversationHistory::snapshot`] hands out
/// an owned copy so callers cannot reach the stored turns.
#[derive(Debug, Clone, Default)]
pub struct ConversationHistory {
    messages: Vec<ChatMessage>,
}

impl ConversationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a user turn. Empty text is kept.
    pub fn append_user(&mut self, text: impl Into<String>) {
        self.messages.push(ChatMessage::user(text));
    }

    /// Append an assistant turn. Empty text is kept.
    pub fn append_assistant(&mut self, text: impl Into<String>) {
        self.messages.push(ChatMessage::assistant(text));
    }

    pub fn snapshot(&self) -> Vec<ChatMessage> {
        self.messages.clone()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChatMessage> {
        self.messages.iter()
    }
}

impl fmt::Display for ConversationHistory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for message in &self.messages {
            let label = match message.role {
                Role::User => "User",
                Role::Assistant => "Assistant",
            };
            writeln!(f, "{}: {}", label, message.content)?;
        }
        Ok(())
    }
}

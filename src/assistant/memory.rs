//! Sliding-window conversation memory.

use std::collections::VecDeque;
use std::sync::RwLock;

use crate::llm::{Message, MessageRole};

/// Default number of messages kept in the window.
pub const DEFAULT_WINDOW: usize = 10;

/// Keeps the most recent `max_messages` user/assistant messages.
///
/// The system prompt is never stored here; callers prepend it when building
/// a request.
#[derive(Debug)]
pub struct ChatMemory {
    max_messages: usize,
    messages: RwLock<VecDeque<Message>>,
}

impl Default for ChatMemory {
    fn default() -> Self {
        Self::with_max_messages(DEFAULT_WINDOW)
    }
}

impl ChatMemory {
    #[must_use]
    pub fn with_max_messages(max_messages: usize) -> Self {
        Self {
            max_messages: max_messages.max(1),
            messages: RwLock::new(VecDeque::new()),
        }
    }

    /// Append a message, evicting the oldest once the window is full.
    pub fn add(&self, message: Message) {
        debug_assert!(message.role != MessageRole::System);
        let mut guard = self
            .messages
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        guard.push_back(message);
        while guard.len() > self.max_messages {
            guard.pop_front();
        }
    }

    /// Snapshot of the window, oldest first.
    #[must_use]
    pub fn messages(&self) -> Vec<Message> {
        self.messages
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }

    /// `system` followed by the window.
    #[must_use]
    pub fn messages_with_system(&self, system: &str) -> Vec<Message> {
        let mut out = Vec::with_capacity(self.max_messages + 1);
        out.push(Message::system(system));
        out.extend(self.messages());
        out
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.messages
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_evicts_oldest() {
        let memory = ChatMemory::with_max_messages(3);
        for i in 0..5 {
            memory.add(Message::user(format!("m{i}")));
        }
        let contents: Vec<_> = memory.messages().into_iter().map(|m| m.content).collect();
        assert_eq!(contents, ["m2", "m3", "m4"]);
    }

    #[test]
    fn test_system_prompt_is_prepended() {
        let memory = ChatMemory::default();
        assert!(memory.is_empty());
        memory.add(Message::user("hi"));
        let messages = memory.messages_with_system("be nice");
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, MessageRole::System);
        assert_eq!(memory.len(), 1);
    }
}

//! Chat
//!
//! Single global room. Append-only log with newest-first pagination;
//! messages are written through the document store and fanned out to the
//! push channel by the caller.

use crate::services::DocumentStore;
use crate::types::ChatMessage;
use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tracing::warn;

const COLLECTION: &str = "chat";

/// Maximum accepted message length after trimming.
pub const MAX_MESSAGE_LEN: usize = 2000;

/// Page size ceiling for reads.
pub const MAX_PAGE_LIMIT: usize = 100;

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("Message must be 1..{MAX_MESSAGE_LEN} characters")]
    InvalidMessage,
}

impl ChatError {
    pub fn code(&self) -> &'static str {
        match self {
            ChatError::InvalidMessage => "INVALID_MESSAGE",
        }
    }
}

/// A page of chat history, newest first.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ChatPage {
    pub messages: Vec<ChatMessage>,
    pub total: usize,
}

/// The global chat room.
pub struct ChatLog {
    messages: Mutex<Vec<ChatMessage>>,
    store: Arc<dyn DocumentStore>,
}

impl ChatLog {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        let mut messages: Vec<ChatMessage> = store
            .keys(COLLECTION)
            .into_iter()
            .filter_map(|key| store.get(COLLECTION, &key))
            .filter_map(|value| match serde_json::from_str(&value) {
                Ok(message) => Some(message),
                Err(e) => {
                    warn!("Skipping unreadable chat message: {}", e);
                    None
                }
            })
            .collect();
        messages.sort_by_key(|m: &ChatMessage| m.wall_timestamp);

        Self {
            messages: Mutex::new(messages),
            store,
        }
    }

    /// Validate, append and return a new message.
    pub fn post(
        &self,
        user_id: &str,
        display_name: &str,
        text: &str,
        sim_timestamp: DateTime<Utc>,
    ) -> Result<ChatMessage, ChatError> {
        let text = text.trim();
        if text.is_empty() || text.chars().count() > MAX_MESSAGE_LEN {
            return Err(ChatError::InvalidMessage);
        }

        let message = ChatMessage::new(user_id, display_name, text.to_string(), sim_timestamp);
        if let Ok(json) = serde_json::to_string(&message) {
            self.store.put(COLLECTION, &message.id, json);
        }
        self.messages
            .lock()
            .expect("chat log lock poisoned")
            .push(message.clone());
        Ok(message)
    }

    /// Newest-first window plus total count. `limit` is clamped to
    /// 1..=[`MAX_PAGE_LIMIT`].
    pub fn get_messages(&self, limit: usize, offset: usize) -> ChatPage {
        let limit = limit.clamp(1, MAX_PAGE_LIMIT);
        let messages = self.messages.lock().expect("chat log lock poisoned");
        let total = messages.len();
        let page = messages
            .iter()
            .rev()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect();
        ChatPage {
            messages: page,
            total,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::MemoryStore;

    fn chat() -> ChatLog {
        ChatLog::new(Arc::new(MemoryStore::new()))
    }

    #[test]
    fn test_post_and_read_newest_first() {
        let chat = chat();
        for i in 0..5 {
            chat.post("u1", "User One", &format!("message {}", i), Utc::now())
                .unwrap();
        }

        let page = chat.get_messages(3, 0);
        assert_eq!(page.total, 5);
        assert_eq!(page.messages.len(), 3);
        assert_eq!(page.messages[0].text, "message 4");
        assert_eq!(page.messages[2].text, "message 2");
    }

    #[test]
    fn test_offset_pages_backwards() {
        let chat = chat();
        for i in 0..5 {
            chat.post("u1", "User One", &format!("message {}", i), Utc::now())
                .unwrap();
        }

        let page = chat.get_messages(3, 3);
        assert_eq!(page.messages.len(), 2);
        assert_eq!(page.messages[0].text, "message 1");
        assert_eq!(page.messages[1].text, "message 0");
    }

    #[test]
    fn test_limit_is_clamped() {
        let chat = chat();
        for i in 0..150 {
            chat.post("u1", "User One", &format!("m{}", i), Utc::now())
                .unwrap();
        }
        let page = chat.get_messages(500, 0);
        assert_eq!(page.messages.len(), MAX_PAGE_LIMIT);
    }

    #[test]
    fn test_validation() {
        let chat = chat();
        assert!(chat.post("u1", "User One", "   ", Utc::now()).is_err());
        assert!(chat
            .post("u1", "User One", &"x".repeat(2001), Utc::now())
            .is_err());
        let edge = chat
            .post("u1", "User One", &"x".repeat(2000), Utc::now())
            .unwrap();
        assert_eq!(edge.text.len(), 2000);
    }
}

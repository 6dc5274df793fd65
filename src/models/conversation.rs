use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::message::{Message, Role};
use crate::config::{NEW_CHAT_TITLE, TITLE_MAX_CHARS};

#[derive(Debug, Clone)]
pub struct Conversation {
    pub id: String,
    pub title: String,
    /// Shared so a session can tell a re-passed list from a new one by pointer.
    pub messages: Arc<Vec<Message>>,
    pub created_at: DateTime<Utc>,
}

impl Conversation {
    pub fn new(id: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            title: NEW_CHAT_TITLE.to_string(),
            messages: Arc::new(Vec::new()),
            created_at,
        }
    }

    pub fn set_messages(&mut self, messages: Arc<Vec<Message>>) {
        self.title = derive_title(&messages);
        self.messages = messages;
    }
}

/// Title shown for a conversation: its first question, cut at 40 characters.
pub fn derive_title(messages: &[Message]) -> String {
    let Some(first) = messages.iter().find(|m| m.role == Role::User) else {
        return NEW_CHAT_TITLE.to_string();
    };

    let mut chars = first.content.chars();
    let head: String = chars.by_ref().take(TITLE_MAX_CHARS).collect();
    if chars.next().is_some() {
        format!("{}...", head)
    } else {
        head
    }
}

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::HISTORY_LIMIT;
use crate::models::{Conversation, Message, Role, Source};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("HTTP error! status: {status}")]
    Http { status: u16 },

    /// The server refused a write and said why.
    #[error("{0}")]
    Rejected(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

// --- Chat ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryMessage {
    pub role: Role,
    pub content: String,
}

impl From<&Message> for HistoryMessage {
    fn from(message: &Message) -> Self {
        Self {
            role: message.role,
            content: message.content.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub message: String,
    pub history: Vec<HistoryMessage>,
    pub system_prompt: Option<String>,
    pub collection_name: Option<String>,
}

impl ChatRequest {
    /// Builds the wire request, keeping only the most recent history entries.
    pub fn new(
        content: &str,
        history: &[HistoryMessage],
        system_prompt: Option<&str>,
        collection_name: Option<&str>,
    ) -> Self {
        let start = history.len().saturating_sub(HISTORY_LIMIT);
        Self {
            message: content.to_string(),
            history: history[start..].to_vec(),
            system_prompt: non_empty(system_prompt),
            collection_name: non_empty(collection_name),
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.filter(|v| !v.is_empty()).map(str::to_string)
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatReply {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub sources: Option<Vec<Source>>,
    #[serde(default)]
    pub follow_ups: Option<Vec<String>>,
    #[serde(default)]
    pub processing_time_ms: Option<u64>,
}

impl ChatReply {
    pub fn into_message(self) -> Message {
        Message::assistant(
            self.message.unwrap_or_default(),
            self.sources.unwrap_or_default(),
            self.follow_ups.unwrap_or_default(),
        )
    }
}

// --- Collections and prompts ---

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataResponse {
    pub title: Option<String>,
    pub logo: Option<String>,
    pub resolved_collection: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptResponse {
    #[serde(default)]
    pub prompt: String,
    #[serde(default)]
    pub is_default: bool,
}

#[derive(Debug, Serialize)]
pub struct PromptUpdate<'a> {
    pub prompt: &'a str,
}

#[derive(Debug, Default, Deserialize)]
pub struct ErrorResponse {
    pub error: Option<String>,
}

// --- Conversations ---

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationRecord {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub messages_json: Option<String>,
    #[serde(default)]
    pub created_at: Option<i64>,
    #[serde(default)]
    pub updated_at: Option<i64>,
}

impl ConversationRecord {
    /// Converts to the in-memory form. The title is recomputed from the messages.
    pub fn into_conversation(self) -> Conversation {
        let created_at = self
            .created_at
            .and_then(DateTime::from_timestamp_millis)
            .unwrap_or_else(Utc::now);

        let messages = match self.messages_json.as_deref() {
            None | Some("") => Vec::new(),
            Some(json) => serde_json::from_str::<Vec<Message>>(json).unwrap_or_else(|e| {
                tracing::warn!("Discarding unreadable messages of conversation {}: {}", self.id, e);
                Vec::new()
            }),
        };

        let mut conversation = Conversation::new(self.id, created_at);
        conversation.set_messages(Arc::new(messages));
        conversation
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateConversationBody {
    pub title: String,
    pub messages_json: String,
}

impl UpdateConversationBody {
    pub fn from_conversation(conversation: &Conversation) -> Result<Self, serde_json::Error> {
        Ok(Self {
            title: conversation.title.clone(),
            messages_json: serde_json::to_string(conversation.messages.as_slice())?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn history(n: usize) -> Vec<HistoryMessage> {
        (0..n)
            .map(|i| HistoryMessage {
                role: if i % 2 == 0 { Role::User } else { Role::Assistant },
                content: format!("message {}", i),
            })
            .collect()
    }

    #[test]
    fn test_history_truncated_to_last_ten() {
        let request = ChatRequest::new("q", &history(15), None, None);
        assert_eq!(request.history.len(), 10);
        assert_eq!(request.history[0].content, "message 5");
        assert_eq!(request.history[9].content, "message 14");

        let short = ChatRequest::new("q", &history(3), None, None);
        assert_eq!(short.history.len(), 3);
    }

    #[test]
    fn test_empty_prompt_and_collection_sent_as_null() {
        let request = ChatRequest::new("How?", &[], Some(""), None);
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["message"], "How?");
        assert!(json["systemPrompt"].is_null());
        assert!(json["collectionName"].is_null());

        let scoped = ChatRequest::new("How?", &[], Some("Be brief"), Some("geology"));
        let json = serde_json::to_value(&scoped).unwrap();
        assert_eq!(json["systemPrompt"], "Be brief");
        assert_eq!(json["collectionName"], "geology");
    }

    #[test]
    fn test_reply_defaults_missing_lists() {
        let json = r#"{"message":"Answer","sources":null}"#;
        let reply: ChatReply = serde_json::from_str(json).unwrap();
        let message = reply.into_message();
        assert_eq!(message.role, Role::Assistant);
        assert_eq!(message.content, "Answer");
        assert!(message.sources.is_empty());
        assert!(message.follow_ups.is_empty());
    }

    #[test]
    fn test_record_into_conversation() {
        let record: ConversationRecord = serde_json::from_str(
            r#"{"id":"abc","title":"stale","messagesJson":"[{\"role\":\"user\",\"content\":\"Hello there\"}]","createdAt":1700000000000,"updatedAt":1700000000500}"#,
        )
        .unwrap();
        let conversation = record.into_conversation();
        assert_eq!(conversation.id, "abc");
        assert_eq!(conversation.title, "Hello there");
        assert_eq!(conversation.messages.len(), 1);
        assert_eq!(conversation.created_at.timestamp_millis(), 1_700_000_000_000);
    }

    #[test]
    fn test_record_with_bad_messages_loads_empty() {
        let record: ConversationRecord =
            serde_json::from_str(r#"{"id":"x","messagesJson":"not json"}"#).unwrap();
        let conversation = record.into_conversation();
        assert!(conversation.messages.is_empty());
        assert_eq!(conversation.title, "New Chat");
    }
}

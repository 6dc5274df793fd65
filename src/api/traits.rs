use std::thread::JoinHandle;

use async_trait::async_trait;
use bytes::Bytes;

use super::types::{ApiError, ChatReply, ConversationRecord, HistoryMessage, UpdateConversationBody};
use crate::models::CollectionMetadata;

#[async_trait]
pub trait ChatApi: Send + Sync {
    async fn send_message(
        &self,
        content: &str,
        history: &[HistoryMessage],
        system_prompt: Option<&str>,
        collection_name: Option<&str>,
    ) -> Result<ChatReply, ApiError>;

    /// Never fails; unreachable or unknown collections degrade to default branding.
    async fn fetch_collection_metadata(&self, name: Option<&str>) -> CollectionMetadata;

    async fn fetch_system_prompt(&self) -> Result<String, ApiError>;

    async fn save_system_prompt(&self, prompt: &str) -> Result<(), ApiError>;

    /// Returns the server default that replaced the custom prompt.
    async fn reset_system_prompt(&self) -> Result<String, ApiError>;

    async fn fetch_logo(&self, url: &str) -> Result<Bytes, ApiError>;
}

#[async_trait]
pub trait ConversationBackend: Send + Sync {
    async fn list_conversations(&self) -> Result<Vec<ConversationRecord>, ApiError>;

    async fn create_conversation(&self) -> Result<ConversationRecord, ApiError>;

    async fn update_conversation(
        &self,
        id: &str,
        body: &UpdateConversationBody,
    ) -> Result<(), ApiError>;

    async fn delete_conversation(&self, id: &str) -> Result<(), ApiError>;

    /// Dispatches an update without awaiting it, for use while the process is exiting.
    ///
    /// The returned handle may be joined to give the write a bounded chance to land.
    fn send_beacon(&self, id: &str, body: UpdateConversationBody) -> Option<JoinHandle<()>>;
}

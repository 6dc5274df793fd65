pub mod client;
pub mod traits;
pub mod types;

pub use client::DocsApiClient;
pub use traits::{ChatApi, ConversationBackend};
pub use types::{
    ApiError, ChatReply, ChatRequest, ConversationRecord, HistoryMessage, UpdateConversationBody,
};

pub mod chat_session;
pub mod collection;
pub mod conversation_store;
pub mod database;
pub mod export;
pub mod markdown;
pub mod settings;
pub mod system_prompt;

pub use chat_session::{ChatSession, PendingSend, SendTicket};
pub use collection::CollectionState;
pub use conversation_store::{ConversationStore, SaveTimer};
pub use database::Database;
pub use settings::{AppSettings, SettingsService};
pub use system_prompt::SystemPromptState;

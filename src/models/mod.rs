pub mod collection;
pub mod conversation;
pub mod message;

pub use collection::CollectionMetadata;
pub use conversation::{derive_title, Conversation};
pub use message::{relevant_sources, Message, Role, Source};

use std::sync::Arc;

use crate::api::{ApiError, ChatApi, ChatReply, HistoryMessage};
use crate::models::Message;

pub const SEND_FAILED_MESSAGE: &str =
    "Failed to get response. Please check that the server is running and try again.";

/// Identifies the request a reply belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendTicket {
    generation: u64,
    conversation_id: Option<String>,
}

impl SendTicket {
    /// Conversation that was on screen when the message was sent.
    pub fn conversation_id(&self) -> Option<&str> {
        self.conversation_id.as_deref()
    }
}

/// Everything needed to issue a chat request for an accepted send.
#[derive(Debug)]
pub struct PendingSend {
    pub ticket: SendTicket,
    pub content: String,
    pub history: Vec<HistoryMessage>,
}

/// In-memory state of the conversation on screen.
#[derive(Debug, Default)]
pub struct ChatSession {
    messages: Vec<Message>,
    loading: bool,
    error: Option<String>,
    source: Option<Arc<Vec<Message>>>,
    conversation_id: Option<String>,
    generation: u64,
}

impl ChatSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn clear_error(&mut self) {
        self.error = None;
    }

    /// Conversation whose messages are on screen, if it was set with `sync_conversation`.
    pub fn conversation_id(&self) -> Option<&str> {
        self.conversation_id.as_deref()
    }

    /// Sends `content` and waits for the reply.
    ///
    /// Returns the full message list when the store should be told about it.
    pub async fn send_message(
        &mut self,
        api: &dyn ChatApi,
        content: &str,
        system_prompt: Option<&str>,
        collection_name: Option<&str>,
    ) -> Option<Arc<Vec<Message>>> {
        let pending = self.begin_send(content)?;
        let result = api
            .send_message(&pending.content, &pending.history, system_prompt, collection_name)
            .await;
        self.complete_send(pending.ticket, result)
    }

    /// Accepts a message and appends it optimistically.
    ///
    /// Returns `None`, leaving the session untouched, for blank input or while a
    /// request is already in flight.
    pub fn begin_send(&mut self, content: &str) -> Option<PendingSend> {
        if content.trim().is_empty() || self.loading {
            return None;
        }

        self.messages.push(Message::user(content));
        self.loading = true;
        self.error = None;

        Some(PendingSend {
            ticket: SendTicket {
                generation: self.generation,
                conversation_id: self.conversation_id.clone(),
            },
            content: content.to_string(),
            history: self.messages.iter().map(HistoryMessage::from).collect(),
        })
    }

    pub fn complete_send(
        &mut self,
        ticket: SendTicket,
        result: Result<ChatReply, ApiError>,
    ) -> Option<Arc<Vec<Message>>> {
        self.loading = false;

        if ticket.generation != self.generation {
            tracing::debug!("Dropping reply for a conversation that is no longer shown");
            return None;
        }

        match result {
            Ok(reply) => {
                self.messages.push(reply.into_message());
                let snapshot = Arc::new(self.messages.clone());
                self.source = Some(Arc::clone(&snapshot));
                Some(snapshot)
            }
            Err(e) => {
                tracing::warn!("Chat request failed: {}", e);
                self.error = Some(SEND_FAILED_MESSAGE.to_string());
                None
            }
        }
    }

    /// Empties the conversation and returns the list the store should save.
    pub fn clear_chat(&mut self) -> Arc<Vec<Message>> {
        self.messages.clear();
        self.error = None;
        self.generation += 1;

        let empty = Arc::new(Vec::new());
        self.source = Some(Arc::clone(&empty));
        empty
    }

    /// Adopts the stored messages of the active conversation.
    ///
    /// Re-passing the list this session last adopted or produced is a no-op.
    /// Returns whether the messages were replaced.
    pub fn sync_from(&mut self, source: &Arc<Vec<Message>>) -> bool {
        if self
            .source
            .as_ref()
            .is_some_and(|current| Arc::ptr_eq(current, source))
        {
            return false;
        }

        self.messages = source.as_ref().clone();
        self.source = Some(Arc::clone(source));
        self.error = None;
        self.generation += 1;
        true
    }

    /// Like `sync_from`, also recording which conversation the messages belong to.
    pub fn sync_conversation(&mut self, id: &str, source: &Arc<Vec<Message>>) -> bool {
        if self.conversation_id.as_deref() != Some(id) {
            self.conversation_id = Some(id.to_string());
            self.source = None;
        }
        self.sync_from(source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CollectionMetadata, Role, Source};
    use async_trait::async_trait;
    use bytes::Bytes;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MockChatApi {
        fail: bool,
        requests: Mutex<Vec<(String, Vec<HistoryMessage>, Option<String>, Option<String>)>>,
    }

    impl MockChatApi {
        fn request_count(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl ChatApi for MockChatApi {
        async fn send_message(
            &self,
            content: &str,
            history: &[HistoryMessage],
            system_prompt: Option<&str>,
            collection_name: Option<&str>,
        ) -> Result<ChatReply, ApiError> {
            self.requests.lock().unwrap().push((
                content.to_string(),
                history.to_vec(),
                system_prompt.map(str::to_string),
                collection_name.map(str::to_string),
            ));
            if self.fail {
                return Err(ApiError::Http { status: 502 });
            }
            Ok(ChatReply {
                message: Some(format!("Answer to: {}", content)),
                sources: Some(vec![Source {
                    title: "Guide".to_string(),
                    url: "https://docs.example.com/guide".to_string(),
                    score: 0.91,
                }]),
                follow_ups: Some(vec!["Tell me more".to_string()]),
                processing_time_ms: Some(12),
            })
        }

        async fn fetch_collection_metadata(&self, name: Option<&str>) -> CollectionMetadata {
            CollectionMetadata::fallback(name)
        }

        async fn fetch_system_prompt(&self) -> Result<String, ApiError> {
            Ok(String::new())
        }

        async fn save_system_prompt(&self, _prompt: &str) -> Result<(), ApiError> {
            Ok(())
        }

        async fn reset_system_prompt(&self) -> Result<String, ApiError> {
            Ok(String::new())
        }

        async fn fetch_logo(&self, _url: &str) -> Result<Bytes, ApiError> {
            Ok(Bytes::new())
        }
    }

    #[tokio::test]
    async fn test_blank_message_is_ignored() {
        let api = MockChatApi::default();
        let mut session = ChatSession::new();

        assert!(session.send_message(&api, "", None, None).await.is_none());
        assert!(session.send_message(&api, "  \n\t", None, None).await.is_none());

        assert!(session.messages().is_empty());
        assert!(!session.is_loading());
        assert_eq!(api.request_count(), 0);
    }

    #[test]
    fn test_send_while_loading_is_rejected() {
        let mut session = ChatSession::new();
        assert!(session.begin_send("first").is_some());
        assert!(session.is_loading());

        assert!(session.begin_send("second").is_none());
        assert_eq!(session.messages().len(), 1);
        assert_eq!(session.messages()[0].content, "first");
    }

    #[tokio::test]
    async fn test_success_appends_pair_and_notifies_once() {
        let api = MockChatApi::default();
        let mut session = ChatSession::new();

        let question = "How do I validate a drillhole database?";
        let saved = session
            .send_message(&api, question, Some("Be brief"), Some("geology"))
            .await
            .expect("store should be notified");

        assert_eq!(saved.len(), 2);
        assert_eq!(saved[0].role, Role::User);
        assert_eq!(saved[1].role, Role::Assistant);
        assert_eq!(saved[1].content, "Answer to: How do I validate a drillhole database?");
        assert_eq!(saved[1].sources.len(), 1);
        assert_eq!(saved[1].follow_ups, vec!["Tell me more".to_string()]);
        assert_eq!(session.messages(), saved.as_slice());
        assert!(!session.is_loading());
        assert!(session.error().is_none());

        let requests = api.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].2.as_deref(), Some("Be brief"));
        assert_eq!(requests[0].3.as_deref(), Some("geology"));
    }

    #[tokio::test]
    async fn test_history_is_the_full_list() {
        let api = MockChatApi::default();
        let mut session = ChatSession::new();

        for i in 0..7 {
            session.send_message(&api, &format!("question {}", i), None, None).await;
        }

        let requests = api.requests.lock().unwrap();
        let last_history = &requests[6].1;
        assert_eq!(last_history.len(), 13);
        assert_eq!(last_history[12].content, "question 6");
        assert_eq!(last_history[12].role, Role::User);
    }

    #[tokio::test]
    async fn test_failure_keeps_user_message() {
        let api = MockChatApi {
            fail: true,
            ..Default::default()
        };
        let mut session = ChatSession::new();

        let saved = session.send_message(&api, "Is anyone there?", None, None).await;

        assert!(saved.is_none());
        assert_eq!(session.messages().len(), 1);
        assert_eq!(session.messages()[0].role, Role::User);
        assert_eq!(session.error(), Some(SEND_FAILED_MESSAGE));
        assert!(!session.is_loading());

        session.clear_error();
        assert!(session.error().is_none());
    }

    #[test]
    fn test_new_send_clears_previous_error() {
        let mut session = ChatSession::new();
        let pending = session.begin_send("one").unwrap();
        session.complete_send(pending.ticket, Err(ApiError::Network("down".to_string())));
        assert!(session.error().is_some());

        session.begin_send("two").unwrap();
        assert!(session.error().is_none());
    }

    #[test]
    fn test_sync_from_same_list_is_noop() {
        let mut session = ChatSession::new();
        let stored = Arc::new(vec![Message::user("stored question")]);

        assert!(session.sync_from(&stored));
        assert_eq!(session.messages().len(), 1);

        session.begin_send("draft").unwrap();
        assert!(!session.sync_from(&stored));
        assert_eq!(session.messages().len(), 2);

        let other = Arc::new(vec![Message::user("stored question")]);
        assert!(session.sync_from(&other));
        assert_eq!(session.messages().len(), 1);
    }

    #[test]
    fn test_sync_from_own_snapshot_is_noop() {
        let mut session = ChatSession::new();
        let pending = session.begin_send("q").unwrap();
        let reply = ChatReply {
            message: Some("a".into()),
            ..Default::default()
        };
        let saved = session.complete_send(pending.ticket, Ok(reply)).unwrap();

        assert!(!session.sync_from(&saved));
    }

    #[test]
    fn test_reply_after_switch_is_dropped() {
        let mut session = ChatSession::new();
        let pending = session.begin_send("slow question").unwrap();

        let other = Arc::new(vec![Message::user("another conversation")]);
        session.sync_from(&other);

        let reply = ChatReply {
            message: Some("late".to_string()),
            ..Default::default()
        };
        assert!(session.complete_send(pending.ticket, Ok(reply)).is_none());
        assert_eq!(session.messages().len(), 1);
        assert_eq!(session.messages()[0].content, "another conversation");
        assert!(!session.is_loading());
    }

    #[test]
    fn test_clear_chat() {
        let mut session = ChatSession::new();
        session.sync_from(&Arc::new(vec![Message::user("q")]));

        let cleared = session.clear_chat();
        assert!(cleared.is_empty());
        assert!(session.messages().is_empty());
        assert!(!session.sync_from(&cleared));
    }

    #[test]
    fn test_ticket_names_conversation_on_screen() {
        let mut session = ChatSession::new();
        let stored = Arc::new(vec![Message::user("earlier")]);
        assert!(session.sync_conversation("a", &stored));
        assert_eq!(session.conversation_id(), Some("a"));

        let pending = session.begin_send("follow-up").unwrap();
        assert_eq!(pending.ticket.conversation_id(), Some("a"));

        let reply = ChatReply {
            message: Some("answer".to_string()),
            ..Default::default()
        };
        let saved = session.complete_send(pending.ticket, Ok(reply)).unwrap();
        assert_eq!(saved.len(), 3);
        assert!(!session.sync_conversation("a", &saved));
    }

    #[test]
    fn test_sync_conversation_switches_even_for_same_list() {
        let mut session = ChatSession::new();
        let shared = Arc::new(Vec::new());
        assert!(session.sync_conversation("a", &shared));
        assert!(session.sync_conversation("b", &shared));
        assert_eq!(session.conversation_id(), Some("b"));
    }
}

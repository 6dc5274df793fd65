use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use chrono::Utc;
use futures::future::BoxFuture;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::api::{ApiError, ConversationBackend, ConversationRecord, UpdateConversationBody};
use crate::config::SAVE_DEBOUNCE;
use crate::models::{Conversation, Message};

/// A debounced write waiting for its quiet period. Resolves once it has either
/// fired or been superseded; the caller decides which runtime drives it.
pub type SaveTimer = BoxFuture<'static, ()>;

type PendingWrites = Arc<Mutex<HashMap<String, UpdateConversationBody>>>;

/// Conversation list backed by the server, with debounced writes.
pub struct ConversationStore {
    backend: Arc<dyn ConversationBackend>,
    conversations: Vec<Conversation>,
    active_id: Option<String>,
    debounce: Duration,
    timer: Option<CancellationToken>,
    pending: PendingWrites,
}

impl ConversationStore {
    pub fn new(backend: Arc<dyn ConversationBackend>) -> Self {
        Self::with_debounce(backend, SAVE_DEBOUNCE)
    }

    pub fn with_debounce(backend: Arc<dyn ConversationBackend>, debounce: Duration) -> Self {
        Self {
            backend,
            conversations: Vec::new(),
            active_id: None,
            debounce,
            timer: None,
            pending: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Newest first.
    pub fn list(&self) -> &[Conversation] {
        &self.conversations
    }

    pub fn active_id(&self) -> Option<&str> {
        self.active_id.as_deref()
    }

    pub fn active(&self) -> Option<&Conversation> {
        let id = self.active_id.as_deref()?;
        self.conversations.iter().find(|c| c.id == id)
    }

    pub async fn load(&mut self) {
        let fetched = self.backend.list_conversations().await;
        self.apply_loaded(fetched).await;
    }

    /// Installs a fetched conversation list, creating one if there is nothing to show.
    pub async fn apply_loaded(&mut self, fetched: Result<Vec<ConversationRecord>, ApiError>) {
        let records = fetched.unwrap_or_else(|e| {
            tracing::warn!("Failed to load conversations: {}", e);
            Vec::new()
        });

        let mut conversations: Vec<Conversation> = records
            .into_iter()
            .map(ConversationRecord::into_conversation)
            .collect();
        conversations.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        self.active_id = conversations.first().map(|c| c.id.clone());
        self.conversations = conversations;

        if self.conversations.is_empty() {
            self.create().await;
        }
    }

    pub async fn create(&mut self) -> String {
        let conversation = match self.backend.create_conversation().await {
            Ok(record) => record.into_conversation(),
            Err(e) => {
                tracing::warn!("Failed to create conversation on server, keeping it local: {}", e);
                Conversation::new(Uuid::new_v4().to_string(), Utc::now())
            }
        };

        let id = conversation.id.clone();
        self.conversations.insert(0, conversation);
        self.active_id = Some(id.clone());
        id
    }

    /// Returns `false` and changes nothing when `id` is unknown.
    pub fn select(&mut self, id: &str) -> bool {
        if !self.conversations.iter().any(|c| c.id == id) {
            return false;
        }
        self.active_id = Some(id.to_string());
        true
    }

    pub async fn delete(&mut self, id: &str) {
        let Some(index) = self.conversations.iter().position(|c| c.id == id) else {
            return;
        };

        self.conversations.remove(index);
        lock_pending(&self.pending).remove(id);

        if let Err(e) = self.backend.delete_conversation(id).await {
            tracing::warn!("Failed to delete conversation {} on server: {}", id, e);
        }

        if self.conversations.is_empty() {
            self.create().await;
        } else if self.active_id.as_deref() == Some(id) {
            self.active_id = self.conversations.first().map(|c| c.id.clone());
        }
    }

    /// Replaces the active conversation's messages and re-arms the save timer.
    ///
    /// The returned timer must be driven for the write to happen. Any timer returned
    /// earlier is cancelled and resolves without writing.
    pub fn update_messages(&mut self, messages: Arc<Vec<Message>>) -> Option<SaveTimer> {
        let active_id = self.active_id.clone()?;
        self.update_messages_for(&active_id, messages)
    }

    /// Same as `update_messages`, for a named conversation whether or not it is active.
    ///
    /// Returns `None` without writing when `id` is unknown, e.g. deleted meanwhile.
    pub fn update_messages_for(
        &mut self,
        id: &str,
        messages: Arc<Vec<Message>>,
    ) -> Option<SaveTimer> {
        let conversation = self.conversations.iter_mut().find(|c| c.id == id)?;
        conversation.set_messages(messages);

        let body = match UpdateConversationBody::from_conversation(conversation) {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!("Failed to serialize conversation {}: {}", id, e);
                return None;
            }
        };
        lock_pending(&self.pending).insert(id.to_string(), body);

        Some(self.rearm_timer())
    }

    pub fn has_pending_write(&self) -> bool {
        !lock_pending(&self.pending).is_empty()
    }

    /// Final flush for process teardown.
    ///
    /// Cancels the timer and hands every pending write to the backend's beacon
    /// transport. The returned handles may be joined to wait for delivery.
    pub fn flush_on_teardown(&mut self) -> Vec<JoinHandle<()>> {
        if let Some(timer) = self.timer.take() {
            timer.cancel();
        }

        let writes: Vec<_> = lock_pending(&self.pending).drain().collect();
        writes
            .into_iter()
            .filter_map(|(id, body)| self.backend.send_beacon(&id, body))
            .collect()
    }

    fn rearm_timer(&mut self) -> SaveTimer {
        let token = CancellationToken::new();
        if let Some(previous) = self.timer.replace(token.clone()) {
            previous.cancel();
        }

        let backend = Arc::clone(&self.backend);
        let pending = Arc::clone(&self.pending);
        let debounce = self.debounce;

        Box::pin(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(debounce) => {
                    let writes: Vec<_> = lock_pending(&pending).drain().collect();
                    for (id, body) in writes {
                        tracing::debug!("Saving conversation {}", id);
                        if let Err(e) = backend.update_conversation(&id, &body).await {
                            tracing::warn!("Failed to save conversation {}: {}", id, e);
                        }
                    }
                }
            }
        })
    }
}

fn lock_pending(
    pending: &Mutex<HashMap<String, UpdateConversationBody>>,
) -> std::sync::MutexGuard<'_, HashMap<String, UpdateConversationBody>> {
    pending.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

use crate::api::{ApiError, ChatApi};

/// The server-wide system prompt and its edit dialog state.
#[derive(Debug, Default)]
pub struct SystemPromptState {
    prompt: String,
    edited: String,
    dialog_open: bool,
}

impl SystemPromptState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    /// Prompt to attach to chat requests; `None` lets the server use its default.
    pub fn prompt_for_request(&self) -> Option<&str> {
        Some(self.prompt.as_str()).filter(|p| !p.is_empty())
    }

    pub fn edited(&self) -> &str {
        &self.edited
    }

    pub fn set_edited(&mut self, text: impl Into<String>) {
        self.edited = text.into();
    }

    pub fn is_dialog_open(&self) -> bool {
        self.dialog_open
    }

    pub fn open_dialog(&mut self) {
        self.edited = self.prompt.clone();
        self.dialog_open = true;
    }

    pub fn close_dialog(&mut self) {
        self.dialog_open = false;
    }

    pub async fn load(&mut self, api: &dyn ChatApi) {
        let fetched = api.fetch_system_prompt().await;
        self.apply_loaded(fetched);
    }

    pub fn apply_loaded(&mut self, fetched: Result<String, ApiError>) {
        match fetched {
            Ok(prompt) => {
                self.edited = prompt.clone();
                self.prompt = prompt;
            }
            Err(e) => tracing::warn!("Failed to fetch system prompt: {}", e),
        }
    }

    /// Text a save would send: the edit buffer, trimmed.
    pub fn pending_save(&self) -> String {
        self.edited.trim().to_string()
    }

    /// Saves the trimmed edit buffer. The dialog stays open if the server refuses.
    pub async fn save(&mut self, api: &dyn ChatApi) -> Result<(), ApiError> {
        let prompt = self.pending_save();
        let result = api.save_system_prompt(&prompt).await;
        self.apply_saved(prompt, result)
    }

    pub fn apply_saved(
        &mut self,
        prompt: String,
        result: Result<(), ApiError>,
    ) -> Result<(), ApiError> {
        result?;
        self.edited = prompt.clone();
        self.prompt = prompt;
        self.dialog_open = false;
        Ok(())
    }

    /// Restores the server default into both the prompt and the edit buffer.
    pub async fn reset(&mut self, api: &dyn ChatApi) -> Result<(), ApiError> {
        let result = api.reset_system_prompt().await;
        self.apply_reset(result)
    }

    pub fn apply_reset(&mut self, result: Result<String, ApiError>) -> Result<(), ApiError> {
        let default_prompt = result?;
        self.edited = default_prompt.clone();
        self.prompt = default_prompt;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ChatReply, HistoryMessage};
    use crate::models::CollectionMetadata;
    use async_trait::async_trait;
    use bytes::Bytes;
    use std::sync::Mutex;

    #[derive(Default)]
    struct PromptServer {
        reject_with: Option<String>,
        saved: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ChatApi for PromptServer {
        async fn send_message(
            &self,
            _content: &str,
            _history: &[HistoryMessage],
            _system_prompt: Option<&str>,
            _collection_name: Option<&str>,
        ) -> Result<ChatReply, ApiError> {
            Err(ApiError::Http { status: 500 })
        }

        async fn fetch_collection_metadata(&self, name: Option<&str>) -> CollectionMetadata {
            CollectionMetadata::fallback(name)
        }

        async fn fetch_system_prompt(&self) -> Result<String, ApiError> {
            Ok("You answer questions about mining software.".to_string())
        }

        async fn save_system_prompt(&self, prompt: &str) -> Result<(), ApiError> {
            if let Some(reason) = &self.reject_with {
                return Err(ApiError::Rejected(reason.clone()));
            }
            self.saved.lock().unwrap().push(prompt.to_string());
            Ok(())
        }

        async fn reset_system_prompt(&self) -> Result<String, ApiError> {
            Ok("Default prompt".to_string())
        }

        async fn fetch_logo(&self, _url: &str) -> Result<Bytes, ApiError> {
            Ok(Bytes::new())
        }
    }

    #[tokio::test]
    async fn test_load_and_open_dialog() {
        let api = PromptServer::default();
        let mut state = SystemPromptState::new();
        assert!(state.prompt_for_request().is_none());

        state.load(&api).await;
        assert_eq!(state.prompt(), "You answer questions about mining software.");

        state.set_edited("scratch");
        state.open_dialog();
        assert!(state.is_dialog_open());
        assert_eq!(state.edited(), state.prompt());
    }

    #[tokio::test]
    async fn test_save_trims_and_closes() {
        let api = PromptServer::default();
        let mut state = SystemPromptState::new();
        state.open_dialog();
        state.set_edited("  Answer in French.\n");

        state.save(&api).await.unwrap();

        assert_eq!(state.prompt(), "Answer in French.");
        assert!(!state.is_dialog_open());
        assert_eq!(*api.saved.lock().unwrap(), vec!["Answer in French.".to_string()]);
    }

    #[tokio::test]
    async fn test_rejected_save_keeps_dialog_open() {
        let api = PromptServer {
            reject_with: Some("Prompt too long".to_string()),
            ..Default::default()
        };
        let mut state = SystemPromptState::new();
        state.open_dialog();
        state.set_edited("new text");

        let err = state.save(&api).await.unwrap_err();

        assert_eq!(err.to_string(), "Prompt too long");
        assert!(state.is_dialog_open());
        assert_eq!(state.prompt(), "");
        assert_eq!(state.edited(), "new text");
    }

    #[tokio::test]
    async fn test_reset_restores_default() {
        let api = PromptServer::default();
        let mut state = SystemPromptState::new();
        state.open_dialog();
        state.set_edited("custom");

        state.reset(&api).await.unwrap();

        assert_eq!(state.prompt(), "Default prompt");
        assert_eq!(state.edited(), "Default prompt");
    }

    #[test]
    fn test_apply_saved_failure_keeps_previous_prompt() {
        let mut state = SystemPromptState::new();
        state.apply_loaded(Ok("Original".to_string()));
        state.open_dialog();
        state.set_edited("  Replacement ");

        let prompt = state.pending_save();
        assert_eq!(prompt, "Replacement");
        let result = state.apply_saved(prompt, Err(ApiError::Http { status: 500 }));

        assert!(result.is_err());
        assert_eq!(state.prompt(), "Original");
        assert!(state.is_dialog_open());
    }

    #[test]
    fn test_failed_load_leaves_prompt_empty() {
        let mut state = SystemPromptState::new();
        state.apply_loaded(Err(ApiError::Network("refused".to_string())));
        assert_eq!(state.prompt(), "");
    }
}

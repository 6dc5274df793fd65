use crate::api::ChatApi;
use crate::config::APP_NAME;
use crate::models::CollectionMetadata;

/// The documentation collection the chat is scoped to, and its branding.
#[derive(Debug, Default)]
pub struct CollectionState {
    requested: Option<String>,
    metadata: CollectionMetadata,
    loading: bool,
}

impl CollectionState {
    pub fn new(requested: Option<String>) -> Self {
        Self {
            metadata: CollectionMetadata::fallback(requested.as_deref()),
            loading: requested.is_some(),
            requested,
        }
    }

    pub fn requested(&self) -> Option<&str> {
        self.requested.as_deref()
    }

    pub fn metadata(&self) -> &CollectionMetadata {
        &self.metadata
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Collection name that chat requests are scoped to.
    pub fn resolved(&self) -> Option<&str> {
        self.metadata.resolved_collection.as_deref()
    }

    /// Switches collection. Returns `true` when it actually changed, in which case
    /// branding falls back to defaults until fresh metadata arrives.
    pub fn set_requested(&mut self, requested: Option<String>) -> bool {
        if requested == self.requested {
            return false;
        }
        self.metadata = CollectionMetadata::fallback(requested.as_deref());
        self.loading = requested.is_some();
        self.requested = requested;
        true
    }

    /// Installs metadata fetched for `requested`; results for a collection that is no
    /// longer selected are ignored.
    pub fn apply_metadata(
        &mut self,
        requested: Option<&str>,
        metadata: CollectionMetadata,
    ) -> bool {
        if requested != self.requested.as_deref() {
            return false;
        }
        self.metadata = metadata;
        self.loading = false;
        true
    }

    pub async fn load(&mut self, api: &dyn ChatApi) {
        let requested = self.requested.clone();
        let metadata = api.fetch_collection_metadata(requested.as_deref()).await;
        self.apply_metadata(requested.as_deref(), metadata);
    }

    pub fn window_title(&self) -> String {
        match self.resolved() {
            Some(collection) => format!("{} - {}", APP_NAME, collection),
            None => APP_NAME.to_string(),
        }
    }

    pub fn input_placeholder(&self) -> String {
        format!("Ask a question about {}…", self.metadata.title)
    }

    pub fn disclaimer(&self) -> String {
        format!(
            "Responses are generated from {} documentation. Please verify critical information.",
            self.metadata.title
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn branded(collection: &str) -> CollectionMetadata {
        CollectionMetadata {
            title: "Studio RM".to_string(),
            logo: "/logo.png".to_string(),
            resolved_collection: Some(collection.to_string()),
        }
    }

    #[test]
    fn test_change_resets_branding() {
        let mut state = CollectionState::new(Some("geology".to_string()));
        assert!(state.apply_metadata(Some("geology"), branded("geology-v2")));
        assert_eq!(state.resolved(), Some("geology-v2"));
        assert_eq!(state.window_title(), "Docs Chat - geology-v2");

        assert!(!state.set_requested(Some("geology".to_string())));
        assert!(state.set_requested(Some("survey".to_string())));
        assert_eq!(state.metadata().title, "Product Documentation");
        assert_eq!(state.resolved(), Some("survey"));
        assert!(state.is_loading());
    }

    #[test]
    fn test_stale_metadata_ignored() {
        let mut state = CollectionState::new(Some("a".to_string()));
        state.set_requested(Some("b".to_string()));

        assert!(!state.apply_metadata(Some("a"), branded("a")));
        assert_eq!(state.resolved(), Some("b"));
        assert!(state.is_loading());
    }

    #[test]
    fn test_no_collection() {
        let state = CollectionState::new(None);
        assert_eq!(state.resolved(), None);
        assert_eq!(state.window_title(), "Docs Chat");
        assert_eq!(
            state.input_placeholder(),
            "Ask a question about Product Documentation…"
        );
        assert!(!state.is_loading());
    }
}

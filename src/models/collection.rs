use crate::config::{DEFAULT_BRANDING_TITLE, DEFAULT_LOGO_URL};

/// Branding and scope for a documentation collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionMetadata {
    pub title: String,
    pub logo: String,
    pub resolved_collection: Option<String>,
}

impl CollectionMetadata {
    /// Default branding, keeping `requested` as the resolved collection.
    pub fn fallback(requested: Option<&str>) -> Self {
        Self {
            title: DEFAULT_BRANDING_TITLE.to_string(),
            logo: DEFAULT_LOGO_URL.to_string(),
            resolved_collection: requested.map(str::to_string),
        }
    }
}

impl Default for CollectionMetadata {
    fn default() -> Self {
        Self::fallback(None)
    }
}

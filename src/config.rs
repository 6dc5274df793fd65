use std::time::Duration;

use clap::Parser;
use thiserror::Error;
use url::Url;

pub const APP_ID: &str = "io.github.docschat.DocsChat";
pub const APP_NAME: &str = "Docs Chat";
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const RESOURCE_PREFIX: &str = "/io/github/docschat/DocsChat";

pub const DEFAULT_SERVER_URL: &str = "http://localhost:8080";
/// Cookie the server scopes stored conversations to.
pub const SESSION_COOKIE: &str = "chat_session";
pub const DEFAULT_BRANDING_TITLE: &str = "Product Documentation";
pub const DEFAULT_LOGO_URL: &str = "https://docs.dataminesoftware.com/Assets/Images/Datamine-Logo.png";

pub const NEW_CHAT_TITLE: &str = "New Chat";
pub const TITLE_MAX_CHARS: usize = 40;

/// Number of history entries sent with each chat request.
pub const HISTORY_LIMIT: usize = 10;
/// Sources scoring below this are hidden.
pub const MIN_SOURCE_RELEVANCE: f64 = 0.8;

pub const SAVE_DEBOUNCE: Duration = Duration::from_millis(1000);
pub const BEACON_TIMEOUT: Duration = Duration::from_secs(2);
pub const ERROR_BANNER_TIMEOUT: Duration = Duration::from_secs(5);
pub const CHAT_REQUEST_TIMEOUT: Duration = Duration::from_secs(180);

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid server URL '{url}': {reason}")]
    InvalidServerUrl { url: String, reason: String },
}

#[derive(Debug, Parser)]
#[command(name = "docs-chat", version, about = "Ask questions about your product documentation")]
pub struct Cli {
    /// Base URL of the documentation chat server
    #[arg(long, env = "DOCS_CHAT_SERVER", default_value = DEFAULT_SERVER_URL)]
    pub server: String,

    /// Collection to open: a slug, "#slug", or a URL whose fragment names the collection
    pub collection: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server_url: Url,
    pub collection: Option<String>,
}

impl Config {
    pub fn from_cli(cli: Cli) -> Result<Self, ConfigError> {
        let server_url =
            Url::parse(cli.server.trim()).map_err(|e| ConfigError::InvalidServerUrl {
                url: cli.server.clone(),
                reason: e.to_string(),
            })?;

        if !matches!(server_url.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidServerUrl {
                url: cli.server,
                reason: "only http and https are supported".to_string(),
            });
        }

        Ok(Self {
            server_url,
            collection: cli.collection.as_deref().and_then(collection_from_location),
        })
    }
}

/// Extracts a collection name from a location string.
///
/// Accepts a full URL (the fragment names the collection), a `#slug`, or a bare slug.
pub fn collection_from_location(location: &str) -> Option<String> {
    let location = location.trim();

    let name = match Url::parse(location) {
        Ok(url) => url.fragment().unwrap_or_default().to_string(),
        Err(_) => location.trim_start_matches('#').to_string(),
    };

    let name = name.trim();
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collection_from_url_fragment() {
        assert_eq!(
            collection_from_location("https://help.example.com/chat#studio-rm"),
            Some("studio-rm".to_string())
        );
        assert_eq!(collection_from_location("https://help.example.com/chat"), None);
    }

    #[test]
    fn test_collection_from_slug() {
        assert_eq!(collection_from_location("geology"), Some("geology".to_string()));
        assert_eq!(collection_from_location("#geology"), Some("geology".to_string()));
        assert_eq!(collection_from_location("  "), None);
        assert_eq!(collection_from_location("#"), None);
    }

    #[test]
    fn test_config_rejects_non_http_server() {
        let cli = Cli::try_parse_from(["docs-chat", "--server", "ftp://example.com"]).unwrap();
        assert!(Config::from_cli(cli).is_err());
    }

    #[test]
    fn test_config_from_args() {
        let cli = Cli::try_parse_from([
            "docs-chat",
            "--server",
            "https://chat.example.com/",
            "https://docs.example.com/#mining",
        ])
        .unwrap();
        let config = Config::from_cli(cli).unwrap();
        assert_eq!(config.server_url.as_str(), "https://chat.example.com/");
        assert_eq!(config.collection.as_deref(), Some("mining"));
    }
}

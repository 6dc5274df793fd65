use std::sync::Arc;
use std::thread::JoinHandle;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::cookie::{CookieStore, Jar};
use reqwest::{Client, Response};
use url::Url;

use super::traits::{ChatApi, ConversationBackend};
use super::types::*;
use crate::config::{BEACON_TIMEOUT, CHAT_REQUEST_TIMEOUT, SESSION_COOKIE};
use crate::models::CollectionMetadata;

const UNKNOWN_ERROR: &str = "Unknown error";
const RESET_FAILED: &str = "Failed to reset system prompt";

/// HTTP client for the documentation chat server.
///
/// All requests, including the teardown beacon, share one cookie jar holding the
/// server session that stored conversations belong to.
pub struct DocsApiClient {
    client: Client,
    base_url: Url,
    cookies: Arc<Jar>,
}

impl DocsApiClient {
    pub fn new(base_url: Url) -> Result<Self, ApiError> {
        let cookies = Arc::new(Jar::default());
        let client = session_client(&cookies)?;
        Ok(Self {
            client,
            base_url,
            cookies,
        })
    }

    /// Resumes a server session from an earlier run.
    pub fn restore_session(&self, session_id: &str) {
        if session_id.is_empty() {
            return;
        }
        self.cookies.add_cookie_str(
            &format!("{}={}; Path=/", SESSION_COOKIE, session_id),
            &self.base_url,
        );
    }

    /// The server session this client currently belongs to, once the server has assigned one.
    pub fn session_id(&self) -> Option<String> {
        let header = self.cookies.cookies(&self.base_url)?;
        let header = header.to_str().ok()?;
        header
            .split(';')
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, _)| *name == SESSION_COOKIE)
            .map(|(_, value)| value.to_string())
    }

    /// Appends percent-encoded path segments to the base URL.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        build_endpoint(&self.base_url, segments)
    }

    async fn read_json<T: serde::de::DeserializeOwned>(response: Response) -> Result<T, ApiError> {
        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Http {
                status: status.as_u16(),
            });
        }
        response
            .json()
            .await
            .map_err(|e| ApiError::InvalidResponse(e.to_string()))
    }

    fn expect_success(response: Response) -> Result<(), ApiError> {
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(ApiError::Http {
                status: status.as_u16(),
            })
        }
    }
}

fn build_endpoint(base: &Url, segments: &[&str]) -> Result<Url, ApiError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| ApiError::InvalidUrl(base.to_string()))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

fn session_client(cookies: &Arc<Jar>) -> Result<Client, ApiError> {
    Client::builder()
        .cookie_provider(Arc::clone(cookies))
        .build()
        .map_err(network)
}

fn network(e: reqwest::Error) -> ApiError {
    ApiError::Network(e.to_string())
}

#[async_trait]
impl ChatApi for DocsApiClient {
    async fn send_message(
        &self,
        content: &str,
        history: &[HistoryMessage],
        system_prompt: Option<&str>,
        collection_name: Option<&str>,
    ) -> Result<ChatReply, ApiError> {
        let request = ChatRequest::new(content, history, system_prompt, collection_name);
        let url = self.endpoint(&["api", "chat"])?;

        let response = self
            .client
            .post(url)
            .timeout(CHAT_REQUEST_TIMEOUT)
            .json(&request)
            .send()
            .await
            .map_err(network)?;

        Self::read_json(response).await
    }

    async fn fetch_collection_metadata(&self, name: Option<&str>) -> CollectionMetadata {
        let Some(name) = name.filter(|n| !n.is_empty()) else {
            return CollectionMetadata::default();
        };

        let fetched: Result<MetadataResponse, ApiError> = async {
            let url = self.endpoint(&["api", "collections", name, "metadata"])?;
            let response = self.client.get(url).send().await.map_err(network)?;
            Self::read_json(response).await
        }
        .await;

        match fetched {
            Ok(meta) => {
                let fallback = CollectionMetadata::fallback(Some(name));
                CollectionMetadata {
                    title: meta.title.filter(|t| !t.is_empty()).unwrap_or(fallback.title),
                    logo: meta.logo.filter(|l| !l.is_empty()).unwrap_or(fallback.logo),
                    resolved_collection: meta
                        .resolved_collection
                        .filter(|c| !c.is_empty())
                        .or(fallback.resolved_collection),
                }
            }
            Err(e) => {
                tracing::warn!("Using default branding for collection '{}': {}", name, e);
                CollectionMetadata::fallback(Some(name))
            }
        }
    }

    async fn fetch_system_prompt(&self) -> Result<String, ApiError> {
        let url = self.endpoint(&["api", "chat", "system-prompt"])?;
        let response = self.client.get(url).send().await.map_err(network)?;
        let body: PromptResponse = Self::read_json(response).await?;
        Ok(body.prompt)
    }

    async fn save_system_prompt(&self, prompt: &str) -> Result<(), ApiError> {
        let url = self.endpoint(&["api", "chat", "system-prompt"])?;
        let response = self
            .client
            .post(url)
            .json(&PromptUpdate { prompt })
            .send()
            .await
            .map_err(network)?;

        if response.status().is_success() {
            return Ok(());
        }

        let body: ErrorResponse = response.json().await.unwrap_or_default();
        Err(ApiError::Rejected(
            body.error
                .filter(|e| !e.is_empty())
                .unwrap_or_else(|| UNKNOWN_ERROR.to_string()),
        ))
    }

    async fn reset_system_prompt(&self) -> Result<String, ApiError> {
        let url = self.endpoint(&["api", "chat", "system-prompt"])?;
        let response = self.client.delete(url).send().await.map_err(network)?;

        if !response.status().is_success() {
            return Err(ApiError::Rejected(RESET_FAILED.to_string()));
        }

        let body: PromptResponse = response
            .json()
            .await
            .map_err(|e| ApiError::InvalidResponse(e.to_string()))?;
        Ok(body.prompt)
    }

    async fn fetch_logo(&self, url: &str) -> Result<Bytes, ApiError> {
        let url = self
            .base_url
            .join(url)
            .map_err(|e| ApiError::InvalidUrl(e.to_string()))?;
        let response = self.client.get(url).send().await.map_err(network)?;
        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Http {
                status: status.as_u16(),
            });
        }
        response.bytes().await.map_err(network)
    }
}

#[async_trait]
impl ConversationBackend for DocsApiClient {
    async fn list_conversations(&self) -> Result<Vec<ConversationRecord>, ApiError> {
        let url = self.endpoint(&["api", "conversations"])?;
        let response = self.client.get(url).send().await.map_err(network)?;
        Self::read_json(response).await
    }

    async fn create_conversation(&self) -> Result<ConversationRecord, ApiError> {
        let url = self.endpoint(&["api", "conversations"])?;
        let response = self.client.post(url).send().await.map_err(network)?;
        Self::read_json(response).await
    }

    async fn update_conversation(
        &self,
        id: &str,
        body: &UpdateConversationBody,
    ) -> Result<(), ApiError> {
        let url = self.endpoint(&["api", "conversations", id])?;
        let response = self
            .client
            .put(url)
            .json(body)
            .send()
            .await
            .map_err(network)?;
        Self::expect_success(response)
    }

    async fn delete_conversation(&self, id: &str) -> Result<(), ApiError> {
        let url = self.endpoint(&["api", "conversations", id])?;
        let response = self.client.delete(url).send().await.map_err(network)?;
        Self::expect_success(response)
    }

    fn send_beacon(&self, id: &str, body: UpdateConversationBody) -> Option<JoinHandle<()>> {
        let url = match self.endpoint(&["api", "conversations", id]) {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!("Dropping final save of conversation {}: {}", id, e);
                return None;
            }
        };

        let cookies = Arc::clone(&self.cookies);

        // The caller's runtime may already be shutting down, so the write gets its own.
        let spawned = std::thread::Builder::new()
            .name("conversation-beacon".to_string())
            .spawn(move || {
                let runtime = match tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                {
                    Ok(runtime) => runtime,
                    Err(e) => {
                        tracing::warn!("Final save skipped, no runtime: {}", e);
                        return;
                    }
                };

                runtime.block_on(async move {
                    let client = match session_client(&cookies) {
                        Ok(client) => client,
                        Err(e) => {
                            tracing::warn!("Final save skipped: {}", e);
                            return;
                        }
                    };
                    let result = client
                        .put(url.clone())
                        .timeout(BEACON_TIMEOUT)
                        .json(&body)
                        .send()
                        .await;
                    match result {
                        Ok(response) if response.status().is_success() => {
                            tracing::debug!("Final save delivered to {}", url);
                        }
                        Ok(response) => {
                            let status = response.status();
                            tracing::warn!("Final save to {} failed: HTTP {}", url, status);
                        }
                        Err(e) => tracing::warn!("Final save to {} failed: {}", url, e),
                    }
                });
            });

        match spawned {
            Ok(handle) => Some(handle),
            Err(e) => {
                tracing::warn!("Could not start final save: {}", e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};
    use tokio::task::JoinHandle as TaskHandle;

    const CREATED: &str = "HTTP/1.1 200 OK\r\n\
        Content-Type: application/json\r\n\
        Set-Cookie: chat_session=abc; Path=/; HttpOnly\r\n\
        Content-Length: 76\r\n\
        Connection: close\r\n\r\n\
        {\"id\":\"c1\",\"title\":\"New Chat\",\"messagesJson\":\"[]\",\"createdAt\":1700000000000}";

    const EMPTY_OK: &str = "HTTP/1.1 200 OK\r\nContent-Length: 0\r\nConnection: close\r\n\r\n";

    const EMPTY_LIST: &str = "HTTP/1.1 200 OK\r\n\
        Content-Type: application/json\r\n\
        Content-Length: 2\r\n\
        Connection: close\r\n\r\n[]";

    /// Reads one request and returns its lowercased head.
    async fn read_head(stream: &mut TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            let n = stream.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);

            let text = String::from_utf8_lossy(&buf).to_ascii_lowercase();
            if let Some(end) = text.find("\r\n\r\n") {
                let head = text[..end].to_string();
                let body_len = head
                    .lines()
                    .find_map(|line| line.strip_prefix("content-length:"))
                    .and_then(|len| len.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if buf.len() >= end + 4 + body_len {
                    return head;
                }
            }
        }
        String::from_utf8_lossy(&buf).to_ascii_lowercase()
    }

    /// Answers one connection per canned response and collects the request heads.
    async fn serve(responses: Vec<&'static str>) -> (Url, TaskHandle<Vec<String>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = Url::parse(&format!("http://{}", listener.local_addr().unwrap())).unwrap();
        let server = tokio::spawn(async move {
            let mut heads = Vec::new();
            for response in responses {
                let (mut stream, _) = listener.accept().await.unwrap();
                heads.push(read_head(&mut stream).await);
                stream.write_all(response.as_bytes()).await.unwrap();
                let _ = stream.shutdown().await;
            }
            heads
        });
        (base, server)
    }

    fn body() -> UpdateConversationBody {
        UpdateConversationBody {
            title: "Hello".to_string(),
            messages_json: "[]".to_string(),
        }
    }

    #[tokio::test]
    async fn test_session_cookie_follows_created_conversation() {
        let (base, server) = serve(vec![CREATED, EMPTY_OK]).await;
        let client = DocsApiClient::new(base).unwrap();
        assert_eq!(client.session_id(), None);

        let record = client.create_conversation().await.unwrap();
        assert_eq!(record.id, "c1");
        assert_eq!(client.session_id().as_deref(), Some("abc"));

        client.update_conversation("c1", &body()).await.unwrap();

        let heads = server.await.unwrap();
        assert!(heads[0].starts_with("post /api/conversations "));
        assert!(heads[1].starts_with("put /api/conversations/c1 "));
        assert!(heads[1].contains("cookie: chat_session=abc"));
    }

    #[tokio::test]
    async fn test_restored_session_is_sent() {
        let (base, server) = serve(vec![EMPTY_LIST]).await;
        let client = DocsApiClient::new(base).unwrap();
        client.restore_session("from-last-run");
        assert_eq!(client.session_id().as_deref(), Some("from-last-run"));

        let records = client.list_conversations().await.unwrap();
        assert!(records.is_empty());

        let heads = server.await.unwrap();
        assert!(heads[0].contains("cookie: chat_session=from-last-run"));
    }

    #[tokio::test]
    async fn test_beacon_carries_session_cookie() {
        let (base, server) = serve(vec![EMPTY_OK]).await;
        let client = DocsApiClient::new(base).unwrap();
        client.restore_session("abc");

        let handle = client.send_beacon("c1", body()).unwrap();
        tokio::task::spawn_blocking(move || handle.join().unwrap())
            .await
            .unwrap();

        let heads = server.await.unwrap();
        assert!(heads[0].starts_with("put /api/conversations/c1 "));
        assert!(heads[0].contains("cookie: chat_session=abc"));
    }

    #[test]
    fn test_endpoint_appends_to_base_path() {
        let base = Url::parse("https://help.example.com/assistant/").unwrap();
        let url = build_endpoint(&base, &["api", "chat", "system-prompt"]).unwrap();
        assert_eq!(url.as_str(), "https://help.example.com/assistant/api/chat/system-prompt");

        let bare = Url::parse("http://localhost:8080").unwrap();
        let url = build_endpoint(&bare, &["api", "conversations"]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/api/conversations");
    }

    #[test]
    fn test_collection_name_is_percent_encoded() {
        let base = Url::parse("http://localhost:8080").unwrap();
        let segments = ["api", "collections", "rock mass/v2", "metadata"];
        let url = build_endpoint(&base, &segments).unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:8080/api/collections/rock%20mass%2Fv2/metadata"
        );
    }

    #[tokio::test]
    async fn test_metadata_for_empty_name_needs_no_request() {
        // Port 9 is discard; nothing is contacted for an empty name.
        let client = DocsApiClient::new(Url::parse("http://127.0.0.1:9").unwrap()).unwrap();
        let metadata = client.fetch_collection_metadata(Some("")).await;
        assert_eq!(metadata, CollectionMetadata::default());
        assert_eq!(metadata.resolved_collection, None);
        assert_eq!(metadata.title, "Product Documentation");
    }

    #[tokio::test]
    async fn test_metadata_degrades_when_unreachable() {
        let client = DocsApiClient::new(Url::parse("http://127.0.0.1:9").unwrap()).unwrap();
        let metadata = client.fetch_collection_metadata(Some("geology")).await;
        assert_eq!(metadata.title, "Product Documentation");
        assert_eq!(metadata.resolved_collection.as_deref(), Some("geology"));
    }
}

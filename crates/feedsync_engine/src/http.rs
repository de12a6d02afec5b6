//! HTTP transport implementation.
//!
//! The actual HTTP client is abstracted via [`HttpClient`] so the transport
//! logic (URLs, status classification, body decoding) is independent of the
//! HTTP library. [`ReqwestClient`] is the default implementation.

use crate::error::{NetworkErrorKind, SyncError, SyncResult};
use crate::transport::SyncTransport;
use async_trait::async_trait;
use feedsync_core::Collection;
use feedsync_protocol::{
    change_list_path, content_path, decode_change_list, decode_entities, ChangeListItem,
    EntityPayload,
};
use parking_lot::RwLock;
use tracing::debug;

/// A raw HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// Status code.
    pub status: u16,
    /// Body bytes.
    pub body: Vec<u8>,
}

/// A request that produced no response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HttpFailure {
    /// The request timed out.
    Timeout(String),
    /// The connection failed or broke.
    Connection(String),
    /// The request could not be built, e.g. from a malformed URL.
    InvalidRequest(String),
}

/// HTTP client abstraction.
///
/// Implement this trait to plug in a different HTTP library.
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Sends a GET request.
    async fn get(&self, url: &str) -> Result<HttpResponse, HttpFailure>;
}

/// HTTP-based sync transport for the change-list API.
pub struct HttpTransport<C: HttpClient> {
    base_url: String,
    client: C,
    last_error: RwLock<Option<String>>,
}

impl<C: HttpClient> HttpTransport<C> {
    /// Creates a transport for the API at `base_url`.
    pub fn new(base_url: impl Into<String>, client: C) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            last_error: RwLock::new(None),
        }
    }

    /// Returns the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns the last error message.
    pub fn last_error(&self) -> Option<String> {
        self.last_error.read().clone()
    }

    /// URL of a change list request.
    pub fn change_list_url(&self, collection: Collection, after: u64) -> String {
        format!("{}/{}?after={after}", self.base_url, change_list_path(collection))
    }

    /// URL of a content request.
    pub fn entities_url(&self, collection: Collection, ids: &[String]) -> String {
        let query: Vec<String> = ids
            .iter()
            .map(|id| format!("id={}", urlencoding::encode(id)))
            .collect();
        format!("{}/{}?{}", self.base_url, content_path(collection), query.join("&"))
    }

    async fn get_body(&self, url: &str) -> SyncResult<Vec<u8>> {
        let result = self.client.get(url).await;
        let outcome = match result {
            Ok(response) if (200..300).contains(&response.status) => Ok(response.body),
            Ok(response) => Err(SyncError::status(
                response.status,
                format!("GET {url}: {}", String::from_utf8_lossy(&response.body)),
            )),
            Err(HttpFailure::Timeout(message)) => {
                Err(SyncError::network(NetworkErrorKind::Timeout, message))
            }
            Err(HttpFailure::Connection(message)) => {
                Err(SyncError::network(NetworkErrorKind::Connection, message))
            }
            Err(HttpFailure::InvalidRequest(message)) => Err(SyncError::network(
                NetworkErrorKind::InvalidRequest,
                format!("GET {url}: {message}"),
            )),
        };

        match &outcome {
            Ok(_) => *self.last_error.write() = None,
            Err(e) => *self.last_error.write() = Some(e.to_string()),
        }
        outcome
    }
}

#[async_trait]
impl<C: HttpClient> SyncTransport for HttpTransport<C> {
    async fn fetch_change_list(
        &self,
        collection: Collection,
        after: u64,
    ) -> SyncResult<Vec<ChangeListItem>> {
        let url = self.change_list_url(collection, after);
        let body = self.get_body(&url).await?;
        let items = decode_change_list(&body)?;
        debug!(%collection, after, items = items.len(), "fetched change list");
        Ok(items)
    }

    async fn fetch_entities(
        &self,
        collection: Collection,
        ids: &[String],
    ) -> SyncResult<Vec<EntityPayload>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let url = self.entities_url(collection, ids);
        let body = self.get_body(&url).await?;
        let payloads = decode_entities(collection, &body)?;
        debug!(%collection, requested = ids.len(), received = payloads.len(), "fetched entities");
        Ok(payloads)
    }
}

/// [`HttpClient`] backed by `reqwest`.
#[cfg(feature = "reqwest-client")]
#[derive(Debug, Clone)]
pub struct ReqwestClient {
    client: reqwest::Client,
}

#[cfg(feature = "reqwest-client")]
impl ReqwestClient {
    /// Creates a client applying `timeout` to every request.
    ///
    /// # Errors
    ///
    /// Fails if the TLS backend cannot be initialized.
    pub fn new(timeout: std::time::Duration) -> SyncResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SyncError::network(NetworkErrorKind::Connection, e.to_string()))?;
        Ok(Self { client })
    }

    fn failure(err: reqwest::Error) -> HttpFailure {
        if err.is_timeout() {
            HttpFailure::Timeout(err.to_string())
        } else if err.is_builder() {
            HttpFailure::InvalidRequest(err.to_string())
        } else {
            HttpFailure::Connection(err.to_string())
        }
    }
}

#[cfg(feature = "reqwest-client")]
#[async_trait]
impl HttpClient for ReqwestClient {
    async fn get(&self, url: &str) -> Result<HttpResponse, HttpFailure> {
        let response = self.client.get(url).send().await.map_err(Self::failure)?;
        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(Self::failure)?;
        Ok(HttpResponse {
            status,
            body: body.to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use parking_lot::Mutex;

    /// Answers every request with a fixed response and records URLs.
    struct CannedClient {
        response: Result<HttpResponse, HttpFailure>,
        urls: Mutex<Vec<String>>,
    }

    impl CannedClient {
        fn new(response: Result<HttpResponse, HttpFailure>) -> Self {
            Self {
                response,
                urls: Mutex::new(Vec::new()),
            }
        }

        fn ok(body: &str) -> Self {
            Self::new(Ok(HttpResponse {
                status: 200,
                body: body.as_bytes().to_vec(),
            }))
        }

        fn status(status: u16) -> Self {
            Self::new(Ok(HttpResponse {
                status,
                body: b"nope".to_vec(),
            }))
        }
    }

    #[async_trait]
    impl HttpClient for CannedClient {
        async fn get(&self, url: &str) -> Result<HttpResponse, HttpFailure> {
            self.urls.lock().push(url.to_string());
            self.response.clone()
        }
    }

    #[test]
    fn urls() {
        let transport = HttpTransport::new("https://feed.example.com/", CannedClient::ok(""));
        assert_eq!(
            transport.change_list_url(Collection::NewsResource, 42),
            "https://feed.example.com/changelists/newsresources?after=42"
        );
        assert_eq!(
            transport.entities_url(Collection::Topic, &["1".into(), "a b".into()]),
            "https://feed.example.com/topics?id=1&id=a%20b"
        );
    }

    #[tokio::test]
    async fn decodes_change_list() {
        let transport = HttpTransport::new(
            "http://api",
            CannedClient::ok(r#"{"data":[{"id":"1","changeListVersion":2,"isDelete":false}]}"#),
        );
        let items = transport.fetch_change_list(Collection::Topic, 0).await.unwrap();
        assert_eq!(items, vec![ChangeListItem::upsert("1", 2)]);
        assert!(transport.last_error().is_none());
    }

    #[tokio::test]
    async fn status_classification() {
        for (status, kind) in [
            (500, ErrorKind::NetworkRetryable),
            (503, ErrorKind::NetworkRetryable),
            (429, ErrorKind::NetworkRetryable),
            (404, ErrorKind::NetworkFatal),
            (401, ErrorKind::NetworkFatal),
        ] {
            let transport = HttpTransport::new("http://api", CannedClient::status(status));
            let err = transport
                .fetch_change_list(Collection::Topic, 0)
                .await
                .unwrap_err();
            assert_eq!(err.kind(), kind, "status {status}");
            assert!(transport.last_error().is_some());
        }
    }

    #[tokio::test]
    async fn failures_are_retryable() {
        let transport = HttpTransport::new(
            "http://api",
            CannedClient::new(Err(HttpFailure::Timeout("slow".into()))),
        );
        let err = transport.fetch_change_list(Collection::Topic, 0).await.unwrap_err();
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn invalid_request_is_fatal() {
        let transport = HttpTransport::new(
            "not a url",
            CannedClient::new(Err(HttpFailure::InvalidRequest("relative URL".into()))),
        );
        let err = transport.fetch_change_list(Collection::Topic, 0).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NetworkFatal);
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn unparseable_body_is_fatal() {
        let transport = HttpTransport::new("http://api", CannedClient::ok("<html>"));
        let err = transport.fetch_change_list(Collection::Topic, 0).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NetworkFatal);
    }

    #[tokio::test]
    async fn empty_id_list_makes_no_request() {
        let client = CannedClient::ok("");
        let transport = HttpTransport::new("http://api", client);
        let payloads = transport.fetch_entities(Collection::Topic, &[]).await.unwrap();
        assert!(payloads.is_empty());
        assert!(transport.client.urls.lock().is_empty());
    }
}

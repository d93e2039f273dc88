use async_trait::async_trait;
use axum::body::Bytes;
use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue, IF_NONE_MATCH};
use serde::Deserialize;
use std::time::Duration;
use tracing::{info, instrument, warn};
use url::Url;

use super::{ImageStorage, StorageError, ensure_plain_name};

/// Pushes images to an HTTP blob store with bearer-token auth.
///
/// Objects live at `<endpoint>/<key_prefix>/<name>`. The store may answer a
/// `PUT` with `{"url": ...}`; otherwise the URL is built from
/// `public_base_url` (or the endpoint when that is unset). Uploads are
/// conditional on the key being new, so an existing object is never replaced.
#[derive(Debug, Clone)]
pub struct RemoteImageStorage {
    client: reqwest::Client,
    endpoint: Url,
    auth: HeaderValue,
    public_base_url: Option<Url>,
    key_prefix: String,
}

#[derive(Debug, Deserialize)]
struct PutResponse {
    url: Option<String>,
}

impl RemoteImageStorage {
    pub fn new(
        endpoint: Url,
        token: String,
        public_base_url: Option<Url>,
        key_prefix: String,
    ) -> Result<Self, StorageError> {
        let mut auth = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|_| StorageError::InvalidToken)?;
        auth.set_sensitive(true);
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            client,
            endpoint,
            auth,
            public_base_url,
            key_prefix: key_prefix.trim_matches('/').to_string(),
        })
    }

    fn key(&self, name: &str) -> String {
        if self.key_prefix.is_empty() {
            name.to_string()
        } else {
            format!("{}/{}", self.key_prefix, name)
        }
    }

    fn object_url(base: &Url, key: &str) -> String {
        format!("{}/{}", base.as_str().trim_end_matches('/'), key)
    }

    fn public_url(&self, key: &str) -> String {
        let base = self.public_base_url.as_ref().unwrap_or(&self.endpoint);
        Self::object_url(base, key)
    }

    fn auth_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, self.auth.clone());
        headers
    }
}

#[async_trait]
impl ImageStorage for RemoteImageStorage {
    fn backend_tag(&self) -> &'static str {
        "remote"
    }

    #[instrument(name = "remote_image_store", skip(self, bytes), fields(size = bytes.len()))]
    async fn store(
        &self,
        name: &str,
        bytes: Bytes,
        content_type: &str,
    ) -> Result<String, StorageError> {
        ensure_plain_name(name)?;
        let key = self.key(name);
        let mut headers = self.auth_headers();
        headers.insert(IF_NONE_MATCH, HeaderValue::from_static("*"));
        if let Ok(ct) = HeaderValue::from_str(content_type) {
            headers.insert(CONTENT_TYPE, ct);
        }

        let resp = self
            .client
            .put(Self::object_url(&self.endpoint, &key))
            .headers(headers)
            .body(bytes)
            .send()
            .await?;
        let status = resp.status();
        if status == StatusCode::PRECONDITION_FAILED {
            warn!(key = %key, "blob store already holds this key");
            return Err(StorageError::AlreadyExists(name.to_string()));
        }
        if !status.is_success() {
            warn!(%status, key = %key, "blob store rejected upload");
            return Err(StorageError::UpstreamStatus(status));
        }

        // Stores that answer with an empty or non-JSON body fall back to the public URL.
        let body = resp.bytes().await?;
        let url = serde_json::from_slice::<PutResponse>(&body)
            .ok()
            .and_then(|r| r.url)
            .unwrap_or_else(|| self.public_url(&key));
        info!(key = %key, url = %url, "stored image in blob store");
        Ok(url)
    }

    async fn remove(&self, name: &str) -> Result<(), StorageError> {
        ensure_plain_name(name)?;
        let key = self.key(name);
        let resp = self
            .client
            .delete(Self::object_url(&self.endpoint, &key))
            .headers(self.auth_headers())
            .send()
            .await?;
        let status = resp.status();
        if status.is_success() || status == StatusCode::NOT_FOUND {
            Ok(())
        } else {
            Err(StorageError::UpstreamStatus(status))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::Router;
    use axum::extract::State;
    use axum::http::{Method, Uri};
    use axum::response::{IntoResponse, Response};
    use std::sync::{Arc, Mutex};
    use tokio::net::TcpListener;

    fn storage(public: Option<&str>) -> RemoteImageStorage {
        RemoteImageStorage::new(
            Url::parse("https://blob.example.com/").unwrap(),
            "token".to_string(),
            public.map(|p| Url::parse(p).unwrap()),
            "/schools/".to_string(),
        )
        .unwrap()
    }

    #[derive(Debug, Clone)]
    struct Recorded {
        method: Method,
        path: String,
        headers: HeaderMap,
        body: Bytes,
    }

    #[derive(Clone)]
    struct BlobServer {
        calls: Arc<Mutex<Vec<Recorded>>>,
        put_status: StatusCode,
        put_body: &'static str,
        delete_status: StatusCode,
    }

    impl BlobServer {
        fn new(put_status: StatusCode, put_body: &'static str, delete_status: StatusCode) -> Self {
            Self {
                calls: Arc::default(),
                put_status,
                put_body,
                delete_status,
            }
        }

        fn calls(&self) -> Vec<Recorded> {
            self.calls.lock().unwrap().clone()
        }

        /// Bind on an ephemeral port and return the endpoint to hand to the backend.
        async fn spawn(&self) -> Url {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();
            let app = Router::new().fallback(record).with_state(self.clone());
            tokio::spawn(async move {
                let _ = axum::serve(listener, app).await;
            });
            Url::parse(&format!("http://{addr}/")).unwrap()
        }
    }

    async fn record(
        State(server): State<BlobServer>,
        method: Method,
        uri: Uri,
        headers: HeaderMap,
        body: Bytes,
    ) -> Response {
        let reply = if method == Method::DELETE {
            server.delete_status.into_response()
        } else {
            (server.put_status, server.put_body).into_response()
        };
        server.calls.lock().unwrap().push(Recorded {
            method,
            path: uri.path().to_string(),
            headers,
            body,
        });
        reply
    }

    fn remote(endpoint: Url, public: Option<&str>) -> RemoteImageStorage {
        RemoteImageStorage::new(
            endpoint,
            "token".to_string(),
            public.map(|p| Url::parse(p).unwrap()),
            "schools".to_string(),
        )
        .unwrap()
    }

    #[test]
    fn keys_are_prefixed() {
        let s = storage(None);
        assert_eq!(s.key("1-a.png"), "schools/1-a.png");
        assert_eq!(
            RemoteImageStorage::object_url(&s.endpoint, &s.key("1-a.png")),
            "https://blob.example.com/schools/1-a.png"
        );
    }

    #[test]
    fn public_url_prefers_configured_base() {
        let s = storage(Some("https://cdn.example.com/public"));
        assert_eq!(
            s.public_url("schools/1-a.png"),
            "https://cdn.example.com/public/schools/1-a.png"
        );
        assert_eq!(
            storage(None).public_url("schools/1-a.png"),
            "https://blob.example.com/schools/1-a.png"
        );
    }

    #[test]
    fn malformed_token_is_rejected_up_front() {
        let err = RemoteImageStorage::new(
            Url::parse("https://blob.example.com/").unwrap(),
            "line\nbreak".to_string(),
            None,
            "schools".to_string(),
        )
        .unwrap_err();
        assert!(matches!(err, StorageError::InvalidToken));
    }

    #[tokio::test]
    async fn store_puts_bytes_and_returns_reported_url() {
        let server = BlobServer::new(
            StatusCode::OK,
            r#"{"url":"https://cdn.example.com/schools/1-a.png"}"#,
            StatusCode::OK,
        );
        let s = remote(server.spawn().await, None);

        let url = s
            .store("1-a.png", Bytes::from_static(b"\x89PNG data"), "image/png")
            .await
            .unwrap();
        assert_eq!(url, "https://cdn.example.com/schools/1-a.png");

        let calls = server.calls();
        assert_eq!(calls.len(), 1);
        let put = &calls[0];
        assert_eq!(put.method, Method::PUT);
        assert_eq!(put.path, "/schools/1-a.png");
        assert_eq!(put.headers.get(AUTHORIZATION).unwrap(), "Bearer token");
        assert_eq!(put.headers.get(CONTENT_TYPE).unwrap(), "image/png");
        assert_eq!(put.headers.get(IF_NONE_MATCH).unwrap(), "*");
        assert_eq!(put.body, Bytes::from_static(b"\x89PNG data"));
    }

    #[tokio::test]
    async fn store_without_url_in_reply_uses_public_base() {
        let server = BlobServer::new(StatusCode::CREATED, "", StatusCode::OK);
        let s = remote(server.spawn().await, Some("https://cdn.example.com/public"));

        let url = s
            .store("1-a.png", Bytes::from_static(b"png"), "image/png")
            .await
            .unwrap();
        assert_eq!(url, "https://cdn.example.com/public/schools/1-a.png");
    }

    #[tokio::test]
    async fn rejected_upload_surfaces_status() {
        let server = BlobServer::new(StatusCode::SERVICE_UNAVAILABLE, "", StatusCode::OK);
        let s = remote(server.spawn().await, None);
        let err = s
            .store("1-a.png", Bytes::from_static(b"png"), "image/png")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StorageError::UpstreamStatus(status) if status == StatusCode::SERVICE_UNAVAILABLE
        ));

        let server = BlobServer::new(StatusCode::PRECONDITION_FAILED, "", StatusCode::OK);
        let s = remote(server.spawn().await, None);
        let err = s
            .store("1-a.png", Bytes::from_static(b"png"), "image/png")
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::AlreadyExists(_)));
    }

    #[tokio::test]
    async fn remove_deletes_and_tolerates_missing_objects() {
        let server = BlobServer::new(StatusCode::OK, "", StatusCode::NOT_FOUND);
        let s = remote(server.spawn().await, None);
        s.remove("1-a.png").await.unwrap();

        let calls = server.calls();
        assert_eq!(calls[0].method, Method::DELETE);
        assert_eq!(calls[0].path, "/schools/1-a.png");
        assert_eq!(calls[0].headers.get(AUTHORIZATION).unwrap(), "Bearer token");

        let server = BlobServer::new(StatusCode::OK, "", StatusCode::INTERNAL_SERVER_ERROR);
        let s = remote(server.spawn().await, None);
        assert!(matches!(
            s.remove("1-a.png").await,
            Err(StorageError::UpstreamStatus(status)) if status == StatusCode::INTERNAL_SERVER_ERROR
        ));
    }
}

//! HTTP page fetcher
//!
//! Thin reqwest wrapper implementing `PageFetcher`.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};

use super::collaborators::{FetchedPage, PageFetcher};
use super::error::FetchError;
use crate::constants;

/// Fetcher configuration
#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub timeout_seconds: u64,
    pub max_body_bytes: usize,
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: constants::get_fetch_timeout(),
            max_body_bytes: constants::DEFAULT_MAX_BODY_BYTES,
            user_agent: format!("{}/{}", constants::APP_NAME, constants::APP_VERSION),
        }
    }
}

pub struct HttpFetcher {
    config: FetchConfig,
    http_client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(config: FetchConfig) -> Result<Self, FetchError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en"));

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(config.user_agent.clone())
            .default_headers(headers)
            .build()
            .map_err(|e| FetchError::Client(e.to_string()))?;

        Ok(Self { config, http_client })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
        let parsed = reqwest::Url::parse(url).map_err(|e| FetchError::InvalidUrl(e.to_string()))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(FetchError::InvalidUrl(format!("unsupported scheme '{}'", parsed.scheme())));
        }

        log::debug!("Fetching {}", url);

        let mut response = self.http_client
            .get(parsed)
            .send()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        if let Some(len) = response.content_length() {
            if len as usize > self.config.max_body_bytes {
                return Err(FetchError::BodyTooLarge { limit: self.config.max_body_bytes });
            }
        }

        let headers: HashMap<String, String> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value.to_str().ok().map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();

        // Content-Length may be absent (chunked), so the cap is enforced while reading
        let mut bytes = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(|e| FetchError::Network(e.to_string()))? {
            if bytes.len() + chunk.len() > self.config.max_body_bytes {
                log::debug!("{} exceeded {} bytes, abandoning body", url, self.config.max_body_bytes);
                return Err(FetchError::BodyTooLarge { limit: self.config.max_body_bytes });
            }
            bytes.extend_from_slice(&chunk);
        }

        let body = String::from_utf8_lossy(&bytes).into_owned();
        Ok(FetchedPage::new(url, status.as_u16(), headers, body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_rejects_non_http_scheme() {
        let fetcher = HttpFetcher::new(FetchConfig::default()).unwrap();

        let err = fetcher.fetch("ftp://example.com/file").await.unwrap_err();
        assert!(matches!(err, FetchError::InvalidUrl(_)));

        let err = fetcher.fetch("not a url").await.unwrap_err();
        assert!(matches!(err, FetchError::InvalidUrl(_)));
    }

    #[tokio::test]
    async fn test_fetches_local_page() {
        use axum::{routing::get, Router};

        let app = Router::new()
            .route("/", get(|| async { "<html><body>hello</body></html>" }))
            .route("/missing", get(|| async { (axum::http::StatusCode::NOT_FOUND, "gone") }));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let fetcher = HttpFetcher::new(FetchConfig::default()).unwrap();

        let page = fetcher.fetch(&format!("http://{}/", addr)).await.unwrap();
        assert_eq!(page.status_code, 200);
        assert!(page.body.contains("hello"));
        assert_eq!(page.content_sha256.len(), 64);

        let err = fetcher.fetch(&format!("http://{}/missing", addr)).await.unwrap_err();
        assert_eq!(err, FetchError::Status(404));
    }

    #[tokio::test]
    async fn test_chunked_body_is_capped_while_streaming() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        const TOTAL: usize = 64 * 1024 * 1024;
        const CHUNK: usize = 64 * 1024;

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let written = Arc::new(AtomicUsize::new(0));
        let counter = written.clone();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = [0u8; 4096];
            let _ = socket.read(&mut request).await;

            let head = "HTTP/1.1 200 OK\r\ncontent-type: text/html\r\ntransfer-encoding: chunked\r\n\r\n";
            if socket.write_all(head.as_bytes()).await.is_err() {
                return;
            }
            let data = vec![b'a'; CHUNK];
            while counter.load(Ordering::SeqCst) < TOTAL {
                let frame = format!("{:x}\r\n", CHUNK);
                if socket.write_all(frame.as_bytes()).await.is_err()
                    || socket.write_all(&data).await.is_err()
                    || socket.write_all(b"\r\n").await.is_err()
                {
                    return;
                }
                counter.fetch_add(CHUNK, Ordering::SeqCst);
            }
            let _ = socket.write_all(b"0\r\n\r\n").await;
        });

        let fetcher = HttpFetcher::new(FetchConfig {
            max_body_bytes: 1024,
            ..FetchConfig::default()
        })
        .unwrap();

        let err = fetcher.fetch(&format!("http://{}/", addr)).await.unwrap_err();
        assert_eq!(err, FetchError::BodyTooLarge { limit: 1024 });
        assert!(
            written.load(Ordering::SeqCst) < TOTAL,
            "server streamed the whole body before the fetch returned"
        );
    }
}

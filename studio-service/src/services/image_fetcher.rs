//! Downloads remote images for `/analyze_url`.

use futures::StreamExt;
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Invalid image URL: {0}")]
    InvalidUrl(String),

    #[error("Failed to fetch image: {0}")]
    Request(String),

    #[error("Image exceeds {0} bytes")]
    TooLarge(usize),
}

#[derive(Clone)]
pub struct ImageFetcher {
    client: Client,
    max_bytes: usize,
}

impl ImageFetcher {
    pub fn new(timeout: Duration, max_bytes: usize) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Request(e.to_string()))?;
        Ok(Self { client, max_bytes })
    }

    pub async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let parsed = reqwest::Url::parse(url).map_err(|e| FetchError::InvalidUrl(e.to_string()))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(FetchError::InvalidUrl(format!(
                "unsupported scheme '{}'",
                parsed.scheme()
            )));
        }

        tracing::debug!(url = %parsed, "Fetching remote image");

        let response = self
            .client
            .get(parsed)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| FetchError::Request(e.to_string()))?;

        if let Some(len) = response.content_length() {
            if len as usize > self.max_bytes {
                return Err(FetchError::TooLarge(self.max_bytes));
            }
        }

        // Unsized and chunked bodies are capped while they stream in.
        let mut body = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| FetchError::Request(e.to_string()))?;
            if body.len() + chunk.len() > self.max_bytes {
                tracing::warn!(url = %url, max_bytes = self.max_bytes, "Remote image exceeds size limit");
                return Err(FetchError::TooLarge(self.max_bytes));
            }
            body.extend_from_slice(&chunk);
        }

        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fetcher() -> ImageFetcher {
        ImageFetcher::new(Duration::from_secs(1), 1024).unwrap()
    }

    #[tokio::test]
    async fn rejects_malformed_url() {
        let err = fetcher().fetch("not a url").await.unwrap_err();
        assert!(matches!(err, FetchError::InvalidUrl(_)));
    }

    #[tokio::test]
    async fn rejects_non_http_scheme() {
        let err = fetcher().fetch("file:///etc/passwd").await.unwrap_err();
        assert!(matches!(err, FetchError::InvalidUrl(_)));
    }

    /// Serves one response that streams chunks without a length until the
    /// client hangs up.
    async fn endless_chunked_server() -> String {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = [0u8; 1024];
            let _ = socket.read(&mut request).await;
            let head = "HTTP/1.1 200 OK\r\ncontent-type: image/png\r\ntransfer-encoding: chunked\r\n\r\n";
            if socket.write_all(head.as_bytes()).await.is_err() {
                return;
            }
            let chunk = format!("1000\r\n{}\r\n", "a".repeat(4096));
            while socket.write_all(chunk.as_bytes()).await.is_ok() {}
        });
        format!("http://{}/image.png", addr)
    }

    #[tokio::test]
    async fn chunked_body_over_limit_stops_early() {
        let url = endless_chunked_server().await;
        let fetcher = ImageFetcher::new(Duration::from_secs(30), 1024).unwrap();

        let err = tokio::time::timeout(Duration::from_secs(5), fetcher.fetch(&url))
            .await
            .expect("fetch kept reading past the size limit")
            .unwrap_err();
        assert!(matches!(err, FetchError::TooLarge(1024)));
    }
}

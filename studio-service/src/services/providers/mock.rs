//! Mock provider implementation for testing.
//!
//! Replies are scripted up front; every request is recorded so tests can
//! inspect the model name and prompt the gateway sent.

use super::{
    Candidate, ContentProvider, ContentRequest, ContentResponse, ErrorKind, Part, ProviderError,
};
use async_trait::async_trait;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use std::io::Cursor;
use std::sync::Mutex;

/// What the mock answers with.
#[derive(Debug, Clone)]
pub enum MockReply {
    /// Text part followed by an inline PNG.
    Image { text: Option<String>, png: Vec<u8> },
    Text(String),
    NoCandidates,
    /// A candidate with no content parts.
    EmptyContent,
    Fail(ErrorKind),
}

pub struct MockProvider {
    reply: MockReply,
    requests: Mutex<Vec<ContentRequest>>,
}

impl MockProvider {
    pub fn new(reply: MockReply) -> Self {
        Self {
            reply,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Replies with a solid-colour PNG of the given size.
    pub fn with_image(width: u32, height: u32) -> Self {
        Self::new(MockReply::Image {
            text: Some("Mock image".to_string()),
            png: sample_png(width, height),
        })
    }

    pub fn with_text(text: impl Into<String>) -> Self {
        Self::new(MockReply::Text(text.into()))
    }

    pub fn failing(kind: ErrorKind) -> Self {
        Self::new(MockReply::Fail(kind))
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or(0)
    }

    pub fn last_request(&self) -> Option<ContentRequest> {
        self.requests.lock().ok().and_then(|r| r.last().cloned())
    }
}

#[async_trait]
impl ContentProvider for MockProvider {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn generate_content(
        &self,
        request: ContentRequest,
    ) -> Result<ContentResponse, ProviderError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request);
        }

        let parts = match &self.reply {
            MockReply::Image { text, png } => {
                let mut parts = Vec::new();
                if let Some(text) = text {
                    parts.push(Part::text(text.clone()));
                }
                parts.push(Part::png(png.clone()));
                parts
            }
            MockReply::Text(text) => vec![Part::text(text.clone())],
            MockReply::NoCandidates => return Ok(ContentResponse::default()),
            MockReply::EmptyContent => Vec::new(),
            MockReply::Fail(kind) => {
                return Err(ProviderError::of_kind(*kind, "mock provider failure"))
            }
        };

        Ok(ContentResponse {
            candidates: vec![Candidate {
                parts,
                finish_reason: Some("STOP".to_string()),
            }],
        })
    }

    async fn health_check(&self) -> Result<(), ProviderError> {
        match &self.reply {
            MockReply::Fail(kind) => Err(ProviderError::of_kind(*kind, "mock provider failure")),
            _ => Ok(()),
        }
    }
}

/// Encode a small solid-colour PNG.
pub fn sample_png(width: u32, height: u32) -> Vec<u8> {
    let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([30, 144, 255])));
    let mut out = Cursor::new(Vec::new());
    // Writing an in-memory RGB PNG only fails on allocation failure.
    let _ = img.write_to(&mut out, ImageFormat::Png);
    out.into_inner()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn records_requests() {
        let provider = MockProvider::with_text("hello");
        let request = ContentRequest::new("gemini-2.5-pro", vec![Part::text("hi")]);

        let response = provider.generate_content(request).await.unwrap();

        assert_eq!(response.text().as_deref(), Some("hello"));
        assert_eq!(provider.call_count(), 1);
        assert_eq!(provider.last_request().unwrap().model, "gemini-2.5-pro");
    }

    #[tokio::test]
    async fn failing_mock_returns_requested_kind() {
        let provider = MockProvider::failing(ErrorKind::Quota);
        let err = provider
            .generate_content(ContentRequest::new("m", vec![]))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Quota);
        assert!(provider.health_check().await.is_err());
    }

    #[test]
    fn sample_png_decodes_to_requested_size() {
        let img = image::load_from_memory(&sample_png(12, 7)).unwrap();
        assert_eq!((img.width(), img.height()), (12, 7));
    }
}

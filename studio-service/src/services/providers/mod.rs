//! AI provider abstractions and implementations.
//!
//! The gateway talks to a [`ContentProvider`] trait object so the Gemini
//! backend can be swapped for the mock in tests.

pub mod gemini;
pub mod mock;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

/// Provider-independent failure category, used for user-facing messages and
/// metric labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Credential,
    Quota,
    Permission,
    ModelNotFound,
    Transient,
    Unknown,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Credential => "credential",
            ErrorKind::Quota => "quota",
            ErrorKind::Permission => "permission",
            ErrorKind::ModelNotFound => "model_not_found",
            ErrorKind::Transient => "transient",
            ErrorKind::Unknown => "unknown",
        }
    }
}

/// Error type for provider operations.
#[derive(Error, Debug, Clone)]
pub enum ProviderError {
    #[error("Invalid or missing credential: {0}")]
    InvalidCredential(String),

    #[error("Quota exceeded or rate limited: {0}")]
    QuotaExceeded(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Transient provider failure: {0}")]
    Transient(String),

    #[error("API error: {0}")]
    Api(String),
}

impl ProviderError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ProviderError::InvalidCredential(_) => ErrorKind::Credential,
            ProviderError::QuotaExceeded(_) => ErrorKind::Quota,
            ProviderError::PermissionDenied(_) => ErrorKind::Permission,
            ProviderError::ModelNotFound(_) => ErrorKind::ModelNotFound,
            ProviderError::Transient(_) => ErrorKind::Transient,
            ProviderError::Api(_) => ErrorKind::Unknown,
        }
    }

    /// Build an error of the given kind, for adapters and test doubles.
    pub fn of_kind(kind: ErrorKind, message: impl Into<String>) -> Self {
        let message = message.into();
        match kind {
            ErrorKind::Credential => ProviderError::InvalidCredential(message),
            ErrorKind::Quota => ProviderError::QuotaExceeded(message),
            ErrorKind::Permission => ProviderError::PermissionDenied(message),
            ErrorKind::ModelNotFound => ProviderError::ModelNotFound(message),
            ErrorKind::Transient => ProviderError::Transient(message),
            ErrorKind::Unknown => ProviderError::Api(message),
        }
    }
}

/// One piece of multimodal content.
#[derive(Debug, Clone, PartialEq)]
pub enum Part {
    Text(String),
    InlineData { mime_type: String, data: Vec<u8> },
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Part::Text(text.into())
    }

    pub fn png(data: Vec<u8>) -> Self {
        Part::InlineData {
            mime_type: "image/png".to_string(),
            data,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modality {
    Text,
    Image,
}

/// A single-turn generation request.
#[derive(Debug, Clone)]
pub struct ContentRequest {
    pub model: String,
    pub parts: Vec<Part>,
    /// Empty means provider default (text only).
    pub response_modalities: Vec<Modality>,
}

impl ContentRequest {
    pub fn new(model: impl Into<String>, parts: Vec<Part>) -> Self {
        Self {
            model: model.into(),
            parts,
            response_modalities: Vec::new(),
        }
    }

    pub fn with_image_output(mut self) -> Self {
        self.response_modalities = vec![Modality::Text, Modality::Image];
        self
    }

    /// Concatenated text parts, used for logging and assertions.
    pub fn prompt_text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|p| match p {
                Part::Text(t) => Some(t.as_str()),
                Part::InlineData { .. } => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn image_count(&self) -> usize {
        self.parts
            .iter()
            .filter(|p| matches!(p, Part::InlineData { .. }))
            .count()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Candidate {
    /// Empty when the provider returned a candidate with no content.
    pub parts: Vec<Part>,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ContentResponse {
    pub candidates: Vec<Candidate>,
}

impl ContentResponse {
    /// Concatenated text of the first candidate, if any.
    pub fn text(&self) -> Option<String> {
        let candidate = self.candidates.first()?;
        let text: String = candidate
            .parts
            .iter()
            .filter_map(|p| match p {
                Part::Text(t) => Some(t.as_str()),
                Part::InlineData { .. } => None,
            })
            .collect();
        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

/// Trait for multimodal content generation providers (e.g., Gemini).
#[async_trait]
pub trait ContentProvider: Send + Sync {
    /// Short provider name for logs and metrics.
    fn name(&self) -> &'static str;

    async fn generate_content(
        &self,
        request: ContentRequest,
    ) -> Result<ContentResponse, ProviderError>;

    async fn health_check(&self) -> Result<(), ProviderError>;
}

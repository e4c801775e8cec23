//! Gemini AI provider implementation.
//!
//! Single-turn `generateContent` calls with mixed text and inline image parts.
//! Image bytes travel base64-encoded in both directions.

use super::{
    Candidate, ContentProvider, ContentRequest, ContentResponse, Modality, Part, ProviderError,
};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const API_KEY_HEADER: &str = "x-goog-api-key";

/// Gemini provider configuration.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: Secret<String>,
    pub api_base: String,
    pub timeout: Duration,
}

pub struct GeminiProvider {
    config: GeminiConfig,
    client: Client,
}

impl GeminiProvider {
    pub fn new(config: GeminiConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ProviderError::Api(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    fn api_url(&self, model: &str, method: &str) -> String {
        format!(
            "{}/models/{}:{}",
            self.config.api_base.trim_end_matches('/'),
            model,
            method
        )
    }

    fn build_request(request: &ContentRequest) -> GenerateContentRequest {
        let parts = request
            .parts
            .iter()
            .map(|part| match part {
                Part::Text(text) => WirePart {
                    text: Some(text.clone()),
                    inline_data: None,
                },
                Part::InlineData { mime_type, data } => WirePart {
                    text: None,
                    inline_data: Some(InlineData {
                        mime_type: mime_type.clone(),
                        data: BASE64.encode(data),
                    }),
                },
            })
            .collect();

        let generation_config = if request.response_modalities.is_empty() {
            None
        } else {
            Some(GenerationConfig {
                response_modalities: request
                    .response_modalities
                    .iter()
                    .map(|m| match m {
                        Modality::Text => "TEXT".to_string(),
                        Modality::Image => "IMAGE".to_string(),
                    })
                    .collect(),
            })
        };

        GenerateContentRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts,
            }],
            generation_config,
        }
    }

    fn parse_response(api_response: GenerateContentResponse) -> Result<ContentResponse, ProviderError> {
        let mut candidates = Vec::with_capacity(api_response.candidates.len());

        for candidate in api_response.candidates {
            let mut parts = Vec::new();
            for part in candidate.content.map(|c| c.parts).unwrap_or_default() {
                if let Some(inline) = part.inline_data {
                    let data = BASE64.decode(inline.data.as_bytes()).map_err(|e| {
                        ProviderError::Api(format!("Invalid inline image data: {}", e))
                    })?;
                    parts.push(Part::InlineData {
                        mime_type: inline.mime_type,
                        data,
                    });
                } else if let Some(text) = part.text {
                    parts.push(Part::Text(text));
                }
            }
            candidates.push(Candidate {
                parts,
                finish_reason: candidate.finish_reason,
            });
        }

        Ok(ContentResponse { candidates })
    }
}

#[async_trait]
impl ContentProvider for GeminiProvider {
    fn name(&self) -> &'static str {
        "gemini"
    }

    async fn generate_content(
        &self,
        request: ContentRequest,
    ) -> Result<ContentResponse, ProviderError> {
        let body = Self::build_request(&request);
        let url = self.api_url(&request.model, "generateContent");

        tracing::debug!(
            model = %request.model,
            image_parts = request.image_count(),
            prompt_len = request.prompt_text().len(),
            "Sending request to Gemini API"
        );

        let response = self
            .client
            .post(&url)
            .header(API_KEY_HEADER, self.config.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::Transient(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(classify_error(status, &error_text));
        }

        let api_response: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Api(format!("Failed to parse response: {}", e)))?;

        Self::parse_response(api_response)
    }

    async fn health_check(&self) -> Result<(), ProviderError> {
        let url = format!("{}/models", self.config.api_base.trim_end_matches('/'));

        let response = self
            .client
            .get(&url)
            .header(API_KEY_HEADER, self.config.api_key.expose_secret())
            .send()
            .await
            .map_err(|e| ProviderError::Transient(e.to_string()))?;

        if response.status().is_success() {
            Ok(())
        } else {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            Err(classify_error(status, &error_text))
        }
    }
}

/// Map an HTTP failure to a [`ProviderError`] using the status code and the
/// `error.status` / `error.details[].reason` fields of the Gemini error body.
pub fn classify_error(status: StatusCode, body: &str) -> ProviderError {
    let envelope: Option<ErrorEnvelope> = serde_json::from_str(body).ok();
    let (api_status, message, reasons) = match envelope {
        Some(ErrorEnvelope { error }) => {
            let reasons: Vec<String> = error
                .details
                .iter()
                .filter_map(|d| d.get("reason").and_then(|r| r.as_str()))
                .map(str::to_string)
                .collect();
            (error.status.unwrap_or_default(), error.message, reasons)
        }
        None => (String::new(), body.to_string(), Vec::new()),
    };

    let message = if message.is_empty() {
        format!("Gemini API error {}", status)
    } else {
        message
    };

    let key_invalid = reasons.iter().any(|r| r == "API_KEY_INVALID");

    if status == StatusCode::UNAUTHORIZED || api_status == "UNAUTHENTICATED" || key_invalid {
        ProviderError::InvalidCredential(message)
    } else if status == StatusCode::TOO_MANY_REQUESTS || api_status == "RESOURCE_EXHAUSTED" {
        ProviderError::QuotaExceeded(message)
    } else if status == StatusCode::FORBIDDEN || api_status == "PERMISSION_DENIED" {
        ProviderError::PermissionDenied(message)
    } else if status == StatusCode::NOT_FOUND || api_status == "NOT_FOUND" {
        ProviderError::ModelNotFound(message)
    } else if status.is_server_error()
        || matches!(api_status.as_str(), "UNAVAILABLE" | "INTERNAL" | "DEADLINE_EXCEEDED")
    {
        ProviderError::Transient(message)
    } else {
        ProviderError::Api(message)
    }
}

// ============================================================================
// Gemini API types
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<WirePart>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WirePart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_modalities: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<WireCandidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireCandidate {
    content: Option<Content>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    status: Option<String>,
    #[serde(default)]
    details: Vec<serde_json::Value>,
}

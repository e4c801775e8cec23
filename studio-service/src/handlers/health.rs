use crate::services::metrics::get_metrics;
use crate::startup::AppState;
use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde_json::{json, Value};

pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let models = state.studio.models();
    let api_status = if state.studio.is_configured() {
        "available"
    } else {
        "unavailable"
    };

    Json(json!({
        "status": "healthy",
        "message": "AI Image & Text API is running",
        "service": "studio-service",
        "version": env!("CARGO_PKG_VERSION"),
        "gemini_api": api_status,
        "capabilities": {
            "text_qa": [
                "natural language questions",
                "conversational responses",
                "general knowledge"
            ],
            "image_analysis": [
                "detailed descriptions",
                "object segmentation",
                "base64 and URL support"
            ],
            "image_generation": [
                "text-to-image generation",
                "image editing",
                "multi-image composition",
                "style presets"
            ]
        },
        "models": [models.analysis_model, models.image_model],
    }))
}

/// Ready when a provider client exists and the provider answers its health
/// check.
pub async fn readiness_check(State(state): State<AppState>) -> impl IntoResponse {
    let Some(provider) = state.studio.provider() else {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({"status": "not_ready", "gemini_api": "unavailable"})),
        );
    };

    match provider.health_check().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({"status": "ready", "gemini_api": "available"})),
        ),
        Err(e) => {
            tracing::warn!(
                provider = provider.name(),
                kind = e.kind().as_str(),
                error = %e,
                "Provider health check failed"
            );
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "not_ready",
                    "gemini_api": "unreachable",
                    "reason": e.kind().as_str(),
                })),
            )
        }
    }
}

pub async fn metrics_endpoint() -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        get_metrics(),
    )
}

pub async fn api_docs(State(state): State<AppState>, headers: HeaderMap) -> impl IntoResponse {
    let base_url = base_url(&headers);
    Json(api_document(&base_url, &state))
}

/// Public base URL as the client saw it, honouring a reverse proxy's
/// `x-forwarded-proto` and `x-forwarded-host`.
fn base_url(headers: &HeaderMap) -> String {
    let forwarded = |name: &str| {
        headers
            .get(name)
            .and_then(|h| h.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };

    let scheme = forwarded("x-forwarded-proto").unwrap_or("http");
    let host = forwarded("x-forwarded-host")
        .or_else(|| headers.get(header::HOST).and_then(|h| h.to_str().ok()))
        .unwrap_or("localhost");
    format!("{}://{}/", scheme, host)
}

fn api_document(base_url: &str, state: &AppState) -> Value {
    let catalog = state.studio.catalog();
    let styles: Vec<&str> = catalog.styles().iter().map(|s| s.key).collect();
    let ratios: Vec<&str> = catalog.ratios().iter().map(|r| r.key).collect();

    json!({
        "message": "AI Image Analysis & Generation API",
        "version": "2.0",
        "description": "Complete AI-powered image processing with Google Gemini",
        "base_url": base_url,
        "endpoints": {
            "image_analysis": {
                "/analyze_base64": {
                    "method": "POST",
                    "description": "Analyze Base64 encoded images",
                    "payload": {
                        "image": "base64_encoded_image_string (required)",
                        "extract_masks": "boolean (optional)"
                    }
                },
                "/analyze_url": {
                    "method": "POST",
                    "description": "Analyze images from URLs",
                    "payload": {
                        "url": "image_url_string (required)",
                        "extract_masks": "boolean (optional)"
                    }
                }
            },
            "image_generation": {
                "/generate_text_to_image": {
                    "method": "POST",
                    "description": "Generate images from text prompts",
                    "payload": {
                        "prompt": "text_description (required)",
                        "style": "style_key (optional)",
                        "aspect_ratio": "ratio_key (optional)"
                    }
                },
                "/edit_image": {
                    "method": "POST",
                    "description": "Edit images using text prompts",
                    "payload": {
                        "prompt": "edit_description (required)",
                        "image": "base64_encoded_image (required)",
                        "edit_strength": "number 0-1 (optional)"
                    }
                },
                "/compose_images": {
                    "method": "POST",
                    "description": "Compose multiple images",
                    "payload": {
                        "prompt": "composition_description (required)",
                        "images": "array_of_base64_images (required, min 2)"
                    }
                }
            },
            "text_qa": {
                "/ask": {
                    "method": "POST",
                    "description": "Answer text questions",
                    "payload": {
                        "question": "question_text (required)",
                        "model": "model_name (optional)"
                    }
                }
            },
            "utility": {
                "/health": {"method": "GET", "description": "API health check"},
                "/ready": {"method": "GET", "description": "Readiness probe"},
                "/metrics": {"method": "GET", "description": "Prometheus metrics"},
                "/api": {"method": "GET", "description": "This documentation"}
            }
        },
        "styles": styles,
        "aspect_ratios": ratios,
        "chat_models": catalog.chat_models(),
        "features": [
            "Image Analysis with AI descriptions",
            "Object Segmentation with masks",
            "Text-to-Image Generation",
            "AI-powered Image Editing",
            "Multi-Image Composition",
            "Style Presets and Templates",
            "Base64 and URL support",
            "Real-time processing"
        ]
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn base_url_defaults_to_plain_host() {
        let mut headers = HeaderMap::new();
        assert_eq!(base_url(&headers), "http://localhost/");

        headers.insert(header::HOST, HeaderValue::from_static("studio.local:8080"));
        assert_eq!(base_url(&headers), "http://studio.local:8080/");
    }

    #[test]
    fn base_url_prefers_forwarded_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, HeaderValue::from_static("10.0.0.5:8080"));
        headers.insert("x-forwarded-proto", HeaderValue::from_static("https, http"));
        assert_eq!(base_url(&headers), "https://10.0.0.5:8080/");

        headers.insert("x-forwarded-host", HeaderValue::from_static("studio.example.org"));
        assert_eq!(base_url(&headers), "https://studio.example.org/");
    }
}

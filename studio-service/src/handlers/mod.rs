pub mod analysis;
pub mod chat;
pub mod generation;
pub mod health;

pub use analysis::{analyze_base64, analyze_url};
pub use chat::ask;
pub use generation::{compose_images, edit_image, generate_text_to_image};
pub use health::{api_docs, health_check, metrics_endpoint, readiness_check};

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use service_core::error::AppError;

/// Decode a base64 image field, accepting an optional
/// `data:image/...;base64,` prefix and embedded whitespace.
pub fn decode_base64_image(value: &str) -> Result<Vec<u8>, base64::DecodeError> {
    let payload = match value.strip_prefix("data:image") {
        Some(rest) => rest.split_once(',').map(|(_, data)| data).unwrap_or(""),
        None => value,
    };
    let compact: String = payload.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    BASE64.decode(compact.as_bytes())
}

pub(crate) fn encode_base64(bytes: &[u8]) -> String {
    BASE64.encode(bytes)
}

/// Non-blank string field, or a 400 carrying `message`.
pub(crate) fn required<'a>(value: Option<&'a str>, message: &str) -> Result<&'a str, AppError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(AppError::BadRequest(anyhow::anyhow!(message.to_string()))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_url_prefix_is_stripped() {
        let decoded = decode_base64_image("data:image/png;base64,aGVsbG8=").unwrap();
        assert_eq!(decoded, b"hello");
    }

    #[test]
    fn bare_base64_with_line_breaks_decodes() {
        assert_eq!(decode_base64_image("aGVs\nbG8=").unwrap(), b"hello");
    }

    #[test]
    fn garbage_is_an_error() {
        assert!(decode_base64_image("***").is_err());
    }

    #[test]
    fn blank_required_field_is_rejected() {
        assert!(required(Some("   "), "No prompt provided").is_err());
        assert!(required(None, "No prompt provided").is_err());
        assert_eq!(required(Some("cat"), "No prompt provided").unwrap(), "cat");
    }
}

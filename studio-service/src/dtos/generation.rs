use crate::services::studio::ImageOptions;
use serde::{Deserialize, Serialize};
use validator::Validate;

pub const DEFAULT_EDIT_STRENGTH: f32 = 0.7;

#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    pub prompt: Option<String>,
    pub style: Option<String>,
    pub aspect_ratio: Option<String>,
}

impl GenerateRequest {
    pub fn options(&self) -> ImageOptions {
        ImageOptions {
            style: self.style.clone(),
            aspect_ratio: self.aspect_ratio.clone(),
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct EditRequest {
    pub image: Option<String>,
    pub prompt: Option<String>,
    pub style: Option<String>,
    pub aspect_ratio: Option<String>,
    /// Accepted for compatibility; the model has no strength control.
    #[validate(range(min = 0.0, max = 1.0, message = "edit_strength must be between 0 and 1"))]
    pub edit_strength: Option<f32>,
}

impl EditRequest {
    pub fn options(&self) -> ImageOptions {
        ImageOptions {
            style: self.style.clone(),
            aspect_ratio: self.aspect_ratio.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ComposeRequest {
    pub images: Option<Vec<String>>,
    pub prompt: Option<String>,
    pub style: Option<String>,
    pub aspect_ratio: Option<String>,
}

impl ComposeRequest {
    pub fn options(&self) -> ImageOptions {
        ImageOptions {
            style: self.style.clone(),
            aspect_ratio: self.aspect_ratio.clone(),
        }
    }
}

/// Response shared by generation, editing and composition.
#[derive(Debug, Serialize)]
pub struct ImageResponse {
    pub status: &'static str,
    pub prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_images_count: Option<usize>,
    pub generated_text: Option<String>,
    /// Base64 of the post-processed PNG as stored on disk.
    pub generated_image: String,
    pub saved_files: Vec<String>,
    pub total_images: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edit_strength_outside_unit_range_fails_validation() {
        let req: EditRequest =
            serde_json::from_str(r#"{"image": "x", "prompt": "y", "edit_strength": 1.5}"#).unwrap();
        assert!(req.validate().is_err());
    }

    #[test]
    fn missing_edit_strength_is_valid() {
        let req: EditRequest = serde_json::from_str(r#"{"image": "x", "prompt": "y"}"#).unwrap();
        assert!(req.validate().is_ok());
    }

    #[test]
    fn compose_response_includes_input_count() {
        let response = ImageResponse {
            status: "success",
            prompt: "p".into(),
            input_images_count: Some(2),
            generated_text: None,
            generated_image: "aGk=".into(),
            saved_files: vec!["composed_image_x.png".into()],
            total_images: 1,
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["input_images_count"], 2);
        assert!(json["generated_text"].is_null());
    }
}

use crate::services::studio::{Analysis, SegmentationMask};
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Deserialize)]
pub struct AnalyzeBase64Request {
    /// Base64 image, optionally as a `data:image/...;base64,` URL.
    pub image: Option<String>,
    #[serde(default)]
    pub extract_masks: bool,
}

#[derive(Debug, Deserialize, Validate)]
pub struct AnalyzeUrlRequest {
    #[validate(url(message = "Invalid image URL"))]
    pub url: Option<String>,
    #[serde(default)]
    pub extract_masks: bool,
}

#[derive(Debug, Serialize)]
pub struct AnalysisResponse {
    pub status: &'static str,
    pub analysis: String,
    pub segmentation_masks: Vec<SegmentationMask>,
}

impl From<Analysis> for AnalysisResponse {
    fn from(result: Analysis) -> Self {
        Self {
            status: super::STATUS_SUCCESS,
            analysis: result.analysis,
            segmentation_masks: result.segmentation_masks,
        }
    }
}

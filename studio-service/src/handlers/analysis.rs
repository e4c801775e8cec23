use crate::dtos::{AnalysisResponse, AnalyzeBase64Request, AnalyzeUrlRequest};
use crate::handlers::{decode_base64_image, required};
use crate::startup::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use service_core::error::AppError;
use validator::Validate;

pub async fn analyze_base64(
    State(state): State<AppState>,
    payload: Result<Json<AnalyzeBase64Request>, JsonRejection>,
) -> Result<Json<AnalysisResponse>, AppError> {
    let Json(req) = payload?;
    let image = required(req.image.as_deref(), "No image data provided")?;
    let bytes = decode_base64_image(image)
        .map_err(|e| AppError::BadRequest(anyhow::anyhow!("Invalid base64 image data: {}", e)))?;

    let result = state.studio.analyze(bytes, req.extract_masks).await?;
    Ok(Json(result.into()))
}

pub async fn analyze_url(
    State(state): State<AppState>,
    payload: Result<Json<AnalyzeUrlRequest>, JsonRejection>,
) -> Result<Json<AnalysisResponse>, AppError> {
    let Json(req) = payload?;
    let url = required(req.url.as_deref(), "No image URL provided")?;
    req.validate()?;

    tracing::info!(url = %url, "Analyzing image from URL");
    let result = state.studio.analyze_url(url, req.extract_masks).await?;
    Ok(Json(result.into()))
}

use crate::dtos::generation::DEFAULT_EDIT_STRENGTH;
use crate::dtos::{ComposeRequest, EditRequest, GenerateRequest, ImageResponse, STATUS_SUCCESS};
use crate::handlers::{decode_base64_image, encode_base64, required};
use crate::services::studio::GeneratedImage;
use crate::startup::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use service_core::error::AppError;
use validator::Validate;

pub async fn generate_text_to_image(
    State(state): State<AppState>,
    payload: Result<Json<GenerateRequest>, JsonRejection>,
) -> Result<Json<ImageResponse>, AppError> {
    let Json(req) = payload?;
    let prompt = required(req.prompt.as_deref(), "No prompt provided")?;

    let result = state
        .studio
        .generate_from_text(prompt, &req.options())
        .await?;
    let response = image_response(&state, prompt, result, None).await?;
    Ok(Json(response))
}

pub async fn edit_image(
    State(state): State<AppState>,
    payload: Result<Json<EditRequest>, JsonRejection>,
) -> Result<Json<ImageResponse>, AppError> {
    const MISSING: &str = "Prompt and image are required";

    let Json(req) = payload?;
    let prompt = required(req.prompt.as_deref(), MISSING)?;
    let image = required(req.image.as_deref(), MISSING)?;
    req.validate()?;

    let bytes = decode_base64_image(image)
        .map_err(|e| AppError::BadRequest(anyhow::anyhow!("Invalid base64 image data: {}", e)))?;
    let strength = req.edit_strength.unwrap_or(DEFAULT_EDIT_STRENGTH);

    let result = state
        .studio
        .edit_image(bytes, prompt, &req.options(), strength)
        .await?;
    let response = image_response(&state, prompt, result, None).await?;
    Ok(Json(response))
}

pub async fn compose_images(
    State(state): State<AppState>,
    payload: Result<Json<ComposeRequest>, JsonRejection>,
) -> Result<Json<ImageResponse>, AppError> {
    const MISSING: &str = "Prompt and images are required";

    let Json(req) = payload?;
    let prompt = required(req.prompt.as_deref(), MISSING)?;
    let encoded = req
        .images
        .as_deref()
        .ok_or_else(|| AppError::BadRequest(anyhow::anyhow!(MISSING)))?;

    if encoded.len() < 2 {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "At least 2 images are required for composition"
        )));
    }

    let images = encoded
        .iter()
        .enumerate()
        .map(|(i, image)| {
            decode_base64_image(image).map_err(|e| {
                AppError::BadRequest(anyhow::anyhow!("Failed to decode image {}: {}", i + 1, e))
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    let count = images.len();

    let result = state
        .studio
        .compose_images(images, prompt, &req.options())
        .await?;
    let response = image_response(&state, prompt, result, Some(count)).await?;
    Ok(Json(response))
}

/// Re-read the stored file so the response carries exactly the bytes on disk.
async fn image_response(
    state: &AppState,
    prompt: &str,
    result: GeneratedImage,
    input_images_count: Option<usize>,
) -> Result<ImageResponse, AppError> {
    let bytes = state
        .studio
        .store()
        .read(&result.saved.filename)
        .await
        .map_err(|e| {
            AppError::InternalError(anyhow::anyhow!(
                "Failed to read saved image {}: {}",
                result.saved.filename,
                e
            ))
        })?;

    Ok(ImageResponse {
        status: STATUS_SUCCESS,
        prompt: prompt.to_string(),
        input_images_count,
        generated_text: result.response_text,
        generated_image: encode_base64(&bytes),
        saved_files: vec![result.saved.filename],
        total_images: 1,
    })
}

use crate::dtos::{AskRequest, AskResponse};
use crate::handlers::required;
use crate::services::studio::StudioError;
use crate::startup::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use service_core::error::AppError;

/// Answer a text question. An unconfigured client is reported before the
/// body is even looked at.
pub async fn ask(
    State(state): State<AppState>,
    payload: Result<Json<AskRequest>, JsonRejection>,
) -> Result<Json<AskResponse>, AppError> {
    if !state.studio.is_configured() {
        return Err(StudioError::ClientNotInitialized.into());
    }

    let Json(req) = payload?;
    let Some(question) = req.question.as_deref() else {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "Please provide a 'question' in the request body."
        )));
    };
    let question = required(Some(question), "Question cannot be empty.")?;

    let answer = state.studio.ask(question, req.model.as_deref()).await?;
    Ok(Json(answer.into()))
}

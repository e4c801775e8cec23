use crate::services::studio::Answer;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct AskRequest {
    pub question: Option<String>,
    /// Must be on the chat allow-list; anything else uses the default model.
    pub model: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AskResponse {
    pub status: &'static str,
    pub question: String,
    pub answer: String,
    pub model_used: String,
}

impl From<Answer> for AskResponse {
    fn from(answer: Answer) -> Self {
        Self {
            status: super::STATUS_SUCCESS,
            question: answer.question,
            answer: answer.answer,
            model_used: answer.model_used,
        }
    }
}

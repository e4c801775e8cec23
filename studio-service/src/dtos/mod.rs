pub mod analysis;
pub mod chat;
pub mod generation;

pub use analysis::{AnalysisResponse, AnalyzeBase64Request, AnalyzeUrlRequest};
pub use chat::{AskRequest, AskResponse};
pub use generation::{ComposeRequest, EditRequest, GenerateRequest, ImageResponse};

pub const STATUS_SUCCESS: &str = "success";

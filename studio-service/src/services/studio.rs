//! The AI gateway: one method per capability, each building a request,
//! calling the provider and turning the response into a result or a
//! [`StudioError`].

use crate::catalog::Catalog;
use crate::config::ModelConfig;
use crate::imaging;
use crate::services::image_fetcher::{FetchError, ImageFetcher};
use crate::services::image_store::{ImageStore, SavedImage};
use crate::services::metrics;
use crate::services::prompts;
use crate::services::providers::{
    ContentProvider, ContentRequest, ContentResponse, ErrorKind, Part, ProviderError,
};
use serde::{Deserialize, Serialize};
use service_core::error::AppError;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;

const CLIENT_NOT_INITIALIZED: &str =
    "Gemini API client not initialized. Please check your GOOGLE_API_KEY environment variable.";
const UNABLE_TO_ANALYZE: &str = "Unable to analyze the image.";

/// Provider call made by the gateway, used for metric labels and messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Analyze,
    Segment,
    Generate,
    Edit,
    Compose,
    Ask,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Analyze => "analyze",
            Operation::Segment => "segment",
            Operation::Generate => "generate",
            Operation::Edit => "edit",
            Operation::Compose => "compose",
            Operation::Ask => "ask",
        }
    }

    fn failure_prefix(&self) -> &'static str {
        match self {
            Operation::Analyze => "Error analyzing image",
            Operation::Segment => "Failed to extract segmentation masks",
            Operation::Generate => "Failed to generate image",
            Operation::Edit => "Failed to edit image",
            Operation::Compose => "Failed to compose images",
            Operation::Ask => "An error occurred",
        }
    }

    /// Human-readable message for a classified provider failure.
    pub fn provider_message(&self, err: &ProviderError) -> String {
        match (self, err.kind()) {
            (Operation::Ask, ErrorKind::Credential) => "Invalid or missing Gemini API key.".into(),
            (Operation::Ask, ErrorKind::Quota) => {
                "API quota exceeded. Please try again later.".into()
            }
            (Operation::Ask, ErrorKind::ModelNotFound) => {
                "Model not available. Please try a different model.".into()
            }
            (_, ErrorKind::Credential) => "Invalid or missing Gemini API key. Please check your \
                GOOGLE_API_KEY environment variable."
                .into(),
            (_, ErrorKind::Quota) => {
                "API quota exceeded or rate limit reached. Please try again later.".into()
            }
            (_, ErrorKind::Permission) => {
                "Permission denied. Please check your API key permissions.".into()
            }
            _ => format!("{}: {}", self.failure_prefix(), err),
        }
    }
}

/// Image-producing operations and their per-operation wording.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageJob {
    Generate,
    Edit,
    Compose,
}

impl ImageJob {
    pub fn operation(&self) -> Operation {
        match self {
            ImageJob::Generate => Operation::Generate,
            ImageJob::Edit => Operation::Edit,
            ImageJob::Compose => Operation::Compose,
        }
    }

    pub fn file_prefix(&self) -> &'static str {
        match self {
            ImageJob::Generate => "generated_image",
            ImageJob::Edit => "edited_image",
            ImageJob::Compose => "composed_image",
        }
    }

    fn noun(&self) -> &'static str {
        match self {
            ImageJob::Generate => "generated",
            ImageJob::Edit => "edited",
            ImageJob::Compose => "composed",
        }
    }

    fn no_candidates_message(&self) -> &'static str {
        match self {
            ImageJob::Generate => "No image generated by the API. Please try a different prompt.",
            ImageJob::Edit => {
                "No edited image generated by the API. Please try a different prompt or image."
            }
            ImageJob::Compose => {
                "No composed image generated by the API. Please try a different prompt or images."
            }
        }
    }

    fn empty_content_message(&self) -> &'static str {
        match self {
            ImageJob::Generate => "Invalid response from image generation API",
            ImageJob::Edit => "Invalid response from image editing API",
            ImageJob::Compose => "Invalid response from image composition API",
        }
    }

    fn no_image_message(&self) -> &'static str {
        match self {
            ImageJob::Generate => {
                "No image data received from the API. The model may not support this prompt."
            }
            ImageJob::Edit => {
                "No edited image data received from the API. The model may not support this edit."
            }
            ImageJob::Compose => {
                "No composed image data received from the API. The model may not support this composition."
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum StudioError {
    #[error("{}", CLIENT_NOT_INITIALIZED)]
    ClientNotInitialized,

    #[error("{0}")]
    InvalidInput(String),

    #[error("{}", .0.no_candidates_message())]
    NoCandidates(ImageJob),

    #[error("{}", .0.empty_content_message())]
    EmptyContent(ImageJob),

    #[error("{}", .0.no_image_message())]
    NoImage(ImageJob),

    #[error("No response generated. Please try rephrasing your question.")]
    NoAnswer,

    #[error("{}", .operation.provider_message(.source))]
    Provider {
        operation: Operation,
        source: ProviderError,
    },

    #[error("Failed to save {} image: {message}", .job.noun())]
    Save { job: ImageJob, message: String },

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("{0}")]
    Internal(String),
}

impl StudioError {
    pub fn provider_kind(&self) -> Option<ErrorKind> {
        match self {
            StudioError::Provider { source, .. } => Some(source.kind()),
            _ => None,
        }
    }
}

impl From<StudioError> for AppError {
    fn from(err: StudioError) -> Self {
        match err {
            StudioError::ClientNotInitialized => {
                AppError::ServiceUnavailable(CLIENT_NOT_INITIALIZED.to_string())
            }
            StudioError::InvalidInput(msg) => AppError::BadRequest(anyhow::anyhow!(msg)),
            StudioError::Fetch(FetchError::Request(msg)) => {
                AppError::BadGateway(format!("Failed to fetch image: {}", msg))
            }
            StudioError::Fetch(e) => AppError::BadRequest(anyhow::anyhow!(e.to_string())),
            StudioError::Internal(msg) => AppError::InternalError(anyhow::anyhow!(msg)),
            other => AppError::UpstreamFailure(other.to_string()),
        }
    }
}

/// One object found by segmentation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentationMask {
    pub label: String,
    /// `[ymin, xmin, ymax, xmax]`, normalized to 0-1000.
    pub box_2d: Vec<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mask: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Analysis {
    pub analysis: String,
    pub segmentation_masks: Vec<SegmentationMask>,
}

/// A successfully produced image, already post-processed on disk.
#[derive(Debug, Clone)]
pub struct GeneratedImage {
    pub saved: SavedImage,
    pub response_text: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Answer {
    pub question: String,
    pub answer: String,
    pub model_used: String,
}

/// Options shared by the image-producing operations.
#[derive(Debug, Clone, Default)]
pub struct ImageOptions {
    pub style: Option<String>,
    pub aspect_ratio: Option<String>,
}

#[derive(Clone)]
pub struct Studio {
    provider: Option<Arc<dyn ContentProvider>>,
    store: ImageStore,
    catalog: Catalog,
    models: ModelConfig,
    fetcher: ImageFetcher,
}

impl Studio {
    pub fn new(
        provider: Option<Arc<dyn ContentProvider>>,
        store: ImageStore,
        catalog: Catalog,
        models: ModelConfig,
        fetcher: ImageFetcher,
    ) -> Self {
        Self {
            provider,
            store,
            catalog,
            models,
            fetcher,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.provider.is_some()
    }

    pub fn provider(&self) -> Option<&Arc<dyn ContentProvider>> {
        self.provider.as_ref()
    }

    pub fn store(&self) -> &ImageStore {
        &self.store
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn models(&self) -> &ModelConfig {
        &self.models
    }

    fn require_provider(&self) -> Result<&Arc<dyn ContentProvider>, StudioError> {
        self.provider
            .as_ref()
            .ok_or(StudioError::ClientNotInitialized)
    }

    async fn call(
        &self,
        provider: &Arc<dyn ContentProvider>,
        operation: Operation,
        request: ContentRequest,
    ) -> Result<ContentResponse, StudioError> {
        let start = Instant::now();
        let result = provider.generate_content(request).await;
        let outcome = match &result {
            Ok(_) => "success",
            Err(e) => e.kind().as_str(),
        };
        metrics::record_provider_request(operation.as_str(), outcome, start.elapsed());

        result.map_err(|source| {
            tracing::error!(
                operation = operation.as_str(),
                provider = provider.name(),
                kind = source.kind().as_str(),
                error = %source,
                "Provider request failed"
            );
            StudioError::Provider { operation, source }
        })
    }

    /// Describe an image, optionally with segmentation masks.
    ///
    /// The input may be any decodable raster format; it is sent as PNG.
    pub async fn analyze(&self, image: Vec<u8>, extract_masks: bool) -> Result<Analysis, StudioError> {
        let provider = self.require_provider()?;
        let png = reencode_png(image).await?;

        let describe = async {
            let request = ContentRequest::new(
                self.models.analysis_model.clone(),
                vec![Part::png(png.clone()), Part::text(prompts::ANALYSIS_PROMPT)],
            );
            let response = self.call(provider, Operation::Analyze, request).await?;
            Ok::<_, StudioError>(response.text().unwrap_or_else(|| UNABLE_TO_ANALYZE.to_string()))
        };

        let (analysis, segmentation_masks) = if extract_masks {
            // Segmentation never fails, so a failed description returns at once.
            let segment = async { Ok::<_, StudioError>(self.segment(provider, png.clone()).await) };
            tokio::try_join!(describe, segment)?
        } else {
            (describe.await?, Vec::new())
        };

        Ok(Analysis {
            analysis,
            segmentation_masks,
        })
    }

    pub async fn analyze_url(&self, url: &str, extract_masks: bool) -> Result<Analysis, StudioError> {
        self.require_provider()?;
        let image = self.fetcher.fetch(url).await?;
        self.analyze(image, extract_masks).await
    }

    /// Segmentation is best effort: any failure is logged and yields no masks.
    async fn segment(&self, provider: &Arc<dyn ContentProvider>, png: Vec<u8>) -> Vec<SegmentationMask> {
        let request = ContentRequest::new(
            self.models.analysis_model.clone(),
            vec![Part::png(png), Part::text(prompts::SEGMENTATION_PROMPT)],
        );

        match self.call(provider, Operation::Segment, request).await {
            Ok(response) => response
                .text()
                .map(|text| parse_segmentation(&text))
                .unwrap_or_default(),
            Err(e) => {
                tracing::warn!(error = %e, "Segmentation failed, returning no masks");
                Vec::new()
            }
        }
    }

    pub async fn generate_from_text(
        &self,
        prompt: &str,
        options: &ImageOptions,
    ) -> Result<GeneratedImage, StudioError> {
        let provider = self.require_provider()?;
        let style = self.catalog.style(options.style.as_deref());
        let ratio = self.catalog.aspect_ratio(options.aspect_ratio.as_deref());
        let enhanced = prompts::generation(prompt, &style, &ratio);

        tracing::info!(prompt = %prompt, style = style.key, aspect_ratio = ratio.key, "Generating image");
        tracing::debug!(enhanced_prompt = %enhanced, "Enhanced prompt");

        let request =
            ContentRequest::new(self.models.image_model.clone(), vec![Part::text(enhanced)])
                .with_image_output();
        self.produce_image(provider, ImageJob::Generate, request, ratio.key)
            .await
    }

    pub async fn edit_image(
        &self,
        image: Vec<u8>,
        prompt: &str,
        options: &ImageOptions,
        edit_strength: f32,
    ) -> Result<GeneratedImage, StudioError> {
        let provider = self.require_provider()?;
        let png = reencode_png(image).await?;
        let style = self.catalog.style(options.style.as_deref());
        let ratio = self.catalog.aspect_ratio(options.aspect_ratio.as_deref());
        let enhanced = prompts::edit(prompt, &style, &ratio);

        tracing::info!(
            prompt = %prompt,
            style = style.key,
            aspect_ratio = ratio.key,
            edit_strength,
            "Editing image"
        );

        let request = ContentRequest::new(
            self.models.image_model.clone(),
            vec![Part::png(png), Part::text(enhanced)],
        )
        .with_image_output();
        self.produce_image(provider, ImageJob::Edit, request, ratio.key)
            .await
    }

    pub async fn compose_images(
        &self,
        images: Vec<Vec<u8>>,
        prompt: &str,
        options: &ImageOptions,
    ) -> Result<GeneratedImage, StudioError> {
        let provider = self.require_provider()?;
        if images.len() < 2 {
            return Err(StudioError::InvalidInput(
                "At least 2 images are required for composition".to_string(),
            ));
        }

        let style = self.catalog.style(options.style.as_deref());
        let ratio = self.catalog.aspect_ratio(options.aspect_ratio.as_deref());
        let enhanced = prompts::composition(prompt, images.len(), &style, &ratio);

        let mut parts = Vec::with_capacity(images.len() + 1);
        for (i, image) in images.into_iter().enumerate() {
            let png = reencode_png(image).await.map_err(|e| match e {
                StudioError::InvalidInput(msg) => {
                    StudioError::InvalidInput(format!("Failed to decode image {}: {}", i + 1, msg))
                }
                other => other,
            })?;
            parts.push(Part::png(png));
        }
        parts.push(Part::text(enhanced));

        tracing::info!(
            prompt = %prompt,
            image_count = parts.len() - 1,
            style = style.key,
            aspect_ratio = ratio.key,
            "Composing images"
        );

        let request =
            ContentRequest::new(self.models.image_model.clone(), parts).with_image_output();
        self.produce_image(provider, ImageJob::Compose, request, ratio.key)
            .await
    }

    /// Answer a free-form question with a model from the allow-list.
    pub async fn ask(&self, question: &str, model: Option<&str>) -> Result<Answer, StudioError> {
        let provider = self.require_provider()?;
        let question = question.trim();
        if question.is_empty() {
            return Err(StudioError::InvalidInput("Question cannot be empty.".to_string()));
        }

        let model_used = self.catalog.chat_model(model);
        tracing::info!(model = %model_used, question_len = question.len(), "Answering question");

        let request = ContentRequest::new(model_used.clone(), vec![Part::text(question)]);
        let response = self.call(provider, Operation::Ask, request).await?;
        let answer = response.text().ok_or(StudioError::NoAnswer)?;

        Ok(Answer {
            question: question.to_string(),
            answer,
            model_used,
        })
    }

    async fn produce_image(
        &self,
        provider: &Arc<dyn ContentProvider>,
        job: ImageJob,
        request: ContentRequest,
        ratio_key: &'static str,
    ) -> Result<GeneratedImage, StudioError> {
        let response = self.call(provider, job.operation(), request).await?;

        let candidate = response.candidates.into_iter().next().ok_or_else(|| {
            tracing::error!(operation = job.operation().as_str(), "No candidates returned");
            StudioError::NoCandidates(job)
        })?;
        let finish_reason = candidate.finish_reason.clone().unwrap_or_default();
        if candidate.parts.is_empty() {
            tracing::error!(
                operation = job.operation().as_str(),
                finish_reason = %finish_reason,
                "No content parts in response"
            );
            return Err(StudioError::EmptyContent(job));
        }

        let mut response_text: Option<String> = None;
        let mut saved: Option<SavedImage> = None;

        for part in candidate.parts {
            match part {
                Part::Text(text) => {
                    tracing::info!(text = %text, "Provider response text");
                    response_text.get_or_insert_with(String::new).push_str(&text);
                }
                Part::InlineData { data, .. } if saved.is_none() && !data.is_empty() => {
                    saved = Some(self.save_and_fit(job, &data, ratio_key).await?);
                }
                Part::InlineData { .. } => {}
            }
        }

        let saved = saved.ok_or_else(|| {
            tracing::error!(
                operation = job.operation().as_str(),
                finish_reason = %finish_reason,
                "No image data in response"
            );
            StudioError::NoImage(job)
        })?;

        Ok(GeneratedImage {
            saved,
            response_text,
        })
    }

    async fn save_and_fit(
        &self,
        job: ImageJob,
        data: &[u8],
        ratio_key: &'static str,
    ) -> Result<SavedImage, StudioError> {
        let saved = self
            .store
            .save(job.file_prefix(), data)
            .await
            .map_err(|e| StudioError::Save {
                job,
                message: e.to_string(),
            })?;
        metrics::record_image_saved(job.operation().as_str());

        let path = saved.path.clone();
        let resized =
            tokio::task::spawn_blocking(move || imaging::fit_file_to_aspect_ratio(&path, ratio_key))
                .await;
        match resized {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => {
                tracing::warn!(path = %saved.path.display(), error = %e, "Resize failed, keeping original image");
            }
            Err(e) => {
                tracing::warn!(path = %saved.path.display(), error = %e, "Resize task failed, keeping original image");
            }
        }

        Ok(saved)
    }
}

/// Decode any supported raster format and re-encode it as PNG off the async
/// runtime.
async fn reencode_png(image: Vec<u8>) -> Result<Vec<u8>, StudioError> {
    tokio::task::spawn_blocking(move || imaging::to_png(&image))
        .await
        .map_err(|e| StudioError::Internal(format!("image task failed: {}", e)))?
        .map_err(|e| StudioError::InvalidInput(e.to_string()))
}

/// Extract the JSON list from model output, tolerating code fences and
/// surrounding prose. Entries that do not fit the mask shape are dropped.
pub fn parse_segmentation(text: &str) -> Vec<SegmentationMask> {
    let (Some(start), Some(end)) = (text.find('['), text.rfind(']')) else {
        return Vec::new();
    };
    if end < start {
        return Vec::new();
    }

    match serde_json::from_str::<Vec<serde_json::Value>>(&text[start..=end]) {
        Ok(values) => values
            .into_iter()
            .filter_map(|v| serde_json::from_value(v).ok())
            .collect(),
        Err(e) => {
            tracing::debug!(error = %e, "Segmentation output is not a JSON list");
            Vec::new()
        }
    }
}

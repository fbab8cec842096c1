//! The `DocumentPipeline` facade: one object holding the credentials and a
//! client per stage.
//!
//! Stages are composed by the caller. A typical run is
//!
//! ```text
//! extract_text(path) ──▶ capture(prompt, text) ──▶ submit_for_review(path, completion, …)
//! ```
//!
//! Each stage is built only when its credentials or endpoints are present in
//! the [`PipelineConfig`]; calling an unconfigured stage fails with
//! [`ExtractorError::InvalidConfig`].

use crate::config::PipelineConfig;
use crate::error::ExtractorError;
use crate::pipeline::encode;
use crate::pipeline::extract::TextExtractor;
use crate::pipeline::llm::{CompletionResult, Summarizer};
use crate::pipeline::ocr::{OcrEngine, TextractEngine};
use crate::pipeline::render;
use crate::pipeline::review::{Priority, ReviewClient, ReviewedTask};
use crate::progress::ProgressCallback;
use image::DynamicImage;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Document → text → completion → review, with immutable configuration.
///
/// # Example
/// ```rust,no_run
/// use t2_extractor::{DocumentPipeline, LlmCredentials, OcrCredentials, PipelineConfig, Priority};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = PipelineConfig::builder()
///     .ocr(OcrCredentials::new("AKIA...", "secret"))
///     .llm(LlmCredentials::new("sk-...", "gpt-4o-mini"))
///     .review_endpoints("https://portal.example/api/tasks/", "https://portal.example/api/tasks/project/")
///     .build()?;
/// let pipeline = DocumentPipeline::new(config)?;
///
/// let text = pipeline.extract_text("invoice.pdf").await?;
/// let answer = pipeline.capture("Return the invoice number and total as JSON", &text, 350).await?;
/// pipeline
///     .submit_for_review("invoice.pdf", &answer.completion, "invoice", "portal-token", "12", Priority::High)
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct DocumentPipeline {
    config: PipelineConfig,
    extractor: Option<TextExtractor>,
    summarizer: Option<Summarizer>,
    review: Option<ReviewClient>,
}

impl DocumentPipeline {
    /// Build every stage the configuration has credentials for.
    pub fn new(config: PipelineConfig) -> Result<Self, ExtractorError> {
        let extractor = config.ocr.as_ref().map(|creds| {
            let engine = TextractEngine::new(creds, config.ocr_endpoint.as_deref());
            TextExtractor::new(Arc::new(engine))
        });
        let summarizer = match config.llm {
            Some(_) => Some(Summarizer::from_config(&config)?),
            None => None,
        };
        let review = match (&config.review_tasks_url, &config.review_list_url) {
            (Some(_), Some(_)) => Some(ReviewClient::from_config(&config)?),
            _ => None,
        };

        info!(
            "Pipeline ready: ocr={} completion={} review={}",
            extractor.is_some(),
            summarizer.is_some(),
            review.is_some()
        );

        Ok(Self {
            config,
            extractor,
            summarizer,
            review,
        })
    }

    /// Replace the OCR backend. Call [`Self::with_progress`] afterwards to observe it.
    pub fn with_ocr_engine(mut self, engine: Arc<dyn OcrEngine>) -> Self {
        self.extractor = Some(TextExtractor::new(engine));
        self
    }

    /// Attach a per-page progress callback to the text extractor.
    pub fn with_progress(mut self, progress: ProgressCallback) -> Self {
        self.extractor = self.extractor.map(|e| e.with_progress(progress));
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    fn extractor(&self) -> Result<&TextExtractor, ExtractorError> {
        self.extractor.as_ref().ok_or_else(|| {
            ExtractorError::InvalidConfig("OCR credentials are not configured".into())
        })
    }

    fn summarizer(&self) -> Result<&Summarizer, ExtractorError> {
        self.summarizer.as_ref().ok_or_else(|| {
            ExtractorError::InvalidConfig("LLM credentials are not configured".into())
        })
    }

    fn review(&self) -> Result<&ReviewClient, ExtractorError> {
        self.review.as_ref().ok_or_else(|| {
            ExtractorError::InvalidConfig("review portal endpoints are not configured".into())
        })
    }

    // ── Rasterizer ────────────────────────────────────────────────────────

    /// Rasterise a PDF (at the configured DPI) or load a raster image.
    pub async fn document_to_images(
        &self,
        path: impl AsRef<Path>,
    ) -> Result<Vec<(usize, DynamicImage)>, ExtractorError> {
        render::document_to_images(path.as_ref(), self.config.dpi).await
    }

    /// Base64 PNG of the last image in `images`.
    pub fn images_to_base64(&self, images: &[(usize, DynamicImage)]) -> Result<String, ExtractorError> {
        encode::images_to_base64(images)
    }

    // ── TextExtractor ─────────────────────────────────────────────────────

    /// OCR a document and return its LINE text in page order.
    pub async fn extract_text(&self, path: impl AsRef<Path>) -> Result<String, ExtractorError> {
        self.extractor()?.extract_text(path).await
    }

    // ── Summarizer ────────────────────────────────────────────────────────

    /// Apply `prompt` to `text` with an explicit token budget.
    pub async fn capture(
        &self,
        prompt: &str,
        text: &str,
        max_tokens: u32,
    ) -> Result<CompletionResult, ExtractorError> {
        self.summarizer()?.capture(prompt, text, max_tokens).await
    }

    /// Apply `prompt` to `text` with the configured token budget.
    pub async fn capture_default(&self, prompt: &str, text: &str) -> Result<CompletionResult, ExtractorError> {
        self.summarizer()?.capture_default(prompt, text).await
    }

    // ── ReviewSubmitter ───────────────────────────────────────────────────

    /// Post the document and captured data to the review portal.
    pub async fn submit_for_review(
        &self,
        path: impl AsRef<Path>,
        completion: &str,
        layout: &str,
        token: &str,
        project: &str,
        priority: Priority,
    ) -> Result<(), ExtractorError> {
        self.review()?
            .submit_for_review(path, completion, layout, token, project, priority)
            .await
    }

    /// List the tasks of a project.
    pub async fn list_reviewed_tasks(
        &self,
        project_id: &str,
        token: &str,
    ) -> Result<Vec<ReviewedTask>, ExtractorError> {
        self.review()?.list_reviewed_tasks(project_id, token).await
    }
}

/// Synchronous wrapper around [`DocumentPipeline`].
///
/// Owns a private tokio runtime; each call blocks until its request
/// completes. Do not use from inside an async context.
pub struct BlockingPipeline {
    runtime: tokio::runtime::Runtime,
    inner: DocumentPipeline,
}

impl BlockingPipeline {
    pub fn new(config: PipelineConfig) -> Result<Self, ExtractorError> {
        let runtime = tokio::runtime::Runtime::new()
            .map_err(|e| ExtractorError::Internal(format!("Failed to create tokio runtime: {}", e)))?;
        let inner = DocumentPipeline::new(config)?;
        Ok(Self { runtime, inner })
    }

    pub fn from_pipeline(inner: DocumentPipeline) -> Result<Self, ExtractorError> {
        let runtime = tokio::runtime::Runtime::new()
            .map_err(|e| ExtractorError::Internal(format!("Failed to create tokio runtime: {}", e)))?;
        Ok(Self { runtime, inner })
    }

    pub fn pipeline(&self) -> &DocumentPipeline {
        &self.inner
    }

    pub fn document_to_images(
        &self,
        path: impl AsRef<Path>,
    ) -> Result<Vec<(usize, DynamicImage)>, ExtractorError> {
        self.runtime.block_on(self.inner.document_to_images(path))
    }

    pub fn extract_text(&self, path: impl AsRef<Path>) -> Result<String, ExtractorError> {
        self.runtime.block_on(self.inner.extract_text(path))
    }

    pub fn capture(&self, prompt: &str, text: &str, max_tokens: u32) -> Result<CompletionResult, ExtractorError> {
        self.runtime.block_on(self.inner.capture(prompt, text, max_tokens))
    }

    pub fn submit_for_review(
        &self,
        path: impl AsRef<Path>,
        completion: &str,
        layout: &str,
        token: &str,
        project: &str,
        priority: Priority,
    ) -> Result<(), ExtractorError> {
        self.runtime.block_on(
            self.inner
                .submit_for_review(path, completion, layout, token, project, priority),
        )
    }

    pub fn list_reviewed_tasks(&self, project_id: &str, token: &str) -> Result<Vec<ReviewedTask>, ExtractorError> {
        self.runtime
            .block_on(self.inner.list_reviewed_tasks(project_id, token))
    }
}

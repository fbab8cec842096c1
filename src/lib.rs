//! # t2-extractor
//!
//! Capture structured data from scanned documents and hand it to humans for
//! review.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF / JPG / PNG / BMP
//!  │
//!  ├─ 1. Rasterize  pages → images → base64 PNG (pdfium, 300 DPI)
//!  ├─ 2. Extract    page bytes → AWS Textract → LINE text, in page order
//!  ├─ 3. Capture    "<prompt>: <text>" → chat completion + token usage
//!  └─ 4. Review     document + completion → T2 Verification task
//! ```
//!
//! The stages are independent; the caller decides how to chain them.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use t2_extractor::{DocumentPipeline, LlmCredentials, OcrCredentials, PipelineConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = PipelineConfig::builder()
//!         .ocr(OcrCredentials::new("AKIA...", "secret").region("us-east-1"))
//!         .llm(LlmCredentials::new("sk-...", "gpt-4o-mini"))
//!         .build()?;
//!     let pipeline = DocumentPipeline::new(config)?;
//!
//!     let text = pipeline.extract_text("nota_fiscal.pdf").await?;
//!     let answer = pipeline
//!         .capture_default("Extract the issuer name and CNPJ as JSON", &text)
//!         .await?;
//!     println!("{}", answer.completion);
//!     eprintln!("tokens: {} in / {} out", answer.prompt_tokens, answer.completion_tokens);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `t2x` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! ## Native dependency
//!
//! PDF handling binds to libpdfium at runtime. Set `PDFIUM_LIB_PATH` to the
//! library (or its directory) when it is not on the system search path.
//! Raster images do not need pdfium.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod document_pipeline;
pub mod error;
pub mod pipeline;
pub mod progress;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{LlmCredentials, OcrCredentials, PipelineConfig, PipelineConfigBuilder};
pub use document_pipeline::{BlockingPipeline, DocumentPipeline};
pub use error::{ErrorKind, ExtractorError, ServiceStage};
pub use pipeline::extract::TextExtractor;
pub use pipeline::input::DocumentKind;
pub use pipeline::llm::{CompletionResult, Summarizer};
pub use pipeline::ocr::{BlockKind, OcrEngine, TextBlock, TextractEngine};
pub use pipeline::review::{flatten_verification, Priority, ReviewClient, ReviewTask, ReviewedTask};
pub use progress::{ExtractionProgress, ProgressCallback};

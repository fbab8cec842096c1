//! Error types for the t2-extractor library.
//!
//! Every fallible operation returns [`ExtractorError`]. Three variants form
//! the caller-facing taxonomy and can be told apart through
//! [`ExtractorError::kind`]:
//!
//! * [`ErrorKind::UnsupportedFormat`] — the document extension is not one of
//!   `pdf`, `jpg`, `jpeg`, `png`, `bmp`.
//! * [`ErrorKind::ExternalService`] — the OCR service, the completion API or
//!   the review portal answered with a failure status, or the request never
//!   completed.
//! * [`ErrorKind::MalformedResponse`] — a service answered successfully but
//!   the body did not have the expected shape.
//!
//! The remaining variants cover local failures (missing file, pdfium,
//! configuration) and map to [`ErrorKind::Local`].

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// The external service a failure originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceStage {
    /// AWS Textract text detection.
    Ocr,
    /// LLM chat completion.
    Completion,
    /// T2 Verification portal.
    Review,
}

impl fmt::Display for ServiceStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ServiceStage::Ocr => "OCR",
            ServiceStage::Completion => "completion",
            ServiceStage::Review => "review portal",
        };
        f.write_str(name)
    }
}

/// Coarse classification of an [`ExtractorError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    UnsupportedFormat,
    ExternalService,
    MalformedResponse,
    Local,
}

/// All errors returned by the t2-extractor library.
#[derive(Debug, Error)]
pub enum ExtractorError {
    // ── Taxonomy ──────────────────────────────────────────────────────────
    /// The document extension is not supported.
    #[error("Unsupported document format '{extension}' for '{path}'\nSupported: pdf, jpg, jpeg, png, bmp")]
    UnsupportedFormat { path: PathBuf, extension: String },

    /// An external service failed or could not be reached.
    #[error("{stage} request failed: {message}")]
    ExternalService { stage: ServiceStage, message: String },

    /// An external service answered with an unexpected payload.
    #[error("Malformed {stage} response: {detail}")]
    MalformedResponse { stage: ServiceStage, detail: String },

    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Document not found: '{path}'")]
    FileNotFound { path: PathBuf },

    /// Reading the document failed.
    #[error("Failed to read '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Rendering errors ──────────────────────────────────────────────────
    /// pdfium or the image codec failed for a specific page.
    #[error("Rasterisation failed for page {page}: {detail}")]
    RasterisationFailed { page: usize, detail: String },

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\
Set PDFIUM_LIB_PATH to the directory or file of an existing libpdfium."
    )]
    PdfiumBindingFailed(String),

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed or a required endpoint is missing.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ExtractorError {
    /// Classify this error into the caller-facing taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ExtractorError::UnsupportedFormat { .. } => ErrorKind::UnsupportedFormat,
            ExtractorError::ExternalService { .. } => ErrorKind::ExternalService,
            ExtractorError::MalformedResponse { .. } => ErrorKind::MalformedResponse,
            _ => ErrorKind::Local,
        }
    }

    pub(crate) fn service(stage: ServiceStage, message: impl Into<String>) -> Self {
        ExtractorError::ExternalService {
            stage,
            message: message.into(),
        }
    }

    pub(crate) fn malformed(stage: ServiceStage, detail: impl Into<String>) -> Self {
        ExtractorError::MalformedResponse {
            stage,
            detail: detail.into(),
        }
    }
}

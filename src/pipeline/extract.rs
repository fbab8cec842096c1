//! Document text extraction: OCR every page and concatenate LINE blocks.
//!
//! A PDF is split into single-page documents held in memory and each page
//! is submitted on its own, strictly in page order. A raster image is
//! submitted once as-is. The first failing page aborts the whole call and
//! no partial text is returned.

use crate::error::ExtractorError;
use crate::pipeline::input::{self, DocumentKind};
use crate::pipeline::ocr::{append_lines, OcrEngine};
use crate::pipeline::render;
use crate::progress::{NoopProgress, ProgressCallback};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Extracts plain text from PDFs and raster images through an [`OcrEngine`].
#[derive(Clone)]
pub struct TextExtractor {
    engine: Arc<dyn OcrEngine>,
    progress: ProgressCallback,
}

impl TextExtractor {
    pub fn new(engine: Arc<dyn OcrEngine>) -> Self {
        Self {
            engine,
            progress: Arc::new(NoopProgress),
        }
    }

    /// Attach a per-page progress callback.
    pub fn with_progress(mut self, progress: ProgressCallback) -> Self {
        self.progress = progress;
        self
    }

    /// Extract the text of the document at `path`.
    ///
    /// # Returns
    /// Every LINE block text followed by `\n`, page by page.
    ///
    /// # Errors
    /// - [`ExtractorError::UnsupportedFormat`] for anything but pdf/jpg/jpeg/png/bmp
    /// - [`ExtractorError::ExternalService`] when an OCR request fails
    pub async fn extract_text(&self, path: impl AsRef<Path>) -> Result<String, ExtractorError> {
        let path = path.as_ref();
        let kind = input::resolve_local(path)?;

        let pages = match kind {
            DocumentKind::Pdf => {
                info!("Extracting text from PDF: {}", path.display());
                render::split_pages(path).await?
            }
            DocumentKind::Image => {
                info!("Extracting text from image: {}", path.display());
                vec![input::read_document(path).await?]
            }
        };

        let text = self.extract_pages(&pages).await?;
        info!("Extracted {} chars from {}", text.len(), path.display());
        Ok(text)
    }

    /// OCR pre-split page documents in order and concatenate their lines.
    pub async fn extract_pages(&self, pages: &[Vec<u8>]) -> Result<String, ExtractorError> {
        let total = pages.len();
        self.progress.on_extraction_start(total);
        debug!("OCR engine '{}' processing {} pages", self.engine.name(), total);

        let mut text = String::new();
        for (idx, page) in pages.iter().enumerate() {
            let page_num = idx + 1;
            self.progress.on_page_start(page_num, total);

            let result = match self.engine.detect_document_text(page).await {
                Ok(blocks) => append_lines(&mut text, &blocks),
                Err(e) => Err(e),
            };

            match result {
                Ok(lines) => {
                    debug!("Page {}/{}: {} lines", page_num, total, lines);
                    self.progress.on_page_complete(page_num, total, lines);
                }
                Err(e) => {
                    warn!("Page {}/{}: OCR failed — {}", page_num, total, e);
                    self.progress.on_page_error(page_num, total, e.to_string());
                    return Err(e);
                }
            }
        }

        self.progress.on_extraction_complete(total, text.len());
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ServiceStage;
    use crate::pipeline::ocr::TextBlock;
    use crate::progress::ExtractionProgress;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Answers `P<n>` where n is the page payload's first byte.
    struct PageNumberEngine {
        fail_on: Option<u8>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl OcrEngine for PageNumberEngine {
        fn name(&self) -> &str {
            "page-number"
        }

        async fn detect_document_text(&self, document: &[u8]) -> Result<Vec<TextBlock>, ExtractorError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let n = document[0];
            if Some(n) == self.fail_on {
                return Err(ExtractorError::service(ServiceStage::Ocr, "throttled"));
            }
            Ok(vec![TextBlock::page(), TextBlock::line(format!("P{n}")), TextBlock::word(format!("P{n}"))])
        }
    }

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<String>>,
    }

    impl ExtractionProgress for Recorder {
        fn on_extraction_start(&self, total_pages: usize) {
            self.events.lock().unwrap().push(format!("start {total_pages}"));
        }
        fn on_page_complete(&self, page_num: usize, _total: usize, lines: usize) {
            self.events.lock().unwrap().push(format!("done {page_num} {lines}"));
        }
        fn on_page_error(&self, page_num: usize, _total: usize, _error: String) {
            self.events.lock().unwrap().push(format!("error {page_num}"));
        }
    }

    #[tokio::test]
    async fn pages_are_concatenated_in_order() {
        let engine = Arc::new(PageNumberEngine {
            fail_on: None,
            calls: AtomicUsize::new(0),
        });
        let extractor = TextExtractor::new(engine.clone());
        let pages: Vec<Vec<u8>> = (1..=4u8).map(|n| vec![n]).collect();

        let text = extractor.extract_pages(&pages).await.unwrap();
        assert_eq!(text, "P1\nP2\nP3\nP4\n");
        assert_eq!(engine.calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn failing_page_aborts_remaining_pages() {
        let engine = Arc::new(PageNumberEngine {
            fail_on: Some(2),
            calls: AtomicUsize::new(0),
        });
        let recorder = Arc::new(Recorder::default());
        let extractor = TextExtractor::new(engine.clone()).with_progress(recorder.clone());
        let pages: Vec<Vec<u8>> = (1..=3u8).map(|n| vec![n]).collect();

        let err = extractor.extract_pages(&pages).await.unwrap_err();
        assert!(matches!(err, ExtractorError::ExternalService { .. }));
        assert_eq!(engine.calls.load(Ordering::SeqCst), 2);
        assert_eq!(
            *recorder.events.lock().unwrap(),
            vec!["start 3", "done 1 1", "error 2"]
        );
    }

    #[tokio::test]
    async fn image_is_submitted_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("receipt.JPG");
        std::fs::write(&path, [7u8, 0, 0]).unwrap();

        let engine = Arc::new(PageNumberEngine {
            fail_on: None,
            calls: AtomicUsize::new(0),
        });
        let text = TextExtractor::new(engine.clone())
            .extract_text(&path)
            .await
            .unwrap();
        assert_eq!(text, "P7\n");
        assert_eq!(engine.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unsupported_extension_fails_without_ocr() {
        let engine = Arc::new(PageNumberEngine {
            fail_on: None,
            calls: AtomicUsize::new(0),
        });
        let err = TextExtractor::new(engine.clone())
            .extract_text("contract.docx")
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractorError::UnsupportedFormat { .. }));
        assert_eq!(engine.calls.load(Ordering::SeqCst), 0);
    }
}

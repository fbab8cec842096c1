//! End-to-end tests that need native or live resources.
//!
//! The PDF tests need libpdfium and are skipped unless `PDFIUM_LIB_PATH` is
//! set. The live Textract test additionally needs `E2E_ENABLED`, AWS
//! credentials, and `T2_E2E_DOCUMENT` pointing at a scanned document.
//!
//! Run with:
//!   PDFIUM_LIB_PATH=/opt/pdfium/lib cargo test --test e2e -- --nocapture

use async_trait::async_trait;
use base64::Engine as _;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use t2_extractor::pipeline::render::bind_pdfium;
use t2_extractor::{
    DocumentPipeline, ExtractionProgress, ExtractorError, OcrCredentials, OcrEngine,
    PipelineConfig, TextBlock,
};

// ── Test helpers ─────────────────────────────────────────────────────────────

/// Skip this test unless pdfium can be located.
macro_rules! pdfium_skip_unless_ready {
    () => {{
        if std::env::var("PDFIUM_LIB_PATH").is_err() {
            println!("SKIP — set PDFIUM_LIB_PATH to run pdfium tests");
            return;
        }
    }};
}

/// Write a blank A4 PDF with `pages` pages.
fn write_blank_pdf(path: &Path, pages: usize) {
    let pdfium = bind_pdfium().expect("pdfium must bind when PDFIUM_LIB_PATH is set");
    let mut document = pdfium.create_new_pdf().unwrap();
    for _ in 0..pages {
        document
            .pages_mut()
            .create_page_at_end(PdfPagePaperSize::a4())
            .unwrap();
    }
    document.save_to_file(path).unwrap();
}

/// Answers each call with `P<n>`, `n` counting calls from 1.
#[derive(Default)]
struct CallCounter {
    calls: AtomicUsize,
    sizes: Mutex<Vec<usize>>,
}

#[async_trait]
impl OcrEngine for CallCounter {
    fn name(&self) -> &str {
        "counter"
    }

    async fn detect_document_text(&self, document: &[u8]) -> Result<Vec<TextBlock>, ExtractorError> {
        assert!(document.starts_with(b"%PDF"), "each page must be a standalone PDF");
        self.sizes.lock().unwrap().push(document.len());
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(vec![TextBlock::page(), TextBlock::line(format!("P{n}"))])
    }
}

#[derive(Default)]
struct PageLog(Mutex<Vec<(usize, usize)>>);

impl ExtractionProgress for PageLog {
    fn on_page_complete(&self, page: usize, total: usize, _line_count: usize) {
        self.0.lock().unwrap().push((page, total));
    }
}

// ── PDF handling ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn pdf_pages_are_extracted_in_order() {
    pdfium_skip_unless_ready!();
    let dir = tempfile::tempdir().unwrap();
    let pdf = dir.path().join("three_pages.pdf");
    write_blank_pdf(&pdf, 3);

    let engine = Arc::new(CallCounter::default());
    let log = Arc::new(PageLog::default());
    let pipeline = DocumentPipeline::new(PipelineConfig::default())
        .unwrap()
        .with_ocr_engine(engine.clone())
        .with_progress(log.clone());

    let text = pipeline.extract_text(&pdf).await.unwrap();

    assert_eq!(text, "P1\nP2\nP3\n");
    assert_eq!(engine.calls.load(Ordering::SeqCst), 3);
    assert_eq!(*log.0.lock().unwrap(), vec![(1, 3), (2, 3), (3, 3)]);
}

#[tokio::test]
async fn pdf_renders_one_image_per_page() {
    pdfium_skip_unless_ready!();
    let dir = tempfile::tempdir().unwrap();
    let pdf = dir.path().join("two_pages.pdf");
    write_blank_pdf(&pdf, 2);

    let config = PipelineConfig::builder().dpi(72).build().unwrap();
    let pipeline = DocumentPipeline::new(config).unwrap();
    let images = pipeline.document_to_images(&pdf).await.unwrap();

    let indices: Vec<usize> = images.iter().map(|(i, _)| *i).collect();
    assert_eq!(indices, vec![0, 1]);
    // A4 at 72 DPI is 595 x 842 points.
    let (_, first) = &images[0];
    assert!((594..=596).contains(&first.width()), "width {}", first.width());

    let encoded = pipeline.images_to_base64(&images).unwrap();
    let png = base64::engine::general_purpose::STANDARD.decode(encoded).unwrap();
    assert_eq!(&png[..4], &[0x89, b'P', b'N', b'G']);
}

#[tokio::test]
async fn corrupt_pdf_fails_rasterisation() {
    pdfium_skip_unless_ready!();
    let dir = tempfile::tempdir().unwrap();
    let pdf = dir.path().join("broken.pdf");
    std::fs::write(&pdf, b"not a pdf at all").unwrap();

    let pipeline = DocumentPipeline::new(PipelineConfig::default()).unwrap();
    let err = pipeline.document_to_images(&pdf).await.unwrap_err();
    assert!(matches!(err, ExtractorError::RasterisationFailed { .. }), "got: {err:?}");
}

// ── Live Textract ────────────────────────────────────────────────────────────

#[tokio::test]
async fn live_textract_returns_text() {
    if std::env::var("E2E_ENABLED").is_err() {
        println!("SKIP — set E2E_ENABLED=1 to run live tests");
        return;
    }
    let (Ok(key), Ok(secret), Ok(document)) = (
        std::env::var("AWS_ACCESS_KEY_ID"),
        std::env::var("AWS_SECRET_ACCESS_KEY"),
        std::env::var("T2_E2E_DOCUMENT"),
    ) else {
        println!("SKIP — AWS credentials or T2_E2E_DOCUMENT missing");
        return;
    };
    let region = std::env::var("AWS_REGION").unwrap_or_else(|_| "us-east-1".to_string());

    let config = PipelineConfig::builder()
        .ocr(OcrCredentials::new(key, secret).region(region))
        .build()
        .unwrap();
    let pipeline = DocumentPipeline::new(config).unwrap();
    let text = pipeline.extract_text(PathBuf::from(document)).await.unwrap();

    println!("{text}");
    assert!(!text.trim().is_empty());
    assert!(text.ends_with('\n'));
}

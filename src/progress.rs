//! Progress-callback trait for per-page extraction events.
//!
//! Attach an [`Arc<dyn ExtractionProgress>`] with
//! [`crate::TextExtractor::with_progress`] to observe each OCR request as
//! the extractor walks a document.
//!
//! # Example
//!
//! ```rust
//! use t2_extractor::ExtractionProgress;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//!
//! struct LineCounter {
//!     lines: AtomicUsize,
//! }
//!
//! impl ExtractionProgress for LineCounter {
//!     fn on_page_complete(&self, _page_num: usize, _total_pages: usize, line_count: usize) {
//!         self.lines.fetch_add(line_count, Ordering::SeqCst);
//!     }
//! }
//! ```

use std::sync::Arc;

/// Called by the text extractor as it processes each page.
///
/// Pages are processed in order, one at a time. All methods have default
/// no-op implementations so callers only override what they care about.
pub trait ExtractionProgress: Send + Sync {
    /// Called once the page count is known, before the first OCR request.
    fn on_extraction_start(&self, total_pages: usize) {
        let _ = total_pages;
    }

    /// Called just before a page is submitted to the OCR service.
    ///
    /// # Arguments
    /// * `page_num`    — 1-indexed page number
    /// * `total_pages` — total pages in the document
    fn on_page_start(&self, page_num: usize, total_pages: usize) {
        let _ = (page_num, total_pages);
    }

    /// Called when a page's LINE blocks have been appended.
    fn on_page_complete(&self, page_num: usize, total_pages: usize, line_count: usize) {
        let _ = (page_num, total_pages, line_count);
    }

    /// Called when a page fails. Extraction stops after this call.
    fn on_page_error(&self, page_num: usize, total_pages: usize, error: String) {
        let _ = (page_num, total_pages, error);
    }

    /// Called after the last page succeeded.
    fn on_extraction_complete(&self, total_pages: usize, total_chars: usize) {
        let _ = (total_pages, total_chars);
    }
}

/// Convenience alias for an optional progress callback.
pub type ProgressCallback = Arc<dyn ExtractionProgress>;

/// A no-op implementation, used when no callback is attached.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopProgress;

impl ExtractionProgress for NoopProgress {}

//! Pipeline stages for document capture.
//!
//! Each submodule implements one step. The caller composes them, usually
//! through [`crate::DocumentPipeline`].
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ render ──▶ ocr/extract ──▶ llm ──▶ review
//! (path)    (pdfium)   (Textract)      (chat)  (T2 Verification)
//!              │
//!              └──▶ encode (base64 PNG for the review payload)
//! ```
//!
//! 1. [`input`]   — classify the path by extension and read bytes
//! 2. [`render`]  — rasterise pages or split a PDF into single-page buffers;
//!    runs in `spawn_blocking` because pdfium is not async-safe
//! 3. [`encode`]  — PNG-encode and base64-wrap page images
//! 4. [`ocr`]     — the [`ocr::OcrEngine`] seam and its Textract backend
//! 5. [`extract`] — walk pages in order and concatenate LINE blocks
//! 6. [`llm`]     — chat completion with token usage
//! 7. [`review`]  — post tasks to, and list tasks from, the review portal
//!
//! [`http`] holds the retry loop shared by the two HTTP stages.

pub mod encode;
pub mod extract;
pub mod http;
pub mod input;
pub mod llm;
pub mod ocr;
pub mod render;
pub mod review;

//! Document rasterisation and page splitting via pdfium.
//!
//! pdfium is not async-safe, so every entry point here moves the work onto
//! `spawn_blocking`. Two outputs are produced from a PDF:
//!
//! * rendered page images (for the review portal payload), at a fixed DPI;
//! * single-page PDF documents held in memory (for OCR), so no temporary
//!   files are written.
//!
//! Raster images skip pdfium entirely and decode through `image`.

use crate::error::ExtractorError;
use crate::pipeline::input::{self, DocumentKind};
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Bind to the pdfium shared library.
///
/// `PDFIUM_LIB_PATH` may name either the library file or the directory that
/// contains it; otherwise the system library search path is used.
pub fn bind_pdfium() -> Result<Pdfium, ExtractorError> {
    let bindings = match std::env::var("PDFIUM_LIB_PATH") {
        Ok(p) if !p.is_empty() => {
            let path = PathBuf::from(p);
            let lib = if path.is_dir() {
                Pdfium::pdfium_platform_library_name_at_path(&path)
            } else {
                path
            };
            Pdfium::bind_to_library(&lib).map_err(|e| {
                ExtractorError::PdfiumBindingFailed(format!("{}: {}", lib.display(), e))
            })?
        }
        _ => Pdfium::bind_to_system_library()
            .map_err(|e| ExtractorError::PdfiumBindingFailed(e.to_string()))?,
    };
    Ok(Pdfium::new(bindings))
}

/// Convert a PDF or raster image into page-indexed images.
///
/// PDFs are rendered at `dpi`; a raster image is returned as page 0.
///
/// # Returns
/// A vector of `(page_index_0based, DynamicImage)` tuples in page order.
pub async fn document_to_images(
    path: &Path,
    dpi: u32,
) -> Result<Vec<(usize, DynamicImage)>, ExtractorError> {
    let kind = input::resolve_local(path)?;
    let path = path.to_path_buf();

    tokio::task::spawn_blocking(move || match kind {
        DocumentKind::Pdf => render_pdf_blocking(&path, dpi),
        DocumentKind::Image => load_image_blocking(&path).map(|img| vec![(0, img)]),
    })
    .await
    .map_err(|e| ExtractorError::Internal(format!("Render task panicked: {}", e)))?
}

/// Split a PDF into one in-memory single-page PDF per page, in page order.
pub async fn split_pages(path: &Path) -> Result<Vec<Vec<u8>>, ExtractorError> {
    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || split_pages_blocking(&path))
        .await
        .map_err(|e| ExtractorError::Internal(format!("Split task panicked: {}", e)))?
}

fn load_pdf<'a>(pdfium: &'a Pdfium, path: &Path) -> Result<PdfDocument<'a>, ExtractorError> {
    pdfium
        .load_pdf_from_file(path, None)
        .map_err(|e| ExtractorError::RasterisationFailed {
            page: 0,
            detail: format!("cannot open '{}': {:?}", path.display(), e),
        })
}

fn render_pdf_blocking(path: &Path, dpi: u32) -> Result<Vec<(usize, DynamicImage)>, ExtractorError> {
    let pdfium = bind_pdfium()?;
    let document = load_pdf(&pdfium, path)?;

    let pages = document.pages();
    let total_pages = pages.len() as usize;
    info!("PDF loaded: {} pages, rendering at {} DPI", total_pages, dpi);

    let render_config = PdfRenderConfig::new().scale_page_by_factor(dpi as f32 / 72.0);

    let mut results = Vec::with_capacity(total_pages);
    for idx in 0..total_pages {
        let page = pages
            .get(idx as u16)
            .map_err(|e| ExtractorError::RasterisationFailed {
                page: idx + 1,
                detail: format!("{:?}", e),
            })?;

        let bitmap = page.render_with_config(&render_config).map_err(|e| {
            ExtractorError::RasterisationFailed {
                page: idx + 1,
                detail: format!("{:?}", e),
            }
        })?;

        let image = bitmap.as_image();
        debug!(
            "Rendered page {} → {}x{} px",
            idx + 1,
            image.width(),
            image.height()
        );
        results.push((idx, image));
    }

    Ok(results)
}

fn split_pages_blocking(path: &Path) -> Result<Vec<Vec<u8>>, ExtractorError> {
    let pdfium = bind_pdfium()?;
    let source = load_pdf(&pdfium, path)?;
    let total_pages = source.pages().len();
    info!("PDF loaded: {} pages", total_pages);

    let mut buffers = Vec::with_capacity(total_pages as usize);
    for idx in 0..total_pages {
        let page_err = |e: PdfiumError| ExtractorError::RasterisationFailed {
            page: idx as usize + 1,
            detail: format!("{:?}", e),
        };

        let mut single = pdfium.create_new_pdf().map_err(page_err)?;
        single
            .pages_mut()
            .copy_page_from_document(&source, idx, 0)
            .map_err(page_err)?;
        let bytes = single.save_to_bytes().map_err(page_err)?;
        debug!("Page {} → {} byte single-page PDF", idx + 1, bytes.len());
        buffers.push(bytes);
    }

    Ok(buffers)
}

fn load_image_blocking(path: &Path) -> Result<DynamicImage, ExtractorError> {
    image::open(path).map_err(|e| match e {
        image::ImageError::IoError(source) => input::io_error(path, source),
        other => ExtractorError::RasterisationFailed {
            page: 1,
            detail: other.to_string(),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    #[tokio::test]
    async fn image_document_is_a_single_page() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scan.png");
        RgbImage::from_pixel(8, 4, Rgb([10, 20, 30])).save(&path).unwrap();

        let pages = document_to_images(&path, 300).await.unwrap();
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].0, 0);
        assert_eq!(pages[0].1.width(), 8);
        assert_eq!(pages[0].1.height(), 4);
    }

    #[tokio::test]
    async fn unsupported_document_is_rejected() {
        let err = document_to_images(Path::new("notes.txt"), 300)
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractorError::UnsupportedFormat { .. }));
    }

    #[tokio::test]
    async fn corrupt_image_reports_rasterisation_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.jpg");
        std::fs::write(&path, b"definitely not a jpeg").unwrap();

        let err = document_to_images(&path, 300).await.unwrap_err();
        assert!(
            matches!(err, ExtractorError::RasterisationFailed { .. }),
            "got: {err:?}"
        );
    }
}

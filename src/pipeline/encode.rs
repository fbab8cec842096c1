//! Image encoding: `DynamicImage` → base64 PNG for the review portal.
//!
//! The portal renders `t2document` as a single PNG. When a PDF produces
//! several pages, [`images_to_base64`] keeps only the last page's encoding;
//! use [`encode_pages`] to get one encoding per page.

use crate::error::ExtractorError;
use crate::pipeline::render;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::DynamicImage;
use std::io::Cursor;
use std::path::Path;
use tracing::debug;

/// Encode one image as a base64 PNG.
pub fn encode_image(img: &DynamicImage) -> Result<String, image::ImageError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;

    let b64 = STANDARD.encode(&buf);
    debug!("Encoded image → {} bytes base64", b64.len());
    Ok(b64)
}

/// Encode every page, preserving page order.
pub fn encode_pages(images: &[(usize, DynamicImage)]) -> Result<Vec<String>, ExtractorError> {
    images
        .iter()
        .map(|(idx, img)| {
            encode_image(img).map_err(|e| ExtractorError::RasterisationFailed {
                page: idx + 1,
                detail: format!("Image encoding failed: {}", e),
            })
        })
        .collect()
}

/// Encode a page sequence into the single base64 string the portal expects.
///
/// Only the last page survives; an empty sequence is an error.
pub fn images_to_base64(images: &[(usize, DynamicImage)]) -> Result<String, ExtractorError> {
    encode_pages(images)?
        .pop()
        .ok_or_else(|| ExtractorError::Internal("document produced no pages".into()))
}

/// Rasterise `path` and encode it for transport.
pub async fn document_to_base64(path: &Path, dpi: u32) -> Result<String, ExtractorError> {
    let images = render::document_to_images(path, dpi).await?;
    images_to_base64(&images)
}

/// Decode a base64 payload produced by this module.
pub fn decode_base64(data: &str) -> Result<Vec<u8>, base64::DecodeError> {
    STANDARD.decode(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn solid(w: u32, h: u32, px: [u8; 4]) -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(w, h, Rgba(px)))
    }

    #[test]
    fn encoded_png_round_trips() {
        let img = solid(10, 10, [255, 0, 0, 255]);
        let mut png = Vec::new();
        img.write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
            .unwrap();

        let b64 = encode_image(&img).unwrap();
        let decoded = decode_base64(&b64).expect("valid base64");
        assert_eq!(decoded, png);
        assert_eq!(&decoded[..4], &[0x89, b'P', b'N', b'G']);
    }

    #[test]
    fn only_last_page_survives() {
        let pages = vec![
            (0, solid(2, 2, [0, 0, 0, 255])),
            (1, solid(3, 3, [255, 255, 255, 255])),
        ];
        let all = encode_pages(&pages).unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(images_to_base64(&pages).unwrap(), all[1]);
    }

    #[test]
    fn empty_sequence_is_an_error() {
        assert!(images_to_base64(&[]).is_err());
    }
}

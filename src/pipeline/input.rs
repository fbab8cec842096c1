//! Input resolution: classify a document path and read its bytes.
//!
//! Classification is purely by extension, case-insensitive. A path is
//! checked for existence only after its extension is accepted, so an
//! unsupported file is rejected even when it does not exist.

use crate::error::ExtractorError;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Document families the pipeline can process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Image,
}

/// Extensions accepted as raster images.
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp"];

/// Classify a path by extension.
pub fn classify(path: &Path) -> Result<DocumentKind, ExtractorError> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "pdf" => Ok(DocumentKind::Pdf),
        ext if IMAGE_EXTENSIONS.contains(&ext) => Ok(DocumentKind::Image),
        _ => Err(ExtractorError::UnsupportedFormat {
            path: path.to_path_buf(),
            extension,
        }),
    }
}

/// Classify a path and verify that it points at an existing file.
pub fn resolve_local(path: &Path) -> Result<DocumentKind, ExtractorError> {
    let kind = classify(path)?;
    if !path.is_file() {
        return Err(ExtractorError::FileNotFound {
            path: path.to_path_buf(),
        });
    }
    debug!("Resolved {:?} document: {}", kind, path.display());
    Ok(kind)
}

/// Read a whole document into memory.
pub async fn read_document(path: &Path) -> Result<Vec<u8>, ExtractorError> {
    tokio::fs::read(path).await.map_err(|e| io_error(path, e))
}

pub(crate) fn io_error(path: &Path, source: std::io::Error) -> ExtractorError {
    if source.kind() == std::io::ErrorKind::NotFound {
        ExtractorError::FileNotFound {
            path: PathBuf::from(path),
        }
    } else {
        ExtractorError::Io {
            path: PathBuf::from(path),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_is_case_insensitive() {
        assert_eq!(classify(Path::new("a.PDF")).unwrap(), DocumentKind::Pdf);
        assert_eq!(classify(Path::new("scan.JpEg")).unwrap(), DocumentKind::Image);
        assert_eq!(classify(Path::new("dir/x.bmp")).unwrap(), DocumentKind::Image);
        assert_eq!(classify(Path::new("x.png")).unwrap(), DocumentKind::Image);
        assert_eq!(classify(Path::new("x.jpg")).unwrap(), DocumentKind::Image);
    }

    #[test]
    fn classify_rejects_other_extensions() {
        let err = classify(Path::new("contract.docx")).unwrap_err();
        match err {
            ExtractorError::UnsupportedFormat { extension, .. } => assert_eq!(extension, "docx"),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(classify(Path::new("no_extension")).is_err());
        assert!(classify(Path::new("archive.pdf.zip")).is_err());
    }

    #[test]
    fn resolve_local_reports_missing_file() {
        let err = resolve_local(Path::new("/definitely/not/here.pdf")).unwrap_err();
        assert!(matches!(err, ExtractorError::FileNotFound { .. }));
    }

    #[test]
    fn resolve_local_checks_format_first() {
        let err = resolve_local(Path::new("/definitely/not/here.txt")).unwrap_err();
        assert!(matches!(err, ExtractorError::UnsupportedFormat { .. }));
    }
}

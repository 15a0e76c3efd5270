//! Document text extraction for uploads.
//!
//! PDFs (detected by `.pdf` extension or the `%PDF-` magic bytes) go through
//! `pdf-extract`; everything else must be UTF-8 text. Extraction never
//! panics on malformed input.

use std::path::{Path, PathBuf};

const PDF_MAGIC: &[u8] = b"%PDF-";

#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("PDF extraction failed: {0}")]
    Pdf(String),
    #[error("PDF contains no extractable text (scanned or image-only?)")]
    EmptyPdf,
    #[error("file is not valid UTF-8 text; only PDF and plain-text uploads are supported")]
    NotUtf8,
}

/// Read `path` and return its text content.
pub fn load_document(path: &Path) -> Result<String, ExtractError> {
    let bytes = std::fs::read(path).map_err(|source| ExtractError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let is_pdf = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("pdf"));
    extract_text(&bytes, is_pdf)
}

/// Extract text from raw bytes.
pub fn extract_text(bytes: &[u8], is_pdf: bool) -> Result<String, ExtractError> {
    if is_pdf || bytes.starts_with(PDF_MAGIC) {
        return extract_pdf(bytes);
    }
    String::from_utf8(bytes.to_vec()).map_err(|_| ExtractError::NotUtf8)
}

fn extract_pdf(bytes: &[u8]) -> Result<String, ExtractError> {
    // pdf-extract panics on some malformed inputs.
    let text = std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem(bytes))
        .map_err(|_| ExtractError::Pdf("malformed PDF".to_string()))?
        .map_err(|e| ExtractError::Pdf(e.to_string()))?;
    if text.trim().is_empty() {
        return Err(ExtractError::EmptyPdf);
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_plain_text_passthrough() {
        let text = extract_text("Grüße, 世界\n".as_bytes(), false).unwrap();
        assert_eq!(text, "Grüße, 世界\n");
    }

    #[test]
    fn test_invalid_utf8_rejected() {
        assert!(matches!(
            extract_text(&[0xff, 0xfe, 0x00], false),
            Err(ExtractError::NotUtf8)
        ));
    }

    #[test]
    fn test_garbage_pdf_is_error_not_panic() {
        let result = extract_text(b"%PDF-1.4\nthis is not really a pdf", false);
        assert!(matches!(
            result,
            Err(ExtractError::Pdf(_)) | Err(ExtractError::EmptyPdf)
        ));
    }

    #[test]
    fn test_load_document_reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "The warranty covers defects for 2 years.").unwrap();
        let text = load_document(file.path()).unwrap();
        assert!(text.starts_with("The warranty"));
    }

    #[test]
    fn test_missing_file() {
        let err = load_document(Path::new("/definitely/not/here.txt")).unwrap_err();
        assert!(matches!(err, ExtractError::Io { .. }));
        assert!(err.to_string().contains("here.txt"));
    }
}

//! PDF decoding: page text layers and document metadata via pdfium.
//!
//! pdfium keeps thread-local state and blocks for the whole document, so
//! all work happens inside `tokio::task::spawn_blocking` and the async
//! callers only see owned `String`s.
//!
//! Binding order: `PDFIUM_LIB_PATH` (a library file or the directory
//! holding it), then the system library search path.

use crate::error::RelworkError;
use crate::output::DocumentMetadata;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Text and metadata of one decoded PDF.
#[derive(Debug, Clone, Default)]
pub struct DecodedDocument {
    /// Page texts in page order. Pages without a text layer are `""`.
    pub pages: Vec<String>,
    pub metadata: DocumentMetadata,
}

/// Decode every page's text layer plus metadata.
pub async fn decode(
    pdf_path: &Path,
    password: Option<&str>,
) -> Result<DecodedDocument, RelworkError> {
    let path = pdf_path.to_path_buf();
    let password = password.map(str::to_string);

    tokio::task::spawn_blocking(move || decode_blocking(&path, password.as_deref()))
        .await
        .map_err(|e| RelworkError::Internal(format!("Decode task panicked: {}", e)))?
}

/// Metadata only; page text is not extracted.
pub async fn extract_metadata(
    pdf_path: &Path,
    password: Option<&str>,
) -> Result<DocumentMetadata, RelworkError> {
    let path = pdf_path.to_path_buf();
    let password = password.map(str::to_string);

    tokio::task::spawn_blocking(move || {
        let pdfium = bind_pdfium()?;
        let document = open_document(&pdfium, &path, password.as_deref())?;
        Ok(read_metadata(&document))
    })
    .await
    .map_err(|e| RelworkError::Internal(format!("Metadata task panicked: {}", e)))?
}

/// Bind to a pdfium shared library.
pub fn bind_pdfium() -> Result<Pdfium, RelworkError> {
    let bindings = match std::env::var_os("PDFIUM_LIB_PATH") {
        Some(raw) if !raw.is_empty() => {
            let mut lib = PathBuf::from(raw);
            if lib.is_dir() {
                lib = Pdfium::pdfium_platform_library_name_at_path(&lib);
            }
            debug!("Binding pdfium from {}", lib.display());
            Pdfium::bind_to_library(&lib).map_err(|e| {
                RelworkError::PdfiumBindingFailed(format!("{}: {:?}", lib.display(), e))
            })?
        }
        _ => Pdfium::bind_to_system_library()
            .map_err(|e| RelworkError::PdfiumBindingFailed(format!("{:?}", e)))?,
    };
    Ok(Pdfium::new(bindings))
}

fn decode_blocking(
    pdf_path: &Path,
    password: Option<&str>,
) -> Result<DecodedDocument, RelworkError> {
    let pdfium = bind_pdfium()?;
    let document = open_document(&pdfium, pdf_path, password)?;
    let metadata = read_metadata(&document);
    info!("PDF loaded: {} pages", metadata.page_count);

    let mut pages = Vec::with_capacity(metadata.page_count);
    for (idx, page) in document.pages().iter().enumerate() {
        let text = page
            .text()
            .map_err(|e| RelworkError::TextExtractionFailed {
                page: idx + 1,
                detail: format!("{:?}", e),
            })?
            .all();
        if text.trim().is_empty() {
            warn!("Page {} has no text layer (scanned image?)", idx + 1);
        } else {
            debug!("Page {}: {} chars", idx + 1, text.len());
        }
        pages.push(text);
    }

    Ok(DecodedDocument { pages, metadata })
}

fn open_document<'a>(
    pdfium: &'a Pdfium,
    pdf_path: &Path,
    password: Option<&'a str>,
) -> Result<PdfDocument<'a>, RelworkError> {
    pdfium
        .load_pdf_from_file(pdf_path, password)
        .map_err(|e| map_load_error(pdf_path, password.is_some(), format!("{:?}", e)))
}

/// pdfium reports encryption problems only through its error text.
fn map_load_error(pdf_path: &Path, had_password: bool, err_str: String) -> RelworkError {
    if err_str.to_lowercase().contains("password") {
        if had_password {
            RelworkError::WrongPassword {
                path: pdf_path.to_path_buf(),
            }
        } else {
            RelworkError::PasswordRequired {
                path: pdf_path.to_path_buf(),
            }
        }
    } else {
        RelworkError::CorruptPdf {
            path: pdf_path.to_path_buf(),
            detail: err_str,
        }
    }
}

fn read_metadata(document: &PdfDocument<'_>) -> DocumentMetadata {
    let metadata = document.metadata();
    let get = |tag: PdfDocumentMetadataTagType| -> Option<String> {
        metadata
            .get(tag)
            .map(|t| t.value().trim().to_string())
            .filter(|v| !v.is_empty())
    };

    DocumentMetadata {
        title: get(PdfDocumentMetadataTagType::Title),
        author: get(PdfDocumentMetadataTagType::Author),
        subject: get(PdfDocumentMetadataTagType::Subject),
        creator: get(PdfDocumentMetadataTagType::Creator),
        producer: get(PdfDocumentMetadataTagType::Producer),
        creation_date: get(PdfDocumentMetadataTagType::CreationDate),
        modification_date: get(PdfDocumentMetadataTagType::ModificationDate),
        page_count: document.pages().len() as usize,
        pdf_version: format!("{:?}", document.version()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_errors_are_classified() {
        let p = Path::new("/tmp/x.pdf");
        assert!(matches!(
            map_load_error(p, false, "PdfiumLibraryInternalError(PasswordError)".into()),
            RelworkError::PasswordRequired { .. }
        ));
        assert!(matches!(
            map_load_error(p, true, "PasswordError".into()),
            RelworkError::WrongPassword { .. }
        ));
        assert!(matches!(
            map_load_error(p, false, "FormatError".into()),
            RelworkError::CorruptPdf { .. }
        ));
    }
}

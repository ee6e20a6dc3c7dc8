//! Error types for the edgequake-relwork library.
//!
//! Only one error type exists: [`RelworkError`], returned when the pipeline
//! cannot proceed at all (bad input file, pdfium unavailable, LLM provider
//! not configured, template mistakes).
//!
//! A section that cannot be located is **not** an error. The extractor
//! reports it as a missing entry in [`crate::sections::SectionMap`] so callers
//! can see and test the "not found" case instead of catching a fault.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the edgequake-relwork library.
#[derive(Debug, Error)]
pub enum RelworkError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The input string is not a valid file path or URL.
    #[error("Invalid input '{input}': not a file path or a valid HTTP/HTTPS URL")]
    InvalidInput { input: String },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{path}' is corrupt: {detail}\nTry repairing with: qpdf --decrypt input.pdf output.pdf")]
    CorruptPdf { path: PathBuf, detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF '{path}' is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired { path: PathBuf },

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF '{path}'")]
    WrongPassword { path: PathBuf },

    /// pdfium could not produce the text layer of a page.
    #[error("Text extraction failed for page {page}: {detail}")]
    TextExtractionFailed { page: usize, detail: String },

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Install libpdfium for your platform, then either:\n\
  • place it on the system library search path, or\n\
  • set PDFIUM_LIB_PATH=/path/to/libpdfium.\n"
    )]
    PdfiumBindingFailed(String),

    // ── Structure errors ──────────────────────────────────────────────────
    /// The Grobid service rejected the document or returned unusable TEI.
    #[error("Grobid request to '{url}' failed: {reason}")]
    GrobidFailed { url: String, reason: String },

    // ── LLM errors ────────────────────────────────────────────────────────
    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// The LLM call failed after every retry.
    #[error("LLM API error during {stage}: {message}")]
    LlmApiError { stage: String, message: String },

    // ── Template errors ───────────────────────────────────────────────────
    /// A prompt template references a placeholder the caller did not supply.
    #[error("Template '{template}' references unknown placeholder '{{{placeholder}}}'")]
    TemplateError {
        template: String,
        placeholder: String,
    },

    /// A template file exists but could not be read.
    #[error("Failed to read template '{path}': {source}")]
    TemplateReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Cited paper errors ────────────────────────────────────────────────
    /// The cited-papers file is missing or is not valid JSON.
    #[error("Invalid cited papers file '{path}': {detail}")]
    CitedPapersInvalid { path: PathBuf, detail: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_error_display_shows_braces() {
        let e = RelworkError::TemplateError {
            template: "enrich_usage".into(),
            placeholder: "facet_c".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("{facet_c}"), "got: {msg}");
        assert!(msg.contains("enrich_usage"));
    }

    #[test]
    fn llm_error_display_names_stage() {
        let e = RelworkError::LlmApiError {
            stage: "faceted summary".into(),
            message: "HTTP 500".into(),
        };
        assert!(e.to_string().contains("faceted summary"));
        assert!(e.to_string().contains("HTTP 500"));
    }

    #[test]
    fn grobid_error_display() {
        let e = RelworkError::GrobidFailed {
            url: "http://localhost:8070".into(),
            reason: "HTTP 503".into(),
        };
        assert!(e.to_string().contains("localhost:8070"));
        assert!(e.to_string().contains("503"));
    }

    #[test]
    fn text_extraction_display() {
        let e = RelworkError::TextExtractionFailed {
            page: 3,
            detail: "no text layer".into(),
        };
        assert!(e.to_string().contains("page 3"));
    }
}

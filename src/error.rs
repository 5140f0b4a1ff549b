//! Error types for the edgequake-pdf2json library.
//!
//! Failures are split by how far they reach:
//!
//! * [`Pdf2JsonError`] — **Fatal**: the document cannot be processed at all
//!   (bad input file, pdfium unavailable, provider not configured, output
//!   directory not writable). Returned as `Err` from the top-level entry
//!   points.
//!
//! * [`PageError`] — **Non-fatal**: one page could not be extracted. It is
//!   attached to the degraded [`crate::output::PageResult`] for that page so
//!   the document keeps one record per page.
//!
//! * [`RecognitionError`] — a single call to the recognition service failed.
//!   The orchestrator treats it exactly like an unsuccessful outcome.
//!
//! * [`AnomalyError`] — an anomaly could not be recorded. Always swallowed by
//!   the pipeline; surfaced only to callers using a tracker directly.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the edgequake-pdf2json library.
#[derive(Debug, Error)]
pub enum Pdf2JsonError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

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
    #[error("PDF '{path}' is corrupt: {detail}")]
    CorruptPdf { path: PathBuf, detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF '{path}' is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired { path: PathBuf },

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF '{path}'")]
    WrongPassword { path: PathBuf },

    /// pdfium-render returned an error for a specific page.
    #[error("Rasterisation failed for page {page}: {detail}")]
    RasterisationFailed { page: usize, detail: String },

    // ── Provider errors ───────────────────────────────────────────────────
    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write an output artifact.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An artifact could not be serialised to JSON.
    #[error("Failed to serialise '{name}': {source}")]
    SerializationFailed {
        name: String,
        #[source]
        source: serde_json::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Pdfium binding errors ─────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
PDFium is normally downloaded automatically on first run.\n\
If the auto-download failed, set PDFIUM_LIB_PATH=/path/to/libpdfium to use an existing copy.\n"
    )]
    PdfiumBindingFailed(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single page.
///
/// Stored in [`crate::output::PageResult::error`] of a degraded page.
#[derive(Debug, Clone, PartialEq, Error, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PageError {
    /// Neither extraction tier produced usable text.
    #[error("Page {page}: recognition failed: {detail}")]
    RecognitionFailed { page: usize, detail: String },

    /// A collaborator panicked while the page was being assembled.
    #[error("Page {page}: assembly failed: {detail}")]
    AssemblyFailed { page: usize, detail: String },
}

impl PageError {
    /// 1-indexed page the error belongs to.
    pub fn page(&self) -> usize {
        match self {
            PageError::RecognitionFailed { page, .. } | PageError::AssemblyFailed { page, .. } => {
                *page
            }
        }
    }
}

/// A failed call to the recognition service.
#[derive(Debug, Error)]
pub enum RecognitionError {
    /// The provider returned an error after all retries.
    #[error("recognition API error after {retries} retries: {message}")]
    Api { message: String, retries: u32 },

    /// The provider refused the call for quota reasons; not retried.
    #[error("recognition quota exceeded: {message}")]
    RateLimited { message: String },

    /// A single call exceeded the per-call timeout.
    #[error("recognition call timed out after {secs}s")]
    Timeout { secs: u64 },

    /// The page image could not be read from disk.
    #[error("cannot read page image '{path}': {source}")]
    ImageUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The service answered with no content.
    #[error("empty response from recognition service")]
    EmptyResponse,
}

/// Failure to record an anomaly.
#[derive(Debug, Error)]
pub enum AnomalyError {
    #[error("failed to write anomaly record '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialise anomaly record: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("anomaly store lock poisoned")]
    Poisoned,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_error_display_names_page() {
        let e = PageError::RecognitionFailed {
            page: 4,
            detail: "quota".into(),
        };
        assert!(e.to_string().contains("Page 4"), "got: {e}");
        assert_eq!(e.page(), 4);
    }

    #[test]
    fn page_error_serialises_with_kind_tag() {
        let e = PageError::AssemblyFailed {
            page: 2,
            detail: "mapper panicked".into(),
        };
        let json = serde_json::to_value(&e).unwrap();
        assert_eq!(json["kind"], "assembly_failed");
        assert_eq!(json["page"], 2);
    }

    #[test]
    fn recognition_timeout_display() {
        let e = RecognitionError::Timeout { secs: 90 };
        assert!(e.to_string().contains("90s"));
    }

    #[test]
    fn provider_not_configured_display() {
        let e = Pdf2JsonError::ProviderNotConfigured {
            provider: "gemini".into(),
            hint: "set GEMINI_API_KEY".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("gemini"));
        assert!(msg.contains("GEMINI_API_KEY"));
    }
}

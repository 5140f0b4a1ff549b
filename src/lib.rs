//! # edgequake-pdf2json
//!
//! Turn scanned business PDFs (receipts, expense summaries, timesheets) into
//! per-page JSON records using Vision Language Models (VLMs).
//!
//! Each page yields two artifacts:
//!
//! * a **raw record**: what the recognition service read, with provenance;
//! * a **structured document**: a header plus fixed transaction tables
//!   (`summary`, `receipt`, `receipt_line`, `workday`, `workday_worker`,
//!   `supplier`, `equipment`), with catalog tables merged into every receipt
//!   line.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input      resolve local file or download from URL
//!  ├─ 2. Split      rasterise pages to PNG via pdfium (spawn_blocking)
//!  ├─ 3. Recognise  bounded fan-out of pages to the VLM
//!  │                  structured tier ─▶ normalise ─▶ validate/enhance
//!  │                  plain tier      ─▶ classify  ─▶ extract tables
//!  ├─ 4. Translate  non-native pages only
//!  ├─ 5. Assemble   fixed tables + catalogs; anomaly checks
//!  └─ 6. Output     results in page order; raw/ and structured/ JSON
//! ```
//!
//! A page that cannot be extracted never aborts the document: it comes back
//! as a degraded [`PageResult`] with empty tables and the error attached.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_pdf2json::{extract_to_dir, ExtractionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from OPENAI_API_KEY / ANTHROPIC_API_KEY / GEMINI_API_KEY
//!     let config = ExtractionConfig::builder()
//!         .output_dir("out")
//!         .progress_callback(std::sync::Arc::new(|msg: &str, pct: u8| {
//!             eprintln!("[{pct:>3}%] {msg}");
//!         }))
//!         .build()?;
//!     let output = extract_to_dir("receipts.pdf", &config).await?;
//!     eprintln!(
//!         "{} pages, {} degraded",
//!         output.pages.len(),
//!         output.stats.degraded_pages
//!     );
//!     Ok(())
//! }
//! ```
//!
//! ## Custom Collaborators
//!
//! [`PageOrchestrator`] takes its page source, recognition client, mapper and
//! anomaly tracker as trait objects, so any of them can be replaced (a
//! different OCR backend, a mock in tests).
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf2json` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! edgequake-pdf2json = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod anomaly;
pub mod config;
pub mod error;
pub mod extract;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use anomaly::{
    AnomalyKind, AnomalyRecord, AnomalyTracker, JsonDirAnomalyTracker, MemoryAnomalyTracker,
    NoopAnomalyTracker,
};
pub use config::{ExtractionConfig, ExtractionConfigBuilder};
pub use error::{AnomalyError, PageError, Pdf2JsonError, RecognitionError};
pub use extract::{
    extract, extract_from_bytes, extract_sync, extract_to_dir, resolve_provider, PageOrchestrator,
};
pub use output::{
    DocumentType, ExtractionOutput, ExtractionStats, ExtractionTier, Language, PageHeader,
    PageResult, RawRecord, StructuredDocument,
};
pub use pipeline::mapper::{DocumentMapper, HeuristicDocumentMapper};
pub use pipeline::persist::{DirectoryStore, ResultStore};
pub use pipeline::recognition::{RecognitionClient, RecognitionOutcome, VlmRecognitionClient};
pub use pipeline::render::{PageImage, PageSource, PdfiumPageSource};
pub use progress::{ExtractionProgressCallback, NoopProgressCallback, ProgressCallback};

//! Pipeline stages for PDF-to-JSON extraction.
//!
//! Each submodule implements one step; the orchestrator in
//! [`crate::extract`] strings them together per page.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ render ──▶ recognition ──▶ normalize ──▶ mapper ──▶ assemble ──▶ persist
//! (URL/path) (pdfium)  (VLM, encode)   (repair)     (tables)   (document)   (JSON)
//! ```
//!
//! 1. [`input`]: canonicalise the user-supplied path or URL to a local file
//! 2. [`render`]: split the PDF into page PNGs; runs in `spawn_blocking`
//!    because pdfium is not async-safe
//! 3. [`encode`]: base64-wrap a page file for the multimodal request body
//! 4. [`recognition`]: the VLM calls, with retry/backoff; the only stage
//!    with network I/O
//! 5. [`cleanup`]: deterministic tidy-up of returned text
//! 6. [`normalize`]: one bounded pass repairing nested JSON payloads
//! 7. [`mapper`]: header, document type and tables from text
//! 8. [`assemble`]: fixed-shape structured document
//! 9. [`persist`]: artifact naming and atomic JSON writes

pub mod assemble;
pub mod cleanup;
pub mod encode;
pub mod input;
pub mod mapper;
pub mod normalize;
pub mod persist;
pub mod recognition;
pub mod render;

//! Progress reporting for document extraction.
//!
//! The pipeline reports `(message, percentage)` pairs. Percentages are
//! monotonically non-decreasing within one document and the final event is
//! always 100:
//!
//! | Percentage | Event |
//! |-----------:|-------|
//! | 0          | splitting the PDF into page images |
//! | 5          | pages rasterised |
//! | 10 – 90    | one event per completed page, linear in completed / total |
//! | 100        | document complete |
//!
//! Any `Fn(&str, u8) + Send + Sync` closure is a callback:
//!
//! ```rust
//! use edgequake_pdf2json::{ExtractionConfig, ProgressCallback};
//! use std::sync::Arc;
//!
//! let cb: ProgressCallback = Arc::new(|message: &str, pct: u8| {
//!     eprintln!("[{pct:>3}%] {message}");
//! });
//! let config = ExtractionConfig::builder().progress_callback(cb).build().unwrap();
//! ```

use std::sync::Arc;

/// Percentage reported before rasterisation starts.
pub const PROGRESS_START: u8 = 0;
/// Percentage reported once page images exist.
pub const PROGRESS_SPLIT: u8 = 5;
/// Lower bound of the per-page interval.
pub const PROGRESS_PAGES_LOWER: u8 = 10;
/// Upper bound of the per-page interval.
pub const PROGRESS_PAGES_UPPER: u8 = 90;
/// Final percentage.
pub const PROGRESS_DONE: u8 = 100;

/// Receives progress events from the extraction pipeline.
///
/// Calls are serialised by the pipeline, but may arrive from any thread.
pub trait ExtractionProgressCallback: Send + Sync {
    fn on_progress(&self, message: &str, percentage: u8);
}

impl<F> ExtractionProgressCallback for F
where
    F: Fn(&str, u8) + Send + Sync,
{
    fn on_progress(&self, message: &str, percentage: u8) {
        self(message, percentage)
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ExtractionProgressCallback for NoopProgressCallback {
    fn on_progress(&self, _message: &str, _percentage: u8) {}
}

/// Convenience alias matching the type stored in [`crate::config::ExtractionConfig`].
pub type ProgressCallback = Arc<dyn ExtractionProgressCallback>;

/// Percentage for `completed` of `total` pages, interpolated between
/// [`PROGRESS_PAGES_LOWER`] and [`PROGRESS_PAGES_UPPER`].
pub fn page_percentage(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return PROGRESS_PAGES_UPPER;
    }
    let span = (PROGRESS_PAGES_UPPER - PROGRESS_PAGES_LOWER) as usize;
    let done = completed.min(total);
    PROGRESS_PAGES_LOWER + (done * span / total) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn closure_is_a_callback() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let cb: ProgressCallback = Arc::new(move |msg: &str, pct: u8| {
            sink.lock().unwrap().push((msg.to_string(), pct));
        });
        cb.on_progress("Processing page 1", 20);
        assert_eq!(seen.lock().unwrap().as_slice(), &[("Processing page 1".to_string(), 20)]);
    }

    #[test]
    fn noop_callback_does_not_panic() {
        NoopProgressCallback.on_progress("anything", 50);
    }

    #[test]
    fn page_percentage_spans_bounds() {
        assert_eq!(page_percentage(0, 10), 10);
        assert_eq!(page_percentage(5, 10), 50);
        assert_eq!(page_percentage(10, 10), 90);
        assert_eq!(page_percentage(12, 10), 90);
        assert_eq!(page_percentage(0, 0), 90);
    }

    #[test]
    fn page_percentage_is_monotonic() {
        let total = 7;
        let values: Vec<u8> = (0..=total).map(|c| page_percentage(c, total)).collect();
        assert!(values.windows(2).all(|w| w[0] <= w[1]), "{values:?}");
    }
}

//! Anomaly tracking: advisory findings about suspicious extractions.
//!
//! After a page is assembled, [`find_anomalies`] runs a handful of
//! independent plausibility checks and [`record_findings`] hands each finding
//! to an [`AnomalyTracker`]. Findings never change the page result, and a
//! tracker that fails to record one is logged and ignored.
//!
//! Trackers are synchronous and may block on file I/O. The orchestrator
//! calls them from tokio's blocking pool, never from a page task.
//!
//! Three trackers are provided:
//!
//! * [`NoopAnomalyTracker`]: the default; discards everything.
//! * [`MemoryAnomalyTracker`]: keeps records in memory (tests, library use).
//! * [`JsonDirAnomalyTracker`]: one pretty-printed JSON file per record.

use crate::error::AnomalyError;
use crate::output::{DocumentType, StructuredDocument};
use crate::pipeline::mapper::{amount_of, has_stamp_marker};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use tracing::{debug, warn};

/// Characters of page text kept in a record.
pub const TEXT_PREVIEW_CHARS: usize = 500;

/// Words that suggest the page carries monetary amounts.
const AMOUNT_KEYWORDS: [&str; 4] = ["TOTAL", "AMOUNT", "PRICE", "COST"];

static RECORD_COUNTER: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyKind {
    MissingField,
    IncorrectValue,
    ParseError,
}

/// One advisory finding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyRecord {
    /// `error_{YYYYmmdd_HHMMSS}_{counter}`; unique within the process.
    pub id: String,
    pub recorded_at: DateTime<Utc>,
    pub document_name: String,
    pub page_index: usize,
    pub kind: AnomalyKind,
    pub field_name: Option<String>,
    pub expected: Option<String>,
    pub extracted: Option<String>,
    pub details: String,
    pub text_preview: Option<String>,
}

impl AnomalyRecord {
    pub fn new(
        document_name: &str,
        page_index: usize,
        kind: AnomalyKind,
        details: impl Into<String>,
    ) -> Self {
        let recorded_at = Utc::now();
        let counter = RECORD_COUNTER.fetch_add(1, Ordering::Relaxed) + 1;
        Self {
            id: format!("error_{}_{:04}", recorded_at.format("%Y%m%d_%H%M%S"), counter),
            recorded_at,
            document_name: document_name.to_string(),
            page_index,
            kind,
            field_name: None,
            expected: None,
            extracted: None,
            details: details.into(),
            text_preview: None,
        }
    }

    pub fn with_field(mut self, field: &str) -> Self {
        self.field_name = Some(field.to_string());
        self
    }

    pub fn with_expected(mut self, expected: impl Into<String>) -> Self {
        self.expected = Some(expected.into());
        self
    }

    pub fn with_extracted(mut self, extracted: impl Into<String>) -> Self {
        self.extracted = Some(extracted.into());
        self
    }

    /// Attach the first [`TEXT_PREVIEW_CHARS`] characters of the page text.
    pub fn with_text(mut self, text: &str) -> Self {
        if !text.is_empty() {
            self.text_preview = Some(text.chars().take(TEXT_PREVIEW_CHARS).collect());
        }
        self
    }
}

/// Sink for anomaly records. Implementations must be shareable across tasks.
pub trait AnomalyTracker: Send + Sync {
    fn record(&self, anomaly: AnomalyRecord) -> Result<(), AnomalyError>;

    fn record_missing_field(
        &self,
        document_name: &str,
        page_index: usize,
        field: &str,
        expected: Option<&str>,
        text: &str,
    ) -> Result<(), AnomalyError> {
        let mut anomaly = AnomalyRecord::new(
            document_name,
            page_index,
            AnomalyKind::MissingField,
            format!("field '{field}' is empty or could not be extracted"),
        )
        .with_field(field)
        .with_text(text);
        if let Some(expected) = expected {
            anomaly = anomaly.with_expected(expected);
        }
        self.record(anomaly)
    }

    fn record_incorrect_value(
        &self,
        document_name: &str,
        page_index: usize,
        field: &str,
        extracted: &str,
        reason: &str,
        text: &str,
    ) -> Result<(), AnomalyError> {
        self.record(
            AnomalyRecord::new(
                document_name,
                page_index,
                AnomalyKind::IncorrectValue,
                format!("field '{field}' has an incorrect value: {reason}"),
            )
            .with_field(field)
            .with_extracted(extracted)
            .with_text(text),
        )
    }

    fn record_parse_error(
        &self,
        document_name: &str,
        page_index: usize,
        message: &str,
        text: &str,
    ) -> Result<(), AnomalyError> {
        self.record(
            AnomalyRecord::new(document_name, page_index, AnomalyKind::ParseError, message)
                .with_text(text),
        )
    }
}

/// Discards every record.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopAnomalyTracker;

impl AnomalyTracker for NoopAnomalyTracker {
    fn record(&self, _anomaly: AnomalyRecord) -> Result<(), AnomalyError> {
        Ok(())
    }
}

/// Keeps records in memory, in recording order.
#[derive(Debug, Default)]
pub struct MemoryAnomalyTracker {
    records: Mutex<Vec<AnomalyRecord>>,
}

impl MemoryAnomalyTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything recorded so far.
    pub fn records(&self) -> Vec<AnomalyRecord> {
        self.records
            .lock()
            .map(|r| r.clone())
            .unwrap_or_else(|e| e.into_inner().clone())
    }

    pub fn count(&self, kind: AnomalyKind) -> usize {
        self.records().iter().filter(|r| r.kind == kind).count()
    }
}

impl AnomalyTracker for MemoryAnomalyTracker {
    fn record(&self, anomaly: AnomalyRecord) -> Result<(), AnomalyError> {
        self.records
            .lock()
            .map_err(|_| AnomalyError::Poisoned)?
            .push(anomaly);
        Ok(())
    }
}

/// Writes each record to `{dir}/{id}.json`.
///
/// `record` does blocking file I/O; call it from `spawn_blocking` when on a
/// runtime worker.
#[derive(Debug, Clone)]
pub struct JsonDirAnomalyTracker {
    dir: PathBuf,
}

impl JsonDirAnomalyTracker {
    /// Create the directory if needed.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, AnomalyError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|source| AnomalyError::Write {
            path: dir.clone(),
            source,
        })?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl AnomalyTracker for JsonDirAnomalyTracker {
    fn record(&self, anomaly: AnomalyRecord) -> Result<(), AnomalyError> {
        let path = self.dir.join(format!("{}.json", anomaly.id));
        let json = serde_json::to_vec_pretty(&anomaly)?;
        std::fs::write(&path, json).map_err(|source| AnomalyError::Write { path, source })?;
        debug!("Recorded anomaly {}", anomaly.id);
        Ok(())
    }
}

// ── Validation pass ──────────────────────────────────────────────────────

/// Plausibility checks over an assembled page. Pure; returns the findings.
pub fn find_anomalies(
    document_name: &str,
    page_index: usize,
    raw_text: &str,
    document: &StructuredDocument,
) -> Vec<AnomalyRecord> {
    let mut findings = Vec::new();
    let header = &document.header;
    let tables = &document.tables;
    let missing = |field: &str, expected: Option<&str>| {
        let mut anomaly = AnomalyRecord::new(
            document_name,
            page_index,
            AnomalyKind::MissingField,
            format!("field '{field}' is empty or could not be extracted"),
        )
        .with_field(field)
        .with_text(raw_text);
        if let Some(expected) = expected {
            anomaly = anomaly.with_expected(expected);
        }
        anomaly
    };

    // ── Check 1: stamped page without a sequential number ──
    let has_sequential = header
        .sequential_number
        .as_deref()
        .is_some_and(|s| !s.trim().is_empty());
    if !has_sequential && has_stamp_marker(raw_text) {
        findings.push(missing("sequential_number", None));
    }

    // ── Check 2: receipt fields ──
    match header.document_type() {
        DocumentType::Receipt => {
            if let Some(receipt) = tables.receipt.first() {
                let has_number = receipt.get("number").is_some_and(|v| match v {
                    serde_json::Value::String(s) => !s.trim().is_empty(),
                    serde_json::Value::Null => false,
                    _ => true,
                });
                if !has_number {
                    findings.push(missing("number", None));
                }

                let total = receipt.get("total_amount").and_then(amount_of);
                if let Some(total) = total {
                    if total < 0.01 {
                        findings.push(
                            AnomalyRecord::new(
                                document_name,
                                page_index,
                                AnomalyKind::IncorrectValue,
                                "field 'total_amount' has an incorrect value: suspiciously low (< 0.01)",
                            )
                            .with_field("total_amount")
                            .with_extracted(total.to_string())
                            .with_text(raw_text),
                        );
                    }
                    if total > 10.0 && tables.receipt_line.is_empty() {
                        findings.push(missing("receipt_line", Some("list of line items")));
                    }
                }
            }
        }
        // ── Check 3: summary without items ──
        DocumentType::Summary if tables.summary.is_empty() => {
            findings.push(missing("summary", Some("list of summary items")));
        }
        _ => {}
    }

    // ── Check 4: amounts without a currency ──
    if document.catalogs.currency.is_empty() {
        let upper = raw_text.to_uppercase();
        if AMOUNT_KEYWORDS.iter().any(|k| upper.contains(k)) {
            findings.push(missing("currency", Some("USD, PEN, MYR, ...")));
        }
    }

    findings
}

/// Hand `findings` to `tracker`. Returns the number of findings.
///
/// Recording failures are logged and otherwise ignored.
pub fn record_findings(
    tracker: &dyn AnomalyTracker,
    document_name: &str,
    page_index: usize,
    findings: Vec<AnomalyRecord>,
) -> usize {
    let count = findings.len();
    for anomaly in findings {
        if let Err(e) = tracker.record(anomaly) {
            warn!(
                "{} page {}: could not record anomaly: {}",
                document_name, page_index, e
            );
        }
    }
    if count > 0 {
        debug!(
            "{} page {}: {} anomalies recorded",
            document_name, page_index, count
        );
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::{PageHeader, ReceiptLine, Record};
    use serde_json::json;

    fn record(value: serde_json::Value) -> Record {
        value.as_object().cloned().unwrap()
    }

    fn receipt_page(receipt: serde_json::Value, lines: usize) -> StructuredDocument {
        let mut doc = StructuredDocument {
            header: PageHeader {
                document_type_id: DocumentType::Receipt.id(),
                ..Default::default()
            },
            ..Default::default()
        };
        doc.tables.receipt.push(record(receipt));
        doc.tables.receipt_line = vec![ReceiptLine::default(); lines];
        doc.catalogs.currency.push(record(json!({"code": "USD"})));
        doc
    }

    #[test]
    fn tiny_total_yields_exactly_one_incorrect_value() {
        let doc = receipt_page(json!({"number": "F-1", "total_amount": 0.005}), 0);
        let found = find_anomalies("doc", 1, "TOTAL 0.005", &doc);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].kind, AnomalyKind::IncorrectValue);
        assert_eq!(found[0].field_name.as_deref(), Some("total_amount"));
    }

    #[test]
    fn large_total_without_lines_is_flagged() {
        let doc = receipt_page(json!({"number": "F-1", "total_amount": "120.50"}), 0);
        let found = find_anomalies("doc", 1, "", &doc);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].field_name.as_deref(), Some("receipt_line"));

        let doc = receipt_page(json!({"number": "F-1", "total_amount": 120.5}), 2);
        assert!(find_anomalies("doc", 1, "", &doc).is_empty());
    }

    #[test]
    fn missing_receipt_number_is_flagged() {
        let doc = receipt_page(json!({"number": " ", "total_amount": 5.0}), 1);
        let found = find_anomalies("doc", 2, "", &doc);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].field_name.as_deref(), Some("number"));
        assert_eq!(found[0].page_index, 2);
    }

    #[test]
    fn stamp_without_sequential_number_is_flagged() {
        let doc = StructuredDocument::default();
        let found = find_anomalies("doc", 1, "sello otem", &doc);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].field_name.as_deref(), Some("sequential_number"));

        let mut stamped = StructuredDocument::default();
        stamped.header.sequential_number = Some("OE0451".into());
        assert!(find_anomalies("doc", 1, "OTEM 0451", &stamped).is_empty());
    }

    #[test]
    fn summary_without_items_is_flagged() {
        let mut doc = StructuredDocument::default();
        doc.header.document_type_id = DocumentType::Summary.id();
        let found = find_anomalies("doc", 1, "", &doc);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].field_name.as_deref(), Some("summary"));
    }

    #[test]
    fn amounts_without_currency_are_flagged() {
        let doc = StructuredDocument::default();
        let found = find_anomalies("doc", 1, "Grand total: 45.00", &doc);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].field_name.as_deref(), Some("currency"));
        assert!(find_anomalies("doc", 1, "Meeting notes", &doc).is_empty());
    }

    #[test]
    fn findings_are_recorded_into_tracker() {
        let tracker = MemoryAnomalyTracker::new();
        let doc = receipt_page(json!({"total_amount": 0.001}), 0);
        let findings = find_anomalies("doc", 4, "TOTAL", &doc);
        let count = record_findings(&tracker, "doc", 4, findings);
        assert_eq!(count, 2);
        assert_eq!(tracker.count(AnomalyKind::MissingField), 1);
        assert_eq!(tracker.count(AnomalyKind::IncorrectValue), 1);
    }

    #[test]
    fn failing_tracker_is_ignored() {
        struct Broken;
        impl AnomalyTracker for Broken {
            fn record(&self, _: AnomalyRecord) -> Result<(), AnomalyError> {
                Err(AnomalyError::Poisoned)
            }
        }
        let doc = StructuredDocument::default();
        let findings = find_anomalies("doc", 1, "TOTAL", &doc);
        assert_eq!(record_findings(&Broken, "doc", 1, findings), 1);
    }

    #[test]
    fn text_preview_is_truncated() {
        let long = "x".repeat(TEXT_PREVIEW_CHARS * 2);
        let anomaly = AnomalyRecord::new("doc", 1, AnomalyKind::ParseError, "boom").with_text(&long);
        assert_eq!(
            anomaly.text_preview.map(|p| p.chars().count()),
            Some(TEXT_PREVIEW_CHARS)
        );
    }

    #[test]
    fn record_ids_are_unique() {
        let a = AnomalyRecord::new("doc", 1, AnomalyKind::ParseError, "a");
        let b = AnomalyRecord::new("doc", 1, AnomalyKind::ParseError, "b");
        assert_ne!(a.id, b.id);
        assert!(a.id.starts_with("error_"));
    }

    #[test]
    fn json_dir_tracker_writes_one_file_per_record() {
        let dir = tempfile::tempdir().unwrap();
        let tracker = JsonDirAnomalyTracker::new(dir.path().join("errors")).unwrap();
        tracker
            .record_missing_field("doc", 1, "currency", None, "TOTAL 5")
            .unwrap();
        tracker
            .record_parse_error("doc", 2, "recognition failed", "")
            .unwrap();

        let files: Vec<_> = std::fs::read_dir(tracker.dir()).unwrap().collect();
        assert_eq!(files.len(), 2);

        let path = files[0].as_ref().unwrap().path();
        let parsed: AnomalyRecord =
            serde_json::from_slice(&std::fs::read(path).unwrap()).unwrap();
        assert_eq!(parsed.document_name, "doc");
    }
}

//! Output data model: per-page records produced by the extraction pipeline.
//!
//! Every page yields one [`PageResult`] carrying two views of the page:
//!
//! * [`RawRecord`]: what the recognition service returned, plus provenance.
//! * [`StructuredDocument`]: the business view, with a [`PageHeader`], the fixed
//!   set of transaction tables and the catalog tables.
//!
//! Records are loose JSON objects ([`Record`]) because the recognition
//! service decides which fields it can read off a page; the table *names*
//! are fixed and always present in a [`StructuredDocument`].

use crate::error::PageError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One row of a table: a JSON object of field name to value.
pub type Record = serde_json::Map<String, serde_json::Value>;

/// Table name to ordered records, as returned by the recognition service or
/// derived locally from text.
pub type TableSet = BTreeMap<String, Vec<Record>>;

/// Well-known table names.
pub mod tables {
    // Transaction tables
    pub const SUMMARY: &str = "summary";
    pub const RECEIPT: &str = "receipt";
    pub const RECEIPT_LINE: &str = "receipt_line";
    pub const WORKDAY: &str = "workday";
    pub const WORKDAY_WORKER: &str = "workday_worker";
    pub const SUPPLIER: &str = "supplier";
    pub const EQUIPMENT: &str = "equipment";

    // Catalog tables
    pub const FILE_TYPE: &str = "file_type";
    pub const CURRENCY: &str = "currency";
    pub const DOCUMENT_TYPE: &str = "document_type";
    pub const LANGUAGE: &str = "language";
    pub const NATURE: &str = "nature";
    pub const UNIT_OF_MEASURE: &str = "unit_of_measure";
    pub const DEPARTMENT: &str = "department";
    pub const DISCIPLINE: &str = "discipline";

    /// Fixed transaction table names, in output order.
    pub const TRANSACTION: [&str; 7] = [
        SUMMARY,
        RECEIPT,
        RECEIPT_LINE,
        WORKDAY,
        WORKDAY_WORKER,
        SUPPLIER,
        EQUIPMENT,
    ];

    /// Fixed catalog table names, in output order.
    pub const CATALOG: [&str; 8] = [
        FILE_TYPE,
        CURRENCY,
        DOCUMENT_TYPE,
        LANGUAGE,
        NATURE,
        UNIT_OF_MEASURE,
        DEPARTMENT,
        DISCIPLINE,
    ];

    /// Whether `name` is one of the catalog tables.
    pub fn is_catalog(name: &str) -> bool {
        CATALOG.contains(&name)
    }

    /// Whether `name` is one of the transaction tables.
    pub fn is_transaction(name: &str) -> bool {
        TRANSACTION.contains(&name)
    }
}

// ── Classification enums ─────────────────────────────────────────────────

/// Business classification of a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    #[default]
    Unknown,
    /// Invoice, ticket or bill with an itemised total.
    Receipt,
    /// Expense summary listing several receipts.
    Summary,
    /// Workday sheet listing workers and hours.
    Timesheet,
    Supplier,
    Equipment,
}

impl DocumentType {
    /// Numeric id used by downstream storage.
    pub fn id(self) -> u32 {
        match self {
            DocumentType::Receipt => 1,
            DocumentType::Summary => 2,
            DocumentType::Timesheet => 3,
            DocumentType::Supplier => 4,
            DocumentType::Equipment => 5,
            DocumentType::Unknown => 99,
        }
    }

    /// Inverse of [`DocumentType::id`]; unrecognised ids map to `Unknown`.
    pub fn from_id(id: u32) -> Self {
        match id {
            1 => DocumentType::Receipt,
            2 => DocumentType::Summary,
            3 => DocumentType::Timesheet,
            4 => DocumentType::Supplier,
            5 => DocumentType::Equipment,
            _ => DocumentType::Unknown,
        }
    }

    /// Tolerant parse of a label returned by the recognition service.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().replace([' ', '-'], "_").as_str() {
            "receipt" | "invoice" | "ticket" | "bill" => DocumentType::Receipt,
            "summary" | "expense_summary" | "expense_report" => DocumentType::Summary,
            "timesheet" | "workday" | "time_sheet" => DocumentType::Timesheet,
            "supplier" | "vendor" => DocumentType::Supplier,
            "equipment" | "machinery" => DocumentType::Equipment,
            _ => DocumentType::Unknown,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            DocumentType::Unknown => "unknown",
            DocumentType::Receipt => "receipt",
            DocumentType::Summary => "summary",
            DocumentType::Timesheet => "timesheet",
            DocumentType::Supplier => "supplier",
            DocumentType::Equipment => "equipment",
        }
    }
}

/// Detected language of a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Language {
    #[serde(rename = "es")]
    Spanish,
    #[serde(rename = "en")]
    English,
    #[serde(rename = "it")]
    Italian,
    #[serde(rename = "zh")]
    Chinese,
    #[default]
    #[serde(rename = "other")]
    Other,
}

impl Language {
    /// Short language code passed to the translation call.
    pub fn code(self) -> &'static str {
        match self {
            Language::Spanish => "es",
            Language::English => "en",
            Language::Italian => "it",
            Language::Chinese => "zh",
            Language::Other => "other",
        }
    }

    /// Numeric id used by downstream storage.
    pub fn id(self) -> u32 {
        match self {
            Language::Spanish => 1,
            Language::English => 2,
            Language::Italian => 3,
            Language::Other => 4,
            Language::Chinese => 5,
        }
    }

    pub fn from_code(code: &str) -> Self {
        match code.trim().to_ascii_lowercase().as_str() {
            "es" => Language::Spanish,
            "en" => Language::English,
            "it" => Language::Italian,
            "zh" => Language::Chinese,
            _ => Language::Other,
        }
    }
}

// ── Structured view ──────────────────────────────────────────────────────

/// Page-level header derived from the recognised text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageHeader {
    /// Text as read off the page.
    pub canonical_text: String,
    /// Translation into a native language, or a copy of `canonical_text`.
    pub translated_text: String,
    /// Format flag: the page is laid out as an expense summary.
    pub summary_format: bool,
    pub language: Language,
    pub document_type_id: u32,
    /// Stamped sequential number (e.g. `BS0012`), when one was found.
    pub sequential_number: Option<String>,
}

impl Default for PageHeader {
    fn default() -> Self {
        Self {
            canonical_text: String::new(),
            translated_text: String::new(),
            summary_format: false,
            language: Language::Other,
            document_type_id: DocumentType::Unknown.id(),
            sequential_number: None,
        }
    }
}

impl PageHeader {
    pub fn document_type(&self) -> DocumentType {
        DocumentType::from_id(self.document_type_id)
    }
}

/// Reference tables attached to transaction records.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogSet {
    pub file_type: Vec<Record>,
    pub currency: Vec<Record>,
    pub document_type: Vec<Record>,
    pub language: Vec<Record>,
    pub nature: Vec<Record>,
    pub unit_of_measure: Vec<Record>,
    pub department: Vec<Record>,
    pub discipline: Vec<Record>,
}

impl CatalogSet {
    /// Collect whichever catalog tables are present in `tables`.
    pub fn from_tables(tables: &TableSet) -> Self {
        let take = |name: &str| tables.get(name).cloned().unwrap_or_default();
        Self {
            file_type: take(tables::FILE_TYPE),
            currency: take(tables::CURRENCY),
            document_type: take(tables::DOCUMENT_TYPE),
            language: take(tables::LANGUAGE),
            nature: take(tables::NATURE),
            unit_of_measure: take(tables::UNIT_OF_MEASURE),
            department: take(tables::DEPARTMENT),
            discipline: take(tables::DISCIPLINE),
        }
    }

    /// Look up a catalog table by name.
    pub fn get(&self, name: &str) -> Option<&[Record]> {
        let table = match name {
            tables::FILE_TYPE => &self.file_type,
            tables::CURRENCY => &self.currency,
            tables::DOCUMENT_TYPE => &self.document_type,
            tables::LANGUAGE => &self.language,
            tables::NATURE => &self.nature,
            tables::UNIT_OF_MEASURE => &self.unit_of_measure,
            tables::DEPARTMENT => &self.department,
            tables::DISCIPLINE => &self.discipline,
            _ => return None,
        };
        Some(table)
    }

    pub fn is_empty(&self) -> bool {
        tables::CATALOG
            .iter()
            .all(|name| self.get(name).is_none_or(|t| t.is_empty()))
    }
}

/// A receipt-line record with its own copy of the catalogs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReceiptLine {
    #[serde(flatten)]
    pub fields: Record,
    pub catalogs: CatalogSet,
}

/// The fixed transaction tables. Every table is always present.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransactionTables {
    pub summary: Vec<Record>,
    pub receipt: Vec<Record>,
    pub receipt_line: Vec<ReceiptLine>,
    pub workday: Vec<Record>,
    pub workday_worker: Vec<Record>,
    pub supplier: Vec<Record>,
    pub equipment: Vec<Record>,
}

impl TransactionTables {
    /// Record count per table name.
    pub fn counts(&self) -> BTreeMap<&'static str, usize> {
        BTreeMap::from([
            (tables::SUMMARY, self.summary.len()),
            (tables::RECEIPT, self.receipt.len()),
            (tables::RECEIPT_LINE, self.receipt_line.len()),
            (tables::WORKDAY, self.workday.len()),
            (tables::WORKDAY_WORKER, self.workday_worker.len()),
            (tables::SUPPLIER, self.supplier.len()),
            (tables::EQUIPMENT, self.equipment.len()),
        ])
    }

    pub fn is_empty(&self) -> bool {
        self.counts().values().all(|n| *n == 0)
    }
}

/// Business-structured record for one page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StructuredDocument {
    pub header: PageHeader,
    pub tables: TransactionTables,
    pub catalogs: CatalogSet,
}

// ── Raw view ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Raw,
    Structured,
}

/// Provenance attached to a persisted record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordMetadata {
    pub version: String,
    pub parser: String,
    pub document_name: String,
    pub page_index: usize,
    pub extracted_at: DateTime<Utc>,
    pub kind: RecordKind,
}

impl RecordMetadata {
    pub fn new(document_name: &str, page_index: usize, kind: RecordKind) -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            parser: env!("CARGO_PKG_NAME").to_string(),
            document_name: document_name.to_string(),
            page_index,
            extracted_at: Utc::now(),
            kind,
        }
    }
}

/// What the recognition service reported for a page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognitionSummary {
    pub succeeded: bool,
    pub text: String,
    pub model: String,
    pub error: Option<String>,
}

/// Raw extraction record for one page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    pub metadata: RecordMetadata,
    pub recognition: RecognitionSummary,
    pub raw_text: String,
}

// ── Page and document results ────────────────────────────────────────────

/// Which strategy produced a page's tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionTier {
    /// Tables came pre-structured from the recognition service.
    Structured,
    /// Tables were derived locally from plain recognised text.
    Plain,
    /// Neither tier produced a result; the page is degraded.
    Failed,
}

/// Result for a single page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageResult {
    pub document_name: String,
    /// 1-indexed page number.
    pub page_index: usize,
    pub tier: ExtractionTier,
    pub raw: RawRecord,
    pub structured: StructuredDocument,
    /// Set only on degraded pages.
    pub error: Option<PageError>,
}

impl PageResult {
    pub fn is_degraded(&self) -> bool {
        self.error.is_some()
    }
}

/// Summary statistics for one document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractionStats {
    /// Pages handed to the pipeline.
    pub total_pages: usize,
    /// Pages extracted without error.
    pub succeeded_pages: usize,
    /// Pages replaced by a degraded result.
    pub degraded_pages: usize,
    /// Pages for which not even a degraded result could be built.
    pub missing_pages: Vec<usize>,
    pub structured_pages: usize,
    pub plain_pages: usize,
    pub duration_ms: u64,
}

/// Complete result of processing one document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionOutput {
    pub document_name: String,
    /// Page results in ascending page order.
    pub pages: Vec<PageResult>,
    pub stats: ExtractionStats,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_type_ids_round_trip() {
        for t in [
            DocumentType::Unknown,
            DocumentType::Receipt,
            DocumentType::Summary,
            DocumentType::Timesheet,
            DocumentType::Supplier,
            DocumentType::Equipment,
        ] {
            assert_eq!(DocumentType::from_id(t.id()), t);
        }
        assert_eq!(DocumentType::from_id(42), DocumentType::Unknown);
    }

    #[test]
    fn document_type_label_is_tolerant() {
        assert_eq!(DocumentType::from_label(" Invoice "), DocumentType::Receipt);
        assert_eq!(DocumentType::from_label("expense report"), DocumentType::Summary);
        assert_eq!(DocumentType::from_label("work-day"), DocumentType::Unknown);
        assert_eq!(DocumentType::from_label("unknown"), DocumentType::Unknown);
    }

    #[test]
    fn language_serialises_as_code() {
        let json = serde_json::to_value(Language::Chinese).unwrap();
        assert_eq!(json, "zh");
        assert_eq!(Language::from_code("EN"), Language::English);
        assert_eq!(Language::Other.id(), 4);
    }

    #[test]
    fn empty_document_serialises_every_table() {
        let doc = StructuredDocument::default();
        let json = serde_json::to_value(&doc).unwrap();
        for name in tables::TRANSACTION {
            assert!(json["tables"][name].is_array(), "missing table {name}");
        }
        for name in tables::CATALOG {
            assert!(json["catalogs"][name].is_array(), "missing catalog {name}");
        }
    }

    #[test]
    fn receipt_line_flattens_fields() {
        let mut fields = Record::new();
        fields.insert("description".into(), "Cement".into());
        let line = ReceiptLine {
            fields,
            catalogs: CatalogSet::default(),
        };
        let json = serde_json::to_value(&line).unwrap();
        assert_eq!(json["description"], "Cement");
        assert!(json["catalogs"].is_object());
    }

    #[test]
    fn catalog_lookup_by_name() {
        let mut set = TableSet::new();
        let mut usd = Record::new();
        usd.insert("code".into(), "USD".into());
        set.insert(tables::CURRENCY.into(), vec![usd]);
        let catalogs = CatalogSet::from_tables(&set);
        assert_eq!(catalogs.get(tables::CURRENCY).map(|t| t.len()), Some(1));
        assert!(catalogs.get("receipt").is_none());
        assert!(!catalogs.is_empty());
        assert!(CatalogSet::default().is_empty());
    }
}

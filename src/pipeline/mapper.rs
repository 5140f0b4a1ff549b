//! Mapping from recognised text to the business model.
//!
//! [`DocumentMapper`] is the seam between the orchestrator and whatever
//! knows the domain's field layout. [`HeuristicDocumentMapper`] is the
//! built-in implementation: keyword classification, stamp and sequential
//! number detection, language detection, and regex extraction of receipt,
//! summary and timesheet rows plus the catalog tables.

use crate::output::{tables, DocumentType, Language, PageHeader, Record, TableSet};
use crate::pipeline::recognition::RecognitionOutcome;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Value};

/// Maps recognised text onto headers and tables.
///
/// Implementations must not fail: anything they cannot read is left out.
pub trait DocumentMapper: Send + Sync {
    /// Build the page header from a recognition outcome. The translation is
    /// left empty; the orchestrator attaches it.
    fn map_to_header(&self, outcome: &RecognitionOutcome) -> PageHeader;

    /// Classify a page from its text alone.
    fn classify_type(&self, text: &str) -> DocumentType;

    /// Derive tables from plain text.
    fn extract_tables(&self, text: &str, document_type: DocumentType) -> TableSet;

    /// Clean up tables supplied by the recognition service and fill in what
    /// can be derived from the text. Returns an empty set rather than failing.
    fn validate_and_enhance(
        &self,
        table_set: TableSet,
        text: &str,
        document_type: DocumentType,
    ) -> TableSet;
}

// ── Patterns ─────────────────────────────────────────────────────────────

/// Stamp markers printed on audited pages.
pub const STAMP_MARKERS: [&str; 4] = ["BSQE", "OTEM", "OTRE", "OTRU"];

static RE_STAMP: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)(BSQE|OTEM|OTRE|OTRU)").unwrap());
static RE_SEQUENTIAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(BS|OE|OR|ORU)(\d{4,})\b").unwrap());
static RE_BARE_NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(\d{4,})\b").unwrap());
static RE_CJK: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\u{4e00}-\u{9fff}]").unwrap());

static RE_INVOICE_NUMBER: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)Source\s+Ref:\s*([A-Z0-9\-]+)",
        r"(?i)Invoice\s+Number[:\s]+(\d+)",
        r"(?i)BOLETA\s+ELECTR[ÓO]NICA\s+N°\s*(\d+)",
        r"发票号码[:：]?\s*(\d{8,})",
        r"(?i)N°\s*(\d{4,})",
        r"(?i)Folio\s*(?:No\.?|:)?\s*(\d+)",
        r"(?i)(?:^|\s)(?:INVOICE|RECEIPT|TICKET|FATTURA|FACTURA|BOLETA)\s+(?:No\.?|N°|#)\s*([A-Z0-9\-]+)",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});
static RE_CONTRACT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)Contract\s*no\.?\s*(\d+)").unwrap());
static RE_DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(\d{1,2}[/\-.]\d{1,2}[/\-.]\d{2,4}|\d{4}-\d{2}-\d{2})\b").unwrap()
});
static RE_TOTAL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?im)^.*?\b(?:GRAND\s+TOTAL|TOTAL|AMOUNT\s+DUE|JUMLAH|TOTALE)\b[^\d\n]*(-?\d[\d,]*(?:\.\d{1,2})?)")
        .unwrap()
});
static RE_LINE_ITEM: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d+(?:\.\d+)?)\s*(?:x\s+)?([A-Za-z][^\n]*?)\s+(\d[\d,]*\.\d{2})$").unwrap()
});
static RE_AMOUNT_ROW: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([A-Za-z][^\n]*?)\s+(-?\d[\d,]*\.\d{2})$").unwrap());
static RE_WORKER_ROW: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{3,})\s+([A-Za-z][A-Za-z ,.'\-]*?)\s+(\d{1,2}(?:\.\d{1,2})?)$").unwrap()
});
static RE_CURRENCY_CODE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(USD|PEN|EUR|RM|MYR|CLP|GBP|JPY|CNY|COP|MXN|ARS|BRL)(?:\b|\d)").unwrap()
});
static RE_DOLLAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"\$\s*\d").unwrap());
static RE_YUAN: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?:¥\s*\d|\d\s*元)").unwrap());

const RECEIPT_KEYWORDS: [&str; 10] = [
    "invoice", "receipt", "ticket", "bill", "factura", "boleta", "fattura", "cash/invoice",
    "总计", "jumlah",
];
const SUMMARY_KEYWORDS: [&str; 5] = [
    "summary", "consolidated", "expense report", "reimbursable expenditure", "resumen",
];
const TIMESHEET_KEYWORDS: [&str; 6] = [
    "empl no", "full name", "labor", "total hours", "employee", "timesheet",
];

const SPANISH_WORDS: [&str; 14] = [
    "factura", "boleta", "servicios", "empresa", "cliente", "proveedor", "total", "fecha",
    "descripción", "cantidad", "precio", "impuesto", "jornada", "empleado",
];
const ENGLISH_WORDS: [&str; 19] = [
    "invoice", "summary", "bill", "services", "company", "client", "supplier", "total", "date",
    "description", "quantity", "price", "tax", "labor", "employee", "arrival", "departure",
    "charge", "payment",
];
const ITALIAN_WORDS: [&str; 13] = [
    "fattura", "servizi", "azienda", "cliente", "fornitore", "totale", "data", "descrizione",
    "quantità", "prezzo", "imposta", "giornata", "dipendente",
];
const MALAY_WORDS: [&str; 8] = [
    "tarikh", "jumlah", "terima", "disahkan", "makan", "kuantiti", "harga", "barang",
];

const NATURE_KEYWORDS: [(&str, &[&str]); 3] = [
    ("Meals", &["MEAL", "FOOD", "RESTAURANT", "BREAKFAST", "LUNCH", "DINNER", "MAKAN"]),
    ("Lodging", &["HOTEL", "LODGING", "ACCOMMODATION", "ROOM"]),
    ("Transport", &["TAXI", "FLIGHT", "AIRLINE", "FUEL", "TRANSPORT", "BUS"]),
];

// ── Free helpers ─────────────────────────────────────────────────────────

/// Stamp marker and sequential number found in the text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StampInfo {
    pub stamp_name: Option<String>,
    pub sequential_number: Option<String>,
}

/// Find the stamp marker and its sequential number.
///
/// The number is looked for anywhere first (`BS0012`); failing that, a bare
/// 4+ digit number within 200 characters after the marker is prefixed with
/// the marker's short code.
pub fn extract_stamp(text: &str) -> StampInfo {
    let stamp = RE_STAMP.find(text);
    let stamp_name = stamp.map(|m| m.as_str().to_ascii_uppercase());

    if let Some(caps) = RE_SEQUENTIAL.captures(text) {
        return StampInfo {
            stamp_name,
            sequential_number: Some(format!("{}{}", caps[1].to_ascii_uppercase(), &caps[2])),
        };
    }

    let sequential_number = stamp.and_then(|m| {
        let window: String = text[m.end()..].chars().take(200).collect();
        let number = RE_BARE_NUMBER.captures(&window)?;
        let code = match m.as_str().to_ascii_uppercase().as_str() {
            "BSQE" => "BS",
            "OTEM" => "OE",
            "OTRE" => "OR",
            _ => "ORU",
        };
        Some(format!("{code}{}", &number[1]))
    });

    StampInfo {
        stamp_name,
        sequential_number,
    }
}

/// Whether the text carries one of the stamp markers.
pub fn has_stamp_marker(text: &str) -> bool {
    let upper = text.to_uppercase();
    STAMP_MARKERS.iter().any(|m| upper.contains(m))
}

/// Keyword-count language detection. Any CJK ideograph means Chinese.
pub fn detect_language(text: &str) -> Language {
    if RE_CJK.is_match(text) {
        return Language::Chinese;
    }
    let lower = text.to_lowercase();
    let count = |words: &[&str]| words.iter().filter(|w| lower.contains(**w)).count();
    let spanish = count(&SPANISH_WORDS);
    let english = count(&ENGLISH_WORDS);
    let italian = count(&ITALIAN_WORDS);
    let malay = count(&MALAY_WORDS);

    if malay > 2 {
        Language::Other
    } else if italian > 2 {
        Language::Italian
    } else if spanish > english && spanish > 2 {
        Language::Spanish
    } else if english > spanish && english > 2 {
        Language::English
    } else if spanish > 0 {
        Language::Spanish
    } else if english > 0 {
        Language::English
    } else {
        Language::Other
    }
}

/// Parse a monetary value such as `5,693.07`, `"USD 12.50"` or `1.234,56`.
pub fn parse_amount(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, '.' | ',' | '-'))
        .collect();
    if !cleaned.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }
    let normalised = match (cleaned.rfind('.'), cleaned.rfind(',')) {
        (Some(dot), Some(comma)) if comma > dot => cleaned.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => cleaned.replace(',', ""),
        (None, Some(comma)) if cleaned.len() - comma - 1 == 2 => cleaned.replace(',', "."),
        _ => cleaned.replace(',', ""),
    };
    normalised.parse::<f64>().ok()
}

/// Numeric value of a JSON field holding a number or a numeric string.
pub fn amount_of(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_amount(s),
        _ => None,
    }
}

/// Fields whose values are coerced to numbers.
fn is_numeric_field(key: &str) -> bool {
    key.ends_with("_amount")
        || key.ends_with("_price")
        || matches!(
            key,
            "amount" | "price" | "quantity" | "subtotal" | "tax" | "hours" | "total_hours"
        )
}

fn into_record(value: Value) -> Record {
    match value {
        Value::Object(map) => map,
        _ => Record::new(),
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

// ── HeuristicDocumentMapper ──────────────────────────────────────────────

/// Built-in [`DocumentMapper`] using keyword and regex heuristics.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicDocumentMapper;

impl HeuristicDocumentMapper {
    pub fn new() -> Self {
        Self
    }

    fn receipt_tables(&self, text: &str) -> TableSet {
        let mut out = TableSet::new();
        let stamp = extract_stamp(text);
        let number = RE_INVOICE_NUMBER
            .iter()
            .find_map(|re| re.captures(text).map(|c| c[1].trim().to_string()));

        let mut receipt = Record::new();
        receipt.insert("number".into(), number.map_or(Value::Null, Value::from));
        if let Some(series) = RE_CONTRACT.captures(text) {
            receipt.insert("series".into(), Value::from(&series[1]));
        }
        if let Some(date) = RE_DATE.captures(text) {
            receipt.insert("date".into(), Value::from(&date[1]));
        }
        if let Some(total) = RE_TOTAL.captures(text).and_then(|c| parse_amount(&c[1])) {
            receipt.insert("total_amount".into(), Value::from(total));
        }
        if let Some(name) = stamp.stamp_name {
            receipt.insert("stamp_name".into(), Value::from(name));
        }
        if let Some(seq) = stamp.sequential_number {
            receipt.insert("sequential_number".into(), Value::from(seq));
        }
        out.insert(tables::RECEIPT.into(), vec![receipt]);

        let lines: Vec<Record> = text
            .lines()
            .map(str::trim)
            .filter_map(|line| RE_LINE_ITEM.captures(line))
            .filter(|c| !c[2].to_ascii_uppercase().contains("TOTAL"))
            .map(|c| {
                into_record(json!({
                    "quantity": parse_amount(&c[1]),
                    "description": c[2].trim(),
                    "amount": parse_amount(&c[3]),
                }))
            })
            .collect();
        if !lines.is_empty() {
            out.insert(tables::RECEIPT_LINE.into(), lines);
        }
        out
    }

    fn summary_tables(&self, text: &str) -> TableSet {
        let rows: Vec<Record> = text
            .lines()
            .map(str::trim)
            .filter_map(|line| RE_AMOUNT_ROW.captures(line))
            .map(|c| {
                into_record(json!({
                    "description": c[1].trim(),
                    "amount": parse_amount(&c[2]),
                }))
            })
            .collect();
        TableSet::from([(tables::SUMMARY.to_string(), rows)])
    }

    fn timesheet_tables(&self, text: &str) -> TableSet {
        let workers: Vec<Record> = text
            .lines()
            .map(str::trim)
            .filter_map(|line| RE_WORKER_ROW.captures(line))
            .map(|c| {
                into_record(json!({
                    "employee_number": &c[1],
                    "full_name": c[2].trim(),
                    "hours": parse_amount(&c[3]),
                }))
            })
            .collect();

        let total_hours: f64 = workers
            .iter()
            .filter_map(|w| w.get("hours").and_then(amount_of))
            .sum();
        let mut workday = Record::new();
        if let Some(date) = RE_DATE.captures(text) {
            workday.insert("date".into(), Value::from(&date[1]));
        }
        workday.insert("total_hours".into(), Value::from(total_hours));

        TableSet::from([
            (tables::WORKDAY.to_string(), vec![workday]),
            (tables::WORKDAY_WORKER.to_string(), workers),
        ])
    }

    /// Catalog tables derivable from the text alone.
    fn catalog_tables(&self, text: &str, document_type: DocumentType) -> TableSet {
        let language = detect_language(text);
        let mut out = TableSet::new();
        out.insert(
            tables::LANGUAGE.into(),
            vec![into_record(json!({"id": language.id(), "code": language.code()}))],
        );
        out.insert(
            tables::DOCUMENT_TYPE.into(),
            vec![into_record(
                json!({"id": document_type.id(), "label": document_type.label()}),
            )],
        );

        let currencies = detect_currencies(text);
        if !currencies.is_empty() {
            out.insert(
                tables::CURRENCY.into(),
                currencies
                    .into_iter()
                    .map(|code| into_record(json!({ "code": code })))
                    .collect(),
            );
        }

        let upper = text.to_uppercase();
        let nature = NATURE_KEYWORDS
            .iter()
            .find(|(_, words)| words.iter().any(|w| upper.contains(w)))
            .map_or("Other", |(name, _)| *name);
        out.insert(
            tables::NATURE.into(),
            vec![into_record(json!({ "name": nature }))],
        );
        out
    }
}

/// Currency codes mentioned in the text, in order of first appearance.
fn detect_currencies(text: &str) -> Vec<String> {
    let mut found: Vec<String> = Vec::new();
    let mut push = |code: &str| {
        let code = match code {
            "RM" => "MYR".to_string(),
            other => other.to_string(),
        };
        if !found.contains(&code) {
            found.push(code);
        }
    };
    for caps in RE_CURRENCY_CODE.captures_iter(text) {
        push(&caps[1].to_ascii_uppercase());
    }
    if RE_YUAN.is_match(text) {
        push("CNY");
    }
    if RE_DOLLAR.is_match(text) {
        push("USD");
    }
    found
}

impl DocumentMapper for HeuristicDocumentMapper {
    fn map_to_header(&self, outcome: &RecognitionOutcome) -> PageHeader {
        let text = outcome.raw_text.as_str();
        let document_type = match outcome.document_type {
            DocumentType::Unknown => self.classify_type(text),
            known => known,
        };
        PageHeader {
            canonical_text: text.to_string(),
            translated_text: String::new(),
            summary_format: document_type == DocumentType::Summary,
            language: detect_language(text),
            document_type_id: document_type.id(),
            sequential_number: extract_stamp(text).sequential_number,
        }
    }

    fn classify_type(&self, text: &str) -> DocumentType {
        let lower = text.to_lowercase();
        let any = |words: &[&str]| words.iter().any(|w| lower.contains(w));
        if any(&RECEIPT_KEYWORDS) {
            DocumentType::Receipt
        } else if any(&SUMMARY_KEYWORDS) {
            DocumentType::Summary
        } else if any(&TIMESHEET_KEYWORDS) {
            DocumentType::Timesheet
        } else {
            DocumentType::Unknown
        }
    }

    fn extract_tables(&self, text: &str, document_type: DocumentType) -> TableSet {
        if text.trim().is_empty() {
            return TableSet::new();
        }
        let mut out = match document_type {
            DocumentType::Receipt => self.receipt_tables(text),
            DocumentType::Summary => self.summary_tables(text),
            DocumentType::Timesheet => self.timesheet_tables(text),
            _ => TableSet::new(),
        };
        out.extend(self.catalog_tables(text, document_type));
        out
    }

    fn validate_and_enhance(
        &self,
        table_set: TableSet,
        text: &str,
        document_type: DocumentType,
    ) -> TableSet {
        let mut out: TableSet = table_set
            .into_iter()
            .map(|(name, rows)| {
                let rows: Vec<Record> = rows
                    .into_iter()
                    .map(|mut row| {
                        for (key, value) in row.iter_mut() {
                            if is_numeric_field(key) {
                                if let Value::String(s) = value {
                                    if let Some(n) = parse_amount(s) {
                                        *value = Value::from(n);
                                    }
                                }
                            }
                        }
                        row
                    })
                    .filter(|row| !row.values().all(is_blank))
                    .collect();
                (name, rows)
            })
            .collect();

        if text.trim().is_empty() {
            return out;
        }

        // Catalogs the service left out are derived from the text.
        for (name, rows) in self.catalog_tables(text, document_type) {
            let missing = out.get(&name).is_none_or(|existing| existing.is_empty());
            if missing {
                out.insert(name, rows);
            }
        }

        if let Some(receipts) = out.get_mut(tables::RECEIPT) {
            let stamp = extract_stamp(text);
            for receipt in receipts.iter_mut() {
                if receipt.get("sequential_number").is_none_or(is_blank) {
                    if let Some(seq) = &stamp.sequential_number {
                        receipt.insert("sequential_number".into(), Value::from(seq.as_str()));
                    }
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(text: &str) -> RecognitionOutcome {
        RecognitionOutcome::succeeded(text, "test-model")
    }

    #[test]
    fn classify_prefers_receipt_keywords() {
        let m = HeuristicDocumentMapper::new();
        assert_eq!(m.classify_type("INVOICE No. 221"), DocumentType::Receipt);
        assert_eq!(m.classify_type("Expense Summary March"), DocumentType::Summary);
        assert_eq!(m.classify_type("Empl No  Full Name  Hours"), DocumentType::Timesheet);
        assert_eq!(m.classify_type("lorem ipsum"), DocumentType::Unknown);
    }

    #[test]
    fn sequential_number_inline() {
        let info = extract_stamp("OTEM stamp\nref oe0042 approved");
        assert_eq!(info.stamp_name.as_deref(), Some("OTEM"));
        assert_eq!(info.sequential_number.as_deref(), Some("OE0042"));
    }

    #[test]
    fn sequential_number_from_bare_digits_near_stamp() {
        let info = extract_stamp("checked BSQE\n 20931 ");
        assert_eq!(info.sequential_number.as_deref(), Some("BS20931"));
    }

    #[test]
    fn stamp_without_number() {
        let info = extract_stamp("OTRU approved");
        assert_eq!(info.stamp_name.as_deref(), Some("OTRU"));
        assert!(info.sequential_number.is_none());
        assert!(has_stamp_marker("otru approved"));
    }

    #[test]
    fn language_detection() {
        assert_eq!(detect_language("发票 总计 100"), Language::Chinese);
        assert_eq!(
            detect_language("Invoice date description quantity price"),
            Language::English
        );
        assert_eq!(
            detect_language("Factura fecha cantidad precio empresa"),
            Language::Spanish
        );
        assert_eq!(
            detect_language("Fattura fornitore descrizione prezzo"),
            Language::Italian
        );
        assert_eq!(detect_language("12345"), Language::Other);
    }

    #[test]
    fn amounts_parse_in_common_formats() {
        assert_eq!(parse_amount("5,693.07"), Some(5693.07));
        assert_eq!(parse_amount("USD 12.50"), Some(12.5));
        assert_eq!(parse_amount("1.234,56"), Some(1234.56));
        assert_eq!(parse_amount("12,50"), Some(12.5));
        assert_eq!(parse_amount("n/a"), None);
        assert_eq!(amount_of(&json!("0.005")), Some(0.005));
        assert_eq!(amount_of(&json!(7)), Some(7.0));
        assert_eq!(amount_of(&json!(null)), None);
    }

    #[test]
    fn header_uses_service_type_when_known() {
        let m = HeuristicDocumentMapper::new();
        let mut o = outcome("lorem ipsum");
        o.document_type = DocumentType::Summary;
        let header = m.map_to_header(&o);
        assert_eq!(header.document_type_id, 2);
        assert!(header.summary_format);
        assert!(header.translated_text.is_empty());
    }

    #[test]
    fn receipt_extraction_from_plain_text() {
        let m = HeuristicDocumentMapper::new();
        let text = "ACME HARDWARE\nINVOICE No. A-778\nDate 12/03/2024\n2 Steel bolts 4.50\n1 Drill bit 12.00\nTOTAL USD 16.50\nOTEM OE0099";
        let t = m.extract_tables(text, DocumentType::Receipt);
        let receipt = &t[tables::RECEIPT][0];
        assert_eq!(receipt["number"], "A-778");
        assert_eq!(receipt["total_amount"], 16.5);
        assert_eq!(receipt["sequential_number"], "OE0099");
        assert_eq!(t[tables::RECEIPT_LINE].len(), 2);
        assert_eq!(t[tables::CURRENCY][0]["code"], "USD");
        assert_eq!(t[tables::LANGUAGE][0]["code"], "en");
    }

    #[test]
    fn timesheet_extraction_sums_hours() {
        let m = HeuristicDocumentMapper::new();
        let text = "Labor sheet 01/02/2024\n1021 Maria Lopez 8\n1022 John Smith 7.5";
        let t = m.extract_tables(text, DocumentType::Timesheet);
        assert_eq!(t[tables::WORKDAY_WORKER].len(), 2);
        assert_eq!(t[tables::WORKDAY][0]["total_hours"], 15.5);
    }

    #[test]
    fn empty_text_yields_no_tables() {
        let m = HeuristicDocumentMapper::new();
        assert!(m.extract_tables("   ", DocumentType::Receipt).is_empty());
    }

    #[test]
    fn enhance_coerces_amount_strings_and_drops_blank_rows() {
        let m = HeuristicDocumentMapper::new();
        let mut set = TableSet::new();
        set.insert(
            tables::RECEIPT.into(),
            vec![
                into_record(json!({"number": "9", "total_amount": "5,693.07"})),
                into_record(json!({"number": "", "total_amount": null})),
            ],
        );
        let out = m.validate_and_enhance(set, "Receipt total EUR 5,693.07", DocumentType::Receipt);
        assert_eq!(out[tables::RECEIPT].len(), 1);
        assert_eq!(out[tables::RECEIPT][0]["total_amount"], 5693.07);
        assert_eq!(out[tables::CURRENCY][0]["code"], "EUR");
    }

    #[test]
    fn enhance_keeps_service_catalogs() {
        let m = HeuristicDocumentMapper::new();
        let mut set = TableSet::new();
        set.insert(
            tables::CURRENCY.into(),
            vec![into_record(json!({"code": "PEN"}))],
        );
        let out = m.validate_and_enhance(set, "Total USD 10.00", DocumentType::Receipt);
        assert_eq!(out[tables::CURRENCY].len(), 1);
        assert_eq!(out[tables::CURRENCY][0]["code"], "PEN");
    }
}

//! Repair of nested or doubly-encoded recognition payloads.
//!
//! Vision models asked for a JSON object sometimes return it as a *string*
//! inside the text field, occasionally nested once more. [`normalize`] takes
//! the four untrusted fields of a structured outcome and returns them with
//! the nesting peeled back by a single bounded pass:
//!
//! 1. If the text does not look like a JSON object, all four fields are
//!    returned as-is, translation included.
//! 2. Object-shaped text that fails to parse clears text, translation and
//!    tables. There is no second attempt.
//! 3. Recognised keys replace the corresponding fields: `structured_data`,
//!    `ocr_text`, `document_type`, `ocr_text_translated`. Text values that
//!    are themselves object-shaped are opened one more level, no deeper.
//! 4. Anything still object-shaped afterwards is discarded.
//!
//! Once the text was object-shaped, neither output text field begins with
//! `{`. Together with step 1 this makes the pass idempotent.

use crate::output::{DocumentType, Record, TableSet};
use serde_json::{Map, Value};
use tracing::debug;

/// Keys of the structured payload.
pub const KEY_TEXT: &str = "ocr_text";
pub const KEY_TRANSLATED: &str = "ocr_text_translated";
pub const KEY_DOCUMENT_TYPE: &str = "document_type";
pub const KEY_TABLES: &str = "structured_data";

/// The four fields the normaliser works on.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Payload {
    pub raw_text: String,
    pub translated_text: Option<String>,
    pub document_type: DocumentType,
    pub tables: TableSet,
}

/// Whether `text` looks like a serialised JSON object.
pub fn looks_like_object(text: &str) -> bool {
    text.trim_start().starts_with('{')
}

/// Peel one level of nesting off a recognition payload.
pub fn normalize(payload: Payload) -> Payload {
    let Payload {
        mut raw_text,
        mut translated_text,
        mut document_type,
        mut tables,
    } = payload;

    if looks_like_object(&raw_text) {
        let parsed = match serde_json::from_str::<Value>(raw_text.trim()) {
            Ok(Value::Object(map)) => Some(map),
            _ => None,
        };

        let Some(map) = parsed else {
            debug!("Object-shaped text did not parse; clearing payload");
            return Payload {
                raw_text: String::new(),
                translated_text: Some(String::new()),
                document_type,
                tables: TableSet::new(),
            };
        };

        // (a) tables
        if let Some(Value::Object(inner)) = map.get(KEY_TABLES) {
            if !inner.is_empty() {
                tables = tables_from_map(inner);
            }
        }

        // (b) text
        if let Some(text) = non_empty_str(&map, KEY_TEXT) {
            raw_text = open_one_level(text, &[KEY_TEXT]);
        }

        // (c) document type
        if let Some(label) = non_empty_str(&map, KEY_DOCUMENT_TYPE) {
            if !label.trim().eq_ignore_ascii_case("unknown") {
                document_type = DocumentType::from_label(label);
            }
        }

        // (d) translation
        if let Some(text) = non_empty_str(&map, KEY_TRANSLATED) {
            translated_text = Some(open_one_level(text, &[KEY_TRANSLATED, KEY_TEXT]));
        }

        if looks_like_object(&raw_text) {
            raw_text = String::new();
        }

        if let Some(translated) = translated_text.as_mut() {
            if looks_like_object(translated) {
                *translated = open_one_level(translated, &[KEY_TRANSLATED, KEY_TEXT]);
                if looks_like_object(translated) {
                    *translated = raw_text.clone();
                }
            }
        }
    }

    Payload {
        raw_text,
        translated_text,
        document_type,
        tables,
    }
}

/// Convert a `structured_data` value into a table set.
///
/// Arrays keep their object entries; a bare object counts as a single-row
/// table; any other value is dropped.
pub fn tables_from_value(value: &Value) -> TableSet {
    match value {
        Value::Object(map) => tables_from_map(map),
        _ => TableSet::new(),
    }
}

fn tables_from_map(map: &Map<String, Value>) -> TableSet {
    let mut tables = TableSet::new();
    for (name, value) in map {
        let rows: Vec<Record> = match value {
            Value::Array(items) => items
                .iter()
                .filter_map(|item| item.as_object().cloned())
                .collect(),
            Value::Object(row) => vec![row.clone()],
            _ => {
                debug!("Dropping table '{}': not an array or object", name);
                continue;
            }
        };
        tables.insert(name.clone(), rows);
    }
    tables
}

fn non_empty_str<'a>(map: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    map.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
}

/// If `text` is object-shaped, return the first non-empty string found under
/// `keys` in the parsed object; otherwise return `text` unchanged. Never
/// descends further than this one level.
fn open_one_level(text: &str, keys: &[&str]) -> String {
    if !looks_like_object(text) {
        return text.to_string();
    }
    if let Ok(Value::Object(inner)) = serde_json::from_str::<Value>(text.trim()) {
        for key in keys {
            if let Some(found) = non_empty_str(&inner, key) {
                return found.to_string();
            }
        }
    }
    text.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(raw: &str) -> Payload {
        Payload {
            raw_text: raw.to_string(),
            translated_text: Some("translated".into()),
            document_type: DocumentType::Unknown,
            tables: TableSet::new(),
        }
    }

    #[test]
    fn plain_text_is_untouched() {
        let p = payload("INVOICE No. 4411\nTotal 52.10");
        assert_eq!(normalize(p.clone()), p);
    }

    #[test]
    fn plain_text_leaves_object_shaped_translation_alone() {
        let p = Payload {
            raw_text: "INVOICE 12".into(),
            translated_text: Some(r#"{"ocr_text_translated": "FACTURA 12"}"#.into()),
            document_type: DocumentType::Receipt,
            tables: TableSet::new(),
        };
        assert_eq!(normalize(p.clone()), p);
    }

    #[test]
    fn nested_payload_is_unwrapped() {
        let raw = json!({
            "ocr_text": "TICKET 17",
            "ocr_text_translated": "TICKET 17 (en)",
            "document_type": "receipt",
            "structured_data": {
                "receipt": [{"number": "17", "total_amount": 12.5}],
                "currency": {"code": "EUR"}
            }
        })
        .to_string();

        let out = normalize(payload(&raw));
        assert_eq!(out.raw_text, "TICKET 17");
        assert_eq!(out.translated_text.as_deref(), Some("TICKET 17 (en)"));
        assert_eq!(out.document_type, DocumentType::Receipt);
        assert_eq!(out.tables["receipt"][0]["number"], "17");
        assert_eq!(out.tables["currency"].len(), 1);
    }

    #[test]
    fn unparseable_object_clears_everything() {
        let mut p = payload("{ \"ocr_text\": \"cut off");
        p.tables.insert("receipt".into(), vec![Record::new()]);
        let out = normalize(p);
        assert_eq!(out.raw_text, "");
        assert_eq!(out.translated_text.as_deref(), Some(""));
        assert!(out.tables.is_empty());
    }

    #[test]
    fn unknown_document_type_does_not_override() {
        let mut p = payload(r#"{"ocr_text": "hello", "document_type": "unknown"}"#);
        p.document_type = DocumentType::Summary;
        assert_eq!(normalize(p).document_type, DocumentType::Summary);
    }

    #[test]
    fn empty_structured_data_keeps_existing_tables() {
        let mut p = payload(r#"{"ocr_text": "hello", "structured_data": {}}"#);
        p.tables.insert("summary".into(), vec![Record::new()]);
        let out = normalize(p);
        assert!(out.tables.contains_key("summary"));
    }

    #[test]
    fn second_level_text_is_opened_once() {
        let inner = json!({"ocr_text": "REAL TEXT"}).to_string();
        let raw = json!({"ocr_text": inner}).to_string();
        let out = normalize(payload(&raw));
        assert_eq!(out.raw_text, "REAL TEXT");
    }

    #[test]
    fn third_level_text_is_discarded() {
        let deepest = json!({"ocr_text": "TOO DEEP"}).to_string();
        let middle = json!({"ocr_text": deepest}).to_string();
        let raw = json!({"ocr_text": middle}).to_string();
        let out = normalize(payload(&raw));
        assert_eq!(out.raw_text, "");
    }

    #[test]
    fn object_shaped_translation_falls_back_to_text() {
        let raw = json!({"ocr_text": "SCONTRINO", "ocr_text_translated": "{not json"}).to_string();
        let out = normalize(payload(&raw));
        assert_eq!(out.raw_text, "SCONTRINO");
        assert_eq!(out.translated_text.as_deref(), Some("SCONTRINO"));
    }

    #[test]
    fn object_without_known_keys_leaves_no_json_text() {
        let out = normalize(payload(r#"{"foo": 1}"#));
        assert_eq!(out.raw_text, "");
        assert!(!looks_like_object(out.translated_text.as_deref().unwrap_or("")));
    }

    #[test]
    fn normalisation_is_idempotent() {
        let inputs = [
            "plain text".to_string(),
            json!({"ocr_text": "A", "ocr_text_translated": "B", "document_type": "summary"}).to_string(),
            json!({"ocr_text": json!({"ocr_text": "nested"}).to_string()}).to_string(),
            "{ broken".to_string(),
            r#"{"structured_data": {"receipt": [{"number": "1"}]}}"#.to_string(),
        ];
        for raw in inputs {
            let once = normalize(payload(&raw));
            let twice = normalize(once.clone());
            assert_eq!(once, twice, "not idempotent for {raw}");
            assert!(!looks_like_object(&once.raw_text));
        }
    }

    #[test]
    fn tables_from_value_drops_scalars() {
        let tables = tables_from_value(&json!({
            "receipt": [{"number": "9"}, "noise", 3],
            "summary": "not a table",
            "supplier": {"name": "ACME"}
        }));
        assert_eq!(tables["receipt"].len(), 1);
        assert!(!tables.contains_key("summary"));
        assert_eq!(tables["supplier"][0]["name"], "ACME");
    }
}

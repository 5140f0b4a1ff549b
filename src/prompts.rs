//! Prompts sent to the vision model.
//!
//! Three calls are made per page at most: the structured extraction, the
//! plain-text fallback, and a translation of non-native text. The JSON keys
//! requested by [`STRUCTURED_EXTRACTION_PROMPT`] must stay in sync with
//! [`crate::pipeline::normalize`] and [`crate::output::tables`].

/// Structured tier: full text, translation, document type and tables.
pub const STRUCTURED_EXTRACTION_PROMPT: &str = r#"You are a document digitisation system for financial and operational paperwork (invoices, receipts, expense summaries, timesheets).

Read the page image and answer with ONE JSON object and nothing else. No markdown fences, no commentary.

The object has exactly these keys:

{
  "ocr_text": "<every piece of visible text, in reading order, line breaks preserved>",
  "ocr_text_translated": "<ocr_text translated to English; a copy of ocr_text if it is already Spanish or English>",
  "document_type": "receipt" | "summary" | "timesheet" | "supplier" | "equipment" | "unknown",
  "structured_data": {
    "summary":        [ { "description": "...", "amount": 0.00, "job_number": "..." } ],
    "receipt":        [ { "number": "...", "series": "...", "date": "...", "total_amount": 0.00, "stamp_name": "...", "sequential_number": "..." } ],
    "receipt_line":   [ { "quantity": 0, "description": "...", "unit_price": 0.00, "amount": 0.00 } ],
    "workday":        [ { "date": "...", "total_hours": 0 } ],
    "workday_worker": [ { "employee_number": "...", "full_name": "...", "hours": 0 } ],
    "supplier":       [ { "name": "...", "tax_id": "..." } ],
    "equipment":      [ { "name": "...", "hours": 0 } ],
    "currency":       [ { "code": "USD" } ],
    "language":       [ { "code": "en" } ],
    "nature":         [ { "name": "Meals" | "Lodging" | "Transport" | "Other" } ]
  }
}

Rules:
1. "ocr_text" must be plain text. Never put JSON inside it.
2. Omit tables you cannot fill; never invent values.
3. Monetary values are numbers with a dot as decimal separator. If unsure, use a string exactly as printed.
4. Stamp markers BSQE, OTEM, OTRE or OTRU are usually followed by a sequential number such as BS0012 or OE0451; report it as "sequential_number".
5. Currency codes are ISO 4217 (RM becomes MYR)."#;

/// Plain-text tier: OCR only.
pub const PLAIN_OCR_PROMPT: &str = r#"Transcribe ALL visible text on this page image.

Rules:
1. Preserve reading order and line breaks.
2. Keep numbers, amounts, codes and stamps exactly as printed.
3. Output only the transcribed text. No commentary, no markdown fences, no JSON."#;

/// System prompt for the translation call.
pub const TRANSLATION_SYSTEM_PROMPT: &str = "You translate business documents into English. \
Keep numbers, amounts, codes, names and line breaks unchanged. Output only the translation.";

/// User message for translating `text` from `source_language`.
pub fn translation_request(text: &str, source_language: &str) -> String {
    format!("Source language: {source_language}\n\nTranslate the following text:\n\n{text}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::tables;
    use crate::pipeline::normalize::{KEY_DOCUMENT_TYPE, KEY_TABLES, KEY_TEXT, KEY_TRANSLATED};

    #[test]
    fn structured_prompt_names_every_payload_key() {
        for key in [KEY_TEXT, KEY_TRANSLATED, KEY_DOCUMENT_TYPE, KEY_TABLES] {
            assert!(
                STRUCTURED_EXTRACTION_PROMPT.contains(&format!("\"{key}\"")),
                "missing {key}"
            );
        }
    }

    #[test]
    fn structured_prompt_names_transaction_tables() {
        for name in tables::TRANSACTION {
            assert!(
                STRUCTURED_EXTRACTION_PROMPT.contains(&format!("\"{name}\"")),
                "missing {name}"
            );
        }
    }

    #[test]
    fn translation_request_embeds_language_and_text() {
        let msg = translation_request("Fattura n. 12", "it");
        assert!(msg.contains("it"));
        assert!(msg.ends_with("Fattura n. 12"));
    }
}

//! Build the per-page [`StructuredDocument`] from a header and a table set.
//!
//! The assembler is a pure function. It sorts the incoming tables into the
//! fixed transaction tables and the catalog tables, fills any missing table
//! with an empty one, and gives every receipt-line record its own copy of the
//! catalogs so downstream consumers can store each line on its own.

use crate::output::{
    tables, CatalogSet, PageHeader, Record, ReceiptLine, StructuredDocument, TableSet,
    TransactionTables,
};
use tracing::debug;

/// Field under which a receipt line carries its catalogs.
const CATALOGS_FIELD: &str = "catalogs";

/// Assemble a structured document. Unknown table names are dropped.
pub fn assemble(header: PageHeader, table_set: &TableSet) -> StructuredDocument {
    for name in table_set.keys() {
        if !tables::is_transaction(name) && !tables::is_catalog(name) {
            debug!("Dropping unrecognised table '{}'", name);
        }
    }

    let catalogs = CatalogSet::from_tables(table_set);
    let take = |name: &str| -> Vec<Record> { table_set.get(name).cloned().unwrap_or_default() };

    let receipt_line = take(tables::RECEIPT_LINE)
        .into_iter()
        .map(|mut fields| {
            fields.remove(CATALOGS_FIELD);
            ReceiptLine {
                fields,
                catalogs: catalogs.clone(),
            }
        })
        .collect();

    StructuredDocument {
        header,
        tables: TransactionTables {
            summary: take(tables::SUMMARY),
            receipt: take(tables::RECEIPT),
            receipt_line,
            workday: take(tables::WORKDAY),
            workday_worker: take(tables::WORKDAY_WORKER),
            supplier: take(tables::SUPPLIER),
            equipment: take(tables::EQUIPMENT),
        },
        catalogs,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn record(value: Value) -> Record {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn empty_input_yields_every_table() {
        let doc = assemble(PageHeader::default(), &TableSet::new());
        let json = serde_json::to_value(&doc).unwrap();
        for name in tables::TRANSACTION {
            assert_eq!(json["tables"][name], json!([]), "table {name}");
        }
        assert!(doc.catalogs.is_empty());
    }

    #[test]
    fn transaction_tables_are_copied_verbatim() {
        let mut set = TableSet::new();
        set.insert(
            tables::RECEIPT.into(),
            vec![record(json!({"number": "A-1", "total_amount": 99.5}))],
        );
        set.insert(
            tables::WORKDAY_WORKER.into(),
            vec![record(json!({"name": "R. Soto"})), record(json!({"name": "L. Paz"}))],
        );
        let doc = assemble(PageHeader::default(), &set);
        assert_eq!(doc.tables.receipt, set[tables::RECEIPT]);
        assert_eq!(doc.tables.workday_worker.len(), 2);
        assert!(doc.tables.summary.is_empty());
    }

    #[test]
    fn every_receipt_line_gets_an_independent_catalog_copy() {
        let mut set = TableSet::new();
        set.insert(
            tables::RECEIPT_LINE.into(),
            vec![record(json!({"description": "Rebar"})), record(json!({"description": "Sand"}))],
        );
        set.insert(tables::CURRENCY.into(), vec![record(json!({"code": "USD"}))]);
        set.insert(tables::LANGUAGE.into(), vec![record(json!({"code": "en"}))]);

        let mut doc = assemble(PageHeader::default(), &set);
        assert_eq!(doc.tables.receipt_line.len(), 2);
        for line in &doc.tables.receipt_line {
            assert_eq!(line.catalogs.currency[0]["code"], "USD");
            assert_eq!(line.catalogs.language.len(), 1);
        }

        doc.tables.receipt_line[0].catalogs.currency[0].insert("code".into(), "PEN".into());
        doc.tables.receipt_line[0].catalogs.nature.push(Record::new());
        assert_eq!(doc.tables.receipt_line[1].catalogs.currency[0]["code"], "USD");
        assert!(doc.tables.receipt_line[1].catalogs.nature.is_empty());
        assert_eq!(doc.catalogs.currency[0]["code"], "USD");
    }

    #[test]
    fn stale_catalogs_field_on_line_is_replaced() {
        let mut set = TableSet::new();
        set.insert(
            tables::RECEIPT_LINE.into(),
            vec![record(json!({"description": "Pipe", "catalogs": "garbage"}))],
        );
        let doc = assemble(PageHeader::default(), &set);
        let json = serde_json::to_value(&doc.tables.receipt_line[0]).unwrap();
        assert!(json["catalogs"].is_object());
        assert_eq!(json["description"], "Pipe");
    }

    #[test]
    fn unknown_tables_are_dropped() {
        let mut set = TableSet::new();
        set.insert("mystery".into(), vec![record(json!({"x": 1}))]);
        let doc = assemble(PageHeader::default(), &set);
        let json = serde_json::to_value(&doc).unwrap();
        assert!(json["tables"].get("mystery").is_none());
        assert!(doc.tables.is_empty());
    }
}

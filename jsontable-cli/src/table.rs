/// Table formatting for record lists using comfy-table

use comfy_table::{presets::UTF8_FULL, Cell, ContentArrangement, Table};
use jsontable_core::{FieldValue, RecordList, KEY_FIELD};
use std::collections::BTreeSet;

/// Format a record list as a table
///
/// Columns are the union of field names across all records, with the key
/// column first. Fields carrying a display value show it instead of the raw
/// value.
pub fn format_records_table(records: &RecordList) -> String {
    if records.is_empty() {
        return "No records found".to_string();
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);

    let mut names = BTreeSet::new();
    for record in records {
        for (name, _) in record.fields() {
            if name != KEY_FIELD {
                names.insert(name);
            }
        }
    }
    let mut columns = vec![KEY_FIELD];
    columns.extend(names);

    table.set_header(columns.iter().map(Cell::new).collect::<Vec<_>>());

    for record in records {
        let row = columns
            .iter()
            .map(|col| match record.get(col) {
                Some(field) => Cell::new(format_field(field)),
                None => Cell::new("-"),
            })
            .collect::<Vec<_>>();
        table.add_row(row);
    }

    table.to_string()
}

fn format_field(field: &FieldValue) -> &str {
    field.display_or_value()
}

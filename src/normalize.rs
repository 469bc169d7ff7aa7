//! Text normalization applied before grounding and sandboxed execution: text
//! cells are trimmed, lowercased, and have trailing 's' characters removed so
//! user questions match data values regardless of case or simple plurals.

use crate::{data::Value, frame::DataFrame};

/// Canonical string form of one text value. Stripping every trailing 's' is
/// deliberately naive ("gas" becomes "ga", "s" becomes the empty string); the
/// rule is kept simple so the same transform can be described to the model in
/// one sentence. Trailing whitespace exposed by stripping is removed as well,
/// keeping the transform idempotent.
pub fn normalize_text(value: &str) -> String {
    value
        .trim()
        .to_lowercase()
        .trim_end_matches(|c: char| c == 's' || c.is_whitespace())
        .to_string()
}

/// Returns a copy of the frame with every text-column cell normalized.
/// Missing cells stay missing and non-text columns are untouched; row count,
/// column count, and column order are preserved.
pub fn normalize_frame(frame: &DataFrame) -> DataFrame {
    let schema = frame.schema().clone();
    let text_columns: Vec<bool> = schema
        .columns
        .iter()
        .map(|c| c.data_type.is_text())
        .collect();

    let rows = frame
        .rows()
        .iter()
        .map(|row| {
            row.iter()
                .enumerate()
                .map(|(idx, cell)| match cell {
                    Some(value) if text_columns[idx] => {
                        Some(Value::String(normalize_text(&value.as_display())))
                    }
                    other => other.clone(),
                })
                .collect()
        })
        .collect();

    DataFrame::new(schema, rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ColumnMeta, ColumnType, Schema};

    #[test]
    fn normalize_text_trims_lowers_and_singularizes() {
        assert_eq!(normalize_text("  Laptops "), "laptop");
        assert_eq!(normalize_text("NORTH"), "north");
        assert_eq!(normalize_text("glass"), "gla");
        assert_eq!(normalize_text("s"), "");
    }

    #[test]
    fn normalize_text_is_idempotent() {
        for raw in ["  Laptops ", "Boss", "gas", "s", "chairs", "spare parts"] {
            let once = normalize_text(raw);
            assert_eq!(normalize_text(&once), once);
        }
    }

    #[test]
    fn normalize_frame_touches_only_text_columns() {
        let schema = Schema {
            columns: vec![
                ColumnMeta {
                    name: "region".into(),
                    data_type: ColumnType::Text,
                },
                ColumnMeta {
                    name: "units".into(),
                    data_type: ColumnType::Integer,
                },
            ],
        };
        let rows = vec![
            vec![
                Some(Value::String(" North ".into())),
                Some(Value::Integer(5)),
            ],
            vec![None, Some(Value::Integer(3))],
        ];
        let frame = DataFrame::new(schema, rows);
        let normalized = normalize_frame(&frame);

        assert_eq!(normalized.row_count(), frame.row_count());
        assert_eq!(normalized.column_count(), frame.column_count());
        assert_eq!(
            normalized.cell(0, 0),
            Some(&Value::String("north".to_string()))
        );
        assert_eq!(normalized.cell(0, 1), Some(&Value::Integer(5)));
        assert_eq!(normalized.cell(1, 0), None);
    }
}

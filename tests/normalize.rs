use csv_analyst::{
    data::Value,
    frame::DataFrame,
    normalize::{normalize_frame, normalize_text},
    schema::{ColumnMeta, ColumnType, Schema},
};
use proptest::prelude::*;

#[test]
fn normalization_trims_lowercases_and_strips_plural_markers() {
    assert_eq!(normalize_text("  Laptops  "), "laptop");
    assert_eq!(normalize_text("GLASS"), "gla");
    assert_eq!(normalize_text("boss"), "bo");
    assert_eq!(normalize_text("s"), "");
}

#[test]
fn numeric_columns_survive_normalization_untouched() {
    let schema = Schema {
        columns: vec![
            ColumnMeta {
                name: "label".into(),
                data_type: ColumnType::Text,
            },
            ColumnMeta {
                name: "amount".into(),
                data_type: ColumnType::Float,
            },
        ],
    };
    let frame = DataFrame::new(
        schema,
        vec![
            vec![
                Some(Value::String("Sales".into())),
                Some(Value::Float(12.5)),
            ],
            vec![None, None],
        ],
    );
    let normalized = normalize_frame(&frame);
    assert_eq!(normalized.row_count(), 2);
    assert_eq!(
        normalized.cell(0, 0),
        Some(&Value::String("sale".to_string()))
    );
    assert_eq!(normalized.cell(0, 1), Some(&Value::Float(12.5)));
    assert_eq!(normalized.cell(1, 0), None);
}

proptest! {
    #[test]
    fn normalization_is_idempotent(raw in "\\PC{0,40}") {
        let once = normalize_text(&raw);
        let twice = normalize_text(&once);
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn normalized_text_never_ends_with_plural_marker(raw in "\\PC{0,40}") {
        let normalized = normalize_text(&raw);
        prop_assert!(!normalized.ends_with('s'));
        prop_assert_eq!(normalized.clone(), normalized.to_lowercase());
        prop_assert_eq!(normalized.clone(), normalized.trim().to_string());
    }

    #[test]
    fn normalization_preserves_frame_shape(labels in proptest::collection::vec("\\PC{0,20}", 1..20)) {
        let schema = Schema {
            columns: vec![ColumnMeta {
                name: "label".into(),
                data_type: ColumnType::Text,
            }],
        };
        let rows = labels
            .iter()
            .map(|label| vec![Some(Value::String(label.clone()))])
            .collect::<Vec<_>>();
        let frame = DataFrame::new(schema, rows);
        let normalized = normalize_frame(&frame);
        prop_assert_eq!(normalized.row_count(), frame.row_count());
        prop_assert_eq!(normalized.column_count(), frame.column_count());
    }
}

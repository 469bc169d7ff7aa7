//! In-memory typed dataset. The sandbox needs random access to rows and
//! columns, so the whole table is materialized at load time rather than
//! streamed.

use std::path::Path;

use anyhow::{Context, Result, bail};
use encoding_rs::Encoding;
use log::{debug, info};

use crate::{
    data::{Value, normalize_column_name, parse_typed_value},
    io_utils,
    schema::{ColumnType, Schema},
};

#[derive(Debug, Clone)]
pub struct DataFrame {
    schema: Schema,
    rows: Vec<Vec<Option<Value>>>,
}

impl DataFrame {
    pub fn new(schema: Schema, rows: Vec<Vec<Option<Value>>>) -> Self {
        Self { schema, rows }
    }

    /// Loads a CSV file into a typed frame. Cells that fail typed parsing are
    /// treated as missing rather than aborting the load.
    pub fn read(
        path: &Path,
        schema: &Schema,
        delimiter: u8,
        encoding: &'static Encoding,
    ) -> Result<Self> {
        let mut reader = io_utils::open_csv_reader_from_path(path, delimiter, true)?;
        let headers = io_utils::reader_headers(&mut reader, encoding)?;
        if headers.len() != schema.columns.len() {
            bail!(
                "Header count {} does not match schema column count {}",
                headers.len(),
                schema.columns.len()
            );
        }

        let mut rows = Vec::new();
        for (row_idx, record) in reader.byte_records().enumerate() {
            let record = record.with_context(|| format!("Reading row {}", row_idx + 2))?;
            let decoded = io_utils::decode_record(&record, encoding)?;
            let mut typed = Vec::with_capacity(schema.columns.len());
            for (col_idx, column) in schema.columns.iter().enumerate() {
                let raw = decoded.get(col_idx).map(|s| s.as_str()).unwrap_or("");
                match parse_typed_value(raw, &column.data_type) {
                    Ok(value) => typed.push(value),
                    Err(err) => {
                        debug!(
                            "Row {}, column '{}': {err:#}; treating as missing",
                            row_idx + 2,
                            column.name
                        );
                        typed.push(None);
                    }
                }
            }
            rows.push(typed);
        }

        info!(
            "Loaded {} row(s) x {} column(s) from {path:?}",
            rows.len(),
            schema.columns.len()
        );
        Ok(Self {
            schema: schema.clone(),
            rows,
        })
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn headers(&self) -> Vec<String> {
        self.schema.headers()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.schema.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[Vec<Option<Value>>] {
        &self.rows
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<&Value> {
        self.rows.get(row).and_then(|r| r.get(col)).and_then(|v| v.as_ref())
    }

    pub fn column_type(&self, col: usize) -> &ColumnType {
        &self.schema.columns[col].data_type
    }

    /// Resolves a column by exact header match or by canonical identifier
    /// form, which is how generated code references columns.
    pub fn resolve_column(&self, name: &str) -> Option<usize> {
        self.schema.column_index(name).or_else(|| {
            let wanted = normalize_column_name(name);
            self.schema
                .columns
                .iter()
                .position(|c| normalize_column_name(&c.name) == wanted)
        })
    }

    /// Non-missing values of one column, in row order.
    pub fn column_values(&self, col: usize) -> impl Iterator<Item = &Value> {
        self.rows.iter().filter_map(move |row| row.get(col).and_then(|v| v.as_ref()))
    }

    pub fn missing_count(&self, col: usize) -> usize {
        self.rows
            .iter()
            .filter(|row| row.get(col).map(|v| v.is_none()).unwrap_or(true))
            .count()
    }

    /// First `limit` rows rendered as display strings, for previews and
    /// table output. Missing cells render as empty strings.
    pub fn display_rows(&self, limit: usize) -> Vec<Vec<String>> {
        self.rows
            .iter()
            .take(limit)
            .map(|row| {
                row.iter()
                    .map(|cell| cell.as_ref().map(Value::as_display).unwrap_or_default())
                    .collect()
            })
            .collect()
    }
}

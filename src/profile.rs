//! Dataset profiling: per-column grounding summaries for the generation
//! client and a JSON-serializable statistical profile for display and the
//! narrative report.

use itertools::Itertools;
use log::{info, warn};
use serde::Serialize;

use crate::{data::Value, frame::DataFrame};

/// Upper bound on distinct sample values shared with the model per column.
pub const MAX_SAMPLE_VALUES: usize = 20;

/// Per-column grounding summary exposed to the generation client. Sample
/// values are collected for text columns only, distinct, in first-seen order.
#[derive(Debug, Clone, Serialize)]
pub struct ColumnProfile {
    pub name: String,
    pub dtype: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sample_values: Option<Vec<String>>,
}

pub fn build_column_profiles(frame: &DataFrame) -> Vec<ColumnProfile> {
    frame
        .schema()
        .columns
        .iter()
        .enumerate()
        .map(|(idx, column)| {
            let sample_values = column.data_type.is_text().then(|| {
                frame
                    .column_values(idx)
                    .map(Value::as_display)
                    .unique()
                    .take(MAX_SAMPLE_VALUES)
                    .collect::<Vec<_>>()
            });
            ColumnProfile {
                name: column.name.clone(),
                dtype: column.data_type.as_str().to_string(),
                sample_values,
            }
        })
        .collect()
}

#[derive(Debug, Clone, Serialize)]
pub struct ColumnOverview {
    pub name: String,
    pub dtype: String,
    pub missing: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct NumericSummary {
    pub name: String,
    pub count: usize,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub mean: Option<f64>,
    pub median: Option<f64>,
    pub std_dev: Option<f64>,
}

/// Compact dataset summary suitable for table display and for passing to the
/// model as JSON.
#[derive(Debug, Clone, Serialize)]
pub struct DatasetSummary {
    pub rows: usize,
    pub cols: usize,
    pub columns: Vec<ColumnOverview>,
    pub numeric_summary: Vec<NumericSummary>,
}

pub fn build_summary(frame: &DataFrame) -> DatasetSummary {
    if frame.is_empty() {
        warn!("build_summary called with an empty frame");
    }

    let columns = frame
        .schema()
        .columns
        .iter()
        .enumerate()
        .map(|(idx, column)| ColumnOverview {
            name: column.name.clone(),
            dtype: column.data_type.as_str().to_string(),
            missing: frame.missing_count(idx),
        })
        .collect();

    let numeric_summary: Vec<NumericSummary> = frame
        .schema()
        .columns
        .iter()
        .enumerate()
        .filter(|(_, column)| column.data_type.is_numeric())
        .map(|(idx, column)| {
            let mut acc = NumericAccumulator::new();
            for value in frame.column_values(idx) {
                if let Some(metric) = value.as_numeric() {
                    acc.add(metric);
                }
            }
            acc.finish(column.name.clone())
        })
        .collect();

    info!(
        "Built summary: {} rows, {} cols, {} numeric column(s)",
        frame.row_count(),
        frame.column_count(),
        numeric_summary.len()
    );

    DatasetSummary {
        rows: frame.row_count(),
        cols: frame.column_count(),
        columns,
        numeric_summary,
    }
}

struct NumericAccumulator {
    values: Vec<f64>,
    sum: f64,
    sum_squares: f64,
    min: Option<f64>,
    max: Option<f64>,
}

impl NumericAccumulator {
    fn new() -> Self {
        Self {
            values: Vec::new(),
            sum: 0.0,
            sum_squares: 0.0,
            min: None,
            max: None,
        }
    }

    fn add(&mut self, metric: f64) {
        self.sum += metric;
        self.sum_squares += metric * metric;
        self.min = Some(self.min.map_or(metric, |m| m.min(metric)));
        self.max = Some(self.max.map_or(metric, |m| m.max(metric)));
        self.values.push(metric);
    }

    fn mean(&self) -> Option<f64> {
        if self.values.is_empty() {
            None
        } else {
            Some(self.sum / self.values.len() as f64)
        }
    }

    fn median(&self) -> Option<f64> {
        if self.values.is_empty() {
            return None;
        }
        let mut sorted = self.values.clone();
        sorted.sort_by(|a, b| a.total_cmp(b));
        let mid = sorted.len() / 2;
        if sorted.len() % 2 == 0 {
            Some((sorted[mid - 1] + sorted[mid]) / 2.0)
        } else {
            Some(sorted[mid])
        }
    }

    fn std_dev(&self) -> Option<f64> {
        let count = self.values.len();
        if count < 2 {
            return None;
        }
        let mean = self.mean()?;
        let variance =
            (self.sum_squares - count as f64 * mean * mean) / (count as f64 - 1.0);
        Some(variance.max(0.0).sqrt())
    }

    fn finish(self, name: String) -> NumericSummary {
        NumericSummary {
            name,
            count: self.values.len(),
            min: self.min,
            max: self.max,
            mean: self.mean(),
            median: self.median(),
            std_dev: self.std_dev(),
        }
    }
}

pub fn format_metric(metric: Option<f64>) -> String {
    match metric {
        Some(value) if value.fract() == 0.0 => format!("{value:.0}"),
        Some(value) => format!("{value:.4}"),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        frame::DataFrame,
        schema::{ColumnMeta, ColumnType, Schema},
    };

    fn profile_frame() -> DataFrame {
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
        let mut rows = Vec::new();
        for i in 0..30 {
            rows.push(vec![
                Some(Value::String(format!("region_{}", i % 25))),
                Some(Value::Integer(i as i64)),
            ]);
        }
        rows.push(vec![None, None]);
        DataFrame::new(schema, rows)
    }

    #[test]
    fn column_profiles_cap_samples_at_twenty_distinct_values() {
        let profiles = build_column_profiles(&profile_frame());
        let samples = profiles[0].sample_values.as_ref().expect("text samples");
        assert_eq!(samples.len(), MAX_SAMPLE_VALUES);
        // First-seen order, duplicates collapsed.
        assert_eq!(samples[0], "region_0");
        assert_eq!(samples[19], "region_19");
        assert!(profiles[1].sample_values.is_none());
    }

    #[test]
    fn summary_reports_missing_counts_and_numeric_stats() {
        let summary = build_summary(&profile_frame());
        assert_eq!(summary.rows, 31);
        assert_eq!(summary.columns[0].missing, 1);
        let units = &summary.numeric_summary[0];
        assert_eq!(units.count, 30);
        assert_eq!(units.min, Some(0.0));
        assert_eq!(units.max, Some(29.0));
        assert_eq!(units.mean, Some(14.5));
        assert_eq!(units.median, Some(14.5));
        assert!(units.std_dev.unwrap() > 8.0);
    }

    #[test]
    fn format_metric_trims_integral_values() {
        assert_eq!(format_metric(Some(4.0)), "4");
        assert_eq!(format_metric(Some(4.25)), "4.2500");
        assert_eq!(format_metric(None), "");
    }
}

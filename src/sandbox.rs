//! Restricted execution environment for model-generated code.
//!
//! Generated code is evalexpr source evaluated against a context that holds
//! nothing but the registered dataset functions: builtin functions are
//! disabled, and there is no notion of imports, file handles, or process
//! control in the bound surface. Row predicates are themselves evalexpr
//! source, evaluated per row with the dataset's canonical column names bound
//! to that row's values.
//!
//! Question mode mirrors the classic eval-then-exec strategy: the code is
//! first evaluated as a single expression against an immutable context, and
//! on failure re-executed as a statement sequence against a mutable context
//! with the answer read from the conventional `result` variable. Chart mode
//! always executes as a statement sequence and reads `fig`, then `figs`.
//!
//! Tables and figures cannot live inside evaluator values, so the functions
//! that produce them deposit the product in a per-execution artifact store
//! and return an opaque reference token which the executor resolves when
//! classifying the outcome.
//!
//! This is an accident-prevention guard for semi-trusted model output, not a
//! hardened boundary against adversarial code.

use std::sync::{Arc, Mutex, MutexGuard};

use evalexpr::{
    Context, ContextWithMutableFunctions, ContextWithMutableVariables, EvalexprError, Function,
    HashMapContext, Value as EvalValue, eval_with_context, eval_with_context_mut,
};
use log::debug;

use crate::{
    data::{Value, normalize_column_name, value_to_evalexpr},
    figure::{FigureKind, FigureSpec, SeriesPoint},
    frame::DataFrame,
    schema::ColumnType,
};

pub const RESULT_VARIABLE: &str = "result";
pub const FIGURE_VARIABLE: &str = "fig";
pub const FIGURES_VARIABLE: &str = "figs";

const TABLE_TOKEN: &str = "#table:";
const FIGURE_TOKEN: &str = "#figure:";

const MAX_HISTOGRAM_BINS: i64 = 10_000;

/// A materialized tabular result, stringified for display.
#[derive(Debug, Clone, PartialEq)]
pub struct TableSlice {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl TableSlice {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionFailure {
    pub kind: String,
    pub message: String,
}

/// Tagged raw outcome of executing generated code.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionOutcome {
    Scalar(EvalValue),
    Table(TableSlice),
    Figure(FigureSpec),
    Figures(Vec<FigureSpec>),
    Null,
    Failed(ExecutionFailure),
}

#[derive(Debug, Default)]
struct Artifacts {
    tables: Vec<TableSlice>,
    figures: Vec<FigureSpec>,
}

/// Sandbox bound to one normalized frame. Each execution is self-contained;
/// construct a fresh sandbox per request.
pub struct Sandbox {
    frame: Arc<DataFrame>,
    artifacts: Arc<Mutex<Artifacts>>,
}

impl Sandbox {
    pub fn new(frame: DataFrame) -> Self {
        Self {
            frame: Arc::new(frame),
            artifacts: Arc::new(Mutex::new(Artifacts::default())),
        }
    }

    /// Question mode: expression strategy first, then statement strategy with
    /// the `result` variable. Evaluator errors never propagate.
    pub fn execute_query(&self, code: &str) -> ExecutionOutcome {
        let context = match self.query_context() {
            Ok(context) => context,
            Err(err) => return ExecutionOutcome::Failed(failure_from(err)),
        };
        match eval_with_context(code, &context) {
            Ok(value) => self.resolve_value(value),
            Err(expression_err) => {
                debug!("Expression strategy failed ({expression_err}); retrying as statements");
                let mut context = match self.query_context() {
                    Ok(context) => context,
                    Err(err) => return ExecutionOutcome::Failed(failure_from(err)),
                };
                match eval_with_context_mut(code, &mut context) {
                    Ok(_) => match context.get_value(RESULT_VARIABLE) {
                        Some(value) => self.resolve_value(value.clone()),
                        None => ExecutionOutcome::Null,
                    },
                    Err(err) => ExecutionOutcome::Failed(failure_from(err)),
                }
            }
        }
    }

    /// Chart mode: statement strategy only; reads `fig`, then `figs`.
    pub fn execute_chart(&self, code: &str) -> ExecutionOutcome {
        let mut context = match self.chart_context() {
            Ok(context) => context,
            Err(err) => return ExecutionOutcome::Failed(failure_from(err)),
        };
        if let Err(err) = eval_with_context_mut(code, &mut context) {
            return ExecutionOutcome::Failed(failure_from(err));
        }

        if let Some(value) = context.get_value(FIGURE_VARIABLE)
            && let Some(figure) = self.resolve_figure(value)
        {
            return ExecutionOutcome::Figure(figure);
        }
        if let Some(EvalValue::Tuple(values)) = context.get_value(FIGURES_VARIABLE) {
            let figures: Vec<FigureSpec> = values
                .iter()
                .filter_map(|value| self.resolve_figure(value))
                .collect();
            if !figures.is_empty() && figures.len() == values.len() {
                return ExecutionOutcome::Figures(figures);
            }
        }
        ExecutionOutcome::Null
    }

    fn resolve_value(&self, value: EvalValue) -> ExecutionOutcome {
        match &value {
            EvalValue::String(s) => {
                if let Some(table) = self.resolve_token(s, TABLE_TOKEN).and_then(|idx| {
                    self.lock_artifacts().ok().and_then(|a| a.tables.get(idx).cloned())
                }) {
                    return ExecutionOutcome::Table(table);
                }
                if let Some(figure) = self.resolve_figure(&value) {
                    return ExecutionOutcome::Figure(figure);
                }
                ExecutionOutcome::Scalar(value)
            }
            EvalValue::Tuple(values) => {
                let figures: Vec<FigureSpec> = values
                    .iter()
                    .filter_map(|v| self.resolve_figure(v))
                    .collect();
                if !figures.is_empty() && figures.len() == values.len() {
                    ExecutionOutcome::Figures(figures)
                } else {
                    ExecutionOutcome::Scalar(value)
                }
            }
            EvalValue::Empty => ExecutionOutcome::Null,
            _ => ExecutionOutcome::Scalar(value),
        }
    }

    fn resolve_figure(&self, value: &EvalValue) -> Option<FigureSpec> {
        let EvalValue::String(s) = value else {
            return None;
        };
        let idx = self.resolve_token(s, FIGURE_TOKEN)?;
        self.lock_artifacts().ok().and_then(|a| a.figures.get(idx).cloned())
    }

    fn resolve_token(&self, value: &str, prefix: &str) -> Option<usize> {
        value.strip_prefix(prefix)?.parse().ok()
    }

    fn lock_artifacts(&self) -> Result<MutexGuard<'_, Artifacts>, EvalexprError> {
        self.artifacts
            .lock()
            .map_err(|_| eval_error("sandbox artifact store poisoned"))
    }

    fn query_context(&self) -> Result<HashMapContext, EvalexprError> {
        let mut context = HashMapContext::new();
        context.set_builtin_functions_disabled(true)?;
        register_query_functions(&mut context, &self.frame, &self.artifacts)?;
        Ok(context)
    }

    fn chart_context(&self) -> Result<HashMapContext, EvalexprError> {
        let mut context = self.query_context()?;
        register_chart_functions(&mut context, &self.frame, &self.artifacts)?;
        Ok(context)
    }
}

fn eval_error(message: &str) -> EvalexprError {
    EvalexprError::CustomMessage(message.to_string())
}

/// Maps an evaluator error to a classification-ready failure. The kind is the
/// error variant name; the message is the evaluator's own rendering.
fn failure_from(err: EvalexprError) -> ExecutionFailure {
    let debug = format!("{err:?}");
    let kind: String = debug
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric())
        .collect();
    ExecutionFailure {
        kind,
        message: err.to_string(),
    }
}

fn expect_args(
    arguments: &EvalValue,
    expected: usize,
    name: &str,
) -> Result<Vec<EvalValue>, EvalexprError> {
    match arguments {
        EvalValue::Empty if expected == 0 => Ok(Vec::new()),
        value if expected == 1 && !matches!(value, EvalValue::Tuple(_)) => Ok(vec![value.clone()]),
        EvalValue::Tuple(values) => {
            if values.len() != expected {
                return Err(EvalexprError::wrong_function_argument_amount(
                    values.len(),
                    expected,
                ));
            }
            Ok(values.clone())
        }
        _ => Err(eval_error(&format!(
            "{name} expects {expected} arguments provided as a tuple"
        ))),
    }
}

fn expect_string<'a>(value: &'a EvalValue, name: &str) -> Result<&'a str, EvalexprError> {
    if let EvalValue::String(s) = value {
        Ok(s)
    } else {
        Err(eval_error(&format!("Expected string for {name}")))
    }
}

fn parse_i64_arg(value: &EvalValue, name: &str) -> Result<i64, EvalexprError> {
    match value {
        EvalValue::Int(i) => Ok(*i),
        EvalValue::Float(f) => Ok(*f as i64),
        other => Err(eval_error(&format!(
            "Expected integer for {name}, got {other:?}",
        ))),
    }
}

fn value_truthy(value: EvalValue) -> bool {
    match value {
        EvalValue::Boolean(b) => b,
        EvalValue::Int(i) => i != 0,
        EvalValue::Float(f) => f != 0.0,
        EvalValue::String(s) => !s.is_empty(),
        EvalValue::Tuple(values) => values.into_iter().any(value_truthy),
        EvalValue::Empty => false,
    }
}

fn column_index(frame: &DataFrame, name: &str) -> Result<usize, EvalexprError> {
    frame
        .resolve_column(name)
        .ok_or_else(|| eval_error(&format!("unknown column '{name}'")))
}

/// Binds each column's canonical name to this row's value; missing cells bind
/// to the empty value so equality comparisons stay total.
fn row_context(frame: &DataFrame, row: usize) -> Result<HashMapContext, EvalexprError> {
    let mut context = HashMapContext::new();
    context.set_builtin_functions_disabled(true)?;
    for (idx, column) in frame.schema().columns.iter().enumerate() {
        let value = frame
            .cell(row, idx)
            .map(value_to_evalexpr)
            .unwrap_or(EvalValue::Empty);
        context.set_value(normalize_column_name(&column.name), value)?;
    }
    Ok(context)
}

fn matching_rows(frame: &DataFrame, predicate: &str) -> Result<Vec<usize>, EvalexprError> {
    let mut matches = Vec::new();
    for row in 0..frame.row_count() {
        let context = row_context(frame, row)?;
        let value = eval_with_context(predicate, &context)?;
        if value_truthy(value) {
            matches.push(row);
        }
    }
    Ok(matches)
}

fn all_rows(frame: &DataFrame) -> Vec<usize> {
    (0..frame.row_count()).collect()
}

enum NumericSeries {
    Ints(Vec<i64>),
    Floats(Vec<f64>),
}

fn numeric_series(
    frame: &DataFrame,
    col: usize,
    rows: &[usize],
) -> Result<NumericSeries, EvalexprError> {
    match frame.column_type(col) {
        ColumnType::Integer => {
            let mut values = Vec::new();
            for &row in rows {
                if let Some(Value::Integer(i)) = frame.cell(row, col) {
                    values.push(*i);
                }
            }
            Ok(NumericSeries::Ints(values))
        }
        ColumnType::Float => {
            let mut values = Vec::new();
            for &row in rows {
                if let Some(Value::Float(f)) = frame.cell(row, col) {
                    values.push(*f);
                }
            }
            Ok(NumericSeries::Floats(values))
        }
        other => Err(eval_error(&format!(
            "column is not numeric (declared type {})",
            other.as_str()
        ))),
    }
}

fn sum_series(series: &NumericSeries) -> Result<EvalValue, EvalexprError> {
    match series {
        NumericSeries::Ints(values) => values
            .iter()
            .try_fold(0i64, |acc, v| acc.checked_add(*v))
            .map(EvalValue::Int)
            .ok_or_else(|| eval_error("integer overflow while summing column")),
        NumericSeries::Floats(values) => Ok(EvalValue::Float(values.iter().sum())),
    }
}

fn mean_series(series: &NumericSeries) -> Result<EvalValue, EvalexprError> {
    let (sum, count) = match series {
        NumericSeries::Ints(values) => (values.iter().map(|v| *v as f64).sum::<f64>(), values.len()),
        NumericSeries::Floats(values) => (values.iter().sum(), values.len()),
    };
    if count == 0 {
        return Err(eval_error("cannot compute the mean of an empty sequence"));
    }
    Ok(EvalValue::Float(sum / count as f64))
}

fn extreme_series(series: &NumericSeries, want_max: bool) -> Result<EvalValue, EvalexprError> {
    let empty_err = || {
        if want_max {
            eval_error("attempt to get argmax of an empty sequence")
        } else {
            eval_error("attempt to get argmin of an empty sequence")
        }
    };
    match series {
        NumericSeries::Ints(values) => {
            let found = if want_max {
                values.iter().max()
            } else {
                values.iter().min()
            };
            found.map(|v| EvalValue::Int(*v)).ok_or_else(empty_err)
        }
        NumericSeries::Floats(values) => {
            let mut iter = values.iter().copied();
            let first = iter.next().ok_or_else(empty_err)?;
            let folded = iter.fold(first, |acc, v| if want_max { acc.max(v) } else { acc.min(v) });
            Ok(EvalValue::Float(folded))
        }
    }
}

/// Row index of the extreme value of a numeric column; ties keep the first.
fn extreme_row(
    frame: &DataFrame,
    col: usize,
    rows: &[usize],
    want_max: bool,
) -> Result<usize, EvalexprError> {
    let mut best: Option<(usize, f64)> = None;
    for &row in rows {
        let Some(metric) = frame.cell(row, col).and_then(Value::as_numeric) else {
            continue;
        };
        best = match best {
            Some((_, current)) if want_max && metric > current => Some((row, metric)),
            Some((_, current)) if !want_max && metric < current => Some((row, metric)),
            Some(kept) => Some(kept),
            None => Some((row, metric)),
        };
    }
    best.map(|(row, _)| row).ok_or_else(|| {
        if want_max {
            eval_error("attempt to get argmax of an empty sequence")
        } else {
            eval_error("attempt to get argmin of an empty sequence")
        }
    })
}

fn table_slice(frame: &DataFrame, rows: &[usize]) -> TableSlice {
    let headers = frame.headers();
    let rendered = rows
        .iter()
        .filter_map(|&row| frame.rows().get(row))
        .map(|row| {
            row.iter()
                .map(|cell| cell.as_ref().map(Value::as_display).unwrap_or_default())
                .collect()
        })
        .collect();
    TableSlice {
        headers,
        rows: rendered,
    }
}

/// Grouped sum of `val_col` by the display form of `key_col`, first-seen key
/// order. Rows with a missing key or value are skipped.
fn grouped_sum(
    frame: &DataFrame,
    key_col: usize,
    val_col: usize,
) -> Result<Vec<(String, f64)>, EvalexprError> {
    if !frame.column_type(val_col).is_numeric() {
        return Err(eval_error(&format!(
            "column is not numeric (declared type {})",
            frame.column_type(val_col).as_str()
        )));
    }
    let mut groups: Vec<(String, f64)> = Vec::new();
    for row in 0..frame.row_count() {
        let Some(key) = frame.cell(row, key_col).map(Value::as_display) else {
            continue;
        };
        let Some(metric) = frame.cell(row, val_col).and_then(Value::as_numeric) else {
            continue;
        };
        match groups.iter_mut().find(|(k, _)| *k == key) {
            Some((_, total)) => *total += metric,
            None => groups.push((key, metric)),
        }
    }
    Ok(groups)
}

fn grouped_count(frame: &DataFrame, key_col: usize) -> Vec<(String, f64)> {
    let mut groups: Vec<(String, f64)> = Vec::new();
    for row in 0..frame.row_count() {
        let Some(key) = frame.cell(row, key_col).map(Value::as_display) else {
            continue;
        };
        match groups.iter_mut().find(|(k, _)| *k == key) {
            Some((_, count)) => *count += 1.0,
            None => groups.push((key, 1.0)),
        }
    }
    groups
}

fn store_table(
    artifacts: &Arc<Mutex<Artifacts>>,
    table: TableSlice,
) -> Result<EvalValue, EvalexprError> {
    let mut guard = artifacts
        .lock()
        .map_err(|_| eval_error("sandbox artifact store poisoned"))?;
    guard.tables.push(table);
    Ok(EvalValue::String(format!(
        "{TABLE_TOKEN}{}",
        guard.tables.len() - 1
    )))
}

fn store_figure(
    artifacts: &Arc<Mutex<Artifacts>>,
    figure: FigureSpec,
) -> Result<EvalValue, EvalexprError> {
    let mut guard = artifacts
        .lock()
        .map_err(|_| eval_error("sandbox artifact store poisoned"))?;
    guard.figures.push(figure);
    Ok(EvalValue::String(format!(
        "{FIGURE_TOKEN}{}",
        guard.figures.len() - 1
    )))
}

fn register_query_functions(
    context: &mut HashMapContext,
    frame: &Arc<DataFrame>,
    artifacts: &Arc<Mutex<Artifacts>>,
) -> Result<(), EvalexprError> {
    let f = Arc::clone(frame);
    context.set_function(
        "count".into(),
        Function::new(move |arguments| {
            expect_args(arguments, 0, "count")?;
            Ok(EvalValue::Int(f.row_count() as i64))
        }),
    )?;

    let f = Arc::clone(frame);
    context.set_function(
        "count_where".into(),
        Function::new(move |arguments| {
            let args = expect_args(arguments, 1, "count_where")?;
            let predicate = expect_string(&args[0], "predicate")?;
            let rows = matching_rows(&f, predicate)?;
            Ok(EvalValue::Int(rows.len() as i64))
        }),
    )?;

    for (name, aggregate) in [
        ("sum", AggregateKind::Sum),
        ("mean", AggregateKind::Mean),
        ("min", AggregateKind::Min),
        ("max", AggregateKind::Max),
    ] {
        let f = Arc::clone(frame);
        context.set_function(
            name.into(),
            Function::new(move |arguments| {
                let args = expect_args(arguments, 1, name)?;
                let column = expect_string(&args[0], "column")?;
                let col = column_index(&f, column)?;
                let series = numeric_series(&f, col, &all_rows(&f))?;
                aggregate.apply(&series)
            }),
        )?;

        let f = Arc::clone(frame);
        let where_name = format!("{name}_where");
        context.set_function(
            where_name.clone(),
            Function::new(move |arguments| {
                let args = expect_args(arguments, 2, &where_name)?;
                let column = expect_string(&args[0], "column")?;
                let predicate = expect_string(&args[1], "predicate")?;
                let col = column_index(&f, column)?;
                let rows = matching_rows(&f, predicate)?;
                let series = numeric_series(&f, col, &rows)?;
                aggregate.apply(&series)
            }),
        )?;
    }

    let f = Arc::clone(frame);
    context.set_function(
        "distinct".into(),
        Function::new(move |arguments| {
            let args = expect_args(arguments, 1, "distinct")?;
            let column = expect_string(&args[0], "column")?;
            let col = column_index(&f, column)?;
            let mut seen: Vec<EvalValue> = Vec::new();
            for value in f.column_values(col) {
                let display = value.as_display();
                if !seen.iter().any(|v| matches!(v, EvalValue::String(s) if *s == display)) {
                    seen.push(EvalValue::String(display));
                }
            }
            Ok(EvalValue::Tuple(seen))
        }),
    )?;

    let f = Arc::clone(frame);
    context.set_function(
        "distinct_count".into(),
        Function::new(move |arguments| {
            let args = expect_args(arguments, 1, "distinct_count")?;
            let column = expect_string(&args[0], "column")?;
            let col = column_index(&f, column)?;
            let mut seen: Vec<String> = Vec::new();
            for value in f.column_values(col) {
                let display = value.as_display();
                if !seen.contains(&display) {
                    seen.push(display);
                }
            }
            Ok(EvalValue::Int(seen.len() as i64))
        }),
    )?;

    for (name, want_max) in [("label_of_max", true), ("label_of_min", false)] {
        let f = Arc::clone(frame);
        context.set_function(
            name.into(),
            Function::new(move |arguments| {
                let args = expect_args(arguments, 2, name)?;
                let label_column = expect_string(&args[0], "label_column")?;
                let value_column = expect_string(&args[1], "value_column")?;
                let label_col = column_index(&f, label_column)?;
                let value_col = column_index(&f, value_column)?;
                if !f.column_type(value_col).is_numeric() {
                    return Err(eval_error(&format!(
                        "column is not numeric (declared type {})",
                        f.column_type(value_col).as_str()
                    )));
                }
                let row = extreme_row(&f, value_col, &all_rows(&f), want_max)?;
                Ok(f.cell(row, label_col)
                    .map(value_to_evalexpr)
                    .unwrap_or(EvalValue::Empty))
            }),
        )?;
    }

    let f = Arc::clone(frame);
    let store = Arc::clone(artifacts);
    context.set_function(
        "rows_where".into(),
        Function::new(move |arguments| {
            let args = expect_args(arguments, 1, "rows_where")?;
            let predicate = expect_string(&args[0], "predicate")?;
            let rows = matching_rows(&f, predicate)?;
            store_table(&store, table_slice(&f, &rows))
        }),
    )?;

    let f = Arc::clone(frame);
    let store = Arc::clone(artifacts);
    context.set_function(
        "group_sum".into(),
        Function::new(move |arguments| {
            let args = expect_args(arguments, 2, "group_sum")?;
            let key = expect_string(&args[0], "key_column")?;
            let val = expect_string(&args[1], "value_column")?;
            let key_col = column_index(&f, key)?;
            let val_col = column_index(&f, val)?;
            let groups = grouped_sum(&f, key_col, val_col)?;
            let table = TableSlice {
                headers: vec![key.to_string(), format!("sum_{val}")],
                rows: groups
                    .into_iter()
                    .map(|(k, total)| vec![k, format_group_metric(total)])
                    .collect(),
            };
            store_table(&store, table)
        }),
    )?;

    let f = Arc::clone(frame);
    let store = Arc::clone(artifacts);
    context.set_function(
        "group_mean".into(),
        Function::new(move |arguments| {
            let args = expect_args(arguments, 2, "group_mean")?;
            let key = expect_string(&args[0], "key_column")?;
            let val = expect_string(&args[1], "value_column")?;
            let key_col = column_index(&f, key)?;
            let val_col = column_index(&f, val)?;
            let sums = grouped_sum(&f, key_col, val_col)?;
            let counts = grouped_count(&f, key_col);
            let table = TableSlice {
                headers: vec![key.to_string(), format!("mean_{val}")],
                rows: sums
                    .into_iter()
                    .map(|(k, total)| {
                        let count = counts
                            .iter()
                            .find(|(key, _)| *key == k)
                            .map(|(_, c)| *c)
                            .unwrap_or(1.0);
                        vec![k, format_group_metric(total / count)]
                    })
                    .collect(),
            };
            store_table(&store, table)
        }),
    )?;

    let f = Arc::clone(frame);
    let store = Arc::clone(artifacts);
    context.set_function(
        "group_count".into(),
        Function::new(move |arguments| {
            let args = expect_args(arguments, 1, "group_count")?;
            let key = expect_string(&args[0], "key_column")?;
            let key_col = column_index(&f, key)?;
            let groups = grouped_count(&f, key_col);
            let table = TableSlice {
                headers: vec![key.to_string(), "count".to_string()],
                rows: groups
                    .into_iter()
                    .map(|(k, count)| vec![k, format!("{count:.0}")])
                    .collect(),
            };
            store_table(&store, table)
        }),
    )?;

    Ok(())
}

#[derive(Clone, Copy)]
enum AggregateKind {
    Sum,
    Mean,
    Min,
    Max,
}

impl AggregateKind {
    fn apply(self, series: &NumericSeries) -> Result<EvalValue, EvalexprError> {
        match self {
            AggregateKind::Sum => sum_series(series),
            AggregateKind::Mean => mean_series(series),
            AggregateKind::Min => extreme_series(series, false),
            AggregateKind::Max => extreme_series(series, true),
        }
    }
}

fn format_group_metric(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        format!("{value:.4}")
    }
}

fn register_chart_functions(
    context: &mut HashMapContext,
    frame: &Arc<DataFrame>,
    artifacts: &Arc<Mutex<Artifacts>>,
) -> Result<(), EvalexprError> {
    for (name, kind) in [("bar_chart", FigureKind::Bar), ("pie_chart", FigureKind::Pie)] {
        let f = Arc::clone(frame);
        let store = Arc::clone(artifacts);
        context.set_function(
            name.into(),
            Function::new(move |arguments| {
                let args = expect_args(arguments, 3, name)?;
                let x = expect_string(&args[0], "x_column")?;
                let y = expect_string(&args[1], "y_column")?;
                let title = expect_string(&args[2], "title")?;
                let x_col = column_index(&f, x)?;
                let y_col = column_index(&f, y)?;
                let mut figure = FigureSpec::new(kind, title, x, y);
                figure.points = grouped_sum(&f, x_col, y_col)?
                    .into_iter()
                    .map(|(label, total)| SeriesPoint { x: label, y: total })
                    .collect();
                store_figure(&store, figure)
            }),
        )?;
    }

    for (name, kind) in [
        ("line_chart", FigureKind::Line),
        ("scatter_chart", FigureKind::Scatter),
    ] {
        let f = Arc::clone(frame);
        let store = Arc::clone(artifacts);
        context.set_function(
            name.into(),
            Function::new(move |arguments| {
                let args = expect_args(arguments, 3, name)?;
                let x = expect_string(&args[0], "x_column")?;
                let y = expect_string(&args[1], "y_column")?;
                let title = expect_string(&args[2], "title")?;
                let x_col = column_index(&f, x)?;
                let y_col = column_index(&f, y)?;
                if !f.column_type(y_col).is_numeric() {
                    return Err(eval_error(&format!(
                        "column is not numeric (declared type {})",
                        f.column_type(y_col).as_str()
                    )));
                }
                let mut figure = FigureSpec::new(kind, title, x, y);
                for row in 0..f.row_count() {
                    let Some(label) = f.cell(row, x_col).map(Value::as_display) else {
                        continue;
                    };
                    let Some(metric) = f.cell(row, y_col).and_then(Value::as_numeric) else {
                        continue;
                    };
                    figure.points.push(SeriesPoint {
                        x: label,
                        y: metric,
                    });
                }
                store_figure(&store, figure)
            }),
        )?;
    }

    let f = Arc::clone(frame);
    let store = Arc::clone(artifacts);
    context.set_function(
        "histogram".into(),
        Function::new(move |arguments| {
            let args = expect_args(arguments, 3, "histogram")?;
            let column = expect_string(&args[0], "column")?;
            let bins = parse_i64_arg(&args[1], "bins")?;
            let title = expect_string(&args[2], "title")?;
            if bins <= 0 {
                return Err(eval_error("histogram bin count must be positive"));
            }
            if bins > MAX_HISTOGRAM_BINS {
                return Err(eval_error(&format!(
                    "histogram bin count must be at most {MAX_HISTOGRAM_BINS}"
                )));
            }
            let col = column_index(&f, column)?;
            let values: Vec<f64> = match numeric_series(&f, col, &all_rows(&f))? {
                NumericSeries::Ints(ints) => ints.into_iter().map(|v| v as f64).collect(),
                NumericSeries::Floats(floats) => floats,
            };
            let mut figure = FigureSpec::new(FigureKind::Histogram, title, column, "count");
            if !values.is_empty() {
                let min = values.iter().copied().fold(f64::INFINITY, f64::min);
                let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                let width = ((max - min) / bins as f64).max(f64::EPSILON);
                let mut counts = vec![0usize; bins as usize];
                for value in &values {
                    let idx = (((value - min) / width) as usize).min(bins as usize - 1);
                    counts[idx] += 1;
                }
                figure.points = counts
                    .into_iter()
                    .enumerate()
                    .map(|(idx, count)| {
                        let lo = min + width * idx as f64;
                        let hi = lo + width;
                        SeriesPoint {
                            x: format!("{lo:.2}..{hi:.2}"),
                            y: count as f64,
                        }
                    })
                    .collect();
            }
            store_figure(&store, figure)
        }),
    )?;

    Ok(())
}

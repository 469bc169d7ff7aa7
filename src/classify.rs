//! Turns raw execution outcomes into user-facing results. Failures are
//! translated here, never propagated; the only hard error in the pipeline is
//! the generation call itself.

use evalexpr::Value as EvalValue;
use log::{debug, warn};

use crate::{
    figure::FigureSpec,
    sandbox::{ExecutionFailure, ExecutionOutcome, TableSlice},
};

pub const EMPTY_RESULT_HINT: &str =
    "The result is empty. The filter conditions may not match any rows in the dataset.";
pub const NO_RESULT_HINT: &str =
    "The generated code ran but did not produce a result value.";
pub const NO_FIGURE_HINT: &str =
    "The generated code ran but did not produce a figure.";
pub const EMPTY_REDUCTION_HINT: &str =
    "The query matched no rows, so there was nothing to aggregate. Try relaxing the filter conditions.";

/// Final user-facing shape of an answered request.
#[derive(Debug, Clone, PartialEq)]
pub enum DisplayResult {
    Scalar(String),
    Table(TableSlice),
    Figure(FigureSpec),
    Figures(Vec<FigureSpec>),
    Message(String),
}

pub fn classify_query(outcome: ExecutionOutcome) -> DisplayResult {
    match outcome {
        ExecutionOutcome::Scalar(value) => DisplayResult::Scalar(render_scalar(&value)),
        ExecutionOutcome::Table(table) if table.is_empty() => {
            debug!("Query produced an empty table");
            DisplayResult::Message(EMPTY_RESULT_HINT.to_string())
        }
        ExecutionOutcome::Table(table) => DisplayResult::Table(table),
        ExecutionOutcome::Figure(figure) => DisplayResult::Figure(figure),
        ExecutionOutcome::Figures(figures) => DisplayResult::Figures(figures),
        ExecutionOutcome::Null => DisplayResult::Message(NO_RESULT_HINT.to_string()),
        ExecutionOutcome::Failed(failure) => DisplayResult::Message(translate_failure(&failure)),
    }
}

pub fn classify_chart(outcome: ExecutionOutcome) -> DisplayResult {
    match outcome {
        ExecutionOutcome::Figure(figure) => DisplayResult::Figure(figure),
        ExecutionOutcome::Figures(figures) if !figures.is_empty() => {
            DisplayResult::Figures(figures)
        }
        ExecutionOutcome::Failed(failure) => DisplayResult::Message(translate_failure(&failure)),
        _ => DisplayResult::Message(NO_FIGURE_HINT.to_string()),
    }
}

/// Empty-reduction failures (argmax, argmin, and the empty mean) get a
/// friendly explanation; everything else is surfaced verbatim with its kind
/// so the diagnostic stays actionable.
pub fn translate_failure(failure: &ExecutionFailure) -> String {
    let lowered = failure.message.to_lowercase();
    if (lowered.contains("argmax") || lowered.contains("argmin") || lowered.contains("mean"))
        && lowered.contains("empty")
    {
        return EMPTY_REDUCTION_HINT.to_string();
    }
    warn!(
        "Generated code failed: {}: {}",
        failure.kind, failure.message
    );
    format!(
        "Error executing generated code: {}: {}",
        failure.kind, failure.message
    )
}

fn render_scalar(value: &EvalValue) -> String {
    match value {
        EvalValue::String(s) => s.clone(),
        EvalValue::Int(i) => i.to_string(),
        EvalValue::Float(f) => {
            if f.fract() == 0.0 {
                format!("{f:.0}")
            } else {
                format!("{f:.4}")
            }
        }
        EvalValue::Boolean(b) => b.to_string(),
        EvalValue::Tuple(values) => values
            .iter()
            .map(render_scalar)
            .collect::<Vec<_>>()
            .join(", "),
        EvalValue::Empty => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_outcomes_pass_through() {
        let result = classify_query(ExecutionOutcome::Scalar(EvalValue::Int(5)));
        assert_eq!(result, DisplayResult::Scalar("5".to_string()));
    }

    #[test]
    fn float_scalars_render_compactly() {
        let result = classify_query(ExecutionOutcome::Scalar(EvalValue::Float(3.0)));
        assert_eq!(result, DisplayResult::Scalar("3".to_string()));
        let result = classify_query(ExecutionOutcome::Scalar(EvalValue::Float(2.5)));
        assert_eq!(result, DisplayResult::Scalar("2.5000".to_string()));
    }

    #[test]
    fn empty_tables_become_a_friendly_message() {
        let table = TableSlice {
            headers: vec!["region".to_string()],
            rows: Vec::new(),
        };
        let result = classify_query(ExecutionOutcome::Table(table));
        assert_eq!(result, DisplayResult::Message(EMPTY_RESULT_HINT.to_string()));
    }

    #[test]
    fn empty_reductions_get_a_friendly_explanation() {
        let failure = ExecutionFailure {
            kind: "CustomMessage".to_string(),
            message: "attempt to get argmax of an empty sequence".to_string(),
        };
        assert_eq!(translate_failure(&failure), EMPTY_REDUCTION_HINT);
    }

    #[test]
    fn empty_mean_gets_the_same_friendly_explanation() {
        let failure = ExecutionFailure {
            kind: "CustomMessage".to_string(),
            message: "cannot compute the mean of an empty sequence".to_string(),
        };
        assert_eq!(translate_failure(&failure), EMPTY_REDUCTION_HINT);
    }

    #[test]
    fn other_failures_keep_kind_and_message() {
        let failure = ExecutionFailure {
            kind: "VariableIdentifierNotFound".to_string(),
            message: "Variable identifier is not bound to anything by context: \"os\"."
                .to_string(),
        };
        let text = translate_failure(&failure);
        assert!(text.starts_with("Error executing generated code: VariableIdentifierNotFound:"));
        assert!(text.contains("os"));
    }

    #[test]
    fn chart_without_figure_is_a_fixed_message() {
        let result = classify_chart(ExecutionOutcome::Null);
        assert_eq!(result, DisplayResult::Message(NO_FIGURE_HINT.to_string()));
    }
}

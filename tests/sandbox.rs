mod common;

use csv_analyst::{
    classify::{
        DisplayResult, EMPTY_REDUCTION_HINT, EMPTY_RESULT_HINT, NO_FIGURE_HINT, classify_chart,
        classify_query,
    },
    figure::FigureKind,
    frame::DataFrame,
    io_utils,
    normalize::normalize_frame,
    sandbox::{ExecutionOutcome, Sandbox},
    sanitize::strip_code_fences,
    schema,
};

use common::TestWorkspace;

fn sales_sandbox() -> Sandbox {
    let workspace = TestWorkspace::new();
    let csv_path = workspace.write_sales_csv();
    let encoding = io_utils::resolve_encoding(None).expect("utf-8");
    let schema = schema::infer_schema(&csv_path, 0, b',', encoding).expect("infer schema");
    let frame = DataFrame::read(&csv_path, &schema, b',', encoding).expect("read frame");
    Sandbox::new(normalize_frame(&frame))
}

#[test]
fn filtered_sum_answers_with_a_scalar() {
    let sandbox = sales_sandbox();
    let code = r#"sum_where("units_sold", "region == \"north\"")"#;
    let display = classify_query(sandbox.execute_query(code));
    assert_eq!(display, DisplayResult::Scalar("7".to_string()));
}

#[test]
fn statement_form_with_result_variable_matches_expression_form() {
    let sandbox = sales_sandbox();
    let code = r#"result = sum_where("units_sold", "region == \"north\"");"#;
    let display = classify_query(sandbox.execute_query(code));
    assert_eq!(display, DisplayResult::Scalar("7".to_string()));
}

#[test]
fn predicates_compare_against_normalized_text() {
    let sandbox = sales_sandbox();
    // Source data says "Laptops"; normalization lowercases and strips the
    // trailing plural marker.
    let display = classify_query(sandbox.execute_query(r#"count_where("product == \"laptop\"")"#));
    assert_eq!(display, DisplayResult::Scalar("2".to_string()));
    let display = classify_query(sandbox.execute_query(r#"count_where("product == \"Laptops\"")"#));
    assert_eq!(display, DisplayResult::Scalar("0".to_string()));
}

#[test]
fn unmatched_filter_yields_friendly_empty_message() {
    let sandbox = sales_sandbox();
    let code = r#"rows_where("region == \"arctic\"")"#;
    let display = classify_query(sandbox.execute_query(code));
    assert_eq!(display, DisplayResult::Message(EMPTY_RESULT_HINT.to_string()));
}

#[test]
fn empty_reduction_yields_friendly_explanation() {
    let sandbox = sales_sandbox();
    let code = r#"max_where("revenue", "region == \"arctic\"")"#;
    let display = classify_query(sandbox.execute_query(code));
    assert_eq!(
        display,
        DisplayResult::Message(EMPTY_REDUCTION_HINT.to_string())
    );
}

#[test]
fn empty_mean_reads_like_other_empty_reductions() {
    let sandbox = sales_sandbox();
    let code = r#"mean_where("revenue", "region == \"arctic\"")"#;
    let display = classify_query(sandbox.execute_query(code));
    assert_eq!(
        display,
        DisplayResult::Message(EMPTY_REDUCTION_HINT.to_string())
    );
}

#[test]
fn absurd_histogram_bin_counts_are_classified_not_fatal() {
    let sandbox = sales_sandbox();
    let code = r#"fig = histogram("units_sold", 9223372036854775807, "t");"#;
    match classify_chart(sandbox.execute_chart(code)) {
        DisplayResult::Message(text) => {
            assert!(text.starts_with("Error executing generated code:"));
            assert!(text.contains("bin count"));
        }
        other => panic!("expected diagnostic message, got {other:?}"),
    }
}

#[test]
fn hostile_looking_code_is_contained_and_reported() {
    let sandbox = sales_sandbox();
    for code in [
        "import os",
        "open(\"/etc/passwd\")",
        "system(\"rm -rf /\")",
        "while true { }",
    ] {
        match classify_query(sandbox.execute_query(code)) {
            DisplayResult::Message(text) => {
                assert!(
                    text.starts_with("Error executing generated code:"),
                    "unexpected message for {code:?}: {text}"
                );
            }
            other => panic!("expected diagnostic message for {code:?}, got {other:?}"),
        }
    }
}

#[test]
fn grouped_aggregation_returns_a_table() {
    let sandbox = sales_sandbox();
    let display = classify_query(sandbox.execute_query(r#"group_sum("region", "units_sold")"#));
    match display {
        DisplayResult::Table(table) => {
            assert_eq!(table.headers, vec!["region", "sum_units_sold"]);
            assert_eq!(table.rows[0], vec!["north", "7"]);
            assert_eq!(table.rows.len(), 3);
        }
        other => panic!("expected table, got {other:?}"),
    }
}

#[test]
fn label_lookup_finds_the_extreme_row() {
    let sandbox = sales_sandbox();
    let display = classify_query(sandbox.execute_query(r#"label_of_max("product", "revenue")"#));
    assert_eq!(display, DisplayResult::Scalar("laptop".to_string()));
    let display = classify_query(sandbox.execute_query(r#"label_of_min("region", "units_sold")"#));
    assert_eq!(display, DisplayResult::Scalar("north".to_string()));
}

#[test]
fn sanitized_fenced_response_executes_like_plain_code() {
    let sandbox = sales_sandbox();
    let fenced = "```python\nresult = count();\n```";
    let code = strip_code_fences(fenced);
    let display = classify_query(sandbox.execute_query(&code));
    assert_eq!(display, DisplayResult::Scalar("4".to_string()));
}

#[test]
fn empty_model_response_becomes_a_message_not_a_panic() {
    let sandbox = sales_sandbox();
    let code = strip_code_fences("");
    match classify_query(sandbox.execute_query(&code)) {
        DisplayResult::Message(_) => {}
        other => panic!("expected message, got {other:?}"),
    }
}

#[test]
fn chart_request_produces_a_figure_spec() {
    let sandbox = sales_sandbox();
    let code = r#"fig = bar_chart("region", "units_sold", "Units by region");"#;
    match classify_chart(sandbox.execute_chart(code)) {
        DisplayResult::Figure(figure) => {
            assert_eq!(figure.kind, FigureKind::Bar);
            assert_eq!(figure.title, "Units by region");
            let north = figure.points.iter().find(|p| p.x == "north").unwrap();
            assert_eq!(north.y, 7.0);
        }
        other => panic!("expected figure, got {other:?}"),
    }
}

#[test]
fn chart_without_figure_variable_yields_fixed_message() {
    let sandbox = sales_sandbox();
    let code = r#"tmp = sum("units_sold");"#;
    let display = classify_chart(sandbox.execute_chart(code));
    assert_eq!(display, DisplayResult::Message(NO_FIGURE_HINT.to_string()));
}

#[test]
fn multiple_figures_pass_through_as_a_collection() {
    let sandbox = sales_sandbox();
    let code = r#"
        figs = (
            bar_chart("region", "units_sold", "Units by region"),
            histogram("revenue", 4, "Revenue distribution")
        );
    "#;
    match classify_chart(sandbox.execute_chart(code)) {
        DisplayResult::Figures(figures) => {
            assert_eq!(figures.len(), 2);
            assert_eq!(figures[1].kind, FigureKind::Histogram);
            assert_eq!(figures[1].points.len(), 4);
        }
        other => panic!("expected figures, got {other:?}"),
    }
}

#[test]
fn execution_never_exposes_raw_outcomes_for_unknown_columns() {
    let sandbox = sales_sandbox();
    match sandbox.execute_query(r#"sum("no_such_column")"#) {
        ExecutionOutcome::Failed(failure) => {
            assert!(failure.message.contains("no_such_column"));
        }
        other => panic!("expected failure, got {other:?}"),
    }
}

//! The two request pipelines: natural-language question answering and
//! natural-language chart requests. Both share the same shape: normalize the
//! frame, profile it, build a grounded prompt, generate code, sanitize it,
//! execute it in the sandbox, and classify the outcome. Only the generation
//! call can fail; everything after it degrades into a message.

use anyhow::{Context, Result};
use log::{debug, info};

use crate::{
    classify::{DisplayResult, classify_chart, classify_query},
    frame::DataFrame,
    llm::GenerationClient,
    normalize::normalize_frame,
    profile::build_column_profiles,
    sandbox::Sandbox,
    sanitize::strip_code_fences,
};

/// The generated code plus its classified result, for display and audit.
#[derive(Debug, Clone)]
pub struct AgentResult {
    pub code: String,
    pub display: DisplayResult,
}

pub fn run_data_query(
    client: &GenerationClient,
    question: &str,
    frame: &DataFrame,
) -> Result<AgentResult> {
    let normalized = normalize_frame(frame);
    let prompt = query_prompt(question, &normalized)?;
    debug!("Question prompt:\n{prompt}");

    let raw = client
        .generate(&prompt)
        .context("generating analysis code")?;
    let code = strip_code_fences(&raw);
    info!("Generated analysis code: {code}");

    let sandbox = Sandbox::new(normalized);
    let outcome = sandbox.execute_query(&code);
    Ok(AgentResult {
        code,
        display: classify_query(outcome),
    })
}

pub fn run_chart_query(
    client: &GenerationClient,
    question: &str,
    frame: &DataFrame,
) -> Result<AgentResult> {
    let normalized = normalize_frame(frame);
    let prompt = chart_prompt(question, &normalized)?;
    debug!("Chart prompt:\n{prompt}");

    let raw = client.generate(&prompt).context("generating chart code")?;
    let code = strip_code_fences(&raw);
    info!("Generated chart code: {code}");

    let sandbox = Sandbox::new(normalized);
    let outcome = sandbox.execute_chart(&code);
    Ok(AgentResult {
        code,
        display: classify_chart(outcome),
    })
}

const SHARED_RULES: &str = "\
Rules:
- Text values have been normalized: trimmed, lowercased, and with trailing \
's' characters removed. Compare against normalized forms (e.g. 'laptop', \
never 'Laptops').
- Column arguments and row predicates are double-quoted strings. Inside a \
predicate, escape the inner quotes, e.g. sum_where(\"units_sold\", \
\"region == \\\"north\\\"\").
- Predicates may use the column names below as variables with ==, !=, <, \
<=, >, >=, &&, || operators.
- Before aggregating a filtered column with min/max/label functions, make \
sure the filter can match rows; aggregating an empty selection is an error.
- Return only the code. No markdown fences, no commentary.";

const QUERY_FUNCTIONS: &str = "\
Available functions:
- count(), count_where(predicate)
- sum(column), sum_where(column, predicate)
- mean(column), mean_where(column, predicate)
- min(column), min_where(column, predicate)
- max(column), max_where(column, predicate)
- distinct(column), distinct_count(column)
- label_of_max(label_column, value_column), label_of_min(label_column, value_column)
- rows_where(predicate), group_sum(key, value), group_mean(key, value), group_count(key)";

const CHART_FUNCTIONS: &str = "\
Chart functions (in addition to the data functions):
- bar_chart(x_column, y_column, title)
- line_chart(x_column, y_column, title)
- scatter_chart(x_column, y_column, title)
- histogram(column, bins, title)
- pie_chart(label_column, value_column, title)";

fn grounding(frame: &DataFrame) -> Result<String> {
    let profiles = build_column_profiles(frame);
    let profile_json =
        serde_json::to_string_pretty(&profiles).context("serializing column profiles")?;
    Ok(format!(
        "The dataset has {} rows and these columns:\n{}",
        frame.row_count(),
        profile_json
    ))
}

fn query_prompt(question: &str, frame: &DataFrame) -> Result<String> {
    Ok(format!(
        "You write code that answers questions about a tabular dataset.\n\n\
{grounding}\n\n{functions}\n\n{rules}\n\n\
Write either a single expression whose value answers the question, or a \
sequence of statements that assigns the answer to a variable named result.\n\n\
Question: {question}",
        grounding = grounding(frame)?,
        functions = QUERY_FUNCTIONS,
        rules = SHARED_RULES,
    ))
}

fn chart_prompt(question: &str, frame: &DataFrame) -> Result<String> {
    Ok(format!(
        "You write code that builds a chart from a tabular dataset.\n\n\
{grounding}\n\n{data_functions}\n\n{chart_functions}\n\n{rules}\n\n\
Write statements that assign one chart to a variable named fig, or several \
charts as a tuple to a variable named figs.\n\n\
Request: {question}",
        grounding = grounding(frame)?,
        data_functions = QUERY_FUNCTIONS,
        chart_functions = CHART_FUNCTIONS,
        rules = SHARED_RULES,
    ))
}

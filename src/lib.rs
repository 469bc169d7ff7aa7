pub mod agent;
pub mod classify;
pub mod cli;
pub mod config;
pub mod data;
pub mod figure;
pub mod frame;
pub mod insights;
pub mod io_utils;
pub mod llm;
pub mod normalize;
pub mod profile;
pub mod sandbox;
pub mod sanitize;
pub mod schema;
pub mod table;

use std::{env, fs, sync::OnceLock};

use anyhow::{Context, Result};
use clap::Parser;
use log::{LevelFilter, info};

use crate::{
    classify::DisplayResult,
    cli::{AskArgs, ChartArgs, Cli, Commands, InputArgs, InsightsArgs, PreviewArgs, ProbeArgs,
        ProfileArgs},
    config::Settings,
    frame::DataFrame,
    llm::GenerationClient,
    profile::format_metric,
    schema::Schema,
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("csv_analyst", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Preview(args) => handle_preview(&args),
        Commands::Probe(args) => handle_probe(&args),
        Commands::Profile(args) => handle_profile(&args),
        Commands::Insights(args) => handle_insights(&args),
        Commands::Ask(args) => handle_ask(&args),
        Commands::Chart(args) => handle_chart(&args),
    }
}

/// Loads a typed frame: schema from the .meta file when given, otherwise
/// inferred from a sample of the input.
fn load_frame(args: &InputArgs) -> Result<DataFrame> {
    let delimiter = io_utils::resolve_input_delimiter(&args.input, args.delimiter);
    let encoding = io_utils::resolve_encoding(args.input_encoding.as_deref())?;
    let schema = match &args.meta {
        Some(path) => {
            Schema::load(path).with_context(|| format!("Loading metadata from {path:?}"))?
        }
        None => schema::infer_schema(&args.input, 2000, delimiter, encoding)
            .with_context(|| format!("Inferring schema from {:?}", args.input))?,
    };
    DataFrame::read(&args.input, &schema, delimiter, encoding)
        .with_context(|| format!("Reading {:?}", args.input))
}

fn handle_preview(args: &PreviewArgs) -> Result<()> {
    let frame = load_frame(&args.input)?;
    info!(
        "Previewing {} of {} row(s) from '{}'",
        args.rows.min(frame.row_count()),
        frame.row_count(),
        args.input.input.display()
    );
    table::print_table(&frame.headers(), &frame.display_rows(args.rows));
    Ok(())
}

fn handle_probe(args: &ProbeArgs) -> Result<()> {
    let delimiter = io_utils::resolve_input_delimiter(&args.input, args.delimiter);
    let encoding = io_utils::resolve_encoding(args.input_encoding.as_deref())?;
    let schema = schema::infer_schema(&args.input, args.sample_rows, delimiter, encoding)
        .with_context(|| format!("Inferring schema from {:?}", args.input))?;
    schema
        .save(&args.meta)
        .with_context(|| format!("Writing metadata to {:?}", args.meta))?;
    info!(
        "Inferred schema for {} column(s) written to {:?}",
        schema.columns.len(),
        args.meta
    );
    Ok(())
}

fn handle_profile(args: &ProfileArgs) -> Result<()> {
    let frame = load_frame(&args.input)?;
    let summary = profile::build_summary(&frame);

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&summary).context("Serializing profile")?
        );
        return Ok(());
    }

    println!("{} row(s), {} column(s)", summary.rows, summary.cols);
    println!();
    let column_headers = vec![
        "column".to_string(),
        "type".to_string(),
        "missing".to_string(),
    ];
    let column_rows = summary
        .columns
        .iter()
        .map(|c| vec![c.name.clone(), c.dtype.clone(), c.missing.to_string()])
        .collect::<Vec<_>>();
    table::print_table(&column_headers, &column_rows);

    if !summary.numeric_summary.is_empty() {
        println!();
        let numeric_headers = ["column", "count", "min", "max", "mean", "median", "std_dev"]
            .iter()
            .map(|h| h.to_string())
            .collect::<Vec<_>>();
        let numeric_rows = summary
            .numeric_summary
            .iter()
            .map(|s| {
                vec![
                    s.name.clone(),
                    s.count.to_string(),
                    format_metric(s.min),
                    format_metric(s.max),
                    format_metric(s.mean),
                    format_metric(s.median),
                    format_metric(s.std_dev),
                ]
            })
            .collect::<Vec<_>>();
        table::print_table(&numeric_headers, &numeric_rows);
    }
    Ok(())
}

fn handle_insights(args: &InsightsArgs) -> Result<()> {
    let frame = load_frame(&args.input)?;
    let summary = profile::build_summary(&frame);
    let client = GenerationClient::new(Settings::from_env()?);
    let report = insights::generate_insights(&client, &summary)?;
    println!("{report}");
    Ok(())
}

fn handle_ask(args: &AskArgs) -> Result<()> {
    let frame = load_frame(&args.input)?;
    let client = GenerationClient::new(Settings::from_env()?);
    let result = agent::run_data_query(&client, &args.question, &frame)?;
    if args.show_code {
        println!("{}", result.code);
        println!();
    }
    print_display(&result.display)?;
    Ok(())
}

fn handle_chart(args: &ChartArgs) -> Result<()> {
    let frame = load_frame(&args.input)?;
    let client = GenerationClient::new(Settings::from_env()?);
    let result = agent::run_chart_query(&client, &args.question, &frame)?;
    if args.show_code {
        println!("{}", result.code);
        println!();
    }
    match &result.display {
        DisplayResult::Figure(figure) => write_figures(args, std::slice::from_ref(figure)),
        DisplayResult::Figures(figures) => write_figures(args, figures),
        other => print_display(other),
    }
}

fn write_figures(args: &ChartArgs, figures: &[figure::FigureSpec]) -> Result<()> {
    let json = if figures.len() == 1 {
        serde_json::to_string_pretty(&figures[0])
    } else {
        serde_json::to_string_pretty(&figures)
    }
    .context("Serializing figure")?;
    match &args.output {
        Some(path) => {
            fs::write(path, &json).with_context(|| format!("Writing figure to {path:?}"))?;
            info!("Wrote {} figure(s) to {:?}", figures.len(), path);
        }
        None => println!("{json}"),
    }
    Ok(())
}

fn print_display(display: &DisplayResult) -> Result<()> {
    match display {
        DisplayResult::Scalar(text) | DisplayResult::Message(text) => println!("{text}"),
        DisplayResult::Table(slice) => table::print_table(&slice.headers, &slice.rows),
        DisplayResult::Figure(figure) => println!(
            "{}",
            serde_json::to_string_pretty(figure).context("Serializing figure")?
        ),
        DisplayResult::Figures(figures) => println!(
            "{}",
            serde_json::to_string_pretty(figures).context("Serializing figures")?
        ),
    }
    Ok(())
}

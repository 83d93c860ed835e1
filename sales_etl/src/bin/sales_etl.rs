//! sales-etl - command-line entry point
//!
//! Usage:
//!   sales-etl run [--config etl.toml]     - Run the full pipeline
//!   sales-etl profile <input>             - Print a data quality report as JSON
//!   sales-etl segments <input>            - Print customer value segments
//!   sales-etl outliers <input>            - Print the IQR fence and flagged rows

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use polars::prelude::*;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use sales_etl::algorithms::outliers::{flag_outliers, DEFAULT_MULTIPLIER};
use sales_etl::algorithms::segmentation::{customer_segments, segment_counts};
use sales_etl::algorithms::statistics::{column_stats, DistributionStats};
use sales_etl::io::TransactionLoader;
use sales_etl::models::columns::{IS_OUTLIER, SALES_AMOUNT};
use sales_etl::models::SegmentThresholds;
use sales_etl::preprocessing::{EtlPipeline, QualityValidator, ValidationResult};
use sales_etl::transformations::clean;
use sales_etl::EtlConfig;

#[derive(Parser)]
#[command(name = "sales-etl")]
#[command(about = "Clean, segment and summarise retail transaction tables")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log debug output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline described by a TOML config
    Run {
        /// Config file; defaults to etl.toml in the usual locations
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Report data quality of an input file
    Profile { input: PathBuf },
    /// Segment customers by total purchase amount
    Segments {
        input: PathBuf,
        #[arg(long, default_value_t = 1000.0)]
        high: f64,
        #[arg(long, default_value_t = 500.0)]
        medium: f64,
    },
    /// Compute the IQR fence of a column and list the rows outside it
    Outliers {
        input: PathBuf,
        #[arg(long, default_value = SALES_AMOUNT)]
        column: String,
        #[arg(long, default_value_t = 0.05)]
        relative_error: f64,
        #[arg(long, default_value_t = DEFAULT_MULTIPLIER)]
        multiplier: f64,
    },
}

#[derive(Serialize)]
struct ProfileReport {
    input: String,
    validation: ValidationResult,
    sales_amount: Option<DistributionStats>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Run { config } => run(config),
        Commands::Profile { input } => profile(&input),
        Commands::Segments {
            input,
            high,
            medium,
        } => segments(&input, high, medium),
        Commands::Outliers {
            input,
            column,
            relative_error,
            multiplier,
        } => outliers(&input, &column, relative_error, multiplier),
    }
}

fn run(config: Option<PathBuf>) -> Result<()> {
    let config = match config {
        Some(path) => EtlConfig::from_file(&path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => EtlConfig::from_default_location().context("Failed to load etl.toml")?,
    };

    let result = EtlPipeline::with_config(config).run()?;

    println!(
        "Processed {} -> {} rows ({} warnings)",
        result.input_rows,
        result.output_rows,
        result.validation.warnings.len()
    );
    println!(
        "Segments: {} high, {} medium, {} low",
        result.segment_counts.high, result.segment_counts.medium, result.segment_counts.low
    );
    if let Some(bounds) = result.outlier_bounds {
        println!("Outlier fence: [{}, {}]", bounds.lower, bounds.upper);
    }
    println!("Manifest: {}", result.manifest_path.display());
    Ok(())
}

fn load_clean(input: &Path) -> Result<DataFrame> {
    let loaded = TransactionLoader::load_from_file(input)
        .with_context(|| format!("Failed to load {}", input.display()))?;
    clean(&loaded.dataframe).context("Failed to clean input")
}

fn profile(input: &Path) -> Result<()> {
    let loaded = TransactionLoader::load_from_file(input)
        .with_context(|| format!("Failed to load {}", input.display()))?;

    let report = ProfileReport {
        input: input.display().to_string(),
        validation: QualityValidator::validate(&loaded.dataframe),
        sales_amount: column_stats(&loaded.dataframe, SALES_AMOUNT).ok(),
    };

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn segments(input: &Path, high: f64, medium: f64) -> Result<()> {
    let thresholds = SegmentThresholds::new(high, medium).context("Invalid thresholds")?;
    let df = load_clean(input)?;

    let segments = customer_segments(&df, &thresholds)?;
    let counts = segment_counts(&segments)?;

    println!("{}", segments);
    println!(
        "{} customers: {} high, {} medium, {} low",
        counts.total(),
        counts.high,
        counts.medium,
        counts.low
    );
    Ok(())
}

fn outliers(input: &Path, column: &str, relative_error: f64, multiplier: f64) -> Result<()> {
    let df = load_clean(input)?;
    let (flagged, bounds) = flag_outliers(&df, column, relative_error, multiplier)?;

    let Some(bounds) = bounds else {
        println!("Column {} has no values", column);
        return Ok(());
    };

    println!("{}", serde_json::to_string_pretty(&bounds)?);
    let rows = flagged.lazy().filter(col(IS_OUTLIER)).collect()?;
    println!("{} of {} rows outside the fence", rows.height(), df.height());
    println!("{}", rows);
    Ok(())
}

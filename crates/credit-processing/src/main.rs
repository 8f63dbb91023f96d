//! CLI entry point for the credit-risk feature pipeline.

use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use credit_processing::io::{read_table, write_table};
use credit_processing::{
    DatasetAssembler, FeaturePipeline, PipelineConfig, PipelineSummary, SourceTables,
    ZeroDivisionPolicy,
};
use dotenv::dotenv;
use std::path::{Path, PathBuf};
use tracing::info;

/// CLI-compatible zero-division policy enum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliZeroDivision {
    /// Emit 0.0 for the row
    Zero,
    /// Emit null for the row
    Null,
    /// Fail the run
    Error,
}

impl From<CliZeroDivision> for ZeroDivisionPolicy {
    fn from(cli: CliZeroDivision) -> Self {
        match cli {
            CliZeroDivision::Zero => ZeroDivisionPolicy::Zero,
            CliZeroDivision::Null => ZeroDivisionPolicy::Null,
            CliZeroDivision::Error => ZeroDivisionPolicy::Error,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "credit-processing",
    author,
    version,
    about = "Credit-risk feature pipeline: dataset assembly, fit and transform",
    after_help = "EXAMPLES:\n  \
                  # Assemble the training table from exported source tables\n  \
                  credit-processing build-dataset --clients clientes.csv --requests pedidos.csv \\\n    \
                  --installments parcelas.csv --products produtos.csv -o data/raw/base.parquet\n\n  \
                  # Fit and persist scalers/encoders\n  \
                  credit-processing fit -i data/raw/base.parquet --artifacts objects -o data/processed/train.parquet\n\n  \
                  # Apply persisted state to clean records\n  \
                  credit-processing transform -i novos.csv --artifacts objects -o features.csv"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,

    /// Suppress progress output (only show warnings and errors)
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Output the run summary as JSON to stdout instead of a human-readable summary
    ///
    /// Disables all logs.
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Join the source tables into the labelled training table
    BuildDataset(BuildDatasetArgs),
    /// Clean a raw table, fit scalers/encoders and persist them
    Fit(PipelineArgs),
    /// Apply persisted scalers/encoders to a clean table
    Transform(PipelineArgs),
}

#[derive(Args, Debug)]
struct BuildDatasetArgs {
    /// Clients table (CSV or Parquet)
    #[arg(long)]
    clients: PathBuf,

    /// Credit requests table
    #[arg(long)]
    requests: PathBuf,

    /// Installments table
    #[arg(long)]
    installments: PathBuf,

    /// Financed products table
    #[arg(long)]
    products: PathBuf,

    /// Output file (.csv or .parquet)
    #[arg(short, long, default_value = "data/raw/base_treinamento.parquet")]
    output: PathBuf,

    /// Date ages are computed against (YYYY-MM-DD, default today)
    #[arg(long)]
    reference_date: Option<String>,
}

#[derive(Args, Debug)]
struct PipelineArgs {
    /// Input table (.csv or .parquet)
    #[arg(short, long)]
    input: PathBuf,

    /// Output table (.csv or .parquet)
    #[arg(short, long)]
    output: PathBuf,

    /// Artifact directory (overrides the config file, default "objects")
    #[arg(long)]
    artifacts: Option<PathBuf>,

    /// JSON file with a full pipeline configuration
    #[arg(long)]
    config: Option<PathBuf>,

    /// Ratio feature behaviour on a zero denominator
    #[arg(long, value_enum)]
    zero_division: Option<CliZeroDivision>,
}

/// Initialize the tracing subscriber for logging.
///
/// When `json_output` is true, logging is completely disabled to ensure
/// only JSON is written to stdout.
fn init_logging(level: &str, quiet: bool, json_output: bool) {
    if json_output {
        return;
    }

    use tracing_subscriber::EnvFilter;

    let effective_level = if quiet { "warn" } else { level };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(effective_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(&cli.log_level, cli.quiet, cli.json);

    // Load environment variables from .env file
    dotenv().ok();

    match &cli.command {
        Command::BuildDataset(args) => run_build_dataset(args, cli.json),
        Command::Fit(args) => run_fit(args, cli.json),
        Command::Transform(args) => run_transform(args, cli.json),
    }
}

fn run_build_dataset(args: &BuildDatasetArgs, json: bool) -> Result<()> {
    let assembler = match &args.reference_date {
        Some(date) => DatasetAssembler::new(
            NaiveDate::parse_from_str(date, "%Y-%m-%d")
                .with_context(|| format!("Invalid --reference-date '{}'", date))?,
        ),
        None => DatasetAssembler::today(),
    };

    let tables = SourceTables {
        clients: load(&args.clients)?,
        requests: load(&args.requests)?,
        installments: load(&args.installments)?,
        products: load(&args.products)?,
    };

    let mut dataset = assembler.assemble(&tables)?;
    write_table(&mut dataset, &args.output)?;

    if json {
        let report = serde_json::json!({
            "rows": dataset.height(),
            "columns": dataset.width(),
            "reference_date": assembler.reference_date().to_string(),
            "output": args.output.display().to_string(),
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!(
            "Dataset created with {} rows -> {}",
            dataset.height(),
            args.output.display()
        );
    }
    Ok(())
}

fn run_fit(args: &PipelineArgs, json: bool) -> Result<()> {
    let pipeline = build_pipeline(args)?;
    let raw = load(&args.input)?;

    let (mut output, _state) = pipeline.fit(raw)?;
    write_table(&mut output.data, &args.output)?;
    info!("Artifacts written to {}", pipeline.store().dir().display());

    print_summary(&output.summary, &args.output, json)
}

fn run_transform(args: &PipelineArgs, json: bool) -> Result<()> {
    let pipeline = build_pipeline(args)?;
    let state = pipeline.load_state()?;
    let clean = load(&args.input)?;

    let mut output = pipeline.transform(clean, &state)?;
    write_table(&mut output.data, &args.output)?;

    print_summary(&output.summary, &args.output, json)
}

fn build_pipeline(args: &PipelineArgs) -> Result<FeaturePipeline> {
    let mut config = match &args.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config {}", path.display()))?;
            serde_json::from_str::<PipelineConfig>(&text)
                .with_context(|| format!("Invalid config {}", path.display()))?
        }
        None => PipelineConfig::default(),
    };
    if let Some(policy) = args.zero_division {
        config.zero_division = policy.into();
    }

    if let Some(dir) = &args.artifacts {
        config.artifact_dir = dir.clone();
    }

    FeaturePipeline::builder()
        .config(config)
        .build()
        .map_err(|e| anyhow!("Invalid pipeline configuration: {}", e))
}

fn load(path: &Path) -> Result<polars::prelude::DataFrame> {
    if !path.exists() {
        return Err(anyhow!("Input file not found: {}", path.display()));
    }
    Ok(read_table(path)?)
}

/// Print the run summary.
///
/// Uses `println!` intentionally: this is the command's result, not a log line.
fn print_summary(summary: &PipelineSummary, output: &Path, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(summary)?);
        return Ok(());
    }

    println!("{}", "=".repeat(60));
    println!("Mode:      {}", summary.mode);
    println!("Rows:      {}", summary.rows);
    println!(
        "Columns:   {} -> {}",
        summary.columns_before, summary.columns_after
    );
    println!("Duration:  {}ms", summary.duration_ms);
    println!("Output:    {}", output.display());
    if !summary.actions.is_empty() {
        println!("{}", "-".repeat(60));
        for action in &summary.actions {
            println!(
                "[{}] {}: {}",
                action.action_type.display_name(),
                action.target,
                action.description
            );
        }
    }
    println!("{}", "=".repeat(60));
    Ok(())
}

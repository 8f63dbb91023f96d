//! CLI entry point for training and scoring the credit classifier.

use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand};
use credit_learning::{ScoringService, Trainer, TrainingConfig, TrainingResult};
use credit_processing::io::read_table;
use credit_processing::{FeaturePipeline, PipelineConfig};
use dotenv::dotenv;
use serde::de::DeserializeOwned;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    name = "credit-scoring",
    author,
    version,
    about = "Train the credit classifier and score requests with the persisted artifacts",
    after_help = "EXAMPLES:\n  \
                  # Train on the assembled table and persist every artifact\n  \
                  credit-scoring train -i data/raw/base_treinamento.parquet --artifacts objects\n\n  \
                  # Score a request file\n  \
                  credit-scoring predict --artifacts objects -r request.json\n\n  \
                  # Score a request from stdin\n  \
                  echo '{\"profissao\": [\"Advogado\"], ...}' | credit-scoring predict --artifacts objects"
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

    /// Output JSON to stdout instead of a human-readable summary
    ///
    /// Disables all logs.
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Clean, split, fit and persist the feature state, selector and model
    Train(TrainArgs),
    /// Score a JSON request with the persisted artifacts
    Predict(PredictArgs),
}

#[derive(Args, Debug)]
struct TrainArgs {
    /// Raw training table (.csv or .parquet)
    #[arg(short, long)]
    input: PathBuf,

    /// Artifact directory (overrides the pipeline config file, default "objects")
    #[arg(long)]
    artifacts: Option<PathBuf>,

    /// JSON file with a training configuration
    #[arg(long)]
    config: Option<PathBuf>,

    /// JSON file with a feature pipeline configuration
    #[arg(long)]
    pipeline_config: Option<PathBuf>,

    /// Random seed for the split, initialisation and shuffling
    #[arg(long)]
    seed: Option<u64>,

    /// Maximum number of training epochs
    #[arg(long)]
    epochs: Option<usize>,

    /// Fraction of rows held out for evaluation
    #[arg(long)]
    test_size: Option<f64>,
}

#[derive(Args, Debug)]
struct PredictArgs {
    /// Artifact directory written by `train`
    #[arg(long, default_value = "objects")]
    artifacts: PathBuf,

    /// Request file (JSON); read from stdin when omitted
    #[arg(short, long)]
    request: Option<PathBuf>,

    /// JSON file with the feature pipeline configuration used at training time
    #[arg(long)]
    pipeline_config: Option<PathBuf>,
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
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(&cli.log_level, cli.quiet, cli.json);

    // Load environment variables from .env file
    dotenv().ok();

    match &cli.command {
        Command::Train(args) => run_train(args, cli.json),
        Command::Predict(args) => run_predict(args),
    }
}

fn run_train(args: &TrainArgs, json: bool) -> Result<()> {
    let mut config: TrainingConfig = match &args.config {
        Some(path) => read_json(path)?,
        None => TrainingConfig::default(),
    };
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    if let Some(epochs) = args.epochs {
        config.epochs = epochs;
    }
    if let Some(test_size) = args.test_size {
        config.test_size = test_size;
    }

    let pipeline = build_pipeline(args.pipeline_config.as_deref(), args.artifacts.as_deref())?;
    let trainer = Trainer::builder().config(config).pipeline(pipeline).build()?;

    if !args.input.exists() {
        return Err(anyhow!("Input file not found: {}", args.input.display()));
    }
    let raw = read_table(&args.input)?;
    info!("Loaded {} rows from {}", raw.height(), args.input.display());

    let result = trainer.train(raw)?;
    print_training_result(&result, json)
}

/// Score one request. The response is printed as JSON; a failure response
/// exits with status 1.
fn run_predict(args: &PredictArgs) -> Result<()> {
    let pipeline = build_pipeline(args.pipeline_config.as_deref(), Some(&args.artifacts))?;
    let service = ScoringService::with_pipeline(pipeline)?;

    let body = match &args.request {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read request {}", path.display()))?,
        None => {
            let mut body = String::new();
            std::io::stdin()
                .read_to_string(&mut body)
                .context("Failed to read request from stdin")?;
            body
        }
    };

    let response = service.handle_json(&body);
    println!("{}", serde_json::to_string_pretty(&response)?);
    if !response.is_success() {
        std::process::exit(1);
    }
    Ok(())
}

fn build_pipeline(config: Option<&Path>, artifacts: Option<&Path>) -> Result<FeaturePipeline> {
    let mut config: PipelineConfig = match config {
        Some(path) => read_json(path)?,
        None => PipelineConfig::default(),
    };
    if let Some(dir) = artifacts {
        config.artifact_dir = dir.to_path_buf();
    }

    FeaturePipeline::builder()
        .config(config)
        .build()
        .map_err(|e| anyhow!("Invalid pipeline configuration: {}", e))
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("Invalid config {}", path.display()))
}

/// Print the training outcome.
///
/// Uses `println!` intentionally: this is the command's result, not a log line.
fn print_training_result(result: &TrainingResult, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(result)?);
        return Ok(());
    }

    let report = &result.report;
    println!("{}", "=".repeat(60));
    println!("Train rows:   {}", result.train_rows);
    println!("Test rows:    {}", result.test_rows);
    println!("Attributes:   {}", result.selected_features.join(", "));
    println!(
        "Epochs:       {} (best {}, val loss {:.4})",
        result.history.epochs_run, result.history.best_epoch, result.history.best_val_loss
    );
    println!("Accuracy:     {:.4}", report.accuracy);
    println!("{}", "-".repeat(60));
    println!(
        "{:<10} {:>10} {:>10} {:>10} {:>10}",
        "class", "precision", "recall", "f1-score", "support"
    );
    for class in &report.classes {
        println!(
            "{:<10} {:>10.3} {:>10.3} {:>10.3} {:>10}",
            class.label, class.precision, class.recall, class.f1_score, class.support
        );
    }
    println!("{}", "-".repeat(60));
    let [[tn, fp], [fn_, tp]] = report.confusion_matrix.as_rows();
    println!("Confusion matrix (rows actual, columns predicted):");
    println!("  [{:>5} {:>5}]", tn, fp);
    println!("  [{:>5} {:>5}]", fn_, tp);
    for warning in &result.warnings {
        println!("warning: {}", warning);
    }
    println!("Artifacts:    {}", result.artifact_dir.display());
    println!("Duration:     {:.2}s", result.training_time_seconds);
    println!("{}", "=".repeat(60));
    Ok(())
}

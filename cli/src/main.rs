use anyhow::{Context, Result};
use clap::Parser;
use genson_core::{evaluate, EvalOptions};
use serde_json::Value;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::level_filters::LevelFilter;

#[derive(Parser)]
#[command(name = "genson")]
#[command(about = "Evaluate a GenSON schema into generated text")]
#[command(version)]
struct Cli {
    /// Input schema file
    #[arg(short, long, default_value = "example.json")]
    input: PathBuf,

    /// RNG seed for reproducible output
    #[arg(long)]
    seed: Option<u64>,

    /// Recursion ceiling for node evaluation
    #[arg(long, default_value_t = 100)]
    max_depth: usize,

    /// Per-loop iteration ceiling
    #[arg(long, default_value_t = 10_000)]
    max_iterations: usize,

    /// Enable verbose logging (sets log level to debug)
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing — logs go to stderr so stdout stays clean for the
    // generated text
    let log_level = if cli.verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::WARN
    };
    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .init();

    let schema = read_schema(&cli.input)?;

    let options = EvalOptions {
        seed: cli.seed,
        max_depth: cli.max_depth,
        max_iterations: cli.max_iterations,
    };

    let output = evaluate(&schema, &options).context("Evaluation failed")?;
    println!("{output}");

    Ok(())
}

/// Read and parse a schema from a file path.
fn read_schema(input: &Path) -> Result<Value> {
    let file = File::open(input)
        .with_context(|| format!("Failed to open input file: {}", input.display()))?;
    let reader = BufReader::new(file);
    serde_json::from_reader(reader)
        .with_context(|| format!("Failed to parse schema from: {}", input.display()))
}

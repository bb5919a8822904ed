//! `rowselect` — evaluates layered Boolean selections over a tabular
//! dataset.
//!
//! ```bash
//! rowselect ./input-dir ./output-dir
//! ```
//!
//! `input-dir` must contain `input_data.csv`, `universe.json`, and
//! `selection.json` (spec §6); one `output_{selection_id}.csv` is written
//! per selection that completes successfully.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use rowselect::config::Config;
use rowselect::runner;

#[derive(Parser, Debug)]
#[command(name = "rowselect", version, about = "Evaluate layered Boolean selections over a CSV table")]
struct Cli {
    /// Directory containing input_data.csv, universe.json, selection.json
    input_dir: PathBuf,

    /// Directory output_{selection_id}.csv files are written into
    output_dir: PathBuf,

    /// Path to a TOML config file (overrides config.toml/config.local.toml)
    #[arg(long)]
    config: Option<String>,

    /// Number of worker threads for parallel selection execution
    /// (0 = all available cores, 1 = sequential)
    #[arg(long)]
    jobs: Option<usize>,

    /// Log output format: "text" or "json" (overrides config/logging.format)
    #[arg(long)]
    log_format: Option<String>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(&cli) {
        Ok(had_failure) => {
            if had_failure {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            }
        }
        Err(err) => {
            eprintln!("fatal: {err:#}");
            ExitCode::FAILURE
        }
    }
}

/// Loads config, runs every selection, and reports per-selection failures
/// to stderr. Returns `Ok(true)` when at least one selection failed (a
/// non-fatal, partial-output outcome per spec §4.7), `Err` only for
/// failures that prevent the whole run from starting at all. `anyhow` is
/// used here at the CLI boundary only — library code below this point
/// returns its own typed errors.
fn run(cli: &Cli) -> anyhow::Result<bool> {
    let mut config = match &cli.config {
        Some(path) => Config::from_file(path),
        None => Config::load(),
    }
    .unwrap_or_else(|err| {
        eprintln!("warning: config load failed ({err}), using defaults");
        Config::default()
    });

    if let Some(jobs) = cli.jobs {
        config.execution.jobs = jobs;
    }
    if let Some(format) = &cli.log_format {
        config.logging.format = format.clone();
    }

    init_logging(&config.logging);

    std::fs::create_dir_all(&cli.output_dir)
        .with_context(|| format!("could not create output directory {}", cli.output_dir.display()))?;

    let loaded = runner::load(&cli.input_dir, &config).context("loading input directory")?;

    let limits = config.execution.resource_limits();
    let outcomes = runner::run_all(
        &loaded.universe,
        &loaded.input,
        &loaded.selections,
        &cli.output_dir,
        config.execution.jobs,
        &limits,
    );

    let mut had_failure = false;
    for outcome in &outcomes {
        if let Err(err) = &outcome.result {
            had_failure = true;
            eprintln!("selection {}: {err}", outcome.selection_id);
        }
    }

    Ok(had_failure)
}

fn init_logging(config: &rowselect::config::LoggingConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter);
    if config.format == "json" {
        let _ = subscriber.json().try_init();
    } else {
        let _ = subscriber.try_init();
    }
}

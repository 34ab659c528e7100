//! lift: the Bayesian experiment analysis CLI.
//!
//! Thin wrapper around the lift-core engine: reads caller-prepared JSON
//! snapshots, runs the analysis, and writes JSON payloads to stdout.
//! Prior resolution, ROPE classification, and weight calibration are
//! also exposed as standalone subcommands.

use clap::{Args, Parser, Subcommand};
use lift_core::analyze::{analyze_experiment, AnalysisError};
use lift_core::config::AnalysisConfig;
use lift_core::decision::rope::{
    multi_variant_rope_decision, rope_decision, RopeAnalysis, RopeError,
};
use lift_core::engagement::calibrate::{calibrate_weights, CalibrationRow};
use lift_core::experiment::ExperimentRequest;
use lift_core::inference::prior::{resolve_prior, ElicitedPrior};
use lift_core::logging::{init_logging, LogFormat};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use thiserror::Error;

/// Bayesian experiment analysis for conversion experiments.
#[derive(Parser)]
#[command(name = "lift")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    global: GlobalOpts,
}

/// Global options available to all commands.
#[derive(Args, Debug)]
struct GlobalOpts {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Errors only
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Log output format (stderr)
    #[arg(long, global = true, value_enum, default_value = "human")]
    log_format: LogFormat,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full analysis pipeline on an experiment snapshot
    Analyze {
        /// Path to the snapshot JSON (variants, history, config)
        #[arg(long, env = "LIFT_INPUT")]
        input: PathBuf,

        /// Pretty-print the JSON payload
        #[arg(long)]
        pretty: bool,

        /// Override the configured Monte Carlo seed
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Resolve a prior from history and optional elicited values
    Prior {
        /// Historical conversion rates, comma-separated
        #[arg(long, value_delimiter = ',')]
        rates: Vec<f64>,

        /// Elicited expected conversion rate
        #[arg(long)]
        expected_rate: Option<f64>,

        /// Elicited confidence in pseudo-observations
        #[arg(long)]
        confidence: Option<f64>,
    },

    /// Standalone ROPE classification for an experiment snapshot
    Rope {
        /// Path to the snapshot JSON
        #[arg(long, env = "LIFT_INPUT")]
        input: PathBuf,

        /// Override the snapshot's equivalence band half-width
        #[arg(long)]
        rope_width: Option<f64>,

        /// Pretty-print the JSON payload
        #[arg(long)]
        pretty: bool,
    },

    /// Calibrate engagement weights from historical visitor rows
    Calibrate {
        /// Path to a JSON array of calibration rows
        #[arg(long, env = "LIFT_INPUT")]
        input: PathBuf,
    },
}

#[derive(Debug, Error)]
enum CliError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid JSON in {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error(transparent)]
    Analysis(#[from] AnalysisError),
    #[error(transparent)]
    Rope(#[from] RopeError),
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("a ROPE classification needs at least 2 variants, got {0}")]
    NotEnoughVariants(usize),
}

/// On-disk snapshot: the request plus optional embedded config.
#[derive(Debug, Deserialize)]
struct Snapshot {
    #[serde(flatten)]
    request: ExperimentRequest,
    #[serde(default)]
    config: AnalysisConfig,
}

fn load_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, CliError> {
    let raw = std::fs::read_to_string(path).map_err(|source| CliError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| CliError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn emit<T: Serialize>(payload: &T, pretty: bool) -> Result<(), CliError> {
    let rendered = if pretty {
        serde_json::to_string_pretty(payload)?
    } else {
        serde_json::to_string(payload)?
    };
    println!("{rendered}");
    Ok(())
}

fn run_analyze(input: &Path, pretty: bool, seed: Option<u64>) -> Result<(), CliError> {
    let mut snapshot: Snapshot = load_json(input)?;
    if seed.is_some() {
        snapshot.config.seed = seed;
    }
    let analysis = analyze_experiment(&snapshot.request, &snapshot.config)?;
    emit(&analysis, pretty)
}

fn run_prior(
    rates: &[f64],
    expected_rate: Option<f64>,
    confidence: Option<f64>,
) -> Result<(), CliError> {
    let elicited = match (expected_rate, confidence) {
        (Some(expected_rate), Some(confidence)) => Some(ElicitedPrior {
            expected_rate,
            confidence,
        }),
        _ => None,
    };
    let resolved = resolve_prior(rates, elicited);
    emit(&resolved, false)
}

fn run_rope(input: &Path, rope_width: Option<f64>, pretty: bool) -> Result<(), CliError> {
    let snapshot: Snapshot = load_json(input)?;
    let request = &snapshot.request;
    let config = &snapshot.config;
    if request.variants.len() < 2 {
        return Err(CliError::NotEnoughVariants(request.variants.len()));
    }

    let history = request.history.clone().unwrap_or_default();
    let prior = resolve_prior(&history.conversion_rates, request.elicited_prior);
    let mut models = Vec::with_capacity(request.variants.len());
    for obs in &request.variants {
        let model = prior
            .model
            .update(obs.conversions, obs.visitors)
            .map_err(AnalysisError::from)?;
        models.push(model);
    }
    let keys: Vec<String> = request
        .variants
        .iter()
        .map(|v| v.variant_key.clone())
        .collect();

    let width = rope_width.unwrap_or(config.rope_width);
    let seed = config.effective_seed();
    let analysis = if models.len() == 2 {
        RopeAnalysis::Pairwise(rope_decision(
            &models[0],
            &models[1],
            width,
            config.comparison_samples,
            seed,
        ))
    } else {
        RopeAnalysis::MultiVariant(multi_variant_rope_decision(
            &models,
            &keys,
            width,
            config.comparison_samples,
            seed,
        )?)
    };
    emit(&analysis, pretty)
}

fn run_calibrate(input: &Path) -> Result<(), CliError> {
    let rows: Vec<CalibrationRow> = load_json(input)?;
    emit(&calibrate_weights(&rows), false)
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.global.verbose, cli.global.quiet, cli.global.log_format);

    let result = match &cli.command {
        Commands::Analyze {
            input,
            pretty,
            seed,
        } => run_analyze(input, *pretty, *seed),
        Commands::Prior {
            rates,
            expected_rate,
            confidence,
        } => run_prior(rates, *expected_rate, *confidence),
        Commands::Rope {
            input,
            rope_width,
            pretty,
        } => run_rope(input, *rope_width, *pretty),
        Commands::Calibrate { input } => run_calibrate(input),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

//! Logging setup for the lift CLI.
//!
//! stdout is reserved for command payloads (JSON output); all log lines
//! go to stderr, human-readable or JSONL depending on the flag. The
//! `LIFT_LOG` environment variable overrides the verbosity flags with a
//! full `EnvFilter` directive.

use tracing_subscriber::EnvFilter;

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    Human,
    Json,
}

/// Initialize the global subscriber. Call once at startup.
pub fn init_logging(verbose: u8, quiet: bool, format: LogFormat) {
    let directive = if quiet {
        "error"
    } else {
        match verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    };
    let filter = EnvFilter::try_from_env("LIFT_LOG").unwrap_or_else(|_| EnvFilter::new(directive));

    match format {
        LogFormat::Human => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init(),
    }
}

//! Nobias CLI - Main Entry Point
//!
//! Runs one review from a JSON request file and prints the outcome as JSON.
//!
//! Usage:
//!     nobias review --request paper.json --config nobias.json
//!     nobias validate-config nobias.json
//!     nobias default-config > nobias.json

mod logging;

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use nobias_core::{review, ConfigSnapshot, ConfigStore, EngineConfig, ReviewRequest};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "nobias")]
#[command(about = "Evidence-fusion verdicts for research papers")]
#[command(version)]
struct Args {
    /// Log level or filter directive (debug, info, warn, error); RUST_LOG overrides
    #[arg(long, default_value = "warn", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Review one paper's detector outputs
    Review {
        /// JSON review request
        #[arg(short, long)]
        request: PathBuf,

        /// JSON engine configuration (built-in defaults when omitted)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Single-line JSON output
        #[arg(long)]
        compact: bool,
    },

    /// Check a configuration file without reviewing anything
    ValidateConfig {
        /// JSON engine configuration
        path: PathBuf,
    },

    /// Print the built-in configuration
    DefaultConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    logging::init_with_filter(&args.log_level);

    match args.command {
        Command::Review {
            request,
            config,
            compact,
        } => run_review(&request, config.as_deref(), compact),
        Command::ValidateConfig { path } => {
            let store = ConfigStore::from_path(&path)?;
            let snapshot = store.snapshot();
            if let Err(e) = snapshot.lexicon() {
                eprintln!("warning: self-audit will be skipped: {}", e);
            }
            println!(
                "{}: ok ({} override rules)",
                path.display(),
                snapshot.rules().len()
            );
            Ok(())
        }
        Command::DefaultConfig => {
            println!("{}", EngineConfig::default().to_json_pretty()?);
            Ok(())
        }
    }
}

fn run_review(
    request_path: &Path,
    config_path: Option<&Path>,
    compact: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let snapshot = match config_path {
        Some(path) => ConfigSnapshot::build(EngineConfig::from_path(path)?, 1)?,
        None => ConfigSnapshot::default(),
    };

    let raw = std::fs::read_to_string(request_path)?;
    let request: ReviewRequest = serde_json::from_str(&raw)?;
    info!(path = %request_path.display(), "reviewing");

    let outcome = review(&request, &snapshot)?;
    let json = if compact {
        serde_json::to_string(&outcome)?
    } else {
        serde_json::to_string_pretty(&outcome)?
    };
    println!("{}", json);
    Ok(())
}

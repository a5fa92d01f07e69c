//! Rewind CLI - Tools for inspecting reduce replay logs

mod inspect;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use rewind_core::config::RewindConfig;

use crate::inspect::{InspectOptions, KeyType, ValueType};

#[derive(Parser)]
#[command(name = "rewind")]
#[command(about = "Deterministic reduce replay tools", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode a binary replay log
    Inspect {
        /// Replay log to read
        log: PathBuf,

        /// Key type the log was recorded with
        #[arg(long, value_enum)]
        key_type: KeyType,

        /// Value type the log was recorded with
        #[arg(long, value_enum)]
        value_type: ValueType,

        /// Print keys only
        #[arg(long)]
        keys_only: bool,

        /// Print a JSON summary of keys and value counts
        #[arg(long)]
        json: bool,

        /// Stop after this many records
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Print the effective configuration
    Config {
        /// Read this TOML file instead of the default sources
        #[arg(long, env = "REWIND_CONFIG_FILE")]
        file: Option<PathBuf>,
    },
    /// Version information
    Version,
}

fn main() -> Result<()> {
    // Logs go to stderr so inspect output stays clean
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Inspect {
            log,
            key_type,
            value_type,
            keys_only,
            json,
            limit,
        } => {
            let options = InspectOptions {
                keys_only,
                json,
                limit,
            };
            let mut out = std::io::stdout().lock();
            let summary = inspect::run(&log, key_type, value_type, &options, &mut out)?;
            if !json {
                tracing::info!(
                    records = summary.records,
                    values = summary.values,
                    "{}",
                    log.display()
                );
            }
        }
        Commands::Config { file } => {
            let config = match file {
                Some(path) => RewindConfig::from_file(path)?,
                None => RewindConfig::load()?,
            };
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        Commands::Version => {
            println!("rewind {}", env!("CARGO_PKG_VERSION"));
            println!("rewind-core {}", rewind_core::VERSION);
            println!("target {}", rewind_core::BUILD_TARGET);
            println!("log layout {}", rewind_core::LOG_LAYOUT);
        }
    }

    Ok(())
}

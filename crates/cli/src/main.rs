//! Scrivener CLI — the main entry point.
//!
//! Commands:
//! - `refine`  — Run the configured stages over a document or a JSON batch
//! - `memory`  — Inspect or reset a stored memory record
//! - `config`  — Show the effective configuration or write a starter file

use clap::{Parser, Subcommand};
use scrivener_config::ResultFormat;
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(
    name = "scrivener",
    about = "Scrivener — multi-stage, memory-aware refinement of long documents",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging (and per-stage outputs for `refine`)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    /// Config file (default: ~/.scrivener/config.toml)
    #[arg(short, long, global = true, env = "SCRIVENER_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Refine a text file, or a JSON object / array of objects
    Refine {
        /// Input file (.json for structured input, anything else is plain text)
        input: PathBuf,

        /// Write the result here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output format: txt or json
        #[arg(short, long)]
        format: Option<ResultFormat>,

        /// Memory key for documents that do not carry their own
        #[arg(long)]
        memory_key: Option<String>,
    },

    /// Manage stored memory records
    Memory {
        #[command(subcommand)]
        action: MemoryAction,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum MemoryAction {
    /// Print the record for a key
    Show { key: String },
    /// Delete the record for a key
    Reset { key: String },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration (secrets redacted)
    Show,
    /// Write a starter config file if none exists
    Init,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Logs go to stderr; stdout is reserved for results.
    let level = if cli.verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));
    if cli.log_json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    }

    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Refine {
            input,
            output,
            format,
            memory_key,
        } => {
            commands::refine::run(commands::refine::RefineArgs {
                config_path,
                input,
                output,
                format,
                memory_key,
                verbose: cli.verbose,
            })
            .await?
        }
        Commands::Memory { action } => match action {
            MemoryAction::Show { key } => commands::memory::show(config_path, &key).await?,
            MemoryAction::Reset { key } => commands::memory::reset(config_path, &key).await?,
        },
        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config_cmd::show(config_path).await?,
            ConfigAction::Init => commands::config_cmd::init(config_path).await?,
        },
    }

    Ok(())
}

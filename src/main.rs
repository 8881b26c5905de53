//! Signal executor CLI
//!
//! Command-line interface for submitting trade signals and inspecting the
//! executor's view of tokens, networks and transactions.

use clap::{Parser, Subcommand};
use serde::Serialize;
use signal_executor::signal::TradeSignal;
use signal_executor::{Config, Error, ExecutorRuntime, Result};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "signal-executor")]
#[command(about = "Risk-gated DEX swap executor for trade signals")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config file (JSON)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one signal through the pipeline
    Submit {
        /// Signal as inline JSON
        #[arg(conflicts_with = "file")]
        signal: Option<String>,

        /// Read the signal from a JSON file
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Resolve a token symbol or address
    Resolve {
        /// Symbol (e.g. USDT) or address
        token: String,
    },

    /// Show the network profile a name resolves to
    Network {
        /// Network name (defaults to network_mode)
        name: Option<String>,
    },

    /// Check a transaction's confirmation status
    Monitor {
        /// Transaction hash
        tx_hash: String,

        /// Network name (defaults to network_mode)
        #[arg(short, long)]
        network: Option<String>,
    },

    /// Show current configuration
    Config,
}

fn init_logging(verbose: bool, json: bool) {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (ignore if not found)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_logging(cli.verbose, cli.json);

    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::from_env()?,
    };

    match cli.command {
        Commands::Submit { signal, file } => {
            let raw = match (signal, file) {
                (Some(inline), _) => inline,
                (None, Some(path)) => std::fs::read_to_string(&path)?,
                (None, None) => {
                    return Err(Error::InvalidArgument(
                        "provide a signal as inline JSON or with --file".to_string(),
                    ))
                }
            };
            let signal: TradeSignal = serde_json::from_str(&raw)?;
            let runtime = ExecutorRuntime::new(config)?;
            let outcome = runtime.submit(signal).await;
            print_json(&outcome)?;
        }
        Commands::Resolve { token } => {
            let runtime = ExecutorRuntime::new(config)?;
            let resolution = runtime.engine().resolve_token(&token);
            print_json(&serde_json::json!({
                "input": token,
                "resolved": resolution.address().map(|a| a.to_checksum(None)),
                "native": runtime.tokens().is_native(&token),
            }))?;
        }
        Commands::Network { name } => {
            let network = config.select_network(name.as_deref()).ok_or_else(|| {
                Error::Config("no matching network profile and no testnet fallback".to_string())
            })?;
            print_json(&network)?;
        }
        Commands::Monitor { tx_hash, network } => {
            let runtime = ExecutorRuntime::new(config)?;
            let result = runtime.monitor().monitor(&tx_hash, network.as_deref()).await;
            print_json(&result)?;
        }
        Commands::Config => {
            print_json(&config)?;
        }
    }

    Ok(())
}

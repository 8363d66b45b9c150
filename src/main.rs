// SMS Gateway - Main Entry Point
//
// Runs the HTTP gateway:
// - Message submission and retrieval for client applications
// - Admin API for application registration and quotas
// - Prometheus metrics and health endpoints

use anyhow::Result;
use clap::{Parser, Subcommand};
use sms_gateway::{config::Config, logging, server};
use std::path::PathBuf;
use tracing::info;

/// SMS Gateway: quota-enforcing SMS submission service
#[derive(Parser, Debug)]
#[command(name = "sms-gateway")]
#[command(author = "SMS Gateway Contributors")]
#[command(version)]
#[command(about = "Quota-enforcing SMS submission gateway", long_about = None)]
struct Args {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Path to the configuration file (default: XDG config dir)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Command to run
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the HTTP gateway
    Serve {
        /// Port to listen on (overrides the config file)
        #[arg(long)]
        port: Option<u16>,
    },
    /// Validate the configuration and print it
    CheckConfig,
}

fn load_config(path: Option<&PathBuf>) -> Result<Config> {
    match path {
        Some(path) => Config::load_from_path(path),
        None => Config::load(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse();

    let mut config = load_config(args.config.as_ref())?;

    // Initialize tracing
    logging::init(&config, args.verbose)?;

    match args.command {
        Some(Commands::Serve { port }) => {
            if let Some(port) = port {
                config.server.port = port;
                config.validate()?;
            }
            info!("SMS gateway v{} starting...", env!("CARGO_PKG_VERSION"));
            server::serve(config).await?;
        }
        Some(Commands::CheckConfig) => {
            print!("{}", config.to_redacted_toml()?);
        }
        None => {
            info!("No command specified. Use \"sms-gateway --help\" for usage.");
        }
    }

    Ok(())
}

// Copyright (c) 2024 Furchill

use anyhow::Result;
use clap::{Parser, Subcommand};
use fur_token_types::Network;
use std::path::PathBuf;

use launchpad::{commands, config, telemetry};

#[derive(Parser)]
#[command(name = "launchpad")]
#[command(about = "Taxed-token issuance factory and ledger service", long_about = None)]
struct Cli {
    /// Network whose address format to use
    #[arg(long, global = true, default_value = "sepolia")]
    network: Network,

    /// Path to config file (default: ~/.furchill/{network}/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default service config
    Init {
        /// Factory owner address
        #[arg(long)]
        owner: String,

        /// Deployment fee in native units (default: 0.01)
        #[arg(long)]
        fee: Option<String>,
    },

    /// Run the JSON-RPC service
    Run,

    /// Check a token configuration file without issuing anything
    Validate {
        /// TOML token configuration
        file: PathBuf,
    },

    /// Show factory and ledger status
    Status,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let network = cli.network;

    if network.is_production() {
        eprintln!(
            "[{}] Production network - fees have real value!",
            network.display_name()
        );
    }

    let config_path = match cli.config {
        Some(path) => path,
        None => config::default_config_path(network)?,
    };

    // `run` sets up tracing itself once its runtime exists
    if !matches!(cli.command, Commands::Run) {
        telemetry::init_tracing(&telemetry::TelemetryConfig::default(), cli.verbose)?;
    }

    match cli.command {
        Commands::Init { owner, fee } => {
            commands::init::run(&config_path, network, &owner, fee.as_deref())
        }
        Commands::Run => commands::run::run(&config_path, cli.verbose),
        Commands::Validate { file } => {
            if commands::validate::run(&config_path, network, &file)? {
                Ok(())
            } else {
                std::process::exit(1)
            }
        }
        Commands::Status => commands::status::run(&config_path),
    }
}

// Copyright (c) 2024 Furchill

use anyhow::{anyhow, bail, Result};
use fur_token_types::Network;
use std::path::Path;
use tracing::info;

use crate::config::{ledger_path_from_config, Config};

/// Run the init command
pub fn run(config_path: &Path, network: Network, owner: &str, fee: Option<&str>) -> Result<()> {
    if Config::exists(config_path) {
        bail!(
            "Config already exists at {}\nUse a different --config path or delete the existing config.",
            config_path.display()
        );
    }

    let codec = network.address_codec();
    let owner = codec
        .parse(owner)
        .map_err(|e| anyhow!("Invalid --owner for {}: {}", network.display_name(), e))?;

    let mut config = Config::new(network, codec.format(&owner));
    if let Some(fee) = fee {
        config.factory.deployment_fee = fee.to_string();
    }

    // Resolve once so a bad fee never reaches disk
    let settings = config.factory_settings()?;
    config.save(config_path)?;

    info!("Launchpad initialized at {}", config_path.display());
    println!("\n[{}] Launchpad configuration created.", network.display_name());
    println!("Config saved to: {}", config_path.display());
    println!("  Owner:           {}", codec.format(&settings.owner));
    println!("  Factory address: {}", codec.format(&settings.address));
    println!("  Deployment fee:  {} (native units)", config.factory.deployment_fee);
    println!(
        "  Ledger journal:  {}",
        ledger_path_from_config(config_path).display()
    );
    println!("\nNext steps:");
    println!("  1. Review the [factory] and [rpc] sections of the config");
    println!("     (set rpc.admin_api_key to enable owner-only RPC methods)");
    println!("  2. Run 'launchpad run' to start the service");
    if !network.is_production() {
        println!("\nNote: This is a test network configuration.");
    }

    Ok(())
}

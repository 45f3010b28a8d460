// Copyright (c) 2024 Furchill

use anyhow::{Context, Result};
use fur_token_types::{constants::NATIVE_DECIMALS, format_units};
use std::path::Path;

use crate::config::{ledger_path_from_config, Config};
use crate::ledger::Ledger;

/// Show factory and ledger status
pub fn run(config_path: &Path) -> Result<()> {
    let config =
        Config::load(config_path).context("No config found. Run 'launchpad init' first.")?;

    let settings = config.factory_settings()?;
    let ledger_path = ledger_path_from_config(config_path);
    let ledger = Ledger::open(&ledger_path, settings)
        .with_context(|| format!("Failed to open ledger at {}", ledger_path.display()))?;

    let network = config.network;
    let codec = network.address_codec();
    let registry = ledger.registry();

    println!();
    println!("=== Launchpad Status ===");
    println!();
    println!("Factory:");
    println!("  Network: {}", network.display_name());
    println!("  Address: {}", codec.format(&registry.address()));
    println!("  Owner: {}", codec.format(&registry.owner()));
    println!(
        "  Deployment fee: {}",
        format_units(registry.deployment_fee(), NATIVE_DECIMALS)
    );
    println!(
        "  Accumulated fees: {}",
        format_units(registry.accumulated_fees(), NATIVE_DECIMALS)
    );
    println!(
        "  Allocation policy: {}",
        registry.rules().allocation_policy.as_str()
    );
    println!();
    println!("Ledger:");
    println!(
        "  Journal: {} ({} bytes)",
        ledger_path.display(),
        ledger.journal_size()
    );
    println!("  Operations: {}", ledger.journal_len());
    println!("  Tokens: {}", registry.token_count());
    println!("  Pools: {}", registry.pools().len());

    if registry.token_count() > 0 {
        println!();
        println!("Tokens:");
        for token in registry.tokens() {
            println!(
                "  {} {:<10} buy {}bps / sell {}bps, {} holders",
                codec.format(&token.address()),
                token.symbol(),
                token.buy_tax(),
                token.sell_tax(),
                token.holder_count()
            );
        }
    }
    println!();
    println!("RPC:");
    println!("  Port: {}", config.rpc.port);
    println!(
        "  Admin key: {}",
        if config.rpc.admin_api_key.is_some() {
            "configured"
        } else {
            "not set (owner methods disabled)"
        }
    );

    Ok(())
}

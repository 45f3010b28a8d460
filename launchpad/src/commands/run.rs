// Copyright (c) 2024 Furchill

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::config::{ledger_path_from_config, Config};
use crate::ledger::Ledger;
use crate::rpc::{start_rpc_server, RpcState, WsBroadcaster};
use crate::telemetry::init_tracing;

/// Run the launchpad service
pub fn run(config_path: &Path, verbose: bool) -> Result<()> {
    let config =
        Config::load(config_path).context("No config found. Run 'launchpad init' first.")?;

    println!("Launchpad service starting. Press Ctrl+C to stop.");

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async { run_async(config, config_path, verbose).await })
}

async fn run_async(config: Config, config_path: &Path, verbose: bool) -> Result<()> {
    // OTLP export needs the runtime, so tracing starts here
    let _telemetry = init_tracing(&config.telemetry, verbose)?;

    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_clone = shutdown.clone();
    ctrlc::set_handler(move || {
        shutdown_clone.store(true, Ordering::SeqCst);
    })?;

    let settings = config.factory_settings()?;
    let ledger_path = ledger_path_from_config(config_path);
    let ledger = Ledger::open(&ledger_path, settings)
        .with_context(|| format!("Failed to open ledger at {}", ledger_path.display()))?;

    let network = config.network;
    let codec = network.address_codec();
    {
        let registry = ledger.registry();
        info!(
            network = %network.display_name(),
            owner = %codec.format(&registry.owner()),
            factory = %codec.format(&registry.address()),
            tokens = registry.token_count(),
            "Launchpad ledger ready"
        );
    }

    if config.rpc.admin_api_key.is_none() {
        warn!("No rpc.admin_api_key configured; owner-only RPC methods are disabled");
    }

    let broadcaster = Arc::new(WsBroadcaster::new(config.rpc.event_capacity));
    let state = Arc::new(
        RpcState::new(
            ledger,
            network,
            config.rpc.cors_origins.clone(),
            config.rpc.admin_api_key.clone(),
            broadcaster,
        )
        .context("Failed to create metrics registry")?,
    );

    let addr = SocketAddr::from(([0, 0, 0, 0], config.rpc.port));
    let server = tokio::spawn(async move {
        if let Err(e) = start_rpc_server(addr, state).await {
            error!("RPC server error: {}", e);
        }
    });

    while !shutdown.load(Ordering::SeqCst) {
        if server.is_finished() {
            anyhow::bail!("RPC server stopped unexpectedly");
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    info!("Shutting down");
    server.abort();
    Ok(())
}

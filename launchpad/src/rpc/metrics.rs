// Copyright (c) 2024 Furchill

//! Observability endpoints for the launchpad service
//!
//! ## Metrics Exported
//!
//! - `launchpad_tokens` - Tokens issued so far (gauge)
//! - `launchpad_accumulated_fees` - Unwithdrawn issuance fees, smallest units (gauge)
//! - `launchpad_journal_records` - Operations in the ledger journal (gauge)
//! - `launchpad_tokens_created_total` - Tokens created by this process (counter)
//! - `launchpad_transfers_total` - Committed transfers by kind (counter)
//! - `launchpad_rpc_requests_total` - RPC requests by method (counter)
//! - `launchpad_rpc_errors_total` - RPC errors by method (counter)

use prometheus::{Encoder, Gauge, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use serde::Serialize;

use super::RpcState;
use crate::registry::LaunchpadEvent;

/// Prometheus metrics for one RPC server instance
pub struct LaunchpadMetrics {
    registry: Registry,
    pub tokens: IntGauge,
    pub accumulated_fees: Gauge,
    pub journal_records: IntGauge,
    pub tokens_created_total: IntCounter,
    /// Labelled by transfer kind
    pub transfers_total: IntCounterVec,
    pub rpc_requests_total: IntCounterVec,
    pub rpc_errors_total: IntCounterVec,
}

impl LaunchpadMetrics {
    /// Create a new metrics registry with all metrics registered
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();

        let tokens = IntGauge::with_opts(Opts::new("launchpad_tokens", "Tokens issued so far"))?;
        let accumulated_fees = Gauge::with_opts(Opts::new(
            "launchpad_accumulated_fees",
            "Unwithdrawn issuance fees in smallest native units",
        ))?;
        let journal_records = IntGauge::with_opts(Opts::new(
            "launchpad_journal_records",
            "Operations in the ledger journal",
        ))?;
        let tokens_created_total = IntCounter::with_opts(Opts::new(
            "launchpad_tokens_created_total",
            "Tokens created by this process",
        ))?;
        let transfers_total = IntCounterVec::new(
            Opts::new("launchpad_transfers_total", "Committed token transfers"),
            &["kind"],
        )?;
        let rpc_requests_total = IntCounterVec::new(
            Opts::new("launchpad_rpc_requests_total", "Total RPC requests"),
            &["method"],
        )?;
        let rpc_errors_total = IntCounterVec::new(
            Opts::new("launchpad_rpc_errors_total", "Total RPC errors"),
            &["method"],
        )?;

        registry.register(Box::new(tokens.clone()))?;
        registry.register(Box::new(accumulated_fees.clone()))?;
        registry.register(Box::new(journal_records.clone()))?;
        registry.register(Box::new(tokens_created_total.clone()))?;
        registry.register(Box::new(transfers_total.clone()))?;
        registry.register(Box::new(rpc_requests_total.clone()))?;
        registry.register(Box::new(rpc_errors_total.clone()))?;

        Ok(Self {
            registry,
            tokens,
            accumulated_fees,
            journal_records,
            tokens_created_total,
            transfers_total,
            rpc_requests_total,
            rpc_errors_total,
        })
    }

    pub fn record_request(&self, method: &str) {
        self.rpc_requests_total.with_label_values(&[method]).inc();
    }

    pub fn record_error(&self, method: &str) {
        self.rpc_errors_total.with_label_values(&[method]).inc();
    }

    /// Count committed events
    pub fn record_events(&self, events: &[LaunchpadEvent]) {
        for event in events {
            match event {
                LaunchpadEvent::TokenCreated { .. } => self.tokens_created_total.inc(),
                LaunchpadEvent::Transfer { kind, .. } => {
                    self.transfers_total.with_label_values(&[kind.as_str()]).inc()
                }
                _ => {}
            }
        }
    }

    /// Update gauges from current state
    pub fn update_from_state(&self, state: &RpcState) {
        if let Ok(ledger) = state.ledger.read() {
            let registry = ledger.registry();
            self.tokens.set(registry.token_count() as i64);
            self.accumulated_fees.set(registry.accumulated_fees() as f64);
            self.journal_records.set(ledger.journal_len() as i64);
        }
    }

    /// Encode metrics in Prometheus text format
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

/// Health status of the service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

impl HealthStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            HealthStatus::Healthy => "healthy",
            HealthStatus::Unhealthy => "unhealthy",
        }
    }
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub uptime_seconds: u64,
    pub network: &'static str,
    pub tokens: usize,
}

/// Check the health of the service
///
/// A poisoned ledger lock means a writer panicked mid-update; the service
/// then reports itself unhealthy.
pub fn check_health(state: &RpcState) -> HealthResponse {
    let (status, tokens) = match state.ledger.read() {
        Ok(ledger) => (HealthStatus::Healthy, ledger.registry().token_count()),
        Err(_) => (HealthStatus::Unhealthy, 0),
    };

    HealthResponse {
        status,
        uptime_seconds: state.start_time.elapsed().as_secs(),
        network: state.network.as_str(),
        tokens,
    }
}

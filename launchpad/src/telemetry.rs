// Copyright (c) 2024 Furchill

//! Log output and optional OpenTelemetry trace export.
//!
//! ```toml
//! [telemetry]
//! enabled = true
//! endpoint = "http://localhost:4317"  # OTLP gRPC endpoint
//! service_name = "furchill-launchpad"
//! sampling_rate = 0.1
//! ```
//!
//! `RUST_LOG` overrides the level chosen by `--verbose`.

use anyhow::{Context, Result};
use opentelemetry::KeyValue;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{
    runtime,
    trace::{RandomIdGenerator, Sampler, Tracer},
    Resource,
};
use serde::{Deserialize, Serialize};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Telemetry configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryConfig {
    #[serde(default)]
    pub enabled: bool,
    /// OTLP endpoint (gRPC)
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_service_name")]
    pub service_name: String,
    /// Sampling rate (0.0 to 1.0)
    #[serde(default = "default_sampling_rate")]
    pub sampling_rate: f64,
}

fn default_endpoint() -> String {
    "http://localhost:4317".to_string()
}

fn default_service_name() -> String {
    "furchill-launchpad".to_string()
}

fn default_sampling_rate() -> f64 {
    1.0
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: default_endpoint(),
            service_name: default_service_name(),
            sampling_rate: default_sampling_rate(),
        }
    }
}

/// Initialize the tracing subscriber with optional OpenTelemetry export.
///
/// Returns a guard that must be held for the duration of the program; it
/// flushes pending traces when dropped. OTLP export needs a Tokio runtime.
pub fn init_tracing(config: &TelemetryConfig, verbose: bool) -> Result<Option<TelemetryGuard>> {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_filter(filter);

    if config.enabled {
        let tracer = init_otlp_tracer(config)?;
        let telemetry_layer = tracing_opentelemetry::layer().with_tracer(tracer);

        tracing_subscriber::registry()
            .with(fmt_layer)
            .with(telemetry_layer)
            .try_init()
            .context("Failed to install tracing subscriber")?;

        tracing::info!(
            endpoint = %config.endpoint,
            service = %config.service_name,
            sampling_rate = config.sampling_rate,
            "OpenTelemetry tracing enabled"
        );

        Ok(Some(TelemetryGuard))
    } else {
        tracing_subscriber::registry()
            .with(fmt_layer)
            .try_init()
            .context("Failed to install tracing subscriber")?;

        Ok(None)
    }
}

fn init_otlp_tracer(config: &TelemetryConfig) -> Result<Tracer> {
    let exporter = opentelemetry_otlp::new_exporter()
        .tonic()
        .with_endpoint(config.endpoint.clone());

    let sampler = if config.sampling_rate >= 1.0 {
        Sampler::AlwaysOn
    } else if config.sampling_rate <= 0.0 {
        Sampler::AlwaysOff
    } else {
        Sampler::TraceIdRatioBased(config.sampling_rate)
    };

    opentelemetry_otlp::new_pipeline()
        .tracing()
        .with_exporter(exporter)
        .with_trace_config(
            opentelemetry_sdk::trace::config()
                .with_sampler(sampler)
                .with_id_generator(RandomIdGenerator::default())
                .with_resource(Resource::new(vec![
                    KeyValue::new("service.name", config.service_name.clone()),
                    KeyValue::new("service.version", env!("CARGO_PKG_VERSION")),
                ])),
        )
        .install_batch(runtime::Tokio)
        .context("Failed to install OTLP tracer")
}

/// Flushes pending traces to the collector when dropped.
pub struct TelemetryGuard;

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        opentelemetry::global::shutdown_tracer_provider();
    }
}

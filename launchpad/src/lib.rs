// Copyright (c) 2024 Furchill

//! Furchill launchpad service.
//!
//! An issuance factory for taxed tokens, kept as an off-chain ledger: every
//! operation is checked against the registry, appended to a durable
//! journal, applied, and announced to WebSocket subscribers. Clients talk to
//! it over JSON-RPC.

#![deny(clippy::print_stdout)]

pub mod config;
pub mod ledger;
pub mod registry;
pub mod rpc;
pub mod telemetry;

// Re-export commands module for CLI binary
#[allow(clippy::print_stdout)]
pub mod commands;

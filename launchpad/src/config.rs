// Copyright (c) 2024 Furchill

use anyhow::{anyhow, Context, Result};
use fur_taxed_token::{AllocationPolicy, ValidationRules};
use fur_token_types::{
    constants::{DEFAULT_MAX_ADDITIONAL_WALLETS, NATIVE_DECIMALS},
    parse_units, Address, Network,
};
use serde::{Deserialize, Serialize};
use sha3::{Digest, Keccak256};
use std::fs;
use std::path::{Path, PathBuf};

use crate::registry::FactorySettings;
use crate::telemetry::TelemetryConfig;

/// Main configuration for the launchpad service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Network whose address format the service speaks
    #[serde(default)]
    pub network: Network,
    pub factory: FactoryConfig,
    #[serde(default)]
    pub rpc: RpcConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FactoryConfig {
    /// Initial factory owner, in the network's address format
    pub owner: String,

    /// Factory address used to derive token handles.
    /// Derived from the owner when not set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,

    /// Initial issuance fee in whole native units (e.g. "0.01")
    #[serde(default = "default_deployment_fee")]
    pub deployment_fee: String,

    #[serde(default)]
    pub allocation_policy: AllocationPolicy,

    #[serde(default = "default_max_additional_wallets")]
    pub max_additional_wallets: usize,
}

fn default_deployment_fee() -> String {
    "0.01".to_string()
}

fn default_max_additional_wallets() -> usize {
    DEFAULT_MAX_ADDITIONAL_WALLETS
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcConfig {
    /// Port for the JSON-RPC server
    #[serde(default = "default_rpc_port")]
    pub port: u16,

    /// Allowed CORS origins.
    /// Use ["*"] to allow all origins (not recommended for production).
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,

    /// Required in the X-API-Key header for owner-only methods
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_api_key: Option<String>,

    /// Events buffered per WebSocket subscriber before it starts lagging
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

fn default_rpc_port() -> u16 {
    7301
}

fn default_cors_origins() -> Vec<String> {
    vec![
        "http://localhost".to_string(),
        "http://127.0.0.1".to_string(),
    ]
}

fn default_event_capacity() -> usize {
    1024
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            port: default_rpc_port(),
            cors_origins: default_cors_origins(),
            admin_api_key: None,
            event_capacity: default_event_capacity(),
        }
    }
}

impl Config {
    /// Create a config for `network` owned by `owner`
    pub fn new(network: Network, owner: String) -> Self {
        Self {
            network,
            factory: FactoryConfig {
                owner,
                address: None,
                deployment_fee: default_deployment_fee(),
                allocation_policy: AllocationPolicy::default(),
                max_additional_wallets: default_max_additional_wallets(),
            },
            rpc: RpcConfig::default(),
            telemetry: TelemetryConfig::default(),
        }
    }

    /// Load config from a file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config from {}", path.display()))
    }

    /// Save config to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(path, contents)
            .with_context(|| format!("Failed to write config to {}", path.display()))?;

        // The file may hold the admin API key
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = fs::Permissions::from_mode(0o600);
            fs::set_permissions(path, perms)
                .with_context(|| format!("Failed to set permissions on {}", path.display()))?;
        }

        Ok(())
    }

    /// Check if config file exists
    pub fn exists(path: &Path) -> bool {
        path.exists()
    }

    /// Issuance fee in smallest native units
    pub fn deployment_fee(&self) -> Result<u128> {
        parse_units(&self.factory.deployment_fee, NATIVE_DECIMALS).with_context(|| {
            format!(
                "Invalid factory.deployment_fee {:?}",
                self.factory.deployment_fee
            )
        })
    }

    pub fn validation_rules(&self) -> ValidationRules {
        ValidationRules::new(self.network)
            .with_allocation_policy(self.factory.allocation_policy)
            .with_max_additional_wallets(self.factory.max_additional_wallets)
    }

    /// Resolve the factory section into registry settings
    pub fn factory_settings(&self) -> Result<FactorySettings> {
        let codec = self.network.address_codec();

        let owner = codec
            .parse(&self.factory.owner)
            .map_err(|e| anyhow!("Invalid factory.owner: {}", e))?;

        let address = match &self.factory.address {
            Some(s) => codec
                .parse(s)
                .map_err(|e| anyhow!("Invalid factory.address: {}", e))?,
            None => derive_factory_address(&owner),
        };

        Ok(FactorySettings {
            address,
            owner,
            deployment_fee: self.deployment_fee()?,
            rules: self.validation_rules(),
        })
    }
}

/// Factory address for an owner that did not configure one
pub fn derive_factory_address(owner: &Address) -> Address {
    let mut hasher = Keccak256::new();
    hasher.update(b"furchill-launchpad-factory");
    hasher.update(owner.as_bytes());
    let hash = hasher.finalize();

    let mut bytes = [0u8; 20];
    bytes.copy_from_slice(&hash[12..32]);
    Address::new(bytes)
}

/// Get the default data directory
pub fn default_data_dir() -> Result<PathBuf> {
    dirs::home_dir()
        .map(|home| home.join(".furchill"))
        .ok_or_else(|| anyhow!("Could not determine home directory"))
}

/// Default config file path for a network
pub fn default_config_path(network: Network) -> Result<PathBuf> {
    Ok(default_data_dir()?
        .join(network.as_str())
        .join("config.toml"))
}

/// Get the ledger journal path from config file path
pub fn ledger_path_from_config(config_path: &Path) -> PathBuf {
    config_path
        .parent()
        .unwrap_or(config_path)
        .join("ledger.journal")
}

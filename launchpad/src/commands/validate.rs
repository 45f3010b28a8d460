// Copyright (c) 2024 Furchill

use anyhow::{Context, Result};
use fur_taxed_token::{remaining_allocation_bps, validate, ValidationResult, ValidationRules};
use fur_token_types::{Network, TokenConfig};
use std::fs;
use std::path::Path;

use crate::config::Config;

/// Check a token configuration file offline.
///
/// Uses the rules of the service config when one exists, otherwise the
/// defaults for `network`. Returns whether the configuration is valid.
pub fn run(config_path: &Path, network: Network, file: &Path) -> Result<bool> {
    let contents = fs::read_to_string(file)
        .with_context(|| format!("Failed to read token config from {}", file.display()))?;
    let token: TokenConfig = toml::from_str(&contents)
        .with_context(|| format!("Failed to parse token config from {}", file.display()))?;

    let rules = if Config::exists(config_path) {
        Config::load(config_path)?.validation_rules()
    } else {
        ValidationRules::new(network)
    };

    let remaining = remaining_allocation_bps(&token);

    match validate(&token, &rules) {
        ValidationResult::Valid(params) => {
            println!("{} ({}) is valid.", params.name, params.symbol);
            println!("  Network: {}", rules.network.display_name());
            println!("  Allocated: {} bps", params.allocated_bps());
            println!("  Unallocated: {} bps", remaining);
            if params.creator_share > 0 {
                println!("  Creator share: {} bps", params.creator_share);
            }
            Ok(true)
        }
        ValidationResult::Invalid(errors) => {
            println!("Token configuration is invalid:");
            for error in &errors {
                println!("  {}: {}", error.field(), error);
            }
            Ok(false)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_validate_file() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.toml");
        let good = dir.path().join("good.toml");
        let bad = dir.path().join("bad.toml");

        fs::write(
            &good,
            r#"
name = "Test"
symbol = "TEST"
total_supply = "1000000"
buy_tax = 500
sell_tax = 500
lp_percentage = 8000
marketing_wallet = "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed"
marketing_percentage = 200
"#,
        )
        .unwrap();
        fs::write(
            &bad,
            r#"
name = "Test"
symbol = "TEST"
total_supply = "1000000"
buy_tax = 2600
lp_percentage = 8000
marketing_wallet = "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed"
"#,
        )
        .unwrap();

        assert!(run(&config_path, Network::Sepolia, &good).unwrap());
        assert!(!run(&config_path, Network::Sepolia, &bad).unwrap());
        assert!(run(&config_path, Network::Sepolia, &dir.path().join("missing.toml")).is_err());
    }
}

// Copyright (c) 2024 Furchill

//! Token configuration validation.
//!
//! Validation is pure and checks every rule independently, so a client gets
//! the full list of problems in one pass. The same function backs the
//! advisory check offered to clients and the authoritative check the
//! issuance registry runs before minting.

use fur_token_types::{
    constants::{
        BPS_DENOMINATOR, DEFAULT_MAX_ADDITIONAL_WALLETS, MAX_LP_BPS, MAX_MARKETING_BPS,
        MAX_SYMBOL_LEN, MAX_TAX_BPS, MAX_WALLET_BPS, MIN_LP_BPS,
    },
    Address, AddressError, BasisPoints, Network, TokenConfig,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// How shares that do not add up to 100% are treated.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AllocationPolicy {
    /// The sum may stay below 100%; the tax is split among the configured
    /// shares in proportion to their size.
    #[default]
    Headroom,
    /// The sum must be exactly 100%.
    Exact,
    /// The unallocated share becomes a tax share paid to the token creator.
    RemainderToCreator,
}

impl AllocationPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            AllocationPolicy::Headroom => "headroom",
            AllocationPolicy::Exact => "exact",
            AllocationPolicy::RemainderToCreator => "remainder-to-creator",
        }
    }
}

/// The parameters a configuration is checked against.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ValidationRules {
    /// Selects the address format
    pub network: Network,
    pub allocation_policy: AllocationPolicy,
    pub max_additional_wallets: usize,
}

impl ValidationRules {
    pub fn new(network: Network) -> Self {
        Self {
            network,
            ..Self::default()
        }
    }

    pub fn with_allocation_policy(mut self, policy: AllocationPolicy) -> Self {
        self.allocation_policy = policy;
        self
    }

    pub fn with_max_additional_wallets(mut self, max: usize) -> Self {
        self.max_additional_wallets = max;
        self
    }
}

impl Default for ValidationRules {
    fn default() -> Self {
        Self {
            network: Network::default(),
            allocation_policy: AllocationPolicy::default(),
            max_additional_wallets: DEFAULT_MAX_ADDITIONAL_WALLETS,
        }
    }
}

/// One violated rule.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum FieldError {
    #[error("Token name is required")]
    NameRequired,

    #[error("Token symbol is required")]
    SymbolRequired,

    #[error("Symbol must be 10 characters or less")]
    SymbolTooLong { length: usize },

    #[error("Total supply must be greater than zero")]
    ZeroSupply,

    #[error("Buy tax cannot exceed 25%")]
    BuyTaxTooHigh { value: BasisPoints },

    #[error("Sell tax cannot exceed 25%")]
    SellTaxTooHigh { value: BasisPoints },

    #[error("LP percentage must be between 50% and 95%")]
    LpOutOfRange { value: BasisPoints },

    #[error("Marketing percentage cannot exceed 10%")]
    MarketingTooHigh { value: BasisPoints },

    #[error("{source}")]
    InvalidMarketingWallet { source: AddressError },

    #[error("Too many additional wallets: at most {max} allowed, got {actual}")]
    TooManyWallets { max: usize, actual: usize },

    #[error("Percentage cannot exceed 20%")]
    WalletPercentageTooHigh { index: usize, value: BasisPoints },

    #[error("{source}")]
    InvalidWalletAddress { index: usize, source: AddressError },

    #[error("Total allocation cannot exceed 100% (got {allocated} bps)")]
    OverAllocated { allocated: u32 },

    #[error("Total allocation must equal 100% (got {allocated} bps)")]
    NotFullyAllocated { allocated: u32 },
}

impl FieldError {
    /// Name of the offending field, as submitted by the client.
    pub fn field(&self) -> String {
        match self {
            FieldError::NameRequired => "name".into(),
            FieldError::SymbolRequired | FieldError::SymbolTooLong { .. } => "symbol".into(),
            FieldError::ZeroSupply => "total_supply".into(),
            FieldError::BuyTaxTooHigh { .. } => "buy_tax".into(),
            FieldError::SellTaxTooHigh { .. } => "sell_tax".into(),
            FieldError::LpOutOfRange { .. } => "lp_percentage".into(),
            FieldError::MarketingTooHigh { .. } => "marketing_percentage".into(),
            FieldError::InvalidMarketingWallet { .. } => "marketing_wallet".into(),
            FieldError::TooManyWallets { .. } => "additional_wallets".into(),
            FieldError::WalletPercentageTooHigh { index, .. } => {
                format!("additional_wallets[{index}].percentage")
            }
            FieldError::InvalidWalletAddress { index, .. } => {
                format!("additional_wallets[{index}].address")
            }
            FieldError::OverAllocated { .. } | FieldError::NotFullyAllocated { .. } => {
                "allocation".into()
            }
        }
    }
}

/// A recipient of part of every tax.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletShare {
    pub address: Address,
    pub percentage: BasisPoints,
}

/// A configuration that passed validation, with addresses decoded.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenParams {
    pub name: String,
    pub symbol: String,
    #[serde(with = "fur_token_types::amount")]
    pub total_supply: u128,
    pub buy_tax: BasisPoints,
    pub sell_tax: BasisPoints,
    pub lp_percentage: BasisPoints,
    pub marketing_wallet: Address,
    pub marketing_percentage: BasisPoints,
    pub additional_wallets: Vec<WalletShare>,
    /// Tax share paid to the creator; non-zero only under
    /// [`AllocationPolicy::RemainderToCreator`].
    pub creator_share: BasisPoints,
}

impl TokenParams {
    /// Sum of all wallet shares, LP excluded.
    pub fn eligible_bps(&self) -> u32 {
        self.marketing_percentage as u32
            + self.creator_share as u32
            + self
                .additional_wallets
                .iter()
                .map(|w| w.percentage as u32)
                .sum::<u32>()
    }

    /// Sum of every share the tax is split across.
    pub fn allocated_bps(&self) -> u32 {
        self.lp_percentage as u32 + self.eligible_bps()
    }
}

/// Outcome of [`validate`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ValidationResult {
    Valid(TokenParams),
    Invalid(Vec<FieldError>),
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationResult::Valid(_))
    }

    pub fn errors(&self) -> &[FieldError] {
        match self {
            ValidationResult::Valid(_) => &[],
            ValidationResult::Invalid(errors) => errors,
        }
    }

    pub fn into_result(self) -> Result<TokenParams, Vec<FieldError>> {
        match self {
            ValidationResult::Valid(params) => Ok(params),
            ValidationResult::Invalid(errors) => Err(errors),
        }
    }
}

/// Share left unallocated, clamped at zero. For display only.
pub fn remaining_allocation_bps(config: &TokenConfig) -> u32 {
    BPS_DENOMINATOR.saturating_sub(config.allocated_bps())
}

/// Check a configuration against every rule.
pub fn validate(config: &TokenConfig, rules: &ValidationRules) -> ValidationResult {
    let codec = rules.network.address_codec();
    let mut errors = Vec::new();

    let name = config.name.trim();
    if name.is_empty() {
        errors.push(FieldError::NameRequired);
    }

    let symbol = config.symbol.trim();
    let symbol_len = symbol.chars().count();
    if symbol_len == 0 {
        errors.push(FieldError::SymbolRequired);
    } else if symbol_len > MAX_SYMBOL_LEN {
        errors.push(FieldError::SymbolTooLong { length: symbol_len });
    }

    if config.total_supply == 0 {
        errors.push(FieldError::ZeroSupply);
    }

    if config.buy_tax > MAX_TAX_BPS {
        errors.push(FieldError::BuyTaxTooHigh {
            value: config.buy_tax,
        });
    }
    if config.sell_tax > MAX_TAX_BPS {
        errors.push(FieldError::SellTaxTooHigh {
            value: config.sell_tax,
        });
    }

    if !(MIN_LP_BPS..=MAX_LP_BPS).contains(&config.lp_percentage) {
        errors.push(FieldError::LpOutOfRange {
            value: config.lp_percentage,
        });
    }

    if config.marketing_percentage > MAX_MARKETING_BPS {
        errors.push(FieldError::MarketingTooHigh {
            value: config.marketing_percentage,
        });
    }

    let marketing_wallet = match codec.parse(&config.marketing_wallet) {
        Ok(address) => Some(address),
        Err(source) => {
            errors.push(FieldError::InvalidMarketingWallet { source });
            None
        }
    };

    if config.additional_wallets.len() > rules.max_additional_wallets {
        errors.push(FieldError::TooManyWallets {
            max: rules.max_additional_wallets,
            actual: config.additional_wallets.len(),
        });
    }

    let mut wallets = Vec::with_capacity(config.additional_wallets.len());
    for (index, entry) in config.additional_wallets.iter().enumerate() {
        if entry.percentage > MAX_WALLET_BPS {
            errors.push(FieldError::WalletPercentageTooHigh {
                index,
                value: entry.percentage,
            });
        }
        match codec.parse(&entry.address) {
            Ok(address) => wallets.push(WalletShare {
                address,
                percentage: entry.percentage,
            }),
            Err(source) => errors.push(FieldError::InvalidWalletAddress { index, source }),
        }
    }

    let allocated = config.allocated_bps();
    if allocated > BPS_DENOMINATOR {
        errors.push(FieldError::OverAllocated { allocated });
    } else if rules.allocation_policy == AllocationPolicy::Exact && allocated != BPS_DENOMINATOR {
        errors.push(FieldError::NotFullyAllocated { allocated });
    }

    let marketing_wallet = match marketing_wallet {
        Some(address) if errors.is_empty() => address,
        _ => return ValidationResult::Invalid(errors),
    };

    // allocated <= 10000 here, so the remainder fits.
    let creator_share = match rules.allocation_policy {
        AllocationPolicy::RemainderToCreator => (BPS_DENOMINATOR - allocated) as BasisPoints,
        AllocationPolicy::Headroom | AllocationPolicy::Exact => 0,
    };

    ValidationResult::Valid(TokenParams {
        name: name.to_string(),
        symbol: symbol.to_string(),
        total_supply: config.total_supply,
        buy_tax: config.buy_tax,
        sell_tax: config.sell_tax,
        lp_percentage: config.lp_percentage,
        marketing_wallet,
        marketing_percentage: config.marketing_percentage,
        additional_wallets: wallets,
        creator_share,
    })
}

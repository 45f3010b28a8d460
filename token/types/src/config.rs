// Copyright (c) 2024 Furchill

//! The token configuration a client submits for issuance.
//!
//! Addresses are kept in the textual form the client typed; they are only
//! interpreted once a network's codec is chosen during validation.

use serde::{Deserialize, Serialize};

use crate::constants::BasisPoints;

/// An extra tax recipient.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletEntry {
    pub address: String,
    pub percentage: BasisPoints,
}

impl WalletEntry {
    pub fn new(address: impl Into<String>, percentage: BasisPoints) -> Self {
        Self {
            address: address.into(),
            percentage,
        }
    }
}

/// A proposed token. All percentages are basis points.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenConfig {
    pub name: String,
    pub symbol: String,

    /// Supply in smallest units (18 decimals)
    #[serde(with = "crate::amount")]
    pub total_supply: u128,

    #[serde(default)]
    pub buy_tax: BasisPoints,
    #[serde(default)]
    pub sell_tax: BasisPoints,

    pub lp_percentage: BasisPoints,

    pub marketing_wallet: String,
    #[serde(default)]
    pub marketing_percentage: BasisPoints,

    #[serde(default)]
    pub additional_wallets: Vec<WalletEntry>,
}

impl TokenConfig {
    /// Sum of every configured share. Saturates at `u32::MAX`, which is
    /// still far above any valid allocation.
    pub fn allocated_bps(&self) -> u32 {
        self.additional_wallets
            .iter()
            .map(|w| u32::from(w.percentage))
            .fold(
                u32::from(self.lp_percentage).saturating_add(u32::from(self.marketing_percentage)),
                u32::saturating_add,
            )
    }
}

// Copyright (c) 2024 Furchill

//! Launchpad constants.
//!
//! All percentages in a token configuration are basis points: 10000 = 100%,
//! 100 = 1%, 1 = 0.01%.

/// A percentage expressed in basis points.
pub type BasisPoints = u16;

/// 100% in basis points.
pub const BPS_DENOMINATOR: u32 = 10_000;

/// Maximum buy or sell tax (25%).
pub const MAX_TAX_BPS: BasisPoints = 2_500;

/// Minimum share reserved for liquidity (50%).
pub const MIN_LP_BPS: BasisPoints = 5_000;

/// Maximum share reserved for liquidity (95%).
pub const MAX_LP_BPS: BasisPoints = 9_500;

/// Maximum marketing share (10%).
pub const MAX_MARKETING_BPS: BasisPoints = 1_000;

/// Maximum share of any single additional wallet (20%).
pub const MAX_WALLET_BPS: BasisPoints = 2_000;

/// Maximum symbol length in characters.
pub const MAX_SYMBOL_LEN: usize = 10;

/// Default practical bound on the number of additional wallets.
pub const DEFAULT_MAX_ADDITIONAL_WALLETS: usize = 32;

/// Decimals of every issued token.
pub const TOKEN_DECIMALS: u8 = 18;

/// Decimals of the native currency used to pay the issuance fee.
pub const NATIVE_DECIMALS: u8 = 18;

/// one native unit = 1e18 smallest units
pub const NATIVE_UNIT: u128 = 1_000_000_000_000_000_000;

/// Default issuance fee: 0.01 native units.
pub const DEFAULT_DEPLOYMENT_FEE: u128 = NATIVE_UNIT / 100;

// Copyright (c) 2024 Furchill

//! Tax computation and distribution.
//!
//! A tax is split in two stages. The LP share is taken first, in proportion
//! to the LP percentage over every allocated share. What is left goes to the
//! wallet shares (marketing, creator share, additional wallets, in listing
//! order) in proportion to each percentage. Flooring leaves at most a few
//! units behind; those go to the last additional wallet, or to marketing if
//! there is none, so nothing is lost:
//!
//! ```text
//! lp_part + sum(credits) == tax
//! ```

use fur_token_types::{constants::BPS_DENOMINATOR, Address, BasisPoints};
use serde::{Deserialize, Serialize};

use crate::validate::TokenParams;

/// `floor(value * numerator / denominator)` without overflowing `u128`.
///
/// Requires `numerator <= denominator`, so the result never exceeds `value`.
pub fn mul_div_floor(value: u128, numerator: u32, denominator: u32) -> u128 {
    debug_assert!(denominator > 0 && numerator <= denominator);
    let (n, d) = (numerator as u128, denominator as u128);
    (value / d) * n + (value % d) * n / d
}

/// Tax owed on a transfer of `amount` at `rate_bps`.
pub fn compute_tax(amount: u128, rate_bps: BasisPoints) -> u128 {
    mul_div_floor(amount, rate_bps as u32, BPS_DENOMINATOR)
}

/// One recipient's part of a tax.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxCredit {
    pub recipient: Address,
    #[serde(with = "fur_token_types::amount")]
    pub amount: u128,
}

/// How one tax amount is distributed.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxSplit {
    /// Retained by the token's LP accumulator
    #[serde(with = "fur_token_types::amount")]
    pub lp_part: u128,
    /// Wallet credits in listing order; zero amounts are omitted
    pub credits: Vec<TaxCredit>,
}

impl TaxSplit {
    pub fn total(&self) -> u128 {
        self.lp_part + self.credits.iter().map(|c| c.amount).sum::<u128>()
    }
}

/// Split `tax` according to a token's schedule.
///
/// `creator` receives the creator share, which is only non-zero under the
/// remainder-to-creator allocation policy.
pub fn split_tax(tax: u128, params: &TokenParams, creator: Address) -> TaxSplit {
    if tax == 0 {
        return TaxSplit::default();
    }

    let eligible_total = params.eligible_bps();
    let allocated_total = params.allocated_bps();
    if eligible_total == 0 || allocated_total == 0 {
        return TaxSplit {
            lp_part: tax,
            credits: Vec::new(),
        };
    }

    let lp_part = mul_div_floor(tax, params.lp_percentage as u32, allocated_total);
    let rest = tax - lp_part;

    // Listing order: marketing, creator share, additional wallets.
    let mut shares: Vec<(Address, BasisPoints)> =
        Vec::with_capacity(params.additional_wallets.len() + 2);
    shares.push((params.marketing_wallet, params.marketing_percentage));
    shares.push((creator, params.creator_share));
    shares.extend(
        params
            .additional_wallets
            .iter()
            .map(|w| (w.address, w.percentage)),
    );

    let mut amounts: Vec<u128> = shares
        .iter()
        .map(|(_, pct)| mul_div_floor(rest, *pct as u32, eligible_total))
        .collect();

    let distributed: u128 = amounts.iter().sum();
    let remainder = rest - distributed;
    // Index 0 is marketing; the last entry is the last additional wallet
    // whenever there is one.
    let dust_index = if params.additional_wallets.is_empty() {
        0
    } else {
        amounts.len() - 1
    };
    amounts[dust_index] += remainder;

    let credits = shares
        .iter()
        .zip(amounts)
        .filter(|(_, amount)| *amount > 0)
        .map(|((recipient, _), amount)| TaxCredit {
            recipient: *recipient,
            amount,
        })
        .collect();

    TaxSplit { lp_part, credits }
}

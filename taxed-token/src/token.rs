// Copyright (c) 2024 Furchill

//! The taxed token ledger.
//!
//! Transfers are planned against the current state first and applied second.
//! Planning performs every check and computes the full effect, so applying
//! a plan cannot fail and a rejected transfer leaves no trace.

use fur_token_types::{constants::TOKEN_DECIMALS, Address, BasisPoints};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

use crate::{
    distribution::{compute_tax, split_tax, TaxSplit},
    pool::PoolRegistry,
    validate::{TokenParams, WalletShare},
};

/// Direction of a transfer relative to the token's liquidity pools.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferKind {
    /// Out of a pool
    Buy,
    /// Into a pool
    Sell,
    /// Wallet to wallet, or pool to pool
    Plain,
}

impl TransferKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransferKind::Buy => "buy",
            TransferKind::Sell => "sell",
            TransferKind::Plain => "plain",
        }
    }
}

impl fmt::Display for TransferKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Full effect of a transfer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferReceipt {
    pub token: Address,
    pub from: Address,
    pub to: Address,
    #[serde(with = "fur_token_types::amount")]
    pub amount: u128,
    pub kind: TransferKind,
    pub tax_rate_bps: BasisPoints,
    #[serde(with = "fur_token_types::amount")]
    pub tax: u128,
    #[serde(with = "fur_token_types::amount")]
    pub net_amount: u128,
    pub split: TaxSplit,
}

/// Errors that can occur during a transfer.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum TransferError {
    #[error("Insufficient balance: have {available}, need {requested}")]
    InsufficientBalance { available: u128, requested: u128 },

    #[error("Insufficient allowance: have {available}, need {requested}")]
    InsufficientAllowance { available: u128, requested: u128 },
}

/// A fungible token whose buys and sells are taxed.
#[derive(Clone, Debug)]
pub struct TaxedToken {
    address: Address,
    creator: Address,
    params: TokenParams,
    balances: BTreeMap<Address, u128>,
    allowances: BTreeMap<(Address, Address), u128>,
}

impl TaxedToken {
    /// Mint a token with its whole supply held by `creator`.
    pub fn new(address: Address, creator: Address, params: TokenParams) -> Self {
        let mut balances = BTreeMap::new();
        if params.total_supply > 0 {
            balances.insert(creator, params.total_supply);
        }
        Self {
            address,
            creator,
            params,
            balances,
            allowances: BTreeMap::new(),
        }
    }

    /// The token's handle. Also the LP accumulator.
    pub fn address(&self) -> Address {
        self.address
    }

    pub fn creator(&self) -> Address {
        self.creator
    }

    pub fn params(&self) -> &TokenParams {
        &self.params
    }

    pub fn name(&self) -> &str {
        &self.params.name
    }

    pub fn symbol(&self) -> &str {
        &self.params.symbol
    }

    pub fn decimals(&self) -> u8 {
        TOKEN_DECIMALS
    }

    pub fn total_supply(&self) -> u128 {
        self.params.total_supply
    }

    pub fn buy_tax(&self) -> BasisPoints {
        self.params.buy_tax
    }

    pub fn sell_tax(&self) -> BasisPoints {
        self.params.sell_tax
    }

    pub fn lp_percentage(&self) -> BasisPoints {
        self.params.lp_percentage
    }

    pub fn marketing_wallet(&self) -> Address {
        self.params.marketing_wallet
    }

    pub fn marketing_percentage(&self) -> BasisPoints {
        self.params.marketing_percentage
    }

    pub fn additional_wallets(&self) -> &[WalletShare] {
        &self.params.additional_wallets
    }

    pub fn creator_share(&self) -> BasisPoints {
        self.params.creator_share
    }

    pub fn balance_of(&self, account: &Address) -> u128 {
        self.balances.get(account).copied().unwrap_or(0)
    }

    pub fn allowance(&self, owner: &Address, spender: &Address) -> u128 {
        self.allowances
            .get(&(*owner, *spender))
            .copied()
            .unwrap_or(0)
    }

    /// Number of accounts holding a non-zero balance.
    pub fn holder_count(&self) -> usize {
        self.balances.len()
    }

    /// Sum of all balances. Always equals the total supply.
    pub fn balances_total(&self) -> u128 {
        self.balances.values().sum()
    }

    pub fn classify<P: PoolRegistry + ?Sized>(
        &self,
        from: &Address,
        to: &Address,
        pools: &P,
    ) -> TransferKind {
        let from_pool = pools.is_pool(&self.address, from);
        let to_pool = pools.is_pool(&self.address, to);
        match (from_pool, to_pool) {
            (true, false) => TransferKind::Buy,
            (false, true) => TransferKind::Sell,
            _ => TransferKind::Plain,
        }
    }

    /// Compute the effect of moving `amount` from `from` to `to`.
    pub fn plan_transfer<P: PoolRegistry + ?Sized>(
        &self,
        from: Address,
        to: Address,
        amount: u128,
        pools: &P,
    ) -> Result<TransferReceipt, TransferError> {
        let available = self.balance_of(&from);
        if available < amount {
            return Err(TransferError::InsufficientBalance {
                available,
                requested: amount,
            });
        }

        let kind = self.classify(&from, &to, pools);
        let tax_rate_bps = match kind {
            TransferKind::Buy => self.params.buy_tax,
            TransferKind::Sell => self.params.sell_tax,
            TransferKind::Plain => 0,
        };
        let tax = compute_tax(amount, tax_rate_bps);
        let split = split_tax(tax, &self.params, self.creator);

        Ok(TransferReceipt {
            token: self.address,
            from,
            to,
            amount,
            kind,
            tax_rate_bps,
            tax,
            net_amount: amount - tax,
            split,
        })
    }

    /// Apply a plan produced by [`Self::plan_transfer`] against this state.
    pub fn apply_transfer(&mut self, receipt: &TransferReceipt) {
        self.debit(receipt.from, receipt.amount);
        self.credit(receipt.to, receipt.net_amount);
        self.credit(self.address, receipt.split.lp_part);
        for credit in &receipt.split.credits {
            self.credit(credit.recipient, credit.amount);
        }
    }

    pub fn transfer<P: PoolRegistry + ?Sized>(
        &mut self,
        from: Address,
        to: Address,
        amount: u128,
        pools: &P,
    ) -> Result<TransferReceipt, TransferError> {
        let receipt = self.plan_transfer(from, to, amount, pools)?;
        self.apply_transfer(&receipt);
        Ok(receipt)
    }

    /// Set the amount `spender` may move on behalf of `owner`.
    pub fn approve(&mut self, owner: Address, spender: Address, amount: u128) {
        if amount == 0 {
            self.allowances.remove(&(owner, spender));
        } else {
            self.allowances.insert((owner, spender), amount);
        }
    }

    /// Like [`Self::plan_transfer`], additionally checking the allowance.
    pub fn plan_transfer_from<P: PoolRegistry + ?Sized>(
        &self,
        spender: Address,
        from: Address,
        to: Address,
        amount: u128,
        pools: &P,
    ) -> Result<TransferReceipt, TransferError> {
        let available = self.allowance(&from, &spender);
        if available < amount {
            return Err(TransferError::InsufficientAllowance {
                available,
                requested: amount,
            });
        }
        self.plan_transfer(from, to, amount, pools)
    }

    /// Apply a plan produced by [`Self::plan_transfer_from`].
    ///
    /// An allowance of `u128::MAX` is treated as unlimited and not reduced.
    pub fn apply_transfer_from(&mut self, spender: Address, receipt: &TransferReceipt) {
        let allowance = self.allowance(&receipt.from, &spender);
        if allowance != u128::MAX {
            self.approve(receipt.from, spender, allowance - receipt.amount);
        }
        self.apply_transfer(receipt);
    }

    pub fn transfer_from<P: PoolRegistry + ?Sized>(
        &mut self,
        spender: Address,
        from: Address,
        to: Address,
        amount: u128,
        pools: &P,
    ) -> Result<TransferReceipt, TransferError> {
        let receipt = self.plan_transfer_from(spender, from, to, amount, pools)?;
        self.apply_transfer_from(spender, &receipt);
        Ok(receipt)
    }

    fn debit(&mut self, account: Address, amount: u128) {
        if amount == 0 {
            return;
        }
        if let Some(balance) = self.balances.get_mut(&account) {
            *balance -= amount;
            if *balance == 0 {
                self.balances.remove(&account);
            }
        }
    }

    fn credit(&mut self, account: Address, amount: u128) {
        if amount == 0 {
            return;
        }
        *self.balances.entry(account).or_insert(0) += amount;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{distribution::TaxCredit, pool::{NoPools, PoolDirectory}};

    fn addr(byte: u8) -> Address {
        Address::new([byte; 20])
    }

    const TOKEN: u8 = 0x70;
    const CREATOR: u8 = 0xc0;
    const MARKETING: u8 = 0xaa;
    const POOL: u8 = 0x99;

    fn token() -> TaxedToken {
        let params = TokenParams {
            name: "Test".into(),
            symbol: "TEST".into(),
            total_supply: 1_000_000,
            buy_tax: 500,
            sell_tax: 1000,
            lp_percentage: 8000,
            marketing_wallet: addr(MARKETING),
            marketing_percentage: 200,
            additional_wallets: vec![],
            creator_share: 0,
        };
        TaxedToken::new(addr(TOKEN), addr(CREATOR), params)
    }

    fn pools() -> PoolDirectory {
        let mut dir = PoolDirectory::new();
        dir.register(addr(TOKEN), addr(POOL));
        dir
    }

    #[test]
    fn test_supply_credited_to_creator() {
        let token = token();
        assert_eq!(token.balance_of(&addr(CREATOR)), 1_000_000);
        assert_eq!(token.decimals(), 18);
        assert_eq!(token.holder_count(), 1);
    }

    #[test]
    fn test_plain_transfer_is_untaxed() {
        let mut token = token();
        let receipt = token
            .transfer(addr(CREATOR), addr(1), 1000, &pools())
            .unwrap();
        assert_eq!(receipt.kind, TransferKind::Plain);
        assert_eq!(receipt.tax, 0);
        assert_eq!(token.balance_of(&addr(1)), 1000);
        assert_eq!(token.balance_of(&addr(CREATOR)), 999_000);
    }

    #[test]
    fn test_sell_is_taxed_and_distributed() {
        let mut token = token();
        let receipt = token
            .transfer(addr(CREATOR), addr(POOL), 1000, &pools())
            .unwrap();
        assert_eq!(receipt.kind, TransferKind::Sell);
        // 10% of 1000
        assert_eq!(receipt.tax, 100);
        assert_eq!(receipt.net_amount, 900);
        // lp = floor(100 * 8000 / 8200) = 97, marketing gets 3
        assert_eq!(receipt.split.lp_part, 97);
        assert_eq!(
            receipt.split.credits,
            vec![TaxCredit {
                recipient: addr(MARKETING),
                amount: 3
            }]
        );
        assert_eq!(token.balance_of(&addr(POOL)), 900);
        assert_eq!(token.balance_of(&addr(TOKEN)), 97);
        assert_eq!(token.balance_of(&addr(MARKETING)), 3);
        assert_eq!(token.balances_total(), token.total_supply());
    }

    #[test]
    fn test_buy_uses_buy_tax() {
        let mut token = token();
        token
            .transfer(addr(CREATOR), addr(POOL), 10_000, &NoPools)
            .unwrap();
        let receipt = token
            .transfer(addr(POOL), addr(2), 2_000, &pools())
            .unwrap();
        assert_eq!(receipt.kind, TransferKind::Buy);
        assert_eq!(receipt.tax_rate_bps, 500);
        assert_eq!(receipt.tax, 100);
        assert_eq!(token.balance_of(&addr(2)), 1_900);
        assert_eq!(token.balances_total(), token.total_supply());
    }

    #[test]
    fn test_insufficient_balance_has_no_effect() {
        let mut token = token();
        let err = token
            .transfer(addr(1), addr(2), 1, &NoPools)
            .unwrap_err();
        assert_eq!(
            err,
            TransferError::InsufficientBalance {
                available: 0,
                requested: 1
            }
        );
        assert_eq!(token.balance_of(&addr(CREATOR)), 1_000_000);
        assert_eq!(token.holder_count(), 1);
    }

    #[test]
    fn test_self_transfer_keeps_balance() {
        let mut token = token();
        token
            .transfer(addr(CREATOR), addr(CREATOR), 500, &NoPools)
            .unwrap();
        assert_eq!(token.balance_of(&addr(CREATOR)), 1_000_000);
    }

    #[test]
    fn test_allowance_flow() {
        let mut token = token();
        let spender = addr(5);
        assert!(matches!(
            token.transfer_from(spender, addr(CREATOR), addr(6), 10, &NoPools),
            Err(TransferError::InsufficientAllowance { available: 0, requested: 10 })
        ));

        token.approve(addr(CREATOR), spender, 100);
        token
            .transfer_from(spender, addr(CREATOR), addr(6), 60, &NoPools)
            .unwrap();
        assert_eq!(token.allowance(&addr(CREATOR), &spender), 40);
        assert_eq!(token.balance_of(&addr(6)), 60);

        assert!(token
            .transfer_from(spender, addr(CREATOR), addr(6), 41, &NoPools)
            .is_err());
        assert_eq!(token.allowance(&addr(CREATOR), &spender), 40);
    }

    #[test]
    fn test_unlimited_allowance_not_reduced() {
        let mut token = token();
        let spender = addr(5);
        token.approve(addr(CREATOR), spender, u128::MAX);
        token
            .transfer_from(spender, addr(CREATOR), addr(6), 60, &NoPools)
            .unwrap();
        assert_eq!(token.allowance(&addr(CREATOR), &spender), u128::MAX);
    }
}

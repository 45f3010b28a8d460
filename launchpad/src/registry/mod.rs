// Copyright (c) 2024 Furchill

//! The issuance registry (token factory).
//!
//! Charges the issuance fee, re-validates every configuration under its own
//! rules, mints one [`TaxedToken`] per successful request and keeps the
//! per-creator index of issued tokens. Token-level operations (transfers,
//! approvals, pool registration) are routed through the registry so that one
//! state object owns everything the journal has to reproduce.
//!
//! Every mutation is split in two:
//!
//! 1. `prepare_*` / `plan_*` (`&self`) run all checks and produce the op
//! 2. [`IssuanceRegistry::commit`] applies the op and cannot fail
//!
//! The ledger store journals the op between the two steps.

mod events;
mod ops;

pub use events::{EventType, LaunchpadEvent};
pub use ops::RegistryOp;

use fur_taxed_token::{
    validate, FieldError, PoolDirectory, PoolRegistry, TaxedToken, TokenParams, TransferError,
    TransferReceipt, ValidationResult, ValidationRules,
};
use fur_token_types::{Address, BasisPoints, TokenConfig, WalletEntry};
use serde::{Deserialize, Serialize};
use sha3::{Digest, Keccak256};
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("Invalid token configuration: {}", join_messages(.0))]
    InvalidConfiguration(Vec<FieldError>),

    #[error("Insufficient deployment fee: required {required}, paid {paid}")]
    InsufficientFee { required: u128, paid: u128 },

    #[error("Caller is not authorized")]
    Unauthorized,

    #[error("Insufficient balance: have {available}, need {requested}")]
    InsufficientBalance { available: u128, requested: u128 },

    #[error("Insufficient allowance: have {available}, need {requested}")]
    InsufficientAllowance { available: u128, requested: u128 },

    #[error("Wallets and percentages length mismatch: {wallets} wallets, {percentages} percentages")]
    ArityMismatch { wallets: usize, percentages: usize },

    #[error("Unknown token {0}")]
    UnknownToken(Address),

    #[error("Native balance overflow: {held} held, {incoming} incoming")]
    BalanceOverflow { held: u128, incoming: u128 },
}

fn join_messages(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl From<TransferError> for RegistryError {
    fn from(err: TransferError) -> Self {
        match err {
            TransferError::InsufficientBalance {
                available,
                requested,
            } => RegistryError::InsufficientBalance {
                available,
                requested,
            },
            TransferError::InsufficientAllowance {
                available,
                requested,
            } => RegistryError::InsufficientAllowance {
                available,
                requested,
            },
        }
    }
}

/// Factory parameters fixed at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FactorySettings {
    /// Address of the factory itself; seeds token handles
    pub address: Address,
    /// Initial owner
    pub owner: Address,
    /// Initial issuance fee in smallest native units
    pub deployment_fee: u128,
    pub rules: ValidationRules,
}

/// An issuance request as submitted by a client.
///
/// Additional wallets arrive as two parallel lists, which must have the
/// same length.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CreateTokenRequest {
    pub name: String,
    pub symbol: String,
    pub total_supply: u128,
    pub buy_tax: BasisPoints,
    pub sell_tax: BasisPoints,
    pub lp_percentage: BasisPoints,
    pub marketing_wallet: String,
    pub marketing_percentage: BasisPoints,
    pub wallets: Vec<String>,
    pub percentages: Vec<BasisPoints>,
}

impl CreateTokenRequest {
    /// Build a request from a configuration.
    pub fn from_config(config: &TokenConfig) -> Self {
        Self {
            name: config.name.clone(),
            symbol: config.symbol.clone(),
            total_supply: config.total_supply,
            buy_tax: config.buy_tax,
            sell_tax: config.sell_tax,
            lp_percentage: config.lp_percentage,
            marketing_wallet: config.marketing_wallet.clone(),
            marketing_percentage: config.marketing_percentage,
            wallets: config
                .additional_wallets
                .iter()
                .map(|w| w.address.clone())
                .collect(),
            percentages: config
                .additional_wallets
                .iter()
                .map(|w| w.percentage)
                .collect(),
        }
    }

    /// Pair wallets with their percentages.
    pub fn to_config(&self) -> Result<TokenConfig, RegistryError> {
        if self.wallets.len() != self.percentages.len() {
            return Err(RegistryError::ArityMismatch {
                wallets: self.wallets.len(),
                percentages: self.percentages.len(),
            });
        }

        Ok(TokenConfig {
            name: self.name.clone(),
            symbol: self.symbol.clone(),
            total_supply: self.total_supply,
            buy_tax: self.buy_tax,
            sell_tax: self.sell_tax,
            lp_percentage: self.lp_percentage,
            marketing_wallet: self.marketing_wallet.clone(),
            marketing_percentage: self.marketing_percentage,
            additional_wallets: self
                .wallets
                .iter()
                .zip(&self.percentages)
                .map(|(address, pct)| WalletEntry::new(address.clone(), *pct))
                .collect(),
        })
    }
}

/// One successful issuance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuanceRecord {
    pub creator: Address,
    pub token: Address,
    pub params: TokenParams,
    pub created_at: u64,
}

/// The result of a committed mutation together with the events it emitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Committed<T> {
    pub value: T,
    pub events: Vec<LaunchpadEvent>,
}

/// Derive a token handle from the factory address and a creation nonce.
pub fn derive_token_address(factory: &Address, nonce: u64) -> Address {
    let mut hasher = Keccak256::new();
    hasher.update(factory.as_bytes());
    hasher.update(nonce.to_be_bytes());
    let hash = hasher.finalize();

    let mut bytes = [0u8; 20];
    bytes.copy_from_slice(&hash[12..32]);
    Address::new(bytes)
}

/// Factory state: fee ledger, issued tokens and their pools.
#[derive(Debug, Clone)]
pub struct IssuanceRegistry {
    address: Address,
    owner: Address,
    deployment_fee: u128,
    accumulated_fees: u128,
    nonce: u64,
    rules: ValidationRules,
    tokens: BTreeMap<Address, TaxedToken>,
    records: BTreeMap<Address, Vec<IssuanceRecord>>,
    pools: PoolDirectory,
    native_balances: BTreeMap<Address, u128>,
}

impl IssuanceRegistry {
    pub fn new(settings: FactorySettings) -> Self {
        Self {
            address: settings.address,
            owner: settings.owner,
            deployment_fee: settings.deployment_fee,
            accumulated_fees: 0,
            nonce: 0,
            rules: settings.rules,
            tokens: BTreeMap::new(),
            records: BTreeMap::new(),
            pools: PoolDirectory::new(),
            native_balances: BTreeMap::new(),
        }
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn owner(&self) -> Address {
        self.owner
    }

    pub fn deployment_fee(&self) -> u128 {
        self.deployment_fee
    }

    pub fn accumulated_fees(&self) -> u128 {
        self.accumulated_fees
    }

    pub fn rules(&self) -> &ValidationRules {
        &self.rules
    }

    /// Native currency credited to an account by fee withdrawals.
    pub fn native_balance_of(&self, account: &Address) -> u128 {
        self.native_balances.get(account).copied().unwrap_or(0)
    }

    pub fn token(&self, handle: &Address) -> Option<&TaxedToken> {
        self.tokens.get(handle)
    }

    pub fn tokens(&self) -> impl Iterator<Item = &TaxedToken> {
        self.tokens.values()
    }

    pub fn token_count(&self) -> usize {
        self.tokens.len()
    }

    pub fn records_of(&self, creator: &Address) -> &[IssuanceRecord] {
        self.records.get(creator).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Handles of every token issued by `creator`, oldest first.
    pub fn get_user_tokens(&self, creator: &Address) -> Vec<Address> {
        self.records_of(creator).iter().map(|r| r.token).collect()
    }

    pub fn pools(&self) -> &PoolDirectory {
        &self.pools
    }

    /// Check a configuration under the registry's rules.
    pub fn validate(&self, config: &TokenConfig) -> ValidationResult {
        validate(config, &self.rules)
    }

    fn require_owner(&self, caller: &Address) -> Result<(), RegistryError> {
        if *caller != self.owner {
            return Err(RegistryError::Unauthorized);
        }
        Ok(())
    }

    fn require_token(&self, handle: &Address) -> Result<&TaxedToken, RegistryError> {
        self.tokens
            .get(handle)
            .ok_or(RegistryError::UnknownToken(*handle))
    }

    // ------------------------------------------------------------------
    // Prepare
    // ------------------------------------------------------------------

    pub fn prepare_create_token(
        &self,
        request: &CreateTokenRequest,
        payment: u128,
        caller: Address,
        created_at: u64,
    ) -> Result<RegistryOp, RegistryError> {
        if payment < self.deployment_fee {
            return Err(RegistryError::InsufficientFee {
                required: self.deployment_fee,
                paid: payment,
            });
        }

        if self.accumulated_fees.checked_add(payment).is_none() {
            return Err(RegistryError::BalanceOverflow {
                held: self.accumulated_fees,
                incoming: payment,
            });
        }

        let config = request.to_config()?;
        let params = self
            .validate(&config)
            .into_result()
            .map_err(RegistryError::InvalidConfiguration)?;

        Ok(RegistryOp::CreateToken {
            creator: caller,
            token: derive_token_address(&self.address, self.nonce),
            params,
            payment,
            created_at,
        })
    }

    pub fn prepare_set_deployment_fee(
        &self,
        caller: &Address,
        fee: u128,
    ) -> Result<RegistryOp, RegistryError> {
        self.require_owner(caller)?;
        Ok(RegistryOp::SetDeploymentFee { fee })
    }

    pub fn prepare_withdraw_fees(&self, caller: &Address) -> Result<RegistryOp, RegistryError> {
        self.require_owner(caller)?;
        let held = self.native_balance_of(&self.owner);
        if held.checked_add(self.accumulated_fees).is_none() {
            return Err(RegistryError::BalanceOverflow {
                held,
                incoming: self.accumulated_fees,
            });
        }
        Ok(RegistryOp::WithdrawFees {
            recipient: self.owner,
            amount: self.accumulated_fees,
        })
    }

    pub fn prepare_transfer_ownership(
        &self,
        caller: &Address,
        new_owner: Address,
    ) -> Result<RegistryOp, RegistryError> {
        self.require_owner(caller)?;
        Ok(RegistryOp::TransferOwnership { new_owner })
    }

    /// Plan a transfer. Commit it as [`RegistryOp::Transfer`].
    pub fn plan_transfer(
        &self,
        token: &Address,
        from: Address,
        to: Address,
        amount: u128,
    ) -> Result<TransferReceipt, RegistryError> {
        Ok(self
            .require_token(token)?
            .plan_transfer(from, to, amount, &self.pools)?)
    }

    pub fn prepare_approve(
        &self,
        token: &Address,
        owner: Address,
        spender: Address,
        amount: u128,
    ) -> Result<RegistryOp, RegistryError> {
        self.require_token(token)?;
        Ok(RegistryOp::Approve {
            token: *token,
            owner,
            spender,
            amount,
        })
    }

    /// Plan a delegated transfer. Commit it as [`RegistryOp::TransferFrom`].
    pub fn plan_transfer_from(
        &self,
        token: &Address,
        spender: Address,
        from: Address,
        to: Address,
        amount: u128,
    ) -> Result<TransferReceipt, RegistryError> {
        Ok(self
            .require_token(token)?
            .plan_transfer_from(spender, from, to, amount, &self.pools)?)
    }

    /// Only the token's creator may register its pools.
    pub fn prepare_register_pool(
        &self,
        token: &Address,
        caller: &Address,
        pool: Address,
    ) -> Result<RegistryOp, RegistryError> {
        if self.require_token(token)?.creator() != *caller {
            return Err(RegistryError::Unauthorized);
        }
        Ok(RegistryOp::RegisterPool {
            token: *token,
            pool,
        })
    }

    // ------------------------------------------------------------------
    // Commit
    // ------------------------------------------------------------------

    /// Apply a prepared op. Ops must be committed in the order they were
    /// prepared, against the state they were prepared on.
    pub fn commit(&mut self, op: &RegistryOp) -> Vec<LaunchpadEvent> {
        match op {
            RegistryOp::CreateToken {
                creator,
                token,
                params,
                payment,
                created_at,
            } => {
                self.nonce += 1;
                self.accumulated_fees = self.accumulated_fees.saturating_add(*payment);
                self.tokens
                    .insert(*token, TaxedToken::new(*token, *creator, params.clone()));
                self.records
                    .entry(*creator)
                    .or_default()
                    .push(IssuanceRecord {
                        creator: *creator,
                        token: *token,
                        params: params.clone(),
                        created_at: *created_at,
                    });

                vec![LaunchpadEvent::TokenCreated {
                    creator: *creator,
                    token: *token,
                    name: params.name.clone(),
                    symbol: params.symbol.clone(),
                    total_supply: params.total_supply,
                    buy_tax: params.buy_tax,
                    sell_tax: params.sell_tax,
                    lp_percentage: params.lp_percentage,
                    marketing_wallet: params.marketing_wallet,
                    marketing_percentage: params.marketing_percentage,
                    created_at: *created_at,
                }]
            }
            RegistryOp::SetDeploymentFee { fee } => {
                let old_fee = std::mem::replace(&mut self.deployment_fee, *fee);
                vec![LaunchpadEvent::DeploymentFeeUpdated {
                    old_fee,
                    new_fee: *fee,
                }]
            }
            RegistryOp::WithdrawFees { recipient, amount } => {
                self.accumulated_fees = self.accumulated_fees.saturating_sub(*amount);
                let balance = self.native_balances.entry(*recipient).or_insert(0);
                *balance = balance.saturating_add(*amount);
                vec![LaunchpadEvent::FeesWithdrawn {
                    recipient: *recipient,
                    amount: *amount,
                }]
            }
            RegistryOp::TransferOwnership { new_owner } => {
                let previous_owner = std::mem::replace(&mut self.owner, *new_owner);
                vec![LaunchpadEvent::OwnershipTransferred {
                    previous_owner,
                    new_owner: *new_owner,
                }]
            }
            RegistryOp::Transfer { receipt } => match self.tokens.get_mut(&receipt.token) {
                Some(token) => {
                    token.apply_transfer(receipt);
                    vec![LaunchpadEvent::transfer(receipt)]
                }
                None => Vec::new(),
            },
            RegistryOp::Approve {
                token,
                owner,
                spender,
                amount,
            } => match self.tokens.get_mut(token) {
                Some(t) => {
                    t.approve(*owner, *spender, *amount);
                    vec![LaunchpadEvent::Approval {
                        token: *token,
                        owner: *owner,
                        spender: *spender,
                        amount: *amount,
                    }]
                }
                None => Vec::new(),
            },
            RegistryOp::TransferFrom { spender, receipt } => {
                match self.tokens.get_mut(&receipt.token) {
                    Some(token) => {
                        token.apply_transfer_from(*spender, receipt);
                        vec![LaunchpadEvent::transfer(receipt)]
                    }
                    None => Vec::new(),
                }
            }
            RegistryOp::RegisterPool { token, pool } => {
                if self.pools.register(*token, *pool) {
                    vec![LaunchpadEvent::PoolRegistered {
                        token: *token,
                        pool: *pool,
                    }]
                } else {
                    Vec::new()
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Prepare + commit, for in-memory use
    // ------------------------------------------------------------------

    /// Issue a new token. Returns its handle.
    pub fn create_token(
        &mut self,
        request: &CreateTokenRequest,
        payment: u128,
        caller: Address,
        created_at: u64,
    ) -> Result<Committed<Address>, RegistryError> {
        let token = self.next_token_address();
        let op = self.prepare_create_token(request, payment, caller, created_at)?;
        Ok(self.committed(op, token))
    }

    /// Handle the next issued token will receive.
    pub fn next_token_address(&self) -> Address {
        derive_token_address(&self.address, self.nonce)
    }

    pub fn set_deployment_fee(
        &mut self,
        caller: &Address,
        fee: u128,
    ) -> Result<Committed<u128>, RegistryError> {
        let op = self.prepare_set_deployment_fee(caller, fee)?;
        Ok(self.committed(op, fee))
    }

    /// Move every accumulated fee to the owner. Returns the amount.
    pub fn withdraw_fees(&mut self, caller: &Address) -> Result<Committed<u128>, RegistryError> {
        let op = self.prepare_withdraw_fees(caller)?;
        let amount = self.accumulated_fees;
        Ok(self.committed(op, amount))
    }

    pub fn transfer_ownership(
        &mut self,
        caller: &Address,
        new_owner: Address,
    ) -> Result<Committed<Address>, RegistryError> {
        let op = self.prepare_transfer_ownership(caller, new_owner)?;
        Ok(self.committed(op, new_owner))
    }

    pub fn transfer(
        &mut self,
        token: &Address,
        from: Address,
        to: Address,
        amount: u128,
    ) -> Result<Committed<TransferReceipt>, RegistryError> {
        let receipt = self.plan_transfer(token, from, to, amount)?;
        let op = RegistryOp::Transfer {
            receipt: receipt.clone(),
        };
        Ok(self.committed(op, receipt))
    }

    pub fn approve(
        &mut self,
        token: &Address,
        owner: Address,
        spender: Address,
        amount: u128,
    ) -> Result<Committed<u128>, RegistryError> {
        let op = self.prepare_approve(token, owner, spender, amount)?;
        Ok(self.committed(op, amount))
    }

    pub fn transfer_from(
        &mut self,
        token: &Address,
        spender: Address,
        from: Address,
        to: Address,
        amount: u128,
    ) -> Result<Committed<TransferReceipt>, RegistryError> {
        let receipt = self.plan_transfer_from(token, spender, from, to, amount)?;
        let op = RegistryOp::TransferFrom {
            spender,
            receipt: receipt.clone(),
        };
        Ok(self.committed(op, receipt))
    }

    /// Returns false if the pool was already registered.
    pub fn register_pool(
        &mut self,
        token: &Address,
        caller: &Address,
        pool: Address,
    ) -> Result<Committed<bool>, RegistryError> {
        let op = self.prepare_register_pool(token, caller, pool)?;
        let added = !self.pools.is_pool(token, &pool);
        Ok(self.committed(op, added))
    }

    fn committed<T>(&mut self, op: RegistryOp, value: T) -> Committed<T> {
        let events = self.commit(&op);
        Committed { value, events }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fur_token_types::{constants::NATIVE_UNIT, Network};

    const OWNER: Address = Address::new([0xAA; 20]);
    const CREATOR: Address = Address::new([0xC1; 20]);
    const MARKETING: Address = Address::new([0x3E; 20]);

    fn registry() -> IssuanceRegistry {
        IssuanceRegistry::new(FactorySettings {
            address: Address::new([0xFA; 20]),
            owner: OWNER,
            deployment_fee: NATIVE_UNIT / 100,
            rules: ValidationRules::new(Network::Sepolia),
        })
    }

    fn request() -> CreateTokenRequest {
        CreateTokenRequest {
            name: "Fur Coin".to_string(),
            symbol: "FUR".to_string(),
            total_supply: 1_000_000 * NATIVE_UNIT,
            buy_tax: 500,
            sell_tax: 500,
            lp_percentage: 7000,
            marketing_wallet: MARKETING.to_hex(),
            marketing_percentage: 1000,
            wallets: vec![Address::new([0x11; 20]).to_hex()],
            percentages: vec![2000],
        }
    }

    #[test]
    fn test_create_token_records_issuance() {
        let mut reg = registry();
        let expected = reg.next_token_address();

        let committed = reg
            .create_token(&request(), NATIVE_UNIT / 100, CREATOR, 1_700_000_000)
            .unwrap();

        assert_eq!(committed.value, expected);
        assert_eq!(committed.events.len(), 1);
        assert_eq!(reg.accumulated_fees(), NATIVE_UNIT / 100);
        assert_eq!(reg.get_user_tokens(&CREATOR), vec![expected]);

        let token = reg.token(&expected).unwrap();
        assert_eq!(token.creator(), CREATOR);
        assert_eq!(token.balance_of(&CREATOR), 1_000_000 * NATIVE_UNIT);
        assert_ne!(reg.next_token_address(), expected);
    }

    #[test]
    fn test_underpaid_fee_is_rejected() {
        let mut reg = registry();
        let err = reg
            .create_token(&request(), 9 * NATIVE_UNIT / 1000, CREATOR, 0)
            .unwrap_err();

        assert_eq!(
            err,
            RegistryError::InsufficientFee {
                required: NATIVE_UNIT / 100,
                paid: 9 * NATIVE_UNIT / 1000,
            }
        );
        assert_eq!(reg.token_count(), 0);
        assert_eq!(reg.accumulated_fees(), 0);
    }

    #[test]
    fn test_overpayment_is_kept() {
        let mut reg = registry();
        reg.create_token(&request(), NATIVE_UNIT, CREATOR, 0).unwrap();
        assert_eq!(reg.accumulated_fees(), NATIVE_UNIT);
    }

    #[test]
    fn test_fee_overflow_is_rejected() {
        let mut reg = registry();
        reg.create_token(&request(), u128::MAX, CREATOR, 0).unwrap();

        let err = reg
            .create_token(&request(), NATIVE_UNIT / 100, CREATOR, 1)
            .unwrap_err();
        assert_eq!(
            err,
            RegistryError::BalanceOverflow {
                held: u128::MAX,
                incoming: NATIVE_UNIT / 100,
            }
        );
        assert_eq!(reg.token_count(), 1);
        assert_eq!(reg.accumulated_fees(), u128::MAX);
    }

    #[test]
    fn test_withdrawal_overflow_is_rejected() {
        let mut reg = registry();
        reg.create_token(&request(), u128::MAX, CREATOR, 0).unwrap();
        reg.withdraw_fees(&OWNER).unwrap();
        assert_eq!(reg.native_balance_of(&OWNER), u128::MAX);

        reg.create_token(&request(), NATIVE_UNIT / 100, CREATOR, 1)
            .unwrap();
        let err = reg.withdraw_fees(&OWNER).unwrap_err();
        assert_eq!(
            err,
            RegistryError::BalanceOverflow {
                held: u128::MAX,
                incoming: NATIVE_UNIT / 100,
            }
        );
        assert_eq!(reg.accumulated_fees(), NATIVE_UNIT / 100);
        assert_eq!(reg.native_balance_of(&OWNER), u128::MAX);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut reg = registry();
        let mut req = request();
        req.buy_tax = 2600;

        let err = reg.create_token(&req, NATIVE_UNIT, CREATOR, 0).unwrap_err();
        match err {
            RegistryError::InvalidConfiguration(errors) => {
                assert_eq!(errors, vec![FieldError::BuyTaxTooHigh { value: 2600 }]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(reg.get_user_tokens(&CREATOR).is_empty());
    }

    #[test]
    fn test_arity_mismatch() {
        let reg = registry();
        let mut req = request();
        req.percentages.push(100);

        let err = reg
            .prepare_create_token(&req, NATIVE_UNIT, CREATOR, 0)
            .unwrap_err();
        assert_eq!(
            err,
            RegistryError::ArityMismatch {
                wallets: 1,
                percentages: 2
            }
        );
    }

    #[test]
    fn test_fee_admin_requires_owner() {
        let mut reg = registry();
        reg.create_token(&request(), NATIVE_UNIT / 100, CREATOR, 0)
            .unwrap();

        assert_eq!(
            reg.withdraw_fees(&CREATOR).unwrap_err(),
            RegistryError::Unauthorized
        );
        assert_eq!(
            reg.set_deployment_fee(&CREATOR, 0).unwrap_err(),
            RegistryError::Unauthorized
        );

        let withdrawn = reg.withdraw_fees(&OWNER).unwrap();
        assert_eq!(withdrawn.value, NATIVE_UNIT / 100);
        assert_eq!(reg.accumulated_fees(), 0);
        assert_eq!(reg.native_balance_of(&OWNER), NATIVE_UNIT / 100);

        // A second withdrawal pays nothing.
        assert_eq!(reg.withdraw_fees(&OWNER).unwrap().value, 0);
    }

    #[test]
    fn test_ownership_transfer() {
        let mut reg = registry();
        let new_owner = Address::new([0xBB; 20]);
        reg.transfer_ownership(&OWNER, new_owner).unwrap();

        assert_eq!(reg.owner(), new_owner);
        assert_eq!(
            reg.set_deployment_fee(&OWNER, 1).unwrap_err(),
            RegistryError::Unauthorized
        );
        let updated = reg.set_deployment_fee(&new_owner, 1).unwrap();
        assert_eq!(
            updated.events,
            vec![LaunchpadEvent::DeploymentFeeUpdated {
                old_fee: NATIVE_UNIT / 100,
                new_fee: 1
            }]
        );
    }

    #[test]
    fn test_sell_into_pool_is_taxed() {
        let mut reg = registry();
        let token = reg
            .create_token(&request(), NATIVE_UNIT / 100, CREATOR, 0)
            .unwrap()
            .value;
        let pool = Address::new([0x77; 20]);

        assert_eq!(
            reg.register_pool(&token, &OWNER, pool).unwrap_err(),
            RegistryError::Unauthorized
        );
        assert!(reg.register_pool(&token, &CREATOR, pool).unwrap().value);
        assert!(!reg.register_pool(&token, &CREATOR, pool).unwrap().value);

        let receipt = reg.transfer(&token, CREATOR, pool, 1000).unwrap().value;
        assert_eq!(receipt.kind, fur_taxed_token::TransferKind::Sell);
        assert_eq!(receipt.tax, 50);
        assert_eq!(receipt.net_amount, 950);

        let t = reg.token(&token).unwrap();
        assert_eq!(t.balance_of(&pool), 950);
        assert_eq!(t.balances_total(), t.total_supply());
    }

    #[test]
    fn test_unknown_token() {
        let mut reg = registry();
        let missing = Address::new([0x01; 20]);
        assert_eq!(
            reg.transfer(&missing, CREATOR, OWNER, 1).unwrap_err(),
            RegistryError::UnknownToken(missing)
        );
    }

    #[test]
    fn test_replaying_ops_reproduces_state() {
        let mut reg = registry();
        let op = reg
            .prepare_create_token(&request(), NATIVE_UNIT / 100, CREATOR, 5)
            .unwrap();
        reg.commit(&op);

        let mut replica = registry();
        replica.commit(&op);

        assert_eq!(replica.get_user_tokens(&CREATOR), reg.get_user_tokens(&CREATOR));
        assert_eq!(replica.accumulated_fees(), reg.accumulated_fees());
        assert_eq!(replica.next_token_address(), reg.next_token_address());
    }
}

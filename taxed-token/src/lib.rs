// Copyright (c) 2024 Furchill

//! Taxed token engine for the Furchill launchpad.
//!
//! This crate holds the rules a token configuration must satisfy and the
//! ledger of an issued token, whose buys and sells pay a tax that is split
//! between the liquidity accumulator and the configured wallets.
//!
//! ## Transfer Types
//!
//! | Kind  | Direction      | Tax rate  |
//! |-------|----------------|-----------|
//! | Buy   | pool -> wallet | `buy_tax` |
//! | Sell  | wallet -> pool | `sell_tax`|
//! | Plain | anything else  | none      |
//!
//! Whether an address is a pool is answered by a [`PoolRegistry`].

pub mod distribution;
pub mod pool;
pub mod token;
pub mod validate;

pub use distribution::{compute_tax, split_tax, TaxCredit, TaxSplit};
pub use pool::{NoPools, PoolDirectory, PoolRegistry};
pub use token::{TaxedToken, TransferError, TransferKind, TransferReceipt};
pub use validate::{
    remaining_allocation_bps, validate, AllocationPolicy, FieldError, TokenParams,
    ValidationResult, ValidationRules, WalletShare,
};

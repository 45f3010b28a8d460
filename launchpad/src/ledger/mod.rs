// Copyright (c) 2024 Furchill

//! Durable launchpad state.
//!
//! The [`Ledger`] wraps an [`IssuanceRegistry`] and, when opened from disk,
//! journals every operation before applying it. On open the journal is
//! replayed on top of a fresh registry built from the factory settings.

mod journal;

pub use journal::{Journal, JOURNAL_MAGIC};

use fur_taxed_token::TransferReceipt;
use fur_token_types::Address;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

use crate::registry::{
    Committed, CreateTokenRequest, FactorySettings, IssuanceRegistry, RegistryError, RegistryOp,
};

#[derive(Debug, Error)]
pub enum JournalError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Not a launchpad journal (bad magic)")]
    BadMagic,

    #[error("Journal corrupt at offset {offset}")]
    Corrupt { offset: u64 },

    #[error("Journal record too large: {0} bytes")]
    RecordTooLarge(usize),
}

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("Journal error: {0}")]
    Journal(#[from] JournalError),
}

pub struct Ledger {
    registry: IssuanceRegistry,
    journal: Option<Journal>,
}

impl Ledger {
    /// Open or create a journaled ledger at `path`.
    pub fn open(path: &Path, settings: FactorySettings) -> Result<Self, LedgerError> {
        let (journal, ops) = Journal::open::<RegistryOp>(path)?;

        let mut registry = IssuanceRegistry::new(settings);
        for op in &ops {
            registry.commit(op);
        }

        info!(
            path = %path.display(),
            replayed = ops.len(),
            tokens = registry.token_count(),
            "Opened ledger"
        );

        Ok(Self {
            registry,
            journal: Some(journal),
        })
    }

    /// A ledger that keeps nothing on disk.
    pub fn in_memory(settings: FactorySettings) -> Self {
        Self {
            registry: IssuanceRegistry::new(settings),
            journal: None,
        }
    }

    pub fn registry(&self) -> &IssuanceRegistry {
        &self.registry
    }

    pub fn is_persistent(&self) -> bool {
        self.journal.is_some()
    }

    /// Number of journaled operations.
    pub fn journal_len(&self) -> u64 {
        self.journal.as_ref().map(Journal::len).unwrap_or(0)
    }

    /// Size of the journal file in bytes.
    pub fn journal_size(&self) -> u64 {
        self.journal.as_ref().map(Journal::size).unwrap_or(0)
    }

    fn commit<T>(&mut self, op: RegistryOp, value: T) -> Result<Committed<T>, LedgerError> {
        if let Some(journal) = self.journal.as_mut() {
            journal.append(&op)?;
        }
        debug!(op = op.name(), "Committing ledger operation");
        let events = self.registry.commit(&op);
        Ok(Committed { value, events })
    }

    pub fn create_token(
        &mut self,
        request: &CreateTokenRequest,
        payment: u128,
        caller: Address,
        created_at: u64,
    ) -> Result<Committed<Address>, LedgerError> {
        let token = self.registry.next_token_address();
        let op = self
            .registry
            .prepare_create_token(request, payment, caller, created_at)?;
        self.commit(op, token)
    }

    pub fn set_deployment_fee(
        &mut self,
        caller: &Address,
        fee: u128,
    ) -> Result<Committed<u128>, LedgerError> {
        let op = self.registry.prepare_set_deployment_fee(caller, fee)?;
        self.commit(op, fee)
    }

    pub fn withdraw_fees(&mut self, caller: &Address) -> Result<Committed<u128>, LedgerError> {
        let op = self.registry.prepare_withdraw_fees(caller)?;
        let amount = self.registry.accumulated_fees();
        self.commit(op, amount)
    }

    pub fn transfer_ownership(
        &mut self,
        caller: &Address,
        new_owner: Address,
    ) -> Result<Committed<Address>, LedgerError> {
        let op = self.registry.prepare_transfer_ownership(caller, new_owner)?;
        self.commit(op, new_owner)
    }

    pub fn transfer(
        &mut self,
        token: &Address,
        from: Address,
        to: Address,
        amount: u128,
    ) -> Result<Committed<TransferReceipt>, LedgerError> {
        let receipt = self.registry.plan_transfer(token, from, to, amount)?;
        let op = RegistryOp::Transfer {
            receipt: receipt.clone(),
        };
        self.commit(op, receipt)
    }

    pub fn approve(
        &mut self,
        token: &Address,
        owner: Address,
        spender: Address,
        amount: u128,
    ) -> Result<Committed<u128>, LedgerError> {
        let op = self.registry.prepare_approve(token, owner, spender, amount)?;
        self.commit(op, amount)
    }

    pub fn transfer_from(
        &mut self,
        token: &Address,
        spender: Address,
        from: Address,
        to: Address,
        amount: u128,
    ) -> Result<Committed<TransferReceipt>, LedgerError> {
        let receipt = self
            .registry
            .plan_transfer_from(token, spender, from, to, amount)?;
        let op = RegistryOp::TransferFrom {
            spender,
            receipt: receipt.clone(),
        };
        self.commit(op, receipt)
    }

    /// Returns false if the pool was already registered. Re-registering
    /// writes nothing to the journal.
    pub fn register_pool(
        &mut self,
        token: &Address,
        caller: &Address,
        pool: Address,
    ) -> Result<Committed<bool>, LedgerError> {
        let op = self.registry.prepare_register_pool(token, caller, pool)?;
        if self.registry.pools().pools_of(token).contains(&pool) {
            return Ok(Committed {
                value: false,
                events: Vec::new(),
            });
        }
        self.commit(op, true)
    }
}

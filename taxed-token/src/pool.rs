// Copyright (c) 2024 Furchill

//! Liquidity pool lookup used to classify transfers.

use fur_token_types::Address;
use std::collections::{BTreeMap, BTreeSet};

/// Answers whether an address is a liquidity pool for a token.
///
/// A transfer out of a pool is a buy, a transfer into one is a sell.
pub trait PoolRegistry {
    fn is_pool(&self, token: &Address, candidate: &Address) -> bool;
}

/// A registry that knows no pools; every transfer is untaxed.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoPools;

impl PoolRegistry for NoPools {
    fn is_pool(&self, _token: &Address, _candidate: &Address) -> bool {
        false
    }
}

/// Pools registered per token.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PoolDirectory {
    pools: BTreeMap<Address, BTreeSet<Address>>,
}

impl PoolDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `pool` for `token`. Returns false if it was already known.
    pub fn register(&mut self, token: Address, pool: Address) -> bool {
        self.pools.entry(token).or_default().insert(pool)
    }

    /// Pools of a token, in address order.
    pub fn pools_of(&self, token: &Address) -> Vec<Address> {
        self.pools
            .get(token)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Total number of registered (token, pool) pairs.
    pub fn len(&self) -> usize {
        self.pools.values().map(BTreeSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl PoolRegistry for PoolDirectory {
    fn is_pool(&self, token: &Address, candidate: &Address) -> bool {
        self.pools
            .get(token)
            .is_some_and(|set| set.contains(candidate))
    }
}

// Copyright (c) 2024 Furchill

//! Events published after a ledger mutation commits.

use fur_taxed_token::{TransferKind, TransferReceipt};
use fur_token_types::{Address, BasisPoints};
use serde::{Deserialize, Serialize};

/// A committed state change, as pushed to event subscribers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", content = "data")]
pub enum LaunchpadEvent {
    #[serde(rename = "tokenCreated", rename_all = "camelCase")]
    TokenCreated {
        creator: Address,
        token: Address,
        name: String,
        symbol: String,
        #[serde(with = "fur_token_types::amount")]
        total_supply: u128,
        buy_tax: BasisPoints,
        sell_tax: BasisPoints,
        lp_percentage: BasisPoints,
        marketing_wallet: Address,
        marketing_percentage: BasisPoints,
        created_at: u64,
    },
    #[serde(rename = "transfer", rename_all = "camelCase")]
    Transfer {
        token: Address,
        from: Address,
        to: Address,
        #[serde(with = "fur_token_types::amount")]
        amount: u128,
        kind: TransferKind,
        #[serde(with = "fur_token_types::amount")]
        tax: u128,
        #[serde(with = "fur_token_types::amount")]
        net_amount: u128,
    },
    #[serde(rename = "approval")]
    Approval {
        token: Address,
        owner: Address,
        spender: Address,
        #[serde(with = "fur_token_types::amount")]
        amount: u128,
    },
    #[serde(rename = "deploymentFeeUpdated", rename_all = "camelCase")]
    DeploymentFeeUpdated {
        #[serde(with = "fur_token_types::amount")]
        old_fee: u128,
        #[serde(with = "fur_token_types::amount")]
        new_fee: u128,
    },
    #[serde(rename = "feesWithdrawn")]
    FeesWithdrawn {
        recipient: Address,
        #[serde(with = "fur_token_types::amount")]
        amount: u128,
    },
    #[serde(rename = "ownershipTransferred", rename_all = "camelCase")]
    OwnershipTransferred {
        previous_owner: Address,
        new_owner: Address,
    },
    #[serde(rename = "poolRegistered")]
    PoolRegistered { token: Address, pool: Address },
}

/// Event groups clients can subscribe to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    Tokens,
    Transfers,
    Fees,
    Pools,
}

impl EventType {
    pub const ALL: [EventType; 4] = [
        EventType::Tokens,
        EventType::Transfers,
        EventType::Fees,
        EventType::Pools,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Tokens => "tokens",
            EventType::Transfers => "transfers",
            EventType::Fees => "fees",
            EventType::Pools => "pools",
        }
    }
}

impl LaunchpadEvent {
    /// Get the event type for filtering
    pub fn event_type(&self) -> EventType {
        match self {
            LaunchpadEvent::TokenCreated { .. } => EventType::Tokens,
            LaunchpadEvent::Transfer { .. } | LaunchpadEvent::Approval { .. } => {
                EventType::Transfers
            }
            LaunchpadEvent::DeploymentFeeUpdated { .. }
            | LaunchpadEvent::FeesWithdrawn { .. }
            | LaunchpadEvent::OwnershipTransferred { .. } => EventType::Fees,
            LaunchpadEvent::PoolRegistered { .. } => EventType::Pools,
        }
    }

    pub(crate) fn transfer(receipt: &TransferReceipt) -> Self {
        LaunchpadEvent::Transfer {
            token: receipt.token,
            from: receipt.from,
            to: receipt.to,
            amount: receipt.amount,
            kind: receipt.kind,
            tax: receipt.tax,
            net_amount: receipt.net_amount,
        }
    }
}

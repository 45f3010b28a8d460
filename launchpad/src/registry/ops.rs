// Copyright (c) 2024 Furchill

//! Planned registry mutations.
//!
//! A `RegistryOp` is produced once every check has passed and carries
//! everything needed to apply it. Ops are what the journal stores, so
//! replaying them rebuilds the exact same state without re-running checks.

use fur_taxed_token::{TokenParams, TransferReceipt};
use fur_token_types::Address;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RegistryOp {
    CreateToken {
        creator: Address,
        token: Address,
        params: TokenParams,
        payment: u128,
        created_at: u64,
    },
    SetDeploymentFee {
        fee: u128,
    },
    WithdrawFees {
        recipient: Address,
        amount: u128,
    },
    TransferOwnership {
        new_owner: Address,
    },
    Transfer {
        receipt: TransferReceipt,
    },
    Approve {
        token: Address,
        owner: Address,
        spender: Address,
        amount: u128,
    },
    TransferFrom {
        spender: Address,
        receipt: TransferReceipt,
    },
    RegisterPool {
        token: Address,
        pool: Address,
    },
}

impl RegistryOp {
    /// Short name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            RegistryOp::CreateToken { .. } => "create_token",
            RegistryOp::SetDeploymentFee { .. } => "set_deployment_fee",
            RegistryOp::WithdrawFees { .. } => "withdraw_fees",
            RegistryOp::TransferOwnership { .. } => "transfer_ownership",
            RegistryOp::Transfer { .. } => "transfer",
            RegistryOp::Approve { .. } => "approve",
            RegistryOp::TransferFrom { .. } => "transfer_from",
            RegistryOp::RegisterPool { .. } => "register_pool",
        }
    }
}

// Copyright (c) 2024 Furchill

//! API key gate for owner-only RPC methods.
//!
//! The ledger checks that the `caller` parameter is the factory owner, but
//! that parameter is supplied by the client. The transport therefore requires
//! the request to carry the configured admin key in the `X-API-Key` header
//! before an owner-only method is dispatched at all. Without a configured key
//! owner-only methods are disabled.

use subtle::ConstantTimeEq;

/// Methods that change factory-wide settings.
pub const OWNER_METHODS: &[&str] = &[
    "factory_setDeploymentFee",
    "factory_withdrawFees",
    "factory_transferOwnership",
];

/// Authentication error types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    NotConfigured,
    MissingApiKey,
    InvalidApiKey,
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::NotConfigured => {
                write!(f, "Owner methods are disabled: no admin API key configured")
            }
            AuthError::MissingApiKey => write!(f, "Missing X-API-Key header"),
            AuthError::InvalidApiKey => write!(f, "Invalid API key"),
        }
    }
}

pub fn requires_admin(method: &str) -> bool {
    OWNER_METHODS.contains(&method)
}

/// Check the key presented for `method`.
///
/// Public methods are always open. Owner-only methods need a configured key
/// and a matching presented one.
pub fn authorize(
    method: &str,
    configured: Option<&str>,
    presented: Option<&str>,
) -> Result<(), AuthError> {
    if !requires_admin(method) {
        return Ok(());
    }
    let expected = configured.ok_or(AuthError::NotConfigured)?;

    let presented = presented.ok_or(AuthError::MissingApiKey)?;
    if bool::from(presented.as_bytes().ct_eq(expected.as_bytes())) {
        Ok(())
    } else {
        Err(AuthError::InvalidApiKey)
    }
}

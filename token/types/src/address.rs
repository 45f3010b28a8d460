// Copyright (c) 2024 Furchill

//! Account and token addresses.
//!
//! Every participant in the launchpad (creators, wallets, pools, the tokens
//! themselves) is identified by a 20-byte address. The canonical textual
//! form is lowercase `0x`-prefixed hex; network-specific forms live in
//! [`crate::network`].

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Length of an address in bytes.
pub const ADDRESS_LEN: usize = 20;

/// A 20-byte account address.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Address([u8; ADDRESS_LEN]);

/// Errors produced when decoding an address from text.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum AddressError {
    #[error("Invalid wallet address: address is empty")]
    Empty,

    #[error("Invalid wallet address: expected 0x prefix")]
    MissingPrefix,

    #[error("Invalid wallet address: expected {expected} characters, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("Invalid wallet address: not valid hex")]
    InvalidHex,

    #[error("Invalid wallet address: checksum mismatch")]
    BadChecksum,

    #[error("Invalid wallet address: not valid base58check")]
    InvalidBase58,

    #[error("Invalid wallet address: unexpected version byte {0:#04x}")]
    WrongVersion(u8),
}

impl Address {
    /// Wrap raw bytes.
    pub const fn new(bytes: [u8; ADDRESS_LEN]) -> Self {
        Self(bytes)
    }

    /// Build an address from a slice, which must be exactly 20 bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, AddressError> {
        let array: [u8; ADDRESS_LEN] =
            bytes.try_into().map_err(|_| AddressError::InvalidLength {
                expected: ADDRESS_LEN,
                actual: bytes.len(),
            })?;
        Ok(Self(array))
    }

    /// Raw bytes.
    pub fn as_bytes(&self) -> &[u8; ADDRESS_LEN] {
        &self.0
    }

    /// Canonical lowercase hex form with `0x` prefix.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    /// Parse the canonical hex form. Case is not checked here; use
    /// [`crate::EvmAddressCodec`] for checksum enforcement.
    pub fn from_hex(s: &str) -> Result<Self, AddressError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(AddressError::Empty);
        }
        let digits = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .ok_or(AddressError::MissingPrefix)?;
        if digits.len() != ADDRESS_LEN * 2 {
            return Err(AddressError::InvalidLength {
                expected: ADDRESS_LEN * 2 + 2,
                actual: s.len(),
            });
        }
        let mut bytes = [0u8; ADDRESS_LEN];
        hex::decode_to_slice(digits, &mut bytes).map_err(|_| AddressError::InvalidHex)?;
        Ok(Self(bytes))
    }
}

impl From<[u8; ADDRESS_LEN]> for Address {
    fn from(bytes: [u8; ADDRESS_LEN]) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.to_hex())
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            serializer.serialize_str(&self.to_hex())
        } else {
            self.0.serialize(serializer)
        }
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        if deserializer.is_human_readable() {
            let s = String::deserialize(deserializer)?;
            Address::from_hex(&s).map_err(de::Error::custom)
        } else {
            let bytes = <[u8; ADDRESS_LEN]>::deserialize(deserializer)?;
            Ok(Address(bytes))
        }
    }
}

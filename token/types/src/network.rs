// Copyright (c) 2024 Furchill

//! Supported networks and their textual address formats.
//!
//! Every network stores accounts as the same 20-byte [`Address`], but users
//! type them differently:
//!
//! | Family | Networks                     | Format                                   |
//! |--------|------------------------------|------------------------------------------|
//! | EVM    | ethereum, sepolia, goerli    | `0x` + 40 hex, EIP-55 checksum if mixed  |
//! | TRON   | tron, nile                   | Base58Check, version byte `0x41`         |
//!
//! Address validity is therefore looked up through [`Network::address_codec`]
//! rather than hard-coded as a single length check.

use serde::{Deserialize, Serialize};
use sha3::{Digest, Keccak256};
use std::fmt;
use std::str::FromStr;

use crate::address::{Address, AddressError, ADDRESS_LEN};

/// Version byte prefixed to TRON addresses before Base58Check encoding.
pub const TRON_ADDRESS_VERSION: u8 = 0x41;

/// A network the launchpad can issue tokens on.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    /// Ethereum mainnet
    Ethereum,
    /// Sepolia testnet
    #[default]
    Sepolia,
    /// Goerli testnet
    Goerli,
    /// TRON mainnet
    Tron,
    /// TRON Nile testnet
    Nile,
}

impl Network {
    /// All supported networks.
    pub const ALL: [Network; 5] = [
        Network::Ethereum,
        Network::Sepolia,
        Network::Goerli,
        Network::Tron,
        Network::Nile,
    ];

    /// Short lowercase identifier, as used in config files.
    pub fn as_str(&self) -> &'static str {
        match self {
            Network::Ethereum => "ethereum",
            Network::Sepolia => "sepolia",
            Network::Goerli => "goerli",
            Network::Tron => "tron",
            Network::Nile => "nile",
        }
    }

    /// Human readable name.
    pub fn display_name(&self) -> &'static str {
        match self {
            Network::Ethereum => "Ethereum Mainnet",
            Network::Sepolia => "Sepolia Testnet",
            Network::Goerli => "Goerli Testnet",
            Network::Tron => "TRON Mainnet",
            Network::Nile => "TRON Nile Testnet",
        }
    }

    /// Whether tokens issued here carry real value.
    pub fn is_production(&self) -> bool {
        matches!(self, Network::Ethereum | Network::Tron)
    }

    /// The codec that parses and formats addresses on this network.
    pub fn address_codec(&self) -> &'static dyn AddressCodec {
        static EVM: EvmAddressCodec = EvmAddressCodec;
        static TRON: TronAddressCodec = TronAddressCodec;
        match self {
            Network::Ethereum | Network::Sepolia | Network::Goerli => &EVM,
            Network::Tron | Network::Nile => &TRON,
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Network {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Network::ALL
            .iter()
            .copied()
            .find(|n| n.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                format!(
                    "Unknown network '{}'. Expected one of: ethereum, sepolia, goerli, tron, nile",
                    s
                )
            })
    }
}

/// Parses and formats addresses for one network family.
pub trait AddressCodec: Send + Sync {
    /// Short name of the format, for diagnostics.
    fn name(&self) -> &'static str;

    /// Decode a user-supplied address.
    fn parse(&self, s: &str) -> Result<Address, AddressError>;

    /// Encode an address in this network's preferred form.
    fn format(&self, address: &Address) -> String;
}

/// `0x`-prefixed hex addresses with EIP-55 mixed-case checksums.
#[derive(Clone, Copy, Debug, Default)]
pub struct EvmAddressCodec;

impl EvmAddressCodec {
    /// EIP-55 checksummed form.
    pub fn checksum(address: &Address) -> String {
        let lower = hex::encode(address.as_bytes());
        let hash = Keccak256::digest(lower.as_bytes());

        let mut out = String::with_capacity(2 + ADDRESS_LEN * 2);
        out.push_str("0x");
        for (i, c) in lower.chars().enumerate() {
            let nibble = (hash[i / 2] >> (if i % 2 == 0 { 4 } else { 0 })) & 0x0f;
            if c.is_ascii_alphabetic() && nibble >= 8 {
                out.push(c.to_ascii_uppercase());
            } else {
                out.push(c);
            }
        }
        out
    }
}

impl AddressCodec for EvmAddressCodec {
    fn name(&self) -> &'static str {
        "evm"
    }

    fn parse(&self, s: &str) -> Result<Address, AddressError> {
        let s = s.trim();
        let address = Address::from_hex(s)?;

        // All-lowercase or all-uppercase input carries no checksum.
        let digits = &s[2..];
        let has_lower = digits.chars().any(|c| c.is_ascii_lowercase());
        let has_upper = digits.chars().any(|c| c.is_ascii_uppercase());
        if has_lower && has_upper && Self::checksum(&address)[2..] != *digits {
            return Err(AddressError::BadChecksum);
        }

        Ok(address)
    }

    fn format(&self, address: &Address) -> String {
        Self::checksum(address)
    }
}

/// TRON Base58Check addresses (`T...`).
#[derive(Clone, Copy, Debug, Default)]
pub struct TronAddressCodec;

impl AddressCodec for TronAddressCodec {
    fn name(&self) -> &'static str {
        "tron"
    }

    fn parse(&self, s: &str) -> Result<Address, AddressError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(AddressError::Empty);
        }

        let decoded = bs58::decode(s)
            .with_check(Some(TRON_ADDRESS_VERSION))
            .into_vec()
            .map_err(|e| match e {
                bs58::decode::Error::InvalidVersion { ver, .. } => AddressError::WrongVersion(ver),
                _ => AddressError::InvalidBase58,
            })?;

        // The decoded payload normally keeps the version byte in front.
        match decoded.as_slice() {
            [TRON_ADDRESS_VERSION, payload @ ..] if payload.len() == ADDRESS_LEN => {
                Address::from_slice(payload)
            }
            payload if payload.len() == ADDRESS_LEN => Address::from_slice(payload),
            other => Err(AddressError::InvalidLength {
                expected: ADDRESS_LEN + 1,
                actual: other.len(),
            }),
        }
    }

    fn format(&self, address: &Address) -> String {
        bs58::encode(address.as_bytes())
            .with_check_version(TRON_ADDRESS_VERSION)
            .into_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHECKSUMMED: &str = "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed";

    #[test]
    fn test_eip55_known_vector() {
        let address = Address::from_hex(&CHECKSUMMED.to_lowercase()).unwrap();
        assert_eq!(EvmAddressCodec::checksum(&address), CHECKSUMMED);
    }

    #[test]
    fn test_evm_accepts_checksummed_and_single_case() {
        let codec = EvmAddressCodec;
        let expected = codec.parse(CHECKSUMMED).unwrap();
        assert_eq!(codec.parse(&CHECKSUMMED.to_lowercase()).unwrap(), expected);
        let upper = format!("0x{}", CHECKSUMMED[2..].to_uppercase());
        assert_eq!(codec.parse(&upper).unwrap(), expected);
    }

    #[test]
    fn test_evm_rejects_bad_checksum() {
        // Flip the case of one letter
        let bad = CHECKSUMMED.replacen('a', "A", 1);
        assert_eq!(EvmAddressCodec.parse(&bad).unwrap_err(), AddressError::BadChecksum);
    }

    #[test]
    fn test_evm_rejects_wrong_length() {
        assert!(matches!(
            EvmAddressCodec.parse("0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeA"),
            Err(AddressError::InvalidLength { .. })
        ));
    }

    #[test]
    fn test_tron_roundtrip() {
        let codec = TronAddressCodec;
        let address = Address::new([7u8; ADDRESS_LEN]);
        let text = codec.format(&address);
        assert!(text.starts_with('T'));
        assert_eq!(text.len(), 34);
        assert_eq!(codec.parse(&text).unwrap(), address);
    }

    #[test]
    fn test_tron_rejects_evm_form() {
        assert!(TronAddressCodec.parse(CHECKSUMMED).is_err());
    }

    #[test]
    fn test_tron_rejects_corrupted_checksum() {
        let codec = TronAddressCodec;
        let mut text = codec.format(&Address::new([9u8; ADDRESS_LEN]));
        let last = text.pop().unwrap();
        text.push(if last == '1' { '2' } else { '1' });
        assert!(codec.parse(&text).is_err());
    }

    #[test]
    fn test_network_selects_codec() {
        assert_eq!(Network::Sepolia.address_codec().name(), "evm");
        assert_eq!(Network::Goerli.address_codec().name(), "evm");
        assert_eq!(Network::Nile.address_codec().name(), "tron");
    }

    #[test]
    fn test_network_from_str() {
        assert_eq!("Sepolia".parse::<Network>().unwrap(), Network::Sepolia);
        assert!("solana".parse::<Network>().is_err());
    }

    #[test]
    fn test_network_serde_lowercase() {
        #[derive(Serialize, Deserialize)]
        struct Wrapper {
            network: Network,
        }
        let text = toml::to_string(&Wrapper { network: Network::Nile }).unwrap();
        assert_eq!(text.trim(), "network = \"nile\"");
        let back: Wrapper = toml::from_str(&text).unwrap();
        assert_eq!(back.network, Network::Nile);
    }
}

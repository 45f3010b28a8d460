// Copyright (c) 2024 Furchill

//! Shared types for the Furchill launchpad.
//!
//! Everything here is plain data: the 20-byte [`Address`], the networks the
//! launchpad can issue on together with their textual address formats, the
//! basis-point bounds of a token configuration, unit conversion helpers, and
//! the client-submitted [`TokenConfig`].

pub mod address;
pub mod amount;
pub mod config;
pub mod constants;
pub mod network;
pub mod units;

pub use address::{Address, AddressError, ADDRESS_LEN};
pub use config::{TokenConfig, WalletEntry};
pub use constants::BasisPoints;
pub use network::{AddressCodec, EvmAddressCodec, Network, TronAddressCodec};
pub use units::{format_units, parse_units, UnitsError};

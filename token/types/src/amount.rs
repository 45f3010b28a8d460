// Copyright (c) 2024 Furchill

//! Serde helper for `u128` amounts.
//!
//! Token supplies routinely exceed what a JSON number can carry without
//! precision loss (1M tokens at 18 decimals is 10^24), so amounts are
//! written as decimal strings. Reading accepts either a string or an
//! integer. Use with `#[serde(with = "fur_token_types::amount")]`.

use serde::{de, Deserializer, Serializer};
use std::fmt;

pub fn serialize<S: Serializer>(value: &u128, serializer: S) -> Result<S::Ok, S::Error> {
    if serializer.is_human_readable() {
        serializer.serialize_str(&value.to_string())
    } else {
        serializer.serialize_u128(*value)
    }
}

pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u128, D::Error> {
    if deserializer.is_human_readable() {
        deserializer.deserialize_any(AmountVisitor)
    } else {
        deserializer.deserialize_u128(AmountVisitor)
    }
}

struct AmountVisitor;

impl<'de> de::Visitor<'de> for AmountVisitor {
    type Value = u128;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a non-negative integer or decimal string")
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<u128, E> {
        Ok(v as u128)
    }

    fn visit_u128<E: de::Error>(self, v: u128) -> Result<u128, E> {
        Ok(v)
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<u128, E> {
        u128::try_from(v).map_err(|_| E::custom("amount cannot be negative"))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<u128, E> {
        v.trim()
            .parse::<u128>()
            .map_err(|_| E::custom(format!("invalid amount: {v:?}")))
    }
}

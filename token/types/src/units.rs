// Copyright (c) 2024 Furchill

//! Conversion between decimal display amounts and smallest units.

use thiserror::Error;

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum UnitsError {
    #[error("amount is empty")]
    Empty,

    #[error("invalid amount: {0:?}")]
    Invalid(String),

    #[error("too many decimal places: at most {0} allowed")]
    TooPrecise(u8),

    #[error("amount overflows")]
    Overflow,
}

/// Parse a decimal string such as `"0.01"` into smallest units.
///
/// `parse_units("0.01", 18)` is `10_000_000_000_000_000`.
pub fn parse_units(s: &str, decimals: u8) -> Result<u128, UnitsError> {
    let s = s.trim();
    if s.is_empty() {
        return Err(UnitsError::Empty);
    }

    let (whole, frac) = match s.split_once('.') {
        Some((w, f)) => (w, f),
        None => (s, ""),
    };
    if whole.is_empty() && frac.is_empty() {
        return Err(UnitsError::Invalid(s.to_string()));
    }
    let all_digits = |part: &str| part.chars().all(|c| c.is_ascii_digit());
    if !all_digits(whole) || !all_digits(frac) {
        return Err(UnitsError::Invalid(s.to_string()));
    }

    let frac = frac.trim_end_matches('0');
    if frac.len() > decimals as usize {
        return Err(UnitsError::TooPrecise(decimals));
    }

    let scale = 10u128
        .checked_pow(decimals as u32)
        .ok_or(UnitsError::Overflow)?;
    let whole_units = if whole.is_empty() {
        0
    } else {
        whole.parse::<u128>().map_err(|_| UnitsError::Overflow)?
    };

    let frac_units = if frac.is_empty() {
        0
    } else {
        let padded = format!("{:0<width$}", frac, width = decimals as usize);
        padded.parse::<u128>().map_err(|_| UnitsError::Overflow)?
    };

    whole_units
        .checked_mul(scale)
        .and_then(|v| v.checked_add(frac_units))
        .ok_or(UnitsError::Overflow)
}

/// Format smallest units as a decimal string, dropping trailing zeros.
pub fn format_units(value: u128, decimals: u8) -> String {
    let scale = 10u128.pow(decimals as u32);
    let whole = value / scale;
    let frac = value % scale;
    if frac == 0 {
        return whole.to_string();
    }
    let frac = format!("{:0>width$}", frac, width = decimals as usize);
    format!("{}.{}", whole, frac.trim_end_matches('0'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{DEFAULT_DEPLOYMENT_FEE, NATIVE_DECIMALS};

    #[test]
    fn test_parse_fee() {
        assert_eq!(parse_units("0.01", NATIVE_DECIMALS).unwrap(), DEFAULT_DEPLOYMENT_FEE);
        assert_eq!(parse_units("0.009", NATIVE_DECIMALS).unwrap(), 9_000_000_000_000_000);
        assert_eq!(parse_units("1", NATIVE_DECIMALS).unwrap(), 10u128.pow(18));
        assert_eq!(parse_units(".5", 1).unwrap(), 5);
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert_eq!(parse_units("", 18), Err(UnitsError::Empty));
        assert!(matches!(parse_units("1.2.3", 18), Err(UnitsError::Invalid(_))));
        assert!(matches!(parse_units("-1", 18), Err(UnitsError::Invalid(_))));
        assert_eq!(parse_units("0.001", 2), Err(UnitsError::TooPrecise(2)));
    }

    #[test]
    fn test_format() {
        assert_eq!(format_units(DEFAULT_DEPLOYMENT_FEE, 18), "0.01");
        assert_eq!(format_units(10u128.pow(24), 18), "1000000");
        assert_eq!(format_units(1_500, 3), "1.5");
    }
}

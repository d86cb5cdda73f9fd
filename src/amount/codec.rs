//! Decimal string <-> minor-unit codec.
//!
//! # Rules
//! - Scale is fixed at 10^7 minor units per display unit
//! - Fractional digits beyond the scale are truncated toward zero
//! - Zero, negative and non-numeric inputs are rejected
//! - Parsing is exact integer arithmetic (no floating point)

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Minor units per display unit.
pub const MINOR_UNIT_SCALE: u64 = 10_000_000;

/// Number of decimal digits covered by [`MINOR_UNIT_SCALE`].
pub const SCALE_DIGITS: usize = 7;

/// Amount validation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AmountError {
    #[error("amount is empty")]
    Empty,

    #[error("amount '{0}' is not a decimal number")]
    NotNumeric(String),

    #[error("amount '{0}' is negative")]
    Negative(String),

    #[error("amount '{0}' is zero or below one minor unit")]
    Zero(String),

    #[error("amount '{0}' is too large")]
    Overflow(String),
}

/// Non-negative integer amount in the network's minor units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MinorUnits(pub u64);

impl MinorUnits {
    pub const ZERO: MinorUnits = MinorUnits(0);

    pub fn get(self) -> u64 {
        self.0
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }
}

impl From<u64> for MinorUnits {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl fmt::Display for MinorUnits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Convert a user-entered decimal amount into minor units.
///
/// Accepts `12`, `12.5`, `.5` and `12.` forms. Digits past the seventh
/// fractional place are dropped, so `0.00000019` becomes `1`.
pub fn to_minor_units(display_amount: &str) -> Result<MinorUnits, AmountError> {
    let minor = parse_decimal(display_amount)?;
    if minor.is_zero() {
        return Err(AmountError::Zero(display_amount.trim().to_string()));
    }
    Ok(minor)
}

/// Like [`to_minor_units`] but accepts zero, for balances reported by the network.
pub fn parse_non_negative(display_amount: &str) -> Result<MinorUnits, AmountError> {
    parse_decimal(display_amount)
}

fn parse_decimal(display_amount: &str) -> Result<MinorUnits, AmountError> {
    let raw = display_amount.trim();
    if raw.is_empty() {
        return Err(AmountError::Empty);
    }

    let unsigned = match raw.strip_prefix('-') {
        // "-0" is still zero.
        Some(rest) if is_decimal(rest) && all_zero_digits(rest) => rest,
        Some(rest) if is_decimal(rest) => return Err(AmountError::Negative(raw.to_string())),
        Some(_) => return Err(AmountError::NotNumeric(raw.to_string())),
        None => raw.strip_prefix('+').unwrap_or(raw),
    };

    if !is_decimal(unsigned) {
        return Err(AmountError::NotNumeric(raw.to_string()));
    }

    let (whole, fraction) = unsigned.split_once('.').unwrap_or((unsigned, ""));

    let whole_units = if whole.is_empty() {
        0
    } else {
        whole
            .parse::<u64>()
            .map_err(|_| AmountError::Overflow(raw.to_string()))?
    };

    let kept: String = fraction.chars().take(SCALE_DIGITS).collect();
    let fraction_units = if kept.is_empty() {
        0
    } else {
        let padded = format!("{:0<width$}", kept, width = SCALE_DIGITS);
        padded
            .parse::<u64>()
            .map_err(|_| AmountError::NotNumeric(raw.to_string()))?
    };

    whole_units
        .checked_mul(MINOR_UNIT_SCALE)
        .and_then(|v| v.checked_add(fraction_units))
        .map(MinorUnits)
        .ok_or_else(|| AmountError::Overflow(raw.to_string()))
}

/// Render minor units as a fixed-point decimal with `fraction_digits` places.
///
/// Rounds half-up when fewer than seven digits are requested and pads with
/// zeros when more are requested.
pub fn to_display_units(minor: MinorUnits, fraction_digits: usize) -> String {
    let value = minor.0 as u128;
    let scale = MINOR_UNIT_SCALE as u128;

    if fraction_digits >= SCALE_DIGITS {
        let whole = value / scale;
        let fraction = value % scale;
        let mut out = format!("{}.{:0width$}", whole, fraction, width = SCALE_DIGITS);
        out.extend(std::iter::repeat('0').take(fraction_digits - SCALE_DIGITS));
        return out;
    }

    let step = 10u128.pow((SCALE_DIGITS - fraction_digits) as u32);
    let rounded = (value + step / 2) / step * step;
    let whole = rounded / scale;
    if fraction_digits == 0 {
        return whole.to_string();
    }
    let fraction = (rounded % scale) / step;
    format!("{}.{:0width$}", whole, fraction, width = fraction_digits)
}

fn is_decimal(s: &str) -> bool {
    let mut seen_dot = false;
    let mut digits = 0usize;
    for c in s.chars() {
        match c {
            '0'..='9' => digits += 1,
            '.' if !seen_dot => seen_dot = true,
            _ => return false,
        }
    }
    digits > 0
}

fn all_zero_digits(s: &str) -> bool {
    s.chars().all(|c| c == '0' || c == '.')
}

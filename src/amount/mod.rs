//! Conversion between display amounts and integer minor units.
//!
//! Minor-unit integers are the canonical amount everywhere in the crate;
//! display strings only exist at the edges (user input, rendering).

pub mod codec;

pub use codec::{
    parse_non_negative, to_display_units, to_minor_units, AmountError, MinorUnits, MINOR_UNIT_SCALE, SCALE_DIGITS,
};

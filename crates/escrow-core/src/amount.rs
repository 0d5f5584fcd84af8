//! # Custodial Amounts
//!
//! [`Amount`] is an unsigned quantity in the smallest unit of the single
//! currency the escrow handles. Floats never appear; parsing from text
//! rejects signs, decimals, and overflow.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// An unsigned amount in smallest currency units.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Amount(u64);

impl Amount {
    /// The zero amount.
    pub const ZERO: Amount = Amount(0);

    /// Wrap a raw unit count.
    pub const fn new(units: u64) -> Self {
        Self(units)
    }

    /// The raw unit count.
    pub const fn units(self) -> u64 {
        self.0
    }

    /// Whether this amount is zero.
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Parse from a decimal integer string.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidAmount`] for negative values,
    /// decimals, non-numeric text, or values that overflow `u64`.
    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        let trimmed = s.trim();
        if trimmed.starts_with('+') {
            return Err(ValidationError::InvalidAmount(s.to_string()));
        }
        trimmed
            .parse::<u64>()
            .map(Self)
            .map_err(|_| ValidationError::InvalidAmount(s.to_string()))
    }

    /// Checked addition, `None` on overflow.
    pub fn checked_add(self, other: Amount) -> Option<Amount> {
        self.0.checked_add(other.0).map(Self)
    }

    /// Checked subtraction, `None` on underflow.
    pub fn checked_sub(self, other: Amount) -> Option<Amount> {
        self.0.checked_sub(other.0).map(Self)
    }
}

impl std::fmt::Display for Amount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Amount {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<u64> for Amount {
    fn from(units: u64) -> Self {
        Self(units)
    }
}

//! # Identity Newtypes
//!
//! [`PartyId`] names a participant (client, solicitor, or arbitrator) and
//! [`EscrowId`] names an escrow instance. The two are distinct types; a
//! party can never be passed where an escrow is expected.
//!
//! ## Null identities
//!
//! A party identifier is rejected at construction when it is empty,
//! whitespace-only, or the all-zero address (`0x` followed only by `0`s).
//! Surrounding whitespace is trimmed before storage.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

// ---------------------------------------------------------------------------
// Party identifiers (validated at construction)
// ---------------------------------------------------------------------------

/// An opaque, validated identifier for an escrow participant.
///
/// Deserialization goes through [`PartyId::new`], so a persisted record
/// carrying a null identity is rejected on load.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PartyId(String);

impl PartyId {
    /// Create a party identifier, rejecting null forms.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::NullParty`] if the trimmed value is empty
    /// or is the zero address.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let raw = value.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() || is_zero_address(trimmed) {
            return Err(ValidationError::NullParty(raw));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Access the identifier string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// `0x`, `0x0`, `0x0000…` all denote the null address.
fn is_zero_address(s: &str) -> bool {
    let lower = s.to_ascii_lowercase();
    match lower.strip_prefix("0x") {
        Some(digits) => digits.chars().all(|c| c == '0'),
        None => false,
    }
}

impl std::fmt::Display for PartyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for PartyId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for PartyId {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<PartyId> for String {
    fn from(id: PartyId) -> Self {
        id.0
    }
}

// ---------------------------------------------------------------------------
// Escrow identifiers (always valid by construction)
// ---------------------------------------------------------------------------

/// A unique identifier for an escrow instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EscrowId(Uuid);

impl EscrowId {
    /// Create a new random escrow identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create from an existing UUID.
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Access the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for EscrowId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EscrowId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "escrow:{}", self.0)
    }
}

impl FromStr for EscrowId {
    type Err = ValidationError;

    /// Accepts both the bare UUID and the `escrow:`-prefixed display form.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.strip_prefix("escrow:").unwrap_or(s);
        Uuid::parse_str(raw)
            .map(Self)
            .map_err(|_| ValidationError::InvalidEscrowId(s.to_string()))
    }
}

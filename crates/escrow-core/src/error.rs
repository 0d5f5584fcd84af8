//! # Validation Errors
//!
//! Errors raised when a domain primitive is constructed from invalid input.
//! Each variant carries the rejected input so operators can diagnose bad
//! configuration or corrupt state files without guesswork.

use thiserror::Error;

/// Validation errors for domain primitive newtypes.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Party identifier is empty, whitespace-only, or the null address.
    #[error("invalid party identifier: \"{0}\" (must be non-empty and not the null address)")]
    NullParty(String),

    /// Two roles were bound to the same party.
    #[error("party {party} cannot act as both {first} and {second}")]
    DuplicateParty {
        /// The repeated identifier.
        party: String,
        /// The first role it was bound to.
        first: &'static str,
        /// The second role it was bound to.
        second: &'static str,
    },

    /// Amount string is not a non-negative integer in smallest units.
    #[error("invalid amount: \"{0}\" (expected a non-negative integer in smallest units)")]
    InvalidAmount(String),

    /// Escrow identifier is not a valid UUID.
    #[error("invalid escrow identifier: \"{0}\"")]
    InvalidEscrowId(String),

    /// A persisted record violates an escrow invariant.
    #[error("inconsistent escrow record: {0}")]
    InconsistentRecord(String),

    /// Digest computation failed to serialize its input.
    #[error("digest serialization failed: {0}")]
    Digest(String),
}

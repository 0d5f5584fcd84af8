//! # Escrow Error Types
//!
//! Every rejection carries the escrow, the operation, and the state that
//! caused it. A returned error always means the instance is unchanged.

use escrow_core::{Amount, EscrowId, PartyId, ValidationError};
use escrow_settlement::TransferError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::guard::{Operation, Role};
use crate::status::EscrowStatus;

/// Errors arising from escrow operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EscrowError {
    /// Caller does not hold the role the operation requires.
    #[error("{operation} on {escrow_id} requires the {required}; {caller} is not authorized")]
    Unauthorized {
        /// The escrow.
        escrow_id: EscrowId,
        /// The attempted operation.
        operation: Operation,
        /// Role the operation requires.
        required: Role,
        /// Who called.
        caller: PartyId,
    },

    /// Escrow is not in the status the operation requires.
    #[error("{operation} on {escrow_id} requires status {expected}, found {actual}")]
    InvalidState {
        /// The escrow.
        escrow_id: EscrowId,
        /// The attempted operation.
        operation: Operation,
        /// Required status.
        expected: EscrowStatus,
        /// Current status.
        actual: EscrowStatus,
    },

    /// Deposit was zero (or, from text input, negative or malformed).
    #[error("deposit into {escrow_id} must be a positive amount, got {amount}")]
    InvalidAmount {
        /// The escrow.
        escrow_id: EscrowId,
        /// Offending input.
        amount: String,
    },

    /// Payout attempted with an empty custodial balance.
    #[error("{operation} on {escrow_id}: custodial balance is already zero")]
    EmptyEscrow {
        /// The escrow.
        escrow_id: EscrowId,
        /// The attempted operation.
        operation: Operation,
    },

    /// Settlement refused the transfer; balance and status were restored.
    #[error("{operation} on {escrow_id}: transfer of {amount} to {to} failed, escrow restored")]
    TransferFailed {
        /// The escrow.
        escrow_id: EscrowId,
        /// The attempted operation.
        operation: Operation,
        /// Intended recipient.
        to: PartyId,
        /// Amount that stayed in custody.
        amount: Amount,
        /// What settlement reported.
        #[source]
        source: TransferError,
    },

    /// Null or duplicate party identities, or a corrupt persisted record.
    #[error("invalid escrow construction: {0}")]
    InvalidConstruction(#[from] ValidationError),

    /// The escrow was called back into while an operation on it was in
    /// flight on the same thread.
    #[error("{escrow_id} is busy: re-entrant call rejected")]
    Reentrancy {
        /// The escrow.
        escrow_id: EscrowId,
    },
}

/// Fieldless mirror of [`EscrowError`] for matching on the taxonomy alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EscrowErrorKind {
    /// See [`EscrowError::Unauthorized`].
    Unauthorized,
    /// See [`EscrowError::InvalidState`].
    InvalidState,
    /// See [`EscrowError::InvalidAmount`].
    InvalidAmount,
    /// See [`EscrowError::EmptyEscrow`].
    EmptyEscrow,
    /// See [`EscrowError::TransferFailed`].
    TransferFailed,
    /// See [`EscrowError::InvalidConstruction`].
    InvalidConstruction,
    /// See [`EscrowError::Reentrancy`].
    Reentrancy,
}

impl EscrowErrorKind {
    /// The variant name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unauthorized => "Unauthorized",
            Self::InvalidState => "InvalidState",
            Self::InvalidAmount => "InvalidAmount",
            Self::EmptyEscrow => "EmptyEscrow",
            Self::TransferFailed => "TransferFailed",
            Self::InvalidConstruction => "InvalidConstruction",
            Self::Reentrancy => "Reentrancy",
        }
    }
}

impl std::fmt::Display for EscrowErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl EscrowError {
    /// The taxonomy entry for this error.
    pub fn kind(&self) -> EscrowErrorKind {
        match self {
            Self::Unauthorized { .. } => EscrowErrorKind::Unauthorized,
            Self::InvalidState { .. } => EscrowErrorKind::InvalidState,
            Self::InvalidAmount { .. } => EscrowErrorKind::InvalidAmount,
            Self::EmptyEscrow { .. } => EscrowErrorKind::EmptyEscrow,
            Self::TransferFailed { .. } => EscrowErrorKind::TransferFailed,
            Self::InvalidConstruction(_) => EscrowErrorKind::InvalidConstruction,
            Self::Reentrancy { .. } => EscrowErrorKind::Reentrancy,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    fn party(name: &str) -> PartyId {
        PartyId::new(name).unwrap()
    }

    #[test]
    fn unauthorized_display() {
        let err = EscrowError::Unauthorized {
            escrow_id: EscrowId::new(),
            operation: Operation::ReleasePayment,
            required: Role::Client,
            caller: party("mallory"),
        };
        let msg = err.to_string();
        assert!(msg.contains("release_payment"));
        assert!(msg.contains("client"));
        assert!(msg.contains("mallory"));
        assert_eq!(err.kind(), EscrowErrorKind::Unauthorized);
    }

    #[test]
    fn invalid_state_display() {
        let err = EscrowError::InvalidState {
            escrow_id: EscrowId::new(),
            operation: Operation::ReleasePayment,
            expected: EscrowStatus::Completed,
            actual: EscrowStatus::Paid,
        };
        let msg = err.to_string();
        assert!(msg.contains("COMPLETED"));
        assert!(msg.contains("PAID"));
    }

    #[test]
    fn transfer_failed_exposes_source() {
        let err = EscrowError::TransferFailed {
            escrow_id: EscrowId::new(),
            operation: Operation::RefundBeforeCompletion,
            to: party("alice"),
            amount: Amount::new(100),
            source: TransferError::Unavailable("rail down".into()),
        };
        assert!(err.to_string().contains("restored"));
        let source = err.source().expect("source attached");
        assert!(source.to_string().contains("rail down"));
    }

    #[test]
    fn construction_from_validation() {
        let err: EscrowError = ValidationError::NullParty(String::new()).into();
        assert_eq!(err.kind(), EscrowErrorKind::InvalidConstruction);
    }

    #[test]
    fn kind_names() {
        assert_eq!(EscrowErrorKind::EmptyEscrow.to_string(), "EmptyEscrow");
        assert_eq!(EscrowErrorKind::Reentrancy.as_str(), "Reentrancy");
    }
}

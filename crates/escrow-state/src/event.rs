//! # Escrow Events and Transition Records
//!
//! Each successful operation appends one event (two for a dispute
//! resolution: the payout, then the resolution). The log is append-only and
//! numbered from zero. A failed operation appends nothing.
//!
//! [`TransitionRecord`] is the parallel audit trail of status changes.

use escrow_core::{Amount, EscrowId, PartyId, Timestamp};
use serde::{Deserialize, Serialize};

use crate::guard::Operation;
use crate::status::EscrowStatus;

/// What happened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EscrowEventKind {
    /// Client deposited the custodial amount.
    Funded {
        /// Depositing client.
        from: PartyId,
        /// Amount deposited.
        amount: Amount,
    },
    /// Solicitor declared the work done.
    WorkCompleted {
        /// Solicitor.
        by: PartyId,
    },
    /// Custody paid to the solicitor.
    PaymentReleased {
        /// Solicitor.
        to: PartyId,
        /// Amount paid.
        amount: Amount,
    },
    /// Custody returned to the client.
    Refunded {
        /// Client.
        to: PartyId,
        /// Amount returned.
        amount: Amount,
    },
    /// Client contested the work.
    DisputeOpened {
        /// Client.
        by: PartyId,
    },
    /// Arbitrator decided the dispute.
    DisputeResolved {
        /// Arbitrator.
        by: PartyId,
        /// Whether the solicitor was paid (otherwise the client was refunded).
        paid_to_solicitor: bool,
    },
}

impl EscrowEventKind {
    /// The event name, e.g. `"PaymentReleased"`.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Funded { .. } => "Funded",
            Self::WorkCompleted { .. } => "WorkCompleted",
            Self::PaymentReleased { .. } => "PaymentReleased",
            Self::Refunded { .. } => "Refunded",
            Self::DisputeOpened { .. } => "DisputeOpened",
            Self::DisputeResolved { .. } => "DisputeResolved",
        }
    }

    /// The amount moved, for events that move funds.
    pub fn amount(&self) -> Option<Amount> {
        match self {
            Self::Funded { amount, .. }
            | Self::PaymentReleased { amount, .. }
            | Self::Refunded { amount, .. } => Some(*amount),
            _ => None,
        }
    }
}

impl std::fmt::Display for EscrowEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Funded { from, amount } => write!(f, "Funded({from}, {amount})"),
            Self::WorkCompleted { by } => write!(f, "WorkCompleted({by})"),
            Self::PaymentReleased { to, amount } => write!(f, "PaymentReleased({to}, {amount})"),
            Self::Refunded { to, amount } => write!(f, "Refunded({to}, {amount})"),
            Self::DisputeOpened { by } => write!(f, "DisputeOpened({by})"),
            Self::DisputeResolved {
                by,
                paid_to_solicitor,
            } => write!(f, "DisputeResolved({by}, {paid_to_solicitor})"),
        }
    }
}

/// A numbered, timestamped event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscrowEvent {
    /// Position in the escrow's log, starting at 0.
    pub sequence: u64,
    /// Emitting escrow.
    pub escrow_id: EscrowId,
    /// When it was emitted.
    pub timestamp: Timestamp,
    /// Payload.
    #[serde(flatten)]
    pub kind: EscrowEventKind,
}

/// Record of a status change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionRecord {
    /// Status before.
    pub from: EscrowStatus,
    /// Status after.
    pub to: EscrowStatus,
    /// Operation that caused it.
    pub operation: Operation,
    /// Calling party.
    pub actor: PartyId,
    /// When it happened.
    pub timestamp: Timestamp,
}

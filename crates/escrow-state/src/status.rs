//! # Escrow Status
//!
//! ```text
//! Created ──▶ Funded ──▶ Completed ──▶ Paid
//!               │            │           ▲
//!               │            ▼           │
//!               │         Disputed ──────┤
//!               │            │
//!               ▼            ▼
//!            Refunded ◀──────┘
//! ```
//!
//! `Paid` and `Refunded` are terminal. No edge re-enters an earlier state.

use serde::{Deserialize, Serialize};

/// The lifecycle status of an escrow instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EscrowStatus {
    /// Parties bound, nothing deposited.
    Created,
    /// Client deposit held in custody.
    Funded,
    /// Solicitor has declared the work done.
    Completed,
    /// Client has contested the work; awaiting the arbitrator.
    Disputed,
    /// Custody paid to the solicitor (terminal).
    Paid,
    /// Custody returned to the client (terminal).
    Refunded,
}

impl EscrowStatus {
    /// Every status, in lifecycle order.
    pub const ALL: [EscrowStatus; 6] = [
        Self::Created,
        Self::Funded,
        Self::Completed,
        Self::Disputed,
        Self::Paid,
        Self::Refunded,
    ];

    /// Whether no further transition is possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Paid | Self::Refunded)
    }

    /// Whether the custodial balance must be positive in this status.
    pub fn holds_funds(&self) -> bool {
        matches!(self, Self::Funded | Self::Completed | Self::Disputed)
    }

    /// Whether `next` is a legal successor of this status.
    pub fn can_transition_to(&self, next: EscrowStatus) -> bool {
        use EscrowStatus::*;
        matches!(
            (self, next),
            (Created, Funded)
                | (Funded, Completed)
                | (Funded, Refunded)
                | (Completed, Disputed)
                | (Completed, Paid)
                | (Disputed, Paid)
                | (Disputed, Refunded)
        )
    }

    /// The canonical string name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "CREATED",
            Self::Funded => "FUNDED",
            Self::Completed => "COMPLETED",
            Self::Disputed => "DISPUTED",
            Self::Paid => "PAID",
            Self::Refunded => "REFUNDED",
        }
    }
}

impl std::fmt::Display for EscrowStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_states_have_no_successors() {
        for from in EscrowStatus::ALL.iter().filter(|s| s.is_terminal()) {
            for to in EscrowStatus::ALL {
                assert!(!from.can_transition_to(to), "{from} -> {to} must not exist");
            }
        }
    }

    #[test]
    fn exactly_seven_edges() {
        let edges = EscrowStatus::ALL
            .iter()
            .flat_map(|a| EscrowStatus::ALL.iter().map(move |b| (*a, *b)))
            .filter(|(a, b)| a.can_transition_to(*b))
            .count();
        assert_eq!(edges, 7);
    }

    #[test]
    fn no_edge_goes_backwards() {
        let rank = |s: EscrowStatus| EscrowStatus::ALL.iter().position(|x| *x == s).unwrap();
        for a in EscrowStatus::ALL {
            for b in EscrowStatus::ALL {
                if a.can_transition_to(b) {
                    assert!(rank(b) > rank(a), "{a} -> {b} goes backwards");
                }
            }
        }
    }

    #[test]
    fn holds_funds_only_mid_lifecycle() {
        assert!(!EscrowStatus::Created.holds_funds());
        assert!(EscrowStatus::Funded.holds_funds());
        assert!(EscrowStatus::Completed.holds_funds());
        assert!(EscrowStatus::Disputed.holds_funds());
        assert!(!EscrowStatus::Paid.holds_funds());
        assert!(!EscrowStatus::Refunded.holds_funds());
    }

    #[test]
    fn serde_uses_screaming_names() {
        let json = serde_json::to_string(&EscrowStatus::Disputed).unwrap();
        assert_eq!(json, "\"DISPUTED\"");
        for s in EscrowStatus::ALL {
            assert_eq!(serde_json::to_string(&s).unwrap(), format!("\"{s}\""));
        }
    }
}

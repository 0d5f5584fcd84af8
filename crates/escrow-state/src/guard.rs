//! # Roles, Operations, and Guards
//!
//! Every escrow operation is admitted by exactly one `(role, status)` pair.
//! [`Operation::guard`] is the only place those pairs are written down; the
//! state machine evaluates them uniformly before touching any state.
//!
//! | Operation | Role | From | To |
//! |---|---|---|---|
//! | `fund` | client | Created | Funded |
//! | `confirm_completion` | solicitor | Funded | Completed |
//! | `release_payment` | client | Completed | Paid |
//! | `refund_before_completion` | client | Funded | Refunded |
//! | `open_dispute` | client | Completed | Disputed |
//! | `resolve_dispute` | arbitrator | Disputed | Paid / Refunded |

use escrow_core::{PartyId, ValidationError};
use serde::{Deserialize, Serialize};

use crate::status::EscrowStatus;

// ─── Roles ───────────────────────────────────────────────────────────

/// A participant role, fixed at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Deposits funds, accepts or contests the work.
    Client,
    /// Performs the work and receives payment.
    Solicitor,
    /// Decides disputes.
    Arbitrator,
}

impl Role {
    /// The canonical string name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Client => "client",
            Self::Solicitor => "solicitor",
            Self::Arbitrator => "arbitrator",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Parties ─────────────────────────────────────────────────────────

/// The three parties bound to an escrow. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parties {
    client: PartyId,
    solicitor: PartyId,
    arbitrator: PartyId,
}

impl Parties {
    /// Bind three parties to their roles.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::DuplicateParty`] if any two roles share an
    /// identifier.
    pub fn new(
        client: PartyId,
        solicitor: PartyId,
        arbitrator: PartyId,
    ) -> Result<Self, ValidationError> {
        let pairs = [
            (&client, Role::Client, &solicitor, Role::Solicitor),
            (&client, Role::Client, &arbitrator, Role::Arbitrator),
            (&solicitor, Role::Solicitor, &arbitrator, Role::Arbitrator),
        ];
        for (a, first, b, second) in pairs {
            if a == b {
                return Err(ValidationError::DuplicateParty {
                    party: a.to_string(),
                    first: first.as_str(),
                    second: second.as_str(),
                });
            }
        }
        Ok(Self {
            client,
            solicitor,
            arbitrator,
        })
    }

    /// Parse and bind three raw identifiers.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::NullParty`] for a null identifier, or
    /// [`ValidationError::DuplicateParty`] for a repeated one.
    pub fn parse(client: &str, solicitor: &str, arbitrator: &str) -> Result<Self, ValidationError> {
        Self::new(
            PartyId::new(client)?,
            PartyId::new(solicitor)?,
            PartyId::new(arbitrator)?,
        )
    }

    /// The party holding `role`.
    pub fn get(&self, role: Role) -> &PartyId {
        match role {
            Role::Client => &self.client,
            Role::Solicitor => &self.solicitor,
            Role::Arbitrator => &self.arbitrator,
        }
    }

    /// The client.
    pub fn client(&self) -> &PartyId {
        &self.client
    }

    /// The solicitor.
    pub fn solicitor(&self) -> &PartyId {
        &self.solicitor
    }

    /// The arbitrator.
    pub fn arbitrator(&self) -> &PartyId {
        &self.arbitrator
    }

    /// Whether `caller` holds `role`.
    pub fn holds(&self, role: Role, caller: &PartyId) -> bool {
        self.get(role) == caller
    }

    /// The role `caller` holds, if any.
    pub fn role_of(&self, caller: &PartyId) -> Option<Role> {
        [Role::Client, Role::Solicitor, Role::Arbitrator]
            .into_iter()
            .find(|r| self.holds(*r, caller))
    }
}

// ─── Operations ──────────────────────────────────────────────────────

/// A mutating escrow operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    /// Deposit the custodial amount.
    Fund,
    /// Declare the work done.
    ConfirmCompletion,
    /// Pay the solicitor.
    ReleasePayment,
    /// Return the deposit before the work is done.
    RefundBeforeCompletion,
    /// Contest completed work.
    OpenDispute,
    /// Decide a dispute in favour of one side.
    ResolveDispute,
}

/// The admission rule for one operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Guard {
    /// Role the caller must hold.
    pub role: Role,
    /// Status the escrow must be in.
    pub from: EscrowStatus,
}

impl Operation {
    /// Every operation.
    pub const ALL: [Operation; 6] = [
        Self::Fund,
        Self::ConfirmCompletion,
        Self::ReleasePayment,
        Self::RefundBeforeCompletion,
        Self::OpenDispute,
        Self::ResolveDispute,
    ];

    /// The `(role, status)` pair admitting this operation.
    pub const fn guard(self) -> Guard {
        let (role, from) = match self {
            Self::Fund => (Role::Client, EscrowStatus::Created),
            Self::ConfirmCompletion => (Role::Solicitor, EscrowStatus::Funded),
            Self::ReleasePayment => (Role::Client, EscrowStatus::Completed),
            Self::RefundBeforeCompletion => (Role::Client, EscrowStatus::Funded),
            Self::OpenDispute => (Role::Client, EscrowStatus::Completed),
            Self::ResolveDispute => (Role::Arbitrator, EscrowStatus::Disputed),
        };
        Guard { role, from }
    }

    /// Statuses this operation can end in.
    pub fn targets(self) -> &'static [EscrowStatus] {
        match self {
            Self::Fund => &[EscrowStatus::Funded],
            Self::ConfirmCompletion => &[EscrowStatus::Completed],
            Self::ReleasePayment => &[EscrowStatus::Paid],
            Self::RefundBeforeCompletion => &[EscrowStatus::Refunded],
            Self::OpenDispute => &[EscrowStatus::Disputed],
            Self::ResolveDispute => &[EscrowStatus::Paid, EscrowStatus::Refunded],
        }
    }

    /// Whether this operation moves custody to a recipient.
    pub fn is_payout(self) -> bool {
        matches!(
            self,
            Self::ReleasePayment | Self::RefundBeforeCompletion | Self::ResolveDispute
        )
    }

    /// The canonical string name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fund => "fund",
            Self::ConfirmCompletion => "confirm_completion",
            Self::ReleasePayment => "release_payment",
            Self::RefundBeforeCompletion => "refund_before_completion",
            Self::OpenDispute => "open_dispute",
            Self::ResolveDispute => "resolve_dispute",
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

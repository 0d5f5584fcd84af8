#![deny(missing_docs)]

//! # escrow-state — Three-Party Escrow State Machine
//!
//! A client deposits funds, a solicitor performs work, and an arbitrator
//! resolves disputes. Funds leave custody exactly once, to exactly one of
//! client or solicitor, and only through an authorized transition.
//!
//! ## Modules
//!
//! - **Status** ([`status`]): the six statuses and the seven legal edges.
//! - **Guards** ([`guard`]): roles, bound [`Parties`], and the per-operation
//!   `(role, status)` admission table.
//! - **Machine** ([`machine`]): [`EscrowStateMachine`], the single-owner
//!   escrow with payout rollback and snapshots.
//! - **Shared** ([`shared`]): [`SharedEscrow`], a cloneable handle that
//!   serializes operations on one instance and rejects re-entrant calls.
//! - **Events** ([`event`]): the ordered event log and transition records.
//! - **Errors** ([`error`]): [`EscrowError`] and its fieldless
//!   [`EscrowErrorKind`].
//!
//! ## Example
//!
//! ```
//! use escrow_core::{Amount, PartyId};
//! use escrow_settlement::InMemoryLedger;
//! use escrow_state::{EscrowStateMachine, EscrowStatus};
//!
//! let ledger = InMemoryLedger::new();
//! let mut escrow = EscrowStateMachine::create("alice", "bob", "carol", &ledger).unwrap();
//! let alice = PartyId::new("alice").unwrap();
//! let bob = PartyId::new("bob").unwrap();
//!
//! escrow.fund(&alice, Amount::new(100)).unwrap();
//! escrow.confirm_completion(&bob).unwrap();
//! escrow.release_payment(&alice).unwrap();
//!
//! assert_eq!(escrow.status(), EscrowStatus::Paid);
//! assert_eq!(ledger.balance_of(&bob), Amount::new(100));
//! ```

pub mod error;
pub mod event;
pub mod guard;
pub mod machine;
pub mod shared;
pub mod status;

pub use error::{EscrowError, EscrowErrorKind};
pub use event::{EscrowEvent, EscrowEventKind, TransitionRecord};
pub use guard::{Guard, Operation, Parties, Role};
pub use machine::{EscrowSnapshot, EscrowStateMachine};
pub use shared::SharedEscrow;
pub use status::EscrowStatus;

#![deny(missing_docs)]

//! # escrow-core — Foundational Types for the Three-Party Escrow
//!
//! Domain primitives shared by every other crate in the workspace. No internal
//! crate dependencies, only `serde`, `serde_json`, `thiserror`, `chrono`,
//! `uuid`, and `sha2` from the external ecosystem.
//!
//! ## Design Principles
//!
//! 1. **Newtype wrappers for domain primitives.** A [`PartyId`] is not a
//!    `String` and an [`Amount`] is not a `u64`. Validation happens once, at
//!    construction, and every holder of the type can rely on it.
//!
//! 2. **No null identities.** [`PartyId::new`] rejects empty, whitespace-only,
//!    and all-zero address forms, so the escrow state machine never has to
//!    re-check identities after creation.
//!
//! 3. **Structured errors.** [`ValidationError`] is built with `thiserror`;
//!    no `.unwrap()` outside tests.

pub mod amount;
pub mod digest;
pub mod error;
pub mod identity;
pub mod temporal;

pub use amount::Amount;
pub use digest::{sha256_digest, ContentDigest};
pub use error::ValidationError;
pub use identity::{EscrowId, PartyId};
pub use temporal::Timestamp;

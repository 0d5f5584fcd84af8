//! # escrow-settlement — Value Transfer
//!
//! The escrow state machine never moves value itself. It hands a recipient
//! and an amount to a [`ValueTransferService`] and reacts to the outcome.
//!
//! - **Transfer** ([`transfer`]): the trait, [`TransferReceipt`], and
//!   [`TransferError`].
//! - **Ledger** ([`ledger`]): [`InMemoryLedger`], a custody pool plus party
//!   balances with failure injection, used by the CLI and by tests.

pub mod ledger;
pub mod transfer;

pub use ledger::{InMemoryLedger, LedgerSnapshot};
pub use transfer::{TransferError, TransferReceipt, ValueTransferService};

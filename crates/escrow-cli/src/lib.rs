#![deny(missing_docs)]

//! # escrow-cli — CLI Tool for Three-Party Escrows
//!
//! Provides the `escrow` command-line interface over escrow instances kept
//! as JSON state files, with value movements recorded in a local ledger.
//!
//! ## Subcommands
//!
//! - `escrow create` — Bind client, solicitor and arbitrator to a new escrow.
//! - `escrow fund | confirm | release | refund | dispute | resolve` — Drive
//!   the lifecycle as the named caller.
//! - `escrow status | events | list | balances` — Inspect state.
//!
//! ```bash
//! escrow create --name job-7 --client alice --solicitor bob --arbitrator carol
//! escrow fund --name job-7 --caller alice --amount 100
//! escrow confirm --name job-7 --caller bob
//! escrow release --name job-7 --caller alice
//! ```

pub mod config;
pub mod instance;

pub use config::{CliConfig, ConfigError, LogFormat};
pub use instance::{execute, run_escrow, EscrowCommand, Outcome, Rejection, StateStore, StoreLock};

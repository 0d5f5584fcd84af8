//! # Escrow Subcommands
//!
//! Drives escrow instances persisted under a state directory:
//!
//! ```text
//! <state_dir>/
//!   ledger.json              custody pool, party balances, receipts
//!   instances/<name>.json    one escrow snapshot per instance
//! ```
//!
//! Every file is sealed with a SHA-256 digest of its canonical JSON; a file
//! whose contents no longer match is refused. Commands that write hold
//! `<state_dir>/.lock` from the first read to the last write, so concurrent
//! invocations are serialized across all instances and the ledger.
//!
//! Exit codes: `0` success, `2` the escrow rejected the operation (printed as
//! `ERROR: <kind>: <message>`), `1` anything else.

use std::fmt;
use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use clap::Subcommand;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use escrow_core::{sha256_digest, Amount, ContentDigest, PartyId};
use escrow_settlement::{InMemoryLedger, LedgerSnapshot, TransferReceipt};
use escrow_state::{
    EscrowError, EscrowErrorKind, EscrowSnapshot, EscrowStateMachine, Operation, Parties,
};

/// Escrow subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum EscrowCommand {
    /// Create a new escrow in CREATED state.
    Create {
        /// Instance name (file name under `instances/`).
        #[arg(long)]
        name: String,
        /// Client identifier.
        #[arg(long)]
        client: String,
        /// Solicitor identifier.
        #[arg(long)]
        solicitor: String,
        /// Arbitrator identifier.
        #[arg(long)]
        arbitrator: String,
    },

    /// Deposit funds into custody (CREATED → FUNDED).
    Fund {
        /// Instance name.
        #[arg(long)]
        name: String,
        /// Calling party; must be the client.
        #[arg(long)]
        caller: String,
        /// Amount in smallest units.
        #[arg(long, allow_hyphen_values = true)]
        amount: String,
    },

    /// Declare the work done (FUNDED → COMPLETED).
    Confirm {
        /// Instance name.
        #[arg(long)]
        name: String,
        /// Calling party; must be the solicitor.
        #[arg(long)]
        caller: String,
    },

    /// Pay the solicitor (COMPLETED → PAID).
    Release {
        /// Instance name.
        #[arg(long)]
        name: String,
        /// Calling party; must be the client.
        #[arg(long)]
        caller: String,
    },

    /// Return the deposit before completion (FUNDED → REFUNDED).
    Refund {
        /// Instance name.
        #[arg(long)]
        name: String,
        /// Calling party; must be the client.
        #[arg(long)]
        caller: String,
    },

    /// Contest completed work (COMPLETED → DISPUTED).
    Dispute {
        /// Instance name.
        #[arg(long)]
        name: String,
        /// Calling party; must be the client.
        #[arg(long)]
        caller: String,
    },

    /// Decide a dispute (DISPUTED → PAID | REFUNDED).
    Resolve {
        /// Instance name.
        #[arg(long)]
        name: String,
        /// Calling party; must be the arbitrator.
        #[arg(long)]
        caller: String,
        /// `true` pays the solicitor, `false` refunds the client.
        #[arg(long, action = clap::ArgAction::Set)]
        pay_solicitor: bool,
    },

    /// Show an escrow's status.
    Status {
        /// Instance name.
        #[arg(long)]
        name: String,
    },

    /// Print an escrow's event log.
    Events {
        /// Instance name.
        #[arg(long)]
        name: String,
        /// First sequence number to print.
        #[arg(long, default_value_t = 0)]
        since: u64,
    },

    /// List all escrows.
    List,

    /// Show the custody pool and party balances.
    Balances,
}

// ─── State store ─────────────────────────────────────────────────────

const LOCK_FILE: &str = ".lock";
const LOCK_TIMEOUT: Duration = Duration::from_secs(10);
const LOCK_RETRY: Duration = Duration::from_millis(10);

#[derive(Serialize, Deserialize)]
struct Sealed<T> {
    digest: ContentDigest,
    state: T,
}

/// Digest-sealed JSON files under a state directory.
#[derive(Debug, Clone)]
pub struct StateStore {
    root: PathBuf,
}

impl StateStore {
    /// A store rooted at `root`. Nothing is created until the first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The state directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn instances_dir(&self) -> PathBuf {
        self.root.join("instances")
    }

    fn ledger_path(&self) -> PathBuf {
        self.root.join("ledger.json")
    }

    /// Path of an instance file. Names are restricted to
    /// `[A-Za-z0-9_.-]` and may not start with a dot.
    pub fn instance_path(&self, name: &str) -> Result<PathBuf> {
        let valid = !name.is_empty()
            && !name.starts_with('.')
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
        if !valid {
            bail!("invalid escrow name: {name:?}");
        }
        Ok(self.instances_dir().join(format!("{name}.json")))
    }

    /// Take the directory's exclusive lock, waiting up to ten seconds for
    /// another holder to finish. Released when the guard drops.
    pub fn lock(&self) -> Result<StoreLock> {
        std::fs::create_dir_all(&self.root)
            .with_context(|| format!("failed to create {}", self.root.display()))?;
        let path = self.root.join(LOCK_FILE);
        let deadline = Instant::now() + LOCK_TIMEOUT;
        loop {
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(mut file) => {
                    let lock = StoreLock { path };
                    writeln!(file, "{}", std::process::id())
                        .with_context(|| format!("failed to write {}", lock.path.display()))?;
                    return Ok(lock);
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    if Instant::now() >= deadline {
                        bail!(
                            "state directory {} is locked; remove {} if no escrow command is running",
                            self.root.display(),
                            path.display()
                        );
                    }
                    std::thread::sleep(LOCK_RETRY);
                }
                Err(e) => {
                    return Err(e).with_context(|| format!("failed to create {}", path.display()))
                }
            }
        }
    }

    /// Whether an instance file exists.
    pub fn exists(&self, name: &str) -> Result<bool> {
        Ok(self.instance_path(name)?.exists())
    }

    /// Load the ledger; a missing file is an empty ledger.
    pub fn load_ledger(&self) -> Result<InMemoryLedger> {
        let path = self.ledger_path();
        if !path.exists() {
            return Ok(InMemoryLedger::new());
        }
        let book: LedgerSnapshot = read_sealed(&path)?;
        Ok(InMemoryLedger::from_snapshot(book))
    }

    /// Persist the ledger.
    pub fn save_ledger(&self, ledger: &InMemoryLedger) -> Result<()> {
        write_sealed(&self.ledger_path(), &ledger.snapshot())
    }

    /// Load an instance snapshot.
    pub fn load_instance(&self, name: &str) -> Result<EscrowSnapshot> {
        let path = self.instance_path(name)?;
        if !path.exists() {
            bail!("escrow not found: {name}");
        }
        read_sealed(&path)
    }

    /// Persist an instance snapshot.
    pub fn save_instance(&self, name: &str, snapshot: &EscrowSnapshot) -> Result<()> {
        write_sealed(&self.instance_path(name)?, snapshot)
    }

    /// All readable instances, sorted by name. Unreadable files are skipped
    /// with a warning.
    pub fn list(&self) -> Result<Vec<(String, EscrowSnapshot)>> {
        let dir = self.instances_dir();
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut out = Vec::new();
        for entry in std::fs::read_dir(&dir)
            .with_context(|| format!("failed to read {}", dir.display()))?
            .flatten()
        {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            match read_sealed::<EscrowSnapshot>(&path) {
                Ok(snapshot) => out.push((name.to_string(), snapshot)),
                Err(e) => tracing::warn!(file = %path.display(), "skipping unreadable state file: {e:#}"),
            }
        }
        out.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(out)
    }
}

/// Exclusive hold on a state directory.
#[derive(Debug)]
pub struct StoreLock {
    path: PathBuf,
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            tracing::warn!(file = %self.path.display(), "failed to release state lock: {e}");
        }
    }
}

fn read_sealed<T: Serialize + DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let sealed: Sealed<T> = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse {}", path.display()))?;
    let actual = sha256_digest(&sealed.state)?;
    if actual != sealed.digest {
        bail!(
            "digest mismatch in {}: recorded {}, computed {}",
            path.display(),
            sealed.digest,
            actual
        );
    }
    Ok(sealed.state)
}

fn write_sealed<T: Serialize>(path: &Path, state: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let sealed = Sealed {
        digest: sha256_digest(state)?,
        state,
    };
    let json = serde_json::to_string_pretty(&sealed)?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, json).with_context(|| format!("failed to write {}", tmp.display()))?;
    std::fs::rename(&tmp, path).with_context(|| format!("failed to replace {}", path.display()))?;
    Ok(())
}

// ─── Dispatch ────────────────────────────────────────────────────────

/// An operation the escrow refused, as printed on stderr.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    /// Failure category.
    pub kind: EscrowErrorKind,
    /// Detail for the operator.
    pub message: String,
}

impl From<EscrowError> for Rejection {
    fn from(err: EscrowError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

/// Whether a subcommand was carried out or refused by the escrow.
pub type Outcome = std::result::Result<(), Rejection>;

/// Execute an escrow subcommand against `store` and print its result.
pub fn run_escrow(command: &EscrowCommand, store: &StateStore) -> Result<u8> {
    Ok(match execute(command, store)? {
        Ok(()) => 0,
        Err(rejection) => {
            eprintln!("ERROR: {rejection}");
            2
        }
    })
}

/// Execute an escrow subcommand, returning a refusal instead of printing it.
/// `Err` is reserved for failures outside the escrow: I/O, corrupt files,
/// unknown names.
pub fn execute(command: &EscrowCommand, store: &StateStore) -> Result<Outcome> {
    match command {
        EscrowCommand::Create {
            name,
            client,
            solicitor,
            arbitrator,
        } => cmd_create(store, name, client, solicitor, arbitrator),

        EscrowCommand::Fund {
            name,
            caller,
            amount,
        } => cmd_apply(store, name, caller, Operation::Fund, |m, who| {
            m.authorize(Operation::Fund, who)?;
            let units = Amount::parse(amount).map_err(|_| EscrowError::InvalidAmount {
                escrow_id: m.id(),
                amount: amount.clone(),
            })?;
            m.fund(who, units)?;
            Ok(format!("funded with {units}"))
        }),

        EscrowCommand::Confirm { name, caller } => {
            cmd_apply(store, name, caller, Operation::ConfirmCompletion, |m, who| {
                m.confirm_completion(who)?;
                Ok("work confirmed complete".to_string())
            })
        }

        EscrowCommand::Release { name, caller } => {
            cmd_apply(store, name, caller, Operation::ReleasePayment, |m, who| {
                m.release_payment(who).map(|r| paid("released", &r))
            })
        }

        EscrowCommand::Refund { name, caller } => {
            cmd_apply(store, name, caller, Operation::RefundBeforeCompletion, |m, who| {
                m.refund_before_completion(who).map(|r| paid("refunded", &r))
            })
        }

        EscrowCommand::Dispute { name, caller } => {
            cmd_apply(store, name, caller, Operation::OpenDispute, |m, who| {
                m.open_dispute(who)?;
                Ok("dispute opened".to_string())
            })
        }

        EscrowCommand::Resolve {
            name,
            caller,
            pay_solicitor,
        } => cmd_apply(store, name, caller, Operation::ResolveDispute, |m, who| {
            let verb = if *pay_solicitor { "released" } else { "refunded" };
            m.resolve_dispute(who, *pay_solicitor)
                .map(|r| format!("dispute resolved, {}", paid(verb, &r)))
        }),

        EscrowCommand::Status { name } => cmd_status(store, name),
        EscrowCommand::Events { name, since } => cmd_events(store, name, *since),
        EscrowCommand::List => cmd_list(store),
        EscrowCommand::Balances => cmd_balances(store),
    }
}

fn paid(verb: &str, receipt: &TransferReceipt) -> String {
    format!(
        "{verb} {} to {} ({})",
        receipt.amount, receipt.to, receipt.reference
    )
}

fn reject(name: &str, rejection: impl Into<Rejection>) -> Result<Outcome> {
    let rejection = rejection.into();
    tracing::debug!(escrow = name, kind = %rejection.kind, "operation rejected");
    Ok(Err(rejection))
}

fn cmd_create(
    store: &StateStore,
    name: &str,
    client: &str,
    solicitor: &str,
    arbitrator: &str,
) -> Result<Outcome> {
    let _lock = store.lock()?;
    if store.exists(name)? {
        bail!("escrow already exists: {name}");
    }
    let parties = match Parties::parse(client, solicitor, arbitrator) {
        Ok(p) => p,
        Err(e) => return reject(name, EscrowError::from(e)),
    };
    // Creation moves no value; ledger.json is not read.
    let ledger = InMemoryLedger::new();
    let machine = EscrowStateMachine::with_parties(parties, &ledger);
    store.save_instance(name, &machine.snapshot())?;

    println!("OK: created escrow {name} ({}) in {} state", machine.id(), machine.status());
    Ok(Ok(()))
}

/// Under the store lock: load an instance and the ledger, run `op` as
/// `caller`, and persist both on success.
fn cmd_apply<F>(
    store: &StateStore,
    name: &str,
    caller: &str,
    operation: Operation,
    op: F,
) -> Result<Outcome>
where
    F: FnOnce(&mut EscrowStateMachine<&InMemoryLedger>, &PartyId) -> Result<String, EscrowError>,
{
    let _lock = store.lock()?;
    let snapshot = store.load_instance(name)?;
    let ledger = store.load_ledger()?;
    let mut machine = EscrowStateMachine::from_snapshot(snapshot, &ledger)
        .with_context(|| format!("state file for {name} is inconsistent"))?;

    // An identity that cannot be a party never holds the required role.
    let caller = match PartyId::new(caller) {
        Ok(c) => c,
        Err(e) => {
            return reject(
                name,
                Rejection {
                    kind: EscrowErrorKind::Unauthorized,
                    message: format!(
                        "{operation} on {} requires the {}; {e}",
                        machine.id(),
                        operation.guard().role
                    ),
                },
            )
        }
    };

    let message = match op(&mut machine, &caller) {
        Ok(message) => message,
        Err(e) => return reject(name, e),
    };

    // Instance first: a crash between the writes can lose a ledger update
    // but never leaves a paid-out escrow looking payable.
    store.save_instance(name, &machine.snapshot())?;
    store.save_ledger(&ledger)?;

    println!("OK: {name}: {message}; status {}", machine.status());
    Ok(Ok(()))
}

fn cmd_status(store: &StateStore, name: &str) -> Result<Outcome> {
    let s = store.load_instance(name)?;

    println!("Escrow: {name}");
    println!("  Id: {}", s.id);
    println!("  Status: {}", s.status);
    println!("  Amount: {}", s.amount);
    println!("  Client: {}", s.parties.client());
    println!("  Solicitor: {}", s.parties.solicitor());
    println!("  Arbitrator: {}", s.parties.arbitrator());
    println!("  Created: {}", s.created_at);
    println!("  Events: {}", s.events.len());
    println!("  Transitions: {}", s.transitions.len());
    for (i, t) in s.transitions.iter().enumerate() {
        println!(
            "    [{i}] {} → {} by {} ({}) at {}",
            t.from, t.to, t.actor, t.operation, t.timestamp
        );
    }
    Ok(Ok(()))
}

fn cmd_events(store: &StateStore, name: &str, since: u64) -> Result<Outcome> {
    let s = store.load_instance(name)?;
    for event in s.events.iter().filter(|e| e.sequence >= since) {
        println!("[{}] {} {}", event.sequence, event.timestamp, event.kind);
    }
    Ok(Ok(()))
}

fn cmd_list(store: &StateStore) -> Result<Outcome> {
    let entries = store.list()?;
    if entries.is_empty() {
        println!("No escrows found.");
        return Ok(Ok(()));
    }
    println!("Escrows ({}):", entries.len());
    for (name, s) in &entries {
        println!("  {name}: {} (amount {})", s.status, s.amount);
    }
    Ok(Ok(()))
}

fn cmd_balances(store: &StateStore) -> Result<Outcome> {
    let book = store.load_ledger()?.snapshot();
    println!("Custody: {}", book.custody);
    for (party, amount) in &book.balances {
        println!("  {party}: {amount}");
    }
    println!("Receipts: {}", book.receipts.len());
    Ok(Ok(()))
}

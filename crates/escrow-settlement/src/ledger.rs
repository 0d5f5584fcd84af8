//! # In-Memory Custody Ledger
//!
//! A [`ValueTransferService`] backed by process memory. The ledger holds a
//! single custody pool (funds deposited into escrows and not yet paid out)
//! and a balance per party. A transfer debits custody and credits the
//! recipient under one write lock, so it either fully happens or not at all.
//!
//! The CLI persists the ledger between invocations through
//! [`LedgerSnapshot`]. Tests use the failure-injection knobs
//! ([`InMemoryLedger::fail_next`], [`InMemoryLedger::reject_party`]) to drive
//! the escrow's rollback path.
//!
//! All operations are synchronous. The lock is `parking_lot`, which does not
//! poison on panic.

use std::collections::{BTreeMap, BTreeSet};

use escrow_core::{Amount, PartyId, Timestamp};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::transfer::{TransferError, TransferReceipt, ValueTransferService};

/// Serializable ledger contents.
///
/// Failure-injection settings are deliberately not part of the snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    /// Funds held in custody across all escrows.
    pub custody: Amount,
    /// Settled balance per party.
    pub balances: BTreeMap<PartyId, Amount>,
    /// Every completed transfer, in order.
    pub receipts: Vec<TransferReceipt>,
}

#[derive(Debug, Default)]
struct LedgerState {
    book: LedgerSnapshot,
    fail_next: u32,
    rejected: BTreeSet<PartyId>,
}

/// Thread-safe in-memory custody ledger.
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    state: RwLock<LedgerState>,
}

impl InMemoryLedger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a ledger from persisted contents.
    pub fn from_snapshot(book: LedgerSnapshot) -> Self {
        Self {
            state: RwLock::new(LedgerState {
                book,
                ..LedgerState::default()
            }),
        }
    }

    /// Copy out the current contents.
    pub fn snapshot(&self) -> LedgerSnapshot {
        self.state.read().book.clone()
    }

    /// Add funds to the custody pool (a deposit arriving with `fund`).
    ///
    /// # Errors
    ///
    /// Returns [`TransferError::Unavailable`] if the pool would exceed
    /// `u64::MAX`; the pool is left unchanged.
    pub fn deposit_custody(&self, amount: Amount) -> Result<(), TransferError> {
        let mut guard = self.state.write();
        let next = guard.book.custody.checked_add(amount).ok_or_else(|| {
            TransferError::Unavailable(format!(
                "custody pool overflow depositing {amount} onto {}",
                guard.book.custody
            ))
        })?;
        guard.book.custody = next;
        tracing::debug!(%amount, custody = %next, "custody deposit");
        Ok(())
    }

    /// Funds currently held in custody.
    pub fn custody(&self) -> Amount {
        self.state.read().book.custody
    }

    /// Settled balance of a party (zero if never paid).
    pub fn balance_of(&self, party: &PartyId) -> Amount {
        self.state
            .read()
            .book
            .balances
            .get(party)
            .copied()
            .unwrap_or(Amount::ZERO)
    }

    /// All completed transfers, in order.
    pub fn receipts(&self) -> Vec<TransferReceipt> {
        self.state.read().book.receipts.clone()
    }

    /// Make the next `n` transfers fail with [`TransferError::Unavailable`].
    pub fn fail_next(&self, n: u32) {
        self.state.write().fail_next = n;
    }

    /// Refuse every transfer to `party` until [`clear_failures`](Self::clear_failures).
    pub fn reject_party(&self, party: PartyId) {
        self.state.write().rejected.insert(party);
    }

    /// Drop all injected failures.
    pub fn clear_failures(&self) {
        let mut guard = self.state.write();
        guard.fail_next = 0;
        guard.rejected.clear();
    }
}

impl ValueTransferService for InMemoryLedger {
    fn transfer(&self, to: &PartyId, amount: Amount) -> Result<TransferReceipt, TransferError> {
        let mut guard = self.state.write();

        if guard.rejected.contains(to) {
            tracing::debug!(%to, %amount, "transfer rejected: recipient blocked");
            return Err(TransferError::Rejected {
                to: to.clone(),
                amount,
                reason: "recipient blocked".into(),
            });
        }
        if guard.fail_next > 0 {
            guard.fail_next -= 1;
            tracing::debug!(%to, %amount, "transfer failed: injected outage");
            return Err(TransferError::Unavailable("injected outage".into()));
        }

        let available = guard.book.custody;
        let remaining = available
            .checked_sub(amount)
            .ok_or(TransferError::InsufficientCustody {
                requested: amount,
                available,
            })?;
        let credited = guard
            .book
            .balances
            .get(to)
            .copied()
            .unwrap_or(Amount::ZERO)
            .checked_add(amount)
            .ok_or_else(|| TransferError::Rejected {
                to: to.clone(),
                amount,
                reason: "recipient balance overflow".into(),
            })?;

        // All checks passed; apply both legs together.
        guard.book.custody = remaining;
        guard.book.balances.insert(to.clone(), credited);
        let receipt = TransferReceipt {
            reference: format!("tx-{}", Uuid::new_v4()),
            to: to.clone(),
            amount,
            timestamp: Timestamp::now(),
        };
        guard.book.receipts.push(receipt.clone());
        tracing::debug!(%to, %amount, custody = %remaining, reference = %receipt.reference, "transfer settled");
        Ok(receipt)
    }

    fn accept_deposit(&self, from: &PartyId, amount: Amount) -> Result<(), TransferError> {
        tracing::debug!(%from, %amount, "deposit accepted into custody");
        self.deposit_custody(amount)
    }
}

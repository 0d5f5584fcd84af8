//! # Shared Escrow Handle
//!
//! [`SharedEscrow`] lets many threads drive one escrow. Operations on the
//! same instance are serialized by a re-entrant lock around a `RefCell`:
//!
//! - another thread blocks until the in-flight operation finishes, then
//!   sees its result (so two racing `release_payment` calls pay once);
//! - the same thread calling back in while an operation is in flight (a
//!   transfer service that invokes the escrow from inside `transfer`)
//!   gets [`EscrowError::Reentrancy`] instead of a deadlock.
//!
//! Different instances never contend.

use std::cell::RefCell;
use std::sync::Arc;

use escrow_core::{Amount, EscrowId, PartyId};
use escrow_settlement::{TransferReceipt, ValueTransferService};
use parking_lot::ReentrantMutex;

use crate::error::EscrowError;
use crate::event::EscrowEvent;
use crate::machine::{EscrowSnapshot, EscrowStateMachine};
use crate::status::EscrowStatus;

/// Cloneable, thread-safe handle to one escrow.
pub struct SharedEscrow<T> {
    id: EscrowId,
    inner: Arc<ReentrantMutex<RefCell<EscrowStateMachine<T>>>>,
}

impl<T> Clone for SharedEscrow<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> std::fmt::Debug for SharedEscrow<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedEscrow").field("id", &self.id).finish()
    }
}

impl<T: ValueTransferService> SharedEscrow<T> {
    /// Wrap a machine for shared use.
    pub fn new(machine: EscrowStateMachine<T>) -> Self {
        Self {
            id: machine.id(),
            inner: Arc::new(ReentrantMutex::new(RefCell::new(machine))),
        }
    }

    /// Escrow identifier.
    pub fn id(&self) -> EscrowId {
        self.id
    }

    /// Run `f` with exclusive access to the machine.
    ///
    /// # Errors
    ///
    /// Returns [`EscrowError::Reentrancy`] if this thread is already inside
    /// an operation on the same escrow, otherwise whatever `f` returns.
    pub fn with_mut<R>(
        &self,
        f: impl FnOnce(&mut EscrowStateMachine<T>) -> Result<R, EscrowError>,
    ) -> Result<R, EscrowError> {
        let guard = self.inner.lock();
        let mut machine = guard.try_borrow_mut().map_err(|_| self.reentered())?;
        f(&mut *machine)
    }

    /// Read the machine.
    ///
    /// # Errors
    ///
    /// Returns [`EscrowError::Reentrancy`] when called from inside an
    /// in-flight operation on the same thread.
    pub fn inspect<R>(&self, f: impl FnOnce(&EscrowStateMachine<T>) -> R) -> Result<R, EscrowError> {
        let guard = self.inner.lock();
        let machine = guard.try_borrow().map_err(|_| self.reentered())?;
        Ok(f(&*machine))
    }

    fn reentered(&self) -> EscrowError {
        tracing::warn!(escrow = %self.id, "re-entrant call rejected");
        EscrowError::Reentrancy { escrow_id: self.id }
    }

    /// See [`EscrowStateMachine::fund`].
    pub fn fund(&self, caller: &PartyId, amount: Amount) -> Result<(), EscrowError> {
        self.with_mut(|m| m.fund(caller, amount))
    }

    /// See [`EscrowStateMachine::confirm_completion`].
    pub fn confirm_completion(&self, caller: &PartyId) -> Result<(), EscrowError> {
        self.with_mut(|m| m.confirm_completion(caller))
    }

    /// See [`EscrowStateMachine::release_payment`].
    pub fn release_payment(&self, caller: &PartyId) -> Result<TransferReceipt, EscrowError> {
        self.with_mut(|m| m.release_payment(caller))
    }

    /// See [`EscrowStateMachine::refund_before_completion`].
    pub fn refund_before_completion(
        &self,
        caller: &PartyId,
    ) -> Result<TransferReceipt, EscrowError> {
        self.with_mut(|m| m.refund_before_completion(caller))
    }

    /// See [`EscrowStateMachine::open_dispute`].
    pub fn open_dispute(&self, caller: &PartyId) -> Result<(), EscrowError> {
        self.with_mut(|m| m.open_dispute(caller))
    }

    /// See [`EscrowStateMachine::resolve_dispute`].
    pub fn resolve_dispute(
        &self,
        caller: &PartyId,
        pay_solicitor: bool,
    ) -> Result<TransferReceipt, EscrowError> {
        self.with_mut(|m| m.resolve_dispute(caller, pay_solicitor))
    }

    /// Current status.
    pub fn status(&self) -> Result<EscrowStatus, EscrowError> {
        self.inspect(|m| m.status())
    }

    /// Custodial balance.
    pub fn amount(&self) -> Result<Amount, EscrowError> {
        self.inspect(|m| m.amount())
    }

    /// Events with `sequence >= since`.
    pub fn events_since(&self, since: u64) -> Result<Vec<EscrowEvent>, EscrowError> {
        self.inspect(|m| m.events_since(since).to_vec())
    }

    /// Persistable state.
    pub fn snapshot(&self) -> Result<EscrowSnapshot, EscrowError> {
        self.inspect(|m| m.snapshot())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EscrowErrorKind;
    use escrow_settlement::{InMemoryLedger, TransferError};
    use parking_lot::Mutex;

    fn party(name: &str) -> PartyId {
        PartyId::new(name).unwrap()
    }

    #[test]
    fn racing_releases_pay_once() {
        let ledger = Arc::new(InMemoryLedger::new());
        let machine = EscrowStateMachine::create("A", "B", "C", Arc::clone(&ledger)).unwrap();
        let escrow = SharedEscrow::new(machine);
        escrow.fund(&party("A"), Amount::new(100)).unwrap();
        escrow.confirm_completion(&party("B")).unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let escrow = escrow.clone();
                std::thread::spawn(move || escrow.release_payment(&party("A")))
            })
            .collect();
        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        for err in results.iter().filter_map(|r| r.as_ref().err()) {
            assert_eq!(err.kind(), EscrowErrorKind::InvalidState);
        }
        assert_eq!(ledger.receipts().len(), 1);
        assert_eq!(ledger.balance_of(&party("B")), Amount::new(100));
        assert_eq!(escrow.status().unwrap(), EscrowStatus::Paid);
    }

    /// Transfer service that calls back into the escrow before paying.
    struct CallsBack {
        ledger: InMemoryLedger,
        target: Mutex<Option<SharedEscrow<Box<dyn ValueTransferService>>>>,
        observed: Mutex<Vec<EscrowError>>,
    }

    impl ValueTransferService for CallsBack {
        fn transfer(&self, to: &PartyId, amount: Amount) -> Result<TransferReceipt, TransferError> {
            let target = self.target.lock().clone();
            if let Some(escrow) = target {
                if let Err(e) = escrow.release_payment(&party("A")) {
                    self.observed.lock().push(e);
                }
                if let Err(e) = escrow.status() {
                    self.observed.lock().push(e);
                }
            }
            self.ledger.transfer(to, amount)
        }

        fn accept_deposit(&self, from: &PartyId, amount: Amount) -> Result<(), TransferError> {
            self.ledger.accept_deposit(from, amount)
        }
    }

    #[test]
    fn reentrant_transfer_is_rejected() {
        let hook = Arc::new(CallsBack {
            ledger: InMemoryLedger::new(),
            target: Mutex::new(None),
            observed: Mutex::new(Vec::new()),
        });
        let settlement: Box<dyn ValueTransferService> = Box::new(Arc::clone(&hook));
        let escrow = SharedEscrow::new(EscrowStateMachine::create("A", "B", "C", settlement).unwrap());
        *hook.target.lock() = Some(escrow.clone());

        escrow.fund(&party("A"), Amount::new(50)).unwrap();
        escrow.confirm_completion(&party("B")).unwrap();
        let receipt = escrow.release_payment(&party("A")).unwrap();
        hook.target.lock().take();

        assert_eq!(receipt.amount, Amount::new(50));
        let observed = hook.observed.lock();
        assert_eq!(observed.len(), 2);
        assert!(observed
            .iter()
            .all(|e| e.kind() == EscrowErrorKind::Reentrancy));
        assert_eq!(hook.ledger.receipts().len(), 1);
        assert_eq!(escrow.status().unwrap(), EscrowStatus::Paid);
        assert_eq!(escrow.events_since(0).unwrap().len(), 3);
    }

    #[test]
    fn handles_share_one_instance() {
        let ledger = InMemoryLedger::new();
        let a = SharedEscrow::new(EscrowStateMachine::create("A", "B", "C", ledger).unwrap());
        let b = a.clone();
        a.fund(&party("A"), Amount::new(3)).unwrap();
        assert_eq!(b.amount().unwrap(), Amount::new(3));
        assert_eq!(a.id(), b.id());
        assert_eq!(b.snapshot().unwrap().status, EscrowStatus::Funded);
    }
}

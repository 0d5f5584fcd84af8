//! # Escrow State Machine
//!
//! [`EscrowStateMachine`] owns one escrow: the bound parties, the custodial
//! balance, the status, and the event log. It drives a
//! [`ValueTransferService`] for payouts.
//!
//! ## Admission
//!
//! Every operation first evaluates its [`Guard`](crate::guard::Guard): the
//! caller's role, then the exact precondition status. A rejected call
//! returns before anything is mutated.
//!
//! ## Payout
//!
//! `release_payment`, `refund_before_completion`, and both outcomes of
//! `resolve_dispute` share one sequence:
//!
//! 1. capture the custodial balance, failing with `EmptyEscrow` if it is zero;
//! 2. zero the balance;
//! 3. hand the captured amount to the transfer service;
//! 4. on failure restore the balance and return `TransferFailed`;
//! 5. on success advance to the terminal status and emit the payout event.
//!
//! The balance is already zero while the transfer runs, so no code path
//! observing the instance mid-transfer can pay out a second time.

use escrow_core::{Amount, EscrowId, PartyId, Timestamp, ValidationError};
use escrow_settlement::{TransferReceipt, ValueTransferService};
use serde::{Deserialize, Serialize};

use crate::error::EscrowError;
use crate::event::{EscrowEvent, EscrowEventKind, TransitionRecord};
use crate::guard::{Operation, Parties, Role};
use crate::status::EscrowStatus;

// ─── Snapshot ────────────────────────────────────────────────────────

/// Serializable state of one escrow, without its transfer service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscrowSnapshot {
    /// Escrow identifier.
    pub id: EscrowId,
    /// Bound parties.
    pub parties: Parties,
    /// Custodial balance.
    pub amount: Amount,
    /// Current status.
    pub status: EscrowStatus,
    /// When the escrow was created.
    pub created_at: Timestamp,
    /// Event log.
    pub events: Vec<EscrowEvent>,
    /// Status change history.
    pub transitions: Vec<TransitionRecord>,
}

// ─── State machine ───────────────────────────────────────────────────

/// A single three-party escrow.
#[derive(Debug)]
pub struct EscrowStateMachine<T> {
    id: EscrowId,
    parties: Parties,
    amount: Amount,
    status: EscrowStatus,
    created_at: Timestamp,
    events: Vec<EscrowEvent>,
    transitions: Vec<TransitionRecord>,
    settlement: T,
}

impl<T: ValueTransferService> EscrowStateMachine<T> {
    /// Create an escrow from raw party identifiers.
    ///
    /// # Errors
    ///
    /// Returns [`EscrowError::InvalidConstruction`] if any identifier is
    /// null or any two coincide.
    pub fn create(
        client: &str,
        solicitor: &str,
        arbitrator: &str,
        settlement: T,
    ) -> Result<Self, EscrowError> {
        let parties = Parties::parse(client, solicitor, arbitrator)?;
        Ok(Self::with_parties(parties, settlement))
    }

    /// Create an escrow for already-validated parties.
    pub fn with_parties(parties: Parties, settlement: T) -> Self {
        let machine = Self {
            id: EscrowId::new(),
            parties,
            amount: Amount::ZERO,
            status: EscrowStatus::Created,
            created_at: Timestamp::now(),
            events: Vec::new(),
            transitions: Vec::new(),
            settlement,
        };
        tracing::info!(
            escrow = %machine.id,
            client = %machine.parties.client(),
            solicitor = %machine.parties.solicitor(),
            arbitrator = %machine.parties.arbitrator(),
            "escrow created"
        );
        machine
    }

    /// Restore an escrow from a snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`EscrowError::InvalidConstruction`] if the snapshot breaks
    /// an identity, balance, or log invariant.
    pub fn from_snapshot(snapshot: EscrowSnapshot, settlement: T) -> Result<Self, EscrowError> {
        let EscrowSnapshot {
            id,
            parties,
            amount,
            status,
            created_at,
            events,
            transitions,
        } = snapshot;

        // Re-run the construction checks on the persisted identities.
        let parties = Parties::new(
            parties.client().clone(),
            parties.solicitor().clone(),
            parties.arbitrator().clone(),
        )?;

        if status.holds_funds() == amount.is_zero() {
            return Err(inconsistent(format!(
                "status {status} with custodial balance {amount}"
            )));
        }
        for (i, event) in events.iter().enumerate() {
            if event.sequence != i as u64 || event.escrow_id != id {
                return Err(inconsistent(format!(
                    "event {i} has sequence {} for {}",
                    event.sequence, event.escrow_id
                )));
            }
        }
        let mut cursor = EscrowStatus::Created;
        for record in &transitions {
            if record.from != cursor || !record.from.can_transition_to(record.to) {
                return Err(inconsistent(format!(
                    "transition {} -> {} does not follow {cursor}",
                    record.from, record.to
                )));
            }
            cursor = record.to;
        }
        if cursor != status {
            return Err(inconsistent(format!(
                "transitions end at {cursor} but status is {status}"
            )));
        }

        Ok(Self {
            id,
            parties,
            amount,
            status,
            created_at,
            events,
            transitions,
            settlement,
        })
    }

    /// Capture the persistable state.
    pub fn snapshot(&self) -> EscrowSnapshot {
        EscrowSnapshot {
            id: self.id,
            parties: self.parties.clone(),
            amount: self.amount,
            status: self.status,
            created_at: self.created_at,
            events: self.events.clone(),
            transitions: self.transitions.clone(),
        }
    }

    // ── Accessors ────────────────────────────────────────────────────

    /// Escrow identifier.
    pub fn id(&self) -> EscrowId {
        self.id
    }

    /// Bound parties.
    pub fn parties(&self) -> &Parties {
        &self.parties
    }

    /// Custodial balance.
    pub fn amount(&self) -> Amount {
        self.amount
    }

    /// Current status.
    pub fn status(&self) -> EscrowStatus {
        self.status
    }

    /// When the escrow was created.
    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    /// The full event log.
    pub fn events(&self) -> &[EscrowEvent] {
        &self.events
    }

    /// Events with `sequence >= since`.
    pub fn events_since(&self, since: u64) -> &[EscrowEvent] {
        let start = usize::try_from(since)
            .unwrap_or(usize::MAX)
            .min(self.events.len());
        &self.events[start..]
    }

    /// Status change history.
    pub fn transitions(&self) -> &[TransitionRecord] {
        &self.transitions
    }

    /// The transfer service.
    pub fn settlement(&self) -> &T {
        &self.settlement
    }

    /// Whether the escrow has reached `Paid` or `Refunded`.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Role of `caller` in this escrow, if any.
    pub fn role_of(&self, caller: &PartyId) -> Option<Role> {
        self.parties.role_of(caller)
    }

    /// Evaluate the operation's guard without running it: role first, then
    /// status. Every operation calls this before looking at its other inputs.
    pub fn authorize(&self, operation: Operation, caller: &PartyId) -> Result<(), EscrowError> {
        let guard = operation.guard();
        if !self.parties.holds(guard.role, caller) {
            tracing::warn!(
                escrow = %self.id,
                %operation,
                %caller,
                required = %guard.role,
                "caller lacks required role"
            );
            return Err(EscrowError::Unauthorized {
                escrow_id: self.id,
                operation,
                required: guard.role,
                caller: caller.clone(),
            });
        }
        if self.status != guard.from {
            tracing::warn!(
                escrow = %self.id,
                %operation,
                expected = %guard.from,
                actual = %self.status,
                "operation not allowed in current status"
            );
            return Err(EscrowError::InvalidState {
                escrow_id: self.id,
                operation,
                expected: guard.from,
                actual: self.status,
            });
        }
        Ok(())
    }

    // ── Operations ───────────────────────────────────────────────────

    /// Client deposits `amount` (Created → Funded).
    ///
    /// # Errors
    ///
    /// `Unauthorized`, `InvalidState`, `InvalidAmount` for a zero deposit,
    /// or `TransferFailed` if settlement would not take custody.
    pub fn fund(&mut self, caller: &PartyId, amount: Amount) -> Result<(), EscrowError> {
        self.authorize(Operation::Fund, caller)?;
        if amount.is_zero() {
            tracing::warn!(escrow = %self.id, %caller, "rejected zero deposit");
            return Err(EscrowError::InvalidAmount {
                escrow_id: self.id,
                amount: amount.to_string(),
            });
        }
        self.settlement
            .accept_deposit(caller, amount)
            .map_err(|source| {
                tracing::warn!(escrow = %self.id, %amount, error = %source, "deposit refused by settlement");
                EscrowError::TransferFailed {
                    escrow_id: self.id,
                    operation: Operation::Fund,
                    to: caller.clone(),
                    amount,
                    source,
                }
            })?;

        self.amount = amount;
        self.advance(Operation::Fund, caller, EscrowStatus::Funded);
        self.emit(EscrowEventKind::Funded {
            from: caller.clone(),
            amount,
        });
        Ok(())
    }

    /// Solicitor declares the work done (Funded → Completed).
    ///
    /// # Errors
    ///
    /// `Unauthorized` or `InvalidState`.
    pub fn confirm_completion(&mut self, caller: &PartyId) -> Result<(), EscrowError> {
        self.authorize(Operation::ConfirmCompletion, caller)?;
        self.advance(Operation::ConfirmCompletion, caller, EscrowStatus::Completed);
        self.emit(EscrowEventKind::WorkCompleted { by: caller.clone() });
        Ok(())
    }

    /// Client pays the solicitor (Completed → Paid).
    ///
    /// # Errors
    ///
    /// `Unauthorized`, `InvalidState`, `EmptyEscrow`, or `TransferFailed`.
    pub fn release_payment(&mut self, caller: &PartyId) -> Result<TransferReceipt, EscrowError> {
        self.authorize(Operation::ReleasePayment, caller)?;
        let to = self.parties.solicitor().clone();
        let receipt = self.payout(Operation::ReleasePayment, caller, &to, EscrowStatus::Paid)?;
        self.emit(EscrowEventKind::PaymentReleased {
            to,
            amount: receipt.amount,
        });
        Ok(receipt)
    }

    /// Client takes the deposit back before completion (Funded → Refunded).
    ///
    /// # Errors
    ///
    /// `Unauthorized`, `InvalidState`, `EmptyEscrow`, or `TransferFailed`.
    pub fn refund_before_completion(
        &mut self,
        caller: &PartyId,
    ) -> Result<TransferReceipt, EscrowError> {
        self.authorize(Operation::RefundBeforeCompletion, caller)?;
        let to = self.parties.client().clone();
        let receipt = self.payout(
            Operation::RefundBeforeCompletion,
            caller,
            &to,
            EscrowStatus::Refunded,
        )?;
        self.emit(EscrowEventKind::Refunded {
            to,
            amount: receipt.amount,
        });
        Ok(receipt)
    }

    /// Client contests completed work (Completed → Disputed).
    ///
    /// # Errors
    ///
    /// `Unauthorized` or `InvalidState`.
    pub fn open_dispute(&mut self, caller: &PartyId) -> Result<(), EscrowError> {
        self.authorize(Operation::OpenDispute, caller)?;
        self.advance(Operation::OpenDispute, caller, EscrowStatus::Disputed);
        self.emit(EscrowEventKind::DisputeOpened { by: caller.clone() });
        Ok(())
    }

    /// Arbitrator pays the solicitor (`pay_solicitor`) or refunds the
    /// client (Disputed → Paid | Refunded).
    ///
    /// Emits the payout event, then `DisputeResolved`.
    ///
    /// # Errors
    ///
    /// `Unauthorized`, `InvalidState`, `EmptyEscrow`, or `TransferFailed`.
    pub fn resolve_dispute(
        &mut self,
        caller: &PartyId,
        pay_solicitor: bool,
    ) -> Result<TransferReceipt, EscrowError> {
        self.authorize(Operation::ResolveDispute, caller)?;
        let (to, terminal) = if pay_solicitor {
            (self.parties.solicitor().clone(), EscrowStatus::Paid)
        } else {
            (self.parties.client().clone(), EscrowStatus::Refunded)
        };
        let receipt = self.payout(Operation::ResolveDispute, caller, &to, terminal)?;
        let amount = receipt.amount;
        self.emit(if pay_solicitor {
            EscrowEventKind::PaymentReleased { to, amount }
        } else {
            EscrowEventKind::Refunded { to, amount }
        });
        self.emit(EscrowEventKind::DisputeResolved {
            by: caller.clone(),
            paid_to_solicitor: pay_solicitor,
        });
        Ok(receipt)
    }

    // ── Internals ────────────────────────────────────────────────────

    /// Zero the balance, transfer, then commit or restore.
    fn payout(
        &mut self,
        operation: Operation,
        caller: &PartyId,
        to: &PartyId,
        terminal: EscrowStatus,
    ) -> Result<TransferReceipt, EscrowError> {
        let held = self.amount;
        if held.is_zero() {
            return Err(EscrowError::EmptyEscrow {
                escrow_id: self.id,
                operation,
            });
        }

        self.amount = Amount::ZERO;
        match self.settlement.transfer(to, held) {
            Ok(receipt) => {
                self.advance(operation, caller, terminal);
                Ok(receipt)
            }
            Err(source) => {
                self.amount = held;
                tracing::warn!(
                    escrow = %self.id,
                    %operation,
                    %to,
                    amount = %held,
                    error = %source,
                    "transfer failed; custodial balance restored"
                );
                Err(EscrowError::TransferFailed {
                    escrow_id: self.id,
                    operation,
                    to: to.clone(),
                    amount: held,
                    source,
                })
            }
        }
    }

    fn advance(&mut self, operation: Operation, actor: &PartyId, to: EscrowStatus) {
        let from = self.status;
        debug_assert!(from.can_transition_to(to), "{from} -> {to}");
        self.status = to;
        self.transitions.push(TransitionRecord {
            from,
            to,
            operation,
            actor: actor.clone(),
            timestamp: Timestamp::now(),
        });
        tracing::info!(
            escrow = %self.id,
            %operation,
            %actor,
            %from,
            %to,
            amount = %self.amount,
            "escrow transition"
        );
    }

    fn emit(&mut self, kind: EscrowEventKind) {
        let event = EscrowEvent {
            sequence: self.events.len() as u64,
            escrow_id: self.id,
            timestamp: Timestamp::now(),
            kind,
        };
        tracing::debug!(escrow = %self.id, sequence = event.sequence, event = %event.kind, "event emitted");
        self.events.push(event);
    }
}

fn inconsistent(msg: String) -> EscrowError {
    EscrowError::InvalidConstruction(ValidationError::InconsistentRecord(msg))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EscrowErrorKind;
    use escrow_settlement::{InMemoryLedger, TransferError};
    use std::sync::Arc;

    fn party(name: &str) -> PartyId {
        PartyId::new(name).unwrap()
    }

    fn escrow() -> (EscrowStateMachine<Arc<InMemoryLedger>>, Arc<InMemoryLedger>) {
        let ledger = Arc::new(InMemoryLedger::new());
        let machine = EscrowStateMachine::create("A", "B", "C", Arc::clone(&ledger)).unwrap();
        (machine, ledger)
    }

    fn funded(units: u64) -> (EscrowStateMachine<Arc<InMemoryLedger>>, Arc<InMemoryLedger>) {
        let (mut m, ledger) = escrow();
        m.fund(&party("A"), Amount::new(units)).unwrap();
        (m, ledger)
    }

    fn completed(units: u64) -> (EscrowStateMachine<Arc<InMemoryLedger>>, Arc<InMemoryLedger>) {
        let (mut m, ledger) = funded(units);
        m.confirm_completion(&party("B")).unwrap();
        (m, ledger)
    }

    fn disputed(units: u64) -> (EscrowStateMachine<Arc<InMemoryLedger>>, Arc<InMemoryLedger>) {
        let (mut m, ledger) = completed(units);
        m.open_dispute(&party("A")).unwrap();
        (m, ledger)
    }

    fn names(m: &EscrowStateMachine<Arc<InMemoryLedger>>) -> Vec<&'static str> {
        m.events().iter().map(|e| e.kind.name()).collect()
    }

    #[test]
    fn create_starts_empty() {
        let (m, _) = escrow();
        assert_eq!(m.status(), EscrowStatus::Created);
        assert_eq!(m.amount(), Amount::ZERO);
        assert!(m.events().is_empty());
        assert_eq!(m.role_of(&party("C")), Some(Role::Arbitrator));
    }

    #[test]
    fn create_rejects_bad_identities() {
        let ledger = InMemoryLedger::new();
        for (c, s, a) in [("A", "A", "C"), ("", "B", "C"), ("A", "B", "0x00")] {
            let err = EscrowStateMachine::create(c, s, a, &ledger).unwrap_err();
            assert_eq!(err.kind(), EscrowErrorKind::InvalidConstruction);
        }
    }

    #[test]
    fn release_path() {
        let (mut m, ledger) = completed(100);
        let receipt = m.release_payment(&party("A")).unwrap();
        assert_eq!(receipt.to, party("B"));
        assert_eq!(receipt.amount, Amount::new(100));
        assert_eq!(m.status(), EscrowStatus::Paid);
        assert_eq!(m.amount(), Amount::ZERO);
        assert_eq!(ledger.balance_of(&party("B")), Amount::new(100));
        assert_eq!(ledger.custody(), Amount::ZERO);
        assert_eq!(
            names(&m),
            ["Funded", "WorkCompleted", "PaymentReleased"]
        );
        assert_eq!(
            m.events()[2].kind,
            EscrowEventKind::PaymentReleased {
                to: party("B"),
                amount: Amount::new(100)
            }
        );
    }

    #[test]
    fn refund_before_completion_returns_deposit() {
        let (mut m, ledger) = funded(40);
        m.refund_before_completion(&party("A")).unwrap();
        assert_eq!(m.status(), EscrowStatus::Refunded);
        assert_eq!(ledger.balance_of(&party("A")), Amount::new(40));
        assert_eq!(m.amount(), Amount::ZERO);
    }

    #[test]
    fn dispute_for_client_emits_refund_then_resolution() {
        let (mut m, ledger) = disputed(100);
        m.resolve_dispute(&party("C"), false).unwrap();
        assert_eq!(m.status(), EscrowStatus::Refunded);
        assert_eq!(ledger.balance_of(&party("A")), Amount::new(100));
        let tail: Vec<_> = m.events_since(3).iter().map(|e| e.kind.clone()).collect();
        assert_eq!(
            tail,
            vec![
                EscrowEventKind::Refunded {
                    to: party("A"),
                    amount: Amount::new(100)
                },
                EscrowEventKind::DisputeResolved {
                    by: party("C"),
                    paid_to_solicitor: false
                },
            ]
        );
    }

    #[test]
    fn dispute_for_solicitor_pays() {
        let (mut m, ledger) = disputed(75);
        m.resolve_dispute(&party("C"), true).unwrap();
        assert_eq!(m.status(), EscrowStatus::Paid);
        assert_eq!(ledger.balance_of(&party("B")), Amount::new(75));
        assert_eq!(
            names(&m),
            [
                "Funded",
                "WorkCompleted",
                "DisputeOpened",
                "PaymentReleased",
                "DisputeResolved"
            ]
        );
    }

    #[test]
    fn zero_deposit_rejected() {
        let (mut m, ledger) = escrow();
        let err = m.fund(&party("A"), Amount::ZERO).unwrap_err();
        assert_eq!(err.kind(), EscrowErrorKind::InvalidAmount);
        assert_eq!(m.status(), EscrowStatus::Created);
        assert!(m.events().is_empty());
        assert_eq!(ledger.custody(), Amount::ZERO);
    }

    #[test]
    fn second_release_is_invalid_state() {
        let (mut m, ledger) = completed(100);
        m.release_payment(&party("A")).unwrap();
        let err = m.release_payment(&party("A")).unwrap_err();
        assert_eq!(
            err,
            EscrowError::InvalidState {
                escrow_id: m.id(),
                operation: Operation::ReleasePayment,
                expected: EscrowStatus::Completed,
                actual: EscrowStatus::Paid,
            }
        );
        assert_eq!(ledger.receipts().len(), 1);
        assert_eq!(m.events().len(), 3);
    }

    #[test]
    fn wrong_role_is_unauthorized_even_in_wrong_state() {
        let (mut m, _) = escrow();
        // Solicitor calling release while status is Created: role wins.
        let err = m.release_payment(&party("B")).unwrap_err();
        assert_eq!(err.kind(), EscrowErrorKind::Unauthorized);
        let err = m.confirm_completion(&party("A")).unwrap_err();
        assert_eq!(err.kind(), EscrowErrorKind::Unauthorized);
        let err = m.resolve_dispute(&party("mallory"), true).unwrap_err();
        assert_eq!(err.kind(), EscrowErrorKind::Unauthorized);
        assert_eq!(m.status(), EscrowStatus::Created);
        assert!(m.events().is_empty());
    }

    #[test]
    fn authorize_matches_operation_outcome_without_mutating() {
        let (mut m, ledger) = completed(100);
        let before = m.snapshot();
        assert_eq!(
            m.authorize(Operation::Fund, &party("B")).unwrap_err().kind(),
            EscrowErrorKind::Unauthorized
        );
        assert_eq!(
            m.authorize(Operation::Fund, &party("A")).unwrap_err().kind(),
            EscrowErrorKind::InvalidState
        );
        m.authorize(Operation::ReleasePayment, &party("A")).unwrap();
        assert_eq!(m.snapshot(), before);
        assert!(ledger.receipts().is_empty());

        m.release_payment(&party("A")).unwrap();
        assert_eq!(
            m.authorize(Operation::ReleasePayment, &party("A")).unwrap_err().kind(),
            EscrowErrorKind::InvalidState
        );
    }

    #[test]
    fn failed_transfer_rolls_back() {
        let (mut m, ledger) = completed(100);
        let before = m.snapshot();
        ledger.fail_next(1);
        let err = m.release_payment(&party("A")).unwrap_err();
        assert!(matches!(
            err,
            EscrowError::TransferFailed {
                source: TransferError::Unavailable(_),
                ..
            }
        ));
        assert_eq!(m.snapshot(), before);
        assert_eq!(ledger.custody(), Amount::new(100));

        // Caller retries explicitly and succeeds.
        m.release_payment(&party("A")).unwrap();
        assert_eq!(m.status(), EscrowStatus::Paid);
    }

    #[test]
    fn rejected_recipient_rolls_back_dispute() {
        let (mut m, ledger) = disputed(100);
        ledger.reject_party(party("B"));
        let before = m.snapshot();
        assert_eq!(
            m.resolve_dispute(&party("C"), true).unwrap_err().kind(),
            EscrowErrorKind::TransferFailed
        );
        assert_eq!(m.snapshot(), before);
        // The arbitrator may still rule the other way.
        m.resolve_dispute(&party("C"), false).unwrap();
        assert_eq!(m.status(), EscrowStatus::Refunded);
    }

    #[test]
    fn refused_deposit_leaves_escrow_unfunded() {
        struct NoCustody;
        impl ValueTransferService for NoCustody {
            fn transfer(
                &self,
                _to: &PartyId,
                _amount: Amount,
            ) -> Result<TransferReceipt, TransferError> {
                Err(TransferError::Unavailable("offline".into()))
            }
            fn accept_deposit(&self, _from: &PartyId, _amount: Amount) -> Result<(), TransferError> {
                Err(TransferError::Unavailable("offline".into()))
            }
        }
        let mut m = EscrowStateMachine::create("A", "B", "C", NoCustody).unwrap();
        let err = m.fund(&party("A"), Amount::new(5)).unwrap_err();
        assert_eq!(err.kind(), EscrowErrorKind::TransferFailed);
        assert_eq!(m.status(), EscrowStatus::Created);
        assert_eq!(m.amount(), Amount::ZERO);
    }

    #[test]
    fn transfer_receives_whole_balance_once() {
        use parking_lot::Mutex;

        #[derive(Default)]
        struct Recorder {
            seen: Mutex<Vec<Amount>>,
        }
        impl ValueTransferService for Recorder {
            fn transfer(
                &self,
                to: &PartyId,
                amount: Amount,
            ) -> Result<TransferReceipt, TransferError> {
                self.seen.lock().push(amount);
                Ok(TransferReceipt {
                    reference: "recorded".into(),
                    to: to.clone(),
                    amount,
                    timestamp: Timestamp::now(),
                })
            }
        }

        let mut m = EscrowStateMachine::create("A", "B", "C", Recorder::default()).unwrap();
        m.fund(&party("A"), Amount::new(9)).unwrap();
        m.refund_before_completion(&party("A")).unwrap();
        assert_eq!(*m.settlement().seen.lock(), vec![Amount::new(9)]);
    }

    #[test]
    fn snapshot_round_trip_through_json() {
        let (m, ledger) = disputed(100);
        let json = serde_json::to_string(&m.snapshot()).unwrap();
        let restored =
            EscrowStateMachine::from_snapshot(serde_json::from_str(&json).unwrap(), ledger)
                .unwrap();
        assert_eq!(restored.snapshot(), m.snapshot());
        assert_eq!(restored.status(), EscrowStatus::Disputed);
    }

    #[test]
    fn corrupt_snapshot_rejected() {
        let (m, ledger) = funded(10);

        let mut zeroed = m.snapshot();
        zeroed.amount = Amount::ZERO;
        assert_eq!(
            EscrowStateMachine::from_snapshot(zeroed, Arc::clone(&ledger))
                .unwrap_err()
                .kind(),
            EscrowErrorKind::InvalidConstruction
        );

        let mut skipped = m.snapshot();
        skipped.status = EscrowStatus::Completed;
        assert!(EscrowStateMachine::from_snapshot(skipped, Arc::clone(&ledger)).is_err());

        let mut renumbered = m.snapshot();
        renumbered.events[0].sequence = 7;
        assert!(EscrowStateMachine::from_snapshot(renumbered, ledger).is_err());
    }

    #[test]
    fn transitions_record_actor_and_operation() {
        let (m, _) = completed(1);
        let t = m.transitions();
        assert_eq!(t.len(), 2);
        assert_eq!(t[0].operation, Operation::Fund);
        assert_eq!(t[0].actor, party("A"));
        assert_eq!((t[1].from, t[1].to), (EscrowStatus::Funded, EscrowStatus::Completed));
        assert_eq!(t[1].actor, party("B"));
    }

    #[test]
    fn events_since_clamps() {
        let (m, _) = completed(1);
        assert_eq!(m.events_since(0).len(), 2);
        assert_eq!(m.events_since(1).len(), 1);
        assert!(m.events_since(99).is_empty());
    }
}

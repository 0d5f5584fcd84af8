//! # Value Transfer Service
//!
//! Defines [`ValueTransferService`], the single external collaborator of the
//! escrow. An implementation moves custodial funds to a recipient and reports
//! the outcome atomically: on `Ok` the funds have moved, on `Err` nothing has.
//!
//! ## Object Safety
//!
//! The trait is object-safe and `Send + Sync`, so a service can be held as
//! `Box<dyn ValueTransferService>` or shared behind an `Arc` between an
//! escrow and whatever inspects balances.

use std::sync::Arc;

use escrow_core::{Amount, PartyId, Timestamp};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Errors a transfer can report. In every case no value has moved.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransferError {
    /// The settlement layer refused the transfer.
    #[error("transfer of {amount} to {to} rejected: {reason}")]
    Rejected {
        /// Intended recipient.
        to: PartyId,
        /// Intended amount.
        amount: Amount,
        /// Why the transfer was refused.
        reason: String,
    },

    /// The custody pool holds less than the requested amount.
    #[error("insufficient custody: requested {requested}, available {available}")]
    InsufficientCustody {
        /// Amount the escrow tried to move.
        requested: Amount,
        /// Amount actually held in custody.
        available: Amount,
    },

    /// The settlement layer could not be reached.
    #[error("settlement unavailable: {0}")]
    Unavailable(String),
}

// ---------------------------------------------------------------------------
// Receipt
// ---------------------------------------------------------------------------

/// Proof of a completed transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferReceipt {
    /// Settlement-assigned reference.
    pub reference: String,
    /// Recipient of the funds.
    pub to: PartyId,
    /// Amount moved.
    pub amount: Amount,
    /// When the transfer settled.
    pub timestamp: Timestamp,
}

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Moves custodial funds to a recipient.
///
/// Implementations must be atomic: either the full `amount` reaches `to` and
/// a receipt is returned, or an error is returned and no balance changed.
/// They must never drop custodial funds on the floor.
pub trait ValueTransferService: Send + Sync {
    /// Transfer `amount` from custody to `to`.
    ///
    /// # Errors
    ///
    /// Returns a [`TransferError`] when the transfer did not take place.
    fn transfer(&self, to: &PartyId, amount: Amount) -> Result<TransferReceipt, TransferError>;

    /// Take custody of a deposit arriving from `from`.
    ///
    /// Called by `fund` before the escrow records the deposit. Settlement
    /// layers where the value arrives with the call itself keep the default,
    /// which accepts unconditionally.
    ///
    /// # Errors
    ///
    /// Returns a [`TransferError`] when custody could not be taken; the
    /// escrow then stays unfunded.
    fn accept_deposit(&self, from: &PartyId, amount: Amount) -> Result<(), TransferError> {
        let _ = (from, amount);
        Ok(())
    }
}

impl<T: ValueTransferService + ?Sized> ValueTransferService for &T {
    fn transfer(&self, to: &PartyId, amount: Amount) -> Result<TransferReceipt, TransferError> {
        (**self).transfer(to, amount)
    }

    fn accept_deposit(&self, from: &PartyId, amount: Amount) -> Result<(), TransferError> {
        (**self).accept_deposit(from, amount)
    }
}

impl<T: ValueTransferService + ?Sized> ValueTransferService for Arc<T> {
    fn transfer(&self, to: &PartyId, amount: Amount) -> Result<TransferReceipt, TransferError> {
        (**self).transfer(to, amount)
    }

    fn accept_deposit(&self, from: &PartyId, amount: Amount) -> Result<(), TransferError> {
        (**self).accept_deposit(from, amount)
    }
}

impl<T: ValueTransferService + ?Sized> ValueTransferService for Box<T> {
    fn transfer(&self, to: &PartyId, amount: Amount) -> Result<TransferReceipt, TransferError> {
        (**self).transfer(to, amount)
    }

    fn accept_deposit(&self, from: &PartyId, amount: Amount) -> Result<(), TransferError> {
        (**self).accept_deposit(from, amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Always refuses.
    struct Closed;

    impl ValueTransferService for Closed {
        fn transfer(
            &self,
            _to: &PartyId,
            _amount: Amount,
        ) -> Result<TransferReceipt, TransferError> {
            Err(TransferError::Unavailable("closed for maintenance".into()))
        }
    }

    /// Always accepts.
    struct Open;

    impl ValueTransferService for Open {
        fn transfer(&self, to: &PartyId, amount: Amount) -> Result<TransferReceipt, TransferError> {
            Ok(TransferReceipt {
                reference: "open-1".into(),
                to: to.clone(),
                amount,
                timestamp: Timestamp::now(),
            })
        }
    }

    #[test]
    fn trait_is_object_safe() {
        let services: Vec<Box<dyn ValueTransferService>> = vec![Box::new(Open), Box::new(Closed)];
        let to = PartyId::new("bob").unwrap();
        assert!(services[0].transfer(&to, Amount::new(1)).is_ok());
        assert!(services[1].transfer(&to, Amount::new(1)).is_err());
    }

    #[test]
    fn blanket_impls_forward() {
        let to = PartyId::new("bob").unwrap();
        let shared: Arc<dyn ValueTransferService> = Arc::new(Open);
        let receipt = shared.transfer(&to, Amount::new(9)).unwrap();
        assert_eq!(receipt.amount, Amount::new(9));
        let by_ref = &Open;
        assert_eq!(by_ref.transfer(&to, Amount::new(2)).unwrap().to, to);
    }

    #[test]
    fn error_display_rejected() {
        let err = TransferError::Rejected {
            to: PartyId::new("bob").unwrap(),
            amount: Amount::new(100),
            reason: "account frozen".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("bob"), "expected recipient in: {msg}");
        assert!(msg.contains("100"), "expected amount in: {msg}");
        assert!(msg.contains("account frozen"), "expected reason in: {msg}");
    }

    #[test]
    fn error_display_insufficient_custody() {
        let err = TransferError::InsufficientCustody {
            requested: Amount::new(50),
            available: Amount::new(10),
        };
        let msg = err.to_string();
        assert!(msg.contains("50"));
        assert!(msg.contains("10"));
    }

    #[test]
    fn receipt_serde_roundtrip() {
        let original = TransferReceipt {
            reference: "tx-1".into(),
            to: PartyId::new("alice").unwrap(),
            amount: Amount::new(100),
            timestamp: Timestamp::now(),
        };
        let json = serde_json::to_string(&original).expect("serialize receipt");
        let back: TransferReceipt = serde_json::from_str(&json).expect("deserialize receipt");
        assert_eq!(back, original);
    }
}

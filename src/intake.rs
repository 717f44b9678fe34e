//! Order intake: admission of uploaded order numbers.
//!
//! Intake owns no state of its own; ownership and duplicate questions are
//! answered by the single `onumber` primary key in the ledger, so two
//! concurrent uploads of the same number always resolve to exactly one
//! accepted owner.

use std::sync::Arc;

use crate::ledger::{LedgerError, LedgerStore};
use crate::models::{AdmitOutcome, Order, UserId};
use crate::validation::{OrderNumber, ValidationError};

#[derive(Debug, thiserror::Error)]
pub enum IntakeError {
    #[error("Invalid order number: {0}")]
    InvalidNumber(#[from] ValidationError),

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),
}

/// Admission service for uploaded order numbers
pub struct OrderIntake {
    store: Arc<LedgerStore>,
}

impl OrderIntake {
    pub fn new(store: Arc<LedgerStore>) -> Self {
        Self { store }
    }

    /// Validate and admit an order number on behalf of a user.
    ///
    /// Validation rejects malformed numbers before any storage round-trip;
    /// a syntactically valid number is then claimed, deduplicated, or
    /// refused by the ledger.
    pub async fn admit(
        &self,
        user_id: UserId,
        raw_number: &str,
    ) -> Result<AdmitOutcome, IntakeError> {
        let number = OrderNumber::new(raw_number)?;

        let outcome = self.store.admit_order(user_id, &number).await?;
        match outcome {
            AdmitOutcome::AcceptedNew => {
                tracing::info!(user_id = %user_id, order = %number, "Order accepted");
            }
            AdmitOutcome::DuplicateOwn => {
                tracing::debug!(user_id = %user_id, order = %number, "Duplicate upload by owner");
            }
            AdmitOutcome::ConflictOtherOwner => {
                tracing::warn!(user_id = %user_id, order = %number, "Order claimed by another user");
            }
        }

        Ok(outcome)
    }

    /// The user's uploaded orders, newest first.
    pub async fn list_orders(&self, user_id: UserId) -> Result<Vec<Order>, IntakeError> {
        Ok(self.store.orders(user_id).await?)
    }
}

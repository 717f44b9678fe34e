//! Balance ledger: spendable points and the withdrawal path.

use std::sync::Arc;

use rust_decimal::Decimal;

use crate::ledger::{LedgerError, LedgerStore};
use crate::models::{UserBalance, UserId, WithdrawOutcome, Withdrawal};
use crate::validation::{OrderNumber, ValidationError};

#[derive(Debug, thiserror::Error)]
pub enum WithdrawError {
    #[error("Withdrawal amount must be positive, got {0}")]
    InvalidAmount(Decimal),

    #[error("Invalid order number: {0}")]
    InvalidNumber(#[from] ValidationError),

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),
}

/// Balance operations over the ledger store
pub struct BalanceLedger {
    store: Arc<LedgerStore>,
}

impl BalanceLedger {
    pub fn new(store: Arc<LedgerStore>) -> Self {
        Self { store }
    }

    /// Current spendable balance and lifetime withdrawn total.
    pub async fn balance(&self, user_id: UserId) -> Result<UserBalance, LedgerError> {
        self.store.balance(user_id).await
    }

    /// Spend points against an order number.
    ///
    /// Amount and number are validated before any transaction opens; the
    /// atomic debit/verify/rollback sequence itself lives in the store.
    pub async fn withdraw(
        &self,
        user_id: UserId,
        raw_number: &str,
        amount: Decimal,
    ) -> Result<WithdrawOutcome, WithdrawError> {
        if amount <= Decimal::ZERO {
            return Err(WithdrawError::InvalidAmount(amount));
        }
        let number = OrderNumber::new(raw_number)?;

        let outcome = self.store.withdraw(user_id, &number, amount).await?;
        if outcome == WithdrawOutcome::InsufficientFunds {
            tracing::debug!(user_id = %user_id, order = %number, %amount, "Withdrawal refused: insufficient funds");
        }

        Ok(outcome)
    }

    /// Withdrawal history, newest first.
    pub async fn withdrawals(&self, user_id: UserId) -> Result<Vec<Withdrawal>, LedgerError> {
        self.store.withdrawals(user_id).await
    }
}

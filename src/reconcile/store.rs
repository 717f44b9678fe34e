//! Storage operations the reconciliation worker needs, abstracted so the
//! worker can be tested against an in-memory store.

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::ledger::{LedgerError, LedgerStore};
use crate::models::{OrderStatus, PendingOrder, UserId};

#[async_trait]
pub trait VerdictStore: Send + Sync {
    /// Orders still awaiting a terminal verdict.
    async fn load_pending(&self) -> Result<Vec<PendingOrder>, LedgerError>;

    /// Record that polling for an order has started.
    async fn mark_processing(&self, number: &str) -> Result<bool, LedgerError>;

    /// Apply a terminal verdict; returns false if one was already applied.
    async fn apply_verdict(
        &self,
        number: &str,
        user_id: UserId,
        status: OrderStatus,
        accrual: Decimal,
    ) -> Result<bool, LedgerError>;
}

#[async_trait]
impl VerdictStore for LedgerStore {
    async fn load_pending(&self) -> Result<Vec<PendingOrder>, LedgerError> {
        LedgerStore::load_pending(self).await
    }

    async fn mark_processing(&self, number: &str) -> Result<bool, LedgerError> {
        LedgerStore::mark_processing(self, number).await
    }

    async fn apply_verdict(
        &self,
        number: &str,
        user_id: UserId,
        status: OrderStatus,
        accrual: Decimal,
    ) -> Result<bool, LedgerError> {
        LedgerStore::apply_verdict(self, number, user_id, status, accrual).await
    }
}

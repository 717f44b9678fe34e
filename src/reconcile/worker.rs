//! Reconciliation worker - main polling loop
//!
//! Each tick loads the pending set, asks the accrual gateway about every
//! order, and applies terminal verdicts through the ledger. No outcome for
//! one order aborts the rest of the tick; every skipped order is picked up
//! again on the next one.

use std::sync::Arc;

use rust_decimal::Decimal;
use tokio::sync::watch;
use tokio::time::{Duration, sleep};
use tracing::{debug, error, info, warn};

use super::store::VerdictStore;
use crate::accrual::{AccrualGateway, FetchOutcome};
use crate::models::{OrderStatus, PendingOrder};

/// Outcome counts for one tick
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TickStats {
    pub polled: u64,
    pub applied: u64,
    pub not_ready: u64,
    pub rate_limited: u64,
    pub failed: u64,
}

/// Periodic reconciliation of pending orders against the accrual service
pub struct ReconcileWorker {
    store: Arc<dyn VerdictStore>,
    gateway: Arc<dyn AccrualGateway>,
    poll_interval: Duration,
}

impl ReconcileWorker {
    pub fn new(
        store: Arc<dyn VerdictStore>,
        gateway: Arc<dyn AccrualGateway>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            store,
            gateway,
            poll_interval,
        }
    }

    /// Run the polling loop until shutdown is signalled.
    ///
    /// Ticks are sequential: the sleep only starts after the previous tick
    /// finishes, so a slow accrual service stretches the period instead of
    /// stacking concurrent ticks.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(
            "Reconciliation worker starting, poll interval: {:?}",
            self.poll_interval
        );

        loop {
            tokio::select! {
                _ = sleep(self.poll_interval) => {
                    match self.tick().await {
                        Ok(stats) if stats.polled > 0 => {
                            debug!(
                                polled = stats.polled,
                                applied = stats.applied,
                                not_ready = stats.not_ready,
                                rate_limited = stats.rate_limited,
                                failed = stats.failed,
                                "Reconciliation tick finished"
                            );
                        }
                        Ok(_) => {}
                        Err(e) => {
                            error!("Reconciliation tick failed: {:?}", e);
                        }
                    }
                }
                _ = shutdown.changed() => {
                    info!("Reconciliation worker shutting down");
                    break;
                }
            }
        }
    }

    /// Run a single reconciliation iteration.
    pub async fn tick(&self) -> Result<TickStats, crate::ledger::LedgerError> {
        let pending = self.store.load_pending().await?;
        let mut stats = TickStats::default();

        for order in pending {
            stats.polled += 1;
            match self.reconcile_one(&order).await {
                OneOutcome::Applied => stats.applied += 1,
                OneOutcome::NotReady => stats.not_ready += 1,
                // Retried on the next tick, never re-requested within this one
                OneOutcome::RateLimited => stats.rate_limited += 1,
                OneOutcome::Failed => stats.failed += 1,
            }
        }

        Ok(stats)
    }

    async fn reconcile_one(&self, order: &PendingOrder) -> OneOutcome {
        if order.status != OrderStatus::Processing {
            match self.store.mark_processing(&order.number).await {
                Ok(true) => {}
                // Reached terminal state since the pending set was loaded
                Ok(false) => return OneOutcome::Applied,
                Err(e) => {
                    warn!(order = %order.number, "Failed to mark order processing: {:?}", e);
                    return OneOutcome::Failed;
                }
            }
        }

        let outcome = match self.gateway.fetch_verdict(&order.number).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(order = %order.number, "Accrual poll failed: {:?}", e);
                return OneOutcome::Failed;
            }
        };

        match outcome {
            FetchOutcome::NotReady => OneOutcome::NotReady,
            FetchOutcome::RateLimited => OneOutcome::RateLimited,
            FetchOutcome::Verdict { status, .. } if !status.is_terminal() => {
                // Still in flight on the accrual side; same as not ready.
                OneOutcome::NotReady
            }
            FetchOutcome::Verdict { status, accrual } => {
                let accrual = if status == OrderStatus::Processed {
                    accrual
                } else {
                    Decimal::ZERO
                };
                match self
                    .store
                    .apply_verdict(&order.number, order.user_id, status, accrual)
                    .await
                {
                    Ok(_) => OneOutcome::Applied,
                    Err(e) => {
                        warn!(order = %order.number, "Failed to apply verdict: {:?}", e);
                        OneOutcome::Failed
                    }
                }
            }
        }
    }
}

enum OneOutcome {
    Applied,
    NotReady,
    RateLimited,
    Failed,
}

//! Reconciliation scheduler: periodically drives pending orders to their
//! terminal accrual verdicts.
//!
//! Ticks never overlap (the loop awaits each tick before sleeping again),
//! one order failing never aborts a tick, and verdict application is
//! exactly-once even across process restarts. The guards live in the
//! ledger transaction, not here.

pub mod store;
pub mod worker;

pub use store::VerdictStore;
pub use worker::{ReconcileWorker, TickStats};

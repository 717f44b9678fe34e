//! Loyalty Ledger - points accrual and spending for a retail loyalty program
//!
//! Order numbers uploaded by users are verified against an external accrual
//! service; verified purchases earn points, and points can be spent against
//! future orders. PostgreSQL is the single source of truth for every balance
//! and order state.
//!
//! # Modules
//!
//! - [`models`] - Order, balance and withdrawal types plus the status machine
//! - [`validation`] - Order number syntax and Luhn checking
//! - [`ledger`] - Transactional storage (the only stateful component)
//! - [`intake`] - Order number admission
//! - [`balance`] - Balance reads and the withdrawal path
//! - [`accrual`] - HTTP gateway to the external accrual service
//! - [`reconcile`] - Background verdict polling and application

pub mod accrual;
pub mod balance;
pub mod config;
pub mod intake;
pub mod ledger;
pub mod logging;
pub mod models;
pub mod reconcile;
pub mod validation;

// Convenient re-exports at crate root
pub use accrual::{AccrualClient, AccrualGateway, FetchOutcome, GatewayError};
pub use balance::{BalanceLedger, WithdrawError};
pub use config::{AccrualConfig, AppConfig, DatabaseConfig};
pub use intake::{IntakeError, OrderIntake};
pub use ledger::{Database, LedgerError, LedgerStore};
pub use models::{
    AdmitOutcome, Order, OrderStatus, PendingOrder, UserBalance, UserId, WithdrawOutcome,
    Withdrawal,
};
pub use reconcile::{ReconcileWorker, TickStats, VerdictStore};
pub use validation::{OrderNumber, ValidationError};

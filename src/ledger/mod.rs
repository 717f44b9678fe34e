//! Ledger Store: durable, transactional storage of users, orders and the
//! derived withdrawal history. The sole source of truth: every invariant
//! that must survive crash/restart is owned by this module.

pub mod db;
pub mod schema;
pub mod store;

pub use db::Database;
pub use store::{LedgerError, LedgerStore};

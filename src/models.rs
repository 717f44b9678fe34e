//! Core domain types: order lifecycle status and the read models the
//! peripheral HTTP layer renders.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt;
use uuid::Uuid;

/// User identifier, issued by the external auth layer.
pub type UserId = Uuid;

/// Raised when a wire status string is not one of the five known values.
///
/// Unknown statuses are rejected loudly instead of being defaulted: a
/// silently mis-mapped verdict could credit or void an order incorrectly.
#[derive(Debug, thiserror::Error, PartialEq)]
#[error("unrecognized order status: '{0}'")]
pub struct StatusParseError(pub String);

/// Order lifecycle status.
///
/// NEW/REGISTERED/PROCESSING are non-terminal; INVALID/PROCESSED are
/// terminal and permanent. Only the reconciliation worker advances the
/// status once an order exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderStatus {
    New,
    Processing,
    Registered,
    Invalid,
    Processed,
}

impl OrderStatus {
    /// Wire/storage representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::New => "NEW",
            OrderStatus::Processing => "PROCESSING",
            OrderStatus::Registered => "REGISTERED",
            OrderStatus::Invalid => "INVALID",
            OrderStatus::Processed => "PROCESSED",
        }
    }

    /// Total mapping from the wire/storage string.
    pub fn parse_wire(s: &str) -> Result<Self, StatusParseError> {
        match s {
            "NEW" => Ok(OrderStatus::New),
            "PROCESSING" => Ok(OrderStatus::Processing),
            "REGISTERED" => Ok(OrderStatus::Registered),
            "INVALID" => Ok(OrderStatus::Invalid),
            "PROCESSED" => Ok(OrderStatus::Processed),
            other => Err(StatusParseError(other.to_string())),
        }
    }

    /// Terminal statuses never change again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Invalid | OrderStatus::Processed)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An order as reported to its owner (non-pre-orders only).
#[derive(Debug, Clone, Serialize)]
pub struct Order {
    pub number: String,
    pub status: OrderStatus,
    /// Amount granted by the accrual verdict; omitted while zero.
    #[serde(rename = "accrual", skip_serializing_if = "Decimal::is_zero")]
    pub credited: Decimal,
    #[serde(rename = "uploaded_at")]
    pub uploaded: DateTime<Utc>,
}

/// A non-terminal order awaiting an accrual verdict.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingOrder {
    pub user_id: UserId,
    pub number: String,
    pub status: OrderStatus,
}

/// Spendable balance and lifetime withdrawals for one user.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserBalance {
    #[serde(rename = "current")]
    pub bonuses: Decimal,
    #[serde(rename = "withdrawn")]
    pub withdrawals: Decimal,
}

/// One entry of a user's withdrawal history, newest first.
#[derive(Debug, Clone, Serialize)]
pub struct Withdrawal {
    #[serde(rename = "order")]
    pub number: String,
    #[serde(rename = "sum")]
    pub amount: Decimal,
    #[serde(rename = "processed_at")]
    pub processed: DateTime<Utc>,
}

/// Result of admitting an uploaded order number (Order Intake contract).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmitOutcome {
    /// First admission, or a pre-order promoted to a real order.
    AcceptedNew,
    /// The caller already owns this number; idempotent no-op.
    DuplicateOwn,
    /// Another user owns this number; permanent conflict.
    ConflictOtherOwner,
}

/// Result of a withdrawal attempt (Balance Ledger contract).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WithdrawOutcome {
    Completed,
    /// The debit would have driven the balance negative; rolled back.
    InsufficientFunds,
    /// The order number belongs to another user; rolled back.
    ConflictOtherOwner,
}

//! Accrual gateway: read-only HTTP client for the external points
//! calculation service.
//!
//! Every order earns points only after the accrual service has judged the
//! underlying purchase. The gateway asks one question per order number and
//! reports the answer without touching any local state.

pub mod client;

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::models::{OrderStatus, StatusParseError};

/// What the accrual service said about one order number
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    /// The service knows the order; `accrual` is only meaningful for
    /// PROCESSED verdicts.
    Verdict {
        status: OrderStatus,
        accrual: Decimal,
    },
    /// The service has no data for this order yet (HTTP 204).
    NotReady,
    /// The service is shedding load (HTTP 429); back off, ask again later.
    RateLimited,
}

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected HTTP status: {0}")]
    UnexpectedStatus(u16),

    #[error("Malformed accrual reply: {0}")]
    Decode(String),

    #[error("Unknown status in accrual reply: {0}")]
    UnknownStatus(#[from] StatusParseError),
}

/// Source of accrual verdicts, abstracted for testing
#[async_trait]
pub trait AccrualGateway: Send + Sync {
    async fn fetch_verdict(&self, number: &str) -> Result<FetchOutcome, GatewayError>;
}

pub use client::AccrualClient;

//! HTTP client for the accrual service.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::time::Duration;

use super::{AccrualGateway, FetchOutcome, GatewayError};
use crate::config::AccrualConfig;
use crate::models::OrderStatus;

/// Reply body for `GET /api/orders/{number}`.
///
/// The service reports `accrual` as a JSON number and omits it entirely for
/// non-PROCESSED verdicts.
#[derive(Debug, Deserialize)]
struct AccrualReply {
    order: String,
    status: String,
    accrual: Option<f64>,
}

/// Client for the external accrual service
pub struct AccrualClient {
    client: reqwest::Client,
    base_url: String,
}

impl AccrualClient {
    pub fn new(config: &AccrualConfig) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.address.trim_end_matches('/').to_string(),
        })
    }

    fn decode_reply(number: &str, reply: AccrualReply) -> Result<FetchOutcome, GatewayError> {
        if reply.order != number {
            return Err(GatewayError::Decode(format!(
                "reply for order {} does not match requested {}",
                reply.order, number
            )));
        }

        let status = OrderStatus::parse_wire(&reply.status)?;

        let accrual = match reply.accrual {
            Some(raw) => Decimal::try_from(raw)
                .map_err(|e| GatewayError::Decode(format!("accrual {raw}: {e}")))?,
            None => Decimal::ZERO,
        };

        Ok(FetchOutcome::Verdict { status, accrual })
    }
}

#[async_trait]
impl AccrualGateway for AccrualClient {
    async fn fetch_verdict(&self, number: &str) -> Result<FetchOutcome, GatewayError> {
        let url = format!("{}/api/orders/{}", self.base_url, number);
        let response = self.client.get(&url).send().await?;

        match response.status().as_u16() {
            200 => {
                let reply: AccrualReply = response
                    .json()
                    .await
                    .map_err(|e| GatewayError::Decode(e.to_string()))?;
                Self::decode_reply(number, reply)
            }
            204 => Ok(FetchOutcome::NotReady),
            429 => {
                tracing::warn!(order = %number, "Accrual service rate-limited the poll");
                Ok(FetchOutcome::RateLimited)
            }
            other => Err(GatewayError::UnexpectedStatus(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(number: &str, body: &str) -> Result<FetchOutcome, GatewayError> {
        let reply: AccrualReply = serde_json::from_str(body).expect("valid JSON");
        AccrualClient::decode_reply(number, reply)
    }

    #[test]
    fn test_processed_reply_with_accrual() {
        let outcome = decode(
            "79927398713",
            r#"{"order": "79927398713", "status": "PROCESSED", "accrual": 729.98}"#,
        )
        .unwrap();
        assert_eq!(
            outcome,
            FetchOutcome::Verdict {
                status: OrderStatus::Processed,
                accrual: Decimal::new(72998, 2),
            }
        );
    }

    #[test]
    fn test_invalid_reply_without_accrual() {
        let outcome = decode(
            "79927398713",
            r#"{"order": "79927398713", "status": "INVALID"}"#,
        )
        .unwrap();
        assert_eq!(
            outcome,
            FetchOutcome::Verdict {
                status: OrderStatus::Invalid,
                accrual: Decimal::ZERO,
            }
        );
    }

    #[test]
    fn test_registered_reply_is_non_terminal_verdict() {
        let outcome = decode(
            "79927398713",
            r#"{"order": "79927398713", "status": "REGISTERED"}"#,
        )
        .unwrap();
        match outcome {
            FetchOutcome::Verdict { status, .. } => assert!(!status.is_terminal()),
            other => panic!("expected verdict, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_status_rejected() {
        let err = decode(
            "79927398713",
            r#"{"order": "79927398713", "status": "EXPLODED"}"#,
        )
        .unwrap_err();
        assert!(matches!(err, GatewayError::UnknownStatus(_)));
    }

    #[test]
    fn test_mismatched_order_number_rejected() {
        let err = decode(
            "79927398713",
            r#"{"order": "12345678903", "status": "PROCESSED", "accrual": 1.0}"#,
        )
        .unwrap_err();
        assert!(matches!(err, GatewayError::Decode(_)));
    }
}

//! Transactional ledger operations.
//!
//! Every mutation of user balances and order state goes through this store;
//! no in-process cache is authoritative. The withdraw path follows the
//! debit/verify/rollback design: the debit is applied unconditionally, the
//! balance is re-read inside the same transaction, and a negative result
//! rolls the whole transaction back. Row-level locking on the user row
//! serializes concurrent withdrawals for one user.

use rust_decimal::Decimal;
use sqlx::{PgPool, Row};

use crate::models::{
    AdmitOutcome, Order, OrderStatus, PendingOrder, StatusParseError, UserBalance, UserId,
    Withdrawal, WithdrawOutcome,
};
use crate::validation::OrderNumber;

/// Ledger storage errors
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Unknown user: {0}")]
    UnknownUser(UserId),

    #[error("Corrupt status in storage: {0}")]
    CorruptStatus(#[from] StatusParseError),
}

/// Non-terminal statuses, i.e. the reconciliation candidate set.
const NON_TERMINAL: [&str; 3] = ["NEW", "REGISTERED", "PROCESSING"];

/// Ledger store over a PostgreSQL pool
pub struct LedgerStore {
    pool: PgPool,
}

impl LedgerStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create the balance row for a user if it does not exist yet.
    ///
    /// The external auth layer owns user identity; this only guarantees a
    /// debitable/creditable row exists before orders reference it.
    pub async fn ensure_user(&self, user_id: UserId) -> Result<(), LedgerError> {
        sqlx::query("INSERT INTO users (user_id) VALUES ($1) ON CONFLICT (user_id) DO NOTHING")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Admit an uploaded order number for a user.
    ///
    /// Insert-first: a primary-key conflict means the number already exists
    /// for someone. A pre-order owned by the same user is promoted with an
    /// UPDATE that flips only `is_preorder`; `reserved` and `credited` are
    /// never overwritten, so a verdict applied concurrently is preserved.
    pub async fn admit_order(
        &self,
        user_id: UserId,
        number: &OrderNumber,
    ) -> Result<AdmitOutcome, LedgerError> {
        let inserted = sqlx::query(
            r#"INSERT INTO orders (onumber, user_id, status, is_preorder)
               VALUES ($1, $2, 'NEW', FALSE)
               ON CONFLICT (onumber) DO NOTHING"#,
        )
        .bind(number.as_str())
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        if inserted.rows_affected() > 0 {
            return Ok(AdmitOutcome::AcceptedNew);
        }

        let row = sqlx::query("SELECT user_id, is_preorder FROM orders WHERE onumber = $1")
            .bind(number.as_str())
            .fetch_one(&self.pool)
            .await?;

        let owner: UserId = row.get("user_id");
        if owner != user_id {
            return Ok(AdmitOutcome::ConflictOtherOwner);
        }

        let is_preorder: bool = row.get("is_preorder");
        if !is_preorder {
            return Ok(AdmitOutcome::DuplicateOwn);
        }

        let promoted = sqlx::query(
            r#"UPDATE orders SET is_preorder = FALSE
               WHERE onumber = $1 AND user_id = $2 AND is_preorder = TRUE"#,
        )
        .bind(number.as_str())
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        // rows_affected = 0 means another upload promoted it first
        if promoted.rows_affected() > 0 {
            tracing::info!(user_id = %user_id, order = %number, "Pre-order promoted to order");
            Ok(AdmitOutcome::AcceptedNew)
        } else {
            Ok(AdmitOutcome::DuplicateOwn)
        }
    }

    /// Move `amount` from a user's spendable balance to lifetime withdrawals,
    /// bound to `number`. One transaction:
    ///
    /// 1. debit `bonuses` unconditionally (locks the user row),
    /// 2. read the balance back; negative → roll back, Insufficient-Funds,
    /// 3. credit `withdrawals`,
    /// 4. record `reserved` on the order row, creating a pre-order when the
    ///    number is unknown. A number owned by another user rolls back with
    ///    Conflict-Other-Owner.
    ///
    /// The caller validates `amount > 0` before this opens a transaction.
    pub async fn withdraw(
        &self,
        user_id: UserId,
        number: &OrderNumber,
        amount: Decimal,
    ) -> Result<WithdrawOutcome, LedgerError> {
        let mut tx = self.pool.begin().await?;

        let debited = sqlx::query("UPDATE users SET bonuses = bonuses - $1 WHERE user_id = $2")
            .bind(amount)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        if debited.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(LedgerError::UnknownUser(user_id));
        }

        // Re-read inside the transaction: reflects our own debit.
        let bonuses: Decimal = sqlx::query_scalar("SELECT bonuses FROM users WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&mut *tx)
            .await?;
        if bonuses.is_sign_negative() {
            tx.rollback().await?;
            return Ok(WithdrawOutcome::InsufficientFunds);
        }

        sqlx::query("UPDATE users SET withdrawals = withdrawals + $1 WHERE user_id = $2")
            .bind(amount)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        let inserted = sqlx::query(
            r#"INSERT INTO orders (onumber, user_id, status, is_preorder, reserved)
               VALUES ($1, $2, 'NEW', TRUE, $3)
               ON CONFLICT (onumber) DO NOTHING"#,
        )
        .bind(number.as_str())
        .bind(user_id)
        .bind(amount)
        .execute(&mut *tx)
        .await?;

        if inserted.rows_affected() == 0 {
            // Number already exists; only its owner may reserve against it.
            let updated = sqlx::query(
                r#"UPDATE orders SET reserved = reserved + $1
                   WHERE onumber = $2 AND user_id = $3"#,
            )
            .bind(amount)
            .bind(number.as_str())
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
            if updated.rows_affected() == 0 {
                tx.rollback().await?;
                return Ok(WithdrawOutcome::ConflictOtherOwner);
            }
        }

        tx.commit().await?;

        tracing::info!(user_id = %user_id, order = %number, %amount, "Withdrawal committed");
        Ok(WithdrawOutcome::Completed)
    }

    /// Current spendable balance and lifetime withdrawals.
    pub async fn balance(&self, user_id: UserId) -> Result<UserBalance, LedgerError> {
        let row = sqlx::query("SELECT bonuses, withdrawals FROM users WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(LedgerError::UnknownUser(user_id))?;

        Ok(UserBalance {
            bonuses: row.get("bonuses"),
            withdrawals: row.get("withdrawals"),
        })
    }

    /// A user's uploaded orders, newest first. Pre-orders are placeholders
    /// for withdrawals and are not listed here.
    pub async fn orders(&self, user_id: UserId) -> Result<Vec<Order>, LedgerError> {
        let rows = sqlx::query(
            r#"SELECT onumber, status, credited, uploaded
               FROM orders
               WHERE user_id = $1 AND is_preorder = FALSE
               ORDER BY uploaded DESC"#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        let mut orders = Vec::with_capacity(rows.len());
        for row in rows {
            let status: String = row.get("status");
            orders.push(Order {
                number: row.get("onumber"),
                status: OrderStatus::parse_wire(&status)?,
                credited: row.get("credited"),
                uploaded: row.get("uploaded"),
            });
        }

        Ok(orders)
    }

    /// A user's withdrawal history, newest first.
    pub async fn withdrawals(&self, user_id: UserId) -> Result<Vec<Withdrawal>, LedgerError> {
        let rows = sqlx::query(
            r#"SELECT onumber, reserved, uploaded
               FROM orders
               WHERE user_id = $1 AND reserved > 0
               ORDER BY uploaded DESC"#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| Withdrawal {
                number: row.get("onumber"),
                amount: row.get("reserved"),
                processed: row.get("uploaded"),
            })
            .collect())
    }

    /// Every order still awaiting an accrual verdict. Pre-orders have no
    /// accrual-relevant purchase yet and are never polled.
    pub async fn load_pending(&self) -> Result<Vec<PendingOrder>, LedgerError> {
        let rows = sqlx::query(
            r#"SELECT user_id, onumber, status
               FROM orders
               WHERE is_preorder = FALSE AND status = ANY($1)"#,
        )
        .bind(&NON_TERMINAL[..])
        .fetch_all(&self.pool)
        .await?;

        let mut pending = Vec::with_capacity(rows.len());
        for row in rows {
            let status: String = row.get("status");
            pending.push(PendingOrder {
                user_id: row.get("user_id"),
                number: row.get("onumber"),
                status: OrderStatus::parse_wire(&status)?,
            });
        }

        Ok(pending)
    }

    /// Best-effort transition into PROCESSING. Terminal rows are left alone.
    /// Returns true if the row is (now) in PROCESSING.
    pub async fn mark_processing(&self, number: &str) -> Result<bool, LedgerError> {
        let updated = sqlx::query(
            r#"UPDATE orders SET status = 'PROCESSING'
               WHERE onumber = $1 AND status = ANY($2)"#,
        )
        .bind(number)
        .bind(&NON_TERMINAL[..])
        .execute(&self.pool)
        .await?;

        Ok(updated.rows_affected() > 0)
    }

    /// Apply a terminal accrual verdict exactly once.
    ///
    /// The status write and the balance credit share one transaction, so a
    /// crash can never separate them. Two guards make replays no-ops: the
    /// status write only hits non-terminal rows, and the credit only fires
    /// where `credited = 0`. Returns true if the verdict was newly applied.
    pub async fn apply_verdict(
        &self,
        number: &str,
        user_id: UserId,
        status: OrderStatus,
        accrual: Decimal,
    ) -> Result<bool, LedgerError> {
        debug_assert!(status.is_terminal());

        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            r#"UPDATE orders SET status = $1
               WHERE onumber = $2 AND status = ANY($3)"#,
        )
        .bind(status.as_str())
        .bind(number)
        .bind(&NON_TERMINAL[..])
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            // Already terminal; nothing to apply.
            tx.rollback().await?;
            return Ok(false);
        }

        if status == OrderStatus::Processed && accrual > Decimal::ZERO {
            let credited =
                sqlx::query("UPDATE orders SET credited = $1 WHERE onumber = $2 AND credited = 0")
                    .bind(accrual)
                    .bind(number)
                    .execute(&mut *tx)
                    .await?;

            if credited.rows_affected() > 0 {
                sqlx::query("UPDATE users SET bonuses = bonuses + $1 WHERE user_id = $2")
                    .bind(accrual)
                    .bind(user_id)
                    .execute(&mut *tx)
                    .await?;
            }
        }

        tx.commit().await?;

        tracing::info!(order = %number, %status, %accrual, "Accrual verdict applied");
        Ok(true)
    }
}

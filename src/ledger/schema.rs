//! Ledger schema bootstrap.
//!
//! Tables are created at startup with `CREATE TABLE IF NOT EXISTS`; there is
//! no migration tooling. The `onumber` primary key is the single uniqueness
//! constraint that both order intake and the withdrawal path race on.

use anyhow::Result;
use sqlx::PgPool;

/// Initialize the ledger schema
pub async fn init_schema(pool: &PgPool) -> Result<()> {
    tracing::info!("Initializing ledger schema...");

    let statements = [
        ("users table", CREATE_USERS),
        ("orders table", CREATE_ORDERS),
        ("orders user index", CREATE_ORDERS_USER_IDX),
        ("orders pending index", CREATE_ORDERS_PENDING_IDX),
    ];

    for (what, sql) in statements {
        sqlx::query(sql)
            .execute(pool)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to create {}: {}", what, e))?;
    }

    tracing::info!("Ledger schema initialized successfully");
    Ok(())
}

// `bonuses >= 0` is enforced by the withdraw transaction (debit, read back,
// roll back on negative), not by a CHECK constraint.
const CREATE_USERS: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    user_id     UUID PRIMARY KEY,
    bonuses     NUMERIC NOT NULL DEFAULT 0,
    withdrawals NUMERIC NOT NULL DEFAULT 0
)
"#;

const CREATE_ORDERS: &str = r#"
CREATE TABLE IF NOT EXISTS orders (
    onumber     VARCHAR(32) PRIMARY KEY,
    user_id     UUID NOT NULL REFERENCES users(user_id),
    status      TEXT NOT NULL DEFAULT 'NEW',
    is_preorder BOOLEAN NOT NULL DEFAULT FALSE,
    uploaded    TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    reserved    NUMERIC NOT NULL DEFAULT 0,
    credited    NUMERIC NOT NULL DEFAULT 0
)
"#;

const CREATE_ORDERS_USER_IDX: &str = r#"
CREATE INDEX IF NOT EXISTS orders_user_idx ON orders (user_id)
"#;

/// Partial index over the reconciliation candidate set
const CREATE_ORDERS_PENDING_IDX: &str = r#"
CREATE INDEX IF NOT EXISTS orders_pending_idx ON orders (status)
    WHERE is_preorder = FALSE AND status IN ('NEW', 'REGISTERED', 'PROCESSING')
"#;

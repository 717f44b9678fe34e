//! End-to-end ledger scenarios against a real PostgreSQL instance.
//!
//! All tests are #[ignore] and expect the dev database from config/dev.yaml
//! (override with TEST_DATABASE_URL-style edits below). Each test works with
//! freshly generated users and order numbers, so runs are isolated without
//! truncating tables.

use std::sync::Arc;

use rust_decimal::Decimal;

use loyalty_ledger::balance::BalanceLedger;
use loyalty_ledger::config::DatabaseConfig;
use loyalty_ledger::intake::OrderIntake;
use loyalty_ledger::ledger::{Database, LedgerStore, schema};
use loyalty_ledger::models::{AdmitOutcome, OrderStatus, UserId, WithdrawOutcome};
use loyalty_ledger::validation::OrderNumber;

const TEST_DATABASE_URL: &str = "postgresql://market:1@localhost:5432/market";

async fn test_store() -> Arc<LedgerStore> {
    let config = DatabaseConfig {
        url: TEST_DATABASE_URL.to_string(),
        ..Default::default()
    };
    let db = Database::connect(&config).await.expect("Failed to connect");
    schema::init_schema(db.pool())
        .await
        .expect("Failed to init schema");
    Arc::new(LedgerStore::new(db.pool().clone()))
}

/// Unique Luhn-valid order number.
fn fresh_number() -> String {
    let base = format!(
        "{}{:03}",
        chrono::Utc::now().timestamp_micros(),
        rand_suffix()
    );
    for check in 0..10 {
        let candidate = format!("{base}{check}");
        if OrderNumber::new(&candidate).is_ok() {
            return candidate;
        }
    }
    unreachable!("one of ten check digits always satisfies Luhn")
}

fn rand_suffix() -> u128 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock before epoch")
        .as_nanos()
        % 1000
}

async fn fund(store: &LedgerStore, user: UserId, amount: Decimal) {
    store.ensure_user(user).await.unwrap();
    sqlx::query("UPDATE users SET bonuses = $1 WHERE user_id = $2")
        .bind(amount)
        .bind(user)
        .execute(store.pool())
        .await
        .unwrap();
}

/// Two withdrawals race for a balance that can only cover one of them.
/// Exactly one must win and the final balance must never go negative.
#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn concurrent_withdrawals_never_overdraw() {
    let store = test_store().await;
    let ledger = Arc::new(BalanceLedger::new(store.clone()));
    let user = UserId::new_v4();
    fund(&store, user, Decimal::new(100, 0)).await;

    let amount = Decimal::new(60, 0);
    let a = {
        let ledger = ledger.clone();
        let number = fresh_number();
        tokio::spawn(async move { ledger.withdraw(user, &number, amount).await })
    };
    let b = {
        let ledger = ledger.clone();
        let number = fresh_number();
        tokio::spawn(async move { ledger.withdraw(user, &number, amount).await })
    };

    let outcomes = [a.await.unwrap().unwrap(), b.await.unwrap().unwrap()];
    let completed = outcomes
        .iter()
        .filter(|o| **o == WithdrawOutcome::Completed)
        .count();
    let refused = outcomes
        .iter()
        .filter(|o| **o == WithdrawOutcome::InsufficientFunds)
        .count();
    assert_eq!(completed, 1, "exactly one withdrawal must win");
    assert_eq!(refused, 1);

    let balance = ledger.balance(user).await.unwrap();
    assert_eq!(balance.bonuses, Decimal::new(40, 0));
    assert_eq!(balance.withdrawals, amount);
    assert!(!balance.bonuses.is_sign_negative());
}

/// Withdraw against an unseen number, then upload it: the pre-order is
/// promoted in place and shows up in both lists with its reservation intact.
#[tokio::test]
#[ignore]
async fn withdrawal_preorder_promotion_roundtrip() {
    let store = test_store().await;
    let ledger = BalanceLedger::new(store.clone());
    let intake = OrderIntake::new(store.clone());
    let user = UserId::new_v4();
    fund(&store, user, Decimal::new(500, 0)).await;

    let number = fresh_number();
    let amount = Decimal::new(125, 0);

    let outcome = ledger.withdraw(user, &number, amount).await.unwrap();
    assert_eq!(outcome, WithdrawOutcome::Completed);

    // History shows the spend even before the order is uploaded
    let history = ledger.withdrawals(user).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].number, number);
    assert_eq!(history[0].amount, amount);
    // But the order list does not
    assert!(intake.list_orders(user).await.unwrap().is_empty());

    // Upload promotes the pre-order rather than reporting a duplicate
    let admitted = intake.admit(user, &number).await.unwrap();
    assert_eq!(admitted, AdmitOutcome::AcceptedNew);

    let orders = intake.list_orders(user).await.unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].number, number);
    assert_eq!(orders[0].status, OrderStatus::New);

    // Second upload of the same number is now a plain duplicate
    let again = intake.admit(user, &number).await.unwrap();
    assert_eq!(again, AdmitOutcome::DuplicateOwn);
}

/// An order number belongs to whoever claimed it first, for uploads and
/// withdrawals alike.
#[tokio::test]
#[ignore]
async fn order_number_ownership_is_exclusive() {
    let store = test_store().await;
    let ledger = BalanceLedger::new(store.clone());
    let intake = OrderIntake::new(store.clone());
    let alice = UserId::new_v4();
    let bob = UserId::new_v4();
    store.ensure_user(alice).await.unwrap();
    fund(&store, bob, Decimal::new(100, 0)).await;

    let number = fresh_number();
    assert_eq!(
        intake.admit(alice, &number).await.unwrap(),
        AdmitOutcome::AcceptedNew
    );

    // Bob can neither upload nor withdraw against Alice's number
    assert_eq!(
        intake.admit(bob, &number).await.unwrap(),
        AdmitOutcome::ConflictOtherOwner
    );
    assert_eq!(
        ledger
            .withdraw(bob, &number, Decimal::new(10, 0))
            .await
            .unwrap(),
        WithdrawOutcome::ConflictOtherOwner
    );

    // The refused withdrawal left Bob's money alone
    let balance = ledger.balance(bob).await.unwrap();
    assert_eq!(balance.bonuses, Decimal::new(100, 0));
    assert_eq!(balance.withdrawals, Decimal::ZERO);
}

/// A verdict replayed after a crash-and-retry credits the user only once,
/// and credited points are immediately spendable.
#[tokio::test]
#[ignore]
async fn verdict_replay_is_idempotent_and_spendable() {
    let store = test_store().await;
    let ledger = BalanceLedger::new(store.clone());
    let intake = OrderIntake::new(store.clone());
    let user = UserId::new_v4();
    store.ensure_user(user).await.unwrap();

    let number = fresh_number();
    intake.admit(user, &number).await.unwrap();

    let accrual = Decimal::new(300, 0);
    for attempt in 0..3 {
        let applied = store
            .apply_verdict(&number, user, OrderStatus::Processed, accrual)
            .await
            .unwrap();
        assert_eq!(applied, attempt == 0);
    }

    let balance = ledger.balance(user).await.unwrap();
    assert_eq!(balance.bonuses, accrual);

    // Earned points can be spent right away
    let spend_number = fresh_number();
    let outcome = ledger
        .withdraw(user, &spend_number, Decimal::new(300, 0))
        .await
        .unwrap();
    assert_eq!(outcome, WithdrawOutcome::Completed);

    let balance = ledger.balance(user).await.unwrap();
    assert_eq!(balance.bonuses, Decimal::ZERO);
    assert_eq!(balance.withdrawals, Decimal::new(300, 0));
}

/// Malformed order numbers are refused before any storage round-trip.
#[tokio::test]
#[ignore]
async fn malformed_numbers_rejected_before_storage() {
    let store = test_store().await;
    let intake = OrderIntake::new(store.clone());
    let user = UserId::new_v4();
    store.ensure_user(user).await.unwrap();

    for bad in ["", "  ", "12345a", "79927398714", &"9".repeat(33)] {
        assert!(intake.admit(user, bad).await.is_err(), "accepted {bad:?}");
    }
    assert!(intake.list_orders(user).await.unwrap().is_empty());
}

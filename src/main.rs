//! Loyalty Ledger service entry point.
//!
//! Wires the ledger store, accrual client and reconciliation worker
//! together, then runs until Ctrl+C.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use loyalty_ledger::accrual::AccrualClient;
use loyalty_ledger::config::AppConfig;
use loyalty_ledger::ledger::{Database, LedgerStore, schema};
use loyalty_ledger::logging::init_logging;
use loyalty_ledger::reconcile::ReconcileWorker;

fn get_env() -> String {
    let args: Vec<String> = std::env::args().collect();
    for i in 0..args.len() {
        if (args[i] == "--env" || args[i] == "-e") && i + 1 < args.len() {
            return args[i + 1].clone();
        }
    }
    "dev".to_string()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env = get_env();
    let config = AppConfig::load(&env)?;
    let _log_guard = init_logging(&config);

    tracing::info!("Starting Loyalty Ledger in {} mode", env);

    let db = Database::connect(&config.database).await?;
    db.health_check().await?;
    schema::init_schema(db.pool()).await?;

    let store = Arc::new(LedgerStore::new(db.pool().clone()));

    let gateway = Arc::new(AccrualClient::new(&config.accrual)?);
    let worker = Arc::new(ReconcileWorker::new(
        store.clone(),
        gateway,
        Duration::from_secs(config.accrual.poll_interval_secs),
    ));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let worker_handle = tokio::spawn({
        let worker = worker.clone();
        async move { worker.run(shutdown_rx).await }
    });

    tracing::info!(
        accrual = %config.accrual.address,
        "Loyalty Ledger ready, press Ctrl+C to shutdown"
    );

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received");

    shutdown_tx.send(true)?;
    worker_handle.await?;

    tracing::info!("Loyalty Ledger stopped");
    Ok(())
}

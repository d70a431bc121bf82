use std::sync::Arc;

use tokio::sync::broadcast;
use trash_expiry::config::Config;
use trash_expiry::logging::{init_tracing, LogConfig};
use trash_expiry::store::Store;
use trash_expiry::workers::{expire_trash, WorkerManager};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let config = Config::from_env();

    init_tracing(&LogConfig::from(&config));
    tracing::info!(data_dir = %config.data_dir, "Starting trash-expiry");

    let store = Arc::new(Store::open(&config.sled_path).expect("Failed to open sled database"));
    store.run_migrations().expect("Failed to run migrations");

    let (shutdown_tx, _) = broadcast::channel::<()>(8);

    let worker_manager = WorkerManager::new(shutdown_tx.subscribe(), &config.worker)
        .register(expire_trash::from_config(store.clone(), &config));
    for spec in worker_manager.planned_jobs() {
        tracing::info!(
            worker = spec.name.as_str(),
            interval_secs = spec.interval.as_secs(),
            enabled = spec.enabled,
            "Planned worker"
        );
    }

    let worker_handle = tokio::spawn(async move {
        if let Err(e) = worker_manager.start().await {
            tracing::error!(error = %e, "Worker manager failed");
        }
    });

    shutdown_signal(shutdown_tx).await;

    match worker_handle.await {
        Err(e) => tracing::error!(error = %e, "Worker task panicked"),
        Ok(()) => tracing::info!("Worker manager exited normally"),
    }

    tracing::info!("Flushing store before exit");
    if let Err(e) = store.flush() {
        tracing::error!(error = %e, "Failed to flush store before exit");
    }
    tracing::info!("Shutdown complete");
}

async fn shutdown_signal(shutdown_tx: broadcast::Sender<()>) {
    #[cfg(unix)]
    {
        let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {},
            _ = sigterm.recv() => {},
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }

    tracing::info!("Shutdown signal received");
    let _ = shutdown_tx.send(());
}

//! Daemon wiring
//!
//! Builds the component graph (store, browser, scheduler, FX table, alert
//! engine, HTTP API), runs the background tasks, and coordinates graceful
//! shutdown: finish or abandon the in-flight item, close the browser with a
//! bounded grace period, persist state.

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::alerts::{AlertEngine, Notifier};
use crate::config::Config;
use crate::store::{DiagnosticsLog, StateStore};
use crate::tracking::{BrowserPool, FxTable, Scheduler, UrlGuard};

use super::http::{AppState, HttpServer};

/// Run the tracker daemon until ctrl-c.
pub async fn run(config: Config) -> Result<()> {
    let store = Arc::new(StateStore::open(&config.data_dir).context("failed to open state store")?);
    let diagnostics = Arc::new(DiagnosticsLog::open(
        &config.data_dir,
        config.tracker.diagnostics_capacity,
    ));
    let guard = Arc::new(UrlGuard::new(config.tracker.effective_allowed_hosts()));
    let browser = Arc::new(BrowserPool::new(config.browser.clone()));
    let fx = Arc::new(FxTable::new(config.tracker.fx_endpoint.clone()));
    let alerts = Arc::new(AlertEngine::new());
    let notifier = Arc::new(Notifier::new());

    let scheduler = Arc::new(Scheduler::new(
        Arc::clone(&store),
        Arc::clone(&diagnostics),
        Arc::clone(&browser),
        Arc::clone(&guard),
        Arc::clone(&fx),
        Arc::clone(&alerts),
        Arc::clone(&notifier),
        config.tracker.clone(),
    ));

    let (shutdown_tx, _) = broadcast::channel::<()>(4);

    let fx_task = tokio::spawn(Arc::clone(&fx).run_refresher(
        Duration::from_secs(config.tracker.fx_refresh_secs),
        shutdown_tx.subscribe(),
    ));

    let scheduler_task = tokio::spawn(Arc::clone(&scheduler).run(shutdown_tx.subscribe()));

    let http_task = if config.http.enabled {
        let server = HttpServer::new(
            config.http.clone(),
            AppState {
                store: Arc::clone(&store),
                diagnostics: Arc::clone(&diagnostics),
                scheduler: Arc::clone(&scheduler),
                guard: Arc::clone(&guard),
                fx: Arc::clone(&fx),
            },
        );
        let shutdown_rx = shutdown_tx.subscribe();
        Some(tokio::spawn(async move { server.run(shutdown_rx).await }))
    } else {
        None
    };

    info!("pricewatch daemon running ({} items tracked)", store.item_count());

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    info!("shutdown signal received");

    let _ = shutdown_tx.send(());

    // The scheduler abandons any in-flight fetch on shutdown; give the tasks
    // a moment to notice before tearing down the browser.
    if tokio::time::timeout(Duration::from_secs(10), scheduler_task)
        .await
        .is_err()
    {
        warn!("scheduler did not stop in time");
    }
    if let Some(task) = http_task {
        match tokio::time::timeout(Duration::from_secs(5), task).await {
            Ok(Ok(Err(e))) => warn!("HTTP server exited with error: {e:#}"),
            Ok(_) => {}
            Err(_) => warn!("HTTP server did not stop in time"),
        }
    }
    fx_task.abort();

    browser.shutdown().await;

    if let Err(e) = store.persist() {
        warn!("failed to persist state on shutdown: {e:#}");
    }
    if let Err(e) = diagnostics.persist() {
        warn!("failed to persist diagnostics on shutdown: {e:#}");
    }

    info!("pricewatch daemon stopped");
    Ok(())
}

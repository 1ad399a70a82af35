//! Periodic sweep scheduler
//!
//! Drives the per-item check pipeline (guard, fetch, extract, update,
//! alert) across all tracked items in insertion order. At most one sweep
//! runs at a time; the periodic trigger and the manual trigger share the
//! same guard. A failing item never aborts the sweep.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::alerts::{AlertEngine, CheckObservation, Notifier};
use crate::config::TrackerConfig;
use crate::store::{DiagnosticsLog, StateStore};
use crate::types::{CheckStatus, DiagnosticEntry, Item, PricePoint, StockStatus};

use super::browser::BrowserPool;
use super::extractor::{Extraction, PriceExtractor};
use super::fx::FxTable;
use super::guard::UrlGuard;

/// Result of a tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepOutcome {
    Completed { checked: usize, failed: usize },
    /// A sweep was already in flight
    Busy,
}

/// Result of a manual trigger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerOutcome {
    Started,
    Busy,
}

/// Sweep scheduler; sole mutator of item observation fields
pub struct Scheduler {
    store: Arc<StateStore>,
    diagnostics: Arc<DiagnosticsLog>,
    browser: Arc<BrowserPool>,
    guard: Arc<UrlGuard>,
    extractor: Arc<PriceExtractor>,
    fx: Arc<FxTable>,
    alerts: Arc<AlertEngine>,
    notifier: Arc<Notifier>,
    config: TrackerConfig,
    sweeping: AtomicBool,
    current_item: parking_lot::Mutex<Option<String>>,
}

/// Clears the sweep flag and current-item marker even when the sweep future
/// is dropped mid-flight on shutdown.
struct SweepGuard<'a>(&'a Scheduler);

impl Drop for SweepGuard<'_> {
    fn drop(&mut self) {
        self.0.current_item.lock().take();
        self.0.sweeping.store(false, Ordering::SeqCst);
    }
}

impl Scheduler {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: Arc<StateStore>,
        diagnostics: Arc<DiagnosticsLog>,
        browser: Arc<BrowserPool>,
        guard: Arc<UrlGuard>,
        fx: Arc<FxTable>,
        alerts: Arc<AlertEngine>,
        notifier: Arc<Notifier>,
        config: TrackerConfig,
    ) -> Self {
        Self {
            store,
            diagnostics,
            browser,
            guard,
            extractor: Arc::new(PriceExtractor::new()),
            fx,
            alerts,
            notifier,
            config,
            sweeping: AtomicBool::new(false),
            current_item: parking_lot::Mutex::new(None),
        }
    }

    /// Item currently being checked, for the status endpoint.
    pub fn currently_sweeping_item(&self) -> Option<String> {
        self.current_item.lock().clone()
    }

    pub fn is_sweeping(&self) -> bool {
        self.sweeping.load(Ordering::SeqCst)
    }

    /// Manual trigger; a no-op reporting `Busy` while a sweep is in flight.
    pub fn trigger(self: &Arc<Self>) -> TriggerOutcome {
        if self.is_sweeping() {
            return TriggerOutcome::Busy;
        }
        let scheduler = Arc::clone(self);
        tokio::spawn(async move {
            // tick re-checks the guard, so a racing trigger degrades to a no-op
            scheduler.tick().await;
        });
        TriggerOutcome::Started
    }

    /// Periodic loop; exits on shutdown, abandoning any in-flight item.
    pub async fn run(self: Arc<Self>, mut shutdown: broadcast::Receiver<()>) {
        info!(
            "scheduler started: {} items, sweep every {}s",
            self.store.item_count(),
            self.config.sweep_interval_secs
        );
        loop {
            tokio::select! {
                outcome = self.tick() => {
                    if let SweepOutcome::Completed { checked, failed } = outcome {
                        debug!("sweep complete: {checked} ok, {failed} failed");
                    }
                }
                _ = shutdown.recv() => {
                    info!("scheduler stopping mid-sweep");
                    return;
                }
            }
            tokio::select! {
                _ = tokio::time::sleep(Duration::from_secs(self.config.sweep_interval_secs)) => {}
                _ = shutdown.recv() => {
                    info!("scheduler stopped");
                    return;
                }
            }
        }
    }

    /// One full sweep across all items. Returns immediately when a sweep is
    /// already running.
    pub async fn tick(&self) -> SweepOutcome {
        if self
            .sweeping
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return SweepOutcome::Busy;
        }
        let _guard = SweepGuard(self);

        let ids = self.store.item_ids();
        let mut checked = 0usize;
        let mut failed = 0usize;

        for (index, id) in ids.iter().enumerate() {
            *self.current_item.lock() = Some(id.clone());
            match self.check_item(id).await {
                Some(true) => checked += 1,
                Some(false) => failed += 1,
                None => {} // item deleted mid-sweep
            }
            *self.current_item.lock() = None;

            if index + 1 < ids.len() {
                tokio::time::sleep(Duration::from_millis(self.config.item_delay_ms)).await;
            }
        }

        if let Err(e) = self.store.persist() {
            warn!("failed to persist state after sweep: {e:#}");
        }
        if let Err(e) = self.diagnostics.persist() {
            warn!("failed to persist diagnostics: {e:#}");
        }

        let live: HashSet<String> = self.store.item_ids().into_iter().collect();
        self.alerts.prune(&live);

        SweepOutcome::Completed { checked, failed }
    }

    /// Check one item end to end. `None` when the item vanished; otherwise
    /// whether the check succeeded. Every outcome lands in diagnostics.
    async fn check_item(&self, id: &str) -> Option<bool> {
        let item = self.store.get_item(id)?;
        debug!("checking {} ({})", item.name, item.url);

        let url = match self.guard.validate(&item.url).await {
            Ok(url) => url,
            Err(e) => {
                self.record_failure(&item, e.kind(), &e.to_string()).await;
                return Some(false);
            }
        };

        let html = match self.browser.fetch(&url).await {
            Ok(html) => html,
            Err(e) => {
                self.record_failure(&item, e.kind(), &e.to_string()).await;
                return Some(false);
            }
        };

        // HTML parsing is CPU-bound; keep it off the runtime workers
        let extractor = Arc::clone(&self.extractor);
        let selector = item.selector.clone();
        let extraction = match tokio::task::spawn_blocking(move || {
            extractor.extract(&html, selector.as_deref(), &url)
        })
        .await
        {
            Ok(extraction) => extraction,
            Err(e) => {
                self.record_failure(&item, "extraction_failed", &e.to_string())
                    .await;
                return Some(false);
            }
        };

        // No candidate and no out-of-stock finding: the page defeated us
        if extraction.price.is_none()
            && extraction.availability.status != StockStatus::OutOfStock
        {
            self.record_extraction_miss(&item, &extraction).await;
            return Some(false);
        }

        let now = Utc::now();
        let settings = self.store.settings();
        let observation = CheckObservation {
            price: extraction.price,
            currency: extraction.currency.clone(),
            confidence: extraction.confidence,
            status: extraction.availability.status,
        };

        // Alerts compare against the pre-update state; the edit API may have
        // touched user fields since the fetch started, so re-read
        let events = match self.store.get_item(id) {
            Some(before) => {
                self.alerts
                    .evaluate_success(&before, &observation, &settings.alert_rules, now)
            }
            None => return None,
        };

        let fx = Arc::clone(&self.fx);
        self.store
            .update_item(id, |item| apply_success(item, &extraction, &fx, now))?;

        self.notifier.dispatch_all(&events, &settings).await;

        self.diagnostics.record(DiagnosticEntry {
            time: now,
            item_id: item.id.clone(),
            item_name: item.name.clone(),
            url: item.url.clone(),
            list_id: item.list_id.clone(),
            ok: true,
            price: extraction.price,
            currency: extraction.currency.clone(),
            confidence: extraction.confidence,
            source: extraction.source.map(|s| s.as_str().to_string()),
            selector_used: extraction.selector_used.clone(),
            stock_status: extraction.availability.status,
            out_of_stock: extraction.availability.status == StockStatus::OutOfStock,
            stock_reason: extraction.availability.reason.clone(),
            error: None,
        });

        Some(true)
    }

    /// Extractor produced neither a price nor an out-of-stock verdict.
    async fn record_extraction_miss(&self, item: &Item, extraction: &Extraction) {
        let now = Utc::now();
        self.apply_failure_state(item, "No price extracted", now).await;
        self.diagnostics.record(DiagnosticEntry {
            time: now,
            item_id: item.id.clone(),
            item_name: item.name.clone(),
            url: item.url.clone(),
            list_id: item.list_id.clone(),
            ok: false,
            price: None,
            currency: extraction.currency.clone(),
            confidence: extraction.confidence,
            source: extraction.source.map(|s| s.as_str().to_string()),
            selector_used: extraction.selector_used.clone(),
            stock_status: extraction.availability.status,
            out_of_stock: false,
            stock_reason: extraction.availability.reason.clone(),
            error: Some("No price extracted".to_string()),
        });
    }

    /// Guard, fetch, or extraction-task failure.
    async fn record_failure(&self, item: &Item, kind: &str, message: &str) {
        let now = Utc::now();
        let error = format!("{kind}: {message}");
        warn!("check failed for {}: {error}", item.name);
        self.apply_failure_state(item, &error, now).await;
        self.diagnostics.record(DiagnosticEntry {
            time: now,
            item_id: item.id.clone(),
            item_name: item.name.clone(),
            url: item.url.clone(),
            list_id: item.list_id.clone(),
            ok: false,
            price: None,
            currency: item.currency.clone(),
            confidence: 0,
            source: None,
            selector_used: None,
            stock_status: item.stock_status,
            out_of_stock: item.stock_status == StockStatus::OutOfStock,
            stock_reason: item.stock_reason.clone(),
            error: Some(error),
        });
    }

    async fn apply_failure_state(&self, item: &Item, error: &str, now: DateTime<Utc>) {
        self.store.update_item(&item.id, |i| apply_failure(i, error, now));

        let settings = self.store.settings();
        if let Some(stale) = self
            .alerts
            .evaluate_failure(item, &settings.alert_rules, now)
        {
            self.notifier.dispatch(&stale, &settings).await;
        }
    }
}

/// Apply a successful check to an item.
///
/// An out-of-stock observation that still recovered a price only updates
/// `last_seen_price`; the current price and history keep the last in-stock
/// observation. History grows by at most one point per check.
pub fn apply_success(item: &mut Item, extraction: &Extraction, fx: &FxTable, now: DateTime<Utc>) {
    let oos = extraction.availability.status == StockStatus::OutOfStock;

    match extraction.price {
        Some(price) if oos => {
            item.last_seen_price = Some(price);
        }
        Some(price) => {
            item.last_seen_price = Some(price);
            item.current_price = Some(price);

            let append = match item.history.last() {
                None => true,
                Some(last) => {
                    (last.price - price).abs() > f64::EPSILON
                        || now - last.date > ChronoDuration::hours(24)
                }
            };
            if append {
                item.history.push(PricePoint { date: now, price });
            }
        }
        None => {}
    }

    item.currency = extraction.currency.clone();
    item.extraction_confidence = extraction.confidence;
    item.stock_status = extraction.availability.status;
    item.stock_confidence = extraction.availability.confidence;
    item.stock_reason = extraction.availability.reason.clone();
    item.stock_source = extraction.availability.source.clone();

    item.price_in_usd = item
        .current_price
        .and_then(|p| fx.rate(&item.currency).map(|rate| p / rate));

    item.last_checked = Some(now);
    item.last_check_attempt = Some(now);
    item.last_check_status = Some(CheckStatus::Ok);
    item.last_check_error = None;
}

/// Apply a failed check: only the attempt bookkeeping moves.
pub fn apply_failure(item: &mut Item, error: &str, now: DateTime<Utc>) {
    item.last_check_attempt = Some(now);
    item.last_check_status = Some(CheckStatus::Fail);
    item.last_check_error = Some(error.to_string());
}

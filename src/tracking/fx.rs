//! USD-relative FX table
//!
//! Seeded with static defaults and refreshed periodically from a USD-base
//! rate feed. A failed refresh keeps the previous table.

use parking_lot::RwLock;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// Fallback rates used until the first successful refresh
const DEFAULT_RATES: &[(&str, f64)] = &[
    ("USD", 1.0),
    ("EUR", 0.92),
    ("GBP", 0.79),
    ("TRY", 34.0),
    ("JPY", 155.0),
    ("CNY", 7.2),
    ("CAD", 1.37),
    ("AUD", 1.52),
];

#[derive(Debug, Deserialize)]
struct RateFeed {
    rates: HashMap<String, f64>,
}

/// In-memory `currency -> USD-relative rate` table
pub struct FxTable {
    endpoint: String,
    http: reqwest::Client,
    rates: RwLock<HashMap<String, f64>>,
    refreshed_at: RwLock<Option<Instant>>,
}

impl FxTable {
    /// Create a table seeded with the default rates.
    pub fn new(endpoint: impl Into<String>) -> Self {
        let rates = DEFAULT_RATES
            .iter()
            .map(|(c, r)| (c.to_string(), *r))
            .collect();
        Self {
            endpoint: endpoint.into(),
            http: reqwest::Client::builder()
                .timeout(Duration::from_secs(15))
                .build()
                .unwrap_or_default(),
            rates: RwLock::new(rates),
            refreshed_at: RwLock::new(None),
        }
    }

    /// USD-relative rate for a currency, if known and positive.
    pub fn rate(&self, currency: &str) -> Option<f64> {
        self.rates
            .read()
            .get(&currency.to_uppercase())
            .copied()
            .filter(|r| *r > 0.0)
    }

    /// Convert an amount to USD for cross-currency comparison.
    ///
    /// Unknown or zero rates leave the amount unchanged; non-finite amounts
    /// convert to `None`.
    pub fn to_usd(&self, amount: f64, currency: &str) -> Option<f64> {
        if !amount.is_finite() {
            return None;
        }
        match self.rate(currency) {
            Some(rate) => Some(amount / rate),
            None => Some(amount),
        }
    }

    /// Age of the last successful refresh.
    pub fn age(&self) -> Option<Duration> {
        self.refreshed_at.read().map(|t| t.elapsed())
    }

    /// Fetch the feed once and merge it in. USD stays pinned to 1.
    pub async fn refresh(&self) -> anyhow::Result<()> {
        let feed: RateFeed = self
            .http
            .get(&self.endpoint)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let mut incoming: HashMap<String, f64> = feed
            .rates
            .into_iter()
            .filter(|(_, r)| r.is_finite() && *r > 0.0)
            .map(|(c, r)| (c.to_uppercase(), r))
            .collect();
        incoming.insert("USD".to_string(), 1.0);

        if incoming.len() < 2 {
            anyhow::bail!("rate feed returned no usable rates");
        }

        debug!("FX table refreshed: {} currencies", incoming.len());
        *self.rates.write() = incoming;
        *self.refreshed_at.write() = Some(Instant::now());
        Ok(())
    }

    /// Periodic refresh loop; runs until shutdown.
    pub async fn run_refresher(
        self: std::sync::Arc<Self>,
        interval: Duration,
        mut shutdown: broadcast::Receiver<()>,
    ) {
        loop {
            if let Err(e) = self.refresh().await {
                // Keep the previous table; stale rates beat no rates
                warn!("FX refresh failed: {e:#}");
            }
            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                _ = shutdown.recv() => break,
            }
        }
    }
}

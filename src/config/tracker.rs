//! Sweep scheduling and FX refresh configuration

use serde::{Deserialize, Serialize};

/// Default FX feed; USD-base `{ "rates": { "EUR": 0.92, ... } }`
pub const DEFAULT_FX_ENDPOINT: &str = "https://open.er-api.com/v6/latest/USD";

/// Scheduler and FX configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerConfig {
    /// Interval between periodic sweeps (seconds)
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
    /// Pacing delay between items within a sweep (milliseconds)
    #[serde(default = "default_item_delay")]
    pub item_delay_ms: u64,
    /// FX table refresh interval (seconds)
    #[serde(default = "default_fx_refresh")]
    pub fx_refresh_secs: u64,
    /// USD-base rate feed endpoint
    #[serde(default = "default_fx_endpoint")]
    pub fx_endpoint: String,
    /// Ring-buffer capacity for per-check diagnostics
    #[serde(default = "default_diagnostics_capacity")]
    pub diagnostics_capacity: usize,
    /// Hostname allowlist for outbound fetches; empty permits any public host.
    /// Merged with the comma-separated `FETCH_ALLOWED_HOSTS` env variable.
    #[serde(default)]
    pub allowed_hosts: Vec<String>,
}

fn default_sweep_interval() -> u64 {
    3600
}

fn default_item_delay() -> u64 {
    2000
}

fn default_fx_refresh() -> u64 {
    3600
}

fn default_fx_endpoint() -> String {
    DEFAULT_FX_ENDPOINT.to_string()
}

fn default_diagnostics_capacity() -> usize {
    2000
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            sweep_interval_secs: default_sweep_interval(),
            item_delay_ms: default_item_delay(),
            fx_refresh_secs: default_fx_refresh(),
            fx_endpoint: default_fx_endpoint(),
            diagnostics_capacity: default_diagnostics_capacity(),
            allowed_hosts: Vec::new(),
        }
    }
}

impl TrackerConfig {
    /// Allowed hosts from config merged with `FETCH_ALLOWED_HOSTS`, lowercased.
    pub fn effective_allowed_hosts(&self) -> Vec<String> {
        let mut hosts: Vec<String> = self
            .allowed_hosts
            .iter()
            .map(|h| h.trim().to_lowercase())
            .filter(|h| !h.is_empty())
            .collect();
        if let Ok(env_hosts) = std::env::var("FETCH_ALLOWED_HOSTS") {
            hosts.extend(
                env_hosts
                    .split(',')
                    .map(|h| h.trim().to_lowercase())
                    .filter(|h| !h.is_empty()),
            );
        }
        hosts.sort();
        hosts.dedup();
        hosts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cfg = TrackerConfig::default();
        assert_eq!(cfg.sweep_interval_secs, 3600);
        assert_eq!(cfg.item_delay_ms, 2000);
        assert_eq!(cfg.fx_refresh_secs, 3600);
        assert_eq!(cfg.diagnostics_capacity, 2000);
        assert!(cfg.allowed_hosts.is_empty());
    }

    #[test]
    fn allowed_hosts_are_lowercased_and_deduped() {
        let cfg = TrackerConfig {
            allowed_hosts: vec![
                "Example.COM".to_string(),
                "example.com".to_string(),
                "  shop.example.org ".to_string(),
            ],
            ..TrackerConfig::default()
        };
        let hosts = cfg.effective_allowed_hosts();
        assert_eq!(hosts, vec!["example.com".to_string(), "shop.example.org".to_string()]);
    }
}

//! Configuration for PriceWatch

mod browser;
mod http;
mod logging;
mod tracker;

pub use browser::BrowserConfig;
pub use http::HttpConfig;
pub use logging::{LogFormat, LogLevel, LoggingConfig};
pub use tracker::TrackerConfig;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration for the tracker daemon
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding the state blobs (items, settings, diagnostics)
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Sweep scheduling and FX refresh configuration
    #[serde(default)]
    pub tracker: TrackerConfig,
    /// Headless browser configuration
    #[serde(default)]
    pub browser: BrowserConfig,
    /// HTTP API server configuration
    #[serde(default)]
    pub http: HttpConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from(".pricewatch")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            tracker: TrackerConfig::default(),
            browser: BrowserConfig::default(),
            http: HttpConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file and validate it.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read config file '{}': {}", path.display(), e))?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Failed to parse config file '{}': {}", path.display(), e))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate all configuration fields.
    ///
    /// Collects all validation errors and reports them together so the user
    /// can fix everything in one pass.
    pub fn validate(&self) -> Result<()> {
        let mut errors: Vec<String> = Vec::new();

        if self.data_dir.as_os_str().is_empty() {
            errors.push("data_dir must not be empty".to_string());
        }

        // Tracker validation
        if self.tracker.sweep_interval_secs == 0 {
            errors.push("sweep_interval_secs must be positive".to_string());
        }
        if self.tracker.fx_refresh_secs == 0 {
            errors.push("fx_refresh_secs must be positive".to_string());
        }
        if self.tracker.fx_endpoint.is_empty() {
            errors.push("fx_endpoint must not be empty".to_string());
        }
        if self.tracker.diagnostics_capacity == 0 {
            errors.push("diagnostics_capacity must be positive".to_string());
        }

        // Browser validation
        if self.browser.navigation_timeout_secs == 0 {
            errors.push("navigation_timeout_secs must be positive".to_string());
        }
        if self.browser.viewport_width == 0 || self.browser.viewport_height == 0 {
            errors.push("viewport dimensions must be positive".to_string());
        }

        // HTTP validation
        if self.http.enabled && !self.http.listen_addr.is_empty() {
            if let Some(port_str) = self.http.listen_addr.rsplit(':').next() {
                if let Ok(port) = port_str.parse::<u32>() {
                    if port == 0 || port > 65535 {
                        errors.push(format!(
                            "HTTP listen port must be between 1 and 65535, got {}",
                            port
                        ));
                    }
                }
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            anyhow::bail!(
                "Configuration validation failed:\n  - {}",
                errors.join("\n  - ")
            );
        }
    }
}

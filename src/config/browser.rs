//! Headless browser configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Headless browser configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserConfig {
    /// Explicit chromium executable; falls back to `CHROME_EXECUTABLE` and
    /// then a PATH lookup when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executable: Option<PathBuf>,
    /// Hard ceiling for page navigation (seconds)
    #[serde(default = "default_navigation_timeout")]
    pub navigation_timeout_secs: u64,
    /// Post-load settle delay for framework hydration (milliseconds)
    #[serde(default = "default_settle_delay")]
    pub settle_delay_ms: u64,
    #[serde(default = "default_viewport_width")]
    pub viewport_width: u32,
    #[serde(default = "default_viewport_height")]
    pub viewport_height: u32,
}

fn default_navigation_timeout() -> u64 {
    45
}

fn default_settle_delay() -> u64 {
    2000
}

fn default_viewport_width() -> u32 {
    1920
}

fn default_viewport_height() -> u32 {
    1080
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            executable: None,
            navigation_timeout_secs: default_navigation_timeout(),
            settle_delay_ms: default_settle_delay(),
            viewport_width: default_viewport_width(),
            viewport_height: default_viewport_height(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cfg = BrowserConfig::default();
        assert!(cfg.executable.is_none());
        assert_eq!(cfg.navigation_timeout_secs, 45);
        assert_eq!(cfg.settle_delay_ms, 2000);
        assert_eq!((cfg.viewport_width, cfg.viewport_height), (1920, 1080));
    }
}

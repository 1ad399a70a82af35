//! HTTP API server configuration

use serde::{Deserialize, Serialize};

/// HTTP API server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Enable the HTTP API
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Listen address (host:port)
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
    /// Enable permissive CORS for browser UIs
    #[serde(default)]
    pub cors_enabled: bool,
}

fn default_enabled() -> bool {
    true
}

fn default_listen_addr() -> String {
    "127.0.0.1:8844".to_string()
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            listen_addr: default_listen_addr(),
            cors_enabled: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cfg = HttpConfig::default();
        assert!(cfg.enabled);
        assert_eq!(cfg.listen_addr, "127.0.0.1:8844");
        assert!(!cfg.cors_enabled);
    }
}

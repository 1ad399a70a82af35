//! Logging configuration

use serde::{Deserialize, Serialize};
use std::fmt;

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Text,
    Json,
}

/// Log severity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }

    /// Bump the configured level by `-v` occurrences on the CLI.
    pub fn verbose(self, count: u8) -> Self {
        let mut level = self;
        for _ in 0..count {
            level = match level {
                Self::Error => Self::Warn,
                Self::Warn => Self::Info,
                Self::Info => Self::Debug,
                Self::Debug | Self::Trace => Self::Trace,
            };
        }
        level
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
    #[serde(default = "default_log_level")]
    pub level: LogLevel,
}

fn default_log_format() -> LogFormat {
    LogFormat::Text
}

fn default_log_level() -> LogLevel {
    LogLevel::Info
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Text,
            level: LogLevel::Info,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_bumps_level() {
        assert_eq!(LogLevel::Info.verbose(0), LogLevel::Info);
        assert_eq!(LogLevel::Info.verbose(1), LogLevel::Debug);
        assert_eq!(LogLevel::Info.verbose(2), LogLevel::Trace);
        assert_eq!(LogLevel::Info.verbose(10), LogLevel::Trace);
    }

    #[test]
    fn serde_names_are_lowercase() {
        let cfg = LoggingConfig { format: LogFormat::Json, level: LogLevel::Debug };
        let s = toml::to_string(&cfg).unwrap();
        assert!(s.contains("\"json\""));
        assert!(s.contains("\"debug\""));
    }
}

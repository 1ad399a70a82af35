//! HTTP API request and response types

use serde::{Deserialize, Serialize};

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub healthy: bool,
    pub version: String,
}

/// Daemon status for UI polling
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub sweeping: bool,
    pub currently_sweeping_item: Option<String>,
    pub item_count: usize,
    pub fx_age_secs: Option<u64>,
    pub version: String,
}

/// Manual sweep trigger result
#[derive(Debug, Serialize)]
pub struct SweepResponse {
    /// "started" or "busy"
    pub status: &'static str,
}

/// Error payload for 4xx/5xx responses
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Body for creating a tracked item
#[derive(Debug, Deserialize)]
pub struct CreateItemRequest {
    pub url: String,
    pub name: String,
    #[serde(default)]
    pub selector: Option<String>,
    #[serde(default)]
    pub target_price: Option<f64>,
    #[serde(default)]
    pub list_id: Option<String>,
}

/// Body for editing the user-editable fields of an item. Absent fields are
/// left untouched; empty strings clear optional fields.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateItemRequest {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub selector: Option<String>,
    #[serde(default)]
    pub target_price: Option<f64>,
    #[serde(default)]
    pub list_id: Option<String>,
}

/// Query parameters for the diagnostics endpoint
#[derive(Debug, Deserialize)]
pub struct DiagnosticsQuery {
    #[serde(default = "default_diagnostics_limit")]
    pub limit: usize,
}

fn default_diagnostics_limit() -> usize {
    100
}

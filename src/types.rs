//! Core data model shared across the tracker

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

fn default_list_id() -> String {
    "default".to_string()
}

fn default_currency() -> String {
    "USD".to_string()
}

/// In-stock verdict for a tracked item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StockStatus {
    InStock,
    OutOfStock,
    #[default]
    Unknown,
}

impl StockStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InStock => "in_stock",
            Self::OutOfStock => "out_of_stock",
            Self::Unknown => "unknown",
        }
    }
}

/// Outcome of the most recent check attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckStatus {
    Ok,
    Fail,
}

/// A single observed price, appended to an item's history
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: DateTime<Utc>,
    pub price: f64,
}

/// A tracked product page
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    /// Opaque identity
    pub id: String,
    /// Absolute http/https URL of the product page
    pub url: String,
    /// Optional CSS selector hint supplied by the user
    #[serde(default)]
    pub selector: Option<String>,
    /// Alert target price
    #[serde(default)]
    pub target_price: Option<f64>,
    /// Grouping tag
    #[serde(default = "default_list_id")]
    pub list_id: String,
    /// Display name
    pub name: String,

    /// Last in-stock price observed
    #[serde(default)]
    pub current_price: Option<f64>,
    /// ISO-4217 code, always set
    #[serde(default = "default_currency")]
    pub currency: String,
    /// `current_price` converted through the FX table
    #[serde(default)]
    pub price_in_usd: Option<f64>,
    /// Last price seen at all, retained while out of stock
    #[serde(default)]
    pub last_seen_price: Option<f64>,

    #[serde(default)]
    pub stock_status: StockStatus,
    #[serde(default)]
    pub stock_confidence: u8,
    #[serde(default)]
    pub stock_reason: String,
    #[serde(default)]
    pub stock_source: String,

    /// Extraction confidence of the last successful check (0-100)
    #[serde(default)]
    pub extraction_confidence: u8,

    /// Timestamp of the last successful check
    #[serde(default)]
    pub last_checked: Option<DateTime<Utc>>,
    /// Timestamp of the last attempt, successful or not
    #[serde(default)]
    pub last_check_attempt: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_check_status: Option<CheckStatus>,
    #[serde(default)]
    pub last_check_error: Option<String>,

    /// Price history, non-decreasing in `date`
    #[serde(default)]
    pub history: Vec<PricePoint>,
}

impl Item {
    /// Create a new item with a generated id and empty observation state
    pub fn new(url: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            url: url.into(),
            selector: None,
            target_price: None,
            list_id: default_list_id(),
            name: name.into(),
            current_price: None,
            currency: default_currency(),
            price_in_usd: None,
            last_seen_price: None,
            stock_status: StockStatus::Unknown,
            stock_confidence: 0,
            stock_reason: String::new(),
            stock_source: String::new(),
            extraction_confidence: 0,
            last_checked: None,
            last_check_attempt: None,
            last_check_status: None,
            last_check_error: None,
            history: Vec::new(),
        }
    }

    /// Lowest price across recorded history and the current price
    pub fn all_time_low(&self) -> Option<f64> {
        self.history
            .iter()
            .map(|p| p.price)
            .chain(self.current_price)
            .fold(None, |acc: Option<f64>, p| Some(acc.map_or(p, |a| a.min(p))))
    }
}

/// A named grouping of items
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackedList {
    pub id: String,
    pub name: String,
}

/// Global alert rule configuration, editable at runtime
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertRules {
    #[serde(default = "yes")]
    pub target_hit_enabled: bool,
    #[serde(default = "yes")]
    pub price_drop_enabled: bool,
    #[serde(default = "yes")]
    pub price_drop_24h_enabled: bool,
    #[serde(default = "default_drop_percent")]
    pub price_drop_24h_percent: f64,
    #[serde(default = "yes")]
    pub all_time_low_enabled: bool,
    #[serde(default = "yes")]
    pub low_confidence_enabled: bool,
    #[serde(default = "default_confidence_threshold")]
    pub low_confidence_threshold: u8,
    #[serde(default = "yes")]
    pub stale_enabled: bool,
    #[serde(default = "default_stale_hours")]
    pub stale_hours: u64,
    #[serde(default = "default_cooldown_minutes")]
    pub notify_cooldown_minutes: u64,
}

fn yes() -> bool {
    true
}

fn default_drop_percent() -> f64 {
    5.0
}

fn default_confidence_threshold() -> u8 {
    55
}

fn default_stale_hours() -> u64 {
    12
}

fn default_cooldown_minutes() -> u64 {
    240
}

impl Default for AlertRules {
    fn default() -> Self {
        Self {
            target_hit_enabled: true,
            price_drop_enabled: true,
            price_drop_24h_enabled: true,
            price_drop_24h_percent: 5.0,
            all_time_low_enabled: true,
            low_confidence_enabled: true,
            low_confidence_threshold: 55,
            stale_enabled: true,
            stale_hours: 12,
            notify_cooldown_minutes: 240,
        }
    }
}

/// User settings persisted alongside items
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Discord-style webhook URL
    #[serde(default)]
    pub discord_webhook: Option<String>,
    /// Telegram bot token
    #[serde(default)]
    pub telegram_token: Option<String>,
    /// Telegram chat id
    #[serde(default)]
    pub telegram_chat_id: Option<String>,
    #[serde(default)]
    pub lists: Vec<TrackedList>,
    #[serde(default)]
    pub alert_rules: AlertRules,
}

/// One per-check outcome kept in the diagnostics ring buffer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosticEntry {
    pub time: DateTime<Utc>,
    pub item_id: String,
    pub item_name: String,
    pub url: String,
    pub list_id: String,
    pub ok: bool,
    pub price: Option<f64>,
    pub currency: String,
    pub confidence: u8,
    pub source: Option<String>,
    pub selector_used: Option<String>,
    pub stock_status: StockStatus,
    pub out_of_stock: bool,
    pub stock_reason: String,
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_item_defaults() {
        let item = Item::new("https://example.com/p/1", "Widget");
        assert_eq!(item.list_id, "default");
        assert_eq!(item.currency, "USD");
        assert_eq!(item.stock_status, StockStatus::Unknown);
        assert!(item.history.is_empty());
        assert!(item.last_checked.is_none());
    }

    #[test]
    fn all_time_low_over_history_and_current() {
        let mut item = Item::new("https://example.com/p/1", "Widget");
        assert_eq!(item.all_time_low(), None);

        item.current_price = Some(90.0);
        assert_eq!(item.all_time_low(), Some(90.0));

        item.history.push(PricePoint { date: Utc::now(), price: 120.0 });
        item.history.push(PricePoint { date: Utc::now(), price: 80.0 });
        assert_eq!(item.all_time_low(), Some(80.0));
    }

    #[test]
    fn item_round_trips_through_json() {
        let mut item = Item::new("https://example.com/p/2", "Gadget");
        item.target_price = Some(49.99);
        item.stock_status = StockStatus::OutOfStock;

        let json = serde_json::to_string(&item).unwrap();
        assert!(json.contains("\"out_of_stock\""));

        let back: Item = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, item.id);
        assert_eq!(back.target_price, Some(49.99));
        assert_eq!(back.stock_status, StockStatus::OutOfStock);
    }

    #[test]
    fn partial_item_json_fills_defaults() {
        // Items written by older versions carry only the user fields
        let json = r#"{"id":"a1","url":"https://example.com","name":"Old"}"#;
        let item: Item = serde_json::from_str(json).unwrap();
        assert_eq!(item.currency, "USD");
        assert_eq!(item.list_id, "default");
        assert_eq!(item.stock_status, StockStatus::Unknown);
    }

    #[test]
    fn alert_rules_defaults() {
        let rules = AlertRules::default();
        assert!(rules.target_hit_enabled);
        assert!((rules.price_drop_24h_percent - 5.0).abs() < f64::EPSILON);
        assert_eq!(rules.low_confidence_threshold, 55);
        assert_eq!(rules.stale_hours, 12);
        assert_eq!(rules.notify_cooldown_minutes, 240);
    }

    #[test]
    fn empty_settings_blob_deserializes() {
        let settings: Settings = serde_json::from_str("{}").unwrap();
        assert!(settings.discord_webhook.is_none());
        assert!(settings.lists.is_empty());
        assert!(settings.alert_rules.price_drop_enabled);
    }
}

//! Alert rule evaluation
//!
//! Rules are evaluated against the item state *before* the check result is
//! applied, so "old price" comparisons see the previous observation. Every
//! `(rule, item)` pair is rate-limited by an in-memory cooldown map; the map
//! resets on restart, which at worst repeats one alert.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use dashmap::DashMap;
use std::collections::HashSet;
use std::fmt;
use std::time::{Duration, Instant};

use crate::types::{AlertRules, Item, StockStatus};

/// The rule an alert fired under; part of the cooldown key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AlertRule {
    Target,
    PriceDrop,
    PriceDrop24h,
    AllTimeLow,
    LowConfidence,
    Stale,
    OutOfStock,
}

impl AlertRule {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Target => "target",
            Self::PriceDrop => "price_drop",
            Self::PriceDrop24h => "price_drop_24h",
            Self::AllTimeLow => "all_time_low",
            Self::LowConfidence => "low_confidence",
            Self::Stale => "stale",
            Self::OutOfStock => "out_of_stock",
        }
    }
}

impl fmt::Display for AlertRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fired alert ready for dispatch
#[derive(Debug, Clone, PartialEq)]
pub struct AlertEvent {
    pub rule: AlertRule,
    pub item_id: String,
    pub title: String,
    pub body: String,
}

/// What the current check observed, before it is applied to the item
#[derive(Debug, Clone)]
pub struct CheckObservation {
    pub price: Option<f64>,
    pub currency: String,
    pub confidence: u8,
    pub status: StockStatus,
}

/// Rule evaluator with per-`(rule, item)` cooldowns
pub struct AlertEngine {
    cooldowns: DashMap<(AlertRule, String), Instant>,
}

impl Default for AlertEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl AlertEngine {
    pub fn new() -> Self {
        Self {
            cooldowns: DashMap::new(),
        }
    }

    /// Evaluate rules for a successful check. `item` is the pre-update state.
    pub fn evaluate_success(
        &self,
        item: &Item,
        obs: &CheckObservation,
        rules: &AlertRules,
        now: DateTime<Utc>,
    ) -> Vec<AlertEvent> {
        let cooldown = Duration::from_secs(rules.notify_cooldown_minutes * 60);
        let mut events = Vec::new();
        let old = item.current_price;

        if let Some(new) = obs.price {
            let changed = old.map_or(true, |o| (o - new).abs() > f64::EPSILON);

            // Price movement rules only apply to in-stock observations; an
            // out-of-stock page's residual price is not a real offer.
            if changed && obs.status != StockStatus::OutOfStock {
                if rules.target_hit_enabled {
                    if let (Some(target), Some(o)) = (item.target_price, old) {
                        if new <= target && o > target {
                            events.push(self.fire(
                                AlertRule::Target,
                                item,
                                cooldown,
                                format!("Target price hit: {}", item.name),
                                format!(
                                    "{} is now {:.2} {} (target {:.2}, was {:.2})",
                                    item.name, new, obs.currency, target, o
                                ),
                            ));
                        }
                    }
                }

                if rules.price_drop_enabled {
                    if let Some(o) = old {
                        if new < o {
                            events.push(self.fire(
                                AlertRule::PriceDrop,
                                item,
                                cooldown,
                                format!("Price drop: {}", item.name),
                                format!(
                                    "{} dropped from {:.2} to {:.2} {}",
                                    item.name, o, new, obs.currency
                                ),
                            ));
                        }
                    }
                }

                if rules.price_drop_24h_enabled {
                    events.push(
                        self.evaluate_drop_24h(item, new, &obs.currency, old, rules, now, cooldown),
                    );
                }

                if rules.all_time_low_enabled {
                    if let Some(floor) = item.all_time_low() {
                        if new < floor {
                            events.push(self.fire(
                                AlertRule::AllTimeLow,
                                item,
                                cooldown,
                                format!("All-time low: {}", item.name),
                                format!(
                                    "{} hit a new all-time low of {:.2} {} (previous {:.2})",
                                    item.name, new, obs.currency, floor
                                ),
                            ));
                        }
                    }
                }
            }
        }

        if rules.low_confidence_enabled
            && obs.confidence > 0
            && obs.confidence < rules.low_confidence_threshold
        {
            events.push(self.fire(
                AlertRule::LowConfidence,
                item,
                cooldown,
                format!("Low extraction confidence: {}", item.name),
                format!(
                    "Extraction confidence for {} fell to {} (threshold {}); the selector may need updating",
                    item.name, obs.confidence, rules.low_confidence_threshold
                ),
            ));
        }

        if obs.status == StockStatus::OutOfStock && item.stock_status != StockStatus::OutOfStock {
            events.push(self.fire(
                AlertRule::OutOfStock,
                item,
                cooldown,
                format!("Out of stock: {}", item.name),
                format!("{} went out of stock", item.name),
            ));
        }

        events.into_iter().flatten().collect()
    }

    /// Evaluate the stale rule after a failed check.
    pub fn evaluate_failure(
        &self,
        item: &Item,
        rules: &AlertRules,
        now: DateTime<Utc>,
    ) -> Option<AlertEvent> {
        if !rules.stale_enabled {
            return None;
        }
        let last_ok = item.last_checked?;
        let stale_after = ChronoDuration::hours(rules.stale_hours as i64);
        if now - last_ok <= stale_after {
            return None;
        }
        let cooldown = Duration::from_secs(rules.notify_cooldown_minutes * 60);
        self.fire(
            AlertRule::Stale,
            item,
            cooldown,
            format!("Checks going stale: {}", item.name),
            format!(
                "{} has had no successful check for over {} hours",
                item.name, rules.stale_hours
            ),
        )
    }

    fn evaluate_drop_24h(
        &self,
        item: &Item,
        new: f64,
        currency: &str,
        old: Option<f64>,
        rules: &AlertRules,
        now: DateTime<Utc>,
        cooldown: Duration,
    ) -> Option<AlertEvent> {
        let o = old?;
        if new >= o {
            return None;
        }
        let anchor = now - ChronoDuration::hours(24);
        let reference = item
            .history
            .iter()
            .min_by_key(|p| (p.date - anchor).num_seconds().abs())?;
        if reference.price <= 0.0 {
            return None;
        }
        let drop_percent = (reference.price - new) / reference.price * 100.0;
        if drop_percent < rules.price_drop_24h_percent {
            return None;
        }
        self.fire(
            AlertRule::PriceDrop24h,
            item,
            cooldown,
            format!("24h price drop: {}", item.name),
            format!(
                "{} is down {:.1}% over 24h to {:.2} {}",
                item.name, drop_percent, new, currency
            ),
        )
    }

    /// Build the event if the cooldown window allows it.
    fn fire(
        &self,
        rule: AlertRule,
        item: &Item,
        cooldown: Duration,
        title: String,
        body: String,
    ) -> Option<AlertEvent> {
        if !self.permit_at(rule, &item.id, Instant::now(), cooldown) {
            return None;
        }
        Some(AlertEvent {
            rule,
            item_id: item.id.clone(),
            title,
            body,
        })
    }

    /// Cooldown gate: allow one fire per `(rule, item)` per window, and
    /// record the fire time when allowed.
    pub fn permit_at(
        &self,
        rule: AlertRule,
        item_id: &str,
        now: Instant,
        cooldown: Duration,
    ) -> bool {
        let key = (rule, item_id.to_string());
        if let Some(last) = self.cooldowns.get(&key) {
            if now.duration_since(*last) < cooldown {
                return false;
            }
        }
        self.cooldowns.insert(key, now);
        true
    }

    /// Drop cooldown entries for items that no longer exist.
    pub fn prune(&self, live_item_ids: &HashSet<String>) {
        self.cooldowns.retain(|(_, id), _| live_item_ids.contains(id));
    }

    #[cfg(test)]
    pub fn cooldown_len(&self) -> usize {
        self.cooldowns.len()
    }
}

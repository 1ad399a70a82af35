//! Alert rules, cooldowns, and notification dispatch

mod engine;
mod sinks;

pub use engine::{AlertEngine, AlertEvent, AlertRule, CheckObservation};
pub use sinks::Notifier;

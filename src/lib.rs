//! PriceWatch: price and availability tracking for e-commerce pages
//!
//! A daemon that periodically fetches registered product URLs through a
//! shared headless browser, extracts a price and an in-stock verdict from
//! the rendered HTML, records price history, and dispatches alerts
//! (target hit, price drop, all-time low, out-of-stock, stale checks) to
//! webhook and chat sinks. A small HTTP API drives item edits, manual
//! sweeps, and diagnostics queries.

pub mod alerts;
pub mod config;
pub mod daemon;
pub mod store;
pub mod tracking;
pub mod types;

pub use config::Config;
pub use types::*;

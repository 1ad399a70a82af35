//! State persistence: item/settings blobs and the diagnostics ring buffer

mod diagnostics;
mod state;

pub use diagnostics::DiagnosticsLog;
pub use state::{write_json_atomic, StateStore, TrackerState};

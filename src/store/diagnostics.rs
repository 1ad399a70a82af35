//! Per-check diagnostics ring buffer
//!
//! Newest-first, capped; the UI reads recent entries, the sweep appends one
//! per check attempt. Persisted as a JSON blob next to the state files.

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use tracing::warn;

use super::state::write_json_atomic;
use crate::types::DiagnosticEntry;

const DIAGNOSTICS_FILE: &str = "diagnostics.json";

/// Capped, newest-first log of check outcomes
pub struct DiagnosticsLog {
    capacity: usize,
    path: PathBuf,
    entries: Mutex<VecDeque<DiagnosticEntry>>,
}

impl DiagnosticsLog {
    /// Open the log, loading the persisted blob when present.
    pub fn open(data_dir: &Path, capacity: usize) -> Self {
        let path = data_dir.join(DIAGNOSTICS_FILE);
        let mut entries: VecDeque<DiagnosticEntry> = std::fs::read_to_string(&path)
            .ok()
            .and_then(|content| match serde_json::from_str(&content) {
                Ok(list) => Some(list),
                Err(e) => {
                    warn!("failed to parse {}: {e}", path.display());
                    None
                }
            })
            .unwrap_or_default();
        entries.truncate(capacity);

        Self {
            capacity,
            path,
            entries: Mutex::new(entries),
        }
    }

    /// Record one check outcome at the front, evicting the oldest past
    /// capacity.
    pub fn record(&self, entry: DiagnosticEntry) {
        let mut entries = self.entries.lock();
        entries.push_front(entry);
        entries.truncate(self.capacity);
    }

    /// Most recent entries, newest first.
    pub fn recent(&self, limit: usize) -> Vec<DiagnosticEntry> {
        self.entries.lock().iter().take(limit).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Write the blob atomically.
    pub fn persist(&self) -> anyhow::Result<()> {
        let snapshot: Vec<DiagnosticEntry> = self.entries.lock().iter().cloned().collect();
        write_json_atomic(&self.path, &snapshot)
    }
}

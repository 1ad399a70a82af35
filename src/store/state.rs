//! Persistent item and settings state
//!
//! Two JSON blobs under the data directory, `items.json` and
//! `settings.json`, each replaced atomically via a temp file and rename.
//! All mutation funnels through one lock: the sweep and the edit API are
//! both writers, and neither holds the lock across I/O.

use anyhow::{Context, Result};
use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::types::{Item, Settings};

const ITEMS_FILE: &str = "items.json";
const SETTINGS_FILE: &str = "settings.json";

/// Everything the tracker persists apart from diagnostics
#[derive(Debug, Clone, Default)]
pub struct TrackerState {
    /// Items in insertion order; sweeps iterate this order
    pub items: Vec<Item>,
    pub settings: Settings,
}

/// State store with a single-writer lock and atomic persistence
pub struct StateStore {
    data_dir: PathBuf,
    state: RwLock<TrackerState>,
}

impl StateStore {
    /// Open the store, loading existing blobs when present.
    pub fn open(data_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(data_dir)
            .with_context(|| format!("failed to create data dir {}", data_dir.display()))?;

        let items: Vec<Item> = load_json(&data_dir.join(ITEMS_FILE)).unwrap_or_default();
        let settings: Settings = load_json(&data_dir.join(SETTINGS_FILE)).unwrap_or_default();

        debug!("state store opened: {} items", items.len());
        Ok(Self {
            data_dir: data_dir.to_path_buf(),
            state: RwLock::new(TrackerState { items, settings }),
        })
    }

    /// Consistent snapshot for readers.
    pub fn snapshot(&self) -> TrackerState {
        self.state.read().clone()
    }

    /// Item ids in insertion order.
    pub fn item_ids(&self) -> Vec<String> {
        self.state.read().items.iter().map(|i| i.id.clone()).collect()
    }

    pub fn item_count(&self) -> usize {
        self.state.read().items.len()
    }

    pub fn get_item(&self, id: &str) -> Option<Item> {
        self.state.read().items.iter().find(|i| i.id == id).cloned()
    }

    pub fn insert_item(&self, item: Item) {
        self.state.write().items.push(item);
    }

    /// Mutate one item under the write lock; returns the closure's result,
    /// or `None` when the item no longer exists.
    pub fn update_item<F, R>(&self, id: &str, f: F) -> Option<R>
    where
        F: FnOnce(&mut Item) -> R,
    {
        let mut state = self.state.write();
        state.items.iter_mut().find(|i| i.id == id).map(f)
    }

    pub fn remove_item(&self, id: &str) -> bool {
        let mut state = self.state.write();
        let before = state.items.len();
        state.items.retain(|i| i.id != id);
        state.items.len() != before
    }

    pub fn settings(&self) -> Settings {
        self.state.read().settings.clone()
    }

    pub fn update_settings<F>(&self, f: F)
    where
        F: FnOnce(&mut Settings),
    {
        f(&mut self.state.write().settings);
    }

    /// Write both blobs atomically. The snapshot is taken under the lock,
    /// the writes happen outside it.
    pub fn persist(&self) -> Result<()> {
        let snapshot = self.snapshot();
        write_json_atomic(&self.data_dir.join(ITEMS_FILE), &snapshot.items)?;
        write_json_atomic(&self.data_dir.join(SETTINGS_FILE), &snapshot.settings)?;
        Ok(())
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}

fn load_json<T: serde::de::DeserializeOwned>(path: &Path) -> Option<T> {
    let content = std::fs::read_to_string(path).ok()?;
    match serde_json::from_str(&content) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("failed to parse {}: {e}", path.display());
            None
        }
    }
}

/// Full-file atomic replacement: write a sibling temp file, then rename over
/// the target.
pub fn write_json_atomic<T: serde::Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, json.as_bytes())
        .with_context(|| format!("failed to write {}", tmp.display()))?;
    std::fs::rename(&tmp, path)
        .with_context(|| format!("failed to replace {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_empty_dir() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::open(dir.path()).unwrap();
        assert_eq!(store.item_count(), 0);
        assert!(store.settings().discord_webhook.is_none());
    }

    #[test]
    fn persist_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = StateStore::open(dir.path()).unwrap();
            let mut item = Item::new("https://example.com/p/1", "Widget");
            item.target_price = Some(50.0);
            store.insert_item(item);
            store.update_settings(|s| s.discord_webhook = Some("https://wh.example".into()));
            store.persist().unwrap();
        }

        let store = StateStore::open(dir.path()).unwrap();
        assert_eq!(store.item_count(), 1);
        let items = store.snapshot().items;
        assert_eq!(items[0].name, "Widget");
        assert_eq!(items[0].target_price, Some(50.0));
        assert_eq!(store.settings().discord_webhook.as_deref(), Some("https://wh.example"));
    }

    #[test]
    fn insertion_order_is_preserved() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::open(dir.path()).unwrap();
        for name in ["a", "b", "c"] {
            store.insert_item(Item::new(format!("https://example.com/{name}"), name));
        }
        let names: Vec<String> = store.snapshot().items.into_iter().map(|i| i.name).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn update_item_mutates_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::open(dir.path()).unwrap();
        let item = Item::new("https://example.com/p/1", "Widget");
        let id = item.id.clone();
        store.insert_item(item);

        let result = store.update_item(&id, |i| {
            i.current_price = Some(9.99);
            i.current_price
        });
        assert_eq!(result, Some(Some(9.99)));
        assert_eq!(store.get_item(&id).unwrap().current_price, Some(9.99));

        assert!(store.update_item("missing", |_| ()).is_none());
    }

    #[test]
    fn remove_item() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::open(dir.path()).unwrap();
        let item = Item::new("https://example.com/p/1", "Widget");
        let id = item.id.clone();
        store.insert_item(item);

        assert!(store.remove_item(&id));
        assert!(!store.remove_item(&id));
        assert_eq!(store.item_count(), 0);
    }

    #[test]
    fn corrupt_blob_falls_back_to_empty() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(ITEMS_FILE), b"{not json").unwrap();
        let store = StateStore::open(dir.path()).unwrap();
        assert_eq!(store.item_count(), 0);
    }

    #[test]
    fn atomic_write_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("items.json");
        write_json_atomic(&path, &vec![1, 2, 3]).unwrap();
        assert!(path.exists());
        assert!(!dir.path().join("items.json.tmp").exists());
    }
}

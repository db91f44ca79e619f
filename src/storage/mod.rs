//! Storage layer for ptm data.
//!
//! Persistence goes through the [`Store`] port so the pipeline never
//! touches filesystem paths itself. Two kinds of blobs are kept:
//!
//! - **Responses**: the latest body of each upstream endpoint, one JSON
//!   file per endpoint, overwritten on every fetch. Serves `--cached`
//!   runs.
//! - **Snapshots**: periodic copies of the raw tree response, keyed by a
//!   `YYYY.MM.DD.HH.MM.SS` timestamp. "Most recent" is by descending key
//!   sort. Snapshot bodies are stored verbatim.
//!
//! [`FileStore`] is the on-disk implementation (`<data>/cache/`,
//! `<data>/history/tree_data/`); [`MemoryStore`] backs tests.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::Local;
use serde_json::Value;
use tracing::debug;

use crate::Result;

/// Snapshot key timestamp layout; lexicographic order matches
/// chronological order.
pub const SNAPSHOT_KEY_FORMAT: &str = "%Y.%m.%d.%H.%M.%S";

/// A snapshot key for the current local time.
pub fn snapshot_key_now() -> String {
    Local::now().format(SNAPSHOT_KEY_FORMAT).to_string()
}

/// Persistence port for endpoint responses and tree snapshots.
pub trait Store {
    /// Overwrite the cached body for an endpoint.
    fn save_response(&self, name: &str, data: &Value) -> Result<()>;

    /// The cached body for an endpoint, if one was ever saved.
    fn load_response(&self, name: &str) -> Result<Option<Value>>;

    /// Persist a tree snapshot under a timestamp key.
    fn save_snapshot(&self, key: &str, data: &Value) -> Result<()>;

    /// A specific snapshot body.
    fn load_snapshot(&self, key: &str) -> Result<Option<Value>>;

    /// All snapshot keys, most recent first.
    fn list_snapshots(&self) -> Result<Vec<String>>;

    /// The most recent snapshot, or `None` when history is empty.
    fn latest_snapshot(&self) -> Result<Option<(String, Value)>> {
        let Some(key) = self.list_snapshots()?.into_iter().next() else {
            return Ok(None);
        };
        Ok(self.load_snapshot(&key)?.map(|data| (key, data)))
    }
}

/// File-backed store rooted at the data directory.
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn cache_dir(&self) -> PathBuf {
        self.root.join("cache")
    }

    fn history_dir(&self) -> PathBuf {
        self.root.join("history").join("tree_data")
    }

    fn read_json(path: &Path) -> Result<Option<Value>> {
        if !path.exists() {
            return Ok(None);
        }
        let contents = fs::read_to_string(path)?;
        Ok(Some(serde_json::from_str(&contents)?))
    }

    /// Write via a temp file in the same directory, then rename, so a
    /// crashed run never leaves a truncated JSON file behind.
    fn write_json(dir: &Path, filename: &str, data: &Value) -> Result<()> {
        fs::create_dir_all(dir)?;
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        serde_json::to_writer(&mut tmp, data)?;
        tmp.flush()?;
        tmp.persist(dir.join(filename))
            .map_err(|e| crate::Error::Io(e.error))?;
        Ok(())
    }
}

impl Store for FileStore {
    fn save_response(&self, name: &str, data: &Value) -> Result<()> {
        debug!(name, "saving cached response");
        Self::write_json(&self.cache_dir(), &format!("{name}.json"), data)
    }

    fn load_response(&self, name: &str) -> Result<Option<Value>> {
        Self::read_json(&self.cache_dir().join(format!("{name}.json")))
    }

    fn save_snapshot(&self, key: &str, data: &Value) -> Result<()> {
        debug!(key, "saving tree snapshot");
        Self::write_json(&self.history_dir(), &format!("{key}.json"), data)
    }

    fn load_snapshot(&self, key: &str) -> Result<Option<Value>> {
        Self::read_json(&self.history_dir().join(format!("{key}.json")))
    }

    fn list_snapshots(&self) -> Result<Vec<String>> {
        let dir = self.history_dir();
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut keys = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if let Some(key) = name.strip_suffix(".json") {
                keys.push(key.to_string());
            }
        }
        keys.sort_by(|a, b| b.cmp(a));
        Ok(keys)
    }
}

/// In-memory store for tests.
#[derive(Default)]
pub struct MemoryStore {
    responses: Mutex<BTreeMap<String, Value>>,
    snapshots: Mutex<BTreeMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Store for MemoryStore {
    fn save_response(&self, name: &str, data: &Value) -> Result<()> {
        self.responses
            .lock()
            .unwrap()
            .insert(name.to_string(), data.clone());
        Ok(())
    }

    fn load_response(&self, name: &str) -> Result<Option<Value>> {
        Ok(self.responses.lock().unwrap().get(name).cloned())
    }

    fn save_snapshot(&self, key: &str, data: &Value) -> Result<()> {
        self.snapshots
            .lock()
            .unwrap()
            .insert(key.to_string(), data.clone());
        Ok(())
    }

    fn load_snapshot(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.snapshots.lock().unwrap().get(key).cloned())
    }

    fn list_snapshots(&self) -> Result<Vec<String>> {
        let mut keys: Vec<String> = self.snapshots.lock().unwrap().keys().cloned().collect();
        keys.sort_by(|a, b| b.cmp(a));
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn response_roundtrip() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path());

        assert!(store.load_response("tree_data").unwrap().is_none());

        let body = json!({"items": [{"id": "a"}]});
        store.save_response("tree_data", &body).unwrap();
        assert_eq!(store.load_response("tree_data").unwrap(), Some(body));
    }

    #[test]
    fn response_overwrite_keeps_latest() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path());

        store.save_response("tree_data", &json!({"v": 1})).unwrap();
        store.save_response("tree_data", &json!({"v": 2})).unwrap();
        assert_eq!(
            store.load_response("tree_data").unwrap(),
            Some(json!({"v": 2}))
        );
    }

    #[test]
    fn empty_history_yields_no_latest() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path());

        assert!(store.list_snapshots().unwrap().is_empty());
        assert!(store.latest_snapshot().unwrap().is_none());
    }

    #[test]
    fn latest_snapshot_is_greatest_key() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path());

        store
            .save_snapshot("2024.03.01.08.00.00", &json!({"n": 1}))
            .unwrap();
        store
            .save_snapshot("2024.03.10.09.30.00", &json!({"n": 2}))
            .unwrap();
        store
            .save_snapshot("2023.12.31.23.59.59", &json!({"n": 0}))
            .unwrap();

        let keys = store.list_snapshots().unwrap();
        assert_eq!(
            keys,
            vec![
                "2024.03.10.09.30.00",
                "2024.03.01.08.00.00",
                "2023.12.31.23.59.59"
            ]
        );

        let (key, body) = store.latest_snapshot().unwrap().unwrap();
        assert_eq!(key, "2024.03.10.09.30.00");
        assert_eq!(body, json!({"n": 2}));
    }

    #[test]
    fn snapshot_bodies_are_stored_verbatim() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path());

        let body = json!({"items": [{"id": "a", "prnt": "None", "nm": "X", "unknown": [1, 2]}]});
        store.save_snapshot("2024.01.01.00.00.00", &body).unwrap();
        assert_eq!(
            store.load_snapshot("2024.01.01.00.00.00").unwrap(),
            Some(body)
        );
    }

    #[test]
    fn snapshot_key_shape() {
        let key = snapshot_key_now();
        // YYYY.MM.DD.HH.MM.SS
        assert_eq!(key.len(), 19);
        assert_eq!(key.matches('.').count(), 5);
    }

    #[test]
    fn memory_store_behaves_like_file_store() {
        let store = MemoryStore::new();
        assert!(store.latest_snapshot().unwrap().is_none());

        store.save_snapshot("2024.02.01.00.00.00", &json!(1)).unwrap();
        store.save_snapshot("2024.02.02.00.00.00", &json!(2)).unwrap();
        let (key, body) = store.latest_snapshot().unwrap().unwrap();
        assert_eq!(key, "2024.02.02.00.00.00");
        assert_eq!(body, json!(2));
    }
}

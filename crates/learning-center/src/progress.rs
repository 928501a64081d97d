//! User progress persistence.
//!
//! A single JSON document records which chapters are completed. The store
//! re-reads the file on every request and rewrites the whole document on
//! every mutation through a temp-file + atomic-rename path, so a crashed
//! write never leaves a half-serialized file behind. Writers are NOT
//! serialized against each other: two concurrent mutations race and the
//! last rename wins. That lost-update window is an accepted property of the
//! single-user plugin, not something this module hides.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use lc_common::error::CommonError;
use lc_common::readers::read_text_lenient;

/// The persisted progress document. Unknown keys survive a load/save cycle;
/// a missing or wrong-typed `completed_chapters` reads as empty.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProgressDoc {
    #[serde(default, deserialize_with = "lenient_completed")]
    pub completed_chapters: BTreeMap<String, bool>,
    /// Present for compatibility with older documents; nothing consumes it.
    #[serde(default)]
    pub favorites: Vec<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Accept any JSON value where `completed_chapters` should be: anything but
/// an object of booleans degrades to empty instead of failing the load.
fn lenient_completed<'de, D>(deserializer: D) -> Result<BTreeMap<String, bool>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let Value::Object(map) = value else {
        return Ok(BTreeMap::new());
    };
    Ok(map
        .into_iter()
        .filter_map(|(k, v)| v.as_bool().map(|b| (k, b)))
        .collect())
}

impl ProgressDoc {
    pub fn is_completed(&self, id: &str) -> bool {
        self.completed_chapters.get(id).copied().unwrap_or(false)
    }
}

/// File-backed progress store. Cheap to clone; holds only the path.
#[derive(Debug, Clone)]
pub struct ProgressStore {
    path: PathBuf,
}

impl ProgressStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Load the document, degrading to an empty one if the file is absent,
    /// unreadable, or malformed. A listing must never fail because the
    /// progress file is damaged.
    pub fn load(&self) -> ProgressDoc {
        let text = match read_text_lenient(&self.path) {
            Ok(text) => text,
            Err(_) => return ProgressDoc::default(),
        };
        match serde_json::from_str(&text) {
            Ok(doc) => doc,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "malformed progress file, treating as empty");
                ProgressDoc::default()
            }
        }
    }

    /// Serialize the whole document and replace the file atomically.
    pub fn save(&self, doc: &ProgressDoc) -> Result<(), CommonError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(doc)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json.as_bytes())?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    /// Create an empty document if the file is absent, and reset it if it
    /// does not parse. Run once at startup.
    pub fn ensure_initialized(&self) -> Result<(), CommonError> {
        if !self.path.exists() {
            return self.save(&ProgressDoc::default());
        }
        if read_text_lenient(&self.path)
            .ok()
            .and_then(|text| serde_json::from_str::<ProgressDoc>(&text).ok())
            .is_none()
        {
            warn!(path = %self.path.display(), "progress file unreadable, resetting to empty");
            return self.save(&ProgressDoc::default());
        }
        Ok(())
    }

    pub fn is_completed(&self, id: &str) -> bool {
        self.load().is_completed(id)
    }

    /// Mark a chapter completed. Idempotent.
    pub fn mark_completed(&self, id: &str) -> Result<(), CommonError> {
        let mut doc = self.load();
        doc.completed_chapters.insert(id.to_string(), true);
        self.save(&doc)
    }

    /// Drop a chapter's progress entry, if any.
    pub fn remove(&self, id: &str) -> Result<(), CommonError> {
        let mut doc = self.load();
        doc.completed_chapters.remove(id);
        self.save(&doc)
    }

    /// Clear all completions, preserving every other field.
    pub fn clear_completed(&self) -> Result<(), CommonError> {
        let mut doc = self.load();
        doc.completed_chapters.clear();
        self.save(&doc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(dir: &tempfile::TempDir) -> ProgressStore {
        ProgressStore::new(dir.path().join("progress.json"))
    }

    #[test]
    fn missing_file_loads_as_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let doc = store(&dir).load();
        assert!(doc.completed_chapters.is_empty());
        assert!(doc.favorites.is_empty());
    }

    #[test]
    fn mark_completed_is_idempotent() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = store(&dir);
        store.mark_completed("sdxl/txt2img").expect("mark");
        let once = store.load();
        store.mark_completed("sdxl/txt2img").expect("mark again");
        let twice = store.load();
        assert_eq!(once.completed_chapters, twice.completed_chapters);
        assert!(store.is_completed("sdxl/txt2img"));
    }

    #[test]
    fn save_load_round_trip_preserves_semantics() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = store(&dir);
        store.mark_completed("chapter1_intro").expect("mark");
        store.mark_completed("flux/inpaint").expect("mark");
        let doc = store.load();
        store.save(&doc).expect("save");
        assert_eq!(store.load().completed_chapters, doc.completed_chapters);
    }

    #[test]
    fn malformed_file_degrades_to_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = store(&dir);
        std::fs::write(dir.path().join("progress.json"), b"{broken").expect("write");
        assert!(store.load().completed_chapters.is_empty());
    }

    #[test]
    fn wrong_typed_completed_chapters_reads_as_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = store(&dir);
        std::fs::write(
            dir.path().join("progress.json"),
            br#"{"completed_chapters": ["not", "a", "map"]}"#,
        )
        .expect("write");
        assert!(store.load().completed_chapters.is_empty());
    }

    #[test]
    fn unknown_keys_and_favorites_survive_rewrites() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = store(&dir);
        std::fs::write(
            dir.path().join("progress.json"),
            br#"{"completed_chapters": {}, "favorites": ["flux/inpaint"], "theme": "dark"}"#,
        )
        .expect("write");
        store.mark_completed("chapter1").expect("mark");
        let text = std::fs::read_to_string(dir.path().join("progress.json")).expect("read");
        let doc: Value = serde_json::from_str(&text).expect("parse");
        assert_eq!(doc["favorites"][0], "flux/inpaint");
        assert_eq!(doc["theme"], "dark");
        assert_eq!(doc["completed_chapters"]["chapter1"], true);
    }

    #[test]
    fn clear_completed_preserves_favorites() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = store(&dir);
        std::fs::write(
            dir.path().join("progress.json"),
            br#"{"completed_chapters": {"a": true}, "favorites": [1]}"#,
        )
        .expect("write");
        store.clear_completed().expect("clear");
        let doc = store.load();
        assert!(doc.completed_chapters.is_empty());
        assert_eq!(doc.favorites.len(), 1);
    }

    #[test]
    fn ensure_initialized_creates_and_repairs() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = store(&dir);
        store.ensure_initialized().expect("init");
        assert!(dir.path().join("progress.json").exists());

        std::fs::write(dir.path().join("progress.json"), b"garbage").expect("write");
        store.ensure_initialized().expect("repair");
        assert!(store.load().completed_chapters.is_empty());
        let text = std::fs::read_to_string(dir.path().join("progress.json")).expect("read");
        assert!(serde_json::from_str::<Value>(&text).is_ok());
    }
}

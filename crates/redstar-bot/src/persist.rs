//! Document persistence.
//!
//! The bot persists three JSON documents:
//!
//! - [`Document::Config`]: groups and WhiteStar events
//! - [`Document::Players`]: the player snapshot
//! - [`Document::Weights`]: scoring tables, read only
//!
//! A [`Store`] loads and saves whole documents. A document that was never
//! saved loads as `None`.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use serde_json::Value;

use crate::error::StoreError;

/// A persisted document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Document {
    /// Groups and WhiteStar events.
    Config,
    /// Player snapshot.
    Players,
    /// Weight tables.
    Weights,
}

impl Document {
    /// File name used by [`FileStore`].
    #[must_use]
    pub const fn file_name(self) -> &'static str {
        match self {
            Self::Config => "config.json",
            Self::Players => "persdata.json",
            Self::Weights => "weights.json",
        }
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Config => "config",
            Self::Players => "players",
            Self::Weights => "weights",
        })
    }
}

/// Load/save of whole documents.
pub trait Store {
    /// Loads a document; `None` when it does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the document exists but cannot be read.
    fn load(&self, document: Document) -> Result<Option<Value>, StoreError>;

    /// Saves a document, replacing any previous version.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the document cannot be written.
    fn save(&self, document: Document, value: &Value) -> Result<(), StoreError>;
}

// =============================================================================
// FileStore
// =============================================================================

/// One JSON file per document in a directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Stores documents under `dir`, creating it on first save.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory holding the documents.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, document: Document) -> PathBuf {
        self.dir.join(document.file_name())
    }
}

impl Store for FileStore {
    fn load(&self, document: Document) -> Result<Option<Value>, StoreError> {
        let text = match fs::read_to_string(self.path(document)) {
            Ok(text) => text,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(StoreError::Io { document, source }),
        };
        serde_json::from_str(&text)
            .map(Some)
            .map_err(|source| StoreError::Json { document, source })
    }

    fn save(&self, document: Document, value: &Value) -> Result<(), StoreError> {
        let io = |source| StoreError::Io { document, source };
        fs::create_dir_all(&self.dir).map_err(io)?;

        let text = serde_json::to_string(value)
            .map_err(|source| StoreError::Json { document, source })?;

        // Write next to the target, then rename over it
        let target = self.path(document);
        let staging = target.with_extension("json.tmp");
        fs::write(&staging, text).map_err(io)?;
        fs::rename(&staging, &target).map_err(io)?;

        tracing::debug!(%document, path = %target.display(), "document saved");
        Ok(())
    }
}

// =============================================================================
// MemoryStore
// =============================================================================

/// Documents held in memory. Clones share the same documents.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    documents: Rc<RefCell<HashMap<Document, Value>>>,
    saves: Rc<RefCell<Vec<Document>>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a document.
    #[must_use]
    pub fn with(self, document: Document, value: Value) -> Self {
        self.documents.borrow_mut().insert(document, value);
        self
    }

    /// Current content of a document.
    #[must_use]
    pub fn get(&self, document: Document) -> Option<Value> {
        self.documents.borrow().get(&document).cloned()
    }

    /// Every save so far, in order.
    #[must_use]
    pub fn saves(&self) -> Vec<Document> {
        self.saves.borrow().clone()
    }
}

impl Store for MemoryStore {
    fn load(&self, document: Document) -> Result<Option<Value>, StoreError> {
        Ok(self.get(document))
    }

    fn save(&self, document: Document, value: &Value) -> Result<(), StoreError> {
        self.documents.borrow_mut().insert(document, value.clone());
        self.saves.borrow_mut().push(document);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_file_store_round_trip() {
        let dir = std::env::temp_dir().join(format!("redstar-store-{}", std::process::id()));
        let store = FileStore::new(&dir);
        assert!(store.load(Document::Players).unwrap().is_none());

        store
            .save(Document::Players, &json!({"tech_keys": [], "players": {}}))
            .unwrap();
        let loaded = store.load(Document::Players).unwrap().unwrap();
        assert_eq!(loaded["players"], json!({}));
        assert!(dir.join("persdata.json").exists());

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_file_store_rejects_garbage() {
        let dir = std::env::temp_dir().join(format!("redstar-garbage-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("config.json"), "{not json").unwrap();

        let store = FileStore::new(&dir);
        assert!(matches!(
            store.load(Document::Config),
            Err(StoreError::Json { document: Document::Config, .. })
        ));

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_memory_store_shares_between_clones() {
        let store = MemoryStore::new();
        let shared = store.clone();
        store.save(Document::Config, &json!({"groups": {}})).unwrap();
        assert_eq!(shared.get(Document::Config), Some(json!({"groups": {}})));
        assert_eq!(shared.saves(), vec![Document::Config]);
    }
}

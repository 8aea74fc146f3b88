//! Key-value persistence backends for the registry.
//!
//! The engine only needs whole-value semantics from its backing store:
//! `get_item` returns the last fully-written value for a key, `set_item`
//! replaces it atomically. Values are plain serializable data
//! ([`serde_json::Value`]) with no live handles.
//!
//! Two backends:
//! - [`InMemoryKvStore`] for tests and ephemeral profiles.
//! - [`JsonFileKvStore`]: all keys in a single JSON file, rewritten whole
//!   on every store. A reader never observes a partial write (the file is
//!   replaced via temp-file + rename), and a corrupt or unreadable file
//!   degrades to "no data" with a warning instead of failing the process.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, RwLock};

use serde_json::Value;

/// A handle to a type-erased key-value store.
pub type KvStoreHandle = Arc<dyn KvStore + Send + Sync>;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store i/o failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("store value could not be serialized: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Whole-value key-value store.
///
/// Implementations must be `Send + Sync` and internally synchronized.
#[async_trait::async_trait]
pub trait KvStore: Send + Sync {
    /// Last fully-stored value for `key`, or `None` when absent or
    /// unreadable.
    async fn get_item(&self, key: &str) -> Option<Value>;

    /// Replaces the value for `key`. Write-whole-value semantics: a
    /// concurrent reader sees either the previous or the new value, never
    /// a mix.
    async fn set_item(&self, key: &str, value: Value) -> Result<(), StoreError>;

    /// Drops `key` entirely. Idempotent.
    async fn remove_item(&self, key: &str) -> Result<(), StoreError>;
}

/// Ephemeral store backed by a hash map.
#[derive(Debug, Default)]
pub struct InMemoryKvStore {
    items: RwLock<HashMap<String, Value>>,
}

impl InMemoryKvStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

#[async_trait::async_trait]
impl KvStore for InMemoryKvStore {
    async fn get_item(&self, key: &str) -> Option<Value> {
        self.items.read().expect("kv lock poisoned").get(key).cloned()
    }

    async fn set_item(&self, key: &str, value: Value) -> Result<(), StoreError> {
        self.items
            .write()
            .expect("kv lock poisoned")
            .insert(key.to_string(), value);
        Ok(())
    }

    async fn remove_item(&self, key: &str) -> Result<(), StoreError> {
        self.items.write().expect("kv lock poisoned").remove(key);
        Ok(())
    }
}

/// File-backed store: one JSON object holding every key.
pub struct JsonFileKvStore {
    path: PathBuf,
    /// Serializes read-modify-write cycles; all I/O under it is sync.
    io: Mutex<()>,
}

impl JsonFileKvStore {
    pub fn new(path: PathBuf) -> Arc<Self> {
        Arc::new(Self {
            path,
            io: Mutex::new(()),
        })
    }

    /// Loads the whole file. Missing, unreadable, or corrupt files all
    /// degrade to an empty map so the process can rebuild incrementally.
    fn load_map(&self) -> HashMap<String, Value> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return HashMap::new(),
            Err(err) => {
                log::warn!("could not read {}: {err}", self.path.display());
                return HashMap::new();
            }
        };
        serde_json::from_str(&contents).unwrap_or_else(|err| {
            log::warn!("discarding corrupt store file {}: {err}", self.path.display());
            HashMap::new()
        })
    }

    /// Rewrites the whole file through a sibling temp file + rename, so a
    /// crashed write never leaves a truncated file behind.
    fn save_map(&self, map: &HashMap<String, Value>) -> Result<(), StoreError> {
        let contents = serde_json::to_string_pretty(map)?;
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, contents)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl KvStore for JsonFileKvStore {
    async fn get_item(&self, key: &str) -> Option<Value> {
        let _guard = self.io.lock().expect("io lock poisoned");
        self.load_map().remove(key)
    }

    async fn set_item(&self, key: &str, value: Value) -> Result<(), StoreError> {
        let _guard = self.io.lock().expect("io lock poisoned");
        let mut map = self.load_map();
        map.insert(key.to_string(), value);
        self.save_map(&map)
    }

    async fn remove_item(&self, key: &str) -> Result<(), StoreError> {
        let _guard = self.io.lock().expect("io lock poisoned");
        let mut map = self.load_map();
        if map.remove(key).is_some() {
            self.save_map(&map)?;
        }
        Ok(())
    }
}

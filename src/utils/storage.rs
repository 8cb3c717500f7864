//! Storage - Key-Value Persistence
//!
//! A small synchronous key-value abstraction for UI state that must survive
//! restarts (e.g. the selected crop). Callers treat every operation as
//! best-effort.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use ahash::AHashMap;
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tracing::warn;

use crate::error::Result;
use crate::helpers::get_or_create_data_dir;

/// Name of the persisted state file
pub const STATE_FILE_NAME: &str = "state.json";

/// Opaque string key-value store
pub trait KeyValueStore: Send + Sync {
    /// Read a value, `None` when absent or unreadable
    fn get(&self, key: &str) -> Option<String>;

    /// Write a value
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Delete a value
    fn remove(&self, key: &str) -> Result<()>;
}

/// In-memory store, used in tests and when no data directory is available
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<AHashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with one value
    pub fn with_value(key: &str, value: &str) -> Self {
        let store = Self::new();
        store.values.lock().insert(key.to_string(), value.to_string());
        store
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.values.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.values.lock().remove(key);
        Ok(())
    }
}

/// Store backed by a single JSON object file, written through on every change
///
/// Inside a tokio runtime the file is written on the blocking pool so callers
/// on async tasks never wait for disk I/O. Each write serializes the latest
/// values, so the file always ends up holding the last change. Outside a
/// runtime the write happens inline and its error is returned.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    inner: Arc<FileInner>,
}

#[derive(Debug)]
struct FileInner {
    path: PathBuf,
    values: Mutex<AHashMap<String, String>>,
    /// Serializes writers so an older snapshot never lands after a newer one
    write_lock: Mutex<()>,
}

impl FileInner {
    fn write(&self) -> Result<()> {
        let _writer = self.write_lock.lock();
        let content = serde_json::to_string_pretty(&*self.values.lock())?;
        fs::write(&self.path, content)?;
        Ok(())
    }
}

impl JsonFileStore {
    /// Open the store in the platform data directory
    pub fn open_default() -> Result<Self> {
        Ok(Self::open(get_or_create_data_dir()?.join(STATE_FILE_NAME)))
    }

    /// Open the store at `path`
    ///
    /// A missing or corrupt file starts an empty store; it is rewritten on the
    /// next change.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let values = match Self::read_file(&path) {
            Ok(values) => values,
            Err(e) => {
                warn!(error = %e, path = ?path, "Ignoring unreadable state file");
                AHashMap::new()
            }
        };
        Self {
            inner: Arc::new(FileInner {
                path,
                values: Mutex::new(values),
                write_lock: Mutex::new(()),
            }),
        }
    }

    fn read_file(path: &Path) -> Result<AHashMap<String, String>> {
        if !path.exists() {
            return Ok(AHashMap::new());
        }
        let content = fs::read_to_string(path)?;
        if content.trim().is_empty() {
            return Ok(AHashMap::new());
        }
        Ok(serde_json::from_str(&content)?)
    }

    fn flush(&self) -> Result<()> {
        let Ok(handle) = Handle::try_current() else {
            return self.inner.write();
        };

        let inner = self.inner.clone();
        handle.spawn_blocking(move || {
            if let Err(e) = inner.write() {
                warn!(error = %e, path = ?inner.path, "Failed to write state file");
            }
        });
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.inner.path
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.inner.values.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.inner
            .values
            .lock()
            .insert(key.to_string(), value.to_string());
        self.flush()
    }

    fn remove(&self, key: &str) -> Result<()> {
        let removed = self.inner.values.lock().remove(key).is_some();
        if removed {
            self.flush()?;
        }
        Ok(())
    }
}

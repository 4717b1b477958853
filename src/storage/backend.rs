use crate::error::StorageError;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Capability to read and write raw string values by key in a durable,
/// synchronous, same-device store.
///
/// Implementations are injected into [`Storage`]; the reactive layer never
/// reaches for ambient persistence on its own.
pub trait StorageBackend: Send + Sync {
    /// Read the raw value under `key`, `None` if absent.
    fn read(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Write the raw value under `key`, replacing any previous value.
    fn write(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove the value under `key`. Removing an absent key is not an error.
    fn delete(&self, key: &str) -> Result<(), StorageError>;
}

/// Namespaced façade over a [`StorageBackend`].
///
/// Every persisted key is stored as `{namespace}:{logicalKey}` so unrelated
/// consumers of the same backend cannot collide. The façade is cheap to
/// clone; clones share the backend.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use wirestore::{MemoryBackend, Storage};
///
/// let storage = Storage::new(Arc::new(MemoryBackend::new()), "tracker");
/// storage.write("teams", "[]").unwrap();
/// assert_eq!(storage.read("teams").unwrap().as_deref(), Some("[]"));
/// ```
#[derive(Clone)]
pub struct Storage {
    backend: Arc<dyn StorageBackend>,
    namespace: String,
}

impl Storage {
    /// Wrap a backend with the process-wide namespace prefix.
    pub fn new(backend: Arc<dyn StorageBackend>, namespace: impl Into<String>) -> Self {
        Self {
            backend,
            namespace: namespace.into(),
        }
    }

    /// The namespace applied to every key.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Read the value stored under `{namespace}:{logical_key}`.
    pub fn read(&self, logical_key: &str) -> Result<Option<String>, StorageError> {
        self.backend.read(&self.storage_key(logical_key))
    }

    /// Write a value under `{namespace}:{logical_key}`.
    pub fn write(&self, logical_key: &str, value: &str) -> Result<(), StorageError> {
        self.backend.write(&self.storage_key(logical_key), value)
    }

    /// Delete the value under `{namespace}:{logical_key}`.
    pub fn delete(&self, logical_key: &str) -> Result<(), StorageError> {
        self.backend.delete(&self.storage_key(logical_key))
    }

    fn storage_key(&self, logical_key: &str) -> String {
        format!("{}:{}", self.namespace, logical_key)
    }
}

/// In-memory backend. Never fails; the test and ephemeral-session substitute.
#[derive(Default)]
pub struct MemoryBackend {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StorageBackend for MemoryBackend {
    fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.lock().unwrap().get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.entries.lock().unwrap().remove(key);
        Ok(())
    }
}

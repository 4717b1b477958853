use crate::runtime::Runtime;
use crate::storage::Storage;
use crate::wire::Wire;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;

/// Create a wire whose value is mirrored to the storage backend.
///
/// Construction reads `{namespace}:{logical_key}` from the backend: a present,
/// valid JSON value initializes the wire; anything else (absent key, read
/// failure, text that does not parse as `T`) falls back to `default` without
/// writing it back — absence stays absence until an explicit `set`.
///
/// Every subsequent write behaves as an ordinary wire write and additionally
/// serializes the value through the backend. Persistence failures are logged
/// and never surfaced: the in-memory value and subscriber notification always
/// win.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use wirestore::{create_persisted_wire, MemoryBackend, Runtime, Storage};
///
/// let rt = Runtime::new();
/// let storage = Storage::new(Arc::new(MemoryBackend::new()), "tracker");
///
/// let lanes = create_persisted_wire(&rt, &storage, "collapsedLanes", Vec::<String>::new());
/// lanes.set(vec!["lane-1".to_string()]);
///
/// // A fresh wire over the same backend sees the persisted value.
/// let restored = create_persisted_wire(&rt, &storage, "collapsedLanes", Vec::<String>::new());
/// assert_eq!(restored.get(), vec!["lane-1".to_string()]);
/// ```
pub fn create_persisted_wire<T>(
    runtime: &Arc<Runtime>,
    storage: &Storage,
    logical_key: &str,
    default: T,
) -> Wire<T>
where
    T: Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
{
    let initial = match storage.read(logical_key) {
        Ok(Some(raw)) => match serde_json::from_str(&raw) {
            Ok(value) => value,
            Err(err) => {
                log::warn!("stored value for `{logical_key}` does not parse, using default: {err}");
                default
            }
        },
        Ok(None) => default,
        Err(err) => {
            log::warn!("storage read for `{logical_key}` failed, using default: {err}");
            default
        }
    };

    let storage = storage.clone();
    let key = logical_key.to_string();
    let hook = move |value: &T| match serde_json::to_string(value) {
        Ok(raw) => {
            if let Err(err) = storage.write(&key, &raw) {
                log::warn!("storage write for `{key}` failed, keeping in-memory value: {err}");
            }
        }
        Err(err) => {
            log::warn!("value for `{key}` does not serialize, skipping persistence: {err}");
        }
    };

    Wire::with_persist(runtime, initial, Box::new(hook))
}

use crate::error::StoreError;
use crate::wire::Wire;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

/// A registry entry that can accept a JSON payload.
trait HydrationTarget: Send + Sync {
    fn apply(&self, key: &str, payload: Value) -> Result<(), StoreError>;
}

impl<T> HydrationTarget for Wire<T>
where
    T: Clone + DeserializeOwned + Send + Sync + 'static,
{
    fn apply(&self, key: &str, payload: Value) -> Result<(), StoreError> {
        let value: T =
            serde_json::from_value(payload).map_err(|source| StoreError::HydrationPayload {
                key: key.to_string(),
                source,
            })?;
        self.set(value);
        Ok(())
    }
}

struct RegistryEntry {
    target: Box<dyn HydrationTarget>,
    hydrated: AtomicBool,
}

/// Builder collecting the explicit `(logical key, wire)` list.
///
/// Registration happens once at process start; [`build`](RegistryBuilder::build)
/// freezes membership.
#[derive(Default)]
pub struct RegistryBuilder {
    entries: BTreeMap<String, RegistryEntry>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a wire under a logical key. Registering the same key twice
    /// replaces the earlier entry.
    pub fn register<T>(mut self, key: impl Into<String>, wire: Wire<T>) -> Self
    where
        T: Clone + DeserializeOwned + Send + Sync + 'static,
    {
        self.entries.insert(
            key.into(),
            RegistryEntry {
                target: Box::new(wire),
                hydrated: AtomicBool::new(false),
            },
        );
        self
    }

    /// Freeze membership into a [`StoreRegistry`].
    pub fn build(self) -> StoreRegistry {
        StoreRegistry {
            entries: self.entries,
        }
    }
}

/// The process-wide table mapping logical names to wires, plus the hydration
/// bridge that writes externally fetched payloads into them.
///
/// Built once from an enumerated list — lookups never discover entries
/// reflectively, so an unknown key is a programming error surfaced as
/// [`StoreError::UnknownStoreKey`].
///
/// # Examples
///
/// ```
/// use serde_json::json;
/// use wirestore::{Runtime, StoreRegistry, Wire};
///
/// let rt = Runtime::new();
/// let teams: Wire<Vec<String>> = Wire::new(&rt, Vec::new());
///
/// let registry = StoreRegistry::builder()
///     .register("teams", teams.clone())
///     .build();
///
/// registry.hydrate("teams", json!(["t1"]), false).unwrap();
/// assert_eq!(teams.get(), vec!["t1".to_string()]);
/// ```
pub struct StoreRegistry {
    entries: BTreeMap<String, RegistryEntry>,
}

impl StoreRegistry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// Write an externally supplied payload into the wire registered under
    /// `key`, triggering a normal notification pass.
    ///
    /// A falsy payload (`null`, `false`, `0`, `""` — empty arrays and objects
    /// are truthy) is a guarded no-op unless `allow_falsy` is set: the wire
    /// keeps its current value and the call succeeds. Repeated calls with the
    /// same payload are idempotent on the stored value but still re-notify
    /// subscribers each time.
    pub fn hydrate(&self, key: &str, payload: Value, allow_falsy: bool) -> Result<(), StoreError> {
        let entry = self
            .entries
            .get(key)
            .ok_or_else(|| StoreError::UnknownStoreKey {
                key: key.to_string(),
            })?;

        if !allow_falsy && is_falsy(&payload) {
            log::debug!("skipping falsy hydration payload for `{key}`");
            return Ok(());
        }

        entry.target.apply(key, payload)?;
        entry.hydrated.store(true, Ordering::SeqCst);
        Ok(())
    }

    /// The enumerated logical keys, in deterministic order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Whether the entry has accepted at least one non-guarded hydration.
    /// There is no way back to the unset state.
    pub fn is_hydrated(&self, key: &str) -> bool {
        self.entries
            .get(key)
            .map(|entry| entry.hydrated.load(Ordering::SeqCst))
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// JS falsy convention for JSON payloads.
fn is_falsy(payload: &Value) -> bool {
    match payload {
        Value::Null => true,
        Value::Bool(b) => !*b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(_) | Value::Object(_) => false,
    }
}

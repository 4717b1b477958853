//! Error types for the reactive store and its storage backends.
//!
//! Failures split into two families: `StoreError` covers the reactive layer
//! (selector cycles, hydration against the registry) and `StorageError` covers
//! the durable key/value backend. Persistence failures on the wire write path
//! are logged and swallowed by design, so `StorageError` only surfaces through
//! the `StorageBackend` trait itself.

use thiserror::Error;

/// Errors raised by selectors and the store registry.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StoreError {
    /// A selector's evaluation re-entered itself, directly or through a chain
    /// of other selectors.
    #[error("selector dependency cycle detected during evaluation")]
    CyclicDependency,

    /// `hydrate` targeted a logical key that was never registered. This is a
    /// programming error, not a runtime condition.
    #[error("no store entry registered under key `{key}`")]
    UnknownStoreKey { key: String },

    /// A hydration payload did not deserialize into the registered wire's
    /// value type. The entry keeps its current value.
    #[error("hydration payload for `{key}` does not fit the registered wire type")]
    HydrationPayload {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Errors raised by a [`StorageBackend`](crate::storage::StorageBackend).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// The backend refused the operation (quota, closed handle, etc.).
    #[error("storage backend unavailable: {0}")]
    Unavailable(String),
}

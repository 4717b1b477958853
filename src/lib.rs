//! # Wirestore
//!
//! A reactive client-side store for Rust: observable value cells, memoized
//! derived values, local persistence and render-time hydration.
//!
//! Wirestore provides two levels of abstraction:
//!
//! ## Wires and selectors (low-level primitives)
//!
//! - `Wire<T>` - observable mutable cells that notify subscribers on every write
//! - `Selector<T>` - derived values that automatically track their dependencies
//!   and recompute only when a dependency's revision moves
//! - `create_persisted_wire` - wires mirrored to a durable key/value backend
//!
//! ## Store registry (high-level state management)
//!
//! - `StoreRegistry` - a fixed, enumerated table of named wires
//! - `hydrate` - the bridge writing server-fetched payloads into named wires,
//!   guarded against accidental falsy overwrites
//!
//! Everything runs synchronously within a single logical turn: a `set` call
//! stores the value, bumps the wire's revision and notifies every subscriber
//! before it returns. There is no batching and no multi-wire transaction;
//! callers needing atomicity across cells model the pair as one wire holding
//! a composite value.

pub mod error;
pub mod runtime;
pub mod storage;
pub mod store;
pub mod wire;

// Re-export main types for convenience
pub use error::{StorageError, StoreError};
pub use runtime::Runtime;
pub use storage::{FileBackend, MemoryBackend, Storage, StorageBackend};
pub use store::{RegistryBuilder, StoreRegistry};
pub use wire::{
    create_persisted_wire, create_selector, create_wire, Scope, Selector, Source, Subscription,
    Wire,
};

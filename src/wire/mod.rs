//! Reactive value cells.
//!
//! This module provides the core building blocks of the store:
//! - Wires: observable mutable cells with ordered subscriber notification
//! - Selectors: memoized derived values with automatic dependency tracking
//! - Persisted wires: wires mirrored to a durable storage backend

mod persisted;
mod selector;
mod wire;

pub use persisted::create_persisted_wire;
pub use selector::{create_selector, Scope, Selector, Source};
pub use wire::{create_wire, Subscription, Wire};

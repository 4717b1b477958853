//! The named store registry and its hydration bridge.
//!
//! A registry maps a fixed, enumerated set of logical keys to wires.
//! Membership is frozen at build time; only values change afterwards.
//! Externally fetched payloads land in the registry through `hydrate`.

mod registry;

pub use registry::{RegistryBuilder, StoreRegistry};

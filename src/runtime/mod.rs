//! Runtime support for reactive cells.
//!
//! This module provides the shared context wires and selectors are created
//! from: id allocation, the evaluation stack used for dependency tracking,
//! and cycle detection.

mod context;

pub use context::Runtime;
pub(crate) use context::{CycleDetected, Dependency, Revalidate};

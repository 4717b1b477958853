//! Durable key/value storage.
//!
//! Persistence is an injected capability: persisted wires talk to a
//! [`Storage`] façade, which applies the process-wide namespace and forwards
//! to whichever [`StorageBackend`] was supplied. [`MemoryBackend`] is the
//! in-process substitute; [`FileBackend`] keeps one file per key.

mod backend;
mod file;

pub use backend::{MemoryBackend, Storage, StorageBackend};
pub use file::FileBackend;

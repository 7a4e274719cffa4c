//! Shared store adapters.
//!
//! The registry only needs whole-value `get`/`set` on string keys plus a
//! notification stream of changes made by *other* processes. There is no
//! compare-and-swap: concurrent read-modify-write cycles race and the last
//! writer wins.

pub mod errors;
pub mod file;
pub mod memory;
pub mod types;

pub use errors::StoreError;
pub use file::FileStore;
pub use memory::{MemoryBroker, MemoryStore};
pub use types::{StoreChange, Subscription};

/// Synchronous key/value access to local storage.
///
/// Implementations must not perform network I/O: every call runs on the
/// host's frame loop.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// A key/value store visible to every process of the same origin.
pub trait SharedStore: KeyValueStore {
    /// Subscribe to changes written by other processes.
    ///
    /// Writes made through this handle are never delivered to it.
    fn subscribe(&self) -> Result<Subscription, StoreError>;

    /// Remove every key.
    fn clear(&self) -> Result<(), StoreError>;
}

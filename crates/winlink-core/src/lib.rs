//! winlink-core: shared registry of cooperating windows
//!
//! Several independent processes on one machine (browser tabs, native
//! windows) each register a record of their position and size in a shared
//! key/value store and keep an eventually-consistent list of all live
//! windows, so a scene can be drawn as if it spanned every window.
//!
//! # Main Entry Points
//!
//! - [`manager`] - [`WindowManager`], [`connect`] and the [`WindowSync`] contract
//! - [`store`] - Shared store adapters (in-memory broker, file-backed)
//! - [`registry`] - Snapshot read/modify/write and self-healing
//! - [`config`] - Configuration management

pub mod bridge;
pub mod config;
pub mod errors;
pub mod events;
pub mod identity;
pub mod logging;
pub mod manager;
pub mod poller;
pub mod registry;
pub mod store;
pub mod windows;

// Re-export commonly used types at crate root for convenience
pub use bridge::TerminationSignal;
pub use config::WinlinkConfig;
pub use errors::{ConfigError, WinlinkError};
pub use manager::{
    LifecycleState, ShapeChangeCallback, StubWindows, SyncError, SyncOptions, WindowManager,
    WindowSync, WindowsChangeCallback, connect,
};
pub use poller::{GeometrySource, StaticGeometry};
pub use registry::{DEFAULT_WINDOWS_KEY, Registry, RegistryError};
pub use store::{FileStore, KeyValueStore, MemoryBroker, MemoryStore, SharedStore, StoreError};
pub use windows::{Metadata, Snapshot, WindowId, WindowRecord, WindowShape};

// Re-export logging initialization
pub use logging::init_logging;

//! The window registry.
//!
//! Owns this process's cached view of the shared snapshot and its own
//! record. Every mutation reads or rewrites the whole snapshot under one
//! key; there is no locking across the read and the write, so concurrent
//! writers can clobber each other. Re-asserting the local record on the
//! next cycle is what brings the snapshot back in line.
//!
//! Two processes can end up holding the same id. Each then sees the other's
//! record under its own id, so re-assertion backs off after one rewrite
//! until the local record is seen intact again or changes locally.

pub mod errors;

pub use errors::RegistryError;

use tracing::{debug, info, warn};

use crate::store::SharedStore;
use crate::windows::{Metadata, Snapshot, WindowId, WindowRecord, WindowShape};

/// Well-known key holding the serialized snapshot.
pub const DEFAULT_WINDOWS_KEY: &str = "windows";

pub struct Registry {
    store: Box<dyn SharedStore>,
    key: String,
    local: Option<WindowRecord>,
    cached: Snapshot,
    /// Set after rewriting a local record that another writer had replaced.
    contested: bool,
}

impl Registry {
    pub fn new(store: Box<dyn SharedStore>, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
            local: None,
            cached: Snapshot::default(),
            contested: false,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn store(&self) -> &dyn SharedStore {
        self.store.as_ref()
    }

    /// Read and parse the snapshot currently in the store.
    pub fn read_snapshot(&self) -> Result<Snapshot, RegistryError> {
        let raw = self.store.get(&self.key)?;
        Ok(Snapshot::parse(raw.as_deref()))
    }

    /// Upsert `record` as this process's window and write the snapshot back.
    ///
    /// Rewriting an identical record leaves the store untouched.
    pub fn register(&mut self, record: WindowRecord) -> Result<&[WindowRecord], RegistryError> {
        let mut snapshot = self.read_snapshot()?;
        let window_id = record.id;
        let changed = snapshot.upsert(record.clone());
        self.local = Some(record);

        if changed {
            self.persist(snapshot)?;
        } else {
            self.cached = snapshot;
        }

        info!(
            event = "core.registry.register_completed",
            window_id = window_id,
            windows = self.cached.len(),
            written = changed
        );
        Ok(self.cached.records())
    }

    /// Replace the cached view with the store's current snapshot.
    pub fn refresh(&mut self) -> Result<&[WindowRecord], RegistryError> {
        self.cached = self.read_snapshot()?;
        if self.is_local_current() {
            self.contested = false;
        }
        debug!(
            event = "core.registry.refresh_completed",
            windows = self.cached.len()
        );
        Ok(self.cached.records())
    }

    /// Record a new local shape in the cached view and persist the full snapshot.
    pub fn set_local_shape(&mut self, shape: WindowShape) -> Result<(), RegistryError> {
        let local = self.local.as_mut().ok_or(RegistryError::NotRegistered)?;
        local.shape = shape;
        let record = local.clone();

        let mut snapshot = self.cached.clone();
        let same_metadata = snapshot
            .get(record.id)
            .is_some_and(|current| current.metadata == record.metadata);
        if same_metadata {
            snapshot.set_shape(record.id, shape);
        } else {
            snapshot.upsert(record);
        }
        self.persist(snapshot)?;
        self.contested = false;

        debug!(
            event = "core.registry.shape_persisted",
            window_id = self.local_id(),
            shape = %shape
        );
        Ok(())
    }

    /// Replace the local metadata in the cached view and persist the full snapshot.
    pub fn set_local_metadata(&mut self, metadata: Metadata) -> Result<(), RegistryError> {
        let local = self.local.as_mut().ok_or(RegistryError::NotRegistered)?;
        local.metadata = metadata;
        let record = local.clone();

        let mut snapshot = self.cached.clone();
        snapshot.upsert(record);
        self.persist(snapshot)?;
        self.contested = false;
        Ok(())
    }

    /// Remove the local record from the store.
    ///
    /// Returns whether a record was found and removed.
    pub fn unregister(&mut self) -> Result<bool, RegistryError> {
        let Some(local) = self.local.take() else {
            return Ok(false);
        };

        let mut snapshot = self.read_snapshot()?;
        let removed = snapshot.remove(local.id);
        if removed {
            self.persist(snapshot)?;
        } else {
            warn!(
                event = "core.registry.unregister_missing",
                window_id = local.id,
                "Local record was already gone from the snapshot"
            );
            self.cached = snapshot;
        }

        info!(
            event = "core.registry.unregister_completed",
            window_id = local.id,
            removed = removed
        );
        Ok(removed)
    }

    /// Whether the cached view holds the local record exactly as this process knows it.
    pub fn is_local_current(&self) -> bool {
        match &self.local {
            Some(local) => self.cached.get(local.id) == Some(local),
            None => true,
        }
    }

    /// Write the local record back if the cached view lost or altered it.
    ///
    /// A missing record is always restored. An altered one is rewritten once;
    /// if it is replaced again before this process sees it intact, the id is
    /// treated as contested and left alone.
    ///
    /// Returns whether a write happened.
    pub fn reassert(&mut self) -> Result<bool, RegistryError> {
        let Some(local) = self.local.clone() else {
            return Ok(false);
        };

        match self.cached.get(local.id) {
            Some(current) if *current == local => {
                self.contested = false;
                return Ok(false);
            }
            Some(_) if self.contested => {
                debug!(
                    event = "core.registry.reassert_skipped",
                    window_id = local.id,
                    "Another window keeps writing under this id"
                );
                return Ok(false);
            }
            Some(_) => self.contested = true,
            None => {}
        }

        let mut snapshot = self.cached.clone();
        snapshot.upsert(local.clone());
        self.persist(snapshot)?;

        info!(
            event = "core.registry.reassert_completed",
            window_id = local.id,
            contested = self.contested
        );
        Ok(true)
    }

    /// Most recently refreshed list of windows.
    pub fn windows(&self) -> &[WindowRecord] {
        self.cached.records()
    }

    pub fn local(&self) -> Option<&WindowRecord> {
        self.local.as_ref()
    }

    pub fn local_id(&self) -> Option<WindowId> {
        self.local.as_ref().map(|r| r.id)
    }

    fn persist(&mut self, snapshot: Snapshot) -> Result<(), RegistryError> {
        let json = snapshot.to_json()?;
        self.store.set(&self.key, &json)?;
        self.cached = snapshot;
        Ok(())
    }
}

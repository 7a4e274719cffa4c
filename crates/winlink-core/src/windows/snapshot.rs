//! Parsed contents of the shared windows key.
//!
//! The snapshot is always read and written as a whole. Order is join order:
//! new records are appended, updated records keep their position.

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::types::{WindowId, WindowRecord, WindowShape};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot {
    records: Vec<WindowRecord>,
}

impl Snapshot {
    pub fn new(records: Vec<WindowRecord>) -> Self {
        Self { records }
    }

    /// Parse raw store content.
    ///
    /// A missing, empty or malformed value is an empty snapshot; the next
    /// local write repopulates the key.
    pub fn parse(raw: Option<&str>) -> Self {
        let Some(raw) = raw.filter(|r| !r.trim().is_empty()) else {
            return Self::default();
        };

        match serde_json::from_str::<Snapshot>(raw) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(
                    event = "core.snapshot.parse_failed",
                    error = %e,
                    bytes = raw.len(),
                    "Treating malformed snapshot as empty"
                );
                Self::default()
            }
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn records(&self) -> &[WindowRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, id: WindowId) -> Option<&WindowRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    pub fn ids(&self) -> Vec<WindowId> {
        self.records.iter().map(|r| r.id).collect()
    }

    /// Id for a window joining now: one past the current maximum, or 0.
    pub fn next_id(&self) -> WindowId {
        self.records
            .iter()
            .map(|r| r.id)
            .max()
            .map_or(0, |max| max.saturating_add(1))
    }

    /// Insert or replace the record with `record.id`.
    ///
    /// Returns `true` when the snapshot changed.
    pub fn upsert(&mut self, record: WindowRecord) -> bool {
        match self.records.iter_mut().find(|r| r.id == record.id) {
            Some(existing) if *existing == record => false,
            Some(existing) => {
                *existing = record;
                true
            }
            None => {
                self.records.push(record);
                true
            }
        }
    }

    /// Remove every record carrying `id`.
    ///
    /// A registration race can leave two records with the same id; both go.
    pub fn remove(&mut self, id: WindowId) -> bool {
        let before = self.records.len();
        self.records.retain(|r| r.id != id);
        self.records.len() != before
    }

    /// Update the shape of the record with `id`, if present.
    pub fn set_shape(&mut self, id: WindowId, shape: WindowShape) -> bool {
        match self.records.iter_mut().find(|r| r.id == id) {
            Some(record) if record.shape != shape => {
                record.shape = shape;
                true
            }
            _ => false,
        }
    }
}

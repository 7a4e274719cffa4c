//! Window identity assignment.
//!
//! A process keeps its id in process-local session storage so a reload
//! re-joins under the same id. Fresh processes take one past the highest id
//! in the shared snapshot. Two processes opening at the same moment can read
//! the same snapshot and pick the same id; nothing repairs that.

use tracing::{debug, info, warn};

use crate::store::{KeyValueStore, StoreError};
use crate::windows::{Snapshot, WindowId};

/// Session storage key holding this process's id.
pub const SESSION_ID_KEY: &str = "windowId";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Assignment {
    /// The id was already held by this session.
    Reused(WindowId),
    /// A new id was allocated from the snapshot.
    Fresh(WindowId),
}

impl Assignment {
    pub fn id(&self) -> WindowId {
        match self {
            Assignment::Reused(id) | Assignment::Fresh(id) => *id,
        }
    }

    pub fn is_reused(&self) -> bool {
        matches!(self, Assignment::Reused(_))
    }
}

pub struct IdentityAssigner {
    session: Box<dyn KeyValueStore>,
}

impl IdentityAssigner {
    pub fn new(session: Box<dyn KeyValueStore>) -> Self {
        Self { session }
    }

    /// The id this session already holds, if any.
    pub fn session_id(&self) -> Result<Option<WindowId>, StoreError> {
        let Some(raw) = self.session.get(SESSION_ID_KEY)? else {
            return Ok(None);
        };

        match raw.trim().parse::<WindowId>() {
            Ok(id) => Ok(Some(id)),
            Err(e) => {
                warn!(
                    event = "core.identity.session_id_invalid",
                    raw = %raw,
                    error = %e,
                    "Ignoring unparsable session id"
                );
                Ok(None)
            }
        }
    }

    /// Reuse the session's id, or allocate one from `snapshot` and remember it.
    pub fn resolve(&self, snapshot: &Snapshot) -> Result<Assignment, StoreError> {
        if let Some(id) = self.session_id()? {
            debug!(event = "core.identity.reused", window_id = id);
            return Ok(Assignment::Reused(id));
        }

        let id = snapshot.next_id();
        self.session.set(SESSION_ID_KEY, &id.to_string())?;
        info!(
            event = "core.identity.assigned",
            window_id = id,
            existing_windows = snapshot.len()
        );
        Ok(Assignment::Fresh(id))
    }
}

use serde::{Deserialize, Serialize};

/// Opaque application-supplied key/value data attached to a window.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

pub type WindowId = u32;

/// On-screen rectangle of a window, in screen coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct WindowShape {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl WindowShape {
    pub fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Self { x, y, w, h }
    }
}

impl std::fmt::Display for WindowShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{},{} {}x{}", self.x, self.y, self.w, self.h)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowRecord {
    pub id: WindowId,
    pub shape: WindowShape,
    #[serde(rename = "metaData", alias = "metadata", default)]
    pub metadata: Metadata,
}

impl WindowRecord {
    pub fn new(id: WindowId, shape: WindowShape, metadata: Metadata) -> Self {
        Self {
            id,
            shape,
            metadata,
        }
    }
}

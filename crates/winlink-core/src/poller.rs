//! Per-frame geometry sampling.

use crate::windows::WindowShape;

/// Where the local window currently sits on screen.
///
/// Called once per frame, so implementations must be cheap and must not block.
pub trait GeometrySource {
    fn current_shape(&mut self) -> WindowShape;
}

impl<F> GeometrySource for F
where
    F: FnMut() -> WindowShape,
{
    fn current_shape(&mut self) -> WindowShape {
        self()
    }
}

/// A window that never moves.
#[derive(Debug, Clone, Copy)]
pub struct StaticGeometry(pub WindowShape);

impl GeometrySource for StaticGeometry {
    fn current_shape(&mut self) -> WindowShape {
        self.0
    }
}

/// A detected geometry change that still has to be persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShapeChange {
    pub shape: WindowShape,
    /// `false` for the first change after registration: consumers snap
    /// instead of animating.
    pub easing: bool,
}

/// Tracks the last persisted shape and detects deltas against it.
#[derive(Debug, Clone, Default)]
pub struct ShapePoller {
    last: Option<WindowShape>,
    resolved: bool,
}

impl ShapePoller {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking from the shape written at registration.
    pub fn reset(&mut self, registered: WindowShape) {
        self.last = Some(registered);
        self.resolved = false;
    }

    pub fn last_shape(&self) -> Option<WindowShape> {
        self.last
    }

    /// Compare `current` with the last persisted shape.
    ///
    /// Returns `None` when all four fields are equal.
    pub fn poll(&self, current: WindowShape) -> Option<ShapeChange> {
        if self.last == Some(current) {
            return None;
        }
        Some(ShapeChange {
            shape: current,
            easing: self.resolved,
        })
    }

    /// Mark `change` as persisted.
    pub fn commit(&mut self, change: ShapeChange) {
        self.last = Some(change.shape);
        self.resolved = true;
    }
}

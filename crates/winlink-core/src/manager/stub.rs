//! Single-window stand-in used when the shared store cannot be reached.

use tracing::info;

use crate::bridge::{TerminationSignal, invoke_isolated};
use crate::poller::{GeometrySource, ShapePoller};
use crate::windows::{Metadata, WindowId, WindowRecord};

use super::{ShapeChangeCallback, WindowSync, WindowsChangeCallback};

/// Id the stub reports for its only window.
pub const STUB_WINDOW_ID: WindowId = 0;

/// Behaves like a manager that is alone in the world.
///
/// The window list always holds exactly one record for this process. Its
/// shape still follows the local geometry so consumers keep receiving
/// shape-change callbacks; the windows-change callback never fires.
pub struct StubWindows {
    windows: Vec<WindowRecord>,
    geometry: Box<dyn GeometrySource>,
    poller: ShapePoller,
    termination: Option<TerminationSignal>,
    terminated: bool,
    on_shape_change: Option<ShapeChangeCallback>,
}

impl StubWindows {
    pub fn new(mut geometry: Box<dyn GeometrySource>, metadata: Metadata) -> Self {
        let shape = geometry.current_shape();
        let mut poller = ShapePoller::new();
        poller.reset(shape);

        Self {
            windows: vec![WindowRecord::new(STUB_WINDOW_ID, shape, metadata)],
            geometry,
            poller,
            termination: None,
            terminated: false,
            on_shape_change: None,
        }
    }

    pub fn with_termination(mut self, signal: TerminationSignal) -> Self {
        self.termination = Some(signal);
        self
    }
}

impl WindowSync for StubWindows {
    fn update(&mut self) {
        if self.terminated {
            return;
        }
        if self
            .termination
            .as_ref()
            .is_some_and(TerminationSignal::is_triggered)
        {
            self.shutdown();
            return;
        }

        let current = self.geometry.current_shape();
        let Some(change) = self.poller.poll(current) else {
            return;
        };
        self.poller.commit(change);
        self.windows[0].shape = change.shape;

        if let Some(callback) = self.on_shape_change.as_mut() {
            invoke_isolated("shape_change", || callback(change.easing));
        }
    }

    fn windows(&self) -> &[WindowRecord] {
        &self.windows
    }

    fn set_shape_change_callback(&mut self, callback: ShapeChangeCallback) {
        self.on_shape_change = Some(callback);
    }

    // Membership never changes, so there is nothing to notify.
    fn set_windows_change_callback(&mut self, _callback: WindowsChangeCallback) {}

    fn local_id(&self) -> Option<WindowId> {
        Some(STUB_WINDOW_ID)
    }

    fn shutdown(&mut self) {
        if !self.terminated {
            self.terminated = true;
            info!(event = "core.stub.shutdown_completed");
        }
    }

    fn is_terminated(&self) -> bool {
        self.terminated
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::windows::WindowShape;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    #[test]
    fn test_stub_reports_single_window() {
        let stub = StubWindows::new(
            Box::new(crate::poller::StaticGeometry(WindowShape::new(0, 0, 800, 600))),
            Metadata::new(),
        );
        assert_eq!(stub.windows().len(), 1);
        assert_eq!(stub.windows()[0].id, STUB_WINDOW_ID);
        assert_eq!(stub.windows()[0].shape, WindowShape::new(0, 0, 800, 600));
        assert_eq!(stub.local_id(), Some(0));
    }

    #[test]
    fn test_stub_tracks_local_shape() {
        let shape = Rc::new(Cell::new(WindowShape::new(0, 0, 800, 600)));
        let source = Rc::clone(&shape);
        let mut stub = StubWindows::new(Box::new(move || source.get()), Metadata::new());

        let easings = Rc::new(RefCell::new(Vec::<bool>::new()));
        let sink = Rc::clone(&easings);
        stub.set_shape_change_callback(Box::new(move |easing: bool| sink.borrow_mut().push(easing)));

        stub.update();
        shape.set(WindowShape::new(100, 0, 800, 600));
        stub.update();
        stub.update();
        shape.set(WindowShape::new(200, 0, 800, 600));
        stub.update();

        assert_eq!(*easings.borrow(), vec![false, true]);
        assert_eq!(stub.windows().len(), 1);
        assert_eq!(stub.windows()[0].shape.x, 200);
    }

    #[test]
    fn test_stub_honours_termination() {
        let signal = TerminationSignal::new();
        let mut stub = StubWindows::new(
            Box::new(crate::poller::StaticGeometry(WindowShape::default())),
            Metadata::new(),
        )
        .with_termination(signal.clone());

        stub.update();
        assert!(!stub.is_terminated());
        signal.trigger();
        stub.update();
        assert!(stub.is_terminated());
    }
}

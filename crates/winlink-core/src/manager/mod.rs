//! Consumer-facing window synchronization.
//!
//! [`WindowManager`] ties the registry, identity, shape poller and event
//! bridge together behind the [`WindowSync`] contract. Hosts normally go
//! through [`connect`], which hands back a [`StubWindows`] instead when the
//! shared store cannot be reached, so host code never branches on store
//! availability.

pub mod errors;
pub mod state;
pub mod stub;

pub use errors::SyncError;
pub use state::LifecycleState;
pub use stub::{STUB_WINDOW_ID, StubWindows};

use tracing::{debug, info, warn};

use crate::bridge::{EventBridge, TerminationSignal, invoke_isolated};
use crate::identity::IdentityAssigner;
use crate::poller::{GeometrySource, ShapePoller, StaticGeometry};
use crate::registry::{DEFAULT_WINDOWS_KEY, Registry};
use crate::store::{KeyValueStore, SharedStore, StoreError};
use crate::windows::{Metadata, WindowId, WindowRecord};

/// Called with `easing = false` on the first shape change after
/// registration and `true` afterwards.
pub type ShapeChangeCallback = Box<dyn FnMut(bool)>;

/// Called after the window list was refreshed because another window changed it.
pub type WindowsChangeCallback = Box<dyn FnMut()>;

/// What every rendering host talks to.
pub trait WindowSync {
    /// Drive one frame: sample geometry, persist changes, dispatch notifications.
    fn update(&mut self);

    /// Last refreshed list of windows, in join order.
    fn windows(&self) -> &[WindowRecord];

    fn set_shape_change_callback(&mut self, callback: ShapeChangeCallback);

    fn set_windows_change_callback(&mut self, callback: WindowsChangeCallback);

    fn local_id(&self) -> Option<WindowId>;

    /// Leave the window group (best-effort) and stop reacting to updates.
    fn shutdown(&mut self);

    fn is_terminated(&self) -> bool;
}

#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Store key holding the snapshot.
    pub key: String,
    /// Flag that makes the next `update()` shut the manager down.
    pub termination: Option<TerminationSignal>,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            key: DEFAULT_WINDOWS_KEY.to_string(),
            termination: None,
        }
    }
}

pub struct WindowManager {
    state: LifecycleState,
    registry: Registry,
    identity: IdentityAssigner,
    geometry: Box<dyn GeometrySource>,
    poller: ShapePoller,
    bridge: Option<EventBridge>,
    termination: Option<TerminationSignal>,
    on_shape_change: Option<ShapeChangeCallback>,
    on_windows_change: Option<WindowsChangeCallback>,
}

impl WindowManager {
    pub fn new(
        store: Box<dyn SharedStore>,
        session: Box<dyn KeyValueStore>,
        geometry: Box<dyn GeometrySource>,
        options: SyncOptions,
    ) -> Self {
        Self {
            state: LifecycleState::Uninitialized,
            registry: Registry::new(store, options.key),
            identity: IdentityAssigner::new(session),
            geometry,
            poller: ShapePoller::new(),
            bridge: None,
            termination: options.termination,
            on_shape_change: None,
            on_windows_change: None,
        }
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// Join the window group.
    ///
    /// On failure the manager returns to `Uninitialized` with no
    /// subscriptions left behind.
    pub fn init(&mut self, metadata: Metadata) -> Result<(), SyncError> {
        if self.state != LifecycleState::Uninitialized {
            return Err(SyncError::InvalidState {
                operation: "init",
                state: self.state,
            });
        }

        self.state = LifecycleState::Registering;
        match self.register(metadata) {
            Ok(window_id) => {
                self.state = LifecycleState::Active;
                info!(
                    event = "core.manager.init_completed",
                    window_id = window_id,
                    windows = self.registry.windows().len()
                );
                Ok(())
            }
            Err(e) => {
                self.bridge = None;
                self.state = LifecycleState::Uninitialized;
                warn!(event = "core.manager.init_failed", error = %e);
                Err(e)
            }
        }
    }

    fn register(&mut self, metadata: Metadata) -> Result<WindowId, SyncError> {
        // Subscribe first so nothing written after our read goes unnoticed
        self.bridge = Some(EventBridge::attach(
            self.registry.store(),
            self.registry.key(),
        )?);

        let snapshot = self.registry.read_snapshot()?;
        let assignment = self.identity.resolve(&snapshot)?;
        let shape = self.geometry.current_shape();

        self.registry
            .register(WindowRecord::new(assignment.id(), shape, metadata))?;
        self.poller.reset(shape);

        debug!(
            event = "core.manager.registered",
            window_id = assignment.id(),
            reused_id = assignment.is_reused(),
            shape = %shape
        );
        Ok(assignment.id())
    }

    /// Re-read the snapshot and re-assert the local record, then notify the
    /// consumer, if another window changed the store since the last call.
    ///
    /// Returns whether a refresh happened.
    pub fn dispatch_notifications(&mut self) -> bool {
        if !self.state.is_active() {
            return false;
        }
        let relevant = self
            .bridge
            .as_ref()
            .is_some_and(EventBridge::take_relevant);
        if !relevant {
            return false;
        }

        if let Err(e) = self.registry.refresh() {
            warn!(event = "core.manager.refresh_failed", error = %e);
            return false;
        }
        if let Err(e) = self.registry.reassert() {
            warn!(event = "core.manager.reassert_failed", error = %e);
        }

        if let Some(callback) = self.on_windows_change.as_mut() {
            invoke_isolated("windows_change", || callback());
        }
        true
    }

    /// Re-read the snapshot without waiting for a notification.
    pub fn refresh(&mut self) -> Result<&[WindowRecord], SyncError> {
        if !self.state.is_active() {
            return Err(SyncError::InvalidState {
                operation: "refresh",
                state: self.state,
            });
        }
        Ok(self.registry.refresh()?)
    }

    /// Replace this window's metadata and persist it.
    pub fn set_metadata(&mut self, metadata: Metadata) -> Result<(), SyncError> {
        if !self.state.is_active() {
            return Err(SyncError::InvalidState {
                operation: "set metadata",
                state: self.state,
            });
        }
        Ok(self.registry.set_local_metadata(metadata)?)
    }

    fn poll_shape(&mut self) {
        let current = self.geometry.current_shape();
        let Some(change) = self.poller.poll(current) else {
            return;
        };

        if let Err(e) = self.registry.set_local_shape(change.shape) {
            warn!(
                event = "core.manager.shape_persist_failed",
                shape = %change.shape,
                error = %e
            );
            return;
        }
        self.poller.commit(change);

        if let Some(callback) = self.on_shape_change.as_mut() {
            invoke_isolated("shape_change", || callback(change.easing));
        }
    }

    fn take_geometry(&mut self) -> Box<dyn GeometrySource> {
        let fallback = StaticGeometry(self.poller.last_shape().unwrap_or_default());
        std::mem::replace(&mut self.geometry, Box::new(fallback))
    }
}

impl WindowSync for WindowManager {
    fn update(&mut self) {
        if !self.state.is_active() {
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

        // Merge other windows' writes before persisting our own shape
        self.dispatch_notifications();
        self.poll_shape();
    }

    fn windows(&self) -> &[WindowRecord] {
        self.registry.windows()
    }

    fn set_shape_change_callback(&mut self, callback: ShapeChangeCallback) {
        self.on_shape_change = Some(callback);
    }

    fn set_windows_change_callback(&mut self, callback: WindowsChangeCallback) {
        self.on_windows_change = Some(callback);
    }

    fn local_id(&self) -> Option<WindowId> {
        self.registry.local_id()
    }

    fn shutdown(&mut self) {
        let previous = self.state;
        if previous.is_terminal() {
            return;
        }
        self.state = LifecycleState::Terminating;

        let window_id = self.registry.local_id();
        if previous.is_active()
            && let Err(e) = self.registry.unregister()
        {
            warn!(
                event = "core.manager.unregister_failed",
                window_id = window_id,
                error = %e
            );
        }
        if let Some(mut bridge) = self.bridge.take() {
            bridge.detach();
        }

        info!(
            event = "core.manager.shutdown_completed",
            window_id = window_id,
            previous_state = %previous
        );
    }

    fn is_terminated(&self) -> bool {
        self.state.is_terminal()
    }
}

impl Drop for WindowManager {
    fn drop(&mut self) {
        if self.state.is_active() {
            self.shutdown();
        }
    }
}

/// Build a manager and join the window group, falling back to a
/// [`StubWindows`] if the store cannot be opened or registration fails.
pub fn connect<F>(
    open_store: F,
    session: Box<dyn KeyValueStore>,
    geometry: Box<dyn GeometrySource>,
    options: SyncOptions,
    metadata: Metadata,
) -> Box<dyn WindowSync>
where
    F: FnOnce() -> Result<Box<dyn SharedStore>, StoreError>,
{
    let termination = options.termination.clone();
    let stub = |geometry: Box<dyn GeometrySource>, metadata: Metadata| {
        let stub = StubWindows::new(geometry, metadata);
        match termination {
            Some(signal) => stub.with_termination(signal),
            None => stub,
        }
    };

    let store = match open_store() {
        Ok(store) => store,
        Err(e) => {
            warn!(
                event = "core.manager.store_unavailable",
                error = %e,
                "Falling back to single-window mode"
            );
            return Box::new(stub(geometry, metadata));
        }
    };

    let mut manager = WindowManager::new(store, session, geometry, options);
    match manager.init(metadata.clone()) {
        Ok(()) => Box::new(manager),
        Err(e) => {
            warn!(
                event = "core.manager.connect_failed",
                error = %e,
                "Falling back to single-window mode"
            );
            let geometry = manager.take_geometry();
            Box::new(stub(geometry, metadata))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryBroker, MemoryStore};
    use crate::windows::WindowShape;
    use serde_json::json;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    fn metadata() -> Metadata {
        let mut metadata = Metadata::new();
        metadata.insert("type".to_string(), json!("nebula"));
        metadata
    }

    fn manager_at(broker: &MemoryBroker, shape: Rc<Cell<WindowShape>>) -> WindowManager {
        WindowManager::new(
            Box::new(broker.attach()),
            Box::new(MemoryStore::standalone()),
            Box::new(move || shape.get()),
            SyncOptions::default(),
        )
    }

    #[test]
    fn test_init_moves_to_active() {
        let broker = MemoryBroker::new();
        let mut manager = manager_at(&broker, Rc::new(Cell::new(WindowShape::default())));
        assert_eq!(manager.state(), LifecycleState::Uninitialized);

        manager.init(metadata()).unwrap();
        assert_eq!(manager.state(), LifecycleState::Active);
        assert_eq!(manager.local_id(), Some(0));
    }

    #[test]
    fn test_init_twice_is_rejected() {
        let broker = MemoryBroker::new();
        let mut manager = manager_at(&broker, Rc::new(Cell::new(WindowShape::default())));
        manager.init(metadata()).unwrap();

        let err = manager.init(metadata()).unwrap_err();
        assert!(matches!(
            err,
            SyncError::InvalidState {
                operation: "init",
                state: LifecycleState::Active
            }
        ));
    }

    #[test]
    fn test_failed_init_returns_to_uninitialized() {
        let broker = MemoryBroker::new();
        broker.set_available(false);
        let mut manager = manager_at(&broker, Rc::new(Cell::new(WindowShape::default())));

        assert!(manager.init(metadata()).is_err());
        assert_eq!(manager.state(), LifecycleState::Uninitialized);

        broker.set_available(true);
        manager.init(metadata()).unwrap();
        assert!(manager.state().is_active());
    }

    #[test]
    fn test_update_before_init_is_noop() {
        let broker = MemoryBroker::new();
        let mut manager = manager_at(&broker, Rc::new(Cell::new(WindowShape::default())));
        manager.update();
        assert!(manager.windows().is_empty());
        assert!(broker.peek(DEFAULT_WINDOWS_KEY).is_none());
    }

    #[test]
    fn test_panicking_shape_callback_does_not_stop_updates() {
        let broker = MemoryBroker::new();
        let shape = Rc::new(Cell::new(WindowShape::new(0, 0, 800, 600)));
        let mut manager = manager_at(&broker, Rc::clone(&shape));
        manager.init(metadata()).unwrap();

        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);
        manager.set_shape_change_callback(Box::new(move |_easing: bool| {
            counter.set(counter.get() + 1);
            panic!("consumer bug");
        }));

        shape.set(WindowShape::new(10, 0, 800, 600));
        manager.update();
        shape.set(WindowShape::new(20, 0, 800, 600));
        manager.update();

        assert_eq!(calls.get(), 2);
        assert_eq!(manager.windows()[0].shape.x, 20);
    }

    #[test]
    fn test_panicking_windows_callback_does_not_stop_dispatch() {
        let broker = MemoryBroker::new();
        let mut first = manager_at(&broker, Rc::new(Cell::new(WindowShape::default())));
        first.init(metadata()).unwrap();

        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);
        first.set_windows_change_callback(Box::new(move || {
            counter.set(counter.get() + 1);
            panic!("consumer bug");
        }));

        let mut second = manager_at(&broker, Rc::new(Cell::new(WindowShape::default())));
        second.init(metadata()).unwrap();
        first.update();
        second.shutdown();
        first.update();

        assert_eq!(calls.get(), 2);
        assert_eq!(first.windows().len(), 1);
    }

    #[test]
    fn test_duplicate_session_ids_settle() {
        let broker = MemoryBroker::new();
        let joined = |x: i32| {
            let session = MemoryStore::standalone();
            session.set(crate::identity::SESSION_ID_KEY, "0").unwrap();
            let mut manager = WindowManager::new(
                Box::new(broker.attach()),
                Box::new(session),
                Box::new(StaticGeometry(WindowShape::new(x, 0, 800, 600))),
                SyncOptions::default(),
            );
            manager.init(metadata()).unwrap();
            manager
        };
        let mut left = joined(0);
        let mut right = joined(800);
        assert_eq!(left.local_id(), right.local_id());

        let counted = |manager: &mut WindowManager| {
            let calls = Rc::new(Cell::new(0));
            let counter = Rc::clone(&calls);
            manager.set_windows_change_callback(Box::new(move || counter.set(counter.get() + 1)));
            calls
        };
        let left_calls = counted(&mut left);
        let right_calls = counted(&mut right);

        let observer = broker.attach().subscribe().unwrap();
        for _ in 0..100 {
            left.update();
            right.update();
        }
        assert!(observer.drain().len() <= 2);
        assert!(left_calls.get() <= 2, "left: {}", left_calls.get());
        assert!(right_calls.get() <= 2, "right: {}", right_calls.get());

        for _ in 0..50 {
            left.update();
            right.update();
        }
        assert!(observer.drain().is_empty());
        assert_eq!(left.windows().len(), 1);
    }

    #[test]
    fn test_set_metadata_persists() {
        let broker = MemoryBroker::new();
        let mut manager = manager_at(&broker, Rc::new(Cell::new(WindowShape::default())));
        assert!(manager.set_metadata(metadata()).is_err());

        manager.init(Metadata::new()).unwrap();
        manager.set_metadata(metadata()).unwrap();
        assert_eq!(
            manager.windows()[0].metadata.get("type"),
            Some(&json!("nebula"))
        );
    }

    #[test]
    fn test_termination_signal_unregisters_on_next_update() {
        let broker = MemoryBroker::new();
        let signal = TerminationSignal::new();
        let mut manager = WindowManager::new(
            Box::new(broker.attach()),
            Box::new(MemoryStore::standalone()),
            Box::new(StaticGeometry(WindowShape::default())),
            SyncOptions {
                termination: Some(signal.clone()),
                ..SyncOptions::default()
            },
        );
        manager.init(metadata()).unwrap();

        signal.trigger();
        manager.update();

        assert!(manager.is_terminated());
        assert_eq!(broker.peek(DEFAULT_WINDOWS_KEY).as_deref(), Some("[]"));
    }

    #[test]
    fn test_shutdown_is_terminal_and_idempotent() {
        let broker = MemoryBroker::new();
        let mut manager = manager_at(&broker, Rc::new(Cell::new(WindowShape::default())));
        manager.init(metadata()).unwrap();

        manager.shutdown();
        manager.shutdown();
        assert_eq!(manager.state(), LifecycleState::Terminating);
        assert!(manager.init(metadata()).is_err());
        assert!(manager.refresh().is_err());
    }

    #[test]
    fn test_connect_falls_back_when_store_cannot_open() {
        let events = Rc::new(RefCell::new(Vec::<bool>::new()));
        let sink = Rc::clone(&events);
        let shape = Rc::new(Cell::new(WindowShape::new(0, 0, 640, 480)));
        let source = Rc::clone(&shape);

        let mut sync = connect(
            || Err(StoreError::unavailable("no storage")),
            Box::new(MemoryStore::standalone()),
            Box::new(move || source.get()),
            SyncOptions::default(),
            metadata(),
        );
        sync.set_shape_change_callback(Box::new(move |easing: bool| sink.borrow_mut().push(easing)));

        assert_eq!(sync.windows().len(), 1);
        assert_eq!(sync.local_id(), Some(STUB_WINDOW_ID));
        shape.set(WindowShape::new(5, 5, 640, 480));
        sync.update();
        assert_eq!(*events.borrow(), vec![false]);
    }

    #[test]
    fn test_connect_falls_back_when_registration_fails() {
        let broker = MemoryBroker::new();
        broker.set_available(false);
        let store = broker.attach();

        let sync = connect(
            move || Ok(Box::new(store) as Box<dyn SharedStore>),
            Box::new(MemoryStore::standalone()),
            Box::new(StaticGeometry(WindowShape::new(1, 2, 3, 4))),
            SyncOptions::default(),
            metadata(),
        );

        assert_eq!(sync.windows().len(), 1);
        assert_eq!(sync.windows()[0].shape, WindowShape::new(1, 2, 3, 4));
        assert_eq!(
            sync.windows()[0].metadata.get("type"),
            Some(&json!("nebula"))
        );
    }

    #[test]
    fn test_connect_joins_shared_store() {
        let broker = MemoryBroker::new();
        let store = broker.attach();

        let sync = connect(
            move || Ok(Box::new(store) as Box<dyn SharedStore>),
            Box::new(MemoryStore::standalone()),
            Box::new(StaticGeometry(WindowShape::new(0, 0, 800, 600))),
            SyncOptions::default(),
            metadata(),
        );

        assert_eq!(sync.local_id(), Some(0));
        assert!(broker.peek(DEFAULT_WINDOWS_KEY).is_some());
    }
}

//! Wiring from store notifications and termination signals into the manager.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, error, info};

use crate::store::{SharedStore, StoreError, Subscription};

/// Forwards change notifications for one store key.
pub struct EventBridge {
    key: String,
    subscription: Option<Subscription>,
}

impl EventBridge {
    /// Subscribe to `store` and watch for changes under `key`.
    pub fn attach(store: &dyn SharedStore, key: &str) -> Result<Self, StoreError> {
        let subscription = store.subscribe()?;
        debug!(event = "core.bridge.attached", key = key);
        Ok(Self {
            key: key.to_string(),
            subscription: Some(subscription),
        })
    }

    /// Drain pending notifications and report whether any touched our key.
    ///
    /// Payloads are discarded: the caller re-reads the store.
    pub fn take_relevant(&self) -> bool {
        let Some(subscription) = &self.subscription else {
            return false;
        };
        let changes = subscription.drain();
        let relevant = changes.iter().filter(|c| c.touches(&self.key)).count();
        if relevant > 0 {
            debug!(
                event = "core.bridge.changes_received",
                key = %self.key,
                relevant = relevant,
                total = changes.len()
            );
        }
        relevant > 0
    }

    /// Stop listening. Pending notifications are dropped.
    pub fn detach(&mut self) {
        if self.subscription.take().is_some() {
            debug!(event = "core.bridge.detached", key = %self.key);
        }
    }
}

/// Process-termination flag polled by the host loop.
#[derive(Debug, Clone, Default)]
pub struct TerminationSignal {
    flag: Arc<AtomicBool>,
}

impl TerminationSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a SIGINT/SIGTERM handler that raises this flag.
    ///
    /// Only one handler can be installed per process.
    pub fn install() -> Result<Self, ctrlc::Error> {
        let signal = Self::new();
        let handler_signal = signal.clone();
        ctrlc::set_handler(move || {
            handler_signal.trigger();
        })?;
        info!(event = "core.bridge.termination_handler_installed");
        Ok(signal)
    }

    pub fn trigger(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_triggered(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Run a consumer callback, containing any panic it raises.
///
/// Returns `false` if the callback panicked.
pub fn invoke_isolated(callback_name: &'static str, callback: impl FnOnce()) -> bool {
    match panic::catch_unwind(AssertUnwindSafe(callback)) {
        Ok(()) => true,
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "non-string panic payload".to_string());
            error!(
                event = "core.bridge.callback_panicked",
                callback = callback_name,
                panic = %message
            );
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{KeyValueStore, MemoryBroker};

    #[test]
    fn test_take_relevant_filters_by_key() {
        let broker = MemoryBroker::new();
        let local = broker.attach();
        let remote = broker.attach();
        let bridge = EventBridge::attach(&local, "windows").unwrap();

        remote.set("other", "x").unwrap();
        assert!(!bridge.take_relevant());

        remote.set("windows", "[]").unwrap();
        remote.set("windows", "[1]").unwrap();
        assert!(bridge.take_relevant());
        assert!(!bridge.take_relevant());
    }

    #[test]
    fn test_clear_is_relevant() {
        let broker = MemoryBroker::new();
        let local = broker.attach();
        let remote = broker.attach();
        let bridge = EventBridge::attach(&local, "windows").unwrap();

        remote.set("count", "1").unwrap();
        bridge.take_relevant();
        remote.clear().unwrap();
        assert!(bridge.take_relevant());
    }

    #[test]
    fn test_detached_bridge_ignores_changes() {
        let broker = MemoryBroker::new();
        let local = broker.attach();
        let remote = broker.attach();
        let mut bridge = EventBridge::attach(&local, "windows").unwrap();

        bridge.detach();
        remote.set("windows", "[]").unwrap();
        assert!(!bridge.take_relevant());
    }

    #[test]
    fn test_attach_fails_when_store_offline() {
        let broker = MemoryBroker::new();
        let local = broker.attach();
        broker.set_available(false);
        assert!(EventBridge::attach(&local, "windows").is_err());
    }

    #[test]
    fn test_termination_signal_is_shared_between_clones() {
        let signal = TerminationSignal::new();
        let observer = signal.clone();
        assert!(!observer.is_triggered());
        signal.trigger();
        assert!(observer.is_triggered());
    }

    #[test]
    fn test_invoke_isolated_contains_panics() {
        let mut calls = 0;
        assert!(invoke_isolated("ok", || calls += 1));
        assert!(!invoke_isolated("boom", || panic!("consumer failure")));
        assert!(!invoke_isolated("boom_string", || {
            panic!("{}", String::from("formatted failure"))
        }));
        assert_eq!(calls, 1);
    }
}

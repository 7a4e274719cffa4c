//! In-memory shared store.
//!
//! A [`MemoryBroker`] plays the role of the shared origin: every
//! [`MemoryStore`] attached to it behaves like one process, seeing the same
//! values and receiving change notifications for writes made by the other
//! attached stores, never its own.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::errors::StoreError;
use super::types::{StoreChange, Subscription};
use super::{KeyValueStore, SharedStore};

#[derive(Debug)]
struct Subscriber {
    handle: u64,
    sender: Sender<StoreChange>,
}

#[derive(Debug, Default)]
struct BrokerState {
    values: HashMap<String, String>,
    subscribers: Vec<Subscriber>,
}

impl BrokerState {
    /// Deliver `change` to every subscriber except those owned by `origin`.
    /// Subscribers whose receiving end was dropped are pruned.
    fn publish(&mut self, origin: u64, change: StoreChange) {
        self.subscribers.retain(|sub| {
            if sub.handle == origin {
                return true;
            }
            sub.sender.send(change.clone()).is_ok()
        });
    }
}

#[derive(Debug, Clone)]
pub struct MemoryBroker {
    state: Arc<Mutex<BrokerState>>,
    available: Arc<AtomicBool>,
    next_handle: Arc<AtomicU64>,
}

impl Default for MemoryBroker {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBroker {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(BrokerState::default())),
            available: Arc::new(AtomicBool::new(true)),
            next_handle: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Attach a new process-like handle to this broker.
    pub fn attach(&self) -> MemoryStore {
        MemoryStore {
            broker: self.clone(),
            handle: self.next_handle.fetch_add(1, Ordering::Relaxed),
        }
    }

    /// Simulate the backing storage becoming unreachable (or reachable again).
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Raw value currently held under `key`, bypassing availability checks.
    pub fn peek(&self, key: &str) -> Option<String> {
        self.lock().values.get(key).cloned()
    }

    fn lock(&self) -> MutexGuard<'_, BrokerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn ensure_available(&self) -> Result<(), StoreError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::unavailable("memory broker is offline"))
        }
    }
}

/// One process's view of a [`MemoryBroker`].
#[derive(Debug)]
pub struct MemoryStore {
    broker: MemoryBroker,
    handle: u64,
}

impl MemoryStore {
    /// A store attached to its own private broker.
    ///
    /// Used for process-local session storage, which no other process sees.
    pub fn standalone() -> Self {
        MemoryBroker::new().attach()
    }

    pub fn broker(&self) -> &MemoryBroker {
        &self.broker
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.broker.ensure_available()?;
        Ok(self.broker.lock().values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.broker.ensure_available()?;
        let mut state = self.broker.lock();
        let old_value = state.values.insert(key.to_string(), value.to_string());

        // Rewriting an identical value is not a change
        if old_value.as_deref() == Some(value) {
            return Ok(());
        }

        state.publish(
            self.handle,
            StoreChange {
                key: Some(key.to_string()),
                old_value,
                new_value: Some(value.to_string()),
            },
        );
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.broker.ensure_available()?;
        let mut state = self.broker.lock();
        if let Some(old_value) = state.values.remove(key) {
            state.publish(
                self.handle,
                StoreChange {
                    key: Some(key.to_string()),
                    old_value: Some(old_value),
                    new_value: None,
                },
            );
        }
        Ok(())
    }
}

impl SharedStore for MemoryStore {
    fn subscribe(&self) -> Result<Subscription, StoreError> {
        self.broker.ensure_available()?;
        let (sender, subscription) = Subscription::channel();
        self.broker.lock().subscribers.push(Subscriber {
            handle: self.handle,
            sender,
        });
        Ok(subscription)
    }

    fn clear(&self) -> Result<(), StoreError> {
        self.broker.ensure_available()?;
        let mut state = self.broker.lock();
        if state.values.is_empty() {
            return Ok(());
        }
        state.values.clear();
        state.publish(self.handle, StoreChange::cleared());
        Ok(())
    }
}

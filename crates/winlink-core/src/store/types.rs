use std::sync::mpsc::{self, Receiver, Sender};

/// A change made to the shared store by another process.
///
/// `key` is `None` when the whole keyspace was cleared. The values are
/// informational only: consumers re-read the store instead of trusting them,
/// since deliveries from different writers are not ordered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreChange {
    pub key: Option<String>,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
}

impl StoreChange {
    pub fn cleared() -> Self {
        Self {
            key: None,
            old_value: None,
            new_value: None,
        }
    }

    /// Whether this change can affect the value stored under `key`.
    pub fn touches(&self, key: &str) -> bool {
        self.key.as_deref().is_none_or(|k| k == key)
    }
}

/// Receiving end of a store's change notifications.
///
/// Deliveries queue up until the owner drains them, so a single-threaded
/// host can dispatch them from its own loop without blocking.
#[derive(Debug)]
pub struct Subscription {
    receiver: Receiver<StoreChange>,
}

impl Subscription {
    pub(crate) fn channel() -> (Sender<StoreChange>, Self) {
        let (sender, receiver) = mpsc::channel();
        (sender, Self { receiver })
    }

    /// Take the next pending change, if any.
    pub fn try_next(&self) -> Option<StoreChange> {
        self.receiver.try_recv().ok()
    }

    /// Take every change delivered so far.
    pub fn drain(&self) -> Vec<StoreChange> {
        self.receiver.try_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_touches_matching_key() {
        let change = StoreChange {
            key: Some("windows".to_string()),
            old_value: None,
            new_value: Some("[]".to_string()),
        };
        assert!(change.touches("windows"));
        assert!(!change.touches("other"));
    }

    #[test]
    fn test_cleared_touches_every_key() {
        let change = StoreChange::cleared();
        assert!(change.touches("windows"));
        assert!(change.touches("anything"));
    }

    #[test]
    fn test_subscription_drains_in_delivery_order() {
        let (tx, sub) = Subscription::channel();
        assert!(sub.try_next().is_none());

        for value in ["a", "b"] {
            tx.send(StoreChange {
                key: Some("k".to_string()),
                old_value: None,
                new_value: Some(value.to_string()),
            })
            .unwrap();
        }

        let drained = sub.drain();
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0].new_value.as_deref(), Some("a"));
        assert_eq!(drained[1].new_value.as_deref(), Some("b"));
        assert!(sub.drain().is_empty());
    }
}

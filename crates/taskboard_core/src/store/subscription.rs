//! Per-collection change notification.
//!
//! # Invariants
//! - Listeners are invoked synchronously, in subscription order, after the
//!   write has been applied.
//! - A listener may subscribe/unsubscribe or read the store while being invoked.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;

/// Change emitted by a collection write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollectionEvent {
    Added { id: String },
    /// `changed` holds the attributes whose value differs after the write,
    /// always including `updatedAt`.
    Updated { id: String, changed: Vec<String> },
    Removed { id: String },
}

impl CollectionEvent {
    pub fn id(&self) -> &str {
        match self {
            Self::Added { id } | Self::Updated { id, .. } | Self::Removed { id } => id,
        }
    }
}

/// Handle returned by `subscribe`, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(u64);

type Listener = Rc<dyn Fn(&CollectionEvent)>;

#[derive(Default)]
pub(crate) struct Subscribers {
    next_id: Cell<u64>,
    listeners: RefCell<BTreeMap<u64, Listener>>,
}

impl Subscribers {
    pub(crate) fn subscribe(&self, listener: impl Fn(&CollectionEvent) + 'static) -> SubscriptionId {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        self.listeners.borrow_mut().insert(id, Rc::new(listener));
        SubscriptionId(id)
    }

    pub(crate) fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.listeners.borrow_mut().remove(&id.0).is_some()
    }

    pub(crate) fn len(&self) -> usize {
        self.listeners.borrow().len()
    }

    pub(crate) fn emit(&self, event: &CollectionEvent) {
        // Snapshot first so listeners can mutate the registry re-entrantly.
        let listeners: Vec<Listener> = self.listeners.borrow().values().cloned().collect();
        for listener in listeners {
            listener(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{CollectionEvent, Subscribers};
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn emits_to_listeners_in_subscription_order() {
        let subscribers = Subscribers::default();
        let seen = Rc::new(RefCell::new(Vec::new()));

        let first = Rc::clone(&seen);
        subscribers.subscribe(move |event| first.borrow_mut().push(format!("a:{}", event.id())));
        let second = Rc::clone(&seen);
        subscribers.subscribe(move |event| second.borrow_mut().push(format!("b:{}", event.id())));

        subscribers.emit(&CollectionEvent::Added {
            id: "x".to_string(),
        });
        assert_eq!(*seen.borrow(), vec!["a:x", "b:x"]);
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let subscribers = Subscribers::default();
        let count = Rc::new(RefCell::new(0));
        let counter = Rc::clone(&count);
        let id = subscribers.subscribe(move |_| *counter.borrow_mut() += 1);

        subscribers.emit(&CollectionEvent::Removed {
            id: "x".to_string(),
        });
        assert!(subscribers.unsubscribe(id));
        assert!(!subscribers.unsubscribe(id));
        subscribers.emit(&CollectionEvent::Removed {
            id: "x".to_string(),
        });

        assert_eq!(*count.borrow(), 1);
        assert_eq!(subscribers.len(), 0);
    }
}

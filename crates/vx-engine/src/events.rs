//! # Event subscription (§10.7)
//!
//! A process-local event bus. Callers subscribe to notebook lifecycle and
//! mutation events without the engine depending on any particular delivery
//! mechanism — no cross-process transport, no UI-thread marshaling. That
//! remains the caller's concern; this module only models the event types
//! and the subscribe/unsubscribe operations, grounded in the original
//! engine's event-type enumeration (`vxcore_events.h`).

use std::sync::{Arc, Mutex};

/// The kinds of notebook lifecycle and mutation events a subscriber can
/// observe. Mirrors the original's event enumeration, narrowed to what this
/// core actually emits.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    NotebookOpened { notebook_id: String },
    NotebookClosed { notebook_id: String },
    FileCreated { notebook_id: String, path: String, file_id: String },
    FileUpdated { notebook_id: String, path: String, file_id: String },
    FileDeleted { notebook_id: String, path: String, file_id: String },
    FileMoved { notebook_id: String, from: String, to: String, file_id: String },
    FolderCreated { notebook_id: String, path: String, folder_id: String },
    FolderDeleted { notebook_id: String, path: String, folder_id: String },
    FolderMoved { notebook_id: String, from: String, to: String, folder_id: String },
    TagAdded { notebook_id: String, file_path: String, tag: String },
    TagRemoved { notebook_id: String, file_path: String, tag: String },
    IndexRebuilt { notebook_id: String },
}

pub type Subscriber = Arc<dyn Fn(&Event) + Send + Sync>;

/// A handle returned by [`EventBus::subscribe`]; drop or pass to
/// [`EventBus::unsubscribe`] to stop receiving events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionId(u64);

#[derive(Default)]
struct Inner {
    next_id: u64,
    subscribers: Vec<(u64, Subscriber)>,
}

/// A process-local, in-memory publish/subscribe bus. One instance is
/// typically shared across all open notebooks via `Arc`.
#[derive(Clone, Default)]
pub struct EventBus {
    inner: Arc<Mutex<Inner>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, callback: Subscriber) -> SubscriptionId {
        let mut inner = self.inner.lock().expect("event bus mutex poisoned");
        let id = inner.next_id;
        inner.next_id += 1;
        inner.subscribers.push((id, callback));
        SubscriptionId(id)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) {
        let mut inner = self.inner.lock().expect("event bus mutex poisoned");
        inner.subscribers.retain(|(sid, _)| *sid != id.0);
    }

    pub fn publish(&self, event: Event) {
        let inner = self.inner.lock().expect("event bus mutex poisoned");
        for (_, callback) in &inner.subscribers {
            callback(&event);
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.lock().expect("event bus mutex poisoned").subscribers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_subscribe_receives_published_event() {
        let bus = EventBus::new();
        let count = Arc::new(AtomicUsize::new(0));
        let count2 = count.clone();
        bus.subscribe(Arc::new(move |_event| {
            count2.fetch_add(1, Ordering::SeqCst);
        }));

        bus.publish(Event::NotebookOpened {
            notebook_id: "nb1".to_string(),
        });

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_unsubscribe_stops_delivery() {
        let bus = EventBus::new();
        let count = Arc::new(AtomicUsize::new(0));
        let count2 = count.clone();
        let id = bus.subscribe(Arc::new(move |_event| {
            count2.fetch_add(1, Ordering::SeqCst);
        }));

        bus.unsubscribe(id);
        bus.publish(Event::NotebookClosed {
            notebook_id: "nb1".to_string(),
        });

        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn test_multiple_subscribers_all_receive() {
        let bus = EventBus::new();
        let count = Arc::new(AtomicUsize::new(0));
        for _ in 0..3 {
            let count = count.clone();
            bus.subscribe(Arc::new(move |_event| {
                count.fetch_add(1, Ordering::SeqCst);
            }));
        }

        bus.publish(Event::IndexRebuilt {
            notebook_id: "nb1".to_string(),
        });

        assert_eq!(count.load(Ordering::SeqCst), 3);
    }
}

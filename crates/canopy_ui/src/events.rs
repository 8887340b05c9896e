//! Interaction events.
//!
//! The pointer system publishes [`InteractionEvent`]s per node into an
//! [`InteractionEvents`] hub. Each subscriber gets its own unbounded queue;
//! a [`Cursor`] owns the receiving end and drains whatever arrived since
//! the last read.
//!
//! ```text
//!   input thread ── emit(node, ev) ──► hub ──► queue per cursor
//!                                                  │
//!   ElementManager ── EventSubscriptions::read ◄───┘
//! ```
//!
//! An unread queue grows without bound, so every cursor must be released.
//! [`EventSubscriptions`] creates at most one cursor per node and releases
//! it when the node's element is torn down.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use canopy_core::EntityId;
use crossbeam_channel::{Receiver, Sender};
use parking_lot::RwLock;

/// Pointer button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PointerButton {
    /// Primary button.
    Left,
    /// Secondary button.
    Right,
    /// Middle button (wheel click).
    Middle,
}

/// Event delivered to an element's `on_event` hook.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InteractionEvent {
    /// Button pressed over the node.
    PointerDown {
        /// Pointer X.
        x: f32,
        /// Pointer Y.
        y: f32,
        /// Button.
        button: PointerButton,
    },
    /// Button released over the node.
    PointerUp {
        /// Pointer X.
        x: f32,
        /// Pointer Y.
        y: f32,
        /// Button.
        button: PointerButton,
    },
    /// Press and release on the same node.
    Click {
        /// Pointer X.
        x: f32,
        /// Pointer Y.
        y: f32,
        /// Button.
        button: PointerButton,
    },
    /// Pointer moved over the node.
    PointerMove {
        /// Pointer X.
        x: f32,
        /// Pointer Y.
        y: f32,
    },
    /// Pointer entered the node.
    PointerEnter,
    /// Pointer left the node.
    PointerLeave,
    /// Wheel scrolled over the node.
    Scroll {
        /// Horizontal delta.
        dx: f32,
        /// Vertical delta.
        dy: f32,
    },
}

/// Receiving end of one subscription.
#[derive(Debug)]
pub struct Cursor {
    id: u64,
    node: EntityId,
    receiver: Receiver<InteractionEvent>,
}

impl Cursor {
    /// Node this cursor listens to.
    #[must_use]
    pub const fn node(&self) -> EntityId {
        self.node
    }
}

type Subscribers = HashMap<EntityId, Vec<(u64, Sender<InteractionEvent>)>>;

/// Per-node event queues, shareable across threads.
#[derive(Debug, Clone, Default)]
pub struct InteractionEvents {
    subscribers: Arc<RwLock<Subscribers>>,
    next_cursor: Arc<AtomicU64>,
}

impl InteractionEvents {
    /// Creates an empty hub.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a new queue for `node`.
    #[must_use]
    pub fn subscribe(&self, node: EntityId) -> Cursor {
        let id = self.next_cursor.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = crossbeam_channel::unbounded();
        self.subscribers.write().entry(node).or_default().push((id, sender));
        Cursor { id, node, receiver }
    }

    /// Drains the events queued for `cursor` since the last read.
    #[must_use]
    pub fn read(&self, cursor: &Cursor) -> Vec<InteractionEvent> {
        cursor.receiver.try_iter().collect()
    }

    /// Closes a queue. Consumes the cursor, so a queue is released at most
    /// once. Returns `false` if the hub no longer knew it.
    pub fn unsubscribe(&self, cursor: Cursor) -> bool {
        let mut subscribers = self.subscribers.write();
        let Some(list) = subscribers.get_mut(&cursor.node) else {
            return false;
        };
        let before = list.len();
        list.retain(|(id, _)| *id != cursor.id);
        let removed = list.len() != before;
        if list.is_empty() {
            subscribers.remove(&cursor.node);
        }
        removed
    }

    /// Publishes `event` to every queue open on `node`. Returns the number
    /// of queues it reached.
    pub fn emit(&self, node: EntityId, event: InteractionEvent) -> usize {
        self.subscribers
            .read()
            .get(&node)
            .map_or(0, |list| {
                list.iter()
                    .filter(|(_, sender)| sender.send(event).is_ok())
                    .count()
            })
    }

    /// Open queues on `node`.
    #[must_use]
    pub fn subscriber_count(&self, node: EntityId) -> usize {
        self.subscribers.read().get(&node).map_or(0, Vec::len)
    }

    /// Open queues across all nodes.
    #[must_use]
    pub fn total_subscribers(&self) -> usize {
        self.subscribers.read().values().map(Vec::len).sum()
    }
}

/// Create-once cache of cursors keyed by node, owned by the element
/// manager.
#[derive(Debug)]
pub struct EventSubscriptions {
    events: InteractionEvents,
    cursors: HashMap<EntityId, Cursor>,
    released: u64,
}

impl EventSubscriptions {
    /// Creates an empty cache over `events`.
    #[must_use]
    pub fn new(events: InteractionEvents) -> Self {
        Self {
            events,
            cursors: HashMap::new(),
            released: 0,
        }
    }

    /// The hub this cache reads from.
    #[must_use]
    pub const fn events(&self) -> &InteractionEvents {
        &self.events
    }

    /// Drains the node's queue, subscribing on first use.
    pub fn read(&mut self, node: EntityId) -> Vec<InteractionEvent> {
        let events = &self.events;
        let cursor = self
            .cursors
            .entry(node)
            .or_insert_with(|| events.subscribe(node));
        events.read(cursor)
    }

    /// Releases the node's cursor if one was ever created. Returns `true`
    /// if a cursor was released.
    pub fn release(&mut self, node: EntityId) -> bool {
        let Some(cursor) = self.cursors.remove(&node) else {
            return false;
        };
        self.events.unsubscribe(cursor);
        self.released += 1;
        true
    }

    /// Returns true if the node currently holds a cursor.
    #[must_use]
    pub fn is_subscribed(&self, node: EntityId) -> bool {
        self.cursors.contains_key(&node)
    }

    /// Cursors currently held.
    #[must_use]
    pub fn live(&self) -> usize {
        self.cursors.len()
    }

    /// Cursors released over the cache's lifetime.
    #[must_use]
    pub const fn released(&self) -> u64 {
        self.released
    }
}

impl Drop for EventSubscriptions {
    fn drop(&mut self) {
        for (_, cursor) in self.cursors.drain() {
            self.events.unsubscribe(cursor);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    const CLICK: InteractionEvent = InteractionEvent::Click {
        x: 1.0,
        y: 2.0,
        button: PointerButton::Left,
    };

    #[test]
    fn test_read_drains_queue() {
        let hub = InteractionEvents::new();
        let node = EntityId::new(1, 1);
        let cursor = hub.subscribe(node);

        assert_eq!(hub.emit(node, CLICK), 1);
        assert_eq!(hub.emit(node, InteractionEvent::PointerLeave), 1);
        assert_eq!(hub.read(&cursor), vec![CLICK, InteractionEvent::PointerLeave]);
        assert!(hub.read(&cursor).is_empty());
    }

    #[test]
    fn test_emit_without_subscribers() {
        let hub = InteractionEvents::new();
        assert_eq!(hub.emit(EntityId::new(0, 1), CLICK), 0);
    }

    #[test]
    fn test_unsubscribe_once() {
        let hub = InteractionEvents::new();
        let node = EntityId::new(2, 1);
        let a = hub.subscribe(node);
        let b = hub.subscribe(node);
        assert_eq!(hub.subscriber_count(node), 2);

        assert!(hub.unsubscribe(a));
        assert_eq!(hub.subscriber_count(node), 1);
        assert!(hub.unsubscribe(b));
        assert_eq!(hub.total_subscribers(), 0);
    }

    #[test]
    fn test_emit_from_other_thread() {
        let hub = InteractionEvents::new();
        let node = EntityId::new(3, 1);
        let cursor = hub.subscribe(node);

        let remote = hub.clone();
        thread::spawn(move || {
            for _ in 0..10 {
                remote.emit(node, InteractionEvent::Scroll { dx: 0.0, dy: 1.0 });
            }
        })
        .join()
        .unwrap();

        assert_eq!(hub.read(&cursor).len(), 10);
    }

    #[test]
    fn test_subscriptions_create_once_release_once() {
        let hub = InteractionEvents::new();
        let node = EntityId::new(4, 1);
        let mut subs = EventSubscriptions::new(hub.clone());

        assert!(subs.read(node).is_empty());
        hub.emit(node, CLICK);
        assert_eq!(subs.read(node), vec![CLICK]);
        assert_eq!(hub.subscriber_count(node), 1);
        assert_eq!(subs.live(), 1);

        assert!(subs.release(node));
        assert!(!subs.release(node));
        assert_eq!(subs.released(), 1);
        assert_eq!(hub.total_subscribers(), 0);
    }

    #[test]
    fn test_release_without_cursor() {
        let mut subs = EventSubscriptions::new(InteractionEvents::new());
        assert!(!subs.release(EntityId::new(5, 1)));
        assert_eq!(subs.released(), 0);
    }

    #[test]
    fn test_drop_releases_everything() {
        let hub = InteractionEvents::new();
        {
            let mut subs = EventSubscriptions::new(hub.clone());
            let _ = subs.read(EntityId::new(6, 1));
            let _ = subs.read(EntityId::new(7, 1));
            assert_eq!(hub.total_subscribers(), 2);
        }
        assert_eq!(hub.total_subscribers(), 0);
    }
}

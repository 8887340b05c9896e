//! Document revision shared between the element manager and layout.
//!
//! The element manager bumps the revision whenever it adds an element.
//! Layout remembers the revision it last ran against and re-runs when it
//! moves. The state is owned by whoever builds the schedule and handed to
//! both systems; nothing here is global.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Shared tree-change counter.
#[derive(Debug, Clone, Default)]
pub struct DocumentState {
    revision: Arc<AtomicU64>,
}

impl DocumentState {
    /// Creates a state at revision zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a tree change.
    pub fn mark_changed(&self) {
        self.revision.fetch_add(1, Ordering::Release);
    }

    /// Current revision.
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.revision.load(Ordering::Acquire)
    }

    /// Returns true if the tree changed since `seen` was read.
    #[must_use]
    pub fn changed_since(&self, seen: u64) -> bool {
        self.revision() != seen
    }
}

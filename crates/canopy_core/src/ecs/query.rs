//! # Reactive Queries
//!
//! A query tracks the live set of entities carrying a required set of
//! components and reports which entities entered or left that set since
//! the last drain.
//!
//! ```text
//!   world changes ──► refresh() ──► live set ──► entities()
//!                         │
//!                         └──► pending added / removed ──► drain_delta()
//! ```
//!
//! Refreshing is skipped when the world revision has not moved, so systems
//! can call it every pass. [`ReactiveQuery::resync`] forces the diff.

use std::collections::HashSet;

use super::component::Component;
use super::entity::EntityId;
use super::world::World;

/// Entities that entered and left a query's match set.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct QueryDelta {
    /// Entities that started matching, in slot order.
    pub added: Vec<EntityId>,
    /// Entities that stopped matching.
    pub removed: Vec<EntityId>,
}

impl QueryDelta {
    /// Returns true if nothing changed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Reactive query over a component mask.
#[derive(Debug)]
pub struct ReactiveQuery {
    /// Required component bits.
    required: u64,
    /// Current match set, in slot order.
    live: Vec<EntityId>,
    /// Membership index for `live`.
    members: HashSet<EntityId>,
    /// Entered since the last drain.
    pending_added: Vec<EntityId>,
    /// Left since the last drain.
    pending_removed: Vec<EntityId>,
    /// World revision observed by the last refresh.
    seen_revision: Option<u64>,
}

impl ReactiveQuery {
    /// Creates a query matching entities that carry every bit in `required`.
    #[must_use]
    pub fn new(required: u64) -> Self {
        Self {
            required,
            live: Vec::new(),
            members: HashSet::new(),
            pending_added: Vec::new(),
            pending_removed: Vec::new(),
            seen_revision: None,
        }
    }

    /// Query over one component type.
    #[must_use]
    pub fn of<A: Component>() -> Self {
        Self::new(A::mask())
    }

    /// Query over two component types.
    #[must_use]
    pub fn of2<A: Component, B: Component>() -> Self {
        Self::new(A::mask() | B::mask())
    }

    /// Required component bits.
    #[inline]
    #[must_use]
    pub const fn required(&self) -> u64 {
        self.required
    }

    /// Returns true if `id` is alive in `world` and matches right now,
    /// independent of the cached live set.
    #[must_use]
    pub fn matches(&self, world: &World, id: EntityId) -> bool {
        world.entity(id).is_some_and(|e| e.has_all(self.required))
    }

    /// Current match set as of the last refresh.
    #[inline]
    #[must_use]
    pub fn entities(&self) -> &[EntityId] {
        &self.live
    }

    /// Returns true if the entity was in the match set at the last refresh.
    #[inline]
    #[must_use]
    pub fn contains(&self, id: EntityId) -> bool {
        self.members.contains(&id)
    }

    /// Returns true if deltas are waiting to be drained.
    #[inline]
    #[must_use]
    pub fn has_pending(&self) -> bool {
        !self.pending_added.is_empty() || !self.pending_removed.is_empty()
    }

    /// Brings the live set up to date if the world changed structurally.
    pub fn refresh(&mut self, world: &World) {
        if self.seen_revision == Some(world.revision()) {
            return;
        }
        self.resync(world);
    }

    /// Recomputes the live set unconditionally and queues deltas.
    pub fn resync(&mut self, world: &World) {
        let required = self.required;
        let current: Vec<EntityId> = world
            .iter_alive()
            .filter(|e| e.has_all(required))
            .map(|e| e.id)
            .collect();
        let current_members: HashSet<EntityId> = current.iter().copied().collect();

        for &id in &self.live {
            if current_members.contains(&id) {
                continue;
            }
            // Entered and left before anyone drained it: nothing to report
            if let Some(pos) = self.pending_added.iter().position(|&a| a == id) {
                self.pending_added.remove(pos);
            } else {
                self.pending_removed.push(id);
            }
        }

        for &id in &current {
            if !self.members.contains(&id) {
                self.pending_added.push(id);
            }
        }

        self.live = current;
        self.members = current_members;
        self.seen_revision = Some(world.revision());
    }

    /// Takes the queued deltas.
    pub fn drain_delta(&mut self) -> QueryDelta {
        QueryDelta {
            added: std::mem::take(&mut self.pending_added),
            removed: std::mem::take(&mut self.pending_removed),
        }
    }

    /// Takes only the queued removals; additions stay pending.
    pub fn drain_removed(&mut self) -> Vec<EntityId> {
        std::mem::take(&mut self.pending_removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct A;
    impl Component for A {
        const ID: u8 = 10;
    }

    struct B;
    impl Component for B {
        const ID: u8 = 11;
    }

    #[test]
    fn test_added_and_removed() {
        let mut world = World::new(16);
        let mut query = ReactiveQuery::of2::<A, B>();

        let both = world.spawn().unwrap();
        world.insert(both, A).unwrap();
        world.insert(both, B).unwrap();
        let only_a = world.spawn().unwrap();
        world.insert(only_a, A).unwrap();

        query.refresh(&world);
        assert_eq!(query.entities(), &[both]);
        let delta = query.drain_delta();
        assert_eq!(delta.added, vec![both]);
        assert!(delta.removed.is_empty());

        world.despawn(both);
        query.refresh(&world);
        let delta = query.drain_delta();
        assert!(delta.added.is_empty());
        assert_eq!(delta.removed, vec![both]);
        assert!(query.entities().is_empty());
    }

    #[test]
    fn test_component_removal_leaves_set() {
        let mut world = World::new(4);
        let mut query = ReactiveQuery::of::<A>();
        let id = world.spawn().unwrap();
        world.insert(id, A).unwrap();
        query.refresh(&world);
        query.drain_delta();

        world.remove::<A>(id);
        query.refresh(&world);
        assert_eq!(query.drain_delta().removed, vec![id]);
        assert!(query.entities().is_empty());
    }

    #[test]
    fn test_transient_entity_cancels_out() {
        let mut world = World::new(4);
        let mut query = ReactiveQuery::of::<A>();

        let id = world.spawn().unwrap();
        world.insert(id, A).unwrap();
        query.refresh(&world);
        world.despawn(id);
        query.refresh(&world);

        assert!(query.drain_delta().is_empty());
    }

    #[test]
    fn test_drain_removed_keeps_additions() {
        let mut world = World::new(4);
        let mut query = ReactiveQuery::of::<A>();
        let old = world.spawn().unwrap();
        world.insert(old, A).unwrap();
        query.refresh(&world);
        query.drain_delta();

        world.despawn(old);
        let new = world.spawn().unwrap();
        world.insert(new, A).unwrap();
        query.refresh(&world);

        assert_eq!(query.drain_removed(), vec![old]);
        assert_eq!(query.drain_delta().added, vec![new]);
    }

    #[test]
    fn test_refresh_skips_unchanged_world() {
        let mut world = World::new(4);
        let mut query = ReactiveQuery::of::<A>();
        let id = world.spawn().unwrap();
        world.insert(id, A).unwrap();

        query.refresh(&world);
        query.drain_delta();
        query.refresh(&world);
        assert!(!query.has_pending());
        assert!(query.contains(id));
        assert!(query.matches(&world, id));
    }
}

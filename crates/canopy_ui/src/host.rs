//! Host resolution.
//!
//! A [`Host`] marks an entity as the data-sharing anchor for its subtree.
//! Elements find their host by walking [`Parent`] edges upward:
//!
//! ```text
//!   A [Host]
//!   └── X
//!       └── B        Host::get(world, B) == Some(A)
//! ```
//!
//! The walk starts at the parent, so an entity is never its own host. The
//! manager resolves the host once, when the element is added, and keeps
//! the result even if the ancestor chain changes later.

use canopy_core::{Component, EntityId, Parent, World};

/// Marker component: this entity's element shares its context with the
/// elements below it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Host;

impl Host {
    /// Returns the nearest ancestor of `entity` carrying [`Host`].
    ///
    /// `None` if `entity` has no parent, or the walk reaches a root or a
    /// dead entity first. Cost is linear in the ancestor depth.
    #[must_use]
    pub fn get(world: &World, entity: EntityId) -> Option<EntityId> {
        let mut current = world.get::<Parent>(entity)?.get();
        // Bounded by the slot count so a malformed cycle cannot spin forever
        for _ in 0..world.capacity() {
            if world.has::<Self>(current) {
                return Some(current);
            }
            current = world.get::<Parent>(current)?.get();
        }
        None
    }
}

impl Component for Host {
    const ID: u8 = 3;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain(world: &mut World, len: usize) -> Vec<EntityId> {
        let mut ids = Vec::with_capacity(len);
        for i in 0..len {
            let id = world.spawn().unwrap();
            if i > 0 {
                world.insert(id, Parent(ids[i - 1])).unwrap();
            }
            ids.push(id);
        }
        ids
    }

    #[test]
    fn test_root_has_no_host() {
        let mut world = World::new(8);
        let root = world.spawn().unwrap();
        world.insert(root, Host).unwrap();
        assert_eq!(Host::get(&world, root), None);
    }

    #[test]
    fn test_two_hops() {
        let mut world = World::new(8);
        let ids = chain(&mut world, 3);
        world.insert(ids[0], Host).unwrap();
        assert_eq!(Host::get(&world, ids[2]), Some(ids[0]));
        assert_eq!(Host::get(&world, ids[1]), Some(ids[0]));
    }

    #[test]
    fn test_nearest_host_wins() {
        let mut world = World::new(8);
        let ids = chain(&mut world, 4);
        world.insert(ids[0], Host).unwrap();
        world.insert(ids[2], Host).unwrap();
        assert_eq!(Host::get(&world, ids[3]), Some(ids[2]));
        assert_eq!(Host::get(&world, ids[2]), Some(ids[0]));
    }

    #[test]
    fn test_dead_host_stops_walk() {
        let mut world = World::new(8);
        let ids = chain(&mut world, 3);
        world.insert(ids[0], Host).unwrap();
        world.despawn(ids[0]);
        assert_eq!(Host::get(&world, ids[2]), None);
    }

    #[test]
    fn test_cycle_terminates() {
        let mut world = World::new(4);
        let a = world.spawn().unwrap();
        let b = world.spawn().unwrap();
        world.insert(a, Parent(b)).unwrap();
        world.insert(b, Parent(a)).unwrap();
        assert_eq!(Host::get(&world, a), None);
    }
}

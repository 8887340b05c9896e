//! Spawning and tearing down element subtrees.
//!
//! Elements usually come in trees: a root, then children hanging off it by
//! [`Parent`] edges. These helpers attach the parent edge before the
//! element so host resolution sees the full chain at add time.

use canopy_core::{EcsError, EcsResult, EntityId, Parent, World};

use crate::element::UiElement;
use crate::error::UiResult;
use crate::node::Node;

/// Spawns a root entity carrying `node` and `element`.
///
/// # Errors
///
/// Fails if the world is full. Nothing is left behind on failure.
pub fn spawn_root(world: &mut World, node: Node, element: UiElement) -> UiResult<EntityId> {
    spawn_with(world, None, node, element)
}

/// Spawns an entity under `parent`.
///
/// # Errors
///
/// Fails if `parent` is dead or the world is full. Nothing is left behind
/// on failure.
pub fn spawn_child(world: &mut World, parent: EntityId, node: Node, element: UiElement) -> UiResult<EntityId> {
    if !world.is_alive(parent) {
        return Err(EcsError::DeadEntity(parent).into());
    }
    spawn_with(world, Some(parent), node, element)
}

/// Despawns `root` and every entity below it. Returns how many entities
/// were despawned.
pub fn despawn_subtree(world: &mut World, root: EntityId) -> usize {
    let mut stack = vec![root];
    let mut count = 0;
    while let Some(entity) = stack.pop() {
        // Collect before despawning: dead entities drop out of children_of
        stack.extend(world.children_of(entity));
        if world.despawn(entity) {
            count += 1;
        }
    }
    count
}

fn spawn_with(world: &mut World, parent: Option<EntityId>, node: Node, element: UiElement) -> UiResult<EntityId> {
    let entity = world.spawn()?;
    if let Err(err) = attach(world, entity, parent, node, element) {
        world.despawn(entity);
        return Err(err.into());
    }
    Ok(entity)
}

fn attach(world: &mut World, entity: EntityId, parent: Option<EntityId>, node: Node, element: UiElement) -> EcsResult<()> {
    if let Some(parent) = parent {
        world.insert(entity, Parent(parent))?;
    }
    world.insert(entity, node)?;
    world.insert(entity, element)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{ContextData, ContextHandle, SchemaBuilder, Shared};
    use crate::element::Element;
    use crate::error::{HookResult, UiError};
    use crate::geometry::Rect;

    struct Empty;

    impl ContextData for Empty {
        fn declare(_schema: &mut SchemaBuilder<Self>) {}
    }

    struct Blank(Shared<Empty>);

    impl Element for Blank {
        fn context(&self) -> ContextHandle {
            self.0.handle()
        }

        fn update(&mut self, _world: &mut World, _entity: EntityId, _layout: &Rect) -> HookResult {
            Ok(())
        }
    }

    fn blank() -> UiElement {
        UiElement::new(Blank(Shared::new(Empty)))
    }

    #[test]
    fn test_spawn_child_sets_parent() {
        let mut world = World::new(8);
        let root = spawn_root(&mut world, Node::new(), blank()).unwrap();
        let child = spawn_child(&mut world, root, Node::new(), blank()).unwrap();

        assert_eq!(world.get::<Parent>(child).map(|p| p.get()), Some(root));
        assert!(world.get::<Parent>(root).is_none());
        assert!(world.has::<UiElement>(child));
    }

    #[test]
    fn test_spawn_under_dead_parent() {
        let mut world = World::new(8);
        let root = spawn_root(&mut world, Node::new(), blank()).unwrap();
        world.despawn(root);

        let err = spawn_child(&mut world, root, Node::new(), blank()).unwrap_err();
        assert!(matches!(err, UiError::Ecs(EcsError::DeadEntity(id)) if id == root));
        assert_eq!(world.alive_count(), 0);
    }

    #[test]
    fn test_full_world() {
        let mut world = World::new(1);
        spawn_root(&mut world, Node::new(), blank()).unwrap();
        assert!(spawn_root(&mut world, Node::new(), blank()).is_err());
    }

    #[test]
    fn test_despawn_subtree() {
        let mut world = World::new(16);
        let root = spawn_root(&mut world, Node::new(), blank()).unwrap();
        let a = spawn_child(&mut world, root, Node::new(), blank()).unwrap();
        let b = spawn_child(&mut world, a, Node::new(), blank()).unwrap();
        let sibling = spawn_root(&mut world, Node::new(), blank()).unwrap();

        assert_eq!(despawn_subtree(&mut world, root), 3);
        assert!(!world.is_alive(b));
        assert!(world.is_alive(sibling));
        assert_eq!(despawn_subtree(&mut world, root), 0);
    }
}

//! # ECS World
//!
//! The central container for all entities and components.
//! Pre-allocates entity slots and per-type component slots.

use std::any::{type_name, TypeId};
use std::collections::HashMap;

use serde::Deserialize;

use super::component::{Component, Parent, MAX_COMPONENT_ID};
use super::entity::{Entity, EntityId, Liveness};
use super::storage::{ComponentStorage, ErasedStorage};
use crate::error::{EcsError, EcsResult};

/// Default entity capacity.
pub const DEFAULT_CAPACITY: usize = 4096;

/// World sizing, usually read from the `[world]` table of the app config.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct WorldConfig {
    /// Maximum number of entities.
    pub capacity: usize,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
        }
    }
}

/// The ECS World - container for all UI state.
///
/// Entity slots and component slots are allocated at creation. Component
/// storages are registered lazily, the first time a type is inserted.
///
/// Despawning is two-phase: [`World::despawn`] makes the entity invisible
/// to queries and lookups, while its components stay readable through
/// [`World::detached_mut`] across one [`World::maintain`]. The second
/// maintenance after the despawn purges them and frees the slot, so a
/// system scheduled before the one that despawned still observes the
/// removal on the following tick.
///
/// # Example
///
/// ```rust,ignore
/// let mut world = World::new(1024);
///
/// let root = world.spawn()?;
/// let child = world.spawn()?;
/// world.insert(child, Parent(root))?;
/// ```
pub struct World {
    /// All entity slots (pre-allocated).
    entities: Box<[Entity]>,
    /// Free list of entity indices for reuse.
    free_indices: Vec<u32>,
    /// Indices despawned since the last maintenance.
    pending_free: Vec<u32>,
    /// Indices despawned before the last maintenance, freed by the next.
    retiring: Vec<u32>,
    /// Number of currently alive entities.
    alive_count: usize,
    /// Maximum capacity.
    capacity: usize,
    /// Component storages by type.
    storages: HashMap<TypeId, Box<dyn ErasedStorage>>,
    /// Registered component names by ID (conflict detection).
    component_names: HashMap<u8, &'static str>,
    /// Bumped on every structural change (spawn, despawn, insert, remove).
    revision: u64,
}

impl World {
    /// Creates a new world with the specified entity capacity.
    ///
    /// # Panics
    ///
    /// Panics if capacity is zero or exceeds `u32::MAX`.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "Capacity must be greater than zero");
        assert!(
            u32::try_from(capacity).is_ok(),
            "Capacity cannot exceed u32::MAX"
        );
        let max_index = u32::try_from(capacity).unwrap_or(u32::MAX);

        let entities = (0..capacity)
            .map(|_| Entity::free())
            .collect::<Vec<_>>()
            .into_boxed_slice();

        // Pre-allocate free list with all indices available, lowest first
        let free_indices: Vec<u32> = (0..max_index).rev().collect();

        Self {
            entities,
            free_indices,
            pending_free: Vec::new(),
            retiring: Vec::new(),
            alive_count: 0,
            capacity,
            storages: HashMap::new(),
            component_names: HashMap::new(),
            revision: 0,
        }
    }

    /// Creates a world sized from configuration.
    #[must_use]
    pub fn with_config(config: &WorldConfig) -> Self {
        Self::new(config.capacity)
    }

    /// Returns the maximum capacity of this world.
    #[inline]
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the number of currently alive entities.
    #[inline]
    #[must_use]
    pub const fn alive_count(&self) -> usize {
        self.alive_count
    }

    /// Structural revision. Changes whenever the set of entities or the
    /// component layout of any entity changes.
    #[inline]
    #[must_use]
    pub const fn revision(&self) -> u64 {
        self.revision
    }

    /// Spawns a new entity, returning its ID.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::CapacityExhausted`] if no slot is free.
    pub fn spawn(&mut self) -> EcsResult<EntityId> {
        let Some(index) = self.free_indices.pop() else {
            return Err(EcsError::CapacityExhausted {
                capacity: self.capacity,
            });
        };

        let entity = &mut self.entities[index as usize];

        // Increment generation to invalidate old references
        let generation = entity.id.generation().wrapping_add(1);
        let new_id = EntityId::new(index, generation);

        *entity = Entity::new(new_id);
        self.alive_count += 1;
        self.revision += 1;

        Ok(new_id)
    }

    /// Despawns an entity.
    ///
    /// The entity immediately stops being alive; its components are
    /// detached and its slot is released by the second [`World::maintain`]
    /// from now.
    ///
    /// Returns `true` if the entity was despawned, `false` if it was already
    /// dead or the ID was stale.
    pub fn despawn(&mut self, id: EntityId) -> bool {
        if !self.is_alive(id) {
            return false;
        }

        let idx = id.index() as usize;
        let entity = &mut self.entities[idx];
        let mask = entity.component_mask;
        entity.liveness = Liveness::Despawned;
        entity.component_mask = 0;

        for storage in self.storages.values_mut() {
            if mask & (1 << storage.component_id()) != 0 {
                storage.detach(idx);
            }
        }

        self.pending_free.push(id.index());
        self.alive_count -= 1;
        self.revision += 1;
        true
    }

    /// Checks if an entity is alive.
    #[inline]
    #[must_use]
    pub fn is_alive(&self, id: EntityId) -> bool {
        self.slot(id).is_some_and(Entity::is_alive)
    }

    /// Gets an entity slot by ID (alive only).
    #[inline]
    #[must_use]
    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.slot(id).filter(|e| e.is_alive())
    }

    /// Iterates over all alive entities in slot order.
    pub fn iter_alive(&self) -> impl Iterator<Item = &Entity> {
        self.entities.iter().filter(|e| e.is_alive())
    }

    /// Registers storage for a component type.
    ///
    /// Called implicitly by [`World::insert`]; calling it up front surfaces
    /// ID conflicts early.
    ///
    /// # Errors
    ///
    /// Fails if the component ID is out of range or already used by a
    /// different type.
    pub fn register<C: Component>(&mut self) -> EcsResult<()> {
        let type_id = TypeId::of::<C>();
        if self.storages.contains_key(&type_id) {
            return Ok(());
        }
        if C::ID > MAX_COMPONENT_ID {
            return Err(EcsError::ComponentIdOutOfRange {
                component: type_name::<C>(),
                id: C::ID,
            });
        }
        if let Some(&existing) = self.component_names.get(&C::ID) {
            return Err(EcsError::ComponentIdConflict {
                component: type_name::<C>(),
                existing,
                id: C::ID,
            });
        }

        self.component_names.insert(C::ID, type_name::<C>());
        self.storages
            .insert(type_id, Box::new(ComponentStorage::<C>::new(self.capacity)));
        Ok(())
    }

    /// Attaches a component, returning the value it replaced.
    ///
    /// # Errors
    ///
    /// Fails if the entity is not alive or the component type cannot be
    /// registered.
    pub fn insert<C: Component>(&mut self, id: EntityId, component: C) -> EcsResult<Option<C>> {
        if !self.is_alive(id) {
            return Err(EcsError::DeadEntity(id));
        }
        self.register::<C>()?;

        let idx = id.index() as usize;
        let previous = self
            .storage_mut::<C>()
            .and_then(|storage| storage.set(idx, component).ok())
            .flatten();

        let entity = &mut self.entities[idx];
        if !entity.has_component(C::ID) {
            entity.add_component(C::ID);
            self.revision += 1;
        }
        Ok(previous)
    }

    /// Detaches a component.
    ///
    /// The value stays readable through [`World::detached_mut`] until the
    /// next maintenance. Returns `true` if the entity carried it.
    pub fn remove<C: Component>(&mut self, id: EntityId) -> bool {
        if !self.has::<C>(id) {
            return false;
        }
        let idx = id.index() as usize;
        self.entities[idx].remove_component(C::ID);
        if let Some(storage) = self.storage_mut::<C>() {
            storage.detach(idx);
        }
        self.revision += 1;
        true
    }

    /// Returns true if the entity is alive and carries the component.
    #[inline]
    #[must_use]
    pub fn has<C: Component>(&self, id: EntityId) -> bool {
        self.entity(id).is_some_and(|e| e.has_component(C::ID))
    }

    /// Gets an attached component.
    #[must_use]
    pub fn get<C: Component>(&self, id: EntityId) -> Option<&C> {
        if !self.has::<C>(id) {
            return None;
        }
        self.storage::<C>()?.get(id.index() as usize)
    }

    /// Gets an attached component mutably.
    pub fn get_mut<C: Component>(&mut self, id: EntityId) -> Option<&mut C> {
        if !self.has::<C>(id) {
            return None;
        }
        self.storage_mut::<C>()?.get_mut(id.index() as usize)
    }

    /// Gets an attached component, treating absence as an error.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::MissingComponent`] if the component is absent or
    /// checked out.
    pub fn component<C: Component>(&self, id: EntityId) -> EcsResult<&C> {
        self.get::<C>(id).ok_or(EcsError::MissingComponent {
            entity: id,
            component: type_name::<C>(),
        })
    }

    /// Mutable form of [`World::component`].
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::MissingComponent`] if the component is absent or
    /// checked out.
    pub fn component_mut<C: Component>(&mut self, id: EntityId) -> EcsResult<&mut C> {
        self.get_mut::<C>(id).ok_or(EcsError::MissingComponent {
            entity: id,
            component: type_name::<C>(),
        })
    }

    /// Gets a component regardless of whether it is attached or detached.
    ///
    /// Works for despawned entities until their slot is freed; meant for
    /// teardown code reacting to removals.
    pub fn detached_mut<C: Component>(&mut self, id: EntityId) -> Option<&mut C> {
        self.slot(id)?;
        self.storage_mut::<C>()?.get_mut(id.index() as usize)
    }

    /// Moves a component out regardless of attachment, leaving the slot
    /// empty. Meant for teardown code.
    pub fn take_detached<C: Component>(&mut self, id: EntityId) -> Option<C> {
        self.slot(id)?;
        self.storage_mut::<C>()?.take(id.index() as usize)
    }

    /// Moves an attached component out of its slot without touching the
    /// entity mask or the revision.
    ///
    /// Queries keep matching the entity. Pair with [`World::checkin`]; while
    /// checked out, lookups of this component return `None`.
    pub fn checkout<C: Component>(&mut self, id: EntityId) -> Option<C> {
        if !self.has::<C>(id) {
            return None;
        }
        self.storage_mut::<C>()?.take(id.index() as usize)
    }

    /// Returns a checked-out component to its slot.
    ///
    /// The value goes back even if the entity was despawned in the
    /// meantime, so teardown can still observe it. Returns `false` (and
    /// drops the value) only if the slot was already released.
    pub fn checkin<C: Component>(&mut self, id: EntityId, component: C) -> bool {
        if self.slot(id).is_none() {
            return false;
        }
        let idx = id.index() as usize;
        self.storage_mut::<C>()
            .is_some_and(|storage| storage.set(idx, component).is_ok())
    }

    /// Returns the direct children of `parent` (entities whose [`Parent`]
    /// edge points at it), in slot order.
    #[must_use]
    pub fn children_of(&self, parent: EntityId) -> Vec<EntityId> {
        let Some(storage) = self.storage::<Parent>() else {
            return Vec::new();
        };
        storage
            .iter()
            .filter(|(_, edge)| edge.get() == parent)
            .filter_map(|(idx, _)| {
                let entity = &self.entities[idx];
                (entity.is_alive() && entity.has_component(Parent::ID)).then_some(entity.id)
            })
            .collect()
    }

    /// Releases slots despawned before the previous maintenance and purges
    /// component values detached before it. Anything despawned or detached
    /// since is kept for one more tick.
    ///
    /// Run once per tick after every system. Returns the number of entity
    /// slots freed.
    pub fn maintain(&mut self) -> usize {
        for storage in self.storages.values_mut() {
            storage.purge_detached(&self.entities);
        }

        let freed = self.retiring.len();
        for index in self.retiring.drain(..) {
            let entity = &mut self.entities[index as usize];
            entity.liveness = Liveness::Free;
            entity.component_mask = 0;
            self.free_indices.push(index);
        }
        std::mem::swap(&mut self.retiring, &mut self.pending_free);
        freed
    }

    /// Slot for a non-free entity with a matching generation.
    fn slot(&self, id: EntityId) -> Option<&Entity> {
        if id.is_null() {
            return None;
        }
        self.entities
            .get(id.index() as usize)
            .filter(|e| e.id == id && e.liveness != Liveness::Free)
    }

    fn storage<C: Component>(&self) -> Option<&ComponentStorage<C>> {
        self.storages
            .get(&TypeId::of::<C>())
            .and_then(|s| s.as_any().downcast_ref::<ComponentStorage<C>>())
    }

    fn storage_mut<C: Component>(&mut self) -> Option<&mut ComponentStorage<C>> {
        self.storages
            .get_mut(&TypeId::of::<C>())
            .and_then(|s| s.as_any_mut().downcast_mut::<ComponentStorage<C>>())
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl std::fmt::Debug for World {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("World")
            .field("capacity", &self.capacity)
            .field("alive_count", &self.alive_count)
            .field("revision", &self.revision)
            .field("component_types", &self.storages.len())
            .finish_non_exhaustive()
    }
}

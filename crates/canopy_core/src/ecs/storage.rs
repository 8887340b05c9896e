//! # Component Storage
//!
//! Pre-allocated slot storage for one component type.
//!
//! The storage uses a dense slot strategy:
//! - One slot per entity index, allocated up front
//! - Access is O(1) via entity index
//! - Removed values are *detached*, not dropped: they stay readable through
//!   the next world maintenance and are purged by the one after, so
//!   teardown code running on the following tick still sees what an
//!   entity carried.

use std::any::Any;

use super::component::Component;
use super::entity::Entity;

/// Pre-allocated storage for a single component type.
///
/// # Example
///
/// ```rust,ignore
/// let mut storage: ComponentStorage<Parent> = ComponentStorage::new(1024);
/// storage.set(0, Parent(root));
/// ```
pub struct ComponentStorage<C: Component> {
    /// One slot per entity index.
    slots: Vec<Option<C>>,
    /// Indices detached since the last purge.
    detached: Vec<u32>,
    /// Indices detached before the last purge, dropped by the next one.
    retiring: Vec<u32>,
}

impl<C: Component> ComponentStorage<C> {
    /// Creates new component storage with the specified capacity.
    ///
    /// # Panics
    ///
    /// Panics if capacity is zero.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "Capacity must be greater than zero");

        let slots = (0..capacity).map(|_| None).collect();

        Self {
            slots,
            detached: Vec::with_capacity(capacity.min(256)),
            retiring: Vec::with_capacity(capacity.min(256)),
        }
    }

    /// Returns the capacity of this storage.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Gets a component by entity index.
    ///
    /// Returns the value whether it is attached or detached; the world is
    /// responsible for checking the entity mask.
    #[inline]
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&C> {
        self.slots.get(index).and_then(Option::as_ref)
    }

    /// Gets a mutable component by entity index.
    #[inline]
    pub fn get_mut(&mut self, index: usize) -> Option<&mut C> {
        self.slots.get_mut(index).and_then(Option::as_mut)
    }

    /// Stores a component, returning whatever occupied the slot before.
    ///
    /// Returns `Err(component)` if the index is out of bounds.
    #[inline]
    pub fn set(&mut self, index: usize, component: C) -> Result<Option<C>, C> {
        match self.slots.get_mut(index) {
            Some(slot) => Ok(slot.replace(component)),
            None => Err(component),
        }
    }

    /// Moves the component out of its slot, leaving it empty.
    #[inline]
    pub fn take(&mut self, index: usize) -> Option<C> {
        self.slots.get_mut(index).and_then(Option::take)
    }

    /// Schedules the value at `index` for purging. It survives the next
    /// purge and is dropped by the one after.
    #[inline]
    pub fn detach(&mut self, index: usize) {
        if let Ok(index) = u32::try_from(index) {
            self.detached.push(index);
        }
    }

    /// Number of values waiting to be purged.
    #[inline]
    #[must_use]
    pub fn detached_len(&self) -> usize {
        self.detached.len() + self.retiring.len()
    }

    /// Drops values detached before the previous purge whose entity no
    /// longer carries the component, then ages the values detached since.
    ///
    /// A value that was re-attached since it was detached is kept.
    pub fn purge_detached(&mut self, entities: &[Entity]) {
        for index in self.retiring.drain(..) {
            // Detached again since: the younger entry decides
            if self.detached.contains(&index) {
                continue;
            }
            let idx = index as usize;
            let reattached = entities
                .get(idx)
                .is_some_and(|e| e.is_alive() && e.has_component(C::ID));
            if !reattached {
                if let Some(slot) = self.slots.get_mut(idx) {
                    *slot = None;
                }
            }
        }
        std::mem::swap(&mut self.retiring, &mut self.detached);
    }

    /// Iterates over all occupied slots with their indices.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &C)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(idx, slot)| slot.as_ref().map(|c| (idx, c)))
    }
}

/// Type-erased view of a [`ComponentStorage`], used by the world to
/// maintain storages it cannot name.
pub(crate) trait ErasedStorage: Any {
    /// Component ID of the stored type.
    fn component_id(&self) -> u8;
    /// Detaches the value at `index` (entity despawned).
    fn detach(&mut self, index: usize);
    /// Purges values detached before the previous purge.
    fn purge_detached(&mut self, entities: &[Entity]);
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<C: Component> ErasedStorage for ComponentStorage<C> {
    fn component_id(&self) -> u8 {
        C::ID
    }

    fn detach(&mut self, index: usize) {
        ComponentStorage::detach(self, index);
    }

    fn purge_detached(&mut self, entities: &[Entity]) {
        ComponentStorage::purge_detached(self, entities);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

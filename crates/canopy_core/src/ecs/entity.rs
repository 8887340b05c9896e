//! # Entity Management
//!
//! Entities are lightweight identifiers consisting of:
//! - An index into component slots
//! - A generation counter for safe reuse

use std::fmt;

/// Unique identifier for an entity.
///
/// The ID is split into two parts:
/// - Lower 32 bits: Index into component slots
/// - Upper 32 bits: Generation counter for detecting stale references
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct EntityId(u64);

impl EntityId {
    /// Creates a new entity ID from index and generation.
    #[inline]
    #[must_use]
    pub const fn new(index: u32, generation: u32) -> Self {
        Self(((generation as u64) << 32) | (index as u64))
    }

    /// Returns the index portion of the entity ID.
    #[inline]
    #[must_use]
    pub const fn index(self) -> u32 {
        self.0 as u32
    }

    /// Returns the generation portion of the entity ID.
    #[inline]
    #[must_use]
    pub const fn generation(self) -> u32 {
        (self.0 >> 32) as u32
    }

    /// Null/invalid entity ID.
    pub const NULL: Self = Self(u64::MAX);

    /// Checks if this entity ID is null/invalid.
    #[inline]
    #[must_use]
    pub const fn is_null(self) -> bool {
        self.0 == u64::MAX
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::NULL
    }
}

impl fmt::Debug for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            f.write_str("EntityId(null)")
        } else {
            write!(f, "EntityId({}v{})", self.index(), self.generation())
        }
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.index(), self.generation())
    }
}

/// Lifecycle of an entity slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Liveness {
    /// Slot is unused and sits on the free list.
    #[default]
    Free,
    /// Entity exists and is visible to queries.
    Alive,
    /// Entity was despawned and its slot is not yet free. Its components stay readable for
    /// teardown through the next world maintenance.
    Despawned,
}

/// Entity slot with its components' validity flags.
///
/// Tracks which components are attached via a bitmask.
#[derive(Clone, Copy, Debug)]
pub struct Entity {
    /// The unique identifier for this entity.
    pub id: EntityId,
    /// Bitmask of attached components (up to 64 component types).
    pub component_mask: u64,
    /// Slot lifecycle state.
    pub liveness: Liveness,
}

impl Entity {
    /// Creates a new live entity.
    #[inline]
    #[must_use]
    pub const fn new(id: EntityId) -> Self {
        Self {
            id,
            component_mask: 0,
            liveness: Liveness::Alive,
        }
    }

    /// Creates an empty entity slot.
    #[inline]
    #[must_use]
    pub const fn free() -> Self {
        Self {
            id: EntityId::NULL,
            component_mask: 0,
            liveness: Liveness::Free,
        }
    }

    /// Returns true if the entity is alive.
    #[inline]
    #[must_use]
    pub const fn is_alive(&self) -> bool {
        matches!(self.liveness, Liveness::Alive)
    }

    /// Checks if this entity has a specific component.
    ///
    /// # Arguments
    ///
    /// * `component_id` - The component type ID (0-63)
    #[inline]
    #[must_use]
    pub const fn has_component(&self, component_id: u8) -> bool {
        (self.component_mask & (1 << component_id)) != 0
    }

    /// Returns true if every bit of `mask` is attached.
    #[inline]
    #[must_use]
    pub const fn has_all(&self, mask: u64) -> bool {
        (self.component_mask & mask) == mask
    }

    /// Adds a component flag to this entity.
    #[inline]
    pub fn add_component(&mut self, component_id: u8) {
        self.component_mask |= 1 << component_id;
    }

    /// Removes a component flag from this entity.
    #[inline]
    pub fn remove_component(&mut self, component_id: u8) {
        self.component_mask &= !(1 << component_id);
    }
}

impl Default for Entity {
    fn default() -> Self {
        Self::free()
    }
}

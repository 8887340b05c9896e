//! # Component System
//!
//! Components are data attached to entities. Each component type owns one
//! bit of the entity mask, which is what queries match against.

use super::entity::EntityId;

/// Highest usable component ID (the mask is a `u64`).
pub const MAX_COMPONENT_ID: u8 = 63;

/// Marker trait for ECS components.
///
/// Unlike hot-path simulation data, UI components own heap data (trait
/// objects, strings, child lists), so the only requirement is `'static`.
///
/// # Example
///
/// ```rust,ignore
/// struct Label {
///     text: String,
/// }
///
/// impl Component for Label {
///     const ID: u8 = 12;
/// }
/// ```
pub trait Component: 'static {
    /// Unique identifier for this component type (0-63).
    ///
    /// This ID is used for the component bitmask in entities.
    const ID: u8;

    /// Mask bit for this component.
    #[inline]
    #[must_use]
    fn mask() -> u64 {
        1 << Self::ID
    }
}

/// Hierarchy edge: the entity this one hangs under.
///
/// Absence means the entity is a root.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Parent(pub EntityId);

impl Parent {
    /// Returns the parent entity.
    #[inline]
    #[must_use]
    pub const fn get(self) -> EntityId {
        self.0
    }
}

impl Component for Parent {
    const ID: u8 = 0;
}

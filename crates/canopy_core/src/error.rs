//! # Core Error Types
//!
//! Errors raised by the entity-component runtime.

use thiserror::Error;

use crate::ecs::EntityId;

/// Errors that can occur in the entity-component runtime.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EcsError {
    /// Every entity slot is in use.
    #[error("world capacity exhausted: {capacity} entities")]
    CapacityExhausted {
        /// Configured capacity.
        capacity: usize,
    },

    /// The entity is dead, despawned, or the ID is stale.
    #[error("entity {0} is not alive")]
    DeadEntity(EntityId),

    /// The entity does not carry the requested component.
    #[error("entity {entity} has no {component} component")]
    MissingComponent {
        /// Entity that was queried.
        entity: EntityId,
        /// Type name of the missing component.
        component: &'static str,
    },

    /// A component type declared an ID outside 0-63.
    #[error("component {component} uses id {id}, maximum is 63")]
    ComponentIdOutOfRange {
        /// Type name of the component.
        component: &'static str,
        /// Declared ID.
        id: u8,
    },

    /// Two component types declared the same ID.
    #[error("component {component} reuses id {id} already taken by {existing}")]
    ComponentIdConflict {
        /// Type name of the new component.
        component: &'static str,
        /// Type name of the registered component.
        existing: &'static str,
        /// Shared ID.
        id: u8,
    },

    /// Invalid configuration file.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for runtime operations.
pub type EcsResult<T> = Result<T, EcsError>;

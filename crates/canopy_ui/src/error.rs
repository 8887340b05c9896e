//! # UI Error Types
//!
//! All errors that can occur while driving elements.

use std::error::Error as StdError;
use std::fmt;

use canopy_core::{EcsError, EntityId};
use thiserror::Error;

/// Error returned by element and attribute hooks.
pub type HookError = Box<dyn StdError + Send + Sync>;

/// Result type for element and attribute hooks.
pub type HookResult = Result<(), HookError>;

/// Errors raised while building a context schema.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ContextError {
    /// A key was declared as both input and output.
    #[error("{type_name}: key `{key}` is declared as both input and output")]
    ConflictingDirection {
        /// Context data type.
        type_name: &'static str,
        /// Offending key.
        key: &'static str,
    },

    /// A key was declared twice in the same direction.
    #[error("{type_name}: key `{key}` is declared twice")]
    DuplicateKey {
        /// Context data type.
        type_name: &'static str,
        /// Offending key.
        key: &'static str,
    },
}

/// Lifecycle point at which a hook ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Before the context is built.
    BeforeInit,
    /// After the context and host are resolved.
    Init,
    /// Host data push (attributes, sharing).
    Share,
    /// Interaction event dispatch.
    Event,
    /// Per-frame update.
    Update,
    /// Teardown.
    Destroy,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::BeforeInit => "before-init",
            Self::Init => "init",
            Self::Share => "share",
            Self::Event => "event",
            Self::Update => "update",
            Self::Destroy => "destroy",
        })
    }
}

/// Errors that can occur in the element subsystem.
#[derive(Error, Debug)]
pub enum UiError {
    /// Component lookup or world operation failed.
    #[error(transparent)]
    Ecs(#[from] EcsError),

    /// An element's context could not be built.
    #[error("context for entity {entity} is invalid: {source}")]
    Context {
        /// Entity whose element failed.
        entity: EntityId,
        /// Schema error.
        #[source]
        source: ContextError,
    },

    /// An element or attribute hook failed.
    #[error("{stage} hook failed on entity {entity}: {source}")]
    Hook {
        /// Entity whose element failed.
        entity: EntityId,
        /// Where it failed.
        stage: Stage,
        /// Error returned by the hook.
        #[source]
        source: HookError,
    },

    /// Elements kept spawning elements past the configured pass limit.
    #[error("settle limit exceeded: elements still spawning after {limit} passes")]
    SettleLimitExceeded {
        /// Configured limit.
        limit: usize,
    },

    /// Invalid configuration file.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl UiError {
    /// Wraps a hook error with its entity and stage.
    #[must_use]
    pub fn hook(entity: EntityId, stage: Stage, source: HookError) -> Self {
        Self::Hook {
            entity,
            stage,
            source,
        }
    }
}

/// Result type for element subsystem operations.
pub type UiResult<T> = Result<T, UiError>;

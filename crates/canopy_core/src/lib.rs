//! # Canopy Core
//!
//! Entity-component runtime for the Canopy UI layer:
//! - Generational entities with component masks
//! - Type-indexed component storage that keeps removed data readable
//!   until the end of the tick
//! - Reactive queries with add/remove deltas
//! - A per-tick system schedule
//!
//! ## Example
//!
//! ```rust,ignore
//! use canopy_core::{Parent, ReactiveQuery, World};
//!
//! let mut world = World::new(1024);
//! let root = world.spawn()?;
//! let child = world.spawn()?;
//! world.insert(child, Parent(root))?;
//!
//! let mut query = ReactiveQuery::of::<Parent>();
//! query.refresh(&world);
//! assert_eq!(query.drain_delta().added, vec![child]);
//! ```

#![deny(unsafe_code)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod ecs;
pub mod error;
pub mod schedule;

pub use ecs::{
    Component, ComponentStorage, Entity, EntityId, Liveness, Parent, QueryDelta, ReactiveQuery,
    World, WorldConfig, DEFAULT_CAPACITY, MAX_COMPONENT_ID,
};
pub use error::{EcsError, EcsResult};
pub use schedule::{Schedule, System, SystemError, TickStats};

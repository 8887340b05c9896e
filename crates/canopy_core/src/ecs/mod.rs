//! # Entity Component System
//!
//! The runtime the UI layer is built on.
//!
//! ## Design Philosophy
//!
//! - Entity slots and component slots are allocated at world creation
//! - Entity IDs are indices with generation counters
//! - Removal is observable: despawned data lives until maintenance
//! - Queries are diffed against a structural revision, not rebuilt blindly

mod component;
mod entity;
mod query;
mod storage;
mod world;

pub use component::{Component, Parent, MAX_COMPONENT_ID};
pub use entity::{Entity, EntityId, Liveness};
pub use query::{QueryDelta, ReactiveQuery};
pub use storage::ComponentStorage;
pub use world::{World, WorldConfig, DEFAULT_CAPACITY};

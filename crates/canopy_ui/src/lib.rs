//! # Canopy UI Elements
//!
//! The element/context layer of the Canopy UI:
//! - Every visible node is an entity carrying a [`Node`]
//! - A [`UiElement`] plugs behavior and a view into that node
//! - Elements exchange data with their nearest [`Host`] ancestor through
//!   typed contexts and bindings
//! - The [`ElementManager`] runs the lifecycle and settles cascades of
//!   elements spawning elements inside a single tick
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                       ELEMENT PIPELINE                        │
//! ├──────────────────────────────────────────────────────────────┤
//! │  Query delta → on_added / on_removed → bindings → update     │
//! │       ↓               ↓                    ↓          ↓      │
//! │  settle loop     Host::get + share    ContextRef   Node size │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Data Flow
//!
//! Data only flows down: a host's context feeds reference bindings on the
//! elements below it, never the other way round.
//!
//! ```rust,ignore
//! let document = DocumentState::new();
//! let mut manager = ElementManager::new(document.clone(), InteractionEvents::new());
//!
//! let panel = tree::spawn_root(&mut world, Node::new(), UiElement::new(Panel::new()))?;
//! world.insert(panel, Host)?;
//! tree::spawn_child(
//!     &mut world,
//!     panel,
//!     Node::new(),
//!     UiElement::new(Label::default())
//!         .value(label::COLOR, Color::WHITE)
//!         .bind(label::TEXT, |p: &PanelProps| p.title.clone()),
//! )?;
//!
//! manager.update(&mut world)?;
//! ```

#![deny(unsafe_code)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod binding;
pub mod config;
pub mod context;
pub mod document;
pub mod element;
pub mod error;
pub mod events;
pub mod geometry;
pub mod host;
pub mod manager;
pub mod node;
pub mod tree;

pub use binding::{Binding, BindingKind};
pub use config::{CanopyConfig, ElementManagerConfig, DEFAULT_MAX_SETTLE_PASSES};
pub use context::{
    ContextData, ContextHandle, ContextRef, ContextSchema, Direction, Input, Output, Property,
    SchemaBuilder, Shared,
};
pub use document::DocumentState;
pub use element::{Attribute, Capabilities, Element, UiElement};
pub use error::{ContextError, HookError, HookResult, Stage, UiError, UiResult};
pub use events::{Cursor, EventSubscriptions, InteractionEvent, InteractionEvents, PointerButton};
pub use geometry::{Rect, Size};
pub use host::Host;
pub use manager::{ElementManager, ManagerStats, SettleReport};
pub use node::{Container, DrawableId, LayoutStyle, Node};

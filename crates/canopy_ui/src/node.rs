//! UI scene nodes.
//!
//! Every visible UI entity carries a [`Node`]: a handle to its drawable
//! container in the scene graph, a visibility flag, the rectangle the layout
//! solver produced for it last, and a style slot that elements may write an
//! intrinsic size into.

use std::sync::atomic::{AtomicU64, Ordering};

use canopy_core::Component;

use crate::geometry::{Rect, Size};

static NEXT_DRAWABLE: AtomicU64 = AtomicU64::new(1);

/// Handle to a drawable in the scene graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DrawableId(pub u64);

impl DrawableId {
    /// Allocates a process-unique drawable handle.
    #[must_use]
    pub fn next() -> Self {
        Self(NEXT_DRAWABLE.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the raw ID value.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

/// Drawable container: an ordered list of child drawables. Later children
/// paint above earlier ones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Container {
    id: DrawableId,
    children: Vec<DrawableId>,
}

impl Container {
    /// Creates an empty container with a fresh handle.
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: DrawableId::next(),
            children: Vec::new(),
        }
    }

    /// The container's own drawable handle.
    #[must_use]
    pub const fn id(&self) -> DrawableId {
        self.id
    }

    /// Inserts a child at `index`, clamped to the child count.
    pub fn insert_child(&mut self, index: usize, child: DrawableId) {
        let index = index.min(self.children.len());
        self.children.insert(index, child);
    }

    /// Appends a child on top of the existing ones.
    pub fn push_child(&mut self, child: DrawableId) {
        self.children.push(child);
    }

    /// Removes a child. Returns `false` if it was not present.
    pub fn remove_child(&mut self, child: DrawableId) -> bool {
        match self.children.iter().position(|&c| c == child) {
            Some(pos) => {
                self.children.remove(pos);
                true
            }
            None => false,
        }
    }

    /// Children in paint order.
    #[must_use]
    pub fn children(&self) -> &[DrawableId] {
        &self.children
    }
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}

/// Layout inputs for a node.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LayoutStyle {
    /// Explicit width, if any.
    pub width: Option<f32>,
    /// Explicit height, if any.
    pub height: Option<f32>,
    /// Size reported by the element itself; overrides explicit sizes.
    pub intrinsic: Option<Size>,
}

impl LayoutStyle {
    /// Writes an intrinsic size override. Returns `true` if it changed.
    pub fn set_intrinsic_size(&mut self, size: Size) -> bool {
        if self.intrinsic == Some(size) {
            return false;
        }
        self.intrinsic = Some(size);
        true
    }

    /// Size the layout solver should use, intrinsic first.
    #[must_use]
    pub fn resolved_size(&self) -> Option<Size> {
        self.intrinsic.or_else(|| match (self.width, self.height) {
            (Some(width), Some(height)) => Some(Size::new(width, height)),
            _ => None,
        })
    }
}

/// Entity-attached UI node state.
#[derive(Debug, Clone, Default)]
pub struct Node {
    /// Drawable container for this node and its element's view.
    pub container: Container,
    /// Hidden nodes skip event dispatch and element updates.
    pub hidden: bool,
    /// Rectangle computed by the layout solver on its last run.
    pub layout: Rect,
    /// Layout inputs.
    pub style: LayoutStyle,
    /// Set when the style changed since layout last ran.
    pub style_dirty: bool,
}

impl Node {
    /// Creates a visible node with an empty container.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: start hidden.
    #[must_use]
    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    /// Visibility predicate.
    #[must_use]
    pub const fn is_hidden(&self) -> bool {
        self.hidden
    }

    /// Projects an element's intrinsic size into the style slot.
    pub fn apply_intrinsic_size(&mut self, size: Size) {
        if self.style.set_intrinsic_size(size) {
            self.style_dirty = true;
        }
    }
}

impl Component for Node {
    const ID: u8 = 1;
}

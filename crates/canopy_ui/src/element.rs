//! Elements and the [`UiElement`] component.
//!
//! An [`Element`] is the behavior-plus-view plugged into a node. The
//! [`UiElement`] component owns one element instance together with:
//!
//! - the bindings that feed its context each tick,
//! - optional [`Attribute`]s riding along with it,
//! - the [`ContextRef`] built when the element is added,
//! - the host entity resolved at the same time.
//!
//! Optional hooks are advertised through [`Capabilities`], read once when
//! the component is built.

use std::fmt;

use canopy_core::{Component, EntityId, World};

use crate::binding::Binding;
use crate::context::{ContextHandle, ContextRef, Input, Property};
use crate::error::{ContextError, HookResult, Stage, UiError, UiResult};
use crate::events::InteractionEvent;
use crate::geometry::{Rect, Size};
use crate::node::DrawableId;

/// Optional hooks an element implements (bitfield).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capabilities(u32);

impl Capabilities {
    /// Calls [`Element::on_before_init`].
    pub const BEFORE_INIT: u32 = 1 << 0;
    /// Calls [`Element::on_init`].
    pub const INIT: u32 = 1 << 1;
    /// Calls [`Element::on_destroy`].
    pub const DESTROY: u32 = 1 << 2;
    /// Subscribes to interaction events and calls [`Element::on_event`].
    pub const EVENTS: u32 = 1 << 3;
    /// Calls [`Element::share`] with the host context.
    pub const SHARE: u32 = 1 << 4;

    /// No optional hooks.
    pub const NONE: Self = Self(0);

    /// Every optional hook.
    pub const ALL: Self =
        Self(Self::BEFORE_INIT | Self::INIT | Self::DESTROY | Self::EVENTS | Self::SHARE);

    /// Creates a set from raw flag bits.
    #[must_use]
    pub const fn new(bits: u32) -> Self {
        Self(bits)
    }

    /// Returns the set with `flag` added.
    #[must_use]
    pub const fn with(self, flag: u32) -> Self {
        Self(self.0 | flag)
    }

    /// Returns true if the flag is set.
    #[inline]
    #[must_use]
    pub const fn has(self, flag: u32) -> bool {
        (self.0 & flag) != 0
    }

    /// Raw flag bits.
    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }
}

/// Behavior and view attached to a UI node.
///
/// Only `context` and `update` are required. The lifecycle hooks default to
/// no-ops and are only called when the matching [`Capabilities`] flag is
/// returned from [`Element::capabilities`].
pub trait Element: 'static {
    /// Context exposing the element's bindable state.
    fn context(&self) -> ContextHandle;

    /// Per-frame update, skipped while the node is hidden.
    ///
    /// # Errors
    ///
    /// Any error aborts the current tick.
    fn update(&mut self, world: &mut World, entity: EntityId, layout: &Rect) -> HookResult;

    /// Drawable inserted as the node's first child when the element is
    /// added.
    fn view(&self) -> Option<DrawableId> {
        None
    }

    /// Intrinsic size to project into the node's layout style.
    fn size(&self) -> Option<Size> {
        None
    }

    /// Optional hooks this element implements.
    fn capabilities(&self) -> Capabilities {
        Capabilities::NONE
    }

    /// Runs before the context is built.
    ///
    /// # Errors
    ///
    /// Any error aborts the current tick.
    fn on_before_init(&mut self, _world: &mut World, _entity: EntityId) -> HookResult {
        Ok(())
    }

    /// Runs once the context and host are resolved. May spawn further
    /// elements; they are settled within the same tick.
    ///
    /// # Errors
    ///
    /// Any error aborts the current tick.
    fn on_init(&mut self, _world: &mut World, _entity: EntityId) -> HookResult {
        Ok(())
    }

    /// Runs when the entity leaves the element set.
    ///
    /// # Errors
    ///
    /// Any error aborts the current tick.
    fn on_destroy(&mut self, _world: &mut World, _entity: EntityId) -> HookResult {
        Ok(())
    }

    /// Receives an interaction event queued for the node.
    ///
    /// # Errors
    ///
    /// Any error aborts the current tick.
    fn on_event(&mut self, _world: &mut World, _entity: EntityId, _event: &InteractionEvent) -> HookResult {
        Ok(())
    }

    /// Reads data from the host context, after bindings are resolved.
    ///
    /// # Errors
    ///
    /// Any error aborts the current tick.
    fn share(&mut self, _host: &ContextRef) -> HookResult {
        Ok(())
    }
}

/// Behavior add-on carried by a [`UiElement`].
///
/// Attribute hooks always run, before the element's own.
pub trait Attribute: 'static {
    /// Runs before the element's context is built.
    ///
    /// # Errors
    ///
    /// Any error aborts the current tick.
    fn on_before_init(&mut self, _world: &mut World, _entity: EntityId) -> HookResult {
        Ok(())
    }

    /// Runs after the element's context and host are resolved.
    ///
    /// # Errors
    ///
    /// Any error aborts the current tick.
    fn on_init(&mut self, _world: &mut World, _entity: EntityId) -> HookResult {
        Ok(())
    }

    /// Runs on teardown.
    ///
    /// # Errors
    ///
    /// Any error aborts the current tick.
    fn on_destroy(&mut self, _world: &mut World, _entity: EntityId) -> HookResult {
        Ok(())
    }

    /// Runs every tick after bindings are resolved.
    ///
    /// # Errors
    ///
    /// Any error aborts the current tick.
    fn update(&mut self, _context: &mut ContextRef) -> HookResult {
        Ok(())
    }
}

/// Component wrapping an element instance.
///
/// # Example
///
/// ```rust,ignore
/// let element = UiElement::new(Label::default())
///     .value(TEXT, "hello".to_string())
///     .bind(WIDTH, |panel: &PanelProps| panel.column_width);
/// world.insert(entity, element)?;
/// ```
pub struct UiElement {
    instance: Box<dyn Element>,
    bindings: Vec<Binding>,
    attributes: Vec<Box<dyn Attribute>>,
    context: Option<ContextRef>,
    host: Option<EntityId>,
    capabilities: Capabilities,
}

impl UiElement {
    /// Wraps an element instance.
    #[must_use]
    pub fn new(instance: impl Element) -> Self {
        let capabilities = instance.capabilities();
        Self {
            instance: Box::new(instance),
            bindings: Vec::new(),
            attributes: Vec::new(),
            context: None,
            host: None,
            capabilities,
        }
    }

    /// Binds a local property to a value read from the host context.
    #[must_use]
    pub fn bind<T: 'static, H: 'static, V, P, F>(self, prop: P, path: F) -> Self
    where
        V: PartialEq + 'static,
        P: Property<T, V> + 'static,
        F: Fn(&H) -> V + 'static,
    {
        self.with_binding(Binding::reference::<T, H, V, P, F>(prop, path))
    }

    /// Binds an input to a callback sampled every tick.
    #[must_use]
    pub fn bind_fn<T: 'static, V, F>(self, prop: Input<T, V>, sample: F) -> Self
    where
        V: PartialEq + 'static,
        F: FnMut() -> V + 'static,
    {
        self.with_binding(Binding::function(prop, sample))
    }

    /// Binds an input to a constant.
    #[must_use]
    pub fn value<T: 'static, V>(self, prop: Input<T, V>, literal: V) -> Self
    where
        V: Clone + PartialEq + 'static,
    {
        self.with_binding(Binding::value(prop, literal))
    }

    /// Adds a prebuilt binding.
    #[must_use]
    pub fn with_binding(mut self, binding: Binding) -> Self {
        self.bindings.push(binding);
        self
    }

    /// Adds an attribute.
    #[must_use]
    pub fn with_attribute(mut self, attribute: impl Attribute) -> Self {
        self.attributes.push(Box::new(attribute));
        self
    }

    /// Resolves every binding into the context. Returns `true` if any value
    /// changed. Does nothing before the element has been added.
    pub fn resolve(&mut self, host: Option<&ContextRef>) -> bool {
        let Some(context) = self.context.as_mut() else {
            return false;
        };
        let mut changed = false;
        for binding in &mut self.bindings {
            changed |= binding.resolve(context, host);
        }
        changed
    }

    /// The context, once the element has been added.
    #[must_use]
    pub const fn context(&self) -> Option<&ContextRef> {
        self.context.as_ref()
    }

    /// Host resolved when the element was added.
    #[must_use]
    pub const fn host(&self) -> Option<EntityId> {
        self.host
    }

    /// Capabilities read from the instance at construction.
    #[must_use]
    pub const fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    /// Bindings in resolution order.
    #[must_use]
    pub fn bindings(&self) -> &[Binding] {
        &self.bindings
    }

    /// Number of attributes.
    #[must_use]
    pub fn attribute_count(&self) -> usize {
        self.attributes.len()
    }

    /// The wrapped instance.
    #[must_use]
    pub fn instance(&self) -> &dyn Element {
        self.instance.as_ref()
    }

    pub(crate) fn build_context(&mut self) -> Result<(), ContextError> {
        self.context = Some(ContextRef::from_handle(self.instance.context())?);
        Ok(())
    }

    pub(crate) fn set_host(&mut self, host: Option<EntityId>) {
        self.host = host;
    }

    /// Host→element push: bindings, attribute updates, then `share`.
    /// Returns the context's changed flag, clearing it.
    pub(crate) fn push_from_host(&mut self, entity: EntityId, host: Option<&ContextRef>) -> UiResult<bool> {
        self.resolve(host);
        let Some(context) = self.context.as_mut() else {
            return Ok(false);
        };
        for attribute in &mut self.attributes {
            attribute
                .update(context)
                .map_err(|e| UiError::hook(entity, Stage::Share, e))?;
        }
        if let Some(host) = host {
            if self.capabilities.has(Capabilities::SHARE) {
                self.instance
                    .share(host)
                    .map_err(|e| UiError::hook(entity, Stage::Share, e))?;
            }
        }
        Ok(context.take_changed())
    }

    pub(crate) fn before_init(&mut self, world: &mut World, entity: EntityId) -> UiResult<()> {
        for attribute in &mut self.attributes {
            attribute
                .on_before_init(world, entity)
                .map_err(|e| UiError::hook(entity, Stage::BeforeInit, e))?;
        }
        if self.capabilities.has(Capabilities::BEFORE_INIT) {
            self.instance
                .on_before_init(world, entity)
                .map_err(|e| UiError::hook(entity, Stage::BeforeInit, e))?;
        }
        Ok(())
    }

    pub(crate) fn init(&mut self, world: &mut World, entity: EntityId) -> UiResult<()> {
        for attribute in &mut self.attributes {
            attribute
                .on_init(world, entity)
                .map_err(|e| UiError::hook(entity, Stage::Init, e))?;
        }
        if self.capabilities.has(Capabilities::INIT) {
            self.instance
                .on_init(world, entity)
                .map_err(|e| UiError::hook(entity, Stage::Init, e))?;
        }
        Ok(())
    }

    pub(crate) fn destroy(&mut self, world: &mut World, entity: EntityId) -> UiResult<()> {
        for attribute in &mut self.attributes {
            attribute
                .on_destroy(world, entity)
                .map_err(|e| UiError::hook(entity, Stage::Destroy, e))?;
        }
        if self.capabilities.has(Capabilities::DESTROY) {
            self.instance
                .on_destroy(world, entity)
                .map_err(|e| UiError::hook(entity, Stage::Destroy, e))?;
        }
        Ok(())
    }

    pub(crate) fn event(&mut self, world: &mut World, entity: EntityId, event: &InteractionEvent) -> UiResult<()> {
        self.instance
            .on_event(world, entity, event)
            .map_err(|e| UiError::hook(entity, Stage::Event, e))
    }

    pub(crate) fn update(&mut self, world: &mut World, entity: EntityId, layout: &Rect) -> UiResult<()> {
        self.instance
            .update(world, entity, layout)
            .map_err(|e| UiError::hook(entity, Stage::Update, e))
    }
}

impl Component for UiElement {
    const ID: u8 = 2;
}

impl fmt::Debug for UiElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UiElement")
            .field("bindings", &self.bindings)
            .field("attributes", &self.attributes.len())
            .field("context", &self.context)
            .field("host", &self.host)
            .field("capabilities", &self.capabilities)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::BindingKind;
    use crate::context::{ContextData, Output, SchemaBuilder, Shared};
    use std::cell::Cell;
    use std::rc::Rc;

    #[derive(Default)]
    struct Meter {
        caption: String,
        ratio: f32,
        shown: u32,
    }

    const CAPTION: Input<Meter, String> = Input::new("caption", |m| m.caption.clone(), |m, v| m.caption = v);
    const RATIO: Input<Meter, f32> = Input::new("ratio", |m| m.ratio, |m, v| m.ratio = v);
    const SHOWN: Output<Meter, u32> = Output::new("shown", |m| m.shown, |m, v| m.shown = v);

    impl ContextData for Meter {
        fn declare(schema: &mut SchemaBuilder<Self>) {
            schema.input(CAPTION).input(RATIO).output(SHOWN);
        }
    }

    struct Board {
        heading: String,
    }

    impl ContextData for Board {
        fn declare(_schema: &mut SchemaBuilder<Self>) {}
    }

    struct MeterElement {
        props: Shared<Meter>,
        shared_calls: Rc<Cell<u32>>,
    }

    impl Element for MeterElement {
        fn context(&self) -> ContextHandle {
            self.props.handle()
        }

        fn update(&mut self, _world: &mut World, _entity: EntityId, _layout: &Rect) -> HookResult {
            Ok(())
        }

        fn capabilities(&self) -> Capabilities {
            Capabilities::NONE.with(Capabilities::SHARE)
        }

        fn share(&mut self, host: &ContextRef) -> HookResult {
            self.shared_calls.set(self.shared_calls.get() + 1);
            if host.read(|b: &Board| b.heading.is_empty()) == Some(true) {
                return Err("empty heading".into());
            }
            Ok(())
        }
    }

    struct CaptionUpper;

    impl Attribute for CaptionUpper {
        fn update(&mut self, context: &mut ContextRef) -> HookResult {
            if let Some(caption) = context.get_input(&CAPTION) {
                context.set_input(&CAPTION, caption.to_uppercase());
            }
            Ok(())
        }
    }

    fn meter() -> (Shared<Meter>, Rc<Cell<u32>>, MeterElement) {
        let props = Shared::new(Meter::default());
        let calls = Rc::new(Cell::new(0));
        let element = MeterElement {
            props: props.clone(),
            shared_calls: Rc::clone(&calls),
        };
        (props, calls, element)
    }

    fn board(heading: &str) -> ContextRef {
        ContextRef::from_handle(Shared::new(Board { heading: heading.into() }).handle()).unwrap()
    }

    #[test]
    fn test_capabilities_flags() {
        let caps = Capabilities::NONE.with(Capabilities::INIT).with(Capabilities::EVENTS);
        assert!(caps.has(Capabilities::INIT));
        assert!(caps.has(Capabilities::EVENTS));
        assert!(!caps.has(Capabilities::DESTROY));
        assert!(Capabilities::ALL.has(Capabilities::SHARE));
        assert_eq!(Capabilities::new(caps.bits()), caps);
    }

    #[test]
    fn test_builder_collects_bindings_in_order() {
        let (_, _, instance) = meter();
        let element = UiElement::new(instance)
            .value(CAPTION, "cpu".to_string())
            .bind_fn(RATIO, || 0.5)
            .bind(SHOWN, |_: &Board| 1_u32);

        let kinds: Vec<_> = element.bindings().iter().map(Binding::kind).collect();
        assert_eq!(kinds, vec![BindingKind::Value, BindingKind::Function, BindingKind::Reference]);
        assert!(element.capabilities().has(Capabilities::SHARE));
        assert!(element.context().is_none());
    }

    #[test]
    fn test_resolve_before_add_is_inert() {
        let (props, _, instance) = meter();
        let mut element = UiElement::new(instance).value(CAPTION, "cpu".to_string());
        assert!(!element.resolve(None));
        assert!(props.borrow().caption.is_empty());
    }

    #[test]
    fn test_push_runs_bindings_then_attributes_then_share() {
        let (props, calls, instance) = meter();
        let mut element = UiElement::new(instance)
            .bind(CAPTION, |b: &Board| b.heading.clone())
            .with_attribute(CaptionUpper);
        element.build_context().unwrap();

        let host = board("disk");
        let entity = EntityId::new(1, 1);
        assert!(element.push_from_host(entity, Some(&host)).unwrap());
        assert_eq!(props.borrow().caption, "DISK");
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_share_skipped_without_host() {
        let (_, calls, instance) = meter();
        let mut element = UiElement::new(instance);
        element.build_context().unwrap();
        assert!(!element.push_from_host(EntityId::new(1, 1), None).unwrap());
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn test_share_error_carries_stage() {
        let (_, _, instance) = meter();
        let mut element = UiElement::new(instance);
        element.build_context().unwrap();

        let err = element
            .push_from_host(EntityId::new(2, 1), Some(&board("")))
            .unwrap_err();
        assert!(matches!(err, UiError::Hook { stage: Stage::Share, .. }));
    }
}

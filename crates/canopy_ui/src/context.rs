//! Element contexts.
//!
//! An element exposes its bindable state as a *context*: a plain struct
//! implementing [`ContextData`], shared between the element and the
//! manager through a [`Shared`] handle. Each context type declares its
//! properties once, as typed accessor pairs:
//!
//! ```rust,ignore
//! struct LabelProps { text: String, width: f32 }
//!
//! const TEXT: Input<LabelProps, String> =
//!     Input::new("text", |p| p.text.clone(), |p, v| p.text = v);
//! const WIDTH: Output<LabelProps, f32> =
//!     Output::new("width", |p| p.width, |p, v| p.width = v);
//!
//! impl ContextData for LabelProps {
//!     fn declare(schema: &mut SchemaBuilder<Self>) {
//!         schema.input(TEXT).output(WIDTH);
//!     }
//! }
//! ```
//!
//! Declarations are validated and cached per type the first time a
//! [`ContextRef`] for that type is built.

use std::any::{type_name, Any, TypeId};
use std::cell::{Ref, RefCell, RefMut};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::marker::PhantomData;
use std::rc::Rc;

use crate::error::ContextError;

/// Data direction of a context property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Written by bindings, read by the element.
    Input,
    /// Written by the element, read by descendants.
    Output,
}

/// A typed, named property of context type `T` holding a `V`.
pub trait Property<T, V> {
    /// Property name, unique within `T`.
    fn name(&self) -> &'static str;
    /// Declared direction.
    fn direction(&self) -> Direction;
    /// Reads the current value.
    fn read(&self, target: &T) -> V;
    /// Writes a new value.
    fn write(&self, target: &mut T, value: V);
}

macro_rules! accessor {
    ($(#[$meta:meta])* $name:ident, $direction:expr) => {
        $(#[$meta])*
        pub struct $name<T, V> {
            name: &'static str,
            get: fn(&T) -> V,
            set: fn(&mut T, V),
        }

        impl<T, V> $name<T, V> {
            /// Creates a property from a getter/setter pair.
            #[must_use]
            pub const fn new(name: &'static str, get: fn(&T) -> V, set: fn(&mut T, V)) -> Self {
                Self { name, get, set }
            }
        }

        impl<T, V> Clone for $name<T, V> {
            fn clone(&self) -> Self {
                *self
            }
        }

        impl<T, V> Copy for $name<T, V> {}

        impl<T, V> fmt::Debug for $name<T, V> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_tuple(stringify!($name)).field(&self.name).finish()
            }
        }

        impl<T, V> Property<T, V> for $name<T, V> {
            fn name(&self) -> &'static str {
                self.name
            }

            fn direction(&self) -> Direction {
                $direction
            }

            fn read(&self, target: &T) -> V {
                (self.get)(target)
            }

            fn write(&self, target: &mut T, value: V) {
                (self.set)(target, value);
            }
        }
    };
}

accessor!(
    /// Input property: the only kind value and function bindings can target.
    Input,
    Direction::Input
);

accessor!(
    /// Output property: data an element publishes for its subtree.
    Output,
    Direction::Output
);

/// Context types declare their properties once per type.
pub trait ContextData: Any {
    /// Lists every input and output of the type.
    fn declare(schema: &mut SchemaBuilder<Self>)
    where
        Self: Sized;
}

/// Collects property declarations for one context type.
pub struct SchemaBuilder<T> {
    inputs: Vec<&'static str>,
    outputs: Vec<&'static str>,
    _marker: PhantomData<fn(&T)>,
}

impl<T> SchemaBuilder<T> {
    fn new() -> Self {
        Self {
            inputs: Vec::new(),
            outputs: Vec::new(),
            _marker: PhantomData,
        }
    }

    /// Declares an input.
    pub fn input<V>(&mut self, prop: Input<T, V>) -> &mut Self {
        self.inputs.push(prop.name());
        self
    }

    /// Declares an output.
    pub fn output<V>(&mut self, prop: Output<T, V>) -> &mut Self {
        self.outputs.push(prop.name());
        self
    }
}

/// Validated input/output key sets for one context type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextSchema {
    type_name: &'static str,
    inputs: HashSet<&'static str>,
    outputs: HashSet<&'static str>,
}

impl ContextSchema {
    /// Builds (or fetches the cached) schema for `T`.
    ///
    /// # Errors
    ///
    /// Fails if a key is declared twice or in both directions.
    pub fn of<T: ContextData>() -> Result<Rc<Self>, ContextError> {
        let key = TypeId::of::<T>();
        if let Some(cached) = SCHEMAS.with(|cache| cache.borrow().get(&key).cloned()) {
            return cached;
        }
        // Built outside the cache borrow: `declare` may touch other schemas
        let built = Self::build::<T>().map(Rc::new);
        SCHEMAS.with(|cache| cache.borrow_mut().insert(key, built.clone()));
        built
    }

    fn build<T: ContextData>() -> Result<Self, ContextError> {
        let mut builder = SchemaBuilder::<T>::new();
        T::declare(&mut builder);
        let type_name = type_name::<T>();

        let mut inputs = HashSet::with_capacity(builder.inputs.len());
        for key in builder.inputs {
            if !inputs.insert(key) {
                return Err(ContextError::DuplicateKey { type_name, key });
            }
        }

        let mut outputs = HashSet::with_capacity(builder.outputs.len());
        for key in builder.outputs {
            if inputs.contains(key) {
                return Err(ContextError::ConflictingDirection { type_name, key });
            }
            if !outputs.insert(key) {
                return Err(ContextError::DuplicateKey { type_name, key });
            }
        }

        tracing::trace!("context schema for {}: {} inputs, {} outputs", type_name, inputs.len(), outputs.len());
        Ok(Self {
            type_name,
            inputs,
            outputs,
        })
    }

    /// Name of the context type.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Declared input keys.
    #[must_use]
    pub const fn inputs(&self) -> &HashSet<&'static str> {
        &self.inputs
    }

    /// Declared output keys.
    #[must_use]
    pub const fn outputs(&self) -> &HashSet<&'static str> {
        &self.outputs
    }
}

type SchemaCache = HashMap<TypeId, Result<Rc<ContextSchema>, ContextError>>;

thread_local! {
    /// Schemas by context type, built on first use.
    static SCHEMAS: RefCell<SchemaCache> = RefCell::new(HashMap::new());
}

/// Shared ownership of a context struct, held by the element and lent to
/// the manager.
#[derive(Debug)]
pub struct Shared<T>(Rc<RefCell<T>>);

impl<T: ContextData> Shared<T> {
    /// Wraps a context value.
    #[must_use]
    pub fn new(value: T) -> Self {
        Self(Rc::new(RefCell::new(value)))
    }

    /// Immutable borrow.
    ///
    /// # Panics
    ///
    /// Panics if the context is currently mutably borrowed.
    #[must_use]
    pub fn borrow(&self) -> Ref<'_, T> {
        self.0.borrow()
    }

    /// Mutable borrow.
    ///
    /// # Panics
    ///
    /// Panics if the context is currently borrowed.
    #[must_use]
    pub fn borrow_mut(&self) -> RefMut<'_, T> {
        self.0.borrow_mut()
    }

    /// Type-erased handle for [`crate::Element::context`].
    #[must_use]
    pub fn handle(&self) -> ContextHandle {
        let target: Rc<RefCell<dyn Any>> = self.0.clone();
        ContextHandle {
            target,
            schema: ContextSchema::of::<T>,
        }
    }
}

impl<T> Clone for Shared<T> {
    fn clone(&self) -> Self {
        Self(Rc::clone(&self.0))
    }
}

/// Type-erased context returned by an element.
#[derive(Clone)]
pub struct ContextHandle {
    target: Rc<RefCell<dyn Any>>,
    schema: fn() -> Result<Rc<ContextSchema>, ContextError>,
}

impl fmt::Debug for ContextHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextHandle").finish_non_exhaustive()
    }
}

/// Read/write view over an element's context with its declared key sets.
#[derive(Clone)]
pub struct ContextRef {
    target: Rc<RefCell<dyn Any>>,
    schema: Rc<ContextSchema>,
    changed: bool,
}

impl ContextRef {
    /// Builds a context view from an element's handle.
    ///
    /// # Errors
    ///
    /// Fails if the context type's declarations are inconsistent.
    pub fn from_handle(handle: ContextHandle) -> Result<Self, ContextError> {
        let schema = (handle.schema)()?;
        Ok(Self {
            target: handle.target,
            schema,
            changed: false,
        })
    }

    /// The validated schema.
    #[must_use]
    pub fn schema(&self) -> &ContextSchema {
        &self.schema
    }

    /// Declared input keys.
    #[must_use]
    pub fn inputs(&self) -> &HashSet<&'static str> {
        self.schema.inputs()
    }

    /// Declared output keys.
    #[must_use]
    pub fn outputs(&self) -> &HashSet<&'static str> {
        self.schema.outputs()
    }

    /// Returns true if `key` is a declared input.
    #[must_use]
    pub fn is_input(&self, key: &str) -> bool {
        self.schema.inputs.contains(key)
    }

    /// Returns true if `key` is a declared output.
    #[must_use]
    pub fn is_output(&self, key: &str) -> bool {
        self.schema.outputs.contains(key)
    }

    /// Reads a property. `None` if the context is not a `T` or is
    /// currently mutably borrowed.
    pub fn get_input<T: 'static, V>(&self, prop: &impl Property<T, V>) -> Option<V> {
        self.read(|target: &T| prop.read(target))
    }

    /// Writes a property unless it already holds an equal value.
    ///
    /// Sets the changed flag and returns `true` only when a write happened.
    pub fn set_input<T: 'static, V: PartialEq>(&mut self, prop: &impl Property<T, V>, value: V) -> bool {
        let Ok(mut guard) = self.target.try_borrow_mut() else {
            return false;
        };
        let Some(target) = guard.downcast_mut::<T>() else {
            return false;
        };
        if prop.read(target) == value {
            return false;
        }
        prop.write(target, value);
        self.changed = true;
        true
    }

    /// Runs `f` against the context if it is a `T`.
    pub fn read<T: 'static, R>(&self, f: impl FnOnce(&T) -> R) -> Option<R> {
        let guard = self.target.try_borrow().ok()?;
        guard.downcast_ref::<T>().map(f)
    }

    /// Returns true if a write changed a value since the flag was last
    /// taken.
    #[must_use]
    pub const fn changed(&self) -> bool {
        self.changed
    }

    /// Returns and clears the changed flag.
    pub fn take_changed(&mut self) -> bool {
        std::mem::take(&mut self.changed)
    }

    /// Returns true if both views point at the same context object.
    #[must_use]
    pub fn same_target(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.target, &other.target)
    }
}

impl fmt::Debug for ContextRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextRef")
            .field("type", &self.schema.type_name)
            .field("inputs", &self.schema.inputs)
            .field("outputs", &self.schema.outputs)
            .field("changed", &self.changed)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Props {
        text: String,
        count: u32,
    }

    const TEXT: Input<Props, String> = Input::new("text", |p| p.text.clone(), |p, v| p.text = v);
    const COUNT: Output<Props, u32> = Output::new("count", |p| p.count, |p, v| p.count = v);

    impl ContextData for Props {
        fn declare(schema: &mut SchemaBuilder<Self>) {
            schema.input(TEXT).output(COUNT);
        }
    }

    struct Conflicted {
        value: u8,
    }

    const AS_INPUT: Input<Conflicted, u8> = Input::new("value", |c| c.value, |c, v| c.value = v);
    const AS_OUTPUT: Output<Conflicted, u8> = Output::new("value", |c| c.value, |c, v| c.value = v);

    impl ContextData for Conflicted {
        fn declare(schema: &mut SchemaBuilder<Self>) {
            schema.input(AS_INPUT).output(AS_OUTPUT);
        }
    }

    struct Doubled {
        value: u8,
    }

    const DOUBLED: Input<Doubled, u8> = Input::new("value", |c| c.value, |c, v| c.value = v);

    impl ContextData for Doubled {
        fn declare(schema: &mut SchemaBuilder<Self>) {
            schema.input(DOUBLED).input(DOUBLED);
        }
    }

    #[test]
    fn test_schema_sets() {
        let shared = Shared::new(Props::default());
        let ctx = ContextRef::from_handle(shared.handle()).unwrap();
        assert!(ctx.is_input("text"));
        assert!(ctx.is_output("count"));
        assert!(!ctx.is_input("count"));
        assert_eq!(ctx.inputs().len(), 1);
    }

    #[test]
    fn test_set_input_tracks_changes() {
        let shared = Shared::new(Props::default());
        let mut ctx = ContextRef::from_handle(shared.handle()).unwrap();

        assert!(ctx.set_input(&TEXT, "hello".to_string()));
        assert!(ctx.changed());
        assert_eq!(ctx.get_input(&TEXT).as_deref(), Some("hello"));
        assert_eq!(shared.borrow().text, "hello");

        assert!(ctx.take_changed());
        assert!(!ctx.set_input(&TEXT, "hello".to_string()));
        assert!(!ctx.changed());
    }

    #[test]
    fn test_conflicting_direction_rejected() {
        let shared = Shared::new(Conflicted { value: 0 });
        let err = ContextRef::from_handle(shared.handle()).unwrap_err();
        assert!(matches!(err, ContextError::ConflictingDirection { key: "value", .. }));
    }

    #[test]
    fn test_duplicate_key_rejected() {
        let shared = Shared::new(Doubled { value: 0 });
        let err = ContextRef::from_handle(shared.handle()).unwrap_err();
        assert!(matches!(err, ContextError::DuplicateKey { key: "value", .. }));
    }

    #[test]
    fn test_wrong_type_is_ignored() {
        let props = Shared::new(Props::default());
        let mut ctx = ContextRef::from_handle(props.handle()).unwrap();

        assert!(ctx.get_input(&DOUBLED).is_none());
        assert!(!ctx.set_input(&DOUBLED, 3));
        assert!(!ctx.changed());
    }

    #[test]
    fn test_same_target() {
        let shared = Shared::new(Props::default());
        let a = ContextRef::from_handle(shared.handle()).unwrap();
        let b = ContextRef::from_handle(shared.clone().handle()).unwrap();
        assert!(a.same_target(&b));
    }
}

//! Bindings: declarative rules for how a value reaches a context input.
//!
//! Bindings are resolved once per entity per tick, after lifecycle
//! dispatch. All three variants write through
//! [`ContextRef::set_input`], so re-resolving an unchanged value is free of
//! side effects.
//!
//! Data flows host→local only. A reference binding never writes into its
//! host.

use std::fmt;

use crate::context::{ContextRef, Input, Property};

/// Variant tag of a binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingKind {
    /// Constant literal.
    Value,
    /// Sampled from a callback every tick.
    Function,
    /// Read from the host context.
    Reference,
}

type LocalWrite = Box<dyn FnMut(&mut ContextRef) -> bool>;
type HostWrite = Box<dyn Fn(&mut ContextRef, &ContextRef) -> bool>;

/// One binding held by a [`crate::UiElement`].
pub enum Binding {
    /// Writes a literal into an input.
    Value {
        /// Target key.
        key: &'static str,
        /// Applies the literal.
        apply: LocalWrite,
    },
    /// Writes the result of a zero-argument callback into an input.
    Function {
        /// Target key.
        key: &'static str,
        /// Samples and applies the callback.
        apply: LocalWrite,
    },
    /// Writes a value read from the host context into a local property.
    Reference {
        /// Target key.
        key: &'static str,
        /// Reads the host and applies to the local context.
        apply: HostWrite,
    },
}

impl Binding {
    /// Literal binding.
    pub fn value<T: 'static, V>(prop: Input<T, V>, literal: V) -> Self
    where
        V: Clone + PartialEq + 'static,
    {
        Self::Value {
            key: prop.name(),
            apply: Box::new(move |local: &mut ContextRef| local.set_input(&prop, literal.clone())),
        }
    }

    /// Callback binding; `sample` runs on every resolution.
    pub fn function<T: 'static, V, F>(prop: Input<T, V>, mut sample: F) -> Self
    where
        V: PartialEq + 'static,
        F: FnMut() -> V + 'static,
    {
        Self::Function {
            key: prop.name(),
            apply: Box::new(move |local: &mut ContextRef| local.set_input(&prop, sample())),
        }
    }

    /// Host reference binding.
    ///
    /// `path` walks the host's context (of type `H`) to the value. The
    /// local side may be an input or an output. If the host context is not
    /// an `H`, resolution does nothing.
    pub fn reference<T: 'static, H: 'static, V, P, F>(prop: P, path: F) -> Self
    where
        V: PartialEq + 'static,
        P: Property<T, V> + 'static,
        F: Fn(&H) -> V + 'static,
    {
        Self::Reference {
            key: prop.name(),
            apply: Box::new(move |local: &mut ContextRef, host: &ContextRef| {
                match host.read(|h: &H| path(h)) {
                    Some(value) => local.set_input(&prop, value),
                    None => false,
                }
            }),
        }
    }

    /// Local key this binding writes.
    #[must_use]
    pub const fn key(&self) -> &'static str {
        match self {
            Self::Value { key, .. } | Self::Function { key, .. } | Self::Reference { key, .. } => *key,
        }
    }

    /// Variant tag.
    #[must_use]
    pub const fn kind(&self) -> BindingKind {
        match self {
            Self::Value { .. } => BindingKind::Value,
            Self::Function { .. } => BindingKind::Function,
            Self::Reference { .. } => BindingKind::Reference,
        }
    }

    /// Resolves the binding into `local`. Returns `true` if a value changed.
    ///
    /// Reference bindings need a host; without one they do nothing.
    pub fn resolve(&mut self, local: &mut ContextRef, host: Option<&ContextRef>) -> bool {
        match self {
            Self::Value { apply, .. } | Self::Function { apply, .. } => apply(local),
            Self::Reference { apply, .. } => host.is_some_and(|host| apply(local, host)),
        }
    }
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("kind", &self.kind())
            .field("key", &self.key())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{ContextData, Output, SchemaBuilder, Shared};
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    #[derive(Default)]
    struct Gauge {
        label: String,
        level: f32,
        peak: f32,
    }

    const LABEL: Input<Gauge, String> = Input::new("label", |g| g.label.clone(), |g, v| g.label = v);
    const LEVEL: Input<Gauge, f32> = Input::new("level", |g| g.level, |g, v| g.level = v);
    const PEAK: Output<Gauge, f32> = Output::new("peak", |g| g.peak, |g, v| g.peak = v);

    impl ContextData for Gauge {
        fn declare(schema: &mut SchemaBuilder<Self>) {
            schema.input(LABEL).input(LEVEL).output(PEAK);
        }
    }

    struct Panel {
        title: String,
        load: f32,
    }

    impl ContextData for Panel {
        fn declare(_schema: &mut SchemaBuilder<Self>) {}
    }

    struct Unrelated;

    impl ContextData for Unrelated {
        fn declare(_schema: &mut SchemaBuilder<Self>) {}
    }

    fn gauge() -> (Shared<Gauge>, ContextRef) {
        let shared = Shared::new(Gauge::default());
        let ctx = ContextRef::from_handle(shared.handle()).unwrap();
        (shared, ctx)
    }

    fn panel() -> ContextRef {
        let shared = Shared::new(Panel {
            title: "cpu".into(),
            load: 0.75,
        });
        ContextRef::from_handle(shared.handle()).unwrap()
    }

    #[test]
    fn test_value_binding_is_idempotent() {
        let (shared, mut ctx) = gauge();
        let mut binding = Binding::value(LABEL, "load".to_string());
        assert_eq!(binding.kind(), BindingKind::Value);
        assert_eq!(binding.key(), "label");

        assert!(binding.resolve(&mut ctx, None));
        assert_eq!(shared.borrow().label, "load");
        ctx.take_changed();

        assert!(!binding.resolve(&mut ctx, None));
        assert!(!ctx.changed());
    }

    #[test]
    fn test_function_binding_samples_every_resolution() {
        let (shared, mut ctx) = gauge();
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let mut binding = Binding::function(LEVEL, move || rng.gen_range(0.0..1.0_f32));

        let mut seen = Vec::new();
        for _ in 0..4 {
            binding.resolve(&mut ctx, None);
            seen.push(shared.borrow().level);
        }
        assert!(seen.iter().all(|v| (0.0..1.0).contains(v)));
        assert!(seen.windows(2).any(|w| (w[0] - w[1]).abs() > f32::EPSILON));
    }

    #[test]
    fn test_reference_binding_reads_host() {
        let (shared, mut ctx) = gauge();
        let host = panel();
        let mut title = Binding::reference(LABEL, |p: &Panel| p.title.clone());
        let mut load = Binding::reference(LEVEL, |p: &Panel| p.load);

        assert!(title.resolve(&mut ctx, Some(&host)));
        assert!(load.resolve(&mut ctx, Some(&host)));
        assert_eq!(shared.borrow().label, "cpu");
        assert!((shared.borrow().level - 0.75).abs() < f32::EPSILON);
    }

    #[test]
    fn test_reference_binding_may_target_output() {
        let (shared, mut ctx) = gauge();
        let host = panel();
        let mut binding = Binding::reference(PEAK, |p: &Panel| p.load);

        assert!(binding.resolve(&mut ctx, Some(&host)));
        assert!((shared.borrow().peak - 0.75).abs() < f32::EPSILON);
    }

    #[test]
    fn test_reference_without_host_never_writes() {
        let (shared, mut ctx) = gauge();
        let mut binding = Binding::reference(LABEL, |p: &Panel| p.title.clone());

        assert!(!binding.resolve(&mut ctx, None));
        assert!(shared.borrow().label.is_empty());
        assert!(!ctx.changed());
    }

    #[test]
    fn test_reference_with_foreign_host_type_is_inert() {
        let (_shared, mut ctx) = gauge();
        let host = ContextRef::from_handle(Shared::new(Unrelated).handle()).unwrap();
        let mut binding = Binding::reference(LABEL, |p: &Panel| p.title.clone());

        assert!(!binding.resolve(&mut ctx, Some(&host)));
    }
}

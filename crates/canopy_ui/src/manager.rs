//! # Element Manager
//!
//! Drives every entity carrying both [`Node`] and [`UiElement`].
//!
//! ```text
//! update(world):
//! ┌──────────────────────────────────────────────────────────────┐
//! │ pass:                                                        │
//! │   1. snapshot the match set                                  │
//! │   2. drain deltas: on_removed(...), then on_added(...)       │
//! │        └─ add handlers may spawn more elements               │
//! │   3. tick every snapshot entity that still matches           │
//! │        bindings → attributes → share                         │
//! │        hidden? stop : events → update → intrinsic size       │
//! │ repeat while the pass added anything (bounded)               │
//! │ then tear down whatever the last pass removed                │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Elements spawned by an add handler are not ticked by the pass that
//! spawned them; the next pass picks them up, so a whole cascade settles
//! inside one `update` call. The number of passes is capped by
//! [`ElementManagerConfig::max_settle_passes`].
//!
//! If a hook fails part-way through a pass, the adds and removals not yet
//! handled are kept and handled first on the next `update`. Only
//! initialized elements are ever ticked.

use std::collections::HashSet;

use canopy_core::{EntityId, QueryDelta, ReactiveQuery, System, SystemError, World};

use crate::config::ElementManagerConfig;
use crate::context::ContextRef;
use crate::document::DocumentState;
use crate::element::{Capabilities, UiElement};
use crate::error::{UiError, UiResult};
use crate::events::{EventSubscriptions, InteractionEvents};
use crate::host::Host;
use crate::node::Node;

/// What one [`ElementManager::update`] call did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SettleReport {
    /// Passes run.
    pub passes: usize,
    /// Elements initialized.
    pub added: usize,
    /// Elements torn down.
    pub removed: usize,
    /// `Element::update` calls.
    pub updated: usize,
    /// Ticks in which bindings or attributes changed a context value.
    pub changed: usize,
}

/// Lifetime counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ManagerStats {
    /// Elements currently initialized.
    pub elements: usize,
    /// Event cursors currently held.
    pub live_subscriptions: usize,
    /// Event cursors released so far.
    pub released_subscriptions: u64,
    /// Settle passes run so far.
    pub total_passes: u64,
    /// Completed `update` calls.
    pub updates: u64,
}

#[derive(Debug, Clone, Copy, Default)]
struct TickOutcome {
    changed: bool,
    updated: bool,
}

/// Reactive system running the element lifecycle.
#[derive(Debug)]
pub struct ElementManager {
    query: ReactiveQuery,
    document: DocumentState,
    subscriptions: EventSubscriptions,
    config: ElementManagerConfig,
    /// Entities whose add handler ran and whose remove handler has not.
    active: HashSet<EntityId>,
    /// Deltas drained but not handled because a hook failed.
    retry: QueryDelta,
    /// Per-pass snapshot, reused between passes.
    scratch: Vec<EntityId>,
    total_passes: u64,
    updates: u64,
}

impl ElementManager {
    /// Creates a manager with default configuration.
    #[must_use]
    pub fn new(document: DocumentState, events: InteractionEvents) -> Self {
        Self::build(document, events, ElementManagerConfig::default())
    }

    /// Creates a manager with explicit configuration.
    ///
    /// # Errors
    ///
    /// Returns [`UiError::InvalidConfig`] if the configuration does not
    /// validate.
    pub fn with_config(
        document: DocumentState,
        events: InteractionEvents,
        config: ElementManagerConfig,
    ) -> UiResult<Self> {
        Ok(Self::build(document, events, config.validate()?))
    }

    fn build(document: DocumentState, events: InteractionEvents, config: ElementManagerConfig) -> Self {
        Self {
            query: ReactiveQuery::of2::<Node, UiElement>(),
            document,
            subscriptions: EventSubscriptions::new(events),
            scratch: Vec::with_capacity(config.scratch_capacity),
            config,
            active: HashSet::new(),
            retry: QueryDelta::default(),
            total_passes: 0,
            updates: 0,
        }
    }

    /// Document state bumped on every add.
    #[must_use]
    pub const fn document(&self) -> &DocumentState {
        &self.document
    }

    /// Interaction hub the manager reads events from.
    #[must_use]
    pub const fn events(&self) -> &InteractionEvents {
        self.subscriptions.events()
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &ElementManagerConfig {
        &self.config
    }

    /// Returns true if the entity's element has been initialized and not
    /// yet torn down.
    #[must_use]
    pub fn is_active(&self, entity: EntityId) -> bool {
        self.active.contains(&entity)
    }

    /// Lifetime counters.
    #[must_use]
    pub fn stats(&self) -> ManagerStats {
        ManagerStats {
            elements: self.active.len(),
            live_subscriptions: self.subscriptions.live(),
            released_subscriptions: self.subscriptions.released(),
            total_passes: self.total_passes,
            updates: self.updates,
        }
    }

    /// Runs settle passes until one adds nothing, then tears down elements
    /// removed during the last pass.
    ///
    /// # Errors
    ///
    /// Returns the first hook, context or lookup failure, or
    /// [`UiError::SettleLimitExceeded`] if elements are still being added
    /// after `max_settle_passes` passes. The rest of the tick is skipped.
    pub fn update(&mut self, world: &mut World) -> UiResult<SettleReport> {
        let limit = self.config.max_settle_passes;
        let mut report = SettleReport::default();

        self.query.refresh(world);
        loop {
            if report.passes == limit {
                tracing::warn!(
                    "settle limit of {} passes exceeded ({} elements added this tick)",
                    limit,
                    report.added
                );
                return Err(UiError::SettleLimitExceeded { limit });
            }
            report.passes += 1;
            self.total_passes += 1;

            let added = self.run_pass(world, &mut report)?;
            tracing::trace!("settle pass {}: {} added", report.passes, added);
            if added == 0 {
                break;
            }
            // Add handlers may have spawned elements; make them visible now
            self.query.resync(world);
        }

        self.settle_removals(world, limit, &mut report)?;
        self.updates += 1;
        Ok(report)
    }

    /// Tears down elements removed by hooks of the last pass, so teardown
    /// never waits for a later tick. Additions stay queued for the next
    /// `update`.
    fn settle_removals(&mut self, world: &mut World, limit: usize, report: &mut SettleReport) -> UiResult<()> {
        for _ in 0..limit {
            self.query.refresh(world);
            let removed = self.query.drain_removed();
            if removed.is_empty() {
                return Ok(());
            }
            self.remove_all(world, &removed, report)?;
        }
        Ok(())
    }

    fn run_pass(&mut self, world: &mut World, report: &mut SettleReport) -> UiResult<usize> {
        let mut snapshot = std::mem::take(&mut self.scratch);
        snapshot.clear();
        snapshot.extend_from_slice(self.query.entities());

        let result = self.process(world, &snapshot, report);
        self.scratch = snapshot;
        result
    }

    fn process(&mut self, world: &mut World, snapshot: &[EntityId], report: &mut SettleReport) -> UiResult<usize> {
        // Leftovers from a failed tick go first, in their original order
        let mut delta = std::mem::take(&mut self.retry);
        let fresh = self.query.drain_delta();
        delta.removed.extend(fresh.removed);
        delta.added.extend(fresh.added);

        if let Err(err) = self.remove_all(world, &delta.removed, report) {
            self.retry.added = delta.added;
            return Err(err);
        }
        let added = self.add_all(world, &delta.added)?;
        report.added += added;

        for &entity in snapshot {
            // Earlier handlers in this pass may have removed it, and a
            // failed tick may have left it uninitialized
            if !self.active.contains(&entity) || !self.query.matches(world, entity) {
                continue;
            }
            let outcome = self.tick(world, entity)?;
            report.changed += usize::from(outcome.changed);
            report.updated += usize::from(outcome.updated);
        }

        Ok(added)
    }

    /// Runs remove handlers in order. On failure the entities after the
    /// failing one are queued for the next `update`.
    fn remove_all(&mut self, world: &mut World, removed: &[EntityId], report: &mut SettleReport) -> UiResult<()> {
        for (i, &entity) in removed.iter().enumerate() {
            match self.on_removed(world, entity) {
                Ok(torn_down) => report.removed += usize::from(torn_down),
                Err(err) => {
                    self.retry.removed.extend_from_slice(&removed[i + 1..]);
                    return Err(err);
                }
            }
        }
        Ok(())
    }

    /// Runs add handlers in order, returning how many initialized. On
    /// failure the entities after the failing one are queued for the next
    /// `update`.
    fn add_all(&mut self, world: &mut World, added: &[EntityId]) -> UiResult<usize> {
        let mut count = 0;
        for (i, &entity) in added.iter().enumerate() {
            match self.on_added(world, entity) {
                Ok(initialized) => count += usize::from(initialized),
                Err(err) => {
                    self.retry.added.extend_from_slice(&added[i + 1..]);
                    return Err(err);
                }
            }
        }
        Ok(count)
    }

    /// Initializes a newly matching element. Returns `false` if the entity
    /// stopped matching before its turn.
    fn on_added(&mut self, world: &mut World, entity: EntityId) -> UiResult<bool> {
        if !self.query.matches(world, entity) {
            return Ok(false);
        }
        let Some(mut element) = world.checkout::<UiElement>(entity) else {
            return Ok(false);
        };
        self.active.insert(entity);

        let result = Self::initialize(world, entity, &mut element);
        world.checkin(entity, element);
        result?;

        self.document.mark_changed();
        tracing::debug!("element added on {}", entity);
        Ok(true)
    }

    fn initialize(world: &mut World, entity: EntityId, element: &mut UiElement) -> UiResult<()> {
        element.before_init(world, entity)?;

        if let Some(view) = element.instance().view() {
            // First child: child node containers must paint above the view
            world.component_mut::<Node>(entity)?.container.insert_child(0, view);
        }

        element
            .build_context()
            .map_err(|source| UiError::Context { entity, source })?;

        let host = Host::get(world, entity);
        element.set_host(host);
        if let Some(host) = host {
            let host_context = Self::host_context(world, host);
            element.push_from_host(entity, host_context.as_ref())?;
        }

        element.init(world, entity)
    }

    /// Tears down an element that left the match set. Returns `false` if it
    /// was never initialized.
    fn on_removed(&mut self, world: &mut World, entity: EntityId) -> UiResult<bool> {
        if !self.active.remove(&entity) {
            return Ok(false);
        }

        let Some(mut element) = world.take_detached::<UiElement>(entity) else {
            self.subscriptions.release(entity);
            tracing::warn!("element on {} was purged before teardown", entity);
            return Ok(true);
        };

        if let Some(view) = element.instance().view() {
            if let Some(node) = world.detached_mut::<Node>(entity) {
                node.container.remove_child(view);
            }
        }
        self.subscriptions.release(entity);

        let result = element.destroy(world, entity);
        // Only the node went away: the element stays on the entity
        if world.has::<UiElement>(entity) {
            world.checkin(entity, element);
        }
        result?;

        tracing::debug!("element removed from {}", entity);
        Ok(true)
    }

    fn tick(&mut self, world: &mut World, entity: EntityId) -> UiResult<TickOutcome> {
        let Some(mut element) = world.checkout::<UiElement>(entity) else {
            return Ok(TickOutcome::default());
        };
        let result = self.tick_element(world, entity, &mut element);
        world.checkin(entity, element);
        result
    }

    fn tick_element(&mut self, world: &mut World, entity: EntityId, element: &mut UiElement) -> UiResult<TickOutcome> {
        let host_context = element.host().and_then(|host| Self::host_context(world, host));
        let changed = element.push_from_host(entity, host_context.as_ref())?;

        let node = world.component::<Node>(entity)?;
        if node.is_hidden() {
            return Ok(TickOutcome { changed, updated: false });
        }
        let layout = node.layout;

        if element.capabilities().has(Capabilities::EVENTS) {
            for event in self.subscriptions.read(entity) {
                element.event(world, entity, &event)?;
            }
        }

        element.update(world, entity, &layout)?;

        if let Some(size) = element.instance().size() {
            world.component_mut::<Node>(entity)?.apply_intrinsic_size(size);
        }

        Ok(TickOutcome { changed, updated: true })
    }

    /// Context of the host's element, if the host still carries one.
    fn host_context(world: &World, host: EntityId) -> Option<ContextRef> {
        world.get::<UiElement>(host).and_then(UiElement::context).cloned()
    }
}

impl System for ElementManager {
    fn name(&self) -> &'static str {
        "element_manager"
    }

    fn run(&mut self, world: &mut World) -> Result<(), SystemError> {
        self.update(world)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{ContextData, ContextHandle, Input, SchemaBuilder, Shared};
    use crate::element::Element;
    use crate::error::HookResult;
    use crate::geometry::Rect;

    #[derive(Default)]
    struct Counter {
        label: String,
        updates: u32,
    }

    const LABEL: Input<Counter, String> = Input::new("label", |c| c.label.clone(), |c, v| c.label = v);

    impl ContextData for Counter {
        fn declare(schema: &mut SchemaBuilder<Self>) {
            schema.input(LABEL);
        }
    }

    struct CounterElement(Shared<Counter>);

    impl Element for CounterElement {
        fn context(&self) -> ContextHandle {
            self.0.handle()
        }

        fn update(&mut self, _world: &mut World, _entity: EntityId, _layout: &Rect) -> HookResult {
            self.0.borrow_mut().updates += 1;
            Ok(())
        }
    }

    fn spawn(world: &mut World, element: UiElement) -> EntityId {
        let entity = world.spawn().unwrap();
        world.insert(entity, Node::new()).unwrap();
        world.insert(entity, element).unwrap();
        entity
    }

    fn manager() -> ElementManager {
        ElementManager::new(DocumentState::new(), InteractionEvents::new())
    }

    #[test]
    fn test_single_element_settles_in_two_passes() {
        let mut world = World::new(16);
        let mut manager = manager();
        let props = Shared::new(Counter::default());
        let entity = spawn(&mut world, UiElement::new(CounterElement(props.clone())));

        let report = manager.update(&mut world).unwrap();
        assert_eq!(report.added, 1);
        assert_eq!(report.passes, 2);
        assert!(manager.is_active(entity));
        assert!(props.borrow().updates >= 1);
        assert_eq!(manager.document().revision(), 1);
    }

    #[test]
    fn test_quiet_tick_runs_one_pass() {
        let mut world = World::new(16);
        let mut manager = manager();
        let props = Shared::new(Counter::default());
        spawn(&mut world, UiElement::new(CounterElement(props.clone())));
        manager.update(&mut world).unwrap();

        let before = props.borrow().updates;
        let report = manager.update(&mut world).unwrap();
        assert_eq!(report.passes, 1);
        assert_eq!(report.added, 0);
        assert_eq!(report.updated, 1);
        assert_eq!(props.borrow().updates, before + 1);
    }

    #[test]
    fn test_missing_node_is_not_an_element() {
        let mut world = World::new(16);
        let mut manager = manager();
        let entity = world.spawn().unwrap();
        world
            .insert(entity, UiElement::new(CounterElement(Shared::new(Counter::default()))))
            .unwrap();

        let report = manager.update(&mut world).unwrap();
        assert_eq!(report.added, 0);
        assert!(!manager.is_active(entity));
    }

    #[test]
    fn test_node_removal_tears_down_but_keeps_element() {
        let mut world = World::new(16);
        let mut manager = manager();
        let entity = spawn(
            &mut world,
            UiElement::new(CounterElement(Shared::new(Counter::default()))).value(LABEL, "x".to_string()),
        );
        manager.update(&mut world).unwrap();

        world.remove::<Node>(entity);
        let report = manager.update(&mut world).unwrap();
        assert_eq!(report.removed, 1);
        assert!(!manager.is_active(entity));
        assert!(world.get::<UiElement>(entity).is_some());
    }

    #[test]
    fn test_with_config_rejects_zero_passes() {
        let config = ElementManagerConfig {
            max_settle_passes: 0,
            ..ElementManagerConfig::default()
        };
        let err = ElementManager::with_config(DocumentState::new(), InteractionEvents::new(), config).unwrap_err();
        assert!(matches!(err, UiError::InvalidConfig(_)));
    }

    #[test]
    fn test_runs_as_system() {
        let mut world = World::new(16);
        let mut schedule = canopy_core::Schedule::new();
        schedule.add_system(manager());
        let props = Shared::new(Counter::default());
        spawn(&mut world, UiElement::new(CounterElement(props.clone())).value(LABEL, "ok".to_string()));

        schedule.run(&mut world).unwrap();
        assert_eq!(props.borrow().label, "ok");
    }
}

//! # Per-Tick System Schedule
//!
//! ```text
//! Tick N:
//! ┌───────────────────────────────────────────────┐
//! │ 1. Run systems in registration order          │
//! │    └─ each sees the world as left by the last │
//! │ 2. Maintain the world                         │
//! │    └─ free slots despawned last tick          │
//! └───────────────────────────────────────────────┘
//! ```
//!
//! A failing system aborts the tick: later systems do not run and the world
//! is not maintained, so removals stay observable on the next attempt.

use std::error::Error;
use std::time::{Duration, Instant};

use crate::ecs::World;

/// Boxed error returned by a system.
pub type SystemError = Box<dyn Error + Send + Sync>;

/// A unit of per-tick work.
pub trait System {
    /// Short name used in logs and stats.
    fn name(&self) -> &'static str;

    /// Runs one tick of the system.
    ///
    /// # Errors
    ///
    /// Any error aborts the rest of the tick.
    fn run(&mut self, world: &mut World) -> Result<(), SystemError>;
}

/// Timing for one tick.
#[derive(Clone, Debug, Default)]
pub struct TickStats {
    /// Wall time per system, in registration order.
    pub systems: Vec<(&'static str, Duration)>,
    /// Total tick time, maintenance included.
    pub total: Duration,
    /// Entity slots freed by maintenance.
    pub freed: usize,
}

/// Ordered list of systems run once per tick.
#[derive(Default)]
pub struct Schedule {
    systems: Vec<Box<dyn System>>,
    ticks: u64,
}

impl Schedule {
    /// Creates an empty schedule.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a system; systems run in the order they were added.
    pub fn add_system<S: System + 'static>(&mut self, system: S) -> &mut Self {
        self.systems.push(Box::new(system));
        self
    }

    /// Number of registered systems.
    #[must_use]
    pub fn len(&self) -> usize {
        self.systems.len()
    }

    /// Returns true if no systems are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.systems.is_empty()
    }

    /// Number of completed ticks.
    #[must_use]
    pub const fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Runs every system once, then maintains the world.
    ///
    /// # Errors
    ///
    /// Returns the first system error; the tick stops there.
    pub fn run(&mut self, world: &mut World) -> Result<TickStats, SystemError> {
        let start = Instant::now();
        let mut stats = TickStats {
            systems: Vec::with_capacity(self.systems.len()),
            ..TickStats::default()
        };

        for system in &mut self.systems {
            let system_start = Instant::now();
            if let Err(err) = system.run(world) {
                tracing::warn!("system {} failed on tick {}: {}", system.name(), self.ticks, err);
                return Err(err);
            }
            stats.systems.push((system.name(), system_start.elapsed()));
        }

        stats.freed = world.maintain();
        stats.total = start.elapsed();
        self.ticks += 1;
        Ok(stats)
    }
}

impl std::fmt::Debug for Schedule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<_> = self.systems.iter().map(|s| s.name()).collect();
        f.debug_struct("Schedule")
            .field("systems", &names)
            .field("ticks", &self.ticks)
            .finish()
    }
}

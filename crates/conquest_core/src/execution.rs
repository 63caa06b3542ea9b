//! The execution contract.
//!
//! An execution is a process, not an entity: one construction, one
//! warship, one nuke in flight, one AI brain. The engine calls
//! [`Execution::init`] once, then [`Execution::tick`] every tick while
//! [`Execution::is_active`] holds, then drops it.
//!
//! Executions never push into the engine queue directly. New work goes
//! through the [`Scheduler`] handed to `tick`; the engine starts it on the
//! next tick, never re-entrantly within the current one.

use std::fmt;

use crate::error::Result;
use crate::game::Game;
use crate::Tick;

/// A stateful process driven once per tick.
pub trait Execution: fmt::Debug {
    /// Bind to the world. Called once, on the tick the execution starts.
    ///
    /// # Errors
    ///
    /// Only for programmer errors; unmet preconditions deactivate instead.
    fn init(&mut self, game: &mut Game, ticks: Tick) -> Result<()>;

    /// Advance one tick.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::GameError::NotInitialized`] when called
    /// before [`Execution::init`]. Unmet preconditions are silent skips.
    fn tick(&mut self, game: &mut Game, ticks: Tick, scheduler: &mut Scheduler) -> Result<()>;

    /// False once finished; the engine drops inactive executions.
    fn is_active(&self) -> bool;

    /// Whether this execution runs while players are still spawning.
    fn active_during_spawn_phase(&self) -> bool {
        false
    }

    /// Short name for logs.
    fn name(&self) -> &'static str;
}

/// Queue of executions created during the current tick.
#[derive(Default)]
pub struct Scheduler {
    pending: Vec<Box<dyn Execution>>,
}

impl Scheduler {
    /// Create an empty scheduler.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start `execution` on the next tick.
    pub fn schedule(&mut self, execution: impl Execution + 'static) {
        self.pending.push(Box::new(execution));
    }

    /// Start an already boxed execution on the next tick.
    pub fn schedule_boxed(&mut self, execution: Box<dyn Execution>) {
        self.pending.push(execution);
    }

    /// Take everything scheduled so far, in scheduling order.
    pub fn drain(&mut self) -> Vec<Box<dyn Execution>> {
        std::mem::take(&mut self.pending)
    }

    /// Number of pending executions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Returns true if nothing is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Names of pending executions, in order.
    #[must_use]
    pub fn pending_names(&self) -> Vec<&'static str> {
        self.pending.iter().map(|e| e.name()).collect()
    }
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("pending", &self.pending_names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Noop;

    impl Execution for Noop {
        fn init(&mut self, _game: &mut Game, _ticks: Tick) -> Result<()> {
            Ok(())
        }

        fn tick(&mut self, _game: &mut Game, _ticks: Tick, _: &mut Scheduler) -> Result<()> {
            Ok(())
        }

        fn is_active(&self) -> bool {
            true
        }

        fn name(&self) -> &'static str {
            "Noop"
        }
    }

    #[test]
    fn test_scheduler_drains_in_order() {
        let mut scheduler = Scheduler::new();
        scheduler.schedule(Noop);
        scheduler.schedule_boxed(Box::new(Noop));
        assert_eq!(scheduler.len(), 2);
        assert_eq!(scheduler.pending_names(), vec!["Noop", "Noop"]);
        assert_eq!(scheduler.drain().len(), 2);
        assert!(scheduler.is_empty());
    }

    #[test]
    fn test_spawn_phase_default_is_off() {
        assert!(!Noop.active_during_spawn_phase());
    }
}

//! Tick loop.
//!
//! The engine owns the [`Game`] and the execution queue. Each tick:
//!
//! 1. **Start** - executions scheduled last tick (or added from outside)
//!    are initialised and appended to the queue
//! 2. **Run** - every active execution ticks once, in insertion order;
//!    during the spawn phase only spawn-phase executions run
//! 3. **Sweep** - inactive executions are dropped
//! 4. **Close** - the game sweeps deleted units, expires diplomacy and
//!    advances the clock
//!
//! # Determinism
//!
//! Same game, same executions added at the same ticks: same state hash.
//! Nothing here reads the clock or an unseeded RNG.

use tracing::trace;

use crate::error::Result;
use crate::execution::{Execution, Scheduler};
use crate::game::{Game, GameMessage};
use crate::intent::StampedIntent;
use crate::Tick;

/// What happened during one tick.
#[derive(Debug, Clone, Default)]
pub struct TickReport {
    /// The tick that was processed.
    pub tick: Tick,
    /// Executions that ran this tick.
    pub executions_run: usize,
    /// Executions started this tick.
    pub executions_started: usize,
    /// Messages emitted toward the UI.
    pub messages: Vec<GameMessage>,
}

/// Drives executions against a game.
#[derive(Debug)]
pub struct Engine {
    game: Game,
    executions: Vec<Box<dyn Execution>>,
    scheduler: Scheduler,
}

impl Engine {
    /// Wrap a game with an empty execution queue.
    #[must_use]
    pub fn new(game: Game) -> Self {
        Self {
            game,
            executions: Vec::new(),
            scheduler: Scheduler::new(),
        }
    }

    /// The world.
    #[must_use]
    pub const fn game(&self) -> &Game {
        &self.game
    }

    /// The world, mutably (test setup and scenario tooling).
    pub fn game_mut(&mut self) -> &mut Game {
        &mut self.game
    }

    /// Current tick.
    #[must_use]
    pub const fn ticks(&self) -> Tick {
        self.game.ticks()
    }

    /// Queue an execution; it starts on the next processed tick.
    pub fn add_execution(&mut self, execution: impl Execution + 'static) {
        self.scheduler.schedule(execution);
    }

    /// Queue a boxed execution; it starts on the next processed tick.
    pub fn add_boxed_execution(&mut self, execution: Box<dyn Execution>) {
        self.scheduler.schedule_boxed(execution);
    }

    /// Turn a player intent into its execution and queue it.
    pub fn add_intent(&mut self, intent: StampedIntent) {
        self.scheduler.schedule_boxed(intent.into_execution());
    }

    /// Executions currently in the queue (started, not yet swept).
    #[must_use]
    pub fn execution_count(&self) -> usize {
        self.executions.len()
    }

    /// Executions waiting to start.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.scheduler.len()
    }

    /// Names of queued executions, in run order.
    #[must_use]
    pub fn execution_names(&self) -> Vec<&'static str> {
        self.executions.iter().map(|e| e.name()).collect()
    }

    /// Deterministic hash of the world.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        self.game.state_hash()
    }

    /// Process one tick.
    ///
    /// # Errors
    ///
    /// Propagates programmer errors raised by executions (for example a
    /// tick before init). The tick is left half-applied in that case.
    pub fn tick(&mut self) -> Result<TickReport> {
        let ticks = self.game.ticks();

        // 1. Start
        let started = self.scheduler.drain();
        let executions_started = started.len();
        for mut execution in started {
            execution.init(&mut self.game, ticks)?;
            trace!(tick = ticks, execution = execution.name(), "Execution started");
            self.executions.push(execution);
        }

        // 2. Run
        let spawn_phase = self.game.in_spawn_phase();
        let mut executions_run = 0;
        for execution in &mut self.executions {
            if !execution.is_active() {
                continue;
            }
            if spawn_phase && !execution.active_during_spawn_phase() {
                continue;
            }
            execution.tick(&mut self.game, ticks, &mut self.scheduler)?;
            executions_run += 1;
        }

        // 3. Sweep
        self.executions.retain(|e| e.is_active());

        #[cfg(feature = "debug-validation")]
        self.game.validate()?;

        // 4. Close
        let messages = self.game.drain_messages();
        self.game.end_tick();

        #[cfg(debug_assertions)]
        {
            let hash = self.game.state_hash();
            tracing::debug!(tick = ticks, state_hash = hash, "Engine state hash");
        }

        Ok(TickReport {
            tick: ticks,
            executions_run,
            executions_started,
            messages,
        })
    }

    /// Process `count` ticks, discarding the reports.
    ///
    /// # Errors
    ///
    /// Stops at the first tick that fails.
    pub fn run(&mut self, count: u64) -> Result<()> {
        for _ in 0..count {
            self.tick()?;
        }
        Ok(())
    }

    /// Give the world back, dropping every execution.
    #[must_use]
    pub fn into_game(self) -> Game {
        self.game
    }
}

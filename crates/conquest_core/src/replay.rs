//! Replay system for recording and playing back matches.
//!
//! A replay stores the match setup and the stream of intents issued
//! during the match. Executions are never stored: the setup rebuilds the
//! same engine and the intents re-create every player action, so the
//! final state hash must come out identical.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::engine::{Engine, TickReport};
use crate::error::{GameError, Result};
use crate::intent::StampedIntent;
use crate::setup::MatchSetup;
use crate::Tick;

/// Replay file format version for compatibility.
pub const REPLAY_VERSION: u32 = 1;

/// Intents submitted before one tick was processed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnRecord {
    /// Tick the intents were applied on.
    pub tick: Tick,
    /// Intents in submission order.
    pub intents: Vec<StampedIntent>,
}

/// Complete replay data structure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Replay {
    /// Replay format version.
    pub version: u32,
    /// Players, map, config and seed.
    pub setup: MatchSetup,
    /// Turns with at least one intent, in tick order.
    pub turns: Vec<TurnRecord>,
    /// Number of ticks played.
    pub final_tick: Tick,
    /// State hash after the last tick.
    pub final_hash: u64,
}

impl Replay {
    /// An empty replay of `setup`.
    #[must_use]
    pub fn new(setup: MatchSetup) -> Self {
        Self {
            version: REPLAY_VERSION,
            setup,
            turns: Vec::new(),
            final_tick: 0,
            final_hash: 0,
        }
    }

    /// Record an intent applied on `tick`.
    pub fn record(&mut self, tick: Tick, intent: StampedIntent) {
        match self.turns.last_mut() {
            Some(turn) if turn.tick == tick => turn.intents.push(intent),
            _ => self.turns.push(TurnRecord {
                tick,
                intents: vec![intent],
            }),
        }
    }

    /// Finalize the replay with end-of-match state.
    pub fn finalize(&mut self, final_tick: Tick, final_hash: u64) {
        self.final_tick = final_tick;
        self.final_hash = final_hash;
    }

    /// Intents applied on `tick`.
    #[must_use]
    pub fn intents_at(&self, tick: Tick) -> &[StampedIntent] {
        self.turns
            .binary_search_by_key(&tick, |t| t.tick)
            .map_or(&[], |i| self.turns[i].intents.as_slice())
    }

    /// Total number of recorded intents.
    #[must_use]
    pub fn intent_count(&self) -> usize {
        self.turns.iter().map(|t| t.intents.len()).sum()
    }

    /// Encode with bincode.
    ///
    /// # Errors
    /// Returns an error if serialization fails.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        bincode::serialize(self)
            .map_err(|e| GameError::Serialization(format!("Failed to serialize replay: {e}")))
    }

    /// Decode bytes written by [`Replay::to_bytes`].
    ///
    /// # Errors
    /// Returns an error on malformed data or a version mismatch.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let replay: Self = bincode::deserialize(bytes)
            .map_err(|e| GameError::Serialization(format!("Failed to deserialize replay: {e}")))?;
        if replay.version != REPLAY_VERSION {
            return Err(GameError::ReplayVersionMismatch {
                expected: REPLAY_VERSION,
                found: replay.version,
            });
        }
        Ok(replay)
    }

    /// Save the replay to a file.
    ///
    /// # Errors
    /// Returns an error if serialization or file writing fails.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let bytes = self.to_bytes()?;
        std::fs::write(path.as_ref(), bytes)
            .map_err(|e| GameError::Serialization(format!("Failed to write replay file: {e}")))
    }

    /// Load a replay from a file.
    ///
    /// # Errors
    /// Returns an error if file reading or decoding fails.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let bytes = std::fs::read(path.as_ref())
            .map_err(|e| GameError::Serialization(format!("Failed to read replay file: {e}")))?;
        Self::from_bytes(&bytes)
    }
}

/// A live engine that records every intent it is given.
#[derive(Debug)]
pub struct Recorder {
    engine: Engine,
    replay: Replay,
}

impl Recorder {
    /// Start recording a new match.
    ///
    /// # Errors
    /// Returns an error if the setup does not build.
    pub fn new(setup: MatchSetup) -> Result<Self> {
        let engine = setup.build()?;
        Ok(Self {
            engine,
            replay: Replay::new(setup),
        })
    }

    /// The engine being recorded.
    #[must_use]
    pub const fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Queue an intent for the next tick and record it.
    pub fn submit(&mut self, intent: StampedIntent) {
        self.replay.record(self.engine.ticks(), intent.clone());
        self.engine.add_intent(intent);
    }

    /// Process one tick.
    ///
    /// # Errors
    /// Propagates engine errors.
    pub fn tick(&mut self) -> Result<TickReport> {
        self.engine.tick()
    }

    /// Stop recording and return the finalized replay.
    #[must_use]
    pub fn finish(mut self) -> Replay {
        self.replay
            .finalize(self.engine.ticks(), self.engine.state_hash());
        self.replay
    }
}

/// Replay playback controller.
#[derive(Debug)]
pub struct ReplayPlayer {
    replay: Replay,
    engine: Engine,
}

impl ReplayPlayer {
    /// Rebuild the match at tick zero.
    ///
    /// # Errors
    /// Returns an error if the setup does not build.
    pub fn new(replay: Replay) -> Result<Self> {
        let engine = replay.setup.build()?;
        Ok(Self { replay, engine })
    }

    /// Play one tick. Returns true while ticks remain.
    ///
    /// # Errors
    /// Propagates engine errors.
    pub fn advance(&mut self) -> Result<bool> {
        let tick = self.engine.ticks();
        if tick >= self.replay.final_tick {
            return Ok(false);
        }
        for intent in self.replay.intents_at(tick) {
            self.engine.add_intent(intent.clone());
        }
        self.engine.tick()?;
        Ok(self.engine.ticks() < self.replay.final_tick)
    }

    /// Play every remaining tick.
    ///
    /// # Errors
    /// Propagates engine errors.
    pub fn play_to_end(&mut self) -> Result<()> {
        while self.advance()? {}
        Ok(())
    }

    /// Play to the end and compare the state hash with the recorded one.
    ///
    /// # Errors
    /// Returns [`GameError::DesyncDetected`] when the hashes differ.
    pub fn verify(&mut self) -> Result<()> {
        self.play_to_end()?;
        let local_hash = self.engine.state_hash();
        if local_hash != self.replay.final_hash {
            warn!(tick = self.engine.ticks(), local_hash, remote_hash = self.replay.final_hash, "Replay desync");
            return Err(GameError::DesyncDetected {
                tick: self.engine.ticks(),
                local_hash,
                remote_hash: self.replay.final_hash,
            });
        }
        debug!(ticks = self.replay.final_tick, hash = local_hash, "Replay verified");
        Ok(())
    }

    /// Current playback tick.
    #[must_use]
    pub const fn current_tick(&self) -> Tick {
        self.engine.ticks()
    }

    /// The engine being played.
    #[must_use]
    pub const fn engine(&self) -> &Engine {
        &self.engine
    }

    /// The replay being played.
    #[must_use]
    pub const fn replay(&self) -> &Replay {
        &self.replay
    }

    /// Returns true once every tick has been played.
    #[must_use]
    pub const fn is_finished(&self) -> bool {
        self.engine.ticks() >= self.replay.final_tick
    }
}

//! Single match runner.
//!
//! Drives an engine to its tick limit or until one player is left, then
//! condenses the world into a [`MatchSummary`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use conquest_core::engine::Engine;
use conquest_core::game::Game;
use conquest_core::player::PlayerType;
use conquest_core::setup::MatchSetup;
use conquest_core::Tick;

use crate::error::Result;
use crate::scenario::Scenario;

/// How a match ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WinCondition {
    /// Every other player was eliminated.
    LastStanding,
    /// The tick limit was reached; the largest territory wins.
    TimeLimit,
    /// Nobody is left.
    NoSurvivors,
}

/// End-of-match state of one player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerSummary {
    /// Player id.
    pub id: u16,
    /// Display name.
    pub name: String,
    /// Controller.
    pub player_type: PlayerType,
    /// Still owns territory.
    pub alive: bool,
    /// Owned tiles.
    pub tiles: usize,
    /// Gold on hand.
    pub gold: u64,
    /// Troops on hand.
    pub troops: u64,
    /// Active units, structures included.
    pub units: usize,
}

/// Result of one match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchSummary {
    /// Scenario name.
    pub scenario: String,
    /// Seed the match ran with.
    pub seed: u64,
    /// Ticks processed.
    pub duration_ticks: Tick,
    /// Winner's name.
    pub winner: Option<String>,
    /// Winner's controller.
    pub winner_type: Option<PlayerType>,
    /// How the winner was decided.
    pub win_condition: WinCondition,
    /// State hash after the last tick.
    pub final_state_hash: u64,
    /// Messages emitted, by category.
    pub messages: BTreeMap<String, usize>,
    /// Every player, in id order.
    pub players: Vec<PlayerSummary>,
}

impl MatchSummary {
    /// Players still alive.
    #[must_use]
    pub fn survivors(&self) -> usize {
        self.players.iter().filter(|p| p.alive).count()
    }
}

/// Runs one match to completion.
#[derive(Debug)]
pub struct MatchRunner {
    scenario: String,
    seed: u64,
    engine: Engine,
    max_ticks: Tick,
    messages: BTreeMap<String, usize>,
}

impl MatchRunner {
    /// Runner for an explicit setup.
    ///
    /// # Errors
    ///
    /// Fails if the setup does not build.
    pub fn new(scenario: impl Into<String>, setup: &MatchSetup, max_ticks: Tick) -> Result<Self> {
        Ok(Self {
            scenario: scenario.into(),
            seed: setup.seed,
            engine: setup.build()?,
            max_ticks,
            messages: BTreeMap::new(),
        })
    }

    /// Runner for `scenario` with `seed`.
    ///
    /// # Errors
    ///
    /// Fails if the scenario does not describe a valid match.
    pub fn from_scenario(scenario: &Scenario, seed: u64) -> Result<Self> {
        Self::new(scenario.name.clone(), &scenario.to_setup(seed)?, scenario.max_ticks)
    }

    /// The engine being run.
    #[must_use]
    pub const fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Returns true once the tick limit is reached or the match is decided.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        let game = self.engine.game();
        if self.engine.ticks() >= self.max_ticks {
            return true;
        }
        if game.in_spawn_phase() || game.players().count() < 2 {
            return false;
        }
        game.alive_players().count() <= 1
    }

    /// Process one tick. Returns false once the match is over.
    ///
    /// # Errors
    ///
    /// Propagates engine errors.
    pub fn step(&mut self) -> Result<bool> {
        if self.is_finished() {
            return Ok(false);
        }
        let report = self.engine.tick()?;
        for message in report.messages {
            *self
                .messages
                .entry(format!("{:?}", message.message_type))
                .or_insert(0) += 1;
        }
        Ok(!self.is_finished())
    }

    /// Run to the end and summarize.
    ///
    /// # Errors
    ///
    /// Propagates engine errors.
    pub fn run(mut self) -> Result<MatchSummary> {
        while self.step()? {
            if self.engine.ticks() % 500 == 0 {
                debug!(
                    scenario = %self.scenario,
                    seed = self.seed,
                    tick = self.engine.ticks(),
                    alive = self.engine.game().alive_players().count(),
                    "Match progress"
                );
            }
        }
        let summary = summarize(&self.scenario, self.seed, self.engine.game(), self.messages);
        info!(
            scenario = %summary.scenario,
            seed = summary.seed,
            ticks = summary.duration_ticks,
            winner = summary.winner.as_deref().unwrap_or("none"),
            condition = ?summary.win_condition,
            hash = summary.final_state_hash,
            "Match finished"
        );
        Ok(summary)
    }
}

/// Condense the world into a summary.
#[must_use]
pub fn summarize(scenario: &str, seed: u64, game: &Game, messages: BTreeMap<String, usize>) -> MatchSummary {
    let players: Vec<PlayerSummary> = game
        .players()
        .map(|p| PlayerSummary {
            id: p.id().as_u16(),
            name: p.name().to_string(),
            player_type: p.player_type(),
            alive: p.is_alive(),
            tiles: p.tile_count(),
            gold: p.gold(),
            troops: p.troops(),
            units: game
                .all_units()
                .filter(|u| u.is_active() && u.owner() == p.id())
                .count(),
        })
        .collect();

    let alive: Vec<&PlayerSummary> = players.iter().filter(|p| p.alive).collect();
    let (winner, win_condition) = match alive.as_slice() {
        [] => (None, WinCondition::NoSurvivors),
        [only] if players.len() > 1 => (Some(*only), WinCondition::LastStanding),
        _ => (
            alive
                .iter()
                .copied()
                .max_by_key(|p| (p.tiles, std::cmp::Reverse(p.id))),
            WinCondition::TimeLimit,
        ),
    };

    MatchSummary {
        scenario: scenario.to_string(),
        seed,
        duration_ticks: game.ticks(),
        winner: winner.map(|p| p.name.clone()),
        winner_type: winner.map(|p| p.player_type),
        win_condition,
        final_state_hash: game.state_hash(),
        messages,
        players,
    }
}

/// Run `scenario` once with `seed`.
///
/// # Errors
///
/// Fails if the scenario is invalid or the engine errors.
pub fn run_match(scenario: &Scenario, seed: u64) -> Result<MatchSummary> {
    MatchRunner::from_scenario(scenario, seed)?.run()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::MapSpec;

    fn tiny() -> Scenario {
        let mut scenario = Scenario::skirmish();
        scenario.map = MapSpec::Open {
            width: 24,
            height: 24,
        };
        scenario.bots = 3;
        scenario.nations = 1;
        scenario.max_ticks = 200;
        scenario.config.spawn_phase_ticks = 10;
        scenario
    }

    #[test]
    fn test_match_stops_at_tick_limit() {
        let summary = run_match(&tiny(), 4).unwrap();
        assert!(summary.duration_ticks <= 200);
        assert_eq!(summary.players.len(), 4);
        if summary.win_condition == WinCondition::TimeLimit {
            assert_eq!(summary.duration_ticks, 200);
        }
        assert!(summary.winner.is_some());
    }

    #[test]
    fn test_same_seed_same_summary() {
        let a = run_match(&tiny(), 9).unwrap();
        let b = run_match(&tiny(), 9).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_time_limit_winner_has_most_tiles() {
        let summary = run_match(&tiny(), 2).unwrap();
        if summary.win_condition == WinCondition::TimeLimit {
            let best = summary.players.iter().filter(|p| p.alive).map(|p| p.tiles).max();
            let winner = summary
                .players
                .iter()
                .find(|p| Some(&p.name) == summary.winner.as_ref())
                .unwrap();
            assert_eq!(Some(winner.tiles), best);
        }
    }

    #[test]
    fn test_step_refuses_after_finish() {
        let mut scenario = tiny();
        scenario.max_ticks = 5;
        let mut runner = MatchRunner::from_scenario(&scenario, 1).unwrap();
        while runner.step().unwrap() {}
        assert_eq!(runner.engine().ticks(), 5);
        assert!(!runner.step().unwrap());
        assert_eq!(runner.engine().ticks(), 5);
    }
}

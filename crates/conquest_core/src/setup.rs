//! Match setup.
//!
//! A [`MatchSetup`] lists the players of a match and turns into a ready
//! [`Engine`]: players registered, spawn executions queued and each AI
//! player driven by the execution of its tier. Replays store the setup so
//! playback rebuilds the exact same engine.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::ai::{BotExecution, FakeHumanExecution};
use crate::config::GameConfig;
use crate::engine::Engine;
use crate::error::Result;
use crate::executions::{SpawnExecution, ToggleAutoPlayExecution};
use crate::game::Game;
use crate::map::{GameMap, TileRef};
use crate::player::{PlayerId, PlayerInfo, PlayerType};
use crate::random::{mix_seed, PseudoRandom};

const NAME_PREFIXES: [&str; 12] = [
    "North", "South", "East", "West", "Upper", "Lower", "Grand", "Free", "Old", "New", "Iron",
    "Red",
];

const NAME_SUFFIXES: [&str; 12] = [
    "Marches", "Duchy", "League", "Realm", "Coast", "Isles", "Hold", "Reach", "Union", "Vale",
    "Commune", "Pact",
];

/// Random tiles tried before the spacing requirement is dropped.
const SPAWN_TRIES: usize = 500;

/// One player of a match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerSlot {
    /// Identity and controller.
    pub info: PlayerInfo,
    /// Spawn tile. AI players without one get a random tile; humans
    /// without one pick theirs with a spawn intent.
    pub spawn: Option<TileRef>,
    /// Start with auto-play enabled (humans only).
    pub auto_play: bool,
}

impl PlayerSlot {
    /// Slot for `info` with no spawn tile.
    #[must_use]
    pub fn new(info: PlayerInfo) -> Self {
        Self {
            info,
            spawn: None,
            auto_play: false,
        }
    }

    /// Builder-style spawn tile.
    #[must_use]
    pub fn with_spawn(mut self, tile: TileRef) -> Self {
        self.spawn = Some(tile);
        self
    }

    /// Builder-style auto-play flag.
    #[must_use]
    pub fn with_auto_play(mut self, enabled: bool) -> Self {
        self.auto_play = enabled;
        self
    }
}

/// Everything needed to start a match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchSetup {
    /// Match seed; every random stream derives from it.
    pub seed: u64,
    /// Terrain.
    pub map: GameMap,
    /// Tuning.
    pub config: GameConfig,
    /// Players in id order.
    pub players: Vec<PlayerSlot>,
}

impl MatchSetup {
    /// A match with no players.
    #[must_use]
    pub fn new(seed: u64, map: GameMap, config: GameConfig) -> Self {
        Self {
            seed,
            map,
            config,
            players: Vec::new(),
        }
    }

    /// Builder-style player addition.
    #[must_use]
    pub fn with_player(mut self, slot: PlayerSlot) -> Self {
        self.players.push(slot);
        self
    }

    /// An id above every id already in use.
    #[must_use]
    pub fn next_player_id(&self) -> PlayerId {
        let next = self
            .players
            .iter()
            .map(|s| s.info.id.as_u16().saturating_add(1))
            .max()
            .unwrap_or(0);
        PlayerId::new(next)
    }

    /// Add `count` AI players of `player_type` with generated names.
    pub fn add_ai_players(&mut self, player_type: PlayerType, count: usize) {
        let mut spawner = BotSpawner::new(mix_seed(&[self.seed, self.players.len() as u64]));
        for slot in &self.players {
            spawner.reserve_name(&slot.info.name);
        }
        for _ in 0..count {
            let id = self.next_player_id();
            let name = spawner.next_name();
            self.players
                .push(PlayerSlot::new(PlayerInfo::new(id, name, player_type)));
        }
    }

    /// Build the engine for this match.
    ///
    /// # Errors
    ///
    /// Fails when the config does not validate or a player id repeats.
    pub fn build(&self) -> Result<Engine> {
        self.config.validate()?;
        let mut game = Game::new(self.map.clone(), self.config.clone(), self.seed);
        for slot in &self.players {
            game.add_player(slot.info.clone())?;
        }

        let mut spawner = BotSpawner::new(mix_seed(&[self.seed, 0x5eed]));
        for tile in self.players.iter().filter_map(|s| s.spawn) {
            spawner.reserve_tile(tile);
        }
        let separation = self.config.spawn_radius.saturating_mul(2).saturating_add(2);

        let mut engine = Engine::new(game);
        for slot in &self.players {
            let id = slot.info.id;
            let ai_seed = mix_seed(&[self.seed, u64::from(id.as_u16())]);
            let spawn = match (slot.spawn, slot.info.player_type) {
                (Some(tile), _) => Some(tile),
                (None, PlayerType::Human) => None,
                (None, _) => spawner.spawn_tile(&self.map, separation),
            };
            match spawn {
                Some(tile) => engine.add_execution(SpawnExecution::new(id, tile)),
                None => debug!(player = %id, "No spawn tile assigned"),
            }
            match slot.info.player_type {
                PlayerType::Bot => engine.add_execution(BotExecution::new(id, ai_seed)),
                PlayerType::FakeHuman => {
                    engine.add_execution(FakeHumanExecution::new(id, ai_seed));
                }
                PlayerType::Human if slot.auto_play => {
                    engine.add_execution(ToggleAutoPlayExecution::new(id, true));
                }
                PlayerType::Human => {}
            }
        }
        info!(
            seed = self.seed,
            players = self.players.len(),
            width = self.map.width(),
            height = self.map.height(),
            "Match set up"
        );
        Ok(engine)
    }
}

/// Names and spawn tiles for generated players.
///
/// Owns its own name table and taken tiles, so two matches set up side by
/// side never influence each other.
#[derive(Debug, Clone)]
pub struct BotSpawner {
    rng: PseudoRandom,
    names: BTreeSet<String>,
    taken: Vec<TileRef>,
}

impl BotSpawner {
    /// Spawner with its own random stream.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            rng: PseudoRandom::new(seed),
            names: BTreeSet::new(),
            taken: Vec::new(),
        }
    }

    /// Mark a name as used.
    pub fn reserve_name(&mut self, name: &str) {
        self.names.insert(name.to_owned());
    }

    /// Mark a tile as a spawn.
    pub fn reserve_tile(&mut self, tile: TileRef) {
        self.taken.push(tile);
    }

    /// A name not handed out before by this spawner.
    pub fn next_name(&mut self) -> String {
        let prefix = NAME_PREFIXES[self.rng.next_index(NAME_PREFIXES.len())];
        let suffix = NAME_SUFFIXES[self.rng.next_index(NAME_SUFFIXES.len())];
        let base = format!("{prefix} {suffix}");
        let mut name = base.clone();
        let mut n = 2;
        while self.names.contains(&name) {
            name = format!("{base} {n}");
            n += 1;
        }
        self.names.insert(name.clone());
        name
    }

    /// A random land tile at least `separation` tiles away from every
    /// spawn handed out so far. Falls back to any free land tile.
    pub fn spawn_tile(&mut self, map: &GameMap, separation: u32) -> Option<TileRef> {
        let land: Vec<TileRef> = map.tiles().filter(|&t| map.is_land(t)).collect();
        if land.is_empty() {
            return None;
        }
        let spaced = |taken: &[TileRef], tile: TileRef| {
            taken
                .iter()
                .all(|&t| map.manhattan_dist(t, tile) >= separation)
        };
        let mut chosen = None;
        for _ in 0..SPAWN_TRIES {
            let tile = land[self.rng.next_index(land.len())];
            if spaced(&self.taken, tile) {
                chosen = Some(tile);
                break;
            }
        }
        let chosen = chosen.or_else(|| land.iter().copied().find(|t| !self.taken.contains(t)))?;
        self.taken.push(chosen);
        Some(chosen)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> MatchSetup {
        MatchSetup::new(42, GameMap::new(40, 40), GameConfig::default()).with_player(
            PlayerSlot::new(PlayerInfo::new(PlayerId::new(0), "host", PlayerType::Human))
                .with_spawn(TileRef::new(0)),
        )
    }

    #[test]
    fn test_ai_players_get_unique_names_and_ids() {
        let mut setup = setup();
        setup.add_ai_players(PlayerType::Bot, 20);
        setup.add_ai_players(PlayerType::FakeHuman, 5);
        let names: BTreeSet<&str> = setup.players.iter().map(|s| s.info.name.as_str()).collect();
        let ids: BTreeSet<PlayerId> = setup.players.iter().map(|s| s.info.id).collect();
        assert_eq!(names.len(), 26);
        assert_eq!(ids.len(), 26);
    }

    #[test]
    fn test_spawns_are_separated() {
        let map = GameMap::new(40, 40);
        let mut spawner = BotSpawner::new(1);
        let tiles: Vec<TileRef> = (0..6).filter_map(|_| spawner.spawn_tile(&map, 8)).collect();
        assert_eq!(tiles.len(), 6);
        for (i, a) in tiles.iter().enumerate() {
            for b in &tiles[i + 1..] {
                assert!(map.manhattan_dist(*a, *b) >= 8);
            }
        }
    }

    #[test]
    fn test_build_queues_spawns_and_ai() {
        let mut setup = setup();
        setup.add_ai_players(PlayerType::Bot, 2);
        setup.add_ai_players(PlayerType::FakeHuman, 1);
        let mut engine = setup.build().unwrap();
        assert_eq!(engine.pending_count(), 4 + 3);
        engine.tick().unwrap();
        assert_eq!(engine.game().players().filter(|p| p.has_spawned()).count(), 4);
    }

    #[test]
    fn test_spawner_on_water_only_map_gives_nothing() {
        let map = GameMap::from_ascii(&["~~~", "~~~"]).unwrap();
        assert!(BotSpawner::new(3).spawn_tile(&map, 2).is_none());
    }
}

//! Spawn selection.
//!
//! During the spawn phase a player may pick (and re-pick) a starting
//! tile. Each pick drops the previous claim and takes the unclaimed land
//! around the new tile. The first pick starts the player's growth loop.

use tracing::{debug, info};

use crate::error::Result;
use crate::execution::{Execution, Scheduler};
use crate::game::Game;
use crate::map::TileRef;
use crate::player::PlayerId;
use crate::Tick;

use super::{ensure_init, PlayerExecution};

/// Claim land around a spawn tile.
#[derive(Debug)]
pub struct SpawnExecution {
    player: PlayerId,
    tile: TileRef,
    initialized: bool,
    active: bool,
}

impl SpawnExecution {
    /// Spawn `player` at `tile`.
    #[must_use]
    pub fn new(player: PlayerId, tile: TileRef) -> Self {
        Self {
            player,
            tile,
            initialized: false,
            active: true,
        }
    }
}

impl Execution for SpawnExecution {
    fn init(&mut self, _game: &mut Game, _ticks: Tick) -> Result<()> {
        self.initialized = true;
        Ok(())
    }

    fn tick(&mut self, game: &mut Game, _ticks: Tick, scheduler: &mut Scheduler) -> Result<()> {
        ensure_init(self.initialized, self.name())?;
        self.active = false;
        if !game.in_spawn_phase() {
            debug!(player = %self.player, "Spawn phase is over");
            return Ok(());
        }
        let Some(player) = game.player(self.player).filter(|p| p.is_alive()) else {
            return Ok(());
        };
        if !game.is_land(self.tile) || game.owner(self.tile).player().is_some_and(|p| p != self.player) {
            debug!(player = %self.player, tile = %self.tile, "Spawn tile unavailable");
            return Ok(());
        }
        let first_spawn = !player.has_spawned();
        let previous: Vec<TileRef> = player.tiles().iter().copied().collect();
        for tile in previous {
            game.relinquish(tile);
        }

        let radius = game.config().spawn_radius;
        let claim: Vec<TileRef> = game
            .map()
            .tiles_in_radius(self.tile, radius)
            .into_iter()
            .filter(|&t| game.is_land(t) && game.owner(t).is_terra_nullius())
            .collect();
        for tile in &claim {
            game.conquer(self.player, *tile);
        }
        info!(player = %self.player, tile = %self.tile, tiles = claim.len(), "Player spawned");

        if first_spawn {
            if let Some(player) = game.player_mut(self.player) {
                player.mark_spawned();
            }
            scheduler.schedule(PlayerExecution::new(self.player));
        }
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn active_during_spawn_phase(&self) -> bool {
        true
    }

    fn name(&self) -> &'static str {
        "SpawnExecution"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use crate::map::GameMap;
    use crate::player::{Owner, PlayerInfo, PlayerType};

    fn game() -> (Game, PlayerId) {
        let mut game = Game::new(GameMap::new(20, 20), GameConfig::default(), 1);
        let id = PlayerId::new(0);
        game.add_player(PlayerInfo::new(id, "p0", PlayerType::Human))
            .unwrap();
        (game, id)
    }

    fn spawn(game: &mut Game, id: PlayerId, x: i64, y: i64) -> Scheduler {
        let tile = game.map().tile(x, y).unwrap();
        let mut exec = SpawnExecution::new(id, tile);
        let mut scheduler = Scheduler::new();
        exec.init(game, 0).unwrap();
        exec.tick(game, 0, &mut scheduler).unwrap();
        assert!(!exec.is_active());
        scheduler
    }

    #[test]
    fn test_first_spawn_claims_land_and_starts_growth() {
        let (mut game, id) = game();
        let scheduler = spawn(&mut game, id, 5, 5);
        // radius 2 disc: 13 tiles
        assert_eq!(game.player(id).unwrap().tile_count(), 13);
        assert!(game.player(id).unwrap().has_spawned());
        assert_eq!(scheduler.pending_names(), vec!["PlayerExecution"]);
    }

    #[test]
    fn test_respawn_moves_the_claim() {
        let (mut game, id) = game();
        let _ = spawn(&mut game, id, 5, 5);
        let scheduler = spawn(&mut game, id, 15, 15);
        assert!(scheduler.is_empty());
        assert_eq!(game.player(id).unwrap().tile_count(), 13);
        assert_eq!(game.owner(game.map().tile(5, 5).unwrap()), Owner::TerraNullius);
        assert_eq!(game.owner(game.map().tile(15, 15).unwrap()), Owner::Player(id));
    }

    #[test]
    fn test_spawn_runs_during_spawn_phase_only() {
        let (mut game, id) = game();
        assert!(SpawnExecution::new(id, TileRef::new(0)).active_during_spawn_phase());
        for _ in 0..game.config().spawn_phase_ticks {
            game.end_tick();
        }
        let _ = spawn(&mut game, id, 5, 5);
        assert_eq!(game.player(id).unwrap().tile_count(), 0);
    }
}

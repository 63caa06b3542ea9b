//! Per-player economy loop.
//!
//! Every tick a spawned player grows population toward its capacity,
//! splits the growth into troops and workers by its target troop ratio,
//! and earns gold from workers. A player left with no land after the
//! spawn phase is eliminated.

use tracing::info;

use crate::error::Result;
use crate::execution::{Execution, Scheduler};
use crate::game::{Game, MessageType};
use crate::math::scale;
use crate::player::PlayerId;
use crate::unit::{UnitId, UnitType};
use crate::Tick;

use super::ensure_init;

/// Growth and elimination for one player.
#[derive(Debug)]
pub struct PlayerExecution {
    player: PlayerId,
    initialized: bool,
    active: bool,
}

impl PlayerExecution {
    /// Run the economy of `player`.
    #[must_use]
    pub fn new(player: PlayerId) -> Self {
        Self {
            player,
            initialized: false,
            active: true,
        }
    }

    fn eliminate(&mut self, game: &mut Game) {
        let units: Vec<UnitId> = game
            .all_units()
            .filter(|u| u.owner() == self.player)
            .map(|u| u.id())
            .collect();
        for unit in units {
            game.delete_unit(unit);
        }
        if let Some(player) = game.player_mut(self.player) {
            player.set_alive(false);
        }
        info!(player = %self.player, "Player eliminated");
        game.display_message(
            format!("{} has been eliminated", self.player),
            MessageType::Info,
            None,
        );
        self.active = false;
    }
}

impl Execution for PlayerExecution {
    fn init(&mut self, _game: &mut Game, _ticks: Tick) -> Result<()> {
        self.initialized = true;
        Ok(())
    }

    fn tick(&mut self, game: &mut Game, _ticks: Tick, _scheduler: &mut Scheduler) -> Result<()> {
        ensure_init(self.initialized, self.name())?;
        let Some(player) = game.player(self.player).filter(|p| p.is_alive()) else {
            self.active = false;
            return Ok(());
        };
        if player.tile_count() == 0 {
            if !game.in_spawn_phase() {
                self.eliminate(game);
            }
            return Ok(());
        }

        let config = game.config();
        let cities = game.units_of(self.player, UnitType::City).len() as u64;
        let capacity = config
            .population_per_tile
            .saturating_mul(player.tile_count() as u64)
            .saturating_add(config.population_per_city.saturating_mul(cities));
        let population = player.troops().saturating_add(player.workers());
        let room = capacity.saturating_sub(population);
        let growth = config
            .base_population_growth
            .saturating_add(room.saturating_mul(config.population_growth_permille) / 1000)
            .min(room);
        let troops = scale(growth, player.target_troop_ratio());
        let workers = growth - troops;
        let gold = config
            .base_gold_per_tick
            .saturating_add(player.workers().saturating_mul(config.gold_per_worker_permille) / 1000);

        if let Some(player) = game.player_mut(self.player) {
            player.add_troops(troops);
            player.add_workers(workers);
            player.add_gold(gold);
        }
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn name(&self) -> &'static str {
        "PlayerExecution"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use crate::map::GameMap;
    use crate::player::{PlayerInfo, PlayerType};
    use crate::unit::BuildParams;

    fn game() -> (Game, PlayerId) {
        let mut config = GameConfig::default();
        config.spawn_phase_ticks = 0;
        let mut game = Game::new(GameMap::new(10, 10), config, 1);
        let id = PlayerId::new(0);
        game.add_player(PlayerInfo::new(id, "p0", PlayerType::Human))
            .unwrap();
        (game, id)
    }

    #[test]
    fn test_growth_adds_troops_workers_and_gold() {
        let (mut game, id) = game();
        for x in 0..10 {
            for y in 0..10 {
                let tile = game.map().tile(x, y).unwrap();
                game.conquer(id, tile);
            }
        }
        let before = game.player(id).unwrap().clone();
        let mut exec = PlayerExecution::new(id);
        exec.init(&mut game, 0).unwrap();
        exec.tick(&mut game, 0, &mut Scheduler::new()).unwrap();
        let after = game.player(id).unwrap();
        // capacity 10_000, population 2_500: growth 10 + 75
        assert_eq!(
            after.troops() + after.workers(),
            before.troops() + before.workers() + 85
        );
        assert!(after.troops() > before.troops());
        assert_eq!(after.gold(), before.gold() + 100);
    }

    #[test]
    fn test_population_never_exceeds_capacity() {
        let (mut game, id) = game();
        let tile = game.map().tile(0, 0).unwrap();
        game.conquer(id, tile);
        let mut exec = PlayerExecution::new(id);
        exec.init(&mut game, 0).unwrap();
        exec.tick(&mut game, 0, &mut Scheduler::new()).unwrap();
        let player = game.player(id).unwrap();
        assert_eq!(player.troops(), 2_500);
        assert_eq!(player.workers(), 0);
    }

    #[test]
    fn test_landless_player_is_eliminated() {
        let (mut game, id) = game();
        let tile = game.map().tile(0, 0).unwrap();
        game.conquer(id, tile);
        let city = game
            .build_unit(id, UnitType::City, tile, BuildParams::default())
            .unwrap();
        game.relinquish(tile);
        let ship = game
            .build_unit(id, UnitType::TradeShip, tile, BuildParams::default())
            .unwrap();
        let mut exec = PlayerExecution::new(id);
        exec.init(&mut game, 0).unwrap();
        exec.tick(&mut game, 0, &mut Scheduler::new()).unwrap();
        assert!(!exec.is_active());
        assert!(!game.is_alive(id));
        assert!(!game.is_unit_active(city));
        assert!(!game.is_unit_active(ship));
    }
}

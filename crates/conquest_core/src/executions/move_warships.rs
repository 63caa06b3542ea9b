//! Batch move orders for warships.

use tracing::debug;

use crate::error::Result;
use crate::execution::{Execution, Scheduler};
use crate::game::Game;
use crate::map::TileRef;
use crate::player::PlayerId;
use crate::unit::UnitId;
use crate::Tick;

use super::ensure_init;

/// Send a group of warships to an ocean tile.
///
/// Units that are gone, foreign or not warships are skipped. The warship
/// executions pick the order up on their next tick.
#[derive(Debug)]
pub struct MoveWarshipsExecution {
    owner: PlayerId,
    units: Vec<UnitId>,
    destination: TileRef,
    initialized: bool,
    active: bool,
}

impl MoveWarshipsExecution {
    /// Order `units` of `owner` to `destination`.
    #[must_use]
    pub fn new(owner: PlayerId, units: Vec<UnitId>, destination: TileRef) -> Self {
        Self {
            owner,
            units,
            destination,
            initialized: false,
            active: true,
        }
    }
}

impl Execution for MoveWarshipsExecution {
    fn init(&mut self, _game: &mut Game, _ticks: Tick) -> Result<()> {
        self.initialized = true;
        Ok(())
    }

    fn tick(&mut self, game: &mut Game, _ticks: Tick, _scheduler: &mut Scheduler) -> Result<()> {
        ensure_init(self.initialized, self.name())?;
        self.active = false;
        if !game.is_ocean(self.destination) {
            debug!(player = %self.owner, tile = %self.destination, "Move target is not ocean");
            return Ok(());
        }
        for &id in &self.units {
            let Some(unit) = game
                .unit_mut(id)
                .filter(|u| u.is_active() && u.owner() == self.owner && u.unit_type().is_warship())
            else {
                continue;
            };
            unit.set_move_target(Some(self.destination));
        }
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn name(&self) -> &'static str {
        "MoveWarshipsExecution"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use crate::map::GameMap;
    use crate::player::{PlayerInfo, PlayerType};
    use crate::unit::{BuildParams, UnitType};

    #[test]
    fn test_only_own_warships_get_the_order() {
        let map = GameMap::from_ascii(&["#~~~~", "#~~~~"]).unwrap();
        let mut game = Game::new(map, GameConfig::default(), 1);
        let (a, b) = (PlayerId::new(0), PlayerId::new(1));
        for id in [a, b] {
            game.add_player(PlayerInfo::new(id, id.to_string(), PlayerType::Human))
                .unwrap();
        }
        let sea = game.map().tile(2, 0).unwrap();
        let mine = game
            .build_unit(a, UnitType::Viper, sea, BuildParams::default())
            .unwrap();
        let theirs = game
            .build_unit(b, UnitType::Condor, sea, BuildParams::default())
            .unwrap();
        let trade = game
            .build_unit(a, UnitType::TradeShip, sea, BuildParams::default())
            .unwrap();
        let dst = game.map().tile(4, 1).unwrap();

        let mut exec = MoveWarshipsExecution::new(a, vec![mine, theirs, trade], dst);
        exec.init(&mut game, 0).unwrap();
        exec.tick(&mut game, 0, &mut Scheduler::new()).unwrap();
        assert_eq!(game.unit(mine).unwrap().move_target(), Some(dst));
        assert_eq!(game.unit(theirs).unwrap().move_target(), None);
        assert_eq!(game.unit(trade).unwrap().move_target(), None);

        let land = game.map().tile(0, 0).unwrap();
        let mut exec = MoveWarshipsExecution::new(a, vec![mine], land);
        exec.init(&mut game, 1).unwrap();
        exec.tick(&mut game, 1, &mut Scheduler::new()).unwrap();
        assert_eq!(game.unit(mine).unwrap().move_target(), Some(dst));
    }
}

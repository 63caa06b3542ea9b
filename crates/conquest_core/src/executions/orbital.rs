//! Orbital cannons: long-range anti-ship strikes.

use tracing::debug;

use crate::error::Result;
use crate::execution::{Execution, Scheduler};
use crate::game::Game;
use crate::map::TileRef;
use crate::player::PlayerId;
use crate::unit::{BuildParams, UnitId, UnitType};
use crate::Tick;

use super::{ensure_init, MissileExecution};

const NAVAL_TARGETS: [UnitType; 4] = [
    UnitType::Viper,
    UnitType::Condor,
    UnitType::TransportShip,
    UnitType::TradeShip,
];

/// Places an orbital cannon and fires damage missiles at hostile ships.
#[derive(Debug)]
pub struct OrbitalCannonExecution {
    owner: PlayerId,
    tile: TileRef,
    cannon: Option<UnitId>,
    initialized: bool,
    active: bool,
}

impl OrbitalCannonExecution {
    /// Build an orbital cannon for `owner` at `tile`.
    #[must_use]
    pub fn new(owner: PlayerId, tile: TileRef) -> Self {
        Self {
            owner,
            tile,
            cannon: None,
            initialized: false,
            active: true,
        }
    }
}

impl Execution for OrbitalCannonExecution {
    fn init(&mut self, _game: &mut Game, _ticks: Tick) -> Result<()> {
        self.initialized = true;
        Ok(())
    }

    fn tick(&mut self, game: &mut Game, ticks: Tick, scheduler: &mut Scheduler) -> Result<()> {
        ensure_init(self.initialized, self.name())?;
        let Some(cannon) = self.cannon else {
            let Some(spawn) = game.can_build(self.owner, UnitType::OrbitalCannon, self.tile) else {
                debug!(player = %self.owner, tile = %self.tile, "Orbital cannon no longer buildable");
                self.active = false;
                return Ok(());
            };
            self.cannon = Some(game.build_unit(
                self.owner,
                UnitType::OrbitalCannon,
                spawn,
                BuildParams::default(),
            )?);
            return Ok(());
        };
        let info = game.config().unit_info(UnitType::OrbitalCannon);
        let Some((owner, tile, cooling)) = game
            .active_unit(cannon)
            .map(|u| (u.owner(), u.tile(), u.is_cooling_down(ticks, info.attack_rate)))
        else {
            self.active = false;
            return Ok(());
        };
        if cooling {
            return Ok(());
        }

        // Warships first, then by distance.
        let target = game
            .nearby_units(tile, info.attack_range, &NAVAL_TARGETS)
            .into_iter()
            .filter(|n| !game.is_friendly(owner, n.owner))
            .min_by_key(|n| (!n.unit_type.is_warship(), n.dist_squared, n.id));
        let Some(target) = target else {
            return Ok(());
        };
        debug!(player = %owner, %cannon, target = %target.id, "Orbital cannon firing");
        if let Some(unit) = game.unit_mut(cannon) {
            unit.start_cooldown(ticks);
        }
        scheduler.schedule(MissileExecution::damage(owner, tile, target.id, info.damage));
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn name(&self) -> &'static str {
        "OrbitalCannonExecution"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use crate::map::GameMap;
    use crate::player::{PlayerInfo, PlayerType};

    #[test]
    fn test_cannon_prefers_warships_and_cools_down() {
        let mut config = GameConfig::default();
        config.starting_gold = 10_000_000;
        let map = GameMap::from_ascii(&["##~~~~~~~~", "##~~~~~~~~", "##~~~~~~~~"]).unwrap();
        let mut game = Game::new(map, config, 2);
        let (a, b) = (PlayerId::new(0), PlayerId::new(1));
        for id in [a, b] {
            game.add_player(PlayerInfo::new(id, id.to_string(), PlayerType::Human))
                .unwrap();
        }
        let site = game.map().tile(0, 1).unwrap();
        game.conquer(a, site);
        let trade = game.map().tile(3, 1).unwrap();
        let viper = game.map().tile(8, 1).unwrap();
        game.build_unit(b, UnitType::TradeShip, trade, BuildParams::default())
            .unwrap();
        let viper = game
            .build_unit(b, UnitType::Viper, viper, BuildParams::default())
            .unwrap();

        let mut exec = OrbitalCannonExecution::new(a, site);
        let mut scheduler = Scheduler::new();
        exec.init(&mut game, 0).unwrap();
        exec.tick(&mut game, 0, &mut scheduler).unwrap();
        exec.tick(&mut game, 1, &mut scheduler).unwrap();
        assert_eq!(scheduler.len(), 1);
        exec.tick(&mut game, 2, &mut scheduler).unwrap();
        assert_eq!(scheduler.len(), 1);
        let fired = scheduler.drain();
        assert!(format!("{:?}", fired[0]).contains(&format!("{viper:?}")));
    }
}

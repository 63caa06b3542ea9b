//! MIRV: one launch, many warheads.
//!
//! The carrier flies toward the target like any nuke. Once it is within
//! the separation distance it splits into warheads aimed at land of the
//! target's owner sampled around the target.

use tracing::{debug, info};

use crate::error::Result;
use crate::execution::{Execution, Scheduler};
use crate::game::{Game, MessageType};
use crate::map::TileRef;
use crate::pathfinding::AirPathFinder;
use crate::player::{Owner, PlayerId};
use crate::random::{mix_seed, PseudoRandom};
use crate::unit::{BuildParams, UnitId, UnitType};
use crate::Tick;

use super::navigation::{fly, Step};
use super::{ensure_init, NukeExecution};

/// A MIRV carrier.
#[derive(Debug)]
pub struct MirvExecution {
    owner: PlayerId,
    target: TileRef,
    carrier: Option<UnitId>,
    finder: Option<AirPathFinder>,
    rng: Option<PseudoRandom>,
    active: bool,
}

impl MirvExecution {
    /// Fire a MIRV from `owner`'s silos at `target`.
    #[must_use]
    pub fn new(owner: PlayerId, target: TileRef) -> Self {
        Self {
            owner,
            target,
            carrier: None,
            finder: None,
            rng: None,
            active: true,
        }
    }

    fn launch(&mut self, game: &mut Game, ticks: Tick) -> Result<()> {
        let Some(spawn) = game.can_build(self.owner, UnitType::Mirv, self.target) else {
            debug!(player = %self.owner, "MIRV cannot launch");
            self.active = false;
            return Ok(());
        };
        let silo = game
            .units_of(self.owner, UnitType::MissileSilo)
            .into_iter()
            .find(|s| s.tile() == spawn)
            .map(|s| s.id());
        if let Some(silo) = silo.and_then(|s| game.unit_mut(s)) {
            silo.start_cooldown(ticks);
        }
        let carrier = game.build_unit(
            self.owner,
            UnitType::Mirv,
            spawn,
            BuildParams::targeting_tile(self.target),
        )?;
        self.carrier = Some(carrier);
        self.finder = Some(AirPathFinder::new(mix_seed(&[
            game.seed(),
            u64::from(carrier.as_u32()),
        ])));
        info!(player = %self.owner, target = %self.target, "MIRV launched");
        game.display_message(
            format!("MIRV launched by {}", self.owner),
            MessageType::Nuke,
            None,
        );
        Ok(())
    }

    /// Release warheads from `at` onto land owned by the target's owner.
    fn separate(&mut self, game: &mut Game, carrier: UnitId, at: TileRef, scheduler: &mut Scheduler) {
        let config = game.config();
        let (count, radius) = (config.mirv_warheads as usize, config.mirv_spread_radius);
        let victim = game.owner(self.target);
        let mut candidates: Vec<TileRef> = game
            .map()
            .tiles_in_radius(self.target, radius)
            .into_iter()
            .filter(|&t| game.is_land(t) && game.owner(t) == victim)
            .collect();
        if let Some(rng) = self.rng.as_mut() {
            rng.shuffle(&mut candidates);
        }
        for &tile in candidates.iter().take(count) {
            scheduler.schedule(NukeExecution::warhead(self.owner, at, tile));
        }
        debug!(player = %self.owner, warheads = candidates.len().min(count), "MIRV separated");
        if let Owner::Player(victim) = victim {
            if victim != self.owner {
                game.break_alliance(self.owner, victim);
                game.display_message(
                    format!("MIRV warheads inbound from {}", self.owner),
                    MessageType::Nuke,
                    Some(victim),
                );
            }
        }
        game.delete_unit(carrier);
    }
}

impl Execution for MirvExecution {
    fn init(&mut self, game: &mut Game, ticks: Tick) -> Result<()> {
        self.rng = Some(PseudoRandom::from_parts(&[
            game.seed(),
            u64::from(self.owner.as_u16()),
            u64::from(self.target.as_u32()),
            ticks,
        ]));
        Ok(())
    }

    fn tick(&mut self, game: &mut Game, ticks: Tick, scheduler: &mut Scheduler) -> Result<()> {
        ensure_init(self.rng.is_some(), self.name())?;
        let Some(carrier) = self.carrier else {
            return self.launch(game, ticks);
        };
        let Some(at) = game.active_unit(carrier).map(|u| u.tile()) else {
            self.active = false;
            return Ok(());
        };
        let separation = game.config().mirv_separation_distance;
        if game.manhattan_dist(at, self.target) <= separation {
            self.separate(game, carrier, at, scheduler);
            self.active = false;
            return Ok(());
        }
        let speed = game.config().nuke_speed;
        let Some(finder) = self.finder.as_mut() else {
            return Ok(());
        };
        if fly(game, carrier, finder, self.target, speed) == Step::Failed {
            game.delete_unit(carrier);
            self.active = false;
        }
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn name(&self) -> &'static str {
        "MirvExecution"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use crate::map::GameMap;
    use crate::player::{PlayerInfo, PlayerType};

    #[test]
    fn test_mirv_splits_into_warheads_on_enemy_land() {
        let mut config = GameConfig::default();
        config.starting_gold = 100_000_000;
        config.mirv_warheads = 5;
        config.mirv_separation_distance = 10;
        let mut game = Game::new(GameMap::new(80, 20), config, 17);
        let (a, b) = (PlayerId::new(0), PlayerId::new(1));
        for id in [a, b] {
            game.add_player(PlayerInfo::new(id, id.to_string(), PlayerType::Human))
                .unwrap();
        }
        let silo = game.map().tile(1, 10).unwrap();
        game.conquer(a, silo);
        game.build_unit(a, UnitType::MissileSilo, silo, BuildParams::default())
            .unwrap();
        for x in 50..80 {
            for y in 0..20 {
                let tile = game.map().tile(x, y).unwrap();
                game.conquer(b, tile);
            }
        }
        let target = game.map().tile(65, 10).unwrap();
        let mut exec = MirvExecution::new(a, target);
        exec.init(&mut game, 0).unwrap();
        let mut scheduler = Scheduler::new();
        for t in 0..30 {
            if !exec.is_active() {
                break;
            }
            exec.tick(&mut game, t, &mut scheduler).unwrap();
        }
        assert!(!exec.is_active());
        let names = scheduler.pending_names();
        assert_eq!(names.len(), 5);
        assert!(names.iter().all(|&n| n == "NukeExecution"));
    }
}

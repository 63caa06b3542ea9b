//! Warships: Vipers and Condors.
//!
//! One execution per ship. Every tick it re-reads the world around the
//! ship and decides, in order:
//!
//! 1. Condors shoot down hostile nukes in range (single-claim contract)
//! 2. pick a target: warships, then orbital cannons, then transports,
//!    then trade ships, ties broken by distance
//! 3. trade ships are chased and captured instead of shot
//! 4. anything else is shot once the attack rate allows it
//! 5. move: an explicit move target wins; with no move target and no
//!    combat target the ship patrols around its home tile
//!
//! A move target suppresses trade ship pursuit but not combat.

use std::collections::BTreeSet;

use tracing::debug;

use crate::config::UnitInfo;
use crate::error::Result;
use crate::execution::{Execution, Scheduler};
use crate::game::{Game, MessageType, NearbyUnit};
use crate::map::TileRef;
use crate::pathfinding::PathFinder;
use crate::player::PlayerId;
use crate::random::PseudoRandom;
use crate::unit::{BuildParams, UnitId, UnitType};
use crate::Tick;

use super::navigation::{sail, Step, StuckDetector};
use super::sam::find_interceptable;
use super::{ensure_init, MissileExecution, ShellExecution};

const TARGET_TYPES: [UnitType; 5] = [
    UnitType::Viper,
    UnitType::Condor,
    UnitType::OrbitalCannon,
    UnitType::TransportShip,
    UnitType::TradeShip,
];

/// Patrol tile samples per attempt.
const PATROL_SAMPLE_TRIES: u32 = 50;
/// Failed samples before the patrol radius grows.
const PATROL_EXPAND_EVERY: u32 = 10;
/// Manhattan distance at which a trade ship is boarded.
const CAPTURE_DISTANCE: u32 = 2;

/// Lower sorts first.
const fn target_priority(unit_type: UnitType) -> u8 {
    match unit_type {
        UnitType::Viper | UnitType::Condor => 0,
        UnitType::OrbitalCannon => 1,
        UnitType::TransportShip => 2,
        _ => 3,
    }
}

/// Drives one Viper or Condor.
#[derive(Debug)]
pub struct WarshipExecution {
    owner: PlayerId,
    unit_type: UnitType,
    spawn_tile: TileRef,
    warship: Option<UnitId>,
    home: Option<TileRef>,
    patrol_tile: Option<TileRef>,
    finder: PathFinder,
    stuck: StuckDetector,
    rng: Option<PseudoRandom>,
    last_attack: Tick,
    already_sent_shell: BTreeSet<UnitId>,
    active: bool,
}

impl WarshipExecution {
    /// Launch a warship of `unit_type` from the port nearest `spawn_tile`.
    #[must_use]
    pub fn new(owner: PlayerId, unit_type: UnitType, spawn_tile: TileRef) -> Self {
        Self {
            owner,
            unit_type,
            spawn_tile,
            warship: None,
            home: None,
            patrol_tile: None,
            finder: PathFinder::default(),
            stuck: StuckDetector::default(),
            rng: None,
            last_attack: 0,
            already_sent_shell: BTreeSet::new(),
            active: true,
        }
    }

    /// The ship, once spawned.
    #[must_use]
    pub const fn warship(&self) -> Option<UnitId> {
        self.warship
    }

    /// Tile the ship patrols around.
    #[must_use]
    pub const fn home(&self) -> Option<TileRef> {
        self.home
    }

    fn spawn(&mut self, game: &mut Game, ticks: Tick) -> Result<()> {
        let Some(tile) = game.can_build(self.owner, self.unit_type, self.spawn_tile) else {
            debug!(player = %self.owner, kind = self.unit_type.name(), "No port to launch from");
            self.active = false;
            return Ok(());
        };
        let id = game.build_unit(self.owner, self.unit_type, tile, BuildParams::default())?;
        self.warship = Some(id);
        self.home = Some(tile);
        self.last_attack = ticks;
        Ok(())
    }

    fn attack_rate(&self, game: &Game, info: &UnitInfo) -> Tick {
        match self.unit_type {
            UnitType::Viper => game.config().warship_shell_attack_rate(),
            _ => info.attack_rate,
        }
    }

    fn find_target(
        &self,
        game: &Game,
        warship: UnitId,
        tile: TileRef,
        has_move_target: bool,
        range: u32,
    ) -> Option<NearbyUnit> {
        game.nearby_units(tile, range, &TARGET_TYPES)
            .into_iter()
            .filter(|n| n.id != warship && !game.is_friendly(self.owner, n.owner))
            .filter(|n| !(has_move_target && n.unit_type == UnitType::TradeShip))
            .filter(|n| !self.already_sent_shell.contains(&n.id))
            .min_by_key(|n| (target_priority(n.unit_type), n.dist_squared, n.id))
    }

    fn intercept_nukes(
        &mut self,
        game: &mut Game,
        tile: TileRef,
        ticks: Tick,
        scheduler: &mut Scheduler,
    ) {
        let range = game.config().condor_intercept_range;
        let Some(nuke) = find_interceptable(game, self.owner, tile, range) else {
            return;
        };
        if game.claim_for_interception(nuke) {
            debug!(player = %self.owner, %nuke, "Condor intercepting");
            scheduler.schedule(MissileExecution::intercept(self.owner, tile, nuke));
            self.last_attack = ticks;
        }
    }

    fn fire(
        &mut self,
        game: &Game,
        warship: UnitId,
        tile: TileRef,
        target: &NearbyUnit,
        ticks: Tick,
        damage: u32,
        scheduler: &mut Scheduler,
    ) {
        let has_health = game.unit(target.id).is_some_and(|u| u.has_health());
        match self.unit_type {
            UnitType::Viper => {
                scheduler.schedule(ShellExecution::new(self.owner, warship, target.id, damage));
            }
            _ => scheduler.schedule(MissileExecution::damage(self.owner, tile, target.id, damage)),
        }
        debug!(player = %self.owner, %warship, target = %target.id, tick = ticks, "Warship firing");
        self.last_attack = ticks;
        if !has_health {
            self.already_sent_shell.insert(target.id);
        }
    }

    fn pursue_trade_ship(&mut self, game: &mut Game, warship: UnitId, tile: TileRef, target: &NearbyUnit, speed: u32) {
        if game.manhattan_dist(tile, target.tile) <= CAPTURE_DISTANCE {
            game.capture_unit(target.id, self.owner);
            game.display_message(
                format!("Trade ship captured by {}", self.owner),
                MessageType::Warning,
                Some(target.owner),
            );
            game.display_message("Captured a trade ship", MessageType::Success, Some(self.owner));
            return;
        }
        let step = sail(game, warship, &mut self.finder, target.tile, 1, speed);
        self.after_step(game, warship, step);
    }

    fn move_to_target(&mut self, game: &mut Game, warship: UnitId, dst: TileRef, speed: u32) {
        let step = sail(game, warship, &mut self.finder, dst, 0, speed);
        match step {
            Step::Arrived => {
                let here = game.unit(warship).map(|u| u.tile());
                if let Some(unit) = game.unit_mut(warship) {
                    unit.set_move_target(None);
                }
                self.home = here.or(self.home);
                self.patrol_tile = None;
            }
            Step::Failed => {
                debug!(player = %self.owner, %warship, %dst, "Move target unreachable");
                if let Some(unit) = game.unit_mut(warship) {
                    unit.set_move_target(None);
                }
                self.finder = PathFinder::default();
            }
            Step::Moving | Step::Waiting => self.after_step(game, warship, step),
        }
    }

    fn patrol(&mut self, game: &mut Game, warship: UnitId, info: &UnitInfo) {
        if self.patrol_tile.is_none() {
            self.patrol_tile = self.sample_patrol_tile(game, info.patrol_range);
        }
        let Some(dst) = self.patrol_tile else {
            return;
        };
        let step = sail(game, warship, &mut self.finder, dst, 1, info.speed);
        match step {
            Step::Arrived => self.patrol_tile = None,
            Step::Failed => {
                self.patrol_tile = None;
                self.finder = PathFinder::default();
            }
            Step::Moving | Step::Waiting => self.after_step(game, warship, step),
        }
    }

    fn after_step(&mut self, game: &Game, warship: UnitId, step: Step) {
        if step == Step::Failed {
            self.finder = PathFinder::default();
            return;
        }
        let Some(tile) = game.unit(warship).map(|u| u.tile()) else {
            return;
        };
        if self.stuck.observe(tile) {
            debug!(player = %self.owner, %warship, %tile, "Warship stuck, dropping path");
            self.finder = PathFinder::default();
            self.patrol_tile = None;
        }
    }

    /// Random ocean tile within half the patrol range of home, clamped to
    /// the map. The radius grows after every [`PATROL_EXPAND_EVERY`] misses.
    fn sample_patrol_tile(&mut self, game: &Game, patrol_range: u32) -> Option<TileRef> {
        let home = self.home?;
        let rng = self.rng.as_mut()?;
        let map = game.map();
        let (hx, hy) = (i64::from(map.x(home)), i64::from(map.y(home)));
        let (max_x, max_y) = (i64::from(map.width()) - 1, i64::from(map.height()) - 1);
        let mut radius = i64::from((patrol_range / 2).max(1));
        for attempt in 1..=PATROL_SAMPLE_TRIES {
            let x = (hx + rng.next_int(-radius, radius + 1)).clamp(0, max_x);
            let y = (hy + rng.next_int(-radius, radius + 1)).clamp(0, max_y);
            if let Some(tile) = map.tile(x, y) {
                if map.is_ocean(tile) && tile != home {
                    return Some(tile);
                }
            }
            if attempt % PATROL_EXPAND_EVERY == 0 {
                radius += radius / 2 + 1;
            }
        }
        None
    }
}

impl Execution for WarshipExecution {
    fn init(&mut self, game: &mut Game, ticks: Tick) -> Result<()> {
        self.rng = Some(PseudoRandom::from_parts(&[
            game.seed(),
            u64::from(self.owner.as_u16()),
            u64::from(self.spawn_tile.as_u32()),
            ticks,
        ]));
        Ok(())
    }

    fn tick(&mut self, game: &mut Game, ticks: Tick, scheduler: &mut Scheduler) -> Result<()> {
        ensure_init(self.rng.is_some(), self.name())?;
        let Some(warship) = self.warship else {
            return self.spawn(game, ticks);
        };
        let Some((tile, move_target)) = game
            .active_unit(warship)
            .map(|u| (u.tile(), u.move_target()))
        else {
            self.active = false;
            return Ok(());
        };

        let info = game.config().unit_info(self.unit_type);
        let attack_rate = self.attack_rate(game, &info);
        self.already_sent_shell.retain(|&id| game.is_unit_active(id));

        if self.unit_type == UnitType::Condor
            && ticks.saturating_sub(self.last_attack) >= attack_rate
        {
            self.intercept_nukes(game, tile, ticks, scheduler);
        }

        let target = self.find_target(game, warship, tile, move_target.is_some(), info.attack_range);
        if let Some(unit) = game.unit_mut(warship) {
            unit.set_target_unit(target.map(|t| t.id));
        }

        match &target {
            Some(t) if t.unit_type == UnitType::TradeShip => {
                self.pursue_trade_ship(game, warship, tile, t, info.speed);
                return Ok(());
            }
            Some(t) => {
                if ticks.saturating_sub(self.last_attack) >= attack_rate {
                    self.fire(game, warship, tile, t, ticks, info.damage, scheduler);
                }
            }
            None => {}
        }

        if let Some(dst) = move_target {
            self.move_to_target(game, warship, dst, info.speed);
        } else if target.is_none() {
            self.patrol(game, warship, &info);
        }
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn name(&self) -> &'static str {
        "WarshipExecution"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use crate::map::GameMap;
    use crate::player::{PlayerInfo, PlayerType};

    struct Harbor {
        game: Game,
        navy: PlayerId,
        enemy: PlayerId,
        port: TileRef,
    }

    fn harbor() -> Harbor {
        let mut rows = Vec::new();
        for _ in 0..20 {
            rows.push(format!("#{}", "~".repeat(29)));
        }
        let rows: Vec<&str> = rows.iter().map(String::as_str).collect();
        let mut config = GameConfig::default();
        config.starting_gold = 10_000_000;
        let mut game = Game::new(GameMap::from_ascii(&rows).unwrap(), config, 21);
        let (navy, enemy) = (PlayerId::new(0), PlayerId::new(1));
        for id in [navy, enemy] {
            game.add_player(PlayerInfo::new(id, id.to_string(), PlayerType::Human))
                .unwrap();
        }
        let port = game.map().tile(0, 10).unwrap();
        game.conquer(navy, port);
        game.build_unit(navy, UnitType::Port, port, BuildParams::default())
            .unwrap();
        Harbor {
            game,
            navy,
            enemy,
            port,
        }
    }

    fn shots(exec: &mut WarshipExecution, game: &mut Game, ticks: std::ops::RangeInclusive<Tick>) -> Vec<Tick> {
        let mut fired = Vec::new();
        for t in ticks {
            let mut scheduler = Scheduler::new();
            exec.tick(game, t, &mut scheduler).unwrap();
            if scheduler
                .pending_names()
                .iter()
                .any(|&n| n == "ShellExecution" || n == "MissileExecution")
            {
                fired.push(t);
            }
        }
        fired
    }

    #[test]
    fn test_viper_respects_attack_rate() {
        let Harbor {
            mut game,
            navy,
            enemy,
            port,
        } = harbor();
        let target_tile = game.map().tile(8, 10).unwrap();
        game.build_unit(enemy, UnitType::Condor, target_tile, BuildParams::default())
            .unwrap();

        let mut exec = WarshipExecution::new(navy, UnitType::Viper, port);
        exec.init(&mut game, 0).unwrap();
        assert!(shots(&mut exec, &mut game, 0..=0).is_empty());
        assert!(exec.warship().is_some());
        assert_eq!(shots(&mut exec, &mut game, 1..=60), vec![20, 40, 60]);
    }

    #[test]
    fn test_health_less_target_is_shot_once() {
        let Harbor {
            mut game,
            navy,
            enemy,
            port,
        } = harbor();
        let target_tile = game.map().tile(8, 10).unwrap();
        game.build_unit(enemy, UnitType::TransportShip, target_tile, BuildParams::default())
            .unwrap();
        let mut exec = WarshipExecution::new(navy, UnitType::Viper, port);
        exec.init(&mut game, 0).unwrap();
        assert_eq!(shots(&mut exec, &mut game, 0..=80), vec![20]);
    }

    #[test]
    fn test_move_target_suppresses_trade_ship_capture() {
        let Harbor {
            mut game,
            navy,
            enemy,
            port,
        } = harbor();
        let trade_tile = game.map().tile(1, 11).unwrap();
        let trade = game
            .build_unit(enemy, UnitType::TradeShip, trade_tile, BuildParams::default())
            .unwrap();
        let mut exec = WarshipExecution::new(navy, UnitType::Viper, port);
        exec.init(&mut game, 0).unwrap();
        exec.tick(&mut game, 0, &mut Scheduler::new()).unwrap();
        let warship = exec.warship().unwrap();
        let far = game.map().tile(25, 2).unwrap();
        game.unit_mut(warship).unwrap().set_move_target(Some(far));

        exec.tick(&mut game, 1, &mut Scheduler::new()).unwrap();
        assert_eq!(game.unit(trade).unwrap().owner(), enemy);

        game.unit_mut(warship).unwrap().set_move_target(None);
        for t in 2..40 {
            exec.tick(&mut game, t, &mut Scheduler::new()).unwrap();
        }
        assert_eq!(game.unit(trade).unwrap().owner(), navy);
    }

    #[test]
    fn test_warship_patrols_without_targets() {
        let Harbor {
            mut game, navy, port, ..
        } = harbor();
        let mut exec = WarshipExecution::new(navy, UnitType::Condor, port);
        exec.init(&mut game, 0).unwrap();
        for t in 0..30 {
            exec.tick(&mut game, t, &mut Scheduler::new()).unwrap();
        }
        let warship = exec.warship().unwrap();
        assert_ne!(game.unit(warship).unwrap().tile(), port);
        assert!(game.is_ocean(game.unit(warship).unwrap().tile()));
    }

    #[test]
    fn test_inactive_once_ship_is_sunk() {
        let Harbor {
            mut game, navy, port, ..
        } = harbor();
        let mut exec = WarshipExecution::new(navy, UnitType::Viper, port);
        exec.init(&mut game, 0).unwrap();
        exec.tick(&mut game, 0, &mut Scheduler::new()).unwrap();
        game.delete_unit(exec.warship().unwrap());
        exec.tick(&mut game, 1, &mut Scheduler::new()).unwrap();
        assert!(!exec.is_active());
    }
}

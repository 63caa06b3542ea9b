//! Nuclear strikes.
//!
//! Three phases: launch from the nearest silo that is off cooldown,
//! transit over terrain at a fixed speed, detonation over two concentric
//! radii. Inside the inner radius every tile and unit is lost; between
//! the radii each tile is lost with even odds and units take damage.
//! A nuke destroyed in transit (interception) never detonates.

use std::collections::BTreeMap;

use tracing::{debug, info};

use crate::config::NukeMagnitude;
use crate::error::Result;
use crate::execution::{Execution, Scheduler};
use crate::game::{Game, MessageType};
use crate::map::TileRef;
use crate::math::{permille, ratio, scale};
use crate::pathfinding::AirPathFinder;
use crate::player::{Owner, PlayerId};
use crate::random::{mix_seed, PseudoRandom};
use crate::unit::{BuildParams, UnitId, UnitType};
use crate::Tick;

use super::ensure_init;
use super::navigation::{fly, Step};

/// Relation penalty toward the attacker for each victim.
const VICTIM_RELATION_PENALTY: i32 = -50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Launch {
    /// Fire from the nearest ready silo.
    Silo,
    /// Released mid-air (MIRV warhead).
    At(TileRef),
}

#[derive(Debug)]
struct InFlight {
    nuke: UnitId,
    finder: AirPathFinder,
}

/// One nuke, from launch to detonation.
#[derive(Debug)]
pub struct NukeExecution {
    owner: PlayerId,
    nuke_type: UnitType,
    target: TileRef,
    launch: Launch,
    flight: Option<InFlight>,
    rng: Option<PseudoRandom>,
    active: bool,
}

impl NukeExecution {
    /// Fire an atom or hydrogen bomb at `target` from `owner`'s silos.
    #[must_use]
    pub fn new(owner: PlayerId, nuke_type: UnitType, target: TileRef) -> Self {
        Self {
            owner,
            nuke_type,
            target,
            launch: Launch::Silo,
            flight: None,
            rng: None,
            active: true,
        }
    }

    /// A MIRV warhead released at `from`.
    #[must_use]
    pub fn warhead(owner: PlayerId, from: TileRef, target: TileRef) -> Self {
        Self {
            launch: Launch::At(from),
            ..Self::new(owner, UnitType::MirvWarhead, target)
        }
    }

    /// The nuke unit while in flight.
    #[must_use]
    pub fn nuke(&self) -> Option<UnitId> {
        self.flight.as_ref().map(|f| f.nuke)
    }

    fn launch(&mut self, game: &mut Game, ticks: Tick) -> Result<()> {
        let spawn = match self.launch {
            Launch::At(tile) => tile,
            Launch::Silo => {
                let Some(spawn) = game.can_build(self.owner, self.nuke_type, self.target) else {
                    debug!(player = %self.owner, kind = self.nuke_type.name(), "No silo ready or not enough gold");
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
                spawn
            }
        };
        let nuke = game.build_unit(
            self.owner,
            self.nuke_type,
            spawn,
            BuildParams::targeting_tile(self.target),
        )?;
        self.flight = Some(InFlight {
            nuke,
            finder: AirPathFinder::new(mix_seed(&[game.seed(), u64::from(nuke.as_u32())])),
        });

        if self.launch == Launch::Silo {
            info!(player = %self.owner, kind = self.nuke_type.name(), target = %self.target, "Nuke launched");
            if let Owner::Player(victim) = game.owner(self.target) {
                if victim != self.owner {
                    game.display_message(
                        format!("{} inbound from {}", self.nuke_type.name(), self.owner),
                        MessageType::Nuke,
                        Some(victim),
                    );
                }
            }
        }
        Ok(())
    }

    fn detonate(&mut self, game: &mut Game, nuke: UnitId, magnitude: NukeMagnitude) {
        let Some(rng) = self.rng.as_mut() else {
            return;
        };
        let inner_sq = u64::from(magnitude.inner) * u64::from(magnitude.inner);
        let config = game.config();
        let troop_loss = permille(u32::try_from(config.nuke_troop_loss_permille).unwrap_or(1000));
        let outer_damage = config.nuke_outer_damage;

        // tiles lost per victim, and each victim's territory before the blast
        let mut losses: BTreeMap<PlayerId, (u64, u64)> = BTreeMap::new();
        for tile in game.map().tiles_in_radius(self.target, magnitude.outer) {
            if !game.is_land(tile) {
                continue;
            }
            let inner = game.euclidean_dist_squared(self.target, tile) <= inner_sq;
            if !inner && !rng.percent(50) {
                continue;
            }
            if let Some(victim) = game.owner_id(tile) {
                let before = game.player(victim).map_or(0, |p| p.tile_count() as u64);
                losses.entry(victim).or_insert((0, before)).0 += 1;
                game.relinquish(tile);
            }
            game.add_fallout(tile);
        }

        for (&victim, &(lost, before)) in &losses {
            if let Some(player) = game.player_mut(victim) {
                let share = scale(player.troops(), ratio(lost, before));
                player.remove_troops(scale(share, troop_loss));
            }
        }

        let mut victims: Vec<PlayerId> = losses.keys().copied().collect();
        for unit in game.nearby_units(self.target, magnitude.outer, &[]) {
            if unit.id == nuke || unit.unit_type.is_projectile() {
                continue;
            }
            if unit.dist_squared <= inner_sq {
                game.delete_unit(unit.id);
            } else {
                game.damage_unit(unit.id, outer_damage);
            }
            if !victims.contains(&unit.owner) {
                victims.push(unit.owner);
            }
        }
        victims.sort_unstable();

        info!(player = %self.owner, kind = self.nuke_type.name(), target = %self.target, victims = victims.len(), "Nuke detonated");
        for victim in victims {
            if victim == self.owner {
                continue;
            }
            game.break_alliance(self.owner, victim);
            if let Some(player) = game.player_mut(victim) {
                player.update_relation(self.owner, VICTIM_RELATION_PENALTY);
            }
            if self.nuke_type != UnitType::MirvWarhead {
                game.display_message(
                    format!("{} struck by {}", self.nuke_type.name(), self.owner),
                    MessageType::Nuke,
                    Some(victim),
                );
            }
        }
    }
}

impl Execution for NukeExecution {
    fn init(&mut self, game: &mut Game, ticks: Tick) -> Result<()> {
        self.rng = Some(PseudoRandom::from_parts(&[
            game.seed(),
            u64::from(self.owner.as_u16()),
            u64::from(self.target.as_u32()),
            ticks,
        ]));
        if game.config().nuke_magnitude(self.nuke_type).is_none() {
            debug!(kind = self.nuke_type.name(), "Not a nuke");
            self.active = false;
        }
        Ok(())
    }

    fn tick(&mut self, game: &mut Game, ticks: Tick, _scheduler: &mut Scheduler) -> Result<()> {
        ensure_init(self.rng.is_some(), self.name())?;
        let Some(flight) = self.flight.as_mut() else {
            return self.launch(game, ticks);
        };
        let nuke = flight.nuke;
        if !game.is_unit_active(nuke) {
            debug!(%nuke, "Nuke lost in flight");
            self.active = false;
            return Ok(());
        }
        let speed = game.config().nuke_speed;
        match fly(game, nuke, &mut flight.finder, self.target, speed) {
            Step::Moving | Step::Waiting => {}
            Step::Arrived => {
                if let Some(magnitude) = game.config().nuke_magnitude(self.nuke_type) {
                    self.detonate(game, nuke, magnitude);
                }
                game.delete_unit(nuke);
                self.active = false;
            }
            Step::Failed => {
                game.delete_unit(nuke);
                self.active = false;
            }
        }
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn name(&self) -> &'static str {
        "NukeExecution"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use crate::map::GameMap;
    use crate::player::{PlayerInfo, PlayerType};

    fn world() -> (Game, PlayerId, PlayerId) {
        let mut config = GameConfig::default();
        config.starting_gold = 10_000_000;
        let mut game = Game::new(GameMap::new(60, 30), config, 13);
        let (a, b) = (PlayerId::new(0), PlayerId::new(1));
        for id in [a, b] {
            game.add_player(PlayerInfo::new(id, id.to_string(), PlayerType::Human))
                .unwrap();
        }
        for x in 0..10 {
            for y in 0..30 {
                let tile = game.map().tile(x, y).unwrap();
                game.conquer(a, tile);
            }
        }
        for x in 30..60 {
            for y in 0..30 {
                let tile = game.map().tile(x, y).unwrap();
                game.conquer(b, tile);
            }
        }
        let silo = game.map().tile(2, 15).unwrap();
        game.build_unit(a, UnitType::MissileSilo, silo, BuildParams::default())
            .unwrap();
        (game, a, b)
    }

    fn run(exec: &mut NukeExecution, game: &mut Game, ticks: std::ops::Range<Tick>) {
        exec.init(game, ticks.start).unwrap();
        for t in ticks {
            if !exec.is_active() {
                break;
            }
            exec.tick(game, t, &mut Scheduler::new()).unwrap();
        }
    }

    #[test]
    fn test_atom_bomb_destroys_inner_radius() {
        let (mut game, a, b) = world();
        let target = game.map().tile(45, 15).unwrap();
        let city = game
            .build_unit(b, UnitType::City, target, BuildParams::default())
            .unwrap();
        let troops_before = game.player(b).unwrap().troops();
        let mut exec = NukeExecution::new(a, UnitType::AtomBomb, target);
        run(&mut exec, &mut game, 0..40);

        assert!(!exec.is_active());
        assert!(!game.is_unit_active(city));
        assert_eq!(game.owner(target), Owner::TerraNullius);
        assert!(game.has_fallout(target));
        assert!(game.player(b).unwrap().troops() < troops_before);
        assert!(game.player(b).unwrap().relation_score(a) < 0);
    }

    #[test]
    fn test_silo_cools_down_after_launch() {
        let (mut game, a, _) = world();
        let target = game.map().tile(45, 15).unwrap();
        let mut first = NukeExecution::new(a, UnitType::AtomBomb, target);
        first.init(&mut game, 0).unwrap();
        first.tick(&mut game, 0, &mut Scheduler::new()).unwrap();
        assert!(first.nuke().is_some());

        let mut second = NukeExecution::new(a, UnitType::AtomBomb, target);
        second.init(&mut game, 1).unwrap();
        second.tick(&mut game, 1, &mut Scheduler::new()).unwrap();
        assert!(!second.is_active());
        assert!(second.nuke().is_none());
    }

    #[test]
    fn test_intercepted_nuke_never_detonates() {
        let (mut game, a, b) = world();
        let target = game.map().tile(45, 15).unwrap();
        let mut exec = NukeExecution::new(a, UnitType::AtomBomb, target);
        exec.init(&mut game, 0).unwrap();
        exec.tick(&mut game, 0, &mut Scheduler::new()).unwrap();
        game.delete_unit(exec.nuke().unwrap());
        exec.tick(&mut game, 1, &mut Scheduler::new()).unwrap();
        assert!(!exec.is_active());
        assert_eq!(game.owner(target), Owner::Player(b));
    }

    #[test]
    fn test_nuking_an_ally_breaks_the_alliance() {
        let (mut game, a, b) = world();
        assert!(game.create_alliance_request(a, b));
        assert!(game.accept_alliance_request(a, b));
        let target = game.map().tile(45, 15).unwrap();
        let mut exec = NukeExecution::new(a, UnitType::AtomBomb, target);
        run(&mut exec, &mut game, 0..40);
        assert!(!game.player(a).unwrap().is_allied_with(b));
        assert!(game.player(a).unwrap().traitor_since().is_some());
    }
}

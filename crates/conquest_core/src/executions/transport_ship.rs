//! Naval invasions.
//!
//! A transport ship leaves from the owner's shore closest to the target,
//! carries troops over water and lands them on the destination tile. The
//! landing becomes an [`AttackExecution`] against whoever owns the tile on
//! arrival. A sunk transport loses its troops.

use tracing::{debug, info};

use crate::error::Result;
use crate::execution::{Execution, Scheduler};
use crate::game::{Game, MessageType};
use crate::map::TileRef;
use crate::math::scale;
use crate::pathfinding::PathFinder;
use crate::player::{Owner, PlayerId};
use crate::unit::{BuildParams, UnitId, UnitType};
use crate::Tick;

use super::navigation::{sail, Step, StuckDetector};
use super::{ensure_init, AttackExecution};

/// A boat attack.
#[derive(Debug)]
pub struct TransportShipExecution {
    owner: PlayerId,
    destination: TileRef,
    requested_troops: Option<u64>,
    boat: Option<UnitId>,
    troops: u64,
    finder: PathFinder,
    stuck: StuckDetector,
    initialized: bool,
    active: bool,
}

impl TransportShipExecution {
    /// Ship troops to `destination`. `troops` defaults to the owner's
    /// attack ratio of its current troops.
    #[must_use]
    pub fn new(owner: PlayerId, destination: TileRef, troops: Option<u64>) -> Self {
        Self {
            owner,
            destination,
            requested_troops: troops,
            boat: None,
            troops: 0,
            finder: PathFinder::default(),
            stuck: StuckDetector::default(),
            initialized: false,
            active: true,
        }
    }

    /// The transport unit once launched.
    #[must_use]
    pub const fn boat(&self) -> Option<UnitId> {
        self.boat
    }

    fn launch(&mut self, game: &mut Game) -> Result<()> {
        if !game.is_land(self.destination) || game.owner_id(self.destination) == Some(self.owner) {
            debug!(player = %self.owner, tile = %self.destination, "Transport destination must be foreign land");
            self.active = false;
            return Ok(());
        }
        if !game.is_ocean_shore(self.destination) {
            debug!(player = %self.owner, tile = %self.destination, "Transport destination is not on the coast");
            self.active = false;
            return Ok(());
        }
        let Some(spawn) = game.can_build(self.owner, UnitType::TransportShip, self.destination) else {
            debug!(player = %self.owner, "No shore to launch from or too many boats");
            self.active = false;
            return Ok(());
        };
        let Some(player) = game.player(self.owner) else {
            self.active = false;
            return Ok(());
        };
        let wanted = self
            .requested_troops
            .unwrap_or_else(|| scale(player.troops(), player.attack_ratio()))
            .min(player.troops());
        if wanted == 0 {
            self.active = false;
            return Ok(());
        }
        self.troops = game
            .player_mut(self.owner)
            .map_or(0, |p| p.remove_troops(wanted));
        let boat = game.build_unit(
            self.owner,
            UnitType::TransportShip,
            spawn,
            BuildParams {
                troops: self.troops,
                ..BuildParams::targeting_tile(self.destination)
            },
        )?;
        self.boat = Some(boat);
        info!(player = %self.owner, %boat, troops = self.troops, target = %self.destination, "Transport launched");
        if let Owner::Player(victim) = game.owner(self.destination) {
            game.display_message(
                format!("Naval invasion incoming from {}", self.owner),
                MessageType::Attack,
                Some(victim),
            );
        }
        Ok(())
    }

    fn land(&mut self, game: &mut Game, boat: UnitId, scheduler: &mut Scheduler) {
        game.delete_unit(boat);
        self.active = false;
        if !game.is_alive(self.owner) {
            return;
        }
        let target = game.owner(self.destination);
        let friendly = match target {
            Owner::Player(p) => game.is_friendly(self.owner, p),
            Owner::TerraNullius => false,
        };
        if friendly {
            // the shore changed hands to us or an ally while sailing
            if let Some(player) = game.player_mut(self.owner) {
                player.add_troops(self.troops);
            }
            debug!(player = %self.owner, "Transport landed on friendly shore, troops returned");
            return;
        }
        debug!(player = %self.owner, tile = %self.destination, troops = self.troops, "Transport landed");
        scheduler.schedule(AttackExecution::landing(
            self.owner,
            target,
            self.troops,
            self.destination,
        ));
    }
}

impl Execution for TransportShipExecution {
    fn init(&mut self, _game: &mut Game, _ticks: Tick) -> Result<()> {
        self.initialized = true;
        Ok(())
    }

    fn tick(&mut self, game: &mut Game, _ticks: Tick, scheduler: &mut Scheduler) -> Result<()> {
        ensure_init(self.initialized, self.name())?;
        let Some(boat) = self.boat else {
            return self.launch(game);
        };
        if !game.is_unit_active(boat) {
            debug!(player = %self.owner, %boat, troops = self.troops, "Transport lost at sea");
            self.active = false;
            return Ok(());
        }
        let speed = game.config().unit_info(UnitType::TransportShip).speed;
        match sail(game, boat, &mut self.finder, self.destination, 1, speed) {
            Step::Arrived => self.land(game, boat, scheduler),
            Step::Failed => {
                debug!(player = %self.owner, %boat, "No sea route, troops return");
                if let Some(player) = game.player_mut(self.owner) {
                    player.add_troops(self.troops);
                }
                game.delete_unit(boat);
                self.active = false;
            }
            Step::Moving | Step::Waiting => {
                if let Some(tile) = game.unit(boat).map(|u| u.tile()) {
                    if self.stuck.observe(tile) {
                        self.finder = PathFinder::default();
                    }
                }
            }
        }
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn name(&self) -> &'static str {
        "TransportShipExecution"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use crate::map::GameMap;
    use crate::player::{PlayerInfo, PlayerType};

    fn strait() -> (Game, PlayerId, PlayerId) {
        let map = GameMap::from_ascii(&["##~~~~~~##", "##~~~~~~##", "##~~~~~~##"]).unwrap();
        let mut game = Game::new(map, GameConfig::default(), 6);
        let (a, b) = (PlayerId::new(0), PlayerId::new(1));
        for id in [a, b] {
            game.add_player(PlayerInfo::new(id, id.to_string(), PlayerType::Bot))
                .unwrap();
        }
        for y in 0..3 {
            for x in [0, 1] {
                let tile = game.map().tile(x, y).unwrap();
                game.conquer(a, tile);
            }
            for x in [8, 9] {
                let tile = game.map().tile(x, y).unwrap();
                game.conquer(b, tile);
            }
        }
        (game, a, b)
    }

    fn sail_until_done(exec: &mut TransportShipExecution, game: &mut Game) -> Scheduler {
        let mut scheduler = Scheduler::new();
        exec.init(game, 0).unwrap();
        for t in 0..40 {
            if !exec.is_active() {
                break;
            }
            exec.tick(game, t, &mut scheduler).unwrap();
        }
        scheduler
    }

    #[test]
    fn test_landing_starts_an_attack() {
        let (mut game, a, _) = strait();
        let target = game.map().tile(8, 1).unwrap();
        let mut exec = TransportShipExecution::new(a, target, Some(300));
        let scheduler = sail_until_done(&mut exec, &mut game);
        assert!(!exec.is_active());
        assert_eq!(scheduler.pending_names(), vec!["AttackExecution"]);
        assert_eq!(game.player(a).unwrap().troops(), 2_200);
    }

    #[test]
    fn test_landing_on_allied_shore_returns_troops() {
        let (mut game, a, b) = strait();
        let target = game.map().tile(8, 1).unwrap();
        let mut exec = TransportShipExecution::new(a, target, Some(300));
        exec.init(&mut game, 0).unwrap();
        exec.tick(&mut game, 0, &mut Scheduler::new()).unwrap();
        assert!(exec.boat().is_some());
        assert!(game.create_alliance_request(a, b));
        assert!(game.accept_alliance_request(a, b));
        let scheduler = sail_until_done(&mut exec, &mut game);
        assert!(scheduler.is_empty());
        assert_eq!(game.player(a).unwrap().troops(), 2_500);
    }

    #[test]
    fn test_sunk_transport_loses_troops() {
        let (mut game, a, _) = strait();
        let target = game.map().tile(8, 1).unwrap();
        let mut exec = TransportShipExecution::new(a, target, Some(300));
        exec.init(&mut game, 0).unwrap();
        exec.tick(&mut game, 0, &mut Scheduler::new()).unwrap();
        game.delete_unit(exec.boat().unwrap());
        exec.tick(&mut game, 1, &mut Scheduler::new()).unwrap();
        assert!(!exec.is_active());
        assert_eq!(game.player(a).unwrap().troops(), 2_200);
    }

    #[test]
    fn test_inland_destination_is_rejected() {
        let (mut game, a, _) = strait();
        let own = game.map().tile(0, 1).unwrap();
        let mut exec = TransportShipExecution::new(a, own, None);
        let scheduler = sail_until_done(&mut exec, &mut game);
        assert!(scheduler.is_empty());
        assert!(exec.boat().is_none());
    }
}

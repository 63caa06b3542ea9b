//! Trade ships between two players' ports.
//!
//! On arrival both the sender and the receiving port's owner are paid.
//! A ship captured on the way reroutes to the captor's nearest port and
//! pays only the captor; it sinks itself if the captor has no port.

use tracing::debug;

use crate::error::Result;
use crate::execution::{Execution, Scheduler};
use crate::game::{Game, MessageType};
use crate::map::TileRef;
use crate::pathfinding::PathFinder;
use crate::player::PlayerId;
use crate::unit::{BuildParams, UnitId, UnitType};
use crate::Tick;

use super::ensure_init;
use super::navigation::{sail, Step, StuckDetector};

/// One trade run.
#[derive(Debug)]
pub struct TradeShipExecution {
    owner: PlayerId,
    source_port: UnitId,
    destination: UnitId,
    ship: Option<UnitId>,
    distance: u32,
    captured: bool,
    finder: PathFinder,
    stuck: StuckDetector,
    initialized: bool,
    active: bool,
}

impl TradeShipExecution {
    /// Sail from `source_port` to `destination` (both port units).
    #[must_use]
    pub fn new(owner: PlayerId, source_port: UnitId, destination: UnitId) -> Self {
        Self {
            owner,
            source_port,
            destination,
            ship: None,
            distance: 0,
            captured: false,
            finder: PathFinder::default(),
            stuck: StuckDetector::default(),
            initialized: false,
            active: true,
        }
    }

    fn spawn(&mut self, game: &mut Game) -> Result<()> {
        let source = game
            .active_unit(self.source_port)
            .filter(|p| p.owner() == self.owner)
            .map(|p| p.tile());
        let destination = game.active_unit(self.destination).map(|p| p.tile());
        let (Some(source), Some(destination)) = (source, destination) else {
            self.active = false;
            return Ok(());
        };
        let Some(spawn) = game.can_build(self.owner, UnitType::TradeShip, source) else {
            self.active = false;
            return Ok(());
        };
        self.distance = game.manhattan_dist(source, destination);
        self.ship = Some(game.build_unit(
            self.owner,
            UnitType::TradeShip,
            spawn,
            BuildParams::targeting_unit(self.destination),
        )?);
        Ok(())
    }

    /// Point a captured ship at the captor's nearest port.
    fn reroute(&mut self, game: &mut Game, ship: UnitId, captor: PlayerId, at: TileRef) -> bool {
        let port = game
            .units_of(captor, UnitType::Port)
            .into_iter()
            .min_by_key(|p| (game.manhattan_dist(p.tile(), at), p.id()))
            .map(|p| (p.id(), p.tile()));
        let Some((port, port_tile)) = port else {
            debug!(%ship, player = %captor, "Captured trade ship has no port to go to");
            return false;
        };
        self.owner = captor;
        self.captured = true;
        self.destination = port;
        self.distance = game.manhattan_dist(at, port_tile);
        self.finder = PathFinder::default();
        self.stuck.reset();
        if let Some(unit) = game.unit_mut(ship) {
            unit.set_target_unit(Some(port));
        }
        true
    }

    fn arrive(&mut self, game: &mut Game, ship: UnitId) {
        let config = game.config();
        let gold = config
            .trade_gold_base
            .saturating_add(config.trade_gold_per_tile.saturating_mul(u64::from(self.distance)));
        let receiver = game.active_unit(self.destination).map(|p| p.owner());
        if let Some(player) = game.player_mut(self.owner) {
            player.add_gold(gold);
        }
        if !self.captured {
            if let Some(receiver) = receiver.filter(|&r| r != self.owner) {
                if let Some(player) = game.player_mut(receiver) {
                    player.add_gold(gold);
                }
                game.display_message(
                    format!("Received {gold} gold from trade with {}", self.owner),
                    MessageType::Success,
                    Some(receiver),
                );
            }
        }
        game.display_message(
            format!("Received {gold} gold from trade"),
            MessageType::Success,
            Some(self.owner),
        );
        debug!(%ship, player = %self.owner, gold, captured = self.captured, "Trade ship arrived");
        game.delete_unit(ship);
        self.active = false;
    }
}

impl Execution for TradeShipExecution {
    fn init(&mut self, _game: &mut Game, _ticks: Tick) -> Result<()> {
        self.initialized = true;
        Ok(())
    }

    fn tick(&mut self, game: &mut Game, _ticks: Tick, _scheduler: &mut Scheduler) -> Result<()> {
        ensure_init(self.initialized, self.name())?;
        let Some(ship) = self.ship else {
            return self.spawn(game);
        };
        let Some((owner, at)) = game.active_unit(ship).map(|u| (u.owner(), u.tile())) else {
            self.active = false;
            return Ok(());
        };

        if owner != self.owner && !self.reroute(game, ship, owner, at) {
            game.delete_unit(ship);
            self.active = false;
            return Ok(());
        }

        // a captured ship only docks at its captor's ports
        let destination = game
            .active_unit(self.destination)
            .filter(|p| !self.captured || p.owner() == self.owner)
            .map(|p| p.tile());
        let Some(destination) = destination else {
            if self.captured && self.reroute(game, ship, self.owner, at) {
                return Ok(());
            }
            game.delete_unit(ship);
            self.active = false;
            return Ok(());
        };

        let speed = game.config().unit_info(UnitType::TradeShip).speed;
        match sail(game, ship, &mut self.finder, destination, 1, speed) {
            Step::Arrived => self.arrive(game, ship),
            Step::Failed => {
                debug!(%ship, "Trade route blocked");
                game.delete_unit(ship);
                self.active = false;
            }
            Step::Moving | Step::Waiting => {
                if let Some(tile) = game.unit(ship).map(|u| u.tile()) {
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
        "TradeShipExecution"
    }
}

//! Ports: warship slots and trade ship spawning.

use tracing::debug;

use crate::error::Result;
use crate::execution::{Execution, Scheduler};
use crate::game::Game;
use crate::map::TileRef;
use crate::player::PlayerId;
use crate::random::PseudoRandom;
use crate::unit::{BuildParams, UnitId, UnitType};
use crate::Tick;

use super::{ensure_init, TradeShipExecution};

/// Places a port, then periodically sends trade ships to foreign ports.
#[derive(Debug)]
pub struct PortExecution {
    owner: PlayerId,
    tile: TileRef,
    port: Option<UnitId>,
    rng: Option<PseudoRandom>,
    active: bool,
}

impl PortExecution {
    /// Build a port for `owner` at `tile` (an ocean shore tile).
    #[must_use]
    pub fn new(owner: PlayerId, tile: TileRef) -> Self {
        Self {
            owner,
            tile,
            port: None,
            rng: None,
            active: true,
        }
    }

    /// Foreign ports this port may trade with, in id order.
    fn trade_partners(game: &Game, port: UnitId, owner: PlayerId) -> Vec<UnitId> {
        let Some(player) = game.player(owner) else {
            return Vec::new();
        };
        game.all_units()
            .filter(|u| u.unit_type() == UnitType::Port && u.id() != port && u.owner() != owner)
            .filter(|u| {
                game.player(u.owner()).is_some_and(|other| {
                    other.is_alive()
                        && !other.has_embargo_against(owner)
                        && !player.has_embargo_against(other.id())
                })
            })
            .map(|u| u.id())
            .collect()
    }
}

impl Execution for PortExecution {
    fn init(&mut self, game: &mut Game, ticks: Tick) -> Result<()> {
        self.rng = Some(PseudoRandom::from_parts(&[
            game.seed(),
            u64::from(self.owner.as_u16()),
            u64::from(self.tile.as_u32()),
            ticks,
        ]));
        Ok(())
    }

    fn tick(&mut self, game: &mut Game, _ticks: Tick, scheduler: &mut Scheduler) -> Result<()> {
        ensure_init(self.rng.is_some(), self.name())?;
        let Some(port) = self.port else {
            let Some(spawn) = game.can_build(self.owner, UnitType::Port, self.tile) else {
                debug!(player = %self.owner, tile = %self.tile, "Port no longer buildable");
                self.active = false;
                return Ok(());
            };
            self.port = Some(game.build_unit(self.owner, UnitType::Port, spawn, BuildParams::default())?);
            return Ok(());
        };
        // Ports change hands with the land they stand on.
        let Some(owner) = game.active_unit(port).map(|u| u.owner()) else {
            self.active = false;
            return Ok(());
        };

        let config = game.config();
        let (odds, max_ships) = (config.trade_ship_spawn_odds, config.max_trade_ships);
        let Some(rng) = self.rng.as_mut() else {
            return Ok(());
        };
        if !rng.chance(odds) {
            return Ok(());
        }
        let in_flight = game
            .all_units()
            .filter(|u| u.unit_type() == UnitType::TradeShip && u.owner() == owner)
            .count();
        if in_flight >= max_ships {
            return Ok(());
        }
        let partners = Self::trade_partners(game, port, owner);
        if let Some(&destination) = rng.choose(&partners) {
            debug!(player = %owner, %port, %destination, "Trade ship dispatched");
            scheduler.schedule(TradeShipExecution::new(owner, port, destination));
        }
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn name(&self) -> &'static str {
        "PortExecution"
    }
}

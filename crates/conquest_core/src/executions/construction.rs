//! Timed construction of structures and warships.
//!
//! The cost is taken up front as escrow while a `Construction`
//! placeholder stands on the map. On completion the escrow is refunded
//! and the completion execution builds (and pays for) the real unit, so
//! the player pays once. If the placeholder is destroyed first, the
//! escrow is refunded in full.

use tracing::{debug, info, warn};

use crate::error::{GameError, Result};
use crate::execution::{Execution, Scheduler};
use crate::game::Game;
use crate::map::TileRef;
use crate::math::{ratio, Fixed};
use crate::player::PlayerId;
use crate::unit::{BuildParams, UnitId, UnitType};
use crate::Tick;

use super::{
    MirvExecution, NukeExecution, OrbitalCannonExecution, PortExecution, SamLauncherExecution,
    StructureExecution, WarshipExecution,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConstructionState {
    Pending,
    /// No build phase: dispatch on the first tick.
    Instant,
    Building {
        placeholder: UnitId,
        spawn: TileRef,
        remaining: Tick,
        total: Tick,
        escrow: u64,
        port: Option<UnitId>,
    },
    Done,
}

/// Builds one unit of `unit_type` requested at `tile`.
#[derive(Debug)]
pub struct ConstructionExecution {
    owner: PlayerId,
    unit_type: UnitType,
    tile: TileRef,
    state: ConstructionState,
}

impl ConstructionExecution {
    /// Request a build. For nukes `tile` is the target.
    #[must_use]
    pub fn new(owner: PlayerId, unit_type: UnitType, tile: TileRef) -> Self {
        Self {
            owner,
            unit_type,
            tile,
            state: ConstructionState::Pending,
        }
    }

    /// Unit type being built.
    #[must_use]
    pub const fn unit_type(&self) -> UnitType {
        self.unit_type
    }

    /// The placeholder unit while building.
    #[must_use]
    pub const fn placeholder(&self) -> Option<UnitId> {
        match self.state {
            ConstructionState::Building { placeholder, .. } => Some(placeholder),
            _ => None,
        }
    }

    fn start(&mut self, game: &mut Game) -> Result<()> {
        let Some(duration) = game.config().unit_info(self.unit_type).construction_duration
        else {
            self.state = ConstructionState::Instant;
            return Ok(());
        };
        let Some(spawn) = game.can_build(self.owner, self.unit_type, self.tile) else {
            debug!(player = %self.owner, kind = self.unit_type.name(), tile = %self.tile, "Cannot build");
            self.state = ConstructionState::Done;
            return Ok(());
        };

        let port = if self.unit_type.is_warship() {
            let Some(port) = game.free_port_near(self.owner, self.tile) else {
                debug!(player = %self.owner, kind = self.unit_type.name(), "No free port slot");
                self.state = ConstructionState::Done;
                return Ok(());
            };
            Some(port)
        } else {
            None
        };
        let spawn = match port.and_then(|p| game.unit(p)) {
            Some(port) => port.tile(),
            None => spawn,
        };

        let cost = game.unit_cost(self.owner, self.unit_type);
        let escrow = game
            .player_mut(self.owner)
            .ok_or(GameError::PlayerNotFound(self.owner))?
            .remove_gold(cost);
        let placeholder = game.build_unit(
            self.owner,
            UnitType::Construction,
            spawn,
            BuildParams::construction(self.unit_type),
        )?;

        if let Some(port) = port {
            if !game.reserve_port_queue(port, placeholder) {
                warn!(player = %self.owner, port = %port, "Port slot taken, cancelling construction");
                game.delete_unit(placeholder);
                if let Some(player) = game.player_mut(self.owner) {
                    player.add_gold(escrow);
                }
                self.state = ConstructionState::Done;
                return Ok(());
            }
        }

        debug!(player = %self.owner, kind = self.unit_type.name(), %spawn, escrow, duration, "Construction started");
        self.state = ConstructionState::Building {
            placeholder,
            spawn,
            remaining: duration,
            total: duration.max(1),
            escrow,
            port,
        };
        Ok(())
    }

    fn dispatch(&self, scheduler: &mut Scheduler, spawn: TileRef) {
        let owner = self.owner;
        match self.unit_type {
            UnitType::City | UnitType::DefensePost | UnitType::MissileSilo => {
                scheduler.schedule(StructureExecution::new(owner, self.unit_type, spawn));
            }
            UnitType::Port => scheduler.schedule(PortExecution::new(owner, spawn)),
            UnitType::SamLauncher => scheduler.schedule(SamLauncherExecution::new(owner, spawn)),
            UnitType::OrbitalCannon => {
                scheduler.schedule(OrbitalCannonExecution::new(owner, spawn));
            }
            UnitType::Viper | UnitType::Condor => {
                scheduler.schedule(WarshipExecution::new(owner, self.unit_type, spawn));
            }
            UnitType::AtomBomb | UnitType::HydrogenBomb => {
                scheduler.schedule(NukeExecution::new(owner, self.unit_type, self.tile));
            }
            UnitType::Mirv => scheduler.schedule(MirvExecution::new(owner, self.tile)),
            other => debug!(kind = other.name(), "Nothing to construct"),
        }
    }
}

impl Execution for ConstructionExecution {
    fn init(&mut self, game: &mut Game, _ticks: Tick) -> Result<()> {
        if !game.is_alive(self.owner) {
            debug!(player = %self.owner, "Construction for missing player");
            self.state = ConstructionState::Done;
            return Ok(());
        }
        self.start(game)
    }

    fn tick(&mut self, game: &mut Game, _ticks: Tick, scheduler: &mut Scheduler) -> Result<()> {
        match self.state {
            ConstructionState::Pending => Err(GameError::NotInitialized(self.name())),
            ConstructionState::Done => Ok(()),
            ConstructionState::Instant => {
                self.dispatch(scheduler, self.tile);
                self.state = ConstructionState::Done;
                Ok(())
            }
            ConstructionState::Building {
                placeholder,
                spawn,
                remaining,
                total,
                escrow,
                port,
            } => {
                if !game.is_unit_active(placeholder) {
                    info!(player = %self.owner, kind = self.unit_type.name(), "Construction destroyed");
                    if let Some(port) = port {
                        game.release_port_queue(port, placeholder);
                    }
                    if let Some(player) = game.player_mut(self.owner) {
                        player.add_gold(escrow);
                    }
                    self.state = ConstructionState::Done;
                    return Ok(());
                }

                let remaining = remaining.saturating_sub(1);
                let progress = Fixed::ONE - ratio(remaining, total);
                if let Some(unit) = game.unit_mut(placeholder) {
                    unit.set_construction_progress(progress);
                }
                if remaining > 0 {
                    self.state = ConstructionState::Building {
                        placeholder,
                        spawn,
                        remaining,
                        total,
                        escrow,
                        port,
                    };
                    return Ok(());
                }

                game.delete_unit(placeholder);
                if let Some(port) = port {
                    game.release_port_queue(port, placeholder);
                }
                if let Some(player) = game.player_mut(self.owner) {
                    player.add_gold(escrow);
                }
                debug!(player = %self.owner, kind = self.unit_type.name(), "Construction complete");
                self.dispatch(scheduler, spawn);
                self.state = ConstructionState::Done;
                Ok(())
            }
        }
    }

    fn is_active(&self) -> bool {
        self.state != ConstructionState::Done
    }

    fn name(&self) -> &'static str {
        "ConstructionExecution"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use crate::map::GameMap;
    use crate::player::{PlayerInfo, PlayerType};

    fn setup(gold: u64) -> (Game, PlayerId, TileRef) {
        let mut config = GameConfig::default();
        config.starting_gold = gold;
        let city = config.unit_info_mut(UnitType::City);
        city.cost = 250_000;
        city.cost_per_owned = 0;
        city.max_cost = None;
        city.construction_duration = Some(5);
        let mut game = Game::new(GameMap::new(8, 8), config, 3);
        let owner = PlayerId::new(0);
        game.add_player(PlayerInfo::new(owner, "builder", PlayerType::Human))
            .unwrap();
        let tile = game.map().tile(3, 3).unwrap();
        game.conquer(owner, tile);
        (game, owner, tile)
    }

    #[test]
    fn test_tick_before_init_is_an_error() {
        let (mut game, owner, tile) = setup(300_000);
        let mut exec = ConstructionExecution::new(owner, UnitType::City, tile);
        let result = exec.tick(&mut game, 0, &mut Scheduler::new());
        assert!(matches!(result, Err(GameError::NotInitialized(_))));
    }

    #[test]
    fn test_unaffordable_build_charges_nothing() {
        let (mut game, owner, tile) = setup(1_000);
        let mut exec = ConstructionExecution::new(owner, UnitType::City, tile);
        exec.init(&mut game, 0).unwrap();
        assert!(!exec.is_active());
        assert_eq!(game.player(owner).unwrap().gold(), 1_000);
        assert_eq!(game.all_units().count(), 0);
    }

    #[test]
    fn test_progress_and_completion() {
        let (mut game, owner, tile) = setup(300_000);
        let mut scheduler = Scheduler::new();
        let mut exec = ConstructionExecution::new(owner, UnitType::City, tile);
        exec.init(&mut game, 0).unwrap();
        let placeholder = exec.placeholder().unwrap();
        assert_eq!(game.player(owner).unwrap().gold(), 50_000);

        exec.tick(&mut game, 0, &mut scheduler).unwrap();
        let progress = game.unit(placeholder).unwrap().construction_progress();
        assert!(progress > Fixed::ZERO && progress < Fixed::ONE);

        for t in 1..5 {
            exec.tick(&mut game, t, &mut scheduler).unwrap();
        }
        assert!(!exec.is_active());
        assert!(!game.is_unit_active(placeholder));
        assert_eq!(game.player(owner).unwrap().gold(), 300_000);
        assert_eq!(scheduler.pending_names(), vec!["StructureExecution"]);
    }

    #[test]
    fn test_destroyed_placeholder_refunds() {
        let (mut game, owner, tile) = setup(300_000);
        let mut exec = ConstructionExecution::new(owner, UnitType::City, tile);
        exec.init(&mut game, 0).unwrap();
        game.delete_unit(exec.placeholder().unwrap());
        let mut scheduler = Scheduler::new();
        exec.tick(&mut game, 1, &mut scheduler).unwrap();
        assert!(!exec.is_active());
        assert!(scheduler.is_empty());
        assert_eq!(game.player(owner).unwrap().gold(), 300_000);
    }
}

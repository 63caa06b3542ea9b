//! Passive structures: cities, defense posts and missile silos.
//!
//! Their effects are read by other executions (population growth counts
//! cities, land attacks look for defense posts, nukes look for silos), so
//! the execution only places the unit and watches it.

use tracing::debug;

use crate::error::Result;
use crate::execution::{Execution, Scheduler};
use crate::game::Game;
use crate::map::TileRef;
use crate::player::PlayerId;
use crate::unit::{BuildParams, UnitId, UnitType};
use crate::Tick;

use super::ensure_init;

/// Places a structure and stays alive as long as it stands.
#[derive(Debug)]
pub struct StructureExecution {
    owner: PlayerId,
    unit_type: UnitType,
    tile: TileRef,
    structure: Option<UnitId>,
    initialized: bool,
    active: bool,
}

impl StructureExecution {
    /// Build `unit_type` at `tile` for `owner`.
    #[must_use]
    pub fn new(owner: PlayerId, unit_type: UnitType, tile: TileRef) -> Self {
        Self {
            owner,
            unit_type,
            tile,
            structure: None,
            initialized: false,
            active: true,
        }
    }

    /// The placed structure, once built.
    #[must_use]
    pub const fn structure(&self) -> Option<UnitId> {
        self.structure
    }
}

impl Execution for StructureExecution {
    fn init(&mut self, _game: &mut Game, _ticks: Tick) -> Result<()> {
        self.initialized = true;
        Ok(())
    }

    fn tick(&mut self, game: &mut Game, _ticks: Tick, _scheduler: &mut Scheduler) -> Result<()> {
        ensure_init(self.initialized, self.name())?;
        let Some(structure) = self.structure else {
            let Some(spawn) = game.can_build(self.owner, self.unit_type, self.tile) else {
                debug!(player = %self.owner, kind = self.unit_type.name(), tile = %self.tile, "Structure no longer buildable");
                self.active = false;
                return Ok(());
            };
            self.structure =
                Some(game.build_unit(self.owner, self.unit_type, spawn, BuildParams::default())?);
            return Ok(());
        };
        if !game.is_unit_active(structure) {
            self.active = false;
        }
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn name(&self) -> &'static str {
        "StructureExecution"
    }
}

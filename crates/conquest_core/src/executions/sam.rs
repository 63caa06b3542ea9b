//! SAM launchers: nuke interception.
//!
//! A launcher claims a nuke with [`Game::claim_for_interception`] before
//! firing. The claim is a single call that checks and sets the nuke's
//! flag, so a second launcher (or Condor) in range sees no eligible
//! target and every nuke is intercepted at most once.

use tracing::debug;

use crate::error::Result;
use crate::execution::{Execution, Scheduler};
use crate::game::Game;
use crate::map::TileRef;
use crate::player::PlayerId;
use crate::unit::{BuildParams, UnitId, UnitType};
use crate::Tick;

use super::{ensure_init, MissileExecution};

const INTERCEPTABLE: [UnitType; 2] = [UnitType::AtomBomb, UnitType::HydrogenBomb];

/// Closest hostile, unclaimed nuke within `range` of `tile`.
pub(crate) fn find_interceptable(
    game: &Game,
    owner: PlayerId,
    tile: TileRef,
    range: u32,
) -> Option<UnitId> {
    game.nearby_units(tile, range, &INTERCEPTABLE)
        .into_iter()
        .filter(|n| !game.is_friendly(owner, n.owner))
        .find(|n| game.unit(n.id).is_some_and(|u| !u.targeted_by_sam()))
        .map(|n| n.id)
}

/// Places a SAM launcher and fires interceptors at incoming nukes.
#[derive(Debug)]
pub struct SamLauncherExecution {
    owner: PlayerId,
    tile: TileRef,
    launcher: Option<UnitId>,
    initialized: bool,
    active: bool,
}

impl SamLauncherExecution {
    /// Build a SAM launcher for `owner` at `tile`.
    #[must_use]
    pub fn new(owner: PlayerId, tile: TileRef) -> Self {
        Self {
            owner,
            tile,
            launcher: None,
            initialized: false,
            active: true,
        }
    }

    /// The placed launcher, once built.
    #[must_use]
    pub const fn launcher(&self) -> Option<UnitId> {
        self.launcher
    }
}

impl Execution for SamLauncherExecution {
    fn init(&mut self, _game: &mut Game, _ticks: Tick) -> Result<()> {
        self.initialized = true;
        Ok(())
    }

    fn tick(&mut self, game: &mut Game, ticks: Tick, scheduler: &mut Scheduler) -> Result<()> {
        ensure_init(self.initialized, self.name())?;
        let Some(launcher) = self.launcher else {
            let Some(spawn) = game.can_build(self.owner, UnitType::SamLauncher, self.tile) else {
                debug!(player = %self.owner, tile = %self.tile, "SAM launcher no longer buildable");
                self.active = false;
                return Ok(());
            };
            self.launcher = Some(game.build_unit(
                self.owner,
                UnitType::SamLauncher,
                spawn,
                BuildParams::default(),
            )?);
            return Ok(());
        };
        let Some((owner, tile, cooling)) = game.active_unit(launcher).map(|u| {
            (
                u.owner(),
                u.tile(),
                u.is_cooling_down(ticks, game.config().sam_cooldown),
            )
        }) else {
            self.active = false;
            return Ok(());
        };
        if cooling {
            return Ok(());
        }

        let range = game.config().unit_info(UnitType::SamLauncher).attack_range;
        let Some(nuke) = find_interceptable(game, owner, tile, range) else {
            return Ok(());
        };
        if !game.claim_for_interception(nuke) {
            return Ok(());
        }
        debug!(player = %owner, %launcher, %nuke, "SAM firing");
        if let Some(unit) = game.unit_mut(launcher) {
            unit.start_cooldown(ticks);
        }
        scheduler.schedule(MissileExecution::intercept(owner, tile, nuke));
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn name(&self) -> &'static str {
        "SamLauncherExecution"
    }
}

//! Shells and guided missiles.
//!
//! Both fly over terrain with an [`AirPathFinder`] toward the target's
//! current tile and resolve on arrival. Both give up after a maximum
//! lifetime or as soon as the target disappears.

use tracing::debug;

use crate::error::Result;
use crate::execution::{Execution, Scheduler};
use crate::game::{Game, MessageType};
use crate::map::TileRef;
use crate::pathfinding::AirPathFinder;
use crate::player::PlayerId;
use crate::random::mix_seed;
use crate::unit::{BuildParams, UnitId, UnitType};
use crate::Tick;

use super::ensure_init;
use super::navigation::{fly, Step};

/// Flight state shared by shells and missiles.
#[derive(Debug)]
struct Flight {
    unit: UnitId,
    launched_at: Tick,
    finder: AirPathFinder,
}

/// Result of advancing a projectile one tick.
enum Advance {
    InFlight,
    Hit,
    Lost,
}

fn advance(
    game: &mut Game,
    flight: &mut Flight,
    target: UnitId,
    ticks: Tick,
    lifetime: Tick,
    speed: u32,
) -> Advance {
    let Some(target_tile) = game.active_unit(target).map(|u| u.tile()) else {
        return Advance::Lost;
    };
    if ticks.saturating_sub(flight.launched_at) >= lifetime {
        return Advance::Lost;
    }
    match fly(game, flight.unit, &mut flight.finder, target_tile, speed) {
        Step::Arrived => Advance::Hit,
        Step::Failed => Advance::Lost,
        Step::Moving | Step::Waiting => Advance::InFlight,
    }
}

fn launch(
    game: &mut Game,
    owner: PlayerId,
    unit_type: UnitType,
    from: TileRef,
    target: UnitId,
    ticks: Tick,
) -> Result<Flight> {
    let unit = game.build_unit(owner, unit_type, from, BuildParams::targeting_unit(target))?;
    Ok(Flight {
        unit,
        launched_at: ticks,
        finder: AirPathFinder::new(mix_seed(&[
            game.seed(),
            u64::from(unit.as_u32()),
            u64::from(target.as_u32()),
        ])),
    })
}

/// An unguided shell fired by a Viper.
#[derive(Debug)]
pub struct ShellExecution {
    owner: PlayerId,
    shooter: UnitId,
    target: UnitId,
    damage: u32,
    flight: Option<Flight>,
    initialized: bool,
    active: bool,
}

impl ShellExecution {
    /// Fire from `shooter`'s current tile at `target`.
    #[must_use]
    pub fn new(owner: PlayerId, shooter: UnitId, target: UnitId, damage: u32) -> Self {
        Self {
            owner,
            shooter,
            target,
            damage,
            flight: None,
            initialized: false,
            active: true,
        }
    }

    fn finish(&mut self, game: &mut Game) {
        if let Some(flight) = &self.flight {
            game.delete_unit(flight.unit);
        }
        self.active = false;
    }
}

impl Execution for ShellExecution {
    fn init(&mut self, _game: &mut Game, _ticks: Tick) -> Result<()> {
        self.initialized = true;
        Ok(())
    }

    fn tick(&mut self, game: &mut Game, ticks: Tick, _scheduler: &mut Scheduler) -> Result<()> {
        ensure_init(self.initialized, self.name())?;
        if self.flight.is_none() {
            let Some(from) = game.active_unit(self.shooter).map(|u| u.tile()) else {
                self.active = false;
                return Ok(());
            };
            self.flight = Some(launch(game, self.owner, UnitType::Shell, from, self.target, ticks)?);
        }
        let lifetime = game.config().shell_max_lifetime;
        let speed = game.config().unit_info(UnitType::Shell).speed;
        let Some(flight) = self.flight.as_mut() else {
            return Ok(());
        };
        match advance(game, flight, self.target, ticks, lifetime, speed) {
            Advance::InFlight => {}
            Advance::Hit => {
                let destroyed = game.damage_unit(self.target, self.damage);
                debug!(target = %self.target, damage = self.damage, destroyed, "Shell hit");
                self.finish(game);
            }
            Advance::Lost => self.finish(game),
        }
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn name(&self) -> &'static str {
        "ShellExecution"
    }
}

/// What a guided missile does on arrival.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissilePayload {
    /// Destroy a nuke claimed for interception.
    Intercept,
    /// Damage the target.
    Damage(u32),
}

/// A guided missile from a SAM launcher, a Condor or an orbital cannon.
#[derive(Debug)]
pub struct MissileExecution {
    owner: PlayerId,
    origin: TileRef,
    target: UnitId,
    payload: MissilePayload,
    flight: Option<Flight>,
    initialized: bool,
    active: bool,
}

impl MissileExecution {
    /// Missile from `origin` toward `target`.
    #[must_use]
    pub fn new(owner: PlayerId, origin: TileRef, target: UnitId, payload: MissilePayload) -> Self {
        Self {
            owner,
            origin,
            target,
            payload,
            flight: None,
            initialized: false,
            active: true,
        }
    }

    /// Interceptor aimed at a nuke that the launcher already claimed.
    #[must_use]
    pub fn intercept(owner: PlayerId, origin: TileRef, nuke: UnitId) -> Self {
        Self::new(owner, origin, nuke, MissilePayload::Intercept)
    }

    /// Damage missile.
    #[must_use]
    pub fn damage(owner: PlayerId, origin: TileRef, target: UnitId, damage: u32) -> Self {
        Self::new(owner, origin, target, MissilePayload::Damage(damage))
    }

    fn resolve(&self, game: &mut Game) {
        match self.payload {
            MissilePayload::Intercept => {
                let Some((nuke_owner, kind)) = game
                    .active_unit(self.target)
                    .map(|u| (u.owner(), u.unit_type()))
                else {
                    return;
                };
                game.delete_unit(self.target);
                debug!(nuke = %self.target, by = %self.owner, "Nuke intercepted");
                game.display_message(
                    format!("{} intercepted by {}", kind.name(), self.owner),
                    MessageType::Nuke,
                    Some(nuke_owner),
                );
                game.display_message(
                    format!("Intercepted an incoming {}", kind.name()),
                    MessageType::Success,
                    Some(self.owner),
                );
            }
            MissilePayload::Damage(amount) => {
                let destroyed = game.damage_unit(self.target, amount);
                debug!(target = %self.target, amount, destroyed, "Missile hit");
            }
        }
    }

    fn finish(&mut self, game: &mut Game) {
        if let Some(flight) = &self.flight {
            game.delete_unit(flight.unit);
        }
        self.active = false;
    }
}

impl Execution for MissileExecution {
    fn init(&mut self, _game: &mut Game, _ticks: Tick) -> Result<()> {
        self.initialized = true;
        Ok(())
    }

    fn tick(&mut self, game: &mut Game, ticks: Tick, _scheduler: &mut Scheduler) -> Result<()> {
        ensure_init(self.initialized, self.name())?;
        if self.flight.is_none() {
            if !game.is_unit_active(self.target) {
                self.active = false;
                return Ok(());
            }
            self.flight = Some(launch(
                game,
                self.owner,
                UnitType::SamMissile,
                self.origin,
                self.target,
                ticks,
            )?);
        }
        let lifetime = game.config().missile_max_lifetime;
        let speed = game.config().unit_info(UnitType::SamMissile).speed;
        let Some(flight) = self.flight.as_mut() else {
            return Ok(());
        };
        match advance(game, flight, self.target, ticks, lifetime, speed) {
            Advance::InFlight => {}
            Advance::Hit => {
                self.resolve(game);
                self.finish(game);
            }
            Advance::Lost => self.finish(game),
        }
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn name(&self) -> &'static str {
        "MissileExecution"
    }
}

//! Unit identity, the closed unit-type enum, and per-unit state.
//!
//! Units are owned by [`crate::game::Game`] and referenced everywhere else
//! by [`UnitId`]. A unit can be destroyed by any execution between two
//! ticks of another, so every stored id must be re-checked with
//! [`Unit::is_active`] before it is acted on.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::map::TileRef;
use crate::math::{fixed_serde, Fixed};
use crate::player::PlayerId;
use crate::Tick;

/// Unique identifier for units. Assigned sequentially, never reused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UnitId(u32);

impl UnitId {
    /// Wrap a raw id.
    #[must_use]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Raw numeric value.
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for UnitId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "U{}", self.0)
    }
}

/// Every kind of unit in the game.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum UnitType {
    /// Raises the population cap.
    City,
    /// Ocean-shore structure that builds warships and sends trade ships.
    Port,
    /// Makes nearby tiles more expensive to conquer.
    DefensePost,
    /// Launches nuclear weapons.
    MissileSilo,
    /// Intercepts incoming nukes.
    SamLauncher,
    /// Long range anti-ship battery.
    OrbitalCannon,
    /// Light warship firing shells.
    Viper,
    /// Heavy warship firing guided missiles; can intercept nukes.
    Condor,
    /// Carries troops across water.
    TransportShip,
    /// Carries goods between ports.
    TradeShip,
    /// Warship projectile.
    Shell,
    /// Guided missile (interception and anti-ship strikes).
    SamMissile,
    /// Small nuclear bomb.
    AtomBomb,
    /// Large nuclear bomb.
    HydrogenBomb,
    /// Multiple warhead carrier.
    Mirv,
    /// Warhead released by a MIRV.
    MirvWarhead,
    /// Placeholder shown while a structure or ship is being built.
    Construction,
}

impl UnitType {
    /// All unit types, in declaration order.
    pub const ALL: [Self; 17] = [
        Self::City,
        Self::Port,
        Self::DefensePost,
        Self::MissileSilo,
        Self::SamLauncher,
        Self::OrbitalCannon,
        Self::Viper,
        Self::Condor,
        Self::TransportShip,
        Self::TradeShip,
        Self::Shell,
        Self::SamMissile,
        Self::AtomBomb,
        Self::HydrogenBomb,
        Self::Mirv,
        Self::MirvWarhead,
        Self::Construction,
    ];

    /// Land structures occupying a tile.
    #[must_use]
    pub const fn is_structure(self) -> bool {
        matches!(
            self,
            Self::City
                | Self::Port
                | Self::DefensePost
                | Self::MissileSilo
                | Self::SamLauncher
                | Self::OrbitalCannon
                | Self::Construction
        )
    }

    /// Combat ships.
    #[must_use]
    pub const fn is_warship(self) -> bool {
        matches!(self, Self::Viper | Self::Condor)
    }

    /// Anything that sails.
    #[must_use]
    pub const fn is_naval(self) -> bool {
        matches!(
            self,
            Self::Viper | Self::Condor | Self::TransportShip | Self::TradeShip
        )
    }

    /// Weapons launched from a missile silo.
    #[must_use]
    pub const fn is_silo_launched(self) -> bool {
        matches!(self, Self::AtomBomb | Self::HydrogenBomb | Self::Mirv)
    }

    /// Nukes that detonate on a target tile.
    #[must_use]
    pub const fn is_nuke(self) -> bool {
        matches!(self, Self::AtomBomb | Self::HydrogenBomb | Self::MirvWarhead)
    }

    /// Nukes a SAM launcher or Condor may claim and shoot down.
    #[must_use]
    pub const fn is_interceptable(self) -> bool {
        matches!(self, Self::AtomBomb | Self::HydrogenBomb)
    }

    /// Transient projectiles, never targeted by warships.
    #[must_use]
    pub const fn is_projectile(self) -> bool {
        matches!(
            self,
            Self::Shell
                | Self::SamMissile
                | Self::AtomBomb
                | Self::HydrogenBomb
                | Self::Mirv
                | Self::MirvWarhead
        )
    }

    /// Display name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::City => "City",
            Self::Port => "Port",
            Self::DefensePost => "Defense Post",
            Self::MissileSilo => "Missile Silo",
            Self::SamLauncher => "SAM Launcher",
            Self::OrbitalCannon => "Orbital Cannon",
            Self::Viper => "Viper",
            Self::Condor => "Condor",
            Self::TransportShip => "Transport Ship",
            Self::TradeShip => "Trade Ship",
            Self::Shell => "Shell",
            Self::SamMissile => "SAM Missile",
            Self::AtomBomb => "Atom Bomb",
            Self::HydrogenBomb => "Hydrogen Bomb",
            Self::Mirv => "MIRV",
            Self::MirvWarhead => "MIRV Warhead",
            Self::Construction => "Construction",
        }
    }
}

/// Optional state supplied when a unit is built.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildParams {
    /// Troops carried (transport ships).
    pub troops: u64,
    /// Initial target tile (nukes, transports).
    pub target_tile: Option<TileRef>,
    /// Initial target unit (trade ships heading to a port).
    pub target_unit: Option<UnitId>,
    /// What a construction placeholder is building.
    pub construction_type: Option<UnitType>,
}

impl BuildParams {
    /// Params for a construction placeholder.
    #[must_use]
    pub fn construction(of: UnitType) -> Self {
        Self {
            construction_type: Some(of),
            ..Self::default()
        }
    }

    /// Params with a target tile.
    #[must_use]
    pub fn targeting_tile(tile: TileRef) -> Self {
        Self {
            target_tile: Some(tile),
            ..Self::default()
        }
    }

    /// Params with a target unit.
    #[must_use]
    pub fn targeting_unit(unit: UnitId) -> Self {
        Self {
            target_unit: Some(unit),
            ..Self::default()
        }
    }
}

/// A unit on the map.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Unit {
    id: UnitId,
    unit_type: UnitType,
    owner: PlayerId,
    tile: TileRef,
    last_tile: TileRef,
    health: Option<u32>,
    max_health: Option<u32>,
    active: bool,
    created_at: Tick,
    target_unit: Option<UnitId>,
    target_tile: Option<TileRef>,
    move_target: Option<TileRef>,
    construction_type: Option<UnitType>,
    #[serde(with = "fixed_serde")]
    construction_progress: Fixed,
    troops: u64,
    cooldown_start: Option<Tick>,
    targeted_by_sam: bool,
    port_queue: Option<UnitId>,
    trail: VecDeque<TileRef>,
}

impl Unit {
    pub(crate) fn new(
        id: UnitId,
        unit_type: UnitType,
        owner: PlayerId,
        tile: TileRef,
        max_health: Option<u32>,
        created_at: Tick,
        params: BuildParams,
    ) -> Self {
        Self {
            id,
            unit_type,
            owner,
            tile,
            last_tile: tile,
            health: max_health,
            max_health,
            active: true,
            created_at,
            target_unit: params.target_unit,
            target_tile: params.target_tile,
            move_target: None,
            construction_type: params.construction_type,
            construction_progress: Fixed::ZERO,
            troops: params.troops,
            cooldown_start: None,
            targeted_by_sam: false,
            port_queue: None,
            trail: VecDeque::new(),
        }
    }

    /// Unit id.
    #[must_use]
    pub const fn id(&self) -> UnitId {
        self.id
    }

    /// Unit type.
    #[must_use]
    pub const fn unit_type(&self) -> UnitType {
        self.unit_type
    }

    /// Current owner.
    #[must_use]
    pub const fn owner(&self) -> PlayerId {
        self.owner
    }

    /// Current tile.
    #[must_use]
    pub const fn tile(&self) -> TileRef {
        self.tile
    }

    /// Tile occupied before the last move.
    #[must_use]
    pub const fn last_tile(&self) -> TileRef {
        self.last_tile
    }

    /// False once the unit was deleted.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.active
    }

    /// Units without health die to any hit.
    #[must_use]
    pub const fn has_health(&self) -> bool {
        self.health.is_some()
    }

    /// Current health, if the type has health.
    #[must_use]
    pub const fn health(&self) -> Option<u32> {
        self.health
    }

    /// Maximum health, if the type has health.
    #[must_use]
    pub const fn max_health(&self) -> Option<u32> {
        self.max_health
    }

    /// Tick the unit was built.
    #[must_use]
    pub const fn created_at(&self) -> Tick {
        self.created_at
    }

    /// Unit this one is chasing or heading to.
    #[must_use]
    pub const fn target_unit(&self) -> Option<UnitId> {
        self.target_unit
    }

    /// Tile this one is heading to.
    #[must_use]
    pub const fn target_tile(&self) -> Option<TileRef> {
        self.target_tile
    }

    /// Destination set by a direct player command.
    #[must_use]
    pub const fn move_target(&self) -> Option<TileRef> {
        self.move_target
    }

    /// What a construction placeholder is building.
    #[must_use]
    pub const fn construction_type(&self) -> Option<UnitType> {
        self.construction_type
    }

    /// Construction progress in `[0, 1]`.
    #[must_use]
    pub const fn construction_progress(&self) -> Fixed {
        self.construction_progress
    }

    /// Troops on board.
    #[must_use]
    pub const fn troops(&self) -> u64 {
        self.troops
    }

    /// Tick the current cooldown started, if any.
    #[must_use]
    pub const fn cooldown_start(&self) -> Option<Tick> {
        self.cooldown_start
    }

    /// Returns true while `ticks - cooldown_start < duration`.
    #[must_use]
    pub fn is_cooling_down(&self, ticks: Tick, duration: Tick) -> bool {
        self.cooldown_start
            .is_some_and(|start| ticks.saturating_sub(start) < duration)
    }

    /// Whether an interceptor already claimed this nuke.
    #[must_use]
    pub const fn targeted_by_sam(&self) -> bool {
        self.targeted_by_sam
    }

    /// Construction currently holding this port's warship slot.
    #[must_use]
    pub const fn port_queue(&self) -> Option<UnitId> {
        self.port_queue
    }

    /// Returns true if this port's warship slot is taken.
    #[must_use]
    pub const fn has_port_queue(&self) -> bool {
        self.port_queue.is_some()
    }

    /// Recently visited tiles, oldest first.
    #[must_use]
    pub fn trail(&self) -> &VecDeque<TileRef> {
        &self.trail
    }

    pub(crate) fn set_owner(&mut self, owner: PlayerId) {
        self.owner = owner;
    }

    pub(crate) fn move_to(&mut self, tile: TileRef, trail_length: usize) {
        self.last_tile = self.tile;
        self.tile = tile;
        if trail_length > 0 {
            self.trail.push_back(tile);
            while self.trail.len() > trail_length {
                self.trail.pop_front();
            }
        }
    }

    pub(crate) fn modify_health(&mut self, delta: i64) {
        if let (Some(health), Some(max)) = (self.health, self.max_health) {
            let next = (i64::from(health) + delta).clamp(0, i64::from(max));
            self.health = Some(next as u32);
        }
    }

    pub(crate) fn deactivate(&mut self) {
        self.active = false;
    }

    /// Set the tile this unit is heading to.
    pub fn set_target_tile(&mut self, tile: Option<TileRef>) {
        self.target_tile = tile;
    }

    /// Set the unit this one is chasing or heading to.
    pub fn set_target_unit(&mut self, unit: Option<UnitId>) {
        self.target_unit = unit;
    }

    /// Set or clear the player-issued move target.
    pub fn set_move_target(&mut self, tile: Option<TileRef>) {
        self.move_target = tile;
    }

    pub(crate) fn set_construction_progress(&mut self, progress: Fixed) {
        self.construction_progress = progress.clamp(Fixed::ZERO, Fixed::ONE);
    }

    pub(crate) fn start_cooldown(&mut self, ticks: Tick) {
        self.cooldown_start = Some(ticks);
    }

    pub(crate) fn set_targeted_by_sam(&mut self) {
        self.targeted_by_sam = true;
    }

    pub(crate) fn set_port_queue(&mut self, holder: Option<UnitId>) {
        self.port_queue = holder;
    }
}

//! Decision helpers shared by the AI tiers: cadence, build placement,
//! nuke targeting and the overseas target search.

use std::cmp::Reverse;

use crate::execution::Scheduler;
use crate::executions::ConstructionExecution;
use crate::game::Game;
use crate::map::TileRef;
use crate::math::UNIT_CIRCLE_16;
use crate::player::{Owner, PlayerId};
use crate::random::PseudoRandom;
use crate::unit::UnitType;
use crate::Tick;

/// Random owned tiles tried when placing a structure.
const PLACEMENT_TRIES: usize = 20;

/// Radius counted when scoring a nuke target by nearby structures.
const NUKE_SCORE_RADIUS: u32 = 15;

/// Strikes closer than this to a recent one are penalised.
const RECENT_STRIKE_RADIUS: u32 = 30;

/// How long a strike counts as recent.
pub const RECENT_STRIKE_TICKS: Tick = 600;

/// Samples taken along the invasion ray.
const INVASION_SAMPLES: i64 = 100;

/// Distance between two invasion samples, in tiles.
const INVASION_STEP: i64 = 3;

/// Periodic decision gate with a per-instance period and phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cadence {
    period: Tick,
    phase: Tick,
}

impl Cadence {
    /// Period drawn from `[min, max]`, phase from `[0, period)`.
    pub fn random(rng: &mut PseudoRandom, min: Tick, max: Tick) -> Self {
        let min = min.max(1);
        let max = max.max(min);
        let period = rng.next_int(min as i64, max as i64 + 1) as Tick;
        let phase = rng.next_int(0, period as i64) as Tick;
        Self { period, phase }
    }

    /// Fixed period with a random phase.
    pub fn with_period(rng: &mut PseudoRandom, period: Tick) -> Self {
        Self::random(rng, period, period)
    }

    /// Decision period.
    #[must_use]
    pub const fn period(&self) -> Tick {
        self.period
    }

    /// Returns true on the ticks this instance acts.
    #[must_use]
    pub const fn is_due(&self, ticks: Tick) -> bool {
        ticks % self.period == self.phase
    }
}

/// One slot of a build rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildSlot {
    /// A structure, up to `cap` owned.
    Structure(UnitType, usize),
    /// Warships, up to `cap` owned in total, mixed by [`warship_type`].
    Warships(usize),
}

/// Viper or Condor, keeping three Vipers per Condor.
#[must_use]
pub fn warship_type(game: &Game, owner: PlayerId) -> UnitType {
    let vipers = game.count_units(owner, UnitType::Viper);
    let condors = game.count_units(owner, UnitType::Condor);
    if vipers >= 3 * (condors + 1) {
        UnitType::Condor
    } else {
        UnitType::Viper
    }
}

/// Find where `unit_type` could go: a random owned shore for ports, the
/// nearest port for warships, a random owned tile otherwise.
pub fn build_site(
    game: &Game,
    owner: PlayerId,
    unit_type: UnitType,
    rng: &mut PseudoRandom,
) -> Option<TileRef> {
    let player = game.player(owner)?;
    let tiles: Vec<TileRef> = if unit_type == UnitType::Port {
        player
            .border_tiles()
            .iter()
            .copied()
            .filter(|&t| game.is_ocean_shore(t))
            .collect()
    } else {
        player.tiles().iter().copied().collect()
    };
    if tiles.is_empty() {
        return None;
    }
    for _ in 0..PLACEMENT_TRIES {
        let &tile = rng.choose(&tiles)?;
        if game.can_build(owner, unit_type, tile).is_some() {
            return Some(tile);
        }
    }
    None
}

/// Walk the rotation from `start` and schedule the first slot that is
/// under its cap, affordable and placeable. Returns the slot index used.
pub fn build_next(
    game: &Game,
    owner: PlayerId,
    rotation: &[BuildSlot],
    start: usize,
    rng: &mut PseudoRandom,
    scheduler: &mut Scheduler,
) -> Option<usize> {
    for offset in 0..rotation.len() {
        let index = (start + offset) % rotation.len();
        let unit_type = match rotation[index] {
            BuildSlot::Structure(unit_type, cap) => {
                if game.count_units(owner, unit_type) >= cap {
                    continue;
                }
                unit_type
            }
            BuildSlot::Warships(cap) => {
                let fleet = game.count_units(owner, UnitType::Viper)
                    + game.count_units(owner, UnitType::Condor);
                if fleet >= cap {
                    continue;
                }
                warship_type(game, owner)
            }
        };
        if let Some(tile) = build_site(game, owner, unit_type, rng) {
            scheduler.schedule(ConstructionExecution::new(owner, unit_type, tile));
            return Some(index);
        }
    }
    None
}

/// Pick the best nuke target on `enemy`'s land and the weapon to use.
///
/// Candidates are the enemy's structures. Each scores ten points per
/// enemy structure within [`NUKE_SCORE_RADIUS`], minus a tenth of the
/// distance to the launching silo, minus fifty per recent strike nearby.
#[must_use]
pub fn nuke_target(
    game: &Game,
    owner: PlayerId,
    enemy: PlayerId,
    recent_strikes: &[(TileRef, Tick)],
    ticks: Tick,
) -> Option<(UnitType, TileRef)> {
    let silos: Vec<TileRef> = game
        .units_of(owner, UnitType::MissileSilo)
        .iter()
        .map(|s| s.tile())
        .collect();
    if silos.is_empty() {
        return None;
    }
    let structures: Vec<TileRef> = game
        .all_units()
        .filter(|u| {
            u.owner() == enemy
                && u.unit_type().is_structure()
                && u.unit_type() != UnitType::Construction
        })
        .map(|u| u.tile())
        .collect();
    let radius_sq = u64::from(NUKE_SCORE_RADIUS) * u64::from(NUKE_SCORE_RADIUS);

    let best = structures
        .iter()
        .map(|&tile| {
            let nearby = structures
                .iter()
                .filter(|&&other| game.euclidean_dist_squared(tile, other) <= radius_sq)
                .count() as i64;
            let silo_dist = silos
                .iter()
                .map(|&s| game.manhattan_dist(s, tile))
                .min()
                .unwrap_or(0);
            let recent = recent_strikes
                .iter()
                .filter(|(at, when)| {
                    ticks.saturating_sub(*when) < RECENT_STRIKE_TICKS
                        && game.manhattan_dist(*at, tile) < RECENT_STRIKE_RADIUS
                })
                .count() as i64;
            let score = nearby * 10 - i64::from(silo_dist) / 10 - recent * 50;
            (score, tile)
        })
        .max_by_key(|&(score, tile)| (score, Reverse(tile)))?;

    let (_, tile) = best;
    [UnitType::HydrogenBomb, UnitType::AtomBomb]
        .into_iter()
        .find(|&weapon| game.can_build(owner, weapon, tile).is_some())
        .map(|weapon| (weapon, tile))
}

/// Search for a hostile or unclaimed shore overseas.
///
/// Starts from a random own shore tile and samples outward along one
/// random compass direction, [`INVASION_STEP`] tiles at a time. The same
/// angle is used for every sample of a search, so a search covers a ray
/// and successive searches cover different rays.
pub fn overseas_target(game: &Game, owner: PlayerId, rng: &mut PseudoRandom) -> Option<TileRef> {
    let player = game.player(owner)?;
    let shores: Vec<TileRef> = player
        .border_tiles()
        .iter()
        .copied()
        .filter(|&t| game.is_ocean_shore(t))
        .collect();
    let &origin = rng.choose(&shores)?;
    let (dx, dy) = UNIT_CIRCLE_16[rng.next_index(UNIT_CIRCLE_16.len())];
    let (ox, oy) = (i64::from(game.map().x(origin)), i64::from(game.map().y(origin)));

    for i in 1..=INVASION_SAMPLES {
        let distance = i * INVASION_STEP;
        let x = ox + i64::from(dx) * distance / 1000;
        let y = oy + i64::from(dy) * distance / 1000;
        let Some(tile) = game.map().tile(x, y) else {
            break;
        };
        if !game.is_ocean_shore(tile) {
            continue;
        }
        let hostile = match game.owner(tile) {
            Owner::TerraNullius => true,
            Owner::Player(other) => !game.is_friendly(owner, other),
        };
        if hostile {
            return Some(tile);
        }
    }
    None
}

/// An ocean tile next to `shore`, for escorts.
#[must_use]
pub fn ocean_next_to(game: &Game, shore: TileRef) -> Option<TileRef> {
    game.neighbors(shore).into_iter().find(|&n| game.is_ocean(n))
}

//! Path finding for ships and munitions.
//!
//! Two finders answer the same question, "which tile next?":
//!
//! - [`PathFinder`] runs a time-sliced A* over water. One call expands a
//!   bounded number of nodes and may answer [`PathResult::Pending`]; the
//!   caller simply asks again next tick.
//! - [`AirPathFinder`] ignores terrain and steps straight at the target,
//!   for shells, missiles and nukes.
//!
//! [`PathResult::PathNotFound`] is terminal for a finder instance. Callers
//! that still want to move build a fresh one.

mod astar;

pub use astar::{SearchStatus, SerialAStar};

use tracing::debug;

use crate::map::{GameMap, TileRef};
use crate::random::PseudoRandom;

/// Default nodes expanded per call.
pub const DEFAULT_ITERATIONS: usize = 10_000;

/// Default calls allowed per search before giving up.
pub const DEFAULT_MAX_TRIES: u32 = 20;

/// Answer to "which tile next?".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathResult {
    /// Already within tolerance of the destination; carries the current tile.
    Completed(TileRef),
    /// Step to this tile.
    NextTile(TileRef),
    /// Still searching; ask again next tick.
    Pending,
    /// No path. This finder will keep answering this.
    PathNotFound,
}

/// Time-sliced water path finder with a cached path.
#[derive(Debug, Clone)]
pub struct PathFinder {
    iterations: usize,
    max_tries: u32,
    tries: u32,
    destination: Option<TileRef>,
    path: Option<Vec<TileRef>>,
    search: Option<SerialAStar>,
    failed: bool,
}

impl PathFinder {
    /// Finder expanding at most `iterations` nodes per call, giving up on
    /// a search after `max_tries` calls.
    #[must_use]
    pub fn mini(iterations: usize, max_tries: u32) -> Self {
        Self {
            iterations: iterations.max(1),
            max_tries: max_tries.max(1),
            tries: 0,
            destination: None,
            path: None,
            search: None,
            failed: false,
        }
    }

    /// Returns true once this finder answered [`PathResult::PathNotFound`].
    #[must_use]
    pub const fn has_failed(&self) -> bool {
        self.failed
    }

    /// Next step from `from` toward `to`. `Completed` once the manhattan
    /// distance is at most `radius`.
    pub fn next_tile(&mut self, map: &GameMap, from: TileRef, to: TileRef, radius: u32) -> PathResult {
        if self.failed {
            return PathResult::PathNotFound;
        }
        if map.manhattan_dist(from, to) <= radius {
            return PathResult::Completed(from);
        }
        if self.destination != Some(to) {
            self.destination = Some(to);
            self.path = None;
            self.search = None;
            self.tries = 0;
        }

        if self.path.is_some() {
            if let Some(next) = self.follow_cached(from) {
                return PathResult::NextTile(next);
            }
            debug!(%from, %to, "Cached path is stale, recomputing");
            self.path = None;
        }

        let search = self
            .search
            .get_or_insert_with(|| SerialAStar::new(map, from, to));
        self.tries += 1;
        match search.compute(map, self.iterations) {
            SearchStatus::Completed => {
                let path = search.reconstruct_path();
                self.search = None;
                self.tries = 0;
                self.path = Some(path);
                match self.follow_cached(from) {
                    Some(next) => PathResult::NextTile(next),
                    // the unit moved while the search was running
                    None => {
                        self.path = None;
                        PathResult::Pending
                    }
                }
            }
            SearchStatus::Pending if self.tries < self.max_tries => PathResult::Pending,
            SearchStatus::Pending | SearchStatus::NotFound => {
                debug!(%from, %to, tries = self.tries, "No path");
                self.search = None;
                self.failed = true;
                PathResult::PathNotFound
            }
        }
    }

    /// Step along the cached path. `None` when `from` is off the path or
    /// the next tile would not move the unit.
    fn follow_cached(&mut self, from: TileRef) -> Option<TileRef> {
        let path = self.path.as_mut()?;
        let pos = path.iter().position(|&t| t == from)?;
        let next = *path.get(pos + 1)?;
        if next == from {
            return None;
        }
        path.drain(..=pos);
        Some(next)
    }
}

impl Default for PathFinder {
    fn default() -> Self {
        Self::mini(DEFAULT_ITERATIONS, DEFAULT_MAX_TRIES)
    }
}

/// Terrain-blind finder for projectiles.
///
/// Steps one tile per call along x or y, picking the axis at random
/// weighted by the remaining distance on each, so paths look diagonal
/// without floats. Always arrives in exactly `manhattan(from, to)` steps.
#[derive(Debug, Clone)]
pub struct AirPathFinder {
    rng: PseudoRandom,
}

impl AirPathFinder {
    /// Finder with its own PRNG stream.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            rng: PseudoRandom::new(seed),
        }
    }

    /// Next step from `from` toward `to`.
    pub fn next_tile(&mut self, map: &GameMap, from: TileRef, to: TileRef) -> PathResult {
        if from == to {
            return PathResult::Completed(from);
        }
        let (x, y) = (i64::from(map.x(from)), i64::from(map.y(from)));
        let dx = i64::from(map.x(to)) - x;
        let dy = i64::from(map.y(to)) - y;
        let move_x = if dx == 0 {
            false
        } else if dy == 0 {
            true
        } else {
            self.rng.next_int(0, dx.abs() + dy.abs()) < dx.abs()
        };
        let next = if move_x {
            map.tile(x + dx.signum(), y)
        } else {
            map.tile(x, y + dy.signum())
        };
        next.map_or(PathResult::PathNotFound, PathResult::NextTile)
    }
}

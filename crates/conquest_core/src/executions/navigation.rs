//! Movement helpers shared by ship and projectile executions.

use crate::game::Game;
use crate::map::TileRef;
use crate::pathfinding::{AirPathFinder, PathFinder, PathResult};
use crate::unit::UnitId;

/// Ticks without moving before a ship drops its path finder.
pub const STUCK_TICKS: u32 = 30;

/// Outcome of moving a unit for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Moved at least one tile, not there yet.
    Moving,
    /// Within tolerance of the destination.
    Arrived,
    /// The path is still being computed.
    Waiting,
    /// No path; the finder is spent.
    Failed,
}

/// Sail `unit` up to `speed` tiles toward `dst` over water.
pub fn sail(
    game: &mut Game,
    unit: UnitId,
    finder: &mut PathFinder,
    dst: TileRef,
    radius: u32,
    speed: u32,
) -> Step {
    let mut step = Step::Waiting;
    for _ in 0..speed.max(1) {
        let Some(from) = game.active_unit(unit).map(|u| u.tile()) else {
            return Step::Failed;
        };
        match finder.next_tile(game.map(), from, dst, radius) {
            PathResult::NextTile(next) => {
                game.move_unit(unit, next);
                step = Step::Moving;
            }
            PathResult::Completed(_) => return Step::Arrived,
            PathResult::Pending => return step,
            PathResult::PathNotFound => return Step::Failed,
        }
    }
    step
}

/// Fly `unit` up to `speed` tiles toward `dst`, ignoring terrain.
pub fn fly(game: &mut Game, unit: UnitId, finder: &mut AirPathFinder, dst: TileRef, speed: u32) -> Step {
    for _ in 0..speed.max(1) {
        let Some(from) = game.active_unit(unit).map(|u| u.tile()) else {
            return Step::Failed;
        };
        match finder.next_tile(game.map(), from, dst) {
            PathResult::NextTile(next) => game.move_unit(unit, next),
            PathResult::Completed(_) => return Step::Arrived,
            PathResult::Pending => return Step::Waiting,
            PathResult::PathNotFound => return Step::Failed,
        }
    }
    match game.active_unit(unit) {
        Some(u) if u.tile() == dst => Step::Arrived,
        Some(_) => Step::Moving,
        None => Step::Failed,
    }
}

/// Counts ticks a unit spends on the same tile while it wants to move.
#[derive(Debug, Clone, Default)]
pub struct StuckDetector {
    last_tile: Option<TileRef>,
    idle_ticks: u32,
}

impl StuckDetector {
    /// Record the unit's tile; returns true once it has been idle for
    /// [`STUCK_TICKS`], and resets.
    pub fn observe(&mut self, tile: TileRef) -> bool {
        if self.last_tile == Some(tile) {
            self.idle_ticks += 1;
        } else {
            self.last_tile = Some(tile);
            self.idle_ticks = 0;
        }
        if self.idle_ticks >= STUCK_TICKS {
            self.idle_ticks = 0;
            return true;
        }
        false
    }

    /// Forget history (destination changed).
    pub fn reset(&mut self) {
        self.last_tile = None;
        self.idle_ticks = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stuck_detector_fires_after_idle_window() {
        let mut detector = StuckDetector::default();
        let tile = TileRef::new(5);
        assert!(!detector.observe(tile));
        for _ in 1..STUCK_TICKS {
            assert!(!detector.observe(tile));
        }
        assert!(detector.observe(tile));
        assert!(!detector.observe(tile));
    }

    #[test]
    fn test_movement_resets_stuck_detector() {
        let mut detector = StuckDetector::default();
        for i in 0..(STUCK_TICKS * 3) {
            assert!(!detector.observe(TileRef::new(i)));
        }
    }
}

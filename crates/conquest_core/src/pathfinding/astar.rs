//! Resumable A* over the tile grid.
//!
//! [`SerialAStar`] keeps its open set between calls so a search can be
//! spread across several ticks. Ships traverse water; the source and
//! destination tiles may be shore land (ports, landing sites).

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

use crate::map::{GameMap, TileRef};

/// Outcome of one [`SerialAStar::compute`] slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchStatus {
    /// The destination was reached; call [`SerialAStar::reconstruct_path`].
    Completed,
    /// The node budget ran out; call again later.
    Pending,
    /// The open set is exhausted.
    NotFound,
}

/// A node in the open set.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
struct Node {
    tile: TileRef,
    f_score: u32,
    h_score: u32,
}

impl Ord for Node {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap; reverse for lowest f first, then lowest
        // h, then lowest tile id.
        other
            .f_score
            .cmp(&self.f_score)
            .then_with(|| other.h_score.cmp(&self.h_score))
            .then_with(|| other.tile.cmp(&self.tile))
    }
}

impl PartialOrd for Node {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Time-sliced A* search from `src` to `dst`.
#[derive(Debug, Clone)]
pub struct SerialAStar {
    src: TileRef,
    dst: TileRef,
    open: BinaryHeap<Node>,
    came_from: HashMap<TileRef, TileRef>,
    g_score: HashMap<TileRef, u32>,
    found: bool,
}

impl SerialAStar {
    /// Start a search. Nothing is expanded until [`Self::compute`].
    #[must_use]
    pub fn new(map: &GameMap, src: TileRef, dst: TileRef) -> Self {
        let mut open = BinaryHeap::new();
        let h_score = map.manhattan_dist(src, dst);
        open.push(Node {
            tile: src,
            f_score: h_score,
            h_score,
        });
        let mut g_score = HashMap::new();
        g_score.insert(src, 0);
        Self {
            src,
            dst,
            open,
            came_from: HashMap::new(),
            g_score,
            found: false,
        }
    }

    /// Source tile.
    #[must_use]
    pub const fn src(&self) -> TileRef {
        self.src
    }

    /// Destination tile.
    #[must_use]
    pub const fn dst(&self) -> TileRef {
        self.dst
    }

    fn traversable(&self, map: &GameMap, tile: TileRef) -> bool {
        tile == self.src || tile == self.dst || map.is_water(tile)
    }

    /// Expand at most `budget` nodes.
    pub fn compute(&mut self, map: &GameMap, budget: usize) -> SearchStatus {
        if self.found {
            return SearchStatus::Completed;
        }
        for _ in 0..budget {
            let Some(current) = self.open.pop() else {
                return SearchStatus::NotFound;
            };
            if current.tile == self.dst {
                self.found = true;
                return SearchStatus::Completed;
            }
            let current_g = self.g_score.get(&current.tile).copied().unwrap_or(u32::MAX);
            // stale heap entry
            if current.f_score > current_g.saturating_add(current.h_score) {
                continue;
            }
            for next in map.neighbors(current.tile) {
                if !self.traversable(map, next) {
                    continue;
                }
                let tentative = current_g + 1;
                if tentative < self.g_score.get(&next).copied().unwrap_or(u32::MAX) {
                    self.came_from.insert(next, current.tile);
                    self.g_score.insert(next, tentative);
                    let h_score = map.manhattan_dist(next, self.dst);
                    self.open.push(Node {
                        tile: next,
                        f_score: tentative + h_score,
                        h_score,
                    });
                }
            }
        }
        if self.open.is_empty() {
            SearchStatus::NotFound
        } else {
            SearchStatus::Pending
        }
    }

    /// Path from `src` to `dst`, both included. Empty until completed.
    #[must_use]
    pub fn reconstruct_path(&self) -> Vec<TileRef> {
        if !self.found {
            return Vec::new();
        }
        let mut path = vec![self.dst];
        let mut current = self.dst;
        while let Some(&prev) = self.came_from.get(&current) {
            path.push(prev);
            current = prev;
        }
        path.reverse();
        path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_to_end(search: &mut SerialAStar, map: &GameMap) -> SearchStatus {
        loop {
            match search.compute(map, 4) {
                SearchStatus::Pending => continue,
                done => return done,
            }
        }
    }

    #[test]
    fn test_straight_water_path() {
        let map = GameMap::from_ascii(&["#~~~~#"]).unwrap();
        let src = map.tile(0, 0).unwrap();
        let dst = map.tile(5, 0).unwrap();
        let mut search = SerialAStar::new(&map, src, dst);
        assert_eq!(run_to_end(&mut search, &map), SearchStatus::Completed);
        let path = search.reconstruct_path();
        assert_eq!(path.len(), 6);
        assert_eq!(path.first(), Some(&src));
        assert_eq!(path.last(), Some(&dst));
    }

    #[test]
    fn test_land_blocks_ships() {
        let map = GameMap::from_ascii(&["~~#~~"]).unwrap();
        let src = map.tile(0, 0).unwrap();
        let dst = map.tile(4, 0).unwrap();
        let mut search = SerialAStar::new(&map, src, dst);
        assert_eq!(run_to_end(&mut search, &map), SearchStatus::NotFound);
        assert!(search.reconstruct_path().is_empty());
    }

    #[test]
    fn test_budget_slices_the_search() {
        let map = GameMap::from_ascii(&["~~~~~~~~~~~~~~~~~~~~"]).unwrap();
        let src = map.tile(0, 0).unwrap();
        let dst = map.tile(19, 0).unwrap();
        let mut search = SerialAStar::new(&map, src, dst);
        assert_eq!(search.compute(&map, 3), SearchStatus::Pending);
        assert_eq!(run_to_end(&mut search, &map), SearchStatus::Completed);
    }

    #[test]
    fn test_paths_are_deterministic() {
        let map = GameMap::from_ascii(&["~~~~~~", "~~~~~~", "~~~~~~", "~~~~~~"]).unwrap();
        let src = map.tile(0, 0).unwrap();
        let dst = map.tile(5, 3).unwrap();
        let mut a = SerialAStar::new(&map, src, dst);
        let mut b = SerialAStar::new(&map, src, dst);
        run_to_end(&mut a, &map);
        run_to_end(&mut b, &map);
        assert_eq!(a.reconstruct_path(), b.reconstruct_path());
    }
}

//! Tile grid terrain and spatial queries.
//!
//! Tiles are addressed by an opaque [`TileRef`]. Coordinates only exist
//! for distance computation and display; identity is always the handle.

use serde::{Deserialize, Serialize};

use crate::error::{GameError, Result};

/// Opaque handle to a map cell.
///
/// Cheap to copy and compare, usable as a map/set key. The raw value is a
/// row-major index into the owning [`GameMap`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TileRef(u32);

impl TileRef {
    /// Wrap a raw tile index.
    #[must_use]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Raw row-major index.
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for TileRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Terrain classification for a single tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Terrain {
    /// Conquerable land.
    #[default]
    Land,
    /// Open ocean, navigable by ships.
    Ocean,
    /// Inland water. Navigable, but ports and trade need ocean access.
    Lake,
}

impl Terrain {
    /// Returns true for ocean and lake tiles.
    #[must_use]
    pub const fn is_water(self) -> bool {
        matches!(self, Self::Ocean | Self::Lake)
    }
}

/// Rectangular tile map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameMap {
    /// Map width in tiles.
    width: u32,
    /// Map height in tiles.
    height: u32,
    /// Terrain stored in row-major order.
    terrain: Vec<Terrain>,
}

impl GameMap {
    /// Create a map where every tile is land.
    ///
    /// # Panics
    ///
    /// Panics if `width` or `height` is zero.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        assert!(width > 0, "GameMap width must be positive");
        assert!(height > 0, "GameMap height must be positive");
        Self {
            width,
            height,
            terrain: vec![Terrain::Land; (width as usize) * (height as usize)],
        }
    }

    /// Parse a map from ASCII rows: `#` land, `~` ocean, `o` lake.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::ConfigParse`] for ragged rows, empty input or
    /// unknown characters.
    pub fn from_ascii(rows: &[&str]) -> Result<Self> {
        let height = rows.len();
        let width = rows.first().map_or(0, |r| r.chars().count());
        if width == 0 || height == 0 {
            return Err(GameError::ConfigParse {
                path: "<ascii map>".into(),
                message: "map must have at least one row and column".into(),
            });
        }

        let mut terrain = Vec::with_capacity(width * height);
        for (y, row) in rows.iter().enumerate() {
            if row.chars().count() != width {
                return Err(GameError::ConfigParse {
                    path: "<ascii map>".into(),
                    message: format!("row {y} has length {}, expected {width}", row.len()),
                });
            }
            for (x, c) in row.chars().enumerate() {
                terrain.push(match c {
                    '#' => Terrain::Land,
                    '~' => Terrain::Ocean,
                    'o' => Terrain::Lake,
                    other => {
                        return Err(GameError::ConfigParse {
                            path: "<ascii map>".into(),
                            message: format!("unknown terrain '{other}' at ({x}, {y})"),
                        })
                    }
                });
            }
        }

        Ok(Self {
            width: width as u32,
            height: height as u32,
            terrain,
        })
    }

    /// Map width in tiles.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Map height in tiles.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Total number of tiles.
    #[must_use]
    pub fn tile_count(&self) -> usize {
        self.terrain.len()
    }

    /// Handle for the tile at `(x, y)`, or `None` when out of bounds.
    #[must_use]
    pub fn tile(&self, x: i64, y: i64) -> Option<TileRef> {
        if x < 0 || y < 0 || x >= i64::from(self.width) || y >= i64::from(self.height) {
            return None;
        }
        Some(TileRef((y as u32) * self.width + x as u32))
    }

    /// X coordinate of a tile.
    #[must_use]
    pub const fn x(&self, tile: TileRef) -> u32 {
        tile.0 % self.width
    }

    /// Y coordinate of a tile.
    #[must_use]
    pub const fn y(&self, tile: TileRef) -> u32 {
        tile.0 / self.width
    }

    /// Returns true if the handle addresses a tile of this map.
    #[must_use]
    pub fn contains(&self, tile: TileRef) -> bool {
        (tile.0 as usize) < self.terrain.len()
    }

    /// Terrain of a tile.
    #[must_use]
    pub fn terrain(&self, tile: TileRef) -> Terrain {
        self.terrain[tile.0 as usize]
    }

    /// Overwrite the terrain of a tile.
    pub fn set_terrain(&mut self, tile: TileRef, terrain: Terrain) {
        self.terrain[tile.0 as usize] = terrain;
    }

    /// Returns true for land tiles.
    #[must_use]
    pub fn is_land(&self, tile: TileRef) -> bool {
        self.terrain(tile) == Terrain::Land
    }

    /// Returns true for ocean or lake tiles.
    #[must_use]
    pub fn is_water(&self, tile: TileRef) -> bool {
        self.terrain(tile).is_water()
    }

    /// Returns true for ocean tiles.
    #[must_use]
    pub fn is_ocean(&self, tile: TileRef) -> bool {
        self.terrain(tile) == Terrain::Ocean
    }

    /// Land tile bordering any water.
    #[must_use]
    pub fn is_shore(&self, tile: TileRef) -> bool {
        self.is_land(tile) && self.neighbors(tile).into_iter().any(|n| self.is_water(n))
    }

    /// Land tile bordering ocean (ports, transports and trade need this).
    #[must_use]
    pub fn is_ocean_shore(&self, tile: TileRef) -> bool {
        self.is_land(tile) && self.neighbors(tile).into_iter().any(|n| self.is_ocean(n))
    }

    /// Orthogonal neighbors in a fixed order: up, down, left, right.
    #[must_use]
    pub fn neighbors(&self, tile: TileRef) -> Vec<TileRef> {
        let x = i64::from(self.x(tile));
        let y = i64::from(self.y(tile));
        [(0, -1), (0, 1), (-1, 0), (1, 0)]
            .into_iter()
            .filter_map(|(dx, dy)| self.tile(x + dx, y + dy))
            .collect()
    }

    /// Manhattan distance between two tiles.
    #[must_use]
    pub fn manhattan_dist(&self, a: TileRef, b: TileRef) -> u32 {
        self.x(a).abs_diff(self.x(b)) + self.y(a).abs_diff(self.y(b))
    }

    /// Squared euclidean distance between two tiles.
    #[must_use]
    pub fn euclidean_dist_squared(&self, a: TileRef, b: TileRef) -> u64 {
        let dx = u64::from(self.x(a).abs_diff(self.x(b)));
        let dy = u64::from(self.y(a).abs_diff(self.y(b)));
        dx * dx + dy * dy
    }

    /// All tiles whose euclidean distance to `center` is at most `radius`,
    /// in row-major order.
    #[must_use]
    pub fn tiles_in_radius(&self, center: TileRef, radius: u32) -> Vec<TileRef> {
        let cx = i64::from(self.x(center));
        let cy = i64::from(self.y(center));
        let r = i64::from(radius);
        let r_sq = u64::from(radius) * u64::from(radius);
        let mut tiles = Vec::new();
        for y in (cy - r)..=(cy + r) {
            for x in (cx - r)..=(cx + r) {
                if let Some(tile) = self.tile(x, y) {
                    if self.euclidean_dist_squared(center, tile) <= r_sq {
                        tiles.push(tile);
                    }
                }
            }
        }
        tiles
    }

    /// Iterate every tile handle in row-major order.
    pub fn tiles(&self) -> impl Iterator<Item = TileRef> {
        (0..self.terrain.len() as u32).map(TileRef)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn islands() -> GameMap {
        GameMap::from_ascii(&["##~~", "##~#", "~~~#"]).unwrap()
    }

    #[test]
    fn test_from_ascii_dimensions() {
        let map = islands();
        assert_eq!(map.width(), 4);
        assert_eq!(map.height(), 3);
        assert_eq!(map.tile_count(), 12);
    }

    #[test]
    fn test_from_ascii_rejects_ragged_rows() {
        assert!(GameMap::from_ascii(&["##", "#"]).is_err());
        assert!(GameMap::from_ascii(&["#x"]).is_err());
        assert!(GameMap::from_ascii(&[]).is_err());
    }

    #[test]
    fn test_coordinates_round_trip() {
        let map = islands();
        let tile = map.tile(3, 1).unwrap();
        assert_eq!(map.x(tile), 3);
        assert_eq!(map.y(tile), 1);
        assert!(map.tile(4, 0).is_none());
        assert!(map.tile(-1, 0).is_none());
    }

    #[test]
    fn test_shore_classification() {
        let map = islands();
        assert!(map.is_ocean_shore(map.tile(1, 0).unwrap()));
        assert!(!map.is_ocean_shore(map.tile(0, 0).unwrap()));
        assert!(!map.is_ocean_shore(map.tile(2, 0).unwrap()));
    }

    #[test]
    fn test_neighbors_order_and_bounds() {
        let map = islands();
        let corner = map.tile(0, 0).unwrap();
        assert_eq!(
            map.neighbors(corner),
            vec![map.tile(0, 1).unwrap(), map.tile(1, 0).unwrap()]
        );
        assert_eq!(map.neighbors(map.tile(1, 1).unwrap()).len(), 4);
    }

    #[test]
    fn test_distances() {
        let map = GameMap::new(10, 10);
        let a = map.tile(0, 0).unwrap();
        let b = map.tile(3, 4).unwrap();
        assert_eq!(map.manhattan_dist(a, b), 7);
        assert_eq!(map.euclidean_dist_squared(a, b), 25);
    }

    #[test]
    fn test_tiles_in_radius() {
        let map = GameMap::new(10, 10);
        let center = map.tile(5, 5).unwrap();
        assert_eq!(map.tiles_in_radius(center, 0), vec![center]);
        // radius 1 is the plus shape
        assert_eq!(map.tiles_in_radius(center, 1).len(), 5);
        let corner = map.tile(0, 0).unwrap();
        assert_eq!(map.tiles_in_radius(corner, 1).len(), 3);
    }
}

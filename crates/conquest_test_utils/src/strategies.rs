//! Proptest strategies.
//!
//! Random but reproducible inputs for property tests: seeds, ratios,
//! maps and tiles.

use proptest::prelude::*;

use conquest_core::map::{GameMap, Terrain};

/// Any match seed.
pub fn arb_seed() -> impl Strategy<Value = u64> {
    any::<u64>()
}

/// A ratio in per mille, 0 to 1000 inclusive.
pub fn arb_permille() -> impl Strategy<Value = u32> {
    0u32..=1000
}

/// Map dimensions between 4 and `max` on each side.
pub fn arb_dimensions(max: u32) -> impl Strategy<Value = (u32, u32)> {
    (4u32..=max.max(4), 4u32..=max.max(4))
}

/// A map with random land and ocean, about `land_percent` land.
pub fn arb_map(max: u32, land_percent: u32) -> impl Strategy<Value = GameMap> {
    arb_dimensions(max).prop_flat_map(move |(w, h)| {
        let cells = (w * h) as usize;
        proptest::collection::vec(0u32..100, cells).prop_map(move |rolls| {
            let mut map = GameMap::new(w, h);
            for (tile, roll) in map.tiles().collect::<Vec<_>>().into_iter().zip(rolls) {
                if roll >= land_percent {
                    map.set_terrain(tile, Terrain::Ocean);
                }
            }
            map
        })
    })
}

/// A map together with two tile indices inside it.
pub fn arb_map_with_endpoints(max: u32, land_percent: u32) -> impl Strategy<Value = (GameMap, u32, u32)> {
    arb_map(max, land_percent).prop_flat_map(|map| {
        let count = map.tile_count() as u32;
        (Just(map), 0..count, 0..count)
    })
}

/// Troop counts in a realistic range.
pub fn arb_troops() -> impl Strategy<Value = u64> {
    1u64..200_000
}

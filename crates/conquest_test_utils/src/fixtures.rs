//! Test fixtures and helpers.
//!
//! Pre-built maps, worlds and matches for consistent testing.

use fixed::types::I32F32;

use conquest_core::config::GameConfig;
use conquest_core::engine::Engine;
use conquest_core::game::Game;
use conquest_core::map::{GameMap, TileRef};
use conquest_core::player::{PlayerId, PlayerInfo, PlayerType};
use conquest_core::setup::MatchSetup;

/// Create a fixed-point number from an integer.
#[must_use]
pub fn fixed(n: i32) -> I32F32 {
    I32F32::from_num(n)
}

/// Parse an ASCII map: `#` land, `~` ocean, `o` lake.
///
/// # Panics
///
/// Panics on a malformed map.
#[must_use]
pub fn ascii_map(rows: &[&str]) -> GameMap {
    GameMap::from_ascii(rows).expect("malformed test map")
}

/// Two land masses split by a strait: land in the first and last
/// `coast` columns, ocean between.
#[must_use]
pub fn strait_map(width: usize, height: usize, coast: usize) -> GameMap {
    let row: String = (0..width)
        .map(|x| if x < coast || x >= width - coast { '#' } else { '~' })
        .collect();
    let rows: Vec<&str> = (0..height).map(|_| row.as_str()).collect();
    ascii_map(&rows)
}

/// Tile at `(x, y)`.
///
/// # Panics
///
/// Panics when the coordinates are off the map.
#[must_use]
pub fn tile(game: &Game, x: i64, y: i64) -> TileRef {
    game.map().tile(x, y).expect("tile off the map")
}

/// A world with `players` registered as ids 0, 1, 2...
///
/// # Panics
///
/// Panics if a player cannot be added.
#[must_use]
pub fn game_with_players(map: GameMap, config: GameConfig, players: &[PlayerType]) -> (Game, Vec<PlayerId>) {
    let mut game = Game::new(map, config, 1);
    let ids: Vec<PlayerId> = (0..players.len())
        .map(|i| PlayerId::new(i as u16))
        .collect();
    for (&id, &player_type) in ids.iter().zip(players) {
        game.add_player(PlayerInfo::new(id, format!("player{}", id.as_u16()), player_type))
            .expect("duplicate player id");
    }
    (game, ids)
}

/// Give `id` every land tile of the rectangle `[x0, x1) x [y0, y1)`.
pub fn claim_rect(game: &mut Game, id: PlayerId, x0: i64, x1: i64, y0: i64, y1: i64) {
    for y in y0..y1 {
        for x in x0..x1 {
            if let Some(tile) = game.map().tile(x, y) {
                if game.is_land(tile) {
                    game.conquer(id, tile);
                }
            }
        }
    }
}

/// A config with a short spawn phase, for tests that want action early.
#[must_use]
pub fn quick_config() -> GameConfig {
    let mut config = GameConfig::default();
    config.spawn_phase_ticks = 10;
    config
}

/// A bots-and-nations match on an open 48x48 map.
///
/// # Panics
///
/// Panics if the setup does not build.
#[must_use]
pub fn ai_match(seed: u64, bots: usize, nations: usize) -> Engine {
    let mut setup = MatchSetup::new(seed, GameMap::new(48, 48), quick_config());
    setup.add_ai_players(PlayerType::Bot, bots);
    setup.add_ai_players(PlayerType::FakeHuman, nations);
    setup.build().expect("test match did not build")
}

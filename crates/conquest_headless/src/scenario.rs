//! Scenario loading and configuration.
//!
//! Scenarios describe a match for headless testing: the map, how many bots
//! and nations join, optional human slots, the tick limit and tuning
//! overrides. They are written in RON:
//!
//! ```ron
//! Scenario(
//!     name: "Strait",
//!     description: "Two coasts",
//!     seed: 7,
//!     map: Strait(width: 64, height: 40, coast: 14),
//!     bots: 4,
//!     nations: 2,
//!     max_ticks: 3000,
//! )
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use conquest_core::config::GameConfig;
use conquest_core::map::GameMap;
use conquest_core::player::{PlayerId, PlayerInfo, PlayerType};
use conquest_core::setup::{MatchSetup, PlayerSlot};
use conquest_core::Tick;

use crate::error::{HeadlessError, Result};

/// Names accepted by [`Scenario::builtin`].
pub const BUILTIN_SCENARIOS: [&str; 3] = ["skirmish", "archipelago", "duel"];

/// Terrain of a scenario.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MapSpec {
    /// All land.
    Open {
        /// Width in tiles.
        width: u32,
        /// Height in tiles.
        height: u32,
    },
    /// Land on both edges, ocean between.
    Strait {
        /// Width in tiles.
        width: u32,
        /// Height in tiles.
        height: u32,
        /// Land columns on each side.
        coast: u32,
    },
    /// Hand-drawn rows: `#` land, `~` ocean, `o` lake.
    Ascii(Vec<String>),
}

impl MapSpec {
    /// Build the map.
    ///
    /// # Errors
    ///
    /// Returns [`HeadlessError::InvalidScenario`] for empty dimensions or a
    /// coast wider than the map, and the engine's error for malformed rows.
    pub fn build(&self) -> Result<GameMap> {
        match self {
            Self::Open { width, height } => {
                check_dimensions(*width, *height)?;
                Ok(GameMap::new(*width, *height))
            }
            Self::Strait {
                width,
                height,
                coast,
            } => {
                check_dimensions(*width, *height)?;
                if coast.saturating_mul(2) >= *width {
                    return Err(HeadlessError::InvalidScenario(format!(
                        "coast {coast} leaves no water on a map {width} wide"
                    )));
                }
                let row: String = (0..*width)
                    .map(|x| if x < *coast || x >= width - coast { '#' } else { '~' })
                    .collect();
                let rows: Vec<&str> = (0..*height).map(|_| row.as_str()).collect();
                Ok(GameMap::from_ascii(&rows)?)
            }
            Self::Ascii(rows) => {
                let rows: Vec<&str> = rows.iter().map(String::as_str).collect();
                Ok(GameMap::from_ascii(&rows)?)
            }
        }
    }
}

fn check_dimensions(width: u32, height: u32) -> Result<()> {
    if width == 0 || height == 0 {
        return Err(HeadlessError::InvalidScenario(format!(
            "map must not be empty, got {width}x{height}"
        )));
    }
    Ok(())
}

/// A human seat. Without a spawn tile the human never enters the map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HumanSlot {
    /// Display name.
    pub name: String,
    /// Spawn tile as (x, y).
    #[serde(default)]
    pub spawn: Option<(i64, i64)>,
    /// Let auto-play drive this seat.
    #[serde(default)]
    pub auto_play: bool,
}

/// A complete scenario configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    /// Scenario name.
    pub name: String,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
    /// Default seed; batch runs offset it.
    #[serde(default)]
    pub seed: u64,
    /// Terrain.
    pub map: MapSpec,
    /// Number of bots.
    #[serde(default)]
    pub bots: usize,
    /// Number of nations.
    #[serde(default)]
    pub nations: usize,
    /// Human seats, given the lowest ids.
    #[serde(default)]
    pub humans: Vec<HumanSlot>,
    /// Tick limit.
    pub max_ticks: Tick,
    /// Tuning; fields left out keep their defaults.
    #[serde(default)]
    pub config: GameConfig,
}

impl Default for Scenario {
    fn default() -> Self {
        Self::skirmish()
    }
}

impl Scenario {
    /// Load a scenario from a RON file.
    ///
    /// # Errors
    ///
    /// Fails if the file is missing, unreadable or not a scenario.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(HeadlessError::FileNotFound(path.display().to_string()));
        }
        let contents = std::fs::read_to_string(path)?;
        Self::from_ron_str(&contents)
    }

    /// Load from a RON string (useful for embedded scenarios).
    ///
    /// # Errors
    ///
    /// Fails on malformed RON.
    pub fn from_ron_str(ron: &str) -> Result<Self> {
        Ok(ron::from_str(ron)?)
    }

    /// A built-in scenario by name.
    #[must_use]
    pub fn builtin(name: &str) -> Option<Self> {
        match name {
            "skirmish" => Some(Self::skirmish()),
            "archipelago" => Some(Self::archipelago()),
            "duel" => Some(Self::duel()),
            _ => None,
        }
    }

    /// A built-in name, or else a path to a RON file.
    ///
    /// # Errors
    ///
    /// Returns [`HeadlessError::UnknownScenario`] when the name is neither,
    /// or the load error for a file that does not parse.
    pub fn resolve(name_or_path: &str) -> Result<Self> {
        if let Some(scenario) = Self::builtin(name_or_path) {
            return Ok(scenario);
        }
        let path = Path::new(name_or_path);
        if path.exists() {
            return Self::load(path);
        }
        Err(HeadlessError::UnknownScenario(name_or_path.to_string()))
    }

    /// Bots and nations on open land.
    #[must_use]
    pub fn skirmish() -> Self {
        let mut config = GameConfig::default();
        config.spawn_phase_ticks = 50;
        Self {
            name: "skirmish".to_string(),
            description: "Six bots and three nations on a 64x64 continent".to_string(),
            seed: 1,
            map: MapSpec::Open {
                width: 64,
                height: 64,
            },
            bots: 6,
            nations: 3,
            humans: Vec::new(),
            max_ticks: 3_000,
            config,
        }
    }

    /// Two coasts split by open water, so nations must sail.
    #[must_use]
    pub fn archipelago() -> Self {
        let mut config = GameConfig::default();
        config.spawn_phase_ticks = 50;
        config.starting_gold = 1_000_000;
        Self {
            name: "archipelago".to_string(),
            description: "Nations on two coasts with a wide strait between".to_string(),
            seed: 1,
            map: MapSpec::Strait {
                width: 72,
                height: 40,
                coast: 16,
            },
            bots: 4,
            nations: 4,
            humans: Vec::new(),
            max_ticks: 4_000,
            config,
        }
    }

    /// An auto-played human against one nation.
    #[must_use]
    pub fn duel() -> Self {
        let mut config = GameConfig::default();
        config.spawn_phase_ticks = 20;
        Self {
            name: "duel".to_string(),
            description: "Auto-play against a single nation".to_string(),
            seed: 1,
            map: MapSpec::Open {
                width: 32,
                height: 32,
            },
            bots: 0,
            nations: 1,
            humans: vec![HumanSlot {
                name: "challenger".to_string(),
                spawn: Some((6, 16)),
                auto_play: true,
            }],
            max_ticks: 2_000,
            config,
        }
    }

    /// Turn the scenario into a match setup for `seed`.
    ///
    /// # Errors
    ///
    /// Fails when the map cannot be built, a human spawn is off the map
    /// or there are no players at all.
    pub fn to_setup(&self, seed: u64) -> Result<MatchSetup> {
        if self.bots + self.nations + self.humans.len() == 0 {
            return Err(HeadlessError::InvalidScenario(format!(
                "scenario '{}' has no players",
                self.name
            )));
        }
        let map = self.map.build()?;
        let mut slots = Vec::with_capacity(self.humans.len());
        for (i, human) in self.humans.iter().enumerate() {
            let id = u16::try_from(i)
                .map(PlayerId::new)
                .map_err(|_| HeadlessError::InvalidScenario("too many human seats".into()))?;
            let mut slot = PlayerSlot::new(PlayerInfo::new(id, human.name.clone(), PlayerType::Human))
                .with_auto_play(human.auto_play);
            if let Some((x, y)) = human.spawn {
                let tile = map.tile(x, y).ok_or_else(|| {
                    HeadlessError::InvalidScenario(format!(
                        "spawn ({x}, {y}) of '{}' is off the map",
                        human.name
                    ))
                })?;
                slot = slot.with_spawn(tile);
            }
            slots.push(slot);
        }

        let mut setup = MatchSetup::new(seed, map, self.config.clone());
        for slot in slots {
            setup = setup.with_player(slot);
        }
        setup.add_ai_players(PlayerType::Bot, self.bots);
        setup.add_ai_players(PlayerType::FakeHuman, self.nations);
        Ok(setup)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtins_resolve() {
        for name in BUILTIN_SCENARIOS {
            let scenario = Scenario::resolve(name).unwrap();
            assert_eq!(scenario.name, name);
            assert!(scenario.to_setup(scenario.seed).is_ok());
        }
    }

    #[test]
    fn test_unknown_name_is_an_error() {
        assert!(matches!(
            Scenario::resolve("no-such-scenario"),
            Err(HeadlessError::UnknownScenario(_))
        ));
    }

    #[test]
    fn test_parse_from_ron_keeps_config_defaults() {
        let ron = r#"
            Scenario(
                name: "Test",
                map: Open(width: 20, height: 10),
                bots: 2,
                max_ticks: 100,
                config: (starting_gold: 42),
            )
        "#;
        let scenario = Scenario::from_ron_str(ron).unwrap();
        assert_eq!(scenario.name, "Test");
        assert_eq!(scenario.config.starting_gold, 42);
        assert_eq!(
            scenario.config.spawn_phase_ticks,
            GameConfig::default().spawn_phase_ticks
        );
        let setup = scenario.to_setup(3).unwrap();
        assert_eq!(setup.players.len(), 2);
        assert_eq!(setup.map.width(), 20);
    }

    #[test]
    fn test_strait_layout() {
        let map = MapSpec::Strait {
            width: 10,
            height: 2,
            coast: 3,
        }
        .build()
        .unwrap();
        assert!(map.is_land(map.tile(2, 0).unwrap()));
        assert!(map.is_ocean(map.tile(3, 1).unwrap()));
        assert!(map.is_land(map.tile(7, 1).unwrap()));
    }

    #[test]
    fn test_bad_maps_are_rejected() {
        let empty = MapSpec::Open {
            width: 0,
            height: 4,
        };
        assert!(matches!(empty.build(), Err(HeadlessError::InvalidScenario(_))));
        let no_water = MapSpec::Strait {
            width: 6,
            height: 4,
            coast: 3,
        };
        assert!(matches!(no_water.build(), Err(HeadlessError::InvalidScenario(_))));
    }

    #[test]
    fn test_off_map_human_spawn_is_rejected() {
        let mut scenario = Scenario::duel();
        scenario.humans[0].spawn = Some((100, 100));
        assert!(matches!(
            scenario.to_setup(1),
            Err(HeadlessError::InvalidScenario(_))
        ));
    }

    #[test]
    fn test_humans_take_the_lowest_ids() {
        let setup = Scenario::duel().to_setup(9).unwrap();
        assert_eq!(setup.players[0].info.player_type, PlayerType::Human);
        assert!(setup.players[0].auto_play);
        assert!(setup.players[0].spawn.is_some());
        assert_eq!(setup.players[1].info.player_type, PlayerType::FakeHuman);
    }
}

//! Game tuning: the per-unit metadata table and numeric policy.
//!
//! Every cost, duration, range and cadence used by executions comes from
//! [`GameConfig`]. Nothing in the engine hardcodes a number per unit type.
//!
//! Overrides are authored in RON. Omitted fields keep their default
//! value, and unit types missing from a `units` table keep their default
//! entry:
//!
//! ```
//! use conquest_core::config::GameConfig;
//! use conquest_core::unit::UnitType;
//!
//! let config = GameConfig::from_ron_str(
//!     "(starting_gold: 300000, units: { City: (cost: 250000, construction_duration: Some(20)) })",
//! ).unwrap();
//! assert_eq!(config.unit_info(UnitType::City).cost, 250_000);
//! assert_eq!(config.unit_info(UnitType::Viper).attack_rate, 20);
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{GameError, Result};
use crate::unit::UnitType;
use crate::Tick;

/// Metadata for one unit type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UnitInfo {
    /// Gold cost of the first unit.
    pub cost: u64,
    /// Extra cost per unit of this type already owned.
    pub cost_per_owned: u64,
    /// Upper bound on the cost.
    pub max_cost: Option<u64>,
    /// Health pool; `None` means the unit dies to any hit.
    pub max_health: Option<u32>,
    /// Build time in ticks; `None` means built instantly.
    pub construction_duration: Option<Tick>,
    /// Path steps per tick.
    pub speed: u32,
    /// Damage per hit.
    pub damage: u32,
    /// Minimum ticks between two shots.
    pub attack_rate: Tick,
    /// Targeting radius in tiles.
    pub attack_range: u32,
    /// Patrol radius around the home tile.
    pub patrol_range: u32,
    /// Minimum distance to another structure of the owner.
    pub min_spacing: u32,
}

impl Default for UnitInfo {
    fn default() -> Self {
        DEFAULT_INFO
    }
}

const DEFAULT_INFO: UnitInfo = UnitInfo {
    cost: 0,
    cost_per_owned: 0,
    max_cost: None,
    max_health: None,
    construction_duration: None,
    speed: 1,
    damage: 0,
    attack_rate: 0,
    attack_range: 0,
    patrol_range: 0,
    min_spacing: 0,
};

/// Blast radii of a nuclear weapon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NukeMagnitude {
    /// Everything inside is destroyed.
    pub inner: u32,
    /// Partial destruction between `inner` and `outer`.
    pub outer: u32,
}

/// Complete numeric policy for a match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    units: BTreeMap<UnitType, UnitInfo>,

    /// Ticks during which players pick spawn tiles and nothing else runs.
    pub spawn_phase_ticks: Tick,
    /// Gold each player starts with.
    pub starting_gold: u64,
    /// Troops each player starts with.
    pub starting_troops: u64,
    /// Radius of the land claimed on spawn.
    pub spawn_radius: u32,

    /// Population capacity per owned tile.
    pub population_per_tile: u64,
    /// Extra population capacity per city.
    pub population_per_city: u64,
    /// Per-mille of remaining capacity grown each tick.
    pub population_growth_permille: u64,
    /// Flat population growth each tick.
    pub base_population_growth: u64,
    /// Per-mille of a gold coin produced per worker per tick.
    pub gold_per_worker_permille: u64,
    /// Flat gold income each tick.
    pub base_gold_per_tick: u64,

    /// A port launches a trade ship with probability `1 / odds` per tick.
    pub trade_ship_spawn_odds: u32,
    /// Cap on trade ships per player.
    pub max_trade_ships: usize,
    /// Base gold of a completed trade run.
    pub trade_gold_base: u64,
    /// Extra gold per tile of distance between the two ports.
    pub trade_gold_per_tile: u64,
    /// Cap on transport ships in flight per player.
    pub max_boats: usize,

    /// Tiles conquered per tick by a single land attack.
    pub attack_tiles_per_tick: usize,
    /// Troop cost of taking one unclaimed tile.
    pub terra_nullius_tile_cost: u64,
    /// Minimum troop cost of taking one owned tile.
    pub min_tile_cost: u64,
    /// Defense post protection radius.
    pub defense_post_range: u32,
    /// Per-mille multiplier on tile cost inside defense post range.
    pub defense_post_bonus_permille: u64,

    /// Tiles travelled by a nuke per tick.
    pub nuke_speed: u32,
    /// Trail length kept for rendering nuke paths.
    pub nuke_trail_length: usize,
    /// Atom bomb blast radii.
    pub atom_bomb_magnitude: NukeMagnitude,
    /// Hydrogen bomb blast radii.
    pub hydrogen_bomb_magnitude: NukeMagnitude,
    /// MIRV warhead blast radii.
    pub warhead_magnitude: NukeMagnitude,
    /// Per-mille of the victim's troops lost per destroyed tile share.
    pub nuke_troop_loss_permille: u64,
    /// Damage applied to units between the inner and outer radius.
    pub nuke_outer_damage: u32,
    /// Missile silo reload time.
    pub silo_cooldown: Tick,
    /// Warheads released by a MIRV.
    pub mirv_warheads: u32,
    /// Distance to target at which a MIRV separates.
    pub mirv_separation_distance: u32,
    /// Radius around the MIRV target that warheads spread over.
    pub mirv_spread_radius: u32,

    /// SAM launcher reload time.
    pub sam_cooldown: Tick,
    /// Ticks before an unguided shell is discarded.
    pub shell_max_lifetime: Tick,
    /// Ticks before a guided missile is discarded.
    pub missile_max_lifetime: Tick,
    /// Nuke interception radius of a Condor.
    pub condor_intercept_range: u32,

    /// Minimum ticks between two alliance requests to the same player.
    pub alliance_request_cooldown: Tick,
    /// Ticks an unanswered alliance request stays open.
    pub alliance_request_expiry: Tick,
    /// Ticks an alliance lasts.
    pub alliance_duration: Tick,
    /// Ticks a player stays marked as traitor.
    pub traitor_duration: Tick,
    /// Ticks a target mark stays visible.
    pub target_duration: Tick,

    /// Shortest bot decision period.
    pub bot_min_period: Tick,
    /// Longest bot decision period.
    pub bot_max_period: Tick,
    /// Shortest nation decision period.
    pub nation_min_period: Tick,
    /// Longest nation decision period.
    pub nation_max_period: Tick,
    /// Nation fires a nuke with probability `1 / odds` per decision.
    pub nation_nuke_odds: u32,
    /// Auto-play fires a nuke with probability `1 / odds` per decision.
    pub auto_play_nuke_odds: u32,
    /// Auto-play decision period.
    pub auto_play_period: Tick,
    /// Minimum ticks between two auto-play attacks.
    pub auto_play_attack_cooldown: Tick,
    /// Ticks auto-play stays committed to a chosen target.
    pub auto_play_commitment: Tick,
    /// Ticks an enemy is remembered without new aggression.
    pub enemy_memory: Tick,

    /// Flood window for direct chat.
    pub chat_flood_window: Tick,
    /// Messages allowed per sender inside the flood window.
    pub chat_flood_limit: usize,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            units: default_units(),
            spawn_phase_ticks: 100,
            starting_gold: 100_000,
            starting_troops: 2_500,
            spawn_radius: 2,
            population_per_tile: 100,
            population_per_city: 5_000,
            population_growth_permille: 10,
            base_population_growth: 10,
            gold_per_worker_permille: 100,
            base_gold_per_tick: 100,
            trade_ship_spawn_odds: 100,
            max_trade_ships: 50,
            trade_gold_base: 10_000,
            trade_gold_per_tile: 100,
            max_boats: 3,
            attack_tiles_per_tick: 4,
            terra_nullius_tile_cost: 5,
            min_tile_cost: 10,
            defense_post_range: 5,
            defense_post_bonus_permille: 2_000,
            nuke_speed: 6,
            nuke_trail_length: 12,
            atom_bomb_magnitude: NukeMagnitude { inner: 12, outer: 30 },
            hydrogen_bomb_magnitude: NukeMagnitude {
                inner: 80,
                outer: 100,
            },
            warhead_magnitude: NukeMagnitude { inner: 12, outer: 18 },
            nuke_troop_loss_permille: 500,
            nuke_outer_damage: 400,
            silo_cooldown: 75,
            mirv_warheads: 25,
            mirv_separation_distance: 50,
            mirv_spread_radius: 25,
            sam_cooldown: 75,
            shell_max_lifetime: 50,
            missile_max_lifetime: 100,
            condor_intercept_range: 40,
            alliance_request_cooldown: 300,
            alliance_request_expiry: 200,
            alliance_duration: 3_000,
            traitor_duration: 300,
            target_duration: 100,
            bot_min_period: 40,
            bot_max_period: 80,
            nation_min_period: 30,
            nation_max_period: 50,
            nation_nuke_odds: 20,
            auto_play_nuke_odds: 80,
            auto_play_period: 40,
            auto_play_attack_cooldown: 150,
            auto_play_commitment: 600,
            enemy_memory: 600,
            chat_flood_window: 50,
            chat_flood_limit: 3,
        }
    }
}

fn default_units() -> BTreeMap<UnitType, UnitInfo> {
    UnitType::ALL
        .into_iter()
        .map(|unit_type| (unit_type, default_unit_info(unit_type)))
        .collect()
}

fn default_unit_info(unit_type: UnitType) -> UnitInfo {
    let structure = UnitInfo {
        min_spacing: 3,
        ..DEFAULT_INFO
    };
    match unit_type {
        UnitType::City | UnitType::Port => UnitInfo {
            cost: 125_000,
            cost_per_owned: 125_000,
            max_cost: Some(1_000_000),
            construction_duration: Some(20),
            ..structure
        },
        UnitType::DefensePost => UnitInfo {
            cost: 50_000,
            cost_per_owned: 50_000,
            max_cost: Some(250_000),
            construction_duration: Some(50),
            ..structure
        },
        UnitType::MissileSilo => UnitInfo {
            cost: 1_000_000,
            construction_duration: Some(100),
            ..structure
        },
        UnitType::SamLauncher => UnitInfo {
            cost: 1_500_000,
            cost_per_owned: 1_500_000,
            max_cost: Some(3_000_000),
            construction_duration: Some(300),
            attack_range: 70,
            ..structure
        },
        UnitType::OrbitalCannon => UnitInfo {
            cost: 2_000_000,
            cost_per_owned: 1_000_000,
            max_cost: Some(4_000_000),
            construction_duration: Some(200),
            damage: 400,
            attack_rate: 60,
            attack_range: 60,
            ..structure
        },
        UnitType::Viper => UnitInfo {
            cost: 250_000,
            cost_per_owned: 250_000,
            max_cost: Some(1_000_000),
            max_health: Some(1_000),
            construction_duration: Some(50),
            speed: 1,
            damage: 250,
            attack_rate: 20,
            attack_range: 130,
            patrol_range: 100,
            ..DEFAULT_INFO
        },
        UnitType::Condor => UnitInfo {
            cost: 500_000,
            cost_per_owned: 500_000,
            max_cost: Some(2_000_000),
            max_health: Some(2_000),
            construction_duration: Some(80),
            speed: 1,
            damage: 400,
            attack_rate: 40,
            attack_range: 150,
            patrol_range: 100,
            ..DEFAULT_INFO
        },
        UnitType::TransportShip => UnitInfo {
            speed: 1,
            ..DEFAULT_INFO
        },
        UnitType::TradeShip => UnitInfo {
            speed: 1,
            ..DEFAULT_INFO
        },
        UnitType::Shell => UnitInfo {
            speed: 4,
            ..DEFAULT_INFO
        },
        UnitType::SamMissile => UnitInfo {
            speed: 12,
            ..DEFAULT_INFO
        },
        UnitType::AtomBomb => UnitInfo {
            cost: 750_000,
            ..DEFAULT_INFO
        },
        UnitType::HydrogenBomb => UnitInfo {
            cost: 5_000_000,
            ..DEFAULT_INFO
        },
        UnitType::Mirv => UnitInfo {
            cost: 25_000_000,
            ..DEFAULT_INFO
        },
        UnitType::MirvWarhead | UnitType::Construction => DEFAULT_INFO,
    }
}

impl GameConfig {
    /// Parse a RON override document.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::ConfigParse`] on malformed RON or invalid values.
    pub fn from_ron_str(source: &str) -> Result<Self> {
        let mut config: Self = ron::from_str(source).map_err(|e| GameError::ConfigParse {
            path: "<ron string>".into(),
            message: e.to_string(),
        })?;
        config.fill_missing_units();
        config.validate()?;
        Ok(config)
    }

    /// Load a RON override file.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::ConfigParse`] if the file cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| GameError::ConfigParse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_ron_str(&contents).map_err(|e| match e {
            GameError::ConfigParse { message, .. } => GameError::ConfigParse {
                path: path.display().to_string(),
                message,
            },
            other => other,
        })
    }

    fn fill_missing_units(&mut self) {
        for unit_type in UnitType::ALL {
            self.units
                .entry(unit_type)
                .or_insert_with(|| default_unit_info(unit_type));
        }
    }

    /// Check cross-field constraints.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::ConfigParse`] describing the first violation.
    pub fn validate(&self) -> Result<()> {
        let invalid = |message: String| GameError::ConfigParse {
            path: "<config>".into(),
            message,
        };
        for (unit_type, info) in &self.units {
            if info.speed == 0 && (unit_type.is_naval() || unit_type.is_projectile()) {
                return Err(invalid(format!("{} must have a positive speed", unit_type.name())));
            }
            if let Some(max) = info.max_cost {
                if max < info.cost {
                    return Err(invalid(format!(
                        "{} max_cost {max} is below base cost {}",
                        unit_type.name(),
                        info.cost
                    )));
                }
            }
        }
        for (name, magnitude) in [
            ("atom_bomb_magnitude", self.atom_bomb_magnitude),
            ("hydrogen_bomb_magnitude", self.hydrogen_bomb_magnitude),
            ("warhead_magnitude", self.warhead_magnitude),
        ] {
            if magnitude.inner > magnitude.outer {
                return Err(invalid(format!("{name}: inner radius exceeds outer radius")));
            }
        }
        if self.bot_min_period == 0 || self.bot_min_period > self.bot_max_period {
            return Err(invalid("bot period range is empty".into()));
        }
        if self.nation_min_period == 0 || self.nation_min_period > self.nation_max_period {
            return Err(invalid("nation period range is empty".into()));
        }
        if self.nuke_speed == 0 {
            return Err(invalid("nuke_speed must be positive".into()));
        }
        Ok(())
    }

    /// Metadata for a unit type.
    #[must_use]
    pub fn unit_info(&self, unit_type: UnitType) -> UnitInfo {
        self.units
            .get(&unit_type)
            .copied()
            .unwrap_or_else(|| default_unit_info(unit_type))
    }

    /// Mutable metadata for a unit type (tests and scenario tuning).
    pub fn unit_info_mut(&mut self, unit_type: UnitType) -> &mut UnitInfo {
        self.units
            .entry(unit_type)
            .or_insert_with(|| default_unit_info(unit_type))
    }

    /// Cost of the next unit of `unit_type` when `owned` already exist.
    #[must_use]
    pub fn unit_cost(&self, unit_type: UnitType, owned: usize) -> u64 {
        let info = self.unit_info(unit_type);
        let cost = info
            .cost
            .saturating_add(info.cost_per_owned.saturating_mul(owned as u64));
        info.max_cost.map_or(cost, |max| cost.min(max))
    }

    /// Minimum ticks between two Viper shells.
    #[must_use]
    pub fn warship_shell_attack_rate(&self) -> Tick {
        self.unit_info(UnitType::Viper).attack_rate
    }

    /// Blast radii for a nuke type, `None` for anything else.
    #[must_use]
    pub const fn nuke_magnitude(&self, unit_type: UnitType) -> Option<NukeMagnitude> {
        match unit_type {
            UnitType::AtomBomb => Some(self.atom_bomb_magnitude),
            UnitType::HydrogenBomb => Some(self.hydrogen_bomb_magnitude),
            UnitType::MirvWarhead => Some(self.warhead_magnitude),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(GameConfig::default().validate().is_ok());
    }

    #[test]
    fn test_default_table_is_complete() {
        let config = GameConfig::default();
        for unit_type in UnitType::ALL {
            assert!(config.units.contains_key(&unit_type), "{unit_type:?}");
        }
    }

    #[test]
    fn test_unit_cost_grows_and_caps() {
        let config = GameConfig::default();
        assert_eq!(config.unit_cost(UnitType::City, 0), 125_000);
        assert_eq!(config.unit_cost(UnitType::City, 1), 250_000);
        assert_eq!(config.unit_cost(UnitType::City, 50), 1_000_000);
        assert_eq!(config.unit_cost(UnitType::MissileSilo, 3), 1_000_000);
    }

    #[test]
    fn test_viper_attack_rate() {
        assert_eq!(GameConfig::default().warship_shell_attack_rate(), 20);
    }

    #[test]
    fn test_partial_ron_override_keeps_defaults() {
        let config = GameConfig::from_ron_str(
            "(spawn_phase_ticks: 0, units: { Viper: (cost: 1, max_health: Some(5)) })",
        )
        .unwrap();
        assert_eq!(config.spawn_phase_ticks, 0);
        assert_eq!(config.unit_info(UnitType::Viper).cost, 1);
        assert_eq!(config.unit_info(UnitType::Viper).speed, 1);
        assert_eq!(config.unit_info(UnitType::City).cost, 125_000);
        assert_eq!(config.starting_troops, 2_500);
    }

    #[test]
    fn test_invalid_magnitude_is_rejected() {
        let result =
            GameConfig::from_ron_str("(atom_bomb_magnitude: (inner: 40, outer: 10))");
        assert!(matches!(result, Err(GameError::ConfigParse { .. })));
    }

    #[test]
    fn test_malformed_ron_is_rejected() {
        assert!(GameConfig::from_ron_str("(spawn_phase_ticks: )").is_err());
    }
}

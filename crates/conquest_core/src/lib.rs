//! # Conquest Core
//!
//! Deterministic execution engine for a real-time territorial conquest game.
//!
//! This crate contains **only** deterministic logic:
//! - No rendering
//! - No network IO
//! - No system randomness (all randomness flows through [`random::PseudoRandom`])
//! - No floating-point math in simulation state (uses fixed-point)
//!
//! This separation enables:
//! - Lockstep multiplayer (identical simulation across clients)
//! - Server-authoritative replay from an intent stream
//! - Headless AI soak testing
//!
//! ## Crate Structure
//!
//! - [`game`] - World façade: tiles, players, units, attacks, diplomacy
//! - [`execution`] - The execution contract and the scheduler
//! - [`engine`] - Tick loop driving executions in FIFO order
//! - [`executions`] - Construction, combat, movement and diplomacy executions
//! - [`ai`] - Bot, nation and auto-play decision making
//! - [`pathfinding`] - Time-sliced A* and the air path finder
//! - [`config`] - Tuning constants and the per-unit metadata table
//! - [`replay`] - Intent recording and playback

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod ai;
pub mod config;
pub mod engine;
pub mod error;
pub mod execution;
pub mod executions;
pub mod game;
pub mod intent;
pub mod map;
pub mod math;
pub mod pathfinding;
pub mod player;
pub mod random;
pub mod replay;
pub mod setup;
pub mod unit;

/// Simulation tick counter. One tick is roughly 100ms of game time.
pub type Tick = u64;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::{GameConfig, UnitInfo};
    pub use crate::engine::{Engine, TickReport};
    pub use crate::error::{GameError, Result};
    pub use crate::execution::{Execution, Scheduler};
    pub use crate::game::{Game, MessageType};
    pub use crate::intent::{Intent, StampedIntent};
    pub use crate::map::{GameMap, Terrain, TileRef};
    pub use crate::math::Fixed;
    pub use crate::pathfinding::{AirPathFinder, PathFinder, PathResult};
    pub use crate::player::{Owner, Player, PlayerId, PlayerInfo, PlayerType};
    pub use crate::random::PseudoRandom;
    pub use crate::unit::{Unit, UnitId, UnitType};
    pub use crate::Tick;
}

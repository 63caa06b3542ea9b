//! Error types for the execution engine.
//!
//! Only programmer errors and IO/serialization failures are errors.
//! A precondition that is not met (not enough gold, no valid tile, dead
//! target) is never an error: executions skip the action for that tick.

use thiserror::Error;

use crate::player::PlayerId;
use crate::unit::UnitId;

/// Result type alias using [`GameError`].
pub type Result<T> = std::result::Result<T, GameError>;

/// Top-level error type for all engine errors.
#[derive(Debug, Error)]
pub enum GameError {
    /// An execution was ticked before `init` bound it to the game.
    #[error("{0} ticked before init")]
    NotInitialized(&'static str),

    /// A player that must exist at this point does not.
    #[error("Player not found: {0}")]
    PlayerNotFound(PlayerId),

    /// A unit that must exist at this point does not.
    #[error("Unit not found: {0}")]
    UnitNotFound(UnitId),

    /// Map or configuration data failed validation.
    #[error("Failed to parse '{path}': {message}")]
    ConfigParse {
        /// Source of the data that failed to parse.
        path: String,
        /// Error message.
        message: String,
    },

    /// Snapshot or replay (de)serialization failed.
    #[error("Serialization failed: {0}")]
    Serialization(String),

    /// Replay written by an incompatible version.
    #[error("Replay version mismatch: expected {expected}, got {found}")]
    ReplayVersionMismatch {
        /// Version this build understands.
        expected: u32,
        /// Version found in the file.
        found: u32,
    },

    /// Invalid game state.
    #[error("Invalid game state: {0}")]
    InvalidState(String),

    /// Desync detected between two runs of the same inputs.
    #[error("Desync detected at tick {tick}: local hash {local_hash}, remote hash {remote_hash}")]
    DesyncDetected {
        /// Tick where desync occurred.
        tick: u64,
        /// Local simulation hash.
        local_hash: u64,
        /// Remote simulation hash.
        remote_hash: u64,
    },
}

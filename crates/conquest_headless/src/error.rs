//! Error type for the headless runner.

use thiserror::Error;

use conquest_core::error::GameError;

/// Everything that can stop a headless run.
#[derive(Error, Debug)]
pub enum HeadlessError {
    /// Scenario file not found.
    #[error("Scenario file not found: {0}")]
    FileNotFound(String),
    /// Neither a built-in scenario nor a file.
    #[error("Unknown scenario '{0}'")]
    UnknownScenario(String),
    /// The scenario parsed but describes an impossible match.
    #[error("Invalid scenario: {0}")]
    InvalidScenario(String),
    /// Failed to read or write a file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// Failed to parse RON.
    #[error("Failed to parse scenario: {0}")]
    Parse(#[from] ron::error::SpannedError),
    /// Failed to encode or decode results.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    /// The batch worker pool could not start.
    #[error("Failed to start worker pool: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),
    /// Some matches of a batch failed.
    #[error("{failed} of {total} matches failed")]
    MatchesFailed {
        /// Failed matches.
        failed: usize,
        /// Matches attempted.
        total: u32,
    },
    /// Runs of one seed ended on different hashes.
    #[error("Seed {seed} is not deterministic: {distinct} distinct final hashes")]
    Nondeterministic {
        /// Seed checked.
        seed: u64,
        /// Number of distinct hashes seen.
        distinct: usize,
    },
    /// The engine itself failed.
    #[error(transparent)]
    Game(#[from] GameError),
}

/// Result alias for the runner.
pub type Result<T> = std::result::Result<T, HeadlessError>;

//! Headless match runner for AI soak tests and CI verification.
//!
//! Runs whole matches of bots, nations and auto-played humans without any
//! client attached:
//!
//! - **Soak testing**: long AI-only matches shake out engine errors
//! - **Batch statistics**: many seeds in parallel, summarized to JSON
//! - **Determinism**: the same seed must always end on the same hash
//! - **Replays**: record a match and verify it plays back identically
//!
//! # Example
//!
//! ```bash
//! # One match, summary as JSON on stdout
//! cargo run -p conquest_headless -- run --scenario skirmish --seed 7
//!
//! # 200 seeds in parallel
//! cargo run -p conquest_headless -- batch --scenario archipelago --count 200 --output results/
//!
//! # Record, then verify a replay
//! cargo run -p conquest_headless -- record --scenario duel --output duel.replay
//! cargo run -p conquest_headless -- replay --file duel.replay
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod batch;
pub mod error;
pub mod replay;
pub mod runner;
pub mod scenario;

pub use batch::{run_batch, verify_determinism, BatchConfig, BatchResults, BatchSummary};
pub use error::{HeadlessError, Result};
pub use runner::{run_match, MatchRunner, MatchSummary, PlayerSummary, WinCondition};
pub use scenario::{HumanSlot, MapSpec, Scenario, BUILTIN_SCENARIOS};

//! Batch match runner.
//!
//! Runs many seeds of one scenario in parallel using rayon and collects
//! the summaries. Matches share nothing, so each runs on its own thread
//! with its own engine.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use conquest_core::Tick;

use crate::error::Result;
use crate::runner::{run_match, MatchSummary, WinCondition};
use crate::scenario::Scenario;

/// Configuration for a batch run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Built-in scenario name or RON path.
    pub scenario: String,
    /// Number of matches to run.
    pub game_count: u32,
    /// Maximum parallel matches (0 = use rayon default).
    pub parallel_games: u32,
    /// First seed; match `i` uses `seed_start + i`.
    pub seed_start: u64,
    /// Overrides the scenario tick limit.
    pub max_ticks: Option<Tick>,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            scenario: "skirmish".to_string(),
            game_count: 20,
            parallel_games: 0,
            seed_start: 0,
            max_ticks: None,
        }
    }
}

impl BatchConfig {
    /// Config for a specific scenario.
    #[must_use]
    pub fn new(scenario: &str, game_count: u32) -> Self {
        Self {
            scenario: scenario.to_string(),
            game_count,
            ..Default::default()
        }
    }

    /// Set seed start.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed_start = seed;
        self
    }

    /// Set the tick limit.
    #[must_use]
    pub fn with_max_ticks(mut self, ticks: Tick) -> Self {
        self.max_ticks = Some(ticks);
        self
    }

    /// Set the number of worker threads.
    #[must_use]
    pub fn with_parallelism(mut self, threads: u32) -> Self {
        self.parallel_games = threads;
        self
    }
}

/// A match that failed to complete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchError {
    /// Match index.
    pub game_index: u32,
    /// Seed used.
    pub seed: u64,
    /// Error message.
    pub message: String,
}

/// Aggregate statistics over a batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Completed matches.
    pub total_games: u32,
    /// Wins per controller type.
    pub wins_by_type: BTreeMap<String, u32>,
    /// Matches per end condition.
    pub conditions: BTreeMap<String, u32>,
    /// Mean match length in ticks.
    pub average_ticks: f64,
    /// Mean number of survivors.
    pub average_survivors: f64,
}

impl BatchSummary {
    /// Aggregate a set of match summaries.
    #[must_use]
    pub fn from_games(games: &[MatchSummary]) -> Self {
        if games.is_empty() {
            return Self::default();
        }
        let mut summary = Self {
            total_games: u32::try_from(games.len()).unwrap_or(u32::MAX),
            ..Self::default()
        };
        for game in games {
            if let Some(kind) = game.winner_type {
                *summary.wins_by_type.entry(format!("{kind:?}")).or_insert(0) += 1;
            }
            *summary
                .conditions
                .entry(format!("{:?}", game.win_condition))
                .or_insert(0) += 1;
        }
        let n = games.len() as f64;
        summary.average_ticks = games.iter().map(|g| g.duration_ticks as f64).sum::<f64>() / n;
        summary.average_survivors = games.iter().map(|g| g.survivors() as f64).sum::<f64>() / n;
        summary
    }

    /// Share of decided matches won by `player_type`, 0 to 1.
    #[must_use]
    pub fn win_rate(&self, player_type: &str) -> f64 {
        let wins = self.wins_by_type.get(player_type).copied().unwrap_or(0);
        f64::from(wins) / f64::from(self.total_games.max(1))
    }

    /// Matches that ended with `condition`.
    #[must_use]
    pub fn count(&self, condition: WinCondition) -> u32 {
        self.conditions
            .get(&format!("{condition:?}"))
            .copied()
            .unwrap_or(0)
    }
}

/// Results from a batch run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchResults {
    /// Configuration used.
    pub config: BatchConfig,
    /// Per-match summaries in seed order.
    pub games: Vec<MatchSummary>,
    /// Aggregate summary.
    pub summary: BatchSummary,
    /// Wall-clock runtime.
    pub duration_seconds: f64,
    /// Matches that failed.
    pub errors: Vec<BatchError>,
}

impl BatchResults {
    /// Save results to a JSON file, creating parent directories.
    ///
    /// # Errors
    ///
    /// Fails on IO or encoding errors.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load results from a JSON file.
    ///
    /// # Errors
    ///
    /// Fails on IO or decoding errors.
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }

    /// Default results file inside `dir`.
    #[must_use]
    pub fn default_path(dir: &Path) -> PathBuf {
        dir.join("batch.json")
    }
}

/// Run a batch of matches.
///
/// # Errors
///
/// Fails only when the scenario cannot be resolved; individual match
/// failures are collected into [`BatchResults::errors`].
pub fn run_batch(config: BatchConfig) -> Result<BatchResults> {
    let mut scenario = Scenario::resolve(&config.scenario)?;
    if let Some(ticks) = config.max_ticks {
        scenario.max_ticks = ticks;
    }
    let start = Instant::now();
    info!(
        games = config.game_count,
        scenario = %scenario.name,
        max_ticks = scenario.max_ticks,
        "Starting batch run"
    );

    let run_all = || -> Vec<std::result::Result<MatchSummary, BatchError>> {
        (0..config.game_count)
            .into_par_iter()
            .map(|i| {
                let seed = config.seed_start.wrapping_add(u64::from(i));
                run_match(&scenario, seed).map_err(|e| {
                    warn!(game = i, seed, error = %e, "Match failed");
                    BatchError {
                        game_index: i,
                        seed,
                        message: e.to_string(),
                    }
                })
            })
            .collect()
    };
    let results = if config.parallel_games > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(config.parallel_games as usize)
            .build()?
            .install(run_all)
    } else {
        run_all()
    };

    let mut games = Vec::new();
    let mut errors = Vec::new();
    for result in results {
        match result {
            Ok(summary) => games.push(summary),
            Err(e) => errors.push(e),
        }
    }
    let summary = BatchSummary::from_games(&games);
    let duration_seconds = start.elapsed().as_secs_f64();
    info!(
        completed = games.len(),
        failed = errors.len(),
        seconds = duration_seconds,
        "Batch complete"
    );

    Ok(BatchResults {
        config,
        games,
        summary,
        duration_seconds,
        errors,
    })
}

/// Outcome of running one seed several times.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeterminismReport {
    /// Seed checked.
    pub seed: u64,
    /// Final hash of every run.
    pub hashes: Vec<u64>,
}

impl DeterminismReport {
    /// Returns true if every run ended on the same hash.
    #[must_use]
    pub fn is_deterministic(&self) -> bool {
        self.hashes.windows(2).all(|w| w[0] == w[1])
    }

    /// Number of different final hashes.
    #[must_use]
    pub fn distinct_hashes(&self) -> usize {
        let mut unique = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique.len()
    }
}

/// Run the same seed `runs` times in parallel and compare final hashes.
///
/// # Errors
///
/// Fails if the scenario is invalid or any run errors.
pub fn verify_determinism(scenario: &Scenario, seed: u64, runs: u32) -> Result<DeterminismReport> {
    let hashes = (0..runs)
        .into_par_iter()
        .map(|_| run_match(scenario, seed).map(|s| s.final_state_hash))
        .collect::<Result<Vec<u64>>>()?;
    let report = DeterminismReport { seed, hashes };
    if report.is_deterministic() {
        info!(seed, runs, "Determinism verified");
    } else {
        warn!(seed, hashes = ?report.hashes, "Runs diverged");
    }
    Ok(report)
}

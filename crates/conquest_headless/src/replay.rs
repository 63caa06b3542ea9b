//! Record scenario matches to replay files and verify them.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use conquest_core::replay::{Recorder, Replay, ReplayPlayer};
use conquest_core::Tick;

use crate::error::Result;
use crate::runner::{summarize, MatchSummary};
use crate::scenario::Scenario;

/// What a verified replay reproduced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayReport {
    /// Ticks replayed.
    pub ticks: Tick,
    /// Intents re-applied.
    pub intents: usize,
    /// Hash both runs ended on.
    pub final_hash: u64,
}

/// Play `scenario` with `seed` for its tick limit while recording.
///
/// # Errors
///
/// Fails if the scenario is invalid or the engine errors.
pub fn record(scenario: &Scenario, seed: u64) -> Result<(Replay, MatchSummary)> {
    let mut recorder = Recorder::new(scenario.to_setup(seed)?)?;
    let mut messages = std::collections::BTreeMap::new();
    while recorder.engine().ticks() < scenario.max_ticks {
        for message in recorder.tick()?.messages {
            *messages
                .entry(format!("{:?}", message.message_type))
                .or_insert(0) += 1;
        }
    }
    let summary = summarize(&scenario.name, seed, recorder.engine().game(), messages);
    Ok((recorder.finish(), summary))
}

/// Record a match and write it to `path`.
///
/// # Errors
///
/// Fails on engine or IO errors.
pub fn record_to_file(scenario: &Scenario, seed: u64, path: &Path) -> Result<MatchSummary> {
    let (replay, summary) = record(scenario, seed)?;
    replay.save(path)?;
    info!(path = %path.display(), ticks = replay.final_tick, intents = replay.intent_count(), "Replay saved");
    Ok(summary)
}

/// Load a replay, play it back and check the final hash.
///
/// # Errors
///
/// Returns the engine's desync error when the hashes differ, or a load
/// error for a missing or foreign file.
pub fn verify_file(path: &Path) -> Result<ReplayReport> {
    let replay = Replay::load(path)?;
    let report = ReplayReport {
        ticks: replay.final_tick,
        intents: replay.intent_count(),
        final_hash: replay.final_hash,
    };
    ReplayPlayer::new(replay)?.verify()?;
    info!(path = %path.display(), ticks = report.ticks, hash = report.final_hash, "Replay verified");
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recorded_duel_matches_a_plain_run() {
        let mut scenario = Scenario::duel();
        scenario.max_ticks = 120;
        let (replay, summary) = record(&scenario, 5).unwrap();
        assert_eq!(replay.final_tick, 120);
        assert_eq!(replay.final_hash, summary.final_state_hash);

        let mut player = ReplayPlayer::new(replay).unwrap();
        player.verify().unwrap();
    }
}

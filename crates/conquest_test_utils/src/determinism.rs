//! Determinism testing utilities.
//!
//! Provides a harness for verifying that the engine produces identical
//! results given identical inputs.
//!
//! # Testing Strategy
//!
//! Lockstep play and replays need a 100% deterministic engine. Sources of
//! non-determinism include:
//!
//! - **Floating-point math**: fractional quantities use
//!   [`conquest_core::math::Fixed`] throughout.
//!
//! - **HashMap iteration order**: the world uses ordered maps and sets
//!   everywhere, so iteration follows ids.
//!
//! - **System randomness**: every random draw goes through a seeded
//!   [`conquest_core::random::PseudoRandom`].
//!
//! # Test Levels
//!
//! 1. **Unit tests**: one execution at a time
//! 2. **Property tests**: random seeds and maps must still be reproducible
//! 3. **Integration tests**: full AI matches are reproducible
//! 4. **Parallel tests**: matches run on several threads all match

use std::thread;

use conquest_core::engine::Engine;
use conquest_core::game::Game;
use conquest_core::Tick;

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Hashes from each run.
    pub hashes: Vec<u64>,
    /// Number of ticks simulated.
    pub ticks: Tick,
}

impl DeterminismResult {
    /// Get all unique hashes (should be 1 for a deterministic engine).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique: Vec<u64> = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that the runs were deterministic, with a detailed message.
    ///
    /// # Panics
    ///
    /// Panics if the runs produced different hashes.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            let unique = self.unique_hashes();
            panic!(
                "Engine is non-deterministic!\n\
                 Runs: {}\n\
                 Ticks: {}\n\
                 Unique hashes: {} (expected 1)\n\
                 All hashes: {:?}",
                self.hashes.len(),
                self.ticks,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Run a state machine multiple times and verify determinism.
///
/// # Arguments
///
/// * `runs` - Number of times to run
/// * `ticks` - Number of steps per run
/// * `setup` - Creates the initial state
/// * `step` - Advances the state by one tick
/// * `hash` - Computes the state hash
pub fn verify_determinism<S, Setup, Step, HashFn>(
    runs: usize,
    ticks: Tick,
    setup: Setup,
    step: Step,
    hash: HashFn,
) -> DeterminismResult
where
    Setup: Fn() -> S,
    Step: Fn(&mut S),
    HashFn: Fn(&S) -> u64,
{
    let mut hashes = Vec::with_capacity(runs);

    for _ in 0..runs {
        let mut state = setup();
        for _ in 0..ticks {
            step(&mut state);
        }
        hashes.push(hash(&state));
    }

    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);

    DeterminismResult {
        is_deterministic,
        hashes,
        ticks,
    }
}

/// Run an engine twice from the same setup and compare final hashes.
///
/// # Panics
///
/// Panics if an engine tick returns an error.
pub fn verify_engine_determinism<F>(setup_fn: F, num_ticks: Tick) -> DeterminismResult
where
    F: Fn() -> Engine,
{
    verify_determinism(
        2,
        num_ticks,
        setup_fn,
        |engine| {
            engine.tick().expect("engine tick failed");
        },
        Engine::state_hash,
    )
}

/// Run `num_engines` engines on separate threads and collect final hashes.
///
/// Each engine is built inside its own thread, so the setup function only
/// needs to be `Sync`.
///
/// # Panics
///
/// Panics if a thread panics or an engine tick fails.
pub fn run_parallel_engines<F>(setup_fn: F, num_engines: usize, num_ticks: Tick) -> DeterminismResult
where
    F: Fn() -> Engine + Sync,
{
    let hashes: Vec<u64> = thread::scope(|s| {
        let handles: Vec<_> = (0..num_engines)
            .map(|_| {
                s.spawn(|| {
                    let mut engine = setup_fn();
                    for _ in 0..num_ticks {
                        engine.tick().expect("engine tick failed");
                    }
                    engine.state_hash()
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().expect("engine thread panicked"))
            .collect()
    });

    DeterminismResult {
        is_deterministic: hashes.windows(2).all(|w| w[0] == w[1]),
        hashes,
        ticks: num_ticks,
    }
}

/// Compare two engine runs tick by tick, finding the first divergence.
///
/// # Returns
///
/// `None` if the runs match throughout, `Some(tick)` for the first tick
/// after which the hashes differ.
///
/// # Panics
///
/// Panics if an engine tick fails.
pub fn find_first_divergence<F>(setup_fn: F, num_ticks: Tick) -> Option<Tick>
where
    F: Fn() -> Engine,
{
    let mut a = setup_fn();
    let mut b = setup_fn();

    if a.state_hash() != b.state_hash() {
        return Some(0);
    }

    for tick in 1..=num_ticks {
        a.tick().expect("engine tick failed");
        b.tick().expect("engine tick failed");
        if a.state_hash() != b.state_hash() {
            return Some(tick);
        }
    }

    None
}

/// Verify that a snapshot round-trip preserves the world exactly.
///
/// # Panics
///
/// Panics if an engine tick fails.
pub fn verify_serialization_determinism<F>(setup_fn: F, num_ticks: Tick) -> bool
where
    F: Fn() -> Engine,
{
    let mut engine = setup_fn();
    for _ in 0..num_ticks {
        engine.tick().expect("engine tick failed");
    }
    let game = engine.into_game();
    let hash_before = game.state_hash();

    let Ok(bytes) = game.serialize() else {
        return false;
    };
    let Ok(restored) = Game::deserialize(&bytes) else {
        return false;
    };

    hash_before == restored.state_hash()
}

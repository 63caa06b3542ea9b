//! Whole-match determinism: same seed, same world.

use conquest_core::prelude::*;
use conquest_test_utils::determinism::{
    find_first_divergence, verify_engine_determinism, verify_serialization_determinism,
};
use conquest_test_utils::fixtures::ai_match;
use conquest_test_utils::strategies::arb_seed;
use proptest::prelude::*;

#[test]
fn test_bots_and_nations_replay_identically() {
    verify_engine_determinism(|| ai_match(2024, 4, 3), 400).assert_deterministic();
}

#[test]
fn test_different_seeds_diverge() {
    let mut a = ai_match(1, 3, 2);
    let mut b = ai_match(2, 3, 2);
    a.run(150).unwrap();
    b.run(150).unwrap();
    assert_ne!(a.state_hash(), b.state_hash());
}

#[test]
fn test_snapshot_mid_match_restores_exactly() {
    assert!(verify_serialization_determinism(|| ai_match(77, 3, 2), 250));
}

#[test]
fn test_restored_snapshot_keeps_the_hash() {
    let mut engine = ai_match(31, 2, 2);
    engine.run(120).unwrap();
    let game = engine.into_game();
    let restored = Game::deserialize(&game.serialize().unwrap()).unwrap();
    assert_eq!(restored.ticks(), game.ticks());
    assert_eq!(restored.state_hash(), game.state_hash());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(6))]

    #[test]
    fn prop_any_seed_is_deterministic(seed in arb_seed()) {
        prop_assert_eq!(find_first_divergence(|| ai_match(seed, 2, 2), 150), None);
    }
}

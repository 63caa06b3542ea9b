//! Record a match with human input, then play it back from bytes.

use conquest_core::prelude::*;
use conquest_core::replay::{Recorder, Replay, ReplayPlayer};
use conquest_core::setup::{MatchSetup, PlayerSlot};
use conquest_test_utils::fixtures::quick_config;

const HOST: PlayerId = PlayerId::new(0);

fn setup(seed: u64) -> MatchSetup {
    let map = GameMap::new(40, 40);
    let spawn = map.tile(8, 8);
    let mut slot = PlayerSlot::new(PlayerInfo::new(HOST, "host", PlayerType::Human));
    if let Some(tile) = spawn {
        slot = slot.with_spawn(tile);
    }
    let mut setup = MatchSetup::new(seed, map, quick_config()).with_player(slot);
    setup.add_ai_players(PlayerType::Bot, 3);
    setup.add_ai_players(PlayerType::FakeHuman, 2);
    setup
}

fn record(seed: u64, ticks: u64) -> Replay {
    let mut recorder = Recorder::new(setup(seed)).unwrap();
    for t in 0..ticks {
        match t {
            20 => recorder.submit(StampedIntent::new(HOST, Intent::SetAttackRatio { permille: 500 })),
            21 | 60 | 140 => recorder.submit(StampedIntent::new(
                HOST,
                Intent::Attack {
                    target: Owner::TerraNullius,
                    troops: None,
                },
            )),
            90 => recorder.submit(StampedIntent::new(HOST, Intent::ToggleAutoPlay { enabled: true })),
            _ => {}
        }
        recorder.tick().unwrap();
    }
    recorder.finish()
}

#[test]
fn test_replay_from_bytes_verifies() {
    let replay = record(12, 300);
    assert_eq!(replay.intent_count(), 5);

    let restored = Replay::from_bytes(&replay.to_bytes().unwrap()).unwrap();
    assert_eq!(restored, replay);

    let mut player = ReplayPlayer::new(restored).unwrap();
    player.verify().unwrap();
    assert_eq!(player.current_tick(), 300);
}

#[test]
fn test_human_input_changes_the_outcome() {
    let with_input = record(5, 200);
    let mut idle = Recorder::new(setup(5)).unwrap();
    for _ in 0..200 {
        idle.tick().unwrap();
    }
    assert_ne!(idle.finish().final_hash, with_input.final_hash);
}

#[test]
fn test_replay_with_dropped_intent_desyncs() {
    let mut replay = record(8, 200);
    replay.turns.retain(|turn| turn.tick != 21);
    let mut player = ReplayPlayer::new(replay).unwrap();
    assert!(matches!(player.verify(), Err(GameError::DesyncDetected { .. })));
}

#[test]
fn test_step_by_step_playback_stops_at_the_end() {
    let replay = record(3, 50);
    let mut player = ReplayPlayer::new(replay).unwrap();
    let mut steps = 0;
    while player.advance().unwrap() {
        steps += 1;
    }
    assert_eq!(steps, 49);
    assert!(player.is_finished());
    assert!(!player.advance().unwrap());
}

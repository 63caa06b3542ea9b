//! Scenario tests driving whole executions through the engine.
//!
//! These go through [`Engine::tick`] so scheduling, start-up order and the
//! spawn phase all take part, unlike the unit tests that tick one
//! execution by hand.

use conquest_core::executions::{ConstructionExecution, SamLauncherExecution};
use conquest_core::prelude::*;
use conquest_core::setup::{MatchSetup, PlayerSlot};
use conquest_core::unit::BuildParams;
use conquest_test_utils::fixtures::{game_with_players, strait_map, tile};

// =============================================================================
// Helpers
// =============================================================================

fn city_config() -> GameConfig {
    let mut config = GameConfig::default();
    config.spawn_phase_ticks = 0;
    config.starting_gold = 300_000;
    let city = config.unit_info_mut(UnitType::City);
    city.cost = 250_000;
    city.cost_per_owned = 0;
    city.max_cost = None;
    city.construction_duration = Some(20);
    config
}

fn gold(engine: &Engine, id: PlayerId) -> u64 {
    engine.game().player(id).map_or(0, Player::gold)
}

// =============================================================================
// Construction
// =============================================================================

#[test]
fn test_city_is_escrowed_refunded_then_charged() {
    let (mut game, ids) = game_with_players(GameMap::new(10, 10), city_config(), &[PlayerType::Human]);
    let builder = ids[0];
    let site = tile(&game, 4, 4);
    game.conquer(builder, site);

    let mut engine = Engine::new(game);
    engine.add_execution(ConstructionExecution::new(builder, UnitType::City, site));

    engine.tick().unwrap();
    assert_eq!(gold(&engine, builder), 50_000);
    assert_eq!(engine.game().count_units(builder, UnitType::Construction), 1);
    assert_eq!(engine.execution_names(), vec!["ConstructionExecution"]);

    engine.run(19).unwrap();
    assert_eq!(gold(&engine, builder), 300_000);
    assert_eq!(engine.game().count_units(builder, UnitType::Construction), 0);
    assert!(engine.execution_names().is_empty());
    assert_eq!(engine.pending_count(), 1);

    engine.tick().unwrap();
    assert_eq!(engine.game().count_units(builder, UnitType::City), 1);
    assert_eq!(gold(&engine, builder), 50_000);
    assert_eq!(engine.execution_names(), vec!["StructureExecution"]);
}

#[test]
fn test_construction_for_unaffordable_unit_does_nothing() {
    let mut config = city_config();
    config.starting_gold = 100;
    let (mut game, ids) = game_with_players(GameMap::new(10, 10), config, &[PlayerType::Human]);
    let site = tile(&game, 2, 2);
    game.conquer(ids[0], site);

    let mut engine = Engine::new(game);
    engine.add_execution(ConstructionExecution::new(ids[0], UnitType::City, site));
    engine.tick().unwrap();

    assert_eq!(gold(&engine, ids[0]), 100);
    assert_eq!(engine.game().count_units(ids[0], UnitType::Construction), 0);
    assert_eq!(engine.execution_count(), 0);
}

#[test]
fn test_nuke_launches_without_construction_delay() {
    let mut config = GameConfig::default();
    config.spawn_phase_ticks = 0;
    config.starting_gold = 10_000_000;
    let (mut game, ids) = game_with_players(
        GameMap::new(40, 10),
        config,
        &[PlayerType::Human, PlayerType::Human],
    );
    let (attacker, victim) = (ids[0], ids[1]);
    let silo = tile(&game, 2, 5);
    let target = tile(&game, 35, 5);
    game.conquer(attacker, silo);
    game.conquer(victim, target);
    game.build_unit(attacker, UnitType::MissileSilo, silo, BuildParams::default())
        .unwrap();

    let mut engine = Engine::new(game);
    engine.add_execution(ConstructionExecution::new(attacker, UnitType::AtomBomb, target));
    engine.tick().unwrap();
    assert_eq!(engine.game().count_units(attacker, UnitType::Construction), 0);
    assert_eq!(engine.pending_count(), 1);

    engine.tick().unwrap();
    assert_eq!(engine.execution_names(), vec!["NukeExecution"]);
    assert_eq!(engine.game().count_units(attacker, UnitType::AtomBomb), 1);
}

// =============================================================================
// Ports and warships
// =============================================================================

#[test]
fn test_port_builds_one_warship_at_a_time() {
    let mut config = GameConfig::default();
    config.spawn_phase_ticks = 0;
    config.starting_gold = 10_000_000;
    let (mut game, ids) = game_with_players(strait_map(20, 6, 2), config, &[PlayerType::Human]);
    let navy = ids[0];
    let port_tile = tile(&game, 1, 3);
    game.conquer(navy, port_tile);
    game.build_unit(navy, UnitType::Port, port_tile, BuildParams::default())
        .unwrap();
    let before = game.player(navy).unwrap().gold();

    let mut engine = Engine::new(game);
    engine.add_execution(ConstructionExecution::new(navy, UnitType::Viper, port_tile));
    engine.add_execution(ConstructionExecution::new(navy, UnitType::Viper, port_tile));
    engine.tick().unwrap();

    let viper_cost = engine.game().config().unit_info(UnitType::Viper).cost;
    assert_eq!(gold(&engine, navy), before - viper_cost);
    assert_eq!(engine.game().count_units(navy, UnitType::Construction), 1);
    assert_eq!(engine.execution_names(), vec!["ConstructionExecution"]);
}

// =============================================================================
// Interception
// =============================================================================

#[test]
fn test_two_launchers_fire_one_missile() {
    let mut config = GameConfig::default();
    config.spawn_phase_ticks = 0;
    config.starting_gold = 10_000_000;
    let (mut game, ids) = game_with_players(
        GameMap::new(30, 30),
        config,
        &[PlayerType::Human, PlayerType::Human],
    );
    let (defender, attacker) = (ids[0], ids[1]);
    let sites = [tile(&game, 5, 5), tile(&game, 12, 5)];
    for &site in &sites {
        game.conquer(defender, site);
    }
    let nuke_tile = tile(&game, 9, 20);
    let nuke = game
        .build_unit(attacker, UnitType::AtomBomb, nuke_tile, BuildParams::default())
        .unwrap();

    let mut engine = Engine::new(game);
    for &site in &sites {
        engine.add_execution(SamLauncherExecution::new(defender, site));
    }
    engine.run(2).unwrap();
    assert_eq!(engine.game().count_units(defender, UnitType::SamLauncher), 2);
    assert_eq!(engine.pending_count(), 1);
    assert!(engine.game().unit(nuke).unwrap().targeted_by_sam());

    for _ in 0..100 {
        engine.tick().unwrap();
        assert!(engine.game().count_units(defender, UnitType::SamMissile) <= 1);
    }
    assert!(!engine.game().is_unit_active(nuke));
}

// =============================================================================
// Match setup and auto-play
// =============================================================================

#[test]
fn test_auto_play_human_gets_an_ai_after_toggle() {
    let mut config = GameConfig::default();
    config.spawn_phase_ticks = 3;
    let map = GameMap::new(30, 30);
    let spawn = map.tile(15, 15).unwrap();
    let setup = MatchSetup::new(4, map, config).with_player(
        PlayerSlot::new(PlayerInfo::new(PlayerId::new(0), "away", PlayerType::Human))
            .with_spawn(spawn)
            .with_auto_play(true),
    );
    let mut engine = setup.build().unwrap();

    engine.run(5).unwrap();
    let player = engine.game().player(PlayerId::new(0)).unwrap();
    assert!(player.auto_play());
    assert!(player.has_spawned());
    assert!(engine.execution_names().contains(&"AutoPlayExecution"));
}

#[test]
fn test_disabling_auto_play_retires_the_ai() {
    let mut config = GameConfig::default();
    config.spawn_phase_ticks = 3;
    let map = GameMap::new(30, 30);
    let spawn = map.tile(10, 10).unwrap();
    let host = PlayerId::new(0);
    let setup = MatchSetup::new(6, map, config).with_player(
        PlayerSlot::new(PlayerInfo::new(host, "host", PlayerType::Human))
            .with_spawn(spawn)
            .with_auto_play(true),
    );
    let mut engine = setup.build().unwrap();
    engine.run(5).unwrap();

    engine.add_intent(StampedIntent::new(host, Intent::ToggleAutoPlay { enabled: false }));
    engine.run(200).unwrap();
    assert!(!engine.game().player(host).unwrap().auto_play());
    assert!(!engine.execution_names().contains(&"AutoPlayExecution"));
}

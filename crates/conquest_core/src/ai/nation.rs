//! Nations: AI players that play like a human would.
//!
//! On top of the bot's expand-then-fight loop a nation builds a full
//! economy and defence, keeps a fleet, answers and sends alliance
//! requests, embargoes players it hates, nukes its enemy's structures and
//! invades overseas when it has no land border left to push.

use tracing::debug;

use crate::error::Result;
use crate::execution::{Execution, Scheduler};
use crate::executions::{
    ensure_init, AllianceRequestExecution, ConstructionExecution, EmbargoExecution,
    MoveWarshipsExecution, TransportShipExecution,
};
use crate::game::Game;
use crate::map::TileRef;
use crate::math::permille;
use crate::player::{Owner, PlayerId, Relation};
use crate::random::PseudoRandom;
use crate::unit::{UnitId, UnitType};
use crate::Tick;

use super::behavior::{AttackRatio, BotBehavior};
use super::planner::{
    build_next, nuke_target, ocean_next_to, overseas_target, BuildSlot, Cadence,
    RECENT_STRIKE_TICKS,
};

pub(super) const NATION_BUILDS: [BuildSlot; 6] = [
    BuildSlot::Structure(UnitType::City, 8),
    BuildSlot::Structure(UnitType::Port, 3),
    BuildSlot::Structure(UnitType::DefensePost, 4),
    BuildSlot::Structure(UnitType::MissileSilo, 1),
    BuildSlot::Structure(UnitType::SamLauncher, 2),
    BuildSlot::Warships(6),
];

/// One in this many decisions sends an alliance request.
const ALLIANCE_REQUEST_ODDS: u32 = 10;

/// One in this many decisions fights a random neighbour instead of the
/// enemy of record.
const RANDOM_ENEMY_ODDS: u32 = 10;

/// A neighbour with this many times our troops is worth allying with.
const STRONGER_FACTOR: u64 = 2;

#[derive(Debug)]
enum NationState {
    AwaitingOwner,
    Active(BotBehavior),
}

/// A nation-tier AI player.
#[derive(Debug)]
pub struct FakeHumanExecution {
    owner: PlayerId,
    rng: PseudoRandom,
    cadence: Option<Cadence>,
    state: NationState,
    next_build: usize,
    recent_strikes: Vec<(TileRef, Tick)>,
    active: bool,
}

impl FakeHumanExecution {
    /// Nation for `owner`, deterministic for a given `seed`.
    #[must_use]
    pub fn new(owner: PlayerId, seed: u64) -> Self {
        Self {
            owner,
            rng: PseudoRandom::new(seed),
            cadence: None,
            state: NationState::AwaitingOwner,
            next_build: 0,
            recent_strikes: Vec::new(),
            active: true,
        }
    }

    /// Returns true once the nation's player has spawned.
    #[must_use]
    pub const fn is_playing(&self) -> bool {
        matches!(self.state, NationState::Active(_))
    }

    /// Tiles struck recently, with the tick of the strike.
    #[must_use]
    pub fn recent_strikes(&self) -> &[(TileRef, Tick)] {
        &self.recent_strikes
    }

    fn decide(&mut self, game: &mut Game, ticks: Tick, scheduler: &mut Scheduler) {
        let NationState::Active(behavior) = &mut self.state else {
            return;
        };
        behavior.handle_alliance_requests(game, scheduler, ticks);
        behavior.check_incoming_attacks(game, ticks);
        behavior.forget_old_enemies(game, ticks);
        behavior.assist_allies(game, scheduler, ticks);

        if self.rng.chance(ALLIANCE_REQUEST_ODDS) {
            request_alliance(game, self.owner, scheduler);
        }
        update_embargoes(game, self.owner, scheduler);

        if let Some(slot) = build_next(
            game,
            self.owner,
            &NATION_BUILDS,
            self.next_build,
            &mut self.rng,
            scheduler,
        ) {
            self.next_build = slot + 1;
        }

        self.recent_strikes
            .retain(|&(_, at)| ticks.saturating_sub(at) < RECENT_STRIKE_TICKS);
        if let Some(enemy) = behavior.enemy() {
            if self.rng.chance(game.config().nation_nuke_odds) {
                if let Some((weapon, tile)) =
                    nuke_target(game, self.owner, enemy, &self.recent_strikes, ticks)
                {
                    debug!(player = %self.owner, %enemy, kind = weapon.name(), %tile, "Nation nukes");
                    scheduler.schedule(ConstructionExecution::new(self.owner, weapon, tile));
                    self.recent_strikes.push((tile, ticks));
                }
            }
        }

        if game.shares_border(self.owner, Owner::TerraNullius) {
            behavior.send_attack(game, scheduler, Owner::TerraNullius, false);
            return;
        }
        let enemy = if self.rng.chance(RANDOM_ENEMY_ODDS) {
            behavior.select_random_enemy(game, ticks)
        } else {
            behavior.select_enemy(game, ticks)
        };
        if let Some(enemy) = enemy {
            behavior.send_attack(game, scheduler, Owner::Player(enemy), false);
            return;
        }
        let troops = behavior.attack_troops(game);
        invade_overseas(game, self.owner, troops, &mut self.rng, scheduler);
    }
}

/// Ask one neighbour for an alliance: one we like, or one much stronger.
fn request_alliance(game: &Game, owner: PlayerId, scheduler: &mut Scheduler) {
    let Some(player) = game.player(owner) else {
        return;
    };
    let candidate = game
        .neighboring_owners(owner)
        .into_iter()
        .filter_map(Owner::player)
        .filter(|&p| game.is_alive(p) && !player.is_allied_with(p))
        .find(|&p| {
            let stronger = game
                .player(p)
                .is_some_and(|o| o.troops() > player.troops().saturating_mul(STRONGER_FACTOR));
            player.relation(p) >= Relation::Friendly || stronger
        });
    if let Some(recipient) = candidate {
        scheduler.schedule(AllianceRequestExecution::new(owner, recipient));
    }
}

/// Embargo hostile players, lift embargoes once relations recover.
fn update_embargoes(game: &Game, owner: PlayerId, scheduler: &mut Scheduler) {
    let Some(player) = game.player(owner) else {
        return;
    };
    for other in game.alive_players().map(|p| p.id()).filter(|&p| p != owner) {
        let hostile = player.relation(other) == Relation::Hostile;
        let embargoed = player.has_embargo_against(other);
        if hostile != embargoed {
            scheduler.schedule(EmbargoExecution::new(owner, other, hostile));
        }
    }
}

/// Ship troops to a hostile or empty shore across the water, escorted by
/// the whole fleet.
pub(super) fn invade_overseas(
    game: &Game,
    owner: PlayerId,
    troops: u64,
    rng: &mut PseudoRandom,
    scheduler: &mut Scheduler,
) {
    if troops == 0 {
        return;
    }
    let Some(destination) = overseas_target(game, owner, rng) else {
        return;
    };
    if game.can_build(owner, UnitType::TransportShip, destination).is_none() {
        return;
    }
    debug!(player = %owner, %destination, troops, "Nation invades overseas");
    scheduler.schedule(TransportShipExecution::new(owner, destination, Some(troops)));

    let fleet: Vec<UnitId> = [UnitType::Viper, UnitType::Condor]
        .into_iter()
        .flat_map(|t| game.units_of(owner, t))
        .map(|u| u.id())
        .collect();
    if fleet.is_empty() {
        return;
    }
    if let Some(escort_to) = ocean_next_to(game, destination) {
        scheduler.schedule(MoveWarshipsExecution::new(owner, fleet, escort_to));
    }
}

impl Execution for FakeHumanExecution {
    fn init(&mut self, game: &mut Game, _ticks: Tick) -> Result<()> {
        let config = game.config();
        self.cadence = Some(Cadence::random(
            &mut self.rng,
            config.nation_min_period,
            config.nation_max_period,
        ));
        Ok(())
    }

    fn tick(&mut self, game: &mut Game, ticks: Tick, scheduler: &mut Scheduler) -> Result<()> {
        ensure_init(self.cadence.is_some(), self.name())?;
        if !self.cadence.is_some_and(|c| c.is_due(ticks)) {
            return Ok(());
        }
        let Some(player) = game.player(self.owner) else {
            return Ok(());
        };
        if !player.is_alive() {
            debug!(player = %self.owner, "Nation retired");
            self.active = false;
            return Ok(());
        }
        if !player.has_spawned() {
            return Ok(());
        }
        if let NationState::AwaitingOwner = self.state {
            let ratio = permille(self.rng.next_int(200, 401) as u32);
            let rng = PseudoRandom::new(self.rng.next_u64());
            self.state = NationState::Active(BotBehavior::new(
                self.owner,
                AttackRatio::Fixed(ratio),
                rng,
            ));
        }
        self.decide(game, ticks, scheduler);
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn name(&self) -> &'static str {
        "FakeHumanExecution"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use crate::map::GameMap;
    use crate::player::{PlayerInfo, PlayerType};

    fn nation_game(map: GameMap) -> (Game, PlayerId, PlayerId) {
        let mut game = Game::new(map, GameConfig::default(), 4);
        let (a, b) = (PlayerId::new(0), PlayerId::new(1));
        game.add_player(PlayerInfo::new(a, "nation", PlayerType::FakeHuman))
            .unwrap();
        game.add_player(PlayerInfo::new(b, "human", PlayerType::Human))
            .unwrap();
        game.player_mut(a).unwrap().mark_spawned();
        (game, a, b)
    }

    fn decide_once(exec: &mut FakeHumanExecution, game: &mut Game) -> Scheduler {
        exec.init(game, 0).unwrap();
        let mut scheduler = Scheduler::new();
        for t in 0..50 {
            exec.tick(game, t, &mut scheduler).unwrap();
            if !scheduler.is_empty() {
                break;
            }
        }
        scheduler
    }

    #[test]
    fn test_nation_expands_and_builds_a_city() {
        let (mut game, a, _) = nation_game(GameMap::new(12, 12));
        for x in 2..8 {
            for y in 2..8 {
                let tile = game.map().tile(x, y).unwrap();
                game.conquer(a, tile);
            }
        }
        game.player_mut(a).unwrap().add_gold(1_000_000);
        let mut exec = FakeHumanExecution::new(a, 12);
        let scheduler = decide_once(&mut exec, &mut game);
        let names = scheduler.pending_names();
        assert!(exec.is_playing());
        assert!(names.contains(&"ConstructionExecution"));
        assert!(names.contains(&"AttackExecution"));
    }

    #[test]
    fn test_nation_embargoes_hostile_players() {
        let (mut game, a, b) = nation_game(GameMap::new(8, 8));
        let tile = game.map().tile(1, 1).unwrap();
        game.conquer(a, tile);
        game.player_mut(a).unwrap().update_relation(b, -100);
        let mut exec = FakeHumanExecution::new(a, 5);
        let scheduler = decide_once(&mut exec, &mut game);
        assert!(scheduler.pending_names().contains(&"EmbargoExecution"));
    }

    #[test]
    fn test_nation_invades_overseas_without_land_border() {
        let map = GameMap::from_ascii(&["##~~~~~~~~~~~##"]).unwrap();
        let (mut game, a, b) = nation_game(map);
        for x in [0, 1] {
            let tile = game.map().tile(x, 0).unwrap();
            game.conquer(a, tile);
        }
        for x in [13, 14] {
            let tile = game.map().tile(x, 0).unwrap();
            game.conquer(b, tile);
        }
        let mut exec = FakeHumanExecution::new(a, 2);
        exec.init(&mut game, 0).unwrap();
        let mut scheduler = Scheduler::new();
        for t in 0..20_000 {
            exec.tick(&mut game, t, &mut scheduler).unwrap();
            if scheduler.pending_names().contains(&"TransportShipExecution") {
                break;
            }
        }
        assert!(scheduler.pending_names().contains(&"TransportShipExecution"));
    }

    #[test]
    fn test_tick_before_init_is_an_error() {
        let (mut game, a, _) = nation_game(GameMap::new(4, 4));
        let mut exec = FakeHumanExecution::new(a, 1);
        assert!(exec.tick(&mut game, 0, &mut Scheduler::new()).is_err());
    }
}

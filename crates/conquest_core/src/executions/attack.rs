//! Land attacks.
//!
//! An attack commits troops against one target (a player or unclaimed
//! land). Each tick it takes up to `attack_tiles_per_tick` frontier tiles,
//! paying a troop cost per tile. Attacks against the same target from the
//! same attacker merge. Leftover troops return home when it ends.

use tracing::{debug, info};

use crate::error::Result;
use crate::execution::{Execution, Scheduler};
use crate::game::{AttackId, Game, MessageType};
use crate::map::TileRef;
use crate::math::scale;
use crate::player::{Owner, PlayerId};
use crate::unit::UnitType;
use crate::Tick;

use super::ensure_init;

/// Relation penalty toward an attacker from its victim.
const ATTACK_RELATION_PENALTY: i32 = -20;

/// A land attack in progress.
#[derive(Debug)]
pub struct AttackExecution {
    owner: PlayerId,
    target: Owner,
    requested_troops: Option<u64>,
    landing: Option<TileRef>,
    attack: Option<AttackId>,
    initialized: bool,
    active: bool,
}

impl AttackExecution {
    /// Attack `target` over a shared land border. `troops` defaults to the
    /// attacker's attack ratio of its current troops.
    #[must_use]
    pub fn new(owner: PlayerId, target: Owner, troops: Option<u64>) -> Self {
        Self {
            owner,
            target,
            requested_troops: troops,
            landing: None,
            attack: None,
            initialized: false,
            active: true,
        }
    }

    /// Continue an attack from a landing tile with troops already taken
    /// off the attacker (transport ships).
    #[must_use]
    pub fn landing(owner: PlayerId, target: Owner, troops: u64, landing: TileRef) -> Self {
        Self {
            landing: Some(landing),
            ..Self::new(owner, target, Some(troops))
        }
    }

    /// The registered attack, once started.
    #[must_use]
    pub const fn attack_id(&self) -> Option<AttackId> {
        self.attack
    }

    fn start(&mut self, game: &mut Game) {
        let Some(attacker) = game.player(self.owner).filter(|p| p.is_alive()) else {
            self.active = false;
            return;
        };
        if let Owner::Player(target) = self.target {
            if game.is_friendly(self.owner, target) || !game.is_alive(target) {
                debug!(player = %self.owner, %target, "Refusing to attack a friendly or dead player");
                self.active = false;
                return;
            }
        }
        if self.landing.is_none() && !game.shares_border(self.owner, self.target) {
            debug!(player = %self.owner, target = ?self.target, "No land border with target");
            self.active = false;
            return;
        }

        let troops = match (self.landing, self.requested_troops) {
            (Some(_), Some(troops)) => troops,
            (_, requested) => {
                let wanted = requested
                    .unwrap_or_else(|| scale(attacker.troops(), attacker.attack_ratio()))
                    .min(attacker.troops());
                game.player_mut(self.owner)
                    .map_or(0, |p| p.remove_troops(wanted))
            }
        };
        if troops == 0 {
            self.active = false;
            return;
        }

        // fold into an attack already running against the same target
        let existing = game
            .outgoing_attacks(self.owner)
            .into_iter()
            .find(|a| a.target == self.target && a.source_tile.is_none() && self.landing.is_none())
            .map(|a| a.id);
        if let Some(existing) = existing {
            if let Some(attack) = game.attack_mut(existing) {
                attack.troops = attack.troops.saturating_add(troops);
            }
            debug!(player = %self.owner, troops, "Merged into running attack");
            self.active = false;
            return;
        }

        self.attack = Some(game.register_attack(self.owner, self.target, troops, self.landing));
        info!(player = %self.owner, target = ?self.target, troops, "Attack started");
        if let Owner::Player(target) = self.target {
            if let Some(victim) = game.player_mut(target) {
                victim.update_relation(self.owner, ATTACK_RELATION_PENALTY);
            }
            game.display_message(
                format!("{} is attacking you with {troops} troops", self.owner),
                MessageType::Attack,
                Some(target),
            );
        }
    }

    /// Target tiles adjacent to the attacker, most enclosed first.
    fn frontier(&self, game: &Game, landing: Option<TileRef>) -> Vec<TileRef> {
        let Some(attacker) = game.player(self.owner) else {
            return Vec::new();
        };
        let mut candidates: Vec<(usize, TileRef)> = Vec::new();
        let mut consider = |tile: TileRef| {
            if !game.is_land(tile) || game.owner(tile) != self.target {
                return;
            }
            if candidates.iter().any(|&(_, t)| t == tile) {
                return;
            }
            let own = game
                .neighbors(tile)
                .into_iter()
                .filter(|&n| game.owner_id(n) == Some(self.owner))
                .count();
            candidates.push((own, tile));
        };
        for &border in attacker.border_tiles() {
            for n in game.neighbors(border) {
                consider(n);
            }
        }
        if let Some(tile) = landing {
            consider(tile);
        }
        candidates.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
        candidates.into_iter().map(|(_, t)| t).collect()
    }

    /// Troops needed to take `tile`.
    fn tile_cost(&self, game: &Game, tile: TileRef) -> u64 {
        let config = game.config();
        let mut cost = match self.target {
            Owner::TerraNullius => config.terra_nullius_tile_cost,
            Owner::Player(defender) => game.player(defender).map_or(config.min_tile_cost, |p| {
                let tiles = (p.tile_count() as u64).max(1);
                (p.troops() / tiles).max(config.min_tile_cost)
            }),
        };
        if let Owner::Player(defender) = self.target {
            let protected = game
                .nearby_units(tile, config.defense_post_range, &[UnitType::DefensePost])
                .iter()
                .any(|u| u.owner == defender);
            if protected {
                cost = cost.saturating_mul(config.defense_post_bonus_permille) / 1000;
            }
        }
        if game.has_fallout(tile) {
            cost = cost.saturating_mul(2);
        }
        cost.max(1)
    }

    fn finish(&mut self, game: &mut Game, id: AttackId, reason: &'static str) {
        let leftover = game.attack_mut(id).map_or(0, |a| {
            a.active = false;
            std::mem::take(&mut a.troops)
        });
        if let Some(player) = game.player_mut(self.owner).filter(|p| p.is_alive()) {
            player.add_troops(leftover);
        }
        debug!(player = %self.owner, leftover, reason, "Attack ended");
        self.active = false;
    }
}

impl Execution for AttackExecution {
    fn init(&mut self, _game: &mut Game, _ticks: Tick) -> Result<()> {
        self.initialized = true;
        Ok(())
    }

    fn tick(&mut self, game: &mut Game, _ticks: Tick, _scheduler: &mut Scheduler) -> Result<()> {
        ensure_init(self.initialized, self.name())?;
        let Some(id) = self.attack else {
            self.start(game);
            return Ok(());
        };
        let Some((mut troops, landing)) = game
            .attack(id)
            .filter(|a| a.active)
            .map(|a| (a.troops, a.source_tile))
        else {
            self.active = false;
            return Ok(());
        };
        if !game.is_alive(self.owner) {
            self.finish(game, id, "attacker eliminated");
            return Ok(());
        }
        if let Owner::Player(target) = self.target {
            if !game.is_alive(target) || game.is_friendly(self.owner, target) {
                self.finish(game, id, "target no longer hostile");
                return Ok(());
            }
        }

        let frontier = self.frontier(game, landing);
        if frontier.is_empty() {
            self.finish(game, id, "nothing left to take");
            return Ok(());
        }
        let per_tick = game.config().attack_tiles_per_tick;
        for tile in frontier.into_iter().take(per_tick) {
            let cost = self.tile_cost(game, tile);
            if troops < cost {
                troops = 0;
                break;
            }
            troops -= cost;
            if let Owner::Player(defender) = self.target {
                if let Some(player) = game.player_mut(defender) {
                    player.remove_troops(cost);
                }
            }
            game.conquer(self.owner, tile);
        }
        // the landing tile only matters until the foothold is taken
        let landing = landing.filter(|&t| game.owner_id(t) != Some(self.owner));
        if let Some(attack) = game.attack_mut(id) {
            attack.troops = troops;
            attack.source_tile = landing;
        }
        if troops == 0 {
            self.finish(game, id, "out of troops");
        }
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn name(&self) -> &'static str {
        "AttackExecution"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use crate::map::GameMap;
    use crate::player::{PlayerInfo, PlayerType};

    /// `a` owns column 0, `b` owns columns 5..10 of a 10x5 land map.
    fn border_world() -> (Game, PlayerId, PlayerId) {
        let mut game = Game::new(GameMap::new(10, 5), GameConfig::default(), 4);
        let (a, b) = (PlayerId::new(0), PlayerId::new(1));
        for id in [a, b] {
            game.add_player(PlayerInfo::new(id, id.to_string(), PlayerType::Bot))
                .unwrap();
        }
        for y in 0..5 {
            let tile = game.map().tile(0, y).unwrap();
            game.conquer(a, tile);
            for x in 5..10 {
                let tile = game.map().tile(x, y).unwrap();
                game.conquer(b, tile);
            }
        }
        (game, a, b)
    }

    fn run(exec: &mut AttackExecution, game: &mut Game, ticks: u64) {
        exec.init(game, 0).unwrap();
        for t in 0..ticks {
            if !exec.is_active() {
                break;
            }
            exec.tick(game, t, &mut Scheduler::new()).unwrap();
        }
    }

    #[test]
    fn test_expansion_takes_terra_nullius_cheaply() {
        let (mut game, a, _) = border_world();
        let mut exec = AttackExecution::new(a, Owner::TerraNullius, Some(1_000));
        run(&mut exec, &mut game, 50);
        assert!(!exec.is_active());
        // columns 1..5 are free: 20 tiles at 5 troops each
        assert_eq!(game.player(a).unwrap().tile_count(), 25);
        assert_eq!(game.player(a).unwrap().troops(), 2_500 - 100);
    }

    #[test]
    fn test_attack_registers_and_notifies_defender() {
        let (mut game, a, b) = border_world();
        for y in 0..5 {
            for x in 1..5 {
                let tile = game.map().tile(x, y).unwrap();
                game.conquer(a, tile);
            }
        }
        let mut exec = AttackExecution::new(a, Owner::Player(b), Some(500));
        exec.init(&mut game, 0).unwrap();
        exec.tick(&mut game, 0, &mut Scheduler::new()).unwrap();
        assert!(exec.attack_id().is_some());
        assert_eq!(game.incoming_attacks(b).len(), 1);
        assert!(game.player(b).unwrap().relation_score(a) < 0);
        assert!(game
            .drain_messages()
            .iter()
            .any(|m| m.player == Some(b) && m.message_type == MessageType::Attack));

        exec.tick(&mut game, 1, &mut Scheduler::new()).unwrap();
        assert!(game.player(b).unwrap().tile_count() < 25);
    }

    #[test]
    fn test_no_border_means_no_attack() {
        let (mut game, a, b) = border_world();
        let mut exec = AttackExecution::new(a, Owner::Player(b), None);
        run(&mut exec, &mut game, 1);
        assert!(!exec.is_active());
        assert_eq!(game.player(a).unwrap().troops(), 2_500);
        assert!(game.incoming_attacks(b).is_empty());
    }

    #[test]
    fn test_allies_cannot_attack_each_other() {
        let (mut game, a, b) = border_world();
        assert!(game.create_alliance_request(a, b));
        assert!(game.accept_alliance_request(a, b));
        let mut exec = AttackExecution::landing(a, Owner::Player(b), 100, game.map().tile(5, 0).unwrap());
        run(&mut exec, &mut game, 1);
        assert!(!exec.is_active());
        assert_eq!(game.player(b).unwrap().tile_count(), 25);
    }

    #[test]
    fn test_second_attack_merges_into_first() {
        let (mut game, a, _) = border_world();
        let mut first = AttackExecution::new(a, Owner::TerraNullius, Some(10));
        first.init(&mut game, 0).unwrap();
        first.tick(&mut game, 0, &mut Scheduler::new()).unwrap();
        let id = first.attack_id().unwrap();

        let mut second = AttackExecution::new(a, Owner::TerraNullius, Some(40));
        second.init(&mut game, 0).unwrap();
        second.tick(&mut game, 0, &mut Scheduler::new()).unwrap();
        assert!(!second.is_active());
        assert_eq!(game.attack(id).unwrap().troops, 50);
    }

    #[test]
    fn test_tick_before_init_is_an_error() {
        let (mut game, a, _) = border_world();
        let mut exec = AttackExecution::new(a, Owner::TerraNullius, None);
        assert!(exec.tick(&mut game, 0, &mut Scheduler::new()).is_err());
    }
}

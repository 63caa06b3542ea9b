//! Attack and diplomacy primitives shared by every AI tier.
//!
//! All AI attacks go through [`BotBehavior::send_attack`] so the rules for
//! starting a fight are the same whichever tier decides to fight.

use tracing::debug;

use crate::execution::Scheduler;
use crate::executions::{AllianceReplyExecution, AttackExecution, TransportShipExecution};
use crate::game::Game;
use crate::map::TileRef;
use crate::math::{scale, Fixed};
use crate::player::{Owner, PlayerId, Relation};
use crate::random::PseudoRandom;
use crate::Tick;

/// Relation step toward neutral applied on every forget pass.
const RELATION_DECAY: i32 = 1;

/// Where the troop share of an attack comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttackRatio {
    /// Chosen once when the AI is created.
    Fixed(Fixed),
    /// Read from the player's setting at every attack.
    Live,
}

/// Enemy tracking and attack dispatch for one AI player.
#[derive(Debug, Clone)]
pub struct BotBehavior {
    owner: PlayerId,
    attack_ratio: AttackRatio,
    enemy: Option<PlayerId>,
    enemy_updated: Tick,
    rng: PseudoRandom,
}

/// `other`'s shore closest to `owner`'s coast.
fn landing_site(game: &Game, owner: PlayerId, other: PlayerId) -> Option<TileRef> {
    let shores: Vec<TileRef> = game
        .player(other)?
        .border_tiles()
        .iter()
        .copied()
        .filter(|&t| game.is_ocean_shore(t))
        .collect();
    let &first = shores.first()?;
    let home = game.nearest_owned_shore(owner, first)?;
    shores
        .into_iter()
        .min_by_key(|&t| (game.manhattan_dist(t, home), t))
}

/// Returns true if `owner` can send an attack at `other`: over a shared
/// border, or by sea to one of its shores.
#[must_use]
pub fn can_reach(game: &Game, owner: PlayerId, other: PlayerId) -> bool {
    game.shares_border(owner, Owner::Player(other)) || landing_site(game, owner, other).is_some()
}

impl BotBehavior {
    /// Behavior for `owner` with its own random stream.
    #[must_use]
    pub fn new(owner: PlayerId, attack_ratio: AttackRatio, rng: PseudoRandom) -> Self {
        Self {
            owner,
            attack_ratio,
            enemy: None,
            enemy_updated: 0,
            rng,
        }
    }

    /// The player this behavior plays for.
    #[must_use]
    pub const fn owner(&self) -> PlayerId {
        self.owner
    }

    /// Current enemy of record.
    #[must_use]
    pub const fn enemy(&self) -> Option<PlayerId> {
        self.enemy
    }

    fn set_enemy(&mut self, enemy: PlayerId, ticks: Tick) {
        if self.enemy != Some(enemy) {
            debug!(player = %self.owner, %enemy, "New enemy");
        }
        self.enemy = Some(enemy);
        self.enemy_updated = ticks;
    }

    /// Troops the next attack would commit.
    #[must_use]
    pub fn attack_troops(&self, game: &Game) -> u64 {
        let Some(player) = game.player(self.owner) else {
            return 0;
        };
        let ratio = match self.attack_ratio {
            AttackRatio::Fixed(ratio) => ratio,
            AttackRatio::Live => player.attack_ratio(),
        };
        scale(player.troops(), ratio)
    }

    /// Order an attack on `target`: over land when bordering, by sea
    /// otherwise. Non-priority attacks are skipped when one against the
    /// same target is already running. Returns true if an order went out.
    pub fn send_attack(
        &mut self,
        game: &Game,
        scheduler: &mut Scheduler,
        target: Owner,
        is_priority: bool,
    ) -> bool {
        if let Owner::Player(other) = target {
            if game.is_friendly(self.owner, other) || !game.is_alive(other) {
                return false;
            }
        }
        let troops = self.attack_troops(game);
        if troops == 0 {
            return false;
        }
        let attacking = game
            .outgoing_attacks(self.owner)
            .iter()
            .any(|a| a.target == target);
        if attacking && !is_priority {
            return false;
        }
        if game.shares_border(self.owner, target) {
            debug!(player = %self.owner, ?target, troops, "AI land attack");
            scheduler.schedule(AttackExecution::new(self.owner, target, Some(troops)));
            return true;
        }
        let Owner::Player(other) = target else {
            return false;
        };
        let Some(shore) = landing_site(game, self.owner, other) else {
            return false;
        };
        debug!(player = %self.owner, target = %other, troops, "AI boat attack");
        scheduler.schedule(TransportShipExecution::new(self.owner, shore, Some(troops)));
        true
    }

    /// Make the strongest current attacker the enemy of record.
    pub fn check_incoming_attacks(&mut self, game: &Game, ticks: Tick) {
        let attacker = game
            .incoming_attacks(self.owner)
            .into_iter()
            .filter(|a| !game.is_friendly(self.owner, a.attacker))
            .max_by_key(|a| (a.troops, std::cmp::Reverse(a.id)))
            .map(|a| a.attacker);
        if let Some(attacker) = attacker {
            self.set_enemy(attacker, ticks);
        }
    }

    /// Drop an enemy that is dead, friendly, or quiet for too long, and
    /// let relations drift back toward neutral.
    pub fn forget_old_enemies(&mut self, game: &mut Game, ticks: Tick) {
        let memory = game.config().enemy_memory;
        if let Some(enemy) = self.enemy {
            if !game.is_alive(enemy)
                || game.is_friendly(self.owner, enemy)
                || ticks.saturating_sub(self.enemy_updated) > memory
            {
                debug!(player = %self.owner, %enemy, "Enemy forgotten");
                self.enemy = None;
            }
        }
        if let Some(player) = game.player_mut(self.owner) {
            player.decay_relations(RELATION_DECAY);
        }
    }

    /// Living, unfriendly players across a land border.
    fn hostile_neighbors(&self, game: &Game) -> Vec<PlayerId> {
        game.neighboring_owners(self.owner)
            .into_iter()
            .filter_map(Owner::player)
            .filter(|&p| game.is_alive(p) && !game.is_friendly(self.owner, p))
            .collect()
    }

    /// Keep the current enemy if it still borders us, otherwise pick the
    /// neighbour to fight: traitors first, then the worst relation, then
    /// the fewest troops.
    pub fn select_enemy(&mut self, game: &Game, ticks: Tick) -> Option<PlayerId> {
        let neighbors = self.hostile_neighbors(game);
        if let Some(enemy) = self.enemy.filter(|e| neighbors.contains(e)) {
            return Some(enemy);
        }
        let player = game.player(self.owner)?;
        let traitor_duration = game.config().traitor_duration;
        let enemy = neighbors.into_iter().min_by_key(|&p| {
            let other = game.player(p);
            (
                !other.is_some_and(|o| o.is_traitor(ticks, traitor_duration)),
                player.relation_score(p),
                other.map_or(0, |o| o.troops()),
                p,
            )
        })?;
        self.set_enemy(enemy, ticks);
        Some(enemy)
    }

    /// Any hostile neighbour, chosen at random.
    pub fn select_random_enemy(&mut self, game: &Game, ticks: Tick) -> Option<PlayerId> {
        let neighbors = self.hostile_neighbors(game);
        let &enemy = self.rng.choose(&neighbors)?;
        self.set_enemy(enemy, ticks);
        Some(enemy)
    }

    /// Answer every pending alliance request: yes to players we do not
    /// distrust and who are neither traitors nor attacking us.
    pub fn handle_alliance_requests(&self, game: &Game, scheduler: &mut Scheduler, ticks: Tick) {
        let Some(player) = game.player(self.owner) else {
            return;
        };
        let traitor_duration = game.config().traitor_duration;
        let attackers: Vec<PlayerId> = game
            .incoming_attacks(self.owner)
            .iter()
            .map(|a| a.attacker)
            .collect();
        for request in game.incoming_alliance_requests(self.owner) {
            let requestor = request.requestor;
            let accept = player.relation(requestor) >= Relation::Neutral
                && !attackers.contains(&requestor)
                && self.enemy != Some(requestor)
                && !game
                    .player(requestor)
                    .is_some_and(|p| p.is_traitor(ticks, traitor_duration));
            scheduler.schedule(AllianceReplyExecution::new(requestor, self.owner, accept));
        }
    }

    /// Join an ally's war: an ally's attacker or marked target that
    /// borders us becomes our enemy and gets attacked.
    pub fn assist_allies(&mut self, game: &Game, scheduler: &mut Scheduler, ticks: Tick) {
        let Some(player) = game.player(self.owner) else {
            return;
        };
        let neighbors = self.hostile_neighbors(game);
        for &ally in player.alliances().keys() {
            let marked = game
                .player(ally)
                .map(|a| a.targets().keys().copied().collect::<Vec<_>>())
                .unwrap_or_default();
            let attackers = game.incoming_attacks(ally).into_iter().map(|a| a.attacker);
            let foe = marked
                .into_iter()
                .chain(attackers)
                .find(|foe| neighbors.contains(foe));
            if let Some(foe) = foe {
                debug!(player = %self.owner, %ally, %foe, "Assisting ally");
                self.set_enemy(foe, ticks);
                self.send_attack(game, scheduler, Owner::Player(foe), false);
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use crate::map::GameMap;
    use crate::math::permille;
    use crate::player::{PlayerInfo, PlayerType};

    /// Three players in columns: a | b | c on an all-land map.
    fn columns() -> (Game, [PlayerId; 3]) {
        let mut game = Game::new(GameMap::new(9, 3), GameConfig::default(), 3);
        let ids = [PlayerId::new(0), PlayerId::new(1), PlayerId::new(2)];
        for (i, &id) in ids.iter().enumerate() {
            game.add_player(PlayerInfo::new(id, id.to_string(), PlayerType::Bot))
                .unwrap();
            for x in (i as i64 * 3)..(i as i64 * 3 + 3) {
                for y in 0..3 {
                    let tile = game.map().tile(x, y).unwrap();
                    game.conquer(id, tile);
                }
            }
        }
        (game, ids)
    }

    fn behavior(owner: PlayerId, ratio: AttackRatio) -> BotBehavior {
        BotBehavior::new(owner, ratio, PseudoRandom::new(1))
    }

    #[test]
    fn test_send_attack_uses_land_border() {
        let (game, [a, b, _]) = columns();
        let mut bot = behavior(a, AttackRatio::Fixed(permille(200)));
        let mut scheduler = Scheduler::new();
        assert!(bot.send_attack(&game, &mut scheduler, Owner::Player(b), false));
        assert_eq!(scheduler.pending_names(), vec!["AttackExecution"]);
        assert_eq!(bot.attack_troops(&game), 500);
    }

    #[test]
    fn test_live_ratio_follows_player_setting() {
        let (mut game, [a, ..]) = columns();
        let bot = behavior(a, AttackRatio::Live);
        game.player_mut(a).unwrap().set_attack_ratio(permille(500));
        assert_eq!(bot.attack_troops(&game), 1_250);
    }

    #[test]
    fn test_non_priority_attack_skips_running_target() {
        let (mut game, [a, b, _]) = columns();
        game.register_attack(a, Owner::Player(b), 100, None);
        let mut bot = behavior(a, AttackRatio::Fixed(permille(200)));
        let mut scheduler = Scheduler::new();
        assert!(!bot.send_attack(&game, &mut scheduler, Owner::Player(b), false));
        assert!(bot.send_attack(&game, &mut scheduler, Owner::Player(b), true));
    }

    #[test]
    fn test_no_attack_without_border_or_coast() {
        let (game, [a, _, c]) = columns();
        let mut bot = behavior(a, AttackRatio::Fixed(permille(200)));
        let mut scheduler = Scheduler::new();
        assert!(!bot.send_attack(&game, &mut scheduler, Owner::Player(c), true));
        assert!(scheduler.is_empty());
    }

    #[test]
    fn test_reach_needs_border_or_coast() {
        let (game, [a, b, c]) = columns();
        assert!(can_reach(&game, a, b));
        assert!(can_reach(&game, b, c));
        assert!(!can_reach(&game, a, c));
    }

    #[test]
    fn test_incoming_attacker_becomes_enemy_then_is_forgotten() {
        let (mut game, [a, b, _]) = columns();
        game.register_attack(b, Owner::Player(a), 300, None);
        let mut bot = behavior(a, AttackRatio::Live);
        bot.check_incoming_attacks(&game, 10);
        assert_eq!(bot.enemy(), Some(b));
        let memory = game.config().enemy_memory;
        bot.forget_old_enemies(&mut game, 10 + memory + 1);
        assert_eq!(bot.enemy(), None);
    }

    #[test]
    fn test_select_enemy_prefers_traitors() {
        let (mut game, [a, b, c]) = columns();
        // b borders both a and c; c betrayed someone
        let d = PlayerId::new(3);
        game.add_player(PlayerInfo::new(d, "d", PlayerType::Bot)).unwrap();
        assert!(game.create_alliance_request(c, d));
        assert!(game.accept_alliance_request(c, d));
        game.break_alliance(c, d);
        let mut bot = behavior(b, AttackRatio::Live);
        assert_eq!(bot.select_enemy(&game, 0), Some(c));
        game.player_mut(b).unwrap().update_relation(a, -80);
        // current enemy is kept while it still borders us
        assert_eq!(bot.select_enemy(&game, 1), Some(c));
    }

    #[test]
    fn test_alliance_requests_are_answered() {
        let (mut game, [a, b, c]) = columns();
        assert!(game.create_alliance_request(b, a));
        assert!(game.create_alliance_request(c, a));
        game.player_mut(a).unwrap().update_relation(c, -60);
        let bot = behavior(a, AttackRatio::Live);
        let mut scheduler = Scheduler::new();
        bot.handle_alliance_requests(&game, &mut scheduler, 0);
        for mut exec in scheduler.drain() {
            exec.init(&mut game, 0).unwrap();
            exec.tick(&mut game, 0, &mut Scheduler::new()).unwrap();
        }
        assert!(game.player(a).unwrap().is_allied_with(b));
        assert!(!game.player(a).unwrap().is_allied_with(c));
    }

    #[test]
    fn test_assist_allies_joins_the_war() {
        let (mut game, [a, b, c]) = columns();
        // a is allied with c; b attacks c and borders a
        assert!(game.create_alliance_request(a, c));
        assert!(game.accept_alliance_request(a, c));
        game.register_attack(b, Owner::Player(c), 100, None);
        let mut bot = behavior(a, AttackRatio::Fixed(permille(200)));
        let mut scheduler = Scheduler::new();
        bot.assist_allies(&game, &mut scheduler, 5);
        assert_eq!(bot.enemy(), Some(b));
        assert_eq!(scheduler.pending_names(), vec!["AttackExecution"]);
    }
}

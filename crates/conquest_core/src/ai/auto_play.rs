//! Auto-play: the nation AI playing on behalf of a human who opted in.
//!
//! Plays like a nation with fairness limits:
//!
//! - nothing happens for a random 50 to 100 ticks after it starts, unless
//!   the delay is skipped
//! - nukes are rarer than for nations
//! - opponents are picked by tier, bots first, then nations, then humans,
//!   and a chosen target is kept for a long commitment window
//! - attacks have their own cooldown independent of the decision cadence
//! - the troop share of each attack is read from the player's live
//!   attack ratio setting

use tracing::{debug, info};

use crate::error::Result;
use crate::execution::{Execution, Scheduler};
use crate::executions::{ensure_init, ConstructionExecution};
use crate::game::Game;
use crate::map::TileRef;
use crate::player::{Owner, PlayerId, PlayerType};
use crate::random::PseudoRandom;
use crate::Tick;

use super::behavior::{can_reach, AttackRatio, BotBehavior};
use super::nation::{invade_overseas, NATION_BUILDS};
use super::planner::{build_next, nuke_target, Cadence, RECENT_STRIKE_TICKS};

/// Bounds of the randomized start delay, in ticks.
const MIN_INITIAL_DELAY: i64 = 50;
const MAX_INITIAL_DELAY: i64 = 100;

/// Opponent tiers in the order they are considered.
const TARGET_TIERS: [PlayerType; 3] = [PlayerType::Bot, PlayerType::FakeHuman, PlayerType::Human];

#[derive(Debug)]
enum AutoPlayState {
    AwaitingOwner,
    Active(BotBehavior),
}

/// Assistive AI for one human player.
#[derive(Debug)]
pub struct AutoPlayExecution {
    owner: PlayerId,
    rng: PseudoRandom,
    initial_delay: Tick,
    started_at: Option<Tick>,
    cadence: Option<Cadence>,
    state: AutoPlayState,
    next_build: usize,
    committed: Option<(PlayerId, Tick)>,
    last_attack: Option<Tick>,
    recent_strikes: Vec<(TileRef, Tick)>,
    active: bool,
}

impl AutoPlayExecution {
    /// Auto-play for `owner`. With `skip_initial_delay` it acts on its
    /// first due decision instead of waiting out the start delay.
    #[must_use]
    pub fn new(owner: PlayerId, seed: u64, skip_initial_delay: bool) -> Self {
        let mut rng = PseudoRandom::new(seed);
        let initial_delay = if skip_initial_delay {
            0
        } else {
            rng.next_int(MIN_INITIAL_DELAY, MAX_INITIAL_DELAY + 1) as Tick
        };
        Self {
            owner,
            rng,
            initial_delay,
            started_at: None,
            cadence: None,
            state: AutoPlayState::AwaitingOwner,
            next_build: 0,
            committed: None,
            last_attack: None,
            recent_strikes: Vec::new(),
            active: true,
        }
    }

    /// Ticks of inactivity after init.
    #[must_use]
    pub const fn initial_delay_ticks(&self) -> Tick {
        self.initial_delay
    }

    /// The opponent currently committed to, if any.
    #[must_use]
    pub fn committed_target(&self) -> Option<PlayerId> {
        self.committed.map(|(target, _)| target)
    }

    /// Keep the committed target while it is valid and the commitment
    /// window is open, otherwise pick the weakest opponent of the lowest
    /// tier with a reachable player, preferring neighbours. A player we
    /// cannot attack by land or sea is not a target.
    fn priority_target(&mut self, game: &Game, ticks: Tick) -> Option<PlayerId> {
        let commitment = game.config().auto_play_commitment;
        let valid = |p: PlayerId| {
            p != self.owner
                && game.is_alive(p)
                && !game.is_friendly(self.owner, p)
                && game.player(p).is_some_and(|o| o.tile_count() > 0)
                && can_reach(game, self.owner, p)
        };
        if let Some((target, since)) = self.committed {
            if valid(target) && ticks.saturating_sub(since) < commitment {
                return Some(target);
            }
        }
        let target = TARGET_TIERS.iter().find_map(|&tier| {
            game.alive_players()
                .filter(|p| p.player_type() == tier && valid(p.id()))
                .min_by_key(|p| {
                    (
                        !game.shares_border(self.owner, Owner::Player(p.id())),
                        p.troops(),
                        p.tile_count(),
                        p.id(),
                    )
                })
                .map(|p| p.id())
        });
        match target {
            Some(target) => {
                if self.committed.map(|(t, _)| t) != Some(target) {
                    debug!(player = %self.owner, %target, "Auto-play commits to target");
                }
                self.committed = Some((target, ticks));
            }
            None => self.committed = None,
        }
        target
    }

    fn attack_ready(&self, game: &Game, ticks: Tick) -> bool {
        let cooldown = game.config().auto_play_attack_cooldown;
        self.last_attack
            .map_or(true, |last| ticks.saturating_sub(last) >= cooldown)
    }

    fn decide(&mut self, game: &mut Game, ticks: Tick, scheduler: &mut Scheduler) {
        let target = self.priority_target(game, ticks);
        let ready = self.attack_ready(game, ticks);
        let AutoPlayState::Active(behavior) = &mut self.state else {
            return;
        };
        behavior.handle_alliance_requests(game, scheduler, ticks);
        behavior.check_incoming_attacks(game, ticks);
        behavior.forget_old_enemies(game, ticks);

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
        if let Some(enemy) = target {
            if self.rng.chance(game.config().auto_play_nuke_odds) {
                if let Some((weapon, tile)) =
                    nuke_target(game, self.owner, enemy, &self.recent_strikes, ticks)
                {
                    debug!(player = %self.owner, %enemy, kind = weapon.name(), %tile, "Auto-play nukes");
                    scheduler.schedule(ConstructionExecution::new(self.owner, weapon, tile));
                    self.recent_strikes.push((tile, ticks));
                }
            }
        }

        if !ready {
            return;
        }
        let sent = if game.shares_border(self.owner, Owner::TerraNullius) {
            behavior.send_attack(game, scheduler, Owner::TerraNullius, false)
        } else if let Some(target) = target {
            let sent = behavior.send_attack(game, scheduler, Owner::Player(target), false);
            let running = game
                .outgoing_attacks(self.owner)
                .iter()
                .any(|a| a.target == Owner::Player(target));
            if !sent && !running {
                debug!(player = %self.owner, %target, "Auto-play drops unreachable target");
                self.committed = None;
            }
            sent
        } else {
            let troops = behavior.attack_troops(game);
            invade_overseas(game, self.owner, troops, &mut self.rng, scheduler);
            false
        };
        if sent {
            self.last_attack = Some(ticks);
        }
    }
}

impl Execution for AutoPlayExecution {
    fn init(&mut self, game: &mut Game, ticks: Tick) -> Result<()> {
        self.started_at = Some(ticks);
        self.cadence = Some(Cadence::with_period(
            &mut self.rng,
            game.config().auto_play_period,
        ));
        info!(player = %self.owner, delay = self.initial_delay, "Auto-play enabled");
        Ok(())
    }

    fn tick(&mut self, game: &mut Game, ticks: Tick, scheduler: &mut Scheduler) -> Result<()> {
        ensure_init(self.started_at.is_some(), self.name())?;
        let Some(player) = game.player(self.owner) else {
            return Ok(());
        };
        if !player.is_alive() || !player.auto_play() {
            debug!(player = %self.owner, "Auto-play stopped");
            self.active = false;
            return Ok(());
        }
        let started_at = self.started_at.unwrap_or(ticks);
        if ticks < started_at.saturating_add(self.initial_delay) {
            return Ok(());
        }
        if !player.has_spawned() || !self.cadence.is_some_and(|c| c.is_due(ticks)) {
            return Ok(());
        }
        if let AutoPlayState::AwaitingOwner = self.state {
            let rng = PseudoRandom::new(self.rng.next_u64());
            self.state = AutoPlayState::Active(BotBehavior::new(self.owner, AttackRatio::Live, rng));
        }
        self.decide(game, ticks, scheduler);
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn name(&self) -> &'static str {
        "AutoPlayExecution"
    }
}

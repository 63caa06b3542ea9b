//! The basic bot.
//!
//! Expands into unclaimed land while it can, then attacks its chosen
//! neighbour. Builds one port and keeps a couple of Vipers around it.

use tracing::debug;

use crate::error::Result;
use crate::execution::{Execution, Scheduler};
use crate::executions::ensure_init;
use crate::game::Game;
use crate::math::permille;
use crate::player::{Owner, PlayerId};
use crate::random::PseudoRandom;
use crate::unit::UnitType;
use crate::Tick;

use super::behavior::{AttackRatio, BotBehavior};
use super::planner::{build_next, BuildSlot, Cadence};

const BOT_BUILDS: [BuildSlot; 2] = [
    BuildSlot::Structure(UnitType::Port, 1),
    BuildSlot::Structure(UnitType::Viper, 2),
];

#[derive(Debug)]
enum BotState {
    AwaitingOwner,
    Active(BotBehavior),
}

/// A scripted bot player.
#[derive(Debug)]
pub struct BotExecution {
    owner: PlayerId,
    rng: PseudoRandom,
    cadence: Option<Cadence>,
    state: BotState,
    active: bool,
}

impl BotExecution {
    /// Bot for `owner`, deterministic for a given `seed`.
    #[must_use]
    pub fn new(owner: PlayerId, seed: u64) -> Self {
        Self {
            owner,
            rng: PseudoRandom::new(seed),
            cadence: None,
            state: BotState::AwaitingOwner,
            active: true,
        }
    }

    /// Returns true once the bot's player has spawned and it started playing.
    #[must_use]
    pub const fn is_playing(&self) -> bool {
        matches!(self.state, BotState::Active(_))
    }

    fn decide(&mut self, game: &mut Game, ticks: Tick, scheduler: &mut Scheduler) {
        let BotState::Active(behavior) = &mut self.state else {
            return;
        };
        behavior.handle_alliance_requests(game, scheduler, ticks);
        behavior.check_incoming_attacks(game, ticks);
        behavior.forget_old_enemies(game, ticks);

        build_next(game, self.owner, &BOT_BUILDS, 0, &mut self.rng, scheduler);

        if game.shares_border(self.owner, Owner::TerraNullius) {
            behavior.send_attack(game, scheduler, Owner::TerraNullius, false);
            return;
        }
        if let Some(enemy) = behavior.select_enemy(game, ticks) {
            behavior.send_attack(game, scheduler, Owner::Player(enemy), false);
        }
    }
}

impl Execution for BotExecution {
    fn init(&mut self, game: &mut Game, _ticks: Tick) -> Result<()> {
        let config = game.config();
        self.cadence = Some(Cadence::random(
            &mut self.rng,
            config.bot_min_period,
            config.bot_max_period,
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
            debug!(player = %self.owner, "Bot retired");
            self.active = false;
            return Ok(());
        }
        if !player.has_spawned() {
            return Ok(());
        }
        if let BotState::AwaitingOwner = self.state {
            let ratio = permille(self.rng.next_int(150, 301) as u32);
            let rng = PseudoRandom::new(self.rng.next_u64());
            self.state = BotState::Active(BotBehavior::new(
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
        "BotExecution"
    }
}

//! Alliances, embargoes and target marks.
//!
//! Each action is a one-tick execution so humans, AIs and replays go
//! through the same path.

use tracing::debug;

use crate::error::Result;
use crate::execution::{Execution, Scheduler};
use crate::game::{Game, MessageType};
use crate::player::PlayerId;
use crate::Tick;

use super::ensure_init;

/// Ask another player for an alliance. A crossing request from the other
/// side is accepted on the spot.
#[derive(Debug)]
pub struct AllianceRequestExecution {
    requestor: PlayerId,
    recipient: PlayerId,
    initialized: bool,
    active: bool,
}

impl AllianceRequestExecution {
    /// `requestor` asks `recipient`.
    #[must_use]
    pub fn new(requestor: PlayerId, recipient: PlayerId) -> Self {
        Self {
            requestor,
            recipient,
            initialized: false,
            active: true,
        }
    }
}

impl Execution for AllianceRequestExecution {
    fn init(&mut self, _game: &mut Game, _ticks: Tick) -> Result<()> {
        self.initialized = true;
        Ok(())
    }

    fn tick(&mut self, game: &mut Game, _ticks: Tick, _scheduler: &mut Scheduler) -> Result<()> {
        ensure_init(self.initialized, self.name())?;
        self.active = false;
        if !game.is_alive(self.requestor) {
            return Ok(());
        }
        let crossing = game
            .incoming_alliance_requests(self.requestor)
            .iter()
            .any(|r| r.requestor == self.recipient);
        if crossing {
            game.accept_alliance_request(self.recipient, self.requestor);
            return Ok(());
        }
        if game.create_alliance_request(self.requestor, self.recipient) {
            game.display_message(
                format!("{} requests an alliance", self.requestor),
                MessageType::Info,
                Some(self.recipient),
            );
        }
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn name(&self) -> &'static str {
        "AllianceRequestExecution"
    }
}

/// Answer a pending alliance request.
#[derive(Debug)]
pub struct AllianceReplyExecution {
    requestor: PlayerId,
    recipient: PlayerId,
    accept: bool,
    initialized: bool,
    active: bool,
}

impl AllianceReplyExecution {
    /// `recipient` answers the request made by `requestor`.
    #[must_use]
    pub fn new(requestor: PlayerId, recipient: PlayerId, accept: bool) -> Self {
        Self {
            requestor,
            recipient,
            accept,
            initialized: false,
            active: true,
        }
    }
}

impl Execution for AllianceReplyExecution {
    fn init(&mut self, _game: &mut Game, _ticks: Tick) -> Result<()> {
        self.initialized = true;
        Ok(())
    }

    fn tick(&mut self, game: &mut Game, _ticks: Tick, _scheduler: &mut Scheduler) -> Result<()> {
        ensure_init(self.initialized, self.name())?;
        self.active = false;
        let answered = if self.accept {
            game.is_alive(self.requestor)
                && game.is_alive(self.recipient)
                && game.accept_alliance_request(self.requestor, self.recipient)
        } else {
            game.reject_alliance_request(self.requestor, self.recipient)
        };
        if !answered {
            debug!(from = %self.requestor, to = %self.recipient, "No pending alliance request");
        }
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn name(&self) -> &'static str {
        "AllianceReplyExecution"
    }
}

/// Leave an alliance. The breaker is marked traitor.
#[derive(Debug)]
pub struct BreakAllianceExecution {
    breaker: PlayerId,
    other: PlayerId,
    initialized: bool,
    active: bool,
}

impl BreakAllianceExecution {
    /// `breaker` leaves its alliance with `other`.
    #[must_use]
    pub fn new(breaker: PlayerId, other: PlayerId) -> Self {
        Self {
            breaker,
            other,
            initialized: false,
            active: true,
        }
    }
}

impl Execution for BreakAllianceExecution {
    fn init(&mut self, _game: &mut Game, _ticks: Tick) -> Result<()> {
        self.initialized = true;
        Ok(())
    }

    fn tick(&mut self, game: &mut Game, _ticks: Tick, _scheduler: &mut Scheduler) -> Result<()> {
        ensure_init(self.initialized, self.name())?;
        self.active = false;
        if game.is_alive(self.breaker) {
            game.break_alliance(self.breaker, self.other);
        }
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn name(&self) -> &'static str {
        "BreakAllianceExecution"
    }
}

/// Start or stop trading with a player.
#[derive(Debug)]
pub struct EmbargoExecution {
    player: PlayerId,
    target: PlayerId,
    start: bool,
    initialized: bool,
    active: bool,
}

impl EmbargoExecution {
    /// `start = true` embargoes `target`, `false` lifts the embargo.
    #[must_use]
    pub fn new(player: PlayerId, target: PlayerId, start: bool) -> Self {
        Self {
            player,
            target,
            start,
            initialized: false,
            active: true,
        }
    }
}

impl Execution for EmbargoExecution {
    fn init(&mut self, _game: &mut Game, _ticks: Tick) -> Result<()> {
        self.initialized = true;
        Ok(())
    }

    fn tick(&mut self, game: &mut Game, _ticks: Tick, _scheduler: &mut Scheduler) -> Result<()> {
        ensure_init(self.initialized, self.name())?;
        self.active = false;
        if self.player == self.target || game.player(self.target).is_none() {
            return Ok(());
        }
        let Some(player) = game.player_mut(self.player).filter(|p| p.is_alive()) else {
            return Ok(());
        };
        if self.start {
            player.add_embargo(self.target);
        } else {
            player.stop_embargo(self.target);
        }
        debug!(player = %self.player, target = %self.target, start = self.start, "Embargo updated");
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn name(&self) -> &'static str {
        "EmbargoExecution"
    }
}

/// Mark a player as a target and tell allies about it.
#[derive(Debug)]
pub struct TargetPlayerExecution {
    player: PlayerId,
    target: PlayerId,
    initialized: bool,
    active: bool,
}

impl TargetPlayerExecution {
    /// `player` marks `target`.
    #[must_use]
    pub fn new(player: PlayerId, target: PlayerId) -> Self {
        Self {
            player,
            target,
            initialized: false,
            active: true,
        }
    }
}

impl Execution for TargetPlayerExecution {
    fn init(&mut self, _game: &mut Game, _ticks: Tick) -> Result<()> {
        self.initialized = true;
        Ok(())
    }

    fn tick(&mut self, game: &mut Game, ticks: Tick, _scheduler: &mut Scheduler) -> Result<()> {
        ensure_init(self.initialized, self.name())?;
        self.active = false;
        if self.player == self.target || !game.is_alive(self.target) {
            return Ok(());
        }
        let Some(player) = game.player_mut(self.player).filter(|p| p.is_alive()) else {
            return Ok(());
        };
        player.target(self.target, ticks);
        let allies: Vec<PlayerId> = player.alliances().keys().copied().collect();
        for ally in allies {
            game.display_message(
                format!("{} requests you attack {}", self.player, self.target),
                MessageType::Info,
                Some(ally),
            );
        }
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn name(&self) -> &'static str {
        "TargetPlayerExecution"
    }
}

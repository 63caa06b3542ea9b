//! Direct player-to-player chat with flood protection.

use tracing::debug;

use crate::error::Result;
use crate::execution::{Execution, Scheduler};
use crate::game::Game;
use crate::player::PlayerId;
use crate::Tick;

use super::ensure_init;

/// Longest chat message kept, in characters.
pub const MAX_CHAT_LENGTH: usize = 200;

/// Send one chat message.
#[derive(Debug)]
pub struct DirectChatExecution {
    sender: PlayerId,
    recipient: PlayerId,
    text: String,
    initialized: bool,
    active: bool,
}

impl DirectChatExecution {
    /// `sender` says `text` to `recipient`.
    #[must_use]
    pub fn new(sender: PlayerId, recipient: PlayerId, text: impl Into<String>) -> Self {
        Self {
            sender,
            recipient,
            text: text.into(),
            initialized: false,
            active: true,
        }
    }
}

impl Execution for DirectChatExecution {
    fn init(&mut self, _game: &mut Game, _ticks: Tick) -> Result<()> {
        self.initialized = true;
        Ok(())
    }

    fn tick(&mut self, game: &mut Game, ticks: Tick, _scheduler: &mut Scheduler) -> Result<()> {
        ensure_init(self.initialized, self.name())?;
        self.active = false;
        if self.sender == self.recipient
            || game.player(self.sender).is_none()
            || game.player(self.recipient).is_none()
        {
            return Ok(());
        }
        let (window, limit) = (game.config().chat_flood_window, game.config().chat_flood_limit);
        if !game.chat_moderator_mut().allow(self.sender, ticks, window, limit) {
            debug!(player = %self.sender, "Chat flood, message dropped");
            return Ok(());
        }
        let text: String = self.text.trim().chars().take(MAX_CHAT_LENGTH).collect();
        if text.is_empty() {
            return Ok(());
        }
        game.display_chat(self.sender, self.recipient, text);
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn active_during_spawn_phase(&self) -> bool {
        true
    }

    fn name(&self) -> &'static str {
        "DirectChatExecution"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use crate::game::MessageType;
    use crate::map::GameMap;
    use crate::player::{PlayerInfo, PlayerType};

    fn game() -> (Game, PlayerId, PlayerId) {
        let mut game = Game::new(GameMap::new(4, 4), GameConfig::default(), 1);
        let (a, b) = (PlayerId::new(0), PlayerId::new(1));
        for id in [a, b] {
            game.add_player(PlayerInfo::new(id, id.to_string(), PlayerType::Human))
                .unwrap();
        }
        (game, a, b)
    }

    fn say(game: &mut Game, from: PlayerId, to: PlayerId, text: &str, ticks: Tick) {
        let mut exec = DirectChatExecution::new(from, to, text);
        exec.init(game, ticks).unwrap();
        exec.tick(game, ticks, &mut Scheduler::new()).unwrap();
    }

    #[test]
    fn test_flood_limit_drops_extra_messages() {
        let (mut game, a, b) = game();
        for _ in 0..5 {
            say(&mut game, a, b, "hello", 0);
        }
        let chats = game.drain_messages();
        assert_eq!(chats.len(), 3);
        assert!(chats.iter().all(|m| m.message_type == MessageType::Chat && m.sender == Some(a)));

        say(&mut game, a, b, "later", 50);
        assert_eq!(game.drain_messages().len(), 1);
    }

    #[test]
    fn test_long_messages_are_truncated() {
        let (mut game, a, b) = game();
        say(&mut game, a, b, &"x".repeat(500), 0);
        let chats = game.drain_messages();
        assert_eq!(chats[0].text.len(), MAX_CHAT_LENGTH);
    }
}

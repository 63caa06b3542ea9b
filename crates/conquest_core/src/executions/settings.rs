//! Player settings changed from the UI.

use tracing::info;

use crate::ai::AutoPlayExecution;
use crate::error::Result;
use crate::execution::{Execution, Scheduler};
use crate::game::Game;
use crate::math::permille;
use crate::player::PlayerId;
use crate::random::mix_seed;
use crate::Tick;

use super::ensure_init;

/// Set the share of population growth that becomes troops.
#[derive(Debug)]
pub struct SetTroopRatioExecution {
    player: PlayerId,
    ratio_permille: u32,
    initialized: bool,
    active: bool,
}

impl SetTroopRatioExecution {
    /// Ratio in per-mille, clamped to `0..=1000`.
    #[must_use]
    pub fn new(player: PlayerId, ratio_permille: u32) -> Self {
        Self {
            player,
            ratio_permille: ratio_permille.min(1000),
            initialized: false,
            active: true,
        }
    }
}

impl Execution for SetTroopRatioExecution {
    fn init(&mut self, _game: &mut Game, _ticks: Tick) -> Result<()> {
        self.initialized = true;
        Ok(())
    }

    fn tick(&mut self, game: &mut Game, _ticks: Tick, _scheduler: &mut Scheduler) -> Result<()> {
        ensure_init(self.initialized, self.name())?;
        self.active = false;
        if let Some(player) = game.player_mut(self.player) {
            player.set_target_troop_ratio(permille(self.ratio_permille));
        }
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn active_during_spawn_phase(&self) -> bool {
        true
    }

    fn name(&self) -> &'static str {
        "SetTroopRatioExecution"
    }
}

/// Set the share of troops committed per attack.
#[derive(Debug)]
pub struct SetAttackRatioExecution {
    player: PlayerId,
    ratio_permille: u32,
    initialized: bool,
    active: bool,
}

impl SetAttackRatioExecution {
    /// Ratio in per-mille, clamped to `0..=1000`.
    #[must_use]
    pub fn new(player: PlayerId, ratio_permille: u32) -> Self {
        Self {
            player,
            ratio_permille: ratio_permille.min(1000),
            initialized: false,
            active: true,
        }
    }
}

impl Execution for SetAttackRatioExecution {
    fn init(&mut self, _game: &mut Game, _ticks: Tick) -> Result<()> {
        self.initialized = true;
        Ok(())
    }

    fn tick(&mut self, game: &mut Game, _ticks: Tick, _scheduler: &mut Scheduler) -> Result<()> {
        ensure_init(self.initialized, self.name())?;
        self.active = false;
        if let Some(player) = game.player_mut(self.player) {
            player.set_attack_ratio(permille(self.ratio_permille));
        }
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn active_during_spawn_phase(&self) -> bool {
        true
    }

    fn name(&self) -> &'static str {
        "SetAttackRatioExecution"
    }
}

/// Hand a human player's seat to the auto-play AI, or take it back.
#[derive(Debug)]
pub struct ToggleAutoPlayExecution {
    player: PlayerId,
    enabled: bool,
    initialized: bool,
    active: bool,
}

impl ToggleAutoPlayExecution {
    /// Turn auto-play on or off for `player`.
    #[must_use]
    pub fn new(player: PlayerId, enabled: bool) -> Self {
        Self {
            player,
            enabled,
            initialized: false,
            active: true,
        }
    }
}

impl Execution for ToggleAutoPlayExecution {
    fn init(&mut self, _game: &mut Game, _ticks: Tick) -> Result<()> {
        self.initialized = true;
        Ok(())
    }

    fn tick(&mut self, game: &mut Game, ticks: Tick, scheduler: &mut Scheduler) -> Result<()> {
        ensure_init(self.initialized, self.name())?;
        self.active = false;
        let seed = game.seed();
        let Some(player) = game.player_mut(self.player).filter(|p| p.is_alive()) else {
            return Ok(());
        };
        if player.auto_play() == self.enabled {
            return Ok(());
        }
        player.set_auto_play(self.enabled);
        info!(player = %self.player, enabled = self.enabled, "Auto-play toggled");
        if self.enabled {
            // the running AI notices the flag going off and stops by itself
            let seed = mix_seed(&[seed, u64::from(self.player.as_u16()), ticks]);
            scheduler.schedule(AutoPlayExecution::new(self.player, seed, false));
        }
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn name(&self) -> &'static str {
        "ToggleAutoPlayExecution"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use crate::map::GameMap;
    use crate::math::to_permille;
    use crate::player::{PlayerInfo, PlayerType};

    fn game() -> (Game, PlayerId) {
        let mut game = Game::new(GameMap::new(4, 4), GameConfig::default(), 1);
        let id = PlayerId::new(0);
        game.add_player(PlayerInfo::new(id, "p0", PlayerType::Human))
            .unwrap();
        (game, id)
    }

    fn run_once(exec: &mut dyn Execution, game: &mut Game, scheduler: &mut Scheduler) {
        exec.init(game, 0).unwrap();
        exec.tick(game, 0, scheduler).unwrap();
    }

    #[test]
    fn test_ratios_are_clamped() {
        let (mut game, id) = game();
        let mut scheduler = Scheduler::new();
        run_once(&mut SetTroopRatioExecution::new(id, 400), &mut game, &mut scheduler);
        run_once(&mut SetAttackRatioExecution::new(id, 5_000), &mut game, &mut scheduler);
        let player = game.player(id).unwrap();
        assert_eq!(to_permille(player.target_troop_ratio()), 400);
        assert_eq!(to_permille(player.attack_ratio()), 1000);
    }

    #[test]
    fn test_enabling_auto_play_starts_the_ai_once() {
        let (mut game, id) = game();
        let mut scheduler = Scheduler::new();
        run_once(&mut ToggleAutoPlayExecution::new(id, true), &mut game, &mut scheduler);
        run_once(&mut ToggleAutoPlayExecution::new(id, true), &mut game, &mut scheduler);
        assert!(game.player(id).unwrap().auto_play());
        assert_eq!(scheduler.pending_names(), vec!["AutoPlayExecution"]);

        run_once(&mut ToggleAutoPlayExecution::new(id, false), &mut game, &mut scheduler);
        assert!(!game.player(id).unwrap().auto_play());
        assert_eq!(scheduler.len(), 1);
    }
}

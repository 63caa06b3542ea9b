//! Concrete executions.
//!
//! Every player action and every live unit is driven by one of these.
//! Human intents, the replay system and the AI tiers all create the same
//! executions, so a bot attack and a human attack follow identical rules.

mod attack;
mod chat;
mod construction;
mod diplomacy;
mod mirv;
mod move_warships;
pub mod navigation;
mod nuke;
mod orbital;
mod player;
mod port;
mod projectile;
mod sam;
mod settings;
mod spawn;
mod structures;
mod trade_ship;
mod transport_ship;
mod warship;

pub use attack::AttackExecution;
pub use chat::DirectChatExecution;
pub use construction::ConstructionExecution;
pub use diplomacy::{
    AllianceReplyExecution, AllianceRequestExecution, BreakAllianceExecution, EmbargoExecution,
    TargetPlayerExecution,
};
pub use mirv::MirvExecution;
pub use move_warships::MoveWarshipsExecution;
pub use nuke::NukeExecution;
pub use orbital::OrbitalCannonExecution;
pub use player::PlayerExecution;
pub use port::PortExecution;
pub use projectile::{MissileExecution, MissilePayload, ShellExecution};
pub use sam::SamLauncherExecution;
pub use settings::{SetAttackRatioExecution, SetTroopRatioExecution, ToggleAutoPlayExecution};
pub use spawn::SpawnExecution;
pub use structures::StructureExecution;
pub use trade_ship::TradeShipExecution;
pub use transport_ship::TransportShipExecution;
pub use warship::WarshipExecution;

use crate::error::{GameError, Result};

/// `Err(NotInitialized)` unless `initialized`.
pub(crate) fn ensure_init(initialized: bool, name: &'static str) -> Result<()> {
    if initialized {
        Ok(())
    } else {
        Err(GameError::NotInitialized(name))
    }
}

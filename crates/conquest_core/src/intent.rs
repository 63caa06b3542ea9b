//! Player intents.
//!
//! An intent is what a client sends: one player action, stamped with the
//! player who issued it. The engine turns every intent into an execution
//! through [`StampedIntent::into_execution`], the same way for live play
//! and for replays.

use serde::{Deserialize, Serialize};

use crate::execution::Execution;
use crate::executions::{
    AllianceReplyExecution, AllianceRequestExecution, AttackExecution, BreakAllianceExecution,
    ConstructionExecution, DirectChatExecution, EmbargoExecution, MoveWarshipsExecution,
    SetAttackRatioExecution, SetTroopRatioExecution, SpawnExecution, TargetPlayerExecution,
    ToggleAutoPlayExecution, TransportShipExecution,
};
use crate::map::TileRef;
use crate::player::{Owner, PlayerId};
use crate::unit::{UnitId, UnitType};

/// A player action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Intent {
    /// Pick (or move) the spawn tile during the spawn phase.
    Spawn {
        /// Centre of the claimed area.
        tile: TileRef,
    },
    /// Land attack on a neighbour or on unclaimed land.
    Attack {
        /// Who to attack.
        target: Owner,
        /// Troops to commit; the attack ratio share when `None`.
        troops: Option<u64>,
    },
    /// Naval invasion of a coastal tile.
    BoatAttack {
        /// Landing tile.
        dst: TileRef,
        /// Troops to ship; the attack ratio share when `None`.
        troops: Option<u64>,
    },
    /// Build a structure, warship or nuke. For nukes `tile` is the target.
    BuildUnit {
        /// What to build.
        unit_type: UnitType,
        /// Where to build it.
        tile: TileRef,
    },
    /// Send a group of warships somewhere.
    MoveWarships {
        /// Warships to move.
        units: Vec<UnitId>,
        /// Ocean destination.
        dst: TileRef,
    },
    /// Ask for an alliance.
    AllianceRequest {
        /// Who is asked.
        recipient: PlayerId,
    },
    /// Answer an alliance request.
    AllianceReply {
        /// Who asked.
        requestor: PlayerId,
        /// Accept or reject.
        accept: bool,
    },
    /// Break an alliance.
    BreakAlliance {
        /// The former ally.
        other: PlayerId,
    },
    /// Start or stop an embargo.
    Embargo {
        /// Embargoed player.
        target: PlayerId,
        /// `false` lifts the embargo.
        start: bool,
    },
    /// Mark a player as a target for allies.
    TargetPlayer {
        /// The marked player.
        target: PlayerId,
    },
    /// Private message.
    DirectChat {
        /// Addressee.
        recipient: PlayerId,
        /// Message text.
        text: String,
    },
    /// Target troop share of the population, per mille.
    SetTroopRatio {
        /// Ratio in per mille.
        permille: u32,
    },
    /// Share of troops committed per attack, per mille.
    SetAttackRatio {
        /// Ratio in per mille.
        permille: u32,
    },
    /// Turn auto-play on or off.
    ToggleAutoPlay {
        /// New state.
        enabled: bool,
    },
}

impl Intent {
    /// Short name for logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Spawn { .. } => "spawn",
            Self::Attack { .. } => "attack",
            Self::BoatAttack { .. } => "boat_attack",
            Self::BuildUnit { .. } => "build_unit",
            Self::MoveWarships { .. } => "move_warships",
            Self::AllianceRequest { .. } => "alliance_request",
            Self::AllianceReply { .. } => "alliance_reply",
            Self::BreakAlliance { .. } => "break_alliance",
            Self::Embargo { .. } => "embargo",
            Self::TargetPlayer { .. } => "target_player",
            Self::DirectChat { .. } => "direct_chat",
            Self::SetTroopRatio { .. } => "set_troop_ratio",
            Self::SetAttackRatio { .. } => "set_attack_ratio",
            Self::ToggleAutoPlay { .. } => "toggle_auto_play",
        }
    }
}

/// An intent together with the player who issued it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StampedIntent {
    /// Issuing player.
    pub player: PlayerId,
    /// The action.
    pub intent: Intent,
}

impl StampedIntent {
    /// Stamp `intent` with `player`.
    #[must_use]
    pub const fn new(player: PlayerId, intent: Intent) -> Self {
        Self { player, intent }
    }

    /// The execution carrying out this intent.
    #[must_use]
    pub fn into_execution(self) -> Box<dyn Execution> {
        let player = self.player;
        match self.intent {
            Intent::Spawn { tile } => Box::new(SpawnExecution::new(player, tile)),
            Intent::Attack { target, troops } => {
                Box::new(AttackExecution::new(player, target, troops))
            }
            Intent::BoatAttack { dst, troops } => {
                Box::new(TransportShipExecution::new(player, dst, troops))
            }
            Intent::BuildUnit { unit_type, tile } => {
                Box::new(ConstructionExecution::new(player, unit_type, tile))
            }
            Intent::MoveWarships { units, dst } => {
                Box::new(MoveWarshipsExecution::new(player, units, dst))
            }
            Intent::AllianceRequest { recipient } => {
                Box::new(AllianceRequestExecution::new(player, recipient))
            }
            Intent::AllianceReply { requestor, accept } => {
                Box::new(AllianceReplyExecution::new(requestor, player, accept))
            }
            Intent::BreakAlliance { other } => Box::new(BreakAllianceExecution::new(player, other)),
            Intent::Embargo { target, start } => {
                Box::new(EmbargoExecution::new(player, target, start))
            }
            Intent::TargetPlayer { target } => {
                Box::new(TargetPlayerExecution::new(player, target))
            }
            Intent::DirectChat { recipient, text } => {
                Box::new(DirectChatExecution::new(player, recipient, text))
            }
            Intent::SetTroopRatio { permille } => {
                Box::new(SetTroopRatioExecution::new(player, permille))
            }
            Intent::SetAttackRatio { permille } => {
                Box::new(SetAttackRatioExecution::new(player, permille))
            }
            Intent::ToggleAutoPlay { enabled } => {
                Box::new(ToggleAutoPlayExecution::new(player, enabled))
            }
        }
    }
}

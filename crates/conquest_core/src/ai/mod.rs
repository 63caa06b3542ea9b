//! AI players.
//!
//! Three tiers share one shape: a seeded cadence gate, a liveness check,
//! lazy [`BotBehavior`] construction once the player has spawned, then a
//! decision tree. AI executions never touch units directly; they schedule
//! the same executions a human intent produces.
//!
//! - [`BotExecution`] - expands, attacks the weakest neighbour, keeps a
//!   couple of escorts
//! - [`FakeHumanExecution`] - the nation AI: build rotation, fleet ratio,
//!   nuke targeting, naval invasions
//! - [`AutoPlayExecution`] - plays for a human who opted in, with
//!   fairness limits

mod auto_play;
mod behavior;
mod bot;
mod nation;
mod planner;

pub use auto_play::AutoPlayExecution;
pub use behavior::{AttackRatio, BotBehavior};
pub use bot::BotExecution;
pub use nation::FakeHumanExecution;
pub use planner::Cadence;

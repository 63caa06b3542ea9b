//! Player state: economy, territory and diplomacy.
//!
//! Players are owned by [`crate::game::Game`]. Territory changes go
//! through the game (it keeps the tile owner index and border sets in
//! sync); everything else is mutated here.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::map::TileRef;
use crate::math::{fixed_serde, permille, Fixed};
use crate::Tick;

/// Unique identifier for players.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PlayerId(u16);

impl PlayerId {
    /// Wrap a raw id.
    #[must_use]
    pub const fn new(raw: u16) -> Self {
        Self(raw)
    }

    /// Raw numeric value.
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self.0
    }
}

impl std::fmt::Display for PlayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "P{}", self.0)
    }
}

/// Who controls a player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PlayerType {
    /// Connected human (optionally assisted by auto-play).
    Human,
    /// Simple scripted opponent.
    Bot,
    /// Nation AI opponent.
    FakeHuman,
}

/// Owner of a tile: a player or unclaimed land.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Owner {
    /// Unclaimed territory.
    TerraNullius,
    /// A player.
    Player(PlayerId),
}

impl Owner {
    /// The player id, if owned by a player.
    #[must_use]
    pub const fn player(self) -> Option<PlayerId> {
        match self {
            Self::TerraNullius => None,
            Self::Player(id) => Some(id),
        }
    }

    /// Returns true for unclaimed land.
    #[must_use]
    pub const fn is_terra_nullius(self) -> bool {
        matches!(self, Self::TerraNullius)
    }
}

impl From<PlayerId> for Owner {
    fn from(id: PlayerId) -> Self {
        Self::Player(id)
    }
}

/// Static identity of a player slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlayerInfo {
    /// Player id.
    pub id: PlayerId,
    /// Display name.
    pub name: String,
    /// Controller kind.
    pub player_type: PlayerType,
    /// Team, if playing a team game.
    pub team: Option<u8>,
}

impl PlayerInfo {
    /// Slot without a team.
    #[must_use]
    pub fn new(id: PlayerId, name: impl Into<String>, player_type: PlayerType) -> Self {
        Self {
            id,
            name: name.into(),
            player_type,
            team: None,
        }
    }

    /// Builder-style team assignment.
    #[must_use]
    pub fn with_team(mut self, team: u8) -> Self {
        self.team = Some(team);
        self
    }
}

/// Coarse attitude of one player toward another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Relation {
    /// Actively hostile.
    Hostile,
    /// Recently wronged.
    Distrustful,
    /// Default.
    Neutral,
    /// Good standing.
    Friendly,
}

/// Relation scores are clamped to this magnitude.
pub const MAX_RELATION: i32 = 100;

impl Relation {
    /// Bucket a relation score.
    #[must_use]
    pub const fn from_score(score: i32) -> Self {
        if score <= -50 {
            Self::Hostile
        } else if score < 0 {
            Self::Distrustful
        } else if score < 50 {
            Self::Neutral
        } else {
            Self::Friendly
        }
    }
}

/// A participant in the game.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Player {
    info: PlayerInfo,
    alive: bool,
    spawned: bool,
    gold: u64,
    troops: u64,
    workers: u64,
    #[serde(with = "fixed_serde")]
    target_troop_ratio: Fixed,
    #[serde(with = "fixed_serde")]
    attack_ratio: Fixed,
    tiles: BTreeSet<TileRef>,
    border: BTreeSet<TileRef>,
    alliances: BTreeMap<PlayerId, Tick>,
    embargoes: BTreeSet<PlayerId>,
    traitor_since: Option<Tick>,
    relations: BTreeMap<PlayerId, i32>,
    last_alliance_request: BTreeMap<PlayerId, Tick>,
    targets: BTreeMap<PlayerId, Tick>,
    auto_play: bool,
}

impl Player {
    /// Create a player that has not spawned yet.
    #[must_use]
    pub fn new(info: PlayerInfo, gold: u64, troops: u64) -> Self {
        Self {
            info,
            alive: true,
            spawned: false,
            gold,
            troops,
            workers: 0,
            target_troop_ratio: permille(950),
            attack_ratio: permille(200),
            tiles: BTreeSet::new(),
            border: BTreeSet::new(),
            alliances: BTreeMap::new(),
            embargoes: BTreeSet::new(),
            traitor_since: None,
            relations: BTreeMap::new(),
            last_alliance_request: BTreeMap::new(),
            targets: BTreeMap::new(),
            auto_play: false,
        }
    }

    /// Player id.
    #[must_use]
    pub const fn id(&self) -> PlayerId {
        self.info.id
    }

    /// Static identity.
    #[must_use]
    pub const fn info(&self) -> &PlayerInfo {
        &self.info
    }

    /// Display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.info.name
    }

    /// Controller kind.
    #[must_use]
    pub const fn player_type(&self) -> PlayerType {
        self.info.player_type
    }

    /// Team, if any.
    #[must_use]
    pub const fn team(&self) -> Option<u8> {
        self.info.team
    }

    /// Returns true if both players share a team.
    #[must_use]
    pub fn is_on_same_team(&self, other: &Self) -> bool {
        self.info.team.is_some() && self.info.team == other.info.team
    }

    /// False once eliminated.
    #[must_use]
    pub const fn is_alive(&self) -> bool {
        self.alive
    }

    pub(crate) fn set_alive(&mut self, alive: bool) {
        self.alive = alive;
    }

    /// Whether the player has picked a spawn tile.
    #[must_use]
    pub const fn has_spawned(&self) -> bool {
        self.spawned
    }

    pub(crate) fn mark_spawned(&mut self) {
        self.spawned = true;
    }

    // Economy

    /// Gold balance.
    #[must_use]
    pub const fn gold(&self) -> u64 {
        self.gold
    }

    /// Credit gold.
    pub fn add_gold(&mut self, amount: u64) {
        self.gold = self.gold.saturating_add(amount);
    }

    /// Debit gold, saturating at zero. Returns the amount actually removed.
    pub fn remove_gold(&mut self, amount: u64) -> u64 {
        let removed = amount.min(self.gold);
        self.gold -= removed;
        removed
    }

    /// Troop count.
    #[must_use]
    pub const fn troops(&self) -> u64 {
        self.troops
    }

    /// Add troops.
    pub fn add_troops(&mut self, amount: u64) {
        self.troops = self.troops.saturating_add(amount);
    }

    /// Remove troops, saturating at zero. Returns the amount actually removed.
    pub fn remove_troops(&mut self, amount: u64) -> u64 {
        let removed = amount.min(self.troops);
        self.troops -= removed;
        removed
    }

    /// Worker count.
    #[must_use]
    pub const fn workers(&self) -> u64 {
        self.workers
    }

    /// Add workers.
    pub fn add_workers(&mut self, amount: u64) {
        self.workers = self.workers.saturating_add(amount);
    }

    /// Share of population growth that becomes troops.
    #[must_use]
    pub const fn target_troop_ratio(&self) -> Fixed {
        self.target_troop_ratio
    }

    /// Set the troop share, clamped to `[0, 1]`.
    pub fn set_target_troop_ratio(&mut self, ratio: Fixed) {
        self.target_troop_ratio = ratio.clamp(Fixed::ZERO, Fixed::ONE);
    }

    /// Share of troops committed per attack (live UI setting).
    #[must_use]
    pub const fn attack_ratio(&self) -> Fixed {
        self.attack_ratio
    }

    /// Set the attack share, clamped to `[0, 1]`.
    pub fn set_attack_ratio(&mut self, ratio: Fixed) {
        self.attack_ratio = ratio.clamp(Fixed::ZERO, Fixed::ONE);
    }

    /// Whether auto-play is enabled for this player.
    #[must_use]
    pub const fn auto_play(&self) -> bool {
        self.auto_play
    }

    pub(crate) fn set_auto_play(&mut self, enabled: bool) {
        self.auto_play = enabled;
    }

    // Territory

    /// Owned tiles.
    #[must_use]
    pub const fn tiles(&self) -> &BTreeSet<TileRef> {
        &self.tiles
    }

    /// Number of owned tiles.
    #[must_use]
    pub fn tile_count(&self) -> usize {
        self.tiles.len()
    }

    /// Owned tiles adjacent to a tile not owned by this player.
    #[must_use]
    pub const fn border_tiles(&self) -> &BTreeSet<TileRef> {
        &self.border
    }

    pub(crate) fn tiles_mut(&mut self) -> &mut BTreeSet<TileRef> {
        &mut self.tiles
    }

    pub(crate) fn border_mut(&mut self) -> &mut BTreeSet<TileRef> {
        &mut self.border
    }

    // Diplomacy

    /// Returns true if an alliance with `other` is in force.
    #[must_use]
    pub fn is_allied_with(&self, other: PlayerId) -> bool {
        self.alliances.contains_key(&other)
    }

    /// Allies and the tick each alliance was formed.
    #[must_use]
    pub const fn alliances(&self) -> &BTreeMap<PlayerId, Tick> {
        &self.alliances
    }

    pub(crate) fn add_alliance(&mut self, other: PlayerId, ticks: Tick) {
        self.alliances.insert(other, ticks);
    }

    pub(crate) fn remove_alliance(&mut self, other: PlayerId) -> bool {
        self.alliances.remove(&other).is_some()
    }

    /// Returns true if this player embargoes `other`.
    #[must_use]
    pub fn has_embargo_against(&self, other: PlayerId) -> bool {
        self.embargoes.contains(&other)
    }

    /// Stop trading with `other`.
    pub fn add_embargo(&mut self, other: PlayerId) {
        self.embargoes.insert(other);
    }

    /// Resume trading with `other`.
    pub fn stop_embargo(&mut self, other: PlayerId) {
        self.embargoes.remove(&other);
    }

    /// Tick this player last broke an alliance.
    #[must_use]
    pub const fn traitor_since(&self) -> Option<Tick> {
        self.traitor_since
    }

    /// Returns true while the traitor mark is fresh.
    #[must_use]
    pub fn is_traitor(&self, ticks: Tick, duration: Tick) -> bool {
        self.traitor_since
            .is_some_and(|since| ticks.saturating_sub(since) < duration)
    }

    pub(crate) fn mark_traitor(&mut self, ticks: Tick) {
        self.traitor_since = Some(ticks);
    }

    /// Raw relation score toward `other`. Zero when never interacted.
    #[must_use]
    pub fn relation_score(&self, other: PlayerId) -> i32 {
        self.relations.get(&other).copied().unwrap_or(0)
    }

    /// Attitude toward `other`.
    #[must_use]
    pub fn relation(&self, other: PlayerId) -> Relation {
        Relation::from_score(self.relation_score(other))
    }

    /// Shift the relation score toward `other`.
    pub fn update_relation(&mut self, other: PlayerId, delta: i32) {
        let score = self.relations.entry(other).or_insert(0);
        *score = (*score + delta).clamp(-MAX_RELATION, MAX_RELATION);
    }

    /// Move every relation score one step toward neutral.
    pub fn decay_relations(&mut self, step: i32) {
        for score in self.relations.values_mut() {
            if *score > 0 {
                *score = (*score - step).max(0);
            } else {
                *score = (*score + step).min(0);
            }
        }
        self.relations.retain(|_, score| *score != 0);
    }

    /// Tick this player last asked `other` for an alliance.
    #[must_use]
    pub fn last_alliance_request(&self, other: PlayerId) -> Option<Tick> {
        self.last_alliance_request.get(&other).copied()
    }

    pub(crate) fn record_alliance_request(&mut self, other: PlayerId, ticks: Tick) {
        self.last_alliance_request.insert(other, ticks);
    }

    /// Players this player marked as targets, with the tick of marking.
    #[must_use]
    pub const fn targets(&self) -> &BTreeMap<PlayerId, Tick> {
        &self.targets
    }

    /// Mark `other` as a target.
    pub fn target(&mut self, other: PlayerId, ticks: Tick) {
        self.targets.insert(other, ticks);
    }

    /// Drop target marks older than `duration`.
    pub fn expire_targets(&mut self, ticks: Tick, duration: Tick) {
        self.targets
            .retain(|_, since| ticks.saturating_sub(*since) < duration);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player(id: u16) -> Player {
        Player::new(
            PlayerInfo::new(PlayerId::new(id), format!("p{id}"), PlayerType::Human),
            1_000,
            500,
        )
    }

    #[test]
    fn test_gold_saturates() {
        let mut p = player(0);
        assert_eq!(p.remove_gold(400), 400);
        assert_eq!(p.gold(), 600);
        assert_eq!(p.remove_gold(10_000), 600);
        assert_eq!(p.gold(), 0);
        p.add_gold(u64::MAX);
        p.add_gold(1);
        assert_eq!(p.gold(), u64::MAX);
    }

    #[test]
    fn test_ratio_is_clamped() {
        let mut p = player(0);
        p.set_attack_ratio(Fixed::from_num(3));
        assert_eq!(p.attack_ratio(), Fixed::ONE);
        p.set_target_troop_ratio(Fixed::from_num(-1));
        assert_eq!(p.target_troop_ratio(), Fixed::ZERO);
    }

    #[test]
    fn test_same_team_requires_a_team() {
        let a = player(0);
        let b = player(1);
        assert!(!a.is_on_same_team(&b));

        let a = Player::new(
            PlayerInfo::new(PlayerId::new(0), "a", PlayerType::Human).with_team(1),
            0,
            0,
        );
        let b = Player::new(
            PlayerInfo::new(PlayerId::new(1), "b", PlayerType::Bot).with_team(1),
            0,
            0,
        );
        assert!(a.is_on_same_team(&b));
    }

    #[test]
    fn test_relations_decay_to_neutral() {
        let mut p = player(0);
        let other = PlayerId::new(1);
        p.update_relation(other, -70);
        assert_eq!(p.relation(other), Relation::Hostile);
        p.decay_relations(30);
        assert_eq!(p.relation(other), Relation::Distrustful);
        p.decay_relations(100);
        assert_eq!(p.relation_score(other), 0);
        assert_eq!(p.relation(other), Relation::Neutral);
    }

    #[test]
    fn test_relation_is_clamped() {
        let mut p = player(0);
        let other = PlayerId::new(1);
        p.update_relation(other, 1_000);
        assert_eq!(p.relation_score(other), MAX_RELATION);
    }

    #[test]
    fn test_traitor_mark_expires() {
        let mut p = player(0);
        assert!(!p.is_traitor(10, 100));
        p.mark_traitor(10);
        assert!(p.is_traitor(109, 100));
        assert!(!p.is_traitor(110, 100));
    }

    #[test]
    fn test_targets_expire() {
        let mut p = player(0);
        p.target(PlayerId::new(3), 5);
        p.expire_targets(50, 100);
        assert_eq!(p.targets().len(), 1);
        p.expire_targets(105, 100);
        assert!(p.targets().is_empty());
    }
}

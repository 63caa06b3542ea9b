//! World façade shared by every execution.
//!
//! [`Game`] owns the map, players, units, land attacks, pending alliance
//! requests and the outgoing message channel. Executions receive it as
//! `&mut Game` once per tick; this is the only way simulation state
//! changes.
//!
//! # Determinism
//!
//! All collections are ordered (`BTreeMap`/`BTreeSet`) so iteration order
//! is identical on every client. Queries that return several units sort
//! them by a stable key before returning.

use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::GameConfig;
use crate::error::{GameError, Result};
use crate::map::{GameMap, TileRef};
use crate::player::{Owner, Player, PlayerId, PlayerInfo};
use crate::unit::{BuildParams, Unit, UnitId, UnitType};
use crate::Tick;

/// Search radius when looking for a shore tile near a build cursor.
const SHORE_SEARCH_RADIUS: u32 = 15;

/// Category of a user-facing message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageType {
    /// Neutral notification.
    Info,
    /// Something went well for the recipient.
    Success,
    /// Something went badly for the recipient.
    Warning,
    /// Land or naval attack notification.
    Attack,
    /// Nuclear strike notification.
    Nuke,
    /// Player-to-player chat.
    Chat,
}

/// A fact emitted toward the UI layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameMessage {
    /// Tick the message was emitted.
    pub tick: Tick,
    /// Category.
    pub message_type: MessageType,
    /// Message body.
    pub text: String,
    /// Recipient; `None` broadcasts to everyone.
    pub player: Option<PlayerId>,
    /// Sender for chat messages.
    pub sender: Option<PlayerId>,
}

/// Identifier of a land attack.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AttackId(u32);

/// An ongoing land attack.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Attack {
    /// Attack id.
    pub id: AttackId,
    /// Attacking player.
    pub attacker: PlayerId,
    /// Defender, or unclaimed land.
    pub target: Owner,
    /// Troops still committed.
    pub troops: u64,
    /// Landing tile for attacks started from a transport ship.
    pub source_tile: Option<TileRef>,
    /// Tick the attack started.
    pub started_at: Tick,
    /// False once the attack ended.
    pub active: bool,
}

/// A pending alliance request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AllianceRequest {
    /// Player asking.
    pub requestor: PlayerId,
    /// Player asked.
    pub recipient: PlayerId,
    /// Tick the request was made.
    pub created_at: Tick,
}

/// A unit found by [`Game::nearby_units`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NearbyUnit {
    /// Unit id.
    pub id: UnitId,
    /// Unit type.
    pub unit_type: UnitType,
    /// Owner.
    pub owner: PlayerId,
    /// Current tile.
    pub tile: TileRef,
    /// Squared euclidean distance to the query tile.
    pub dist_squared: u64,
}

/// Per-session chat flood tracking.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChatModerator {
    recent: BTreeMap<PlayerId, VecDeque<Tick>>,
}

impl ChatModerator {
    /// Record a message from `sender`; returns false if it would flood.
    pub fn allow(&mut self, sender: PlayerId, ticks: Tick, window: Tick, limit: usize) -> bool {
        let recent = self.recent.entry(sender).or_default();
        while recent
            .front()
            .is_some_and(|&sent| ticks.saturating_sub(sent) >= window)
        {
            recent.pop_front();
        }
        if recent.len() >= limit {
            return false;
        }
        recent.push_back(ticks);
        true
    }
}

/// The game world.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Game {
    map: GameMap,
    config: GameConfig,
    seed: u64,
    ticks: Tick,
    owners: Vec<Option<PlayerId>>,
    players: BTreeMap<PlayerId, Player>,
    units: BTreeMap<UnitId, Unit>,
    next_unit_id: u32,
    attacks: BTreeMap<AttackId, Attack>,
    next_attack_id: u32,
    alliance_requests: Vec<AllianceRequest>,
    fallout: BTreeSet<TileRef>,
    chat: ChatModerator,
    #[serde(skip)]
    messages: Vec<GameMessage>,
}

impl Game {
    /// Create a world with no players.
    #[must_use]
    pub fn new(map: GameMap, config: GameConfig, seed: u64) -> Self {
        let tile_count = map.tile_count();
        Self {
            map,
            config,
            seed,
            ticks: 0,
            owners: vec![None; tile_count],
            players: BTreeMap::new(),
            units: BTreeMap::new(),
            next_unit_id: 1,
            attacks: BTreeMap::new(),
            next_attack_id: 1,
            alliance_requests: Vec::new(),
            fallout: BTreeSet::new(),
            chat: ChatModerator::default(),
            messages: Vec::new(),
        }
    }

    /// Current tick.
    #[must_use]
    pub const fn ticks(&self) -> Tick {
        self.ticks
    }

    /// Match seed.
    #[must_use]
    pub const fn seed(&self) -> u64 {
        self.seed
    }

    /// Tuning constants.
    #[must_use]
    pub const fn config(&self) -> &GameConfig {
        &self.config
    }

    /// Terrain.
    #[must_use]
    pub const fn map(&self) -> &GameMap {
        &self.map
    }

    /// Returns true while players are still choosing spawn tiles.
    #[must_use]
    pub fn in_spawn_phase(&self) -> bool {
        self.ticks < self.config.spawn_phase_ticks
    }

    // Players

    /// Register a player with the configured starting gold and troops.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InvalidState`] if the id is already taken.
    pub fn add_player(&mut self, info: PlayerInfo) -> Result<()> {
        if self.players.contains_key(&info.id) {
            return Err(GameError::InvalidState(format!(
                "player {} registered twice",
                info.id
            )));
        }
        debug!(player = %info.id, name = %info.name, "Player added");
        let player = Player::new(info, self.config.starting_gold, self.config.starting_troops);
        self.players.insert(player.id(), player);
        Ok(())
    }

    /// Look up a player.
    #[must_use]
    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.get(&id)
    }

    /// Look up a player mutably.
    pub fn player_mut(&mut self, id: PlayerId) -> Option<&mut Player> {
        self.players.get_mut(&id)
    }

    /// Look up a player that must exist.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::PlayerNotFound`] if it does not.
    pub fn expect_player(&self, id: PlayerId) -> Result<&Player> {
        self.players.get(&id).ok_or(GameError::PlayerNotFound(id))
    }

    /// All players in id order.
    pub fn players(&self) -> impl Iterator<Item = &Player> {
        self.players.values()
    }

    /// Living players in id order.
    pub fn alive_players(&self) -> impl Iterator<Item = &Player> {
        self.players.values().filter(|p| p.is_alive())
    }

    /// Returns true if the player exists and is alive.
    #[must_use]
    pub fn is_alive(&self, id: PlayerId) -> bool {
        self.players.get(&id).is_some_and(Player::is_alive)
    }

    /// Returns true if `a` and `b` must not fight: same player, allied or
    /// on the same team.
    #[must_use]
    pub fn is_friendly(&self, a: PlayerId, b: PlayerId) -> bool {
        if a == b {
            return true;
        }
        match (self.players.get(&a), self.players.get(&b)) {
            (Some(pa), Some(pb)) => pa.is_allied_with(b) || pa.is_on_same_team(pb),
            _ => false,
        }
    }

    // Map and ownership

    /// Owner of a tile.
    #[must_use]
    pub fn owner(&self, tile: TileRef) -> Owner {
        self.owner_id(tile).map_or(Owner::TerraNullius, Owner::Player)
    }

    /// Owning player of a tile, if any.
    #[must_use]
    pub fn owner_id(&self, tile: TileRef) -> Option<PlayerId> {
        self.owners.get(tile.as_u32() as usize).copied().flatten()
    }

    /// Returns true for land tiles.
    #[must_use]
    pub fn is_land(&self, tile: TileRef) -> bool {
        self.map.is_land(tile)
    }

    /// Returns true for ocean tiles.
    #[must_use]
    pub fn is_ocean(&self, tile: TileRef) -> bool {
        self.map.is_ocean(tile)
    }

    /// Returns true for land tiles bordering ocean.
    #[must_use]
    pub fn is_ocean_shore(&self, tile: TileRef) -> bool {
        self.map.is_ocean_shore(tile)
    }

    /// Orthogonal neighbors.
    #[must_use]
    pub fn neighbors(&self, tile: TileRef) -> Vec<TileRef> {
        self.map.neighbors(tile)
    }

    /// Manhattan distance.
    #[must_use]
    pub fn manhattan_dist(&self, a: TileRef, b: TileRef) -> u32 {
        self.map.manhattan_dist(a, b)
    }

    /// Squared euclidean distance.
    #[must_use]
    pub fn euclidean_dist_squared(&self, a: TileRef, b: TileRef) -> u64 {
        self.map.euclidean_dist_squared(a, b)
    }

    /// Returns true if the tile carries nuclear fallout.
    #[must_use]
    pub fn has_fallout(&self, tile: TileRef) -> bool {
        self.fallout.contains(&tile)
    }

    pub(crate) fn add_fallout(&mut self, tile: TileRef) {
        self.fallout.insert(tile);
    }

    /// Owners of land adjacent to `id`'s border, excluding `id` itself.
    #[must_use]
    pub fn neighboring_owners(&self, id: PlayerId) -> BTreeSet<Owner> {
        let mut result = BTreeSet::new();
        let Some(player) = self.players.get(&id) else {
            return result;
        };
        for &tile in player.border_tiles() {
            for n in self.map.neighbors(tile) {
                if !self.map.is_land(n) {
                    continue;
                }
                let owner = self.owner(n);
                if owner != Owner::Player(id) {
                    result.insert(owner);
                }
            }
        }
        result
    }

    /// Returns true if `id` owns land adjacent to land owned by `other`.
    #[must_use]
    pub fn shares_border(&self, id: PlayerId, other: Owner) -> bool {
        self.neighboring_owners(id).contains(&other)
    }

    /// Transfer a tile to `id`, capturing structures standing on it.
    pub fn conquer(&mut self, id: PlayerId, tile: TileRef) {
        let previous = self.owner_id(tile);
        if previous == Some(id) || !self.players.contains_key(&id) {
            return;
        }
        if let Some(prev) = previous.and_then(|p| self.players.get_mut(&p)) {
            prev.tiles_mut().remove(&tile);
            prev.border_mut().remove(&tile);
        }
        self.owners[tile.as_u32() as usize] = Some(id);
        if let Some(player) = self.players.get_mut(&id) {
            player.tiles_mut().insert(tile);
        }
        self.fallout.remove(&tile);
        self.refresh_borders_around(tile);

        let standing: Vec<(UnitId, UnitType)> = self
            .units
            .values()
            .filter(|u| {
                u.is_active() && u.tile() == tile && u.unit_type().is_structure() && u.owner() != id
            })
            .map(|u| (u.id(), u.unit_type()))
            .collect();
        for (unit, unit_type) in standing {
            if unit_type == UnitType::Construction {
                self.delete_unit(unit);
            } else {
                self.capture_unit(unit, id);
            }
        }
    }

    /// Return a tile to terra nullius, destroying structures standing on it.
    pub fn relinquish(&mut self, tile: TileRef) {
        let Some(previous) = self.owner_id(tile) else {
            return;
        };
        if let Some(prev) = self.players.get_mut(&previous) {
            prev.tiles_mut().remove(&tile);
            prev.border_mut().remove(&tile);
        }
        self.owners[tile.as_u32() as usize] = None;
        self.refresh_borders_around(tile);

        let standing: Vec<UnitId> = self
            .units
            .values()
            .filter(|u| u.is_active() && u.tile() == tile && u.unit_type().is_structure())
            .map(Unit::id)
            .collect();
        for unit in standing {
            self.delete_unit(unit);
        }
    }

    fn refresh_borders_around(&mut self, tile: TileRef) {
        self.refresh_border(tile);
        for n in self.map.neighbors(tile) {
            self.refresh_border(n);
        }
    }

    fn refresh_border(&mut self, tile: TileRef) {
        let Some(owner) = self.owner_id(tile) else {
            return;
        };
        let is_border = self
            .map
            .neighbors(tile)
            .into_iter()
            .any(|n| self.owner_id(n) != Some(owner));
        if let Some(player) = self.players.get_mut(&owner) {
            if is_border {
                player.border_mut().insert(tile);
            } else {
                player.border_mut().remove(&tile);
            }
        }
    }

    // Units

    /// Look up a unit (active or deleted this tick).
    #[must_use]
    pub fn unit(&self, id: UnitId) -> Option<&Unit> {
        self.units.get(&id)
    }

    /// Look up a unit mutably.
    pub fn unit_mut(&mut self, id: UnitId) -> Option<&mut Unit> {
        self.units.get_mut(&id)
    }

    /// Look up a unit only if it is still active.
    #[must_use]
    pub fn active_unit(&self, id: UnitId) -> Option<&Unit> {
        self.units.get(&id).filter(|u| u.is_active())
    }

    /// Returns true if the unit exists and is active.
    #[must_use]
    pub fn is_unit_active(&self, id: UnitId) -> bool {
        self.active_unit(id).is_some()
    }

    /// Active units of `owner` of the given type, in id order.
    #[must_use]
    pub fn units_of(&self, owner: PlayerId, unit_type: UnitType) -> Vec<&Unit> {
        self.units
            .values()
            .filter(|u| u.is_active() && u.owner() == owner && u.unit_type() == unit_type)
            .collect()
    }

    /// Every active unit, in id order.
    pub fn all_units(&self) -> impl Iterator<Item = &Unit> {
        self.units.values().filter(|u| u.is_active())
    }

    /// Units of `unit_type` owned by `owner`, counting ones under construction.
    #[must_use]
    pub fn count_units(&self, owner: PlayerId, unit_type: UnitType) -> usize {
        self.units
            .values()
            .filter(|u| {
                u.is_active()
                    && u.owner() == owner
                    && (u.unit_type() == unit_type
                        || (u.unit_type() == UnitType::Construction
                            && u.construction_type() == Some(unit_type)))
            })
            .count()
    }

    /// Gold cost of the next unit of `unit_type` for `owner`.
    #[must_use]
    pub fn unit_cost(&self, owner: PlayerId, unit_type: UnitType) -> u64 {
        self.config
            .unit_cost(unit_type, self.count_units(owner, unit_type))
    }

    /// Active units of the given types within `radius` of `tile`, sorted by
    /// distance then id. An empty type list matches every type.
    #[must_use]
    pub fn nearby_units(&self, tile: TileRef, radius: u32, types: &[UnitType]) -> Vec<NearbyUnit> {
        let radius_sq = u64::from(radius) * u64::from(radius);
        let mut found: Vec<NearbyUnit> = self
            .units
            .values()
            .filter(|u| u.is_active() && (types.is_empty() || types.contains(&u.unit_type())))
            .filter_map(|u| {
                let dist_squared = self.map.euclidean_dist_squared(tile, u.tile());
                (dist_squared <= radius_sq).then_some(NearbyUnit {
                    id: u.id(),
                    unit_type: u.unit_type(),
                    owner: u.owner(),
                    tile: u.tile(),
                    dist_squared,
                })
            })
            .collect();
        found.sort_by_key(|n| (n.dist_squared, n.id));
        found
    }

    /// Where `owner` could place a unit of `unit_type` requested at `tile`.
    ///
    /// Returns the actual spawn tile (a port for warships, a silo for
    /// nukes, a shore tile for transports), or `None` if the player cannot
    /// afford it or no valid location exists.
    #[must_use]
    pub fn can_build(&self, owner: PlayerId, unit_type: UnitType, tile: TileRef) -> Option<TileRef> {
        let player = self.players.get(&owner).filter(|p| p.is_alive())?;
        if !self.map.contains(tile) || player.gold() < self.unit_cost(owner, unit_type) {
            return None;
        }
        match unit_type {
            UnitType::City
            | UnitType::DefensePost
            | UnitType::MissileSilo
            | UnitType::SamLauncher
            | UnitType::OrbitalCannon => (self.owner_id(tile) == Some(owner)
                && self.map.is_land(tile)
                && self.has_structure_spacing(owner, unit_type, tile))
            .then_some(tile),
            UnitType::Port => self
                .nearest_owned_shore(owner, tile)
                .filter(|&shore| {
                    self.map.manhattan_dist(shore, tile) <= SHORE_SEARCH_RADIUS
                        && self.has_structure_spacing(owner, unit_type, shore)
                }),
            UnitType::Viper | UnitType::Condor => self
                .nearest_unit_of(owner, UnitType::Port, tile, |_| true)
                .map(Unit::tile),
            UnitType::TransportShip => {
                (self.units_of(owner, UnitType::TransportShip).len() < self.config.max_boats)
                    .then(|| self.nearest_owned_shore(owner, tile))
                    .flatten()
            }
            UnitType::TradeShip => self
                .units_of(owner, UnitType::Port)
                .iter()
                .any(|p| p.tile() == tile)
                .then_some(tile),
            UnitType::AtomBomb | UnitType::HydrogenBomb | UnitType::Mirv => {
                let cooldown = self.config.silo_cooldown;
                let ticks = self.ticks;
                self.nearest_unit_of(owner, UnitType::MissileSilo, tile, |silo| {
                    !silo.is_cooling_down(ticks, cooldown)
                })
                .map(Unit::tile)
            }
            UnitType::Shell
            | UnitType::SamMissile
            | UnitType::MirvWarhead
            | UnitType::Construction => Some(tile),
        }
    }

    fn has_structure_spacing(&self, owner: PlayerId, unit_type: UnitType, tile: TileRef) -> bool {
        let spacing = self.config.unit_info(unit_type).min_spacing;
        !self.units.values().any(|u| {
            u.is_active()
                && u.owner() == owner
                && u.unit_type().is_structure()
                && self.map.manhattan_dist(u.tile(), tile) < spacing
        })
    }

    /// Closest owned ocean-shore tile to `tile`, ties broken by tile id.
    #[must_use]
    pub fn nearest_owned_shore(&self, owner: PlayerId, tile: TileRef) -> Option<TileRef> {
        let player = self.players.get(&owner)?;
        player
            .tiles()
            .iter()
            .copied()
            .filter(|&t| self.map.is_ocean_shore(t))
            .min_by_key(|&t| (self.map.manhattan_dist(t, tile), t))
    }

    fn nearest_unit_of(
        &self,
        owner: PlayerId,
        unit_type: UnitType,
        tile: TileRef,
        eligible: impl Fn(&Unit) -> bool,
    ) -> Option<&Unit> {
        self.units_of(owner, unit_type)
            .into_iter()
            .filter(|&u| eligible(u))
            .min_by_key(|u| (self.map.manhattan_dist(u.tile(), tile), u.id()))
    }

    /// Closest own port to `tile` whose warship slot is free.
    #[must_use]
    pub fn free_port_near(&self, owner: PlayerId, tile: TileRef) -> Option<UnitId> {
        self.nearest_unit_of(owner, UnitType::Port, tile, |p| !p.has_port_queue())
            .map(Unit::id)
    }

    /// Create a unit and charge its cost to the owner.
    ///
    /// Callers validate with [`Game::can_build`] first; this does not.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::PlayerNotFound`] if the owner does not exist.
    pub fn build_unit(
        &mut self,
        owner: PlayerId,
        unit_type: UnitType,
        tile: TileRef,
        params: BuildParams,
    ) -> Result<UnitId> {
        let cost = self.unit_cost(owner, unit_type);
        let player = self
            .players
            .get_mut(&owner)
            .ok_or(GameError::PlayerNotFound(owner))?;
        player.remove_gold(cost);

        let id = UnitId::new(self.next_unit_id);
        self.next_unit_id += 1;
        let max_health = self.config.unit_info(unit_type).max_health;
        self.units.insert(
            id,
            Unit::new(id, unit_type, owner, tile, max_health, self.ticks, params),
        );
        debug!(unit = %id, kind = unit_type.name(), player = %owner, %tile, cost, "Unit built");
        Ok(id)
    }

    /// Mark a unit deleted. Idempotent.
    pub fn delete_unit(&mut self, id: UnitId) {
        if let Some(unit) = self.units.get_mut(&id) {
            if unit.is_active() {
                unit.deactivate();
                debug!(unit = %id, kind = unit.unit_type().name(), "Unit deleted");
            }
        }
    }

    /// Apply damage. Units without health die to any hit.
    ///
    /// Returns true if the unit was destroyed.
    pub fn damage_unit(&mut self, id: UnitId, amount: u32) -> bool {
        let Some(unit) = self.units.get_mut(&id).filter(|u| u.is_active()) else {
            return false;
        };
        if unit.has_health() {
            unit.modify_health(-i64::from(amount));
            if unit.health() == Some(0) {
                self.delete_unit(id);
                return true;
            }
            false
        } else {
            self.delete_unit(id);
            true
        }
    }

    /// Transfer a unit to another player.
    pub fn capture_unit(&mut self, id: UnitId, new_owner: PlayerId) {
        if let Some(unit) = self.units.get_mut(&id).filter(|u| u.is_active()) {
            debug!(unit = %id, from = %unit.owner(), to = %new_owner, "Unit captured");
            unit.set_owner(new_owner);
            unit.set_port_queue(None);
        }
    }

    /// Move a unit one step. Nukes record a trail.
    pub fn move_unit(&mut self, id: UnitId, tile: TileRef) {
        let trail = self.config.nuke_trail_length;
        if let Some(unit) = self.units.get_mut(&id).filter(|u| u.is_active()) {
            let trail = if unit.unit_type().is_projectile() { trail } else { 0 };
            unit.move_to(tile, trail);
        }
    }

    /// Claim a nuke for interception. Returns false if it is gone, not
    /// interceptable, or already claimed.
    pub fn claim_for_interception(&mut self, nuke: UnitId) -> bool {
        match self.units.get_mut(&nuke) {
            Some(unit)
                if unit.is_active()
                    && unit.unit_type().is_interceptable()
                    && !unit.targeted_by_sam() =>
            {
                unit.set_targeted_by_sam();
                true
            }
            _ => false,
        }
    }

    /// Take a port's warship slot for `holder`. Check and set happen in one
    /// call; returns false if the slot is taken or the port is gone.
    pub fn reserve_port_queue(&mut self, port: UnitId, holder: UnitId) -> bool {
        match self.units.get_mut(&port) {
            Some(unit)
                if unit.is_active()
                    && unit.unit_type() == UnitType::Port
                    && !unit.has_port_queue() =>
            {
                unit.set_port_queue(Some(holder));
                true
            }
            _ => false,
        }
    }

    /// Free a port's warship slot if `holder` owns it.
    pub fn release_port_queue(&mut self, port: UnitId, holder: UnitId) {
        if let Some(unit) = self.units.get_mut(&port) {
            if unit.port_queue() == Some(holder) {
                unit.set_port_queue(None);
            }
        }
    }

    // Attacks

    /// Register a land attack so the defender can see it.
    pub fn register_attack(
        &mut self,
        attacker: PlayerId,
        target: Owner,
        troops: u64,
        source_tile: Option<TileRef>,
    ) -> AttackId {
        let id = AttackId(self.next_attack_id);
        self.next_attack_id += 1;
        self.attacks.insert(
            id,
            Attack {
                id,
                attacker,
                target,
                troops,
                source_tile,
                started_at: self.ticks,
                active: true,
            },
        );
        id
    }

    /// Look up an attack.
    #[must_use]
    pub fn attack(&self, id: AttackId) -> Option<&Attack> {
        self.attacks.get(&id)
    }

    /// Look up an attack mutably.
    pub fn attack_mut(&mut self, id: AttackId) -> Option<&mut Attack> {
        self.attacks.get_mut(&id)
    }

    /// Active attacks targeting `id`, in id order.
    #[must_use]
    pub fn incoming_attacks(&self, id: PlayerId) -> Vec<&Attack> {
        self.attacks
            .values()
            .filter(|a| a.active && a.target == Owner::Player(id))
            .collect()
    }

    /// Active attacks launched by `id`, in id order.
    #[must_use]
    pub fn outgoing_attacks(&self, id: PlayerId) -> Vec<&Attack> {
        self.attacks
            .values()
            .filter(|a| a.active && a.attacker == id)
            .collect()
    }

    // Diplomacy

    /// Ask `recipient` for an alliance. Returns false when the request is
    /// pointless or too soon after the previous one.
    pub fn create_alliance_request(&mut self, requestor: PlayerId, recipient: PlayerId) -> bool {
        let cooldown = self.config.alliance_request_cooldown;
        let ticks = self.ticks;
        let Some(player) = self.players.get(&requestor) else {
            return false;
        };
        if requestor == recipient
            || !self.is_alive(recipient)
            || player.is_allied_with(recipient)
            || player
                .last_alliance_request(recipient)
                .is_some_and(|last| ticks.saturating_sub(last) < cooldown)
            || self
                .alliance_requests
                .iter()
                .any(|r| r.requestor == requestor && r.recipient == recipient)
        {
            return false;
        }
        if let Some(player) = self.players.get_mut(&requestor) {
            player.record_alliance_request(recipient, ticks);
        }
        self.alliance_requests.push(AllianceRequest {
            requestor,
            recipient,
            created_at: ticks,
        });
        debug!(from = %requestor, to = %recipient, "Alliance requested");
        true
    }

    /// Pending requests addressed to `id`, oldest first.
    #[must_use]
    pub fn incoming_alliance_requests(&self, id: PlayerId) -> Vec<AllianceRequest> {
        self.alliance_requests
            .iter()
            .filter(|r| r.recipient == id)
            .copied()
            .collect()
    }

    fn take_alliance_request(
        &mut self,
        requestor: PlayerId,
        recipient: PlayerId,
    ) -> Option<AllianceRequest> {
        let index = self
            .alliance_requests
            .iter()
            .position(|r| r.requestor == requestor && r.recipient == recipient)?;
        Some(self.alliance_requests.remove(index))
    }

    /// Accept a pending request. Returns false if none was pending.
    pub fn accept_alliance_request(&mut self, requestor: PlayerId, recipient: PlayerId) -> bool {
        if self.take_alliance_request(requestor, recipient).is_none() {
            return false;
        }
        let ticks = self.ticks;
        for (a, b) in [(requestor, recipient), (recipient, requestor)] {
            if let Some(player) = self.players.get_mut(&a) {
                player.add_alliance(b, ticks);
                player.update_relation(b, 50);
            }
        }
        // Allies do not embargo each other.
        for (a, b) in [(requestor, recipient), (recipient, requestor)] {
            if let Some(player) = self.players.get_mut(&a) {
                player.stop_embargo(b);
            }
        }
        self.display_message(
            format!("Alliance formed with {recipient}"),
            MessageType::Success,
            Some(requestor),
        );
        true
    }

    /// Reject a pending request. Returns false if none was pending.
    pub fn reject_alliance_request(&mut self, requestor: PlayerId, recipient: PlayerId) -> bool {
        if self.take_alliance_request(requestor, recipient).is_none() {
            return false;
        }
        if let Some(player) = self.players.get_mut(&requestor) {
            player.update_relation(recipient, -10);
        }
        self.display_message(
            format!("{recipient} rejected your alliance request"),
            MessageType::Warning,
            Some(requestor),
        );
        true
    }

    /// Break an alliance; the breaker is marked traitor.
    pub fn break_alliance(&mut self, breaker: PlayerId, other: PlayerId) {
        let ticks = self.ticks;
        let was_allied = self
            .players
            .get_mut(&breaker)
            .is_some_and(|p| p.remove_alliance(other));
        if !was_allied {
            return;
        }
        if let Some(player) = self.players.get_mut(&breaker) {
            player.mark_traitor(ticks);
        }
        if let Some(player) = self.players.get_mut(&other) {
            player.remove_alliance(breaker);
            player.update_relation(breaker, -100);
        }
        debug!(%breaker, %other, "Alliance broken");
        self.display_message(
            format!("{breaker} broke their alliance with you"),
            MessageType::Warning,
            Some(other),
        );
    }

    // Messages

    /// Emit a notification. `player = None` broadcasts.
    pub fn display_message(
        &mut self,
        text: impl Into<String>,
        message_type: MessageType,
        player: Option<PlayerId>,
    ) {
        self.messages.push(GameMessage {
            tick: self.ticks,
            message_type,
            text: text.into(),
            player,
            sender: None,
        });
    }

    /// Emit a chat message from `sender` to `recipient`.
    pub fn display_chat(&mut self, sender: PlayerId, recipient: PlayerId, text: impl Into<String>) {
        self.messages.push(GameMessage {
            tick: self.ticks,
            message_type: MessageType::Chat,
            text: text.into(),
            player: Some(recipient),
            sender: Some(sender),
        });
    }

    /// Per-session chat flood tracker.
    pub fn chat_moderator_mut(&mut self) -> &mut ChatModerator {
        &mut self.chat
    }

    /// Take every message emitted since the last drain.
    pub fn drain_messages(&mut self) -> Vec<GameMessage> {
        std::mem::take(&mut self.messages)
    }

    // Tick bookkeeping

    /// Close the current tick: sweep deleted units and finished attacks,
    /// expire diplomacy, advance the clock.
    pub fn end_tick(&mut self) {
        self.units.retain(|_, u| u.is_active());
        self.attacks.retain(|_, a| a.active);

        let ticks = self.ticks;
        let expiry = self.config.alliance_request_expiry;
        self.alliance_requests
            .retain(|r| ticks.saturating_sub(r.created_at) < expiry);

        let duration = self.config.alliance_duration;
        let expired: Vec<(PlayerId, PlayerId)> = self
            .players
            .values()
            .flat_map(|p| {
                p.alliances()
                    .iter()
                    .filter(move |(other, since)| {
                        p.id() < **other && ticks.saturating_sub(**since) >= duration
                    })
                    .map(move |(other, _)| (p.id(), *other))
            })
            .collect();
        for (a, b) in expired {
            for (x, y) in [(a, b), (b, a)] {
                if let Some(player) = self.players.get_mut(&x) {
                    player.remove_alliance(y);
                }
                self.display_message(
                    format!("Alliance with {y} expired"),
                    MessageType::Info,
                    Some(x),
                );
            }
        }

        let target_duration = self.config.target_duration;
        for player in self.players.values_mut() {
            player.expire_targets(ticks, target_duration);
        }

        self.ticks += 1;
    }

    /// Check that the tile owner index, player territories and port slots
    /// agree.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InvalidState`] describing the first mismatch.
    #[cfg(feature = "debug-validation")]
    pub fn validate(&self) -> Result<()> {
        for player in self.players.values() {
            for &tile in player.tiles() {
                if self.owner_id(tile) != Some(player.id()) {
                    return Err(GameError::InvalidState(format!(
                        "{} lists {tile} but the owner index disagrees",
                        player.id()
                    )));
                }
            }
        }
        let owned = self.owners.iter().filter(|o| o.is_some()).count();
        let listed: usize = self.players.values().map(Player::tile_count).sum();
        if owned != listed {
            return Err(GameError::InvalidState(format!(
                "{owned} owned tiles but players list {listed}"
            )));
        }
        for unit in self.units.values().filter(|u| u.is_active()) {
            if let Some(holder) = unit.port_queue() {
                if self.units.get(&holder).is_none() {
                    return Err(GameError::InvalidState(format!(
                        "port {} held by missing construction {holder}",
                        unit.id()
                    )));
                }
            }
        }
        Ok(())
    }

    /// Deterministic hash of the simulation state.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.ticks.hash(&mut hasher);
        self.owners.hash(&mut hasher);
        self.players.len().hash(&mut hasher);
        for player in self.players.values() {
            player.hash(&mut hasher);
        }
        self.units.len().hash(&mut hasher);
        for unit in self.units.values() {
            unit.hash(&mut hasher);
        }
        for attack in self.attacks.values() {
            attack.hash(&mut hasher);
        }
        self.alliance_requests.hash(&mut hasher);
        self.fallout.hash(&mut hasher);
        hasher.finish()
    }

    /// Serialize the world for snapshots.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn serialize(&self) -> Result<Vec<u8>> {
        bincode::serialize(self)
            .map_err(|e| GameError::Serialization(format!("Failed to serialize game: {e}")))
    }

    /// Restore a world from a snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if deserialization fails.
    pub fn deserialize(data: &[u8]) -> Result<Self> {
        bincode::deserialize(data)
            .map_err(|e| GameError::Serialization(format!("Failed to deserialize game: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::PlayerType;

    fn game() -> Game {
        let map = GameMap::from_ascii(&[
            "~~~~~~~~",
            "~######~",
            "~######~",
            "~######~",
            "~~~~~~~~",
        ])
        .unwrap();
        let mut game = Game::new(map, GameConfig::default(), 7);
        for id in 0..2 {
            game.add_player(PlayerInfo::new(
                PlayerId::new(id),
                format!("p{id}"),
                PlayerType::Human,
            ))
            .unwrap();
        }
        game
    }

    fn tile(game: &Game, x: i64, y: i64) -> TileRef {
        game.map().tile(x, y).unwrap()
    }

    #[test]
    fn test_duplicate_player_is_rejected() {
        let mut game = game();
        let result = game.add_player(PlayerInfo::new(PlayerId::new(0), "dup", PlayerType::Bot));
        assert!(matches!(result, Err(GameError::InvalidState(_))));
    }

    #[test]
    fn test_conquer_maintains_borders() {
        let mut game = game();
        let p0 = PlayerId::new(0);
        for x in 1..=3 {
            for y in 1..=3 {
                game.conquer(p0, tile(&game, x, y));
            }
        }
        let player = game.player(p0).unwrap();
        assert_eq!(player.tile_count(), 9);
        // the centre is interior
        assert!(!player.border_tiles().contains(&tile(&game, 2, 2)));
        assert_eq!(player.border_tiles().len(), 8);

        let p1 = PlayerId::new(1);
        game.conquer(p1, tile(&game, 4, 2));
        assert!(game.shares_border(p0, Owner::Player(p1)));
        assert!(game.neighboring_owners(p0).contains(&Owner::TerraNullius));
    }

    #[test]
    fn test_conquer_captures_structures_and_destroys_constructions() {
        let mut game = game();
        let (p0, p1) = (PlayerId::new(0), PlayerId::new(1));
        let a = tile(&game, 2, 2);
        let b = tile(&game, 5, 2);
        game.conquer(p0, a);
        game.conquer(p0, b);
        let city = game.build_unit(p0, UnitType::City, a, BuildParams::default()).unwrap();
        let site = game
            .build_unit(p0, UnitType::Construction, b, BuildParams::construction(UnitType::City))
            .unwrap();

        game.conquer(p1, a);
        game.conquer(p1, b);
        assert_eq!(game.unit(city).unwrap().owner(), p1);
        assert!(!game.is_unit_active(site));
    }

    #[test]
    fn test_can_build_checks_ownership_and_gold() {
        let mut game = game();
        let p0 = PlayerId::new(0);
        let t = tile(&game, 2, 2);
        assert_eq!(game.can_build(p0, UnitType::City, t), None);
        game.conquer(p0, t);
        assert_eq!(game.can_build(p0, UnitType::City, t), None, "not enough gold");
        game.player_mut(p0).unwrap().add_gold(1_000_000);
        assert_eq!(game.can_build(p0, UnitType::City, t), Some(t));
    }

    #[test]
    fn test_cost_counts_constructions() {
        let mut game = game();
        let p0 = PlayerId::new(0);
        let t = tile(&game, 2, 2);
        game.conquer(p0, t);
        let base = game.unit_cost(p0, UnitType::City);
        game.build_unit(p0, UnitType::Construction, t, BuildParams::construction(UnitType::City))
            .unwrap();
        assert!(game.unit_cost(p0, UnitType::City) > base);
    }

    #[test]
    fn test_nearby_units_sorted_by_distance_then_id() {
        let mut game = game();
        let p0 = PlayerId::new(0);
        game.player_mut(p0).unwrap().add_gold(10_000_000);
        let far = game
            .build_unit(p0, UnitType::Shell, tile(&game, 5, 2), BuildParams::default())
            .unwrap();
        let near = game
            .build_unit(p0, UnitType::Shell, tile(&game, 2, 2), BuildParams::default())
            .unwrap();
        let found = game.nearby_units(tile(&game, 1, 2), 10, &[UnitType::Shell]);
        assert_eq!(found.iter().map(|n| n.id).collect::<Vec<_>>(), vec![near, far]);
        assert!(game.nearby_units(tile(&game, 1, 2), 10, &[UnitType::Viper]).is_empty());
    }

    #[test]
    fn test_interception_claim_is_exclusive() {
        let mut game = game();
        let p0 = PlayerId::new(0);
        let nuke = game
            .build_unit(p0, UnitType::AtomBomb, tile(&game, 2, 2), BuildParams::default())
            .unwrap();
        assert!(game.claim_for_interception(nuke));
        assert!(!game.claim_for_interception(nuke));
    }

    #[test]
    fn test_port_queue_is_single_slot() {
        let mut game = game();
        let p0 = PlayerId::new(0);
        let port = game
            .build_unit(p0, UnitType::Port, tile(&game, 1, 1), BuildParams::default())
            .unwrap();
        let (a, b) = (UnitId::new(100), UnitId::new(101));
        assert!(game.reserve_port_queue(port, a));
        assert!(!game.reserve_port_queue(port, b));
        game.release_port_queue(port, b);
        assert!(game.unit(port).unwrap().has_port_queue());
        game.release_port_queue(port, a);
        assert!(game.reserve_port_queue(port, b));
    }

    #[test]
    fn test_damage_without_health_destroys() {
        let mut game = game();
        let p0 = PlayerId::new(0);
        let shell = game
            .build_unit(p0, UnitType::Shell, tile(&game, 2, 2), BuildParams::default())
            .unwrap();
        assert!(game.damage_unit(shell, 1));
        assert!(!game.is_unit_active(shell));
        game.end_tick();
        assert!(game.unit(shell).is_none());
    }

    #[test]
    fn test_alliance_lifecycle() {
        let mut game = game();
        let (p0, p1) = (PlayerId::new(0), PlayerId::new(1));
        assert!(game.create_alliance_request(p0, p1));
        assert!(!game.create_alliance_request(p0, p1), "cooldown");
        assert!(game.accept_alliance_request(p0, p1));
        assert!(game.is_friendly(p0, p1));

        game.break_alliance(p1, p0);
        assert!(!game.is_friendly(p0, p1));
        assert!(game.player(p1).unwrap().traitor_since().is_some());
    }

    #[test]
    fn test_state_hash_tracks_changes() {
        let mut a = game();
        let b = game();
        assert_eq!(a.state_hash(), b.state_hash());
        a.conquer(PlayerId::new(0), tile(&a, 2, 2));
        assert_ne!(a.state_hash(), b.state_hash());
    }

    #[test]
    fn test_snapshot_round_trip_preserves_hash() {
        let mut game = game();
        game.conquer(PlayerId::new(0), tile(&game, 2, 2));
        let bytes = game.serialize().unwrap();
        let restored = Game::deserialize(&bytes).unwrap();
        assert_eq!(restored.state_hash(), game.state_hash());
    }

    #[test]
    fn test_chat_moderator_limits_flood() {
        let mut chat = ChatModerator::default();
        let p = PlayerId::new(0);
        assert!(chat.allow(p, 0, 10, 2));
        assert!(chat.allow(p, 1, 10, 2));
        assert!(!chat.allow(p, 2, 10, 2));
        assert!(chat.allow(p, 10, 10, 2));
    }
}

#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Skirmish simulation.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative world, and the per-tick systems. Adapters submit [`Command`]
//! values describing external mutations (map loads, spawns, structure
//! placement), the world executes those commands via its `apply` entry point,
//! and the simulation step broadcasts [`Event`] values describing everything
//! that happened during a tick. The same [`BehaviorState`] and
//! [`ArchetypeTag`] enums are shared by the simulation and its observers.

pub mod config;
pub mod geometry;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use config::{
    AggressiveConfig, CombatConfig, CoordinatorConfig, PassiveConfig, PathfindingConfig,
    SimulationConfig, SpatialConfig,
};
pub use geometry::{circle_surface_distance, Shape, Vec2, EPSILON};

/// Identifier of the faction (player or neutral side) owning an entity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FactionId(u32);

impl FactionId {
    /// Creates a new faction identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Unique identifier assigned to a unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UnitId(u32);

impl UnitId {
    /// Creates a new unit identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Unique identifier assigned to a structure.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StructureId(u32);

impl StructureId {
    /// Creates a new structure identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Integer coordinate of a single map tile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TilePos {
    /// Column index of the tile.
    pub x: i32,
    /// Row index of the tile.
    pub y: i32,
}

impl TilePos {
    /// Creates a new tile coordinate.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Tile containing the provided continuous position.
    #[must_use]
    pub fn containing(position: Vec2) -> Self {
        Self::new(position.x.floor() as i32, position.y.floor() as i32)
    }

    /// Continuous position of the tile's centre.
    #[must_use]
    pub fn center(self) -> Vec2 {
        Vec2::new(self.x as f32 + 0.5, self.y as f32 + 0.5)
    }

    /// Coordinate offset by the provided deltas.
    #[must_use]
    pub const fn offset(self, dx: i32, dy: i32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }

    /// Computes the Manhattan distance between two tiles.
    #[must_use]
    pub fn manhattan_distance(self, other: TilePos) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }
}

/// Terrain type of a single tile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TileKind {
    /// Impassable water.
    Water,
    /// Walkable ground.
    Floor,
    /// Walkable crossing laid over water.
    Bridge,
}

impl TileKind {
    /// Reports whether units may stand on the tile.
    #[must_use]
    pub const fn is_walkable(self) -> bool {
        matches!(self, Self::Floor | Self::Bridge)
    }

    /// Parses the single-character map notation (`~` water, `.` floor, `=` bridge).
    #[must_use]
    pub const fn from_symbol(symbol: char) -> Option<Self> {
        match symbol {
            '~' => Some(Self::Water),
            '.' => Some(Self::Floor),
            '=' => Some(Self::Bridge),
            _ => None,
        }
    }
}

/// Reasons a textual map description may be rejected.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum MapError {
    /// The description contained no tiles.
    #[error("map contains no tiles")]
    Empty,
    /// A row's length differs from the first row.
    #[error("row {row} has {found} tiles, expected {expected}")]
    Ragged {
        /// Zero-based index of the offending row.
        row: usize,
        /// Number of tiles found in the row.
        found: usize,
        /// Number of tiles in the first row.
        expected: usize,
    },
    /// A character does not name a tile kind.
    #[error("unknown tile symbol {symbol:?} at ({x}, {y})")]
    UnknownSymbol {
        /// Character that failed to parse.
        symbol: char,
        /// Column of the character.
        x: usize,
        /// Row of the character.
        y: usize,
    },
}

/// Immutable tile layout of the battlefield stored in row-major order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileMap {
    width: u32,
    height: u32,
    tiles: Vec<TileKind>,
}

impl TileMap {
    /// Creates a map of the provided dimensions filled with a single kind.
    #[must_use]
    pub fn filled(width: u32, height: u32, kind: TileKind) -> Self {
        let count = usize::try_from(u64::from(width) * u64::from(height)).unwrap_or(0);
        Self {
            width,
            height,
            tiles: vec![kind; count],
        }
    }

    /// Parses a map from rows of tile symbols; row zero is the top edge.
    pub fn from_rows<S: AsRef<str>>(rows: &[S]) -> Result<Self, MapError> {
        let expected = rows.first().map_or(0, |row| row.as_ref().chars().count());
        if expected == 0 {
            return Err(MapError::Empty);
        }

        let mut tiles = Vec::with_capacity(expected * rows.len());
        for (y, row) in rows.iter().enumerate() {
            let row = row.as_ref();
            let found = row.chars().count();
            if found != expected {
                return Err(MapError::Ragged {
                    row: y,
                    found,
                    expected,
                });
            }
            for (x, symbol) in row.chars().enumerate() {
                let kind =
                    TileKind::from_symbol(symbol).ok_or(MapError::UnknownSymbol { symbol, x, y })?;
                tiles.push(kind);
            }
        }

        Ok(Self {
            width: u32::try_from(expected).unwrap_or(u32::MAX),
            height: u32::try_from(rows.len()).unwrap_or(u32::MAX),
            tiles,
        })
    }

    /// Number of tile columns.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Number of tile rows.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Kind of the tile at the provided coordinate, if it lies on the map.
    #[must_use]
    pub fn tile(&self, pos: TilePos) -> Option<TileKind> {
        self.index(pos).and_then(|index| self.tiles.get(index).copied())
    }

    /// Reports whether a continuous position lies within the map bounds.
    #[must_use]
    pub fn contains(&self, position: Vec2) -> bool {
        position.is_finite()
            && position.x >= 0.0
            && position.y >= 0.0
            && position.x < self.width as f32
            && position.y < self.height as f32
    }

    /// Clamps a continuous position into the map bounds.
    #[must_use]
    pub fn clamp(&self, position: Vec2) -> Vec2 {
        let max_x = (self.width as f32 - EPSILON).max(0.0);
        let max_y = (self.height as f32 - EPSILON).max(0.0);
        Vec2::new(position.x.clamp(0.0, max_x), position.y.clamp(0.0, max_y))
    }

    /// Iterates every tile coordinate together with its kind in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = (TilePos, TileKind)> + '_ {
        let width = self.width.max(1) as usize;
        self.tiles.iter().enumerate().map(move |(index, kind)| {
            let x = (index % width) as i32;
            let y = (index / width) as i32;
            (TilePos::new(x, y), *kind)
        })
    }

    fn index(&self, pos: TilePos) -> Option<usize> {
        let x = u32::try_from(pos.x).ok()?;
        let y = u32::try_from(pos.y).ok()?;
        if x >= self.width || y >= self.height {
            return None;
        }
        let width = usize::try_from(self.width).ok()?;
        usize::try_from(y)
            .ok()?
            .checked_mul(width)?
            .checked_add(usize::try_from(x).ok()?)
    }
}

/// Elemental modifier carried by a unit.
///
/// Water beats Fire, Fire beats Nature, and Nature beats Water. Neutral
/// neither beats nor is beaten by anything.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Element {
    /// No elemental affinity.
    #[default]
    Neutral,
    /// Fire affinity.
    Fire,
    /// Water affinity.
    Water,
    /// Nature affinity.
    Nature,
}

impl Element {
    /// Reports whether this element has the advantage over `other`.
    #[must_use]
    pub const fn beats(self, other: Element) -> bool {
        matches!(
            (self, other),
            (Self::Water, Self::Fire) | (Self::Fire, Self::Nature) | (Self::Nature, Self::Water)
        )
    }
}

/// Sub-type of a unit, used for predation and presentation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum UnitKind {
    /// Melee infantry.
    Soldier,
    /// Ranged infantry.
    Archer,
    /// Heavy melee unit.
    Brute,
    /// Pack predator.
    Wolf,
    /// Large predator.
    Bear,
    /// Grazing prey.
    Deer,
    /// Small prey.
    Rabbit,
    /// Domesticated prey.
    Sheep,
}

/// Behavior strategy bound to a unit permanently at spawn time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ArchetypeTag {
    /// Wanders and flees from threats.
    Passive,
    /// Faction combatant that hunts enemy units and structures.
    Aggressive,
    /// Predator that hunts any unit of a different sub-type.
    WildAnimal,
    /// Does nothing; the fallback for units without a registered strategy.
    Inert,
}

/// Current node of a unit's behavior state machine.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BehaviorState {
    /// Waiting or scanning for something to do.
    #[default]
    Idle,
    /// Walking toward a randomly selected nearby tile.
    Wandering,
    /// Running away from a threat.
    Fleeing,
    /// Pursuing an enemy unit.
    Chasing,
    /// Attacking an enemy unit within range.
    Attacking,
    /// Approaching or attacking a stationary structure.
    AttackingStructure,
    /// Health reached zero; awaiting removal.
    Dead,
}

/// Kind of a structure placed on the map.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StructureKind {
    /// Main base; its destruction decides the match.
    Castle,
    /// Defensive tower.
    Tower,
    /// Plain obstacle.
    Wall,
}

/// Stat block supplied with a spawn request.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct UnitStats {
    /// Starting and maximum health.
    pub health: u32,
    /// Distance travelled per tick, in tiles.
    pub move_speed: f32,
    /// Collision radius, in tiles.
    pub radius: f32,
    /// Resistance to knockback.
    pub weight: f32,
    /// Knockback strength applied to targets.
    pub power: f32,
    /// Elemental modifier applied to outgoing and incoming damage.
    pub element: Element,
    /// Raw damage dealt per attack before elemental adjustment.
    pub attack_damage: u32,
    /// Surface distance within which attacks connect.
    pub attack_range: f32,
    /// Minimum ticks between two attacks.
    pub attack_cooldown: u64,
}

impl UnitStats {
    /// Checks the stat block's invariants.
    pub fn validate(&self) -> Result<(), SpawnError> {
        let positive = |value: f32| value.is_finite() && value > 0.0;
        if self.health == 0
            || !positive(self.move_speed)
            || !positive(self.radius)
            || !positive(self.weight)
            || !self.power.is_finite()
            || self.power < 0.0
            || !self.attack_range.is_finite()
            || self.attack_range < 0.0
        {
            return Err(SpawnError::InvalidStats);
        }
        Ok(())
    }
}

/// Publicly observable record of a unit.
#[derive(Clone, Debug, PartialEq)]
pub struct Unit {
    /// Identifier allocated by the world.
    pub id: UnitId,
    /// Faction owning the unit.
    pub owner: FactionId,
    /// Strategy bound at spawn; never changes afterwards.
    pub archetype: ArchetypeTag,
    /// Sub-type of the unit.
    pub kind: UnitKind,
    /// Continuous position, always within the map bounds.
    pub position: Vec2,
    /// Current movement target, if any.
    pub target: Option<Vec2>,
    /// Remaining health.
    pub health: u32,
    /// Health the unit spawned with.
    pub max_health: u32,
    /// Stat block supplied at spawn.
    pub stats: UnitStats,
    /// Active behavior state.
    pub state: BehaviorState,
}

impl Unit {
    /// Reports whether the unit still has health remaining.
    #[must_use]
    pub const fn is_alive(&self) -> bool {
        self.health > 0
    }

    /// Collision radius of the unit.
    #[must_use]
    pub const fn radius(&self) -> f32 {
        self.stats.radius
    }
}

/// Publicly observable record of a structure.
#[derive(Clone, Debug, PartialEq)]
pub struct Structure {
    /// Identifier allocated by the world.
    pub id: StructureId,
    /// Faction owning the structure.
    pub owner: FactionId,
    /// Kind of the structure.
    pub kind: StructureKind,
    /// Centre of the structure's collision shape.
    pub position: Vec2,
    /// Collision footprint.
    pub shape: Shape,
    /// Remaining health.
    pub health: u32,
    /// Health the structure was placed with.
    pub max_health: u32,
}

impl Structure {
    /// Reports whether the structure was destroyed.
    #[must_use]
    pub const fn is_destroyed(&self) -> bool {
        self.health == 0
    }

    /// Edge-to-edge distance between the structure and a circle.
    #[must_use]
    pub fn surface_distance(&self, point: Vec2, radius: f32) -> f32 {
        self.shape.surface_distance(self.position, point, radius)
    }
}

/// External request to add a unit to the world.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpawnRequest {
    /// Faction owning the new unit.
    pub owner: FactionId,
    /// Strategy the unit is bound to.
    pub archetype: ArchetypeTag,
    /// Sub-type of the unit.
    pub kind: UnitKind,
    /// Initial position.
    pub position: Vec2,
    /// Stat block.
    pub stats: UnitStats,
}

/// Reasons a spawn request may be rejected by the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Error)]
pub enum SpawnError {
    /// The requested position lies outside the map.
    #[error("spawn position lies outside the map")]
    OutOfBounds,
    /// The requested position is blocked for the unit's radius.
    #[error("spawn position is not walkable")]
    Unwalkable,
    /// The stat block violates its invariants.
    #[error("stat block is invalid")]
    InvalidStats,
}

/// Commands that express all permissible external world mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Replaces the tile map and clears every unit and structure.
    LoadMap {
        /// New tile layout.
        map: TileMap,
    },
    /// Requests that a unit be added to the world.
    SpawnUnit {
        /// Description of the unit to create.
        request: SpawnRequest,
    },
    /// Requests placement of a structure.
    PlaceStructure {
        /// Faction owning the structure.
        owner: FactionId,
        /// Kind of the structure.
        kind: StructureKind,
        /// Centre of the collision shape.
        position: Vec2,
        /// Collision footprint.
        shape: Shape,
        /// Starting health.
        health: u32,
    },
    /// Requests removal of an existing structure.
    RemoveStructure {
        /// Identifier of the structure to remove.
        structure: StructureId,
    },
    /// Applies external damage to a unit.
    DamageUnit {
        /// Unit receiving the damage.
        unit: UnitId,
        /// Amount of health removed.
        amount: u32,
    },
}

/// Events broadcast by the world and the simulation step.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Confirms that a new tile map was loaded.
    MapLoaded {
        /// Number of tile columns.
        width: u32,
        /// Number of tile rows.
        height: u32,
    },
    /// Indicates that a new simulation tick began.
    TickStarted {
        /// Index of the tick.
        tick: u64,
    },
    /// Confirms that a unit was created.
    UnitSpawned {
        /// Identifier assigned to the unit.
        unit: UnitId,
        /// Faction owning the unit.
        owner: FactionId,
        /// Strategy the unit is bound to.
        archetype: ArchetypeTag,
        /// Position the unit occupies.
        position: Vec2,
    },
    /// Reports that a spawn request was rejected.
    SpawnRejected {
        /// Faction that requested the spawn.
        owner: FactionId,
        /// Specific reason the spawn failed.
        reason: SpawnError,
    },
    /// Confirms that a unit changed position.
    UnitMoved {
        /// Unit that moved.
        unit: UnitId,
        /// Position before the move.
        from: Vec2,
        /// Position after the move.
        to: Vec2,
    },
    /// Confirms that a unit's behavior state changed.
    UnitStateChanged {
        /// Unit whose state changed.
        unit: UnitId,
        /// Previous state.
        from: BehaviorState,
        /// New state.
        to: BehaviorState,
    },
    /// Reports that a unit lost health.
    UnitDamaged {
        /// Unit that lost health.
        unit: UnitId,
        /// Attacking unit, or `None` for external damage.
        attacker: Option<UnitId>,
        /// Health removed.
        amount: u32,
        /// Health remaining afterwards.
        remaining: u32,
    },
    /// Reports that a unit's health reached zero.
    UnitKilled {
        /// Unit that died.
        unit: UnitId,
        /// Unit that dealt the final blow, if any.
        killer: Option<UnitId>,
    },
    /// Reports that a unit was pushed by an attack.
    UnitKnockedBack {
        /// Unit that was pushed.
        unit: UnitId,
        /// Position before the push.
        from: Vec2,
        /// Position after the push.
        to: Vec2,
    },
    /// Confirms that a dead unit was removed from the world.
    UnitRemoved {
        /// Unit that was removed.
        unit: UnitId,
    },
    /// Confirms that a structure was placed.
    StructurePlaced {
        /// Identifier assigned to the structure.
        structure: StructureId,
        /// Faction owning the structure.
        owner: FactionId,
    },
    /// Confirms that a structure was removed.
    StructureRemoved {
        /// Structure that was removed.
        structure: StructureId,
    },
    /// Reports that a structure removal request named an unknown structure.
    StructureRemovalRejected {
        /// Identifier supplied in the request.
        structure: StructureId,
    },
    /// Reports that a structure lost health.
    StructureDamaged {
        /// Structure that lost health.
        structure: StructureId,
        /// Attacking unit.
        attacker: UnitId,
        /// Health removed.
        amount: u32,
        /// Health remaining afterwards.
        remaining: u32,
    },
    /// Reports that a structure's health reached zero.
    StructureDestroyed {
        /// Structure that was destroyed.
        structure: StructureId,
        /// Faction that owned the structure.
        owner: FactionId,
    },
}

/// Swappable source of randomness consumed by tick logic.
///
/// Implementations must be deterministic for a given seed so runs can be
/// replayed.
pub trait RandomSource: std::fmt::Debug {
    /// Produces the next raw 32-bit value.
    fn next_u32(&mut self) -> u32;

    /// Produces a value in `0..bound`; a zero bound yields zero.
    fn below(&mut self, bound: u32) -> u32 {
        if bound == 0 {
            return 0;
        }
        self.next_u32() % bound
    }
}

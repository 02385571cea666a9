#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative world state management for the Skirmish simulation.
//!
//! External collaborators mutate the world exclusively through [`apply`].
//! The simulation step borrows the world mutably for the duration of a tick
//! and edits unit and structure records in place through the accessors on
//! [`World`]; everything else reads through the [`query`] module.

pub mod collision;

use skirmish_core::{
    Command, Event, FactionId, Shape, SpawnError, SpawnRequest, Structure, StructureId,
    StructureKind, TileKind, TileMap, Unit, UnitId, Vec2,
};
use tracing::{info, warn};

pub use collision::{BlockReason, CollisionOracle, Neighbors, Walkability};

const DEFAULT_MAP_WIDTH: u32 = 16;
const DEFAULT_MAP_HEIGHT: u32 = 16;

/// Represents the authoritative battlefield state.
#[derive(Debug)]
pub struct World {
    map: TileMap,
    units: Vec<Unit>,
    structures: Vec<Structure>,
    next_unit_id: u32,
    next_structure_id: u32,
    tick: u64,
}

impl World {
    /// Creates an empty world over an all-floor default map.
    #[must_use]
    pub fn new() -> Self {
        Self::with_map(TileMap::filled(
            DEFAULT_MAP_WIDTH,
            DEFAULT_MAP_HEIGHT,
            TileKind::Floor,
        ))
    }

    /// Creates an empty world over the provided map.
    #[must_use]
    pub fn with_map(map: TileMap) -> Self {
        Self {
            map,
            units: Vec::new(),
            structures: Vec::new(),
            next_unit_id: 0,
            next_structure_id: 0,
            tick: 0,
        }
    }

    /// Index of the most recently started tick.
    #[must_use]
    pub const fn tick(&self) -> u64 {
        self.tick
    }

    /// Starts the next tick and returns its index.
    pub fn advance_tick(&mut self) -> u64 {
        self.tick = self.tick.saturating_add(1);
        self.tick
    }

    /// Tile layout of the battlefield.
    #[must_use]
    pub const fn map(&self) -> &TileMap {
        &self.map
    }

    /// Units in ascending identifier order, which is the dispatch order.
    #[must_use]
    pub fn units(&self) -> &[Unit] {
        &self.units
    }

    /// Structures in ascending identifier order.
    #[must_use]
    pub fn structures(&self) -> &[Structure] {
        &self.structures
    }

    /// Collision oracle over the current map and structures.
    #[must_use]
    pub fn oracle(&self) -> CollisionOracle<'_> {
        CollisionOracle::new(&self.map, &self.structures)
    }

    /// Looks up a unit by identifier.
    #[must_use]
    pub fn unit(&self, id: UnitId) -> Option<&Unit> {
        self.unit_index(id).map(|index| &self.units[index])
    }

    /// Mutable access to a unit for the simulation step.
    pub fn unit_mut(&mut self, id: UnitId) -> Option<&mut Unit> {
        self.unit_index(id).map(move |index| &mut self.units[index])
    }

    /// Mutable access to two distinct units at once.
    pub fn unit_pair_mut(&mut self, first: UnitId, second: UnitId) -> Option<(&mut Unit, &mut Unit)> {
        let first_index = self.unit_index(first)?;
        let second_index = self.unit_index(second)?;
        if first_index == second_index {
            return None;
        }

        if first_index < second_index {
            let (head, tail) = self.units.split_at_mut(second_index);
            Some((&mut head[first_index], &mut tail[0]))
        } else {
            let (head, tail) = self.units.split_at_mut(first_index);
            Some((&mut tail[0], &mut head[second_index]))
        }
    }

    /// Permanently removes a unit, returning its final record.
    pub fn remove_unit(&mut self, id: UnitId) -> Option<Unit> {
        self.unit_index(id).map(|index| self.units.remove(index))
    }

    /// Looks up a structure by identifier.
    #[must_use]
    pub fn structure(&self, id: StructureId) -> Option<&Structure> {
        self.structure_index(id).map(|index| &self.structures[index])
    }

    /// Mutable access to a structure for the simulation step.
    pub fn structure_mut(&mut self, id: StructureId) -> Option<&mut Structure> {
        self.structure_index(id)
            .map(move |index| &mut self.structures[index])
    }

    /// Mutable access to a unit and a structure at once.
    pub fn unit_and_structure_mut(
        &mut self,
        unit: UnitId,
        structure: StructureId,
    ) -> Option<(&mut Unit, &mut Structure)> {
        let unit_index = self.unit_index(unit)?;
        let structure_index = self.structure_index(structure)?;
        Some((
            &mut self.units[unit_index],
            &mut self.structures[structure_index],
        ))
    }

    fn unit_index(&self, id: UnitId) -> Option<usize> {
        self.units.binary_search_by_key(&id, |unit| unit.id).ok()
    }

    fn structure_index(&self, id: StructureId) -> Option<usize> {
        self.structures
            .binary_search_by_key(&id, |structure| structure.id)
            .ok()
    }

    fn spawn(&mut self, request: SpawnRequest) -> Result<UnitId, SpawnError> {
        request.stats.validate()?;

        if !self.map.contains(request.position) {
            return Err(SpawnError::OutOfBounds);
        }

        if !self
            .oracle()
            .is_walkable(request.position, request.stats.radius, None)
            .walkable
        {
            return Err(SpawnError::Unwalkable);
        }

        let id = UnitId::new(self.next_unit_id);
        self.next_unit_id = self.next_unit_id.saturating_add(1);
        self.units.push(Unit {
            id,
            owner: request.owner,
            archetype: request.archetype,
            kind: request.kind,
            position: request.position,
            target: None,
            health: request.stats.health,
            max_health: request.stats.health,
            stats: request.stats,
            state: skirmish_core::BehaviorState::Idle,
        });
        Ok(id)
    }

    fn place_structure(
        &mut self,
        owner: FactionId,
        kind: StructureKind,
        position: Vec2,
        shape: Shape,
        health: u32,
    ) -> StructureId {
        let id = StructureId::new(self.next_structure_id);
        self.next_structure_id = self.next_structure_id.saturating_add(1);
        self.structures.push(Structure {
            id,
            owner,
            kind,
            position,
            shape,
            health,
            max_health: health,
        });
        id
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

/// Applies the provided command to the world, mutating state deterministically.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::LoadMap { map } => {
            let (width, height) = (map.width(), map.height());
            *world = World::with_map(map);
            info!(width, height, "map loaded");
            out_events.push(Event::MapLoaded { width, height });
        }
        Command::SpawnUnit { request } => match world.spawn(request) {
            Ok(unit) => out_events.push(Event::UnitSpawned {
                unit,
                owner: request.owner,
                archetype: request.archetype,
                position: request.position,
            }),
            Err(reason) => {
                warn!(owner = request.owner.get(), %reason, "spawn rejected");
                out_events.push(Event::SpawnRejected {
                    owner: request.owner,
                    reason,
                });
            }
        },
        Command::PlaceStructure {
            owner,
            kind,
            position,
            shape,
            health,
        } => {
            let structure = world.place_structure(owner, kind, position, shape, health);
            out_events.push(Event::StructurePlaced { structure, owner });
        }
        Command::RemoveStructure { structure } => match world.structure_index(structure) {
            Some(index) => {
                let _ = world.structures.remove(index);
                out_events.push(Event::StructureRemoved { structure });
            }
            None => out_events.push(Event::StructureRemovalRejected { structure }),
        },
        Command::DamageUnit { unit, amount } => {
            let Some(record) = world.unit_mut(unit) else {
                return;
            };
            if !record.is_alive() {
                return;
            }
            let dealt = amount.min(record.health);
            record.health -= dealt;
            let remaining = record.health;
            out_events.push(Event::UnitDamaged {
                unit,
                attacker: None,
                amount: dealt,
                remaining,
            });
            if remaining == 0 {
                out_events.push(Event::UnitKilled { unit, killer: None });
            }
        }
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use serde::Serialize;
    use skirmish_core::{
        ArchetypeTag, BehaviorState, FactionId, StructureId, TileMap, Unit, UnitId, UnitKind,
        Vec2,
    };

    use super::World;

    /// Provides read-only access to the battlefield's tile layout.
    #[must_use]
    pub fn map(world: &World) -> &TileMap {
        world.map()
    }

    /// Index of the most recently started tick.
    #[must_use]
    pub fn tick(world: &World) -> u64 {
        world.tick()
    }

    /// Provides read-only access to every unit, dead or alive.
    #[must_use]
    pub fn units(world: &World) -> &[Unit] {
        world.units()
    }

    /// Identifiers of living units in dispatch order.
    #[must_use]
    pub fn living_unit_ids(world: &World) -> Vec<UnitId> {
        world
            .units()
            .iter()
            .filter(|unit| unit.is_alive())
            .map(|unit| unit.id)
            .collect()
    }

    /// Captures the observable state of every unit and structure.
    #[must_use]
    pub fn snapshot(world: &World) -> WorldSnapshot {
        WorldSnapshot {
            tick: world.tick(),
            units: world
                .units()
                .iter()
                .map(|unit| UnitSnapshot {
                    id: unit.id,
                    owner: unit.owner,
                    archetype: unit.archetype,
                    kind: unit.kind,
                    position: unit.position,
                    target: unit.target,
                    health: unit.health,
                    state: unit.state,
                })
                .collect(),
            structures: world
                .structures()
                .iter()
                .map(|structure| StructureSnapshot {
                    id: structure.id,
                    owner: structure.owner,
                    health: structure.health,
                })
                .collect(),
        }
    }

    /// Observable state of the whole world at the end of a tick.
    #[derive(Clone, Debug, PartialEq, Serialize)]
    pub struct WorldSnapshot {
        /// Tick the snapshot was captured after.
        pub tick: u64,
        /// Units in ascending identifier order.
        pub units: Vec<UnitSnapshot>,
        /// Structures in ascending identifier order.
        pub structures: Vec<StructureSnapshot>,
    }

    /// Observable state of a single unit.
    #[derive(Clone, Copy, Debug, PartialEq, Serialize)]
    pub struct UnitSnapshot {
        /// Identifier of the unit.
        pub id: UnitId,
        /// Faction owning the unit.
        pub owner: FactionId,
        /// Strategy bound to the unit.
        pub archetype: ArchetypeTag,
        /// Sub-type of the unit.
        pub kind: UnitKind,
        /// Continuous position.
        pub position: Vec2,
        /// Current movement target.
        pub target: Option<Vec2>,
        /// Remaining health.
        pub health: u32,
        /// Active behavior state.
        pub state: BehaviorState,
    }

    /// Observable state of a single structure.
    #[derive(Clone, Copy, Debug, PartialEq, Serialize)]
    pub struct StructureSnapshot {
        /// Identifier of the structure.
        pub id: StructureId,
        /// Faction owning the structure.
        pub owner: FactionId,
        /// Remaining health.
        pub health: u32,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skirmish_core::{ArchetypeTag, Element, UnitKind, UnitStats};

    fn stats() -> UnitStats {
        UnitStats {
            health: 10,
            move_speed: 0.25,
            radius: 0.3,
            weight: 1.0,
            power: 1.0,
            element: Element::Neutral,
            attack_damage: 2,
            attack_range: 0.3,
            attack_cooldown: 10,
        }
    }

    fn spawn_request(position: Vec2) -> SpawnRequest {
        SpawnRequest {
            owner: FactionId::new(1),
            archetype: ArchetypeTag::Aggressive,
            kind: UnitKind::Soldier,
            position,
            stats: stats(),
        }
    }

    #[test]
    fn spawn_allocates_ascending_identifiers() {
        let mut world = World::new();
        let mut events = Vec::new();

        apply(
            &mut world,
            Command::SpawnUnit {
                request: spawn_request(Vec2::new(1.5, 1.5)),
            },
            &mut events,
        );
        apply(
            &mut world,
            Command::SpawnUnit {
                request: spawn_request(Vec2::new(2.5, 1.5)),
            },
            &mut events,
        );

        let ids: Vec<_> = world.units().iter().map(|unit| unit.id).collect();
        assert_eq!(ids, vec![UnitId::new(0), UnitId::new(1)]);
        assert!(world
            .units()
            .iter()
            .all(|unit| unit.state == skirmish_core::BehaviorState::Idle));
        assert_eq!(events.len(), 2);
    }

    #[test]
    fn spawn_on_water_is_rejected() {
        let map = TileMap::from_rows(&["..", "~~"]).expect("valid map");
        let mut world = World::with_map(map);
        let mut events = Vec::new();

        apply(
            &mut world,
            Command::SpawnUnit {
                request: spawn_request(Vec2::new(0.5, 1.5)),
            },
            &mut events,
        );

        assert!(world.units().is_empty());
        assert_eq!(
            events,
            vec![Event::SpawnRejected {
                owner: FactionId::new(1),
                reason: SpawnError::Unwalkable,
            }]
        );
    }

    #[test]
    fn spawn_outside_map_is_rejected() {
        let mut world = World::new();
        let mut events = Vec::new();

        apply(
            &mut world,
            Command::SpawnUnit {
                request: spawn_request(Vec2::new(-1.0, 3.0)),
            },
            &mut events,
        );

        assert!(matches!(
            events.as_slice(),
            [Event::SpawnRejected {
                reason: SpawnError::OutOfBounds,
                ..
            }]
        ));
    }

    #[test]
    fn load_map_resets_world() {
        let mut world = World::new();
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::SpawnUnit {
                request: spawn_request(Vec2::new(1.5, 1.5)),
            },
            &mut events,
        );
        let _ = world.advance_tick();

        apply(
            &mut world,
            Command::LoadMap {
                map: TileMap::filled(5, 4, TileKind::Floor),
            },
            &mut events,
        );

        assert!(world.units().is_empty());
        assert_eq!(world.tick(), 0);
        assert_eq!(world.map().width(), 5);
        assert_eq!(events.last(), Some(&Event::MapLoaded { width: 5, height: 4 }));
    }

    #[test]
    fn external_damage_floors_at_zero_and_reports_kill() {
        let mut world = World::new();
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::SpawnUnit {
                request: spawn_request(Vec2::new(1.5, 1.5)),
            },
            &mut events,
        );
        events.clear();

        apply(
            &mut world,
            Command::DamageUnit {
                unit: UnitId::new(0),
                amount: 50,
            },
            &mut events,
        );

        assert_eq!(world.unit(UnitId::new(0)).map(|unit| unit.health), Some(0));
        assert_eq!(
            events,
            vec![
                Event::UnitDamaged {
                    unit: UnitId::new(0),
                    attacker: None,
                    amount: 10,
                    remaining: 0,
                },
                Event::UnitKilled {
                    unit: UnitId::new(0),
                    killer: None,
                },
            ]
        );
    }

    #[test]
    fn structure_removal_reports_unknown_identifiers() {
        let mut world = World::new();
        let mut events = Vec::new();

        apply(
            &mut world,
            Command::PlaceStructure {
                owner: FactionId::new(2),
                kind: StructureKind::Castle,
                position: Vec2::new(8.0, 8.0),
                shape: Shape::Circle { radius: 1.5 },
                health: 100,
            },
            &mut events,
        );
        apply(
            &mut world,
            Command::RemoveStructure {
                structure: StructureId::new(7),
            },
            &mut events,
        );
        apply(
            &mut world,
            Command::RemoveStructure {
                structure: StructureId::new(0),
            },
            &mut events,
        );

        assert_eq!(
            events,
            vec![
                Event::StructurePlaced {
                    structure: StructureId::new(0),
                    owner: FactionId::new(2),
                },
                Event::StructureRemovalRejected {
                    structure: StructureId::new(7),
                },
                Event::StructureRemoved {
                    structure: StructureId::new(0),
                },
            ]
        );
        assert!(world.structures().is_empty());
    }

    #[test]
    fn unit_pair_mut_returns_requested_order() {
        let mut world = World::new();
        let mut events = Vec::new();
        for x in [1.5, 3.5, 5.5] {
            apply(
                &mut world,
                Command::SpawnUnit {
                    request: spawn_request(Vec2::new(x, 1.5)),
                },
                &mut events,
            );
        }

        let (first, second) = world
            .unit_pair_mut(UnitId::new(2), UnitId::new(0))
            .expect("distinct units");
        assert_eq!(first.id, UnitId::new(2));
        assert_eq!(second.id, UnitId::new(0));
        assert!(world.unit_pair_mut(UnitId::new(1), UnitId::new(1)).is_none());
    }

    #[test]
    fn snapshot_lists_units_in_identifier_order() {
        let mut world = World::new();
        let mut events = Vec::new();
        for x in [4.5, 2.5] {
            apply(
                &mut world,
                Command::SpawnUnit {
                    request: spawn_request(Vec2::new(x, 1.5)),
                },
                &mut events,
            );
        }

        let snapshot = query::snapshot(&world);
        assert_eq!(snapshot.units.len(), 2);
        assert!(snapshot.units[0].id < snapshot.units[1].id);
        assert_eq!(query::living_unit_ids(&world).len(), 2);
    }
}

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use skirmish_core::{
    ArchetypeTag, Command, Element, Event, FactionId, Shape, SimulationConfig, SpawnRequest,
    StructureKind, TileMap, UnitKind, UnitStats, Vec2,
};
use skirmish_system_coordinator::Coordinator;
use skirmish_world::{apply, query, World};

const TICKS: u64 = 240;

fn battlefield() -> TileMap {
    TileMap::from_rows(&[
        "........................",
        "........................",
        "..........~~~~..........",
        "..........~~~~..........",
        "..........~~~~..........",
        "..........=...........~~",
        "..........~~~~........~~",
        "..........~~~~..........",
        "..........~~~~..........",
        "........................",
        "........................",
        "........................",
    ])
    .expect("valid map")
}

fn stats(element: Element, attack_cooldown: u64) -> UnitStats {
    UnitStats {
        health: 12,
        move_speed: 0.25,
        radius: 0.3,
        weight: 1.0,
        power: 1.5,
        element,
        attack_damage: 2,
        attack_range: 0.6,
        attack_cooldown,
    }
}

fn scenario() -> Vec<Command> {
    let unit = |owner: u32, archetype, kind, x: f32, y: f32, element| Command::SpawnUnit {
        request: SpawnRequest {
            owner: FactionId::new(owner),
            archetype,
            kind,
            position: Vec2::new(x, y),
            stats: stats(element, 6),
        },
    };
    vec![
        Command::PlaceStructure {
            owner: FactionId::new(1),
            kind: StructureKind::Castle,
            position: Vec2::new(19.5, 9.5),
            shape: Shape::Rect {
                half_width: 1.0,
                half_height: 1.0,
            },
            health: 30,
        },
        Command::PlaceStructure {
            owner: FactionId::new(0),
            kind: StructureKind::Tower,
            position: Vec2::new(3.5, 9.5),
            shape: Shape::Circle { radius: 0.8 },
            health: 20,
        },
        unit(0, ArchetypeTag::Aggressive, UnitKind::Soldier, 2.5, 2.5, Element::Fire),
        unit(0, ArchetypeTag::Aggressive, UnitKind::Archer, 2.5, 4.5, Element::Water),
        unit(0, ArchetypeTag::Aggressive, UnitKind::Brute, 4.5, 3.5, Element::Nature),
        unit(1, ArchetypeTag::Aggressive, UnitKind::Soldier, 20.5, 2.5, Element::Water),
        unit(1, ArchetypeTag::Aggressive, UnitKind::Archer, 21.5, 3.5, Element::Neutral),
        unit(2, ArchetypeTag::WildAnimal, UnitKind::Wolf, 12.5, 10.5, Element::Neutral),
        unit(2, ArchetypeTag::WildAnimal, UnitKind::Bear, 8.5, 0.5, Element::Nature),
        unit(3, ArchetypeTag::Passive, UnitKind::Sheep, 14.5, 9.5, Element::Neutral),
        unit(3, ArchetypeTag::Passive, UnitKind::Deer, 7.5, 8.5, Element::Neutral),
        unit(3, ArchetypeTag::Passive, UnitKind::Rabbit, 16.5, 0.5, Element::Neutral),
    ]
}

struct Replay {
    events: Vec<Event>,
    fingerprints: Vec<u64>,
    world: World,
}

fn run(seed: u64) -> Replay {
    let mut world = World::with_map(battlefield());
    let mut coordinator = Coordinator::new(SimulationConfig::default(), seed);
    let mut events = Vec::new();
    for command in scenario() {
        let mut applied = Vec::new();
        apply(&mut world, command, &mut applied);
        assert!(
            !applied
                .iter()
                .any(|event| matches!(event, Event::SpawnRejected { .. })),
            "scenario spawn rejected: {applied:?}"
        );
        coordinator.observe(&applied);
        events.extend(applied);
    }

    let mut fingerprints = Vec::new();
    for _ in 0..TICKS {
        coordinator.step(&mut world, &mut events);
        fingerprints.push(fingerprint(&world));
    }
    Replay {
        events,
        fingerprints,
        world,
    }
}

fn fingerprint(world: &World) -> u64 {
    let snapshot = query::snapshot(world);
    let mut hasher = DefaultHasher::new();
    snapshot.tick.hash(&mut hasher);
    for unit in &snapshot.units {
        unit.id.hash(&mut hasher);
        unit.position.x.to_bits().hash(&mut hasher);
        unit.position.y.to_bits().hash(&mut hasher);
        unit.health.hash(&mut hasher);
        format!("{:?}", unit.state).hash(&mut hasher);
        unit.target
            .map(|target| (target.x.to_bits(), target.y.to_bits()))
            .hash(&mut hasher);
    }
    for structure in &snapshot.structures {
        structure.id.hash(&mut hasher);
        structure.health.hash(&mut hasher);
    }
    hasher.finish()
}

#[test]
fn identical_seeds_replay_identically() {
    let first = run(42);
    let second = run(42);

    assert_eq!(first.fingerprints, second.fingerprints);
    assert_eq!(first.events, second.events);
    assert_eq!(query::snapshot(&first.world), query::snapshot(&second.world));
}

#[test]
fn replay_keeps_every_living_unit_on_walkable_ground() {
    let replay = run(7);
    let oracle = replay.world.oracle();
    for unit in replay.world.units().iter().filter(|unit| unit.is_alive()) {
        assert!(
            oracle.is_walkable(unit.position, unit.radius(), None).walkable,
            "unit {} stranded at {:?}",
            unit.id.get(),
            unit.position
        );
    }
}

#[test]
fn replay_produces_activity() {
    let replay = run(42);
    let moved = replay
        .events
        .iter()
        .filter(|event| matches!(event, Event::UnitMoved { .. }))
        .count();
    assert!(moved > 0);
    assert_eq!(replay.fingerprints.len() as u64, TICKS);
}

//! End-of-run summary printed by the headless runner.

use std::{
    collections::{hash_map::DefaultHasher, BTreeMap},
    fmt,
    hash::{Hash, Hasher},
};

use skirmish_core::{Event, FactionId};
use skirmish_world::{query, World};

/// Aggregated outcome of a simulation run.
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct Summary {
    ticks: u64,
    living: BTreeMap<FactionId, usize>,
    states: BTreeMap<String, usize>,
    kills: usize,
    knockbacks: usize,
    destroyed: Vec<(u32, u32)>,
    rejected_spawns: usize,
    fingerprint: u64,
}

impl Summary {
    /// Builds the summary from the final world and every event of the run.
    pub(crate) fn collect(world: &World, events: &[Event]) -> Self {
        let mut summary = Self {
            ticks: query::tick(world),
            fingerprint: fingerprint(world),
            ..Self::default()
        };

        for unit in query::units(world).iter().filter(|unit| unit.is_alive()) {
            *summary.living.entry(unit.owner).or_default() += 1;
            *summary
                .states
                .entry(format!("{:?}", unit.state))
                .or_default() += 1;
        }

        for event in events {
            match event {
                Event::UnitKilled { .. } => summary.kills += 1,
                Event::UnitKnockedBack { .. } => summary.knockbacks += 1,
                Event::StructureDestroyed { structure, owner } => {
                    summary.destroyed.push((structure.get(), owner.get()));
                }
                Event::SpawnRejected { .. } => summary.rejected_spawns += 1,
                _ => {}
            }
        }
        summary
    }

    /// Replay fingerprint of the final world state.
    pub(crate) const fn fingerprint(&self) -> u64 {
        self.fingerprint
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "ticks simulated: {}", self.ticks)?;
        for (owner, count) in &self.living {
            writeln!(f, "faction {}: {count} living", owner.get())?;
        }
        for (state, count) in &self.states {
            writeln!(f, "  {state}: {count}")?;
        }
        writeln!(f, "kills: {}", self.kills)?;
        writeln!(f, "knockbacks: {}", self.knockbacks)?;
        for (structure, owner) in &self.destroyed {
            writeln!(f, "structure {structure} of faction {owner} destroyed")?;
        }
        if self.rejected_spawns > 0 {
            writeln!(f, "rejected spawns: {}", self.rejected_spawns)?;
        }
        write!(f, "fingerprint: {:016x}", self.fingerprint)
    }
}

/// Hash of every observable unit and structure field; floats contribute
/// their bit patterns.
pub(crate) fn fingerprint(world: &World) -> u64 {
    let snapshot = query::snapshot(world);
    let mut hasher = DefaultHasher::new();
    snapshot.tick.hash(&mut hasher);
    for unit in &snapshot.units {
        unit.id.hash(&mut hasher);
        unit.owner.hash(&mut hasher);
        unit.position.x.to_bits().hash(&mut hasher);
        unit.position.y.to_bits().hash(&mut hasher);
        unit.target
            .map(|target| (target.x.to_bits(), target.y.to_bits()))
            .hash(&mut hasher);
        unit.health.hash(&mut hasher);
        unit.state.hash(&mut hasher);
    }
    for structure in &snapshot.structures {
        structure.id.hash(&mut hasher);
        structure.health.hash(&mut hasher);
    }
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use skirmish_core::{
        ArchetypeTag, Command, Element, SpawnRequest, TileKind, TileMap, UnitKind, UnitStats,
        Vec2,
    };
    use skirmish_world::apply;

    fn world_with_sheep(x: f32) -> World {
        let mut world = World::with_map(TileMap::filled(6, 6, TileKind::Floor));
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::SpawnUnit {
                request: SpawnRequest {
                    owner: FactionId::new(3),
                    archetype: ArchetypeTag::Passive,
                    kind: UnitKind::Sheep,
                    position: Vec2::new(x, 2.5),
                    stats: UnitStats {
                        health: 10,
                        move_speed: 0.1,
                        radius: 0.3,
                        weight: 1.0,
                        power: 1.0,
                        element: Element::Neutral,
                        attack_damage: 0,
                        attack_range: 0.4,
                        attack_cooldown: 10,
                    },
                },
            },
            &mut events,
        );
        world
    }

    #[test]
    fn fingerprint_tracks_positions() {
        assert_eq!(fingerprint(&world_with_sheep(2.5)), fingerprint(&world_with_sheep(2.5)));
        assert_ne!(fingerprint(&world_with_sheep(2.5)), fingerprint(&world_with_sheep(3.5)));
    }

    #[test]
    fn summary_counts_living_units_and_kills() {
        let world = world_with_sheep(2.5);
        let events = [Event::UnitKilled {
            unit: skirmish_core::UnitId::new(9),
            killer: None,
        }];
        let summary = Summary::collect(&world, &events);
        assert_eq!(summary.living.get(&FactionId::new(3)), Some(&1));
        assert_eq!(summary.kills, 1);
        assert_eq!(summary.states.get("Idle"), Some(&1));
        assert!(summary.to_string().contains("faction 3: 1 living"));
    }
}

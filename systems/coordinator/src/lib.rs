#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! AI coordinator driving one simulation tick at a time.
//!
//! The coordinator owns every piece of state the simulation needs besides
//! the world itself: the archetype registry, per-unit [`AiState`], the path
//! cache, the spatial index and the random source. A tick rebuilds the index,
//! dispatches living units in ascending id order, forwards damage and kill
//! notifications to reaction hooks, and finally performs death bookkeeping.

use std::collections::BTreeMap;

use skirmish_core::{BehaviorState, Event, RandomSource, SimulationConfig, UnitId};
use skirmish_system_behavior::{
    AiState, Archetype, ArchetypeRegistry, SeededRandom, StepContext,
};
use skirmish_system_combat::{CombatResolver, NearbyUnit};
use skirmish_system_pathfinding::{Pathfinder, PathfinderStats};
use skirmish_system_spatial_index::SpatialIndex;
use skirmish_world::{query, World};
use tracing::{debug, trace, warn};

/// Systems lent to archetypes through a [`StepContext`].
#[derive(Debug)]
struct Systems {
    config: SimulationConfig,
    index: SpatialIndex,
    pathfinder: Pathfinder,
    combat: CombatResolver,
    rng: Box<dyn RandomSource>,
    nearby: Vec<NearbyUnit>,
}

impl Systems {
    fn context<'a>(
        &'a mut self,
        world: &'a mut World,
        events: &'a mut Vec<Event>,
        tick: u64,
    ) -> StepContext<'a> {
        StepContext {
            world,
            index: &self.index,
            paths: &mut self.pathfinder,
            combat: &mut self.combat,
            rng: &mut *self.rng,
            config: &self.config,
            events,
            nearby: &mut self.nearby,
            tick,
        }
    }
}

/// Owns all simulation state outside the world and advances it per tick.
#[derive(Debug)]
pub struct Coordinator {
    systems: Systems,
    registry: ArchetypeRegistry,
    ai_states: BTreeMap<UnitId, AiState>,
    pending: Vec<Event>,
    dispatch_order: Vec<UnitId>,
}

impl Coordinator {
    /// Creates a coordinator whose random source is seeded from `seed`.
    #[must_use]
    pub fn new(config: SimulationConfig, seed: u64) -> Self {
        Self::with_random(config, Box::new(SeededRandom::new(seed)))
    }

    /// Creates a coordinator drawing randomness from `rng`.
    #[must_use]
    pub fn with_random(config: SimulationConfig, rng: Box<dyn RandomSource>) -> Self {
        Self {
            systems: Systems {
                index: SpatialIndex::new(&config.spatial),
                pathfinder: Pathfinder::new(config.pathfinding.clone()),
                combat: CombatResolver::new(config.combat.clone()),
                rng,
                nearby: Vec::new(),
                config,
            },
            registry: ArchetypeRegistry::standard(),
            ai_states: BTreeMap::new(),
            pending: Vec::new(),
            dispatch_order: Vec::new(),
        }
    }

    /// Replaces the archetype registry.
    #[must_use]
    pub fn with_registry(mut self, registry: ArchetypeRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Active tuning.
    #[must_use]
    pub const fn config(&self) -> &SimulationConfig {
        &self.systems.config
    }

    /// Private state of a unit, if it was created already.
    #[must_use]
    pub fn ai_state(&self, unit: UnitId) -> Option<&AiState> {
        self.ai_states.get(&unit)
    }

    /// Number of units with private state.
    #[must_use]
    pub fn tracked_units(&self) -> usize {
        self.ai_states.len()
    }

    /// Pathfinder workload counters.
    #[must_use]
    pub fn pathfinder_stats(&self) -> PathfinderStats {
        self.systems.pathfinder.stats()
    }

    /// Reacts to events produced outside the simulation step, such as the
    /// results of commands applied to the world.
    pub fn observe(&mut self, events: &[Event]) {
        for event in events {
            match event {
                Event::MapLoaded { .. } => {
                    self.ai_states.clear();
                    self.systems.pathfinder.invalidate();
                }
                Event::StructurePlaced { .. }
                | Event::StructureRemoved { .. }
                | Event::StructureDestroyed { .. } => self.systems.pathfinder.invalidate(),
                _ => {}
            }
        }
    }

    /// Runs one full simulation tick and appends its events to `out_events`.
    pub fn step(&mut self, world: &mut World, out_events: &mut Vec<Event>) {
        let tick = world.advance_tick();
        self.pending.clear();
        self.pending.push(Event::TickStarted { tick });

        self.systems.pathfinder.expire(tick);
        self.systems.index.rebuild(world);

        self.dispatch_order.clear();
        self.dispatch_order
            .extend(query::living_unit_ids(world));
        let order = std::mem::take(&mut self.dispatch_order);
        for &unit in &order {
            self.update_unit(world, unit, tick);
        }
        self.dispatch_order = order;

        self.bookkeep_deaths(world, tick);

        if self
            .pending
            .iter()
            .any(|event| matches!(event, Event::StructureDestroyed { .. }))
        {
            self.systems.pathfinder.invalidate();
        }
        trace!(tick, events = self.pending.len(), "tick complete");
        out_events.append(&mut self.pending);
    }

    fn update_unit(&mut self, world: &mut World, unit: UnitId, tick: u64) {
        let Some(tag) = world
            .unit(unit)
            .filter(|record| record.is_alive())
            .map(|record| record.archetype)
        else {
            return;
        };
        let archetype = *self.registry.resolve(tag);
        let mut ai = self.take_state(unit, &archetype);

        let cursor = self.pending.len();
        let mut ctx = self.systems.context(world, &mut self.pending, tick);
        if let Err(error) = archetype.behavior().update(&mut ctx, unit, &mut ai) {
            warn!(unit = unit.get(), tick, %error, "unit update failed");
        }
        let _ = self.ai_states.insert(unit, ai);

        self.dispatch_reactions(world, cursor, tick);
    }

    /// Forwards damage and kill notifications raised since `cursor` to the
    /// hooks of the units involved.
    fn dispatch_reactions(&mut self, world: &mut World, mut cursor: usize, tick: u64) {
        while cursor < self.pending.len() {
            let event = self.pending[cursor].clone();
            cursor += 1;
            match event {
                Event::UnitDamaged {
                    unit,
                    attacker,
                    remaining,
                    ..
                } if remaining > 0 => {
                    let Some(archetype) = self.living_archetype(world, unit) else {
                        continue;
                    };
                    let Some(hook) = archetype.damage_reaction() else {
                        continue;
                    };
                    let mut ai = self.take_state(unit, &archetype);
                    let mut ctx = self.systems.context(world, &mut self.pending, tick);
                    if let Err(error) = hook.on_damaged(&mut ctx, unit, &mut ai, attacker) {
                        warn!(unit = unit.get(), tick, %error, "damage reaction failed");
                    }
                    let _ = self.ai_states.insert(unit, ai);
                }
                Event::UnitKilled {
                    unit: victim,
                    killer: Some(killer),
                } => {
                    let Some(archetype) = self.living_archetype(world, killer) else {
                        continue;
                    };
                    let Some(hook) = archetype.kill_reaction() else {
                        continue;
                    };
                    let mut ai = self.take_state(killer, &archetype);
                    let mut ctx = self.systems.context(world, &mut self.pending, tick);
                    if let Err(error) = hook.on_kill(&mut ctx, killer, &mut ai, victim) {
                        warn!(unit = killer.get(), tick, %error, "kill reaction failed");
                    }
                    let _ = self.ai_states.insert(killer, ai);
                }
                _ => {}
            }
        }
    }

    /// Records deaths observed this tick and removes units whose cleanup
    /// delay elapsed.
    fn bookkeep_deaths(&mut self, world: &mut World, tick: u64) {
        let delay = self.systems.config.coordinator.cleanup_delay_ticks;
        let dead: Vec<UnitId> = world
            .units()
            .iter()
            .filter(|unit| !unit.is_alive())
            .map(|unit| unit.id)
            .collect();

        for unit in dead {
            let Some(tag) = world.unit(unit).map(|record| record.archetype) else {
                continue;
            };
            let archetype = *self.registry.resolve(tag);
            let ai = self
                .ai_states
                .entry(unit)
                .or_insert_with(|| archetype.behavior().initial_state());

            let Some(death_tick) = ai.death_tick else {
                ai.death_tick = Some(tick);
                ai.target = None;
                ai.clear_route();
                if let Some(record) = world.unit_mut(unit) {
                    record.target = None;
                    if record.state != BehaviorState::Dead {
                        let from = std::mem::replace(&mut record.state, BehaviorState::Dead);
                        self.pending.push(Event::UnitStateChanged {
                            unit,
                            from,
                            to: BehaviorState::Dead,
                        });
                    }
                }
                debug!(unit = unit.get(), tick, "unit died");
                continue;
            };

            if tick.saturating_sub(death_tick) >= delay {
                let _ = world.remove_unit(unit);
                let _ = self.ai_states.remove(&unit);
                debug!(unit = unit.get(), tick, death_tick, "unit removed");
                self.pending.push(Event::UnitRemoved { unit });
            }
        }
    }

    fn take_state(&mut self, unit: UnitId, archetype: &Archetype) -> AiState {
        self.ai_states.remove(&unit).unwrap_or_else(|| {
            trace!(unit = unit.get(), "ai state created");
            archetype.behavior().initial_state()
        })
    }

    fn living_archetype(&self, world: &World, unit: UnitId) -> Option<Archetype> {
        world
            .unit(unit)
            .filter(|record| record.is_alive())
            .map(|record| *self.registry.resolve(record.archetype))
    }
}

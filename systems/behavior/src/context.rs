//! Borrowed view of everything an archetype may read or mutate during a tick.

use skirmish_core::{
    BehaviorState, Event, RandomSource, SimulationConfig, Unit, UnitId, Vec2,
};
use skirmish_system_combat::{CombatResolver, NearbyUnit};
use skirmish_system_spatial_index::{SpatialEntry, SpatialIndex};
use skirmish_world::World;
use tracing::debug;

use crate::{movement::PathQuery, BehaviorError};

/// Per-tick context threaded through every archetype call.
#[derive(Debug)]
pub struct StepContext<'a> {
    /// World being simulated.
    pub world: &'a mut World,
    /// Spatial snapshot rebuilt at the start of the tick.
    pub index: &'a SpatialIndex,
    /// Path query capability used by movement.
    pub paths: &'a mut dyn PathQuery,
    /// Combat rules.
    pub combat: &'a mut CombatResolver,
    /// Seeded random source for non-deterministic choices.
    pub rng: &'a mut dyn RandomSource,
    /// Active tuning.
    pub config: &'a SimulationConfig,
    /// Sink for simulation events.
    pub events: &'a mut Vec<Event>,
    /// Reusable buffer for proximity queries.
    pub nearby: &'a mut Vec<NearbyUnit>,
    /// Index of the tick being simulated.
    pub tick: u64,
}

impl StepContext<'_> {
    /// Looks up a unit, failing when it vanished.
    pub fn unit(&self, unit: UnitId) -> Result<&Unit, BehaviorError> {
        self.world.unit(unit).ok_or(BehaviorError::MissingUnit(unit))
    }

    /// Switches a unit's behavior state, emitting an event on change.
    pub fn transition(&mut self, unit: UnitId, to: BehaviorState) -> Result<(), BehaviorError> {
        let record = self
            .world
            .unit_mut(unit)
            .ok_or(BehaviorError::MissingUnit(unit))?;
        if record.state == to {
            return Ok(());
        }
        let from = std::mem::replace(&mut record.state, to);
        debug!(unit = unit.get(), ?from, ?to, "behavior state changed");
        self.events.push(Event::UnitStateChanged { unit, from, to });
        Ok(())
    }

    /// Overwrites the unit's published movement target.
    pub fn set_target(&mut self, unit: UnitId, target: Option<Vec2>) -> Result<(), BehaviorError> {
        let record = self
            .world
            .unit_mut(unit)
            .ok_or(BehaviorError::MissingUnit(unit))?;
        record.target = target;
        Ok(())
    }

    /// Nearest living unit within `range` accepted by `accept`.
    pub fn nearest<F>(&mut self, unit: UnitId, range: f32, accept: F) -> Option<NearbyUnit>
    where
        F: Fn(&SpatialEntry) -> bool,
    {
        self.combat
            .find_nearby(self.index, self.world, unit, range, accept, self.nearby);
        self.nearby.first().copied()
    }
}

#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Archetype behavior state machines.
//!
//! Every unit is bound at spawn to one [`ArchetypeTag`]. The registry maps
//! each tag to a stateless [`Archetype`] strategy which is evaluated once per
//! tick against the unit, the world and the unit's private [`AiState`].
//! Optional reactions to damage and kills are capabilities only some
//! archetypes implement.

mod ai_state;
mod context;
mod hunter;
mod movement;
mod passive;
mod random;

use std::collections::BTreeMap;

use skirmish_core::{ArchetypeTag, BehaviorState, UnitId};
use thiserror::Error;

pub use ai_state::{AiState, TargetRef};
pub use context::StepContext;
pub use hunter::{Hunter, PreySelection};
pub use movement::{drive, move_toward, MoveOutcome, MovementPolicy, PathQuery, Replan};
pub use passive::Passive;
pub use random::SeededRandom;

/// Failures that abort a single unit's update without affecting others.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum BehaviorError {
    /// The unit disappeared from the world mid-update.
    #[error("unit {} is missing from the world", .0.get())]
    MissingUnit(UnitId),
    /// The unit's position or goal is not a finite coordinate.
    #[error("unit {} has a non-finite position or goal", .0.get())]
    NonFinitePosition(UnitId),
}

/// Per-tick decision logic shared by every archetype.
pub trait Behavior {
    /// Creates the private state for a unit seen for the first time.
    fn initial_state(&self) -> AiState {
        AiState::default()
    }

    /// Advances the unit by one tick.
    fn update(
        &self,
        ctx: &mut StepContext<'_>,
        unit: UnitId,
        ai: &mut AiState,
    ) -> Result<(), BehaviorError>;
}

/// Capability of archetypes that react when their unit takes damage.
pub trait DamageReaction {
    /// Called after `unit` lost health to `attacker`.
    fn on_damaged(
        &self,
        ctx: &mut StepContext<'_>,
        unit: UnitId,
        ai: &mut AiState,
        attacker: Option<UnitId>,
    ) -> Result<(), BehaviorError>;
}

/// Capability of archetypes that react when their unit lands a kill.
pub trait KillReaction {
    /// Called after `unit` reduced `victim` to zero health.
    fn on_kill(
        &self,
        ctx: &mut StepContext<'_>,
        unit: UnitId,
        ai: &mut AiState,
        victim: UnitId,
    ) -> Result<(), BehaviorError>;
}

/// Fallback strategy that keeps a unit idle in place.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Inert;

impl Behavior for Inert {
    fn update(
        &self,
        ctx: &mut StepContext<'_>,
        unit: UnitId,
        ai: &mut AiState,
    ) -> Result<(), BehaviorError> {
        ai.target = None;
        ai.route.clear();
        ctx.set_target(unit, None)?;
        ctx.transition(unit, BehaviorState::Idle)
    }
}

/// Closed set of strategies a unit can be bound to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Archetype {
    /// Prey that wanders and flees.
    Passive(Passive),
    /// Faction combatant.
    Aggressive(Hunter),
    /// Predator selecting prey by sub-type.
    WildAnimal(Hunter),
    /// Does nothing; assigned when a tag has no registered strategy.
    Inert(Inert),
}

const INERT: Archetype = Archetype::Inert(Inert);

impl Archetype {
    /// Standard strategy for `tag`.
    #[must_use]
    pub const fn for_tag(tag: ArchetypeTag) -> Self {
        match tag {
            ArchetypeTag::Passive => Self::Passive(Passive),
            ArchetypeTag::Aggressive => Self::Aggressive(Hunter::aggressive()),
            ArchetypeTag::WildAnimal => Self::WildAnimal(Hunter::wild_animal()),
            ArchetypeTag::Inert => Self::Inert(Inert),
        }
    }

    /// Per-tick logic of the strategy.
    #[must_use]
    pub fn behavior(&self) -> &dyn Behavior {
        match self {
            Self::Passive(passive) => passive,
            Self::Aggressive(hunter) | Self::WildAnimal(hunter) => hunter,
            Self::Inert(inert) => inert,
        }
    }

    /// Damage reaction hook, if the strategy declares one.
    #[must_use]
    pub fn damage_reaction(&self) -> Option<&dyn DamageReaction> {
        match self {
            Self::Passive(passive) => Some(passive),
            Self::Aggressive(_) | Self::WildAnimal(_) | Self::Inert(_) => None,
        }
    }

    /// Kill reaction hook, if the strategy declares one.
    #[must_use]
    pub fn kill_reaction(&self) -> Option<&dyn KillReaction> {
        match self {
            Self::Aggressive(hunter) | Self::WildAnimal(hunter) => Some(hunter),
            Self::Passive(_) | Self::Inert(_) => None,
        }
    }
}

/// Explicit archetype-tag to strategy map owned by a simulation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArchetypeRegistry {
    strategies: BTreeMap<ArchetypeTag, Archetype>,
}

impl ArchetypeRegistry {
    /// Registry binding every tag to its standard strategy.
    #[must_use]
    pub fn standard() -> Self {
        let mut registry = Self::empty();
        for tag in [
            ArchetypeTag::Passive,
            ArchetypeTag::Aggressive,
            ArchetypeTag::WildAnimal,
            ArchetypeTag::Inert,
        ] {
            registry.register(tag, Archetype::for_tag(tag));
        }
        registry
    }

    /// Registry with no strategies; every lookup resolves to [`Inert`].
    #[must_use]
    pub fn empty() -> Self {
        Self {
            strategies: BTreeMap::new(),
        }
    }

    /// Binds `tag` to `archetype`, replacing any earlier binding.
    pub fn register(&mut self, tag: ArchetypeTag, archetype: Archetype) {
        let _ = self.strategies.insert(tag, archetype);
    }

    /// Strategy bound to `tag`, or the inert fallback.
    #[must_use]
    pub fn resolve(&self, tag: ArchetypeTag) -> &Archetype {
        self.strategies.get(&tag).unwrap_or(&INERT)
    }
}

impl Default for ArchetypeRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_tags_resolve_to_inert() {
        let registry = ArchetypeRegistry::empty();
        assert_eq!(
            *registry.resolve(ArchetypeTag::Aggressive),
            Archetype::Inert(Inert)
        );
    }

    #[test]
    fn reaction_hooks_are_declared_where_needed() {
        let passive = Archetype::for_tag(ArchetypeTag::Passive);
        let wild = Archetype::for_tag(ArchetypeTag::WildAnimal);
        assert!(passive.damage_reaction().is_some());
        assert!(passive.kill_reaction().is_none());
        assert!(wild.kill_reaction().is_some());
        assert!(wild.damage_reaction().is_none());
    }

    #[test]
    fn wild_animals_select_by_sub_type() {
        let Archetype::WildAnimal(hunter) = Archetype::for_tag(ArchetypeTag::WildAnimal) else {
            panic!("wild animal tag maps to a hunter");
        };
        assert_eq!(hunter.selection(), PreySelection::Predation);
    }
}

//! Combatant archetypes: faction soldiers and predators share one state
//! machine and differ only in how they pick targets.

use skirmish_core::{
    circle_surface_distance, BehaviorState, FactionId, StructureId, UnitId, UnitKind,
};
use skirmish_system_combat::{cooldown_ready, is_in_attack_range, is_structure_in_range};
use skirmish_system_spatial_index::SpatialEntry;

use crate::{
    ai_state::TargetRef,
    movement::{drive, MovementPolicy},
    AiState, Behavior, BehaviorError, KillReaction, StepContext,
};

/// Rule deciding which units a hunter may pursue.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PreySelection {
    /// Units of any other faction, falling back to enemy structures.
    Faction,
    /// Units of any other sub-type, whatever their faction, and never
    /// structures. Prey sharing the hunter's owner is the one exception: the
    /// friendly-fire guard refuses every attack on it, so such a chase could
    /// never end in a strike.
    Predation,
}

impl PreySelection {
    fn accepts(self, owner: FactionId, kind: UnitKind, entry: &SpatialEntry) -> bool {
        match self {
            Self::Faction => entry.owner != owner,
            Self::Predation => entry.kind != kind && entry.owner != owner,
        }
    }
}

/// Chasing and attacking strategy used by the aggressive and wild-animal
/// archetypes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Hunter {
    selection: PreySelection,
}

impl Hunter {
    /// Hunter attacking enemy factions and their structures.
    #[must_use]
    pub const fn aggressive() -> Self {
        Self {
            selection: PreySelection::Faction,
        }
    }

    /// Hunter preying on every sub-type other than its own.
    #[must_use]
    pub const fn wild_animal() -> Self {
        Self {
            selection: PreySelection::Predation,
        }
    }

    /// Target selection rule of this hunter.
    #[must_use]
    pub const fn selection(&self) -> PreySelection {
        self.selection
    }

    fn scan_units(&self, ctx: &mut StepContext<'_>, unit: UnitId) -> Result<Option<UnitId>, BehaviorError> {
        let (owner, kind) = {
            let record = ctx.unit(unit)?;
            (record.owner, record.kind)
        };
        let selection = self.selection;
        let range = ctx.config.aggressive.detect_range;
        Ok(ctx
            .nearest(unit, range, |entry| selection.accepts(owner, kind, entry))
            .map(|found| found.unit))
    }

    fn scan_structures(&self, ctx: &StepContext<'_>, unit: UnitId) -> Result<Option<StructureId>, BehaviorError> {
        if self.selection != PreySelection::Faction {
            return Ok(None);
        }
        let record = ctx.unit(unit)?;
        let mut best: Option<(f32, StructureId)> = None;
        for structure in ctx.world.structures() {
            if structure.is_destroyed() || structure.owner == record.owner {
                continue;
            }
            let distance = structure.surface_distance(record.position, record.radius());
            if best.map_or(true, |(current, _)| distance < current) {
                best = Some((distance, structure.id));
            }
        }
        Ok(best.map(|(_, id)| id))
    }

    fn acquire(&self, ctx: &mut StepContext<'_>, unit: UnitId, ai: &mut AiState) -> Result<(), BehaviorError> {
        if let Some(prey) = self.scan_units(ctx, unit)? {
            ai.target = Some(TargetRef::Unit(prey));
            ai.route.clear();
            return ctx.transition(unit, BehaviorState::Chasing);
        }
        if let Some(structure) = self.scan_structures(ctx, unit)? {
            ai.target = Some(TargetRef::Structure(structure));
            ai.route.clear();
        }
        Ok(())
    }

    fn engage_unit(
        &self,
        ctx: &mut StepContext<'_>,
        unit: UnitId,
        prey: UnitId,
        ai: &mut AiState,
    ) -> Result<(), BehaviorError> {
        let me = ctx.unit(unit)?;
        let Some(target) = ctx.world.unit(prey).filter(|target| target.is_alive()) else {
            return give_up(ctx, unit, ai);
        };
        let distance =
            circle_surface_distance(me.position, me.radius(), target.position, target.radius());
        let in_range = is_in_attack_range(me, target, me.stats.attack_range);
        let prey_position = target.position;

        if in_range {
            ctx.transition(unit, BehaviorState::Attacking)?;
            return strike(ctx, unit, prey, ai);
        }
        if distance > ctx.config.aggressive.chase_give_up_distance {
            return give_up(ctx, unit, ai);
        }

        ctx.transition(unit, BehaviorState::Chasing)?;
        let _ = drive(ctx, unit, prey_position, ai, MovementPolicy::Fallback(give_up))?;
        Ok(())
    }

    fn engage_structure(
        &self,
        ctx: &mut StepContext<'_>,
        unit: UnitId,
        structure: StructureId,
        ai: &mut AiState,
    ) -> Result<(), BehaviorError> {
        let me = ctx.unit(unit)?;
        let Some(target) = ctx
            .world
            .structure(structure)
            .filter(|target| !target.is_destroyed())
        else {
            return give_up(ctx, unit, ai);
        };
        let in_range = is_structure_in_range(me, target, me.stats.attack_range);
        let goal = target.position;
        let (damage, cooldown) = (me.stats.attack_damage, me.stats.attack_cooldown);

        if !in_range {
            ctx.transition(unit, BehaviorState::Idle)?;
            let _ = drive(ctx, unit, goal, ai, MovementPolicy::Retry)?;
            return Ok(());
        }

        ctx.transition(unit, BehaviorState::AttackingStructure)?;
        ctx.set_target(unit, None)?;
        if !cooldown_ready(ctx.tick, ai.last_attack_tick, cooldown) {
            return Ok(());
        }
        let outcome = ctx
            .combat
            .attack_structure(ctx.world, unit, structure, damage, ctx.events);
        if outcome.success {
            ai.last_attack_tick = Some(ctx.tick);
        }
        if outcome.target_killed {
            give_up(ctx, unit, ai)?;
        }
        Ok(())
    }
}

impl Behavior for Hunter {
    fn update(
        &self,
        ctx: &mut StepContext<'_>,
        unit: UnitId,
        ai: &mut AiState,
    ) -> Result<(), BehaviorError> {
        let state = ctx.unit(unit)?.state;
        match ai.target {
            None => self.acquire(ctx, unit, ai)?,
            Some(TargetRef::Structure(_)) if state == BehaviorState::Idle => {
                if let Some(prey) = self.scan_units(ctx, unit)? {
                    ai.target = Some(TargetRef::Unit(prey));
                    ai.route.clear();
                    ctx.transition(unit, BehaviorState::Chasing)?;
                }
            }
            Some(_) => {}
        }

        match ai.target {
            Some(TargetRef::Unit(prey)) => self.engage_unit(ctx, unit, prey, ai),
            Some(TargetRef::Structure(structure)) => {
                self.engage_structure(ctx, unit, structure, ai)
            }
            None => {
                ctx.set_target(unit, None)?;
                ctx.transition(unit, BehaviorState::Idle)
            }
        }
    }
}

impl KillReaction for Hunter {
    fn on_kill(
        &self,
        ctx: &mut StepContext<'_>,
        unit: UnitId,
        ai: &mut AiState,
        _victim: UnitId,
    ) -> Result<(), BehaviorError> {
        give_up(ctx, unit, ai)
    }
}

fn strike(
    ctx: &mut StepContext<'_>,
    unit: UnitId,
    prey: UnitId,
    ai: &mut AiState,
) -> Result<(), BehaviorError> {
    let (damage, cooldown) = {
        let me = ctx.unit(unit)?;
        (me.stats.attack_damage, me.stats.attack_cooldown)
    };
    ctx.set_target(unit, None)?;
    if !cooldown_ready(ctx.tick, ai.last_attack_tick, cooldown) {
        return Ok(());
    }

    let outcome = ctx
        .combat
        .attack_unit(ctx.world, unit, prey, damage, ctx.events);
    if !outcome.success {
        return Ok(());
    }
    ai.last_attack_tick = Some(ctx.tick);
    if !outcome.target_killed {
        let _ = ctx
            .combat
            .apply_knockback(ctx.world, unit, prey, ctx.events);
    }
    Ok(())
}

fn give_up(ctx: &mut StepContext<'_>, unit: UnitId, ai: &mut AiState) -> Result<(), BehaviorError> {
    ai.target = None;
    ai.route.clear();
    ctx.set_target(unit, None)?;
    ctx.transition(unit, BehaviorState::Idle)
}

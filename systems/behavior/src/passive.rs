//! Prey archetype: idles, wanders to nearby tiles and flees from threats.

use std::collections::{BTreeSet, VecDeque};

use skirmish_core::{BehaviorState, TileMap, TilePos, UnitId, Vec2, EPSILON};

use crate::{
    movement::{drive, MoveOutcome, MovementPolicy},
    AiState, Behavior, BehaviorError, DamageReaction, StepContext,
};

/// Passive prey strategy.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Passive;

impl Behavior for Passive {
    fn update(
        &self,
        ctx: &mut StepContext<'_>,
        unit: UnitId,
        ai: &mut AiState,
    ) -> Result<(), BehaviorError> {
        let (owner, state) = {
            let record = ctx.unit(unit)?;
            (record.owner, record.state)
        };

        if state != BehaviorState::Fleeing {
            let range = ctx.config.passive.flee_detect_range;
            if let Some(threat) = ctx.nearest(unit, range, |entry| entry.owner != owner) {
                if let Some(from) = ctx.world.unit(threat.unit).map(|threat| threat.position) {
                    start_flee(ctx, unit, ai, from)?;
                    return flee(ctx, unit, ai);
                }
            }
        }

        match state {
            BehaviorState::Fleeing => flee(ctx, unit, ai),
            BehaviorState::Wandering => wander(ctx, unit, ai),
            _ => idle(ctx, unit, ai),
        }
    }
}

impl DamageReaction for Passive {
    fn on_damaged(
        &self,
        ctx: &mut StepContext<'_>,
        unit: UnitId,
        ai: &mut AiState,
        attacker: Option<UnitId>,
    ) -> Result<(), BehaviorError> {
        let Some(from) = attacker
            .and_then(|attacker| ctx.world.unit(attacker))
            .map(|attacker| attacker.position)
        else {
            return Ok(());
        };
        start_flee(ctx, unit, ai, from)
    }
}

fn start_flee(
    ctx: &mut StepContext<'_>,
    unit: UnitId,
    ai: &mut AiState,
    threat: Vec2,
) -> Result<(), BehaviorError> {
    let (position, radius) = {
        let record = ctx.unit(unit)?;
        (record.position, record.radius())
    };
    let away = (position - threat)
        .normalized()
        .unwrap_or(Vec2::new(-1.0, 0.0));
    let target = clamp_inside(
        ctx.world.map(),
        position + away * ctx.config.passive.flee_distance,
        radius,
    );

    ai.flee_target = Some(target);
    ai.flee_started_tick = Some(ctx.tick);
    ai.wander_target = None;
    ai.idle_until = None;
    ai.route.clear();
    ctx.set_target(unit, Some(target))?;
    ctx.transition(unit, BehaviorState::Fleeing)
}

/// Clamps a point so a circle of `radius` centred on it stays on the map.
fn clamp_inside(map: &TileMap, point: Vec2, radius: f32) -> Vec2 {
    let bound = |value: f32, extent: u32| {
        let max = (extent as f32 - radius - EPSILON).max(radius);
        value.clamp(radius, max)
    };
    map.clamp(Vec2::new(bound(point.x, map.width()), bound(point.y, map.height())))
}

fn flee(ctx: &mut StepContext<'_>, unit: UnitId, ai: &mut AiState) -> Result<(), BehaviorError> {
    let (Some(target), Some(started)) = (ai.flee_target, ai.flee_started_tick) else {
        return end_flee(ctx, unit, ai);
    };
    if ctx.tick.saturating_sub(started) >= ctx.config.passive.flee_cooldown_ticks {
        return end_flee(ctx, unit, ai);
    }

    let outcome = drive(ctx, unit, target, ai, MovementPolicy::Fallback(end_flee))?;
    if outcome == MoveOutcome::Arrived {
        end_flee(ctx, unit, ai)?;
    }
    Ok(())
}

fn end_flee(ctx: &mut StepContext<'_>, unit: UnitId, ai: &mut AiState) -> Result<(), BehaviorError> {
    ai.flee_target = None;
    ai.flee_started_tick = None;
    ai.wander_target = None;
    ai.route.clear();
    ctx.set_target(unit, None)?;
    ctx.transition(unit, BehaviorState::Wandering)
}

fn idle(ctx: &mut StepContext<'_>, unit: UnitId, ai: &mut AiState) -> Result<(), BehaviorError> {
    ctx.transition(unit, BehaviorState::Idle)?;
    match ai.idle_until {
        None => {
            ai.idle_until = Some(ctx.tick + ctx.config.passive.idle_ticks);
            Ok(())
        }
        Some(until) if ctx.tick >= until => {
            ai.idle_until = None;
            ctx.transition(unit, BehaviorState::Wandering)?;
            wander(ctx, unit, ai)
        }
        Some(_) => Ok(()),
    }
}

fn wander(ctx: &mut StepContext<'_>, unit: UnitId, ai: &mut AiState) -> Result<(), BehaviorError> {
    let target = match ai.wander_target {
        Some(target) => target,
        None => match pick_wander_target(ctx, unit)? {
            Some(target) => {
                ai.wander_target = Some(target);
                target
            }
            None => return rest(ctx, unit, ai),
        },
    };

    let outcome = drive(ctx, unit, target, ai, MovementPolicy::Fallback(rest))?;
    if outcome == MoveOutcome::Arrived {
        rest(ctx, unit, ai)?;
    }
    Ok(())
}

fn rest(ctx: &mut StepContext<'_>, unit: UnitId, ai: &mut AiState) -> Result<(), BehaviorError> {
    ai.wander_target = None;
    ai.idle_until = Some(ctx.tick + ctx.config.passive.idle_ticks);
    ai.route.clear();
    ctx.set_target(unit, None)?;
    ctx.transition(unit, BehaviorState::Idle)
}

/// Bounded breadth-first search for reachable tiles near the unit, picking
/// one uniformly through the seeded random source.
fn pick_wander_target(
    ctx: &mut StepContext<'_>,
    unit: UnitId,
) -> Result<Option<Vec2>, BehaviorError> {
    let record = ctx.unit(unit)?;
    let radius = record.radius();
    let origin = TilePos::containing(record.position);
    let limit = ctx.config.passive.wander_radius;
    let budget = ctx.config.passive.wander_search_nodes.max(1);

    let oracle = ctx.world.oracle();
    let mut visited = BTreeSet::from([origin]);
    let mut frontier = VecDeque::from([origin]);
    let mut candidates = Vec::new();
    while let Some(tile) = frontier.pop_front() {
        if visited.len() >= budget {
            break;
        }
        for neighbor in oracle.neighbors(tile, radius) {
            if neighbor.manhattan_distance(origin) > limit || !visited.insert(neighbor) {
                continue;
            }
            candidates.push(neighbor);
            frontier.push_back(neighbor);
            if visited.len() >= budget {
                break;
            }
        }
    }

    if candidates.is_empty() {
        return Ok(None);
    }
    let count = u32::try_from(candidates.len()).unwrap_or(u32::MAX);
    let pick = ctx.rng.below(count) as usize;
    Ok(candidates.get(pick).map(|tile| tile.center()))
}

//! Collision-aware stepping toward a goal, with the two blocked-move policies.

use std::fmt;

use skirmish_core::{Event, TileMap, TilePos, UnitId, Vec2, EPSILON};
use skirmish_system_pathfinding::Pathfinder;
use skirmish_world::CollisionOracle;

use crate::{ai_state::Route, AiState, BehaviorError, StepContext};

/// Halvings used to find the last legal point of a blocked step.
const STEP_REFINEMENTS: u32 = 16;

/// Path query capability the movement layer depends on.
pub trait PathQuery: std::fmt::Debug {
    /// Steps from just after `start` up to `goal`, or `None` when unreachable.
    fn find_path(
        &mut self,
        oracle: &CollisionOracle<'_>,
        start: TilePos,
        goal: TilePos,
        radius: f32,
        tick: u64,
    ) -> Option<Vec<TilePos>>;
}

impl PathQuery for Pathfinder {
    fn find_path(
        &mut self,
        oracle: &CollisionOracle<'_>,
        start: TilePos,
        goal: TilePos,
        radius: f32,
        tick: u64,
    ) -> Option<Vec<TilePos>> {
        Pathfinder::find_path(self, oracle, start, goal, radius, tick)
    }
}

/// Callback that abandons the current objective and picks another.
pub type Replan =
    fn(&mut StepContext<'_>, UnitId, &mut AiState) -> Result<(), BehaviorError>;

/// What to do when no step toward the goal is available this tick.
#[derive(Clone, Copy)]
pub enum MovementPolicy {
    /// Abandon the objective through the replan callback.
    Fallback(Replan),
    /// Keep the objective and try again next tick.
    Retry,
}

impl fmt::Debug for MovementPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fallback(_) => f.write_str("Fallback"),
            Self::Retry => f.write_str("Retry"),
        }
    }
}

/// Result of a single movement attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MoveOutcome {
    /// The unit moved closer to the goal.
    Advanced,
    /// The unit is within arrival tolerance of the goal.
    Arrived,
    /// No legal step was available.
    Blocked,
}

/// Moves the unit one tick toward `goal` and applies `policy` when blocked.
pub fn drive(
    ctx: &mut StepContext<'_>,
    unit: UnitId,
    goal: Vec2,
    ai: &mut AiState,
    policy: MovementPolicy,
) -> Result<MoveOutcome, BehaviorError> {
    let outcome = move_toward(ctx, unit, goal, ai)?;
    if outcome == MoveOutcome::Blocked {
        if let MovementPolicy::Fallback(replan) = policy {
            replan(ctx, unit, ai)?;
        }
    }
    Ok(outcome)
}

/// Advances the unit by at most its move speed toward `goal`.
///
/// A clear straight segment is walked directly. Otherwise the unit follows
/// tile-centre waypoints from the path query; the path is recomputed only
/// once the goal drifts past the configured threshold, so a moving goal is
/// chased along the stale remainder in between. Once the waypoints run out
/// (the path may end short of a goal inside a structure) the unit heads
/// straight for the goal. A step that would overlap an obstacle is cut short
/// at the last legal point on the same line; a unit that cannot make any
/// headway reports `Blocked` and drops its route.
pub fn move_toward(
    ctx: &mut StepContext<'_>,
    unit: UnitId,
    goal: Vec2,
    ai: &mut AiState,
) -> Result<MoveOutcome, BehaviorError> {
    let record = ctx.unit(unit)?;
    let position = record.position;
    if !position.is_finite() || !goal.is_finite() {
        return Err(BehaviorError::NonFinitePosition(unit));
    }
    let radius = record.radius();
    let speed = record.stats.move_speed;
    let tolerance = ctx.config.coordinator.arrival_tolerance;
    let threshold = ctx.config.aggressive.repath_threshold;
    let goal = ctx.world.map().clamp(goal);

    if position.distance(goal) <= tolerance {
        ai.route.clear();
        return Ok(MoveOutcome::Arrived);
    }

    let next = {
        let map = ctx.world.map();
        let oracle = ctx.world.oracle();
        let direct = Some(map.clamp(position.step_toward(goal, speed)))
            .filter(|_| oracle.segment_clear(position, goal, radius))
            .filter(|next| oracle.is_walkable(*next, radius, None).walkable);

        match direct {
            Some(next) => {
                ai.route.clear();
                next
            }
            None => {
                let mut planned = false;
                if ai.route.needs_plan(goal, threshold) {
                    if !plan_route(ctx.paths, &oracle, position, goal, radius, ctx.tick, &mut ai.route) {
                        return Ok(MoveOutcome::Blocked);
                    }
                    planned = true;
                }
                let waypoint = ai.route.next_waypoint(position, tolerance).unwrap_or(goal);
                let mut next = furthest_step(&oracle, map, position, waypoint, speed, radius);
                if next.is_none() && !planned {
                    // The stale route ran into something; try one fresh plan.
                    if !plan_route(ctx.paths, &oracle, position, goal, radius, ctx.tick, &mut ai.route) {
                        return Ok(MoveOutcome::Blocked);
                    }
                    let waypoint = ai.route.next_waypoint(position, tolerance).unwrap_or(goal);
                    next = furthest_step(&oracle, map, position, waypoint, speed, radius);
                }
                match next {
                    Some(next) => next,
                    None => {
                        ai.route.clear();
                        return Ok(MoveOutcome::Blocked);
                    }
                }
            }
        }
    };

    let record = ctx
        .world
        .unit_mut(unit)
        .ok_or(BehaviorError::MissingUnit(unit))?;
    record.target = Some(goal);
    if next != position {
        record.position = next;
        ctx.events.push(Event::UnitMoved {
            unit,
            from: position,
            to: next,
        });
    }

    if next.distance(goal) <= tolerance {
        Ok(MoveOutcome::Arrived)
    } else {
        Ok(MoveOutcome::Advanced)
    }
}

/// Plans a fresh route from `position` to `goal`. Returns `false`, with the
/// route cleared, when the goal is unreachable.
fn plan_route(
    paths: &mut dyn PathQuery,
    oracle: &CollisionOracle<'_>,
    position: Vec2,
    goal: Vec2,
    radius: f32,
    tick: u64,
    route: &mut Route,
) -> bool {
    let start = TilePos::containing(position);
    let goal_tile = TilePos::containing(goal);
    let Some(steps) = paths.find_path(oracle, start, goal_tile, radius, tick) else {
        route.clear();
        return false;
    };
    let entry = steps
        .first()
        .filter(|first| !oracle.segment_clear(position, first.center(), radius))
        .map(|_| start.center());
    let waypoints = entry.into_iter().chain(steps.iter().map(|step| {
        if *step == goal_tile {
            goal
        } else {
            step.center()
        }
    }));
    route.assign(goal, waypoints);
    true
}

/// Farthest legal point within one step toward `waypoint`, or `None` when
/// the unit cannot make headway. Assumes `position` itself is legal.
fn furthest_step(
    oracle: &CollisionOracle<'_>,
    map: &TileMap,
    position: Vec2,
    waypoint: Vec2,
    speed: f32,
    radius: f32,
) -> Option<Vec2> {
    let full = map.clamp(position.step_toward(waypoint, speed));
    if oracle.is_walkable(full, radius, None).walkable {
        return Some(full);
    }

    let delta = full - position;
    let (mut reachable, mut blocked) = (0.0_f32, 1.0_f32);
    for _ in 0..STEP_REFINEMENTS {
        let middle = (reachable + blocked) * 0.5;
        if oracle.is_walkable(position + delta * middle, radius, None).walkable {
            reachable = middle;
        } else {
            blocked = middle;
        }
    }
    let next = position + delta * reachable;
    (next.distance(position) > EPSILON).then_some(next)
}

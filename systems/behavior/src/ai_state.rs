//! Private per-unit scratch state owned by the coordinator.

use std::collections::VecDeque;

use skirmish_core::{StructureId, UnitId, Vec2};

/// Objective a combatant is currently pursuing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TargetRef {
    /// Another unit.
    Unit(UnitId),
    /// A structure.
    Structure(StructureId),
}

/// Per-unit AI memory. Never exposed to observers.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AiState {
    /// Current combat objective.
    pub target: Option<TargetRef>,
    /// Tick of the last successful attack.
    pub last_attack_tick: Option<u64>,
    /// Destination of an ongoing flee.
    pub flee_target: Option<Vec2>,
    /// Tick the ongoing flee began.
    pub flee_started_tick: Option<u64>,
    /// Destination of an ongoing wander leg.
    pub wander_target: Option<Vec2>,
    /// Tick at which an idle pause ends.
    pub idle_until: Option<u64>,
    /// Tick at which the unit's health reached zero.
    pub death_tick: Option<u64>,
    pub(crate) route: Route,
}

impl AiState {
    /// Forgets the followed path so the next move plans afresh.
    pub fn clear_route(&mut self) {
        self.route.clear();
    }
}

/// Waypoints toward the goal the path was planned for.
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct Route {
    goal: Option<Vec2>,
    waypoints: VecDeque<Vec2>,
}

impl Route {
    pub(crate) fn clear(&mut self) {
        self.goal = None;
        self.waypoints.clear();
    }

    /// A route is reused until its goal drifts past `threshold`. Running out
    /// of waypoints does not trigger a new plan; the mover then heads
    /// straight for the goal.
    pub(crate) fn needs_plan(&self, goal: Vec2, threshold: f32) -> bool {
        self.goal
            .map_or(true, |planned| planned.distance(goal) > threshold)
    }

    pub(crate) fn assign(&mut self, goal: Vec2, waypoints: impl IntoIterator<Item = Vec2>) {
        self.goal = Some(goal);
        self.waypoints.clear();
        self.waypoints.extend(waypoints);
    }

    /// Drops waypoints already reached and returns the next one.
    pub(crate) fn next_waypoint(&mut self, position: Vec2, tolerance: f32) -> Option<Vec2> {
        while let Some(front) = self.waypoints.front() {
            if front.distance(position) > tolerance {
                return Some(*front);
            }
            let _ = self.waypoints.pop_front();
        }
        None
    }
}

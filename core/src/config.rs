//! Tuning knobs for every adjustable aspect of the simulation core.
//!
//! Each group implements [`Default`] with the values the simulation ships
//! with and deserializes with `#[serde(default)]`, so a scenario file only
//! needs to name the fields it overrides.

use serde::{Deserialize, Serialize};

/// Aggregated configuration threaded into the coordinator and its systems.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Search bounds and cache sizing for the pathfinder.
    pub pathfinding: PathfindingConfig,
    /// Grid partitioning used by the spatial combat index.
    pub spatial: SpatialConfig,
    /// Damage and knockback parameters used by the combat resolver.
    pub combat: CombatConfig,
    /// Parameters for the passive (prey) archetype.
    pub passive: PassiveConfig,
    /// Parameters shared by the aggressive and wild-animal archetypes.
    pub aggressive: AggressiveConfig,
    /// Lifecycle parameters owned by the coordinator.
    pub coordinator: CoordinatorConfig,
}

/// Search bounds and cache sizing for the pathfinder.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathfindingConfig {
    /// Maximum node expansions before a search gives up.
    pub max_iterations: u32,
    /// Largest square perimeter searched when the goal tile is unwalkable.
    pub goal_search_radius: u32,
    /// Ticks a cached path stays valid.
    pub cache_ttl_ticks: u64,
    /// Maximum number of cached paths; the oldest entry is evicted beyond it.
    pub cache_capacity: usize,
}

impl Default for PathfindingConfig {
    fn default() -> Self {
        Self {
            max_iterations: 2_000,
            goal_search_radius: 8,
            cache_ttl_ticks: 120,
            cache_capacity: 256,
        }
    }
}

/// Grid partitioning used by the spatial combat index.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpatialConfig {
    /// Edge length of a square index cell, in tiles.
    pub cell_size: u32,
}

impl Default for SpatialConfig {
    fn default() -> Self {
        Self { cell_size: 4 }
    }
}

/// Damage and knockback parameters used by the combat resolver.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatConfig {
    /// Push distance for an attacker whose power equals the target's weight.
    pub knockback_base: f32,
    /// Upper bound on a single knockback displacement.
    pub knockback_max: f32,
    /// Distance stepped back toward the attacker when a landing is blocked.
    pub knockback_step: f32,
    /// Damage multiplier applied when the attacker's element beats the target's.
    pub advantage_multiplier: f32,
    /// Damage multiplier applied when the target's element beats the attacker's.
    pub disadvantage_multiplier: f32,
}

impl Default for CombatConfig {
    fn default() -> Self {
        Self {
            knockback_base: 1.0,
            knockback_max: 2.0,
            knockback_step: 0.1,
            advantage_multiplier: 1.5,
            disadvantage_multiplier: 0.75,
        }
    }
}

/// Parameters for the passive (prey) archetype.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PassiveConfig {
    /// Surface distance at which an opposing unit triggers a flee.
    pub flee_detect_range: f32,
    /// Distance of the flee target from the unit, directly away from the threat.
    pub flee_distance: f32,
    /// Ticks after which a flee ends even if the target was not reached.
    pub flee_cooldown_ticks: u64,
    /// Manhattan radius within which wander targets are chosen.
    pub wander_radius: u32,
    /// Maximum tiles visited by the wander breadth-first search.
    pub wander_search_nodes: usize,
    /// Ticks spent idle between wander legs.
    pub idle_ticks: u64,
}

impl Default for PassiveConfig {
    fn default() -> Self {
        Self {
            flee_detect_range: 3.0,
            flee_distance: 5.0,
            flee_cooldown_ticks: 60,
            wander_radius: 4,
            wander_search_nodes: 64,
            idle_ticks: 20,
        }
    }
}

/// Parameters shared by the aggressive and wild-animal archetypes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggressiveConfig {
    /// Surface distance at which enemy units are noticed.
    pub detect_range: f32,
    /// Surface distance beyond which an ongoing chase is abandoned.
    pub chase_give_up_distance: f32,
    /// Drift of a moving goal that forces a fresh path.
    pub repath_threshold: f32,
}

impl Default for AggressiveConfig {
    fn default() -> Self {
        Self {
            detect_range: 10.0,
            chase_give_up_distance: 15.0,
            repath_threshold: 1.5,
        }
    }
}

/// Lifecycle parameters owned by the coordinator.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    /// Ticks a dead unit lingers before it is removed.
    pub cleanup_delay_ticks: u64,
    /// Distance under which a unit counts as having reached a waypoint.
    pub arrival_tolerance: f32,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            cleanup_delay_ticks: 30,
            arrival_tolerance: 0.05,
        }
    }
}

#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! A* pathfinder over the tile graph with a bounded result cache.
//!
//! Searches run over 8-connected tiles using the collision oracle's neighbor
//! rules, an octile-distance heuristic, and a hard expansion cap so a single
//! request cannot make a tick's cost unbounded. Successful results are cached
//! by `(start, goal, radius)`; the caller must call [`Pathfinder::invalidate`]
//! whenever obstacles change.

mod cache;

use std::{cmp::Ordering, collections::BinaryHeap, f32::consts::SQRT_2};

use skirmish_core::{PathfindingConfig, TilePos};
use skirmish_world::CollisionOracle;
use tracing::{debug, trace};

use crate::cache::{CacheKey, PathCache};

const CARDINAL_COST: f32 = 1.0;
const DIAGONAL_COST: f32 = SQRT_2;
const UNVISITED: u32 = u32::MAX;

/// Counters describing the pathfinder's workload.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PathfinderStats {
    /// Searches actually executed.
    pub searches: u64,
    /// Requests answered from the cache.
    pub cache_hits: u64,
    /// Requests that missed the cache.
    pub cache_misses: u64,
    /// Searches abandoned because the expansion cap was reached.
    pub exhausted: u64,
    /// Cache entries dropped to respect the capacity bound.
    pub evictions: u64,
}

/// Deterministic A* pathfinder that reuses its search buffers across calls.
#[derive(Debug)]
pub struct Pathfinder {
    config: PathfindingConfig,
    cache: PathCache,
    workspace: SearchWorkspace,
    stats: PathfinderStats,
}

impl Pathfinder {
    /// Creates a pathfinder with empty cache and search buffers.
    #[must_use]
    pub fn new(config: PathfindingConfig) -> Self {
        Self {
            cache: PathCache::new(config.cache_ttl_ticks, config.cache_capacity),
            config,
            workspace: SearchWorkspace::default(),
            stats: PathfinderStats::default(),
        }
    }

    /// Finds a path from `start` to `goal` for a requester of `radius`.
    ///
    /// The returned steps run from the tile after `start` up to and including
    /// the goal; the start tile is never included. An unwalkable goal is
    /// replaced by the nearest walkable tile on expanding square perimeters.
    /// Unreachable goals, or searches exceeding the expansion cap, yield
    /// `None`.
    pub fn find_path(
        &mut self,
        oracle: &CollisionOracle<'_>,
        start: TilePos,
        goal: TilePos,
        radius: f32,
        tick: u64,
    ) -> Option<Vec<TilePos>> {
        let key = CacheKey::new(start, goal, radius);
        if let Some(steps) = self.cache.get(&key, tick) {
            self.stats.cache_hits += 1;
            return Some(steps.to_vec());
        }
        self.stats.cache_misses += 1;

        let goal = self.resolve_goal(oracle, goal, radius)?;
        let steps = self.search(oracle, start, goal, radius)?;

        let evicted = self.cache.insert(key, steps.clone(), tick);
        if evicted > 0 {
            self.stats.evictions += evicted as u64;
            debug!(evicted, "path cache over capacity");
        }
        Some(steps)
    }

    /// Drops every cached path. Call whenever the obstacle set changes.
    pub fn invalidate(&mut self) {
        if self.cache.len() > 0 {
            debug!(entries = self.cache.len(), "path cache invalidated");
        }
        self.cache.clear();
    }

    /// Sweeps cache entries whose TTL elapsed.
    pub fn expire(&mut self, tick: u64) {
        let removed = self.cache.expire(tick);
        if removed > 0 {
            trace!(removed, tick, "expired cached paths");
        }
    }

    /// Number of paths currently cached.
    #[must_use]
    pub fn cached_paths(&self) -> usize {
        self.cache.len()
    }

    /// Workload counters accumulated since construction.
    #[must_use]
    pub const fn stats(&self) -> PathfinderStats {
        self.stats
    }

    fn resolve_goal(
        &self,
        oracle: &CollisionOracle<'_>,
        goal: TilePos,
        radius: f32,
    ) -> Option<TilePos> {
        if oracle.is_tile_walkable(goal, radius) {
            return Some(goal);
        }

        let limit = i32::try_from(self.config.goal_search_radius).unwrap_or(i32::MAX);
        for ring in 1..=limit {
            let mut best: Option<(i64, TilePos)> = None;
            for candidate in perimeter(goal, ring) {
                if !oracle.is_tile_walkable(candidate, radius) {
                    continue;
                }
                let dx = i64::from(candidate.x - goal.x);
                let dy = i64::from(candidate.y - goal.y);
                let distance_sq = dx * dx + dy * dy;
                if best.map_or(true, |(current, _)| distance_sq < current) {
                    best = Some((distance_sq, candidate));
                }
            }
            if let Some((_, tile)) = best {
                return Some(tile);
            }
        }
        None
    }

    fn search(
        &mut self,
        oracle: &CollisionOracle<'_>,
        start: TilePos,
        goal: TilePos,
        radius: f32,
    ) -> Option<Vec<TilePos>> {
        if start == goal {
            return Some(Vec::new());
        }

        let map = oracle.map();
        let encoder = NodeEncoder::new(map.width(), map.height());
        let start_node = encoder.encode(start)?;
        let goal_node = encoder.encode(goal)?;

        self.stats.searches += 1;
        let workspace = &mut self.workspace;
        workspace.prepare(encoder.node_count());
        workspace.open(start_node, 0.0, octile(start, goal), UNVISITED);

        let mut expansions: u32 = 0;
        while let Some(current) = workspace.frontier.pop() {
            if workspace.is_closed(current.node) || current.g > workspace.g_score(current.node) {
                continue;
            }

            if current.node == goal_node {
                return Some(workspace.reconstruct(&encoder, goal_node, start_node));
            }

            expansions += 1;
            if expansions > self.config.max_iterations {
                self.stats.exhausted += 1;
                trace!(?start, ?goal, expansions, "search exceeded expansion cap");
                return None;
            }

            workspace.close(current.node);
            let tile = encoder.decode(current.node);
            for neighbor in oracle.neighbors(tile, radius) {
                let Some(node) = encoder.encode(neighbor) else {
                    continue;
                };
                if workspace.is_closed(node) {
                    continue;
                }
                let step = if neighbor.x != tile.x && neighbor.y != tile.y {
                    DIAGONAL_COST
                } else {
                    CARDINAL_COST
                };
                let tentative = current.g + step;
                if tentative < workspace.g_score(node) {
                    workspace.open(node, tentative, tentative + octile(neighbor, goal), current.node);
                }
            }
        }

        None
    }
}

/// Octile distance, admissible for 8-directional movement with unit
/// cardinal and `√2` diagonal costs.
#[must_use]
pub fn octile(from: TilePos, to: TilePos) -> f32 {
    let dx = from.x.abs_diff(to.x) as f32;
    let dy = from.y.abs_diff(to.y) as f32;
    (dx + dy) + (SQRT_2 - 2.0) * dx.min(dy)
}

/// Weighted length of a step sequence starting at `start`.
#[must_use]
pub fn path_cost(start: TilePos, steps: &[TilePos]) -> f32 {
    let mut cost = 0.0;
    let mut previous = start;
    for step in steps {
        cost += if step.x != previous.x && step.y != previous.y {
            DIAGONAL_COST
        } else {
            CARDINAL_COST
        };
        previous = *step;
    }
    cost
}

fn perimeter(center: TilePos, ring: i32) -> impl Iterator<Item = TilePos> {
    let top = (-ring..=ring).map(move |dx| center.offset(dx, -ring));
    let right = (-ring + 1..=ring).map(move |dy| center.offset(ring, dy));
    let bottom = (-ring..ring).rev().map(move |dx| center.offset(dx, ring));
    let left = (-ring + 1..ring).rev().map(move |dy| center.offset(-ring, dy));
    top.chain(right).chain(bottom).chain(left)
}

/// Numeric node identity: `y * width + x` for in-bounds tiles.
#[derive(Clone, Copy, Debug)]
struct NodeEncoder {
    width: u32,
    height: u32,
}

impl NodeEncoder {
    fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    fn node_count(&self) -> usize {
        usize::try_from(u64::from(self.width) * u64::from(self.height)).unwrap_or(0)
    }

    fn encode(&self, tile: TilePos) -> Option<u32> {
        let x = u32::try_from(tile.x).ok()?;
        let y = u32::try_from(tile.y).ok()?;
        if x >= self.width || y >= self.height {
            return None;
        }
        y.checked_mul(self.width)?.checked_add(x)
    }

    fn decode(&self, node: u32) -> TilePos {
        let width = self.width.max(1);
        TilePos::new((node % width) as i32, (node / width) as i32)
    }
}

#[derive(Clone, Copy, Debug)]
struct OpenNode {
    f: f32,
    g: f32,
    node: u32,
}

impl PartialEq for OpenNode {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for OpenNode {}

impl PartialOrd for OpenNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OpenNode {
    // Reversed so the max-heap pops the lowest f-score; ties prefer the
    // deeper node, then the lower node id.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .f
            .total_cmp(&self.f)
            .then_with(|| self.g.total_cmp(&other.g))
            .then_with(|| other.node.cmp(&self.node))
    }
}

/// Search buffers reused across calls; a generation stamp marks which
/// entries belong to the current search so nothing is cleared per call.
#[derive(Debug, Default)]
struct SearchWorkspace {
    frontier: BinaryHeap<OpenNode>,
    g_scores: Vec<f32>,
    parents: Vec<u32>,
    stamps: Vec<u32>,
    closed: Vec<u32>,
    generation: u32,
}

impl SearchWorkspace {
    fn prepare(&mut self, node_count: usize) {
        self.frontier.clear();
        if self.stamps.len() != node_count {
            self.g_scores = vec![f32::INFINITY; node_count];
            self.parents = vec![UNVISITED; node_count];
            self.stamps = vec![0; node_count];
            self.closed = vec![0; node_count];
            self.generation = 0;
        }

        self.generation = self.generation.wrapping_add(1);
        if self.generation == 0 {
            self.stamps.fill(0);
            self.closed.fill(0);
            self.generation = 1;
        }
    }

    fn g_score(&self, node: u32) -> f32 {
        let index = node as usize;
        if self.stamps[index] == self.generation {
            self.g_scores[index]
        } else {
            f32::INFINITY
        }
    }

    fn open(&mut self, node: u32, g: f32, f: f32, parent: u32) {
        let index = node as usize;
        self.stamps[index] = self.generation;
        self.g_scores[index] = g;
        self.parents[index] = parent;
        self.frontier.push(OpenNode { f, g, node });
    }

    fn is_closed(&self, node: u32) -> bool {
        self.closed[node as usize] == self.generation
    }

    fn close(&mut self, node: u32) {
        self.closed[node as usize] = self.generation;
    }

    fn reconstruct(&self, encoder: &NodeEncoder, goal: u32, start: u32) -> Vec<TilePos> {
        let mut steps = Vec::new();
        let mut current = goal;
        while current != start && current != UNVISITED {
            steps.push(encoder.decode(current));
            current = self.parents[current as usize];
        }
        steps.reverse();
        steps
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skirmish_core::{TileKind, TileMap};

    fn pathfinder() -> Pathfinder {
        Pathfinder::new(PathfindingConfig::default())
    }

    #[test]
    fn octile_matches_diagonal_cost() {
        let h = octile(TilePos::new(0, 0), TilePos::new(3, 3));
        assert!((h - 3.0 * SQRT_2).abs() < 1e-4);
        let h = octile(TilePos::new(0, 0), TilePos::new(4, 1));
        assert!((h - (3.0 + SQRT_2)).abs() < 1e-4);
    }

    #[test]
    fn perimeter_visits_each_ring_tile_once() {
        let tiles: Vec<_> = perimeter(TilePos::new(0, 0), 2).collect();
        assert_eq!(tiles.len(), 16);
        let mut sorted = tiles.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(sorted.len(), 16);
        assert!(tiles
            .iter()
            .all(|tile| tile.x.abs() == 2 || tile.y.abs() == 2));
    }

    #[test]
    fn straight_corridor_excludes_start() {
        let map = TileMap::filled(6, 1, TileKind::Floor);
        let oracle = CollisionOracle::new(&map, &[]);
        let path = pathfinder()
            .find_path(&oracle, TilePos::new(0, 0), TilePos::new(4, 0), 0.3, 0)
            .expect("reachable");
        assert_eq!(
            path,
            vec![
                TilePos::new(1, 0),
                TilePos::new(2, 0),
                TilePos::new(3, 0),
                TilePos::new(4, 0),
            ]
        );
    }

    #[test]
    fn same_tile_yields_empty_path() {
        let map = TileMap::filled(3, 3, TileKind::Floor);
        let oracle = CollisionOracle::new(&map, &[]);
        let path = pathfinder().find_path(&oracle, TilePos::new(1, 1), TilePos::new(1, 1), 0.3, 0);
        assert_eq!(path, Some(Vec::new()));
    }

    #[test]
    fn walled_off_goal_yields_none() {
        let map = TileMap::from_rows(&["..~..", "..~..", "..~.."]).expect("valid map");
        let oracle = CollisionOracle::new(&map, &[]);
        let mut pathfinder = pathfinder();
        let path = pathfinder.find_path(&oracle, TilePos::new(0, 1), TilePos::new(4, 1), 0.3, 0);
        assert!(path.is_none());
        assert_eq!(pathfinder.cached_paths(), 0);
    }

    #[test]
    fn unwalkable_goal_retargets_to_nearest_tile() {
        let map = TileMap::from_rows(&["......", "....~~", "....~~"]).expect("valid map");
        let oracle = CollisionOracle::new(&map, &[]);
        let path = pathfinder()
            .find_path(&oracle, TilePos::new(0, 0), TilePos::new(5, 2), 0.3, 0)
            .expect("retargeted goal reachable");
        let last = *path.last().expect("non-empty path");
        assert!(oracle.is_tile_walkable(last, 0.3));
        assert_eq!(last.x.abs_diff(5).max(last.y.abs_diff(2)), 1);
    }

    #[test]
    fn expansion_cap_yields_none() {
        let map = TileMap::filled(40, 40, TileKind::Floor);
        let oracle = CollisionOracle::new(&map, &[]);
        let mut pathfinder = Pathfinder::new(PathfindingConfig {
            max_iterations: 5,
            ..PathfindingConfig::default()
        });
        let path = pathfinder.find_path(&oracle, TilePos::new(0, 0), TilePos::new(39, 39), 0.3, 0);
        assert!(path.is_none());
        assert_eq!(pathfinder.stats().exhausted, 1);
    }

    #[test]
    fn repeated_query_hits_cache() {
        let map = TileMap::filled(10, 10, TileKind::Floor);
        let oracle = CollisionOracle::new(&map, &[]);
        let mut pathfinder = pathfinder();
        let first = pathfinder.find_path(&oracle, TilePos::new(0, 0), TilePos::new(7, 3), 0.3, 1);
        let second = pathfinder.find_path(&oracle, TilePos::new(0, 0), TilePos::new(7, 3), 0.3, 50);
        assert_eq!(first, second);
        assert_eq!(pathfinder.stats().searches, 1);
        assert_eq!(pathfinder.stats().cache_hits, 1);
    }

    #[test]
    fn invalidate_forces_fresh_search() {
        let map = TileMap::filled(10, 10, TileKind::Floor);
        let oracle = CollisionOracle::new(&map, &[]);
        let mut pathfinder = pathfinder();
        let _ = pathfinder.find_path(&oracle, TilePos::new(0, 0), TilePos::new(7, 3), 0.3, 1);
        pathfinder.invalidate();
        let _ = pathfinder.find_path(&oracle, TilePos::new(0, 0), TilePos::new(7, 3), 0.3, 2);
        assert_eq!(pathfinder.stats().searches, 2);
    }

    #[test]
    fn path_cost_weights_diagonals() {
        let cost = path_cost(
            TilePos::new(0, 0),
            &[TilePos::new(1, 1), TilePos::new(2, 1)],
        );
        assert!((cost - (SQRT_2 + 1.0)).abs() < 1e-4);
    }
}

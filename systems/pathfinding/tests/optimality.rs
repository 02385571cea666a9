use std::collections::{BTreeMap, BTreeSet};

use proptest::prelude::*;
use skirmish_core::{PathfindingConfig, TileKind, TileMap, TilePos};
use skirmish_system_pathfinding::{path_cost, Pathfinder};
use skirmish_world::CollisionOracle;

const RADIUS: f32 = 0.3;

/// Exhaustive Dijkstra over the same neighbor rules, used as ground truth.
fn reference_cost(oracle: &CollisionOracle<'_>, start: TilePos, goal: TilePos) -> Option<f32> {
    let mut best: BTreeMap<TilePos, f32> = BTreeMap::new();
    let mut settled: BTreeSet<TilePos> = BTreeSet::new();
    let _ = best.insert(start, 0.0);

    loop {
        let current = best
            .iter()
            .filter(|(tile, _)| !settled.contains(*tile))
            .min_by(|a, b| a.1.total_cmp(b.1))
            .map(|(tile, cost)| (*tile, *cost));
        let (tile, cost) = current?;
        if tile == goal {
            return Some(cost);
        }
        let _ = settled.insert(tile);
        for neighbor in oracle.neighbors(tile, RADIUS) {
            let step = if neighbor.x != tile.x && neighbor.y != tile.y {
                std::f32::consts::SQRT_2
            } else {
                1.0
            };
            let candidate = cost + step;
            let entry = best.entry(neighbor).or_insert(f32::INFINITY);
            if candidate < *entry {
                *entry = candidate;
            }
        }
    }
}

fn arb_rows() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(prop::collection::vec(prop::bool::weighted(0.25), 8), 8).prop_map(
        |rows| {
            rows.into_iter()
                .map(|row| row.into_iter().map(|water| if water { '~' } else { '.' }).collect())
                .collect()
        },
    )
}

fn walkable_tile(map: &TileMap, oracle: &CollisionOracle<'_>, seed: usize) -> Option<TilePos> {
    let tiles: Vec<TilePos> = map
        .iter()
        .map(|(tile, _)| tile)
        .filter(|tile| oracle.is_tile_walkable(*tile, RADIUS))
        .collect();
    if tiles.is_empty() {
        None
    } else {
        Some(tiles[seed % tiles.len()])
    }
}

proptest! {
    #[test]
    fn astar_cost_matches_exhaustive_search(
        rows in arb_rows(),
        start_seed in 0usize..64,
        goal_seed in 0usize..64,
    ) {
        let map = TileMap::from_rows(rows.as_slice()).expect("generated map is rectangular");
        let oracle = CollisionOracle::new(&map, &[]);
        let (Some(start), Some(goal)) = (
            walkable_tile(&map, &oracle, start_seed),
            walkable_tile(&map, &oracle, goal_seed),
        ) else {
            return Ok(());
        };

        let mut pathfinder = Pathfinder::new(PathfindingConfig::default());
        let found = pathfinder.find_path(&oracle, start, goal, RADIUS, 0);
        let expected = reference_cost(&oracle, start, goal);

        match (found, expected) {
            (Some(steps), Some(cost)) => {
                prop_assert!((path_cost(start, &steps) - cost).abs() < 1e-3);
                prop_assert_eq!(steps.last().copied().unwrap_or(start), goal);
            }
            (None, None) => {}
            (found, expected) => {
                prop_assert!(false, "astar {:?} disagrees with reference {:?}", found, expected);
            }
        }
    }

    #[test]
    fn consecutive_steps_are_adjacent_and_walkable(
        rows in arb_rows(),
        start_seed in 0usize..64,
        goal_seed in 0usize..64,
    ) {
        let map = TileMap::from_rows(rows.as_slice()).expect("generated map is rectangular");
        let oracle = CollisionOracle::new(&map, &[]);
        let (Some(start), Some(goal)) = (
            walkable_tile(&map, &oracle, start_seed),
            walkable_tile(&map, &oracle, goal_seed),
        ) else {
            return Ok(());
        };

        let mut pathfinder = Pathfinder::new(PathfindingConfig::default());
        if let Some(steps) = pathfinder.find_path(&oracle, start, goal, RADIUS, 0) {
            let mut previous = start;
            for step in steps {
                prop_assert!(oracle.is_tile_walkable(step, RADIUS));
                prop_assert!(previous.x.abs_diff(step.x) <= 1 && previous.y.abs_diff(step.y) <= 1);
                prop_assert_ne!(previous, step);
                previous = step;
            }
        }
    }
}

#[test]
fn detours_around_a_wall() {
    let map = TileMap::from_rows(&[".....", ".~~~.", ".....", "....."]).expect("valid map");
    let oracle = CollisionOracle::new(&map, &[]);
    let mut pathfinder = Pathfinder::new(PathfindingConfig::default());
    let start = TilePos::new(2, 0);
    let goal = TilePos::new(2, 2);
    let steps = pathfinder
        .find_path(&oracle, start, goal, RADIUS, 0)
        .expect("goal reachable around the wall");
    let expected = reference_cost(&oracle, start, goal).expect("reference reachable");
    assert!((path_cost(start, &steps) - expected).abs() < 1e-3);
    assert!(steps.iter().all(|tile| oracle.is_tile_walkable(*tile, RADIUS)));
}

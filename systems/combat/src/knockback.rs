//! Landing search for knockback pushes.

use skirmish_core::{CombatConfig, Vec2, EPSILON};
use skirmish_world::CollisionOracle;

/// Push distance for an attacker of `power` hitting a target of `weight`.
pub(crate) fn push_distance(config: &CombatConfig, power: f32, weight: f32) -> f32 {
    if !weight.is_finite() || weight <= 0.0 || !power.is_finite() {
        return 0.0;
    }
    (config.knockback_base * power / weight).clamp(0.0, config.knockback_max)
}

/// Finds the farthest legal landing along `direction`, stepping back toward
/// the origin by the configured increment. Returns `None` when every
/// candidate on the line is blocked.
pub(crate) fn find_landing(
    oracle: &CollisionOracle<'_>,
    config: &CombatConfig,
    origin: Vec2,
    direction: Vec2,
    distance: f32,
    radius: f32,
) -> Option<Vec2> {
    let step = config.knockback_step.max(EPSILON);
    let mut travel = distance;
    while travel > EPSILON {
        let landing = origin + direction * travel;
        if oracle.is_walkable(landing, radius, None).walkable {
            return Some(landing);
        }
        travel -= step;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use skirmish_core::{TileKind, TileMap};

    #[test]
    fn heavy_targets_are_pushed_less() {
        let config = CombatConfig::default();
        assert!((push_distance(&config, 1.0, 2.0) - 0.5).abs() < 1e-6);
        assert!((push_distance(&config, 10.0, 1.0) - config.knockback_max).abs() < 1e-6);
        assert_eq!(push_distance(&config, 1.0, 0.0), 0.0);
    }

    #[test]
    fn landing_steps_back_from_water() {
        let map = TileMap::from_rows(&["....~"]).expect("valid map");
        let oracle = CollisionOracle::new(&map, &[]);
        let landing = find_landing(
            &oracle,
            &CombatConfig::default(),
            Vec2::new(2.5, 0.5),
            Vec2::new(1.0, 0.0),
            2.0,
            0.3,
        )
        .expect("a floor landing exists");
        assert!(landing.x + 0.3 <= 4.0 + 1e-4);
        assert!(landing.x > 2.5);
    }

    #[test]
    fn fully_blocked_line_yields_none() {
        let map = TileMap::from_rows(&["..~~~"]).expect("valid map");
        let oracle = CollisionOracle::new(&map, &[]);
        let landing = find_landing(
            &oracle,
            &CombatConfig::default(),
            Vec2::new(1.7, 0.5),
            Vec2::new(1.0, 0.0),
            2.0,
            0.3,
        );
        assert!(landing.is_none());
    }
}

use proptest::prelude::*;
use skirmish_core::{TileKind, TileMap, TilePos, Vec2};
use skirmish_world::{BlockReason, CollisionOracle};

const ROWS: [&str; 6] = [
    "..~~....",
    "..~~..=.",
    "......=.",
    "~~~.~~~~",
    "...==...",
    "........",
];

fn water_tiles(map: &TileMap) -> Vec<TilePos> {
    map.iter()
        .filter(|(_, kind)| *kind == TileKind::Water)
        .map(|(tile, _)| tile)
        .collect()
}

proptest! {
    #[test]
    fn water_is_never_walkable(
        index in 0usize..64,
        offset_x in 0.0f32..0.999,
        offset_y in 0.0f32..0.999,
        radius in 0.0f32..3.0,
    ) {
        let map = TileMap::from_rows(&ROWS).expect("valid map");
        let oracle = CollisionOracle::new(&map, &[]);
        let water = water_tiles(&map);
        let tile = water[index % water.len()];
        let position = Vec2::new(tile.x as f32 + offset_x, tile.y as f32 + offset_y);

        let result = oracle.is_walkable(position, radius, None);
        prop_assert!(!result.walkable);
        prop_assert!(matches!(
            result.reason,
            Some(BlockReason::Terrain | BlockReason::OutOfBounds)
        ));
    }

    #[test]
    fn walkability_is_a_pure_function(
        x in -2.0f32..10.0,
        y in -2.0f32..8.0,
        radius in 0.0f32..1.5,
    ) {
        let map = TileMap::from_rows(&ROWS).expect("valid map");
        let oracle = CollisionOracle::new(&map, &[]);
        let position = Vec2::new(x, y);
        prop_assert_eq!(
            oracle.is_walkable(position, radius, None),
            oracle.is_walkable(position, radius, None)
        );
    }
}

#[test]
fn bridges_are_walkable() {
    let map = TileMap::from_rows(&ROWS).expect("valid map");
    let oracle = CollisionOracle::new(&map, &[]);
    assert!(oracle.is_tile_walkable(TilePos::new(6, 1), 0.3));
    assert!(oracle.is_tile_walkable(TilePos::new(3, 4), 0.3));
}

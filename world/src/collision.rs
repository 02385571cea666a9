//! Stateless walkability and neighbor queries against the map and structures.

use skirmish_core::{Structure, StructureId, TileKind, TileMap, TilePos, Vec2, EPSILON};

/// Spacing between samples when sweeping a straight segment.
const SEGMENT_SAMPLE_SPACING: f32 = 0.25;

/// Reason a position was judged unwalkable.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlockReason {
    /// The position or part of its footprint lies outside the map.
    OutOfBounds,
    /// The footprint touches a water tile.
    Terrain,
    /// The footprint overlaps the named structure.
    Structure(StructureId),
}

/// Outcome of a walkability query.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Walkability {
    /// Whether the position may be occupied.
    pub walkable: bool,
    /// Why the position is blocked, when it is.
    pub reason: Option<BlockReason>,
}

impl Walkability {
    const CLEAR: Self = Self {
        walkable: true,
        reason: None,
    };

    const fn blocked(reason: BlockReason) -> Self {
        Self {
            walkable: false,
            reason: Some(reason),
        }
    }
}

/// Movement and collision oracle borrowing the map and structure list.
///
/// The oracle holds no mutable state: identical inputs always produce
/// identical answers.
#[derive(Clone, Copy, Debug)]
pub struct CollisionOracle<'a> {
    map: &'a TileMap,
    structures: &'a [Structure],
}

impl<'a> CollisionOracle<'a> {
    /// Creates an oracle over the provided map and structures.
    #[must_use]
    pub fn new(map: &'a TileMap, structures: &'a [Structure]) -> Self {
        Self { map, structures }
    }

    /// Map the oracle answers queries against.
    #[must_use]
    pub fn map(&self) -> &'a TileMap {
        self.map
    }

    /// Decides whether a circle of `radius` may stand at `position`.
    ///
    /// Every tile touched by the circle's bounding box must be walkable, so a
    /// wide unit cannot slip through a gap narrower than itself. Destroyed
    /// structures and the structure named by `ignore` are skipped.
    #[must_use]
    pub fn is_walkable(
        &self,
        position: Vec2,
        radius: f32,
        ignore: Option<StructureId>,
    ) -> Walkability {
        if !self.map.contains(position) || !radius.is_finite() {
            return Walkability::blocked(BlockReason::OutOfBounds);
        }

        let radius = radius.max(0.0);
        let min = TilePos::containing(Vec2::new(position.x - radius, position.y - radius));
        let max = TilePos::containing(Vec2::new(
            position.x + radius - EPSILON,
            position.y + radius - EPSILON,
        ));
        let max = TilePos::new(max.x.max(min.x), max.y.max(min.y));

        for y in min.y..=max.y {
            for x in min.x..=max.x {
                match self.map.tile(TilePos::new(x, y)) {
                    None => return Walkability::blocked(BlockReason::OutOfBounds),
                    Some(TileKind::Water) => return Walkability::blocked(BlockReason::Terrain),
                    Some(TileKind::Floor | TileKind::Bridge) => {}
                }
            }
        }

        for structure in self.structures {
            if structure.is_destroyed() || Some(structure.id) == ignore {
                continue;
            }
            if structure
                .shape
                .overlaps_circle(structure.position, position, radius)
            {
                return Walkability::blocked(BlockReason::Structure(structure.id));
            }
        }

        Walkability::CLEAR
    }

    /// Convenience wrapper answering whether a tile's centre is walkable.
    #[must_use]
    pub fn is_tile_walkable(&self, tile: TilePos, radius: f32) -> bool {
        self.is_walkable(tile.center(), radius, None).walkable
    }

    /// Walkable neighbors of `tile`: cardinals first, then diagonals.
    ///
    /// A diagonal is only offered when both cardinal tiles flanking it are
    /// walkable, which prevents cutting across a blocked tile's corner.
    #[must_use]
    pub fn neighbors(&self, tile: TilePos, radius: f32) -> Neighbors {
        let mut neighbors = Neighbors::default();

        let north = tile.offset(0, -1);
        let east = tile.offset(1, 0);
        let south = tile.offset(0, 1);
        let west = tile.offset(-1, 0);

        let north_open = self.is_tile_walkable(north, radius);
        let east_open = self.is_tile_walkable(east, radius);
        let south_open = self.is_tile_walkable(south, radius);
        let west_open = self.is_tile_walkable(west, radius);

        for (candidate, open) in [
            (north, north_open),
            (east, east_open),
            (south, south_open),
            (west, west_open),
        ] {
            if open {
                neighbors.push(candidate);
            }
        }

        for (candidate, first, second) in [
            (tile.offset(1, -1), north_open, east_open),
            (tile.offset(1, 1), south_open, east_open),
            (tile.offset(-1, 1), south_open, west_open),
            (tile.offset(-1, -1), north_open, west_open),
        ] {
            if first && second && self.is_tile_walkable(candidate, radius) {
                neighbors.push(candidate);
            }
        }

        neighbors
    }

    /// Reports whether a circle can slide in a straight line between two
    /// positions, sampling the segment at a fixed spacing.
    #[must_use]
    pub fn segment_clear(&self, from: Vec2, to: Vec2, radius: f32) -> bool {
        let length = from.distance(to);
        let samples = (length / SEGMENT_SAMPLE_SPACING).ceil().max(1.0) as u32;
        (1..=samples).all(|index| {
            let t = index as f32 / samples as f32;
            let point = from + (to - from) * t;
            self.is_walkable(point, radius, None).walkable
        })
    }
}

/// Up to eight walkable neighbor tiles produced by [`CollisionOracle::neighbors`].
#[derive(Clone, Debug, Default)]
pub struct Neighbors {
    buffer: [Option<TilePos>; 8],
    len: usize,
    cursor: usize,
}

impl Neighbors {
    fn push(&mut self, tile: TilePos) {
        if self.len < self.buffer.len() {
            self.buffer[self.len] = Some(tile);
            self.len += 1;
        }
    }
}

impl Iterator for Neighbors {
    type Item = TilePos;

    fn next(&mut self) -> Option<Self::Item> {
        if self.cursor >= self.len {
            return None;
        }

        let value = self.buffer[self.cursor];
        self.cursor += 1;
        value
    }
}

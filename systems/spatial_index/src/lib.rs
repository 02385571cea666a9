#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Per-tick grid partitioning of living units for proximity queries.
//!
//! The index is rebuilt once at the start of every tick and answers every
//! combat query of that tick from the same snapshot. Cell buckets keep their
//! allocations between rebuilds; only buckets touched by the previous tick
//! are cleared.

use skirmish_core::{FactionId, SpatialConfig, UnitId, UnitKind, Vec2};
use skirmish_world::World;
use tracing::trace;

/// Snapshot of a living unit captured when the index was rebuilt.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpatialEntry {
    /// Identifier of the unit.
    pub unit: UnitId,
    /// Faction owning the unit.
    pub owner: FactionId,
    /// Sub-type of the unit.
    pub kind: UnitKind,
    /// Position at rebuild time.
    pub position: Vec2,
    /// Collision radius.
    pub radius: f32,
}

/// Uniform grid over the map whose buckets are pooled across ticks.
#[derive(Debug)]
pub struct SpatialIndex {
    cell_size: u32,
    columns: u32,
    rows: u32,
    buckets: Vec<Vec<SpatialEntry>>,
    occupied: Vec<usize>,
    max_radius: f32,
    len: usize,
    rebuilt_tick: Option<u64>,
}

impl SpatialIndex {
    /// Creates an empty index; buckets are sized on the first rebuild.
    #[must_use]
    pub fn new(config: &SpatialConfig) -> Self {
        Self {
            cell_size: config.cell_size.max(1),
            columns: 0,
            rows: 0,
            buckets: Vec::new(),
            occupied: Vec::new(),
            max_radius: 0.0,
            len: 0,
            rebuilt_tick: None,
        }
    }

    /// Repopulates the grid from the world's living units.
    pub fn rebuild(&mut self, world: &World) {
        let map = world.map();
        let columns = map.width().div_ceil(self.cell_size).max(1);
        let rows = map.height().div_ceil(self.cell_size).max(1);
        if columns != self.columns || rows != self.rows {
            self.columns = columns;
            self.rows = rows;
            self.buckets = vec![Vec::new(); (columns as usize) * (rows as usize)];
            self.occupied.clear();
        }

        for index in self.occupied.drain(..) {
            self.buckets[index].clear();
        }
        self.max_radius = 0.0;
        self.len = 0;

        for unit in world.units().iter().filter(|unit| unit.is_alive()) {
            let index = self.bucket_index(self.cell_of(unit.position));
            let bucket = &mut self.buckets[index];
            if bucket.is_empty() {
                self.occupied.push(index);
            }
            bucket.push(SpatialEntry {
                unit: unit.id,
                owner: unit.owner,
                kind: unit.kind,
                position: unit.position,
                radius: unit.radius(),
            });
            self.max_radius = self.max_radius.max(unit.radius());
            self.len += 1;
        }

        self.occupied.sort_unstable();
        self.rebuilt_tick = Some(world.tick());
        trace!(
            tick = world.tick(),
            units = self.len,
            cells = self.occupied.len(),
            "spatial index rebuilt"
        );
    }

    /// Collects every entry whose circle may lie within `reach` of `center`.
    ///
    /// Only cells overlapping the padded query square are visited; callers
    /// apply the exact distance test. Candidates are appended in cell order
    /// and, within a cell, in ascending unit id.
    pub fn candidates(&self, center: Vec2, reach: f32, out: &mut Vec<SpatialEntry>) {
        if self.len == 0 || !center.is_finite() || !reach.is_finite() {
            return;
        }

        let padding = reach.max(0.0) + self.max_radius;
        let min = self.cell_of(Vec2::new(center.x - padding, center.y - padding));
        let max = self.cell_of(Vec2::new(center.x + padding, center.y + padding));
        for row in min.1..=max.1 {
            for column in min.0..=max.0 {
                out.extend_from_slice(&self.buckets[self.bucket_index((column, row))]);
            }
        }
    }

    /// Number of units captured by the last rebuild.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Reports whether the last rebuild captured no units.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Tick of the last rebuild, if any.
    #[must_use]
    pub const fn rebuilt_tick(&self) -> Option<u64> {
        self.rebuilt_tick
    }

    fn cell_of(&self, position: Vec2) -> (u32, u32) {
        let size = self.cell_size as f32;
        let clamp = |value: f32, cells: u32| -> u32 {
            if value.is_nan() || value <= 0.0 {
                0
            } else {
                ((value / size) as u32).min(cells.saturating_sub(1))
            }
        };
        (clamp(position.x, self.columns), clamp(position.y, self.rows))
    }

    fn bucket_index(&self, (column, row): (u32, u32)) -> usize {
        (row as usize) * (self.columns as usize) + column as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skirmish_core::{
        ArchetypeTag, Command, Element, SpawnRequest, TileKind, TileMap, UnitStats,
    };
    use skirmish_world::apply;

    fn stats() -> UnitStats {
        UnitStats {
            health: 10,
            move_speed: 0.1,
            radius: 0.3,
            weight: 1.0,
            power: 1.0,
            element: Element::Neutral,
            attack_damage: 1,
            attack_range: 0.5,
            attack_cooldown: 10,
        }
    }

    fn spawn(world: &mut World, owner: u32, x: f32, y: f32) {
        let mut events = Vec::new();
        apply(
            world,
            Command::SpawnUnit {
                request: SpawnRequest {
                    owner: FactionId::new(owner),
                    archetype: ArchetypeTag::Aggressive,
                    kind: UnitKind::Soldier,
                    position: Vec2::new(x, y),
                    stats: stats(),
                },
            },
            &mut events,
        );
    }

    fn world() -> World {
        World::with_map(TileMap::filled(20, 20, TileKind::Floor))
    }

    #[test]
    fn query_skips_distant_cells() {
        let mut world = world();
        spawn(&mut world, 0, 1.5, 1.5);
        spawn(&mut world, 1, 18.5, 18.5);

        let mut index = SpatialIndex::new(&SpatialConfig::default());
        index.rebuild(&world);

        let mut found = Vec::new();
        index.candidates(Vec2::new(2.0, 2.0), 1.0, &mut found);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].unit, UnitId::new(0));
    }

    #[test]
    fn dead_units_are_not_indexed() {
        let mut world = world();
        spawn(&mut world, 0, 1.5, 1.5);
        spawn(&mut world, 1, 2.5, 1.5);
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::DamageUnit {
                unit: UnitId::new(1),
                amount: 100,
            },
            &mut events,
        );

        let mut index = SpatialIndex::new(&SpatialConfig::default());
        index.rebuild(&world);
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn rebuild_replaces_previous_contents() {
        let mut world = world();
        spawn(&mut world, 0, 1.5, 1.5);
        let mut index = SpatialIndex::new(&SpatialConfig::default());
        index.rebuild(&world);

        if let Some(unit) = world.unit_mut(UnitId::new(0)) {
            unit.position = Vec2::new(15.5, 15.5);
        }
        let _ = world.advance_tick();
        index.rebuild(&world);

        let mut found = Vec::new();
        index.candidates(Vec2::new(1.5, 1.5), 1.0, &mut found);
        assert!(found.is_empty());
        index.candidates(Vec2::new(15.5, 15.5), 1.0, &mut found);
        assert_eq!(found.len(), 1);
        assert_eq!(index.rebuilt_tick(), Some(1));
    }

    #[test]
    fn query_reaching_past_map_edge_is_clamped() {
        let mut world = world();
        spawn(&mut world, 0, 0.5, 0.5);
        let mut index = SpatialIndex::new(&SpatialConfig::default());
        index.rebuild(&world);

        let mut found = Vec::new();
        index.candidates(Vec2::new(0.0, 0.0), 50.0, &mut found);
        assert_eq!(found.len(), 1);
    }
}

#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Combat resolver: proximity queries, range checks, damage and knockback.
//!
//! Every distance is measured surface to surface so large and small bodies
//! share the same notion of "touching". Invalid actions never panic; they
//! resolve to a failed [`AttackOutcome`] or to no movement.

mod knockback;

use skirmish_core::{
    circle_surface_distance, CombatConfig, Element, Event, Structure, StructureId, Unit, UnitId,
    Vec2,
};
use skirmish_system_spatial_index::{SpatialEntry, SpatialIndex};
use skirmish_world::World;
use tracing::{debug, info};

/// Candidate returned by proximity queries.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NearbyUnit {
    /// Identifier of the candidate.
    pub unit: UnitId,
    /// Surface distance from the querying unit.
    pub distance: f32,
}

/// Result of an attack attempt.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AttackOutcome {
    /// Whether damage was applied.
    pub success: bool,
    /// Damage applied after elemental adjustment.
    pub damage: u32,
    /// Whether the attack reduced the target's health to zero.
    pub target_killed: bool,
}

impl AttackOutcome {
    /// Outcome of an attack that was refused.
    pub const FAILED: Self = Self {
        success: false,
        damage: 0,
        target_killed: false,
    };
}

/// Stateless combat rules plus a reusable candidate buffer.
#[derive(Debug)]
pub struct CombatResolver {
    config: CombatConfig,
    scratch: Vec<SpatialEntry>,
}

impl CombatResolver {
    /// Creates a resolver with the provided tuning.
    #[must_use]
    pub fn new(config: CombatConfig) -> Self {
        Self {
            config,
            scratch: Vec::new(),
        }
    }

    /// Tuning the resolver applies.
    #[must_use]
    pub const fn config(&self) -> &CombatConfig {
        &self.config
    }

    /// Living units of a differing faction within `range` of `unit`,
    /// nearest first.
    pub fn find_nearby_enemies(
        &mut self,
        index: &SpatialIndex,
        world: &World,
        unit: UnitId,
        range: f32,
        out: &mut Vec<NearbyUnit>,
    ) {
        let Some(owner) = world.unit(unit).map(|record| record.owner) else {
            out.clear();
            return;
        };
        self.find_nearby(index, world, unit, range, |entry| entry.owner != owner, out);
    }

    /// Living units accepted by `accept` within `range` of `unit`, nearest
    /// first with ties broken by ascending id.
    ///
    /// Candidate positions are those captured when the index was rebuilt, so
    /// every query of a tick sees the same snapshot; units that died since
    /// the rebuild are skipped.
    pub fn find_nearby<F>(
        &mut self,
        index: &SpatialIndex,
        world: &World,
        unit: UnitId,
        range: f32,
        accept: F,
        out: &mut Vec<NearbyUnit>,
    ) where
        F: Fn(&SpatialEntry) -> bool,
    {
        out.clear();
        let Some(querier) = world.unit(unit) else {
            return;
        };

        self.scratch.clear();
        index.candidates(querier.position, range + querier.radius(), &mut self.scratch);

        for entry in &self.scratch {
            if entry.unit == unit || !accept(entry) {
                continue;
            }
            if !world.unit(entry.unit).is_some_and(Unit::is_alive) {
                continue;
            }
            let distance = circle_surface_distance(
                querier.position,
                querier.radius(),
                entry.position,
                entry.radius,
            );
            if distance <= range {
                out.push(NearbyUnit {
                    unit: entry.unit,
                    distance,
                });
            }
        }

        out.sort_by(|a, b| {
            a.distance
                .total_cmp(&b.distance)
                .then_with(|| a.unit.cmp(&b.unit))
        });
    }

    /// Applies an attack from `attacker` on `target` with `raw_damage`.
    ///
    /// Refused when either unit is missing, the target is already dead, or
    /// both share a faction.
    pub fn attack_unit(
        &self,
        world: &mut World,
        attacker: UnitId,
        target: UnitId,
        raw_damage: u32,
        out_events: &mut Vec<Event>,
    ) -> AttackOutcome {
        let Some((attacker_record, target_record)) = world.unit_pair_mut(attacker, target) else {
            return AttackOutcome::FAILED;
        };
        if !target_record.is_alive() || attacker_record.owner == target_record.owner {
            return AttackOutcome::FAILED;
        }

        let adjusted = elemental_damage(
            &self.config,
            raw_damage,
            attacker_record.stats.element,
            target_record.stats.element,
        );
        let dealt = adjusted.min(target_record.health);
        target_record.health -= dealt;
        let remaining = target_record.health;
        let killed = remaining == 0;

        out_events.push(Event::UnitDamaged {
            unit: target,
            attacker: Some(attacker),
            amount: dealt,
            remaining,
        });
        if killed {
            debug!(unit = target.get(), killer = attacker.get(), "unit killed");
            out_events.push(Event::UnitKilled {
                unit: target,
                killer: Some(attacker),
            });
        }

        AttackOutcome {
            success: true,
            damage: dealt,
            target_killed: killed,
        }
    }

    /// Applies an attack from `attacker` on a structure.
    ///
    /// Refused when the structure is already destroyed or owned by the
    /// attacker's faction. Destruction is reported exactly once.
    pub fn attack_structure(
        &self,
        world: &mut World,
        attacker: UnitId,
        structure: StructureId,
        raw_damage: u32,
        out_events: &mut Vec<Event>,
    ) -> AttackOutcome {
        let Some((attacker_record, structure_record)) =
            world.unit_and_structure_mut(attacker, structure)
        else {
            return AttackOutcome::FAILED;
        };
        if structure_record.is_destroyed() || attacker_record.owner == structure_record.owner {
            return AttackOutcome::FAILED;
        }

        let dealt = raw_damage.min(structure_record.health);
        structure_record.health -= dealt;
        let remaining = structure_record.health;
        let destroyed = remaining == 0;

        out_events.push(Event::StructureDamaged {
            structure,
            attacker,
            amount: dealt,
            remaining,
        });
        if destroyed {
            info!(
                structure = structure.get(),
                owner = structure_record.owner.get(),
                "structure destroyed"
            );
            out_events.push(Event::StructureDestroyed {
                structure,
                owner: structure_record.owner,
            });
        }

        AttackOutcome {
            success: true,
            damage: dealt,
            target_killed: destroyed,
        }
    }

    /// Pushes `target` away from `attacker` and returns the landing point.
    ///
    /// The full push distance is tried first, then positions stepping back
    /// toward the attacker along the same line. When no landing on that line
    /// is walkable the target stays put and `None` is returned.
    pub fn apply_knockback(
        &self,
        world: &mut World,
        attacker: UnitId,
        target: UnitId,
        out_events: &mut Vec<Event>,
    ) -> Option<Vec2> {
        let attacker_record = world.unit(attacker)?;
        let target_record = world.unit(target)?;
        let origin = target_record.position;
        let direction = (origin - attacker_record.position).normalized()?;
        let distance = knockback::push_distance(
            &self.config,
            attacker_record.stats.power,
            target_record.stats.weight,
        );
        let landing = knockback::find_landing(
            &world.oracle(),
            &self.config,
            origin,
            direction,
            distance,
            target_record.radius(),
        )?;

        let record = world.unit_mut(target)?;
        record.position = landing;
        out_events.push(Event::UnitKnockedBack {
            unit: target,
            from: origin,
            to: landing,
        });
        Some(landing)
    }
}

/// Reports whether `target` lies within `range` of `attacker`, surface to
/// surface.
#[must_use]
pub fn is_in_attack_range(attacker: &Unit, target: &Unit, range: f32) -> bool {
    circle_surface_distance(
        attacker.position,
        attacker.radius(),
        target.position,
        target.radius(),
    ) <= range
}

/// Reports whether `structure` lies within `range` of `attacker`, measured
/// against the structure's own footprint.
#[must_use]
pub fn is_structure_in_range(attacker: &Unit, structure: &Structure, range: f32) -> bool {
    structure.surface_distance(attacker.position, attacker.radius()) <= range
}

/// Tick-counter cooldown gate; an action never taken is always ready.
#[must_use]
pub fn cooldown_ready(current_tick: u64, last_action_tick: Option<u64>, cooldown: u64) -> bool {
    last_action_tick.map_or(true, |last| current_tick.saturating_sub(last) >= cooldown)
}

/// Raw damage adjusted by the elemental counter cycle.
///
/// A positive raw amount never rounds down to zero.
#[must_use]
pub fn elemental_damage(
    config: &CombatConfig,
    raw_damage: u32,
    attacker: Element,
    defender: Element,
) -> u32 {
    if raw_damage == 0 {
        return 0;
    }
    let multiplier = if attacker.beats(defender) {
        config.advantage_multiplier
    } else if defender.beats(attacker) {
        config.disadvantage_multiplier
    } else {
        return raw_damage;
    };
    let scaled = (raw_damage as f32 * multiplier).round();
    if scaled >= u32::MAX as f32 {
        u32::MAX
    } else {
        (scaled as u32).max(1)
    }
}

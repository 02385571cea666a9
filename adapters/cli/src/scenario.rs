//! TOML scenario description consumed by the headless runner.

use std::{collections::BTreeMap, fs, path::Path};

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use skirmish_core::{
    ArchetypeTag, Command, Element, FactionId, Shape, SimulationConfig, SpawnRequest,
    StructureKind, TileMap, UnitKind, UnitStats, Vec2,
};

/// Battlefield, participants and tuning for one headless run.
#[derive(Clone, Debug, Deserialize)]
pub(crate) struct Scenario {
    /// Seed of the simulation's random source.
    #[serde(default)]
    pub(crate) seed: u64,
    /// Number of ticks to simulate.
    #[serde(default = "default_ticks")]
    pub(crate) ticks: u64,
    /// Map rows using `~` water, `.` floor and `=` bridge.
    map: Vec<String>,
    /// Stat presets keyed by unit sub-type.
    #[serde(default)]
    stats: BTreeMap<UnitKind, UnitStats>,
    #[serde(default)]
    structures: Vec<StructureSpec>,
    #[serde(default)]
    units: Vec<UnitSpec>,
    /// Overrides applied on top of the default tuning.
    #[serde(default)]
    pub(crate) config: SimulationConfig,
}

#[derive(Clone, Debug, Deserialize)]
struct StructureSpec {
    owner: u32,
    kind: StructureKind,
    position: Vec2,
    shape: Shape,
    health: u32,
}

#[derive(Clone, Debug, Deserialize)]
struct UnitSpec {
    owner: u32,
    archetype: ArchetypeTag,
    kind: UnitKind,
    position: Vec2,
    /// Explicit stats; the sub-type preset applies when omitted.
    stats: Option<UnitStats>,
}

const fn default_ticks() -> u64 {
    600
}

impl Scenario {
    /// Reads and parses a scenario file.
    pub(crate) fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("read scenario {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("parse scenario {}", path.display()))
    }

    /// Parses a scenario from TOML text.
    pub(crate) fn parse(text: &str) -> Result<Self> {
        toml::from_str(text).context("invalid scenario TOML")
    }

    /// Commands that build the scenario's world from scratch, in order.
    pub(crate) fn commands(&self) -> Result<Vec<Command>> {
        let map = TileMap::from_rows(self.map.as_slice()).context("invalid map rows")?;
        let mut commands = vec![Command::LoadMap { map }];

        commands.extend(self.structures.iter().map(|spec| Command::PlaceStructure {
            owner: FactionId::new(spec.owner),
            kind: spec.kind,
            position: spec.position,
            shape: spec.shape,
            health: spec.health,
        }));

        for (index, spec) in self.units.iter().enumerate() {
            let stats = spec
                .stats
                .or_else(|| self.stats.get(&spec.kind).copied())
                .unwrap_or_else(|| preset(spec.kind));
            if !spec.position.is_finite() {
                return Err(anyhow!("unit #{index} has a non-finite position"));
            }
            commands.push(Command::SpawnUnit {
                request: SpawnRequest {
                    owner: FactionId::new(spec.owner),
                    archetype: spec.archetype,
                    kind: spec.kind,
                    position: spec.position,
                    stats,
                },
            });
        }
        Ok(commands)
    }
}

/// Built-in stat block for each sub-type.
fn preset(kind: UnitKind) -> UnitStats {
    let base = UnitStats {
        health: 20,
        move_speed: 0.15,
        radius: 0.3,
        weight: 1.0,
        power: 1.0,
        element: Element::Neutral,
        attack_damage: 3,
        attack_range: 0.4,
        attack_cooldown: 20,
    };
    match kind {
        UnitKind::Soldier => base,
        UnitKind::Archer => UnitStats {
            health: 14,
            attack_range: 3.0,
            attack_damage: 2,
            weight: 0.8,
            ..base
        },
        UnitKind::Brute => UnitStats {
            health: 40,
            move_speed: 0.1,
            radius: 0.45,
            weight: 2.5,
            power: 2.0,
            attack_damage: 6,
            attack_cooldown: 30,
            ..base
        },
        UnitKind::Wolf => UnitStats {
            health: 16,
            move_speed: 0.22,
            radius: 0.25,
            weight: 0.8,
            attack_damage: 3,
            attack_cooldown: 15,
            element: Element::Nature,
            ..base
        },
        UnitKind::Bear => UnitStats {
            health: 45,
            move_speed: 0.12,
            radius: 0.45,
            weight: 3.0,
            power: 2.5,
            attack_damage: 7,
            attack_cooldown: 30,
            element: Element::Nature,
            ..base
        },
        UnitKind::Deer => UnitStats {
            health: 12,
            move_speed: 0.25,
            radius: 0.3,
            weight: 0.9,
            attack_damage: 0,
            ..base
        },
        UnitKind::Rabbit => UnitStats {
            health: 4,
            move_speed: 0.28,
            radius: 0.15,
            weight: 0.3,
            attack_damage: 0,
            ..base
        },
        UnitKind::Sheep => UnitStats {
            health: 10,
            move_speed: 0.12,
            radius: 0.3,
            weight: 1.2,
            attack_damage: 0,
            ..base
        },
    }
}

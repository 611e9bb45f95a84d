//! Simulation scenario loader.
//!
//! A scenario names a handful of units and a timeline of actions the
//! simulator replays against the aura engine.

use std::collections::HashMap;
use std::path::Path;

use aura_core::spell::{ProcFlags, ProcHitMask, ProcSpellPhase, ProcSpellType};
use aura_core::types::ObjectKind;
use aura_core::{MemoryUnit, MemoryWorld, ObjectGuid, Position, SpellId};
use serde::{Deserialize, Serialize};

use crate::loaders::{LoadResult, read_file};

/// One unit placed in the scenario world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitSpec {
    /// Name used by timeline actions.
    pub name: String,
    #[serde(default = "default_kind")]
    pub kind: ObjectKind,
    /// Per-kind guid counter.
    pub id: u64,
    pub position: Position,
    #[serde(default)]
    pub faction: u32,
    #[serde(default)]
    pub group: Option<u32>,
    #[serde(default = "default_level")]
    pub level: u16,
    #[serde(default = "default_health")]
    pub health: u32,
    /// Name of the controlling unit, for pets and summons.
    #[serde(default)]
    pub owner: Option<String>,
}

fn default_kind() -> ObjectKind {
    ObjectKind::Creature
}

fn default_level() -> u16 {
    60
}

fn default_health() -> u32 {
    1000
}

impl UnitSpec {
    pub fn guid(&self) -> ObjectGuid {
        ObjectGuid::new(self.kind, self.id)
    }
}

/// Something that happens at a point of the timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ScenarioAction {
    /// Cast an aura spell; refreshes or stacks an existing aura.
    Apply {
        spell: SpellId,
        caster: String,
        target: String,
    },
    /// Cancel every aura of `spell` on `target`.
    Remove { spell: SpellId, target: String },
    /// Dispel `charges` stacks or charges of `spell` from `target`.
    Dispel {
        spell: SpellId,
        target: String,
        dispeller: String,
        /// Spell doing the dispel, reported to dispel hooks.
        #[serde(default)]
        using: Option<SpellId>,
        #[serde(default = "default_charges")]
        charges: u8,
    },
    /// Combat event between two units.
    Proc {
        actor: String,
        target: String,
        #[serde(default)]
        actor_flags: ProcFlags,
        #[serde(default)]
        target_flags: ProcFlags,
        #[serde(default)]
        spell: Option<SpellId>,
        #[serde(default)]
        spell_type: ProcSpellType,
        #[serde(default)]
        phase: ProcSpellPhase,
        #[serde(default = "default_hit")]
        hit: ProcHitMask,
        #[serde(default)]
        damage: u32,
    },
    Move { unit: String, position: Position },
    Kill { unit: String },
}

fn default_charges() -> u8 {
    1
}

fn default_hit() -> ProcHitMask {
    ProcHitMask::NORMAL
}

impl ScenarioAction {
    /// Unit names this action refers to.
    pub fn unit_names(&self) -> Vec<&str> {
        let names = match self {
            Self::Apply { caster, target, .. } => vec![caster, target],
            Self::Remove { target, .. } => vec![target],
            Self::Dispel {
                target, dispeller, ..
            } => vec![target, dispeller],
            Self::Proc { actor, target, .. } => vec![actor, target],
            Self::Move { unit, .. } | Self::Kill { unit } => vec![unit],
        };
        names.into_iter().map(String::as_str).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimedAction {
    /// Milliseconds since scenario start.
    pub at: u64,
    pub action: ScenarioAction,
}

/// A complete simulation input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,
    /// Total simulated time in milliseconds.
    pub duration: u64,
    #[serde(default)]
    pub units: Vec<UnitSpec>,
    #[serde(default)]
    pub timeline: Vec<TimedAction>,
}

impl Scenario {
    /// Guid of the unit called `name`.
    pub fn guid(&self, name: &str) -> Option<ObjectGuid> {
        self.units
            .iter()
            .find(|unit| unit.name == name)
            .map(UnitSpec::guid)
    }

    /// Same as [`Scenario::guid`] but an error for unknown names.
    pub fn resolve(&self, name: &str) -> LoadResult<ObjectGuid> {
        self.guid(name)
            .ok_or_else(|| anyhow::anyhow!("Unknown unit '{}' in scenario '{}'", name, self.name))
    }

    /// Name of the unit with `guid`, for display.
    pub fn name_of(&self, guid: ObjectGuid) -> Option<&str> {
        self.units
            .iter()
            .find(|unit| unit.guid() == guid)
            .map(|unit| unit.name.as_str())
    }

    /// Builds the in-memory world holding every scenario unit.
    pub fn build_world(&self) -> LoadResult<MemoryWorld> {
        let mut world = MemoryWorld::new();
        for spec in &self.units {
            let mut unit = MemoryUnit::new(spec.guid(), spec.position)
                .with_faction(spec.faction)
                .with_level(spec.level)
                .with_health(spec.health);
            if let Some(group) = spec.group {
                unit = unit.in_group(group);
            }
            if let Some(owner) = &spec.owner {
                unit = unit.owned_by(self.resolve(owner)?);
            }
            world.insert(unit);
        }
        Ok(world)
    }

    /// Checks names and guids are unique and every action targets a known
    /// unit, then orders the timeline by time.
    pub fn validate(&mut self) -> LoadResult<()> {
        let mut names = HashMap::new();
        for unit in &self.units {
            if names.insert(unit.name.as_str(), unit.guid()).is_some() {
                anyhow::bail!("Duplicate unit name '{}'", unit.name);
            }
            if !unit.kind.is_unit() && unit.kind != ObjectKind::DynamicObject {
                anyhow::bail!("Unit '{}' has non-unit kind {}", unit.name, unit.kind);
            }
        }
        let mut guids: Vec<ObjectGuid> = names.values().copied().collect();
        guids.sort();
        guids.dedup();
        if guids.len() != self.units.len() {
            anyhow::bail!("Two units share the same kind and id");
        }

        for unit in &self.units {
            if let Some(owner) = &unit.owner
                && !names.contains_key(owner.as_str())
            {
                anyhow::bail!("Unit '{}' is owned by unknown unit '{}'", unit.name, owner);
            }
        }
        for step in &self.timeline {
            if step.at > self.duration {
                anyhow::bail!("Action at {}ms is past the scenario end ({}ms)", step.at, self.duration);
            }
            for name in step.action.unit_names() {
                if !names.contains_key(name) {
                    anyhow::bail!("Action at {}ms refers to unknown unit '{}'", step.at, name);
                }
            }
        }

        self.timeline.sort_by_key(|step| step.at);
        Ok(())
    }
}

/// Loader for scenarios from RON files.
pub struct ScenarioLoader;

impl ScenarioLoader {
    /// Load and validate a scenario from a RON file.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the RON file containing a [`Scenario`]
    ///
    /// # Returns
    ///
    /// Returns a Scenario whose timeline is sorted by time.
    pub fn load(path: &Path) -> LoadResult<Scenario> {
        let content = read_file(path)?;
        Self::parse(&content)
            .map_err(|e| anyhow::anyhow!("Failed to load scenario {}: {}", path.display(), e))
    }

    pub fn parse(content: &str) -> LoadResult<Scenario> {
        let mut scenario: Scenario = ron::from_str(content)
            .map_err(|e| anyhow::anyhow!("Failed to parse scenario RON: {}", e))?;
        scenario.validate()?;
        Ok(scenario)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DUEL: &str = r#"#![enable(unwrap_newtypes)]
    (
        name: "duel",
        duration: 10000,
        units: [
            (name: "mage", kind: Player, id: 1, position: (x: 0.0, y: 0.0, z: 0.0), faction: 1),
            (name: "boar", id: 7, position: (x: 5.0, y: 0.0, z: 0.0), faction: 14, health: 300),
        ],
        timeline: [
            (at: 4000, action: Kill(unit: "boar")),
            (at: 0, action: Apply(spell: 118, caster: "mage", target: "boar")),
        ],
    )"#;

    #[test]
    fn timeline_is_sorted_and_units_resolve() {
        let scenario = ScenarioLoader::parse(DUEL).expect("scenario");
        assert_eq!(scenario.timeline[0].at, 0);
        assert_eq!(scenario.guid("mage"), Some(ObjectGuid::player(1)));
        assert_eq!(scenario.guid("boar"), Some(ObjectGuid::unit(7)));
        assert_eq!(scenario.name_of(ObjectGuid::unit(7)), Some("boar"));
    }

    #[test]
    fn world_carries_unit_stats() {
        let scenario = ScenarioLoader::parse(DUEL).expect("scenario");
        let world = scenario.build_world().expect("world");
        let boar = world.unit(ObjectGuid::unit(7)).expect("boar");
        assert_eq!(boar.health, 300);
        assert_eq!(boar.faction, 14);
        assert_eq!(boar.level, 60);
    }

    #[test]
    fn unknown_unit_in_action_is_rejected() {
        let err = ScenarioLoader::parse(&DUEL.replace("Kill(unit: \"boar\")", "Kill(unit: \"wolf\")"))
            .expect_err("unknown unit");
        assert!(err.to_string().contains("wolf"));
    }
}

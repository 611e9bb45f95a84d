//! Scenario replay against the aura engine.

use anyhow::{Context, Result};
use aura_content::{Scenario, ScenarioAction};
use aura_core::holder::diminished_duration;
use aura_core::spell::{DiminishingGroup, SchoolMask};
use aura_core::{
    AuraConfig, AuraCreateInfo, AuraEngine, AuraEnv, AuraState, DamageKind, MemoryWorld,
    ObjectGuid, PcgRng, ProcSpell, ProcTrigger, RemoveMode, SpellCatalog, SpellId, SpellOracle,
};

/// Something observable that happened during the replay.
#[derive(Clone, Debug, PartialEq)]
pub enum SimEvent {
    Applied {
        spell: SpellId,
        target: ObjectGuid,
        refreshed: bool,
    },
    /// An action had no effect.
    Skipped { reason: String },
    Removed { spell: SpellId, target: ObjectGuid, count: usize },
    Dispelled {
        spell: SpellId,
        target: ObjectGuid,
        gone: bool,
    },
    Combat { actor: ObjectGuid, target: ObjectGuid },
    Moved { unit: ObjectGuid },
    Died { unit: ObjectGuid },
    Damage {
        target: ObjectGuid,
        spell: SpellId,
        amount: u32,
        critical: bool,
        periodic: bool,
    },
    Heal {
        target: ObjectGuid,
        spell: SpellId,
        amount: u32,
        critical: bool,
    },
    Power {
        target: ObjectGuid,
        spell: SpellId,
        amount: i32,
    },
    Cast {
        caster: ObjectGuid,
        target: Option<ObjectGuid>,
        spell: SpellId,
    },
    Sync {
        target: ObjectGuid,
        updates: usize,
        bytes: usize,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub struct SimLine {
    /// Milliseconds since scenario start.
    pub at: u64,
    pub event: SimEvent,
}

/// Live aura on a unit at the end of the replay.
#[derive(Clone, Debug, PartialEq)]
pub struct AuraSummary {
    pub spell: SpellId,
    pub name: String,
    pub stacks: u8,
    pub charges: u8,
    /// Remaining milliseconds, `None` for permanent auras.
    pub remaining: Option<i32>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct UnitSummary {
    pub name: String,
    pub guid: ObjectGuid,
    pub health: u32,
    pub max_health: u32,
    pub alive: bool,
    pub auras: Vec<AuraSummary>,
}

/// Positions in the world's append-only logs already turned into events.
#[derive(Default)]
struct LogCursor {
    damage: usize,
    heals: usize,
    power: usize,
    casts: usize,
    packets: usize,
}

pub struct Simulation<'a> {
    catalog: &'a SpellCatalog,
    scenario: &'a Scenario,
    state: AuraState,
    world: MemoryWorld,
    rng: PcgRng,
    cursor: LogCursor,
    now: u64,
}

impl<'a> Simulation<'a> {
    pub fn new(
        catalog: &'a SpellCatalog,
        scenario: &'a Scenario,
        config: AuraConfig,
        seed: u64,
    ) -> Result<Self> {
        let world = scenario
            .build_world()
            .with_context(|| format!("Failed to build world for scenario '{}'", scenario.name))?;
        Ok(Self {
            catalog,
            scenario,
            state: AuraState::new(config).with_seed(seed),
            world,
            rng: PcgRng,
            cursor: LogCursor::default(),
            now: 0,
        })
    }

    fn engine(&mut self) -> AuraEngine<'_> {
        AuraEngine::new(
            &mut self.state,
            AuraEnv::new(self.catalog, &self.rng),
            &mut self.world,
        )
    }

    /// Replays the whole timeline, advancing the engine by at most `step`
    /// milliseconds at a time and stopping exactly on every action time.
    pub fn run(&mut self, step: u32) -> Result<Vec<SimLine>> {
        anyhow::ensure!(step > 0, "step must be positive");
        let scenario = self.scenario;
        let timeline = &scenario.timeline;
        let mut lines = Vec::new();
        let mut next = 0;

        loop {
            while let Some(entry) = timeline.get(next).filter(|entry| entry.at <= self.now) {
                let event = self.perform(&entry.action)?;
                lines.push(SimLine { at: self.now, event });
                next += 1;
            }
            // Flush what the actions produced before time moves on.
            self.engine().update(0);
            self.collect(&mut lines);

            if self.now >= scenario.duration {
                break;
            }
            let mut diff = u64::from(step).min(scenario.duration - self.now);
            if let Some(entry) = timeline.get(next) {
                diff = diff.min(entry.at - self.now);
            }
            // Bounded by `step`.
            let diff = u32::try_from(diff).unwrap_or(step);
            self.engine().update(diff);
            self.now += u64::from(diff);
            self.collect(&mut lines);
        }

        tracing::info!(
            target: "aura::sim",
            scenario = %scenario.name,
            events = lines.len(),
            auras = self.state.aura_count(),
            "scenario finished"
        );
        Ok(lines)
    }

    fn perform(&mut self, action: &ScenarioAction) -> Result<SimEvent> {
        let scenario = self.scenario;
        tracing::debug!(target: "aura::sim", at = self.now, ?action, "action");

        let event = match action {
            ScenarioAction::Apply {
                spell,
                caster,
                target,
            } => self.apply(*spell, scenario.resolve(caster)?, scenario.resolve(target)?)?,
            ScenarioAction::Remove { spell, target } => {
                let target = scenario.resolve(target)?;
                let count = self
                    .engine()
                    .remove_applied_auras_by_spell(target, *spell, None, RemoveMode::Cancel);
                SimEvent::Removed {
                    spell: *spell,
                    target,
                    count,
                }
            }
            ScenarioAction::Dispel {
                spell,
                target,
                dispeller,
                using,
                charges,
            } => {
                let target = scenario.resolve(target)?;
                let dispeller = scenario.resolve(dispeller)?;
                let Some(id) = self.state.find_applied(target, *spell).map(|aura| aura.id()) else {
                    return Ok(SimEvent::Skipped {
                        reason: format!("nothing to dispel: spell {spell} not on {target}"),
                    });
                };
                let gone = self
                    .engine()
                    .dispel(id, dispeller, using.unwrap_or_default(), *charges);
                SimEvent::Dispelled {
                    spell: *spell,
                    target,
                    gone,
                }
            }
            ScenarioAction::Proc {
                actor,
                target,
                actor_flags,
                target_flags,
                spell,
                spell_type,
                phase,
                hit,
                damage,
            } => {
                let actor = scenario.resolve(actor)?;
                let target = scenario.resolve(target)?;
                let mut trigger = ProcTrigger::new(Some(actor), Some(target))
                    .with_flags(*actor_flags, *target_flags)
                    .with_hit(*hit);
                let mut school = SchoolMask::PHYSICAL;
                if let Some(spell) = spell {
                    let info = self
                        .catalog
                        .spell(*spell)
                        .with_context(|| format!("Proc spell {spell} not in catalog"))?;
                    school = info.school_mask;
                    trigger = trigger
                        .with_spell(ProcSpell::new(info))
                        .with_spell_type(*spell_type, *phase);
                }
                if *damage > 0 {
                    trigger = trigger.with_damage(*damage, school);
                }
                self.engine().trigger_procs(&trigger);
                SimEvent::Combat { actor, target }
            }
            ScenarioAction::Move { unit, position } => {
                let unit = scenario.resolve(unit)?;
                self.world.move_to(unit, *position);
                SimEvent::Moved { unit }
            }
            ScenarioAction::Kill { unit } => {
                let unit = scenario.resolve(unit)?;
                self.world.kill(unit);
                self.engine().remove_auras_on_death(unit);
                SimEvent::Died { unit }
            }
        };
        Ok(event)
    }

    /// Casts `spell` on `target`, applying diminishing returns to its
    /// duration first.
    fn apply(&mut self, spell: SpellId, caster: ObjectGuid, target: ObjectGuid) -> Result<SimEvent> {
        let info = self
            .catalog
            .spell(spell)
            .with_context(|| format!("Spell {spell} not in catalog"))?;
        if !self.world.unit(target).is_some_and(|unit| unit.alive) {
            return Ok(SimEvent::Skipped {
                reason: format!("{} is dead", info.name),
            });
        }

        let mut duration = None;
        if let Some(base) = info.duration.filter(|_| info.diminishing_group != DiminishingGroup::None) {
            let level = self.engine().apply_diminishing(target, info.diminishing_group);
            let reduced = diminished_duration(base, level);
            if reduced == 0 {
                return Ok(SimEvent::Skipped {
                    reason: format!("{} diminished to immunity", info.name),
                });
            }
            duration = Some(reduced).filter(|reduced| *reduced != base);
        }

        let mut engine = self.engine();
        let handle = match engine.try_refresh_stack_or_create(AuraCreateInfo::new(spell, target).with_caster(caster)) {
            Ok(handle) => handle,
            Err(err) => {
                return Ok(SimEvent::Skipped {
                    reason: err.to_string(),
                });
            }
        };
        if let Some(duration) = duration {
            engine.set_duration(handle.aura, duration, true);
        }
        Ok(SimEvent::Applied {
            spell,
            target,
            refreshed: handle.refreshed,
        })
    }

    /// Turns new world log entries into events.
    fn collect(&mut self, lines: &mut Vec<SimLine>) {
        let at = self.now;
        let world = &self.world;
        let cursor = &mut self.cursor;

        for hit in &world.damage[cursor.damage..] {
            lines.push(SimLine {
                at,
                event: SimEvent::Damage {
                    target: hit.target,
                    spell: hit.spell,
                    amount: hit.amount,
                    critical: hit.critical,
                    periodic: matches!(hit.kind, DamageKind::Periodic),
                },
            });
        }
        for heal in &world.heals[cursor.heals..] {
            lines.push(SimLine {
                at,
                event: SimEvent::Heal {
                    target: heal.target,
                    spell: heal.spell,
                    amount: heal.amount,
                    critical: heal.critical,
                },
            });
        }
        for change in &world.power_changes[cursor.power..] {
            lines.push(SimLine {
                at,
                event: SimEvent::Power {
                    target: change.target,
                    spell: change.spell,
                    amount: change.amount,
                },
            });
        }
        for cast in &world.casts[cursor.casts..] {
            lines.push(SimLine {
                at,
                event: SimEvent::Cast {
                    caster: cast.caster,
                    target: cast.target,
                    spell: cast.spell,
                },
            });
        }
        for packet in &world.packets[cursor.packets..] {
            lines.push(SimLine {
                at,
                event: SimEvent::Sync {
                    target: packet.target,
                    updates: packet.updates.len(),
                    bytes: packet.encode().len(),
                },
            });
        }

        cursor.damage = world.damage.len();
        cursor.heals = world.heals.len();
        cursor.power = world.power_changes.len();
        cursor.casts = world.casts.len();
        cursor.packets = world.packets.len();
    }

    /// End state of every scenario unit.
    pub fn summary(&self) -> Vec<UnitSummary> {
        self.scenario
            .units
            .iter()
            .filter_map(|spec| {
                let guid = spec.guid();
                let unit = self.world.unit(guid)?;
                let auras = self
                    .state
                    .applied_auras(guid)
                    .into_iter()
                    .filter_map(|id| self.state.live_aura(id))
                    .map(|aura| AuraSummary {
                        spell: aura.spell().id,
                        name: aura.spell().name.clone(),
                        stacks: aura.stack_amount(),
                        charges: aura.charges(),
                        remaining: (!aura.is_permanent()).then(|| aura.duration()),
                    })
                    .collect();
                Some(UnitSummary {
                    name: spec.name.clone(),
                    guid,
                    health: unit.health,
                    max_health: unit.max_health,
                    alive: unit.alive,
                    auras,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aura_content::{ScenarioLoader, SpellCatalogLoader};

    const CATALOG: &str = r#"#![enable(unwrap_newtypes)]
    (spells: [
        (
            id: 172,
            name: "Corruption",
            duration: Some(6000),
            effects: [(index: 0, effect: ApplyAura, aura: PeriodicDamage, base_points: 40, amplitude: 2000)],
        ),
        (
            id: 324,
            name: "Lightning Shield",
            duration: Some(600000),
            proc_charges: 2,
            proc: Some((proc_flags: "TAKE_MELEE_SWING", chance: 100.0)),
            effects: [(index: 0, effect: ApplyAura, aura: ProcTriggerSpell, trigger_spell: Some(26364))],
        ),
        (id: 26364, name: "Lightning Shield Bolt"),
        (
            id: 853,
            name: "Hammer of Justice",
            duration: Some(6000),
            diminishing_group: Stun,
            effects: [(index: 0, effect: ApplyAura, aura: ModStun)],
        ),
    ])"#;

    fn scenario(timeline: &str) -> Scenario {
        ScenarioLoader::parse(&format!(
            r#"#![enable(unwrap_newtypes)]
            (
                name: "test",
                duration: 8000,
                units: [
                    (name: "shaman", kind: Player, id: 1, position: (x: 0.0, y: 0.0, z: 0.0), faction: 1),
                    (name: "ogre", id: 2, position: (x: 3.0, y: 0.0, z: 0.0), faction: 14),
                ],
                timeline: [{timeline}],
            )"#
        ))
        .expect("scenario")
    }

    fn damage_lines(lines: &[SimLine]) -> Vec<(u64, u32)> {
        lines
            .iter()
            .filter_map(|line| match line.event {
                SimEvent::Damage { amount, .. } => Some((line.at, amount)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn periodic_damage_ticks_on_schedule() {
        let catalog = SpellCatalogLoader::parse(CATALOG).expect("catalog");
        let scenario = scenario(r#"(at: 1000, action: Apply(spell: 172, caster: "shaman", target: "ogre"))"#);
        let mut sim = Simulation::new(&catalog, &scenario, AuraConfig::default(), 1).expect("sim");

        let lines = sim.run(500).expect("run");
        assert_eq!(damage_lines(&lines), vec![(3000, 40), (5000, 40), (7000, 40)]);

        let ogre = &sim.summary()[1];
        assert_eq!(ogre.health, 1000 - 120);
        assert!(ogre.auras.is_empty());
    }

    #[test]
    fn shield_charges_run_out() {
        let catalog = SpellCatalogLoader::parse(CATALOG).expect("catalog");
        let swing = r#"(at: 2000, action: Proc(actor: "ogre", target: "shaman", actor_flags: "DEAL_MELEE_SWING", target_flags: "TAKE_MELEE_SWING", damage: 50)),
                       (at: 3000, action: Proc(actor: "ogre", target: "shaman", actor_flags: "DEAL_MELEE_SWING", target_flags: "TAKE_MELEE_SWING", damage: 50))"#;
        let scenario = scenario(&format!(
            r#"(at: 0, action: Apply(spell: 324, caster: "shaman", target: "shaman")), {swing}"#
        ));
        let mut sim = Simulation::new(&catalog, &scenario, AuraConfig::default(), 1).expect("sim");

        let lines = sim.run(1000).expect("run");
        let casts: Vec<_> = lines
            .iter()
            .filter(|line| matches!(line.event, SimEvent::Cast { .. }))
            .map(|line| line.at)
            .collect();
        assert_eq!(casts, vec![2000, 3000]);
        assert!(sim.summary()[0].auras.is_empty());
    }

    #[test]
    fn repeated_stuns_diminish_to_immunity() {
        let catalog = SpellCatalogLoader::parse(CATALOG).expect("catalog");
        let stun = |at: u64| format!(r#"(at: {at}, action: Apply(spell: 853, caster: "shaman", target: "ogre"))"#);
        let scenario = scenario(&[stun(0), stun(100), stun(200), stun(300)].join(", "));
        let mut sim = Simulation::new(&catalog, &scenario, AuraConfig::default(), 1).expect("sim");

        let lines = sim.run(100).expect("run");
        let outcomes: Vec<bool> = lines
            .iter()
            .filter_map(|line| match &line.event {
                SimEvent::Applied { .. } => Some(true),
                SimEvent::Skipped { .. } => Some(false),
                _ => None,
            })
            .collect();
        assert_eq!(outcomes, vec![true, true, true, false]);
    }

    #[test]
    fn dispel_without_aura_is_skipped() {
        let catalog = SpellCatalogLoader::parse(CATALOG).expect("catalog");
        let scenario = scenario(r#"(at: 0, action: Dispel(spell: 172, target: "ogre", dispeller: "shaman"))"#);
        let mut sim = Simulation::new(&catalog, &scenario, AuraConfig::default(), 1).expect("sim");

        let lines = sim.run(1000).expect("run");
        assert!(matches!(lines[0].event, SimEvent::Skipped { .. }));
    }
}

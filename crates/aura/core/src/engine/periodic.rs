//! Periodic tick handlers.
use std::sync::Arc;

use super::AuraEngine;
use crate::env::{
    DamageKind, PowerChange, RollContext, SpellDamage, SpellHeal, TriggeredCast,
};
use crate::proc::{ProcSpell, ProcTrigger};
use crate::script::{AuraHook, EffectHookArgs};
use crate::spell::{
    AuraType, ProcFlags, ProcHitMask, ProcSpellPhase, ProcSpellType, SpellAttributes, SpellInfo,
};
use crate::types::{AuraId, HandleModes, ObjectGuid};

/// Everything one tick needs, captured before any host call.
struct PeriodicTick {
    aura: AuraId,
    spell: Arc<SpellInfo>,
    index: u8,
    aura_type: AuraType,
    target: ObjectGuid,
    caster: Option<ObjectGuid>,
    amount: i32,
    permanent: bool,
}

impl PeriodicTick {
    fn positive_amount(&self) -> u32 {
        u32::try_from(self.amount).unwrap_or(0)
    }

    fn misc_value(&self) -> i32 {
        self.spell.effect(self.index).map_or(0, |info| info.misc_value)
    }
}

impl AuraEngine<'_> {
    /// Runs one tick of effect `index` on `target`.
    pub(crate) fn periodic_tick(&mut self, id: AuraId, index: u8, target: ObjectGuid) {
        let Some(aura) = self.state.live_aura(id) else {
            return;
        };
        let Some(effect) = aura.effect(index) else {
            return;
        };
        let tick = PeriodicTick {
            aura: id,
            spell: Arc::clone(&aura.spell),
            index,
            aura_type: effect.aura_type(),
            target,
            caster: aura.caster,
            amount: effect.amount(),
            permanent: aura.is_permanent(),
        };
        tracing::trace!(
            target: "aura::effect",
            aura = %id,
            effect = index,
            unit = %target,
            tick = effect.ticks_done(),
            "periodic tick"
        );

        let mut prevented = false;
        if let Some(scripts) = self.env.scripts_opt() {
            let args = EffectHookArgs {
                aura: id,
                spell: Arc::clone(&tick.spell),
                effect_index: index,
                aura_type: tick.aura_type,
                target,
                modes: HandleModes::empty(),
            };
            for entry in scripts.entries(tick.spell.id) {
                if let AuraHook::EffectPeriodic(hook) = &entry.hook
                    && entry.applies_to(index, tick.aura_type)
                {
                    prevented |= hook(self, &args).prevents_default();
                }
            }
        }
        if prevented || !self.binding_active(id, target) {
            return;
        }

        match tick.aura_type {
            AuraType::PeriodicTriggerSpell | AuraType::PeriodicTriggerSpellWithValue => {
                self.tick_trigger_spell(&tick);
                return;
            }
            AuraType::PeriodicDummy => return,
            _ => {}
        }
        if !self.host.is_alive(target) {
            return;
        }

        match tick.aura_type {
            AuraType::PeriodicDamage | AuraType::PeriodicDamagePercent => {
                self.tick_damage(&tick, false);
            }
            AuraType::PeriodicLeech => self.tick_damage(&tick, true),
            AuraType::PeriodicHeal | AuraType::ObsModHealth => self.tick_heal(&tick),
            AuraType::PeriodicEnergize | AuraType::ObsModPower => self.tick_energize(&tick),
            AuraType::PeriodicManaLeech => self.tick_mana_leech(&tick),
            AuraType::PowerBurn => self.tick_power_burn(&tick),
            _ => {}
        }
    }

    /// Crit roll for one tick; stores the caster's chance on the effect.
    fn roll_periodic_crit(&mut self, tick: &PeriodicTick) -> bool {
        if !tick.spell.has_attribute(SpellAttributes::CAN_CRIT) {
            return false;
        }
        let Some(caster) = tick.caster else {
            return false;
        };
        let chance = self.host.periodic_crit_chance(caster, tick.target, &tick.spell);
        if let Some(effect) = self
            .live_aura_mut(tick.aura)
            .and_then(|aura| aura.effect_mut(tick.index))
        {
            effect.crit_chance = chance;
        }
        self.roll_chance(tick.aura, RollContext::PeriodicCrit, chance)
    }

    fn tick_damage(&mut self, tick: &PeriodicTick, leech: bool) {
        if self.host.is_immune_to_damage(tick.target, &tick.spell) {
            tracing::trace!(target: "aura::effect", aura = %tick.aura, unit = %tick.target, "immune to periodic damage");
            return;
        }
        let mut amount = if tick.aura_type == AuraType::PeriodicDamagePercent {
            let max_health = u64::from(self.host.max_health(tick.target));
            u32::try_from((max_health * u64::from(tick.positive_amount())).div_ceil(100))
                .unwrap_or(u32::MAX)
        } else {
            tick.positive_amount()
        };
        let critical = self.roll_periodic_crit(tick);
        if critical {
            amount = amount.saturating_mul(2);
        }

        let outcome = self.host.deal_spell_damage(&SpellDamage {
            kind: DamageKind::Periodic,
            caster: tick.caster,
            target: tick.target,
            spell: tick.spell.id,
            aura: tick.aura,
            effect_index: tick.index,
            school: tick.spell.school_mask,
            amount,
            critical,
        });

        if leech
            && let Some(caster) = tick.caster
            && self.host.is_alive(caster)
            && outcome.damage > 0
        {
            self.host.heal(&SpellHeal {
                caster: Some(caster),
                target: caster,
                spell: tick.spell.id,
                aura: tick.aura,
                effect_index: tick.index,
                amount: outcome.damage,
                critical: false,
            });
        }
        self.raise_periodic_proc(tick, true, outcome.damage, critical);
    }

    fn tick_heal(&mut self, tick: &PeriodicTick) {
        let mut amount = tick.positive_amount();
        if tick.aura_type == AuraType::ObsModHealth {
            let max_health = self.host.max_health(tick.target);
            // permanent regeneration auras idle at full health
            if tick.permanent && self.host.health(tick.target) >= max_health {
                return;
            }
            amount = u32::try_from(u64::from(max_health) * u64::from(amount) / 100)
                .unwrap_or(u32::MAX);
        }
        let critical = self.roll_periodic_crit(tick);
        if critical {
            amount = amount.saturating_mul(2);
        }

        let outcome = self.host.heal(&SpellHeal {
            caster: tick.caster,
            target: tick.target,
            spell: tick.spell.id,
            aura: tick.aura,
            effect_index: tick.index,
            amount,
            critical,
        });
        self.raise_periodic_proc(tick, false, outcome.healed, critical);
    }

    fn tick_energize(&mut self, tick: &PeriodicTick) {
        if tick.amount <= 0 {
            return;
        }
        self.host.energize(&PowerChange {
            caster: tick.caster,
            target: tick.target,
            spell: tick.spell.id,
            aura: tick.aura,
            power: tick.misc_value(),
            amount: tick.amount,
        });
    }

    fn tick_mana_leech(&mut self, tick: &PeriodicTick) {
        if tick.amount <= 0 {
            return;
        }
        let drained = self.host.drain_power(&PowerChange {
            caster: tick.caster,
            target: tick.target,
            spell: tick.spell.id,
            aura: tick.aura,
            power: tick.misc_value(),
            amount: tick.amount,
        });
        if drained <= 0 {
            return;
        }
        if let Some(caster) = tick.caster
            && self.host.is_alive(caster)
        {
            self.host.energize(&PowerChange {
                caster: Some(caster),
                target: caster,
                spell: tick.spell.id,
                aura: tick.aura,
                power: tick.misc_value(),
                amount: drained,
            });
        }
    }

    /// Burns power and deals the burned amount as damage.
    fn tick_power_burn(&mut self, tick: &PeriodicTick) {
        if tick.amount <= 0 || self.host.is_immune_to_damage(tick.target, &tick.spell) {
            return;
        }
        let burned = self.host.drain_power(&PowerChange {
            caster: tick.caster,
            target: tick.target,
            spell: tick.spell.id,
            aura: tick.aura,
            power: tick.misc_value(),
            amount: tick.amount,
        });
        let Ok(amount) = u32::try_from(burned) else {
            return;
        };
        if amount == 0 {
            return;
        }
        let outcome = self.host.deal_spell_damage(&SpellDamage {
            kind: DamageKind::Periodic,
            caster: tick.caster,
            target: tick.target,
            spell: tick.spell.id,
            aura: tick.aura,
            effect_index: tick.index,
            school: tick.spell.school_mask,
            amount,
            critical: false,
        });
        self.raise_periodic_proc(tick, true, outcome.damage, false);
    }

    fn tick_trigger_spell(&mut self, tick: &PeriodicTick) {
        let Some(trigger) = tick.spell.effect(tick.index).and_then(|info| info.trigger_spell) else {
            tracing::warn!(target: "aura::effect", aura = %tick.aura, spell = %tick.spell.id, effect = tick.index, "periodic trigger without trigger spell");
            return;
        };
        if self.env.spell(trigger).is_err() {
            tracing::warn!(target: "aura::effect", aura = %tick.aura, trigger = %trigger, "unknown periodic trigger spell");
            return;
        }
        let base_points =
            (tick.aura_type == AuraType::PeriodicTriggerSpellWithValue).then_some(tick.amount);
        self.host.cast_spell(&TriggeredCast {
            caster: tick.caster.unwrap_or(tick.target),
            target: Some(tick.target),
            spell: trigger,
            triggered_by: tick.aura,
            effect_index: tick.index,
            base_points,
        });
    }

    /// Reports a damage or heal tick to the proc system.
    fn raise_periodic_proc(&mut self, tick: &PeriodicTick, harmful: bool, amount: u32, critical: bool) {
        let hit = if critical {
            ProcHitMask::CRITICAL
        } else {
            ProcHitMask::NORMAL
        };
        let spell = ProcSpell::new(Arc::clone(&tick.spell));
        let trigger = if harmful {
            let mut taken = ProcFlags::TAKE_HARMFUL_PERIODIC;
            if amount > 0 {
                taken |= ProcFlags::TAKE_ANY_DAMAGE;
            }
            ProcTrigger::new(tick.caster, Some(tick.target))
                .with_flags(ProcFlags::DEAL_HARMFUL_PERIODIC, taken)
                .with_spell_type(ProcSpellType::DAMAGE, ProcSpellPhase::HIT)
                .with_damage(amount, tick.spell.school_mask)
        } else {
            ProcTrigger::new(tick.caster, Some(tick.target))
                .with_flags(ProcFlags::DEAL_HELPFUL_PERIODIC, ProcFlags::TAKE_HELPFUL_PERIODIC)
                .with_spell_type(ProcSpellType::HEAL, ProcSpellPhase::HIT)
                .with_heal(amount)
        };
        self.trigger_procs(&trigger.with_spell(spell).with_hit(hit));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aura::AuraCreateInfo;
    use crate::env::{AuraEnv, FixedRng, MemoryUnit, MemoryWorld};
    use crate::script::{EffectFilter, HookAction, ScriptRegistry};
    use crate::spell::{SpellCatalog, SpellEffectInfo, SpellEffectKind};
    use crate::state::AuraState;
    use crate::types::{Position, SpellId};

    const CORRUPTION: SpellId = SpellId(172);
    const DRAIN: SpellId = SpellId(689);
    const BLIZZARD: SpellId = SpellId(10);
    const BLIZZARD_TICK: SpellId = SpellId(42208);
    const REGEN: SpellId = SpellId(6262);

    fn catalog() -> SpellCatalog {
        SpellCatalog::new()
            .with_spell(
                SpellInfo::new(CORRUPTION, "Corruption")
                    .with_duration(6000)
                    .with_attributes(SpellAttributes::CAN_CRIT)
                    .with_effect(
                        SpellEffectInfo::new(0, SpellEffectKind::ApplyAura, AuraType::PeriodicDamage)
                            .with_base_points(10)
                            .with_amplitude(2000),
                    ),
            )
            .with_spell(
                SpellInfo::new(DRAIN, "Drain Life")
                    .with_duration(3000)
                    .with_effect(
                        SpellEffectInfo::new(0, SpellEffectKind::ApplyAura, AuraType::PeriodicLeech)
                            .with_base_points(15)
                            .with_amplitude(1000),
                    ),
            )
            .with_spell(
                SpellInfo::new(BLIZZARD, "Blizzard")
                    .with_duration(2000)
                    .with_effect(
                        SpellEffectInfo::new(0, SpellEffectKind::ApplyAura, AuraType::PeriodicTriggerSpell)
                            .with_amplitude(1000)
                            .with_trigger_spell(BLIZZARD_TICK),
                    ),
            )
            .with_spell(SpellInfo::new(BLIZZARD_TICK, "Blizzard Tick"))
            .with_spell(
                SpellInfo::new(REGEN, "Regeneration")
                    .with_attributes(SpellAttributes::PASSIVE)
                    .with_effect(
                        SpellEffectInfo::new(0, SpellEffectKind::ApplyAura, AuraType::ObsModHealth)
                            .with_base_points(5)
                            .with_amplitude(1000),
                    ),
            )
    }

    fn world() -> MemoryWorld {
        let mut warlock = MemoryUnit::new(ObjectGuid::player(1), Position::ORIGIN).with_health(100);
        warlock.crit_chance = 100.0;
        MemoryWorld::new()
            .with_unit(warlock)
            .with_unit(MemoryUnit::new(ObjectGuid::unit(2), Position::ORIGIN).with_faction(2).with_health(1000))
    }

    #[test]
    fn damage_ticks_crit_with_caster_chance() {
        let catalog = catalog();
        let mut world = world();
        let mut state = AuraState::default();
        let mut engine = AuraEngine::new(&mut state, AuraEnv::new(&catalog, &FixedRng::ALWAYS), &mut world);
        let warlock = ObjectGuid::player(1);
        let target = ObjectGuid::unit(2);

        let id = engine
            .create_aura(AuraCreateInfo::new(CORRUPTION, target).with_caster(warlock))
            .expect("created");
        engine.update(2000);
        let crit = engine.aura(id).and_then(|aura| aura.effect(0)).map(|effect| effect.crit_chance);
        assert_eq!(crit, Some(100.0));
        drop(engine);

        assert_eq!(world.damage.len(), 1);
        assert_eq!(world.damage[0].amount, 20);
        assert!(world.damage[0].critical);
        assert_eq!(world.damage[0].kind, DamageKind::Periodic);
    }

    #[test]
    fn leech_heals_caster_for_damage_dealt() {
        let catalog = catalog();
        let mut world = world();
        world.unit_mut(ObjectGuid::player(1)).expect("warlock").health = 50;
        let mut state = AuraState::default();
        let mut engine = AuraEngine::new(&mut state, AuraEnv::new(&catalog, &FixedRng::NEVER), &mut world);

        engine
            .create_aura(AuraCreateInfo::new(DRAIN, ObjectGuid::unit(2)).with_caster(ObjectGuid::player(1)))
            .expect("created");
        engine.update(1000);
        drop(engine);

        assert_eq!(world.damage.len(), 1);
        assert_eq!(world.heals.len(), 1);
        assert_eq!(world.heals[0].target, ObjectGuid::player(1));
        assert_eq!(world.heals[0].amount, 15);
    }

    #[test]
    fn trigger_spell_casts_from_caster_onto_target() {
        let catalog = catalog();
        let mut world = world();
        let mut state = AuraState::default();
        let mut engine = AuraEngine::new(&mut state, AuraEnv::new(&catalog, &FixedRng::NEVER), &mut world);
        let mage = ObjectGuid::player(1);
        let target = ObjectGuid::unit(2);

        let id = engine
            .create_aura(AuraCreateInfo::new(BLIZZARD, target).with_caster(mage))
            .expect("created");
        engine.update(1000);
        engine.update(1000);
        drop(engine);

        assert_eq!(world.casts.len(), 2);
        assert_eq!(world.casts[0].caster, mage);
        assert_eq!(world.casts[0].target, Some(target));
        assert_eq!(world.casts[0].spell, BLIZZARD_TICK);
        assert_eq!(world.casts[0].triggered_by, id);
        assert_eq!(world.casts[0].base_points, None);
    }

    #[test]
    fn regeneration_idles_at_full_health() {
        let catalog = catalog();
        let mut world = world();
        let mut state = AuraState::default();
        let mut engine = AuraEngine::new(&mut state, AuraEnv::new(&catalog, &FixedRng::NEVER), &mut world);
        let troll = ObjectGuid::player(1);

        engine
            .create_aura(AuraCreateInfo::new(REGEN, troll).with_caster(troll))
            .expect("created");
        engine.update(1000);
        drop(engine);
        assert!(world.heals.is_empty());

        world.unit_mut(troll).expect("troll").health = 40;
        let mut engine = AuraEngine::new(&mut state, AuraEnv::new(&catalog, &FixedRng::NEVER), &mut world);
        engine.update(1000);
        drop(engine);
        assert_eq!(world.heals.len(), 1);
        assert_eq!(world.heals[0].amount, 5);
    }

    #[test]
    fn periodic_hook_can_replace_tick() {
        let catalog = catalog();
        let mut scripts = ScriptRegistry::new();
        scripts.on_effect_periodic(CORRUPTION, EffectFilter::ALL, |_, _| HookAction::PreventDefault);
        let mut world = world();
        let mut state = AuraState::default();
        let env = AuraEnv::new(&catalog, &FixedRng::NEVER).with_scripts(&scripts);
        let mut engine = AuraEngine::new(&mut state, env, &mut world);

        engine
            .create_aura(AuraCreateInfo::new(CORRUPTION, ObjectGuid::unit(2)).with_caster(ObjectGuid::player(1)))
            .expect("created");
        engine.update(2000);
        drop(engine);
        assert!(world.damage.is_empty());
    }
}

//! Proc pipeline: check, roll, prepare, trigger.
//!
//! A combat event is checked against the auras bound to the actor and to the
//! action target. Each side first collects every aura that procs (running
//! the charge, cooldown and success bookkeeping of
//! [`AuraEngine::prepare_proc_to_trigger`]) and only then triggers them, so
//! an aura removed by an earlier proc on the same side is skipped.
use std::sync::Arc;

use super::AuraEngine;
use crate::env::{DamageKind, RollContext, SpellDamage, TriggeredCast};
use crate::proc::{
    ProcEvent, ProcTrigger, can_spell_trigger_proc_on_event, ppm_chance, reduce_chance_above_60,
    weapon_ppm_chance,
};
use crate::script::{AuraHook, EffectProcArgs, ProcHookArgs};
use crate::spell::{
    AuraType, ProcAttributes, ProcFlags, SpellAttributes, SpellInfo, SpellModOp, SpellProcEntry,
};
use crate::types::{AuraId, EffectMask, ObjectGuid, RemoveMode};

impl AuraEngine<'_> {
    /// Runs the proc pipeline for one combat event on both sides.
    pub fn trigger_procs(&mut self, trigger: &ProcTrigger) {
        let sides = [
            (trigger.actor, trigger.actor_event()),
            (trigger.action_target, trigger.target_event()),
        ];
        for (unit, event) in sides {
            let (Some(unit), Some(event)) = (unit, event) else {
                continue;
            };
            if !self.state.holder(unit).is_some_and(|holder| holder.can_proc()) {
                continue;
            }
            let procs = self.collect_procs(unit, &event);
            for (id, mask) in procs {
                self.trigger_aura_proc(id, unit, mask, &event);
            }
        }
    }

    fn collect_procs(&mut self, unit: ObjectGuid, event: &ProcEvent) -> Vec<(AuraId, EffectMask)> {
        let mut procs = Vec::new();
        for id in self.state.applied_auras(unit) {
            if !self.binding_active(id, unit) {
                continue;
            }
            let mask = self.proc_effect_mask(id, unit, event);
            if mask.is_empty() {
                continue;
            }
            self.prepare_proc_to_trigger(id, unit, event);
            procs.push((id, mask));
        }
        procs
    }

    /// Effects of `id` on `target` that proc from `event`, after the chance
    /// roll. Records the attempt time.
    fn proc_effect_mask(&mut self, id: AuraId, target: ObjectGuid, event: &ProcEvent) -> EffectMask {
        let mask = self.check_proc(id, target, event);
        if mask.is_empty() {
            return EffectMask::NONE;
        }

        let chance = self.calc_proc_chance(id, event);
        let now = self.state.now;
        let Some(aura) = self.live_aura_mut(id) else {
            return EffectMask::NONE;
        };
        aura.last_proc_attempt = Some(now);
        let cooldown_on_failure = aura
            .spell
            .has_attribute(SpellAttributes::PROC_COOLDOWN_ON_FAILURE);

        if !self.roll_chance(id, RollContext::ProcChance, chance) {
            tracing::trace!(target: "aura::proc", aura = %id, chance, "proc roll failed");
            if cooldown_on_failure {
                self.apply_proc_cooldown(id);
            }
            return EffectMask::NONE;
        }
        mask
    }

    /// Static and scripted proc conditions; returns the effects allowed to
    /// proc, empty when the aura does not proc at all.
    fn check_proc(&self, id: AuraId, target: ObjectGuid, event: &ProcEvent) -> EffectMask {
        let Some(aura) = self.state.live_aura(id) else {
            return EffectMask::NONE;
        };
        let spell = Arc::clone(&aura.spell);
        let Some(entry) = spell.proc_entry() else {
            return EffectMask::NONE;
        };
        let Some(binding) = aura.application(target) else {
            return EffectMask::NONE;
        };

        if let Some(cast) = &event.spell {
            // an aura never procs from itself or from what it triggered
            if cast.info.id == spell.id || cast.triggered_by == Some(spell.id) {
                return EffectMask::NONE;
            }
            if cast.triggered
                && !spell.has_attribute(SpellAttributes::CAN_PROC_FROM_PROCS)
                && !entry.attributes.contains(ProcAttributes::TRIGGERED_CAN_PROC)
                && !event.type_mask.intersects(ProcFlags::AUTO_ATTACK_MASK)
            {
                return EffectMask::NONE;
            }
            if cast.from_item && entry.attributes.contains(ProcAttributes::CANT_PROC_FROM_ITEM_CAST) {
                return EffectMask::NONE;
            }
        }

        if aura.is_using_charges && aura.proc_charges == 0 {
            return EffectMask::NONE;
        }
        if aura.is_proc_on_cooldown(self.state.now) {
            return EffectMask::NONE;
        }
        if !can_spell_trigger_proc_on_event(entry, event) {
            return EffectMask::NONE;
        }
        if spell.has_attribute(SpellAttributes::ONLY_PROC_ON_CASTER) && event.actor != aura.caster {
            return EffectMask::NONE;
        }

        let mut mask =
            aura.effect_mask() & binding.effect_mask() & !EffectMask(entry.disable_effects_mask);

        if let Some(scripts) = self.env.scripts_opt() {
            let args = ProcHookArgs {
                aura: id,
                spell: Arc::clone(&spell),
                target,
                event,
            };
            for script in scripts.entries(spell.id) {
                if let AuraHook::CheckProc(hook) = &script.hook
                    && !hook(self, &args)
                {
                    return EffectMask::NONE;
                }
            }
        }

        for index in mask.indices() {
            if !self.check_effect_proc(id, &spell, index, target, event) {
                mask.remove(index);
            }
        }
        mask
    }

    fn check_effect_proc(
        &self,
        id: AuraId,
        spell: &Arc<SpellInfo>,
        index: u8,
        target: ObjectGuid,
        event: &ProcEvent,
    ) -> bool {
        let Some(aura_type) = self
            .state
            .live_aura(id)
            .and_then(|aura| aura.effect(index))
            .map(|effect| effect.aura_type())
        else {
            return false;
        };

        match aura_type {
            kind if kind.is_breakable_crowd_control() => {
                if event.damage_amount() == 0 {
                    return false;
                }
            }
            AuraType::ProcTriggerSpell | AuraType::ProcTriggerSpellWithValue => {
                let trigger = spell.effect(index).and_then(|info| info.trigger_spell);
                if trigger.is_some() && trigger == event.extra_attack_spell {
                    return false;
                }
            }
            AuraType::ModCastingSpeedNotStack => {
                if let Some(cast) = event.spell_info()
                    && cast.cast_time == 0
                    && !spell.has_attribute(SpellAttributes::PROC_ON_INSTANT_CAST)
                {
                    return false;
                }
            }
            _ => {}
        }

        if let Some(scripts) = self.env.scripts_opt() {
            let args = EffectProcArgs {
                aura: id,
                spell: Arc::clone(spell),
                effect_index: index,
                aura_type,
                target,
                event,
            };
            for script in scripts.entries(spell.id) {
                if let AuraHook::CheckEffectProc(hook) = &script.hook
                    && script.applies_to(index, aura_type)
                    && !hook(self, &args)
                {
                    return false;
                }
            }
        }
        true
    }

    /// Proc chance in percent.
    fn calc_proc_chance(&self, id: AuraId, event: &ProcEvent) -> f32 {
        let Some(aura) = self.state.live_aura(id) else {
            return 0.0;
        };
        let spell = &aura.spell;
        let Some(entry) = spell.proc_entry() else {
            return 0.0;
        };
        let config = &self.state.config;

        let mut chance = entry.chance;
        if let Some(caster) = aura.caster {
            if entry.procs_per_minute > 0.0 && event.damage.is_some() {
                chance = weapon_ppm_chance(self.host.base_attack_time(caster), entry.procs_per_minute);
            }
            if spell.proc_base_ppm > 0.0 {
                // before the first attempt or success the aura counts as
                // attempted and succeeded a fixed age before it was applied
                let now = self.state.now;
                let applied_for = now.seconds_since(aura.apply_time);
                let since_attempt = aura
                    .last_proc_attempt
                    .map_or(applied_for + config.proc_initial_attempt_age, |at| now.seconds_since(at))
                    .min(config.proc_attempt_window);
                let since_success = aura
                    .last_proc_success
                    .map_or(applied_for + config.proc_initial_success_age, |at| now.seconds_since(at))
                    .min(config.proc_success_window);
                chance = ppm_chance(spell.proc_base_ppm, since_attempt, since_success);
            }
            chance = self
                .host
                .apply_spell_mod_f32(caster, spell, SpellModOp::ProcChance, chance);
        }

        if entry.attributes.contains(ProcAttributes::REDUCE_PROC_60)
            && let Some(actor) = event.actor
        {
            chance = reduce_chance_above_60(chance, self.host.level(actor));
        }
        chance
    }

    /// Consumes a charge, starts the cooldown and records the success.
    fn prepare_proc_to_trigger(&mut self, id: AuraId, target: ObjectGuid, event: &ProcEvent) {
        let Some(spell) = self.aura_spell(id) else {
            return;
        };
        let mut prevented = false;
        if let Some(scripts) = self.env.scripts_opt() {
            let args = ProcHookArgs {
                aura: id,
                spell: Arc::clone(&spell),
                target,
                event,
            };
            for script in scripts.entries(spell.id) {
                if let AuraHook::PrepareProc(hook) = &script.hook {
                    prevented |= hook(self, &args).prevents_default();
                }
            }
        }
        if prevented || !self.is_live(id) {
            return;
        }
        let Some(entry) = spell.proc_entry() else {
            return;
        };

        let consumes_charge = !entry.attributes.contains(ProcAttributes::USE_STACKS_FOR_CHARGES)
            && !event
                .spell_info()
                .is_some_and(|cast| cast.has_attribute(SpellAttributes::DO_NOT_CONSUME_RESOURCES));
        let using_charges = self.state.live_aura(id).is_some_and(|aura| aura.is_using_charges);
        if consumes_charge && using_charges {
            if entry.attributes.contains(ProcAttributes::DELAYED_CHARGE_DROP) {
                let delay = self.state.config.charge_drop_delay;
                self.drop_charge_delayed(id, delay, RemoveMode::Default);
            } else if let Some(aura) = self.live_aura_mut(id) {
                aura.proc_charges = aura.proc_charges.saturating_sub(1);
                self.mark_client_updates(id);
            }
        }

        self.apply_proc_cooldown(id);
        let now = self.state.now;
        if let Some(aura) = self.live_aura_mut(id) {
            aura.last_proc_success = Some(now);
        }
    }

    fn apply_proc_cooldown(&mut self, id: AuraId) {
        let Some(aura) = self.state.live_aura(id) else {
            return;
        };
        let spell = Arc::clone(&aura.spell);
        let Some(entry) = spell.proc_entry() else {
            return;
        };
        let mut cooldown = i32::try_from(entry.cooldown).unwrap_or(i32::MAX);
        if let Some(caster) = aura.caster {
            cooldown = self
                .host
                .apply_spell_mod(caster, &spell, SpellModOp::ProcCooldown, cooldown);
        }
        if cooldown <= 0 {
            return;
        }
        let until = self.state.now + cooldown as u64;
        if let Some(aura) = self.live_aura_mut(id) {
            aura.proc_cooldown = Some(until);
        }
    }

    fn trigger_aura_proc(&mut self, id: AuraId, target: ObjectGuid, mask: EffectMask, event: &ProcEvent) {
        let Some(spell) = self.aura_spell(id) else {
            return;
        };
        if !self.binding_active(id, target) {
            return;
        }
        let instant = spell.has_attribute(SpellAttributes::INSTANT_TARGET_PROCS);
        if instant {
            self.state.holder_mut(target).cant_proc += 1;
        }
        self.trigger_proc_on_event(id, &spell, target, mask, event);
        if instant {
            let holder = self.state.holder_mut(target);
            holder.cant_proc = holder.cant_proc.saturating_sub(1);
        }
    }

    fn trigger_proc_on_event(
        &mut self,
        id: AuraId,
        spell: &Arc<SpellInfo>,
        target: ObjectGuid,
        mask: EffectMask,
        event: &ProcEvent,
    ) {
        tracing::debug!(target: "aura::proc", aura = %id, spell = %spell.id, unit = %target, effects = %mask, "aura procs");
        let scripts = self.env.scripts_opt();
        let args = ProcHookArgs {
            aura: id,
            spell: Arc::clone(spell),
            target,
            event,
        };

        let mut prevented = false;
        for script in scripts.map(|scripts| scripts.entries(spell.id)).unwrap_or_default() {
            if let AuraHook::Proc(hook) = &script.hook {
                prevented |= hook(self, &args).prevents_default();
            }
        }

        if !prevented {
            for index in mask.indices() {
                let applied = self
                    .state
                    .live_aura(id)
                    .and_then(|aura| aura.application(target))
                    .is_some_and(|binding| !binding.is_removing() && binding.has_effect(index));
                if applied {
                    self.handle_proc(id, index, target, event);
                }
            }
            for script in scripts.map(|scripts| scripts.entries(spell.id)).unwrap_or_default() {
                if let AuraHook::AfterProc(hook) = &script.hook {
                    hook(self, &args);
                }
            }
        }

        if let Some(entry) = spell.proc_entry() {
            self.consume_proc_charges(id, entry);
        }
    }

    /// Drops a stack per proc for stack-counted auras; removes charge auras
    /// whose last charge was used directly.
    fn consume_proc_charges(&mut self, id: AuraId, entry: &SpellProcEntry) {
        let Some(aura) = self.state.live_aura(id) else {
            return;
        };
        if entry.attributes.contains(ProcAttributes::USE_STACKS_FOR_CHARGES) {
            self.modify_stack_amount(id, -1, RemoveMode::Default, true);
        } else if aura.is_using_charges && aura.proc_charges == 0 && aura.drop_event.is_none() {
            self.remove_aura(id, RemoveMode::Default);
        }
    }

    /// Default proc behavior of one effect.
    fn handle_proc(&mut self, id: AuraId, index: u8, target: ObjectGuid, event: &ProcEvent) {
        let Some(aura) = self.state.live_aura(id) else {
            return;
        };
        let Some(effect) = aura.effect(index) else {
            return;
        };
        let spell = Arc::clone(&aura.spell);
        let aura_type = effect.aura_type();
        let amount = effect.amount();

        let scripts = self.env.scripts_opt();
        let args = EffectProcArgs {
            aura: id,
            spell: Arc::clone(&spell),
            effect_index: index,
            aura_type,
            target,
            event,
        };
        let mut prevented = false;
        for script in scripts.map(|scripts| scripts.entries(spell.id)).unwrap_or_default() {
            if let AuraHook::EffectProc(hook) = &script.hook
                && script.applies_to(index, aura_type)
            {
                prevented |= hook(self, &args).prevents_default();
            }
        }
        if prevented || !self.binding_active(id, target) {
            return;
        }

        match aura_type {
            kind if kind.is_breakable_crowd_control() => {
                let damage = i32::try_from(event.damage_amount()).unwrap_or(i32::MAX);
                let remaining = amount.saturating_sub(damage);
                if remaining <= 0 {
                    tracing::debug!(target: "aura::proc", aura = %id, unit = %target, "crowd control broken by damage");
                    self.remove_applied_aura(target, id, RemoveMode::Default);
                    return;
                }
                self.change_amount(id, index, remaining, true, false);
            }
            AuraType::ProcTriggerSpell | AuraType::ProcTriggerSpellWithValue => {
                let Some(trigger) = spell.effect(index).and_then(|info| info.trigger_spell) else {
                    tracing::warn!(target: "aura::proc", aura = %id, spell = %spell.id, effect = index, "proc trigger without trigger spell");
                    return;
                };
                let base_points = (aura_type == AuraType::ProcTriggerSpellWithValue).then_some(amount);
                self.host.cast_spell(&TriggeredCast {
                    caster: target,
                    target: event.proc_target,
                    spell: trigger,
                    triggered_by: id,
                    effect_index: index,
                    base_points,
                });
            }
            AuraType::ProcTriggerDamage => {
                let Some(victim) = event.proc_target else {
                    return;
                };
                self.host.deal_spell_damage(&SpellDamage {
                    kind: DamageKind::Direct,
                    caster: Some(target),
                    target: victim,
                    spell: spell.id,
                    aura: id,
                    effect_index: index,
                    school: spell.school_mask,
                    amount: u32::try_from(amount).unwrap_or(0),
                    critical: false,
                });
            }
            _ => {}
        }

        for script in scripts.map(|scripts| scripts.entries(spell.id)).unwrap_or_default() {
            if let AuraHook::AfterEffectProc(hook) = &script.hook
                && script.applies_to(index, aura_type)
            {
                hook(self, &args);
            }
        }
    }
}

//! Binding life cycle and per-effect apply/remove.
use std::sync::Arc;

use super::AuraEngine;
use super::handlers::{self, HandlerArgs};
use crate::application::AuraApplication;
use crate::aura::Aura;
use crate::collection::ApplicationEntry;
use crate::script::{AuraHook, EffectHookArgs};
use crate::spell::{AuraStateType, DiminishingGroup, SpellAttributes};
use crate::types::{AuraId, EffectMask, HandleModes, ObjectGuid, RemoveMode};

impl AuraEngine<'_> {
    /// Creates the binding of `id` on `target` without applying effects.
    ///
    /// Visible auras take the lowest free slot of the target. Returns `false`
    /// when the aura is gone or already bound there.
    pub(crate) fn create_binding(&mut self, id: AuraId, target: ObjectGuid, mask: EffectMask) -> bool {
        let Some(aura) = self.state.live_aura(id) else {
            return false;
        };
        if aura.applications.contains_key(&target) {
            debug_assert!(false, "aura bound twice to the same target");
            tracing::error!(target: "aura::targets", aura = %id, unit = %target, "aura already bound to target");
            return false;
        }

        let spell = Arc::clone(&aura.spell);
        let caster = aura.caster;
        let friendly = caster.is_some_and(|caster| self.host.is_friendly(caster, target));
        let sends_amount = spell.has_attribute(SpellAttributes::SEND_AMOUNT)
            || aura.effects().any(|effect| effect.aura_type().needs_sending_amount());
        let flags = AuraApplication::classify(&spell, caster, target, friendly, mask, sends_amount);
        let visible = aura.can_be_sent_to_client();
        let facets = aura.facets();

        let slot = if visible { self.assign_slot(target, id) } else { None };
        if let Some(aura) = self.live_aura_mut(id) {
            aura.applications
                .insert(target, AuraApplication::new(id, target, slot, mask, flags));
        }

        let now = self.state.now;
        let holder = self.state.holder_mut(target);
        holder.applied().insert(ApplicationEntry {
            facets,
            target,
            slot,
            effect_mask: EffectMask::NONE,
            flags,
        });
        holder.apply_diminishing(spell.diminishing_group, true, now);

        tracing::debug!(
            target: "aura::targets",
            aura = %id,
            spell = %spell.id,
            unit = %target,
            effects = %mask,
            slot = ?slot,
            "binding created"
        );
        true
    }

    /// Brings the applied effects of a binding in line with the effects it
    /// should carry, removing conflicting auras from the target first.
    pub(crate) fn apply_binding(&mut self, id: AuraId, target: ObjectGuid) {
        self.remove_applied_non_stacking(id, target);
        if !self.binding_active(id, target) {
            return;
        }

        let Some(aura) = self.state.live_aura(id) else {
            return;
        };
        let spell = Arc::clone(&aura.spell);
        let Some(binding) = aura.application(target) else {
            return;
        };
        let applied = binding.effect_mask();
        let wanted = binding.effects_to_apply();

        if applied.is_empty() && spell.aura_state != AuraStateType::None {
            self.host.modify_aura_state(target, spell.aura_state, true);
        }

        for index in (applied & !wanted).indices() {
            if !self.binding_active(id, target) {
                return;
            }
            self.handle_effect(id, target, index, HandleModes::REAL, false);
        }
        for index in (wanted & !applied).indices() {
            if !self.binding_active(id, target) {
                return;
            }
            self.handle_effect(id, target, index, HandleModes::REAL, true);
        }

        if let Some(binding) = self.binding_mut(id, target) {
            binding.set_need_client_update(true);
        }
        tracing::debug!(target: "aura::effect", aura = %id, unit = %target, effects = %wanted, "binding applied");
    }

    /// Removes the bindings on `target` that cannot coexist with `id`.
    fn remove_applied_non_stacking(&mut self, id: AuraId, target: ObjectGuid) {
        let Some(aura) = self.state.live_aura(id) else {
            return;
        };
        let spells = self.env.spells();
        let conflicting: Vec<AuraId> = self
            .state
            .applied_auras(target)
            .into_iter()
            .filter(|other| *other != id)
            .filter_map(|other| self.state.live_aura(other))
            .filter(|other| !aura.can_stack_with(other, spells, &*self.host))
            .map(Aura::id)
            .collect();
        for other in conflicting {
            tracing::debug!(target: "aura::effect", aura = %other, by = %id, unit = %target, "removed by non-stacking aura");
            self.remove_applied_aura(target, other, RemoveMode::Default);
        }
    }

    /// Tears a binding down: unapplies its effects, detaches it from the
    /// aura and the target, and frees its visible slot.
    pub(crate) fn unapply_binding(&mut self, id: AuraId, target: ObjectGuid, mode: RemoveMode) {
        let Some(binding) = self.binding_mut(id, target) else {
            // stale index entry without a binding
            if let Some(holder) = self.state.holders.get(&target) {
                holder.applied().remove(id);
            }
            return;
        };
        if binding.is_removing() {
            return;
        }
        binding.set_remove_mode(mode);
        let applied = binding.effect_mask();
        let slot = binding.slot();

        for index in applied.indices() {
            self.handle_effect(id, target, index, HandleModes::REAL, false);
        }

        let Some(aura) = self.state.auras.get_mut(&id) else {
            return;
        };
        aura.applications.remove(&target);
        let spell = Arc::clone(&aura.spell);

        let now = self.state.now;
        if let Some(holder) = self.state.holders.get_mut(&target) {
            holder.applied().remove(id);
            holder.apply_diminishing(spell.diminishing_group, false, now);
        }

        if spell.aura_state != AuraStateType::None && !self.target_keeps_aura_state(target, spell.aura_state) {
            self.host.modify_aura_state(target, spell.aura_state, false);
        }
        if let Some(slot) = slot {
            self.free_slot(target, slot, id);
        }

        tracing::debug!(
            target: "aura::effect",
            aura = %id,
            spell = %spell.id,
            unit = %target,
            mode = %mode,
            "binding removed"
        );
    }

    fn target_keeps_aura_state(&self, target: ObjectGuid, state: AuraStateType) -> bool {
        self.state
            .applied_auras(target)
            .into_iter()
            .filter_map(|id| self.state.live_aura(id))
            .any(|aura| {
                aura.spell.aura_state == state
                    && aura
                        .application(target)
                        .is_some_and(|binding| !binding.is_removing())
            })
    }

    /// Applies or removes one effect of a binding.
    ///
    /// With [`HandleModes::REAL`] the effect is (un)registered on the target;
    /// other modes only re-run the handler, for a new amount or a refresh.
    /// Effect hooks run around the default handler and may prevent it.
    pub(crate) fn handle_effect(
        &mut self,
        id: AuraId,
        target: ObjectGuid,
        index: u8,
        modes: HandleModes,
        apply: bool,
    ) {
        let Some(aura) = self.state.auras.get(&id) else {
            return;
        };
        // removed auras only ever unapply
        if apply && aura.is_removed {
            tracing::trace!(target: "aura::effect", aura = %id, effect = index, "apply on removed aura ignored");
            return;
        }
        let Some(effect) = aura.effect(index) else {
            tracing::error!(target: "aura::effect", aura = %id, effect = index, "effect slot is empty");
            return;
        };
        let aura_type = effect.aura_type();
        let spell = Arc::clone(&aura.spell);

        if modes.contains(HandleModes::REAL) {
            let Some(binding) = self.binding_mut(id, target) else {
                tracing::error!(target: "aura::effect", aura = %id, unit = %target, "effect handled without binding");
                return;
            };
            let changed = binding.mark_effect(index, apply);
            debug_assert!(changed, "effect handled twice in the same direction");
            if !changed {
                tracing::error!(target: "aura::effect", aura = %id, effect = index, unit = %target, apply, "effect already in requested state");
                return;
            }
            let mask = binding.effect_mask();
            let holder = self.state.holder_mut(target);
            holder.applied().set_effect_mask(id, mask);
            if apply {
                holder.register_effect(aura_type, id, index);
            } else {
                holder.unregister_effect(aura_type, id, index);
            }
        }

        let args = EffectHookArgs {
            aura: id,
            spell: Arc::clone(&spell),
            effect_index: index,
            aura_type,
            target,
            modes,
        };
        let scripts = self.env.scripts_opt();
        let mut prevented = false;
        if let Some(scripts) = scripts {
            for entry in scripts.entries(spell.id) {
                if !entry.applies_to(index, aura_type) {
                    continue;
                }
                match (&entry.hook, apply) {
                    (AuraHook::EffectApply(hook), true) | (AuraHook::EffectRemove(hook), false) => {
                        prevented |= hook(self, &args).prevents_default();
                    }
                    _ => {}
                }
            }
        }
        if apply && !self.binding_active(id, target) {
            return;
        }

        if !prevented && let Some(handler) = handlers::default_handler(aura_type) {
            let amount = self
                .state
                .auras
                .get(&id)
                .and_then(|aura| aura.effect(index))
                .map_or(0, |effect| effect.amount());
            let caster = self.state.auras.get(&id).and_then(Aura::caster);
            let handler_args = HandlerArgs {
                aura: id,
                spell: Arc::clone(&spell),
                effect_index: index,
                aura_type,
                target,
                caster,
                amount,
                modes,
            };
            handler(self, &handler_args, apply);
        }
        if apply && !self.binding_active(id, target) {
            return;
        }

        if let Some(scripts) = scripts {
            for entry in scripts.entries(spell.id) {
                if !entry.applies_to(index, aura_type) {
                    continue;
                }
                match (&entry.hook, apply) {
                    (AuraHook::AfterEffectApply(hook), true)
                    | (AuraHook::AfterEffectRemove(hook), false) => hook(self, &args),
                    _ => {}
                }
            }
        }

        tracing::trace!(
            target: "aura::effect",
            aura = %id,
            effect = index,
            aura_type = %aura_type,
            unit = %target,
            apply,
            modes = ?modes,
            "effect handled"
        );
    }

    /// Sets a new amount on one effect and re-runs its handler on every
    /// target carrying it.
    ///
    /// `mark` freezes the amount against later recalculation.
    /// `stack_or_reapply` re-applies even when the amount is unchanged.
    pub(crate) fn change_amount(
        &mut self,
        id: AuraId,
        index: u8,
        new_amount: i32,
        mark: bool,
        stack_or_reapply: bool,
    ) {
        let Some(aura) = self.state.live_aura(id) else {
            return;
        };
        let Some(effect) = aura.effect(index) else {
            return;
        };
        let mut modes = HandleModes::empty();
        if effect.amount() != new_amount {
            modes |= HandleModes::CHANGE_AMOUNT;
        }
        if stack_or_reapply {
            modes |= HandleModes::REAPPLY;
        }
        let targets: Vec<ObjectGuid> = aura
            .applications()
            .filter(|binding| !binding.is_removing() && binding.has_effect(index))
            .map(AuraApplication::target)
            .collect();

        if !modes.is_empty() {
            for &target in &targets {
                if self.binding_active(id, target) {
                    self.handle_effect(id, target, index, modes, false);
                }
            }
        }

        if let Some(effect) = self.live_aura_mut(id).and_then(|aura| aura.effect_mut(index)) {
            effect.set_amount(new_amount);
            if mark {
                effect.set_can_be_recalculated(false);
            }
        }

        if !modes.is_empty() {
            for target in targets {
                if self.binding_active(id, target) {
                    self.handle_effect(id, target, index, modes, true);
                }
            }
        }
        self.mark_client_updates(id);
    }

    /// Recomputes the amount of every effect still flagged recalculable,
    /// for instance after the caster's modifiers changed.
    pub fn recalculate_amounts(&mut self, id: AuraId) {
        let scripts = self.env.scripts_opt();
        let host = &*self.host;
        let Some(aura) = self.state.auras.get_mut(&id).filter(|aura| !aura.is_removed) else {
            return;
        };
        let spell = Arc::clone(&aura.spell);
        let ctx = aura.calc_context(&spell, host, scripts);
        let amounts: Vec<(u8, i32)> = aura
            .effects
            .iter_mut()
            .flatten()
            .filter(|effect| effect.can_be_recalculated())
            .map(|effect| (effect.index(), effect.calculate_amount(&ctx)))
            .collect();

        for (index, amount) in amounts {
            self.change_amount(id, index, amount, false, false);
        }
    }

    // ===== diminishing returns =====

    /// Registers a new hit of `group` on `target` and returns the level the
    /// hit lands at.
    pub fn apply_diminishing(&mut self, target: ObjectGuid, group: DiminishingGroup) -> u8 {
        let now = self.state.now;
        let window = self.state.config.diminishing_window;
        let holder = self.state.holder_mut(target);
        let level = holder.diminishing_level(group, now, window);
        holder.increment_diminishing(group, now, window);
        tracing::debug!(target: "aura::effect", unit = %target, group = ?group, level, "diminishing hit");
        level
    }

    pub fn diminishing_level(&self, target: ObjectGuid, group: DiminishingGroup) -> u8 {
        self.state.holder(target).map_or(0, |holder| {
            holder.diminishing_level(group, self.state.now, self.state.config.diminishing_window)
        })
    }
}

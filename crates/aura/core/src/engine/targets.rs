//! Target resolution and binding reconciliation.
use std::collections::BTreeMap;
use std::sync::Arc;

use super::AuraEngine;
use crate::application::MaskUpdate;
use crate::aura::{Aura, AuraKind};
use crate::env::AreaTargetQuery;
use crate::script::AuraHook;
use crate::spell::{
    SpellAttributes, SpellEffectInfo, SpellEffectKind, SpellGroupStackRule, SpellInfo, TargetCheck,
};
use crate::types::{AuraId, EffectMask, ObjectGuid, Position, RemoveMode};

impl AuraEngine<'_> {
    /// Recomputes who the aura should be bound to and reconciles bindings.
    ///
    /// Targets that left are unbound, new ones bound and changed effect sets
    /// re-applied. With `apply == false` new bindings are created but their
    /// effects are not applied yet.
    pub(crate) fn update_target_map(&mut self, id: AuraId, apply: bool) {
        let interval = self.state.config.update_target_map_interval;
        let Some(aura) = self.live_aura_mut(id) else {
            return;
        };
        aura.update_target_map_interval = interval;
        let had_bindings = !aura.applications.is_empty();
        let spell = Arc::clone(&aura.spell);
        let caster = aura.caster;
        let is_dyn_obj = aura.is_dyn_obj();
        let existing: Vec<(ObjectGuid, EffectMask)> = aura
            .applications()
            .filter(|binding| !binding.is_removing())
            .map(|binding| (binding.target(), binding.effects_to_apply()))
            .collect();

        let mut targets = self.fill_target_map(id);
        let mut to_remove = Vec::new();

        for (target, current) in existing {
            let Some(&wanted) = targets.get(&target) else {
                to_remove.push(target);
                continue;
            };
            if !self.host.exists(target)
                || self.host.is_immune_to_spell(target, &spell, caster)
                || !self.can_be_applied_on(id, target)
            {
                to_remove.push(target);
                targets.remove(&target);
                continue;
            }
            let wanted = self.strip_immune_effects(&spell, target, caster, wanted);
            if wanted.is_empty() {
                to_remove.push(target);
                targets.remove(&target);
            } else if wanted == current {
                targets.remove(&target);
            } else {
                targets.insert(target, wanted);
            }
        }

        let mut changed = Vec::new();
        for (target, mask) in targets {
            let mask = self.strip_immune_effects(&spell, target, caster, mask);
            if mask.is_empty()
                || !self.host.exists(target)
                || self.host.is_immune_to_spell(target, &spell, caster)
                || !self.can_be_applied_on(id, target)
            {
                continue;
            }
            if !self.host.is_alive(target)
                && !spell.is_death_persistent()
                && !spell.has_attribute(SpellAttributes::REQUIRES_DEAD_TARGET)
            {
                continue;
            }
            if is_dyn_obj && self.host.is_in_flight(target) {
                continue;
            }

            let existing = self
                .state
                .live_aura(id)
                .and_then(|aura| aura.application(target))
                .map(|binding| binding.plan_mask_update(mask));
            match existing {
                Some(MaskUpdate::Unchanged) => {}
                Some(MaskUpdate::Unbind) => to_remove.push(target),
                Some(MaskUpdate::Partial { .. }) => {
                    if !self.may_bind(id, target) {
                        to_remove.push(target);
                        continue;
                    }
                    if let Some(binding) = self.binding_mut(id, target) {
                        binding.set_effects_to_apply(mask);
                        changed.push(target);
                    }
                }
                None => {
                    if self.may_bind(id, target) && self.create_binding(id, target, mask) {
                        changed.push(target);
                    }
                }
            }
        }

        for target in to_remove {
            self.unapply_binding(id, target, RemoveMode::Default);
        }
        if apply {
            for target in changed {
                if self.binding_active(id, target) {
                    self.apply_binding(id, target);
                }
            }
        }

        let orphaned = self.state.live_aura(id).is_some_and(|aura| {
            let owner_anchored = match &aura.kind {
                AuraKind::Unit { static_targets } => {
                    aura.is_passive() || static_targets.contains_key(&aura.owner)
                }
                AuraKind::DynObj { .. } => true,
            };
            had_bindings && aura.applications.is_empty() && !owner_anchored
        });
        if orphaned {
            tracing::debug!(target: "aura::targets", aura = %id, "no targets left");
            self.remove_aura(id, RemoveMode::Default);
        }
    }

    /// Every unit the aura should currently be bound to, with the effects
    /// each one should carry.
    pub(crate) fn fill_target_map(&self, id: AuraId) -> BTreeMap<ObjectGuid, EffectMask> {
        let mut targets = BTreeMap::new();
        let Some(aura) = self.state.live_aura(id) else {
            return targets;
        };
        let spell = aura.spell.as_ref();
        let owner = aura.owner;
        let reference = aura.caster.unwrap_or(owner);
        let partition = self.host.partition(owner);
        let center = self.host.position(owner);

        match &aura.kind {
            AuraKind::Unit { static_targets } => {
                for (target, mask) in static_targets {
                    *targets.entry(*target).or_insert(EffectMask::NONE) |= *mask;
                }
                if !self.host.is_in_world(owner) {
                    return targets;
                }
                for effect in aura.effects() {
                    let Some(info) = spell.effect(effect.index()) else {
                        continue;
                    };
                    let units = self.unit_aura_targets(spell, info, owner, reference, center);
                    for unit in units {
                        if self.host.partition(unit) == partition {
                            *targets.entry(unit).or_insert(EffectMask::NONE) |=
                                EffectMask::single(info.index);
                        }
                    }
                }
            }
            AuraKind::DynObj { radius } => {
                let Some(center) = center else {
                    return targets;
                };
                for effect in aura.effects() {
                    let Some(info) = spell.effect(effect.index()) else {
                        continue;
                    };
                    let query = AreaTargetQuery {
                        spell,
                        effect_index: info.index,
                        origin: owner,
                        center,
                        radius: *radius,
                        check: info.area_check(),
                        reference,
                    };
                    for unit in self.host.select_area_targets(&query) {
                        if self.host.partition(unit) == partition {
                            *targets.entry(unit).or_insert(EffectMask::NONE) |=
                                EffectMask::single(info.index);
                        }
                    }
                }
            }
        }
        targets
    }

    /// Units one effect of a unit-owned aura reaches besides the static
    /// targets.
    fn unit_aura_targets(
        &self,
        spell: &SpellInfo,
        info: &SpellEffectInfo,
        owner: ObjectGuid,
        reference: ObjectGuid,
        center: Option<Position>,
    ) -> Vec<ObjectGuid> {
        let in_radius = |unit: ObjectGuid| {
            matches!(
                (self.host.position(unit), center),
                (Some(position), Some(center)) if position.is_within(&center, info.radius)
            )
        };
        let search = |check: TargetCheck, radius: f32| match center {
            Some(center) => self.host.select_area_targets(&AreaTargetQuery {
                spell,
                effect_index: info.index,
                origin: owner,
                center,
                radius,
                check,
                reference,
            }),
            None => Vec::new(),
        };

        match info.effect {
            SpellEffectKind::ApplyAuraOnPet => self.host.pet_of(owner).into_iter().collect(),
            SpellEffectKind::ApplyAreaAuraParty | SpellEffectKind::ApplyAreaAuraPartyNonrandom => {
                search(TargetCheck::Party, info.radius)
            }
            SpellEffectKind::ApplyAreaAuraRaid => search(TargetCheck::Raid, info.radius),
            SpellEffectKind::ApplyAreaAuraFriend => search(TargetCheck::Ally, info.radius),
            SpellEffectKind::ApplyAreaAuraEnemy => search(
                TargetCheck::Enemy,
                info.radius + self.state.config.enemy_extra_search_radius,
            ),
            SpellEffectKind::ApplyAreaAuraPet => {
                let mut units = vec![owner];
                units.extend(self.host.owner_of(owner).filter(|master| in_radius(*master)));
                units
            }
            SpellEffectKind::ApplyAreaAuraOwner => self
                .host
                .owner_of(owner)
                .filter(|master| in_radius(*master))
                .into_iter()
                .collect(),
            SpellEffectKind::ApplyAreaAuraSummons => {
                let mut units = vec![owner];
                units.extend(search(TargetCheck::Summoned, info.radius));
                units
            }
            _ => Vec::new(),
        }
    }

    fn strip_immune_effects(
        &self,
        spell: &SpellInfo,
        target: ObjectGuid,
        caster: Option<ObjectGuid>,
        mut mask: EffectMask,
    ) -> EffectMask {
        for info in &spell.effects {
            if mask.has(info.index) && self.host.is_immune_to_effect(target, spell, info, caster) {
                mask.remove(info.index);
            }
        }
        mask
    }

    /// Whether the aura may be bound to `target` at all.
    ///
    /// Units outside the world only accept their own auras, and never a
    /// single-target aura someone else cast. In-world units go through the
    /// spell's area-target hooks.
    pub fn can_be_applied_on(&self, id: AuraId, target: ObjectGuid) -> bool {
        let Some(aura) = self.state.live_aura(id) else {
            return false;
        };
        if !self.host.is_in_world(target) {
            if target != aura.owner {
                return false;
            }
            return !(aura.spell.is_single_target() && aura.caster != Some(aura.owner));
        }

        let Some(scripts) = self.env.scripts_opt() else {
            return true;
        };
        for entry in scripts.entries(aura.spell.id) {
            if let AuraHook::CheckAreaTarget(hook) = &entry.hook
                && !hook(self, id, target)
            {
                tracing::trace!(target: "aura::targets", aura = %id, unit = %target, "area target vetoed");
                return false;
            }
        }
        true
    }

    /// Compares the aura against exclusive-highest rivals on `target`.
    ///
    /// Returns `false` when a rival is stronger. With `remove_others`, weaker
    /// rivals are removed from the target, except area auras on their own
    /// owner.
    pub(crate) fn is_highest_exclusive_aura(
        &mut self,
        id: AuraId,
        target: ObjectGuid,
        remove_others: bool,
    ) -> bool {
        let Some(aura) = self.state.live_aura(id) else {
            return false;
        };
        let Some(holder) = self.state.holder(target) else {
            return true;
        };
        let spells = self.env.spells();
        let our_count = i64::from(aura.effect_mask().count());

        let mut weaker = Vec::new();
        for effect in aura.effects() {
            for &(other_id, other_index) in holder.effects_of_type(effect.aura_type()) {
                if other_id == id {
                    continue;
                }
                let Some(other) = self.state.live_aura(other_id) else {
                    continue;
                };
                if spells.group_stack_rule(&aura.spell, &other.spell)
                    != SpellGroupStackRule::ExclusiveHighest
                {
                    continue;
                }
                let Some(other_effect) = other.effect(other_index) else {
                    continue;
                };

                let mut diff =
                    i64::from(effect.amount()).abs() - i64::from(other_effect.amount()).abs();
                if diff == 0 {
                    diff = our_count - i64::from(other.effect_mask().count());
                }
                if diff < 0 {
                    return false;
                }
                if diff > 0 && remove_others && !(other.is_area() && other.owner == target) {
                    weaker.push(other_id);
                }
            }
        }

        weaker.dedup();
        for other in weaker {
            tracing::debug!(target: "aura::targets", aura = %other, by = %id, unit = %target, "weaker exclusive aura removed");
            self.remove_applied_aura(target, other, RemoveMode::Default);
        }
        true
    }

    /// Exclusivity and stacking checks a binding on `target` must pass,
    /// whether it is new or has its effects changed. The owner is exempt
    /// from the stacking check.
    fn may_bind(&mut self, id: AuraId, target: ObjectGuid) -> bool {
        if !self.is_highest_exclusive_aura(id, target, true) {
            return false;
        }
        let owner = self.state.live_aura(id).map(Aura::owner);
        owner == Some(target) || self.can_stack_with_applied(id, target)
    }

    /// Whether the aura stacks with everything already bound to `target`.
    fn can_stack_with_applied(&self, id: AuraId, target: ObjectGuid) -> bool {
        let Some(aura) = self.state.live_aura(id) else {
            return false;
        };
        let spells = self.env.spells();
        self.state
            .applied_auras(target)
            .into_iter()
            .filter(|other| *other != id)
            .filter_map(|other| self.state.live_aura(other))
            .all(|other| aura.can_stack_with(other, spells, &*self.host))
    }
}

//! Aura factory: create, refresh-or-create, load and save.
use std::collections::BTreeMap;
use std::sync::Arc;

use super::AuraEngine;
use crate::aura::{Aura, AuraCreateInfo, AuraHandle, AuraKind, AuraSaveState, empty_effects};
use crate::config::AuraConfig;
use crate::effect::AuraEffect;
use crate::error::AuraCreateError;
use crate::spell::{
    SpellAttributes, SpellEffectAttributes, SpellEffectKind, SpellInfo, SpellModOp, SpellSpecific,
};
use crate::types::{AuraId, EffectMask, ObjectGuid, ObjectKind, RemoveMode};

/// Effects of `spell` an aura owned by `owner` carries.
pub fn owner_effect_mask(spell: &SpellInfo, owner: ObjectGuid) -> EffectMask {
    let dyn_obj = owner.kind() == ObjectKind::DynamicObject;
    spell
        .effects
        .iter()
        .filter(|effect| usize::from(effect.index) < AuraConfig::MAX_SPELL_EFFECTS)
        .filter(|effect| {
            if dyn_obj {
                effect.effect == SpellEffectKind::PersistentAreaAura
            } else {
                effect.effect.is_unit_owned_aura()
            }
        })
        .fold(EffectMask::NONE, |mask, effect| mask | EffectMask::single(effect.index))
}

impl AuraEngine<'_> {
    /// Refreshes the aura `info` would collide with, or creates a new one.
    ///
    /// A refresh adds `info.stack_amount` stacks and restarts timers and
    /// charges. An existing aura carrying a different effect set than the
    /// request would is replaced instead.
    pub fn try_refresh_stack_or_create(
        &mut self,
        info: AuraCreateInfo,
    ) -> Result<AuraHandle, AuraCreateError> {
        let spell = self
            .env
            .spell(info.spell)
            .map_err(|_| AuraCreateError::SpellNotFound(info.spell))?;
        let mask = owner_effect_mask(&spell, info.owner) & info.effect_mask;

        if let Some(existing) = self.find_refreshable(&spell, &info) {
            let same_mask = self
                .state
                .live_aura(existing)
                .is_some_and(|aura| aura.effect_mask() == mask);
            if same_mask {
                self.refresh_existing(existing, &spell, &info);
                return Ok(AuraHandle {
                    aura: existing,
                    refreshed: true,
                });
            }
            tracing::debug!(
                target: "aura::create",
                aura = %existing,
                spell = %spell.id,
                "effect set changed, replacing aura"
            );
            self.remove_aura(existing, RemoveMode::Default);
        }

        let aura = self.create_aura(info)?;
        Ok(AuraHandle {
            aura,
            refreshed: false,
        })
    }

    fn find_refreshable(&self, spell: &SpellInfo, info: &AuraCreateInfo) -> Option<AuraId> {
        if spell.is_multi_slot() {
            return None;
        }
        let holder = self.state.holder(info.owner)?;
        holder
            .owned()
            .query()
            .has_spell(spell.id)
            .ids()
            .into_iter()
            .filter_map(|id| self.state.live_aura(id))
            .find(|aura| {
                let caster_matches =
                    spell.is_stackable_with_different_casters() || aura.caster == info.caster;
                let item_matches = aura.cast_item == info.cast_item
                    || !spell.has_attribute(SpellAttributes::ENCHANT_PROC);
                caster_matches && item_matches
            })
            .map(Aura::id)
    }

    fn refresh_existing(&mut self, id: AuraId, spell: &SpellInfo, info: &AuraCreateInfo) {
        if let Some(aura) = self.live_aura_mut(id) {
            for effect in aura.effects.iter_mut().flatten() {
                let index = effect.index();
                let Some(effect_info) = spell.effect(index) else {
                    continue;
                };
                let requested = info.base_amount(index).unwrap_or(effect_info.base_points);
                if effect_info
                    .attributes
                    .contains(SpellEffectAttributes::AURA_POINTS_STACK)
                {
                    effect.set_base_amount(effect.base_amount().saturating_add(requested));
                } else if let Some(base) = info.base_amount(index) {
                    effect.set_base_amount(base);
                }
            }
        }

        tracing::debug!(
            target: "aura::create",
            aura = %id,
            spell = %spell.id,
            stacks = info.stack_amount,
            "aura refreshed"
        );
        self.modify_stack_amount(
            id,
            i32::from(info.stack_amount),
            RemoveMode::Default,
            info.reset_periodic_timer,
        );
    }

    /// Creates a new aura and binds it to its initial targets.
    pub fn create_aura(&mut self, info: AuraCreateInfo) -> Result<AuraId, AuraCreateError> {
        self.create_aura_inner(info, true)
    }

    pub(crate) fn create_aura_inner(
        &mut self,
        info: AuraCreateInfo,
        apply: bool,
    ) -> Result<AuraId, AuraCreateError> {
        let spell = self
            .env
            .spell(info.spell)
            .map_err(|_| AuraCreateError::SpellNotFound(info.spell))?;
        let owner = info.owner;
        if !self.host.exists(owner) {
            return Err(AuraCreateError::OwnerNotFound(owner));
        }

        let kind = match owner.kind() {
            kind if kind.is_unit() => AuraKind::Unit {
                static_targets: BTreeMap::new(),
            },
            ObjectKind::DynamicObject => {
                let radius = info
                    .radius
                    .ok_or(AuraCreateError::MissingRadius(spell.id))?;
                if info.caster.is_none() {
                    return Err(AuraCreateError::MissingCaster(spell.id));
                }
                AuraKind::DynObj { radius }
            }
            _ => return Err(AuraCreateError::InvalidOwnerKind(owner)),
        };

        let mask = owner_effect_mask(&spell, owner) & info.effect_mask;
        if mask.is_empty() {
            return Err(AuraCreateError::EmptyEffectMask {
                spell: spell.id,
                owner,
            });
        }

        if spell.is_single_target()
            && info.caster != Some(owner)
            && !self.host.is_in_world(owner)
        {
            return Err(AuraCreateError::OwnerNotInWorld {
                spell: spell.id,
                owner,
            });
        }

        let id = self.state.allocate_aura_id();
        let caster_level = info
            .caster
            .map_or(spell.spell_level, |caster| self.host.level(caster));
        let max_duration = self.calc_max_duration(&spell, info.caster);

        let mut aura = Aura {
            id,
            spell: Arc::clone(&spell),
            cast_id: info.cast_id,
            caster: info.caster,
            cast_item: info.cast_item,
            cast_item_level: info.cast_item_level,
            visual: spell.visual,
            owner,
            kind,
            apply_time: self.state.now,
            caster_level,
            max_duration,
            duration: max_duration,
            update_target_map_interval: 0,
            proc_charges: 0,
            stack_amount: 1,
            is_removed: false,
            is_single_target: info.caster.is_some() && spell.is_single_target(),
            is_using_charges: false,
            drop_event: None,
            proc_cooldown: None,
            last_proc_attempt: None,
            last_proc_success: None,
            effects: empty_effects(),
            applications: BTreeMap::new(),
        };
        aura.stack_amount = info.stack_amount.clamp(1, aura.max_stack_amount());

        let ctx = aura.calc_context(&spell, &*self.host, self.env.scripts_opt());
        for effect_info in spell.effects.iter().filter(|effect| mask.has(effect.index)) {
            let effect = AuraEffect::new(effect_info, info.base_amount(effect_info.index), &ctx);
            aura.effects[usize::from(effect_info.index)] = Some(effect);
        }
        let charges = aura.calc_max_charges(&*self.host);
        aura.set_charges(charges);

        if let AuraKind::Unit { static_targets } = &mut aura.kind {
            let bound = spell
                .effects
                .iter()
                .filter(|effect| mask.has(effect.index))
                .filter(|effect| effect.effect == SpellEffectKind::ApplyAura)
                .fold(EffectMask::NONE, |acc, effect| acc | EffectMask::single(effect.index));
            if !bound.is_empty() {
                static_targets.insert(owner, bound);
            }
        }

        let facets = aura.facets();
        self.state.auras.insert(id, aura);
        self.state.holder_mut(owner).owned().insert(facets);
        tracing::debug!(
            target: "aura::create",
            aura = %id,
            spell = %spell.id,
            owner = %owner,
            duration = max_duration,
            effects = %mask,
            "aura created"
        );

        if !self.is_highest_exclusive_aura(id, owner, false) {
            tracing::debug!(target: "aura::create", aura = %id, "weaker than an exclusive aura");
            self.remove_aura(id, RemoveMode::Default);
        }
        if self.is_live(id) {
            self.remove_owned_non_stacking(id, owner);
        }
        if self.is_live(id) {
            self.track_single_target(id, &spell);
        }

        if !self.is_live(id) {
            return Err(AuraCreateError::RemovedDuringCreate(spell.id));
        }
        self.update_target_map(id, apply);
        Ok(id)
    }

    /// Removes the owner's other auras the new one cannot stack with.
    fn remove_owned_non_stacking(&mut self, id: AuraId, owner: ObjectGuid) {
        let Some(aura) = self.state.live_aura(id) else {
            return;
        };
        let spells = self.env.spells();
        let conflicting: Vec<AuraId> = self
            .state
            .owned_auras(owner)
            .into_iter()
            .filter(|other| *other != id)
            .filter_map(|other| self.state.live_aura(other))
            .filter(|other| !aura.can_stack_with(other, spells, &*self.host))
            .map(Aura::id)
            .collect();
        for other in conflicting {
            tracing::debug!(target: "aura::create", aura = %other, by = %id, "removed by non-stacking aura");
            self.remove_aura(other, RemoveMode::Default);
        }
    }

    /// Registers a single-target aura with its caster and drops the oldest
    /// ones sharing its limit.
    fn track_single_target(&mut self, id: AuraId, spell: &SpellInfo) {
        let Some(caster) = self.state.live_aura(id).filter(|aura| aura.is_single_target).and_then(Aura::caster) else {
            return;
        };
        let keep = spell.max_affected_targets.max(1) as usize - 1;
        let shared: Vec<AuraId> = self
            .state
            .holder(caster)
            .map(|holder| holder.single_cast.clone())
            .unwrap_or_default()
            .into_iter()
            .filter(|other| {
                self.state.live_aura(*other).is_some_and(|other| {
                    let other = other.spell.as_ref();
                    spell.is_rank_of(other)
                        || (spell.specific == SpellSpecific::MagePolymorph
                            && other.specific == SpellSpecific::MagePolymorph)
                })
            })
            .collect();

        let excess = shared.len().saturating_sub(keep);
        for other in shared.into_iter().take(excess) {
            tracing::debug!(target: "aura::create", aura = %other, caster = %caster, "single-target limit reached");
            self.remove_aura(other, RemoveMode::Default);
        }
        self.state.holder_mut(caster).single_cast.push(id);
    }

    /// Duration a fresh application of `spell` from `caster` lasts.
    pub(crate) fn calc_max_duration(&self, spell: &SpellInfo, caster: Option<ObjectGuid>) -> i32 {
        if spell.is_passive() && spell.duration.is_none() {
            return -1;
        }
        let mut duration = spell.base_duration();
        if duration == -1 {
            return -1;
        }
        if let Some(caster) = caster {
            duration = self
                .host
                .apply_spell_mod(caster, spell, SpellModOp::Duration, duration);
            if spell.is_channeled() || spell.has_attribute(SpellAttributes::HASTE_AFFECTS_DURATION) {
                duration = (duration as f32 * self.host.cast_speed(caster)) as i32;
            }
        }
        duration.max(0)
    }

    /// Recreates a saved aura on `owner` and applies it.
    ///
    /// Saved amounts, timers, charges and stacks win over freshly computed
    /// ones; effects flagged recalculable are recomputed afterwards.
    pub fn load_aura(
        &mut self,
        owner: ObjectGuid,
        saved: &AuraSaveState,
    ) -> Result<AuraId, AuraCreateError> {
        let mut info = AuraCreateInfo::new(saved.spell, owner)
            .with_cast_id(saved.cast_id)
            .with_effect_mask(saved.effect_mask)
            .with_base_amounts(saved.base_amounts.clone())
            .with_stack_amount(saved.stack_amount.max(1));
        info.caster = saved.caster;
        info.cast_item = saved.cast_item;

        let id = self.create_aura_inner(info, false)?;
        if !self.state.live_aura(id).is_some_and(Aura::can_be_saved) {
            tracing::warn!(target: "aura::create", aura = %id, spell = %saved.spell, "saved aura can no longer be saved, dropping");
            self.remove_aura(id, RemoveMode::Default);
            return Err(AuraCreateError::RemovedDuringCreate(saved.spell));
        }

        let scripts = self.env.scripts_opt();
        let host = &*self.host;
        let Some(aura) = self.state.auras.get_mut(&id) else {
            return Err(AuraCreateError::RemovedDuringCreate(saved.spell));
        };
        aura.max_duration = saved.max_duration;
        aura.duration = saved.duration;
        aura.set_charges(saved.charges);
        aura.stack_amount = saved.stack_amount.clamp(1, aura.max_stack_amount());

        let spell = Arc::clone(&aura.spell);
        let ctx = aura.calc_context(&spell, host, scripts);
        for effect in aura.effects.iter_mut().flatten() {
            let index = effect.index();
            if let Some(amount) = saved.amount(index) {
                effect.set_amount(amount);
            }
            effect.set_can_be_recalculated(saved.recalculate_mask.has(index));
            effect.calculate_periodic(&ctx, false, true);
            if effect.can_be_recalculated() {
                let amount = effect.calculate_amount(&ctx);
                effect.set_amount(amount);
            }
        }
        let facets = aura.facets();
        let targets = aura.targets();
        self.state.holder_mut(owner).owned().insert(facets);

        tracing::debug!(
            target: "aura::create",
            aura = %id,
            spell = %saved.spell,
            duration = saved.duration,
            stacks = saved.stack_amount,
            "aura loaded"
        );
        for target in targets {
            if self.binding_active(id, target) {
                self.apply_binding(id, target);
            }
        }
        Ok(id)
    }

    /// Save records of the auras `owner` owns that survive a logout.
    pub fn save_auras(&self, owner: ObjectGuid) -> Vec<AuraSaveState> {
        self.state
            .owned_auras(owner)
            .into_iter()
            .filter_map(|id| self.state.live_aura(id))
            .filter(|aura| aura.can_be_saved())
            .map(AuraSaveState::capture)
            .collect()
    }
}

//! Aura instances.
//!
//! An [`Aura`] is one application of a spell's aura effects, owned by a unit
//! (possibly spreading to nearby units through area effects) or by a dynamic
//! object sitting at a point in the world. The engine mutates it; this module
//! holds the data and the computations that only need the aura itself.
mod create;
mod save;
mod stacking;

use std::collections::BTreeMap;
use std::sync::Arc;

use arrayvec::ArrayVec;

pub use create::{AuraCreateInfo, AuraHandle};
pub use save::AuraSaveState;

use crate::application::{AuraApplication, AuraData};
use crate::collection::{AuraFacets, FacetFlags};
use crate::config::AuraConfig;
use crate::effect::{AuraEffect, EffectCalcContext};
use crate::env::UnitHost;
use crate::events::EventId;
use crate::script::ScriptRegistry;
use crate::spell::{AuraType, SpellAttributes, SpellInfo, SpellModOp};
use crate::types::{AuraFlags, AuraId, CastId, EffectMask, GameTime, ObjectGuid};

/// Anchor of an aura.
#[derive(Clone, Debug, PartialEq)]
pub enum AuraKind {
    /// Owned by a unit. `static_targets` are bindings requested at cast time
    /// (the owner itself for plain single-target auras).
    Unit {
        static_targets: BTreeMap<ObjectGuid, EffectMask>,
    },
    /// Owned by a dynamic object; targets are every unit in `radius`.
    DynObj { radius: f32 },
}

/// Per-slot effect table.
pub type EffectSlots = ArrayVec<Option<AuraEffect>, { AuraConfig::MAX_SPELL_EFFECTS }>;

/// Table with every slot present and empty.
pub(crate) fn empty_effects() -> EffectSlots {
    let mut effects = EffectSlots::new();
    while !effects.is_full() {
        effects.push(None);
    }
    effects
}

/// One aura instance.
#[derive(Clone, Debug)]
pub struct Aura {
    pub(crate) id: AuraId,
    pub(crate) spell: Arc<SpellInfo>,
    pub(crate) cast_id: CastId,
    pub(crate) caster: Option<ObjectGuid>,
    pub(crate) cast_item: Option<ObjectGuid>,
    pub(crate) cast_item_level: u16,
    pub(crate) visual: u32,
    pub(crate) owner: ObjectGuid,
    pub(crate) kind: AuraKind,
    pub(crate) apply_time: GameTime,
    pub(crate) caster_level: u16,
    pub(crate) max_duration: i32,
    pub(crate) duration: i32,
    /// Milliseconds until the next target-map reconciliation.
    pub(crate) update_target_map_interval: i32,
    pub(crate) proc_charges: u8,
    pub(crate) stack_amount: u8,
    pub(crate) is_removed: bool,
    pub(crate) is_single_target: bool,
    pub(crate) is_using_charges: bool,
    pub(crate) drop_event: Option<EventId>,
    pub(crate) proc_cooldown: Option<GameTime>,
    pub(crate) last_proc_attempt: Option<GameTime>,
    pub(crate) last_proc_success: Option<GameTime>,
    pub(crate) effects: EffectSlots,
    pub(crate) applications: BTreeMap<ObjectGuid, AuraApplication>,
}

impl Aura {
    pub fn id(&self) -> AuraId {
        self.id
    }

    pub fn spell(&self) -> &Arc<SpellInfo> {
        &self.spell
    }

    pub fn cast_id(&self) -> CastId {
        self.cast_id
    }

    pub fn caster(&self) -> Option<ObjectGuid> {
        self.caster
    }

    pub fn cast_item(&self) -> Option<ObjectGuid> {
        self.cast_item
    }

    pub fn owner(&self) -> ObjectGuid {
        self.owner
    }

    pub fn kind(&self) -> &AuraKind {
        &self.kind
    }

    pub fn is_dyn_obj(&self) -> bool {
        matches!(self.kind, AuraKind::DynObj { .. })
    }

    pub fn apply_time(&self) -> GameTime {
        self.apply_time
    }

    pub fn caster_level(&self) -> u16 {
        self.caster_level
    }

    pub fn max_duration(&self) -> i32 {
        self.max_duration
    }

    pub fn duration(&self) -> i32 {
        self.duration
    }

    pub fn charges(&self) -> u8 {
        self.proc_charges
    }

    pub fn stack_amount(&self) -> u8 {
        self.stack_amount
    }

    pub fn is_removed(&self) -> bool {
        self.is_removed
    }

    pub fn is_single_target(&self) -> bool {
        self.is_single_target
    }

    pub fn is_using_charges(&self) -> bool {
        self.is_using_charges
    }

    pub fn has_pending_charge_drop(&self) -> bool {
        self.drop_event.is_some()
    }

    pub fn proc_cooldown(&self) -> Option<GameTime> {
        self.proc_cooldown
    }

    pub fn is_proc_on_cooldown(&self, now: GameTime) -> bool {
        self.proc_cooldown.is_some_and(|until| until > now)
    }

    pub fn is_permanent(&self) -> bool {
        self.max_duration == -1
    }

    pub fn is_passive(&self) -> bool {
        self.spell.is_passive()
    }

    pub fn is_death_persistent(&self) -> bool {
        self.spell.is_death_persistent()
    }

    /// Expired: duration ran out on a timed aura.
    pub fn is_expired(&self) -> bool {
        self.duration == 0 && !self.is_permanent()
    }

    // ===== effects =====

    /// Snapshot of this aura for effect computations. The context does not
    /// borrow the aura, so its effects can be mutated while it is alive.
    pub(crate) fn calc_context<'s>(
        &self,
        spell: &'s Arc<SpellInfo>,
        host: &'s dyn UnitHost,
        scripts: Option<&'s ScriptRegistry>,
    ) -> EffectCalcContext<'s> {
        EffectCalcContext {
            aura: self.id,
            spell,
            caster: self.caster,
            owner: self.owner,
            caster_level: self.caster_level,
            stack_amount: self.stack_amount,
            max_duration: self.max_duration,
            duration: self.duration,
            host,
            scripts,
        }
    }

    pub fn effect(&self, index: u8) -> Option<&AuraEffect> {
        self.effects.get(usize::from(index))?.as_ref()
    }

    pub(crate) fn effect_mut(&mut self, index: u8) -> Option<&mut AuraEffect> {
        self.effects.get_mut(usize::from(index))?.as_mut()
    }

    pub fn effects(&self) -> impl Iterator<Item = &AuraEffect> {
        self.effects.iter().flatten()
    }

    /// Slots holding an effect.
    pub fn effect_mask(&self) -> EffectMask {
        self.effects().fold(EffectMask::NONE, |mask, effect| {
            mask | EffectMask::single(effect.index())
        })
    }

    pub fn has_effect_type(&self, aura_type: AuraType) -> bool {
        self.effects().any(|effect| effect.aura_type() == aura_type)
    }

    /// Any present effect spreads to nearby units.
    pub fn is_area(&self) -> bool {
        self.effects().any(|effect| {
            self.spell
                .effect(effect.index())
                .is_some_and(|info| info.effect.is_area_aura())
        })
    }

    // ===== bindings =====

    pub fn application(&self, target: ObjectGuid) -> Option<&AuraApplication> {
        self.applications.get(&target)
    }

    pub fn applications(&self) -> impl Iterator<Item = &AuraApplication> {
        self.applications.values()
    }

    pub fn targets(&self) -> Vec<ObjectGuid> {
        self.applications.keys().copied().collect()
    }

    // ===== stacks and charges =====

    /// Highest stack count the spell allows.
    pub fn max_stack_amount(&self) -> u8 {
        if self.spell.stack_amount == 0 {
            1
        } else {
            self.spell.stack_amount
        }
    }

    /// Charges a fresh application starts with.
    pub fn calc_max_charges(&self, host: &dyn UnitHost) -> u8 {
        let base = match self.spell.proc_entry() {
            Some(entry) if entry.charges > 0 => entry.charges,
            _ => self.spell.proc_charges,
        };
        let Some(caster) = self.caster else {
            return base;
        };
        let charges = host.apply_spell_mod(caster, &self.spell, SpellModOp::Charges, i32::from(base));
        charges.clamp(0, i32::from(AuraConfig::MAX_PROC_CHARGES)) as u8
    }

    /// Stores a charge count and reports whether it changed.
    pub(crate) fn set_charges(&mut self, charges: u8) -> bool {
        if self.proc_charges == charges {
            return false;
        }
        self.proc_charges = charges;
        self.is_using_charges = charges != 0;
        true
    }

    // ===== persistence and visibility =====

    /// Whether the aura survives a logout.
    pub fn can_be_saved(&self) -> bool {
        if self.is_dyn_obj() || self.is_passive() || self.spell.is_channeled() {
            return false;
        }
        if self.spell.has_attribute(SpellAttributes::CANNOT_BE_SAVED) {
            return false;
        }
        if self.caster != Some(self.owner) && self.spell.is_single_target() {
            return false;
        }
        if self.has_effect_type(AuraType::ControlVehicle) {
            return false;
        }
        !(self.is_using_charges && self.proc_charges == 0)
    }

    /// Passive auras stay hidden unless they spread or are flagged visible.
    pub fn can_be_sent_to_client(&self) -> bool {
        !self.is_passive()
            || self.spell.has_area_aura_effect()
            || self.spell.has_attribute(SpellAttributes::ALWAYS_VISIBLE)
    }

    /// Index record for the owner's and the targets' collections.
    pub fn facets(&self) -> AuraFacets {
        let spell = &self.spell;
        let mut flags = FacetFlags::empty();
        flags.set(FacetFlags::SINGLE_TARGET, self.is_single_target);
        flags.set(FacetFlags::SAVEABLE, self.can_be_saved());
        flags.set(FacetFlags::PASSIVE, self.is_passive());
        flags.set(FacetFlags::DEATH_PERSISTENT, self.is_death_persistent());
        flags.set(FacetFlags::PERMANENT, self.is_permanent());
        flags.set(FacetFlags::NEGATIVE, !spell.is_positive());
        flags.set(FacetFlags::GROUP_BUFF, spell.is_group_buff());
        flags.set(
            FacetFlags::REQUIRES_DEAD_TARGET,
            spell.has_attribute(SpellAttributes::REQUIRES_DEAD_TARGET),
        );
        AuraFacets {
            id: self.id,
            spell: spell.id,
            caster: self.caster,
            cast_item: self.cast_item,
            cast_id: self.cast_id,
            owner: self.owner,
            labels: spell.labels.clone(),
            diminishing_group: spell.diminishing_group,
            caster_aura_state: spell.caster_aura_state,
            dispel: spell.dispel,
            category: spell.category,
            flags,
        }
    }

    /// Client view of `binding`.
    pub fn build_update(&self, binding: &AuraApplication) -> AuraData {
        let spell = &self.spell;
        let mut flags = binding.flags();
        if !self.is_dyn_obj()
            && self.max_duration > 0
            && !spell.has_attribute(SpellAttributes::HIDE_DURATION)
        {
            flags |= AuraFlags::DURATION;
        }

        let cast_level = if spell.has_attribute(SpellAttributes::SCALES_WITH_ITEM_LEVEL)
            && self.cast_item.is_some()
        {
            self.cast_item_level
        } else {
            self.caster_level
        };

        let applications = if spell.stack_amount > 0 {
            self.stack_amount
        } else {
            self.proc_charges
        };

        let caster = match self.caster {
            Some(caster) if caster.is_unit() && !flags.contains(AuraFlags::NOCASTER) => {
                Some(caster)
            }
            _ => None,
        };

        let mut points = Vec::new();
        let mut estimated_points = Vec::new();
        if flags.contains(AuraFlags::SCALABLE) {
            let active: Vec<&AuraEffect> = self
                .effects()
                .filter(|effect| binding.has_effect(effect.index()))
                .collect();
            points = active.iter().map(|effect| effect.amount() as f32).collect();
            if active.iter().any(|effect| effect.estimated_amount().is_some()) {
                estimated_points = active
                    .iter()
                    .map(|effect| {
                        effect
                            .estimated_amount()
                            .unwrap_or(effect.amount() as f32)
                    })
                    .collect();
            }
        }

        AuraData {
            cast_id: self.cast_id,
            spell: spell.id,
            visual: self.visual,
            flags,
            active_mask: binding.effect_mask(),
            cast_level,
            applications,
            caster,
            duration: self.max_duration,
            remaining: self.duration,
            points,
            estimated_points,
        }
    }
}

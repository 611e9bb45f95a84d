//! Per-target binding of an aura.
//!
//! An [`AuraApplication`] joins one aura to one affected unit: which of the
//! aura's effects are active there, the visible slot the unit shows it in,
//! and the positive/negative classification decided when it was created.
mod packet;

pub use packet::{AuraData, AuraUpdate, AuraUpdatePacket};

use crate::spell::SpellInfo;
use crate::types::{AuraFlags, AuraId, EffectMask, ObjectGuid, RemoveMode};

/// Binding of one aura to one target.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuraApplication {
    aura: AuraId,
    target: ObjectGuid,
    slot: Option<u8>,
    flags: AuraFlags,
    /// Effects the binding should carry.
    effects_to_apply: EffectMask,
    /// Effects whose handlers actually ran on the target.
    effect_mask: EffectMask,
    remove_mode: RemoveMode,
    need_client_update: bool,
}

/// Work required to move a binding to a new set of effects.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MaskUpdate {
    Unchanged,
    /// Every effect goes away and nothing is added: drop the whole binding.
    Unbind,
    Partial {
        remove: EffectMask,
        add: EffectMask,
    },
}

impl AuraApplication {
    pub(crate) fn new(
        aura: AuraId,
        target: ObjectGuid,
        slot: Option<u8>,
        effects_to_apply: EffectMask,
        flags: AuraFlags,
    ) -> Self {
        Self {
            aura,
            target,
            slot,
            flags,
            effects_to_apply,
            effect_mask: EffectMask::NONE,
            remove_mode: RemoveMode::None,
            need_client_update: slot.is_some(),
        }
    }

    /// Classification flags for a new binding.
    ///
    /// Self-cast, casterless and hostile bindings are negative as soon as one
    /// effect is harmful. Bindings from a friend are positive as soon as one
    /// effect is helpful.
    pub fn classify(
        spell: &SpellInfo,
        caster: Option<ObjectGuid>,
        target: ObjectGuid,
        caster_is_friendly: bool,
        effects: EffectMask,
        sends_amount: bool,
    ) -> AuraFlags {
        let mut flags = AuraFlags::empty();
        let self_cast = caster == Some(target);
        if self_cast {
            flags |= AuraFlags::NOCASTER;
        }

        if self_cast || caster.is_none() || !caster_is_friendly {
            flags |= if spell.has_negative_effect(effects) {
                AuraFlags::NEGATIVE
            } else {
                AuraFlags::POSITIVE
            };
        } else {
            flags |= if spell.has_positive_effect(effects) {
                AuraFlags::POSITIVE
            } else {
                AuraFlags::NEGATIVE
            };
        }

        if sends_amount {
            flags |= AuraFlags::SCALABLE;
        }
        flags
    }

    pub fn aura(&self) -> AuraId {
        self.aura
    }

    pub fn target(&self) -> ObjectGuid {
        self.target
    }

    pub fn slot(&self) -> Option<u8> {
        self.slot
    }

    pub fn flags(&self) -> AuraFlags {
        self.flags
    }

    pub fn effect_mask(&self) -> EffectMask {
        self.effect_mask
    }

    pub fn effects_to_apply(&self) -> EffectMask {
        self.effects_to_apply
    }

    pub fn has_effect(&self, index: u8) -> bool {
        self.effect_mask.has(index)
    }

    pub fn remove_mode(&self) -> RemoveMode {
        self.remove_mode
    }

    pub fn is_removing(&self) -> bool {
        self.remove_mode.is_removing()
    }

    pub fn is_positive(&self) -> bool {
        self.flags.contains(AuraFlags::POSITIVE)
    }

    pub fn is_selfcast(&self) -> bool {
        self.flags.contains(AuraFlags::NOCASTER)
    }

    pub fn needs_client_update(&self) -> bool {
        self.need_client_update
    }

    pub(crate) fn set_remove_mode(&mut self, mode: RemoveMode) {
        self.remove_mode = mode;
    }

    pub(crate) fn set_slot(&mut self, slot: Option<u8>) {
        self.slot = slot;
    }

    pub(crate) fn set_need_client_update(&mut self, value: bool) {
        self.need_client_update = value && self.slot.is_some() && !self.is_removing();
    }

    pub(crate) fn set_effects_to_apply(&mut self, mask: EffectMask) {
        self.effects_to_apply = mask;
    }

    /// Marks an effect as applied or unapplied on the target. Returns `false`
    /// when the effect already was in the requested state.
    pub(crate) fn mark_effect(&mut self, index: u8, apply: bool) -> bool {
        if self.effect_mask.has(index) == apply {
            return false;
        }
        if apply {
            self.effect_mask.insert(index);
        } else {
            self.effect_mask.remove(index);
        }
        self.set_need_client_update(true);
        true
    }

    /// Splits a change of `effects_to_apply` into removed and added bits.
    pub fn plan_mask_update(&self, new_mask: EffectMask) -> MaskUpdate {
        if self.effects_to_apply == new_mask {
            return MaskUpdate::Unchanged;
        }
        let changed = self.effects_to_apply ^ new_mask;
        let remove = changed & !new_mask;
        let add = changed & !self.effects_to_apply;
        if remove == self.effects_to_apply && add.is_empty() {
            return MaskUpdate::Unbind;
        }
        MaskUpdate::Partial { remove, add }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spell::{AuraType, SpellEffectInfo, SpellEffectKind};
    use crate::types::SpellId;

    fn mixed_spell() -> SpellInfo {
        SpellInfo::new(SpellId(10), "Mixed")
            .with_effect(
                SpellEffectInfo::new(0, SpellEffectKind::ApplyAura, AuraType::ModStat)
                    .with_base_points(5),
            )
            .with_effect(SpellEffectInfo::new(
                1,
                SpellEffectKind::ApplyAura,
                AuraType::PeriodicDamage,
            ))
    }

    #[test]
    fn classification_depends_on_relationship() {
        let spell = mixed_spell();
        let caster = ObjectGuid::player(1);
        let target = ObjectGuid::player(2);
        let both = EffectMask(0b11);

        let friendly = AuraApplication::classify(&spell, Some(caster), target, true, both, false);
        assert_eq!(friendly, AuraFlags::POSITIVE);

        let hostile = AuraApplication::classify(&spell, Some(caster), target, false, both, false);
        assert_eq!(hostile, AuraFlags::NEGATIVE);

        let own = AuraApplication::classify(&spell, Some(caster), caster, true, EffectMask(0b01), true);
        assert_eq!(
            own,
            AuraFlags::NOCASTER | AuraFlags::POSITIVE | AuraFlags::SCALABLE
        );
    }

    #[test]
    fn mask_update_short_circuits_full_removal() {
        let binding = AuraApplication::new(
            AuraId(1),
            ObjectGuid::player(1),
            Some(0),
            EffectMask(0b011),
            AuraFlags::POSITIVE,
        );

        assert_eq!(binding.plan_mask_update(EffectMask(0b011)), MaskUpdate::Unchanged);
        assert_eq!(binding.plan_mask_update(EffectMask::NONE), MaskUpdate::Unbind);
        assert_eq!(
            binding.plan_mask_update(EffectMask(0b110)),
            MaskUpdate::Partial {
                remove: EffectMask(0b001),
                add: EffectMask(0b100),
            }
        );
    }

    #[test]
    fn mark_effect_rejects_double_apply() {
        let mut binding = AuraApplication::new(
            AuraId(1),
            ObjectGuid::player(1),
            None,
            EffectMask(0b1),
            AuraFlags::POSITIVE,
        );

        assert!(binding.mark_effect(0, true));
        assert!(!binding.mark_effect(0, true));
        assert!(binding.has_effect(0));
        // no visible slot, nothing to sync
        assert!(!binding.needs_client_update());
        assert!(binding.mark_effect(0, false));
        assert!(binding.effect_mask().is_empty());
    }
}

use super::Aura;
use crate::config::AuraConfig;
use crate::types::{CastId, EffectMask, ObjectGuid, SpellId};

/// Persisted form of a saveable aura.
///
/// `amounts` and `base_amounts` are indexed by effect slot; slots the aura
/// does not carry hold zero.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AuraSaveState {
    pub spell: SpellId,
    pub caster: Option<ObjectGuid>,
    pub cast_item: Option<ObjectGuid>,
    pub cast_id: CastId,
    pub effect_mask: EffectMask,
    /// Effects whose amount may still be recalculated after loading.
    pub recalculate_mask: EffectMask,
    pub stack_amount: u8,
    pub charges: u8,
    pub max_duration: i32,
    pub duration: i32,
    pub amounts: Vec<i32>,
    pub base_amounts: Vec<i32>,
}

impl AuraSaveState {
    pub fn capture(aura: &Aura) -> Self {
        let mut amounts = vec![0; AuraConfig::MAX_SPELL_EFFECTS];
        let mut base_amounts = vec![0; AuraConfig::MAX_SPELL_EFFECTS];
        let mut recalculate_mask = EffectMask::NONE;
        for effect in aura.effects() {
            let slot = usize::from(effect.index());
            amounts[slot] = effect.amount();
            base_amounts[slot] = effect.base_amount();
            if effect.can_be_recalculated() {
                recalculate_mask.insert(effect.index());
            }
        }
        Self {
            spell: aura.spell.id,
            caster: aura.caster,
            cast_item: aura.cast_item,
            cast_id: aura.cast_id,
            effect_mask: aura.effect_mask(),
            recalculate_mask,
            stack_amount: aura.stack_amount,
            charges: aura.proc_charges,
            max_duration: aura.max_duration,
            duration: aura.duration,
            amounts,
            base_amounts,
        }
    }

    pub(crate) fn amount(&self, index: u8) -> Option<i32> {
        self.amounts.get(usize::from(index)).copied()
    }
}

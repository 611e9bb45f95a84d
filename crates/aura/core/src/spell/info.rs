//! Static spell definitions as consumed by the aura runtime.

use bitflags::bitflags;

use super::aura_type::{AuraType, SpellEffectKind};
use super::kinds::{
    AuraStateType, DiminishingGroup, DispelType, Mechanic, SchoolMask, SpellImplicitTarget,
    SpellSpecific, TargetReference,
};
use super::proc::SpellProcEntry;
use crate::types::{EffectMask, SpellId};

bitflags! {
    /// Spell-wide switches that change aura behavior.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct SpellAttributes: u64 {
        const PASSIVE                        = 1 << 0;
        const CHANNELED                      = 1 << 1;
        /// Clients never show a duration for this aura.
        const HIDE_DURATION                  = 1 << 2;
        /// First periodic tick happens on apply.
        const TICK_ON_APPLY                  = 1 << 3;
        /// Refresh rolls a partial last tick into the new duration.
        const DONT_RESET_PERIODIC_TIMER      = 1 << 4;
        /// Refresh extends the remaining duration by up to 30%.
        const PERIODIC_REFRESH_EXTENDS       = 1 << 5;
        const HASTE_AFFECTS_PERIOD           = 1 << 6;
        const HASTE_AFFECTS_DURATION         = 1 << 7;
        /// One instance per target, no matter the caster.
        const AURA_UNIQUE                    = 1 << 8;
        const AURA_UNIQUE_PER_CASTER         = 1 << 9;
        /// Casters share a single instance of the aura.
        const STACK_FOR_DIFF_CASTERS         = 1 << 10;
        /// Periodic effects from different casters always stack.
        const DOT_STACKING_RULE              = 1 << 11;
        /// Every cast creates its own instance.
        const MULTI_SLOT                     = 1 << 12;
        const ENCHANT_PROC                   = 1 << 13;
        const DEATH_PERSISTENT               = 1 << 14;
        const REQUIRES_DEAD_TARGET           = 1 << 15;
        const GROUP_BUFF                     = 1 << 16;
        const CANNOT_BE_SAVED                = 1 << 17;
        /// Clients receive effect amounts.
        const SEND_AMOUNT                    = 1 << 18;
        /// Clients receive the aura even when passive.
        const ALWAYS_VISIBLE                 = 1 << 19;
        const DISPEL_REMOVES_CHARGES         = 1 << 20;
        const CAN_PROC_FROM_PROCS            = 1 << 21;
        const ONLY_PROC_ON_CASTER            = 1 << 22;
        const PROC_COOLDOWN_ON_FAILURE       = 1 << 23;
        const INSTANT_TARGET_PROCS           = 1 << 24;
        const SINGLE_TARGET                  = 1 << 25;
        const SCALES_WITH_ITEM_LEVEL         = 1 << 26;
        const CAN_CRIT                       = 1 << 27;
        /// Spell is classified harmful regardless of effect polarity.
        const NEGATIVE                       = 1 << 28;
        const DO_NOT_CONSUME_RESOURCES       = 1 << 29;
        const PROC_ON_INSTANT_CAST           = 1 << 30;
    }
}

bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct SpellEffectAttributes: u16 {
        /// Amount does not multiply with stack count.
        const NO_SCALE_WITH_STACK = 1 << 0;
        /// Refreshing adds the new base points to the old ones.
        const AURA_POINTS_STACK   = 1 << 1;
        /// Effect is harmful even on a friendly spell.
        const NEGATIVE            = 1 << 2;
    }
}

/// One effect slot of a spell.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SpellEffectInfo {
    pub index: u8,
    pub effect: SpellEffectKind,
    pub aura: AuraType,
    pub base_points: i32,
    pub points_per_level: f32,
    /// Tick period in milliseconds; zero for non-periodic effects.
    pub amplitude: i32,
    pub misc_value: i32,
    pub misc_value_b: i32,
    pub trigger_spell: Option<SpellId>,
    pub radius: f32,
    pub target_a: SpellImplicitTarget,
    pub target_b: SpellImplicitTarget,
    pub mechanic: Mechanic,
    pub attributes: SpellEffectAttributes,
    /// Estimated points shown by clients (absorb previews and similar).
    pub estimated_points: Option<f32>,
}

impl SpellEffectInfo {
    pub fn new(index: u8, effect: SpellEffectKind, aura: AuraType) -> Self {
        Self {
            index,
            effect,
            aura,
            ..Self::default()
        }
    }

    pub fn with_base_points(mut self, points: i32) -> Self {
        self.base_points = points;
        self
    }

    pub fn with_amplitude(mut self, amplitude: i32) -> Self {
        self.amplitude = amplitude;
        self
    }

    pub fn with_radius(mut self, radius: f32) -> Self {
        self.radius = radius;
        self
    }

    pub fn with_trigger_spell(mut self, spell: SpellId) -> Self {
        self.trigger_spell = Some(spell);
        self
    }

    pub fn with_misc_value(mut self, misc: i32) -> Self {
        self.misc_value = misc;
        self
    }

    pub fn with_targets(mut self, a: SpellImplicitTarget, b: SpellImplicitTarget) -> Self {
        self.target_a = a;
        self.target_b = b;
        self
    }

    pub fn with_attributes(mut self, attributes: SpellEffectAttributes) -> Self {
        self.attributes = attributes;
        self
    }

    pub fn is_targeting_area(&self) -> bool {
        self.effect.is_area_aura() || self.target_a.area || self.target_b.area
    }

    /// Check type used by point-anchored auras: the B side wins when it is
    /// destination-referenced.
    pub fn area_check(&self) -> super::kinds::TargetCheck {
        if self.target_b.reference == TargetReference::Dest {
            self.target_b.check
        } else {
            self.target_a.check
        }
    }

    /// Value of `base` points at the given caster level before spell modifiers.
    pub fn calc_value(&self, base: i32, caster_level: u16, spell: &SpellInfo) -> i32 {
        let mut level = f32::from(caster_level);
        if spell.max_level > 0 && level > f32::from(spell.max_level) {
            level = f32::from(spell.max_level);
        }
        level = (level - f32::from(spell.base_level)).max(0.0);
        base + (level * self.points_per_level) as i32
    }

    /// Static polarity of this effect in isolation.
    pub fn is_positive(&self) -> bool {
        if self.attributes.contains(SpellEffectAttributes::NEGATIVE) {
            return false;
        }
        match self.aura {
            AuraType::PeriodicDamage
            | AuraType::PeriodicDamagePercent
            | AuraType::PeriodicLeech
            | AuraType::PeriodicManaLeech
            | AuraType::PowerBurn
            | AuraType::ModStun
            | AuraType::ModRoot
            | AuraType::ModRoot2
            | AuraType::ModFear
            | AuraType::ModConfuse
            | AuraType::ModSilence
            | AuraType::ModPacify
            | AuraType::ModDecreaseSpeed
            | AuraType::ModSchoolMaskDamageFromCaster
            | AuraType::ModSpellDamageFromCaster => false,
            AuraType::ModStat
            | AuraType::ModResistance
            | AuraType::ModDamageDone
            | AuraType::ModDamagePercentDone
            | AuraType::ModHealingDone
            | AuraType::ModIncreaseHealth => self.base_points >= 0,
            _ => !matches!(self.effect, SpellEffectKind::ApplyAreaAuraEnemy),
        }
    }
}

/// Static definition of a spell, reduced to what the aura runtime reads.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SpellInfo {
    pub id: SpellId,
    pub name: String,
    /// First spell of the rank chain (itself for unranked spells).
    pub first_rank: Option<SpellId>,
    pub family: u32,
    pub family_flags: u64,
    pub attributes: SpellAttributes,
    /// Base duration in milliseconds; `None` for spells without a duration
    /// entry, `Some(-1)` for permanent ones.
    pub duration: Option<i32>,
    pub stack_amount: u8,
    pub proc_charges: u8,
    pub proc: Option<SpellProcEntry>,
    pub proc_base_ppm: f32,
    pub dispel: DispelType,
    pub mechanic: Mechanic,
    pub school_mask: SchoolMask,
    pub specific: SpellSpecific,
    pub diminishing_group: DiminishingGroup,
    /// State the caster must have; indexed for lookups.
    pub caster_aura_state: AuraStateType,
    /// State raised on targets while bound.
    pub aura_state: AuraStateType,
    pub labels: Vec<u32>,
    pub category: u32,
    pub groups: Vec<u32>,
    pub spell_level: u16,
    pub base_level: u16,
    pub max_level: u16,
    pub visual: u32,
    pub max_affected_targets: u32,
    /// Cast time in milliseconds; zero for instant spells.
    pub cast_time: u32,
    pub effects: Vec<SpellEffectInfo>,
}

impl SpellInfo {
    pub fn new(id: SpellId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_duration(mut self, duration: i32) -> Self {
        self.duration = Some(duration);
        self
    }

    pub fn with_attributes(mut self, attributes: SpellAttributes) -> Self {
        self.attributes |= attributes;
        self
    }

    pub fn with_stack_amount(mut self, stacks: u8) -> Self {
        self.stack_amount = stacks;
        self
    }

    pub fn with_proc_charges(mut self, charges: u8) -> Self {
        self.proc_charges = charges;
        self
    }

    pub fn with_proc(mut self, entry: SpellProcEntry) -> Self {
        self.proc = Some(entry);
        self
    }

    pub fn with_effect(mut self, effect: SpellEffectInfo) -> Self {
        self.effects.push(effect);
        self
    }

    pub fn has_attribute(&self, attribute: SpellAttributes) -> bool {
        self.attributes.contains(attribute)
    }

    pub fn effect(&self, index: u8) -> Option<&SpellEffectInfo> {
        self.effects.iter().find(|effect| effect.index == index)
    }

    pub fn is_passive(&self) -> bool {
        self.has_attribute(SpellAttributes::PASSIVE)
    }

    pub fn is_channeled(&self) -> bool {
        self.has_attribute(SpellAttributes::CHANNELED)
    }

    pub fn is_death_persistent(&self) -> bool {
        self.has_attribute(SpellAttributes::DEATH_PERSISTENT)
    }

    pub fn is_single_target(&self) -> bool {
        self.has_attribute(SpellAttributes::SINGLE_TARGET)
    }

    pub fn is_multi_slot(&self) -> bool {
        self.has_attribute(SpellAttributes::MULTI_SLOT)
    }

    pub fn is_stackable_with_different_casters(&self) -> bool {
        self.has_attribute(SpellAttributes::STACK_FOR_DIFF_CASTERS)
    }

    pub fn is_group_buff(&self) -> bool {
        self.has_attribute(SpellAttributes::GROUP_BUFF)
    }

    /// Duration used when the caster applies no modifiers.
    pub fn base_duration(&self) -> i32 {
        self.duration.unwrap_or(0)
    }

    pub fn has_aura(&self, aura: AuraType) -> bool {
        self.effects.iter().any(|effect| effect.aura == aura)
    }

    pub fn has_area_aura_effect(&self) -> bool {
        self.effects.iter().any(|effect| effect.effect.is_area_aura())
    }

    pub fn has_effect_kind(&self, kind: SpellEffectKind) -> bool {
        self.effects.iter().any(|effect| effect.effect == kind)
    }

    /// Mask of every effect slot the spell declares.
    pub fn effect_mask(&self) -> EffectMask {
        self.effects
            .iter()
            .fold(EffectMask::NONE, |mask, effect| {
                mask | EffectMask::single(effect.index)
            })
    }

    pub fn all_effects_mechanic_mask(&self) -> u32 {
        let mut mask = if self.mechanic == Mechanic::None {
            0
        } else {
            self.mechanic.mask()
        };
        for effect in &self.effects {
            if effect.mechanic != Mechanic::None {
                mask |= effect.mechanic.mask();
            }
        }
        mask
    }

    pub fn first_rank_id(&self) -> SpellId {
        self.first_rank.unwrap_or(self.id)
    }

    /// Same rank chain (including the same spell).
    pub fn is_rank_of(&self, other: &SpellInfo) -> bool {
        self.first_rank_id() == other.first_rank_id()
    }

    pub fn is_different_rank_of(&self, other: &SpellInfo) -> bool {
        self.id != other.id && self.is_rank_of(other)
    }

    pub fn is_aura_exclusive_by_specific_with(&self, other: &SpellInfo) -> bool {
        self.specific == other.specific && self.specific.is_exclusive()
    }

    pub fn is_aura_exclusive_by_specific_per_caster_with(&self, other: &SpellInfo) -> bool {
        self.specific == other.specific && self.specific.is_exclusive_per_caster()
    }

    /// Whether a proc entry filtering on `family`/`mask` accepts this spell.
    pub fn is_affected(&self, family: u32, mask: u64) -> bool {
        if family == 0 {
            return true;
        }
        if family != self.family {
            return false;
        }
        mask == 0 || self.family_flags & mask != 0
    }

    /// Effects in `mask` that are harmful for the target.
    pub fn has_negative_effect(&self, mask: EffectMask) -> bool {
        self.has_attribute(SpellAttributes::NEGATIVE)
            || self
                .effects
                .iter()
                .any(|effect| mask.has(effect.index) && !effect.is_positive())
    }

    pub fn has_positive_effect(&self, mask: EffectMask) -> bool {
        !self.has_attribute(SpellAttributes::NEGATIVE)
            && self
                .effects
                .iter()
                .any(|effect| mask.has(effect.index) && effect.is_positive())
    }

    pub fn is_positive(&self) -> bool {
        !self.has_negative_effect(self.effect_mask())
    }

    pub fn proc_entry(&self) -> Option<&SpellProcEntry> {
        self.proc.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ranked(id: u32, first: u32) -> SpellInfo {
        let mut spell = SpellInfo::new(SpellId(id), format!("rank of {first}"));
        spell.first_rank = Some(SpellId(first));
        spell
    }

    #[test]
    fn calc_value_scales_with_capped_level() {
        let mut spell = SpellInfo::new(SpellId(1), "Scaling");
        spell.base_level = 10;
        spell.max_level = 20;
        let mut effect =
            SpellEffectInfo::new(0, SpellEffectKind::ApplyAura, AuraType::ModStat).with_base_points(5);
        effect.points_per_level = 2.0;

        // level 15 -> 5 levels above base
        assert_eq!(effect.calc_value(effect.base_points, 15, &spell), 15);
        // level 60 is capped at max_level 20 -> 10 levels above base
        assert_eq!(effect.calc_value(effect.base_points, 60, &spell), 25);
        // below base level never subtracts
        assert_eq!(effect.calc_value(effect.base_points, 1, &spell), 5);
    }

    #[test]
    fn rank_chain_comparisons() {
        let r1 = ranked(100, 100);
        let r2 = ranked(101, 100);
        let other = ranked(200, 200);

        assert!(r1.is_rank_of(&r2));
        assert!(r1.is_different_rank_of(&r2));
        assert!(!r1.is_different_rank_of(&r1));
        assert!(!r1.is_rank_of(&other));
    }

    #[test]
    fn polarity_follows_effects() {
        let dot = SpellInfo::new(SpellId(5), "Corruption").with_effect(
            SpellEffectInfo::new(0, SpellEffectKind::ApplyAura, AuraType::PeriodicDamage)
                .with_base_points(10),
        );
        let buff = SpellInfo::new(SpellId(6), "Fortitude").with_effect(
            SpellEffectInfo::new(0, SpellEffectKind::ApplyAura, AuraType::ModStat)
                .with_base_points(10),
        );

        assert!(dot.has_negative_effect(EffectMask::single(0)));
        assert!(!dot.is_positive());
        assert!(buff.has_positive_effect(EffectMask::single(0)));
        assert!(buff.is_positive());
    }

    #[test]
    fn family_filter_accepts_matching_flags() {
        let mut spell = SpellInfo::new(SpellId(7), "Fireball");
        spell.family = 3;
        spell.family_flags = 0b0100;

        assert!(spell.is_affected(0, 0));
        assert!(spell.is_affected(3, 0));
        assert!(spell.is_affected(3, 0b0110));
        assert!(!spell.is_affected(3, 0b0001));
        assert!(!spell.is_affected(4, 0b0100));
    }
}

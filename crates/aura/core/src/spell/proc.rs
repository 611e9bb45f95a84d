//! Proc trigger declarations attached to spells.

use bitflags::bitflags;

use super::kinds::SchoolMask;

bitflags! {
    /// Combat event kinds an aura can react to.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct ProcFlags: u32 {
        const HEARTBEAT                  = 1 << 0;
        const KILL                       = 1 << 1;
        const DEAL_MELEE_SWING           = 1 << 2;
        const TAKE_MELEE_SWING           = 1 << 3;
        const DEAL_MELEE_ABILITY         = 1 << 4;
        const TAKE_MELEE_ABILITY         = 1 << 5;
        const DEAL_RANGED_ATTACK         = 1 << 6;
        const TAKE_RANGED_ATTACK         = 1 << 7;
        const DEAL_HELPFUL_SPELL         = 1 << 8;
        const TAKE_HELPFUL_SPELL         = 1 << 9;
        const DEAL_HARMFUL_SPELL         = 1 << 10;
        const TAKE_HARMFUL_SPELL         = 1 << 11;
        const DEAL_HELPFUL_PERIODIC      = 1 << 12;
        const TAKE_HELPFUL_PERIODIC      = 1 << 13;
        const DEAL_HARMFUL_PERIODIC      = 1 << 14;
        const TAKE_HARMFUL_PERIODIC      = 1 << 15;
        const TAKE_ANY_DAMAGE            = 1 << 16;
        const DEATH                      = 1 << 17;

        const AUTO_ATTACK_MASK = Self::DEAL_MELEE_SWING.bits() | Self::TAKE_MELEE_SWING.bits()
            | Self::DEAL_RANGED_ATTACK.bits() | Self::TAKE_RANGED_ATTACK.bits();

        const SPELL_MASK = Self::DEAL_MELEE_ABILITY.bits() | Self::TAKE_MELEE_ABILITY.bits()
            | Self::DEAL_HELPFUL_SPELL.bits() | Self::TAKE_HELPFUL_SPELL.bits()
            | Self::DEAL_HARMFUL_SPELL.bits() | Self::TAKE_HARMFUL_SPELL.bits()
            | Self::DEAL_HELPFUL_PERIODIC.bits() | Self::TAKE_HELPFUL_PERIODIC.bits()
            | Self::DEAL_HARMFUL_PERIODIC.bits() | Self::TAKE_HARMFUL_PERIODIC.bits();

        const REQ_SPELL_PHASE_MASK = Self::SPELL_MASK.bits();

        const DONE_HIT_MASK = Self::DEAL_MELEE_SWING.bits() | Self::DEAL_MELEE_ABILITY.bits()
            | Self::DEAL_RANGED_ATTACK.bits() | Self::DEAL_HELPFUL_SPELL.bits()
            | Self::DEAL_HARMFUL_SPELL.bits() | Self::DEAL_HELPFUL_PERIODIC.bits()
            | Self::DEAL_HARMFUL_PERIODIC.bits();

        const TAKEN_HIT_MASK = Self::TAKE_MELEE_SWING.bits() | Self::TAKE_MELEE_ABILITY.bits()
            | Self::TAKE_RANGED_ATTACK.bits() | Self::TAKE_HELPFUL_SPELL.bits()
            | Self::TAKE_HARMFUL_SPELL.bits() | Self::TAKE_HELPFUL_PERIODIC.bits()
            | Self::TAKE_HARMFUL_PERIODIC.bits() | Self::TAKE_ANY_DAMAGE.bits();
    }
}

bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct ProcSpellType: u8 {
        const DAMAGE     = 1 << 0;
        const HEAL       = 1 << 1;
        const NO_DMG_HEAL = 1 << 2;
    }
}

bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct ProcSpellPhase: u8 {
        const CAST   = 1 << 0;
        const HIT    = 1 << 1;
        const FINISH = 1 << 2;
    }
}

bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct ProcHitMask: u16 {
        const NORMAL   = 1 << 0;
        const CRITICAL = 1 << 1;
        const MISS     = 1 << 2;
        const FULL_RESIST = 1 << 3;
        const DODGE    = 1 << 4;
        const PARRY    = 1 << 5;
        const BLOCK    = 1 << 6;
        const EVADE    = 1 << 7;
        const IMMUNE   = 1 << 8;
        const DEFLECT  = 1 << 9;
        const ABSORB   = 1 << 10;
        const REFLECT  = 1 << 11;
        const INTERRUPT = 1 << 12;
    }
}

bitflags! {
    /// Behavioral switches of a proc entry.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct ProcAttributes: u16 {
        /// Triggered spells may proc this aura.
        const TRIGGERED_CAN_PROC       = 1 << 0;
        /// Consume a stack instead of a charge.
        const USE_STACKS_FOR_CHARGES   = 1 << 1;
        /// Chance shrinks for actors above level 60.
        const REDUCE_PROC_60           = 1 << 2;
        /// Casts from items never proc this aura.
        const CANT_PROC_FROM_ITEM_CAST = 1 << 3;
        /// The charge is dropped after the configured delay, not immediately.
        const DELAYED_CHARGE_DROP      = 1 << 4;
    }
}

/// Proc declaration of a spell: which events trigger it and how often.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SpellProcEntry {
    pub school_mask: SchoolMask,
    /// Family the triggering spell must belong to (0 = any).
    pub spell_family: u32,
    /// Family flags the triggering spell must intersect (0 = any).
    pub spell_family_mask: u64,
    pub proc_flags: ProcFlags,
    pub spell_type_mask: ProcSpellType,
    pub spell_phase_mask: ProcSpellPhase,
    /// Required hit outcomes; empty means "normal and critical".
    pub hit_mask: ProcHitMask,
    pub attributes: ProcAttributes,
    /// Effect slots that never proc.
    pub disable_effects_mask: u32,
    pub procs_per_minute: f32,
    /// Flat chance in percent.
    pub chance: f32,
    /// Internal cooldown in milliseconds.
    pub cooldown: u32,
    /// Overrides the spell's proc charges when non-zero.
    pub charges: u8,
}

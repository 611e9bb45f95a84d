//! Small classification enums attached to spell definitions.

use bitflags::bitflags;

bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct SchoolMask: u8 {
        const PHYSICAL = 1 << 0;
        const HOLY     = 1 << 1;
        const FIRE     = 1 << 2;
        const NATURE   = 1 << 3;
        const FROST    = 1 << 4;
        const SHADOW   = 1 << 5;
        const ARCANE   = 1 << 6;

        const SPELL = Self::HOLY.bits() | Self::FIRE.bits() | Self::NATURE.bits()
            | Self::FROST.bits() | Self::SHADOW.bits() | Self::ARCANE.bits();
    }
}

macro_rules! spell_enum {
    ($(#[$meta:meta])* $name:ident { $($(#[$vmeta:meta])* $variant:ident),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(
            Clone,
            Copy,
            Debug,
            Default,
            PartialEq,
            Eq,
            Hash,
            PartialOrd,
            Ord,
            strum::Display,
            strum::EnumString,
            strum::AsRefStr,
        )]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        #[strum(serialize_all = "snake_case", ascii_case_insensitive)]
        pub enum $name {
            $($(#[$vmeta])* $variant),+
        }
    };
}

spell_enum! {
    /// Dispel category used by cleanse effects and by the index stores.
    DispelType {
        #[default]
        None,
        Magic,
        Curse,
        Disease,
        Poison,
        Stealth,
        Invisibility,
        Enrage,
    }
}

spell_enum! {
    /// Loss-of-control mechanic of an effect.
    Mechanic {
        #[default]
        None,
        Charm,
        Disoriented,
        Disarm,
        Fear,
        Root,
        Silence,
        Sleep,
        Snare,
        Stun,
        Freeze,
        Polymorph,
        Banish,
        Shield,
        Mount,
        Bleed,
    }
}

impl Mechanic {
    /// Bit used in mechanic masks (`1 << discriminant`).
    pub const fn mask(self) -> u32 {
        1 << (self as u32)
    }
}

spell_enum! {
    /// Spell-specific exclusivity family ("only one seal", "one curse per caster").
    SpellSpecific {
        #[default]
        Normal,
        Seal,
        Aura,
        Sting,
        Curse,
        Aspect,
        Tracker,
        WarlockArmor,
        MageArmor,
        ElementalShield,
        MagePolymorph,
        Judgement,
        Presence,
        Charm,
        Scroll,
        WarriorEnrage,
        Bane,
        Food,
        Drink,
        FoodAndDrink,
    }
}

impl SpellSpecific {
    /// Specifics where only one aura may exist on a target regardless of caster.
    pub const fn is_exclusive(self) -> bool {
        matches!(
            self,
            Self::Seal
                | Self::Aura
                | Self::Tracker
                | Self::WarlockArmor
                | Self::MageArmor
                | Self::ElementalShield
                | Self::MagePolymorph
                | Self::Presence
                | Self::Charm
                | Self::Scroll
                | Self::WarriorEnrage
                | Self::Food
                | Self::Drink
                | Self::FoodAndDrink
        )
    }

    /// Specifics exclusive only among auras of the same caster.
    pub const fn is_exclusive_per_caster(self) -> bool {
        matches!(
            self,
            Self::Judgement | Self::Sting | Self::Curse | Self::Bane | Self::Aspect
        )
    }
}

spell_enum! {
    /// Diminishing-returns category for crowd control.
    DiminishingGroup {
        #[default]
        None,
        Root,
        Stun,
        Incapacitate,
        Disorient,
        Silence,
        AoeKnockback,
        Taunt,
        LimitOnly,
    }
}

impl DiminishingGroup {
    /// Highest level a group may reach before targets become immune.
    pub const fn max_level(self) -> u8 {
        match self {
            Self::None => 0,
            Self::Taunt => 4,
            Self::AoeKnockback | Self::LimitOnly => 2,
            _ => 3,
        }
    }
}

spell_enum! {
    /// Unit-wide state an aura raises on its target while bound.
    AuraStateType {
        #[default]
        None,
        Defense,
        Wounded20Percent,
        Frozen,
        Bleed,
        Enraged,
        Conflagrate,
        Swiftmend,
        DeadlyPoison,
        RaidEncounter,
    }
}

spell_enum! {
    /// Relationship filter applied by area target searches.
    TargetCheck {
        #[default]
        Default,
        Entry,
        Enemy,
        Ally,
        Party,
        Raid,
        RaidClass,
        Passenger,
        Summoned,
    }
}

spell_enum! {
    /// Anchor an implicit target selection is relative to.
    TargetReference {
        #[default]
        None,
        Caster,
        Target,
        Last,
        Src,
        Dest,
    }
}

/// Implicit target descriptor of one effect (A or B side).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SpellImplicitTarget {
    pub reference: TargetReference,
    pub check: TargetCheck,
    /// Selects every matching unit in a radius rather than one unit.
    pub area: bool,
}

impl SpellImplicitTarget {
    pub const NONE: Self = Self {
        reference: TargetReference::None,
        check: TargetCheck::Default,
        area: false,
    };

    pub const fn area(reference: TargetReference, check: TargetCheck) -> Self {
        Self {
            reference,
            check,
            area: true,
        }
    }
}

spell_enum! {
    /// Outcome of comparing two spells through their shared spell groups.
    ///
    /// Ordered by strength: when two spells share several groups, the
    /// strongest rule wins.
    SpellGroupStackRule {
        #[default]
        Default,
        ExclusiveSameEffect,
        ExclusiveFromSameCaster,
        ExclusiveHighest,
        Exclusive,
    }
}

spell_enum! {
    /// Caster-side modifier kinds queried through the entity model.
    SpellModOp {
        #[default]
        Points,
        Duration,
        Charges,
        ActivationTime,
        ProcChance,
        ProcCooldown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stack_rules_order_by_strength() {
        assert!(SpellGroupStackRule::Exclusive > SpellGroupStackRule::ExclusiveHighest);
        assert!(SpellGroupStackRule::ExclusiveHighest > SpellGroupStackRule::ExclusiveFromSameCaster);
        assert!(SpellGroupStackRule::ExclusiveFromSameCaster > SpellGroupStackRule::Default);
    }

    #[test]
    fn curse_is_exclusive_only_per_caster() {
        assert!(SpellSpecific::Curse.is_exclusive_per_caster());
        assert!(!SpellSpecific::Curse.is_exclusive());
        assert!(SpellSpecific::MagePolymorph.is_exclusive());
    }
}

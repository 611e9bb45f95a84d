//! Effect categories: what a spell effect does and which aura it carries.

use crate::types::UnitStateFlags;

/// Aura category of an effect slot. Selects the default apply handler, the
/// periodic tick handler and the proc handler.
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
pub enum AuraType {
    #[default]
    None,
    Dummy,
    PeriodicDummy,

    // periodic
    PeriodicDamage,
    PeriodicDamagePercent,
    PeriodicLeech,
    PeriodicHeal,
    ObsModHealth,
    PeriodicEnergize,
    ObsModPower,
    PeriodicManaLeech,
    PowerBurn,
    PeriodicTriggerSpell,
    PeriodicTriggerSpellWithValue,

    // proc
    ProcTriggerSpell,
    ProcTriggerSpellWithValue,
    ProcTriggerDamage,

    // control
    ModStun,
    ModRoot,
    ModRoot2,
    ModFear,
    ModConfuse,
    ModSilence,
    ModPacify,
    Transform,
    ModShapeshift,
    Mounted,
    ControlVehicle,
    ModStealth,
    ModInvisibility,

    // absorbs
    SchoolAbsorb,
    ManaShield,

    // stat modifiers
    ModStat,
    ModResistance,
    ModDamageDone,
    ModDamagePercentDone,
    ModHealingDone,
    ModIncreaseHealth,
    ModIncreaseSpeed,
    ModDecreaseSpeed,
    ModMeleeHaste,
    ModCastingSpeedNotStack,
    ModSpellCritChance,
    ModMechanicResistance,
    MechanicImmunity,
    ModSchoolMaskDamageFromCaster,
    ModSpellDamageFromCaster,
    ReflectSpellsSchool,
    AddFlatModifier,
    AddPctModifier,

    // client prompts
    ShowConfirmationPrompt,
    ShowConfirmationPromptWithDifficulty,
}

impl AuraType {
    /// Crowd control whose amount is the damage it absorbs before breaking.
    pub const fn is_breakable_crowd_control(self) -> bool {
        matches!(
            self,
            Self::ModConfuse
                | Self::ModFear
                | Self::ModStun
                | Self::ModRoot
                | Self::ModRoot2
                | Self::Transform
        )
    }

    /// Periodic categories that stack across casters ("DoT/HoT" rule).
    pub const fn is_stacking_periodic(self) -> bool {
        matches!(
            self,
            Self::PeriodicDamage
                | Self::PeriodicDummy
                | Self::PeriodicHeal
                | Self::PeriodicTriggerSpell
                | Self::PeriodicEnergize
                | Self::PeriodicManaLeech
                | Self::PeriodicLeech
                | Self::PowerBurn
                | Self::ObsModPower
                | Self::ObsModHealth
                | Self::PeriodicTriggerSpellWithValue
        )
    }

    /// Power observers tick every second when the definition has no period.
    pub const fn has_default_period(self) -> bool {
        matches!(self, Self::ObsModPower)
    }

    /// Categories whose amount is shown to clients even without the spell
    /// attribute.
    pub const fn needs_sending_amount(self) -> bool {
        matches!(
            self,
            Self::SchoolAbsorb | Self::ManaShield | Self::AddFlatModifier | Self::AddPctModifier
        )
    }

    /// Control state toggled by the default apply handler.
    pub const fn unit_state(self) -> Option<UnitStateFlags> {
        Some(match self {
            Self::ModStun => UnitStateFlags::STUNNED,
            Self::ModRoot | Self::ModRoot2 => UnitStateFlags::ROOT,
            Self::ModFear => UnitStateFlags::FLEEING,
            Self::ModConfuse => UnitStateFlags::CONFUSED,
            Self::ModSilence => UnitStateFlags::SILENCED,
            Self::ModPacify => UnitStateFlags::PACIFIED,
            Self::ModStealth => UnitStateFlags::STEALTHED,
            Self::ModInvisibility => UnitStateFlags::INVISIBLE,
            Self::Transform => UnitStateFlags::TRANSFORMED,
            Self::ModShapeshift => UnitStateFlags::SHAPESHIFTED,
            Self::Mounted => UnitStateFlags::MOUNTED,
            Self::ControlVehicle => UnitStateFlags::ON_VEHICLE,
            _ => return None,
        })
    }
}

/// What a spell effect does when it hits. Only the aura-carrying kinds are
/// interesting to this crate; everything else is `Other`.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum SpellEffectKind {
    ApplyAura,
    ApplyAreaAuraParty,
    ApplyAreaAuraPartyNonrandom,
    ApplyAreaAuraRaid,
    ApplyAreaAuraFriend,
    ApplyAreaAuraEnemy,
    ApplyAreaAuraPet,
    ApplyAreaAuraOwner,
    ApplyAreaAuraSummons,
    ApplyAuraOnPet,
    PersistentAreaAura,
    SchoolDamage,
    Heal,
    AddExtraAttacks,
    #[default]
    Other,
}

impl SpellEffectKind {
    pub const fn is_area_aura(self) -> bool {
        matches!(
            self,
            Self::ApplyAreaAuraParty
                | Self::ApplyAreaAuraPartyNonrandom
                | Self::ApplyAreaAuraRaid
                | Self::ApplyAreaAuraFriend
                | Self::ApplyAreaAuraEnemy
                | Self::ApplyAreaAuraPet
                | Self::ApplyAreaAuraOwner
                | Self::ApplyAreaAuraSummons
        )
    }

    /// Effects a unit-owned aura instantiates.
    pub const fn is_unit_owned_aura(self) -> bool {
        matches!(self, Self::ApplyAura | Self::ApplyAuraOnPet) || self.is_area_aura()
    }

    pub const fn is_aura(self) -> bool {
        self.is_unit_owned_aura() || matches!(self, Self::PersistentAreaAura)
    }
}

use bitflags::bitflags;

bitflags! {
    /// Per-binding flags sent to clients alongside each visible aura.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct AuraFlags: u16 {
        const NOCASTER = 0x01;
        const POSITIVE = 0x02;
        const DURATION = 0x04;
        const SCALABLE = 0x08;
        const NEGATIVE = 0x10;
    }
}

bitflags! {
    /// Which parts of an effect handler run for one apply/remove call.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct HandleModes: u8 {
        /// Full apply/remove: registers the effect on the target.
        const REAL = 0x01;
        /// Effect re-applied because of a stack change or refresh.
        const REAPPLY = 0x02;
        /// Effect re-applied because its amount changed.
        const CHANGE_AMOUNT = 0x04;
        /// Stat-only part of the handler.
        const STAT = 0x08;
        /// Skip client-visible side effects (login, loading).
        const SKILL = 0x10;

        const CHANGE_AMOUNT_MASK = Self::CHANGE_AMOUNT.bits() | Self::REAL.bits();
        const CHANGE_AMOUNT_SEND_FOR_CLIENT_MASK =
            Self::CHANGE_AMOUNT.bits() | Self::REAL.bits() | Self::REAPPLY.bits();
        const REAL_OR_REAPPLY_MASK = Self::REAPPLY.bits() | Self::REAL.bits();
    }
}

bitflags! {
    /// Control states an aura can put on its target.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct UnitStateFlags: u32 {
        const STUNNED      = 1 << 0;
        const ROOT         = 1 << 1;
        const FLEEING      = 1 << 2;
        const CONFUSED     = 1 << 3;
        const SILENCED     = 1 << 4;
        const PACIFIED     = 1 << 5;
        const STEALTHED    = 1 << 6;
        const INVISIBLE    = 1 << 7;
        const ON_VEHICLE   = 1 << 8;
        const MOUNTED      = 1 << 9;
        const TRANSFORMED  = 1 << 10;
        const SHAPESHIFTED = 1 << 11;
    }
}

/// Why an aura binding or instance is being removed.
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
pub enum RemoveMode {
    /// Binding is still active.
    #[default]
    None,
    /// Generic removal (retarget, stacking rules, charges used up).
    Default,
    /// Removed by an interrupting action (damage, movement).
    Interrupt,
    /// Cancelled by the owner or by script.
    Cancel,
    /// Dispelled or stolen by an enemy spell.
    EnemySpell,
    /// Duration ran out.
    Expire,
    /// Owner died.
    Death,
}

impl RemoveMode {
    pub const fn is_removing(self) -> bool {
        !matches!(self, Self::None)
    }
}

//! Hook signatures and the arguments handed to them.

use std::sync::Arc;

use crate::engine::AuraEngine;
use crate::proc::ProcEvent;
use crate::spell::{AuraType, SpellInfo};
use crate::types::{AuraId, HandleModes, ObjectGuid, SpellId};

/// Whether the engine still runs its default behavior after a hook.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum HookAction {
    #[default]
    Continue,
    PreventDefault,
}

impl HookAction {
    pub fn prevents_default(self) -> bool {
        matches!(self, Self::PreventDefault)
    }
}

/// Effect apply/remove/periodic call.
#[derive(Clone, Debug)]
pub struct EffectHookArgs {
    pub aura: AuraId,
    pub spell: Arc<SpellInfo>,
    pub effect_index: u8,
    pub aura_type: AuraType,
    pub target: ObjectGuid,
    pub modes: HandleModes,
}

/// Amount or period computation of one effect.
#[derive(Clone, Debug)]
pub struct EffectCalcArgs {
    pub aura: AuraId,
    pub spell: Arc<SpellInfo>,
    pub effect_index: u8,
    pub aura_type: AuraType,
    pub caster: Option<ObjectGuid>,
    pub owner: ObjectGuid,
    pub stack_amount: u8,
}

#[derive(Clone, Debug)]
pub struct ProcHookArgs<'e> {
    pub aura: AuraId,
    pub spell: Arc<SpellInfo>,
    /// Unit whose binding is proccing.
    pub target: ObjectGuid,
    pub event: &'e ProcEvent,
}

#[derive(Clone, Debug)]
pub struct EffectProcArgs<'e> {
    pub aura: AuraId,
    pub spell: Arc<SpellInfo>,
    pub effect_index: u8,
    pub aura_type: AuraType,
    pub target: ObjectGuid,
    pub event: &'e ProcEvent,
}

/// Dispel in progress; hooks may change how many charges or stacks go.
#[derive(Clone, Debug, PartialEq)]
pub struct DispelInfo {
    pub aura: AuraId,
    pub spell: SpellId,
    pub dispeller: ObjectGuid,
    pub dispeller_spell: SpellId,
    pub removed_charges: u8,
}

pub type EffectFn = Box<dyn Fn(&mut AuraEngine<'_>, &EffectHookArgs) -> HookAction + Send + Sync>;
pub type AfterEffectFn = Box<dyn Fn(&mut AuraEngine<'_>, &EffectHookArgs) + Send + Sync>;
/// Receives the computed amount and the can-be-recalculated flag.
pub type CalcAmountFn = Box<dyn Fn(&EffectCalcArgs, &mut i32, &mut bool) + Send + Sync>;
/// Receives the periodic flag and the period in milliseconds.
pub type CalcPeriodicFn = Box<dyn Fn(&EffectCalcArgs, &mut bool, &mut i32) + Send + Sync>;
pub type AreaTargetFn = Box<dyn Fn(&AuraEngine<'_>, AuraId, ObjectGuid) -> bool + Send + Sync>;
pub type CheckProcFn = Box<dyn Fn(&AuraEngine<'_>, &ProcHookArgs<'_>) -> bool + Send + Sync>;
pub type CheckEffectProcFn =
    Box<dyn Fn(&AuraEngine<'_>, &EffectProcArgs<'_>) -> bool + Send + Sync>;
pub type ProcFn =
    Box<dyn Fn(&mut AuraEngine<'_>, &ProcHookArgs<'_>) -> HookAction + Send + Sync>;
pub type AfterProcFn = Box<dyn Fn(&mut AuraEngine<'_>, &ProcHookArgs<'_>) + Send + Sync>;
pub type EffectProcFn =
    Box<dyn Fn(&mut AuraEngine<'_>, &EffectProcArgs<'_>) -> HookAction + Send + Sync>;
pub type AfterEffectProcFn = Box<dyn Fn(&mut AuraEngine<'_>, &EffectProcArgs<'_>) + Send + Sync>;
pub type DispelFn = Box<dyn Fn(&mut AuraEngine<'_>, &mut DispelInfo) + Send + Sync>;

/// One registered hook.
pub enum AuraHook {
    /// Vetoes binding to a unit during retargeting.
    CheckAreaTarget(AreaTargetFn),
    EffectApply(EffectFn),
    EffectRemove(EffectFn),
    AfterEffectApply(AfterEffectFn),
    AfterEffectRemove(AfterEffectFn),
    /// Replaces or precedes a periodic tick.
    EffectPeriodic(EffectFn),
    CalcAmount(CalcAmountFn),
    CalcPeriodic(CalcPeriodicFn),
    CheckProc(CheckProcFn),
    CheckEffectProc(CheckEffectProcFn),
    /// Runs before charges, cooldown and success time are recorded;
    /// preventing skips all three.
    PrepareProc(ProcFn),
    Proc(ProcFn),
    AfterProc(AfterProcFn),
    EffectProc(EffectProcFn),
    AfterEffectProc(AfterEffectProcFn),
    Dispel(DispelFn),
    AfterDispel(DispelFn),
}

/// Discriminant of [`AuraHook`], used for lookups and logging.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display, strum::AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum HookKind {
    CheckAreaTarget,
    EffectApply,
    EffectRemove,
    AfterEffectApply,
    AfterEffectRemove,
    EffectPeriodic,
    CalcAmount,
    CalcPeriodic,
    CheckProc,
    CheckEffectProc,
    PrepareProc,
    Proc,
    AfterProc,
    EffectProc,
    AfterEffectProc,
    Dispel,
    AfterDispel,
}

impl HookKind {
    /// Hooks that fire per effect and honor an [`super::EffectFilter`].
    pub const fn is_effect_hook(self) -> bool {
        matches!(
            self,
            Self::EffectApply
                | Self::EffectRemove
                | Self::AfterEffectApply
                | Self::AfterEffectRemove
                | Self::EffectPeriodic
                | Self::CalcAmount
                | Self::CalcPeriodic
                | Self::CheckEffectProc
                | Self::EffectProc
                | Self::AfterEffectProc
        )
    }
}

impl AuraHook {
    pub fn kind(&self) -> HookKind {
        match self {
            Self::CheckAreaTarget(_) => HookKind::CheckAreaTarget,
            Self::EffectApply(_) => HookKind::EffectApply,
            Self::EffectRemove(_) => HookKind::EffectRemove,
            Self::AfterEffectApply(_) => HookKind::AfterEffectApply,
            Self::AfterEffectRemove(_) => HookKind::AfterEffectRemove,
            Self::EffectPeriodic(_) => HookKind::EffectPeriodic,
            Self::CalcAmount(_) => HookKind::CalcAmount,
            Self::CalcPeriodic(_) => HookKind::CalcPeriodic,
            Self::CheckProc(_) => HookKind::CheckProc,
            Self::CheckEffectProc(_) => HookKind::CheckEffectProc,
            Self::PrepareProc(_) => HookKind::PrepareProc,
            Self::Proc(_) => HookKind::Proc,
            Self::AfterProc(_) => HookKind::AfterProc,
            Self::EffectProc(_) => HookKind::EffectProc,
            Self::AfterEffectProc(_) => HookKind::AfterEffectProc,
            Self::Dispel(_) => HookKind::Dispel,
            Self::AfterDispel(_) => HookKind::AfterDispel,
        }
    }
}

impl std::fmt::Debug for AuraHook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AuraHook({})", self.kind())
    }
}

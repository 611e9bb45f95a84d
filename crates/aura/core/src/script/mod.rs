//! Per-spell behavior hooks.
//!
//! Scripts customize individual spells without touching the engine: a
//! [`ScriptRegistry`] maps spell ids to hooks the engine calls at fixed
//! points of the aura life cycle (effect apply/remove, periodic ticks, amount
//! calculation, proc checks, dispel). Hooks that return [`HookAction`] can
//! suppress the engine's default behavior for that call.
mod hooks;

use std::collections::HashMap;

pub use hooks::{
    AfterEffectFn, AfterEffectProcFn, AfterProcFn, AreaTargetFn, AuraHook, CalcAmountFn,
    CalcPeriodicFn, CheckEffectProcFn, CheckProcFn, DispelFn, DispelInfo, EffectCalcArgs,
    EffectFn, EffectHookArgs, EffectProcArgs, EffectProcFn, HookAction, HookKind, ProcFn,
    ProcHookArgs,
};

use crate::engine::AuraEngine;
use crate::spell::AuraType;
use crate::types::SpellId;

/// Restricts an effect hook to some effect slots.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EffectFilter {
    pub index: Option<u8>,
    pub aura_type: Option<AuraType>,
}

impl EffectFilter {
    pub const ALL: Self = Self {
        index: None,
        aura_type: None,
    };

    pub const fn index(index: u8) -> Self {
        Self {
            index: Some(index),
            aura_type: None,
        }
    }

    pub const fn with_aura_type(mut self, aura_type: AuraType) -> Self {
        self.aura_type = Some(aura_type);
        self
    }

    pub fn matches(&self, index: u8, aura_type: AuraType) -> bool {
        self.index.is_none_or(|wanted| wanted == index)
            && self.aura_type.is_none_or(|wanted| wanted == aura_type)
    }
}

#[derive(Debug)]
pub struct ScriptEntry {
    pub filter: EffectFilter,
    pub hook: AuraHook,
}

impl ScriptEntry {
    /// Whether this entry fires for the given effect. Aura-level hooks ignore
    /// the filter.
    pub fn applies_to(&self, index: u8, aura_type: AuraType) -> bool {
        !self.hook.kind().is_effect_hook() || self.filter.matches(index, aura_type)
    }
}

/// Hooks by spell id, kept in registration order.
#[derive(Debug, Default)]
pub struct ScriptRegistry {
    entries: HashMap<SpellId, Vec<ScriptEntry>>,
}

impl ScriptRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, spell: SpellId, filter: EffectFilter, hook: AuraHook) -> &mut Self {
        tracing::debug!(spell = %spell, hook = %hook.kind(), "registered aura hook");
        self.entries
            .entry(spell)
            .or_default()
            .push(ScriptEntry { filter, hook });
        self
    }

    pub fn entries(&self, spell: SpellId) -> &[ScriptEntry] {
        self.entries.get(&spell).map_or(&[][..], Vec::as_slice)
    }

    pub fn has_hook(&self, spell: SpellId, kind: HookKind) -> bool {
        self.entries(spell)
            .iter()
            .any(|entry| entry.hook.kind() == kind)
    }

    pub fn len(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    // ===== typed registration =====

    pub fn on_effect_apply<F>(&mut self, spell: SpellId, filter: EffectFilter, hook: F) -> &mut Self
    where
        F: Fn(&mut AuraEngine<'_>, &EffectHookArgs) -> HookAction + Send + Sync + 'static,
    {
        self.register(spell, filter, AuraHook::EffectApply(Box::new(hook)))
    }

    pub fn on_effect_remove<F>(&mut self, spell: SpellId, filter: EffectFilter, hook: F) -> &mut Self
    where
        F: Fn(&mut AuraEngine<'_>, &EffectHookArgs) -> HookAction + Send + Sync + 'static,
    {
        self.register(spell, filter, AuraHook::EffectRemove(Box::new(hook)))
    }

    pub fn after_effect_apply<F>(&mut self, spell: SpellId, filter: EffectFilter, hook: F) -> &mut Self
    where
        F: Fn(&mut AuraEngine<'_>, &EffectHookArgs) + Send + Sync + 'static,
    {
        self.register(spell, filter, AuraHook::AfterEffectApply(Box::new(hook)))
    }

    pub fn after_effect_remove<F>(&mut self, spell: SpellId, filter: EffectFilter, hook: F) -> &mut Self
    where
        F: Fn(&mut AuraEngine<'_>, &EffectHookArgs) + Send + Sync + 'static,
    {
        self.register(spell, filter, AuraHook::AfterEffectRemove(Box::new(hook)))
    }

    pub fn on_effect_periodic<F>(&mut self, spell: SpellId, filter: EffectFilter, hook: F) -> &mut Self
    where
        F: Fn(&mut AuraEngine<'_>, &EffectHookArgs) -> HookAction + Send + Sync + 'static,
    {
        self.register(spell, filter, AuraHook::EffectPeriodic(Box::new(hook)))
    }

    pub fn on_calc_amount<F>(&mut self, spell: SpellId, filter: EffectFilter, hook: F) -> &mut Self
    where
        F: Fn(&EffectCalcArgs, &mut i32, &mut bool) + Send + Sync + 'static,
    {
        self.register(spell, filter, AuraHook::CalcAmount(Box::new(hook)))
    }

    pub fn on_calc_periodic<F>(&mut self, spell: SpellId, filter: EffectFilter, hook: F) -> &mut Self
    where
        F: Fn(&EffectCalcArgs, &mut bool, &mut i32) + Send + Sync + 'static,
    {
        self.register(spell, filter, AuraHook::CalcPeriodic(Box::new(hook)))
    }

    pub fn on_check_area_target<F>(&mut self, spell: SpellId, hook: F) -> &mut Self
    where
        F: Fn(&AuraEngine<'_>, crate::types::AuraId, crate::types::ObjectGuid) -> bool
            + Send
            + Sync
            + 'static,
    {
        self.register(spell, EffectFilter::ALL, AuraHook::CheckAreaTarget(Box::new(hook)))
    }

    pub fn on_check_proc<F>(&mut self, spell: SpellId, hook: F) -> &mut Self
    where
        F: Fn(&AuraEngine<'_>, &ProcHookArgs<'_>) -> bool + Send + Sync + 'static,
    {
        self.register(spell, EffectFilter::ALL, AuraHook::CheckProc(Box::new(hook)))
    }

    pub fn on_check_effect_proc<F>(&mut self, spell: SpellId, filter: EffectFilter, hook: F) -> &mut Self
    where
        F: Fn(&AuraEngine<'_>, &EffectProcArgs<'_>) -> bool + Send + Sync + 'static,
    {
        self.register(spell, filter, AuraHook::CheckEffectProc(Box::new(hook)))
    }

    pub fn on_prepare_proc<F>(&mut self, spell: SpellId, hook: F) -> &mut Self
    where
        F: Fn(&mut AuraEngine<'_>, &ProcHookArgs<'_>) -> HookAction + Send + Sync + 'static,
    {
        self.register(spell, EffectFilter::ALL, AuraHook::PrepareProc(Box::new(hook)))
    }

    pub fn on_proc<F>(&mut self, spell: SpellId, hook: F) -> &mut Self
    where
        F: Fn(&mut AuraEngine<'_>, &ProcHookArgs<'_>) -> HookAction + Send + Sync + 'static,
    {
        self.register(spell, EffectFilter::ALL, AuraHook::Proc(Box::new(hook)))
    }

    pub fn after_proc<F>(&mut self, spell: SpellId, hook: F) -> &mut Self
    where
        F: Fn(&mut AuraEngine<'_>, &ProcHookArgs<'_>) + Send + Sync + 'static,
    {
        self.register(spell, EffectFilter::ALL, AuraHook::AfterProc(Box::new(hook)))
    }

    pub fn on_effect_proc<F>(&mut self, spell: SpellId, filter: EffectFilter, hook: F) -> &mut Self
    where
        F: Fn(&mut AuraEngine<'_>, &EffectProcArgs<'_>) -> HookAction + Send + Sync + 'static,
    {
        self.register(spell, filter, AuraHook::EffectProc(Box::new(hook)))
    }

    pub fn after_effect_proc<F>(&mut self, spell: SpellId, filter: EffectFilter, hook: F) -> &mut Self
    where
        F: Fn(&mut AuraEngine<'_>, &EffectProcArgs<'_>) + Send + Sync + 'static,
    {
        self.register(spell, filter, AuraHook::AfterEffectProc(Box::new(hook)))
    }

    pub fn on_dispel<F>(&mut self, spell: SpellId, hook: F) -> &mut Self
    where
        F: Fn(&mut AuraEngine<'_>, &mut DispelInfo) + Send + Sync + 'static,
    {
        self.register(spell, EffectFilter::ALL, AuraHook::Dispel(Box::new(hook)))
    }

    pub fn after_dispel<F>(&mut self, spell: SpellId, hook: F) -> &mut Self
    where
        F: Fn(&mut AuraEngine<'_>, &mut DispelInfo) + Send + Sync + 'static,
    {
        self.register(spell, EffectFilter::ALL, AuraHook::AfterDispel(Box::new(hook)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filters_match_index_and_type() {
        let any = EffectFilter::ALL;
        let second = EffectFilter::index(1);
        let typed = EffectFilter::index(1).with_aura_type(AuraType::PeriodicDamage);

        assert!(any.matches(3, AuraType::ModStat));
        assert!(second.matches(1, AuraType::ModStat));
        assert!(!second.matches(0, AuraType::ModStat));
        assert!(typed.matches(1, AuraType::PeriodicDamage));
        assert!(!typed.matches(1, AuraType::PeriodicHeal));
    }

    #[test]
    fn registry_keeps_order_per_spell() {
        let mut registry = ScriptRegistry::new();
        registry
            .on_calc_amount(SpellId(1), EffectFilter::index(0), |_, amount, _| *amount += 1)
            .on_check_proc(SpellId(1), |_, _| true)
            .on_dispel(SpellId(2), |_, info| info.removed_charges = 2);

        let kinds: Vec<_> = registry
            .entries(SpellId(1))
            .iter()
            .map(|entry| entry.hook.kind())
            .collect();
        assert_eq!(kinds, vec![HookKind::CalcAmount, HookKind::CheckProc]);
        assert!(registry.has_hook(SpellId(2), HookKind::Dispel));
        assert!(registry.entries(SpellId(3)).is_empty());
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn aura_level_hooks_ignore_effect_filter() {
        let entry = ScriptEntry {
            filter: EffectFilter::index(2),
            hook: AuraHook::CheckProc(Box::new(|_, _| false)),
        };
        assert!(entry.applies_to(0, AuraType::Dummy));

        let effect_entry = ScriptEntry {
            filter: EffectFilter::index(2),
            hook: AuraHook::CalcAmount(Box::new(|_, _, _| {})),
        };
        assert!(!effect_entry.applies_to(0, AuraType::Dummy));
        assert!(effect_entry.applies_to(2, AuraType::Dummy));
    }
}

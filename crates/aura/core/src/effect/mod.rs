//! One effect slot of a live aura.
//!
//! An [`AuraEffect`] holds the numbers the runtime computes for an effect
//! (amount, period, tick counter) and the pure parts of their computation.
//! Everything that touches targets (apply handlers, periodic ticks, procs)
//! lives in [`crate::engine`] and reads the effect through the aura.
use std::sync::Arc;

use crate::env::UnitHost;
use crate::script::{AuraHook, EffectCalcArgs, ScriptRegistry};
use crate::spell::{
    AuraType, SpellAttributes, SpellEffectAttributes, SpellEffectInfo, SpellInfo, SpellModOp,
};
use crate::types::{AuraId, ObjectGuid};

/// Snapshot of the owning aura used while (re)computing an effect.
pub struct EffectCalcContext<'a> {
    pub aura: AuraId,
    pub spell: &'a Arc<SpellInfo>,
    pub caster: Option<ObjectGuid>,
    pub owner: ObjectGuid,
    pub caster_level: u16,
    pub stack_amount: u8,
    pub max_duration: i32,
    pub duration: i32,
    pub host: &'a dyn UnitHost,
    pub scripts: Option<&'a ScriptRegistry>,
}

impl EffectCalcContext<'_> {
    fn is_permanent(&self) -> bool {
        self.max_duration == -1
    }

    fn hook_args(&self, effect: &AuraEffect) -> EffectCalcArgs {
        EffectCalcArgs {
            aura: self.aura,
            spell: Arc::clone(self.spell),
            effect_index: effect.index,
            aura_type: effect.aura_type,
            caster: self.caster,
            owner: self.owner,
            stack_amount: self.stack_amount,
        }
    }
}

/// Runtime state of one effect slot.
#[derive(Clone, Debug, PartialEq)]
pub struct AuraEffect {
    index: u8,
    aura_type: AuraType,
    base_amount: i32,
    amount: i32,
    estimated_amount: Option<f32>,
    /// Tick period in milliseconds.
    period: i32,
    /// Milliseconds until the next tick.
    periodic_timer: i32,
    ticks_done: u32,
    is_periodic: bool,
    can_be_recalculated: bool,
    /// Scratch value filled by the periodic handlers before a crit roll.
    pub(crate) crit_chance: f32,
}

impl AuraEffect {
    /// Builds the effect and computes its period and amount.
    pub fn new(info: &SpellEffectInfo, base_amount: Option<i32>, ctx: &EffectCalcContext<'_>) -> Self {
        let mut effect = Self {
            index: info.index,
            aura_type: info.aura,
            base_amount: base_amount.unwrap_or(info.base_points),
            amount: 0,
            estimated_amount: info.estimated_points,
            period: 0,
            periodic_timer: 0,
            ticks_done: 0,
            is_periodic: false,
            can_be_recalculated: true,
            crit_chance: 0.0,
        };
        effect.calculate_periodic(ctx, true, false);
        effect.amount = effect.calculate_amount(ctx);
        effect
    }

    pub fn index(&self) -> u8 {
        self.index
    }

    pub fn aura_type(&self) -> AuraType {
        self.aura_type
    }

    pub fn base_amount(&self) -> i32 {
        self.base_amount
    }

    pub fn amount(&self) -> i32 {
        self.amount
    }

    pub fn estimated_amount(&self) -> Option<f32> {
        self.estimated_amount
    }

    pub fn period(&self) -> i32 {
        self.period
    }

    pub fn periodic_timer(&self) -> i32 {
        self.periodic_timer
    }

    pub fn ticks_done(&self) -> u32 {
        self.ticks_done
    }

    pub fn is_periodic(&self) -> bool {
        self.is_periodic
    }

    pub fn can_be_recalculated(&self) -> bool {
        self.can_be_recalculated
    }

    pub(crate) fn set_amount(&mut self, amount: i32) {
        self.amount = amount;
    }

    pub(crate) fn set_base_amount(&mut self, amount: i32) {
        self.base_amount = amount;
    }

    pub(crate) fn set_can_be_recalculated(&mut self, value: bool) {
        self.can_be_recalculated = value;
    }

    /// Ticks a full, uninterrupted run of `max_duration` produces.
    pub fn total_ticks(&self, spell: &SpellInfo, max_duration: i32) -> u32 {
        if self.period <= 0 || max_duration <= 0 {
            return 0;
        }
        let mut ticks = (max_duration / self.period) as u32;
        if spell.has_attribute(SpellAttributes::TICK_ON_APPLY) {
            ticks += 1;
        }
        ticks
    }

    /// Computes the effect amount and the recalculation flag.
    pub fn calculate_amount(&mut self, ctx: &EffectCalcContext<'_>) -> i32 {
        let spell = ctx.spell.as_ref();
        let Some(info) = spell.effect(self.index) else {
            tracing::error!(
                target: "aura::effect",
                aura = %ctx.aura,
                spell = %spell.id,
                effect = self.index,
                "effect slot missing from spell definition"
            );
            return 0;
        };

        let mut amount = info.calc_value(self.base_amount, ctx.caster_level, spell);
        if let Some(caster) = ctx.caster {
            amount = ctx.host.apply_spell_mod(caster, spell, SpellModOp::Points, amount);
        }

        let mut recalculable = true;
        match self.aura_type {
            kind if kind.is_breakable_crowd_control() => {
                recalculable = false;
                if spell.proc_entry().is_some() {
                    amount = (u64::from(ctx.host.max_health(ctx.owner)) * 10 / 100) as i32;
                }
            }
            AuraType::SchoolAbsorb | AuraType::ManaShield => recalculable = false,
            AuraType::Mounted => {
                amount = ctx.host.mount_capability(ctx.owner, info);
                recalculable = false;
            }
            _ => {}
        }

        if !info
            .attributes
            .contains(SpellEffectAttributes::NO_SCALE_WITH_STACK)
        {
            amount = amount.saturating_mul(i32::from(ctx.stack_amount));
        }

        if let Some(scripts) = ctx.scripts {
            let args = ctx.hook_args(self);
            for entry in scripts.entries(spell.id) {
                if let AuraHook::CalcAmount(hook) = &entry.hook
                    && entry.applies_to(self.index, self.aura_type)
                {
                    hook(&args, &mut amount, &mut recalculable);
                }
            }
        }

        self.can_be_recalculated = recalculable;
        amount
    }

    /// Derives the tick period and seeds the countdown.
    ///
    /// With `load` the tick counter and countdown are rebuilt from the aura's
    /// remaining duration; otherwise the counter restarts and, with `reset`,
    /// the countdown is armed to one full period (zero when the spell ticks on
    /// apply).
    pub fn calculate_periodic(&mut self, ctx: &EffectCalcContext<'_>, reset: bool, load: bool) {
        let spell = ctx.spell.as_ref();
        let amplitude = spell.effect(self.index).map_or(0, |info| info.amplitude);

        self.period = amplitude;
        if self.aura_type.has_default_period() && self.period == 0 {
            self.period = 1000;
        }
        self.is_periodic = self.aura_type.is_stacking_periodic()
            || self.aura_type == AuraType::PeriodicDamagePercent;

        if let Some(scripts) = ctx.scripts {
            let args = ctx.hook_args(self);
            for entry in scripts.entries(spell.id) {
                if let AuraHook::CalcPeriodic(hook) = &entry.hook
                    && entry.applies_to(self.index, self.aura_type)
                {
                    hook(&args, &mut self.is_periodic, &mut self.period);
                }
            }
        }

        if !self.is_periodic {
            return;
        }

        if self.period != 0 {
            if let Some(caster) = ctx.caster {
                self.period =
                    ctx.host
                        .apply_spell_mod(caster, spell, SpellModOp::ActivationTime, self.period);
                if spell.is_channeled()
                    || spell.has_attribute(SpellAttributes::HASTE_AFFECTS_PERIOD)
                {
                    self.period = (self.period as f32 * ctx.host.cast_speed(caster)) as i32;
                }
            }
        }
        if self.period <= 0 {
            // never tick with a zero period
            self.period = 0;
            self.is_periodic = false;
            return;
        }

        let tick_on_apply = spell.has_attribute(SpellAttributes::TICK_ON_APPLY);
        if load {
            if !ctx.is_permanent() {
                let remaining = ctx.duration.max(0);
                let elapsed = (ctx.max_duration - remaining).max(0);
                self.ticks_done = (elapsed / self.period) as u32;
                let left = remaining % self.period;
                self.periodic_timer = if left == 0 { self.period } else { left };
            }
            if tick_on_apply {
                self.ticks_done += 1;
            }
        } else {
            self.ticks_done = 0;
            if reset {
                self.periodic_timer = if tick_on_apply { 0 } else { self.period };
            }
        }

        tracing::trace!(
            target: "aura::effect",
            aura = %ctx.aura,
            effect = self.index,
            period = self.period,
            timer = self.periodic_timer,
            ticks = self.ticks_done,
            "periodic timer armed"
        );
    }

    /// Advances the countdown by `diff` milliseconds. Returns `true` when a
    /// tick is due.
    ///
    /// A countdown that lands exactly on zero still ticks, so a duration that
    /// is a multiple of the period keeps its final tick.
    pub fn advance(&mut self, diff: u32) -> bool {
        if !self.is_periodic {
            return false;
        }
        let diff = i32::try_from(diff).unwrap_or(i32::MAX);
        if self.periodic_timer > diff {
            self.periodic_timer -= diff;
            return false;
        }
        self.ticks_done += 1;
        self.periodic_timer += self.period - diff;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::{MemoryUnit, MemoryWorld};
    use crate::script::EffectFilter;
    use crate::spell::{SpellEffectKind, SpellModOp, SpellProcEntry};
    use crate::types::{Position, SpellId};

    fn caster() -> ObjectGuid {
        ObjectGuid::player(1)
    }

    fn owner() -> ObjectGuid {
        ObjectGuid::unit(2)
    }

    fn world() -> MemoryWorld {
        MemoryWorld::new()
            .with_unit(MemoryUnit::new(caster(), Position::ORIGIN).with_level(10))
            .with_unit(MemoryUnit::new(owner(), Position::ORIGIN).with_health(500))
    }

    fn ctx<'a>(
        spell: &'a Arc<SpellInfo>,
        host: &'a dyn UnitHost,
        stacks: u8,
        scripts: Option<&'a ScriptRegistry>,
    ) -> EffectCalcContext<'a> {
        EffectCalcContext {
            aura: AuraId(1),
            spell,
            caster: Some(caster()),
            owner: owner(),
            caster_level: 10,
            stack_amount: stacks,
            max_duration: 6000,
            duration: 6000,
            host,
            scripts,
        }
    }

    fn dot(amplitude: i32) -> Arc<SpellInfo> {
        Arc::new(
            SpellInfo::new(SpellId(172), "Corruption")
                .with_duration(6000)
                .with_effect(
                    SpellEffectInfo::new(0, SpellEffectKind::ApplyAura, AuraType::PeriodicDamage)
                        .with_base_points(30)
                        .with_amplitude(amplitude),
                ),
        )
    }

    #[test]
    fn six_seconds_at_two_second_period_ticks_three_times() {
        let host = world();
        let spell = dot(2000);
        let ctx = ctx(&spell, &host, 1, None);
        let info = spell.effect(0).expect("effect 0");
        let mut effect = AuraEffect::new(info, None, &ctx);

        assert!(effect.is_periodic());
        assert_eq!(effect.total_ticks(&spell, 6000), 3);

        let ticks: Vec<bool> = (0..6).map(|_| effect.advance(1000)).collect();
        assert_eq!(ticks, vec![false, true, false, true, false, true]);
        assert_eq!(effect.ticks_done(), 3);
        assert_eq!(effect.periodic_timer(), 2000);
    }

    #[test]
    fn overshoot_is_carried_into_next_period() {
        let host = world();
        let spell = dot(2000);
        let ctx = ctx(&spell, &host, 1, None);
        let mut effect = AuraEffect::new(spell.effect(0).expect("effect 0"), None, &ctx);

        assert!(effect.advance(2500));
        assert_eq!(effect.periodic_timer(), 1500);
        assert!(!effect.advance(1000));
        assert!(effect.advance(500));
    }

    #[test]
    fn tick_on_apply_arms_timer_at_zero() {
        let host = world();
        let mut info = (*dot(1000)).clone();
        info.attributes |= SpellAttributes::TICK_ON_APPLY;
        let spell = Arc::new(info);
        let ctx = ctx(&spell, &host, 1, None);
        let mut effect = AuraEffect::new(spell.effect(0).expect("effect 0"), None, &ctx);

        assert_eq!(effect.periodic_timer(), 0);
        assert_eq!(effect.total_ticks(&spell, 6000), 7);
        assert!(effect.advance(10));
    }

    #[test]
    fn loading_back_computes_ticks_and_countdown() {
        let host = world();
        let spell = dot(2000);
        let mut ctx = ctx(&spell, &host, 1, None);
        let mut effect = AuraEffect::new(spell.effect(0).expect("effect 0"), None, &ctx);

        // 3500 ms of 6000 elapsed: one tick done, next one in 500 ms
        ctx.duration = 2500;
        effect.calculate_periodic(&ctx, false, true);
        assert_eq!(effect.ticks_done(), 1);
        assert_eq!(effect.periodic_timer(), 500);

        // exactly on a boundary the countdown is a full period
        ctx.duration = 2000;
        effect.calculate_periodic(&ctx, false, true);
        assert_eq!(effect.ticks_done(), 2);
        assert_eq!(effect.periodic_timer(), 2000);
    }

    #[test]
    fn zero_period_disables_ticking() {
        let host = world();
        let spell = dot(0);
        let ctx = ctx(&spell, &host, 1, None);
        let mut effect = AuraEffect::new(spell.effect(0).expect("effect 0"), None, &ctx);

        assert!(!effect.is_periodic());
        assert!(!effect.advance(5000));
    }

    #[test]
    fn amount_scales_with_stacks_and_caster_mods() {
        let host = MemoryWorld::new()
            .with_unit(MemoryUnit::new(caster(), Position::ORIGIN).with_spell_mod(SpellModOp::Points, 5))
            .with_unit(MemoryUnit::new(owner(), Position::ORIGIN));
        let spell = dot(2000);
        let ctx = ctx(&spell, &host, 3, None);
        let effect = AuraEffect::new(spell.effect(0).expect("effect 0"), None, &ctx);

        assert_eq!(effect.amount(), (30 + 5) * 3);
        assert!(effect.can_be_recalculated());

        let mut flat = (*spell).clone();
        flat.effects[0].attributes |= SpellEffectAttributes::NO_SCALE_WITH_STACK;
        let flat = Arc::new(flat);
        let ctx = EffectCalcContext { spell: &flat, ..ctx };
        let effect = AuraEffect::new(flat.effect(0).expect("effect 0"), Some(10), &ctx);
        assert_eq!(effect.amount(), 15);
    }

    #[test]
    fn proc_breakable_control_absorbs_tenth_of_health() {
        let host = world();
        let spell = Arc::new(
            SpellInfo::new(SpellId(118), "Polymorph")
                .with_proc(SpellProcEntry::default())
                .with_effect(
                    SpellEffectInfo::new(0, SpellEffectKind::ApplyAura, AuraType::Transform)
                        .with_base_points(1),
                ),
        );
        let ctx = ctx(&spell, &host, 1, None);
        let effect = AuraEffect::new(spell.effect(0).expect("effect 0"), None, &ctx);

        assert_eq!(effect.amount(), 50);
        assert!(!effect.can_be_recalculated());
    }

    #[test]
    fn calc_amount_hook_runs_after_stack_scaling() {
        let host = world();
        let spell = dot(2000);
        let mut scripts = ScriptRegistry::new();
        scripts.on_calc_amount(spell.id, EffectFilter::index(0), |args, amount, recalc| {
            assert_eq!(args.stack_amount, 2);
            *amount += 1;
            *recalc = false;
        });
        let ctx = ctx(&spell, &host, 2, Some(&scripts));
        let effect = AuraEffect::new(spell.effect(0).expect("effect 0"), None, &ctx);

        assert_eq!(effect.amount(), 61);
        assert!(!effect.can_be_recalculated());
    }
}

//! Default apply/remove handlers per aura category.
//!
//! Handlers are plain function pointers selected by [`default_handler`];
//! categories without one (periodic, proc and dummy effects) do all their
//! work in ticks, procs or scripts.
use std::sync::Arc;

use super::AuraEngine;
use crate::env::AuraModifier;
use crate::spell::{AuraType, SpellInfo};
use crate::types::{AuraId, HandleModes, ObjectGuid, UnitStateFlags};

/// Snapshot of the effect being handled.
#[derive(Clone, Debug)]
pub(crate) struct HandlerArgs {
    pub aura: AuraId,
    pub spell: Arc<SpellInfo>,
    pub effect_index: u8,
    pub aura_type: AuraType,
    pub target: ObjectGuid,
    pub caster: Option<ObjectGuid>,
    pub amount: i32,
    pub modes: HandleModes,
}

pub(crate) type EffectHandler = fn(&mut AuraEngine<'_>, &HandlerArgs, bool);

pub(crate) fn default_handler(aura_type: AuraType) -> Option<EffectHandler> {
    if aura_type.unit_state().is_some() {
        return Some(handle_unit_state);
    }
    match aura_type {
        AuraType::SchoolAbsorb
        | AuraType::ManaShield
        | AuraType::ModStat
        | AuraType::ModResistance
        | AuraType::ModDamageDone
        | AuraType::ModDamagePercentDone
        | AuraType::ModHealingDone
        | AuraType::ModIncreaseHealth
        | AuraType::ModIncreaseSpeed
        | AuraType::ModDecreaseSpeed
        | AuraType::ModMeleeHaste
        | AuraType::ModCastingSpeedNotStack
        | AuraType::ModSpellCritChance
        | AuraType::ModMechanicResistance
        | AuraType::MechanicImmunity
        | AuraType::ModSchoolMaskDamageFromCaster
        | AuraType::ModSpellDamageFromCaster
        | AuraType::ReflectSpellsSchool
        | AuraType::AddFlatModifier
        | AuraType::AddPctModifier => Some(handle_modifier),
        _ => None,
    }
}

/// Reports the effect's amount to the entity model. Runs on real
/// apply/remove and on amount changes.
fn handle_modifier(engine: &mut AuraEngine<'_>, args: &HandlerArgs, apply: bool) {
    if !args.modes.intersects(HandleModes::CHANGE_AMOUNT_MASK) {
        return;
    }
    let (misc_value, misc_value_b) = args
        .spell
        .effect(args.effect_index)
        .map_or((0, 0), |info| (info.misc_value, info.misc_value_b));
    let modifier = AuraModifier {
        aura: args.aura,
        spell: args.spell.id,
        effect_index: args.effect_index,
        aura_type: args.aura_type,
        misc_value,
        misc_value_b,
        amount: args.amount,
        caster: args.caster,
    };
    engine.host.apply_modifier(args.target, &modifier, apply);
}

/// Raises or clears a control state. On remove the state stays while any
/// other applied effect on the target still implies it.
fn handle_unit_state(engine: &mut AuraEngine<'_>, args: &HandlerArgs, apply: bool) {
    if !args.modes.contains(HandleModes::REAL) {
        return;
    }
    let Some(state) = args.aura_type.unit_state() else {
        return;
    };
    if !apply && still_implied(engine, args.target, state) {
        return;
    }
    engine.host.set_unit_state(args.target, state, apply);
}

fn still_implied(engine: &AuraEngine<'_>, target: ObjectGuid, state: UnitStateFlags) -> bool {
    engine.state.holder(target).is_some_and(|holder| {
        holder
            .effects_by_type
            .iter()
            .any(|(aura_type, entries)| !entries.is_empty() && aura_type.unit_state() == Some(state))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn categories_map_to_handlers() {
        assert!(default_handler(AuraType::ModStun).is_some());
        assert!(default_handler(AuraType::ModStat).is_some());
        assert!(default_handler(AuraType::PeriodicDamage).is_none());
        assert!(default_handler(AuraType::ProcTriggerSpell).is_none());
        assert!(default_handler(AuraType::Dummy).is_none());
    }
}

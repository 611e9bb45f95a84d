//! Whether two auras may coexist on the same unit.

use super::Aura;
use crate::env::UnitHost;
use crate::spell::{AuraType, SpellAttributes, SpellGroupStackRule, SpellInfo, SpellOracle};

impl Aura {
    /// Decides whether `self` may stay next to `existing`. Rules are checked
    /// in order and the first one that decides wins.
    pub fn can_stack_with(
        &self,
        existing: &Aura,
        spells: &dyn SpellOracle,
        host: &dyn UnitHost,
    ) -> bool {
        if self.id == existing.id {
            return true;
        }

        let same_caster = self.caster == existing.caster;
        let spell = self.spell.as_ref();
        let other = existing.spell.as_ref();

        if self.is_dyn_obj() || existing.is_dyn_obj() {
            return !(same_caster && spell.id == other.id);
        }

        if self.is_passive()
            && same_caster
            && (spell.is_different_rank_of(other)
                || (spell.id == other.id && self.cast_item.is_none()))
        {
            return false;
        }

        // a trigger source and the aura it triggered never push each other out
        if other
            .effects
            .iter()
            .any(|effect| effect.trigger_spell == Some(spell.id))
        {
            return true;
        }
        if spell
            .effects
            .iter()
            .any(|effect| effect.trigger_spell == Some(other.id))
        {
            return true;
        }

        if spell.is_aura_exclusive_by_specific_with(other)
            || (same_caster && spell.is_aura_exclusive_by_specific_per_caster_with(other))
        {
            return false;
        }

        match spells.group_stack_rule(spell, other) {
            // with ExclusiveHighest the weaker one was already refused
            SpellGroupStackRule::Exclusive | SpellGroupStackRule::ExclusiveHighest => {
                return false;
            }
            SpellGroupStackRule::ExclusiveFromSameCaster if same_caster => return false,
            _ => {}
        }

        if spell.family != other.family {
            return true;
        }

        if !same_caster {
            if other.is_channeled() {
                return true;
            }
            if spell.has_attribute(SpellAttributes::DOT_STACKING_RULE) {
                return true;
            }
            if has_periodic_non_area_effect(spell) && has_periodic_non_area_effect(other) {
                return true;
            }
        }

        if self.has_effect_type(AuraType::ControlVehicle)
            && existing.has_effect_type(AuraType::ControlVehicle)
        {
            return match host.available_vehicle_seats(self.owner) {
                None => true,
                Some(seats) => seats > 0,
            };
        }

        if self.has_confirmation_prompt() && existing.has_confirmation_prompt() {
            return false;
        }

        if spell.is_rank_of(other) {
            if spell.is_multi_slot() && !self.is_area() {
                return true;
            }
            if let (Some(mine), Some(theirs)) = (self.cast_item, existing.cast_item)
                && mine != theirs
                && spell.has_attribute(SpellAttributes::ENCHANT_PROC)
            {
                return true;
            }
            return false;
        }

        true
    }

    fn has_confirmation_prompt(&self) -> bool {
        self.has_effect_type(AuraType::ShowConfirmationPrompt)
            || self.has_effect_type(AuraType::ShowConfirmationPromptWithDifficulty)
    }
}

/// The first stacking-periodic effect decides: area-targeted ones do not
/// stack across casters.
fn has_periodic_non_area_effect(spell: &SpellInfo) -> bool {
    spell
        .effects
        .iter()
        .find(|effect| effect.aura.is_stacking_periodic())
        .is_some_and(|effect| !effect.is_targeting_area())
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Arc;

    use super::*;
    use crate::aura::{AuraKind, EffectSlots};
    use crate::effect::{AuraEffect, EffectCalcContext};
    use crate::env::{MemoryUnit, MemoryWorld};
    use crate::spell::{SpellCatalog, SpellEffectInfo, SpellEffectKind, SpellSpecific};
    use crate::types::{AuraId, CastId, GameTime, ObjectGuid, Position, SpellId};

    fn owner() -> ObjectGuid {
        ObjectGuid::unit(9)
    }

    fn host() -> MemoryWorld {
        MemoryWorld::new().with_unit(MemoryUnit::new(owner(), Position::ORIGIN))
    }

    fn aura(id: u64, spell: SpellInfo, caster: u64, host: &MemoryWorld) -> Aura {
        let spell = Arc::new(spell);
        let ctx = EffectCalcContext {
            aura: AuraId(id),
            spell: &spell,
            caster: Some(ObjectGuid::player(caster)),
            owner: owner(),
            caster_level: 1,
            stack_amount: 1,
            max_duration: 10_000,
            duration: 10_000,
            host,
            scripts: None,
        };
        let mut effects = EffectSlots::new();
        for _ in 0..effects.capacity() {
            effects.push(None);
        }
        for info in &spell.effects {
            effects[usize::from(info.index)] = Some(AuraEffect::new(info, None, &ctx));
        }
        Aura {
            id: AuraId(id),
            spell: Arc::clone(&spell),
            cast_id: CastId(id),
            caster: Some(ObjectGuid::player(caster)),
            cast_item: None,
            cast_item_level: 0,
            visual: 0,
            owner: owner(),
            kind: AuraKind::Unit {
                static_targets: BTreeMap::new(),
            },
            apply_time: GameTime::ZERO,
            caster_level: 1,
            max_duration: 10_000,
            duration: 10_000,
            update_target_map_interval: 0,
            proc_charges: 0,
            stack_amount: 1,
            is_removed: false,
            is_single_target: false,
            is_using_charges: false,
            drop_event: None,
            proc_cooldown: None,
            last_proc_attempt: None,
            last_proc_success: None,
            effects,
            applications: BTreeMap::new(),
        }
    }

    fn periodic(id: u32, family: u32) -> SpellInfo {
        let mut spell = SpellInfo::new(SpellId(id), "Rend").with_effect(
            SpellEffectInfo::new(0, SpellEffectKind::ApplyAura, AuraType::PeriodicDamage)
                .with_amplitude(3000),
        );
        spell.family = family;
        spell
    }

    #[test]
    fn same_spell_same_caster_does_not_stack() {
        let host = host();
        let catalog = SpellCatalog::new();
        let a = aura(1, periodic(10, 4), 1, &host);
        let b = aura(2, periodic(10, 4), 1, &host);

        assert!(a.can_stack_with(&a, &catalog, &host));
        assert!(!a.can_stack_with(&b, &catalog, &host));
    }

    #[test]
    fn periodic_from_different_casters_stacks() {
        let host = host();
        let catalog = SpellCatalog::new();
        let a = aura(1, periodic(10, 4), 1, &host);
        let b = aura(2, periodic(10, 4), 2, &host);
        assert!(a.can_stack_with(&b, &catalog, &host));

        // area periodic effects (replenishment style) do not
        let mut area = periodic(11, 4);
        area.effects[0].effect = SpellEffectKind::ApplyAreaAuraRaid;
        let a = aura(3, area.clone(), 1, &host);
        let b = aura(4, area, 2, &host);
        assert!(!a.can_stack_with(&b, &catalog, &host));
    }

    #[test]
    fn exclusive_specific_blocks_regardless_of_caster() {
        let host = host();
        let catalog = SpellCatalog::new();
        let mut seal_a = SpellInfo::new(SpellId(20), "Seal A").with_effect(
            SpellEffectInfo::new(0, SpellEffectKind::ApplyAura, AuraType::Dummy),
        );
        seal_a.specific = SpellSpecific::Seal;
        let mut seal_b = seal_a.clone();
        seal_b.id = SpellId(21);
        seal_b.family = 7;

        let a = aura(1, seal_a, 1, &host);
        let b = aura(2, seal_b, 2, &host);
        assert!(!a.can_stack_with(&b, &catalog, &host));
    }

    #[test]
    fn different_families_stack_after_group_rules() {
        let host = host();
        let mut a_spell = periodic(30, 1);
        a_spell.groups = vec![5];
        let mut b_spell = periodic(31, 2);
        b_spell.groups = vec![5];
        let a = aura(1, a_spell, 1, &host);
        let b = aura(2, b_spell, 1, &host);

        assert!(a.can_stack_with(&b, &SpellCatalog::new(), &host));
        let exclusive = SpellCatalog::new().with_group(5, SpellGroupStackRule::Exclusive);
        assert!(!a.can_stack_with(&b, &exclusive, &host));
    }

    #[test]
    fn trigger_source_is_protected() {
        let host = host();
        let catalog = SpellCatalog::new();
        let source = SpellInfo::new(SpellId(40), "Source").with_effect(
            SpellEffectInfo::new(0, SpellEffectKind::ApplyAura, AuraType::ProcTriggerSpell)
                .with_trigger_spell(SpellId(41)),
        );
        let mut triggered = SpellInfo::new(SpellId(41), "Triggered").with_effect(
            SpellEffectInfo::new(0, SpellEffectKind::ApplyAura, AuraType::Dummy),
        );
        triggered.first_rank = Some(SpellId(40));

        let a = aura(1, triggered, 1, &host);
        let b = aura(2, source, 1, &host);
        assert!(a.can_stack_with(&b, &catalog, &host));
        assert!(b.can_stack_with(&a, &catalog, &host));
    }

    #[test]
    fn multi_slot_rank_stacks() {
        let host = host();
        let catalog = SpellCatalog::new();
        let spell = periodic(50, 3).with_attributes(SpellAttributes::MULTI_SLOT);
        let a = aura(1, spell.clone(), 1, &host);
        let b = aura(2, spell, 1, &host);
        assert!(a.can_stack_with(&b, &catalog, &host));
    }
}

//! Aura and binding removal, death cleanup and dispel.
use super::AuraEngine;
use crate::aura::AuraKind;
use crate::script::{AuraHook, DispelInfo};
use crate::spell::SpellAttributes;
use crate::types::{AuraId, ObjectGuid, RemoveMode, SpellId};

impl AuraEngine<'_> {
    /// Removes the aura and every binding it has.
    ///
    /// The aura stays in the state, flagged as removed, until the end of the
    /// current [`AuraEngine::update`]. Removing twice is a no-op.
    pub fn remove_aura(&mut self, id: AuraId, mode: RemoveMode) {
        let Some(aura) = self.live_aura_mut(id) else {
            return;
        };
        aura.is_removed = true;
        let drop_event = aura.drop_event.take();
        let owner = aura.owner;
        let caster = aura.caster.filter(|_| aura.is_single_target);
        let spell = aura.spell.id;
        let targets = aura.targets();

        for target in targets {
            self.unapply_binding(id, target, mode);
        }

        if let Some(holder) = self.state.holders.get(&owner) {
            holder.owned().remove(id);
        }
        if let Some(holder) = caster.and_then(|caster| self.state.holders.get_mut(&caster)) {
            holder.single_cast.retain(|other| *other != id);
        }
        if let Some(event) = drop_event {
            self.state.events.abort(event);
        }
        self.state.pending_removed.push(id);

        tracing::debug!(target: "aura::create", aura = %id, spell = %spell, owner = %owner, mode = %mode, "aura removed");
    }

    /// Removes the binding of `id` on `target`; removes the whole aura when
    /// `target` owns it.
    pub fn remove_applied_aura(&mut self, target: ObjectGuid, id: AuraId, mode: RemoveMode) {
        let Some(aura) = self.live_aura_mut(id) else {
            return;
        };
        if aura.owner == target {
            self.remove_aura(id, mode);
            return;
        }
        if let AuraKind::Unit { static_targets } = &mut aura.kind {
            static_targets.remove(&target);
        }
        self.unapply_binding(id, target, mode);
    }

    /// Removes the auras of `spell` owned by `owner`, optionally only those
    /// from `caster`. Returns how many were removed.
    pub fn remove_owned_auras_by_spell(
        &mut self,
        owner: ObjectGuid,
        spell: SpellId,
        caster: Option<ObjectGuid>,
        mode: RemoveMode,
    ) -> usize {
        let Some(holder) = self.state.holder(owner) else {
            return 0;
        };
        let query = holder.owned().query().has_spell(spell);
        let ids = match caster {
            Some(caster) => query.has_caster(caster).ids(),
            None => query.ids(),
        };
        let count = ids.len();
        for id in ids {
            self.remove_aura(id, mode);
        }
        count
    }

    /// Removes the bindings of `spell` on `target`, optionally only those
    /// from `caster`. Returns how many were removed.
    pub fn remove_applied_auras_by_spell(
        &mut self,
        target: ObjectGuid,
        spell: SpellId,
        caster: Option<ObjectGuid>,
        mode: RemoveMode,
    ) -> usize {
        let Some(holder) = self.state.holder(target) else {
            return 0;
        };
        let query = holder.applied().query().has_spell(spell);
        let ids = match caster {
            Some(caster) => query.has_caster(caster).ids(),
            None => query.ids(),
        };
        let count = ids.len();
        for id in ids {
            self.remove_applied_aura(target, id, mode);
        }
        count
    }

    /// Drops every binding on `unit` and every aura it owns.
    pub fn remove_all_auras(&mut self, unit: ObjectGuid) {
        let mut remaining = usize::MAX;
        loop {
            let applied = self.state.applied_auras(unit);
            let owned = self.state.owned_auras(unit);
            let count = applied.len() + owned.len();
            if count == 0 {
                break;
            }
            if count >= remaining {
                // removal hooks keep re-adding auras
                tracing::warn!(target: "aura::create", unit = %unit, count, "auras left after removing all");
                break;
            }
            remaining = count;

            for id in applied {
                self.remove_applied_aura(unit, id, RemoveMode::Default);
            }
            for id in owned {
                self.remove_aura(id, RemoveMode::Default);
            }
        }
    }

    /// Death cleanup: everything but passive and death-persistent auras goes.
    pub fn remove_auras_on_death(&mut self, unit: ObjectGuid) {
        let Some(holder) = self.state.holder(unit) else {
            return;
        };
        let applied = holder
            .applied()
            .query()
            .is_passive(false)
            .is_death_persistent(false)
            .ids();
        let owned = holder
            .owned()
            .query()
            .is_passive(false)
            .is_death_persistent(false)
            .ids();
        tracing::debug!(target: "aura::create", unit = %unit, applied = applied.len(), owned = owned.len(), "removing auras on death");

        for id in applied {
            self.remove_applied_aura(unit, id, RemoveMode::Death);
        }
        for id in owned {
            self.remove_aura(id, RemoveMode::Death);
        }
    }

    /// Dispels `charges` charges or stacks of the aura.
    ///
    /// Dispel hooks may change the count before it is taken. Returns `true`
    /// when the aura is gone afterwards.
    pub fn dispel(
        &mut self,
        id: AuraId,
        dispeller: ObjectGuid,
        dispeller_spell: SpellId,
        charges: u8,
    ) -> bool {
        let Some(spell) = self.aura_spell(id) else {
            return false;
        };
        let mut info = DispelInfo {
            aura: id,
            spell: spell.id,
            dispeller,
            dispeller_spell,
            removed_charges: charges,
        };
        let scripts = self.env.scripts_opt();
        for script in scripts.map(|scripts| scripts.entries(spell.id)).unwrap_or_default() {
            if let AuraHook::Dispel(hook) = &script.hook {
                hook(self, &mut info);
            }
        }
        if !self.is_live(id) {
            return true;
        }

        let taken = -i32::from(info.removed_charges);
        tracing::debug!(
            target: "aura::create",
            aura = %id,
            dispeller = %dispeller,
            by_spell = %dispeller_spell,
            charges = info.removed_charges,
            "aura dispelled"
        );
        if spell.has_attribute(SpellAttributes::DISPEL_REMOVES_CHARGES) {
            self.modify_charges(id, taken, RemoveMode::EnemySpell);
        } else {
            self.modify_stack_amount(id, taken, RemoveMode::EnemySpell, true);
        }

        for script in scripts.map(|scripts| scripts.entries(spell.id)).unwrap_or_default() {
            if let AuraHook::AfterDispel(hook) = &script.hook {
                hook(self, &mut info);
            }
        }
        !self.is_live(id)
    }

    /// Re-resolves the aura's targets now instead of at the next interval.
    pub fn retarget(&mut self, id: AuraId) {
        self.update_target_map(id, true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aura::AuraCreateInfo;
    use crate::env::{AuraEnv, FixedRng, MemoryUnit, MemoryWorld};
    use crate::script::ScriptRegistry;
    use crate::spell::{AuraType, SpellCatalog, SpellEffectInfo, SpellEffectKind, SpellInfo};
    use crate::state::AuraState;
    use crate::types::{Position, UnitStateFlags};

    const SUNDER: SpellId = SpellId(7386);
    const STUN: SpellId = SpellId(853);
    const SOULSTONE: SpellId = SpellId(20707);
    const TOUGHNESS: SpellId = SpellId(16252);
    const PURGE: SpellId = SpellId(370);
    const SHIELD: SpellId = SpellId(324);

    fn catalog() -> SpellCatalog {
        SpellCatalog::new()
            .with_spell(
                SpellInfo::new(SUNDER, "Sunder Armor")
                    .with_duration(30_000)
                    .with_stack_amount(5)
                    .with_effect(
                        SpellEffectInfo::new(0, SpellEffectKind::ApplyAura, AuraType::ModResistance)
                            .with_base_points(-90),
                    ),
            )
            .with_spell(
                SpellInfo::new(STUN, "Hammer of Justice")
                    .with_duration(6000)
                    .with_effect(SpellEffectInfo::new(0, SpellEffectKind::ApplyAura, AuraType::ModStun)),
            )
            .with_spell(
                SpellInfo::new(SOULSTONE, "Soulstone Resurrection")
                    .with_duration(1_800_000)
                    .with_attributes(SpellAttributes::DEATH_PERSISTENT)
                    .with_effect(SpellEffectInfo::new(0, SpellEffectKind::ApplyAura, AuraType::Dummy)),
            )
            .with_spell(
                SpellInfo::new(TOUGHNESS, "Toughness")
                    .with_attributes(SpellAttributes::PASSIVE)
                    .with_effect(
                        SpellEffectInfo::new(0, SpellEffectKind::ApplyAura, AuraType::ModResistance)
                            .with_base_points(25),
                    ),
            )
            .with_spell(
                SpellInfo::new(SHIELD, "Lightning Shield")
                    .with_duration(600_000)
                    .with_proc_charges(3)
                    .with_attributes(SpellAttributes::DISPEL_REMOVES_CHARGES)
                    .with_effect(SpellEffectInfo::new(0, SpellEffectKind::ApplyAura, AuraType::Dummy)),
            )
    }

    fn world() -> MemoryWorld {
        MemoryWorld::new()
            .with_unit(MemoryUnit::new(ObjectGuid::player(1), Position::ORIGIN).with_health(1000))
            .with_unit(MemoryUnit::new(ObjectGuid::unit(2), Position::ORIGIN).with_faction(2).with_health(1000))
    }

    #[test]
    fn removal_is_idempotent_and_unapplies_effects() {
        let catalog = catalog();
        let mut world = world();
        let mut state = AuraState::default();
        let mut engine = AuraEngine::new(&mut state, AuraEnv::new(&catalog, &FixedRng::NEVER), &mut world);
        let paladin = ObjectGuid::player(1);
        let mob = ObjectGuid::unit(2);

        let id = engine
            .create_aura(AuraCreateInfo::new(STUN, mob).with_caster(paladin))
            .expect("created");
        engine.remove_aura(id, RemoveMode::Cancel);
        engine.remove_aura(id, RemoveMode::Cancel);
        assert!(engine.aura(id).is_none());
        assert!(engine.state().applied_auras(mob).is_empty());
        assert!(engine.state().owned_auras(mob).is_empty());
        drop(engine);

        assert!(!world.has_unit_state(mob, UnitStateFlags::STUNNED));
    }

    #[test]
    fn death_keeps_passive_and_persistent_auras() {
        let catalog = catalog();
        let mut world = world();
        let mut state = AuraState::default();
        let mut engine = AuraEngine::new(&mut state, AuraEnv::new(&catalog, &FixedRng::NEVER), &mut world);
        let player = ObjectGuid::player(1);
        let mob = ObjectGuid::unit(2);

        let stun = engine
            .create_aura(AuraCreateInfo::new(STUN, player).with_caster(mob))
            .expect("stun");
        let stone = engine
            .create_aura(AuraCreateInfo::new(SOULSTONE, player).with_caster(player))
            .expect("soulstone");
        let passive = engine
            .create_aura(AuraCreateInfo::new(TOUGHNESS, player).with_caster(player))
            .expect("passive");

        engine.remove_auras_on_death(player);
        assert!(engine.aura(stun).is_none());
        assert!(engine.aura(stone).is_some());
        assert!(engine.aura(passive).is_some());
    }

    #[test]
    fn remove_all_clears_owned_and_applied() {
        let catalog = catalog();
        let mut world = world();
        let mut state = AuraState::default();
        let mut engine = AuraEngine::new(&mut state, AuraEnv::new(&catalog, &FixedRng::NEVER), &mut world);
        let player = ObjectGuid::player(1);

        engine
            .create_aura(AuraCreateInfo::new(TOUGHNESS, player).with_caster(player))
            .expect("passive");
        engine
            .create_aura(AuraCreateInfo::new(SOULSTONE, player).with_caster(player))
            .expect("soulstone");
        engine.remove_all_auras(player);
        assert!(engine.state().applied_auras(player).is_empty());
        assert!(engine.state().owned_auras(player).is_empty());
    }

    #[test]
    fn remove_by_spell_filters_on_caster() {
        let catalog = catalog();
        let mut world = world().with_unit(MemoryUnit::new(ObjectGuid::player(3), Position::ORIGIN));
        let mut state = AuraState::default();
        let mut engine = AuraEngine::new(&mut state, AuraEnv::new(&catalog, &FixedRng::NEVER), &mut world);
        let mob = ObjectGuid::unit(2);

        engine
            .create_aura(AuraCreateInfo::new(STUN, mob).with_caster(ObjectGuid::player(1)))
            .expect("first");
        assert_eq!(
            engine.remove_owned_auras_by_spell(mob, STUN, Some(ObjectGuid::player(3)), RemoveMode::Default),
            0
        );
        assert_eq!(engine.remove_owned_auras_by_spell(mob, STUN, None, RemoveMode::Default), 1);
        assert!(engine.state().owned_auras(mob).is_empty());
    }

    #[test]
    fn dispel_takes_stacks_or_charges() {
        let catalog = catalog();
        let mut world = world();
        let mut state = AuraState::default();
        let mut engine = AuraEngine::new(&mut state, AuraEnv::new(&catalog, &FixedRng::NEVER), &mut world);
        let player = ObjectGuid::player(1);
        let mob = ObjectGuid::unit(2);

        let sunder = engine
            .create_aura(AuraCreateInfo::new(SUNDER, mob).with_caster(player).with_stack_amount(3))
            .expect("sunder");
        assert!(!engine.dispel(sunder, player, PURGE, 1));
        assert_eq!(engine.aura(sunder).map(|aura| aura.stack_amount()), Some(2));
        assert!(engine.dispel(sunder, player, PURGE, 2));

        let shield = engine
            .create_aura(AuraCreateInfo::new(SHIELD, mob).with_caster(mob))
            .expect("shield");
        assert!(!engine.dispel(shield, player, PURGE, 1));
        let aura = engine.aura(shield).expect("live");
        assert_eq!((aura.charges(), aura.stack_amount()), (2, 1));
    }

    #[test]
    fn dispel_hook_adjusts_count() {
        let catalog = catalog();
        let mut scripts = ScriptRegistry::new();
        scripts.on_dispel(SUNDER, |_, info| info.removed_charges = 5);
        let mut world = world();
        let mut state = AuraState::default();
        let env = AuraEnv::new(&catalog, &FixedRng::NEVER).with_scripts(&scripts);
        let mut engine = AuraEngine::new(&mut state, env, &mut world);

        let sunder = engine
            .create_aura(
                AuraCreateInfo::new(SUNDER, ObjectGuid::unit(2))
                    .with_caster(ObjectGuid::player(1))
                    .with_stack_amount(3),
            )
            .expect("sunder");
        assert!(engine.dispel(sunder, ObjectGuid::player(1), PURGE, 1));
    }
}

//! Stacks, charges, deferred charge drops and duration refresh.
use std::sync::Arc;

use super::AuraEngine;
use crate::events::DeferredChargeEvent;
use crate::spell::SpellAttributes;
use crate::types::{AuraId, RemoveMode};

impl AuraEngine<'_> {
    /// Adds `delta` stacks, clamped to the spell's maximum.
    ///
    /// Reaching zero removes the aura with `mode` and returns `true`. Adding
    /// stacks refreshes duration, periodic timers and charges.
    pub fn modify_stack_amount(
        &mut self,
        id: AuraId,
        delta: i32,
        mode: RemoveMode,
        reset_periodic_timer: bool,
    ) -> bool {
        let Some(aura) = self.state.live_aura(id) else {
            return false;
        };
        let old = i32::from(aura.stack_amount);
        let max = i32::from(aura.max_stack_amount());
        let stacks = (old + delta).min(max);
        if stacks <= 0 {
            self.remove_aura(id, mode);
            return true;
        }

        let spell = &aura.spell;
        let refresh = stacks >= old
            && (spell.stack_amount > 0
                || !(spell.has_attribute(SpellAttributes::AURA_UNIQUE)
                    || spell.has_attribute(SpellAttributes::AURA_UNIQUE_PER_CASTER)));

        tracing::debug!(target: "aura::stack", aura = %id, from = old, to = stacks, "stack amount changed");
        self.set_stack_amount(id, stacks as u8);

        if refresh {
            self.refresh_timers(id, reset_periodic_timer);
            let charges = self
                .state
                .live_aura(id)
                .map(|aura| aura.calc_max_charges(&*self.host));
            if let (Some(charges), Some(aura)) = (charges, self.live_aura_mut(id)) {
                aura.set_charges(charges);
            }
        }
        self.reindex_facets(id);
        self.mark_client_updates(id);
        false
    }

    /// Stores the stack count and rescales every effect to it.
    fn set_stack_amount(&mut self, id: AuraId, stacks: u8) {
        let scripts = self.env.scripts_opt();
        let host = &*self.host;
        let Some(aura) = self.state.auras.get_mut(&id).filter(|aura| !aura.is_removed) else {
            return;
        };
        aura.stack_amount = stacks;
        let spell = Arc::clone(&aura.spell);
        let ctx = aura.calc_context(&spell, host, scripts);
        let amounts: Vec<(u8, i32)> = aura
            .effects
            .iter_mut()
            .flatten()
            .map(|effect| (effect.index(), effect.calculate_amount(&ctx)))
            .collect();

        for (index, amount) in amounts {
            self.change_amount(id, index, amount, false, true);
        }
    }

    /// Restarts the duration at its (recomputed) maximum and re-arms the
    /// periodic timers.
    ///
    /// Spells that keep their periodic timer roll a last partial tick into the
    /// new duration. Pandemic spells carry up to 30% of the new maximum over.
    pub fn refresh_timers(&mut self, id: AuraId, mut reset_periodic_timer: bool) {
        let Some(aura) = self.state.live_aura(id) else {
            return;
        };
        let spell = Arc::clone(&aura.spell);
        let duration = aura.duration;
        let mut max_duration = self.calc_max_duration(&spell, aura.caster);

        if spell.has_attribute(SpellAttributes::DONT_RESET_PERIODIC_TIMER) {
            let min_period = aura
                .effects()
                .filter(|effect| effect.is_periodic())
                .map(|effect| effect.period())
                .fold(max_duration, i32::min);
            if duration <= min_period {
                max_duration += duration;
                reset_periodic_timer = false;
            }
        } else if spell.has_attribute(SpellAttributes::PERIODIC_REFRESH_EXTENDS) && max_duration > 0 {
            let pandemic = max_duration * 30 / 100;
            max_duration = duration.max(duration.min(pandemic) + max_duration);
            reset_periodic_timer = false;
        }

        let scripts = self.env.scripts_opt();
        let host = &*self.host;
        let Some(aura) = self.state.auras.get_mut(&id) else {
            return;
        };
        aura.max_duration = max_duration;
        aura.duration = max_duration;
        let ctx = aura.calc_context(&spell, host, scripts);
        for effect in aura.effects.iter_mut().flatten() {
            effect.calculate_periodic(&ctx, reset_periodic_timer, false);
        }
        self.reindex_facets(id);
        tracing::debug!(
            target: "aura::stack",
            aura = %id,
            duration = max_duration,
            reset_periodic_timer,
            "timers refreshed"
        );
    }

    /// Sets the remaining duration. With `with_max` the maximum follows.
    pub fn set_duration(&mut self, id: AuraId, duration: i32, with_max: bool) {
        let Some(aura) = self.live_aura_mut(id) else {
            return;
        };
        aura.duration = duration;
        if with_max {
            aura.max_duration = duration;
        }
        self.reindex_facets(id);
        self.mark_client_updates(id);
    }

    /// Adds `delta` charges, clamped to the aura's maximum.
    ///
    /// Auras that do not use charges ignore the call. Reaching zero removes
    /// the aura with `mode` and returns `true`.
    pub fn modify_charges(&mut self, id: AuraId, delta: i32, mode: RemoveMode) -> bool {
        let Some(aura) = self.state.live_aura(id) else {
            return false;
        };
        if !aura.is_using_charges {
            return false;
        }
        let old = i32::from(aura.proc_charges);
        let mut charges = old + delta;
        if delta > 0 {
            charges = charges.min(i32::from(aura.calc_max_charges(&*self.host)));
        }
        if charges <= 0 {
            tracing::debug!(target: "aura::stack", aura = %id, "last charge used");
            self.remove_aura(id, mode);
            return true;
        }

        if let Some(aura) = self.live_aura_mut(id) {
            aura.set_charges(charges.min(i32::from(u8::MAX)) as u8);
        }
        tracing::debug!(target: "aura::stack", aura = %id, from = old, to = charges, "charges changed");
        self.reindex_facets(id);
        self.mark_client_updates(id);
        false
    }

    /// Rewrites the index record of `id` in its owner's and its targets'
    /// collections after duration or charges changed.
    pub(crate) fn reindex_facets(&mut self, id: AuraId) {
        let Some(aura) = self.state.live_aura(id) else {
            return;
        };
        let facets = aura.facets();
        let owner = aura.owner;
        if let Some(holder) = self.state.holders.get(&owner) {
            holder.owned().update(id, |entry| *entry = facets.clone());
        }
        for target in aura.targets() {
            if let Some(holder) = self.state.holders.get(&target) {
                holder.applied().update(id, |entry| entry.facets = facets.clone());
            }
        }
    }

    /// Schedules the loss of one charge `delay` milliseconds from now.
    ///
    /// At most one drop is pending per aura; later requests are ignored until
    /// it fires. The aura does not expire while a drop is pending.
    pub fn drop_charge_delayed(&mut self, id: AuraId, delay: u32, mode: RemoveMode) {
        let Some(aura) = self.state.live_aura(id) else {
            return;
        };
        if aura.drop_event.is_some() {
            return;
        }
        let fire_at = self.state.now + u64::from(delay);
        let event = self.state.events.schedule(id, mode, fire_at);
        if let Some(aura) = self.live_aura_mut(id) {
            aura.drop_event = Some(event);
        }
    }

    pub(crate) fn fire_charge_drop(&mut self, event: DeferredChargeEvent) {
        let Some(aura) = self.live_aura_mut(event.aura) else {
            return;
        };
        if aura.drop_event != Some(event.id) {
            return;
        }
        aura.drop_event = None;
        tracing::trace!(target: "aura::events", aura = %event.aura, event = event.id.0, "charge drop fired");
        self.modify_charges(event.aura, -1, event.remove_mode);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aura::AuraCreateInfo;
    use crate::env::{AuraEnv, FixedRng, MemoryUnit, MemoryWorld};
    use crate::spell::{AuraType, SpellCatalog, SpellEffectInfo, SpellEffectKind, SpellInfo};
    use crate::state::AuraState;
    use crate::types::{ObjectGuid, Position, SpellId};

    const SUNDER: SpellId = SpellId(7386);
    const RIP: SpellId = SpellId(1079);
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
                SpellInfo::new(RIP, "Rip")
                    .with_duration(12_000)
                    .with_attributes(SpellAttributes::PERIODIC_REFRESH_EXTENDS)
                    .with_effect(
                        SpellEffectInfo::new(0, SpellEffectKind::ApplyAura, AuraType::PeriodicDamage)
                            .with_base_points(30)
                            .with_amplitude(2000),
                    ),
            )
            .with_spell(
                SpellInfo::new(SHIELD, "Lightning Shield")
                    .with_duration(600_000)
                    .with_proc_charges(3)
                    .with_effect(SpellEffectInfo::new(
                        0,
                        SpellEffectKind::ApplyAura,
                        AuraType::ProcTriggerSpell,
                    )),
            )
    }

    fn world() -> MemoryWorld {
        MemoryWorld::new()
            .with_unit(MemoryUnit::new(ObjectGuid::player(1), Position::ORIGIN))
            .with_unit(MemoryUnit::new(ObjectGuid::unit(2), Position::ORIGIN).with_faction(2).with_health(1000))
    }

    #[test]
    fn stacks_clamp_and_zero_removes() {
        let catalog = catalog();
        let mut world = world();
        let mut state = AuraState::default();
        let mut engine = AuraEngine::new(&mut state, AuraEnv::new(&catalog, &FixedRng::NEVER), &mut world);
        let target = ObjectGuid::unit(2);

        let id = engine
            .create_aura(AuraCreateInfo::new(SUNDER, target).with_caster(ObjectGuid::player(1)))
            .expect("created");
        assert!(!engine.modify_stack_amount(id, 10, RemoveMode::Default, true));
        let aura = engine.aura(id).expect("live");
        assert_eq!(aura.stack_amount(), 5);
        assert_eq!(aura.effect(0).map(|effect| effect.amount()), Some(-450));

        assert!(!engine.modify_stack_amount(id, -2, RemoveMode::Default, true));
        assert_eq!(engine.aura(id).map(|aura| aura.stack_amount()), Some(3));
        assert!(engine.modify_stack_amount(id, -3, RemoveMode::EnemySpell, true));
        assert!(engine.aura(id).is_none());
        drop(engine);

        assert_eq!(world.modifier_total(target, AuraType::ModResistance), 0);
    }

    #[test]
    fn pandemic_refresh_carries_over_remaining_time() {
        let catalog = catalog();
        let mut world = world();
        let mut state = AuraState::default();
        let mut engine = AuraEngine::new(&mut state, AuraEnv::new(&catalog, &FixedRng::NEVER), &mut world);

        let id = engine
            .create_aura(AuraCreateInfo::new(RIP, ObjectGuid::unit(2)).with_caster(ObjectGuid::player(1)))
            .expect("created");
        engine.update(9000);
        engine.refresh_timers(id, true);
        // 3000 left, capped by 30% of 12000 = 3600
        assert_eq!(engine.aura(id).map(|aura| aura.duration()), Some(15_000));

        engine.update(2000);
        engine.refresh_timers(id, true);
        // 13000 left, only 3600 carry over
        assert_eq!(engine.aura(id).map(|aura| aura.duration()), Some(15_600));
    }

    #[test]
    fn charges_clamp_to_maximum() {
        let catalog = catalog();
        let mut world = world();
        let mut state = AuraState::default();
        let mut engine = AuraEngine::new(&mut state, AuraEnv::new(&catalog, &FixedRng::NEVER), &mut world);
        let shaman = ObjectGuid::player(1);

        let id = engine
            .create_aura(AuraCreateInfo::new(SHIELD, shaman).with_caster(shaman))
            .expect("created");
        assert_eq!(engine.aura(id).map(|aura| aura.charges()), Some(3));

        assert!(!engine.modify_charges(id, 5, RemoveMode::Default));
        assert_eq!(engine.aura(id).map(|aura| aura.charges()), Some(3));
        assert!(!engine.modify_charges(id, -2, RemoveMode::Default));
        assert_eq!(engine.aura(id).map(|aura| aura.charges()), Some(1));
        assert!(engine.modify_charges(id, -1, RemoveMode::Default));
        assert!(engine.aura(id).is_none());
    }

    #[test]
    fn facet_queries_follow_duration_changes() {
        let catalog = catalog();
        let mut world = world();
        let mut state = AuraState::default();
        let mut engine = AuraEngine::new(&mut state, AuraEnv::new(&catalog, &FixedRng::NEVER), &mut world);
        let warrior = ObjectGuid::player(1);
        let target = ObjectGuid::unit(2);

        let sunder = engine
            .create_aura(AuraCreateInfo::new(SUNDER, target).with_caster(warrior))
            .expect("sunder");
        let owned_permanent = |engine: &AuraEngine<'_>| {
            engine.state().holder(target).map(|holder| holder.owned().query().is_permanent(true).ids())
        };
        assert_eq!(owned_permanent(&engine), Some(vec![]));

        engine.set_duration(sunder, -1, true);
        assert_eq!(owned_permanent(&engine), Some(vec![sunder]));
        assert!(engine
            .state()
            .holder(target)
            .is_some_and(|holder| holder.applied().query().is_permanent(true).exists()));

        // a new stack restarts the timer at the spell's duration
        assert!(!engine.modify_stack_amount(sunder, 1, RemoveMode::Default, true));
        assert_eq!(engine.aura(sunder).map(|aura| aura.duration()), Some(30_000));
        assert_eq!(owned_permanent(&engine), Some(vec![]));
    }

    #[test]
    fn delayed_drop_fires_once_and_blocks_expiry() {
        let catalog = catalog();
        let mut world = world();
        let mut state = AuraState::default();
        let mut engine = AuraEngine::new(&mut state, AuraEnv::new(&catalog, &FixedRng::NEVER), &mut world);
        let shaman = ObjectGuid::player(1);

        let id = engine
            .create_aura(AuraCreateInfo::new(SHIELD, shaman).with_caster(shaman))
            .expect("created");
        engine.drop_charge_delayed(id, 50, RemoveMode::Default);
        engine.drop_charge_delayed(id, 50, RemoveMode::Default);
        assert!(engine.aura(id).is_some_and(|aura| aura.has_pending_charge_drop()));

        engine.update(49);
        assert_eq!(engine.aura(id).map(|aura| aura.charges()), Some(3));
        engine.update(1);
        assert_eq!(engine.aura(id).map(|aura| aura.charges()), Some(2));
        assert!(engine.state().events().is_empty());
    }
}

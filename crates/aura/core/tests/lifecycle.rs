use aura_core::{
    AuraConfig, AuraCreateInfo, AuraEngine, AuraEnv, AuraState, AuraType, FixedRng, MemoryUnit,
    MemoryWorld, ObjectGuid, Position, RemoveMode, SpellAttributes, SpellCatalog, SpellEffectInfo,
    SpellEffectKind, SpellId, SpellInfo, UnitStateFlags,
};

const CORRUPTION: SpellId = SpellId(172);
const DEVOTION: SpellId = SpellId(465);
const SUNDER: SpellId = SpellId(7386);
const STUN: SpellId = SpellId(853);
const SOULSTONE: SpellId = SpellId(20707);
const CONSECRATION: SpellId = SpellId(26573);
const BLIZZARD: SpellId = SpellId(10);

fn catalog() -> SpellCatalog {
    SpellCatalog::new()
        .with_spell(
            SpellInfo::new(CORRUPTION, "Corruption")
                .with_duration(6000)
                .with_effect(
                    SpellEffectInfo::new(0, SpellEffectKind::ApplyAura, AuraType::PeriodicDamage)
                        .with_base_points(12)
                        .with_amplitude(2000),
                ),
        )
        .with_spell(
            SpellInfo::new(DEVOTION, "Devotion Aura")
                .with_attributes(SpellAttributes::PASSIVE)
                .with_effect(
                    SpellEffectInfo::new(0, SpellEffectKind::ApplyAreaAuraRaid, AuraType::ModResistance)
                        .with_base_points(55)
                        .with_radius(30.0),
                ),
        )
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
            SpellInfo::new(CONSECRATION, "Consecration")
                .with_duration(30_000)
                .with_effect(
                    SpellEffectInfo::new(0, SpellEffectKind::ApplyAreaAuraEnemy, AuraType::ModDecreaseSpeed)
                        .with_base_points(-30)
                        .with_radius(8.0),
                ),
        )
        .with_spell(
            SpellInfo::new(BLIZZARD, "Blizzard")
                .with_duration(8000)
                .with_effect(
                    SpellEffectInfo::new(0, SpellEffectKind::PersistentAreaAura, AuraType::PeriodicDamage)
                        .with_base_points(25)
                        .with_amplitude(1000),
                ),
        )
}

fn world() -> MemoryWorld {
    MemoryWorld::new()
        .with_unit(MemoryUnit::new(ObjectGuid::player(1), Position::ORIGIN).in_group(1))
        .with_unit(MemoryUnit::new(ObjectGuid::player(2), Position::new(10.0, 0.0, 0.0)).in_group(1))
        .with_unit(
            MemoryUnit::new(ObjectGuid::unit(7), Position::new(5.0, 0.0, 0.0))
                .with_faction(14)
                .with_health(1000),
        )
}

/// Every binding carries a subset of its aura's effects.
fn assert_bindings_within_effects(state: &AuraState) {
    for aura in state.auras().filter(|aura| !aura.is_removed()) {
        for binding in aura.applications() {
            assert!(
                aura.effect_mask().contains(binding.effect_mask()),
                "binding of {} on {} carries unknown effects",
                aura.id(),
                binding.target()
            );
        }
    }
}

#[test]
fn damage_over_time_ticks_then_expires() {
    let catalog = catalog();
    let mut world = world();
    let mut state = AuraState::default();
    let warlock = ObjectGuid::player(1);
    let mob = ObjectGuid::unit(7);

    let id = {
        let mut engine = AuraEngine::new(&mut state, AuraEnv::new(&catalog, &FixedRng::NEVER), &mut world);
        let id = engine
            .create_aura(AuraCreateInfo::new(CORRUPTION, mob).with_caster(warlock))
            .expect("corruption");
        for _ in 0..6 {
            engine.update(1000);
        }
        id
    };

    assert!(state.aura(id).is_none());
    assert!(state.applied_auras(mob).is_empty());
    assert_eq!(world.damage.len(), 3);
    assert!(world.damage.iter().all(|hit| hit.amount == 12 && hit.target == mob));
    assert_eq!(world.unit(mob).map(|unit| unit.health), Some(964));
}

#[test]
fn area_binding_follows_radius() {
    let catalog = catalog();
    let mut state = AuraState::new(AuraConfig::default().with_update_target_map_interval(1000));
    let mut world = world();
    let paladin = ObjectGuid::player(1);
    let priest = ObjectGuid::player(2);

    let id = {
        let mut engine = AuraEngine::new(&mut state, AuraEnv::new(&catalog, &FixedRng::NEVER), &mut world);
        engine
            .create_aura(AuraCreateInfo::new(DEVOTION, paladin).with_caster(paladin))
            .expect("devotion")
    };
    assert_eq!(state.aura(id).map(|aura| aura.targets()), Some(vec![paladin, priest]));
    assert_eq!(world.modifier_total(priest, AuraType::ModResistance), 55);
    assert_bindings_within_effects(&state);

    world.move_to(priest, Position::new(60.0, 0.0, 0.0));
    {
        let mut engine = AuraEngine::new(&mut state, AuraEnv::new(&catalog, &FixedRng::NEVER), &mut world);
        engine.update(500);
        assert_eq!(engine.aura(id).map(|aura| aura.targets().len()), Some(2));
        engine.update(500);
        assert_eq!(engine.aura(id).map(|aura| aura.targets()), Some(vec![paladin]));
    }
    assert_eq!(world.modifier_total(priest, AuraType::ModResistance), 0);
    assert_eq!(world.modifier_total(paladin, AuraType::ModResistance), 55);
    assert_bindings_within_effects(&state);

    world.move_to(priest, Position::new(20.0, 0.0, 0.0));
    {
        let mut engine = AuraEngine::new(&mut state, AuraEnv::new(&catalog, &FixedRng::NEVER), &mut world);
        engine.retarget(id);
    }
    assert_eq!(state.aura(id).map(|aura| aura.targets().len()), Some(2));
    assert_bindings_within_effects(&state);
}

#[test]
fn area_aura_without_targets_is_removed() {
    let catalog = catalog();
    let mut state = AuraState::default();
    let mut world = world();
    let paladin = ObjectGuid::player(1);
    let mob = ObjectGuid::unit(7);

    let id = {
        let mut engine = AuraEngine::new(&mut state, AuraEnv::new(&catalog, &FixedRng::NEVER), &mut world);
        engine
            .create_aura(AuraCreateInfo::new(CONSECRATION, paladin).with_caster(paladin))
            .expect("consecration")
    };
    // the owner is not an enemy: only the mob is bound
    assert_eq!(state.aura(id).map(|aura| aura.targets()), Some(vec![mob]));

    world.move_to(mob, Position::new(40.0, 0.0, 0.0));
    {
        let mut engine = AuraEngine::new(&mut state, AuraEnv::new(&catalog, &FixedRng::NEVER), &mut world);
        engine.retarget(id);
        assert!(engine.aura(id).is_none());
        engine.update(0);
    }
    assert!(state.aura(id).is_none());
    assert!(state.owned_auras(paladin).is_empty());
    assert_eq!(world.modifier_total(mob, AuraType::ModDecreaseSpeed), 0);
}

#[test]
fn refresh_at_max_stacks_restores_duration() {
    let catalog = catalog();
    let mut world = world();
    let mut state = AuraState::default();
    let mut engine = AuraEngine::new(&mut state, AuraEnv::new(&catalog, &FixedRng::NEVER), &mut world);
    let warrior = ObjectGuid::player(1);
    let mob = ObjectGuid::unit(7);

    let request = || AuraCreateInfo::new(SUNDER, mob).with_caster(warrior);
    let first = engine.try_refresh_stack_or_create(request()).expect("created");
    for _ in 0..4 {
        engine.try_refresh_stack_or_create(request()).expect("refreshed");
    }
    engine.update(10_000);
    let aura = engine.aura(first.aura).expect("live");
    assert_eq!((aura.stack_amount(), aura.duration()), (5, 20_000));

    let handle = engine.try_refresh_stack_or_create(request()).expect("refreshed");
    assert!(handle.refreshed);
    let aura = engine.aura(first.aura).expect("live");
    assert_eq!((aura.stack_amount(), aura.duration()), (5, 30_000));
}

#[test]
fn calls_on_removed_aura_change_nothing() {
    let catalog = catalog();
    let mut world = world();
    let mut state = AuraState::default();
    let paladin = ObjectGuid::player(1);
    let mob = ObjectGuid::unit(7);

    {
        let mut engine = AuraEngine::new(&mut state, AuraEnv::new(&catalog, &FixedRng::NEVER), &mut world);
        let id = engine
            .create_aura(AuraCreateInfo::new(STUN, mob).with_caster(paladin))
            .expect("stun");
        engine.remove_aura(id, RemoveMode::Cancel);

        engine.retarget(id);
        engine.refresh_timers(id, true);
        engine.set_duration(id, 6000, true);
        assert!(!engine.modify_stack_amount(id, 1, RemoveMode::Default, true));
        assert!(!engine.modify_charges(id, 1, RemoveMode::Default));
        engine.remove_aura(id, RemoveMode::Cancel);

        let removed = engine.state().aura(id).expect("kept until the update ends");
        assert!(removed.is_removed());
        assert!(removed.targets().is_empty());
        assert!(engine.state().applied_auras(mob).is_empty());
        engine.update(0);
        assert!(engine.state().aura(id).is_none());
    }
    assert!(!world.has_unit_state(mob, UnitStateFlags::STUNNED));
}

#[test]
fn expired_area_owner_leaves_no_holder() {
    let catalog = catalog();
    let area = ObjectGuid::dynamic_object(1);
    let mut world = world().with_unit(MemoryUnit::new(area, Position::new(5.0, 0.0, 0.0)));
    let mut state = AuraState::default();
    let mage = ObjectGuid::player(1);
    let mob = ObjectGuid::unit(7);

    {
        let mut engine = AuraEngine::new(&mut state, AuraEnv::new(&catalog, &FixedRng::NEVER), &mut world);
        engine
            .create_aura(AuraCreateInfo::new(BLIZZARD, area).with_caster(mage).with_radius(3.0))
            .expect("blizzard");
        assert!(engine.state().holder(area).is_some());
        for _ in 0..8 {
            engine.update(1000);
        }
    }
    assert_eq!(state.aura_count(), 0);
    assert!(state.holder(area).is_none());
    assert!(state.holder(mob).is_none());
    assert_eq!(state.holders().count(), 0);

    // despawn drops the holder right away
    let mut engine = AuraEngine::new(&mut state, AuraEnv::new(&catalog, &FixedRng::NEVER), &mut world);
    engine
        .create_aura(AuraCreateInfo::new(STUN, mob).with_caster(mage))
        .expect("stun");
    engine.remove_unit(mob);
    assert!(engine.state().holder(mob).is_none());
    assert!(engine.state().applied_auras(mob).is_empty());
}

#[test]
fn stacks_clamp_to_spell_maximum() {
    let catalog = catalog();
    let mut world = world();
    let mut state = AuraState::default();
    let mut engine = AuraEngine::new(&mut state, AuraEnv::new(&catalog, &FixedRng::NEVER), &mut world);
    let warrior = ObjectGuid::player(1);
    let mob = ObjectGuid::unit(7);

    let request = || AuraCreateInfo::new(SUNDER, mob).with_caster(warrior);
    let first = engine.try_refresh_stack_or_create(request()).expect("created");
    for _ in 0..7 {
        engine.try_refresh_stack_or_create(request()).expect("refreshed");
    }
    let aura = engine.aura(first.aura).expect("live");
    assert_eq!(aura.stack_amount(), 5);
    assert_eq!(aura.effect(0).map(|effect| effect.amount()), Some(-450));
    drop(engine);

    assert_eq!(world.modifier_total(mob, AuraType::ModResistance), -450);
}

#[test]
fn death_strips_everything_but_persistent_auras() {
    let catalog = catalog();
    let mut world = world();
    let mut state = AuraState::default();
    let player = ObjectGuid::player(2);
    let mob = ObjectGuid::unit(7);

    {
        let mut engine = AuraEngine::new(&mut state, AuraEnv::new(&catalog, &FixedRng::NEVER), &mut world);
        engine
            .create_aura(AuraCreateInfo::new(STUN, player).with_caster(mob))
            .expect("stun");
        engine
            .create_aura(AuraCreateInfo::new(SOULSTONE, player).with_caster(ObjectGuid::player(1)))
            .expect("soulstone");
    }
    assert!(world.has_unit_state(player, UnitStateFlags::STUNNED));

    world.kill(player);
    {
        let mut engine = AuraEngine::new(&mut state, AuraEnv::new(&catalog, &FixedRng::NEVER), &mut world);
        engine.remove_auras_on_death(player);
        engine.update(0);
    }
    assert!(!world.has_unit_state(player, UnitStateFlags::STUNNED));
    assert!(state.find_owned(player, STUN, None).is_none());
    assert!(state.find_owned(player, SOULSTONE, None).is_some());
}

#[test]
fn cancelled_aura_is_gone_after_update() {
    let catalog = catalog();
    let mut world = world();
    let mut state = AuraState::default();
    let mut engine = AuraEngine::new(&mut state, AuraEnv::new(&catalog, &FixedRng::NEVER), &mut world);
    let mob = ObjectGuid::unit(7);

    let id = engine
        .create_aura(AuraCreateInfo::new(STUN, mob).with_caster(ObjectGuid::player(1)))
        .expect("stun");
    engine.remove_aura(id, RemoveMode::Cancel);
    assert!(engine.aura(id).is_none());
    assert!(engine.state().aura(id).is_some_and(|aura| aura.is_removed()));

    engine.update(0);
    assert!(engine.state().aura(id).is_none());
}

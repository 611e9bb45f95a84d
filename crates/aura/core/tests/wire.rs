use aura_core::types::CastId;
use aura_core::{
    AuraCreateInfo, AuraData, AuraEngine, AuraEnv, AuraFlags, AuraState, AuraType, AuraUpdate,
    AuraUpdatePacket, EffectMask, FixedRng, MemoryUnit, MemoryWorld, ObjectGuid, Position,
    RemoveMode, SpellCatalog, SpellEffectInfo, SpellEffectKind, SpellId, SpellInfo,
};

fn fortitude() -> AuraData {
    AuraData {
        cast_id: CastId(0x10),
        spell: SpellId(1243),
        visual: 0,
        flags: AuraFlags::POSITIVE | AuraFlags::DURATION,
        active_mask: EffectMask(0b1),
        cast_level: 60,
        applications: 0,
        caster: Some(ObjectGuid(7)),
        duration: 1_800_000,
        remaining: 1000,
        points: Vec::new(),
        estimated_points: Vec::new(),
    }
}

#[test]
fn removal_packet_layout() {
    let mut packet = AuraUpdatePacket::new(ObjectGuid(0x0102));
    packet.push(AuraUpdate::removal(3));

    let expected = concat!("0201000000000000", "00", "0100", "0300", "00");
    assert_eq!(hex::encode(packet.encode()), expected);
}

#[test]
fn data_entry_with_caster_and_duration() {
    let update = AuraUpdate {
        slot: 2,
        data: Some(fortitude()),
    };

    let expected = concat!(
        "0200",             // slot
        "01",               // has data
        "1000000000000000", // cast id
        "db040000",         // spell
        "00000000",         // visual
        "0600",             // flags
        "01000000",         // active mask
        "3c00",             // cast level
        "00",               // applications
        "01",               // has caster
        "0700000000000000", // caster
        "40771b00",         // duration
        "e8030000",         // remaining
    );
    assert_eq!(hex::encode(update.encode()), expected);
}

#[test]
fn scalable_entry_appends_points() {
    let mut data = fortitude();
    data.flags = AuraFlags::SCALABLE;
    data.caster = None;
    data.points = vec![1.0];
    let update = AuraUpdate {
        slot: 0,
        data: Some(data),
    };

    let encoded = hex::encode(update.encode());
    // Duration is skipped without the flag; one point, no estimates.
    assert!(encoded.ends_with(concat!("00", "01", "0000803f", "00")));
    assert_eq!(encoded.len(), (29 + 1 + 4 + 1) * 2);
}

#[test]
fn update_all_packet_lists_every_slot() {
    let mut packet = AuraUpdatePacket::new(ObjectGuid(1));
    packet.update_all = true;
    packet.push(AuraUpdate {
        slot: 0,
        data: Some(fortitude()),
    });
    packet.push(AuraUpdate::removal(1));

    let bytes = packet.encode();
    assert_eq!(hex::encode(&bytes[..11]), "0100000000000000010200");
    assert_eq!(hex::encode(&bytes[bytes.len() - 3..]), "010000");
}

#[test]
fn engine_flush_encodes_removed_slot() {
    let priest = ObjectGuid::player(1);
    let spell = SpellId(1243);
    let catalog = SpellCatalog::new().with_spell(
        SpellInfo::new(spell, "Power Word: Fortitude")
            .with_duration(1_800_000)
            .with_effect(
                SpellEffectInfo::new(0, SpellEffectKind::ApplyAura, AuraType::ModStat)
                    .with_base_points(3),
            ),
    );
    let mut world = MemoryWorld::new().with_unit(MemoryUnit::new(priest, Position::ORIGIN));
    let mut state = AuraState::default();
    {
        let mut engine = AuraEngine::new(&mut state, AuraEnv::new(&catalog, &FixedRng::NEVER), &mut world);
        let id = engine
            .create_aura(AuraCreateInfo::new(spell, priest).with_caster(priest))
            .expect("fortitude");
        engine.update(0);
        engine.remove_aura(id, RemoveMode::Cancel);
        engine.update(0);
    }

    assert_eq!(world.packets.len(), 2);
    let target = hex::encode(priest.0.to_le_bytes());

    let added = world.packets[0].encode();
    assert_eq!(hex::encode(&added[..8]), target);
    assert_eq!(hex::encode(&added[8..14]), "000100000001");

    let removed = hex::encode(world.packets[1].encode());
    assert_eq!(removed, format!("{target}000100000000"));
}

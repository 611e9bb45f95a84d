use std::fs;
use std::path::{Path, PathBuf};

use aura_content::{ContentFactory, ScenarioAction, SpellCatalogLoader};
use aura_core::{AuraConfig, AuraType, SpellAttributes, SpellId, SpellOracle};

fn demos_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../../../demos")
}

#[test]
fn bundled_demo_content_loads() {
    let factory = ContentFactory::new(demos_dir());

    let catalog = factory.load_catalog().expect("demo catalog");
    let devotion = catalog.spell(SpellId(465)).expect("devotion aura");
    assert!(devotion.has_attribute(SpellAttributes::PASSIVE));
    assert_eq!(devotion.effects[0].aura, AuraType::ModResistance);

    let config = factory.load_config().expect("demo config");
    assert_eq!(config.update_target_map_interval, 500);

    let scenario = factory.load_scenario("duel").expect("demo scenario");
    // Every cast in the demo refers to a spell in the demo catalog.
    for step in &scenario.timeline {
        if let ScenarioAction::Apply { spell, .. } = &step.action {
            assert!(catalog.spell(*spell).is_some(), "spell {spell} missing");
        }
    }
}

#[test]
fn factory_reads_files_from_data_dir() {
    let dir = tempfile::tempdir().expect("tempdir");
    fs::create_dir(dir.path().join("scenarios")).expect("scenarios dir");

    // A catalog with one periodic spell.
    fs::write(
        dir.path().join("spells.ron"),
        r#"#![enable(unwrap_newtypes)]
        (spells: [(
            id: 139,
            name: "Renew",
            duration: Some(15000),
            effects: [(index: 0, effect: ApplyAura, aura: PeriodicHeal, base_points: 45, amplitude: 3000)],
        )])"#,
    )
    .expect("write catalog");

    // Config overriding one tunable.
    fs::write(dir.path().join("config.toml"), "[aura]\ncharge_drop_delay = 75\n").expect("write config");

    fs::write(
        dir.path().join("scenarios/heal.ron"),
        r#"#![enable(unwrap_newtypes)]
        (
            name: "heal",
            duration: 3000,
            units: [(name: "priest", kind: Player, id: 1, position: (x: 0.0, y: 0.0, z: 0.0))],
            timeline: [(at: 0, action: Apply(spell: 139, caster: "priest", target: "priest"))],
        )"#,
    )
    .expect("write scenario");

    let factory = ContentFactory::new(dir.path());
    let catalog = factory.load_catalog().expect("catalog");
    let renew = catalog.spell(SpellId(139)).expect("renew");
    assert_eq!(renew.effects[0].amplitude, 3000);

    let config = factory.load_config().expect("config");
    assert_eq!(
        config,
        AuraConfig {
            charge_drop_delay: 75,
            ..AuraConfig::default()
        }
    );

    let scenario = factory.load_scenario("heal").expect("scenario");
    assert_eq!(scenario.units.len(), 1);
    assert!(factory.load_scenario("missing").is_err());
}

#[test]
fn parse_errors_name_the_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("broken.ron");
    fs::write(&path, "(spells: [(id: ").expect("write");

    let err = SpellCatalogLoader::load(&path).expect_err("broken catalog");
    assert!(err.to_string().contains("broken.ron"));
}

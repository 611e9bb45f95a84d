//! Spell catalog loader.

use std::collections::HashSet;
use std::path::Path;

use aura_core::spell::SpellGroup;
use aura_core::{AuraConfig, SpellCatalog, SpellId, SpellInfo};
use serde::{Deserialize, Serialize};

use crate::loaders::{LoadResult, read_file};

/// Spell catalog structure for RON files.
///
/// ```ron
/// #![enable(unwrap_newtypes)]
/// (
///     groups: [(id: 1, rule: ExclusiveHighest)],
///     spells: [
///         (
///             id: 172,
///             name: "Corruption",
///             duration: Some(12000),
///             effects: [(index: 0, effect: ApplyAura, aura: PeriodicDamage, base_points: 40, amplitude: 3000)],
///         ),
///     ],
/// )
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogFile {
    pub groups: Vec<SpellGroup>,
    pub spells: Vec<SpellInfo>,
}

/// Loader for spell catalogs from RON files.
pub struct SpellCatalogLoader;

impl SpellCatalogLoader {
    /// Load a spell catalog from a RON file.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the RON file containing a [`CatalogFile`]
    ///
    /// # Returns
    ///
    /// Returns a validated [`SpellCatalog`].
    pub fn load(path: &Path) -> LoadResult<SpellCatalog> {
        let content = read_file(path)?;
        Self::parse(&content)
            .map_err(|e| anyhow::anyhow!("Failed to load spell catalog {}: {}", path.display(), e))
    }

    /// Parse a catalog document already in memory.
    pub fn parse(content: &str) -> LoadResult<SpellCatalog> {
        let file: CatalogFile = ron::from_str(content)
            .map_err(|e| anyhow::anyhow!("Failed to parse spell catalog RON: {}", e))?;
        Self::build(file)
    }

    /// Validate a parsed catalog and index it.
    pub fn build(file: CatalogFile) -> LoadResult<SpellCatalog> {
        let mut catalog = SpellCatalog::new();

        let mut group_ids = HashSet::new();
        for group in file.groups {
            if !group_ids.insert(group.id) {
                anyhow::bail!("Duplicate spell group {}", group.id);
            }
            catalog.insert_group(group);
        }

        let known: HashSet<SpellId> = file.spells.iter().map(|spell| spell.id).collect();
        let mut seen = HashSet::new();
        for spell in file.spells {
            if !seen.insert(spell.id) {
                anyhow::bail!("Duplicate spell {} ('{}')", spell.id, spell.name);
            }
            validate_spell(&spell)?;

            for group in spell.groups.iter().filter(|group| !group_ids.contains(group)) {
                tracing::warn!(
                    target: "aura::content",
                    spell = %spell.id,
                    group = *group,
                    "spell references an undeclared group"
                );
            }
            for trigger in spell
                .effects
                .iter()
                .filter_map(|effect| effect.trigger_spell)
                .filter(|trigger| !known.contains(trigger))
            {
                tracing::warn!(
                    target: "aura::content",
                    spell = %spell.id,
                    trigger = %trigger,
                    "trigger spell not in catalog"
                );
            }

            catalog.insert(spell);
        }

        tracing::debug!(
            target: "aura::content",
            spells = catalog.len(),
            groups = group_ids.len(),
            "spell catalog loaded"
        );
        Ok(catalog)
    }
}

fn validate_spell(spell: &SpellInfo) -> LoadResult<()> {
    let mut indices = HashSet::new();
    for effect in &spell.effects {
        if usize::from(effect.index) >= AuraConfig::MAX_SPELL_EFFECTS {
            anyhow::bail!(
                "Spell {} ('{}'): effect index {} exceeds the limit of {}",
                spell.id,
                spell.name,
                effect.index,
                AuraConfig::MAX_SPELL_EFFECTS
            );
        }
        if !indices.insert(effect.index) {
            anyhow::bail!(
                "Spell {} ('{}'): effect index {} declared twice",
                spell.id,
                spell.name,
                effect.index
            );
        }
        if effect.amplitude < 0 {
            anyhow::bail!(
                "Spell {} ('{}'): effect {} has a negative amplitude",
                spell.id,
                spell.name,
                effect.index
            );
        }
    }
    if spell.duration.is_some_and(|duration| duration < -1) {
        anyhow::bail!("Spell {} ('{}'): invalid duration", spell.id, spell.name);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use aura_core::SpellOracle;
    use aura_core::spell::SpellGroupStackRule;

    #[test]
    fn parses_groups_and_spells() {
        let catalog = SpellCatalogLoader::parse(
            r#"#![enable(unwrap_newtypes)]
            (
                groups: [(id: 7, rule: ExclusiveHighest)],
                spells: [
                    (id: 1, name: "Battle Shout", groups: [7]),
                    (id: 2, name: "Blessing of Might", groups: [7], duration: Some(300000)),
                ],
            )"#,
        )
        .expect("catalog parses");

        assert_eq!(catalog.len(), 2);
        let shout = catalog.spell(SpellId(1)).expect("shout");
        let might = catalog.spell(SpellId(2)).expect("might");
        assert_eq!(might.duration, Some(300_000));
        assert_eq!(
            catalog.group_stack_rule(&shout, &might),
            SpellGroupStackRule::ExclusiveHighest
        );
    }

    #[test]
    fn rejects_duplicate_spell_ids() {
        let err = SpellCatalogLoader::parse(
            r#"#![enable(unwrap_newtypes)]
            (spells: [(id: 5, name: "a"), (id: 5, name: "b")])"#,
        )
        .expect_err("duplicate ids");
        assert!(err.to_string().contains("Duplicate spell"));
    }

    #[test]
    fn rejects_repeated_effect_index() {
        let err = SpellCatalogLoader::parse(
            r#"#![enable(unwrap_newtypes)]
            (spells: [(id: 5, name: "Twice", effects: [(index: 1), (index: 1)])])"#,
        )
        .expect_err("repeated index");
        assert!(err.to_string().contains("declared twice"));
    }
}

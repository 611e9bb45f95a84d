//! Spell database access.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use super::info::SpellInfo;
use super::kinds::SpellGroupStackRule;
use crate::types::SpellId;

/// Read-only access to static spell definitions.
pub trait SpellOracle: Send + Sync {
    fn spell(&self, id: SpellId) -> Option<Arc<SpellInfo>>;

    /// Strongest stacking rule among the groups both spells belong to.
    fn group_stack_rule(&self, a: &SpellInfo, b: &SpellInfo) -> SpellGroupStackRule;
}

/// Named set of spells sharing one stacking rule.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SpellGroup {
    pub id: u32,
    pub rule: SpellGroupStackRule,
}

/// In-memory spell database.
#[derive(Clone, Debug, Default)]
pub struct SpellCatalog {
    spells: HashMap<SpellId, Arc<SpellInfo>>,
    groups: BTreeMap<u32, SpellGroupStackRule>,
}

impl SpellCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, spell: SpellInfo) -> Arc<SpellInfo> {
        let spell = Arc::new(spell);
        self.spells.insert(spell.id, Arc::clone(&spell));
        spell
    }

    pub fn with_spell(mut self, spell: SpellInfo) -> Self {
        self.insert(spell);
        self
    }

    pub fn insert_group(&mut self, group: SpellGroup) {
        self.groups.insert(group.id, group.rule);
    }

    pub fn with_group(mut self, id: u32, rule: SpellGroupStackRule) -> Self {
        self.groups.insert(id, rule);
        self
    }

    pub fn len(&self) -> usize {
        self.spells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spells.is_empty()
    }

    /// Spells ordered by id.
    pub fn spells(&self) -> Vec<Arc<SpellInfo>> {
        let mut spells: Vec<_> = self.spells.values().cloned().collect();
        spells.sort_by_key(|spell| spell.id);
        spells
    }
}

impl SpellOracle for SpellCatalog {
    fn spell(&self, id: SpellId) -> Option<Arc<SpellInfo>> {
        self.spells.get(&id).cloned()
    }

    fn group_stack_rule(&self, a: &SpellInfo, b: &SpellInfo) -> SpellGroupStackRule {
        a.groups
            .iter()
            .filter(|group| b.groups.contains(group))
            .filter_map(|group| self.groups.get(group).copied())
            .max()
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strongest_shared_group_rule_wins() {
        let mut a = SpellInfo::new(SpellId(1), "Battle Shout");
        a.groups = vec![10, 11];
        let mut b = SpellInfo::new(SpellId(2), "Blessing of Might");
        b.groups = vec![11, 12, 10];
        let mut c = SpellInfo::new(SpellId(3), "Unrelated");
        c.groups = vec![99];

        let catalog = SpellCatalog::new()
            .with_group(10, SpellGroupStackRule::ExclusiveFromSameCaster)
            .with_group(11, SpellGroupStackRule::ExclusiveHighest)
            .with_group(12, SpellGroupStackRule::Exclusive);

        assert_eq!(
            catalog.group_stack_rule(&a, &b),
            SpellGroupStackRule::ExclusiveHighest
        );
        assert_eq!(catalog.group_stack_rule(&a, &c), SpellGroupStackRule::Default);
    }

    #[test]
    fn spells_are_sorted_by_id() {
        let catalog = SpellCatalog::new()
            .with_spell(SpellInfo::new(SpellId(9), "b"))
            .with_spell(SpellInfo::new(SpellId(3), "a"));

        let ids: Vec<_> = catalog.spells().iter().map(|spell| spell.id).collect();
        assert_eq!(ids, vec![SpellId(3), SpellId(9)]);
        assert!(catalog.spell(SpellId(3)).is_some());
        assert!(catalog.spell(SpellId(4)).is_none());
    }
}

//! Indexed sets of owned and applied auras.
//!
//! Each unit keeps two collections: the auras it owns and the auras bound to
//! it. Both are indexed by the same facets (spell, caster, labels, boolean
//! flags and so on) so that removal and lookup paths ("all non-passive auras
//! that do not survive death", "auras of this spell from this caster") are
//! answered from the index instead of a scan.
mod facets;
mod query;
mod store;

pub use facets::{ApplicationEntry, AuraFacets, Facet, FacetFlags, Indexed};
pub use query::IndexQuery;
pub use store::{IndexedCollection, IndexedStore};

use crate::types::{AuraId, EffectMask};

/// Auras owned by one unit or dynamic object.
pub type AuraCollection = IndexedCollection<AuraFacets>;

/// Auras bound to one unit.
pub type AuraApplicationCollection = IndexedCollection<ApplicationEntry>;

impl IndexedCollection<ApplicationEntry> {
    pub fn set_slot(&self, aura: AuraId, slot: Option<u8>) -> bool {
        self.update(aura, |entry| entry.slot = slot)
    }

    pub fn set_effect_mask(&self, aura: AuraId, mask: EffectMask) -> bool {
        self.update(aura, |entry| entry.effect_mask = mask)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spell::{AuraStateType, DiminishingGroup, DispelType};
    use crate::types::{AuraFlags, CastId, ObjectGuid, SpellId};

    fn facets(id: u64, spell: u32, caster: u64, flags: FacetFlags) -> AuraFacets {
        AuraFacets {
            id: AuraId(id),
            spell: SpellId(spell),
            caster: Some(ObjectGuid::player(caster)),
            cast_item: None,
            cast_id: CastId(id),
            owner: ObjectGuid::player(1),
            labels: vec![spell * 10],
            diminishing_group: DiminishingGroup::None,
            caster_aura_state: AuraStateType::None,
            dispel: DispelType::Magic,
            category: 0,
            flags,
        }
    }

    fn populated() -> AuraCollection {
        let collection = AuraCollection::new();
        collection.insert(facets(1, 100, 1, FacetFlags::PASSIVE));
        collection.insert(facets(2, 200, 2, FacetFlags::empty()));
        collection.insert(facets(3, 200, 3, FacetFlags::DEATH_PERSISTENT));
        collection.insert(facets(4, 300, 2, FacetFlags::NEGATIVE));
        collection
    }

    #[test]
    fn first_predicate_seeds_and_later_ones_narrow() {
        let collection = populated();

        assert_eq!(
            collection.query().has_spell(SpellId(200)).ids(),
            vec![AuraId(2), AuraId(3)]
        );
        assert_eq!(
            collection
                .query()
                .has_spell(SpellId(200))
                .has_caster(ObjectGuid::player(2))
                .ids(),
            vec![AuraId(2)]
        );
        assert_eq!(collection.query().has_label(3000).first(), Some(AuraId(4)));
        assert!(!collection.query().has_spell(SpellId(999)).exists());
    }

    #[test]
    fn absent_polarity_uses_complement() {
        let collection = populated();

        // removal on death: not passive and not death persistent
        let doomed = collection
            .query()
            .is_passive(false)
            .is_death_persistent(false)
            .ids();
        assert_eq!(doomed, vec![AuraId(2), AuraId(4)]);

        assert_eq!(collection.query().is_positive(false).ids(), vec![AuraId(4)]);
        assert_eq!(collection.query().count(), 4);
    }

    #[test]
    fn update_reindexes_entry() {
        let collection = populated();
        collection.update(AuraId(2), |entry| entry.flags |= FacetFlags::PASSIVE);

        assert_eq!(
            collection.query().is_passive(true).ids(),
            vec![AuraId(1), AuraId(2)]
        );
        assert!(collection.remove(AuraId(1)).is_some());
        assert_eq!(collection.query().is_passive(true).ids(), vec![AuraId(2)]);
        assert!(!collection.contains(AuraId(1)));
    }

    #[test]
    fn application_entries_track_slot() {
        let applied = AuraApplicationCollection::new();
        applied.insert(ApplicationEntry {
            facets: facets(9, 100, 1, FacetFlags::empty()),
            target: ObjectGuid::player(1),
            slot: None,
            effect_mask: EffectMask(0b1),
            flags: AuraFlags::POSITIVE,
        });

        assert!(applied.set_slot(AuraId(9), Some(4)));
        let entry = applied.get(AuraId(9)).expect("entry present");
        assert_eq!(entry.slot, Some(4));
        assert_eq!(
            applied
                .query()
                .filter(|entry| entry.slot == Some(4))
                .has_dispel(DispelType::Magic)
                .ids(),
            vec![AuraId(9)]
        );
    }
}

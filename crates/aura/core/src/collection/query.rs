use std::collections::HashSet;
use std::sync::MutexGuard;

use super::facets::{Facet, FacetFlags, Indexed};
use super::store::IndexedStore;
use crate::spell::{AuraStateType, DiminishingGroup, DispelType};
use crate::types::{AuraId, CastId, ObjectGuid, SpellId};

/// Conjunction of facet predicates over one collection.
///
/// The first predicate seeds the candidate set straight from the index;
/// later ones only narrow it down.
pub struct IndexQuery<'a, E> {
    store: MutexGuard<'a, IndexedStore<E>>,
    candidates: Option<HashSet<AuraId>>,
}

impl<'a, E: Indexed> IndexQuery<'a, E> {
    pub(crate) fn new(store: MutexGuard<'a, IndexedStore<E>>) -> Self {
        Self {
            store,
            candidates: None,
        }
    }

    /// Keeps entries carrying `facet`.
    pub fn matching(mut self, facet: Facet) -> Self {
        let linked = self.store.lookup(&facet);
        self.candidates = Some(match self.candidates.take() {
            None => linked.cloned().unwrap_or_default(),
            Some(mut current) => {
                current.retain(|id| linked.is_some_and(|set| set.contains(id)));
                current
            }
        });
        self
    }

    /// Keeps entries not carrying `facet`.
    pub fn excluding(mut self, facet: Facet) -> Self {
        let linked = self.store.lookup(&facet);
        let outside = |id: &AuraId| linked.is_none_or(|set| !set.contains(id));
        self.candidates = Some(match self.candidates.take() {
            None => self.store.all_ids().filter(|id| outside(id)).collect(),
            Some(mut current) => {
                current.retain(|id| outside(id));
                current
            }
        });
        self
    }

    /// Keeps entries for which `predicate` holds. Not index-backed.
    pub fn filter(mut self, predicate: impl Fn(&E) -> bool) -> Self {
        let store = &self.store;
        let keep = |id: &AuraId| store.get(*id).is_some_and(&predicate);
        self.candidates = Some(match self.candidates.take() {
            None => store.all_ids().filter(|id| keep(id)).collect(),
            Some(mut current) => {
                current.retain(|id| keep(id));
                current
            }
        });
        self
    }

    fn flag(self, flag: FacetFlags, wanted: bool) -> Self {
        if wanted {
            self.matching(Facet::Flag(flag))
        } else {
            self.excluding(Facet::Flag(flag))
        }
    }

    // ===== named predicates =====

    pub fn has_spell(self, spell: SpellId) -> Self {
        self.matching(Facet::Spell(spell))
    }

    pub fn has_caster(self, caster: ObjectGuid) -> Self {
        self.matching(Facet::Caster(caster))
    }

    pub fn has_cast_item(self, item: ObjectGuid) -> Self {
        self.matching(Facet::CastItem(item))
    }

    pub fn has_cast_id(self, cast_id: CastId) -> Self {
        self.matching(Facet::CastId(cast_id))
    }

    pub fn has_owner(self, owner: ObjectGuid) -> Self {
        self.matching(Facet::Owner(owner))
    }

    pub fn has_label(self, label: u32) -> Self {
        self.matching(Facet::Label(label))
    }

    pub fn has_diminishing_group(self, group: DiminishingGroup) -> Self {
        self.matching(Facet::Diminishing(group))
    }

    pub fn has_caster_aura_state(self, state: AuraStateType) -> Self {
        self.matching(Facet::CasterAuraState(state))
    }

    pub fn has_dispel(self, dispel: DispelType) -> Self {
        self.matching(Facet::Dispel(dispel))
    }

    pub fn has_category(self, category: u32) -> Self {
        self.matching(Facet::Category(category))
    }

    pub fn is_single_target(self, wanted: bool) -> Self {
        self.flag(FacetFlags::SINGLE_TARGET, wanted)
    }

    pub fn is_saveable(self, wanted: bool) -> Self {
        self.flag(FacetFlags::SAVEABLE, wanted)
    }

    pub fn is_passive(self, wanted: bool) -> Self {
        self.flag(FacetFlags::PASSIVE, wanted)
    }

    pub fn is_death_persistent(self, wanted: bool) -> Self {
        self.flag(FacetFlags::DEATH_PERSISTENT, wanted)
    }

    pub fn is_permanent(self, wanted: bool) -> Self {
        self.flag(FacetFlags::PERMANENT, wanted)
    }

    pub fn is_positive(self, wanted: bool) -> Self {
        self.flag(FacetFlags::NEGATIVE, !wanted)
    }

    pub fn is_group_buff(self, wanted: bool) -> Self {
        self.flag(FacetFlags::GROUP_BUFF, wanted)
    }

    pub fn requires_dead_target(self, wanted: bool) -> Self {
        self.flag(FacetFlags::REQUIRES_DEAD_TARGET, wanted)
    }

    // ===== terminals =====

    /// Matching ids in ascending order.
    pub fn ids(self) -> Vec<AuraId> {
        let mut ids: Vec<AuraId> = match self.candidates {
            Some(set) => set.into_iter().collect(),
            None => self.store.all_ids().collect(),
        };
        ids.sort_unstable();
        ids
    }

    /// Matching entries ordered by id.
    pub fn entries(self) -> Vec<E>
    where
        E: Clone,
    {
        let store = &self.store;
        let mut ids: Vec<AuraId> = match &self.candidates {
            Some(set) => set.iter().copied().collect(),
            None => store.all_ids().collect(),
        };
        ids.sort_unstable();
        ids.into_iter()
            .filter_map(|id| store.get(id).cloned())
            .collect()
    }

    pub fn count(self) -> usize {
        match &self.candidates {
            Some(set) => set.len(),
            None => self.store.len(),
        }
    }

    /// Lowest matching id.
    pub fn first(self) -> Option<AuraId> {
        match &self.candidates {
            Some(set) => set.iter().min().copied(),
            None => self.store.all_ids().min(),
        }
    }

    pub fn exists(self) -> bool {
        self.count() > 0
    }
}

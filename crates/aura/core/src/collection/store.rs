use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::facets::{Facet, Indexed};
use super::query::IndexQuery;
use crate::types::AuraId;

/// Entries by id plus one id set per facet key.
#[derive(Debug)]
pub struct IndexedStore<E> {
    entries: HashMap<AuraId, E>,
    index: HashMap<Facet, HashSet<AuraId>>,
}

impl<E> Default for IndexedStore<E> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
            index: HashMap::new(),
        }
    }
}

impl<E: Indexed> IndexedStore<E> {
    fn link(&mut self, id: AuraId, entry: &E) {
        for key in entry.facets().keys() {
            self.index.entry(key).or_default().insert(id);
        }
    }

    fn unlink(&mut self, id: AuraId, entry: &E) {
        for key in entry.facets().keys() {
            if let Some(set) = self.index.get_mut(&key) {
                set.remove(&id);
                if set.is_empty() {
                    self.index.remove(&key);
                }
            }
        }
    }

    pub fn insert(&mut self, entry: E) -> Option<E> {
        let id = entry.facets().id;
        let previous = self.entries.remove(&id);
        if let Some(old) = &previous {
            self.unlink(id, old);
        }
        self.link(id, &entry);
        self.entries.insert(id, entry);
        previous
    }

    pub fn remove(&mut self, id: AuraId) -> Option<E> {
        let entry = self.entries.remove(&id)?;
        self.unlink(id, &entry);
        Some(entry)
    }

    /// Mutates an entry in place and re-indexes it.
    pub fn update(&mut self, id: AuraId, f: impl FnOnce(&mut E)) -> bool {
        let Some(mut entry) = self.entries.remove(&id) else {
            return false;
        };
        self.unlink(id, &entry);
        f(&mut entry);
        self.link(id, &entry);
        self.entries.insert(id, entry);
        true
    }

    pub fn get(&self, id: AuraId) -> Option<&E> {
        self.entries.get(&id)
    }

    pub fn contains(&self, id: AuraId) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn lookup(&self, facet: &Facet) -> Option<&HashSet<AuraId>> {
        self.index.get(facet)
    }

    pub(crate) fn all_ids(&self) -> impl Iterator<Item = AuraId> + '_ {
        self.entries.keys().copied()
    }

    /// Ids in ascending order.
    pub fn ids(&self) -> Vec<AuraId> {
        let mut ids: Vec<_> = self.entries.keys().copied().collect();
        ids.sort_unstable();
        ids
    }
}

/// Thread-safe indexed collection of aura entries.
///
/// Every public call takes the internal lock for its whole duration, and a
/// query holds it until its terminal call, so readers always see a
/// consistent snapshot.
#[derive(Debug)]
pub struct IndexedCollection<E> {
    inner: Mutex<IndexedStore<E>>,
}

impl<E> Default for IndexedCollection<E> {
    fn default() -> Self {
        Self {
            inner: Mutex::new(IndexedStore::default()),
        }
    }
}

impl<E: Indexed> IndexedCollection<E> {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, IndexedStore<E>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn insert(&self, entry: E) -> Option<E> {
        self.lock().insert(entry)
    }

    pub fn remove(&self, id: AuraId) -> Option<E> {
        self.lock().remove(id)
    }

    pub fn update(&self, id: AuraId, f: impl FnOnce(&mut E)) -> bool {
        self.lock().update(id, f)
    }

    pub fn contains(&self, id: AuraId) -> bool {
        self.lock().contains(id)
    }

    pub fn get(&self, id: AuraId) -> Option<E>
    where
        E: Clone,
    {
        self.lock().get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn ids(&self) -> Vec<AuraId> {
        self.lock().ids()
    }

    /// Starts a fluent query; the lock is held until the terminal call.
    pub fn query(&self) -> IndexQuery<'_, E> {
        IndexQuery::new(self.lock())
    }
}

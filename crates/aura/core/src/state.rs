//! Authoritative aura state.
//!
//! [`AuraState`] owns every live aura, the per-object holders that index them
//! and the scheduled events. Callers read it freely but mutate it only through
//! [`crate::AuraEngine`].
use std::collections::BTreeMap;

use crate::aura::Aura;
use crate::config::AuraConfig;
use crate::events::EventQueue;
use crate::holder::AuraHolder;
use crate::types::{AuraId, GameTime, ObjectGuid, SpellId};

#[derive(Debug)]
pub struct AuraState {
    pub config: AuraConfig,
    /// Base seed for proc and crit rolls; combined with `roll_nonce`.
    pub seed: u64,
    pub(crate) auras: BTreeMap<AuraId, Aura>,
    pub(crate) holders: BTreeMap<ObjectGuid, AuraHolder>,
    pub(crate) events: EventQueue,
    pub(crate) now: GameTime,
    pub(crate) roll_nonce: u64,
    /// Removed auras kept until the end of the current update.
    pub(crate) pending_removed: Vec<AuraId>,
    next_aura_id: u64,
}

impl Default for AuraState {
    fn default() -> Self {
        Self::new(AuraConfig::default())
    }
}

impl AuraState {
    pub fn new(config: AuraConfig) -> Self {
        Self {
            config,
            seed: 0,
            auras: BTreeMap::new(),
            holders: BTreeMap::new(),
            events: EventQueue::new(),
            now: GameTime::ZERO,
            roll_nonce: 0,
            pending_removed: Vec::new(),
            next_aura_id: 1,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn now(&self) -> GameTime {
        self.now
    }

    pub(crate) fn allocate_aura_id(&mut self) -> AuraId {
        let id = AuraId(self.next_aura_id);
        self.next_aura_id += 1;
        id
    }

    /// Aura by id, including removed auras not yet purged.
    pub fn aura(&self, id: AuraId) -> Option<&Aura> {
        self.auras.get(&id)
    }

    /// Live aura by id.
    pub fn live_aura(&self, id: AuraId) -> Option<&Aura> {
        self.auras.get(&id).filter(|aura| !aura.is_removed())
    }

    pub fn auras(&self) -> impl Iterator<Item = &Aura> {
        self.auras.values().filter(|aura| !aura.is_removed())
    }

    pub fn aura_count(&self) -> usize {
        self.auras().count()
    }

    pub fn holder(&self, guid: ObjectGuid) -> Option<&AuraHolder> {
        self.holders.get(&guid)
    }

    pub(crate) fn holder_mut(&mut self, guid: ObjectGuid) -> &mut AuraHolder {
        self.holders
            .entry(guid)
            .or_insert_with(|| AuraHolder::new(guid))
    }

    pub fn holders(&self) -> impl Iterator<Item = &AuraHolder> {
        self.holders.values()
    }

    pub fn events(&self) -> &EventQueue {
        &self.events
    }

    /// Ids of the auras `owner` owns, ascending.
    pub fn owned_auras(&self, owner: ObjectGuid) -> Vec<AuraId> {
        self.holders
            .get(&owner)
            .map(|holder| holder.owned().ids())
            .unwrap_or_default()
    }

    /// Ids of the auras bound to `target`, ascending.
    pub fn applied_auras(&self, target: ObjectGuid) -> Vec<AuraId> {
        self.holders
            .get(&target)
            .map(|holder| holder.applied().ids())
            .unwrap_or_default()
    }

    /// First live aura of `spell` owned by `owner`, optionally from `caster`.
    pub fn find_owned(
        &self,
        owner: ObjectGuid,
        spell: SpellId,
        caster: Option<ObjectGuid>,
    ) -> Option<&Aura> {
        let holder = self.holders.get(&owner)?;
        let query = holder.owned().query().has_spell(spell);
        let ids = match caster {
            Some(caster) => query.has_caster(caster).ids(),
            None => query.ids(),
        };
        ids.into_iter().find_map(|id| self.live_aura(id))
    }

    /// First live aura of `spell` bound to `target`.
    pub fn find_applied(&self, target: ObjectGuid, spell: SpellId) -> Option<&Aura> {
        let holder = self.holders.get(&target)?;
        holder
            .applied()
            .query()
            .has_spell(spell)
            .ids()
            .into_iter()
            .find_map(|id| self.live_aura(id))
    }

    pub(crate) fn next_roll_nonce(&mut self) -> u64 {
        self.roll_nonce += 1;
        self.roll_nonce
    }
}

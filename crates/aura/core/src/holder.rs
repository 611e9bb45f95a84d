//! Aura bookkeeping of a single unit or dynamic object.
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::application::AuraUpdate;
use crate::collection::{AuraApplicationCollection, AuraCollection};
use crate::config::AuraConfig;
use crate::spell::{AuraType, DiminishingGroup};
use crate::types::{AuraId, GameTime, ObjectGuid};

/// Diminishing-returns record of one group on one unit.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DiminishingState {
    /// Current level; 0 means full effect.
    pub hit_count: u8,
    /// Live auras of the group on the unit.
    pub stack: u32,
    /// When the last aura of the group went away.
    pub hit_time: GameTime,
}

/// Everything the runtime tracks per world object.
///
/// The two collections are shared behind [`Arc`] so that other threads can
/// keep a handle and query them while the simulation thread mutates auras.
#[derive(Debug)]
pub struct AuraHolder {
    guid: ObjectGuid,
    owned: Arc<AuraCollection>,
    applied: Arc<AuraApplicationCollection>,
    /// Applied effects by category, in application order.
    pub(crate) effects_by_type: HashMap<AuraType, Vec<(AuraId, u8)>>,
    pub(crate) visible: BTreeMap<u8, AuraId>,
    /// Single-target auras this unit has cast, oldest first.
    pub(crate) single_cast: Vec<AuraId>,
    pub(crate) diminishing: HashMap<DiminishingGroup, DiminishingState>,
    /// Non-zero while procs from this unit are suppressed.
    pub(crate) cant_proc: u32,
    /// Slot removals waiting for the next flush.
    pub(crate) pending_updates: Vec<AuraUpdate>,
}

impl AuraHolder {
    pub fn new(guid: ObjectGuid) -> Self {
        Self {
            guid,
            owned: Arc::new(AuraCollection::new()),
            applied: Arc::new(AuraApplicationCollection::new()),
            effects_by_type: HashMap::new(),
            visible: BTreeMap::new(),
            single_cast: Vec::new(),
            diminishing: HashMap::new(),
            cant_proc: 0,
            pending_updates: Vec::new(),
        }
    }

    pub fn guid(&self) -> ObjectGuid {
        self.guid
    }

    /// Auras this object owns.
    pub fn owned(&self) -> &Arc<AuraCollection> {
        &self.owned
    }

    /// Auras bound to this unit.
    pub fn applied(&self) -> &Arc<AuraApplicationCollection> {
        &self.applied
    }

    pub fn is_empty(&self) -> bool {
        self.owned.is_empty() && self.applied.is_empty()
    }

    /// Nothing left worth keeping: no auras, no slots, no pending updates
    /// and no diminishing level still inside its window.
    pub(crate) fn is_idle(&self, now: GameTime, window: u64) -> bool {
        self.is_empty()
            && self.effects_by_type.is_empty()
            && self.visible.is_empty()
            && self.single_cast.is_empty()
            && self.pending_updates.is_empty()
            && self.cant_proc == 0
            && self.diminishing.iter().all(|(group, state)| {
                state.stack == 0 && self.diminishing_level(*group, now, window) == 0
            })
    }

    pub fn can_proc(&self) -> bool {
        self.cant_proc == 0
    }

    // ===== effect registry =====

    pub(crate) fn register_effect(&mut self, aura_type: AuraType, aura: AuraId, index: u8) {
        let list = self.effects_by_type.entry(aura_type).or_default();
        let duplicate = list.contains(&(aura, index));
        debug_assert!(!duplicate, "effect registered twice");
        if duplicate {
            tracing::error!(target: "aura::effect", aura = %aura, effect = index, "effect registered twice");
            return;
        }
        list.push((aura, index));
    }

    pub(crate) fn unregister_effect(&mut self, aura_type: AuraType, aura: AuraId, index: u8) {
        if let Some(list) = self.effects_by_type.get_mut(&aura_type) {
            list.retain(|entry| *entry != (aura, index));
            if list.is_empty() {
                self.effects_by_type.remove(&aura_type);
            }
        }
    }

    /// Applied effects of one category as `(aura, effect index)` pairs.
    pub fn effects_of_type(&self, aura_type: AuraType) -> &[(AuraId, u8)] {
        self.effects_by_type
            .get(&aura_type)
            .map_or(&[][..], Vec::as_slice)
    }

    pub fn has_effect_type(&self, aura_type: AuraType) -> bool {
        !self.effects_of_type(aura_type).is_empty()
    }

    // ===== visible slots =====

    /// Lowest free visible slot.
    pub(crate) fn free_slot(&self) -> Option<u8> {
        (0..AuraConfig::MAX_VISIBLE_AURAS)
            .map(|slot| slot as u8)
            .find(|slot| !self.visible.contains_key(slot))
    }

    pub fn visible_aura(&self, slot: u8) -> Option<AuraId> {
        self.visible.get(&slot).copied()
    }

    pub fn visible_count(&self) -> usize {
        self.visible.len()
    }

    // ===== diminishing returns =====

    /// Current level of `group`. Resets once the group has been idle for
    /// longer than `window` milliseconds.
    pub fn diminishing_level(&self, group: DiminishingGroup, now: GameTime, window: u64) -> u8 {
        let Some(state) = self.diminishing.get(&group) else {
            return 0;
        };
        if state.hit_count == 0 {
            return 0;
        }
        if state.stack == 0 && now.millis_since(state.hit_time) > window {
            return 0;
        }
        state.hit_count
    }

    pub(crate) fn increment_diminishing(&mut self, group: DiminishingGroup, now: GameTime, window: u64) {
        if group == DiminishingGroup::None {
            return;
        }
        let level = self.diminishing_level(group, now, window);
        let state = self.diminishing.entry(group).or_default();
        if level < group.max_level() {
            state.hit_count = level + 1;
        }
    }

    /// Tracks a live aura of `group` on this unit.
    pub(crate) fn apply_diminishing(&mut self, group: DiminishingGroup, apply: bool, now: GameTime) {
        if group == DiminishingGroup::None {
            return;
        }
        let state = self.diminishing.entry(group).or_default();
        if apply {
            state.stack += 1;
        } else if state.stack > 0 {
            state.stack -= 1;
            if state.stack == 0 {
                state.hit_time = now;
            }
        }
    }
}

/// Duration left after diminishing returns at `level`. Permanent (`-1`) and
/// zero durations are returned unchanged.
pub fn diminished_duration(duration: i32, level: u8) -> i32 {
    if duration <= 0 {
        return duration;
    }
    match level {
        0 => duration,
        1 => duration / 2,
        2 => duration / 4,
        _ => 0,
    }
}

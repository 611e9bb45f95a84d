//! Scheduled one-shot events.
//!
//! The only event kind is the deferred charge drop: a proc that asked for its
//! charge to be consumed later schedules a [`DeferredChargeEvent`], which the
//! engine fires once the game clock passes `fire_at`.
use std::collections::BTreeMap;

use crate::types::{AuraId, GameTime, RemoveMode};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EventId(pub u64);

/// Pending "drop one charge" for an aura.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DeferredChargeEvent {
    pub id: EventId,
    pub aura: AuraId,
    /// Reason used if the dropped charge removes the aura.
    pub remove_mode: RemoveMode,
    pub fire_at: GameTime,
}

/// Events ordered by due time, then by scheduling order.
#[derive(Clone, Debug, Default)]
pub struct EventQueue {
    next_id: u64,
    pending: BTreeMap<(GameTime, EventId), DeferredChargeEvent>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, aura: AuraId, remove_mode: RemoveMode, fire_at: GameTime) -> EventId {
        self.next_id += 1;
        let id = EventId(self.next_id);
        self.pending.insert(
            (fire_at, id),
            DeferredChargeEvent {
                id,
                aura,
                remove_mode,
                fire_at,
            },
        );
        tracing::trace!(target: "aura::events", aura = %aura, event = id.0, fire_at = %fire_at, "charge drop scheduled");
        id
    }

    /// Cancels a pending event. Returns `false` if it already fired.
    pub fn abort(&mut self, id: EventId) -> bool {
        let key = self
            .pending
            .iter()
            .find(|(_, event)| event.id == id)
            .map(|(key, _)| *key);
        match key {
            Some(key) => {
                self.pending.remove(&key);
                tracing::trace!(target: "aura::events", event = id.0, "event aborted");
                true
            }
            None => false,
        }
    }

    /// Removes and returns every event due at `now`, earliest first.
    pub fn pop_due(&mut self, now: GameTime) -> Vec<DeferredChargeEvent> {
        let later = self.pending.split_off(&(GameTime(now.0.saturating_add(1)), EventId(0)));
        let due = std::mem::replace(&mut self.pending, later);
        due.into_values().collect()
    }

    pub fn pending(&self, aura: AuraId) -> Option<&DeferredChargeEvent> {
        self.pending.values().find(|event| event.aura == aura)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

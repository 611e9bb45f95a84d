//! Aura lifecycle driver.
//!
//! [`AuraEngine`] is the only writer of [`AuraState`]. It borrows the state,
//! the read-only environment and the entity model for the duration of one
//! call sequence, and every operation (create, retarget, tick, proc, remove)
//! flows through it.
//!
//! Host callbacks and script hooks may remove the aura being processed.
//! Every path therefore re-resolves the aura by id after a call-out and
//! stops when it is gone or its binding is being torn down. Removed auras
//! stay in the state, flagged, until the end of [`AuraEngine::update`].
mod apply;
mod create;
mod handlers;
mod periodic;
mod procs;
mod remove;
mod stack;
mod sync;
mod targets;

pub use create::owner_effect_mask;

use std::sync::Arc;

use crate::application::AuraApplication;
use crate::aura::Aura;
use crate::env::{AuraEnv, RollContext, UnitHost, compute_seed};
use crate::spell::SpellInfo;
use crate::state::AuraState;
use crate::types::{AuraId, GameTime, ObjectGuid, RemoveMode};

pub struct AuraEngine<'a> {
    state: &'a mut AuraState,
    env: AuraEnv<'a>,
    host: &'a mut dyn UnitHost,
}

impl<'a> AuraEngine<'a> {
    pub fn new(state: &'a mut AuraState, env: AuraEnv<'a>, host: &'a mut dyn UnitHost) -> Self {
        Self { state, env, host }
    }

    pub fn state(&self) -> &AuraState {
        self.state
    }

    pub fn env(&self) -> AuraEnv<'a> {
        self.env
    }

    pub fn host(&self) -> &dyn UnitHost {
        &*self.host
    }

    pub fn host_mut(&mut self) -> &mut dyn UnitHost {
        &mut *self.host
    }

    pub fn now(&self) -> GameTime {
        self.state.now
    }

    /// Live aura by id.
    pub fn aura(&self, id: AuraId) -> Option<&Aura> {
        self.state.live_aura(id)
    }

    /// Advances the game clock by `diff` milliseconds.
    ///
    /// Fires due charge drops, counts down durations, re-resolves area
    /// targets, runs periodic ticks, expires timed-out auras and finally
    /// sends pending client updates.
    pub fn update(&mut self, diff: u32) {
        self.state.now = self.state.now + u64::from(diff);

        for event in self.state.events.pop_due(self.state.now) {
            self.fire_charge_drop(event);
        }

        let owners: Vec<ObjectGuid> = self.state.holders.keys().copied().collect();
        for owner in owners {
            for id in self.state.owned_auras(owner) {
                self.update_aura(id, diff);
            }
        }

        let expired: Vec<AuraId> = self
            .state
            .auras
            .values()
            .filter(|aura| !aura.is_removed && aura.is_expired() && aura.drop_event.is_none())
            .map(|aura| aura.id)
            .collect();
        for id in expired {
            tracing::debug!(target: "aura::create", aura = %id, "aura expired");
            self.remove_aura(id, RemoveMode::Expire);
        }

        self.flush_client_updates();
        self.purge_removed();
    }

    fn update_aura(&mut self, id: AuraId, diff: u32) {
        let step = i32::try_from(diff).unwrap_or(i32::MAX);
        let retarget = {
            let Some(aura) = self.live_aura_mut(id) else {
                return;
            };
            if aura.duration > 0 {
                aura.duration = (aura.duration - step).max(0);
            }
            if aura.update_target_map_interval <= step {
                true
            } else {
                aura.update_target_map_interval -= step;
                false
            }
        };
        if retarget {
            self.update_target_map(id, true);
        }

        let Some(aura) = self.live_aura_mut(id) else {
            return;
        };
        if aura.duration < 0 && !aura.is_passive() && !aura.is_permanent() {
            return;
        }
        let mut due = Vec::new();
        for slot in aura.effects.iter_mut().flatten() {
            if slot.advance(diff) {
                due.push(slot.index());
            }
        }

        for index in due {
            let targets: Vec<ObjectGuid> = match self.state.live_aura(id) {
                Some(aura) => aura
                    .applications()
                    .filter(|binding| !binding.is_removing() && binding.has_effect(index))
                    .map(AuraApplication::target)
                    .collect(),
                None => return,
            };
            for target in targets {
                if self.binding_active(id, target) {
                    self.periodic_tick(id, index, target);
                }
            }
        }
    }

    /// Drops auras removed during this update and holders left idle.
    fn purge_removed(&mut self) {
        for id in std::mem::take(&mut self.state.pending_removed) {
            if self.state.auras.get(&id).is_some_and(Aura::is_removed) {
                self.state.auras.remove(&id);
                tracing::trace!(target: "aura::create", aura = %id, "aura purged");
            }
        }

        let now = self.state.now;
        let window = self.state.config.diminishing_window;
        self.state.holders.retain(|guid, holder| {
            let idle = holder.is_idle(now, window);
            if idle {
                tracing::trace!(target: "aura::create", unit = %guid, "holder dropped");
            }
            !idle
        });
    }

    /// Forgets a despawned unit or dynamic object: removes every aura it owns
    /// or carries and drops its holder, diminishing state included.
    pub fn remove_unit(&mut self, unit: ObjectGuid) {
        self.remove_all_auras(unit);
        if self.state.holders.remove(&unit).is_some() {
            tracing::debug!(target: "aura::create", unit = %unit, "holder removed");
        }
    }

    // ===== shared helpers =====

    pub(crate) fn live_aura_mut(&mut self, id: AuraId) -> Option<&mut Aura> {
        self.state.auras.get_mut(&id).filter(|aura| !aura.is_removed)
    }

    pub(crate) fn is_live(&self, id: AuraId) -> bool {
        self.state.live_aura(id).is_some()
    }

    /// Spell definition of a live aura.
    pub(crate) fn aura_spell(&self, id: AuraId) -> Option<Arc<SpellInfo>> {
        self.state.live_aura(id).map(|aura| Arc::clone(&aura.spell))
    }

    /// The aura is live and its binding on `target` is not being removed.
    pub(crate) fn binding_active(&self, id: AuraId, target: ObjectGuid) -> bool {
        self.state
            .live_aura(id)
            .and_then(|aura| aura.application(target))
            .is_some_and(|binding| !binding.is_removing())
    }

    pub(crate) fn binding_mut(&mut self, id: AuraId, target: ObjectGuid) -> Option<&mut AuraApplication> {
        self.state.auras.get_mut(&id)?.applications.get_mut(&target)
    }

    /// Deterministic roll for one aura.
    pub(crate) fn roll_chance(&mut self, id: AuraId, context: RollContext, chance: f32) -> bool {
        let nonce = self.state.next_roll_nonce();
        let seed = compute_seed(self.state.seed, nonce, id.0, context);
        self.env.rng().roll_chance(seed, chance)
    }
}

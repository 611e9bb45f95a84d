//! Visible slots and client update batching.
use super::AuraEngine;
use crate::application::{AuraUpdate, AuraUpdatePacket};
use crate::types::{AuraId, ObjectGuid};

impl AuraEngine<'_> {
    /// Gives `id` the lowest free visible slot of `target`.
    pub(crate) fn assign_slot(&mut self, target: ObjectGuid, id: AuraId) -> Option<u8> {
        let holder = self.state.holder_mut(target);
        let Some(slot) = holder.free_slot() else {
            tracing::warn!(target: "aura::sync", aura = %id, unit = %target, "no free visible slot");
            return None;
        };
        holder.visible.insert(slot, id);
        self.host.set_visible_aura(target, slot, Some(id));
        Some(slot)
    }

    /// Releases `slot` if `id` still holds it and queues the clear for the
    /// next flush.
    pub(crate) fn free_slot(&mut self, target: ObjectGuid, slot: u8, id: AuraId) {
        let Some(holder) = self.state.holders.get_mut(&target) else {
            return;
        };
        if holder.visible.get(&slot) != Some(&id) {
            return;
        }
        holder.visible.remove(&slot);
        holder.pending_updates.push(AuraUpdate::removal(slot));
        self.host.set_visible_aura(target, slot, None);
    }

    /// Flags every binding of the aura for resend.
    pub(crate) fn mark_client_updates(&mut self, id: AuraId) {
        if let Some(aura) = self.live_aura_mut(id) {
            for binding in aura.applications.values_mut() {
                binding.set_need_client_update(true);
            }
        }
    }

    /// Sends one packet per unit with its cleared slots and every visible
    /// binding flagged for resend.
    pub(crate) fn flush_client_updates(&mut self) {
        let units: Vec<ObjectGuid> = self
            .state
            .holders
            .iter()
            .filter(|(_, holder)| !holder.pending_updates.is_empty() || !holder.visible.is_empty())
            .map(|(guid, _)| *guid)
            .collect();

        for unit in units {
            let Some(holder) = self.state.holders.get_mut(&unit) else {
                continue;
            };
            let mut packet = AuraUpdatePacket::new(unit);
            packet.updates.append(&mut holder.pending_updates);
            let visible: Vec<(u8, AuraId)> = holder.visible.iter().map(|(slot, id)| (*slot, *id)).collect();

            for (slot, id) in visible {
                let Some(aura) = self.state.live_aura(id) else {
                    continue;
                };
                let Some(binding) = aura.application(unit).filter(|binding| binding.needs_client_update())
                else {
                    continue;
                };
                packet.push(AuraUpdate {
                    slot,
                    data: Some(aura.build_update(binding)),
                });
                if let Some(binding) = self.binding_mut(id, unit) {
                    binding.set_need_client_update(false);
                }
            }

            if !packet.is_empty() {
                tracing::trace!(target: "aura::sync", unit = %unit, updates = packet.updates.len(), "aura update sent");
                self.host.send_aura_update(&packet);
            }
        }
    }

    /// Snapshot of every visible slot of `target`, for a client that just
    /// started observing it.
    pub fn build_full_update(&self, target: ObjectGuid) -> AuraUpdatePacket {
        let mut packet = AuraUpdatePacket::new(target);
        packet.update_all = true;
        let Some(holder) = self.state.holder(target) else {
            return packet;
        };
        for (&slot, &id) in &holder.visible {
            let data = self
                .state
                .live_aura(id)
                .and_then(|aura| aura.application(target).map(|binding| aura.build_update(binding)));
            if let Some(data) = data {
                packet.push(AuraUpdate {
                    slot,
                    data: Some(data),
                });
            }
        }
        packet
    }
}

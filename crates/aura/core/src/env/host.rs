//! Entity-model boundary.
//!
//! The aura runtime never owns units. It asks the host about them through
//! [`UnitHost`] queries and reports side effects (stat modifiers, control
//! states, damage, sync packets) through its callbacks. Every callback may in
//! turn call back into the engine's public API on the next tick; within one
//! call they must not assume the aura still exists afterwards.

use crate::application::AuraUpdatePacket;
use crate::spell::{
    AuraStateType, AuraType, SchoolMask, SpellEffectInfo, SpellInfo, SpellModOp, TargetCheck,
};
use crate::types::{AuraId, ObjectGuid, PartitionId, Position, SpellId, UnitStateFlags};

/// Spatial query issued by area target resolution.
#[derive(Clone, Copy, Debug)]
pub struct AreaTargetQuery<'a> {
    pub spell: &'a SpellInfo,
    pub effect_index: u8,
    /// Object the search is centered on (aura owner or dynamic object).
    pub origin: ObjectGuid,
    pub center: Position,
    pub radius: f32,
    pub check: TargetCheck,
    /// Unit whose relationships decide ally/enemy membership.
    pub reference: ObjectGuid,
}

/// One effect's contribution to a unit's stats, reported on apply and remove.
#[derive(Clone, Debug, PartialEq)]
pub struct AuraModifier {
    pub aura: AuraId,
    pub spell: SpellId,
    pub effect_index: u8,
    pub aura_type: AuraType,
    pub misc_value: i32,
    pub misc_value_b: i32,
    pub amount: i32,
    pub caster: Option<ObjectGuid>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DamageKind {
    Periodic,
    Direct,
}

/// Spell damage dealt on behalf of an aura.
#[derive(Clone, Debug, PartialEq)]
pub struct SpellDamage {
    pub kind: DamageKind,
    pub caster: Option<ObjectGuid>,
    pub target: ObjectGuid,
    pub spell: SpellId,
    pub aura: AuraId,
    pub effect_index: u8,
    pub school: SchoolMask,
    pub amount: u32,
    pub critical: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DamageOutcome {
    pub damage: u32,
    pub absorbed: u32,
    pub overkill: u32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SpellHeal {
    pub caster: Option<ObjectGuid>,
    pub target: ObjectGuid,
    pub spell: SpellId,
    pub aura: AuraId,
    pub effect_index: u8,
    pub amount: u32,
    pub critical: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HealOutcome {
    pub healed: u32,
    pub overheal: u32,
}

/// Power gained or lost through an aura (energize, drain, burn).
#[derive(Clone, Debug, PartialEq)]
pub struct PowerChange {
    pub caster: Option<ObjectGuid>,
    pub target: ObjectGuid,
    pub spell: SpellId,
    pub aura: AuraId,
    /// Power type from the effect's misc value.
    pub power: i32,
    pub amount: i32,
}

/// Secondary cast requested by a periodic tick or a proc.
#[derive(Clone, Debug, PartialEq)]
pub struct TriggeredCast {
    pub caster: ObjectGuid,
    pub target: Option<ObjectGuid>,
    pub spell: SpellId,
    pub triggered_by: AuraId,
    pub effect_index: u8,
    /// Base point override for every effect of the triggered spell.
    pub base_points: Option<i32>,
}

/// Capability set the runtime needs from the entity model.
pub trait UnitHost {
    // ===== identity =====
    fn exists(&self, guid: ObjectGuid) -> bool;

    fn is_alive(&self, guid: ObjectGuid) -> bool;

    fn is_in_world(&self, guid: ObjectGuid) -> bool;

    fn position(&self, guid: ObjectGuid) -> Option<Position>;

    fn partition(&self, guid: ObjectGuid) -> Option<PartitionId>;

    fn level(&self, _guid: ObjectGuid) -> u16 {
        1
    }

    fn max_health(&self, _guid: ObjectGuid) -> u32 {
        0
    }

    fn health(&self, _guid: ObjectGuid) -> u32 {
        0
    }

    fn is_in_flight(&self, _guid: ObjectGuid) -> bool {
        false
    }

    // ===== relations =====
    fn is_friendly(&self, a: ObjectGuid, b: ObjectGuid) -> bool;

    fn is_hostile(&self, a: ObjectGuid, b: ObjectGuid) -> bool {
        !self.is_friendly(a, b)
    }

    /// Charmer or owner of a controlled unit.
    fn owner_of(&self, _guid: ObjectGuid) -> Option<ObjectGuid> {
        None
    }

    fn pet_of(&self, _guid: ObjectGuid) -> Option<ObjectGuid> {
        None
    }

    /// Units around `query.center` matching `query.check` relative to
    /// `query.reference`. Partition filtering is done by the caller.
    fn select_area_targets(&self, query: &AreaTargetQuery<'_>) -> Vec<ObjectGuid>;

    // ===== immunity =====
    fn is_immune_to_spell(
        &self,
        _target: ObjectGuid,
        _spell: &SpellInfo,
        _caster: Option<ObjectGuid>,
    ) -> bool {
        false
    }

    fn is_immune_to_effect(
        &self,
        _target: ObjectGuid,
        _spell: &SpellInfo,
        _effect: &SpellEffectInfo,
        _caster: Option<ObjectGuid>,
    ) -> bool {
        false
    }

    fn is_immune_to_damage(&self, _target: ObjectGuid, _spell: &SpellInfo) -> bool {
        false
    }

    // ===== caster modifiers =====
    fn apply_spell_mod(
        &self,
        _caster: ObjectGuid,
        _spell: &SpellInfo,
        _op: SpellModOp,
        value: i32,
    ) -> i32 {
        value
    }

    fn apply_spell_mod_f32(
        &self,
        _caster: ObjectGuid,
        _spell: &SpellInfo,
        _op: SpellModOp,
        value: f32,
    ) -> f32 {
        value
    }

    /// Cast time multiplier (below 1.0 when hasted).
    fn cast_speed(&self, _caster: ObjectGuid) -> f32 {
        1.0
    }

    fn periodic_crit_chance(
        &self,
        _caster: ObjectGuid,
        _target: ObjectGuid,
        _spell: &SpellInfo,
    ) -> f32 {
        0.0
    }

    /// Weapon swing time in milliseconds.
    fn base_attack_time(&self, _guid: ObjectGuid) -> u32 {
        2000
    }

    /// Free seats when `guid` is a vehicle.
    fn available_vehicle_seats(&self, _guid: ObjectGuid) -> Option<u8> {
        None
    }

    /// Mount capability chosen for a mount aura on `owner`.
    fn mount_capability(&self, _owner: ObjectGuid, effect: &SpellEffectInfo) -> i32 {
        effect.misc_value_b
    }

    // ===== callbacks =====
    fn apply_modifier(&mut self, _target: ObjectGuid, _modifier: &AuraModifier, _apply: bool) {}

    fn set_unit_state(&mut self, _target: ObjectGuid, _state: UnitStateFlags, _apply: bool) {}

    fn modify_aura_state(&mut self, _target: ObjectGuid, _state: AuraStateType, _apply: bool) {}

    fn deal_spell_damage(&mut self, damage: &SpellDamage) -> DamageOutcome {
        DamageOutcome {
            damage: damage.amount,
            ..DamageOutcome::default()
        }
    }

    fn heal(&mut self, heal: &SpellHeal) -> HealOutcome {
        HealOutcome {
            healed: heal.amount,
            overheal: 0,
        }
    }

    /// Returns the power actually gained.
    fn energize(&mut self, change: &PowerChange) -> i32 {
        change.amount
    }

    /// Returns the power actually drained.
    fn drain_power(&mut self, change: &PowerChange) -> i32 {
        change.amount
    }

    fn cast_spell(&mut self, _cast: &TriggeredCast) {}

    fn set_visible_aura(&mut self, _target: ObjectGuid, _slot: u8, _aura: Option<AuraId>) {}

    fn send_aura_update(&mut self, _packet: &AuraUpdatePacket) {}
}

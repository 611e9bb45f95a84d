//! In-memory entity model.
//!
//! `MemoryWorld` is a complete [`UnitHost`] backed by a map of plain unit
//! records. It keeps a log of every callback so tests and the simulator can
//! observe what the aura runtime did.
use std::collections::{BTreeMap, HashMap};

use super::host::{
    AreaTargetQuery, AuraModifier, DamageOutcome, HealOutcome, PowerChange, SpellDamage, SpellHeal,
    TriggeredCast, UnitHost,
};
use crate::application::AuraUpdatePacket;
use crate::spell::{
    AuraStateType, AuraType, SchoolMask, SpellEffectInfo, SpellInfo, SpellModOp, TargetCheck,
};
use crate::types::{AuraId, ObjectGuid, PartitionId, Position, SpellId, UnitStateFlags};

/// One unit as the in-memory world sees it.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct MemoryUnit {
    pub guid: ObjectGuid,
    pub position: Position,
    pub partition: PartitionId,
    pub faction: u32,
    /// Party or raid the unit belongs to.
    pub group: Option<u32>,
    pub owner: Option<ObjectGuid>,
    pub pet: Option<ObjectGuid>,
    pub level: u16,
    pub health: u32,
    pub max_health: u32,
    pub power: i32,
    pub alive: bool,
    pub in_world: bool,
    pub in_flight: bool,
    pub immune_spells: Vec<SpellId>,
    pub immune_aura_types: Vec<AuraType>,
    pub immune_mechanics: u32,
    pub immune_schools: SchoolMask,
    pub cast_speed: f32,
    pub crit_chance: f32,
    pub attack_time: u32,
    pub vehicle_seats: Option<u8>,
    /// Flat modifiers this unit applies to the spells it casts.
    pub spell_mods: Vec<(SpellModOp, i32)>,
}

impl Default for MemoryUnit {
    fn default() -> Self {
        Self {
            guid: ObjectGuid::EMPTY,
            position: Position::ORIGIN,
            partition: PartitionId::default(),
            faction: 0,
            group: None,
            owner: None,
            pet: None,
            level: 1,
            health: 100,
            max_health: 100,
            power: 0,
            alive: true,
            in_world: true,
            in_flight: false,
            immune_spells: Vec::new(),
            immune_aura_types: Vec::new(),
            immune_mechanics: 0,
            immune_schools: SchoolMask::empty(),
            cast_speed: 1.0,
            crit_chance: 0.0,
            attack_time: 2000,
            vehicle_seats: None,
            spell_mods: Vec::new(),
        }
    }
}

impl MemoryUnit {
    pub fn new(guid: ObjectGuid, position: Position) -> Self {
        Self {
            guid,
            position,
            ..Self::default()
        }
    }

    pub fn with_faction(mut self, faction: u32) -> Self {
        self.faction = faction;
        self
    }

    pub fn in_group(mut self, group: u32) -> Self {
        self.group = Some(group);
        self
    }

    pub fn in_partition(mut self, partition: PartitionId) -> Self {
        self.partition = partition;
        self
    }

    pub fn with_level(mut self, level: u16) -> Self {
        self.level = level;
        self
    }

    pub fn with_health(mut self, health: u32) -> Self {
        self.health = health;
        self.max_health = health;
        self
    }

    pub fn owned_by(mut self, owner: ObjectGuid) -> Self {
        self.owner = Some(owner);
        self
    }

    pub fn with_spell_mod(mut self, op: SpellModOp, value: i32) -> Self {
        self.spell_mods.push((op, value));
        self
    }

    pub fn immune_to_aura(mut self, aura: AuraType) -> Self {
        self.immune_aura_types.push(aura);
        self
    }

    pub fn immune_to_spell(mut self, spell: SpellId) -> Self {
        self.immune_spells.push(spell);
        self
    }

    fn spell_mod(&self, op: SpellModOp) -> i32 {
        self.spell_mods
            .iter()
            .filter(|(mod_op, _)| *mod_op == op)
            .map(|(_, value)| value)
            .sum()
    }
}

/// Stat modifier report as received through [`UnitHost::apply_modifier`].
#[derive(Clone, Debug, PartialEq)]
pub struct ModifierRecord {
    pub target: ObjectGuid,
    pub modifier: AuraModifier,
    pub apply: bool,
}

/// In-memory [`UnitHost`] with a callback log.
#[derive(Clone, Debug, Default)]
pub struct MemoryWorld {
    units: BTreeMap<ObjectGuid, MemoryUnit>,
    unit_states: HashMap<ObjectGuid, UnitStateFlags>,
    aura_states: HashMap<ObjectGuid, Vec<AuraStateType>>,
    visible: BTreeMap<(ObjectGuid, u8), AuraId>,
    pub modifiers: Vec<ModifierRecord>,
    pub damage: Vec<SpellDamage>,
    pub heals: Vec<SpellHeal>,
    pub power_changes: Vec<PowerChange>,
    pub casts: Vec<TriggeredCast>,
    pub packets: Vec<AuraUpdatePacket>,
}

impl MemoryWorld {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, unit: MemoryUnit) {
        if let Some(owner) = unit.owner
            && let Some(owner_unit) = self.units.get_mut(&owner)
        {
            owner_unit.pet = Some(unit.guid);
        }
        self.units.insert(unit.guid, unit);
    }

    pub fn with_unit(mut self, unit: MemoryUnit) -> Self {
        self.insert(unit);
        self
    }

    pub fn unit(&self, guid: ObjectGuid) -> Option<&MemoryUnit> {
        self.units.get(&guid)
    }

    pub fn unit_mut(&mut self, guid: ObjectGuid) -> Option<&mut MemoryUnit> {
        self.units.get_mut(&guid)
    }

    pub fn units(&self) -> impl Iterator<Item = &MemoryUnit> {
        self.units.values()
    }

    pub fn move_to(&mut self, guid: ObjectGuid, position: Position) {
        if let Some(unit) = self.units.get_mut(&guid) {
            unit.position = position;
        }
    }

    pub fn kill(&mut self, guid: ObjectGuid) {
        if let Some(unit) = self.units.get_mut(&guid) {
            unit.health = 0;
            unit.alive = false;
        }
    }

    pub fn has_unit_state(&self, guid: ObjectGuid, state: UnitStateFlags) -> bool {
        self.unit_states
            .get(&guid)
            .is_some_and(|flags| flags.contains(state))
    }

    pub fn has_aura_state(&self, guid: ObjectGuid, state: AuraStateType) -> bool {
        self.aura_states
            .get(&guid)
            .is_some_and(|states| states.contains(&state))
    }

    pub fn visible_aura(&self, guid: ObjectGuid, slot: u8) -> Option<AuraId> {
        self.visible.get(&(guid, slot)).copied()
    }

    /// Net amount of currently applied modifiers of one category on `target`.
    pub fn modifier_total(&self, target: ObjectGuid, aura_type: AuraType) -> i32 {
        self.modifiers
            .iter()
            .filter(|record| record.target == target && record.modifier.aura_type == aura_type)
            .map(|record| {
                if record.apply {
                    record.modifier.amount
                } else {
                    -record.modifier.amount
                }
            })
            .sum()
    }

    pub fn clear_log(&mut self) {
        self.modifiers.clear();
        self.damage.clear();
        self.heals.clear();
        self.power_changes.clear();
        self.casts.clear();
        self.packets.clear();
    }

    fn same_group(&self, a: ObjectGuid, b: ObjectGuid) -> bool {
        if a == b {
            return true;
        }
        match (self.units.get(&a), self.units.get(&b)) {
            (Some(a), Some(b)) => a.group.is_some() && a.group == b.group,
            _ => false,
        }
    }

    fn matches_check(&self, check: TargetCheck, reference: ObjectGuid, candidate: ObjectGuid) -> bool {
        match check {
            TargetCheck::Default | TargetCheck::Entry => true,
            TargetCheck::Enemy => self.is_hostile(reference, candidate),
            TargetCheck::Ally | TargetCheck::Passenger => self.is_friendly(reference, candidate),
            TargetCheck::Party | TargetCheck::Raid | TargetCheck::RaidClass => {
                self.same_group(reference, candidate)
            }
            TargetCheck::Summoned => self.owner_of(candidate) == Some(reference),
        }
    }
}

impl UnitHost for MemoryWorld {
    fn exists(&self, guid: ObjectGuid) -> bool {
        self.units.contains_key(&guid)
    }

    fn is_alive(&self, guid: ObjectGuid) -> bool {
        self.units.get(&guid).is_some_and(|unit| unit.alive)
    }

    fn is_in_world(&self, guid: ObjectGuid) -> bool {
        self.units.get(&guid).is_some_and(|unit| unit.in_world)
    }

    fn position(&self, guid: ObjectGuid) -> Option<Position> {
        self.units.get(&guid).map(|unit| unit.position)
    }

    fn partition(&self, guid: ObjectGuid) -> Option<PartitionId> {
        self.units.get(&guid).map(|unit| unit.partition)
    }

    fn level(&self, guid: ObjectGuid) -> u16 {
        self.units.get(&guid).map_or(1, |unit| unit.level)
    }

    fn max_health(&self, guid: ObjectGuid) -> u32 {
        self.units.get(&guid).map_or(0, |unit| unit.max_health)
    }

    fn health(&self, guid: ObjectGuid) -> u32 {
        self.units.get(&guid).map_or(0, |unit| unit.health)
    }

    fn is_in_flight(&self, guid: ObjectGuid) -> bool {
        self.units.get(&guid).is_some_and(|unit| unit.in_flight)
    }

    fn is_friendly(&self, a: ObjectGuid, b: ObjectGuid) -> bool {
        if a == b {
            return true;
        }
        match (self.units.get(&a), self.units.get(&b)) {
            (Some(a), Some(b)) => a.faction == b.faction,
            _ => false,
        }
    }

    fn owner_of(&self, guid: ObjectGuid) -> Option<ObjectGuid> {
        self.units.get(&guid).and_then(|unit| unit.owner)
    }

    fn pet_of(&self, guid: ObjectGuid) -> Option<ObjectGuid> {
        self.units.get(&guid).and_then(|unit| unit.pet)
    }

    fn select_area_targets(&self, query: &AreaTargetQuery<'_>) -> Vec<ObjectGuid> {
        self.units
            .values()
            .filter(|unit| unit.guid.is_unit() && unit.alive && unit.in_world)
            .filter(|unit| unit.position.is_within(&query.center, query.radius))
            .filter(|unit| self.matches_check(query.check, query.reference, unit.guid))
            .map(|unit| unit.guid)
            .collect()
    }

    fn is_immune_to_spell(
        &self,
        target: ObjectGuid,
        spell: &SpellInfo,
        _caster: Option<ObjectGuid>,
    ) -> bool {
        self.units.get(&target).is_some_and(|unit| {
            unit.immune_spells.contains(&spell.id)
                || (unit.immune_mechanics != 0
                    && spell.all_effects_mechanic_mask() & unit.immune_mechanics != 0
                    && spell.all_effects_mechanic_mask() & !unit.immune_mechanics == 0)
        })
    }

    fn is_immune_to_effect(
        &self,
        target: ObjectGuid,
        _spell: &SpellInfo,
        effect: &SpellEffectInfo,
        _caster: Option<ObjectGuid>,
    ) -> bool {
        self.units.get(&target).is_some_and(|unit| {
            unit.immune_aura_types.contains(&effect.aura)
                || effect.mechanic.mask() & unit.immune_mechanics != 0
        })
    }

    fn is_immune_to_damage(&self, target: ObjectGuid, spell: &SpellInfo) -> bool {
        self.units
            .get(&target)
            .is_some_and(|unit| unit.immune_schools.intersects(spell.school_mask))
    }

    fn apply_spell_mod(
        &self,
        caster: ObjectGuid,
        _spell: &SpellInfo,
        op: SpellModOp,
        value: i32,
    ) -> i32 {
        self.units
            .get(&caster)
            .map_or(value, |unit| value + unit.spell_mod(op))
    }

    fn apply_spell_mod_f32(
        &self,
        caster: ObjectGuid,
        _spell: &SpellInfo,
        op: SpellModOp,
        value: f32,
    ) -> f32 {
        self.units
            .get(&caster)
            .map_or(value, |unit| value + unit.spell_mod(op) as f32)
    }

    fn cast_speed(&self, caster: ObjectGuid) -> f32 {
        self.units.get(&caster).map_or(1.0, |unit| unit.cast_speed)
    }

    fn periodic_crit_chance(
        &self,
        caster: ObjectGuid,
        _target: ObjectGuid,
        _spell: &SpellInfo,
    ) -> f32 {
        self.units.get(&caster).map_or(0.0, |unit| unit.crit_chance)
    }

    fn base_attack_time(&self, guid: ObjectGuid) -> u32 {
        self.units.get(&guid).map_or(2000, |unit| unit.attack_time)
    }

    fn available_vehicle_seats(&self, guid: ObjectGuid) -> Option<u8> {
        self.units.get(&guid).and_then(|unit| unit.vehicle_seats)
    }

    fn apply_modifier(&mut self, target: ObjectGuid, modifier: &AuraModifier, apply: bool) {
        self.modifiers.push(ModifierRecord {
            target,
            modifier: modifier.clone(),
            apply,
        });
    }

    fn set_unit_state(&mut self, target: ObjectGuid, state: UnitStateFlags, apply: bool) {
        let flags = self.unit_states.entry(target).or_default();
        flags.set(state, apply);
    }

    fn modify_aura_state(&mut self, target: ObjectGuid, state: AuraStateType, apply: bool) {
        let states = self.aura_states.entry(target).or_default();
        if apply {
            if !states.contains(&state) {
                states.push(state);
            }
        } else {
            states.retain(|existing| *existing != state);
        }
    }

    fn deal_spell_damage(&mut self, damage: &SpellDamage) -> DamageOutcome {
        self.damage.push(damage.clone());
        let Some(unit) = self.units.get_mut(&damage.target) else {
            return DamageOutcome::default();
        };
        let dealt = damage.amount.min(unit.health);
        unit.health -= dealt;
        if unit.health == 0 {
            unit.alive = false;
        }
        DamageOutcome {
            damage: dealt,
            absorbed: 0,
            overkill: damage.amount - dealt,
        }
    }

    fn heal(&mut self, heal: &SpellHeal) -> HealOutcome {
        self.heals.push(heal.clone());
        let Some(unit) = self.units.get_mut(&heal.target) else {
            return HealOutcome::default();
        };
        let missing = unit.max_health.saturating_sub(unit.health);
        let healed = heal.amount.min(missing);
        unit.health += healed;
        HealOutcome {
            healed,
            overheal: heal.amount - healed,
        }
    }

    fn energize(&mut self, change: &PowerChange) -> i32 {
        self.power_changes.push(change.clone());
        if let Some(unit) = self.units.get_mut(&change.target) {
            unit.power += change.amount;
        }
        change.amount
    }

    fn drain_power(&mut self, change: &PowerChange) -> i32 {
        self.power_changes.push(change.clone());
        let Some(unit) = self.units.get_mut(&change.target) else {
            return 0;
        };
        let drained = change.amount.min(unit.power).max(0);
        unit.power -= drained;
        drained
    }

    fn cast_spell(&mut self, cast: &TriggeredCast) {
        self.casts.push(cast.clone());
    }

    fn set_visible_aura(&mut self, target: ObjectGuid, slot: u8, aura: Option<AuraId>) {
        match aura {
            Some(aura) => {
                self.visible.insert((target, slot), aura);
            }
            None => {
                self.visible.remove(&(target, slot));
            }
        }
    }

    fn send_aura_update(&mut self, packet: &AuraUpdatePacket) {
        self.packets.push(packet.clone());
    }
}

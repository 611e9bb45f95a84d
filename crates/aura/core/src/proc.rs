//! Combat events that may trigger auras.
//!
//! The host reports an action once as a [`ProcTrigger`]; the engine splits it
//! into one [`ProcEvent`] per side (the acting unit and the unit acted upon)
//! and checks each side's applied auras against it.
use std::sync::Arc;

use crate::spell::{
    ProcFlags, ProcHitMask, ProcSpellPhase, ProcSpellType, SchoolMask, SpellInfo, SpellProcEntry,
};
use crate::types::{ObjectGuid, SpellId};

/// Spell involved in a proc event.
#[derive(Clone, Debug)]
pub struct ProcSpell {
    pub info: Arc<SpellInfo>,
    /// Cast was triggered by another spell or aura.
    pub triggered: bool,
    pub from_item: bool,
    /// Spell of the aura whose effect produced this cast.
    pub triggered_by: Option<SpellId>,
}

impl ProcSpell {
    pub fn new(info: Arc<SpellInfo>) -> Self {
        Self {
            info,
            triggered: false,
            from_item: false,
            triggered_by: None,
        }
    }

    pub fn triggered_by(mut self, spell: SpellId) -> Self {
        self.triggered = true;
        self.triggered_by = Some(spell);
        self
    }

    pub fn from_item(mut self) -> Self {
        self.from_item = true;
        self
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ProcDamage {
    pub amount: u32,
    pub school: SchoolMask,
}

/// One side of an action as seen by the auras of the unit being checked.
#[derive(Clone, Debug)]
pub struct ProcEvent {
    pub actor: Option<ObjectGuid>,
    pub action_target: Option<ObjectGuid>,
    /// Unit a triggered spell should hit: the other side of the action.
    pub proc_target: Option<ObjectGuid>,
    pub type_mask: ProcFlags,
    pub spell_type_mask: ProcSpellType,
    pub spell_phase_mask: ProcSpellPhase,
    pub hit_mask: ProcHitMask,
    pub spell: Option<ProcSpell>,
    pub damage: Option<ProcDamage>,
    pub heal: Option<u32>,
    /// Extra-attack spell the actor is currently resolving.
    pub extra_attack_spell: Option<SpellId>,
}

impl ProcEvent {
    pub fn spell_info(&self) -> Option<&SpellInfo> {
        self.spell.as_ref().map(|spell| spell.info.as_ref())
    }

    pub fn damage_amount(&self) -> u32 {
        self.damage.map_or(0, |damage| damage.amount)
    }

    pub fn school_mask(&self) -> SchoolMask {
        match (&self.damage, &self.spell) {
            (Some(damage), _) => damage.school,
            (None, Some(spell)) => spell.info.school_mask,
            (None, None) => SchoolMask::empty(),
        }
    }
}

/// Action reported by the host, before it is split per side.
#[derive(Clone, Debug, Default)]
pub struct ProcTrigger {
    pub actor: Option<ObjectGuid>,
    pub action_target: Option<ObjectGuid>,
    pub actor_flags: ProcFlags,
    pub target_flags: ProcFlags,
    pub spell_type_mask: ProcSpellType,
    pub spell_phase_mask: ProcSpellPhase,
    pub hit_mask: ProcHitMask,
    pub spell: Option<ProcSpell>,
    pub damage: Option<ProcDamage>,
    pub heal: Option<u32>,
    pub extra_attack_spell: Option<SpellId>,
}

impl ProcTrigger {
    pub fn new(actor: Option<ObjectGuid>, action_target: Option<ObjectGuid>) -> Self {
        Self {
            actor,
            action_target,
            ..Self::default()
        }
    }

    pub fn with_flags(mut self, actor: ProcFlags, target: ProcFlags) -> Self {
        self.actor_flags = actor;
        self.target_flags = target;
        self
    }

    pub fn with_spell(mut self, spell: ProcSpell) -> Self {
        self.spell = Some(spell);
        self
    }

    pub fn with_spell_type(mut self, spell_type: ProcSpellType, phase: ProcSpellPhase) -> Self {
        self.spell_type_mask = spell_type;
        self.spell_phase_mask = phase;
        self
    }

    pub fn with_hit(mut self, hit: ProcHitMask) -> Self {
        self.hit_mask = hit;
        self
    }

    pub fn with_damage(mut self, amount: u32, school: SchoolMask) -> Self {
        self.damage = Some(ProcDamage { amount, school });
        self
    }

    pub fn with_heal(mut self, amount: u32) -> Self {
        self.heal = Some(amount);
        self
    }

    fn event(&self, type_mask: ProcFlags, proc_target: Option<ObjectGuid>) -> ProcEvent {
        ProcEvent {
            actor: self.actor,
            action_target: self.action_target,
            proc_target,
            type_mask,
            spell_type_mask: self.spell_type_mask,
            spell_phase_mask: self.spell_phase_mask,
            hit_mask: self.hit_mask,
            spell: self.spell.clone(),
            damage: self.damage,
            heal: self.heal,
            extra_attack_spell: self.extra_attack_spell,
        }
    }

    /// Event checked against the actor's auras.
    pub fn actor_event(&self) -> Option<ProcEvent> {
        if self.actor.is_none() || self.actor_flags.is_empty() {
            return None;
        }
        Some(self.event(self.actor_flags, self.action_target))
    }

    /// Event checked against the action target's auras.
    pub fn target_event(&self) -> Option<ProcEvent> {
        if self.action_target.is_none() || self.target_flags.is_empty() {
            return None;
        }
        Some(self.event(self.target_flags, self.actor))
    }
}

/// Static trigger-condition match of a proc entry against an event.
pub fn can_spell_trigger_proc_on_event(entry: &SpellProcEntry, event: &ProcEvent) -> bool {
    if !event.type_mask.intersects(entry.proc_flags) {
        return false;
    }

    if event
        .type_mask
        .intersects(ProcFlags::HEARTBEAT | ProcFlags::KILL | ProcFlags::DEATH)
    {
        return true;
    }

    if !entry.school_mask.is_empty() && !event.school_mask().intersects(entry.school_mask) {
        return false;
    }

    if event.type_mask.intersects(ProcFlags::SPELL_MASK) {
        if let Some(spell) = event.spell_info()
            && !spell.is_affected(entry.spell_family, entry.spell_family_mask)
        {
            return false;
        }
        if !entry.spell_type_mask.is_empty()
            && !event.spell_type_mask.intersects(entry.spell_type_mask)
        {
            return false;
        }
    }

    if event.type_mask.intersects(ProcFlags::REQ_SPELL_PHASE_MASK)
        && !event.spell_phase_mask.intersects(entry.spell_phase_mask)
    {
        return false;
    }

    let taken = event.type_mask.intersects(ProcFlags::TAKEN_HIT_MASK);
    let done = event.type_mask.intersects(ProcFlags::DONE_HIT_MASK)
        && !event.spell_phase_mask.contains(ProcSpellPhase::CAST);
    if taken || done {
        let mut hit_mask = entry.hit_mask;
        if hit_mask.is_empty() {
            hit_mask = if taken {
                ProcHitMask::NORMAL | ProcHitMask::CRITICAL
            } else {
                ProcHitMask::NORMAL | ProcHitMask::CRITICAL | ProcHitMask::ABSORB
            };
        }
        if !event.hit_mask.intersects(hit_mask) {
            return false;
        }
    }

    true
}

/// Weapon-speed based chance in percent for a procs-per-minute entry.
pub fn weapon_ppm_chance(weapon_speed: u32, ppm: f32) -> f32 {
    if ppm <= 0.0 {
        return 0.0;
    }
    weapon_speed as f32 * ppm / 600.0
}

/// Chance in percent for a spell with a base PPM rate.
///
/// Bad-luck protection: the longer since the last success compared to the
/// average interval, the higher the chance; the time since the last attempt
/// scales it linearly.
pub fn ppm_chance(ppm: f32, seconds_since_attempt: f32, seconds_since_success: f32) -> f32 {
    if ppm <= 0.0 {
        return 0.0;
    }
    let average_proc_interval = 60.0 / ppm;
    let chance = f32::max(
        1.0,
        1.0 + ((seconds_since_success / average_proc_interval - 1.5) * 3.0),
    ) * ppm
        * seconds_since_attempt
        / 60.0;
    chance.clamp(0.0, 1.0) * 100.0
}

/// Shrinks a chance by 3.33% per actor level above 60.
pub fn reduce_chance_above_60(chance: f32, actor_level: u16) -> f32 {
    if actor_level <= 60 {
        return chance;
    }
    let excess = f32::from(actor_level - 60);
    ((1.0 - excess / 30.0) * chance).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spell::ProcAttributes;

    fn melee_event(hit: ProcHitMask) -> ProcEvent {
        ProcTrigger::new(Some(ObjectGuid::player(1)), Some(ObjectGuid::unit(2)))
            .with_flags(ProcFlags::DEAL_MELEE_SWING, ProcFlags::TAKE_MELEE_SWING)
            .with_hit(hit)
            .with_damage(40, SchoolMask::PHYSICAL)
            .actor_event()
            .expect("actor side present")
    }

    #[test]
    fn ppm_formula_matches_reference_points() {
        // one second since the last attempt, well inside the average interval
        assert!((ppm_chance(6.0, 1.0, 5.0) - 10.0).abs() < 1e-4);
        // twice the average interval since the last success raises the factor
        assert!((ppm_chance(6.0, 1.0, 20.0) - 25.0).abs() < 1e-4);
        // long droughts are clamped to a certain proc
        assert_eq!(ppm_chance(6.0, 10.0, 1000.0), 100.0);
        assert_eq!(ppm_chance(0.0, 10.0, 1000.0), 0.0);
    }

    #[test]
    fn done_hits_default_to_normal_critical_and_absorb() {
        let entry = SpellProcEntry {
            proc_flags: ProcFlags::DEAL_MELEE_SWING,
            ..SpellProcEntry::default()
        };

        assert!(can_spell_trigger_proc_on_event(&entry, &melee_event(ProcHitMask::ABSORB)));
        assert!(can_spell_trigger_proc_on_event(&entry, &melee_event(ProcHitMask::CRITICAL)));
        assert!(!can_spell_trigger_proc_on_event(&entry, &melee_event(ProcHitMask::MISS)));
    }

    #[test]
    fn flag_and_school_filters() {
        let entry = SpellProcEntry {
            proc_flags: ProcFlags::DEAL_MELEE_SWING,
            school_mask: SchoolMask::FIRE,
            attributes: ProcAttributes::empty(),
            ..SpellProcEntry::default()
        };
        // physical swing does not match a fire-only entry
        assert!(!can_spell_trigger_proc_on_event(&entry, &melee_event(ProcHitMask::NORMAL)));

        let taken_only = SpellProcEntry {
            proc_flags: ProcFlags::TAKE_MELEE_SWING,
            ..SpellProcEntry::default()
        };
        assert!(!can_spell_trigger_proc_on_event(&taken_only, &melee_event(ProcHitMask::NORMAL)));
    }

    #[test]
    fn trigger_splits_sides() {
        let trigger = ProcTrigger::new(Some(ObjectGuid::player(1)), Some(ObjectGuid::unit(2)))
            .with_flags(ProcFlags::DEAL_HARMFUL_PERIODIC, ProcFlags::empty());

        let actor = trigger.actor_event().expect("actor side");
        assert_eq!(actor.proc_target, Some(ObjectGuid::unit(2)));
        assert!(trigger.target_event().is_none());
    }

    #[test]
    fn level_reduction_applies_above_60() {
        assert_eq!(reduce_chance_above_60(30.0, 60), 30.0);
        assert!((reduce_chance_above_60(30.0, 70) - 20.0).abs() < 1e-4);
        assert_eq!(reduce_chance_above_60(30.0, 95), 0.0);
    }
}

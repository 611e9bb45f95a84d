//! Client sync messages for visible aura slots.
//!
//! Layout is little-endian and fixed:
//!
//! ```text
//! packet := target:u64 update_all:u8 count:u16 entry*
//! entry  := slot:u16 has_data:u8 [data]
//! data   := cast_id:u64 spell:u32 visual:u32 flags:u16 active_mask:u32
//!           cast_level:u16 applications:u8 has_caster:u8 [caster:u64]
//!           [duration:i32 remaining:i32]            if flags & DURATION
//!           [n:u8 f32*n m:u8 f32*m]                 if flags & SCALABLE
//! ```
use crate::types::{AuraFlags, CastId, EffectMask, ObjectGuid, SpellId};

/// Full state of one visible aura slot.
#[derive(Clone, Debug, PartialEq)]
pub struct AuraData {
    pub cast_id: CastId,
    pub spell: SpellId,
    pub visual: u32,
    pub flags: AuraFlags,
    pub active_mask: EffectMask,
    pub cast_level: u16,
    /// Stack count for stacking spells, charges otherwise.
    pub applications: u8,
    pub caster: Option<ObjectGuid>,
    /// Only encoded when `flags` has `DURATION`.
    pub duration: i32,
    pub remaining: i32,
    /// Only encoded when `flags` has `SCALABLE`.
    pub points: Vec<f32>,
    pub estimated_points: Vec<f32>,
}

/// Change of one slot; `data == None` clears the slot.
#[derive(Clone, Debug, PartialEq)]
pub struct AuraUpdate {
    pub slot: u8,
    pub data: Option<AuraData>,
}

impl AuraUpdate {
    pub fn removal(slot: u8) -> Self {
        Self { slot, data: None }
    }

    pub fn is_removal(&self) -> bool {
        self.data.is_none()
    }

    pub fn encode_into(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&u16::from(self.slot).to_le_bytes());
        let Some(data) = &self.data else {
            out.push(0);
            return;
        };
        out.push(1);
        out.extend_from_slice(&data.cast_id.0.to_le_bytes());
        out.extend_from_slice(&data.spell.0.to_le_bytes());
        out.extend_from_slice(&data.visual.to_le_bytes());
        out.extend_from_slice(&data.flags.bits().to_le_bytes());
        out.extend_from_slice(&data.active_mask.bits().to_le_bytes());
        out.extend_from_slice(&data.cast_level.to_le_bytes());
        out.push(data.applications);
        match data.caster {
            Some(caster) => {
                out.push(1);
                out.extend_from_slice(&caster.0.to_le_bytes());
            }
            None => out.push(0),
        }
        if data.flags.contains(AuraFlags::DURATION) {
            out.extend_from_slice(&data.duration.to_le_bytes());
            out.extend_from_slice(&data.remaining.to_le_bytes());
        }
        if data.flags.contains(AuraFlags::SCALABLE) {
            encode_points(out, &data.points);
            encode_points(out, &data.estimated_points);
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.encode_into(&mut out);
        out
    }
}

fn encode_points(out: &mut Vec<u8>, points: &[f32]) {
    let count = points.len().min(usize::from(u8::MAX));
    out.push(count as u8);
    for point in &points[..count] {
        out.extend_from_slice(&point.to_le_bytes());
    }
}

/// Batch of slot updates for one unit.
#[derive(Clone, Debug, PartialEq)]
pub struct AuraUpdatePacket {
    pub target: ObjectGuid,
    /// Receiver should drop every slot not listed.
    pub update_all: bool,
    pub updates: Vec<AuraUpdate>,
}

impl AuraUpdatePacket {
    pub fn new(target: ObjectGuid) -> Self {
        Self {
            target,
            update_all: false,
            updates: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.updates.is_empty()
    }

    pub fn push(&mut self, update: AuraUpdate) {
        self.updates.push(update);
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(11 + self.updates.len() * 32);
        out.extend_from_slice(&self.target.0.to_le_bytes());
        out.push(u8::from(self.update_all));
        let count = self.updates.len().min(usize::from(u16::MAX));
        out.extend_from_slice(&(count as u16).to_le_bytes());
        for update in &self.updates[..count] {
            update.encode_into(&mut out);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removal_entry_is_slot_and_zero() {
        assert_eq!(AuraUpdate::removal(3).encode(), vec![3, 0, 0]);
    }

    #[test]
    fn data_entry_without_optional_sections() {
        let update = AuraUpdate {
            slot: 1,
            data: Some(AuraData {
                cast_id: CastId(2),
                spell: SpellId(0x0102),
                visual: 0,
                flags: AuraFlags::NOCASTER | AuraFlags::POSITIVE,
                active_mask: EffectMask(0b1),
                cast_level: 60,
                applications: 0,
                caster: None,
                duration: 0,
                remaining: 0,
                points: Vec::new(),
                estimated_points: Vec::new(),
            }),
        };

        let bytes = update.encode();
        // slot(2) + has_data(1) + cast_id(8) + spell(4) + visual(4) + flags(2)
        // + mask(4) + level(2) + applications(1) + has_caster(1)
        assert_eq!(bytes.len(), 29);
        assert_eq!(&bytes[11..15], &[0x02, 0x01, 0x00, 0x00]);
        assert_eq!(&bytes[19..21], &[0x03, 0x00]);
    }
}

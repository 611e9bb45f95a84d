//! Identifiers, masks and flag sets shared by every aura module.
mod flags;
mod ids;
mod mask;

pub use flags::{AuraFlags, HandleModes, RemoveMode, UnitStateFlags};
pub use ids::{AuraId, CastId, GameTime, ObjectGuid, ObjectKind, PartitionId, Position, SpellId};
pub use mask::EffectMask;

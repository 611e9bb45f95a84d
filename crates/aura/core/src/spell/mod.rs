//! Static spell definitions and the database trait the runtime reads them from.
mod aura_type;
mod catalog;
mod info;
mod kinds;
mod proc;

pub use aura_type::{AuraType, SpellEffectKind};
pub use catalog::{SpellCatalog, SpellGroup, SpellOracle};
pub use info::{SpellAttributes, SpellEffectAttributes, SpellEffectInfo, SpellInfo};
pub use kinds::{
    AuraStateType, DiminishingGroup, DispelType, Mechanic, SchoolMask, SpellGroupStackRule,
    SpellImplicitTarget, SpellModOp, SpellSpecific, TargetCheck, TargetReference,
};
pub use proc::{
    ProcAttributes, ProcFlags, ProcHitMask, ProcSpellPhase, ProcSpellType, SpellProcEntry,
};

//! Collaborators the aura runtime reads from or reports to.
//!
//! [`AuraEnv`] bundles the read-only ones (spell database, RNG, script
//! registry); the mutable entity model is passed separately as a
//! [`UnitHost`].
mod error;
mod host;
mod memory;
mod rng;

use std::sync::Arc;

pub use error::OracleError;
pub use host::{
    AreaTargetQuery, AuraModifier, DamageKind, DamageOutcome, HealOutcome, PowerChange,
    SpellDamage, SpellHeal, TriggeredCast, UnitHost,
};
pub use memory::{MemoryUnit, MemoryWorld};
pub use rng::{FixedRng, PcgRng, RollContext, RngOracle, compute_seed};

use crate::script::ScriptRegistry;
use crate::spell::{SpellInfo, SpellOracle};
use crate::types::SpellId;

/// Read-only collaborators required by the engine.
#[derive(Clone, Copy)]
pub struct AuraEnv<'a> {
    spells: &'a dyn SpellOracle,
    rng: &'a dyn RngOracle,
    scripts: Option<&'a ScriptRegistry>,
}

impl<'a> AuraEnv<'a> {
    pub fn new(spells: &'a dyn SpellOracle, rng: &'a dyn RngOracle) -> Self {
        Self {
            spells,
            rng,
            scripts: None,
        }
    }

    pub fn with_scripts(mut self, scripts: &'a ScriptRegistry) -> Self {
        self.scripts = Some(scripts);
        self
    }

    pub fn spells(&self) -> &'a dyn SpellOracle {
        self.spells
    }

    pub fn spell(&self, id: SpellId) -> Result<Arc<SpellInfo>, OracleError> {
        self.spells.spell(id).ok_or(OracleError::SpellNotFound(id))
    }

    pub fn rng(&self) -> &'a dyn RngOracle {
        self.rng
    }

    pub fn scripts(&self) -> Result<&'a ScriptRegistry, OracleError> {
        self.scripts.ok_or(OracleError::ScriptsNotAvailable)
    }

    /// Registry if one is attached; hook call sites treat "none" as "no hooks".
    pub fn scripts_opt(&self) -> Option<&'a ScriptRegistry> {
        self.scripts
    }
}

//! Aura and buff effect runtime.
//!
//! `aura-core` tracks every timed effect a spell leaves on world objects:
//! who owns it, which units it is bound to, how its effects tick, stack,
//! proc and expire. All state lives in [`state::AuraState`] and is mutated
//! only through [`engine::AuraEngine`]; the entity model stays outside and is
//! reached through the [`env::UnitHost`] trait.
pub mod application;
pub mod aura;
pub mod collection;
pub mod config;
pub mod effect;
pub mod engine;
pub mod env;
pub mod error;
pub mod events;
pub mod holder;
pub mod proc;
pub mod script;
pub mod spell;
pub mod state;
pub mod types;

pub use application::{AuraApplication, AuraData, AuraUpdate, AuraUpdatePacket};
pub use aura::{Aura, AuraCreateInfo, AuraHandle, AuraKind, AuraSaveState};
pub use config::AuraConfig;
pub use effect::AuraEffect;
pub use engine::{AuraEngine, owner_effect_mask};
pub use env::{
    AuraEnv, AuraModifier, DamageKind, FixedRng, MemoryUnit, MemoryWorld, OracleError, PcgRng,
    PowerChange, RngOracle, SpellDamage, SpellHeal, TriggeredCast, UnitHost,
};
pub use error::{AuraCreateError, AuraError, ErrorSeverity};
pub use events::{DeferredChargeEvent, EventId, EventQueue};
pub use holder::{AuraHolder, DiminishingState};
pub use proc::{ProcEvent, ProcSpell, ProcTrigger};
pub use script::{AuraHook, EffectFilter, HookAction, ScriptRegistry};
pub use spell::{
    AuraType, DiminishingGroup, SpellAttributes, SpellCatalog, SpellEffectInfo, SpellEffectKind,
    SpellInfo, SpellOracle, SpellProcEntry,
};
pub use state::AuraState;
pub use types::{
    AuraFlags, AuraId, EffectMask, GameTime, HandleModes, ObjectGuid, Position, RemoveMode,
    SpellId, UnitStateFlags,
};

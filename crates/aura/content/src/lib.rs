//! Data-driven aura content and loaders.
//!
//! This crate reads the static inputs of the aura runtime from disk:
//! - Spell catalogs and spell groups (RON)
//! - Runtime tunables (TOML, `[aura]` table)
//! - Simulation scenarios: units plus a timeline of actions (RON)
//!
//! Content feeds the [`aura_core::SpellOracle`] and [`aura_core::AuraConfig`]
//! consumed by the engine and never appears in aura state.

#[cfg(feature = "loaders")]
pub mod loaders;

#[cfg(feature = "loaders")]
pub use loaders::{
    CatalogFile, ConfigLoader, ContentFactory, LoadResult, Scenario, ScenarioAction,
    ScenarioLoader, SpellCatalogLoader, TimedAction, UnitSpec,
};

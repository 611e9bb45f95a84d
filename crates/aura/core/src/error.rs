//! Common error infrastructure for aura-core.
//!
//! Fallible entry points (aura creation, environment lookups) return typed
//! errors that implement [`AuraError`]. Tick processing never returns errors:
//! missing data degrades to a skipped tick or a zero amount and is logged at
//! the call site.
//!
//! # Design Principles
//!
//! - **Type Safety**: Each entry point has its own error enum
//! - **Rich Context**: Errors carry the aura, spell and target they refer to
//! - **Severity Classification**: Errors are categorized for recovery strategies

use crate::types::{AuraId, ObjectGuid, SpellId};

/// Severity level of an error, used for categorization and recovery strategies.
///
/// - **Recoverable**: The request can succeed later (owner not in world yet)
/// - **Validation**: The request itself is wrong (unknown spell, empty mask)
/// - **Internal**: Unexpected state inconsistencies that require investigation
/// - **Fatal**: Unrecoverable errors indicating corrupted aura state
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ErrorSeverity {
    /// Recoverable error - may succeed on retry.
    Recoverable,

    /// Validation error - invalid input, should not retry without changes.
    Validation,

    /// Internal error - unexpected state inconsistency.
    Internal,

    /// Fatal error - aura state corrupted, cannot continue.
    Fatal,
}

impl ErrorSeverity {
    /// Returns a human-readable description of this severity level.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Recoverable => "recoverable",
            Self::Validation => "validation",
            Self::Internal => "internal",
            Self::Fatal => "fatal",
        }
    }

    /// Returns true if this error is potentially recoverable.
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::Recoverable)
    }

    /// Returns true if this error indicates an internal bug.
    pub const fn is_internal(&self) -> bool {
        matches!(self, Self::Internal | Self::Fatal)
    }
}

/// Contextual information attached to errors for debugging and diagnostics.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ErrorContext {
    /// Aura instance involved (if it already existed).
    pub aura: Option<AuraId>,

    /// Spell the request was made for.
    pub spell: Option<SpellId>,

    /// Owner or target entity.
    pub target: Option<ObjectGuid>,

    /// Effect slot involved (if applicable).
    pub effect_index: Option<u8>,

    /// Optional static message providing additional context.
    pub message: Option<&'static str>,
}

impl ErrorContext {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            aura: None,
            spell: None,
            target: None,
            effect_index: None,
            message: None,
        }
    }

    #[must_use]
    pub const fn with_aura(mut self, aura: AuraId) -> Self {
        self.aura = Some(aura);
        self
    }

    #[must_use]
    pub const fn with_spell(mut self, spell: SpellId) -> Self {
        self.spell = Some(spell);
        self
    }

    #[must_use]
    pub const fn with_target(mut self, target: ObjectGuid) -> Self {
        self.target = Some(target);
        self
    }

    #[must_use]
    pub const fn with_effect_index(mut self, index: u8) -> Self {
        self.effect_index = Some(index);
        self
    }

    #[must_use]
    pub const fn with_message(mut self, message: &'static str) -> Self {
        self.message = Some(message);
        self
    }
}

/// Common trait for all aura-core errors.
///
/// # Implementation Guidelines
///
/// - All error enums should implement this trait
/// - Use `#[derive(thiserror::Error)]` for Display/Error impl
/// - Classify severity based on recoverability, not impact
pub trait AuraError: core::fmt::Display + core::fmt::Debug {
    /// Returns the severity level of this error.
    fn severity(&self) -> ErrorSeverity;

    /// Returns the context information for this error, if available.
    fn context(&self) -> Option<&ErrorContext> {
        None
    }

    /// Returns a static string identifier for this error variant.
    fn error_code(&self) -> &'static str {
        core::any::type_name::<Self>()
    }
}

/// Reasons the aura factory refuses to produce an instance.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum AuraCreateError {
    /// The spell id is not present in the spell database.
    #[error("spell {0} not found")]
    SpellNotFound(SpellId),

    /// The owner does not exist in the entity model.
    #[error("owner {0} not found")]
    OwnerNotFound(ObjectGuid),

    /// The owner kind cannot carry auras (items, game objects).
    #[error("owner {0} cannot own auras")]
    InvalidOwnerKind(ObjectGuid),

    /// None of the requested effects is an aura effect for this owner kind.
    #[error("spell {spell} has no aura effects for owner {owner}")]
    EmptyEffectMask { spell: SpellId, owner: ObjectGuid },

    /// Single-target auras cast by someone else need an owner in the world.
    #[error("single-target aura {spell} refused: owner {owner} is not in world")]
    OwnerNotInWorld { spell: SpellId, owner: ObjectGuid },

    /// Point-anchored auras need the dynamic object's radius.
    #[error("dynamic object aura {0} created without a radius")]
    MissingRadius(SpellId),

    /// Dynamic-object auras always have a caster unit.
    #[error("dynamic object aura {0} created without a caster")]
    MissingCaster(SpellId),

    /// A hook or stacking rule removed the aura while it was being created.
    #[error("aura for spell {0} was removed during creation")]
    RemovedDuringCreate(SpellId),
}

impl AuraError for AuraCreateError {
    fn severity(&self) -> ErrorSeverity {
        use AuraCreateError::*;
        match self {
            SpellNotFound(_) | InvalidOwnerKind(_) | EmptyEffectMask { .. } => {
                ErrorSeverity::Validation
            }
            MissingRadius(_) | MissingCaster(_) => ErrorSeverity::Validation,
            OwnerNotFound(_) | OwnerNotInWorld { .. } => ErrorSeverity::Recoverable,
            RemovedDuringCreate(_) => ErrorSeverity::Recoverable,
        }
    }

    fn error_code(&self) -> &'static str {
        use AuraCreateError::*;
        match self {
            SpellNotFound(_) => "AURA_CREATE_SPELL_NOT_FOUND",
            OwnerNotFound(_) => "AURA_CREATE_OWNER_NOT_FOUND",
            InvalidOwnerKind(_) => "AURA_CREATE_INVALID_OWNER_KIND",
            EmptyEffectMask { .. } => "AURA_CREATE_EMPTY_EFFECT_MASK",
            OwnerNotInWorld { .. } => "AURA_CREATE_OWNER_NOT_IN_WORLD",
            MissingRadius(_) => "AURA_CREATE_MISSING_RADIUS",
            MissingCaster(_) => "AURA_CREATE_MISSING_CASTER",
            RemovedDuringCreate(_) => "AURA_CREATE_REMOVED",
        }
    }
}

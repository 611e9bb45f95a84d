//! Environment lookup errors.

use crate::error::{AuraError, ErrorSeverity};
use crate::types::SpellId;

/// Errors raised when the environment cannot provide requested data.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum OracleError {
    /// Spell id is unknown to the spell database.
    #[error("spell {0} not found in spell database")]
    SpellNotFound(SpellId),

    /// No script registry was attached to the environment.
    #[error("script registry not available")]
    ScriptsNotAvailable,
}

impl AuraError for OracleError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            OracleError::SpellNotFound(_) => ErrorSeverity::Validation,
            OracleError::ScriptsNotAvailable => ErrorSeverity::Recoverable,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            OracleError::SpellNotFound(_) => "ORACLE_SPELL_NOT_FOUND",
            OracleError::ScriptsNotAvailable => "ORACLE_SCRIPTS_NOT_AVAILABLE",
        }
    }
}

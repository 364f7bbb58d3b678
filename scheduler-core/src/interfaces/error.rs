// scheduler-core/src/interfaces/error.rs
// ============================================================================
// Module: Fleet Scheduler Engine Error Taxonomy
// Description: The bad-request/not-found/conflict/transient/fatal taxonomy.
// Purpose: Give every engine operation a single error type callers can match
//          on to decide whether to retry, surface to a caller, or page.
// Dependencies: crate::core, thiserror
// ============================================================================

//! ## Overview
//! Every fallible engine operation returns [`EngineError`]. The variants are
//! chosen for what the *caller* should do, not for where the error
//! originated: a malformed identifier and an out-of-range desired count are
//! both `BadRequest`, even though one is caught in `core::identifiers` and
//! the other in a service. `Transient` errors are worth retrying with
//! backoff; `Fatal` errors indicate a detected invariant violation and are
//! logged for operator attention rather than retried.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

use crate::core::environment::EnvironmentInvariantViolation;
use crate::core::identifiers::IdentifierError;

// ============================================================================
// SECTION: Engine Error
// ============================================================================

/// Error taxonomy shared by every engine-facing operation.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The request is malformed and will never succeed unmodified.
    #[error("bad request: {0}")]
    BadRequest(String),
    /// The named resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),
    /// A compare-and-swap lost a race, or a state precondition was not met.
    #[error("conflict: {0}")]
    Conflict(String),
    /// The orchestrator reported a status outside the set this code expects.
    #[error("unexpected status: {0}")]
    UnexpectedStatus(String),
    /// The operation failed for a reason expected to clear on retry.
    #[error("transient error: {0}")]
    Transient(String),
    /// An invariant that should be impossible to violate was violated.
    #[error("fatal: {0}")]
    Fatal(String),
}

impl From<IdentifierError> for EngineError {
    fn from(err: IdentifierError) -> Self {
        Self::BadRequest(err.to_string())
    }
}

impl From<EnvironmentInvariantViolation> for EngineError {
    fn from(err: EnvironmentInvariantViolation) -> Self {
        Self::Fatal(err.to_string())
    }
}

impl EngineError {
    /// Returns true for error variants a caller may reasonably retry.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient(_) | Self::Conflict(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_and_transient_are_retryable() {
        assert!(EngineError::Conflict("x".into()).is_retryable());
        assert!(EngineError::Transient("x".into()).is_retryable());
        assert!(!EngineError::BadRequest("x".into()).is_retryable());
        assert!(!EngineError::Fatal("x".into()).is_retryable());
    }

    #[test]
    fn identifier_error_becomes_bad_request() {
        let err: EngineError = IdentifierError::Empty.into();
        assert!(matches!(err, EngineError::BadRequest(_)));
    }
}

// scheduler-engine/src/errors.rs
// ============================================================================
// Module: Fleet Scheduler Engine Error Mapping
// Description: Maps store and facade errors onto the shared engine taxonomy.
// Purpose: Give every service/worker/dispatcher function one place to
//          translate a backend-specific error into `EngineError`, preserving
//          the root cause category.
// Dependencies: scheduler-core, scheduler-facade
// ============================================================================

use scheduler_core::EngineError;
use scheduler_core::StoreError;
use scheduler_facade::FacadeError;

/// Prefix a `validate` closure uses to mark a rejection as `not-found`
/// rather than the default `bad-request`.
const TAG_NOT_FOUND: &str = "not-found: ";
/// Prefix a `validate` closure uses to mark a rejection as
/// `unexpected-status` (an optimistic-concurrency race inside deployment
/// promotion).
const TAG_UNEXPECTED_STATUS: &str = "unexpected-status: ";
/// Prefix a `validate` closure uses to mark a rejection as a detected
/// invariant violation (`fatal`).
const TAG_FATAL: &str = "fatal: ";

/// Tags a rejection message so [`from_store_error`] recovers the intended
/// [`EngineError`] variant instead of defaulting every `validate` rejection
/// to `bad-request`. The `Store::put` contract fixes the validator's error
/// channel to a bare `String`; this is the one place that channel is
/// multiplexed back into the richer taxonomy.
#[must_use]
pub fn not_found(message: impl std::fmt::Display) -> String {
    format!("{TAG_NOT_FOUND}{message}")
}

/// See [`not_found`].
#[must_use]
pub fn unexpected_status(message: impl std::fmt::Display) -> String {
    format!("{TAG_UNEXPECTED_STATUS}{message}")
}

/// See [`not_found`].
#[must_use]
pub fn fatal(message: impl std::fmt::Display) -> String {
    format!("{TAG_FATAL}{message}")
}

/// Maps a store error onto the engine's error taxonomy.
///
/// `ValidationFailed` carries a message produced by the `validate` closure;
/// messages tagged via [`not_found`], [`unexpected_status`], or [`fatal`]
/// recover their intended variant, everything else is `bad-request` (the
/// default domain-precondition failure).
#[must_use]
pub fn from_store_error(err: StoreError) -> EngineError {
    match err {
        StoreError::ValidationFailed(message) => {
            if let Some(rest) = message.strip_prefix(TAG_NOT_FOUND) {
                EngineError::NotFound(rest.to_string())
            } else if let Some(rest) = message.strip_prefix(TAG_UNEXPECTED_STATUS) {
                EngineError::UnexpectedStatus(rest.to_string())
            } else if let Some(rest) = message.strip_prefix(TAG_FATAL) {
                EngineError::Fatal(rest.to_string())
            } else {
                EngineError::BadRequest(message)
            }
        }
        StoreError::CasConflict(message) => EngineError::Conflict(message),
        StoreError::Io(message) => EngineError::Transient(message),
        StoreError::Corrupt(message) => EngineError::Fatal(message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tagged_validation_messages_recover_their_variant() {
        assert!(matches!(
            from_store_error(StoreError::ValidationFailed(not_found("x"))),
            EngineError::NotFound(_)
        ));
        assert!(matches!(
            from_store_error(StoreError::ValidationFailed(unexpected_status("x"))),
            EngineError::UnexpectedStatus(_)
        ));
        assert!(matches!(
            from_store_error(StoreError::ValidationFailed(fatal("x"))),
            EngineError::Fatal(_)
        ));
    }

    #[test]
    fn untagged_validation_message_defaults_to_bad_request() {
        assert!(matches!(
            from_store_error(StoreError::ValidationFailed("plain".to_string())),
            EngineError::BadRequest(_)
        ));
    }
}

/// Maps a facade error onto the engine's error taxonomy.
#[must_use]
pub fn from_facade_error(err: FacadeError) -> EngineError {
    match err {
        FacadeError::NotFound(message) => EngineError::NotFound(message),
        FacadeError::BadRequest(message) => EngineError::BadRequest(message),
        FacadeError::UnexpectedStatus(message) => EngineError::UnexpectedStatus(message),
        FacadeError::Transient(message) => EngineError::Transient(message),
    }
}

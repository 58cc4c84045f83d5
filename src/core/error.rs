//! Error taxonomy shared by the engine and its callers.
//!
//! - [`InvalidTransition`] the requested state change is not permitted from
//!   the current state. Surfaced, never retried.
//! - [`TerminalStateViolation`] the entity is `resolved` or `cancelled`.
//!   Surfaced, never retried.
//! - [`Conflict`] a commit lost a race against the store of record. The
//!   caller re-reads and re-evaluates before retrying.
//! - [`NotFound`] a referenced entity is missing from the store.
//!
//!  [`InvalidTransition`]: EngineError::InvalidTransition
//!  [`TerminalStateViolation`]: EngineError::TerminalStateViolation
//!  [`Conflict`]: EngineError::Conflict
//!  [`NotFound`]: EngineError::NotFound
use crate::models::RequestStatus;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum EngineError {
    #[error("invalid transition from {from} to {to}: {reason}")]
    InvalidTransition {
        from: RequestStatus,
        to: RequestStatus,
        reason: String,
    },

    #[error("request is {status} and can no longer change")]
    TerminalStateViolation { status: RequestStatus },

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("{collection} `{id}` not found")]
    NotFound { collection: String, id: String },
}

impl EngineError {
    pub(crate) fn invalid(from: RequestStatus, to: RequestStatus, reason: impl Into<String>) -> Self {
        EngineError::InvalidTransition {
            from,
            to,
            reason: reason.into(),
        }
    }

    /// Only a lost race is worth retrying with fresh state
    pub fn is_retryable(&self) -> bool {
        matches!(self, EngineError::Conflict(_))
    }
}

pub type EngineResult<T> = Result<T, EngineError>;

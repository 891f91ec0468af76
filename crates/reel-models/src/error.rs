//! Model-level validation errors.

use thiserror::Error;

/// Result type for model operations.
pub type ModelResult<T> = Result<T, ModelError>;

/// Errors raised when an update would violate a model invariant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("invalid {entity} status transition: {from} -> {to}")]
    InvalidTransition {
        entity: &'static str,
        from: &'static str,
        to: &'static str,
    },

    #[error("invalid trim range: end {end_ms}ms must be greater than start {start_ms}ms")]
    InvalidTrim { start_ms: u64, end_ms: u64 },

    #[error("field {0} is already set and cannot change")]
    AlreadySet(&'static str),
}

impl ModelError {
    pub fn invalid_transition(entity: &'static str, from: &'static str, to: &'static str) -> Self {
        Self::InvalidTransition { entity, from, to }
    }
}

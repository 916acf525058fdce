//! Error types for qipilot.
//!
//! All errors in qipilot are strongly typed using thiserror.
//! Store and engine operations return structured errors rather than partial
//! results; callers surface them as user-facing failures.

use thiserror::Error;

use crate::pilot::{PilotId, PilotStatus};
use crate::storage::StorageError;

/// Validation errors that occur during input validation.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Required field '{field}' is missing")]
    MissingField {
        field: String,
    },

    #[error("Metric '{metric}' must be a non-negative finite number, got {value}")]
    InvalidMetric {
        metric: String,
        value: f64,
    },

    #[error("Invalid simulation config: {reason}")]
    InvalidSimulationConfig {
        reason: String,
    },
}

/// Execution errors that occur during operation execution.
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("Pilot not found: {id}")]
    PilotNotFound {
        id: PilotId,
    },

    #[error("Simulation already in progress for pilot {id}")]
    SimulationInProgress {
        id: PilotId,
    },

    #[error("Pilot {id} already completed its simulation")]
    AlreadyCompleted {
        id: PilotId,
    },

    #[error("Invalid lifecycle transition for pilot {id}: {from} -> {to}")]
    InvalidTransition {
        id: PilotId,
        from: PilotStatus,
        to: PilotStatus,
    },

    #[error("Storage error: {message}")]
    Storage {
        message: String,
    },

    #[error("Operation timed out after {duration_ms}ms")]
    Timeout {
        duration_ms: u64,
    },

    #[error("Channel disconnected: {path}")]
    Disconnected {
        path: String,
    },
}

/// Top-level error type for qipilot.
#[derive(Debug, Error)]
pub enum PilotError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Execution error: {0}")]
    Execution(#[from] ExecutionError),

    #[error("Internal error: {message}")]
    Internal {
        message: String,
    },
}

impl From<StorageError> for PilotError {
    fn from(err: StorageError) -> Self {
        let exec = match err {
            StorageError::PilotNotFound(id) => ExecutionError::PilotNotFound { id },
            StorageError::InvalidTransition {
                id,
                from: PilotStatus::Completed,
                ..
            } => ExecutionError::AlreadyCompleted { id },
            StorageError::InvalidTransition { id, from, to } => {
                ExecutionError::InvalidTransition { id, from, to }
            }
            other => ExecutionError::Storage {
                message: other.to_string(),
            },
        };
        Self::Execution(exec)
    }
}

impl PilotError {
    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns true if this is a validation error.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Returns true if this is an execution error.
    #[must_use]
    pub const fn is_execution(&self) -> bool {
        matches!(self, Self::Execution(_))
    }

    /// Returns true if this is an internal error.
    #[must_use]
    pub const fn is_internal(&self) -> bool {
        matches!(self, Self::Internal { .. })
    }

    /// Returns true if the referenced pilot does not exist (maps to a 404).
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::Execution(ExecutionError::PilotNotFound { .. }))
    }

    /// Returns true if the request conflicts with the pilot's current lifecycle.
    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(
            self,
            Self::Execution(
                ExecutionError::SimulationInProgress { .. }
                    | ExecutionError::AlreadyCompleted { .. }
                    | ExecutionError::InvalidTransition { .. }
            )
        )
    }

    /// Returns true if this error is retryable.
    ///
    /// Not-found and lifecycle conflicts are logical errors and never retried.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Execution(ExecutionError::Timeout { .. }))
    }
}

/// Result type alias for qipilot operations.
pub type PilotResult<T> = Result<T, PilotError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_missing_field() {
        let err = ValidationError::MissingField {
            field: "org_name".to_string(),
        };
        let msg = format!("{err}");
        assert!(msg.contains("org_name"));
        assert!(msg.contains("missing"));
    }

    #[test]
    fn test_execution_error_not_found() {
        let id = PilotId::new();
        let err = ExecutionError::PilotNotFound { id };
        let msg = format!("{err}");
        assert!(msg.contains("Pilot not found"));
        assert!(msg.contains(&id.to_string()));
    }

    #[test]
    fn test_storage_not_found_maps_to_not_found() {
        let err: PilotError = StorageError::PilotNotFound(PilotId::new()).into();
        assert!(err.is_not_found());
        assert!(!err.is_conflict());
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_completed_transition_maps_to_already_completed() {
        let id = PilotId::new();
        let err: PilotError = StorageError::InvalidTransition {
            id,
            from: PilotStatus::Completed,
            to: PilotStatus::Completed,
        }
        .into();
        assert!(matches!(
            err,
            PilotError::Execution(ExecutionError::AlreadyCompleted { id: got }) if got == id
        ));
        assert!(err.is_conflict());
    }

    #[test]
    fn test_backend_error_maps_to_storage() {
        let err: PilotError = StorageError::BackendError("poisoned lock".to_string()).into();
        assert!(err.is_execution());
        assert!(format!("{err}").contains("poisoned lock"));
    }

    #[test]
    fn test_pilot_error_predicates() {
        let err = PilotError::internal("unexpected state");
        assert!(err.is_internal());
        assert!(!err.is_retryable());
        assert!(format!("{err}").contains("unexpected state"));

        let err: PilotError = ExecutionError::SimulationInProgress { id: PilotId::new() }.into();
        assert!(err.is_conflict());

        let err: PilotError = ExecutionError::Timeout { duration_ms: 100 }.into();
        assert!(err.is_retryable());

        let err: PilotError = ValidationError::MissingField {
            field: "name".to_string(),
        }
        .into();
        assert!(err.is_validation());
        assert!(!err.is_retryable());
    }
}

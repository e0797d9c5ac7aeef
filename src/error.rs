//! Error types.
//!
//! Only structural problems abort a run: bad configuration, an unknown
//! algorithm, a malformed snapshot, or a failed commit. Problems with an
//! individual task never surface here; they degrade the result instead
//! (see [`UnschedulableReason`](crate::models::UnschedulableReason)).

use thiserror::Error;

use crate::models::TaskId;

/// Errors that abort an optimization run.
#[derive(Debug, Error)]
pub enum OptimizeError {
    /// A configuration field is out of range.
    #[error("invalid configuration `{field}`: {message}")]
    InvalidConfig {
        /// Offending field name.
        field: &'static str,
        /// What is wrong with it.
        message: String,
    },

    /// The requested algorithm name is not one of the known strategies.
    #[error("unknown optimization algorithm `{name}` (expected one of: {expected})")]
    UnknownAlgorithm {
        /// Name as supplied by the caller.
        name: String,
        /// Comma-separated list of accepted names.
        expected: String,
    },

    /// The task snapshot is structurally broken.
    #[error("invalid task snapshot: {message}")]
    InvalidInput {
        /// What is wrong.
        message: String,
        /// Task ids involved.
        task_ids: Vec<TaskId>,
    },

    /// The task source could not be read.
    #[error("task source unavailable: {0}")]
    Source(String),

    /// Committing the accepted slots failed; nothing was written.
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

impl OptimizeError {
    pub(crate) fn invalid_config(field: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field,
            message: message.into(),
        }
    }

    /// Whether the error was caused by caller input rather than a collaborator.
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidConfig { .. } | Self::UnknownAlgorithm { .. } | Self::InvalidInput { .. }
        )
    }
}

/// Failure reported by a [`PersistenceSink`](crate::ports::PersistenceSink).
///
/// A sink returning this error guarantees that none of the slots of the
/// rejected batch were applied.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PersistenceError {
    /// A slot refers to a task the store does not know.
    #[error("cannot persist schedule: task {0} not found")]
    UnknownTask(TaskId),

    /// The store rejected the batch.
    #[error("cannot persist schedule: {0}")]
    Rejected(String),
}

/// Convenience alias used across the crate.
pub type Result<T> = std::result::Result<T, OptimizeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_carry_context() {
        let err = OptimizeError::invalid_config("max_hours_per_day", "must be in (0, 24], got 0");
        assert_eq!(
            err.to_string(),
            "invalid configuration `max_hours_per_day`: must be in (0, 24], got 0"
        );
        assert!(err.is_caller_error());

        let err = OptimizeError::UnknownAlgorithm {
            name: "astar".into(),
            expected: "greedy, genetic".into(),
        };
        assert!(err.to_string().contains("astar"));
    }

    #[test]
    fn test_persistence_conversion() {
        let err: OptimizeError = PersistenceError::UnknownTask(9).into();
        assert!(matches!(err, OptimizeError::Persistence(_)));
        assert!(!err.is_caller_error());
        assert!(err.to_string().contains("task 9"));
    }
}

//! Input validation for task snapshots.
//!
//! Checks structural integrity of the snapshot before planning. Detects:
//! - Duplicate task IDs
//! - Priorities that are not strictly positive
//! - Durations outside `(0, 999]` hours
//! - Dependencies on IDs missing from the snapshot
//!
//! Cycles are not checked here; the dependency resolver reports them
//! per strongly connected component (see [`crate::graph`]).

use crate::models::{Task, TaskId, MAX_DURATION_HOURS};
use std::collections::HashSet;

/// Validation result.
pub type ValidationResult = Result<(), Vec<ValidationError>>;

/// A validation error.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    /// Error category.
    pub kind: ValidationErrorKind,
    /// Task the error is about.
    pub task_id: TaskId,
    /// Human-readable description.
    pub message: String,
}

/// Categories of validation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationErrorKind {
    /// Two tasks share the same ID.
    DuplicateId,
    /// Priority is zero, negative or not a number.
    InvalidPriority,
    /// Estimated duration is outside `(0, 999]`.
    InvalidDuration,
    /// A dependency references a task absent from the snapshot.
    UnknownDependency,
}

impl ValidationErrorKind {
    /// Whether the whole snapshot is unusable.
    ///
    /// Non-fatal kinds only affect the offending task.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::DuplicateId)
    }

    /// Whether the offending task must be excluded from placement.
    pub fn excludes_task(&self) -> bool {
        matches!(self, Self::InvalidPriority | Self::InvalidDuration)
    }
}

impl ValidationError {
    fn new(kind: ValidationErrorKind, task_id: TaskId, message: impl Into<String>) -> Self {
        Self {
            kind,
            task_id,
            message: message.into(),
        }
    }
}

/// Validates a task snapshot.
///
/// Checks:
/// 1. No duplicate task IDs
/// 2. Every schedulable task has `priority > 0`
/// 3. Every schedulable task has `0 < estimated_duration_hours <= 999`
/// 4. All dependency references point to tasks in the snapshot
///
/// Terminal tasks are only checked for duplicates; their other fields are
/// irrelevant to planning.
///
/// # Returns
/// `Ok(())` if all checks pass, `Err(errors)` with all detected issues.
pub fn validate_tasks(tasks: &[Task]) -> ValidationResult {
    let mut errors = Vec::new();

    let mut ids = HashSet::new();
    for task in tasks {
        if !ids.insert(task.id) {
            errors.push(ValidationError::new(
                ValidationErrorKind::DuplicateId,
                task.id,
                format!("Duplicate task ID: {}", task.id),
            ));
        }
    }

    for task in tasks.iter().filter(|t| t.is_schedulable()) {
        if !(task.priority > 0.0) {
            errors.push(ValidationError::new(
                ValidationErrorKind::InvalidPriority,
                task.id,
                format!("Task {} has non-positive priority {}", task.id, task.priority),
            ));
        }

        let hours = task.estimated_duration_hours;
        if !(hours > 0.0 && hours <= MAX_DURATION_HOURS) || task.duration_secs() == 0 {
            errors.push(ValidationError::new(
                ValidationErrorKind::InvalidDuration,
                task.id,
                format!(
                    "Task {} has estimated duration {hours}h outside (0, {MAX_DURATION_HOURS}]",
                    task.id
                ),
            ));
        }

        for dep in &task.dependencies {
            if !ids.contains(dep) {
                errors.push(ValidationError::new(
                    ValidationErrorKind::UnknownDependency,
                    task.id,
                    format!("Task {} references unknown dependency {dep}", task.id),
                ));
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

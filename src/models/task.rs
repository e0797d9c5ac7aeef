//! Task model.
//!
//! A task is a unit of personal work read from the external task store.
//! The engine only ever sees an immutable snapshot; it never mutates a
//! `Task` directly and writes results back through a
//! [`PersistenceSink`](crate::ports::PersistenceSink).
//!
//! # Time Representation
//! All instants are local wall-clock `NaiveDateTime`s. Durations are
//! carried as fractional hours and converted to whole seconds for
//! capacity accounting.

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Task identifier as assigned by the task store.
pub type TaskId = i64;

/// Upper bound (inclusive) on `estimated_duration_hours`.
pub const MAX_DURATION_HOURS: f64 = 999.0;

/// Anything that refers to exactly one task.
///
/// Shared by inputs and outputs that must be matched back to a task
/// (slots, unschedulable entries, the tasks themselves).
pub trait TaskKeyed {
    /// The referenced task.
    fn task_id(&self) -> TaskId;
}

/// The first item in `items` that refers to `id`.
pub fn find_by_task<T: TaskKeyed>(items: &[T], id: TaskId) -> Option<&T> {
    items.iter().find(|item| item.task_id() == id)
}

/// Task lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Not started.
    Pending,
    /// Work has begun.
    InProgress,
    /// Done. Satisfies dependents immediately.
    Completed,
    /// Abandoned (failed or canceled).
    #[serde(alias = "failed")]
    Canceled,
    /// Hidden from active planning.
    Archived,
}

impl TaskStatus {
    /// Whether the task is finished for planning purposes.
    ///
    /// Terminal tasks are never scheduled, and dependencies on them are
    /// treated as satisfied.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Canceled | Self::Archived)
    }
}

/// A task snapshot as seen by the optimizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Unique task identifier.
    pub id: TaskId,
    /// Short title (diagnostics only).
    #[serde(default)]
    pub title: String,
    /// Lifecycle state.
    pub status: TaskStatus,
    /// Urgency (higher = more urgent). Must be > 0.
    pub priority: f64,
    /// Estimated effort in hours. Must satisfy `0 < v <= 999`.
    pub estimated_duration_hours: f64,
    /// Latest desired completion instant.
    #[serde(default)]
    pub deadline: Option<NaiveDateTime>,
    /// Tasks that must be completed before this one may start.
    #[serde(default)]
    pub dependencies: BTreeSet<TaskId>,
    /// Start written by a previous optimization run.
    #[serde(default)]
    pub planned_start: Option<NaiveDateTime>,
    /// End written by a previous optimization run.
    #[serde(default)]
    pub planned_end: Option<NaiveDateTime>,
    /// When work actually began.
    #[serde(default)]
    pub actual_start: Option<NaiveDateTime>,
    /// When work actually stopped.
    #[serde(default)]
    pub actual_end: Option<NaiveDateTime>,
}

impl Task {
    /// Creates a pending task with priority 1 and a one-hour estimate.
    pub fn new(id: TaskId) -> Self {
        Self {
            id,
            title: String::new(),
            status: TaskStatus::Pending,
            priority: 1.0,
            estimated_duration_hours: 1.0,
            deadline: None,
            dependencies: BTreeSet::new(),
            planned_start: None,
            planned_end: None,
            actual_start: None,
            actual_end: None,
        }
    }

    /// Sets the title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Sets the status.
    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = status;
        self
    }

    /// Sets the priority.
    pub fn with_priority(mut self, priority: f64) -> Self {
        self.priority = priority;
        self
    }

    /// Sets the estimated duration in hours.
    pub fn with_duration_hours(mut self, hours: f64) -> Self {
        self.estimated_duration_hours = hours;
        self
    }

    /// Sets the deadline.
    pub fn with_deadline(mut self, deadline: NaiveDateTime) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Adds a dependency.
    pub fn with_dependency(mut self, id: TaskId) -> Self {
        self.dependencies.insert(id);
        self
    }

    /// Sets a previously planned slot.
    pub fn with_planned(mut self, start: NaiveDateTime, end: NaiveDateTime) -> Self {
        self.planned_start = Some(start);
        self.planned_end = Some(end);
        self
    }

    /// Records actual work.
    pub fn with_actual(mut self, start: NaiveDateTime, end: NaiveDateTime) -> Self {
        self.actual_start = Some(start);
        self.actual_end = Some(end);
        self
    }

    /// Whether the task may be scheduled.
    pub fn is_schedulable(&self) -> bool {
        !self.status.is_terminal()
    }

    /// Estimated duration in whole seconds.
    pub fn duration_secs(&self) -> i64 {
        hours_to_secs(self.estimated_duration_hours)
    }

    /// Estimated duration as a `chrono::Duration`.
    pub fn duration(&self) -> Duration {
        Duration::seconds(self.duration_secs())
    }

    /// The previously planned slot, if both ends are known and ordered.
    pub fn planned_window(&self) -> Option<(NaiveDateTime, NaiveDateTime)> {
        match (self.planned_start, self.planned_end) {
            (Some(s), Some(e)) if e > s => Some((s, e)),
            (Some(s), _) => Some((s, s + self.duration())),
            _ => None,
        }
    }

    /// The actual-work interval, if both ends are known and ordered.
    pub fn actual_window(&self) -> Option<(NaiveDateTime, NaiveDateTime)> {
        match (self.actual_start, self.actual_end) {
            (Some(s), Some(e)) if e > s => Some((s, e)),
            _ => None,
        }
    }
}

impl TaskKeyed for Task {
    fn task_id(&self) -> TaskId {
        self.id
    }
}

/// Converts fractional hours to whole seconds (rounded).
pub fn hours_to_secs(hours: f64) -> i64 {
    (hours * 3600.0).round() as i64
}

/// Converts seconds to fractional hours.
pub fn secs_to_hours(secs: i64) -> f64 {
    secs as f64 / 3600.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 8)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    #[test]
    fn test_task_builder() {
        let task = Task::new(7)
            .with_title("write report")
            .with_priority(3.0)
            .with_duration_hours(2.5)
            .with_deadline(at(17, 0))
            .with_dependency(3)
            .with_dependency(4);

        assert_eq!(task.id, 7);
        assert_eq!(task.title, "write report");
        assert_eq!(task.priority, 3.0);
        assert_eq!(task.duration_secs(), 9000);
        assert_eq!(task.deadline, Some(at(17, 0)));
        assert_eq!(task.dependencies.len(), 2);
        assert!(task.is_schedulable());
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(!TaskStatus::Pending.is_terminal());
        assert!(!TaskStatus::InProgress.is_terminal());
        assert!(TaskStatus::Completed.is_terminal());
        assert!(TaskStatus::Canceled.is_terminal());
        assert!(TaskStatus::Archived.is_terminal());
    }

    #[test]
    fn test_planned_window_falls_back_to_duration() {
        let task = Task::new(1).with_duration_hours(2.0);
        assert!(task.planned_window().is_none());

        let mut half = task.clone();
        half.planned_start = Some(at(9, 30));
        assert_eq!(half.planned_window(), Some((at(9, 30), at(11, 30))));

        let full = task.with_planned(at(10, 0), at(10, 30));
        assert_eq!(full.planned_window(), Some((at(10, 0), at(10, 30))));
    }

    #[test]
    fn test_hours_secs_conversion() {
        assert_eq!(hours_to_secs(0.25), 900);
        assert_eq!(hours_to_secs(1.0 / 3.0), 1200);
        assert!((secs_to_hours(5400) - 1.5).abs() < 1e-12);
    }

    #[test]
    fn test_status_deserializes_failed_alias() {
        let status: TaskStatus = serde_json::from_str("\"failed\"").unwrap();
        assert_eq!(status, TaskStatus::Canceled);
        let status: TaskStatus = serde_json::from_str("\"in_progress\"").unwrap();
        assert_eq!(status, TaskStatus::InProgress);
    }
}

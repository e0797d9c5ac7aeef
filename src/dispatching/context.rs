//! Scheduling context for dispatching rule evaluation.

use chrono::NaiveDateTime;
use std::collections::HashMap;

use crate::graph::DependencyBounds;
use crate::models::TaskId;

/// Planning state passed to dispatching rules.
///
/// Contains the planning start and the dependency bound of every task
/// known to the resolver.
#[derive(Debug, Clone)]
pub struct SchedulingContext {
    /// Planning start; default bound for tasks without one.
    pub current_time: NaiveDateTime,
    /// Earliest-eligible start per task.
    pub earliest_start: HashMap<TaskId, NaiveDateTime>,
}

impl SchedulingContext {
    /// Creates a context at the given time with no bounds.
    pub fn at_time(current_time: NaiveDateTime) -> Self {
        Self {
            current_time,
            earliest_start: HashMap::new(),
        }
    }

    /// Creates a context carrying resolved dependency bounds.
    pub fn from_bounds(current_time: NaiveDateTime, bounds: &DependencyBounds) -> Self {
        Self {
            current_time,
            earliest_start: bounds.iter().collect(),
        }
    }

    /// Sets the earliest start of a task.
    pub fn with_earliest_start(mut self, task_id: TaskId, at: NaiveDateTime) -> Self {
        self.earliest_start.insert(task_id, at);
        self
    }

    /// Earliest start of a task, defaulting to `current_time`.
    pub fn earliest_start_of(&self, task_id: TaskId) -> NaiveDateTime {
        self.earliest_start
            .get(&task_id)
            .copied()
            .unwrap_or(self.current_time)
    }
}

//! Result assembly.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::{PlanningProblem, ScheduleKpi, StrategyOutcome};
use crate::models::{
    find_by_task, DeadlineMiss, Quality, ScheduleSlot, Task, TaskId, TaskKeyed, Unschedulable,
    UnschedulableReason,
};

/// Outcome of one optimization run.
///
/// `slots` are the newly placed slots (the ones a commit writes);
/// `retained` are previously planned slots that were kept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationResult {
    /// Strategy that produced the slots.
    pub algorithm: String,
    /// Planning start.
    pub start: NaiveDateTime,
    /// New slots, ordered by start then task id.
    pub slots: Vec<ScheduleSlot>,
    /// Kept slots, ordered by start then task id.
    pub retained: Vec<ScheduleSlot>,
    /// Tasks without a slot, by task id.
    pub unschedulable: Vec<Unschedulable>,
    /// New slots ending after their deadline, by task id.
    pub deadline_misses: Vec<DeadlineMiss>,
    /// Penalty and search statistics.
    pub quality: Quality,
    /// Metrics over the new slots.
    pub kpi: ScheduleKpi,
    /// Round robin stopped at its iteration cap.
    pub timed_out: bool,
    /// The run was cancelled; the result is the best found so far.
    pub cancelled: bool,
    /// Nothing is persisted for this run.
    pub dry_run: bool,
    /// The slots were written to the store.
    pub committed: bool,
}

impl OptimizationResult {
    /// Number of new slots.
    pub fn scheduled_count(&self) -> usize {
        self.slots.len()
    }

    /// The new slot of a task, if any.
    pub fn slot_for(&self, task_id: TaskId) -> Option<&ScheduleSlot> {
        find_by_task(&self.slots, task_id)
    }

    /// Why a task received no slot, if it did not.
    pub fn reason_for(&self, task_id: TaskId) -> Option<&UnschedulableReason> {
        find_by_task(&self.unschedulable, task_id).map(|u| &u.reason)
    }

    /// The deadline miss of a task, if it is late.
    pub fn miss_for(&self, task_id: TaskId) -> Option<&DeadlineMiss> {
        find_by_task(&self.deadline_misses, task_id)
    }

    /// Whether every task that could be placed was placed on time.
    pub fn is_clean(&self) -> bool {
        self.unschedulable.is_empty() && self.deadline_misses.is_empty()
    }
}

/// Packages a strategy outcome into an [`OptimizationResult`].
#[derive(Debug, Clone)]
pub struct ResultBuilder {
    algorithm: String,
    dry_run: bool,
}

impl ResultBuilder {
    /// Creates a builder for the named strategy.
    pub fn new(algorithm: impl Into<String>) -> Self {
        Self {
            algorithm: algorithm.into(),
            dry_run: false,
        }
    }

    /// Marks the result as a dry run.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Builds the result.
    ///
    /// Merges exclusions from preparation with those from placement and
    /// orders every list deterministically.
    pub fn build(&self, problem: &PlanningProblem, outcome: StrategyOutcome) -> OptimizationResult {
        let StrategyOutcome { placement, quality } = outcome;

        let mut slots = placement.slots;
        slots.sort_by_key(|s| (s.start, s.task_id));

        let mut retained = problem.retained.clone();
        retained.sort_by_key(|s| (s.start, s.task_id));

        let mut unschedulable: Vec<Unschedulable> = problem.excluded.clone();
        unschedulable.extend(placement.unplaced);
        unschedulable.sort_by_key(TaskKeyed::task_id);

        let mut deadline_misses = placement.deadline_misses;
        deadline_misses.sort_by_key(TaskKeyed::task_id);

        let tasks: Vec<Task> = problem.tasks.values().cloned().collect();
        let kpi = ScheduleKpi::calculate(
            &slots,
            &tasks,
            problem.start,
            problem.capacity.max_hours_per_day,
        );

        OptimizationResult {
            algorithm: self.algorithm.clone(),
            start: problem.start,
            slots,
            retained,
            unschedulable,
            deadline_misses,
            quality,
            kpi,
            timed_out: placement.timed_out,
            cancelled: placement.cancelled,
            dry_run: self.dry_run,
            committed: false,
        }
    }
}

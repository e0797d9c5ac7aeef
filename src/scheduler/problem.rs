//! Prepared planning input.
//!
//! [`PlanningProblem::prepare`] turns a raw task snapshot into what every
//! strategy consumes: the placeable tasks, their dependency bounds, the
//! greedy processing order, the slots that are kept as they are, and the
//! tasks excluded before placement.
//!
//! # Preparation
//! 1. Validate the snapshot. Duplicate ids abort; tasks with a bad
//!    priority or duration are excluded.
//! 2. Without `force_override`, tasks with a planned slot keep it.
//! 3. Resolve dependencies (cycles, blocked dependents, bounds).
//! 4. Sort the remaining tasks with [`RuleEngine::task_sorter`].

use chrono::NaiveDateTime;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

use crate::config::OptimizeScheduleInput;
use crate::dispatching::{RuleEngine, SchedulingContext};
use crate::error::{OptimizeError, Result};
use crate::graph::{DependencyBounds, DependencyGraph};
use crate::models::{
    ScheduleSlot, Task, TaskId, Unschedulable, UnschedulableReason, WorkCapacityModel,
};
use crate::validation::{validate_tasks, ValidationErrorKind};
use crate::workload::{make_workload_strategy, WeekdayOnlyStrategy, WorkloadStrategy};

/// Run-level settings used to prepare a [`PlanningProblem`].
#[derive(Debug)]
pub struct PlanSettings {
    /// Planning start.
    pub start: NaiveDateTime,
    /// Daily window and ceiling.
    pub capacity: WorkCapacityModel,
    /// Capacity accounting rule.
    pub workload: Box<dyn WorkloadStrategy>,
    /// Re-plan tasks that already carry a planned slot.
    pub force_override: bool,
    /// Penalty per hour of lateness.
    pub penalty_multiplier: f64,
}

impl PlanSettings {
    /// Default capacity model, weekday-only accounting, multiplier 10.
    pub fn new(start: NaiveDateTime) -> Self {
        let capacity = WorkCapacityModel::default();
        Self {
            start,
            workload: Box::new(WeekdayOnlyStrategy::from_model(&capacity)),
            capacity,
            force_override: false,
            penalty_multiplier: 10.0,
        }
    }

    /// Settings described by a run input, starting at `start`.
    pub fn from_input(input: &OptimizeScheduleInput, start: NaiveDateTime) -> Self {
        let capacity = input.capacity_model();
        Self {
            start,
            workload: make_workload_strategy(input.workload_policy, &capacity),
            capacity,
            force_override: input.force_override,
            penalty_multiplier: input.parameters.deadline_penalty_multiplier,
        }
    }

    /// Sets the capacity model (the workload rule follows its weekdays).
    pub fn with_capacity(mut self, capacity: WorkCapacityModel) -> Self {
        self.workload = Box::new(WeekdayOnlyStrategy::from_model(&capacity));
        self.capacity = capacity;
        self
    }

    /// Sets the workload accounting rule.
    pub fn with_workload(mut self, workload: Box<dyn WorkloadStrategy>) -> Self {
        self.workload = workload;
        self
    }

    /// Sets `force_override`.
    pub fn with_force_override(mut self, force: bool) -> Self {
        self.force_override = force;
        self
    }

    /// Sets the deadline penalty multiplier.
    pub fn with_penalty_multiplier(mut self, multiplier: f64) -> Self {
        self.penalty_multiplier = multiplier;
        self
    }
}

/// Everything a strategy needs to place tasks.
#[derive(Debug)]
pub struct PlanningProblem {
    /// Planning start.
    pub start: NaiveDateTime,
    /// Daily window and ceiling.
    pub capacity: WorkCapacityModel,
    /// Capacity accounting rule.
    pub workload: Box<dyn WorkloadStrategy>,
    /// Penalty per hour of lateness.
    pub penalty_multiplier: f64,
    /// Tasks to place, by id.
    pub tasks: BTreeMap<TaskId, Task>,
    /// Earliest-eligible start of every resolved task.
    pub bounds: DependencyBounds,
    /// Placement order produced by the task sorter.
    pub sorted_order: Vec<TaskId>,
    /// Slots kept from a previous plan.
    pub retained: Vec<ScheduleSlot>,
    /// Tasks excluded before placement.
    pub excluded: Vec<Unschedulable>,
    /// The full snapshot (baseline workload accounting).
    pub snapshot: Vec<Task>,
    dependencies: BTreeMap<TaskId, Vec<TaskId>>,
}

impl PlanningProblem {
    /// Prepares a snapshot for placement.
    ///
    /// # Errors
    /// [`OptimizeError::InvalidInput`] when task ids are not unique.
    pub fn prepare(snapshot: &[Task], settings: PlanSettings) -> Result<Self> {
        let mut excluded: BTreeMap<TaskId, UnschedulableReason> = BTreeMap::new();

        if let Err(errors) = validate_tasks(snapshot) {
            let duplicates: BTreeSet<TaskId> = errors
                .iter()
                .filter(|e| e.kind.is_fatal())
                .map(|e| e.task_id)
                .collect();
            if !duplicates.is_empty() {
                return Err(OptimizeError::InvalidInput {
                    message: format!("duplicate task ids: {duplicates:?}"),
                    task_ids: duplicates.into_iter().collect(),
                });
            }

            for error in errors {
                if error.kind.excludes_task() {
                    excluded
                        .entry(error.task_id)
                        .or_insert(UnschedulableReason::InvalidTask {
                            message: error.message,
                        });
                } else if error.kind == ValidationErrorKind::UnknownDependency {
                    warn!(task_id = error.task_id, "{}", error.message);
                }
            }
        }

        let mut pinned: BTreeMap<TaskId, (NaiveDateTime, NaiveDateTime)> = BTreeMap::new();
        if !settings.force_override {
            for task in snapshot.iter().filter(|t| t.is_schedulable()) {
                if excluded.contains_key(&task.id) {
                    continue;
                }
                if let Some(window) = task.planned_window() {
                    pinned.insert(task.id, window);
                }
            }
        }
        let pinned_ends: BTreeMap<TaskId, NaiveDateTime> =
            pinned.iter().map(|(&id, &(_, end))| (id, end)).collect();

        let graph = DependencyGraph::build(snapshot);
        let resolution = graph.resolve(settings.start, &pinned_ends, &excluded);
        for entry in &resolution.unschedulable {
            if let UnschedulableReason::CyclicDependency { cycle } = &entry.reason {
                if cycle.first() == Some(&entry.task_id) {
                    warn!(?cycle, "dependency cycle detected");
                }
            }
        }

        let by_id: BTreeMap<TaskId, &Task> = snapshot.iter().map(|t| (t.id, t)).collect();
        let mut retained = Vec::new();
        let mut tasks = BTreeMap::new();
        for &id in &resolution.order {
            if let Some(&(start, end)) = pinned.get(&id) {
                retained.push(ScheduleSlot::contiguous(id, start, end));
            } else if let Some(task) = by_id.get(&id) {
                tasks.insert(id, (*task).clone());
            }
        }

        let dependencies = tasks
            .keys()
            .map(|&id| {
                let deps: Vec<TaskId> = graph
                    .dependencies(id)
                    .filter(|d| tasks.contains_key(d))
                    .collect();
                (id, deps)
            })
            .collect();

        let placeable: Vec<Task> = tasks.values().cloned().collect();
        let context = SchedulingContext::from_bounds(settings.start, &resolution.bounds);
        let sorted_order = RuleEngine::task_sorter().order(&placeable, &context);

        debug!(
            placeable = tasks.len(),
            retained = retained.len(),
            excluded = resolution.unschedulable.len(),
            "planning problem prepared"
        );

        Ok(Self {
            start: settings.start,
            capacity: settings.capacity,
            workload: settings.workload,
            penalty_multiplier: settings.penalty_multiplier,
            tasks,
            bounds: resolution.bounds,
            sorted_order,
            retained,
            excluded: resolution.unschedulable,
            snapshot: snapshot.to_vec(),
            dependencies,
        })
    }

    /// Number of tasks to place.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Whether there is nothing to place.
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// A task to place.
    pub fn task(&self, id: TaskId) -> Option<&Task> {
        self.tasks.get(&id)
    }

    /// Dependencies of `id` that are themselves placed by the strategy.
    ///
    /// Dependencies on retained slots are already folded into the bound.
    pub fn dependencies(&self, id: TaskId) -> &[TaskId] {
        self.dependencies.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Earliest-eligible start of `id`.
    pub fn bound(&self, id: TaskId) -> NaiveDateTime {
        self.bounds.get_or(id, self.start)
    }
}

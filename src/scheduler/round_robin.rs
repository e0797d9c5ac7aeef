//! Round-robin time slicing.
//!
//! # Algorithm
//!
//! Tasks rotate through a queue in sorter order. Each step gives the
//! task at the front one quantum of work (or what is left of it) at the
//! earliest feasible moment after the previous step's work, then sends
//! it to the back. A task whose dependencies are not finished yet is
//! rotated without work. A task is complete once its whole estimate has
//! been placed.
//!
//! Every step counts toward the iteration cap. When the cap is reached
//! the run stops, `timed_out` is set, and every task still in the queue
//! is reported with [`UnschedulableReason::IterationLimit`].

use chrono::{Duration, NaiveDateTime};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use tracing::{debug, warn};

use super::{
    precedence_feasible, CancellationToken, CapacityLedger, OptimizationStrategy, Placement,
    PlanningProblem, StrategyOutcome,
};
use crate::models::{
    hours_to_secs, Quality, ScheduleSlot, TaskId, TimeWindow, Unschedulable, UnschedulableReason,
};

/// Interleaving strategy.
#[derive(Debug, Clone)]
pub struct RoundRobinScheduler {
    max_iterations: usize,
    quantum: Duration,
}

impl RoundRobinScheduler {
    /// Creates the strategy.
    ///
    /// # Arguments
    /// * `max_iterations` - Rotation steps before giving up.
    /// * `quantum_hours` - Work per step (at least one second).
    pub fn new(max_iterations: usize, quantum_hours: f64) -> Self {
        Self {
            max_iterations,
            quantum: Duration::seconds(hours_to_secs(quantum_hours).max(1)),
        }
    }
}

impl OptimizationStrategy for RoundRobinScheduler {
    fn name(&self) -> &'static str {
        "round_robin"
    }

    fn optimize(&self, problem: &PlanningProblem, cancel: &CancellationToken) -> StrategyOutcome {
        let quantum = self.quantum.num_seconds();
        let mut ledger = CapacityLedger::new(problem);
        let mut placement = Placement::default();
        let mut queue: VecDeque<TaskId> =
            precedence_feasible(problem, &problem.sorted_order).into();
        let mut remaining: BTreeMap<TaskId, i64> = queue
            .iter()
            .filter_map(|&id| problem.task(id).map(|t| (id, t.duration_secs())))
            .collect();
        let mut worked: BTreeMap<TaskId, Vec<TimeWindow>> = BTreeMap::new();
        let mut finished: BTreeMap<TaskId, NaiveDateTime> = BTreeMap::new();
        let mut failed: BTreeSet<TaskId> = BTreeSet::new();
        let mut iterations = 0usize;
        let mut cursor = problem.start;

        while let Some(id) = queue.pop_front() {
            if cancel.is_cancelled() {
                queue.push_front(id);
                placement.cancelled = true;
                break;
            }
            if iterations >= self.max_iterations {
                queue.push_front(id);
                placement.timed_out = true;
                warn!(
                    iterations,
                    pending = queue.len(),
                    "round robin iteration limit reached"
                );
                break;
            }
            iterations += 1;

            let Some(task) = problem.task(id) else {
                continue;
            };

            let mut earliest = problem.bound(id).max(cursor);
            let mut waiting = false;
            let mut blocker = None;
            for &dep in problem.dependencies(id) {
                if let Some(&end) = finished.get(&dep) {
                    earliest = earliest.max(end);
                } else if failed.contains(&dep) {
                    blocker = Some(dep);
                    break;
                } else {
                    waiting = true;
                }
            }
            if let Some(dependency) = blocker {
                failed.insert(id);
                placement.unplaced.push(Unschedulable::new(
                    id,
                    UnschedulableReason::BlockedByDependency { dependency },
                ));
                continue;
            }
            if waiting {
                queue.push_back(id);
                continue;
            }

            let segments = worked.entry(id).or_default();
            if let Some(last) = segments.last() {
                earliest = earliest.max(last.end);
            }
            let left = remaining.get(&id).copied().unwrap_or(0);
            let chunk = left.min(quantum);

            let Some(new_segments) = ledger.allocate(earliest, chunk) else {
                failed.insert(id);
                placement
                    .unplaced
                    .push(Unschedulable::new(id, UnschedulableReason::NoCapacity));
                continue;
            };
            if let Some(last) = new_segments.last() {
                cursor = last.end;
            }
            for segment in new_segments {
                match segments.last_mut() {
                    Some(last) if last.end == segment.start => last.end = segment.end,
                    _ => segments.push(segment),
                }
            }

            let left = left - chunk;
            if left > 0 {
                remaining.insert(id, left);
                queue.push_back(id);
                continue;
            }
            remaining.remove(&id);
            let segments = worked.remove(&id).unwrap_or_default();
            if let Some(slot) = ScheduleSlot::from_segments(id, segments) {
                finished.insert(id, slot.end);
                placement.accept(task, slot, problem.penalty_multiplier);
            }
        }

        let reason = if placement.cancelled {
            UnschedulableReason::Cancelled
        } else {
            UnschedulableReason::IterationLimit
        };
        let pending: Vec<TaskId> = queue.into_iter().collect();
        placement.abandon(&pending, reason);

        debug!(
            iterations,
            placed = placement.slots.len(),
            "round robin finished"
        );
        let quality = Quality {
            penalty: placement.penalty,
            fitness: -placement.penalty,
            evaluations: 1,
            generations: None,
        };
        StrategyOutcome { placement, quality }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Task;
    use crate::scheduler::PlanSettings;
    use chrono::NaiveDate;

    fn at(d: u32, h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, d)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn problem(tasks: &[Task]) -> PlanningProblem {
        PlanningProblem::prepare(tasks, PlanSettings::new(at(8, 9, 30))).unwrap()
    }

    #[test]
    fn test_interleaves_quanta() {
        let p = problem(&[
            Task::new(1).with_duration_hours(2.0),
            Task::new(2).with_duration_hours(2.0),
        ]);
        let outcome = RoundRobinScheduler::new(100, 1.0).optimize(&p, &CancellationToken::new());
        let slots = &outcome.placement.slots;
        assert_eq!(slots.len(), 2);

        let one = slots.iter().find(|s| s.task_id == 1).unwrap();
        assert_eq!(
            one.segments,
            vec![
                TimeWindow::new(at(8, 9, 30), at(8, 10, 30)),
                TimeWindow::new(at(8, 11, 30), at(8, 12, 30)),
            ]
        );
        assert_eq!(one.worked_secs(), 7200);
        assert!(!outcome.placement.timed_out);
    }

    #[test]
    fn test_dependent_waits_for_completion() {
        let p = problem(&[
            Task::new(1).with_duration_hours(2.0),
            Task::new(2).with_duration_hours(1.0).with_dependency(1),
        ]);
        let outcome = RoundRobinScheduler::new(100, 1.0).optimize(&p, &CancellationToken::new());
        let slots = &outcome.placement.slots;
        let end_1 = slots.iter().find(|s| s.task_id == 1).unwrap().end;
        let start_2 = slots.iter().find(|s| s.task_id == 2).unwrap().start;
        assert!(start_2 >= end_1);
    }

    #[test]
    fn test_iteration_limit() {
        let tasks: Vec<Task> = (1..=3).map(|i| Task::new(i).with_duration_hours(5.0)).collect();
        let p = problem(&tasks);
        let outcome = RoundRobinScheduler::new(2, 1.0).optimize(&p, &CancellationToken::new());

        assert!(outcome.placement.timed_out);
        assert!(outcome.placement.slots.is_empty());
        assert_eq!(outcome.placement.unplaced.len(), 3);
        assert!(outcome
            .placement
            .unplaced
            .iter()
            .all(|u| u.reason == UnschedulableReason::IterationLimit));
    }

    #[test]
    fn test_partial_quantum_for_short_task() {
        let p = problem(&[Task::new(1).with_duration_hours(0.5)]);
        let outcome = RoundRobinScheduler::new(10, 1.0).optimize(&p, &CancellationToken::new());
        let slot = &outcome.placement.slots[0];
        assert_eq!((slot.start, slot.end), (at(8, 9, 30), at(8, 10, 0)));
    }
}

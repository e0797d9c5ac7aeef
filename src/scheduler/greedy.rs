//! Greedy placement in sorter order.
//!
//! # Algorithm
//!
//! 1. Take the tasks in [`RuleEngine::task_sorter`] order (deadline,
//!    priority, earliest-eligible start, id).
//! 2. Place each one at the earliest feasible moment
//!    (see [`place_sequence`]).
//!
//! Deterministic: the same problem always yields the same placement.
//!
//! # Complexity
//! O(n log n) for sorting plus one allocation per task.
//!
//! # Reference
//! Pinedo (2016), "Scheduling", Ch. 4: Priority Dispatching
//!
//! [`RuleEngine::task_sorter`]: crate::dispatching::RuleEngine::task_sorter

use tracing::debug;

use super::{
    place_sequence, CancellationToken, OptimizationStrategy, PlanningProblem, StrategyOutcome,
};
use crate::models::Quality;

/// Deterministic greedy strategy.
///
/// # Example
///
/// ```
/// use chrono::NaiveDate;
/// use u_taskplan::models::Task;
/// use u_taskplan::scheduler::{
///     CancellationToken, GreedyScheduler, OptimizationStrategy, PlanSettings, PlanningProblem,
/// };
///
/// let start = NaiveDate::from_ymd_opt(2024, 1, 8).unwrap().and_hms_opt(9, 30, 0).unwrap();
/// let tasks = vec![Task::new(1).with_duration_hours(2.0)];
/// let problem = PlanningProblem::prepare(&tasks, PlanSettings::new(start)).unwrap();
///
/// let outcome = GreedyScheduler::new().optimize(&problem, &CancellationToken::new());
/// assert_eq!(outcome.placement.slots[0].start, start);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct GreedyScheduler;

impl GreedyScheduler {
    /// Creates the strategy.
    pub fn new() -> Self {
        Self
    }
}

impl OptimizationStrategy for GreedyScheduler {
    fn name(&self) -> &'static str {
        "greedy"
    }

    fn optimize(&self, problem: &PlanningProblem, cancel: &CancellationToken) -> StrategyOutcome {
        let placement = place_sequence(problem, &problem.sorted_order, cancel);
        debug!(
            placed = placement.slots.len(),
            penalty = placement.penalty,
            "greedy placement finished"
        );
        let quality = Quality::single_pass(placement.penalty);
        StrategyOutcome { placement, quality }
    }
}

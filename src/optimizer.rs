//! End-to-end optimization run.
//!
//! # Flow
//! 1. Validate the input.
//! 2. Build the strategy (unknown names fail here, before any read).
//! 3. Resolve the start instant (`start_date` or the clock).
//! 4. Read the task snapshot.
//! 5. Prepare the planning problem and run the strategy.
//! 6. Assemble the result.
//! 7. Unless this is a dry run, commit the new slots in one batch.

use chrono::NaiveDateTime;
use tracing::info;

use crate::config::OptimizeScheduleInput;
use crate::error::Result;
use crate::factory::StrategyFactory;
use crate::models::Task;
use crate::ports::{Clock, PersistenceSink, SystemClock, TaskSource};
use crate::scheduler::{
    CancellationToken, OptimizationResult, OptimizationStrategy, PlanSettings, PlanningProblem,
    ResultBuilder,
};

/// Runs optimizations against a task store.
///
/// # Example
/// ```
/// use u_taskplan::config::OptimizeScheduleInput;
/// use u_taskplan::models::Task;
/// use u_taskplan::optimizer::ScheduleOptimizer;
/// use u_taskplan::ports::{FixedClock, InMemoryTaskStore};
/// use chrono::NaiveDate;
///
/// let monday = NaiveDate::from_ymd_opt(2024, 1, 8).unwrap().and_hms_opt(9, 30, 0).unwrap();
/// let store = InMemoryTaskStore::new(vec![
///     Task::new(1).with_duration_hours(2.0),
///     Task::new(2).with_duration_hours(1.0).with_dependency(1),
/// ]);
/// let optimizer = ScheduleOptimizer::new(&store, &store).with_clock(FixedClock(monday));
///
/// let result = optimizer.optimize(&OptimizeScheduleInput::new()).unwrap();
/// assert_eq!(result.scheduled_count(), 2);
/// assert!(result.committed);
/// assert_eq!(store.get(2).unwrap().planned_start, result.slot_for(2).map(|s| s.start));
/// ```
#[derive(Debug, Clone)]
pub struct ScheduleOptimizer<S, P, C = SystemClock> {
    source: S,
    sink: P,
    clock: C,
}

impl<S: TaskSource, P: PersistenceSink> ScheduleOptimizer<S, P> {
    /// Creates an optimizer using the local wall clock.
    pub fn new(source: S, sink: P) -> Self {
        Self {
            source,
            sink,
            clock: SystemClock,
        }
    }
}

impl<S: TaskSource, P: PersistenceSink, C: Clock> ScheduleOptimizer<S, P, C> {
    /// Replaces the clock.
    pub fn with_clock<C2: Clock>(self, clock: C2) -> ScheduleOptimizer<S, P, C2> {
        ScheduleOptimizer {
            source: self.source,
            sink: self.sink,
            clock,
        }
    }

    /// Runs one optimization.
    ///
    /// # Errors
    /// Configuration and algorithm errors are returned before the source
    /// is read. A failed commit returns [`OptimizeError::Persistence`]
    /// and leaves the store untouched.
    ///
    /// [`OptimizeError::Persistence`]: crate::error::OptimizeError::Persistence
    pub fn optimize(&self, input: &OptimizeScheduleInput) -> Result<OptimizationResult> {
        self.optimize_with_cancel(input, &CancellationToken::new())
    }

    /// Runs one optimization that can be cancelled.
    ///
    /// A cancelled run still returns (and, unless `dry_run`, commits) the
    /// best schedule found so far.
    pub fn optimize_with_cancel(
        &self,
        input: &OptimizeScheduleInput,
        cancel: &CancellationToken,
    ) -> Result<OptimizationResult> {
        input.validate()?;
        let strategy = StrategyFactory::create(&input.algorithm_name, &input.parameters)?;
        let start = input.start_date.unwrap_or_else(|| self.clock.now());

        let tasks = self.source.snapshot()?;
        let mut result = run(strategy.as_ref(), &tasks, input, start, cancel)?;

        if !input.dry_run && !result.slots.is_empty() {
            self.sink.commit(&result.slots)?;
            result.committed = true;
        }

        info!(
            algorithm = %result.algorithm,
            scheduled = result.slots.len(),
            retained = result.retained.len(),
            unschedulable = result.unschedulable.len(),
            penalty = result.quality.penalty,
            committed = result.committed,
            "schedule optimization finished"
        );
        Ok(result)
    }
}

/// Optimizes an in-memory snapshot without persisting anything.
///
/// `start` is used when `input.start_date` is unset.
///
/// # Example
/// ```
/// use u_taskplan::config::OptimizeScheduleInput;
/// use u_taskplan::models::Task;
/// use u_taskplan::optimizer::optimize_tasks;
/// use chrono::NaiveDate;
///
/// let monday = NaiveDate::from_ymd_opt(2024, 1, 8).unwrap().and_hms_opt(9, 30, 0).unwrap();
/// let tasks = vec![Task::new(1).with_duration_hours(8.0)];
/// let result = optimize_tasks(&tasks, &OptimizeScheduleInput::new(), monday).unwrap();
///
/// // 6 hours on Monday, the rest on Tuesday.
/// let slot = result.slot_for(1).unwrap();
/// assert_eq!(slot.segments.len(), 2);
/// assert!(!result.committed);
/// ```
pub fn optimize_tasks(
    tasks: &[Task],
    input: &OptimizeScheduleInput,
    start: NaiveDateTime,
) -> Result<OptimizationResult> {
    input.validate()?;
    let strategy = StrategyFactory::create(&input.algorithm_name, &input.parameters)?;
    let start = input.start_date.unwrap_or(start);
    run(
        strategy.as_ref(),
        tasks,
        input,
        start,
        &CancellationToken::new(),
    )
}

fn run(
    strategy: &dyn OptimizationStrategy,
    tasks: &[Task],
    input: &OptimizeScheduleInput,
    start: NaiveDateTime,
    cancel: &CancellationToken,
) -> Result<OptimizationResult> {
    info!(
        algorithm = strategy.name(),
        tasks = tasks.len(),
        %start,
        dry_run = input.dry_run,
        "schedule optimization started"
    );
    let problem = PlanningProblem::prepare(tasks, PlanSettings::from_input(input, start))?;
    let outcome = strategy.optimize(&problem, cancel);
    Ok(ResultBuilder::new(strategy.name())
        .with_dry_run(input.dry_run)
        .build(&problem, outcome))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{OptimizeError, PersistenceError};
    use crate::ports::{FixedClock, InMemoryTaskStore};
    use chrono::NaiveDate;

    fn monday() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 8)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap()
    }

    fn store() -> InMemoryTaskStore {
        InMemoryTaskStore::new(vec![
            Task::new(1).with_duration_hours(2.0),
            Task::new(2).with_duration_hours(3.0),
        ])
    }

    #[test]
    fn test_start_defaults_to_clock() {
        let store = store();
        let optimizer = ScheduleOptimizer::new(&store, &store).with_clock(FixedClock(monday()));
        let result = optimizer
            .optimize(&OptimizeScheduleInput::new().with_dry_run(true))
            .unwrap();
        assert_eq!(result.start, monday());
        assert_eq!(result.slots[0].start, monday());
    }

    #[test]
    fn test_invalid_config_skips_read() {
        let store = store();
        let optimizer = ScheduleOptimizer::new(&store, &store).with_clock(FixedClock(monday()));
        let err = optimizer
            .optimize(&OptimizeScheduleInput::new().with_max_hours_per_day(25.0))
            .unwrap_err();
        assert!(matches!(
            err,
            OptimizeError::InvalidConfig {
                field: "max_hours_per_day",
                ..
            }
        ));
        assert_eq!(store.read_count(), 0);
    }

    #[test]
    fn test_failed_commit_is_reported() {
        let store = store().with_rejected_commits("locked");
        let optimizer = ScheduleOptimizer::new(&store, &store).with_clock(FixedClock(monday()));
        let err = optimizer.optimize(&OptimizeScheduleInput::new()).unwrap_err();
        assert!(matches!(
            err,
            OptimizeError::Persistence(PersistenceError::Rejected(_))
        ));
        assert!(store.get(1).unwrap().planned_start.is_none());
    }

    #[test]
    fn test_nothing_to_commit() {
        let store = InMemoryTaskStore::new(Vec::new());
        let optimizer = ScheduleOptimizer::new(&store, &store)
            .with_clock(FixedClock(monday()));
        let result = optimizer.optimize(&OptimizeScheduleInput::new()).unwrap();
        assert!(result.slots.is_empty());
        assert!(!result.committed);
    }

    #[test]
    fn test_cancelled_run_still_returns() {
        let store = store();
        let optimizer = ScheduleOptimizer::new(&store, &store).with_clock(FixedClock(monday()));
        let cancel = CancellationToken::new();
        cancel.cancel();
        let input = OptimizeScheduleInput::new()
            .with_algorithm("monte_carlo")
            .with_dry_run(true);
        let result = optimizer.optimize_with_cancel(&input, &cancel).unwrap();
        assert!(result.cancelled);
    }

    #[test]
    fn test_optimize_tasks_prefers_input_start() {
        let tuesday = monday() + chrono::Duration::days(1);
        let input = OptimizeScheduleInput::new().with_start_date(tuesday);
        let result = optimize_tasks(&[Task::new(1)], &input, monday()).unwrap();
        assert_eq!(result.slots[0].start, tuesday);
    }
}

//! Dispatching rules and rule engine for task ordering.
//!
//! Provides the dispatching rules (EDD, PRIORITY, EES)
//! and a composable rule engine. The greedy strategy's processing order
//! comes from [`RuleEngine::task_sorter`].
//!
//! # Usage
//!
//! ```
//! use chrono::NaiveDate;
//! use u_taskplan::dispatching::{RuleEngine, SchedulingContext};
//! use u_taskplan::models::Task;
//!
//! let start = NaiveDate::from_ymd_opt(2024, 1, 8).unwrap().and_hms_opt(9, 30, 0).unwrap();
//! let tasks = vec![Task::new(2).with_priority(1.0), Task::new(1).with_priority(5.0)];
//! let order = RuleEngine::task_sorter().order(&tasks, &SchedulingContext::at_time(start));
//! assert_eq!(order, vec![1, 2]);
//! ```
//!
//! # References
//!
//! - Pinedo (2016), "Scheduling: Theory, Algorithms, and Systems", Ch. 4
//! - Haupt (1989), "A Survey of Priority Rule-Based Scheduling"

mod context;
mod engine;
pub mod rules;

pub use context::SchedulingContext;
pub use engine::{RuleEngine, TieBreaker};

use crate::models::Task;
use std::fmt::Debug;

/// Score returned by a dispatching rule.
///
/// Lower scores = higher priority (scheduled first).
pub type RuleScore = f64;

/// A dispatching rule that evaluates task priority.
///
/// # Score Convention
/// **Lower score = higher priority.** Rules should return smaller values
/// for tasks that should be scheduled first.
pub trait DispatchingRule: Send + Sync + Debug {
    /// Rule name (e.g., "EDD", "PRIORITY").
    fn name(&self) -> &'static str;

    /// Evaluates the priority of a task given the current scheduling context.
    ///
    /// Returns a score where lower = higher priority.
    fn evaluate(&self, task: &Task, context: &SchedulingContext) -> RuleScore;

    /// Rule description.
    fn description(&self) -> &'static str {
        self.name()
    }
}

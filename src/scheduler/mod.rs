//! Placement strategies and KPI evaluation.
//!
//! Every strategy places the same [`PlanningProblem`] through the shared
//! capacity-aware primitive [`place_sequence`] (or, for round robin, the
//! [`CapacityLedger`] directly), so all of them honour the same capacity,
//! window, weekday and dependency rules. They differ only in the order
//! in which tasks claim capacity.
//!
//! # Strategies
//!
//! | Strategy | Order |
//! |----------|-------|
//! | [`GreedyScheduler`] | task sorter order |
//! | [`GeneticScheduler`](crate::ga::GeneticScheduler) | evolved permutation |
//! | [`MonteCarloScheduler`] | best of random permutations |
//! | [`RoundRobinScheduler`] | interleaved quanta |
//!
//! # KPI
//!
//! [`ScheduleKpi`] computes lateness, on-time rate and daily utilization
//! of the accepted slots.
//!
//! # References
//!
//! - Pinedo (2016), "Scheduling: Theory, Algorithms, and Systems", Ch. 3-4
//! - Baker & Trietsch (2019), "Principles of Sequencing and Scheduling"

mod cancel;
mod greedy;
mod kpi;
mod monte_carlo;
mod placement;
mod problem;
mod result;
mod round_robin;

pub use cancel::CancellationToken;
pub use greedy::GreedyScheduler;
pub use kpi::ScheduleKpi;
pub use monte_carlo::MonteCarloScheduler;
pub use placement::{
    deadline_miss, place_sequence, precedence_feasible, CapacityLedger, Placement,
};
pub use problem::{PlanSettings, PlanningProblem};
pub use result::{OptimizationResult, ResultBuilder};
pub use round_robin::RoundRobinScheduler;

use crate::models::Quality;
use std::fmt::Debug;

/// What a strategy hands to the result builder.
#[derive(Debug, Clone)]
pub struct StrategyOutcome {
    /// Accepted slots and placement-time exclusions.
    pub placement: Placement,
    /// Penalty and search statistics.
    pub quality: Quality,
}

/// A placement strategy.
///
/// Implementations must be pure with respect to the problem: they never
/// mutate tasks and never persist anything.
pub trait OptimizationStrategy: Send + Sync + Debug {
    /// Algorithm name as accepted by the factory.
    fn name(&self) -> &'static str;

    /// Places the problem's tasks.
    ///
    /// Polls `cancel` between units of work and returns the best
    /// placement found so far when it fires.
    fn optimize(&self, problem: &PlanningProblem, cancel: &CancellationToken) -> StrategyOutcome;
}

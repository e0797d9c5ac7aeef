//! Monte Carlo search over random orderings.
//!
//! # Algorithm
//!
//! Trial 0 places tasks in sorter order; every further trial places a
//! uniformly shuffled order (repaired for precedence). The placement
//! with the fewest unplaced tasks, then the lowest penalty, then the
//! earliest makespan wins. Trial 0 guarantees the result is never worse
//! than greedy.

use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::debug;

use super::{
    place_sequence, CancellationToken, OptimizationStrategy, PlanningProblem, StrategyOutcome,
};
use crate::models::Quality;

/// Random-restart strategy.
#[derive(Debug, Clone)]
pub struct MonteCarloScheduler {
    simulations: usize,
    seed: Option<u64>,
}

impl MonteCarloScheduler {
    /// Creates the strategy with a trial count (at least one).
    pub fn new(simulations: usize) -> Self {
        Self {
            simulations: simulations.max(1),
            seed: None,
        }
    }

    /// Fixes the RNG seed.
    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }
}

impl OptimizationStrategy for MonteCarloScheduler {
    fn name(&self) -> &'static str {
        "monte_carlo"
    }

    fn optimize(&self, problem: &PlanningProblem, cancel: &CancellationToken) -> StrategyOutcome {
        let mut rng = match self.seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_os_rng(),
        };

        let mut best = place_sequence(problem, &problem.sorted_order, cancel);
        let mut evaluations = 1;
        let mut order = problem.sorted_order.clone();

        for trial in 1..self.simulations {
            if cancel.is_cancelled() {
                best.cancelled = true;
                debug!(trial, "monte carlo cancelled");
                break;
            }
            order.shuffle(&mut rng);
            let candidate = place_sequence(problem, &order, cancel);
            evaluations += 1;
            if candidate.is_better_than(&best) {
                debug!(trial, penalty = candidate.penalty, "monte carlo improvement");
                best = candidate;
            }
        }

        let quality = Quality {
            penalty: best.penalty,
            fitness: -best.penalty,
            evaluations,
            generations: None,
        };
        StrategyOutcome {
            placement: best,
            quality,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Task;
    use crate::scheduler::{GreedyScheduler, PlanSettings};
    use chrono::{NaiveDate, NaiveDateTime};

    fn at(d: u32, h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, d)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn tight_tasks() -> Vec<Task> {
        vec![
            Task::new(1).with_duration_hours(4.0).with_deadline(at(9, 12, 0)),
            Task::new(2)
                .with_duration_hours(1.0)
                .with_priority(3.0)
                .with_deadline(at(8, 10, 30)),
            Task::new(3).with_duration_hours(2.0).with_deadline(at(8, 14, 0)),
            Task::new(4).with_duration_hours(3.0).with_dependency(3),
            Task::new(5).with_duration_hours(2.5),
        ]
    }

    #[test]
    fn test_never_worse_than_greedy() {
        let tasks = tight_tasks();
        let problem = PlanningProblem::prepare(&tasks, PlanSettings::new(at(8, 9, 30))).unwrap();
        let greedy = GreedyScheduler::new().optimize(&problem, &CancellationToken::new());
        let mc = MonteCarloScheduler::new(50)
            .with_seed(Some(7))
            .optimize(&problem, &CancellationToken::new());

        assert!(mc.quality.penalty <= greedy.quality.penalty + 1e-9);
        assert_eq!(mc.quality.evaluations, 50);
        assert_eq!(mc.placement.slots.len(), tasks.len());
    }

    #[test]
    fn test_seeded_runs_agree() {
        let tasks = tight_tasks();
        let problem = PlanningProblem::prepare(&tasks, PlanSettings::new(at(8, 9, 30))).unwrap();
        let a = MonteCarloScheduler::new(30)
            .with_seed(Some(42))
            .optimize(&problem, &CancellationToken::new());
        let b = MonteCarloScheduler::new(30)
            .with_seed(Some(42))
            .optimize(&problem, &CancellationToken::new());
        assert_eq!(a.placement.slots, b.placement.slots);
    }

    #[test]
    fn test_dependencies_hold_in_every_trial() {
        let tasks = tight_tasks();
        let problem = PlanningProblem::prepare(&tasks, PlanSettings::new(at(8, 9, 30))).unwrap();
        let outcome = MonteCarloScheduler::new(20)
            .with_seed(Some(1))
            .optimize(&problem, &CancellationToken::new());
        let slots = &outcome.placement.slots;
        let end_3 = slots.iter().find(|s| s.task_id == 3).unwrap().end;
        let start_4 = slots.iter().find(|s| s.task_id == 4).unwrap().start;
        assert!(start_4 >= end_3);
    }

    #[test]
    fn test_cancelled_returns_greedy_trial() {
        let tasks = tight_tasks();
        let problem = PlanningProblem::prepare(&tasks, PlanSettings::new(at(8, 9, 30))).unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let outcome = MonteCarloScheduler::new(100).with_seed(Some(3)).optimize(&problem, &cancel);
        assert!(outcome.placement.cancelled);
        assert_eq!(outcome.quality.evaluations, 1);
    }
}

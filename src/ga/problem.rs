//! Task-ordering GA problem definition.
//!
//! Implements [`GaProblem`] for a [`PlanningProblem`]: a chromosome is
//! decoded by the shared placement primitive and scored by its deadline
//! penalty.

use rand::Rng;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tracing::trace;
use u_metaheur::ga::GaProblem;

use super::chromosome::OrderChromosome;
use super::operators::GeneticOperators;
use crate::models::TaskId;
use crate::scheduler::{place_sequence, CancellationToken, Placement, PlanningProblem};

/// Fitness added per task a decoded order could not place.
const UNPLACED_WEIGHT: f64 = 1.0e6;

/// GA problem definition for task ordering.
///
/// The first individual created is the sorter order; the rest are
/// random permutations. The runner keeps the best individual ever
/// evaluated, so a run never ends worse than the sorter order.
///
/// # Example
/// ```no_run
/// use u_metaheur::ga::{GaConfig, GaRunner};
/// use u_taskplan::ga::SchedulingGaProblem;
/// use u_taskplan::scheduler::{PlanSettings, PlanningProblem};
/// # let start = chrono::NaiveDate::from_ymd_opt(2024, 1, 8).unwrap().and_hms_opt(9, 30, 0).unwrap();
/// # let tasks = vec![];
///
/// let planning = PlanningProblem::prepare(&tasks, PlanSettings::new(start)).unwrap();
/// let problem = SchedulingGaProblem::new(&planning);
/// let config = GaConfig::default().with_seed(42).with_parallel(false);
/// let result = GaRunner::run(&problem, &config);
/// let placement = problem.decode(&result.best);
/// ```
#[derive(Debug)]
pub struct SchedulingGaProblem<'a> {
    planning: &'a PlanningProblem,
    ids: Vec<TaskId>,
    operators: GeneticOperators,
    cancel: Option<CancellationToken>,
    seed_pending: AtomicBool,
    evaluations: AtomicUsize,
}

impl<'a> SchedulingGaProblem<'a> {
    /// Creates the GA view of a planning problem.
    pub fn new(planning: &'a PlanningProblem) -> Self {
        Self {
            planning,
            ids: planning.sorted_order.clone(),
            operators: GeneticOperators::default(),
            cancel: None,
            seed_pending: AtomicBool::new(true),
            evaluations: AtomicUsize::new(0),
        }
    }

    /// Sets the genetic operators.
    pub fn with_operators(mut self, operators: GeneticOperators) -> Self {
        self.operators = operators;
        self
    }

    /// Polls `cancel` after every generation.
    ///
    /// A spent wall-clock budget is latched into the token's flag there,
    /// where the runner picks it up before the next generation.
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Number of chromosomes evaluated so far.
    pub fn evaluations(&self) -> usize {
        self.evaluations.load(Ordering::Relaxed)
    }

    /// Decodes a chromosome into a placement.
    pub fn decode(&self, chromosome: &OrderChromosome) -> Placement {
        place_sequence(self.planning, &chromosome.order, &CancellationToken::new())
    }

    /// Fitness of a placement (lower = better).
    pub fn fitness_of(placement: &Placement) -> f64 {
        placement.penalty + UNPLACED_WEIGHT * placement.unplaced.len() as f64
    }
}

impl GaProblem for SchedulingGaProblem<'_> {
    type Individual = OrderChromosome;

    fn create_individual<R: Rng>(&self, rng: &mut R) -> OrderChromosome {
        if self.seed_pending.swap(false, Ordering::Relaxed) {
            return OrderChromosome::from_order(self.ids.clone());
        }
        OrderChromosome::random(&self.ids, rng)
    }

    fn evaluate(&self, individual: &OrderChromosome) -> f64 {
        self.evaluations.fetch_add(1, Ordering::Relaxed);
        Self::fitness_of(&self.decode(individual))
    }

    fn crossover<R: Rng>(
        &self,
        parent1: &OrderChromosome,
        parent2: &OrderChromosome,
        rng: &mut R,
    ) -> Vec<OrderChromosome> {
        let (c1, c2) = self.operators.crossover(parent1, parent2, rng);
        vec![c1, c2]
    }

    fn mutate<R: Rng>(&self, individual: &mut OrderChromosome, rng: &mut R) {
        self.operators.mutate(individual, rng);
    }

    fn on_generation(&self, generation: usize, best_fitness: f64) {
        trace!(generation, best_fitness, "generation done");
        if let Some(cancel) = &self.cancel {
            cancel.is_cancelled();
        }
    }
}

//! Genetic placement strategy.

use tracing::{debug, warn};
use u_metaheur::ga::{GaConfig, GaRunner};

use super::chromosome::OrderChromosome;
use super::operators::GeneticOperators;
use super::problem::SchedulingGaProblem;
use crate::config::OptimizationParameters;
use crate::models::Quality;
use crate::scheduler::{
    place_sequence, CancellationToken, OptimizationStrategy, PlanningProblem, StrategyOutcome,
};

/// Evolves the task order with a GA.
///
/// The sorter order is part of the initial population and the runner
/// keeps the best individual it ever evaluated, so the result is never
/// worse than greedy.
#[derive(Debug, Clone)]
pub struct GeneticScheduler {
    config: GaConfig,
    operators: GeneticOperators,
}

impl GeneticScheduler {
    /// Creates the strategy.
    pub fn new(config: GaConfig) -> Self {
        Self {
            config,
            operators: GeneticOperators::default(),
        }
    }

    /// Creates the strategy from the `genetic_*` parameters.
    ///
    /// The run length is fixed: stagnation never stops it early.
    pub fn from_parameters(params: &OptimizationParameters) -> Self {
        let population = params.genetic_population_size;
        // Half an individual of headroom so the runner's truncation
        // yields exactly `genetic_elite_count`.
        let elite_ratio = (params.genetic_elite_count as f64 + 0.5) / population.max(1) as f64;
        let mut config = GaConfig::default()
            .with_population_size(population)
            .with_max_generations(params.genetic_generations)
            .with_tournament_size(params.genetic_tournament_size)
            .with_elite_ratio(elite_ratio)
            .with_crossover_rate(params.genetic_crossover_rate)
            .with_mutation_rate(params.genetic_mutation_rate)
            .with_stagnation_limit(0)
            .with_parallel(false);
        if let Some(seed) = params.seed {
            config = config.with_seed(seed);
        }
        Self::new(config).with_operators(GeneticOperators {
            crossover_type: params.genetic_crossover,
            mutation_type: params.genetic_mutation,
        })
    }

    /// Sets the genetic operators.
    pub fn with_operators(mut self, operators: GeneticOperators) -> Self {
        self.operators = operators;
        self
    }

    /// The runner configuration.
    pub fn config(&self) -> &GaConfig {
        &self.config
    }

    /// The crossover and mutation in use.
    pub fn operators(&self) -> &GeneticOperators {
        &self.operators
    }
}

impl OptimizationStrategy for GeneticScheduler {
    fn name(&self) -> &'static str {
        "genetic"
    }

    fn optimize(&self, problem: &PlanningProblem, cancel: &CancellationToken) -> StrategyOutcome {
        if problem.is_empty() {
            let placement = place_sequence(problem, &[], cancel);
            return StrategyOutcome {
                quality: Quality::single_pass(placement.penalty),
                placement,
            };
        }

        let ga = SchedulingGaProblem::new(problem)
            .with_operators(self.operators.clone())
            .with_cancel(cancel.clone());

        if let Err(reason) = self.config.validate() {
            warn!(%reason, "unusable GA configuration, keeping the sorter order");
            let placement = ga.decode(&OrderChromosome::from_order(problem.sorted_order.clone()));
            return StrategyOutcome {
                quality: Quality::single_pass(placement.penalty),
                placement,
            };
        }

        // A budget spent before the first generation must already show on the flag.
        cancel.is_cancelled();
        let result = GaRunner::run_with_cancel(&ga, &self.config, Some(cancel.flag()));

        let mut placement = ga.decode(&result.best);
        placement.cancelled = result.cancelled;
        debug!(
            generations = result.generations,
            evaluations = ga.evaluations(),
            best_fitness = result.best_fitness,
            penalty = placement.penalty,
            "genetic search finished"
        );

        let quality = Quality {
            penalty: placement.penalty,
            fitness: -placement.penalty,
            evaluations: ga.evaluations(),
            generations: Some(result.generations),
        };
        StrategyOutcome { placement, quality }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ga::operators::{CrossoverType, MutationType};
    use crate::models::Task;
    use crate::scheduler::{GreedyScheduler, PlanSettings};
    use chrono::{Duration, NaiveDate, NaiveDateTime};

    fn at(d: u32, h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, d)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn tasks() -> Vec<Task> {
        vec![
            Task::new(1).with_duration_hours(5.0).with_deadline(at(9, 12, 0)),
            Task::new(2).with_duration_hours(1.0).with_deadline(at(8, 11, 0)),
            Task::new(3).with_duration_hours(2.0).with_deadline(at(8, 16, 0)),
            Task::new(4).with_duration_hours(2.0).with_dependency(2),
            Task::new(5).with_duration_hours(3.0).with_deadline(at(10, 10, 0)),
            Task::new(6).with_duration_hours(1.5),
        ]
    }

    fn params() -> OptimizationParameters {
        OptimizationParameters::default()
            .with_genetic(16, 20)
            .with_seed(11)
    }

    #[test]
    fn test_never_worse_than_greedy() {
        let tasks = tasks();
        let problem = PlanningProblem::prepare(&tasks, PlanSettings::new(at(8, 9, 30))).unwrap();
        let greedy = GreedyScheduler::new().optimize(&problem, &CancellationToken::new());
        let genetic = GeneticScheduler::from_parameters(&params())
            .optimize(&problem, &CancellationToken::new());

        assert!(genetic.quality.penalty <= greedy.quality.penalty + 1e-9);
        assert_eq!(genetic.placement.slots.len(), tasks.len());
        assert_eq!(genetic.quality.generations, Some(20));
        assert!(genetic.quality.evaluations >= 16);
    }

    #[test]
    fn test_without_elites_keeps_best_ever() {
        // EDD meets every deadline; aggressive search without elitism
        // must not lose that order.
        let monday = at(8, 9, 30);
        let tasks: Vec<Task> = (1..=6)
            .map(|id| {
                Task::new(id)
                    .with_duration_hours(1.0)
                    .with_deadline(monday + Duration::hours(id))
            })
            .collect();
        let problem = PlanningProblem::prepare(&tasks, PlanSettings::new(monday)).unwrap();
        let greedy = GreedyScheduler::new().optimize(&problem, &CancellationToken::new());
        assert_eq!(greedy.quality.penalty, 0.0);

        for seed in 0..25 {
            let mut params = OptimizationParameters::default()
                .with_genetic(4, 3)
                .with_seed(seed);
            params.genetic_elite_count = 0;
            params.genetic_crossover_rate = 1.0;
            params.genetic_mutation_rate = 1.0;
            assert!(params.validate().is_ok());

            let genetic = GeneticScheduler::from_parameters(&params)
                .optimize(&problem, &CancellationToken::new());
            assert!(
                genetic.quality.penalty <= greedy.quality.penalty,
                "seed {seed}: genetic {} > greedy {}",
                genetic.quality.penalty,
                greedy.quality.penalty
            );
            assert_eq!(genetic.placement.slots.len(), 6);
        }
    }

    #[test]
    fn test_elite_count_maps_exactly() {
        for (population, elites) in [(50, 2), (4, 0), (4, 3), (7, 1), (100, 10)] {
            let mut params = OptimizationParameters::default().with_genetic(population, 5);
            params.genetic_elite_count = elites;
            let config = GeneticScheduler::from_parameters(&params).config().clone();
            let kept = (config.population_size as f64 * config.elite_ratio) as usize;
            assert_eq!(kept, elites, "population {population}");
            assert!(config.validate().is_ok());
        }
    }

    #[test]
    fn test_from_parameters_copies_settings() {
        let params = params()
            .with_genetic_operators(CrossoverType::Position, MutationType::Invert);
        let scheduler = GeneticScheduler::from_parameters(&params);
        let config = scheduler.config();
        assert_eq!(config.population_size, 16);
        assert_eq!(config.max_generations, 20);
        assert_eq!(config.seed, Some(11));
        assert_eq!(config.stagnation_limit, 0);
        assert_eq!(scheduler.operators().crossover_type, CrossoverType::Position);
        assert_eq!(scheduler.operators().mutation_type, MutationType::Invert);
    }

    #[test]
    fn test_seeded_runs_agree() {
        let tasks = tasks();
        let problem = PlanningProblem::prepare(&tasks, PlanSettings::new(at(8, 9, 30))).unwrap();
        let params = params().with_genetic_operators(CrossoverType::Position, MutationType::Insert);
        let a = GeneticScheduler::from_parameters(&params)
            .optimize(&problem, &CancellationToken::new());
        let b = GeneticScheduler::from_parameters(&params)
            .optimize(&problem, &CancellationToken::new());
        assert_eq!(a.placement.slots, b.placement.slots);
        assert_eq!(a.quality, b.quality);
    }

    #[test]
    fn test_cancelled_keeps_best_so_far() {
        let tasks = tasks();
        let problem = PlanningProblem::prepare(&tasks, PlanSettings::new(at(8, 9, 30))).unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let outcome = GeneticScheduler::from_parameters(&params()).optimize(&problem, &cancel);
        assert!(outcome.placement.cancelled);
        assert_eq!(outcome.quality.generations, Some(0));
        assert_eq!(outcome.placement.slots.len(), tasks.len());
    }

    #[test]
    fn test_spent_budget_cancels_before_first_generation() {
        let tasks = tasks();
        let problem = PlanningProblem::prepare(&tasks, PlanSettings::new(at(8, 9, 30))).unwrap();
        let cancel = CancellationToken::with_timeout(std::time::Duration::ZERO);
        let outcome = GeneticScheduler::from_parameters(&params()).optimize(&problem, &cancel);
        assert!(outcome.placement.cancelled);
        assert_eq!(outcome.quality.generations, Some(0));
    }

    #[test]
    fn test_unusable_config_falls_back_to_sorter_order() {
        let tasks = tasks();
        let problem = PlanningProblem::prepare(&tasks, PlanSettings::new(at(8, 9, 30))).unwrap();
        let greedy = GreedyScheduler::new().optimize(&problem, &CancellationToken::new());
        let scheduler = GeneticScheduler::new(GaConfig::default().with_population_size(1));
        let outcome = scheduler.optimize(&problem, &CancellationToken::new());
        assert_eq!(outcome.placement.slots, greedy.placement.slots);
        assert_eq!(outcome.quality.generations, None);
    }

    #[test]
    fn test_empty_problem() {
        let problem = PlanningProblem::prepare(&[], PlanSettings::new(at(8, 9, 30))).unwrap();
        let outcome = GeneticScheduler::from_parameters(&params())
            .optimize(&problem, &CancellationToken::new());
        assert!(outcome.placement.slots.is_empty());
    }
}

//! Optimization run configuration.
//!
//! [`OptimizeScheduleInput`] is what the CLI/REST layer hands to the
//! engine. It deserializes with defaults for every field, so a caller
//! may pass `{}` and get a greedy run from "now" with a 6-hour day.
//!
//! Tunable algorithm constants live in [`OptimizationParameters`] and are
//! passed explicitly to the strategy factory; there is no global state.

use chrono::{NaiveDateTime, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::{OptimizeError, Result};
use crate::ga::operators::{CrossoverType, MutationType};
use crate::models::{default_working_weekdays, WorkCapacityModel};

/// Which workload accounting rule governs placement capacity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkloadPolicy {
    /// Only working weekdays have capacity.
    #[default]
    WeekdayOnly,
    /// Every day has capacity; consumption is taken from actual work.
    ActualSchedule,
}

/// Input of a single optimization run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizeScheduleInput {
    /// Earliest instant eligible for placement. `None` = now.
    pub start_date: Option<NaiveDateTime>,
    /// Daily hour ceiling, `0 < v <= 24`.
    pub max_hours_per_day: f64,
    /// Daily work window start.
    pub work_hours_start: NaiveTime,
    /// Daily work window end.
    pub work_hours_end: NaiveTime,
    /// Days with capacity under [`WorkloadPolicy::WeekdayOnly`].
    pub working_weekdays: Vec<Weekday>,
    /// Capacity accounting rule.
    pub workload_policy: WorkloadPolicy,
    /// Re-place tasks that already carry a planned slot.
    pub force_override: bool,
    /// Compute without persisting.
    pub dry_run: bool,
    /// Strategy name (`greedy`, `genetic`, `monte_carlo`, `round_robin`).
    pub algorithm_name: String,
    /// Algorithm tuning.
    pub parameters: OptimizationParameters,
}

impl Default for OptimizeScheduleInput {
    fn default() -> Self {
        let capacity = WorkCapacityModel::default();
        Self {
            start_date: None,
            max_hours_per_day: capacity.max_hours_per_day,
            work_hours_start: capacity.work_hours_start,
            work_hours_end: capacity.work_hours_end,
            working_weekdays: default_working_weekdays(),
            workload_policy: WorkloadPolicy::default(),
            force_override: false,
            dry_run: false,
            algorithm_name: "greedy".to_string(),
            parameters: OptimizationParameters::default(),
        }
    }
}

impl OptimizeScheduleInput {
    /// Creates the default input.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the start instant.
    pub fn with_start_date(mut self, start: NaiveDateTime) -> Self {
        self.start_date = Some(start);
        self
    }

    /// Sets the daily hour ceiling.
    pub fn with_max_hours_per_day(mut self, hours: f64) -> Self {
        self.max_hours_per_day = hours;
        self
    }

    /// Sets the daily work window.
    pub fn with_work_hours(mut self, start: NaiveTime, end: NaiveTime) -> Self {
        self.work_hours_start = start;
        self.work_hours_end = end;
        self
    }

    /// Sets the working weekdays.
    pub fn with_working_weekdays(mut self, weekdays: Vec<Weekday>) -> Self {
        self.working_weekdays = weekdays;
        self
    }

    /// Sets the workload accounting policy.
    pub fn with_workload_policy(mut self, policy: WorkloadPolicy) -> Self {
        self.workload_policy = policy;
        self
    }

    /// Allows overwriting previously planned slots.
    pub fn with_force_override(mut self, force: bool) -> Self {
        self.force_override = force;
        self
    }

    /// Enables or disables dry run.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Sets the algorithm name.
    pub fn with_algorithm(mut self, name: impl Into<String>) -> Self {
        self.algorithm_name = name.into();
        self
    }

    /// Sets the algorithm parameters.
    pub fn with_parameters(mut self, parameters: OptimizationParameters) -> Self {
        self.parameters = parameters;
        self
    }

    /// Checks every field; returns the first offending one.
    pub fn validate(&self) -> Result<()> {
        if !self.max_hours_per_day.is_finite()
            || self.max_hours_per_day <= 0.0
            || self.max_hours_per_day > 24.0
        {
            return Err(OptimizeError::invalid_config(
                "max_hours_per_day",
                format!("must be in (0, 24], got {}", self.max_hours_per_day),
            ));
        }
        if self.work_hours_start >= self.work_hours_end {
            return Err(OptimizeError::invalid_config(
                "work_hours_start",
                format!(
                    "work window must start before it ends ({} >= {})",
                    self.work_hours_start, self.work_hours_end
                ),
            ));
        }
        if self.workload_policy == WorkloadPolicy::WeekdayOnly && self.working_weekdays.is_empty()
        {
            return Err(OptimizeError::invalid_config(
                "working_weekdays",
                "at least one working weekday is required",
            ));
        }
        self.parameters.validate()
    }

    /// The capacity model this input describes.
    pub fn capacity_model(&self) -> WorkCapacityModel {
        WorkCapacityModel::new(
            self.work_hours_start,
            self.work_hours_end,
            self.max_hours_per_day,
        )
        .with_weekdays(self.working_weekdays.clone())
    }
}

/// Tunable constants of the optimization strategies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizationParameters {
    /// Penalty per hour a task ends after its deadline.
    pub deadline_penalty_multiplier: f64,
    /// GA population size.
    pub genetic_population_size: usize,
    /// GA generation count.
    pub genetic_generations: usize,
    /// Probability that two selected parents are recombined.
    pub genetic_crossover_rate: f64,
    /// Probability that an offspring is mutated.
    pub genetic_mutation_rate: f64,
    /// Tournament size for parent selection.
    pub genetic_tournament_size: usize,
    /// Individuals copied unchanged into the next generation.
    pub genetic_elite_count: usize,
    /// Recombination operator.
    pub genetic_crossover: CrossoverType,
    /// Mutation operator.
    pub genetic_mutation: MutationType,
    /// Random orderings tried by Monte Carlo.
    pub monte_carlo_num_simulations: usize,
    /// Rotation steps allowed before round robin gives up.
    pub round_robin_max_iterations: usize,
    /// Hours placed per task per rotation step.
    pub round_robin_quantum_hours: f64,
    /// RNG seed for the stochastic strategies. `None` = OS entropy.
    pub seed: Option<u64>,
}

impl Default for OptimizationParameters {
    fn default() -> Self {
        Self {
            deadline_penalty_multiplier: 10.0,
            genetic_population_size: 50,
            genetic_generations: 100,
            genetic_crossover_rate: 0.8,
            genetic_mutation_rate: 0.1,
            genetic_tournament_size: 3,
            genetic_elite_count: 2,
            genetic_crossover: CrossoverType::Order,
            genetic_mutation: MutationType::Swap,
            monte_carlo_num_simulations: 500,
            round_robin_max_iterations: 10_000,
            round_robin_quantum_hours: 1.0,
            seed: None,
        }
    }
}

impl OptimizationParameters {
    /// Sets the RNG seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Sets GA population size and generation count.
    pub fn with_genetic(mut self, population: usize, generations: usize) -> Self {
        self.genetic_population_size = population;
        self.genetic_generations = generations;
        self
    }

    /// Sets the GA crossover and mutation operators.
    pub fn with_genetic_operators(mut self, crossover: CrossoverType, mutation: MutationType) -> Self {
        self.genetic_crossover = crossover;
        self.genetic_mutation = mutation;
        self
    }

    /// Sets the Monte Carlo simulation count.
    pub fn with_simulations(mut self, simulations: usize) -> Self {
        self.monte_carlo_num_simulations = simulations;
        self
    }

    /// Sets the round-robin iteration cap.
    pub fn with_round_robin_max_iterations(mut self, iterations: usize) -> Self {
        self.round_robin_max_iterations = iterations;
        self
    }

    /// Checks every field; returns the first offending one.
    pub fn validate(&self) -> Result<()> {
        if !self.deadline_penalty_multiplier.is_finite() || self.deadline_penalty_multiplier < 0.0
        {
            return Err(OptimizeError::invalid_config(
                "deadline_penalty_multiplier",
                "must be a finite, non-negative number",
            ));
        }
        if self.genetic_population_size < 2 {
            return Err(OptimizeError::invalid_config(
                "genetic_population_size",
                "must be at least 2",
            ));
        }
        if self.genetic_generations == 0 {
            return Err(OptimizeError::invalid_config(
                "genetic_generations",
                "must be at least 1",
            ));
        }
        check_rate("genetic_crossover_rate", self.genetic_crossover_rate)?;
        check_rate("genetic_mutation_rate", self.genetic_mutation_rate)?;
        if self.genetic_tournament_size == 0 {
            return Err(OptimizeError::invalid_config(
                "genetic_tournament_size",
                "must be at least 1",
            ));
        }
        if self.genetic_elite_count >= self.genetic_population_size {
            return Err(OptimizeError::invalid_config(
                "genetic_elite_count",
                "must be smaller than the population size",
            ));
        }
        if self.monte_carlo_num_simulations == 0 {
            return Err(OptimizeError::invalid_config(
                "monte_carlo_num_simulations",
                "must be at least 1",
            ));
        }
        if self.round_robin_max_iterations == 0 {
            return Err(OptimizeError::invalid_config(
                "round_robin_max_iterations",
                "must be at least 1",
            ));
        }
        if !self.round_robin_quantum_hours.is_finite() || self.round_robin_quantum_hours <= 0.0 {
            return Err(OptimizeError::invalid_config(
                "round_robin_quantum_hours",
                "must be positive",
            ));
        }
        Ok(())
    }
}

fn check_rate(field: &'static str, rate: f64) -> Result<()> {
    if (0.0..=1.0).contains(&rate) {
        Ok(())
    } else {
        Err(OptimizeError::invalid_config(
            field,
            format!("must be in [0, 1], got {rate}"),
        ))
    }
}

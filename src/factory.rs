//! Strategy factory.
//!
//! Maps an algorithm name to a ready-to-run [`OptimizationStrategy`].
//! Construction is pure: no task is read and nothing is persisted.
//!
//! | Name | Strategy |
//! |------|----------|
//! | `greedy` | [`GreedyScheduler`] |
//! | `genetic` | [`GeneticScheduler`] |
//! | `monte_carlo` | [`MonteCarloScheduler`] |
//! | `round_robin` | [`RoundRobinScheduler`] |

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::config::OptimizationParameters;
use crate::error::{OptimizeError, Result};
use crate::ga::GeneticScheduler;
use crate::scheduler::{
    GreedyScheduler, MonteCarloScheduler, OptimizationStrategy, RoundRobinScheduler,
};

/// Known optimization algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Algorithm {
    /// Deterministic placement in sorter order.
    Greedy,
    /// Evolved task order.
    Genetic,
    /// Best of random task orders.
    MonteCarlo,
    /// Interleaved quanta.
    RoundRobin,
}

impl Algorithm {
    /// Every algorithm, in documentation order.
    pub const ALL: [Algorithm; 4] = [
        Algorithm::Greedy,
        Algorithm::Genetic,
        Algorithm::MonteCarlo,
        Algorithm::RoundRobin,
    ];

    /// Canonical name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Greedy => "greedy",
            Self::Genetic => "genetic",
            Self::MonteCarlo => "monte_carlo",
            Self::RoundRobin => "round_robin",
        }
    }

    fn expected() -> String {
        Self::ALL
            .iter()
            .map(|a| a.name())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Algorithm {
    type Err = OptimizeError;

    /// Parses a canonical name, ignoring case and surrounding whitespace.
    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|a| a.name() == wanted)
            .ok_or_else(|| OptimizeError::UnknownAlgorithm {
                name: s.to_string(),
                expected: Self::expected(),
            })
    }
}

/// Builds strategies from names and parameters.
///
/// # Example
/// ```
/// use u_taskplan::config::OptimizationParameters;
/// use u_taskplan::factory::StrategyFactory;
///
/// let params = OptimizationParameters::default();
/// let strategy = StrategyFactory::create("monte_carlo", &params).unwrap();
/// assert_eq!(strategy.name(), "monte_carlo");
/// assert!(StrategyFactory::create("simulated_annealing", &params).is_err());
/// ```
pub struct StrategyFactory;

impl StrategyFactory {
    /// Creates the strategy registered under `name`.
    ///
    /// # Errors
    /// [`OptimizeError::UnknownAlgorithm`] for unrecognized names.
    pub fn create(
        name: &str,
        params: &OptimizationParameters,
    ) -> Result<Box<dyn OptimizationStrategy>> {
        let algorithm: Algorithm = name.parse()?;
        Ok(Self::build(algorithm, params))
    }

    /// Creates the strategy for a parsed algorithm.
    pub fn build(
        algorithm: Algorithm,
        params: &OptimizationParameters,
    ) -> Box<dyn OptimizationStrategy> {
        match algorithm {
            Algorithm::Greedy => Box::new(GreedyScheduler::new()),
            Algorithm::Genetic => Box::new(Self::genetic(params)),
            Algorithm::MonteCarlo => Box::new(
                MonteCarloScheduler::new(params.monte_carlo_num_simulations)
                    .with_seed(params.seed),
            ),
            Algorithm::RoundRobin => Box::new(RoundRobinScheduler::new(
                params.round_robin_max_iterations,
                params.round_robin_quantum_hours,
            )),
        }
    }

    /// The genetic strategy with the `genetic_*` parameters applied,
    /// operators included.
    pub fn genetic(params: &OptimizationParameters) -> GeneticScheduler {
        GeneticScheduler::from_parameters(params)
    }
}

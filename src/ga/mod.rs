//! GA-based task ordering.
//!
//! Searches over permutations of the placeable tasks. Each permutation
//! is repaired for precedence and decoded by the shared placement
//! primitive, so fitness is always the deadline penalty of a feasible
//! schedule.
//!
//! The evolutionary loop is `u_metaheur`'s [`GaRunner`]; this module
//! supplies the encoding, the problem definition and the strategy.
//!
//! # Submodules
//!
//! - [`operators`]: Runtime-selectable crossover and mutation strategies
//!
//! # Reference
//! - Goldberg (1989), "Genetic Algorithms in Search, Optimization and Machine Learning"
//! - Bierwirth (1995), "A generalized permutation approach to JSSP"

mod chromosome;
pub mod operators;
mod problem;
mod strategy;

pub use chromosome::{
    insert_mutation, invert_mutation, order_crossover, position_crossover, swap_mutation,
    OrderChromosome,
};
pub use problem::SchedulingGaProblem;
pub use strategy::GeneticScheduler;
pub use u_metaheur::ga::{GaConfig, GaRunner};

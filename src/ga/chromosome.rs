//! Permutation chromosome for task ordering.
//!
//! # Encoding
//!
//! A chromosome is a permutation of the placeable task ids. Decoding
//! repairs it for precedence and hands it to the shared placement
//! primitive, so every permutation decodes to a feasible schedule.
//!
//! # Reference
//! Bierwirth (1995), "A generalized permutation approach to JSSP"

use rand::seq::{IndexedRandom, SliceRandom};
use rand::Rng;
use std::collections::HashSet;

use u_metaheur::ga::Individual;

use crate::models::TaskId;

/// Task-order chromosome.
///
/// Lower fitness = better schedule (minimization convention).
#[derive(Debug, Clone, PartialEq)]
pub struct OrderChromosome {
    /// Task ids in placement order.
    pub order: Vec<TaskId>,
    /// Fitness value (lower = better, `INFINITY` = not evaluated).
    pub fitness: f64,
}

impl Individual for OrderChromosome {
    type Fitness = f64;

    fn fitness(&self) -> f64 {
        self.fitness
    }

    fn set_fitness(&mut self, fitness: f64) {
        self.fitness = fitness;
    }
}

impl OrderChromosome {
    /// Wraps a given order (unevaluated).
    pub fn from_order(order: Vec<TaskId>) -> Self {
        Self {
            order,
            fitness: f64::INFINITY,
        }
    }

    /// Creates a uniformly random permutation of `ids`.
    pub fn random<R: Rng>(ids: &[TaskId], rng: &mut R) -> Self {
        let mut order = ids.to_vec();
        order.shuffle(rng);
        Self::from_order(order)
    }

    /// Whether the chromosome holds every id of `ids` exactly once.
    pub fn is_permutation_of(&self, ids: &[TaskId]) -> bool {
        if self.order.len() != ids.len() {
            return false;
        }
        let mut a = self.order.clone();
        let mut b = ids.to_vec();
        a.sort_unstable();
        b.sort_unstable();
        a == b
    }

    fn invalidate(&mut self) {
        self.fitness = f64::INFINITY;
    }
}

// ======================== Crossover operators ========================

/// Performs Order crossover (OX, linear variant).
///
/// Copies a random slice of each parent into its child at the same
/// positions, then fills the remaining positions left to right with the
/// other parent's genes in their relative order.
///
/// # Reference
/// Falkenauer & Bouffouix (1991), "A genetic algorithm for job shop"
pub fn order_crossover<R: Rng>(
    p1: &OrderChromosome,
    p2: &OrderChromosome,
    rng: &mut R,
) -> (OrderChromosome, OrderChromosome) {
    let len = p1.order.len();
    if len < 2 || p2.order.len() != len {
        return (p1.clone(), p2.clone());
    }

    let mut i = rng.random_range(0..len);
    let mut j = rng.random_range(0..len);
    if i > j {
        std::mem::swap(&mut i, &mut j);
    }

    (
        OrderChromosome::from_order(ox_build_child(&p1.order, &p2.order, i, j)),
        OrderChromosome::from_order(ox_build_child(&p2.order, &p1.order, i, j)),
    )
}

fn ox_build_child(template: &[TaskId], donor: &[TaskId], i: usize, j: usize) -> Vec<TaskId> {
    let kept: HashSet<TaskId> = template[i..=j].iter().copied().collect();
    let mut fill = donor.iter().copied().filter(|id| !kept.contains(id));
    let mut child = Vec::with_capacity(template.len());
    for pos in 0..template.len() {
        if (i..=j).contains(&pos) {
            child.push(template[pos]);
        } else if let Some(id) = fill.next() {
            child.push(id);
        }
    }
    child
}

/// Performs Position crossover (POX-style).
///
/// Selects a random subset of tasks, preserves their positions from one
/// parent, fills the remaining positions from the other parent in order.
///
/// # Reference
/// Bierwirth et al. (1996)
pub fn position_crossover<R: Rng>(
    p1: &OrderChromosome,
    p2: &OrderChromosome,
    rng: &mut R,
) -> (OrderChromosome, OrderChromosome) {
    if p1.order.is_empty() || p2.order.len() != p1.order.len() {
        return (p1.clone(), p2.clone());
    }

    let set_size = rng.random_range(1..=p1.order.len());
    let selected: HashSet<TaskId> = p1
        .order
        .choose_multiple(rng, set_size)
        .copied()
        .collect();

    (
        OrderChromosome::from_order(pox_build_child(&p1.order, &p2.order, &selected)),
        OrderChromosome::from_order(pox_build_child(&p2.order, &p1.order, &selected)),
    )
}

fn pox_build_child(template: &[TaskId], donor: &[TaskId], selected: &HashSet<TaskId>) -> Vec<TaskId> {
    let mut donor_iter = donor.iter().copied().filter(|id| !selected.contains(id));
    template
        .iter()
        .filter_map(|&id| {
            if selected.contains(&id) {
                Some(id)
            } else {
                donor_iter.next()
            }
        })
        .collect()
}

// ======================== Mutation operators ========================

/// Swap mutation: exchanges two random positions.
pub fn swap_mutation<R: Rng>(chromosome: &mut OrderChromosome, rng: &mut R) {
    let len = chromosome.order.len();
    if len < 2 {
        return;
    }
    let i = rng.random_range(0..len);
    let j = rng.random_range(0..len);
    chromosome.order.swap(i, j);
    chromosome.invalidate();
}

/// Insert mutation: removes an element and reinserts at a random position.
pub fn insert_mutation<R: Rng>(chromosome: &mut OrderChromosome, rng: &mut R) {
    let len = chromosome.order.len();
    if len < 2 {
        return;
    }
    let from = rng.random_range(0..len);
    let to = rng.random_range(0..len);
    let item = chromosome.order.remove(from);
    chromosome.order.insert(to, item);
    chromosome.invalidate();
}

/// Invert mutation: reverses a random segment.
pub fn invert_mutation<R: Rng>(chromosome: &mut OrderChromosome, rng: &mut R) {
    let len = chromosome.order.len();
    if len < 2 {
        return;
    }
    let mut i = rng.random_range(0..len);
    let mut j = rng.random_range(0..len);
    if i > j {
        std::mem::swap(&mut i, &mut j);
    }
    chromosome.order[i..=j].reverse();
    chromosome.invalidate();
}

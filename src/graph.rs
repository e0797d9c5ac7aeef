//! Dependency graph resolution.
//!
//! Builds the precedence graph over schedulable tasks, reports every
//! dependency cycle per strongly connected component, and computes for
//! each remaining task its earliest-eligible start (dependency bound)
//! together with a stable topological order.
//!
//! Completed, canceled and archived predecessors, as well as ids absent
//! from the snapshot, count as already satisfied and are dropped from the
//! graph.
//!
//! # Bounds
//! `bound(t) = max(start, max over deps d of completion(d))` where
//! `completion(d) = bound(d) + duration(d)`, or the planned end of `d`
//! when `d` keeps a previously planned slot. Bounds are wall-clock lower
//! limits; capacity-aware placement can only delay a task further.
//!
//! # Reference
//! - Tarjan (1972), "Depth-first search and linear graph algorithms"
//! - Kahn (1962), "Topological sorting of large networks"

use chrono::{Duration, NaiveDateTime};
use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet, BinaryHeap};

use crate::models::{Task, TaskId, Unschedulable, UnschedulableReason};

/// Earliest-eligible start per task.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DependencyBounds {
    bounds: BTreeMap<TaskId, NaiveDateTime>,
}

impl DependencyBounds {
    /// Bound of a task, if it was resolved.
    pub fn get(&self, id: TaskId) -> Option<NaiveDateTime> {
        self.bounds.get(&id).copied()
    }

    /// Bound of a task, or `default` if it was not resolved.
    pub fn get_or(&self, id: TaskId, default: NaiveDateTime) -> NaiveDateTime {
        self.get(id).unwrap_or(default)
    }

    /// Number of resolved tasks.
    pub fn len(&self) -> usize {
        self.bounds.len()
    }

    /// Whether no task was resolved.
    pub fn is_empty(&self) -> bool {
        self.bounds.is_empty()
    }

    /// Iterates `(task, bound)` in ascending task order.
    pub fn iter(&self) -> impl Iterator<Item = (TaskId, NaiveDateTime)> + '_ {
        self.bounds.iter().map(|(&id, &b)| (id, b))
    }
}

/// Output of [`DependencyGraph::resolve`].
#[derive(Debug, Clone, Default)]
pub struct Resolution {
    /// Resolvable tasks in topological order (bound ascending, then id).
    pub order: Vec<TaskId>,
    /// Earliest-eligible start of every task in `order`.
    pub bounds: DependencyBounds,
    /// Tasks excluded by cycles, invalid data, or blocked dependencies.
    pub unschedulable: Vec<Unschedulable>,
}

#[derive(Debug, Clone)]
struct Node {
    duration: Duration,
    deps: BTreeSet<TaskId>,
}

/// Precedence graph over schedulable tasks.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    nodes: BTreeMap<TaskId, Node>,
    dependents: BTreeMap<TaskId, BTreeSet<TaskId>>,
}

impl DependencyGraph {
    /// Builds the graph from a task snapshot.
    ///
    /// Only non-terminal tasks become nodes; edges to terminal or
    /// missing tasks are dropped.
    pub fn build(tasks: &[Task]) -> Self {
        let live: BTreeSet<TaskId> = tasks
            .iter()
            .filter(|t| t.is_schedulable())
            .map(|t| t.id)
            .collect();

        let mut nodes = BTreeMap::new();
        let mut dependents: BTreeMap<TaskId, BTreeSet<TaskId>> = BTreeMap::new();
        for task in tasks.iter().filter(|t| t.is_schedulable()) {
            let deps: BTreeSet<TaskId> = task
                .dependencies
                .iter()
                .copied()
                .filter(|d| live.contains(d))
                .collect();
            for &d in &deps {
                dependents.entry(d).or_default().insert(task.id);
            }
            nodes.insert(
                task.id,
                Node {
                    duration: task.duration(),
                    deps,
                },
            );
        }

        Self { nodes, dependents }
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the graph has no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Whether `id` is a node.
    pub fn contains(&self, id: TaskId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Unresolved direct dependencies of `id` (ascending).
    pub fn dependencies(&self, id: TaskId) -> impl Iterator<Item = TaskId> + '_ {
        self.nodes
            .get(&id)
            .into_iter()
            .flat_map(|n| n.deps.iter().copied())
    }

    /// Direct dependents of `id` (ascending).
    pub fn dependents(&self, id: TaskId) -> impl Iterator<Item = TaskId> + '_ {
        self.dependents
            .get(&id)
            .into_iter()
            .flat_map(|s| s.iter().copied())
    }

    /// Finds every dependency cycle.
    ///
    /// Returns one entry per strongly connected component that contains a
    /// cycle (size > 1, or a task depending on itself). Members are sorted
    /// ascending; components are sorted by their smallest member.
    pub fn find_cycles(&self) -> Vec<Vec<TaskId>> {
        let mut state = TarjanState::default();
        for &id in self.nodes.keys() {
            if !state.index.contains_key(&id) {
                self.strong_connect(id, &mut state);
            }
        }

        let mut cycles: Vec<Vec<TaskId>> = state
            .components
            .into_iter()
            .filter(|c| {
                c.len() > 1 || c.first().is_some_and(|&id| self.dependencies(id).any(|d| d == id))
            })
            .map(|mut c| {
                c.sort_unstable();
                c
            })
            .collect();
        cycles.sort();
        cycles
    }

    fn strong_connect(&self, v: TaskId, state: &mut TarjanState) {
        state.index.insert(v, state.next);
        state.lowlink.insert(v, state.next);
        state.next += 1;
        state.stack.push(v);
        state.on_stack.insert(v);

        // Edges point from a task to its dependencies.
        for w in self.dependencies(v) {
            if !state.index.contains_key(&w) {
                self.strong_connect(w, state);
                let low = state.lowlink[&v].min(state.lowlink[&w]);
                state.lowlink.insert(v, low);
            } else if state.on_stack.contains(&w) {
                let low = state.lowlink[&v].min(state.index[&w]);
                state.lowlink.insert(v, low);
            }
        }

        if state.lowlink[&v] == state.index[&v] {
            let mut component = Vec::new();
            while let Some(w) = state.stack.pop() {
                state.on_stack.remove(&w);
                component.push(w);
                if w == v {
                    break;
                }
            }
            state.components.push(component);
        }
    }

    /// Resolves bounds and order.
    ///
    /// # Arguments
    /// * `start` - Bound of tasks without unresolved dependencies.
    /// * `pinned` - Tasks keeping a planned slot (`id → planned end`).
    /// * `excluded` - Tasks already known to be unschedulable.
    ///
    /// Cycle members are reported with [`UnschedulableReason::CyclicDependency`];
    /// tasks depending on any excluded task are reported with
    /// [`UnschedulableReason::BlockedByDependency`].
    pub fn resolve(
        &self,
        start: NaiveDateTime,
        pinned: &BTreeMap<TaskId, NaiveDateTime>,
        excluded: &BTreeMap<TaskId, UnschedulableReason>,
    ) -> Resolution {
        let mut removed: BTreeMap<TaskId, UnschedulableReason> = excluded
            .iter()
            .filter(|(id, _)| self.contains(**id))
            .map(|(&id, r)| (id, r.clone()))
            .collect();

        for cycle in self.find_cycles() {
            for &id in &cycle {
                removed.insert(
                    id,
                    UnschedulableReason::CyclicDependency {
                        cycle: cycle.clone(),
                    },
                );
            }
        }

        // Propagate exclusion to every transitive dependent.
        let mut frontier: Vec<TaskId> = removed.keys().copied().collect();
        while let Some(id) = frontier.pop() {
            for dependent in self.dependents(id) {
                if removed.contains_key(&dependent) {
                    continue;
                }
                let blocker = self
                    .dependencies(dependent)
                    .find(|d| removed.contains_key(d))
                    .unwrap_or(id);
                removed.insert(
                    dependent,
                    UnschedulableReason::BlockedByDependency {
                        dependency: blocker,
                    },
                );
                frontier.push(dependent);
            }
        }

        // Kahn's algorithm keyed by (bound, id) over the remaining DAG.
        let mut pending: BTreeMap<TaskId, usize> = BTreeMap::new();
        let mut bound_acc: BTreeMap<TaskId, NaiveDateTime> = BTreeMap::new();
        let mut heap = BinaryHeap::new();
        for (&id, node) in &self.nodes {
            if removed.contains_key(&id) {
                continue;
            }
            let count = node.deps.len();
            pending.insert(id, count);
            bound_acc.insert(id, start);
            if count == 0 {
                heap.push(Reverse((start, id)));
            }
        }

        let mut order = Vec::with_capacity(pending.len());
        let mut bounds = BTreeMap::new();
        while let Some(Reverse((bound, id))) = heap.pop() {
            order.push(id);
            bounds.insert(id, bound);

            let completion = match pinned.get(&id) {
                Some(&end) => end,
                None => bound + self.nodes[&id].duration,
            };
            for dependent in self.dependents(id) {
                let Some(count) = pending.get_mut(&dependent) else {
                    continue;
                };
                if let Some(acc) = bound_acc.get_mut(&dependent) {
                    *acc = (*acc).max(completion);
                }
                *count -= 1;
                if *count == 0 {
                    heap.push(Reverse((bound_acc[&dependent], dependent)));
                }
            }
        }

        let unschedulable = removed
            .into_iter()
            .map(|(id, reason)| Unschedulable::new(id, reason))
            .collect();

        Resolution {
            order,
            bounds: DependencyBounds { bounds },
            unschedulable,
        }
    }
}

#[derive(Default)]
struct TarjanState {
    next: usize,
    index: BTreeMap<TaskId, usize>,
    lowlink: BTreeMap<TaskId, usize>,
    stack: Vec<TaskId>,
    on_stack: BTreeSet<TaskId>,
    components: Vec<Vec<TaskId>>,
}

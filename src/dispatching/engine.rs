//! Rule engine for multi-criteria dispatching.
//!
//! Rules are applied as ordered layers: the first rule decides, each
//! later rule only separates tasks the earlier ones left tied.
//!
//! # Reference
//! Haupt (1989), "A Survey of Priority Rule-Based Scheduling"

use std::cmp::Ordering;
use std::sync::Arc;

use super::{rules, DispatchingRule, SchedulingContext};
use crate::models::{Task, TaskId};

/// How ties are broken after all rules are exhausted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TieBreaker {
    /// Keep input order (stable sort).
    #[default]
    InputOrder,
    /// Deterministic by task ID (ascending).
    ById,
}

/// A composable rule engine for task ordering.
///
/// Scores are compared with [`f64::total_cmp`], so every layer is a
/// total order and the composed comparison stays transitive.
///
/// # Example
/// ```
/// use u_taskplan::dispatching::{rules, RuleEngine, TieBreaker};
///
/// let engine = RuleEngine::new()
///     .with_rule(rules::Edd)
///     .with_tie_breaker(rules::Priority)
///     .with_final_tie_breaker(TieBreaker::ById);
/// assert_eq!(engine.rule_names(), vec!["EDD", "PRIORITY"]);
/// ```
#[derive(Clone, Default)]
pub struct RuleEngine {
    layers: Vec<Arc<dyn DispatchingRule>>,
    tie_breaker: TieBreaker,
}

impl RuleEngine {
    /// Creates an empty rule engine.
    pub fn new() -> Self {
        Self::default()
    }

    /// The ordering used for greedy placement.
    ///
    /// Deadline ascending (tasks without one last), then priority
    /// descending, then earliest-eligible start ascending, then task id.
    pub fn task_sorter() -> Self {
        Self::new()
            .with_rule(rules::Edd)
            .with_tie_breaker(rules::Priority)
            .with_tie_breaker(rules::EarliestStart)
            .with_final_tie_breaker(TieBreaker::ById)
    }

    /// Sets the primary rule, ahead of any layer added so far.
    pub fn with_rule<R: DispatchingRule + 'static>(mut self, rule: R) -> Self {
        self.layers.insert(0, Arc::new(rule));
        self
    }

    /// Appends a rule consulted only when every earlier layer ties.
    pub fn with_tie_breaker<R: DispatchingRule + 'static>(mut self, rule: R) -> Self {
        self.layers.push(Arc::new(rule));
        self
    }

    /// Sets what decides once every layer ties.
    pub fn with_final_tie_breaker(mut self, tie_breaker: TieBreaker) -> Self {
        self.tie_breaker = tie_breaker;
        self
    }

    /// Layer names, primary first.
    pub fn rule_names(&self) -> Vec<&'static str> {
        self.layers.iter().map(|r| r.name()).collect()
    }

    /// Returns indices into `tasks`, in processing order.
    ///
    /// Each score is computed once per task and layer.
    pub fn sort_indices(&self, tasks: &[Task], context: &SchedulingContext) -> Vec<usize> {
        let keys: Vec<Vec<f64>> = tasks
            .iter()
            .map(|task| {
                self.layers
                    .iter()
                    .map(|rule| rule.evaluate(task, context))
                    .collect()
            })
            .collect();

        let mut indices: Vec<usize> = (0..tasks.len()).collect();
        indices.sort_by(|&a, &b| {
            compare_keys(&keys[a], &keys[b]).then_with(|| self.final_tie(&tasks[a], &tasks[b]))
        });
        indices
    }

    /// Sorts tasks and returns their ids in processing order.
    pub fn order(&self, tasks: &[Task], context: &SchedulingContext) -> Vec<TaskId> {
        self.sort_indices(tasks, context)
            .into_iter()
            .map(|i| tasks[i].id)
            .collect()
    }

    fn final_tie(&self, a: &Task, b: &Task) -> Ordering {
        match self.tie_breaker {
            TieBreaker::InputOrder => Ordering::Equal,
            TieBreaker::ById => a.id.cmp(&b.id),
        }
    }
}

fn compare_keys(a: &[f64], b: &[f64]) -> Ordering {
    a.iter()
        .zip(b)
        .map(|(x, y)| x.total_cmp(y))
        .find(|o| o.is_ne())
        .unwrap_or(Ordering::Equal)
}

impl std::fmt::Debug for RuleEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuleEngine")
            .field("layers", &self.rule_names())
            .field("tie_breaker", &self.tie_breaker)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime};

    fn at(d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    fn make_task(id: TaskId, deadline: Option<NaiveDateTime>, priority: f64) -> Task {
        let mut task = Task::new(id).with_priority(priority);
        task.deadline = deadline;
        task
    }

    fn ctx() -> SchedulingContext {
        SchedulingContext::at_time(at(8, 9))
    }

    #[test]
    fn test_edd_ordering() {
        let tasks = vec![
            make_task(1, Some(at(12, 9)), 1.0),
            make_task(2, Some(at(9, 9)), 1.0),
            make_task(3, None, 1.0),
        ];
        let engine = RuleEngine::new().with_rule(rules::Edd);
        assert_eq!(engine.order(&tasks, &ctx()), vec![2, 1, 3]);
    }

    #[test]
    fn test_sequential_with_tie_breaker() {
        let tasks = vec![
            make_task(1, Some(at(10, 9)), 1.0),
            make_task(2, Some(at(10, 9)), 5.0),
        ];
        let engine = RuleEngine::new()
            .with_rule(rules::Edd)
            .with_tie_breaker(rules::Priority);

        assert_eq!(engine.order(&tasks, &ctx()), vec![2, 1]);
    }

    #[test]
    fn test_with_rule_goes_first() {
        let engine = RuleEngine::new()
            .with_tie_breaker(rules::Priority)
            .with_rule(rules::Edd);
        assert_eq!(engine.rule_names(), vec!["EDD", "PRIORITY"]);
    }

    #[test]
    fn test_task_sorter_keys() {
        let tasks = vec![
            make_task(10, None, 1.0),
            make_task(11, None, 1.0), // same as 10 but later bound
            make_task(12, None, 9.0),
            make_task(13, Some(at(20, 9)), 1.0),
            make_task(14, Some(at(9, 9)), 1.0),
            make_task(9, None, 1.0), // fully tied with 10
        ];
        let ctx = ctx()
            .with_earliest_start(10, at(8, 11))
            .with_earliest_start(9, at(8, 11))
            .with_earliest_start(11, at(8, 12));

        let order = RuleEngine::task_sorter().order(&tasks, &ctx);
        assert_eq!(order, vec![14, 13, 12, 9, 10, 11]);
    }

    #[test]
    fn test_task_sorter_is_deterministic() {
        let tasks: Vec<Task> = (1..=20)
            .map(|i| {
                let deadline = (i % 3 == 0).then(|| at(9 + (i % 5) as u32, 9));
                make_task(i, deadline, (i % 4) as f64 + 1.0)
            })
            .collect();
        let mut reversed = tasks.clone();
        reversed.reverse();

        let sorter = RuleEngine::task_sorter();
        assert_eq!(sorter.order(&tasks, &ctx()), sorter.order(&reversed, &ctx()));
    }

    #[test]
    fn test_tiny_priority_gaps_still_order() {
        // Neighbours differ by less than 1e-9; the ends by more.
        let tasks = vec![
            make_task(1, None, 1.0),
            make_task(2, None, 1.0 + 6e-10),
            make_task(3, None, 1.0 + 1.2e-9),
        ];
        let sorter = RuleEngine::task_sorter();
        let mut shuffled = tasks.clone();
        shuffled.swap(0, 2);
        assert_eq!(sorter.order(&tasks, &ctx()), vec![3, 2, 1]);
        assert_eq!(sorter.order(&shuffled, &ctx()), vec![3, 2, 1]);
    }

    #[test]
    fn test_by_id_tie_breaker() {
        let tasks = vec![make_task(2, None, 1.0), make_task(1, None, 1.0)];
        let engine = RuleEngine::new().with_rule(rules::Priority);
        assert_eq!(engine.order(&tasks, &ctx()), vec![2, 1]);

        let engine = engine.with_final_tie_breaker(TieBreaker::ById);
        assert_eq!(engine.order(&tasks, &ctx()), vec![1, 2]);
    }

    #[test]
    fn test_empty_tasks() {
        let engine = RuleEngine::task_sorter();
        assert!(engine.sort_indices(&[], &ctx()).is_empty());
        assert!(engine.order(&[], &ctx()).is_empty());
    }
}

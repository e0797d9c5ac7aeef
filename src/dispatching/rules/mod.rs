//! Built-in dispatching rules.
//!
//! # Categories
//!
//! - **Due-date**: EDD
//! - **Priority**: PRIORITY
//! - **Precedence**: EES (earliest eligible start)
//!
//! # Score Convention
//! All rules return lower scores for higher priority tasks.
//!
//! # References
//! - Pinedo (2016), "Scheduling: Theory, Algorithms, and Systems", Ch. 4
//! - Haupt (1989), "A Survey of Priority Rule-Based Scheduling"

use chrono::NaiveDateTime;

use super::{DispatchingRule, RuleScore, SchedulingContext};
use crate::models::Task;

fn epoch_secs(t: NaiveDateTime) -> f64 {
    t.and_utc().timestamp() as f64
}

// ======================== Due-date rules ========================

/// Earliest Due Date.
///
/// Prioritizes tasks with earlier deadlines. Tasks without deadlines
/// are assigned lowest priority.
///
/// # Reference
/// Jackson (1955), optimal for minimizing maximum lateness on single machine.
#[derive(Debug, Clone, Copy)]
pub struct Edd;

impl DispatchingRule for Edd {
    fn name(&self) -> &'static str {
        "EDD"
    }

    fn evaluate(&self, task: &Task, _context: &SchedulingContext) -> RuleScore {
        task.deadline.map(epoch_secs).unwrap_or(f64::MAX)
    }

    fn description(&self) -> &'static str {
        "Earliest Due Date"
    }
}

// ======================== Priority-based rule ========================

/// Simple priority rule.
///
/// Prioritizes tasks with higher `task.priority` values.
/// (Negated because lower score = higher priority in convention.)
#[derive(Debug, Clone, Copy)]
pub struct Priority;

impl DispatchingRule for Priority {
    fn name(&self) -> &'static str {
        "PRIORITY"
    }

    fn evaluate(&self, task: &Task, _context: &SchedulingContext) -> RuleScore {
        -task.priority
    }

    fn description(&self) -> &'static str {
        "Task Priority"
    }
}

// ======================== Precedence rule ========================

/// Earliest Eligible Start.
///
/// Prioritizes tasks whose dependencies resolve earliest.
#[derive(Debug, Clone, Copy)]
pub struct EarliestStart;

impl DispatchingRule for EarliestStart {
    fn name(&self) -> &'static str {
        "EES"
    }

    fn evaluate(&self, task: &Task, context: &SchedulingContext) -> RuleScore {
        epoch_secs(context.earliest_start_of(task.id))
    }

    fn description(&self) -> &'static str {
        "Earliest Eligible Start"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    fn ctx() -> SchedulingContext {
        SchedulingContext::at_time(at(8, 9))
    }

    #[test]
    fn test_edd() {
        let early = Task::new(1).with_deadline(at(9, 12));
        let late = Task::new(2).with_deadline(at(12, 12));
        let none = Task::new(3);
        assert!(Edd.evaluate(&early, &ctx()) < Edd.evaluate(&late, &ctx()));
        assert!(Edd.evaluate(&late, &ctx()) < Edd.evaluate(&none, &ctx()));
    }

    #[test]
    fn test_priority() {
        let high = Task::new(1).with_priority(10.0);
        let low = Task::new(2).with_priority(1.0);
        assert!(Priority.evaluate(&high, &ctx()) < Priority.evaluate(&low, &ctx()));
    }

    #[test]
    fn test_earliest_start() {
        let ctx = ctx().with_earliest_start(2, at(8, 15));
        let free = Task::new(1);
        let waiting = Task::new(2);
        assert!(EarliestStart.evaluate(&free, &ctx) < EarliestStart.evaluate(&waiting, &ctx));
    }
}

//! Schedule slot and diagnostic models.
//!
//! A slot is the time assignment the optimizer produced for one task.
//! Work may be split into several segments when a task spills over a
//! day's remaining capacity; the sum of segment lengths always equals
//! the task's estimated duration.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::task::{secs_to_hours, TaskId, TaskKeyed};
use super::TimeWindow;

/// A concrete `(task, start, end)` assignment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleSlot {
    /// Scheduled task.
    pub task_id: TaskId,
    /// Start of the first work segment.
    pub start: NaiveDateTime,
    /// End of the last work segment.
    pub end: NaiveDateTime,
    /// Contiguous work segments in chronological order.
    pub segments: Vec<TimeWindow>,
}

impl ScheduleSlot {
    /// Builds a slot from its work segments.
    ///
    /// Returns `None` when `segments` is empty.
    pub fn from_segments(task_id: TaskId, segments: Vec<TimeWindow>) -> Option<Self> {
        let start = segments.first()?.start;
        let end = segments.last()?.end;
        Some(Self {
            task_id,
            start,
            end,
            segments,
        })
    }

    /// A single-segment slot (retained planned slots).
    pub fn contiguous(task_id: TaskId, start: NaiveDateTime, end: NaiveDateTime) -> Self {
        Self {
            task_id,
            start,
            end,
            segments: vec![TimeWindow::new(start, end)],
        }
    }

    /// Seconds of actual work in this slot.
    pub fn worked_secs(&self) -> i64 {
        self.segments.iter().map(TimeWindow::duration_secs).sum()
    }

    /// Hours of actual work in this slot.
    pub fn worked_hours(&self) -> f64 {
        secs_to_hours(self.worked_secs())
    }

    /// Seconds of work falling inside `window`.
    pub fn worked_secs_in(&self, window: &TimeWindow) -> i64 {
        self.segments.iter().map(|s| s.overlap_secs(window)).sum()
    }

    /// Whether the task was split over more than one segment.
    pub fn is_split(&self) -> bool {
        self.segments.len() > 1
    }
}

impl TaskKeyed for ScheduleSlot {
    fn task_id(&self) -> TaskId {
        self.task_id
    }
}

/// Why a task received no slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UnschedulableReason {
    /// The task is a member of a dependency cycle.
    CyclicDependency {
        /// Every task in the strongly connected component, ascending.
        cycle: Vec<TaskId>,
    },
    /// A (transitive) dependency can never be scheduled.
    BlockedByDependency {
        /// The direct dependency that is unschedulable.
        dependency: TaskId,
    },
    /// The task violates a data invariant.
    InvalidTask {
        /// What is wrong.
        message: String,
    },
    /// No working day with free capacity was found within the search horizon.
    NoCapacity,
    /// Round-robin placement hit its iteration cap first.
    IterationLimit,
    /// The run was cancelled before the task was placed.
    Cancelled,
}

impl fmt::Display for UnschedulableReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CyclicDependency { cycle } => {
                let ids: Vec<String> = cycle.iter().map(|id| id.to_string()).collect();
                write!(f, "cyclic dependency among tasks [{}]", ids.join(", "))
            }
            Self::BlockedByDependency { dependency } => {
                write!(f, "blocked by unschedulable dependency {dependency}")
            }
            Self::InvalidTask { message } => write!(f, "invalid task: {message}"),
            Self::NoCapacity => write!(f, "no free work capacity within the planning horizon"),
            Self::IterationLimit => write!(f, "iteration limit reached before placement"),
            Self::Cancelled => write!(f, "optimization cancelled before placement"),
        }
    }
}

/// A task that could not be scheduled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unschedulable {
    /// Affected task.
    pub task_id: TaskId,
    /// Why it was excluded.
    pub reason: UnschedulableReason,
}

impl Unschedulable {
    /// Creates a new entry.
    pub fn new(task_id: TaskId, reason: UnschedulableReason) -> Self {
        Self { task_id, reason }
    }
}

impl TaskKeyed for Unschedulable {
    fn task_id(&self) -> TaskId {
        self.task_id
    }
}

/// A scheduled task that finishes after its deadline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeadlineMiss {
    /// Late task.
    pub task_id: TaskId,
    /// Requested completion.
    pub deadline: NaiveDateTime,
    /// Scheduled completion.
    pub end: NaiveDateTime,
    /// `end - deadline` in hours.
    pub hours_late: f64,
    /// Penalty contributed to the run.
    pub penalty: f64,
}

impl TaskKeyed for DeadlineMiss {
    fn task_id(&self) -> TaskId {
        self.task_id
    }
}

/// Quality summary of a run.
///
/// `penalty` is the cumulative deadline-miss penalty (lower is better);
/// `fitness` is its negation, as reported by the heuristic strategies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quality {
    /// Cumulative deadline-miss penalty.
    pub penalty: f64,
    /// `-penalty`.
    pub fitness: f64,
    /// Number of candidate orderings evaluated.
    pub evaluations: usize,
    /// GA generations completed (genetic strategy only).
    pub generations: Option<usize>,
}

impl Quality {
    /// Quality of a single deterministic pass.
    pub fn single_pass(penalty: f64) -> Self {
        Self {
            penalty,
            fitness: -penalty,
            evaluations: 1,
            generations: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(d: u32, h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, d)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    #[test]
    fn test_slot_from_segments() {
        let slot = ScheduleSlot::from_segments(
            1,
            vec![
                TimeWindow::new(at(8, 13, 30), at(8, 15, 30)),
                TimeWindow::new(at(9, 9, 30), at(9, 11, 30)),
            ],
        )
        .unwrap();

        assert_eq!(slot.start, at(8, 13, 30));
        assert_eq!(slot.end, at(9, 11, 30));
        assert_eq!(slot.worked_secs(), 4 * 3600);
        assert!((slot.worked_hours() - 4.0).abs() < 1e-12);
        assert!(slot.is_split());
        assert!(ScheduleSlot::from_segments(1, vec![]).is_none());
    }

    #[test]
    fn test_worked_secs_in_window() {
        let slot = ScheduleSlot::from_segments(
            1,
            vec![
                TimeWindow::new(at(8, 13, 30), at(8, 15, 30)),
                TimeWindow::new(at(9, 9, 30), at(9, 11, 30)),
            ],
        )
        .unwrap();
        let monday = TimeWindow::whole_day(at(8, 0, 0).date());
        assert_eq!(slot.worked_secs_in(&monday), 2 * 3600);
    }

    #[test]
    fn test_reason_display() {
        let r = UnschedulableReason::CyclicDependency { cycle: vec![1, 2] };
        assert_eq!(r.to_string(), "cyclic dependency among tasks [1, 2]");
        let r = UnschedulableReason::BlockedByDependency { dependency: 4 };
        assert!(r.to_string().contains('4'));
    }

    #[test]
    fn test_reason_serialization() {
        let entry = Unschedulable::new(3, UnschedulableReason::IterationLimit);
        let json = serde_json::to_string(&entry).unwrap();
        assert!(json.contains("\"kind\":\"iteration_limit\""));
        let back: Unschedulable = serde_json::from_str(&json).unwrap();
        assert_eq!(back, entry);
    }

    #[test]
    fn test_quality_single_pass() {
        let q = Quality::single_pass(25.0);
        assert_eq!(q.fitness, -25.0);
        assert_eq!(q.evaluations, 1);
        assert!(q.generations.is_none());
    }
}

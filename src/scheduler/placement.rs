//! Capacity-aware placement.
//!
//! The single primitive shared by every strategy: given a processing
//! order, put each task at the earliest moment that
//! - is not before its dependency bound or the end of any dependency,
//! - is not before the end of the previously placed task (one worker,
//!   one cursor),
//! - lies inside a day's work window,
//! - does not overlap work already placed or retained,
//! - keeps the day's total at or below its capacity.
//!
//! A task that does not fit the rest of a day continues at the next
//! day with capacity (overnight spill), so a slot may consist of several
//! segments.
//!
//! # Capacity
//! A day's capacity comes from the run's [`WorkloadStrategy`]:
//! `hours_available(day) - hours_used(snapshot, day)`. Retained slots are
//! charged against their days up front.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use std::cmp::Reverse;
use std::collections::{BTreeMap, BinaryHeap};
use std::ops::Bound::{Excluded, Unbounded};

use super::{CancellationToken, PlanningProblem};
use crate::models::{
    hours_to_secs, secs_to_hours, DeadlineMiss, ScheduleSlot, Task, TaskId, TimeWindow,
    Unschedulable, UnschedulableReason, WorkCapacityModel,
};
use crate::workload::WorkloadStrategy;

/// Consecutive days without capacity after which allocation gives up.
const MAX_IDLE_DAYS: u32 = 3660;

/// Per-day capacity and occupied intervals of one placement pass.
#[derive(Debug, Clone)]
pub struct CapacityLedger<'a> {
    capacity: &'a WorkCapacityModel,
    workload: &'a dyn WorkloadStrategy,
    snapshot: &'a [Task],
    used: BTreeMap<NaiveDate, i64>,
    // Disjoint, keyed by start.
    busy: BTreeMap<NaiveDateTime, NaiveDateTime>,
}

impl<'a> CapacityLedger<'a> {
    /// Creates a ledger with the problem's retained slots reserved.
    pub fn new(problem: &'a PlanningProblem) -> Self {
        let mut ledger = Self {
            capacity: &problem.capacity,
            workload: problem.workload.as_ref(),
            snapshot: &problem.snapshot,
            used: BTreeMap::new(),
            busy: BTreeMap::new(),
        };
        for slot in &problem.retained {
            ledger.reserve(slot);
        }
        ledger
    }

    /// Charges a slot's work to its days and marks it occupied.
    pub fn reserve(&mut self, slot: &ScheduleSlot) {
        for segment in &slot.segments {
            let mut day = segment.start.date();
            while day.and_time(chrono::NaiveTime::MIN) < segment.end {
                let secs = segment.overlap_secs(&TimeWindow::whole_day(day));
                *self.used_entry(day) += secs;
                match day.succ_opt() {
                    Some(next) => day = next,
                    None => break,
                }
            }
            self.mark_busy(*segment);
        }
    }

    /// Seconds of capacity `day` offers before any consumption.
    pub fn available_secs(&self, day: NaiveDate) -> i64 {
        hours_to_secs(self.workload.hours_available(day, self.capacity))
    }

    /// Seconds already consumed on `day` (baseline plus placements).
    pub fn used_secs(&self, day: NaiveDate) -> i64 {
        match self.used.get(&day) {
            Some(&secs) => secs,
            None => hours_to_secs(self.workload.hours_used(self.snapshot, day)),
        }
    }

    /// Seconds of capacity left on `day`.
    pub fn remaining_secs(&self, day: NaiveDate) -> i64 {
        (self.available_secs(day) - self.used_secs(day)).max(0)
    }

    /// Allocates `secs` of work starting no earlier than `from`.
    ///
    /// Returns the work segments in chronological order, or `None` when
    /// no capacity was found within the search horizon (the ledger is
    /// left unchanged in that case).
    pub fn allocate(&mut self, from: NaiveDateTime, secs: i64) -> Option<Vec<TimeWindow>> {
        let mut segments: Vec<TimeWindow> = Vec::new();
        let mut remaining = secs;
        let mut t = from;
        let mut idle_days = 0u32;

        while remaining > 0 {
            let day = t.date();
            let window = self.capacity.window_on(day);
            let room = self.remaining_secs(day);

            if room <= 0 || t >= window.end {
                idle_days += 1;
                if idle_days > MAX_IDLE_DAYS {
                    self.release(&segments);
                    return None;
                }
                t = self.next_window_start(day);
                continue;
            }
            if t < window.start {
                t = window.start;
            }
            if let Some((_, &end)) = self.busy.range(..=t).next_back() {
                if end > t {
                    t = end;
                    continue;
                }
            }

            let mut limit = window.end;
            if let Some((&next_busy, _)) = self.busy.range((Excluded(t), Unbounded)).next() {
                limit = limit.min(next_busy);
            }
            let chunk = remaining.min(room).min((limit - t).num_seconds());
            if chunk <= 0 {
                t = limit;
                continue;
            }

            let segment = TimeWindow::new(t, t + Duration::seconds(chunk));
            *self.used_entry(day) += chunk;
            self.mark_busy(segment);
            match segments.last_mut() {
                Some(last) if last.end == segment.start => last.end = segment.end,
                _ => segments.push(segment),
            }
            remaining -= chunk;
            t = segment.end;
            idle_days = 0;
        }

        Some(segments)
    }

    /// Allocates a whole task and wraps the segments in a slot.
    pub fn place(&mut self, task_id: TaskId, from: NaiveDateTime, secs: i64) -> Option<ScheduleSlot> {
        let segments = self.allocate(from, secs)?;
        ScheduleSlot::from_segments(task_id, segments)
    }

    fn next_window_start(&self, day: NaiveDate) -> NaiveDateTime {
        let next = day.succ_opt().unwrap_or(day);
        next.and_time(self.capacity.work_hours_start)
    }

    fn used_entry(&mut self, day: NaiveDate) -> &mut i64 {
        let workload = self.workload;
        let snapshot = self.snapshot;
        self.used
            .entry(day)
            .or_insert_with(|| hours_to_secs(workload.hours_used(snapshot, day)))
    }

    fn mark_busy(&mut self, window: TimeWindow) {
        let (mut start, mut end) = (window.start, window.end);
        let mut absorbed = Vec::new();
        for (&s, &e) in self.busy.range(..=end).rev() {
            if e < start {
                break;
            }
            absorbed.push(s);
            start = start.min(s);
            end = end.max(e);
        }
        for s in absorbed {
            self.busy.remove(&s);
        }
        self.busy.insert(start, end);
    }

    fn release(&mut self, segments: &[TimeWindow]) {
        for segment in segments {
            if let Some(used) = self.used.get_mut(&segment.start.date()) {
                *used -= segment.duration_secs();
            }
            self.unmark_busy(*segment);
        }
    }

    fn unmark_busy(&mut self, window: TimeWindow) {
        let Some((&s, &e)) = self.busy.range(..=window.start).next_back() else {
            return;
        };
        if e < window.end {
            return;
        }
        self.busy.remove(&s);
        if s < window.start {
            self.busy.insert(s, window.start);
        }
        if window.end < e {
            self.busy.insert(window.end, e);
        }
    }
}

/// Outcome of one placement pass.
#[derive(Debug, Clone, Default)]
pub struct Placement {
    /// Accepted slots, in placement order.
    pub slots: Vec<ScheduleSlot>,
    /// Tasks that received no slot during placement.
    pub unplaced: Vec<Unschedulable>,
    /// Accepted slots ending after their task's deadline.
    pub deadline_misses: Vec<DeadlineMiss>,
    /// Sum of deadline-miss penalties.
    pub penalty: f64,
    /// Placement stopped on a cancellation request.
    pub cancelled: bool,
    /// Placement stopped on an iteration cap.
    pub timed_out: bool,
}

impl Placement {
    /// End of the latest accepted slot.
    pub fn makespan_end(&self) -> Option<NaiveDateTime> {
        self.slots.iter().map(|s| s.end).max()
    }

    /// Whether `self` is strictly preferable to `other`.
    ///
    /// Compares unplaced count, then penalty, then makespan.
    pub fn is_better_than(&self, other: &Self) -> bool {
        if self.unplaced.len() != other.unplaced.len() {
            return self.unplaced.len() < other.unplaced.len();
        }
        if (self.penalty - other.penalty).abs() > 1e-9 {
            return self.penalty < other.penalty;
        }
        match (self.makespan_end(), other.makespan_end()) {
            (Some(a), Some(b)) => a < b,
            _ => false,
        }
    }

    /// Accepts a slot and charges its deadline penalty.
    pub(crate) fn accept(&mut self, task: &Task, slot: ScheduleSlot, multiplier: f64) {
        if let Some(miss) = deadline_miss(task, slot.end, multiplier) {
            self.penalty += miss.penalty;
            self.deadline_misses.push(miss);
        }
        self.slots.push(slot);
    }

    /// Marks every id in `rest` as not placed because of `reason`.
    pub(crate) fn abandon(&mut self, rest: &[TaskId], reason: UnschedulableReason) {
        self.unplaced
            .extend(rest.iter().map(|&id| Unschedulable::new(id, reason.clone())));
    }
}

/// Deadline miss of a task completing at `end`, if late.
pub fn deadline_miss(task: &Task, end: NaiveDateTime, multiplier: f64) -> Option<DeadlineMiss> {
    let deadline = task.deadline?;
    if end <= deadline {
        return None;
    }
    let hours_late = secs_to_hours((end - deadline).num_seconds());
    Some(DeadlineMiss {
        task_id: task.id,
        deadline,
        end,
        hours_late,
        penalty: multiplier * hours_late,
    })
}

/// Reorders `order` so every task follows its dependencies.
///
/// Repeatedly takes the earliest task in `order` whose dependencies are
/// all taken. Tasks of the problem missing from `order` are appended in
/// sorter order; unknown ids are dropped.
pub fn precedence_feasible(problem: &PlanningProblem, order: &[TaskId]) -> Vec<TaskId> {
    let mut position: BTreeMap<TaskId, usize> = BTreeMap::new();
    for (i, &id) in order.iter().enumerate() {
        if problem.tasks.contains_key(&id) {
            position.entry(id).or_insert(i);
        }
    }
    let mut next = order.len();
    for &id in &problem.sorted_order {
        position.entry(id).or_insert_with(|| {
            next += 1;
            next
        });
    }

    let mut indegree: BTreeMap<TaskId, usize> = BTreeMap::new();
    let mut dependents: BTreeMap<TaskId, Vec<TaskId>> = BTreeMap::new();
    let mut ready = BinaryHeap::new();
    for (&id, &pos) in &position {
        let deps = problem.dependencies(id);
        for &d in deps {
            dependents.entry(d).or_default().push(id);
        }
        indegree.insert(id, deps.len());
        if deps.is_empty() {
            ready.push(Reverse((pos, id)));
        }
    }

    let mut result = Vec::with_capacity(position.len());
    while let Some(Reverse((_, id))) = ready.pop() {
        result.push(id);
        for &dependent in dependents.get(&id).map(Vec::as_slice).unwrap_or(&[]) {
            if let Some(count) = indegree.get_mut(&dependent) {
                *count -= 1;
                if *count == 0 {
                    ready.push(Reverse((position[&dependent], dependent)));
                }
            }
        }
    }
    result
}

/// Places tasks one after another in (precedence-repaired) `order`.
///
/// Each task is allocated in full at the earliest feasible moment; see
/// the module documentation for the constraints.
pub fn place_sequence(
    problem: &PlanningProblem,
    order: &[TaskId],
    cancel: &CancellationToken,
) -> Placement {
    let order = precedence_feasible(problem, order);
    let mut ledger = CapacityLedger::new(problem);
    let mut placement = Placement::default();
    let mut finished: BTreeMap<TaskId, NaiveDateTime> = BTreeMap::new();
    let mut cursor = problem.start;

    for (i, &id) in order.iter().enumerate() {
        if cancel.is_cancelled() {
            placement.cancelled = true;
            placement.abandon(&order[i..], UnschedulableReason::Cancelled);
            break;
        }
        let Some(task) = problem.task(id) else {
            continue;
        };

        let mut earliest = problem.bound(id).max(cursor);
        let mut blocker = None;
        for &dep in problem.dependencies(id) {
            match finished.get(&dep) {
                Some(&end) => earliest = earliest.max(end),
                None => {
                    blocker = Some(dep);
                    break;
                }
            }
        }
        if let Some(dependency) = blocker {
            placement.unplaced.push(Unschedulable::new(
                id,
                UnschedulableReason::BlockedByDependency { dependency },
            ));
            continue;
        }

        match ledger.place(id, earliest, task.duration_secs()) {
            Some(slot) => {
                cursor = slot.end;
                finished.insert(id, slot.end);
                placement.accept(task, slot, problem.penalty_multiplier);
            }
            None => placement
                .unplaced
                .push(Unschedulable::new(id, UnschedulableReason::NoCapacity)),
        }
    }

    placement
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::PlanSettings;
    use chrono::NaiveDate;

    fn at(d: u32, h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, d)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    // 2024-01-08 is a Monday.
    fn prepare(tasks: &[Task]) -> PlanningProblem {
        PlanningProblem::prepare(tasks, PlanSettings::new(at(8, 9, 30))).unwrap()
    }

    #[test]
    fn test_chain_spills_to_next_day() {
        let problem = prepare(&[
            Task::new(1).with_duration_hours(4.0),
            Task::new(2).with_duration_hours(4.0).with_dependency(1),
            Task::new(3).with_duration_hours(4.0).with_dependency(2),
        ]);
        let placement = place_sequence(&problem, &problem.sorted_order, &CancellationToken::new());

        assert_eq!(placement.slots.len(), 3);
        let a = &placement.slots[0];
        assert_eq!((a.start, a.end), (at(8, 9, 30), at(8, 13, 30)));
        let b = &placement.slots[1];
        assert_eq!(
            b.segments,
            vec![
                TimeWindow::new(at(8, 13, 30), at(8, 15, 30)),
                TimeWindow::new(at(9, 9, 30), at(9, 11, 30)),
            ]
        );
        let c = &placement.slots[2];
        assert_eq!((c.start, c.end), (at(9, 11, 30), at(9, 15, 30)));
        assert_eq!(placement.penalty, 0.0);
    }

    #[test]
    fn test_friday_spills_to_monday() {
        let settings = PlanSettings::new(at(12, 9, 30));
        let tasks = [Task::new(1).with_duration_hours(8.0)];
        let problem = PlanningProblem::prepare(&tasks, settings).unwrap();
        let placement = place_sequence(&problem, &problem.sorted_order, &CancellationToken::new());

        let slot = &placement.slots[0];
        assert_eq!(
            slot.segments,
            vec![
                TimeWindow::new(at(12, 9, 30), at(12, 15, 30)),
                TimeWindow::new(at(15, 9, 30), at(15, 11, 30)),
            ]
        );
    }

    #[test]
    fn test_friday_spill_follows_workload_policy() {
        use crate::config::WorkloadPolicy;
        use crate::models::TaskStatus;
        use crate::workload::make_workload_strategy;

        // Two hours already logged on Saturday.
        let tasks = [
            Task::new(1).with_duration_hours(12.0),
            Task::new(2)
                .with_status(TaskStatus::Completed)
                .with_actual(at(13, 10, 0), at(13, 12, 0)),
        ];
        let friday = at(12, 9, 30);
        let capacity = WorkCapacityModel::default();

        let actual = PlanSettings::new(friday)
            .with_workload(make_workload_strategy(WorkloadPolicy::ActualSchedule, &capacity));
        let problem = PlanningProblem::prepare(&tasks, actual).unwrap();
        let ledger = CapacityLedger::new(&problem);
        assert_eq!(ledger.remaining_secs(at(13, 0, 0).date()), 4 * 3600);
        let placement = place_sequence(&problem, &problem.sorted_order, &CancellationToken::new());
        assert_eq!(
            placement.slots[0].segments,
            vec![
                TimeWindow::new(at(12, 9, 30), at(12, 15, 30)),
                TimeWindow::new(at(13, 9, 30), at(13, 13, 30)),
                TimeWindow::new(at(14, 9, 30), at(14, 11, 30)),
            ]
        );

        let weekdays = PlanSettings::new(friday)
            .with_workload(make_workload_strategy(WorkloadPolicy::WeekdayOnly, &capacity));
        let problem = PlanningProblem::prepare(&tasks, weekdays).unwrap();
        let ledger = CapacityLedger::new(&problem);
        assert_eq!(ledger.remaining_secs(at(13, 0, 0).date()), 0);
        let placement = place_sequence(&problem, &problem.sorted_order, &CancellationToken::new());
        assert_eq!(
            placement.slots[0].segments,
            vec![
                TimeWindow::new(at(12, 9, 30), at(12, 15, 30)),
                TimeWindow::new(at(15, 9, 30), at(15, 15, 30)),
            ]
        );
    }

    #[test]
    fn test_start_outside_window_is_clamped() {
        let settings = PlanSettings::new(at(8, 20, 0));
        let tasks = [Task::new(1).with_duration_hours(1.0)];
        let problem = PlanningProblem::prepare(&tasks, settings).unwrap();
        let placement = place_sequence(&problem, &problem.sorted_order, &CancellationToken::new());
        assert_eq!(placement.slots[0].start, at(9, 9, 30));
    }

    #[test]
    fn test_retained_slot_is_busy_and_charged() {
        let problem = prepare(&[
            Task::new(1)
                .with_duration_hours(2.0)
                .with_planned(at(8, 10, 0), at(8, 12, 0)),
            Task::new(2).with_duration_hours(5.0),
        ]);
        let placement = place_sequence(&problem, &problem.sorted_order, &CancellationToken::new());
        let slot = &placement.slots[0];
        // 30 min before the retained slot, 3.5 h after it, then Tuesday.
        assert_eq!(
            slot.segments,
            vec![
                TimeWindow::new(at(8, 9, 30), at(8, 10, 0)),
                TimeWindow::new(at(8, 12, 0), at(8, 15, 30)),
                TimeWindow::new(at(9, 9, 30), at(9, 10, 30)),
            ]
        );
    }

    #[test]
    fn test_baseline_consumption_reduces_capacity() {
        let problem = prepare(&[
            Task::new(1)
                .with_status(crate::models::TaskStatus::Completed)
                .with_actual(at(8, 7, 0), at(8, 12, 0)),
            Task::new(2).with_duration_hours(2.0),
        ]);
        let placement = place_sequence(&problem, &problem.sorted_order, &CancellationToken::new());
        let slot = &placement.slots[0];
        assert_eq!(
            slot.segments,
            vec![
                TimeWindow::new(at(8, 9, 30), at(8, 10, 30)),
                TimeWindow::new(at(9, 9, 30), at(9, 10, 30)),
            ]
        );
    }

    #[test]
    fn test_deadline_penalty() {
        let problem = prepare(&[Task::new(1)
            .with_duration_hours(3.0)
            .with_deadline(at(8, 10, 30))]);
        let placement = place_sequence(&problem, &problem.sorted_order, &CancellationToken::new());
        assert_eq!(placement.deadline_misses.len(), 1);
        assert!((placement.deadline_misses[0].hours_late - 2.0).abs() < 1e-9);
        assert!((placement.penalty - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_order_is_repaired_for_precedence() {
        let problem = prepare(&[
            Task::new(1).with_duration_hours(1.0),
            Task::new(2).with_duration_hours(1.0).with_dependency(1),
            Task::new(3).with_duration_hours(1.0),
        ]);
        assert_eq!(precedence_feasible(&problem, &[2, 3, 1]), vec![3, 1, 2]);
        assert_eq!(precedence_feasible(&problem, &[2]), vec![1, 2, 3]);
    }

    #[test]
    fn test_cancelled_placement_abandons_rest() {
        let problem = prepare(&[Task::new(1), Task::new(2)]);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let placement = place_sequence(&problem, &problem.sorted_order, &cancel);
        assert!(placement.cancelled);
        assert!(placement.slots.is_empty());
        assert_eq!(placement.unplaced.len(), 2);
    }

    #[test]
    fn test_ledger_never_exceeds_daily_capacity() {
        let tasks: Vec<Task> = (1..=12)
            .map(|i| Task::new(i).with_duration_hours(0.75 + (i % 4) as f64))
            .collect();
        let problem = prepare(&tasks);
        let placement = place_sequence(&problem, &problem.sorted_order, &CancellationToken::new());
        for d in 8..=31 {
            let day = TimeWindow::whole_day(NaiveDate::from_ymd_opt(2024, 1, d).unwrap());
            let secs: i64 = placement.slots.iter().map(|s| s.worked_secs_in(&day)).sum();
            assert!(secs <= 6 * 3600, "day {d} has {secs}s");
        }
    }

    #[test]
    fn test_failed_allocation_leaves_ledger_unchanged() {
        let capacity = WorkCapacityModel::default().with_weekdays(vec![]);
        let settings = PlanSettings::new(at(8, 9, 30)).with_capacity(capacity);
        let tasks = [Task::new(1)];
        let problem = PlanningProblem::prepare(&tasks, settings).unwrap();
        let mut ledger = CapacityLedger::new(&problem);
        assert!(ledger.allocate(at(8, 9, 30), 3600).is_none());
        assert_eq!(ledger.used_secs(at(8, 0, 0).date()), 0);
    }
}

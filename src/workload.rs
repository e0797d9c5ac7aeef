//! Workload calculation strategies.
//!
//! Answer two questions for a calendar day: how many hours of work the
//! task snapshot already consumed on it, and how many hours of capacity
//! the day offers. The placement ledger asks the selected strategy for
//! both, so capacity accounting and placement always agree.
//!
//! | Strategy | `hours_used` | `hours_available` |
//! |----------|--------------|-------------------|
//! | [`ActualScheduleStrategy`] | actual work on any day | ceiling on every day |
//! | [`WeekdayOnlyStrategy`] | actual work on working weekdays | ceiling on working weekdays, 0 otherwise |

use chrono::{Datelike, NaiveDate, Weekday};
use std::fmt::Debug;

use crate::config::WorkloadPolicy;
use crate::models::{
    default_working_weekdays, secs_to_hours, Task, TimeWindow, WorkCapacityModel,
};

/// A workload accounting rule.
pub trait WorkloadStrategy: Send + Sync + Debug {
    /// Strategy name.
    fn name(&self) -> &'static str;

    /// Hours of recorded work in `tasks` falling on `day`.
    fn hours_used(&self, tasks: &[Task], day: NaiveDate) -> f64;

    /// Hours of capacity `day` offers before any consumption.
    fn hours_available(&self, day: NaiveDate, capacity: &WorkCapacityModel) -> f64;

    /// Capacity left on `day` after the work already recorded in `tasks`.
    fn hours_remaining(
        &self,
        tasks: &[Task],
        day: NaiveDate,
        capacity: &WorkCapacityModel,
    ) -> f64 {
        (self.hours_available(day, capacity) - self.hours_used(tasks, day)).max(0.0)
    }
}

/// Accounts for all actual work, every day of the week.
///
/// Used for retrospective utilization statistics.
#[derive(Debug, Clone, Copy, Default)]
pub struct ActualScheduleStrategy;

impl WorkloadStrategy for ActualScheduleStrategy {
    fn name(&self) -> &'static str {
        "actual_schedule"
    }

    fn hours_used(&self, tasks: &[Task], day: NaiveDate) -> f64 {
        actual_hours_on(tasks, day)
    }

    fn hours_available(&self, _day: NaiveDate, capacity: &WorkCapacityModel) -> f64 {
        capacity.max_hours_per_day
    }
}

/// Accounts only for configured working weekdays.
///
/// Weekend-dated actual work is ignored, and non-working days offer no
/// capacity. This is the placement default, since the optimizer never
/// schedules into non-working days.
#[derive(Debug, Clone)]
pub struct WeekdayOnlyStrategy {
    weekdays: Vec<Weekday>,
}

impl Default for WeekdayOnlyStrategy {
    fn default() -> Self {
        Self::new(default_working_weekdays())
    }
}

impl WeekdayOnlyStrategy {
    /// Creates the strategy for the given working weekdays.
    pub fn new(weekdays: Vec<Weekday>) -> Self {
        Self { weekdays }
    }

    /// Uses the working weekdays of a capacity model.
    pub fn from_model(capacity: &WorkCapacityModel) -> Self {
        Self::new(capacity.working_weekdays.clone())
    }

    /// Whether `day` is a working day.
    pub fn is_working_day(&self, day: NaiveDate) -> bool {
        self.weekdays.contains(&day.weekday())
    }
}

impl WorkloadStrategy for WeekdayOnlyStrategy {
    fn name(&self) -> &'static str {
        "weekday_only"
    }

    fn hours_used(&self, tasks: &[Task], day: NaiveDate) -> f64 {
        if self.is_working_day(day) {
            actual_hours_on(tasks, day)
        } else {
            0.0
        }
    }

    fn hours_available(&self, day: NaiveDate, capacity: &WorkCapacityModel) -> f64 {
        if self.is_working_day(day) {
            capacity.max_hours_per_day
        } else {
            0.0
        }
    }
}

/// Builds the strategy selected by `policy`.
pub fn make_workload_strategy(
    policy: WorkloadPolicy,
    capacity: &WorkCapacityModel,
) -> Box<dyn WorkloadStrategy> {
    match policy {
        WorkloadPolicy::WeekdayOnly => Box::new(WeekdayOnlyStrategy::from_model(capacity)),
        WorkloadPolicy::ActualSchedule => Box::new(ActualScheduleStrategy),
    }
}

fn actual_hours_on(tasks: &[Task], day: NaiveDate) -> f64 {
    let window = TimeWindow::whole_day(day);
    let secs: i64 = tasks
        .iter()
        .filter_map(Task::actual_window)
        .map(|(s, e)| TimeWindow::new(s, e).overlap_secs(&window))
        .sum();
    secs_to_hours(secs)
}

/// Workload of one calendar day.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyWorkload {
    /// The day.
    pub date: NaiveDate,
    /// Recorded hours.
    pub hours_used: f64,
    /// Capacity before consumption.
    pub hours_available: f64,
    /// `hours_used / hours_available`; `None` on days without capacity.
    pub utilization: Option<f64>,
}

/// Summarizes workload for every day in `[from, to]`.
///
/// # Example
/// ```
/// use chrono::NaiveDate;
/// use u_taskplan::models::WorkCapacityModel;
/// use u_taskplan::workload::{summarize, WeekdayOnlyStrategy};
///
/// let from = NaiveDate::from_ymd_opt(2024, 1, 8).unwrap();
/// let to = NaiveDate::from_ymd_opt(2024, 1, 14).unwrap();
/// let days = summarize(&WeekdayOnlyStrategy::default(), &[], from, to, &WorkCapacityModel::default());
/// assert_eq!(days.len(), 7);
/// assert_eq!(days[5].hours_available, 0.0); // Saturday
/// ```
pub fn summarize(
    strategy: &dyn WorkloadStrategy,
    tasks: &[Task],
    from: NaiveDate,
    to: NaiveDate,
    capacity: &WorkCapacityModel,
) -> Vec<DailyWorkload> {
    from.iter_days()
        .take_while(|d| *d <= to)
        .map(|date| {
            let hours_used = strategy.hours_used(tasks, date);
            let hours_available = strategy.hours_available(date, capacity);
            let utilization = (hours_available > 0.0).then(|| hours_used / hours_available);
            DailyWorkload {
                date,
                hours_used,
                hours_available,
                utilization,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TaskStatus;
    use chrono::NaiveDateTime;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn at(d: u32, h: u32, m: u32) -> NaiveDateTime {
        day(d).and_hms_opt(h, m, 0).unwrap()
    }

    fn logged_work() -> Vec<Task> {
        vec![
            // Monday 2h
            Task::new(1)
                .with_status(TaskStatus::Completed)
                .with_actual(at(8, 9, 0), at(8, 11, 0)),
            // Monday 1.5h, still running
            Task::new(2)
                .with_status(TaskStatus::InProgress)
                .with_actual(at(8, 14, 0), at(8, 15, 30)),
            // Saturday 3h
            Task::new(3)
                .with_status(TaskStatus::Completed)
                .with_actual(at(13, 10, 0), at(13, 13, 0)),
            // No actual work
            Task::new(4),
        ]
    }

    #[test]
    fn test_actual_strategy_counts_every_day() {
        let tasks = logged_work();
        let s = ActualScheduleStrategy;
        assert!((s.hours_used(&tasks, day(8)) - 3.5).abs() < 1e-9);
        assert!((s.hours_used(&tasks, day(13)) - 3.0).abs() < 1e-9);
        assert_eq!(s.hours_used(&tasks, day(9)), 0.0);

        let model = WorkCapacityModel::default();
        assert_eq!(s.hours_available(day(13), &model), 6.0);
    }

    #[test]
    fn test_weekday_only_ignores_weekends() {
        let tasks = logged_work();
        let s = WeekdayOnlyStrategy::default();
        let model = WorkCapacityModel::default();

        assert!((s.hours_used(&tasks, day(8)) - 3.5).abs() < 1e-9);
        assert_eq!(s.hours_used(&tasks, day(13)), 0.0);
        assert_eq!(s.hours_available(day(8), &model), 6.0);
        assert_eq!(s.hours_available(day(13), &model), 0.0);
        assert_eq!(s.hours_available(day(14), &model), 0.0);
    }

    #[test]
    fn test_hours_remaining() {
        let tasks = logged_work();
        let model = WorkCapacityModel::default();
        let s = WeekdayOnlyStrategy::default();
        assert!((s.hours_remaining(&tasks, day(8), &model) - 2.5).abs() < 1e-9);
        assert_eq!(s.hours_remaining(&tasks, day(13), &model), 0.0);
    }

    #[test]
    fn test_work_spanning_midnight_is_split_by_day() {
        let tasks = vec![Task::new(1).with_actual(at(9, 22, 0), at(10, 2, 0))];
        let s = ActualScheduleStrategy;
        assert!((s.hours_used(&tasks, day(9)) - 2.0).abs() < 1e-9);
        assert!((s.hours_used(&tasks, day(10)) - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_make_workload_strategy() {
        let model = WorkCapacityModel::default().with_weekdays(vec![Weekday::Sun]);
        let s = make_workload_strategy(WorkloadPolicy::WeekdayOnly, &model);
        assert_eq!(s.name(), "weekday_only");
        assert_eq!(s.hours_available(day(14), &model), 6.0);
        assert_eq!(s.hours_available(day(8), &model), 0.0);

        let s = make_workload_strategy(WorkloadPolicy::ActualSchedule, &model);
        assert_eq!(s.name(), "actual_schedule");
    }

    #[test]
    fn test_summarize_week() {
        let tasks = logged_work();
        let model = WorkCapacityModel::default();
        let days = summarize(&ActualScheduleStrategy, &tasks, day(8), day(14), &model);
        assert_eq!(days.len(), 7);
        assert_eq!(days[0].date, day(8));
        let monday = days[0].utilization.unwrap();
        assert!((monday - 3.5 / 6.0).abs() < 1e-9);

        let weekday = summarize(&WeekdayOnlyStrategy::default(), &tasks, day(8), day(14), &model);
        assert!(weekday[5].utilization.is_none());
    }
}

//! Work capacity model and time windows.
//!
//! Defines where personal work may be placed: a daily work window
//! `[work_hours_start, work_hours_end)`, a daily hour ceiling, and the
//! set of working weekdays.
//!
//! # Time Model
//! All instants are local wall-clock `NaiveDateTime`s. A "day" is a
//! calendar `NaiveDate`; the window of a day never crosses midnight.
//!
//! The capacity model is derived from configuration for each run and is
//! never stored.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};

/// A time interval [start, end).
///
/// Half-open interval: includes start, excludes end.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimeWindow {
    /// Interval start (inclusive).
    pub start: NaiveDateTime,
    /// Interval end (exclusive).
    pub end: NaiveDateTime,
}

impl TimeWindow {
    /// Creates a new time window.
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Self {
        Self { start, end }
    }

    /// Length of this window in seconds (0 if inverted).
    #[inline]
    pub fn duration_secs(&self) -> i64 {
        (self.end - self.start).num_seconds().max(0)
    }

    /// Whether an instant falls within this window.
    #[inline]
    pub fn contains(&self, t: NaiveDateTime) -> bool {
        t >= self.start && t < self.end
    }

    /// Whether two windows overlap.
    pub fn overlaps(&self, other: &Self) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Seconds shared by two windows.
    pub fn overlap_secs(&self, other: &Self) -> i64 {
        let start = self.start.max(other.start);
        let end = self.end.min(other.end);
        if end > start {
            (end - start).num_seconds()
        } else {
            0
        }
    }

    /// The whole calendar day `[00:00, next 00:00)`.
    pub fn whole_day(day: NaiveDate) -> Self {
        let start = day.and_time(NaiveTime::MIN);
        Self::new(start, start + Duration::days(1))
    }
}

/// Per-day work window and hour ceiling.
///
/// # Examples
///
/// ```
/// use chrono::{NaiveDate, NaiveTime};
/// use u_taskplan::models::WorkCapacityModel;
///
/// let model = WorkCapacityModel::default();
/// let monday = NaiveDate::from_ymd_opt(2024, 1, 8).unwrap();
/// let window = model.window_on(monday);
/// assert_eq!(window.start.time(), NaiveTime::from_hms_opt(9, 30, 0).unwrap());
/// assert_eq!(window.duration_secs(), 9 * 3600);
/// assert!(model.is_working_weekday(monday));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkCapacityModel {
    /// Daily window start (inclusive).
    pub work_hours_start: NaiveTime,
    /// Daily window end (exclusive).
    pub work_hours_end: NaiveTime,
    /// Maximum hours of work per calendar day.
    pub max_hours_per_day: f64,
    /// Days of the week considered working days.
    pub working_weekdays: Vec<Weekday>,
}

impl Default for WorkCapacityModel {
    fn default() -> Self {
        Self {
            work_hours_start: NaiveTime::from_hms_opt(9, 30, 0).unwrap_or(NaiveTime::MIN),
            work_hours_end: NaiveTime::from_hms_opt(18, 30, 0).unwrap_or(NaiveTime::MIN),
            max_hours_per_day: 6.0,
            working_weekdays: default_working_weekdays(),
        }
    }
}

/// Monday through Friday.
pub fn default_working_weekdays() -> Vec<Weekday> {
    vec![
        Weekday::Mon,
        Weekday::Tue,
        Weekday::Wed,
        Weekday::Thu,
        Weekday::Fri,
    ]
}

impl WorkCapacityModel {
    /// Creates a model with the given window and ceiling (Mon–Fri).
    pub fn new(start: NaiveTime, end: NaiveTime, max_hours_per_day: f64) -> Self {
        Self {
            work_hours_start: start,
            work_hours_end: end,
            max_hours_per_day,
            working_weekdays: default_working_weekdays(),
        }
    }

    /// Sets the working weekdays.
    pub fn with_weekdays(mut self, weekdays: Vec<Weekday>) -> Self {
        self.working_weekdays = weekdays;
        self
    }

    /// The work window on a given day.
    pub fn window_on(&self, day: NaiveDate) -> TimeWindow {
        TimeWindow::new(
            day.and_time(self.work_hours_start),
            day.and_time(self.work_hours_end),
        )
    }

    /// Whether `day` falls on a configured working weekday.
    pub fn is_working_weekday(&self, day: NaiveDate) -> bool {
        self.working_weekdays.contains(&day.weekday())
    }

    /// Daily ceiling in whole seconds.
    pub fn max_secs_per_day(&self) -> i64 {
        super::task::hours_to_secs(self.max_hours_per_day)
    }

    /// Length of the daily window in seconds.
    pub fn window_secs(&self) -> i64 {
        (self.work_hours_end - self.work_hours_start)
            .num_seconds()
            .max(0)
    }

    /// Hours of placeable work per day: the ceiling, clipped to the window.
    pub fn effective_hours_per_day(&self) -> f64 {
        self.max_hours_per_day
            .min(super::task::secs_to_hours(self.window_secs()))
    }
}

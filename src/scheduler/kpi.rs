//! Schedule quality metrics (KPIs).
//!
//! Computes performance indicators from the accepted slots of a run and
//! the tasks they belong to.
//!
//! # Metrics
//!
//! | Metric | Definition |
//! |--------|-----------|
//! | Makespan end | Latest slot end |
//! | Total hours late | Sum of max(0, end - deadline) |
//! | Max hours late | Largest single delay |
//! | On-Time Rate | Fraction of slots meeting their deadline |
//! | Hours by day | Work placed on each calendar day |
//! | Avg daily utilization | Mean of `hours / max_hours_per_day` over days with work |
//! | Avg flow time | Mean time from planning start to slot end |
//!
//! # Reference
//! Pinedo (2016), "Scheduling", Ch. 1.2: Performance Measures

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::models::{secs_to_hours, ScheduleSlot, Task, TaskId};

/// Schedule performance indicators.
///
/// All durations are in hours.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScheduleKpi {
    /// Latest slot end, `None` without slots.
    pub makespan_end: Option<NaiveDateTime>,
    /// Total hours of placed work.
    pub scheduled_hours: f64,
    /// Sum of lateness across all slots.
    pub total_hours_late: f64,
    /// Maximum lateness of any single slot.
    pub max_hours_late: f64,
    /// Fraction of slots ending by their deadline (0.0..1.0).
    pub on_time_rate: f64,
    /// Slots split over more than one segment.
    pub split_tasks: usize,
    /// Placed hours per calendar day.
    pub hours_by_day: BTreeMap<NaiveDate, f64>,
    /// Mean daily utilization of the hour ceiling (0.0..1.0).
    pub avg_daily_utilization: f64,
    /// Mean `end - planning start` in hours.
    pub avg_flow_hours: f64,
}

impl ScheduleKpi {
    /// Computes KPIs from slots and their tasks.
    ///
    /// # Arguments
    /// * `slots` - Accepted slots.
    /// * `tasks` - Task data (for deadlines); tasks without a slot are ignored.
    /// * `start` - Planning start.
    /// * `max_hours_per_day` - Daily ceiling used for utilization.
    pub fn calculate(
        slots: &[ScheduleSlot],
        tasks: &[Task],
        start: NaiveDateTime,
        max_hours_per_day: f64,
    ) -> Self {
        let deadlines: HashMap<TaskId, NaiveDateTime> = tasks
            .iter()
            .filter_map(|t| t.deadline.map(|d| (t.id, d)))
            .collect();

        let mut total_late = 0.0;
        let mut max_late: f64 = 0.0;
        let mut on_time_count = 0usize;
        let mut total_flow = 0.0;
        let mut worked_secs = 0i64;
        let mut secs_by_day: BTreeMap<NaiveDate, i64> = BTreeMap::new();

        for slot in slots {
            worked_secs += slot.worked_secs();
            total_flow += secs_to_hours((slot.end - start).num_seconds());
            for segment in &slot.segments {
                *secs_by_day.entry(segment.start.date()).or_insert(0) += segment.duration_secs();
            }

            match deadlines.get(&slot.task_id) {
                Some(&deadline) if slot.end > deadline => {
                    let late = secs_to_hours((slot.end - deadline).num_seconds());
                    total_late += late;
                    max_late = max_late.max(late);
                }
                // No deadline → considered on-time
                _ => on_time_count += 1,
            }
        }

        let hours_by_day: BTreeMap<NaiveDate, f64> = secs_by_day
            .into_iter()
            .map(|(day, secs)| (day, secs_to_hours(secs)))
            .collect();

        let avg_daily_utilization = if hours_by_day.is_empty() || max_hours_per_day <= 0.0 {
            0.0
        } else {
            let sum: f64 = hours_by_day.values().map(|h| h / max_hours_per_day).sum();
            sum / hours_by_day.len() as f64
        };

        let (on_time_rate, avg_flow_hours) = if slots.is_empty() {
            (1.0, 0.0)
        } else {
            let n = slots.len() as f64;
            (on_time_count as f64 / n, total_flow / n)
        };

        Self {
            makespan_end: slots.iter().map(|s| s.end).max(),
            scheduled_hours: secs_to_hours(worked_secs),
            total_hours_late: total_late,
            max_hours_late: max_late,
            on_time_rate,
            split_tasks: slots.iter().filter(|s| s.is_split()).count(),
            hours_by_day,
            avg_daily_utilization,
            avg_flow_hours,
        }
    }
}

//! Task planning domain models.
//!
//! Provides the data types shared by every stage of an optimization
//! run: the task snapshot, the work capacity model, and the slots and
//! diagnostics a run produces.
//!
//! | Type | Role |
//! |------|------|
//! | `Task` | Read-only snapshot of a stored task |
//! | `WorkCapacityModel` | Daily work window and hour ceiling |
//! | `ScheduleSlot` | Time assignment for one task |
//! | `Unschedulable` | Task excluded from placement, with reason |

mod calendar;
mod schedule;
mod task;

pub use calendar::{default_working_weekdays, TimeWindow, WorkCapacityModel};
pub use schedule::{DeadlineMiss, Quality, ScheduleSlot, Unschedulable, UnschedulableReason};
pub use task::{
    find_by_task, hours_to_secs, secs_to_hours, Task, TaskId, TaskKeyed, TaskStatus, MAX_DURATION_HOURS,
};

//! Collaborator contracts.
//!
//! The engine reads tasks from a [`TaskSource`], writes accepted slots to
//! a [`PersistenceSink`] and asks a [`Clock`] for "now". Real adapters
//! (database, REST) live in the surrounding application;
//! [`InMemoryTaskStore`] covers tests and embedded use.

use chrono::{Local, NaiveDateTime};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use crate::error::{OptimizeError, PersistenceError, Result};
use crate::models::{ScheduleSlot, Task, TaskId};

/// Read-only access to the current tasks.
pub trait TaskSource {
    /// Returns a snapshot of the tasks to plan.
    ///
    /// # Errors
    /// [`OptimizeError::Source`] when the store cannot be read.
    fn snapshot(&self) -> Result<Vec<Task>>;
}

/// Write access for accepted slots.
pub trait PersistenceSink {
    /// Stores `planned_start`/`planned_end` for every slot.
    ///
    /// Implementations must be all-or-nothing: on error, no slot of the
    /// batch may have been applied.
    fn commit(&self, slots: &[ScheduleSlot]) -> std::result::Result<(), PersistenceError>;
}

/// Source of the current local time.
pub trait Clock {
    /// The current instant.
    fn now(&self) -> NaiveDateTime;
}

impl<T: TaskSource + ?Sized> TaskSource for &T {
    fn snapshot(&self) -> Result<Vec<Task>> {
        (**self).snapshot()
    }
}

impl<T: PersistenceSink + ?Sized> PersistenceSink for &T {
    fn commit(&self, slots: &[ScheduleSlot]) -> std::result::Result<(), PersistenceError> {
        (**self).commit(slots)
    }
}

impl<T: Clock + ?Sized> Clock for &T {
    fn now(&self) -> NaiveDateTime {
        (**self).now()
    }
}

/// Wall clock in the local time zone.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// A clock stuck at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock(pub NaiveDateTime);

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}

/// Task store kept in memory.
///
/// Commits are transactional: every slot is checked against the store
/// before any task is updated.
///
/// # Example
/// ```
/// use u_taskplan::models::{ScheduleSlot, Task};
/// use u_taskplan::ports::{InMemoryTaskStore, PersistenceSink, TaskSource};
/// use chrono::NaiveDate;
///
/// let store = InMemoryTaskStore::new(vec![Task::new(1)]);
/// let day = NaiveDate::from_ymd_opt(2024, 1, 8).unwrap();
/// let slot = ScheduleSlot::contiguous(
///     1,
///     day.and_hms_opt(9, 30, 0).unwrap(),
///     day.and_hms_opt(10, 30, 0).unwrap(),
/// );
/// store.commit(&[slot]).unwrap();
/// assert!(store.snapshot().unwrap()[0].planned_start.is_some());
/// ```
#[derive(Debug, Default)]
pub struct InMemoryTaskStore {
    tasks: Mutex<BTreeMap<TaskId, Task>>,
    reads: AtomicUsize,
    reject_commits: Option<String>,
}

impl InMemoryTaskStore {
    /// Creates a store holding `tasks` (later duplicates replace earlier ones).
    pub fn new(tasks: impl IntoIterator<Item = Task>) -> Self {
        Self {
            tasks: Mutex::new(tasks.into_iter().map(|t| (t.id, t)).collect()),
            reads: AtomicUsize::new(0),
            reject_commits: None,
        }
    }

    /// Makes every commit fail with [`PersistenceError::Rejected`].
    pub fn with_rejected_commits(mut self, message: impl Into<String>) -> Self {
        self.reject_commits = Some(message.into());
        self
    }

    /// Number of snapshots taken so far.
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// A copy of one task.
    pub fn get(&self, id: TaskId) -> Option<Task> {
        self.lock().ok()?.get(&id).cloned()
    }

    fn lock(&self) -> std::result::Result<MutexGuard<'_, BTreeMap<TaskId, Task>>, String> {
        self.tasks
            .lock()
            .map_err(|_| "task store lock poisoned".to_string())
    }
}

impl TaskSource for InMemoryTaskStore {
    fn snapshot(&self) -> Result<Vec<Task>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let tasks = self.lock().map_err(OptimizeError::Source)?;
        Ok(tasks.values().cloned().collect())
    }
}

impl PersistenceSink for InMemoryTaskStore {
    fn commit(&self, slots: &[ScheduleSlot]) -> std::result::Result<(), PersistenceError> {
        if let Some(message) = &self.reject_commits {
            return Err(PersistenceError::Rejected(message.clone()));
        }
        let mut tasks = self.lock().map_err(PersistenceError::Rejected)?;
        if let Some(missing) = slots.iter().find(|s| !tasks.contains_key(&s.task_id)) {
            return Err(PersistenceError::UnknownTask(missing.task_id));
        }
        for slot in slots {
            if let Some(task) = tasks.get_mut(&slot.task_id) {
                task.planned_start = Some(slot.start);
                task.planned_end = Some(slot.end);
            }
        }
        Ok(())
    }
}

//! Schedule optimization for personal task planning.
//!
//! Given a snapshot of tasks (estimates, deadlines, priorities,
//! dependencies) and a work capacity model (daily work window and hour
//! ceiling), computes a start/end slot for every task that can be placed,
//! reports the ones that cannot, and optionally writes the result back to
//! the task store.
//!
//! # Modules
//!
//! - **`models`**: Domain types: `Task`, `WorkCapacityModel`, `ScheduleSlot`,
//!   `Unschedulable`, `Quality`
//! - **`config`**: Run input and algorithm parameters
//! - **`validation`**: Snapshot integrity checks (duplicate IDs, ranges, dangling refs)
//! - **`graph`**: Dependency resolution (cycles, blocked tasks, earliest starts)
//! - **`workload`**: Hours already consumed per day
//! - **`dispatching`**: Task sorter as a composable rule engine
//! - **`scheduler`**: Shared placement primitive and the greedy, Monte Carlo
//!   and round-robin strategies
//! - **`ga`**: Genetic strategy over task orderings
//! - **`factory`**: Strategy selection by name
//! - **`ports`**: Task source, persistence sink and clock contracts
//! - **`optimizer`**: End-to-end runs
//!
//! # Usage
//!
//! ```
//! use u_taskplan::{optimize_tasks, OptimizeScheduleInput, Task};
//! use chrono::NaiveDate;
//!
//! let monday = NaiveDate::from_ymd_opt(2024, 1, 8).unwrap().and_hms_opt(9, 30, 0).unwrap();
//! let tasks = vec![
//!     Task::new(1).with_duration_hours(4.0),
//!     Task::new(2).with_duration_hours(4.0).with_dependency(1),
//! ];
//! let input = OptimizeScheduleInput::new().with_algorithm("greedy");
//! let result = optimize_tasks(&tasks, &input, monday).unwrap();
//! assert_eq!(result.scheduled_count(), 2);
//! ```
//!
//! # References
//!
//! - Pinedo (2016), "Scheduling: Theory, Algorithms, and Systems"
//! - Goldberg (1989), "Genetic Algorithms in Search, Optimization and Machine Learning"

pub mod config;
pub mod dispatching;
pub mod error;
pub mod factory;
pub mod ga;
pub mod graph;
pub mod models;
pub mod optimizer;
pub mod ports;
pub mod scheduler;
pub mod validation;
pub mod workload;

pub use config::{OptimizationParameters, OptimizeScheduleInput, WorkloadPolicy};
pub use error::{OptimizeError, PersistenceError, Result};
pub use factory::{Algorithm, StrategyFactory};
pub use models::{ScheduleSlot, Task, TaskId, TaskStatus, Unschedulable, UnschedulableReason};
pub use optimizer::{optimize_tasks, ScheduleOptimizer};
pub use scheduler::{CancellationToken, OptimizationResult, OptimizationStrategy};

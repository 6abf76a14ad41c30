//! tickq-core
//!
//! A bounded-retry task queue. A batch of fallible work is submitted once;
//! a ticker dispatches one pending task per tick onto its own tokio task,
//! failures go back to the end of the line until the retry limit is reached,
//! and `TaskQueue::run` returns once every task has succeeded or is exhausted.
//!
//! # Modules
//! - **domain**: ids, task, state, outcome
//! - **ports**: Clock, IdGenerator
//! - **queue**: PendingStore, CompletionTracker, RetryPolicy
//! - **scheduler**: tick loop and dispatch
//! - **app**: QueueConfig, QueueBuilder, TaskQueue
//!
//! ```ignore
//! use std::time::Duration;
//! use tickq_core::{TaskError, TaskQueue};
//!
//! let queue = TaskQueue::new(
//!     vec![|| async { Ok::<(), TaskError>(()) }],
//!     Duration::from_millis(10),
//!     3,
//! )?;
//! let report = queue.run().await?;
//! assert!(report.all_succeeded());
//! ```

pub mod app;
pub mod domain;
pub mod error;
pub mod observability;
pub mod ports;
pub mod queue;
mod scheduler;

pub use app::{QueueBuilder, QueueConfig, QueueMonitor, TaskQueue};
pub use domain::{Resolution, RunId, RunReport, TaskError, TaskId, TaskOutcome, TaskState, Work};
pub use error::QueueError;
pub use observability::QueueCounts;

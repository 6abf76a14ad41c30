//! Task state machine.

use serde::{Deserialize, Serialize};

/// Where a task currently is.
///
/// State transitions:
/// - Pending -> Running -> Succeeded
/// - Pending -> Running -> Pending (failure with retry budget left)
/// - Pending -> Running -> Exhausted (failure on the final permitted attempt)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    /// Waiting in the pending store.
    Pending,

    /// Dispatched, work in flight.
    Running,

    /// Work returned success.
    Succeeded,

    /// Failed with no attempts left.
    Exhausted,
}

use thiserror::Error;

use crate::domain::TaskId;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("duplicate task id {task_id} (positions {first} and {second})")]
    DuplicateTaskId {
        task_id: TaskId,
        first: usize,
        second: usize,
    },

    #[error("invalid queue config: {0}")]
    InvalidConfig(String),

    #[error("failed to build runtime: {0}")]
    Runtime(#[from] std::io::Error),

    #[error("scheduler stopped before every task was resolved")]
    SchedulerStopped,
}

//! Outcome model: how each task ended and what a whole run produced.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::{TaskId, TaskState};

/// Final result of one task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Resolution {
    Succeeded,

    /// The retry budget ran out; `reason` is the last failure message.
    Exhausted { reason: String },
}

impl Resolution {
    pub fn exhausted(reason: impl Into<String>) -> Self {
        Self::Exhausted {
            reason: reason.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Resolution::Succeeded)
    }

    pub fn state(&self) -> TaskState {
        match self {
            Resolution::Succeeded => TaskState::Succeeded,
            Resolution::Exhausted { .. } => TaskState::Exhausted,
        }
    }
}

/// Per-task line of a `RunReport`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskOutcome {
    pub task_id: TaskId,
    pub position: usize,
    pub attempts: u32,
    pub resolution: Resolution,
}

/// Everything `TaskQueue::run` learned, in submission order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunReport {
    pub outcomes: Vec<TaskOutcome>,
    #[serde(with = "duration_millis")]
    pub elapsed: Duration,
}

impl RunReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.resolution.is_success())
            .count()
    }

    pub fn exhausted(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    pub fn all_succeeded(&self) -> bool {
        self.exhausted() == 0
    }

    pub fn get(&self, task_id: TaskId) -> Option<&TaskOutcome> {
        self.outcomes.iter().find(|o| o.task_id == task_id)
    }
}

pub(crate) mod duration_millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis().try_into().unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}

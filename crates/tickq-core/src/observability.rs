use serde::{Deserialize, Serialize};

/// Point-in-time view of a queue.
///
/// `in_flight` is derived: tasks that are neither pending nor resolved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueCounts {
    pub pending: usize,
    pub in_flight: usize,
    pub succeeded: usize,
    pub exhausted: usize,
}

impl QueueCounts {
    pub fn resolved(&self) -> usize {
        self.succeeded + self.exhausted
    }
}

//! Retry policy: decides what happens after a failed attempt.

use crate::domain::TaskError;

/// The next action for a failed task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Put the task back in the pending store.
    Retry,

    /// Give up and resolve the task as exhausted.
    Exhaust { reason: String },
}

/// Inclusive retry limit: `retries` is the maximum number of attempts.
///
/// - attempt < retries: retry
/// - attempt >= retries: exhausted
///
/// With `retries == 0` the first failure is terminal; the task still runs once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    retries: u32,
}

impl RetryPolicy {
    pub fn new(retries: u32) -> Self {
        Self { retries }
    }

    pub fn retries(&self) -> u32 {
        self.retries
    }

    /// `attempt` is the count after the failed run started (1-indexed).
    pub fn decide(&self, attempt: u32, error: &TaskError) -> Decision {
        if attempt >= self.retries {
            Decision::Exhaust {
                reason: error.message().to_string(),
            }
        } else {
            Decision::Retry
        }
    }
}

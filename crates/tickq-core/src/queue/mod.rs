//! Queue module: pending store, completion tracker, and retry policy.

mod pending;
mod retry;
mod tracker;

pub use pending::PendingStore;
pub use retry::{Decision, RetryPolicy};
pub use tracker::CompletionTracker;

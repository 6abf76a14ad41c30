//! Task model: a unit of work and its attempt counter.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use super::TaskId;

/// Failure signal returned by a unit of work.
///
/// Only the message travels: it ends up in the exhaustion diagnostic and in
/// the run report.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct TaskError {
    message: String,
}

impl TaskError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Capture any error's `Display` output.
    pub fn from_error<E: std::error::Error + ?Sized>(err: &E) -> Self {
        Self::new(err.to_string())
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<String> for TaskError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<&str> for TaskError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

/// A zero-argument, fallible unit of work.
///
/// Any `Fn() -> impl Future<Output = Result<(), TaskError>>` closure is a `Work`,
/// so most callers never implement this by hand.
#[async_trait]
pub trait Work: Send + Sync {
    async fn run(&self) -> Result<(), TaskError>;
}

#[async_trait]
impl<F, Fut> Work for F
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), TaskError>> + Send + 'static,
{
    async fn run(&self) -> Result<(), TaskError> {
        (self)().await
    }
}

/// One retryable unit of work plus its attempt counter.
///
/// A `Task` is moved, never shared: it lives either in the pending store or in
/// exactly one in-flight dispatch, so `attempt` needs no lock of its own.
pub struct Task {
    id: TaskId,
    position: usize,
    work: Arc<dyn Work>,
    attempt: u32,
}

impl Task {
    pub fn new(id: TaskId, position: usize, work: Arc<dyn Work>) -> Self {
        Self {
            id,
            position,
            work,
            attempt: 0,
        }
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    /// 0-based submission index.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Executions started so far.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Called once per dispatch, before the work runs.
    pub fn start_attempt(&mut self) -> u32 {
        self.attempt += 1;
        self.attempt
    }

    pub fn work(&self) -> Arc<dyn Work> {
        Arc::clone(&self.work)
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.id)
            .field("position", &self.position)
            .field("attempt", &self.attempt)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use ulid::Ulid;

    #[tokio::test]
    async fn closures_are_work() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);
        let work = move || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(TaskError::new("nope"))
            }
        };

        let err = work.run().await.unwrap_err();
        assert_eq!(err.message(), "nope");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn start_attempt_counts_from_one() {
        let work: Arc<dyn Work> = Arc::new(|| async { Ok::<(), TaskError>(()) });
        let mut task = Task::new(TaskId::from_ulid(Ulid::new()), 0, work);

        assert_eq!(task.attempt(), 0);
        assert_eq!(task.start_attempt(), 1);
        assert_eq!(task.start_attempt(), 2);
        assert_eq!(task.attempt(), 2);
    }

    #[test]
    fn task_error_from_std_error() {
        let io = std::io::Error::other("disk on fire");
        assert_eq!(TaskError::from_error(&io).message(), "disk on fire");
    }
}

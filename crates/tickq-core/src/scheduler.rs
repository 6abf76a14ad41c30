//! Scheduler: the tick loop and per-task dispatch.
//!
//! Each tick pulls at most one task. Work runs on its own tokio task so the
//! ticker never waits for it; stopping is signalled on a channel that is
//! independent of the ticker.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{OwnedSemaphorePermit, Semaphore, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{Instrument, debug, warn};

use crate::domain::{Resolution, RunId, Task, TaskError, TaskId, Work};
use crate::error::QueueError;
use crate::queue::{CompletionTracker, Decision, PendingStore, RetryPolicy};

/// State shared by the tick loop and every in-flight dispatch.
///
/// The two stores have independent locks; nothing here is ever locked across
/// a call to `Work::run`.
pub(crate) struct Shared {
    pub(crate) run_id: RunId,
    pub(crate) pending: PendingStore,
    pub(crate) tracker: CompletionTracker,
    pub(crate) policy: RetryPolicy,
    /// Flipped to `true` by whichever dispatch resolves the last task.
    pub(crate) done_tx: watch::Sender<bool>,
}

impl Shared {
    pub(crate) fn new(
        run_id: RunId,
        pending: PendingStore,
        tracker: CompletionTracker,
        policy: RetryPolicy,
    ) -> Self {
        let (done_tx, _) = watch::channel(false);
        Self {
            run_id,
            pending,
            tracker,
            policy,
            done_tx,
        }
    }
}

/// Handle to a running tick loop.
/// - `request_shutdown` stops dequeuing; in-flight work is left alone.
/// - `wait_until_resolved` waits for the done signal or for the loop to die.
/// - `shutdown_and_join` waits for the loop itself to exit.
pub(crate) struct Scheduler {
    shutdown_tx: watch::Sender<bool>,
    /// `None` once the loop has been observed to exit.
    join: Option<JoinHandle<()>>,
}

impl Scheduler {
    /// `max_in_flight = None` keeps the unbounded fan-out.
    pub(crate) fn spawn(
        shared: Arc<Shared>,
        interval: Duration,
        max_in_flight: Option<usize>,
    ) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let limiter = max_in_flight.map(|n| Arc::new(Semaphore::new(n)));

        let join = tokio::spawn(tick_loop(shared, interval, limiter, shutdown_rx).in_current_span());

        Self {
            shutdown_tx,
            join: Some(join),
        }
    }

    pub(crate) fn request_shutdown(&self) {
        // receiver may already be gone if the loop exited
        let _ = self.shutdown_tx.send(true);
    }

    /// Resolves when every task is resolved, or fails with
    /// `SchedulerStopped` if the tick loop exits while work is still owed.
    pub(crate) async fn wait_until_resolved(&mut self, shared: &Shared) -> Result<(), QueueError> {
        // watch keeps the latest value, so subscribing late cannot miss `true`
        let mut done_rx = shared.done_tx.subscribe();

        tokio::select! {
            biased;
            done = done_rx.wait_for(|done| *done) => {
                done.map(|_| ()).map_err(|_| QueueError::SchedulerStopped)
            }
            _ = self.stopped() => {
                if shared.tracker.all_resolved().await {
                    Ok(())
                } else {
                    Err(QueueError::SchedulerStopped)
                }
            }
        }
    }

    /// Completes once the tick loop task has exited, for any reason.
    async fn stopped(&mut self) {
        if let Some(join) = self.join.as_mut() {
            if let Err(join_err) = join.await {
                warn!(error = %join_err, "tick loop aborted");
            }
            self.join = None;
        }
    }

    pub(crate) async fn shutdown_and_join(self) {
        self.request_shutdown();
        if let Some(join) = self.join {
            let _ = join.await;
        }
    }
}

async fn tick_loop(
    shared: Arc<Shared>,
    interval: Duration,
    limiter: Option<Arc<Semaphore>>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        if *shutdown_rx.borrow() {
            break;
        }

        tokio::select! {
            biased;
            changed = shutdown_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                // value is checked at the top of the loop
                continue;
            }
            _ = ticker.tick() => {}
        }

        // at capacity: skip this tick rather than wait for a permit
        let permit = match &limiter {
            Some(semaphore) => match Arc::clone(semaphore).try_acquire_owned() {
                Ok(permit) => Some(permit),
                Err(_) => continue,
            },
            None => None,
        };

        let Some(mut task) = shared.pending.dequeue_one().await else {
            continue;
        };

        let attempt = task.start_attempt();
        debug!(
            task_id = %task.id(),
            position = task.position(),
            attempt,
            retries = shared.policy.retries(),
            "dispatching task"
        );

        tokio::spawn(dispatch(Arc::clone(&shared), task, permit).in_current_span());
    }
}

/// Run one attempt and settle its result.
///
/// `_permit` is held until the attempt is settled.
async fn dispatch(shared: Arc<Shared>, task: Task, _permit: Option<OwnedSemaphorePermit>) {
    let task_id = task.id();
    let attempt = task.attempt();

    match run_guarded(task.work()).await {
        Ok(()) => {
            debug!(%task_id, attempt, "task succeeded");
            resolve(&shared, task_id, attempt, Resolution::Succeeded).await;
        }
        Err(error) => match shared.policy.decide(attempt, &error) {
            Decision::Retry => {
                debug!(%task_id, attempt, error = %error, "task failed, requeueing");
                shared.pending.requeue(task).await;
            }
            Decision::Exhaust { reason } => {
                warn!(
                    %task_id,
                    position = task.position(),
                    attempt,
                    retries = shared.policy.retries(),
                    error = %reason,
                    "task exhausted its retries"
                );
                resolve(&shared, task_id, attempt, Resolution::Exhausted { reason }).await;
            }
        },
    }
}

/// A panicking work future is reported as an ordinary failure.
async fn run_guarded(work: Arc<dyn Work>) -> Result<(), TaskError> {
    match tokio::spawn(async move { work.run().await }).await {
        Ok(result) => result,
        Err(join_err) => Err(TaskError::new(format!("work aborted: {join_err}"))),
    }
}

async fn resolve(shared: &Shared, task_id: TaskId, attempt: u32, resolution: Resolution) {
    if !shared.tracker.mark_resolved(task_id, attempt, resolution).await {
        return;
    }
    if shared.tracker.all_resolved().await {
        debug!(run_id = %shared.run_id, "all tasks resolved");
        shared.done_tx.send_replace(true);
    }
}

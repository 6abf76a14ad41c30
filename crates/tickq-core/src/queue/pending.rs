//! Pending store: FIFO of tasks waiting for a tick.

use std::collections::VecDeque;

use tokio::sync::Mutex;

use crate::domain::{Task, TaskId};

/// Tasks that are neither in flight nor resolved.
///
/// The lock is held only for the push/pop itself, never while work runs.
#[derive(Debug, Default)]
pub struct PendingStore {
    tasks: Mutex<VecDeque<Task>>,
}

impl PendingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store in submission order. Construction-time only, hence `&mut`.
    pub fn enqueue_all(&mut self, tasks: impl IntoIterator<Item = Task>) {
        self.tasks.get_mut().extend(tasks);
    }

    /// Remove the task at the front, if any.
    pub async fn dequeue_one(&self) -> Option<Task> {
        self.tasks.lock().await.pop_front()
    }

    /// Put a failed task back at the end of the line, attempt count intact.
    pub async fn requeue(&self, task: Task) {
        self.tasks.lock().await.push_back(task);
    }

    pub async fn contains(&self, task_id: TaskId) -> bool {
        self.tasks.lock().await.iter().any(|t| t.id() == task_id)
    }

    pub async fn len(&self) -> usize {
        self.tasks.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.tasks.lock().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{TaskError, TaskId, Work};
    use std::sync::Arc;
    use ulid::Ulid;

    fn task(position: usize) -> Task {
        let work: Arc<dyn Work> = Arc::new(|| async { Ok::<(), TaskError>(()) });
        Task::new(TaskId::from_ulid(Ulid::new()), position, work)
    }

    #[tokio::test]
    async fn dequeues_in_submission_order() {
        let mut store = PendingStore::new();
        store.enqueue_all((0..3).map(task));

        assert_eq!(store.dequeue_one().await.unwrap().position(), 0);
        assert_eq!(store.dequeue_one().await.unwrap().position(), 1);
        assert_eq!(store.dequeue_one().await.unwrap().position(), 2);
        assert!(store.dequeue_one().await.is_none());
    }

    #[tokio::test]
    async fn requeue_goes_to_the_back_and_keeps_attempts() {
        let mut store = PendingStore::new();
        store.enqueue_all((0..2).map(task));

        let mut first = store.dequeue_one().await.unwrap();
        first.start_attempt();
        store.requeue(first).await;

        assert_eq!(store.dequeue_one().await.unwrap().position(), 1);
        assert!(!store.is_empty().await);
        let again = store.dequeue_one().await.unwrap();
        assert_eq!(again.position(), 0);
        assert_eq!(again.attempt(), 1);
    }

    #[tokio::test]
    async fn concurrent_requeues_lose_nothing() {
        let store = Arc::new(PendingStore::new());

        let mut joins = Vec::new();
        for i in 0..32 {
            let store = Arc::clone(&store);
            joins.push(tokio::spawn(async move { store.requeue(task(i)).await }));
        }
        for j in joins {
            j.await.unwrap();
        }

        assert_eq!(store.len().await, 32);
        let mut drained = 0;
        while store.dequeue_one().await.is_some() {
            drained += 1;
        }
        assert_eq!(drained, 32);
        assert!(store.is_empty().await);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn drain_while_requeueing_yields_each_task_once() {
        const TASKS: usize = 200;
        let store = Arc::new(PendingStore::new());

        let producers: Vec<_> = (0..4)
            .map(|worker| {
                let store = Arc::clone(&store);
                tokio::spawn(async move {
                    for position in (worker..TASKS).step_by(4) {
                        store.requeue(task(position)).await;
                        tokio::task::yield_now().await;
                    }
                })
            })
            .collect();

        let mut seen = vec![0u32; TASKS];
        let drain = async {
            let mut drained = 0;
            while drained < TASKS {
                match store.dequeue_one().await {
                    Some(t) => {
                        seen[t.position()] += 1;
                        drained += 1;
                    }
                    None => tokio::task::yield_now().await,
                }
            }
        };
        tokio::time::timeout(std::time::Duration::from_secs(10), drain)
            .await
            .expect("drain never saw every task");

        for producer in producers {
            producer.await.unwrap();
        }
        assert!(seen.iter().all(|&n| n == 1), "positions seen: {seen:?}");
        assert!(store.is_empty().await);
    }
}

//! QueueBuilder - キューの構築とワイヤリング
//!
//! # Fail-fast 設計
//! - `build()` で設定値を検証する
//! - TaskId の重複は `build()` 時に `QueueError::DuplicateTaskId` で拒否する

use std::sync::Arc;
use std::time::Duration;

use super::{QueueConfig, TaskQueue};
use crate::domain::{Task, TaskId, Work};
use crate::error::QueueError;
use crate::ports::{IdGenerator, SystemClock, UlidGenerator};
use crate::queue::{CompletionTracker, PendingStore, RetryPolicy};
use crate::scheduler::Shared;

/// work と設定を集め、`build()` で二つのストアを一度に初期化する
///
/// # 使用例
/// ```ignore
/// let queue = QueueBuilder::new()
///     .interval(Duration::from_millis(5))
///     .retries(3)
///     .task(|| async { Ok(()) })
///     .build()?;
/// let report = queue.run().await?;
/// ```
pub struct QueueBuilder {
    config: QueueConfig,
    id_gen: Box<dyn IdGenerator>,
    works: Vec<(Option<TaskId>, Arc<dyn Work>)>,
}

impl QueueBuilder {
    pub fn new() -> Self {
        Self {
            config: QueueConfig::default(),
            id_gen: Box::new(UlidGenerator::new(SystemClock)),
            works: Vec::new(),
        }
    }

    /// 設定をまるごと差し替える
    pub fn config(mut self, config: QueueConfig) -> Self {
        self.config = config;
        self
    }

    pub fn interval(mut self, interval: Duration) -> Self {
        self.config.interval = interval;
        self
    }

    pub fn retries(mut self, retries: u32) -> Self {
        self.config.retries = retries;
        self
    }

    pub fn max_in_flight(mut self, max_in_flight: usize) -> Self {
        self.config.max_in_flight = Some(max_in_flight);
        self
    }

    /// 呼び出し側が ID を指定しないタスク用の生成器を差し替える
    pub fn id_generator(mut self, id_gen: impl IdGenerator + 'static) -> Self {
        self.id_gen = Box::new(id_gen);
        self
    }

    /// タスクを一つ追加する。ID は `build()` 時に生成
    pub fn task(mut self, work: impl Work + 'static) -> Self {
        self.works.push((None, Arc::new(work)));
        self
    }

    /// 呼び出し側が決めた ID でタスクを追加する
    pub fn task_with_id(mut self, task_id: TaskId, work: impl Work + 'static) -> Self {
        self.works.push((Some(task_id), Arc::new(work)));
        self
    }

    pub fn tasks<W>(mut self, works: impl IntoIterator<Item = W>) -> Self
    where
        W: Work + 'static,
    {
        self.works
            .extend(works.into_iter().map(|w| (None, Arc::new(w) as Arc<dyn Work>)));
        self
    }

    pub fn build(self) -> Result<TaskQueue, QueueError> {
        self.config.validate()?;

        let id_gen = self.id_gen;
        let tasks: Vec<Task> = self
            .works
            .into_iter()
            .enumerate()
            .map(|(position, (task_id, work))| {
                let task_id = task_id.unwrap_or_else(|| id_gen.generate_task_id());
                Task::new(task_id, position, work)
            })
            .collect();

        let task_ids: Vec<TaskId> = tasks.iter().map(Task::id).collect();
        let tracker = CompletionTracker::initialize(tasks.iter().map(|t| (t.id(), t.position())))?;
        let mut pending = PendingStore::new();
        pending.enqueue_all(tasks);

        let shared = Shared::new(
            id_gen.generate_run_id(),
            pending,
            tracker,
            RetryPolicy::new(self.config.retries),
        );

        Ok(TaskQueue::from_parts(Arc::new(shared), self.config, task_ids))
    }
}

impl Default for QueueBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TaskError;
    use crate::ports::FixedClock;
    use chrono::{TimeZone, Utc};
    use ulid::Ulid;

    async fn ok() -> Result<(), TaskError> {
        Ok(())
    }

    #[tokio::test]
    async fn build_seeds_both_stores() {
        let queue = QueueBuilder::new().task(ok).task(ok).task(ok).build().unwrap();

        assert_eq!(queue.task_ids().len(), 3);
        let counts = queue.counts().await;
        assert_eq!(counts.pending, 3);
        assert_eq!(counts.in_flight, 0);
        assert_eq!(counts.resolved(), 0);
    }

    #[test]
    fn build_rejects_duplicate_ids() {
        let id = TaskId::from_ulid(Ulid::new());
        let result = QueueBuilder::new()
            .task_with_id(id, ok)
            .task(ok)
            .task_with_id(id, ok)
            .build();

        assert!(matches!(
            result,
            Err(QueueError::DuplicateTaskId { task_id, first: 0, second: 2 }) if task_id == id
        ));
    }

    #[test]
    fn build_rejects_zero_interval() {
        let result = QueueBuilder::new().interval(Duration::ZERO).task(ok).build();
        assert!(matches!(result, Err(QueueError::InvalidConfig(_))));
    }

    #[test]
    fn caller_ids_are_kept_in_position() {
        let id = TaskId::from_ulid(Ulid::new());
        let queue = QueueBuilder::new().task(ok).task_with_id(id, ok).build().unwrap();

        assert_eq!(queue.task_ids()[1], id);
        assert_ne!(queue.task_ids()[0], id);
    }

    #[test]
    fn custom_generator_is_used() {
        let fixed_time = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let queue = QueueBuilder::new()
            .id_generator(UlidGenerator::new(FixedClock::new(fixed_time)))
            .tasks([ok, ok])
            .build()
            .unwrap();

        for id in queue.task_ids() {
            assert_eq!(id.as_ulid().timestamp_ms(), fixed_time.timestamp_millis() as u64);
        }
        assert_eq!(queue.run_id().as_ulid().timestamp_ms(), fixed_time.timestamp_millis() as u64);
    }
}

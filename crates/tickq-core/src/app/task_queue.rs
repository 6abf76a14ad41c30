//! TaskQueue - 一回きりのバッチ実行のファサード

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{Instrument, info, info_span};

use super::{QueueBuilder, QueueConfig};
use crate::domain::{RunId, RunReport, TaskId, TaskState, Work};
use crate::error::QueueError;
use crate::observability::QueueCounts;
use crate::scheduler::{Scheduler, Shared};

/// 一度の `run` で全タスクを解決まで進めるバッチ
///
/// `run` は self を消費する（1 バッチ 1 回）。
pub struct TaskQueue {
    shared: Arc<Shared>,
    config: QueueConfig,
    task_ids: Vec<TaskId>,
}

impl TaskQueue {
    /// 位置引数版のショートカット。ID は自動採番、同時実行数は無制限
    pub fn new<W>(
        works: impl IntoIterator<Item = W>,
        interval: Duration,
        retries: u32,
    ) -> Result<Self, QueueError>
    where
        W: Work + 'static,
    {
        QueueBuilder::new()
            .interval(interval)
            .retries(retries)
            .tasks(works)
            .build()
    }

    pub fn builder() -> QueueBuilder {
        QueueBuilder::new()
    }

    pub(crate) fn from_parts(shared: Arc<Shared>, config: QueueConfig, task_ids: Vec<TaskId>) -> Self {
        Self {
            shared,
            config,
            task_ids,
        }
    }

    /// 投入順の TaskId
    pub fn task_ids(&self) -> &[TaskId] {
        &self.task_ids
    }

    pub fn run_id(&self) -> RunId {
        self.shared.run_id
    }

    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    /// `run` の実行中も実行後も `counts()` に答え続けるハンドル
    pub fn monitor(&self) -> QueueMonitor {
        QueueMonitor {
            shared: Arc::clone(&self.shared),
        }
    }

    pub async fn counts(&self) -> QueueCounts {
        counts_of(&self.shared).await
    }

    /// 全タスクを最終状態まで進め、結果をレポートとして返す
    ///
    /// 空のバッチなら即座に返る。Exhausted なタスクがあってもエラーにはならない
    /// （レポートで確認する）。tick loop が途中で止まった場合は `SchedulerStopped`。
    pub async fn run(self) -> Result<RunReport, QueueError> {
        let started = Instant::now();
        let span = info_span!("run", run_id = %self.shared.run_id);

        async move {
            if self.shared.tracker.all_resolved().await {
                info!(tasks = 0, "nothing to run");
                return Ok(RunReport {
                    outcomes: Vec::new(),
                    elapsed: started.elapsed(),
                });
            }

            info!(
                tasks = self.task_ids.len(),
                interval_ms = self.config.interval.as_millis() as u64,
                retries = self.config.retries,
                max_in_flight = ?self.config.max_in_flight,
                "run started"
            );

            let mut scheduler = Scheduler::spawn(
                Arc::clone(&self.shared),
                self.config.interval,
                self.config.max_in_flight,
            );

            let waited = scheduler.wait_until_resolved(&self.shared).await;
            scheduler.shutdown_and_join().await;
            waited?;

            let report = RunReport {
                outcomes: self.shared.tracker.outcomes().await,
                elapsed: started.elapsed(),
            };
            info!(
                succeeded = report.succeeded(),
                exhausted = report.exhausted(),
                elapsed_ms = report.elapsed.as_millis() as u64,
                "run finished"
            );
            Ok(report)
        }
        .instrument(span)
        .await
    }

    /// 非 async なホスト向けの `run`。自前で multi-thread runtime を作るので、
    /// 別の tokio runtime の中からは呼ばないこと。
    pub fn run_blocking(self) -> Result<RunReport, QueueError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_time()
            .build()?;
        runtime.block_on(self.run())
    }
}

/// キューの進捗を読むだけのハンドル
#[derive(Clone)]
pub struct QueueMonitor {
    shared: Arc<Shared>,
}

impl QueueMonitor {
    pub async fn counts(&self) -> QueueCounts {
        counts_of(&self.shared).await
    }

    pub async fn is_finished(&self) -> bool {
        self.shared.tracker.all_resolved().await
    }

    /// タスク一つの現在の状態。このキューに無い ID なら `None`
    pub async fn state(&self, task_id: TaskId) -> Option<TaskState> {
        match self.shared.tracker.resolution(task_id).await? {
            Some(resolution) => Some(resolution.state()),
            None if self.shared.pending.contains(task_id).await => Some(TaskState::Pending),
            None => Some(TaskState::Running),
        }
    }
}

/// 二つのストアは別々のロックで読むので、`in_flight` は差分から求め、
/// 読み取りがずれても負にならないよう飽和させる。
async fn counts_of(shared: &Shared) -> QueueCounts {
    let pending = shared.pending.len().await;
    let (succeeded, exhausted) = shared.tracker.resolved_counts().await;
    let total = shared.tracker.len().await;
    let mut counts = QueueCounts {
        pending,
        in_flight: 0,
        succeeded,
        exhausted,
    };
    counts.in_flight = total.saturating_sub(counts.pending + counts.resolved());
    counts
}

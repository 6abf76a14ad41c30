//! App - アプリケーション層
//!
//! domain / queue / scheduler を組み合わせて公開 API を作る。
//!
//! # 主要コンポーネント
//! - **QueueConfig**: interval / retries / max_in_flight と検証
//! - **QueueBuilder**: タスクの登録と構築（Fail-fast）
//! - **TaskQueue**: `run` で全タスクの解決を待つファサード

pub mod builder;
pub mod config;
pub mod task_queue;

pub use self::builder::QueueBuilder;
pub use self::config::QueueConfig;
pub use self::task_queue::{QueueMonitor, TaskQueue};

//! QueueConfig - キューの設定値と起動時検証

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::outcome::duration_millis;
use crate::error::QueueError;

/// 一つのキューの tick 周期・リトライ上限・同時実行数の上限
///
/// シリアライズ時の interval は `interval_ms`:
/// ```json
/// { "interval_ms": 10, "retries": 3, "max_in_flight": null }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    #[serde(rename = "interval_ms", with = "duration_millis")]
    pub interval: Duration,

    /// タスクごとの最大試行回数（この回数ちょうどで打ち切り）
    pub retries: u32,

    /// `None` なら上限なし（dispatch ごとに tokio task を一つ）
    pub max_in_flight: Option<usize>,
}

impl QueueConfig {
    pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(10);
    pub const DEFAULT_RETRIES: u32 = 3;

    pub fn new(interval: Duration, retries: u32) -> Self {
        Self {
            interval,
            retries,
            max_in_flight: None,
        }
    }

    pub fn with_max_in_flight(mut self, max_in_flight: usize) -> Self {
        self.max_in_flight = Some(max_in_flight);
        self
    }

    /// Fail-fast 検証。`QueueBuilder::build` から呼ばれる
    pub fn validate(&self) -> Result<(), QueueError> {
        if self.interval.is_zero() {
            return Err(QueueError::InvalidConfig(
                "interval must be greater than zero".to_string(),
            ));
        }
        if self.max_in_flight == Some(0) {
            return Err(QueueError::InvalidConfig(
                "max_in_flight must be greater than zero when set".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self::new(Self::DEFAULT_INTERVAL, Self::DEFAULT_RETRIES)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(QueueConfig::default(), true)]
    #[case(QueueConfig::new(Duration::from_millis(1), 0), true)]
    #[case(QueueConfig::new(Duration::ZERO, 3), false)]
    #[case(QueueConfig::default().with_max_in_flight(4), true)]
    #[case(QueueConfig::default().with_max_in_flight(0), false)]
    fn validate(#[case] config: QueueConfig, #[case] ok: bool) {
        assert_eq!(config.validate().is_ok(), ok);
    }

    #[test]
    fn deserializes_with_defaults() {
        let config: QueueConfig = serde_json::from_str(r#"{ "retries": 5 }"#).unwrap();
        assert_eq!(config.retries, 5);
        assert_eq!(config.interval, QueueConfig::DEFAULT_INTERVAL);
        assert_eq!(config.max_in_flight, None);

        let config: QueueConfig =
            serde_json::from_str(r#"{ "interval_ms": 250, "max_in_flight": 8 }"#).unwrap();
        assert_eq!(config.interval, Duration::from_millis(250));
        assert_eq!(config.retries, QueueConfig::DEFAULT_RETRIES);
        assert_eq!(config.max_in_flight, Some(8));
    }

    #[test]
    fn invalid_config_message_names_the_field() {
        let err = QueueConfig::new(Duration::ZERO, 1).validate().unwrap_err();
        assert!(err.to_string().contains("interval"));
    }
}

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Timing policy of the query cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Data younger than this is served without any fetch.
    pub stale_time_ms: u64,
    /// Background refetch cadence for subscribed keys; `None` disables it.
    pub refetch_interval_ms: Option<u64>,
    /// Extra attempts after a failed fetch.
    pub retries: u32,
    pub retry_delay_ms: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            stale_time_ms: 5_000,
            refetch_interval_ms: Some(30_000),
            retries: 0,
            retry_delay_ms: 1_000,
        }
    }
}

impl CacheConfig {
    pub fn stale_time(&self) -> Duration {
        Duration::from_millis(self.stale_time_ms)
    }

    pub fn refetch_interval(&self) -> Option<Duration> {
        self.refetch_interval_ms
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

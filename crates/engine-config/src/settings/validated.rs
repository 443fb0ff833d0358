use engine_core::retry::RetryPolicy;
use std::time::Duration;

/// Immutable, validated settings for one job execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedSettings {
    /// Records per chunk; also the page size of the source cursor.
    pub chunk_size: usize,
    pub fetch_timeout: Option<Duration>,
    pub flush_timeout: Option<Duration>,
    pub heartbeat_interval: usize,
    pub retry: RetryPolicy,
}

impl ValidatedSettings {
    pub fn retries_enabled(&self) -> bool {
        self.retry.max_attempts > 1
    }
}

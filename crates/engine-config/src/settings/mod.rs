use serde::{Deserialize, Serialize};

pub mod error;
pub mod validated;
pub mod validator;

pub const DEFAULT_CHUNK_SIZE: i64 = 1000;
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_HEARTBEAT_INTERVAL: usize = 10;

/// Job settings as written in the configuration file, before validation.
///
/// `chunk_size` is signed so that zero and negative sizes survive parsing and
/// are rejected with a proper error instead of a deserialization failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobSettings {
    pub chunk_size: i64,
    /// Zero disables the timeout.
    pub fetch_timeout_ms: u64,
    /// Zero disables the timeout.
    pub flush_timeout_ms: u64,
    /// Emit a heartbeat every N committed chunks; zero disables heartbeats.
    pub heartbeat_interval: usize,
    pub retry: RetrySettings,
}

impl Default for JobSettings {
    fn default() -> Self {
        JobSettings {
            chunk_size: DEFAULT_CHUNK_SIZE,
            fetch_timeout_ms: DEFAULT_TIMEOUT_MS,
            flush_timeout_ms: DEFAULT_TIMEOUT_MS,
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
            retry: RetrySettings::default(),
        }
    }
}

impl JobSettings {
    pub fn with_chunk_size(mut self, chunk_size: i64) -> Self {
        self.chunk_size = chunk_size;
        self
    }
}

/// Chunk-level retry. One attempt means failures are not retried.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_attempts: usize,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        RetrySettings {
            max_attempts: 1,
            base_delay_ms: 200,
            max_delay_ms: 5_000,
        }
    }
}

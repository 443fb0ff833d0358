use crate::settings::{JobSettings, error::SettingsError, validated::ValidatedSettings};
use engine_core::retry::RetryPolicy;
use std::time::Duration;
use tracing::{info, warn};

const LARGE_CHUNK_WARNING: usize = 100_000;

/// Checks raw settings and turns them into [`ValidatedSettings`].
pub struct SettingsValidator;

impl SettingsValidator {
    pub fn validate(settings: &JobSettings) -> Result<ValidatedSettings, SettingsError> {
        let chunk_size = Self::validate_chunk_size(settings.chunk_size)?;
        let retry = Self::validate_retry(settings)?;

        let validated = ValidatedSettings {
            chunk_size,
            fetch_timeout: timeout(settings.fetch_timeout_ms),
            flush_timeout: timeout(settings.flush_timeout_ms),
            heartbeat_interval: settings.heartbeat_interval,
            retry,
        };

        info!(
            chunk_size = validated.chunk_size,
            retry_attempts = validated.retry.max_attempts,
            "Settings validated"
        );
        Ok(validated)
    }

    fn validate_chunk_size(chunk_size: i64) -> Result<usize, SettingsError> {
        if chunk_size <= 0 {
            return Err(SettingsError::InvalidChunkSize(chunk_size));
        }
        let size = usize::try_from(chunk_size)
            .map_err(|_| SettingsError::InvalidChunkSize(chunk_size))?;
        if size > LARGE_CHUNK_WARNING {
            warn!(chunk_size = size, "Chunk size is very large, may cause memory issues");
        }
        Ok(size)
    }

    fn validate_retry(settings: &JobSettings) -> Result<RetryPolicy, SettingsError> {
        let retry = &settings.retry;
        if retry.max_attempts == 0 {
            return Err(SettingsError::InvalidRetry(
                "max_attempts must be at least 1".into(),
            ));
        }
        if retry.max_delay_ms != 0 && retry.max_delay_ms < retry.base_delay_ms {
            return Err(SettingsError::InvalidRetry(format!(
                "max_delay_ms ({}) is below base_delay_ms ({})",
                retry.max_delay_ms, retry.base_delay_ms
            )));
        }

        if retry.max_attempts == 1 {
            return Ok(RetryPolicy::none());
        }
        Ok(RetryPolicy::new(
            retry.max_attempts,
            Duration::from_millis(retry.base_delay_ms),
            Duration::from_millis(retry.max_delay_ms),
        ))
    }
}

fn timeout(ms: u64) -> Option<Duration> {
    (ms > 0).then(|| Duration::from_millis(ms))
}

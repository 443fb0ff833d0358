use crate::{
    error::SinkError,
    retry::{RetryDisposition, RetryError, RetryPolicy},
};
use connectors::sql::base::destination::HistoryWriter;
use model::entities::history::StoreHistory;
use std::{sync::Arc, time::Duration};
use tokio::time::{Instant, timeout};
use tracing::{debug, warn};

/// Buffers history rows for the current chunk and commits them as one unit.
pub struct BulkSink {
    writer: Arc<dyn HistoryWriter>,
    buffer: Vec<StoreHistory>,
    flush_timeout: Option<Duration>,
}

impl BulkSink {
    pub fn new(writer: Arc<dyn HistoryWriter>) -> Self {
        Self {
            writer,
            buffer: Vec::new(),
            flush_timeout: None,
        }
    }

    pub fn with_timeout(mut self, flush_timeout: Duration) -> Self {
        self.flush_timeout = Some(flush_timeout);
        self
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.buffer.reserve(capacity);
        self
    }

    pub fn add(&mut self, record: StoreHistory) {
        self.buffer.push(record);
    }

    pub fn pending(&self) -> &[StoreHistory] {
        &self.buffer
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Drops whatever is pending without writing it.
    pub fn discard(&mut self) -> usize {
        let dropped = self.buffer.len();
        self.buffer.clear();
        dropped
    }

    /// Persists the whole buffer atomically and returns the number of rows
    /// written. On error the buffer is kept as it was.
    pub async fn flush(&mut self) -> Result<usize, SinkError> {
        let written = self.write_pending().await?;
        self.buffer.clear();
        Ok(written)
    }

    /// Like [`BulkSink::flush`], re-submitting the same buffer while the
    /// policy allows it.
    pub async fn flush_with_retry<C, R>(
        &mut self,
        policy: &RetryPolicy,
        classify: C,
        on_retry: R,
    ) -> Result<usize, SinkError>
    where
        C: Fn(&SinkError) -> RetryDisposition,
        R: FnMut(usize, &SinkError),
    {
        let this = &*self;
        let written = policy
            .run(|| this.write_pending(), classify, on_retry)
            .await
            .map_err(RetryError::into_inner)?;
        self.buffer.clear();
        Ok(written)
    }

    async fn write_pending(&self) -> Result<usize, SinkError> {
        if self.buffer.is_empty() {
            return Ok(0);
        }

        let count = self.buffer.len();
        let started = Instant::now();
        let write = self.writer.insert_all(&self.buffer);
        let outcome = match self.flush_timeout {
            Some(limit) => match timeout(limit, write).await {
                Ok(res) => res,
                Err(_) => {
                    warn!(rows = count, writer = self.writer.name(), "Flush timed out");
                    return Err(SinkError::Timeout {
                        count,
                        elapsed_ms: started.elapsed().as_millis(),
                    });
                }
            },
            None => write.await,
        };

        match outcome {
            Ok(ids) => {
                debug!(
                    rows = count,
                    first_id = ids.first().copied(),
                    duration_ms = started.elapsed().as_millis(),
                    "Flushed chunk"
                );
                Ok(count)
            }
            Err(source) => Err(SinkError::WriteFailed { count, source }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use connectors::{
        memory::{InjectedFailure, MemoryStore},
        sql::base::error::DbError,
    };

    #[tokio::test]
    async fn failed_flush_keeps_the_buffer() {
        let store = MemoryStore::new();
        store.fail_write_call(1, InjectedFailure::Fatal).await;
        let mut sink = BulkSink::new(Arc::new(store.clone()));

        sink.add(StoreHistory::new("s1", "p1, p2", "e1"));
        sink.add(StoreHistory::new("s3", "p5, p6", "e3"));

        let err = sink.flush().await.unwrap_err();
        assert_eq!(err.count(), 2);
        assert_eq!(sink.len(), 2);
        assert!(store.history().await.is_empty());

        assert_eq!(sink.flush().await.unwrap(), 2);
        assert!(sink.is_empty());
        assert_eq!(store.history().await.len(), 2);
    }

    #[tokio::test]
    async fn empty_flush_does_no_io() {
        let store = MemoryStore::new();
        let mut sink = BulkSink::new(Arc::new(store.clone()));
        assert_eq!(sink.flush().await.unwrap(), 0);
        assert_eq!(store.write_calls().await, 0);
    }

    struct Stalled;

    #[async_trait]
    impl HistoryWriter for Stalled {
        async fn insert_all(&self, _rows: &[StoreHistory]) -> Result<Vec<i64>, DbError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(Vec::new())
        }

        fn name(&self) -> &str {
            "stalled"
        }
    }

    #[tokio::test]
    async fn slow_writer_times_out() {
        let mut sink = BulkSink::new(Arc::new(Stalled)).with_timeout(Duration::from_millis(50));
        sink.add(StoreHistory::new("s1", "", ""));

        let err = sink.flush().await.unwrap_err();
        assert!(matches!(err, SinkError::Timeout { count: 1, .. }));
        assert_eq!(sink.len(), 1);
    }

    #[tokio::test]
    async fn retry_resubmits_the_same_rows() {
        let store = MemoryStore::new();
        store.fail_write_call(1, InjectedFailure::Transient).await;
        let mut sink = BulkSink::new(Arc::new(store.clone()));
        sink.add(StoreHistory::new("s1", "p1", "e1"));

        let policy = RetryPolicy::new(2, Duration::ZERO, Duration::ZERO);
        let mut retries = 0;
        let written = sink
            .flush_with_retry(&policy, |_| RetryDisposition::Retry, |_, _| retries += 1)
            .await
            .unwrap();

        assert_eq!(written, 1);
        assert_eq!(retries, 1);
        assert_eq!(store.history().await.len(), 1);
        assert_eq!(store.write_calls().await, 2);
    }
}

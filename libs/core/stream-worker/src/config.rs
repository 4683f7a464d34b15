//! Worker configuration
//!
//! This module provides `WorkerConfig` for configuring the worker pool and
//! the reclaimer.

use crate::registry::StreamDef;

/// Configuration for the worker pool and reclaimer
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Redis stream name
    pub stream_name: String,

    /// Consumer group name
    pub consumer_group: String,

    /// Prefix for consumer names
    pub consumer_prefix: String,

    /// Worker id partitioning consumer names across process replicas
    pub worker_id: u32,

    /// Number of consumer tasks in the pool
    pub concurrency: usize,

    /// Entries requested per group read
    pub once_read_count: usize,

    /// XREADGROUP BLOCK timeout in milliseconds
    pub blocking_timeout_ms: u64,

    /// Minimum idle time before a pending entry becomes claimable
    pub visibility_timeout_ms: u64,

    /// Reclaimer tick period in milliseconds
    pub reclaim_interval_ms: u64,

    /// Delivery-count cap before an entry is force-acknowledged as poison
    pub reclaim_max_retry_count: u64,

    /// Maximum stream length for approximate trimming
    pub max_length: i64,
}

impl WorkerConfig {
    /// Create a new WorkerConfig from a StreamDef
    pub fn from_stream_def<S: StreamDef>() -> Self {
        Self {
            stream_name: S::STREAM_NAME.to_string(),
            consumer_group: S::CONSUMER_GROUP.to_string(),
            consumer_prefix: S::CONSUMER_PREFIX.to_string(),
            worker_id: 0,
            concurrency: 5,
            once_read_count: S::ONCE_READ_COUNT,
            blocking_timeout_ms: S::BLOCKING_TIMEOUT_MS,
            visibility_timeout_ms: S::VISIBILITY_TIMEOUT_MS,
            reclaim_interval_ms: S::RECLAIM_INTERVAL_MS,
            reclaim_max_retry_count: S::RECLAIM_MAX_RETRY_COUNT,
            max_length: S::MAX_LENGTH,
        }
    }

    /// Create a new WorkerConfig with explicit values
    pub fn new(stream_name: impl Into<String>, consumer_group: impl Into<String>) -> Self {
        Self {
            stream_name: stream_name.into(),
            consumer_group: consumer_group.into(),
            consumer_prefix: "consumer".to_string(),
            worker_id: 0,
            concurrency: 5,
            once_read_count: 10,
            blocking_timeout_ms: 2_000,
            visibility_timeout_ms: 30_000,
            reclaim_interval_ms: 1_000,
            reclaim_max_retry_count: 5,
            max_length: 10_000,
        }
    }

    /// Stable name for the i-th consumer of this worker.
    pub fn consumer_name(&self, index: usize) -> String {
        format!("{}_{}_{}", self.consumer_prefix, self.worker_id, index)
    }

    /// Set the worker id
    pub fn with_worker_id(mut self, worker_id: u32) -> Self {
        self.worker_id = worker_id;
        self
    }

    /// Set the number of consumer tasks
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Set the per-read entry count
    pub fn with_once_read_count(mut self, count: usize) -> Self {
        self.once_read_count = count.max(1);
        self
    }

    /// Set the blocking read timeout
    pub fn with_blocking_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.blocking_timeout_ms = timeout_ms;
        self
    }

    /// Set the visibility timeout for pending entries
    pub fn with_visibility_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.visibility_timeout_ms = timeout_ms;
        self
    }

    /// Set the reclaimer tick period
    pub fn with_reclaim_interval_ms(mut self, interval_ms: u64) -> Self {
        self.reclaim_interval_ms = interval_ms;
        self
    }

    /// Set the poison delivery-count cap
    pub fn with_reclaim_max_retry_count(mut self, count: u64) -> Self {
        self.reclaim_max_retry_count = count;
        self
    }

    /// Set the maximum stream length
    pub fn with_max_length(mut self, max_length: i64) -> Self {
        self.max_length = max_length;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct TestStream;

    impl StreamDef for TestStream {
        const STREAM_NAME: &'static str = "test:stream";
        const CONSUMER_GROUP: &'static str = "test_group";
        const CONSUMER_PREFIX: &'static str = "test_consumer";
    }

    #[test]
    fn test_from_stream_def() {
        let config = WorkerConfig::from_stream_def::<TestStream>();

        assert_eq!(config.stream_name, "test:stream");
        assert_eq!(config.consumer_group, "test_group");
        assert_eq!(config.max_length, 10_000);
        assert_eq!(config.blocking_timeout_ms, 2_000);
    }

    #[test]
    fn test_consumer_name_partitioning() {
        let config = WorkerConfig::from_stream_def::<TestStream>().with_worker_id(3);

        assert_eq!(config.consumer_name(0), "test_consumer_3_0");
        assert_eq!(config.consumer_name(4), "test_consumer_3_4");
    }

    #[test]
    fn test_builder_pattern() {
        let config = WorkerConfig::new("my:stream", "my_group")
            .with_worker_id(1)
            .with_concurrency(8)
            .with_once_read_count(20)
            .with_visibility_timeout_ms(10_000)
            .with_reclaim_max_retry_count(3);

        assert_eq!(config.worker_id, 1);
        assert_eq!(config.concurrency, 8);
        assert_eq!(config.once_read_count, 20);
        assert_eq!(config.visibility_timeout_ms, 10_000);
        assert_eq!(config.reclaim_max_retry_count, 3);
    }

    #[test]
    fn test_concurrency_floor() {
        let config = WorkerConfig::new("my:stream", "my_group").with_concurrency(0);
        assert_eq!(config.concurrency, 1);
    }
}

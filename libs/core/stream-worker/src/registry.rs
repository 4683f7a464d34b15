//! Stream configuration (type-safe constants)
//!
//! Implement `StreamDef` to define a stream's Redis keys and queue settings
//! in one place; `WorkerConfig::from_stream_def` and
//! `StreamProducer::from_stream_def` read from it.

/// Stream configuration (type-safe constants)
///
/// # Example
///
/// ```ignore
/// struct PushMessageStream;
///
/// impl StreamDef for PushMessageStream {
///     const STREAM_NAME: &'static str = "push_message_stream";
///     const CONSUMER_GROUP: &'static str = "push_message_group";
///     const CONSUMER_PREFIX: &'static str = "push_message_consumer";
/// }
/// ```
pub trait StreamDef {
    /// The Redis stream name.
    const STREAM_NAME: &'static str;

    /// The consumer group name.
    const CONSUMER_GROUP: &'static str;

    /// Prefix for consumer names; workers append `_<worker_id>_<index>`.
    const CONSUMER_PREFIX: &'static str;

    /// Maximum stream length before approximate trimming (default: 10,000).
    const MAX_LENGTH: i64 = 10_000;

    /// Entries requested per group read (default: 10).
    const ONCE_READ_COUNT: usize = 10;

    /// XREADGROUP BLOCK timeout in milliseconds (default: 2,000).
    const BLOCKING_TIMEOUT_MS: u64 = 2_000;

    /// Minimum idle time before a pending entry becomes claimable (default: 30,000).
    const VISIBILITY_TIMEOUT_MS: u64 = 30_000;

    /// Reclaimer tick period in milliseconds (default: 1,000).
    const RECLAIM_INTERVAL_MS: u64 = 1_000;

    /// Delivery-count cap; entries past it are force-acknowledged (default: 5).
    const RECLAIM_MAX_RETRY_COUNT: u64 = 5;
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
    fn test_stream_def_defaults() {
        assert_eq!(TestStream::STREAM_NAME, "test:stream");
        assert_eq!(TestStream::CONSUMER_GROUP, "test_group");
        assert_eq!(TestStream::MAX_LENGTH, 10_000);
        assert_eq!(TestStream::ONCE_READ_COUNT, 10);
        assert_eq!(TestStream::VISIBILITY_TIMEOUT_MS, 30_000);
        assert_eq!(TestStream::RECLAIM_MAX_RETRY_COUNT, 5);
    }
}

//! Stream definitions for the push domain.

use stream_worker::StreamDef;

/// Push delivery jobs stream definition.
///
/// Consumed by the worker pool in `push-worker`.
pub struct PushMessageStream;

impl StreamDef for PushMessageStream {
    /// Stream name for per-device push jobs.
    const STREAM_NAME: &'static str = "push_message_stream";

    /// Consumer group for push workers.
    const CONSUMER_GROUP: &'static str = "push_message_group";

    /// Consumer name prefix; full names are
    /// `push_message_consumer_<worker_id>_<i>`.
    const CONSUMER_PREFIX: &'static str = "push_message_consumer";

    /// Approximate stream cap (10k entries).
    const MAX_LENGTH: i64 = 10_000;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_stream_def() {
        assert_eq!(PushMessageStream::STREAM_NAME, "push_message_stream");
        assert_eq!(PushMessageStream::CONSUMER_GROUP, "push_message_group");
        assert_eq!(PushMessageStream::CONSUMER_PREFIX, "push_message_consumer");
        assert_eq!(PushMessageStream::MAX_LENGTH, 10_000);
    }
}

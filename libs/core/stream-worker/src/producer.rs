//! Redis stream producer for enqueueing jobs.
//!
//! Appends flat field maps to the stream with approximate MAXLEN trimming.

use crate::error::StreamError;
use crate::registry::StreamDef;
use redis::aio::ConnectionManager;
use std::sync::Arc;
use tracing::debug;

/// Redis stream producer.
///
/// Used by the HTTP layer to append per-device jobs for background
/// dispatch by the worker pool.
///
/// # Example
///
/// ```rust,ignore
/// let producer = StreamProducer::from_stream_def::<PushMessageStream>(redis);
/// let entry_id = producer.append(&codec::encode(&job)).await?;
/// ```
pub struct StreamProducer {
    redis: Arc<ConnectionManager>,
    stream_name: String,
    max_length: Option<i64>,
}

impl StreamProducer {
    /// Create a new producer for the given stream.
    pub fn new(redis: ConnectionManager, stream_name: impl Into<String>) -> Self {
        Self {
            redis: Arc::new(redis),
            stream_name: stream_name.into(),
            max_length: None,
        }
    }

    /// Create a producer from a `StreamDef` implementation.
    pub fn from_stream_def<S: StreamDef>(redis: ConnectionManager) -> Self {
        Self {
            redis: Arc::new(redis),
            stream_name: S::STREAM_NAME.to_string(),
            max_length: Some(S::MAX_LENGTH),
        }
    }

    /// Set the maximum stream length (MAXLEN ~).
    pub fn with_max_length(mut self, max_length: i64) -> Self {
        self.max_length = Some(max_length);
        self
    }

    /// Get the stream name.
    pub fn stream_name(&self) -> &str {
        &self.stream_name
    }

    /// Append an entry with a server-assigned id.
    ///
    /// Returns the entry id assigned by Redis.
    pub async fn append(&self, fields: &[(String, String)]) -> Result<String, StreamError> {
        let mut conn = (*self.redis).clone();

        let mut cmd = self.xadd_cmd();
        for (key, value) in fields {
            cmd.arg(key).arg(value);
        }

        let entry_id: String = cmd.query_async(&mut conn).await?;

        debug!(
            stream = %self.stream_name,
            entry_id = %entry_id,
            "Appended entry to stream"
        );

        Ok(entry_id)
    }

    /// Append multiple entries in a pipeline for efficiency.
    pub async fn append_batch(
        &self,
        entries: &[Vec<(String, String)>],
    ) -> Result<Vec<String>, StreamError> {
        if entries.is_empty() {
            return Ok(vec![]);
        }

        let mut conn = (*self.redis).clone();
        let mut pipe = redis::pipe();

        for fields in entries {
            let mut cmd = self.xadd_cmd();
            for (key, value) in fields {
                cmd.arg(key).arg(value);
            }
            pipe.add_command(cmd);
        }

        let entry_ids: Vec<String> = pipe.query_async(&mut conn).await?;

        debug!(
            stream = %self.stream_name,
            count = entry_ids.len(),
            "Appended batch of entries to stream"
        );

        Ok(entry_ids)
    }

    /// Get the current length of the stream.
    pub async fn stream_length(&self) -> Result<usize, StreamError> {
        let mut conn = (*self.redis).clone();

        let length: usize = redis::cmd("XLEN")
            .arg(&self.stream_name)
            .query_async(&mut conn)
            .await?;

        Ok(length)
    }

    /// XADD prelude with approximate trimming when a cap is configured.
    fn xadd_cmd(&self) -> redis::Cmd {
        let mut cmd = redis::cmd("XADD");
        cmd.arg(&self.stream_name);
        if let Some(max_len) = self.max_length {
            cmd.arg("MAXLEN").arg("~").arg(max_len);
        }
        cmd.arg("*");
        cmd
    }
}

impl Clone for StreamProducer {
    fn clone(&self) -> Self {
        Self {
            redis: Arc::clone(&self.redis),
            stream_name: self.stream_name.clone(),
            max_length: self.max_length,
        }
    }
}

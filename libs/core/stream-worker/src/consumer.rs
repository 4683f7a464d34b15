//! Redis stream consumer primitives.
//!
//! `StreamConsumer` wraps every group-scoped stream operation the worker
//! pool and the reclaimer need:
//! - consumer group creation
//! - group reads (backlog and new entries)
//! - acknowledgement and deletion
//! - pending-list inspection and claiming

use crate::config::WorkerConfig;
use crate::entry::{ConsumerInfo, PendingEntry, StreamEntry};
use crate::error::StreamError;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use redis::streams::{
    StreamClaimReply, StreamInfoConsumersReply, StreamPendingCountReply, StreamReadOptions,
    StreamReadReply,
};
use std::sync::Arc;
use tracing::{debug, info};

/// Group-scoped stream operations over one shared connection manager.
#[derive(Clone)]
pub struct StreamConsumer {
    redis: Arc<ConnectionManager>,
    config: WorkerConfig,
}

impl StreamConsumer {
    pub fn new(redis: ConnectionManager, config: WorkerConfig) -> Self {
        Self {
            redis: Arc::new(redis),
            config,
        }
    }

    /// Working copy of the connection manager for one command sequence.
    fn conn(&self) -> ConnectionManager {
        (*self.redis).clone()
    }

    /// Owned handle to the underlying connection manager.
    pub fn manager(&self) -> ConnectionManager {
        self.conn()
    }

    pub fn stream_name(&self) -> &str {
        &self.config.stream_name
    }

    pub fn group_name(&self) -> &str {
        &self.config.consumer_group
    }

    /// Create the consumer group, and the stream itself via MKSTREAM, if
    /// either is missing.
    ///
    /// The group cursor starts at `$`, so only entries appended after the
    /// group exists are ever delivered. Losing the creation race to another
    /// process (BUSYGROUP) leaves the group in exactly the state we want.
    pub async fn ensure_consumer_group(&self) -> Result<(), StreamError> {
        let mut conn = self.conn();

        let created: Result<(), redis::RedisError> = redis::cmd("XGROUP")
            .arg("CREATE")
            .arg(&self.config.stream_name)
            .arg(&self.config.consumer_group)
            .arg("$")
            .arg("MKSTREAM")
            .query_async(&mut conn)
            .await;

        match created {
            Ok(()) => {
                info!(
                    stream = %self.config.stream_name,
                    group = %self.config.consumer_group,
                    "Consumer group created"
                );
                Ok(())
            }
            Err(e) if is_busygroup(&e) => {
                debug!(group = %self.config.consumer_group, "Consumer group was already present");
                Ok(())
            }
            Err(e) => Err(StreamError::ConsumerGroup(e.to_string())),
        }
    }

    /// Issue a group read for the given consumer.
    ///
    /// `cursor` selects what is read: `"0-0"` returns the consumer's own
    /// pending entries (backlog after a restart), `">"` returns undelivered
    /// entries and adds them to the consumer's pending set.
    pub async fn read_group(
        &self,
        consumer: &str,
        cursor: &str,
    ) -> Result<Vec<StreamEntry>, StreamError> {
        let mut conn = self.conn();

        let opts = StreamReadOptions::default()
            .group(&self.config.consumer_group, consumer)
            .count(self.config.once_read_count)
            .block(self.config.blocking_timeout_ms as usize);

        let result: Result<StreamReadReply, _> = conn
            .xread_options(&[&self.config.stream_name], &[cursor], &opts)
            .await;

        match result {
            Ok(reply) => {
                let mut entries = Vec::new();
                for stream_key in reply.keys {
                    for message in stream_key.ids {
                        entries.push(StreamEntry::from_stream_id(&message));
                    }
                }
                Ok(entries)
            }
            Err(e) => {
                // BLOCK timeout returns nil; several response shapes surface it
                let err_str = e.to_string().to_lowercase();
                if err_str.contains("timeout")
                    || err_str.contains("timed out")
                    || err_str.contains("nil")
                    || (err_str.contains("response") && err_str.contains("type"))
                {
                    Ok(vec![])
                } else {
                    Err(StreamError::Redis(e))
                }
            }
        }
    }

    /// Acknowledge an entry, removing it from the owner's pending set.
    pub async fn ack(&self, entry_id: &str) -> Result<(), StreamError> {
        let mut conn = self.conn();

        let _: () = conn
            .xack(
                &self.config.stream_name,
                &self.config.consumer_group,
                &[entry_id],
            )
            .await?;

        debug!(entry_id = %entry_id, "Acknowledged entry");
        Ok(())
    }

    /// Acknowledge and delete an entry (terminal removal from the stream).
    pub async fn remove(&self, entry_id: &str) -> Result<(), StreamError> {
        self.ack(entry_id).await?;

        let mut conn = self.conn();
        let deleted: i64 = conn.xdel(&self.config.stream_name, &[entry_id]).await?;

        debug!(entry_id = %entry_id, deleted = %deleted, "Deleted entry from stream");
        Ok(())
    }

    /// Fetch up to `count` pending entries for the whole group (range `- +`).
    pub async fn pending(&self, count: usize) -> Result<Vec<PendingEntry>, StreamError> {
        let mut conn = self.conn();

        let reply: StreamPendingCountReply = conn
            .xpending_count(
                &self.config.stream_name,
                &self.config.consumer_group,
                "-",
                "+",
                count,
            )
            .await?;

        Ok(reply
            .ids
            .into_iter()
            .map(|p| PendingEntry {
                id: p.id,
                consumer: p.consumer,
                idle_ms: p.last_delivered_ms as u64,
                delivery_count: p.times_delivered as u64,
            })
            .collect())
    }

    /// List the group's registered consumers with their pending counts.
    pub async fn consumers(&self) -> Result<Vec<ConsumerInfo>, StreamError> {
        let mut conn = self.conn();

        let reply: StreamInfoConsumersReply = conn
            .xinfo_consumers(&self.config.stream_name, &self.config.consumer_group)
            .await?;

        Ok(reply
            .consumers
            .into_iter()
            .map(|c| ConsumerInfo {
                name: c.name,
                pending: c.pending as u64,
            })
            .collect())
    }

    /// Claim a pending entry for `consumer` if it has been idle at least
    /// `min_idle_ms`.
    ///
    /// Returns `true` when ownership transferred. Returns `false` when the
    /// entry no longer exists in the stream (deleted underneath the pending
    /// list) - the caller should ack it to strip the dangling reference.
    pub async fn claim(
        &self,
        consumer: &str,
        entry_id: &str,
        min_idle_ms: u64,
    ) -> Result<bool, StreamError> {
        let mut conn = self.conn();

        let reply: StreamClaimReply = conn
            .xclaim(
                &self.config.stream_name,
                &self.config.consumer_group,
                consumer,
                min_idle_ms as usize,
                &[entry_id],
            )
            .await?;

        Ok(!reply.ids.is_empty())
    }

    /// Get stream information for monitoring.
    pub async fn stream_info(&self) -> Result<StreamInfo, StreamError> {
        let mut conn = self.conn();

        let result: Result<redis::streams::StreamInfoStreamReply, _> = redis::cmd("XINFO")
            .arg("STREAM")
            .arg(&self.config.stream_name)
            .query_async(&mut conn)
            .await;

        match result {
            Ok(info) => Ok(StreamInfo {
                stream_name: self.config.stream_name.clone(),
                length: info.length,
                first_entry_id: Some(info.first_entry.id.clone()),
                last_entry_id: Some(info.last_entry.id.clone()),
                groups: info.groups,
            }),
            Err(e) if e.to_string().contains("no such key") => {
                // Stream doesn't exist yet
                Ok(StreamInfo {
                    stream_name: self.config.stream_name.clone(),
                    length: 0,
                    first_entry_id: None,
                    last_entry_id: None,
                    groups: 0,
                })
            }
            Err(e) => Err(StreamError::Redis(e)),
        }
    }
}

/// BUSYGROUP is XGROUP CREATE's way of saying the group already exists.
fn is_busygroup(e: &redis::RedisError) -> bool {
    e.to_string().contains("BUSYGROUP")
}

/// Stream information for monitoring.
#[derive(Debug, Clone)]
pub struct StreamInfo {
    /// Stream name.
    pub stream_name: String,
    /// Number of entries in the stream.
    pub length: usize,
    /// ID of the first entry.
    pub first_entry_id: Option<String>,
    /// ID of the last entry.
    pub last_entry_id: Option<String>,
    /// Number of consumer groups.
    pub groups: usize,
}

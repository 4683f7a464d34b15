//! Stream entry and pending-list types
//!
//! `StreamEntry` is the raw record handed to a dispatcher; `PendingEntry`
//! and `ConsumerInfo` are what the reclaimer reasons about.

use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// A raw entry read from the stream: server-assigned id plus the flat
/// string field map the producer appended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamEntry {
    /// Redis stream entry ID (e.g., "1234567890123-0")
    pub id: String,

    /// Flat field map of the entry
    pub fields: HashMap<String, String>,
}

impl StreamEntry {
    pub fn new(id: impl Into<String>, fields: HashMap<String, String>) -> Self {
        Self { id: id.into(), fields }
    }

    /// Build an entry from a redis-rs stream message, stringifying values.
    ///
    /// Non-string value types are dropped; a decoder downstream reports the
    /// missing field.
    pub fn from_stream_id(message: &redis::streams::StreamId) -> Self {
        let mut fields = HashMap::with_capacity(message.map.len());
        for (key, value) in &message.map {
            let text = match value {
                redis::Value::BulkString(bytes) => String::from_utf8_lossy(bytes).to_string(),
                redis::Value::SimpleString(s) => s.clone(),
                redis::Value::Int(i) => i.to_string(),
                _ => continue,
            };
            fields.insert(key.clone(), text);
        }
        Self { id: message.id.clone(), fields }
    }

    /// Get a field value.
    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    /// When the entry was appended, parsed from the "<ms>-<seq>" id.
    pub fn appended_at(&self) -> Option<DateTime<Utc>> {
        self.id
            .split('-')
            .next()
            .and_then(|ts| ts.parse::<i64>().ok())
            .and_then(DateTime::from_timestamp_millis)
    }

    /// Age of the entry in milliseconds (0 for unparseable ids).
    pub fn age_ms(&self) -> i64 {
        self.appended_at()
            .map(|t| (Utc::now() - t).num_milliseconds())
            .unwrap_or(0)
    }
}

/// One row of the consumer group's pending-entries list (XPENDING).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingEntry {
    /// Stream entry id
    pub id: String,
    /// Consumer currently owning the entry
    pub consumer: String,
    /// Milliseconds since the last delivery to the owner
    pub idle_ms: u64,
    /// Times the entry has been delivered (group read with ">" or claim)
    pub delivery_count: u64,
}

/// A registered consumer of the group (XINFO CONSUMERS).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsumerInfo {
    /// Consumer name
    pub name: String,
    /// Number of entries in the consumer's pending set
    pub pending: u64,
}

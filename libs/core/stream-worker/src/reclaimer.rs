//! Pending-entry reclaimer.
//!
//! A singleton periodic task per (stream, group) that recovers entries
//! stranded by crashed consumers and finalizes poison entries so the
//! pending list never grows without bound.
//!
//! State machine for a single entry, from this task's perspective:
//!
//! ```text
//! DELIVERED ──ack──▶ done (success)
//!     │──delete──▶ done (permanent)
//!     │
//!     ▼ idle >= visibility timeout
//!   STALE ──claim──▶ DELIVERED to healthiest consumer (delivery_count + 1)
//!     │
//!     ▼ delivery_count + 1 > cap
//!   FORCE-ACKED (poison)
//! ```

use crate::config::WorkerConfig;
use crate::consumer::StreamConsumer;
use crate::entry::ConsumerInfo;
use crate::error::StreamError;
use crate::metrics;
use redis::aio::ConnectionManager;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// How many pending entries one tick inspects.
const RECLAIM_SCAN_COUNT: usize = 100;

/// What one reclaimer tick did.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReclaimSummary {
    /// Pending entries inspected.
    pub scanned: usize,
    /// Entries still within the visibility timeout.
    pub skipped: usize,
    /// Entries claimed to the target consumer.
    pub claimed: usize,
    /// Poison entries force-acknowledged.
    pub finalized: usize,
    /// Dangling pending references (entry deleted) stripped via ack.
    pub removed: usize,
}

/// Periodic claim/finalize task over one (stream, group).
pub struct Reclaimer {
    consumer: StreamConsumer,
    config: WorkerConfig,
}

impl Reclaimer {
    pub fn new(redis: ConnectionManager, config: WorkerConfig) -> Self {
        Self {
            consumer: StreamConsumer::new(redis, config.clone()),
            config,
        }
    }

    /// Run the reclaimer until shutdown, ticking every
    /// `reclaim_interval_ms`.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(
            stream = %self.config.stream_name,
            group = %self.config.consumer_group,
            interval_ms = %self.config.reclaim_interval_ms,
            visibility_timeout_ms = %self.config.visibility_timeout_ms,
            max_retry_count = %self.config.reclaim_max_retry_count,
            "Starting reclaimer"
        );

        let mut ticker =
            tokio::time::interval(Duration::from_millis(self.config.reclaim_interval_ms));
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                _ = ticker.tick() => {
                    match self.tick().await {
                        Ok(summary) if summary.claimed + summary.finalized + summary.removed > 0 => {
                            info!(
                                claimed = %summary.claimed,
                                finalized = %summary.finalized,
                                removed = %summary.removed,
                                "Reclaim tick complete"
                            );
                        }
                        Ok(_) => {}
                        Err(e) => {
                            warn!(error = %e, "Reclaim tick failed");
                        }
                    }
                }
            }
        }

        info!("Reclaimer stopped");
    }

    /// One scan over the group's pending list.
    ///
    /// Individual claim/ack errors are logged and do not abort the tick;
    /// running ticks back to back is idempotent apart from delivery-count
    /// increments on claimed entries.
    pub async fn tick(&self) -> Result<ReclaimSummary, StreamError> {
        let mut summary = ReclaimSummary::default();

        let pending = self.consumer.pending(RECLAIM_SCAN_COUNT).await?;
        if pending.is_empty() {
            return Ok(summary);
        }
        summary.scanned = pending.len();

        let consumers = self.consumer.consumers().await?;
        let Some(target) = pick_target(&consumers) else {
            warn!(
                stream = %self.consumer.stream_name(),
                "No registered consumers, skipping reclaim tick"
            );
            return Ok(summary);
        };
        let target = target.name.clone();
        metrics::set_pending_depth(self.consumer.stream_name(), summary.scanned as f64);

        for entry in pending {
            if entry.idle_ms < self.config.visibility_timeout_ms {
                summary.skipped += 1;
                continue;
            }

            // Poison path: the claim about to happen would be delivery
            // number delivery_count + 1; past the cap we finalize instead.
            if entry.delivery_count + 1 > self.config.reclaim_max_retry_count {
                warn!(
                    entry_id = %entry.id,
                    owner = %entry.consumer,
                    delivery_count = %entry.delivery_count,
                    "Entry exceeded delivery cap, force-acknowledging"
                );
                match self.consumer.ack(&entry.id).await {
                    Ok(()) => {
                        metrics::record_reclaim(self.consumer.stream_name(), "finalized");
                        summary.finalized += 1;
                    }
                    Err(e) => warn!(entry_id = %entry.id, error = %e, "Failed to finalize poison entry"),
                }
                continue;
            }

            match self
                .consumer
                .claim(&target, &entry.id, self.config.visibility_timeout_ms)
                .await
            {
                Ok(true) => {
                    debug!(
                        entry_id = %entry.id,
                        from = %entry.consumer,
                        to = %target,
                        idle_ms = %entry.idle_ms,
                        "Claimed stale entry"
                    );
                    metrics::record_reclaim(self.consumer.stream_name(), "claimed");
                    summary.claimed += 1;
                }
                Ok(false) => {
                    // The entry was deleted from the stream but still sits in
                    // the pending list; ack strips the dangling reference.
                    match self.consumer.ack(&entry.id).await {
                        Ok(()) => {
                            metrics::record_reclaim(self.consumer.stream_name(), "removed");
                            summary.removed += 1;
                        }
                        Err(e) => {
                            warn!(entry_id = %entry.id, error = %e, "Failed to ack deleted entry")
                        }
                    }
                }
                Err(e) => {
                    warn!(entry_id = %entry.id, error = %e, "Failed to claim entry");
                }
            }
        }

        Ok(summary)
    }
}

/// Choose the consumer to claim stale entries to: lowest pending count,
/// ties broken by lexicographically smallest name.
fn pick_target(consumers: &[ConsumerInfo]) -> Option<&ConsumerInfo> {
    consumers
        .iter()
        .min_by(|a, b| a.pending.cmp(&b.pending).then_with(|| a.name.cmp(&b.name)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn consumer(name: &str, pending: u64) -> ConsumerInfo {
        ConsumerInfo {
            name: name.to_string(),
            pending,
        }
    }

    #[test]
    fn test_pick_target_lowest_pending() {
        let consumers = vec![
            consumer("push_message_consumer_0_0", 4),
            consumer("push_message_consumer_0_1", 1),
            consumer("push_message_consumer_0_2", 2),
        ];

        let target = pick_target(&consumers).unwrap();
        assert_eq!(target.name, "push_message_consumer_0_1");
    }

    #[test]
    fn test_pick_target_tie_breaks_lexicographically() {
        let consumers = vec![
            consumer("push_message_consumer_1_1", 0),
            consumer("push_message_consumer_0_2", 0),
            consumer("push_message_consumer_0_1", 3),
        ];

        let target = pick_target(&consumers).unwrap();
        assert_eq!(target.name, "push_message_consumer_0_2");
    }

    #[test]
    fn test_pick_target_empty() {
        assert!(pick_target(&[]).is_none());
    }
}

//! Dispatcher trait and the competing-consumer worker pool.
//!
//! The pool runs N consumer tasks against one consumer group. Each task
//! owns a stable consumer name, drains its own backlog after a restart,
//! then consumes new entries and applies the dispatcher's outcome:
//! ack, delete, or leave pending.

use crate::config::WorkerConfig;
use crate::consumer::StreamConsumer;
use crate::entry::StreamEntry;
use crate::error::StreamError;
use crate::metrics;
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// Terminal classification of one dispatch attempt sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Delivered; the entry is acknowledged.
    Success,
    /// In-process retries exhausted on retriable failures; the entry stays
    /// pending for a later pass or the reclaimer.
    Transient,
    /// The entry can never succeed (bad payload, unknown app, vendor
    /// rejection); it is acknowledged and deleted.
    Permanent,
}

impl DispatchOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Transient => "transient",
            Self::Permanent => "permanent",
        }
    }
}

/// Per-entry orchestration: decode, deliver, classify.
///
/// Implementations receive the raw stream entry and must not panic; every
/// failure maps to an outcome.
#[async_trait]
pub trait Dispatcher: Send + Sync {
    /// Process a single entry and classify the result.
    async fn dispatch(&self, entry: &StreamEntry) -> DispatchOutcome;

    /// Get the dispatcher name for logging.
    fn name(&self) -> &'static str;
}

/// Competing-consumer worker pool bound to one consumer group.
///
/// # Type Parameters
///
/// * `D` - The dispatcher invoked for every entry
pub struct WorkerPool<D: Dispatcher> {
    consumer: StreamConsumer,
    dispatcher: Arc<D>,
    config: WorkerConfig,
}

impl<D: Dispatcher + 'static> WorkerPool<D> {
    /// Create a new worker pool.
    pub fn new(redis: ConnectionManager, dispatcher: D, config: WorkerConfig) -> Self {
        Self {
            consumer: StreamConsumer::new(redis, config.clone()),
            dispatcher: Arc::new(dispatcher),
            config,
        }
    }

    /// Create a worker pool with an Arc dispatcher.
    pub fn with_arc_dispatcher(
        redis: ConnectionManager,
        dispatcher: Arc<D>,
        config: WorkerConfig,
    ) -> Self {
        Self {
            consumer: StreamConsumer::new(redis, config.clone()),
            dispatcher,
            config,
        }
    }

    /// Get a reference to the consumer for health checks.
    pub fn consumer(&self) -> &StreamConsumer {
        &self.consumer
    }

    /// Run the pool until shutdown.
    ///
    /// Ensures the consumer group exists, then spawns one consumer task per
    /// configured slot and waits for all of them to stop.
    pub async fn run(&self, shutdown: watch::Receiver<bool>) -> Result<(), StreamError> {
        info!(
            stream = %self.config.stream_name,
            group = %self.config.consumer_group,
            concurrency = %self.config.concurrency,
            dispatcher = %self.dispatcher.name(),
            "Starting worker pool"
        );

        self.consumer.ensure_consumer_group().await?;

        let mut tasks: JoinSet<()> = JoinSet::new();
        for i in 0..self.config.concurrency {
            let worker = ConsumerWorker {
                name: self.config.consumer_name(i),
                consumer: self.consumer.clone(),
                dispatcher: Arc::clone(&self.dispatcher),
                config: self.config.clone(),
            };
            let shutdown = shutdown.clone();
            tasks.spawn(async move { worker.run(shutdown).await });
        }

        while let Some(res) = tasks.join_next().await {
            if let Err(e) = res {
                error!(error = %e, "Consumer task panicked");
            }
        }

        info!("Worker pool stopped");
        Ok(())
    }
}

/// One consumer task with a stable name.
struct ConsumerWorker<D: Dispatcher> {
    name: String,
    consumer: StreamConsumer,
    dispatcher: Arc<D>,
    config: WorkerConfig,
}

impl<D: Dispatcher> ConsumerWorker<D> {
    async fn run(&self, shutdown: watch::Receiver<bool>) {
        info!(consumer = %self.name, "Consumer starting");

        // A restarting worker reads its own pending entries (cursor "0-0")
        // before consuming new ones (cursor ">").
        let mut check_backlog = true;
        let mut consecutive_errors: u32 = 0;
        const MAX_BACKOFF_SECS: u64 = 30;

        loop {
            if *shutdown.borrow() {
                break;
            }

            let cursor = if check_backlog { "0-0" } else { ">" };

            let entries = match self.consumer.read_group(&self.name, cursor).await {
                Ok(entries) => {
                    if consecutive_errors > 0 {
                        info!(consumer = %self.name, "Connection recovered after {} errors", consecutive_errors);
                        consecutive_errors = 0;
                    }
                    entries
                }
                Err(e) if e.is_block_timeout() => continue,
                Err(e) => {
                    consecutive_errors += 1;

                    if e.is_nogroup_error() {
                        warn!(consumer = %self.name, "Consumer group missing, recreating...");
                        if let Err(create_err) = self.consumer.ensure_consumer_group().await {
                            error!(error = %create_err, "Failed to recreate consumer group");
                        }
                    } else if e.is_connection_error() {
                        let backoff_secs =
                            std::cmp::min(2u64.pow(consecutive_errors.min(5)), MAX_BACKOFF_SECS);
                        warn!(
                            consumer = %self.name,
                            error = %e,
                            consecutive_errors = %consecutive_errors,
                            backoff_secs = %backoff_secs,
                            "Redis connection error, backing off"
                        );
                        tokio::time::sleep(Duration::from_secs(backoff_secs)).await;
                    } else {
                        error!(consumer = %self.name, error = %e, "Group read failed");
                    }

                    tokio::time::sleep(Duration::from_secs(1)).await;
                    continue;
                }
            };

            if entries.is_empty() {
                if check_backlog {
                    debug!(consumer = %self.name, "Backlog drained, consuming new entries");
                    check_backlog = false;
                }
                // New-entry reads simply re-block.
                continue;
            }

            metrics::record_batch_size(&self.config.stream_name, entries.len());

            let mut finalized = 0usize;
            for entry in &entries {
                // Stop picking up work once shutdown is signalled; entries
                // not yet dispatched stay pending for post-restart recovery.
                if *shutdown.borrow() {
                    break;
                }
                if self.handle_entry(entry).await {
                    finalized += 1;
                }
            }

            // A backlog pass that finalizes nothing means every owned entry
            // failed transiently; move on and let the reclaimer take over
            // once they go stale.
            if check_backlog && finalized == 0 {
                debug!(consumer = %self.name, "Backlog made no progress, consuming new entries");
                check_backlog = false;
            }
        }

        info!(consumer = %self.name, "Consumer stopped");
    }

    /// Dispatch one entry and apply its outcome. Returns whether the entry
    /// reached a terminal state (ack or delete).
    async fn handle_entry(&self, entry: &StreamEntry) -> bool {
        let start = std::time::Instant::now();
        let outcome = self.dispatcher.dispatch(entry).await;

        metrics::record_job_processed(&self.config.stream_name, outcome.as_str());
        metrics::record_dispatch_duration(&self.config.stream_name, start.elapsed());

        match outcome {
            DispatchOutcome::Success => {
                // Ack failure leaves the entry pending; the next backlog pass
                // or the reclaimer finalizes it.
                if let Err(e) = self.consumer.ack(&entry.id).await {
                    error!(
                        consumer = %self.name,
                        entry_id = %entry.id,
                        error = %e,
                        "Failed to ack entry"
                    );
                    return false;
                }
                true
            }
            DispatchOutcome::Permanent => {
                if let Err(e) = self.consumer.remove(&entry.id).await {
                    error!(
                        consumer = %self.name,
                        entry_id = %entry.id,
                        error = %e,
                        "Failed to remove permanently failed entry"
                    );
                    return false;
                }
                debug!(consumer = %self.name, entry_id = %entry.id, "Removed permanently failed entry");
                true
            }
            DispatchOutcome::Transient => {
                warn!(
                    consumer = %self.name,
                    entry_id = %entry.id,
                    "Dispatch failed transiently, entry stays pending"
                );
                false
            }
        }
    }
}

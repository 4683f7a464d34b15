//! Stream Worker - Redis Streams Work Queue
//!
//! A library for building at-least-once delivery pipelines on Redis Streams:
//! - Consumer group support with competing consumers
//! - Stable consumer names so a restarting worker drains its own backlog first
//! - Outcome-driven acknowledgement (ack on success, delete on permanent
//!   failure, leave pending on transient failure)
//! - A periodic reclaimer that claims stale pending entries to the healthiest
//!   consumer and finalizes poison entries
//! - Graceful shutdown handling
//! - Health check endpoints and Prometheus metrics
//!
//! # Architecture
//!
//! ```text
//! Producer ──XADD──▶ Redis Stream ──XREADGROUP──▶ WorkerPool (N consumers)
//!                        │                              │ dispatch()
//!                        │                              ▼
//!                        │                  Success ──▶ XACK
//!                        │                  Permanent ▶ XACK + XDEL
//!                        │                  Transient ▶ (stays pending)
//!                        ▼
//!                   Reclaimer ──XPENDING/XCLAIM──▶ healthiest consumer
//! ```
//!
//! # Example Usage
//!
//! ```rust,ignore
//! use stream_worker::{Dispatcher, DispatchOutcome, StreamEntry, WorkerConfig, WorkerPool};
//!
//! struct MyDispatcher;
//!
//! #[async_trait]
//! impl Dispatcher for MyDispatcher {
//!     async fn dispatch(&self, entry: &StreamEntry) -> DispatchOutcome {
//!         // decode + deliver
//!         DispatchOutcome::Success
//!     }
//!     fn name(&self) -> &'static str { "MyDispatcher" }
//! }
//!
//! let config = WorkerConfig::from_stream_def::<MyStreamDef>();
//! let pool = WorkerPool::new(redis, MyDispatcher, config);
//! pool.run(shutdown_rx).await?;
//! ```

mod config;
mod consumer;
mod entry;
mod error;
pub mod health;
pub mod metrics;
mod producer;
mod reclaimer;
mod registry;
mod worker;

pub use config::WorkerConfig;
pub use consumer::{StreamConsumer, StreamInfo};
pub use entry::{ConsumerInfo, PendingEntry, StreamEntry};
pub use error::StreamError;
pub use health::{HealthState, health_router};
pub use producer::StreamProducer;
pub use reclaimer::{ReclaimSummary, Reclaimer};
pub use registry::StreamDef;
pub use worker::{DispatchOutcome, Dispatcher, WorkerPool};

/// Result type alias for stream operations.
pub type StreamResult<T> = Result<T, StreamError>;

//! Prometheus metrics for the work queue.
//!
//! ## Available Metrics
//!
//! - `stream_jobs_processed_total` - Counter of jobs processed by outcome
//! - `stream_dispatch_duration_seconds` - Histogram of dispatch time
//! - `stream_batch_size` - Histogram of entries per group read
//! - `stream_pending_depth` - Gauge of scanned pending entries
//! - `stream_reclaims_total` - Counter of reclaimer actions by kind

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;
use std::time::Duration;

/// Global Prometheus handle for metrics export
static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Metric names as constants for consistency
pub mod names {
    pub const JOBS_PROCESSED: &str = "stream_jobs_processed_total";
    pub const DISPATCH_DURATION: &str = "stream_dispatch_duration_seconds";
    pub const BATCH_SIZE: &str = "stream_batch_size";
    pub const PENDING_DEPTH: &str = "stream_pending_depth";
    pub const RECLAIMS: &str = "stream_reclaims_total";
}

/// Initialize the Prometheus metrics exporter.
///
/// Call once at application startup; subsequent calls return the same
/// handle. Use `handle.render()` to get Prometheus text format.
pub fn init_metrics() -> PrometheusHandle {
    PROMETHEUS_HANDLE
        .get_or_init(|| {
            PrometheusBuilder::new()
                .install_recorder()
                .expect("Failed to install Prometheus recorder")
        })
        .clone()
}

/// Get the global Prometheus handle.
///
/// Returns None if metrics haven't been initialized.
pub fn get_metrics_handle() -> Option<PrometheusHandle> {
    PROMETHEUS_HANDLE.get().cloned()
}

/// Record a job as processed with the given outcome.
pub fn record_job_processed(stream: &str, outcome: &'static str) {
    counter!(
        names::JOBS_PROCESSED,
        "stream" => stream.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}

/// Record dispatch duration for one entry.
pub fn record_dispatch_duration(stream: &str, duration: Duration) {
    histogram!(
        names::DISPATCH_DURATION,
        "stream" => stream.to_string()
    )
    .record(duration.as_secs_f64());
}

/// Record the number of entries returned by one group read.
pub fn record_batch_size(stream: &str, size: usize) {
    histogram!(
        names::BATCH_SIZE,
        "stream" => stream.to_string()
    )
    .record(size as f64);
}

/// Update the pending-depth gauge from a reclaimer scan.
pub fn set_pending_depth(stream: &str, depth: f64) {
    gauge!(
        names::PENDING_DEPTH,
        "stream" => stream.to_string()
    )
    .set(depth);
}

/// Record a reclaimer action ("claimed", "finalized", "removed").
pub fn record_reclaim(stream: &str, kind: &'static str) {
    counter!(
        names::RECLAIMS,
        "stream" => stream.to_string(),
        "kind" => kind
    )
    .increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_without_recorder_does_not_panic() {
        record_job_processed("test_stream", "success");
        record_dispatch_duration("test_stream", Duration::from_millis(5));
        record_batch_size("test_stream", 3);
        set_pending_depth("test_stream", 2.0);
        record_reclaim("test_stream", "claimed");
    }
}

//! Push Worker Service
//!
//! Consumes per-device push jobs from the Redis stream and dispatches them
//! to the configured vendor (APNs or FCM).
//!
//! ## Architecture
//!
//! ```text
//! Redis Stream (push_message_stream)
//!   ↓ (Consumer Group: push_message_group)
//! WorkerPool<PushDispatcher> (N consumers)
//!   ↓
//! ClientRegistry → ApnsClient / FcmClient
//!
//! Reclaimer (singleton) ← stale pending entries
//! ```
//!
//! ## Features
//!
//! - Competing consumers with stable, worker-id partitioned names
//! - Bounded in-process retries with exponential backoff per job
//! - Pending-entry reclaim and poison finalization
//! - Graceful shutdown with a 5 second drain window
//! - Health and metrics endpoints for probes

use axum::Router;
use core_config::env_parse_or;
use domain_push::{ClientRegistry, PushConfig, PushDispatcher};
use eyre::{Result, WrapErr};
use std::sync::Arc;
use std::time::Duration;
use stream_worker::{HealthState, Reclaimer, WorkerPool, health_router, metrics};
use tokio::net::TcpListener;
use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info, warn};

/// Drain window after a shutdown signal; anything unfinished stays pending
/// for post-restart reclaim.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Start the health HTTP server
///
/// Provides endpoints for:
/// - Liveness probes: `/health`, `/healthz`
/// - Readiness probes: `/ready`, `/readyz`
/// - Stream monitoring: `/stream/info`
/// - Prometheus metrics: `/metrics`
async fn start_health_server(health_state: HealthState, port: u16) -> Result<()> {
    let app: Router = health_router(health_state);

    let addr = format!("0.0.0.0:{}", port);
    let listener = TcpListener::bind(&addr)
        .await
        .wrap_err_with(|| format!("Failed to bind health server to {}", addr))?;

    info!(port = %port, "Health server listening");

    axum::serve(listener, app)
        .await
        .wrap_err("Health server failed")?;

    Ok(())
}

/// Run the push worker
///
/// 1. Loads the JSON configuration and sets up structured logging
/// 2. Connects to Redis
/// 3. Builds the vendor client registry
/// 4. Runs the worker pool and the reclaimer until SIGINT/SIGTERM
pub async fn run() -> Result<()> {
    let config = PushConfig::load_from_env().wrap_err("Failed to load configuration")?;

    core_config::tracing::init_tracing(&config.mode);
    metrics::init_metrics();

    info!(
        name = env!("CARGO_PKG_NAME"),
        version = env!("CARGO_PKG_VERSION"),
        mode = %config.mode,
        worker_id = %config.worker_id,
        "Starting push worker service"
    );

    let health_port: u16 =
        env_parse_or("HEALTH_PORT", 8081).wrap_err("Invalid HEALTH_PORT value")?;

    info!("Connecting to Redis...");
    let redis = database::redis::connect_with_retry(
        &config.cache_config.redis_url(),
        config.cache_config.response_timeout(),
        None,
    )
    .await
    .wrap_err("Failed to connect to Redis")?;

    let registry =
        Arc::new(ClientRegistry::from_config(&config).map_err(|e| eyre::eyre!("{}", e))?);
    if registry.is_empty() {
        warn!("No vendor clients configured; every job will fail permanently");
    }

    let worker_config = config.worker_config();
    info!(
        stream = %worker_config.stream_name,
        group = %worker_config.consumer_group,
        concurrency = %worker_config.concurrency,
        once_read_count = %worker_config.once_read_count,
        visibility_timeout_ms = %worker_config.visibility_timeout_ms,
        reclaim_interval_ms = %worker_config.reclaim_interval_ms,
        "Worker configuration loaded"
    );

    let dispatcher = PushDispatcher::new(Arc::clone(&registry));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let health_state = HealthState::new(
        Arc::new(redis.clone()),
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        worker_config.stream_name.clone(),
    );
    tokio::spawn(async move {
        if let Err(e) = start_health_server(health_state, health_port).await {
            error!(error = %e, "Health server failed");
        }
    });

    // One reclaimer per (stream, group) deployment.
    let reclaimer = Reclaimer::new(redis.clone(), worker_config.clone());
    let reclaimer_rx = shutdown_rx.clone();
    let reclaimer_handle = tokio::spawn(async move { reclaimer.run(reclaimer_rx).await });

    let pool = WorkerPool::new(redis, dispatcher, worker_config);
    let mut pool_handle = tokio::spawn(async move { pool.run(shutdown_rx).await });

    let mut early_exit = None;
    tokio::select! {
        _ = shutdown_signal() => {
            let _ = shutdown_tx.send(true);
        }
        res = &mut pool_handle => {
            // The pool only returns early on an unrecoverable startup error.
            let _ = shutdown_tx.send(true);
            early_exit = Some(res);
        }
    }

    match early_exit {
        Some(res) => {
            res.wrap_err("Worker task failed")?
                .map_err(|e| eyre::eyre!("Worker pool failed: {}", e))?;
        }
        None => {
            let drain = async {
                let (pool_res, _) = tokio::join!(&mut pool_handle, reclaimer_handle);
                pool_res
            };
            match tokio::time::timeout(SHUTDOWN_GRACE, drain).await {
                Ok(Ok(Ok(()))) => info!("Push worker stopped cleanly"),
                Ok(Ok(Err(e))) => error!(error = %e, "Worker pool stopped with error"),
                Ok(Err(e)) => error!(error = %e, "Worker task failed"),
                Err(_) => {
                    warn!(
                        grace_secs = %SHUTDOWN_GRACE.as_secs(),
                        "Drain window elapsed; unfinished entries stay pending for reclaim"
                    );
                    pool_handle.abort();
                }
            }
        }
    }

    info!("Push worker service stopped");
    Ok(())
}

/// Wait for a shutdown signal (SIGINT or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        },
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        },
    }
}

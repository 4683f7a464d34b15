//! Push API Service - Entry Point
//!
//! HTTP submission surface: validates push submissions, resolves device
//! tokens, and enqueues per-device jobs onto the Redis stream for the
//! worker to dispatch.

mod api;
mod response;
mod state;

use domain_push::{
    ClientRegistry, PushConfig, PushService, SqlTokenResolver, StaticTokenResolver, TokenResolver,
};
use eyre::{Result, WrapErr};
use state::AppState;
use std::sync::Arc;
use stream_worker::{StreamConsumer, StreamProducer};
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let config = PushConfig::load_from_env().wrap_err("Failed to load configuration")?;

    core_config::tracing::init_tracing(&config.mode);

    info!(
        name = env!("CARGO_PKG_NAME"),
        version = env!("CARGO_PKG_VERSION"),
        mode = %config.mode,
        port = %config.port,
        "Starting push API service"
    );

    info!("Connecting to Redis...");
    let redis = database::redis::connect_with_retry(
        &config.cache_config.redis_url(),
        config.cache_config.response_timeout(),
        None,
    )
    .await
    .wrap_err("Failed to connect to Redis")?;

    // Create the consumer group up front so jobs enqueued before the first
    // worker starts are still delivered.
    StreamConsumer::new(redis.clone(), config.worker_config())
        .ensure_consumer_group()
        .await
        .map_err(|e| eyre::eyre!("Failed to create consumer group: {}", e))?;

    let resolver: Arc<dyn TokenResolver> = match &config.db_config {
        Some(db_config) => {
            info!("Connecting to PostgreSQL...");
            let pg = database::postgres::PostgresConfig::new(&db_config.url);
            let db = database::postgres::connect_with_retry(&pg, None)
                .await
                .wrap_err("Failed to connect to PostgreSQL")?;
            Arc::new(SqlTokenResolver::new(db))
        }
        None => {
            warn!("No db_config set; token resolution is empty (development only)");
            Arc::new(StaticTokenResolver::default())
        }
    };

    let registry =
        Arc::new(ClientRegistry::from_config(&config).map_err(|e| eyre::eyre!("{}", e))?);

    let producer = StreamProducer::from_stream_def::<domain_push::PushMessageStream>(redis);
    let service = Arc::new(PushService::new(Arc::clone(&resolver), producer));

    let app_state = AppState {
        service,
        registry,
        resolver,
    };

    let app = api::routes(app_state).layer(TraceLayer::new_for_http());

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = TcpListener::bind(&addr)
        .await
        .wrap_err_with(|| format!("Failed to bind to {}", addr))?;

    info!(addr = %addr, "Push API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .wrap_err("Server failed")?;

    info!("Push API service stopped");
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
            info!("Received Ctrl+C, shutting down gracefully");
        },
        _ = terminate => {
            info!("Received SIGTERM, shutting down gracefully");
        },
    }
}

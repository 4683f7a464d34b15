use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};
use sea_orm_migration::MigratorTrait;
use std::time::Duration;
use tracing::{info, log::LevelFilter};

use core_config::{ConfigError, FromEnv, env_required};

use crate::retry::{RetryConfig, retry, retry_with_backoff};

/// PostgreSQL connection settings for the device-token store.
#[derive(Clone, Debug)]
pub struct PostgresConfig {
    /// Database connection URL.
    pub url: String,
    /// Maximum number of pooled connections.
    pub max_connections: u32,
    /// Minimum number of pooled connections.
    pub min_connections: u32,
    /// Connect/acquire timeout in seconds.
    pub connect_timeout_secs: u64,
    /// Enable SQL query logging.
    pub sqlx_logging: bool,
}

impl PostgresConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_connections: 20,
            min_connections: 2,
            connect_timeout_secs: 8,
            sqlx_logging: false,
        }
    }

    pub fn with_max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    fn into_connect_options(self) -> ConnectOptions {
        let mut opt = ConnectOptions::new(self.url);
        opt.max_connections(self.max_connections)
            .min_connections(self.min_connections)
            .connect_timeout(Duration::from_secs(self.connect_timeout_secs))
            .acquire_timeout(Duration::from_secs(self.connect_timeout_secs))
            .sqlx_logging(self.sqlx_logging)
            .sqlx_logging_level(LevelFilter::Debug);
        opt
    }
}

impl FromEnv for PostgresConfig {
    /// Requires `DATABASE_URL` to be set (no default).
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self::new(env_required("DATABASE_URL")?))
    }
}

/// Connect to PostgreSQL with the configured pool settings.
pub async fn connect(config: &PostgresConfig) -> Result<DatabaseConnection, DbErr> {
    let db = Database::connect(config.clone().into_connect_options()).await?;
    info!("Successfully connected to PostgreSQL");
    Ok(db)
}

/// Connect to PostgreSQL, retrying with exponential backoff on failure.
pub async fn connect_with_retry(
    config: &PostgresConfig,
    retry_config: Option<RetryConfig>,
) -> Result<DatabaseConnection, DbErr> {
    match retry_config {
        Some(rc) => retry_with_backoff(|| connect(config), rc).await,
        None => retry(|| connect(config)).await,
    }
}

/// Apply pending migrations at startup.
pub async fn run_migrations<M: MigratorTrait>(db: &DatabaseConnection) -> Result<(), DbErr> {
    info!("Running database migrations");
    M::up(db, None).await?;
    info!("Database migrations complete");
    Ok(())
}

use redis::Client;
use redis::aio::{ConnectionManager, ConnectionManagerConfig};
use std::time::Duration;
use tracing::info;

use crate::retry::{RetryConfig, retry, retry_with_backoff};

/// Connect to Redis and return a `ConnectionManager`.
///
/// The manager handles reconnection transparently. `response_timeout`
/// bounds every command round-trip on the managed connection; the initial
/// connection is verified with a PING so misconfiguration fails at
/// startup, not on the first stream operation.
pub async fn connect(
    url: &str,
    response_timeout: Option<Duration>,
) -> redis::RedisResult<ConnectionManager> {
    info!("Connecting to Redis at {}", redact_url(url));

    let client = Client::open(url)?;
    let mut manager_config = ConnectionManagerConfig::new();
    if let Some(timeout) = response_timeout {
        manager_config = manager_config.set_response_timeout(Some(timeout));
    }
    let manager = ConnectionManager::new_with_config(client, manager_config).await?;

    let mut conn = manager.clone();
    let _: String = redis::cmd("PING").query_async(&mut conn).await?;

    info!("Successfully connected to Redis");
    Ok(manager)
}

/// Connect to Redis, retrying with exponential backoff on failure.
pub async fn connect_with_retry(
    url: &str,
    response_timeout: Option<Duration>,
    retry_config: Option<RetryConfig>,
) -> redis::RedisResult<ConnectionManager> {
    let url_owned = url.to_string();

    match retry_config {
        Some(config) => {
            retry_with_backoff(|| connect(&url_owned, response_timeout), config).await
        }
        None => retry(|| connect(&url_owned, response_timeout)).await,
    }
}

/// Strip userinfo from a redis URL before logging it.
fn redact_url(url: &str) -> String {
    match url.rfind('@') {
        Some(at) => {
            let scheme_end = url.find("://").map(|i| i + 3).unwrap_or(0);
            format!("{}***@{}", &url[..scheme_end], &url[at + 1..])
        }
        None => url.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redact_url_with_password() {
        assert_eq!(
            redact_url("redis://:secret@10.0.0.1:6379/2"),
            "redis://***@10.0.0.1:6379/2"
        );
    }

    #[test]
    fn test_redact_url_without_password() {
        assert_eq!(redact_url("redis://localhost:6379"), "redis://localhost:6379");
    }

    #[tokio::test]
    #[ignore] // Requires actual Redis
    async fn test_connect() {
        let redis_url =
            std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string());

        let result = connect(&redis_url, Some(Duration::from_secs(3))).await;
        assert!(result.is_ok());
    }
}

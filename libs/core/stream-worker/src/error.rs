//! Error types for stream operations.

use thiserror::Error;

/// Errors that can occur during stream operations.
#[derive(Error, Debug)]
pub enum StreamError {
    /// Redis connection or command error.
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// Consumer group error.
    #[error("Consumer group error: {0}")]
    ConsumerGroup(String),

    /// Queue backend unavailable or misbehaving.
    #[error("Backend error: {0}")]
    Backend(String),
}

impl StreamError {
    /// Check if this is a BLOCK timeout (normal behavior, not an error).
    ///
    /// When using XREADGROUP with BLOCK, a timeout means no entries arrived
    /// within the block period.
    pub fn is_block_timeout(&self) -> bool {
        match self {
            Self::Redis(e) => {
                let err_str = e.to_string().to_lowercase();
                err_str.contains("timed out") && !err_str.contains("connection")
            }
            _ => false,
        }
    }

    /// Check if this is a consumer group missing error (NOGROUP).
    pub fn is_nogroup_error(&self) -> bool {
        match self {
            Self::Redis(e) => e.to_string().contains("NOGROUP"),
            Self::ConsumerGroup(s) | Self::Backend(s) => s.contains("NOGROUP"),
        }
    }

    /// Check if this is a connection-level error that a later iteration may
    /// recover from.
    pub fn is_connection_error(&self) -> bool {
        if self.is_block_timeout() {
            return false;
        }
        let err_str = match self {
            Self::Redis(e) => e.to_string(),
            Self::ConsumerGroup(s) | Self::Backend(s) => s.clone(),
        };
        let lower = err_str.to_lowercase();
        lower.contains("connection")
            || lower.contains("disconnected")
            || lower.contains("broken pipe")
            || lower.contains("reset by peer")
            || lower.contains("refused")
            || lower.contains("eof")
            || lower.contains("io error")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StreamError::Backend("stream unavailable".to_string());
        assert_eq!(err.to_string(), "Backend error: stream unavailable");
    }

    #[test]
    fn test_is_nogroup_error() {
        let err = StreamError::ConsumerGroup("NOGROUP No such consumer group".to_string());
        assert!(err.is_nogroup_error());

        let err = StreamError::Backend("some other error".to_string());
        assert!(!err.is_nogroup_error());
    }

    #[test]
    fn test_is_connection_error() {
        let err = StreamError::Backend("connection refused".to_string());
        assert!(err.is_connection_error());

        let err = StreamError::Backend("WRONGTYPE operation".to_string());
        assert!(!err.is_connection_error());
    }
}

//! Error types for the push domain.

use thiserror::Error;

/// Result type for push operations.
pub type PushResult<T> = Result<T, PushError>;

/// Errors that can occur in the push domain.
#[derive(Debug, Error)]
pub enum PushError {
    /// The app id has no entry in the client registry. Permanent.
    #[error("app id '{0}' does not match any configured client")]
    ConfigMissing(String),

    /// Vendor credentials could not be loaded at startup.
    #[error("invalid credentials for '{app_id}': {reason}")]
    Credentials { app_id: String, reason: String },

    /// Malformed stream entry. Permanent.
    #[error("malformed stream entry: {0}")]
    Decode(String),

    /// The vendor rejected the delivery. Permanent.
    #[error("{vendor} rejected the push: {reason}")]
    VendorPermanent { vendor: &'static str, reason: String },

    /// Delivery failed in a way a retry may fix (network, timeout, quota,
    /// 5xx).
    #[error("{vendor} delivery failed transiently: {reason}")]
    VendorTransient { vendor: &'static str, reason: String },

    /// Device-token store error.
    #[error("token store error: {0}")]
    TokenStore(String),

    /// Stream backend error; producers surface 500 on it.
    #[error("queue backend error: {0}")]
    Backend(String),

    /// Invalid submission from the caller.
    #[error("invalid submission: {0}")]
    Validation(String),
}

impl PushError {
    /// True for failures that a later attempt may succeed on.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::VendorTransient { .. } | Self::Backend(_))
    }
}

impl From<redis::RedisError> for PushError {
    fn from(err: redis::RedisError) -> Self {
        PushError::Backend(err.to_string())
    }
}

impl From<sea_orm::DbErr> for PushError {
    fn from(err: sea_orm::DbErr) -> Self {
        PushError::TokenStore(err.to_string())
    }
}

impl From<stream_worker::StreamError> for PushError {
    fn from(err: stream_worker::StreamError) -> Self {
        PushError::Backend(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        let err = PushError::VendorTransient {
            vendor: "fcm",
            reason: "UNAVAILABLE".to_string(),
        };
        assert!(err.is_transient());

        let err = PushError::Backend("connection refused".to_string());
        assert!(err.is_transient());

        let err = PushError::VendorPermanent {
            vendor: "apns",
            reason: "410: Unregistered".to_string(),
        };
        assert!(!err.is_transient());

        assert!(!PushError::ConfigMissing("unknown".to_string()).is_transient());
        assert!(!PushError::Decode("missing app_id".to_string()).is_transient());
    }
}

//! APNs vendor client.
//!
//! Talks to the APNs HTTP/2 endpoint with an ES256 provider token. The
//! sandbox host serves debug/test mode, the production host serves release
//! mode.

use super::{VendorClient, VendorKind, VendorReceipt};
use crate::error::{PushError, PushResult};
use crate::models::PushJob;
use async_trait::async_trait;
use core_config::Mode;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, info};

const APNS_PRODUCTION_HOST: &str = "https://api.push.apple.com";
const APNS_DEVELOPMENT_HOST: &str = "https://api.sandbox.push.apple.com";

/// Notifications expire 5 minutes after submission.
const EXPIRATION_SECS: i64 = 300;

/// Provider tokens are valid for an hour; refresh comfortably before that.
const TOKEN_REFRESH_SECS: u64 = 50 * 60;

/// APNs credentials for one bundle id.
#[derive(Debug, Clone)]
pub struct ApnsConfig {
    /// Bundle id; doubles as the `apns-topic` header.
    pub bundle_id: String,
    /// Contents of the .p8 auth key.
    pub auth_key: String,
    /// Key id from the developer account (Certificates, Identifiers & Profiles -> Keys).
    pub key_id: String,
    /// Team id from the developer account (View Account -> Membership).
    pub team_id: String,
}

#[derive(Serialize)]
struct ProviderTokenClaims<'a> {
    iss: &'a str,
    iat: i64,
}

#[derive(Debug)]
struct CachedToken {
    bearer: String,
    issued_at: Instant,
}

/// APNs push client for one bundle id.
#[derive(Debug)]
pub struct ApnsClient {
    config: ApnsConfig,
    host: &'static str,
    client: Client,
    encoding_key: EncodingKey,
    token: Mutex<Option<CachedToken>>,
}

impl ApnsClient {
    /// Build a client from credentials; fails when the auth key is not a
    /// valid EC PEM.
    pub fn new(config: ApnsConfig, mode: &Mode) -> PushResult<Self> {
        let encoding_key =
            EncodingKey::from_ec_pem(config.auth_key.as_bytes()).map_err(|e| {
                PushError::Credentials {
                    app_id: config.bundle_id.clone(),
                    reason: format!("invalid APNs auth key: {e}"),
                }
            })?;

        let host = if mode.is_release() {
            APNS_PRODUCTION_HOST
        } else {
            APNS_DEVELOPMENT_HOST
        };

        info!(
            bundle_id = %config.bundle_id,
            host = %host,
            "Initialized APNs client"
        );

        Ok(Self {
            config,
            host,
            client: Client::new(),
            encoding_key,
            token: Mutex::new(None),
        })
    }

    /// Get the cached provider token, minting a fresh one when stale.
    async fn bearer(&self) -> PushResult<String> {
        let mut guard = self.token.lock().await;
        if let Some(cached) = guard.as_ref() {
            if cached.issued_at.elapsed() < Duration::from_secs(TOKEN_REFRESH_SECS) {
                return Ok(cached.bearer.clone());
            }
        }

        let mut header = Header::new(Algorithm::ES256);
        header.kid = Some(self.config.key_id.clone());
        let claims = ProviderTokenClaims {
            iss: &self.config.team_id,
            iat: chrono::Utc::now().timestamp(),
        };
        let bearer = jsonwebtoken::encode(&header, &claims, &self.encoding_key).map_err(|e| {
            PushError::Credentials {
                app_id: self.config.bundle_id.clone(),
                reason: format!("failed to sign provider token: {e}"),
            }
        })?;

        debug!(bundle_id = %self.config.bundle_id, "Minted APNs provider token");
        *guard = Some(CachedToken {
            bearer: bearer.clone(),
            issued_at: Instant::now(),
        });
        Ok(bearer)
    }
}

/// `{"aps":{"alert":{"title","body"}}}` with the job's custom data merged
/// in as top-level keys.
fn notification_payload(job: &PushJob) -> serde_json::Value {
    let mut payload = json!({
        "aps": {
            "alert": {
                "title": job.title,
                "body": job.body,
            }
        }
    });
    if let Some(object) = payload.as_object_mut() {
        for (key, value) in &job.data {
            object.insert(key.clone(), json!(value));
        }
    }
    payload
}

#[derive(Deserialize)]
struct ApnsErrorBody {
    reason: String,
}

#[async_trait]
impl VendorClient for ApnsClient {
    async fn push(&self, job: &PushJob) -> PushResult<VendorReceipt> {
        let bearer = self.bearer().await?;
        let url = format!("{}/3/device/{}", self.host, job.token);
        let expiration = chrono::Utc::now().timestamp() + EXPIRATION_SECS;

        let response = self
            .client
            .post(&url)
            .header("authorization", format!("bearer {bearer}"))
            .header("apns-topic", &job.app_id)
            .header("apns-push-type", "alert")
            .header("apns-expiration", expiration.to_string())
            .json(&notification_payload(job))
            .send()
            .await
            .map_err(|e| PushError::VendorTransient {
                vendor: "apns",
                reason: e.to_string(),
            })?;

        let status = response.status();
        let apns_id = response
            .headers()
            .get("apns-id")
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        if status.is_success() {
            debug!(
                bundle_id = %job.app_id,
                token = %job.redacted_token(),
                apns_id = ?apns_id,
                "APNs accepted notification"
            );
            return Ok(VendorReceipt { message_id: apns_id });
        }

        // Any non-200 is final for this token; surface the vendor reason.
        let body = response.text().await.unwrap_or_default();
        let reason = serde_json::from_str::<ApnsErrorBody>(&body)
            .map(|e| e.reason)
            .unwrap_or(body);

        Err(PushError::VendorPermanent {
            vendor: "apns",
            reason: format!("{}: {}", status.as_u16(), reason),
        })
    }

    fn kind(&self) -> VendorKind {
        VendorKind::Apple
    }

    fn name(&self) -> &'static str {
        "ApnsClient"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BaseMessage;
    use std::collections::HashMap;

    #[test]
    fn test_notification_payload_shape() {
        let mut data = HashMap::new();
        data.insert("book_id".to_string(), "510000751".to_string());
        let job = PushJob::new(
            "com.example.ios",
            "tok1",
            None,
            None,
            &BaseMessage::new("Hello", "World").with_data(data),
        );

        let payload = notification_payload(&job);
        assert_eq!(payload["aps"]["alert"]["title"], "Hello");
        assert_eq!(payload["aps"]["alert"]["body"], "World");
        assert_eq!(payload["book_id"], "510000751");
    }

    #[test]
    fn test_invalid_auth_key_rejected() {
        let config = ApnsConfig {
            bundle_id: "com.example.ios".to_string(),
            auth_key: "not a pem".to_string(),
            key_id: "KEY123".to_string(),
            team_id: "TEAM456".to_string(),
        };

        let err = ApnsClient::new(config, &Mode::Debug).unwrap_err();
        assert!(matches!(err, PushError::Credentials { .. }));
    }
}

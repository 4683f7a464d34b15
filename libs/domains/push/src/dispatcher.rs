//! Per-job dispatch orchestration.
//!
//! Decode the entry, look up the vendor client, then attempt delivery with
//! bounded in-process retries: exponential backoff with jitter between
//! attempts, each attempt under its own deadline. Permanent vendor errors
//! short-circuit; exhausted retries surface as a transient outcome so the
//! entry stays pending.

use crate::codec;
use crate::models::redact_token;
use crate::registry::ClientRegistry;
use async_trait::async_trait;
use rand::RngExt;
use std::sync::Arc;
use std::time::Duration;
use stream_worker::{DispatchOutcome, Dispatcher, StreamEntry};
use tracing::{error, info, warn};

/// Maximum vendor attempts per dispatch.
const MAX_ATTEMPTS: u32 = 3;
/// First backoff delay; doubles per retry.
const BASE_BACKOFF: Duration = Duration::from_millis(500);
/// Deadline for a single vendor call.
const ATTEMPT_TIMEOUT: Duration = Duration::from_secs(3);

/// Stream-entry dispatcher backed by the vendor client registry.
pub struct PushDispatcher {
    registry: Arc<ClientRegistry>,
    max_attempts: u32,
    base_backoff: Duration,
    attempt_timeout: Duration,
    redact_tokens: bool,
}

impl PushDispatcher {
    pub fn new(registry: Arc<ClientRegistry>) -> Self {
        Self {
            registry,
            max_attempts: MAX_ATTEMPTS,
            base_backoff: BASE_BACKOFF,
            attempt_timeout: ATTEMPT_TIMEOUT,
            redact_tokens: true,
        }
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    pub fn with_base_backoff(mut self, backoff: Duration) -> Self {
        self.base_backoff = backoff;
        self
    }

    pub fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = timeout;
        self
    }

    pub fn with_token_redaction(mut self, redact: bool) -> Self {
        self.redact_tokens = redact;
        self
    }

    fn display_token(&self, token: &str) -> String {
        if self.redact_tokens {
            redact_token(token)
        } else {
            token.to_string()
        }
    }
}

/// Exponential backoff with +/-25% jitter for the given retry index.
fn backoff_delay(base: Duration, retry_index: u32) -> Duration {
    let exp_ms = (base.as_millis() as u64).saturating_mul(1u64 << retry_index.min(8));
    let jitter_range = exp_ms / 4;
    if jitter_range == 0 {
        return Duration::from_millis(exp_ms);
    }
    let offset = rand::rng().random_range(0..=jitter_range * 2) as i64 - jitter_range as i64;
    Duration::from_millis(exp_ms.saturating_add_signed(offset))
}

#[async_trait]
impl Dispatcher for PushDispatcher {
    async fn dispatch(&self, entry: &StreamEntry) -> DispatchOutcome {
        let job = match codec::decode_entry(entry) {
            Ok(job) => job,
            Err(e) => {
                error!(entry_id = %entry.id, error = %e, "Failed to decode stream entry");
                return DispatchOutcome::Permanent;
            }
        };

        let token = self.display_token(&job.token);
        let action_id = job.action_id.clone().unwrap_or_default();

        let Some(client) = self.registry.lookup(&job.app_id) else {
            error!(
                app_id = %job.app_id,
                token = %token,
                action_id = %action_id,
                "No vendor client configured for app id"
            );
            return DispatchOutcome::Permanent;
        };

        for attempt in 0..self.max_attempts {
            if attempt > 0 {
                tokio::time::sleep(backoff_delay(self.base_backoff, attempt - 1)).await;
            }

            match tokio::time::timeout(self.attempt_timeout, client.push(&job)).await {
                Ok(Ok(receipt)) => {
                    info!(
                        app_id = %job.app_id,
                        token = %token,
                        action_id = %action_id,
                        vendor = %client.kind(),
                        message_id = ?receipt.message_id,
                        attempt = %(attempt + 1),
                        "Push delivered"
                    );
                    return DispatchOutcome::Success;
                }
                Ok(Err(e)) if e.is_transient() => {
                    warn!(
                        app_id = %job.app_id,
                        token = %token,
                        action_id = %action_id,
                        attempt = %(attempt + 1),
                        error = %e,
                        "Push attempt failed transiently"
                    );
                }
                Ok(Err(e)) => {
                    error!(
                        app_id = %job.app_id,
                        token = %token,
                        action_id = %action_id,
                        error = %e,
                        "Push rejected permanently"
                    );
                    return DispatchOutcome::Permanent;
                }
                Err(_) => {
                    warn!(
                        app_id = %job.app_id,
                        token = %token,
                        action_id = %action_id,
                        attempt = %(attempt + 1),
                        timeout_ms = %self.attempt_timeout.as_millis(),
                        "Push attempt deadline exceeded"
                    );
                }
            }
        }

        warn!(
            app_id = %job.app_id,
            token = %token,
            action_id = %action_id,
            attempts = %self.max_attempts,
            "Push retries exhausted, leaving entry pending"
        );
        DispatchOutcome::Transient
    }

    fn name(&self) -> &'static str {
        "PushDispatcher"
    }
}

//! Fan-out service: expands submissions into per-device stream entries.

use crate::codec;
use crate::error::{PushError, PushResult};
use crate::models::{BaseMessage, PushJob};
use crate::resolver::{DeviceBinding, TokenResolver, TokenSelector};
use futures::StreamExt;
use std::sync::Arc;
use stream_worker::StreamProducer;
use tracing::{info, warn};

/// Concurrent app-id resolutions during a broadcast fan-out.
const FAN_OUT_WIDTH: usize = 8;

/// One item of a batch submission.
#[derive(Debug, Clone)]
pub struct BatchPushItem {
    pub app_id: String,
    pub token: Option<String>,
    pub user_id: Option<String>,
    pub message: Option<BaseMessage>,
}

/// What a submission produced.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct EnqueueSummary {
    /// Jobs appended to the stream.
    pub enqueued: usize,
    /// Invalid or unresolvable items skipped.
    pub skipped: usize,
}

/// Producer-side push service: resolves device tokens and enqueues jobs.
pub struct PushService {
    resolver: Arc<dyn TokenResolver>,
    producer: StreamProducer,
}

impl PushService {
    pub fn new(resolver: Arc<dyn TokenResolver>, producer: StreamProducer) -> Self {
        Self { resolver, producer }
    }

    /// Broadcast one message to every known device of the given apps.
    ///
    /// App ids resolve concurrently (bounded width); any backend append
    /// failure aborts the submission so the caller can surface it.
    pub async fn push_to_all(
        &self,
        app_ids: &[String],
        message: &BaseMessage,
        action_id: Option<&str>,
    ) -> PushResult<EnqueueSummary> {
        if app_ids.is_empty() {
            return Err(PushError::Validation("app_ids is empty".to_string()));
        }
        if message.is_empty() {
            return Err(PushError::Validation("message is empty".to_string()));
        }

        let mut pending: Vec<
            std::pin::Pin<Box<dyn std::future::Future<Output = PushResult<usize>> + Send + '_>>,
        > = Vec::with_capacity(app_ids.len());
        for app_id in app_ids {
            pending.push(Box::pin(self.enqueue_for_app(app_id, message, action_id)));
        }
        let results: Vec<PushResult<usize>> = futures::stream::iter(pending)
            .buffer_unordered(FAN_OUT_WIDTH)
            .collect()
            .await;

        let mut summary = EnqueueSummary::default();
        for result in results {
            summary.enqueued += result?;
        }

        info!(
            apps = app_ids.len(),
            enqueued = summary.enqueued,
            action_id = %action_id.unwrap_or_default(),
            "Broadcast fan-out enqueued"
        );
        Ok(summary)
    }

    async fn enqueue_for_app(
        &self,
        app_id: &str,
        message: &BaseMessage,
        action_id: Option<&str>,
    ) -> PushResult<usize> {
        let bindings = self.resolver.resolve_app(app_id).await?;
        if bindings.is_empty() {
            warn!(app_id = %app_id, "No device tokens known for app");
            return Ok(0);
        }
        self.enqueue_bindings(&bindings, message, action_id).await
    }

    /// Enqueue each valid item of a batch submission.
    ///
    /// Invalid items (no app id, no selector, no message) and items whose
    /// selector resolves to nothing are skipped and logged; a non-empty
    /// per-item message wins over `global_message`. Backend failures abort.
    pub async fn batch_push(
        &self,
        items: &[BatchPushItem],
        global_message: Option<&BaseMessage>,
        action_id: Option<&str>,
    ) -> PushResult<EnqueueSummary> {
        let mut summary = EnqueueSummary::default();

        for item in items {
            let Some(message) = effective_message(item, global_message) else {
                warn!(app_id = %item.app_id, "Skipping push item without a message");
                summary.skipped += 1;
                continue;
            };
            if let Err(reason) = validate_item(item) {
                warn!(app_id = %item.app_id, reason = %reason, "Skipping invalid push item");
                summary.skipped += 1;
                continue;
            }

            let selector = TokenSelector {
                app_id: item.app_id.clone(),
                token: item.token.clone(),
                user_id: item.user_id.clone(),
            };
            let bindings = match self.resolver.resolve(&selector).await {
                Ok(bindings) => bindings,
                Err(e) => {
                    warn!(app_id = %item.app_id, error = %e, "Failed to resolve push item");
                    summary.skipped += 1;
                    continue;
                }
            };
            if bindings.is_empty() {
                warn!(app_id = %item.app_id, "Push item resolved to no device tokens");
                summary.skipped += 1;
                continue;
            }

            summary.enqueued += self.enqueue_bindings(&bindings, message, action_id).await?;
        }

        if summary.enqueued == 0 {
            return Err(PushError::Validation(
                "no valid push items were enqueued".to_string(),
            ));
        }

        info!(
            items = items.len(),
            enqueued = summary.enqueued,
            skipped = summary.skipped,
            action_id = %action_id.unwrap_or_default(),
            "Batch submission enqueued"
        );
        Ok(summary)
    }

    async fn enqueue_bindings(
        &self,
        bindings: &[DeviceBinding],
        message: &BaseMessage,
        action_id: Option<&str>,
    ) -> PushResult<usize> {
        let entries: Vec<Vec<(String, String)>> = bindings
            .iter()
            .map(|binding| {
                let job = PushJob::new(
                    &binding.app_id,
                    &binding.token,
                    binding.user_id.clone(),
                    action_id.map(String::from),
                    message,
                );
                codec::encode(&job)
            })
            .collect();

        let ids = self.producer.append_batch(&entries).await?;
        Ok(ids.len())
    }
}

/// A non-empty per-item message wins; `global_message` is the fallback.
pub(crate) fn effective_message<'a>(
    item: &'a BatchPushItem,
    global_message: Option<&'a BaseMessage>,
) -> Option<&'a BaseMessage> {
    match &item.message {
        Some(message) if !message.is_empty() => Some(message),
        _ => global_message.filter(|m| !m.is_empty()),
    }
}

/// An item needs an app id and at least one of token / user id.
pub(crate) fn validate_item(item: &BatchPushItem) -> Result<(), String> {
    if item.app_id.is_empty() {
        return Err("app_id is empty".to_string());
    }
    let has_token = item.token.as_deref().is_some_and(|t| !t.is_empty());
    let has_user = item.user_id.as_deref().is_some_and(|u| !u.is_empty());
    if !has_token && !has_user {
        return Err("neither token nor user_id is set".to_string());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(app_id: &str, token: Option<&str>, user_id: Option<&str>) -> BatchPushItem {
        BatchPushItem {
            app_id: app_id.to_string(),
            token: token.map(String::from),
            user_id: user_id.map(String::from),
            message: None,
        }
    }

    #[test]
    fn test_validate_item() {
        assert!(validate_item(&item("com.x.y", Some("tok1"), None)).is_ok());
        assert!(validate_item(&item("com.x.y", None, Some("u1"))).is_ok());
        assert!(validate_item(&item("", Some("tok1"), None)).is_err());
        assert!(validate_item(&item("com.x.y", None, None)).is_err());
        assert!(validate_item(&item("com.x.y", Some(""), Some(""))).is_err());
    }

    #[test]
    fn test_effective_message_item_wins() {
        let global = BaseMessage::new("global", "g");
        let mut i = item("com.x.y", Some("tok1"), None);
        i.message = Some(BaseMessage::new("item", "i"));

        let message = effective_message(&i, Some(&global)).unwrap();
        assert_eq!(message.title, "item");
    }

    #[test]
    fn test_effective_message_falls_back_to_global() {
        let global = BaseMessage::new("global", "g");

        let mut i = item("com.x.y", Some("tok1"), None);
        assert_eq!(effective_message(&i, Some(&global)).unwrap().title, "global");

        // an empty per-item message also falls back
        i.message = Some(BaseMessage::default());
        assert_eq!(effective_message(&i, Some(&global)).unwrap().title, "global");
    }

    #[test]
    fn test_effective_message_none() {
        let i = item("com.x.y", Some("tok1"), None);
        assert!(effective_message(&i, None).is_none());
        assert!(effective_message(&i, Some(&BaseMessage::default())).is_none());
    }
}

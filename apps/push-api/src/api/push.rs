//! Push submission handlers.

use crate::response::{ApiResponse, error_response};
use crate::state::AppState;
use axum::extract::{Json, State};
use axum::http::StatusCode;
use domain_push::{BaseMessage, BatchPushItem, PushJob, TokenSelector};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use tracing::{info, warn};
use uuid::Uuid;

/// Deadline for a vendor call on the synchronous endpoint.
const SYNC_PUSH_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Debug, Deserialize)]
pub struct PushMessagesForAllRequest {
    pub action_id: Option<String>,
    #[serde(default)]
    pub app_ids: Vec<String>,
    pub message: BaseMessage,
}

#[derive(Debug, Deserialize)]
pub struct MessageItem {
    #[serde(default)]
    pub app_id: String,
    pub token: Option<String>,
    pub user_id: Option<String>,
    pub message: Option<BaseMessage>,
}

impl From<MessageItem> for BatchPushItem {
    fn from(item: MessageItem) -> Self {
        Self {
            app_id: item.app_id,
            token: item.token,
            user_id: item.user_id,
            message: item.message,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct BatchPushRequest {
    pub global_message: Option<BaseMessage>,
    #[serde(default)]
    pub message_items: Vec<MessageItem>,
    pub action_id: Option<String>,
}

/// Broadcast one message to every known device of the given apps.
///
/// `POST /v1/push_messages_for_all`
pub async fn push_messages_for_all(
    State(state): State<AppState>,
    Json(req): Json<PushMessagesForAllRequest>,
) -> ApiResponse {
    let action_id = req
        .action_id
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    info!(
        action_id = %action_id,
        apps = req.app_ids.len(),
        "Received broadcast push submission"
    );

    match state
        .service
        .push_to_all(&req.app_ids, &req.message, Some(&action_id))
        .await
    {
        Ok(summary) => ApiResponse::ok(json!({
            "action_id": action_id,
            "enqueued": summary.enqueued,
        })),
        Err(e) => error_response(e),
    }
}

/// Enqueue each valid item of a batch submission.
///
/// `POST /v1/batch_push_messages_async`
pub async fn batch_push_messages_async(
    State(state): State<AppState>,
    Json(req): Json<BatchPushRequest>,
) -> ApiResponse {
    if req.message_items.is_empty() {
        return ApiResponse::error(StatusCode::BAD_REQUEST, "message_items is empty");
    }

    let action_id = req
        .action_id
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    info!(
        action_id = %action_id,
        items = req.message_items.len(),
        "Received batch push submission"
    );

    let items: Vec<BatchPushItem> = req.message_items.into_iter().map(Into::into).collect();

    match state
        .service
        .batch_push(&items, req.global_message.as_ref(), Some(&action_id))
        .await
    {
        Ok(summary) => ApiResponse::ok(json!({
            "action_id": action_id,
            "enqueued": summary.enqueued,
            "skipped": summary.skipped,
        })),
        Err(e) => error_response(e),
    }
}

#[derive(Debug, Deserialize)]
pub struct PushMessagesRequest {
    #[serde(default)]
    pub app_id: String,
    pub token: Option<String>,
    pub user_id: Option<String>,
    pub message: BaseMessage,
}

#[derive(Debug, Serialize)]
pub struct PushMessagesRespItem {
    pub user_id: Option<String>,
    pub token: String,
    /// 0 failed, 1 succeeded
    pub push_status: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Synchronous variant: resolve the selector and push through the vendor
/// clients directly, one attempt per token.
///
/// `POST /v1/push_messages`
pub async fn push_messages(
    State(state): State<AppState>,
    Json(req): Json<PushMessagesRequest>,
) -> ApiResponse {
    if req.app_id.is_empty() {
        return ApiResponse::error(StatusCode::BAD_REQUEST, "app_id is empty");
    }
    if req.token.is_none() && req.user_id.is_none() {
        return ApiResponse::error(StatusCode::BAD_REQUEST, "neither token nor user_id is set");
    }

    let selector = TokenSelector {
        app_id: req.app_id.clone(),
        token: req.token,
        user_id: req.user_id,
    };
    let bindings = match state.resolver.resolve(&selector).await {
        Ok(bindings) => bindings,
        Err(e) => return error_response(e),
    };
    if bindings.is_empty() {
        return ApiResponse::error(StatusCode::BAD_REQUEST, "no device tokens match the request");
    }

    let Some(client) = state.registry.lookup(&req.app_id) else {
        return ApiResponse::error(
            StatusCode::BAD_REQUEST,
            format!("app id '{}' does not match any configured client", req.app_id),
        );
    };

    let mut results = Vec::with_capacity(bindings.len());
    for binding in bindings {
        let job = PushJob::new(
            &binding.app_id,
            &binding.token,
            binding.user_id.clone(),
            None,
            &req.message,
        );

        let item = match tokio::time::timeout(SYNC_PUSH_TIMEOUT, client.push(&job)).await {
            Ok(Ok(_)) => PushMessagesRespItem {
                user_id: binding.user_id,
                token: binding.token,
                push_status: 1,
                reason: None,
            },
            Ok(Err(e)) => {
                warn!(app_id = %req.app_id, error = %e, "Synchronous push failed");
                PushMessagesRespItem {
                    user_id: binding.user_id,
                    token: binding.token,
                    push_status: 0,
                    reason: Some(e.to_string()),
                }
            }
            Err(_) => PushMessagesRespItem {
                user_id: binding.user_id,
                token: binding.token,
                push_status: 0,
                reason: Some("vendor call timed out".to_string()),
            },
        };
        results.push(item);
    }

    ApiResponse::ok(json!(results))
}

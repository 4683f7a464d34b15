//! Response envelope.
//!
//! Every endpoint replies `{status, message, data?, timestamp}`; the HTTP
//! status code and the `status` field carry the same value.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use domain_push::PushError;
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Serialize)]
pub struct ApiResponse {
    pub status: u16,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    pub timestamp: i64,
}

impl ApiResponse {
    fn new(status: StatusCode, message: impl Into<String>, data: Option<Value>) -> Self {
        Self {
            status: status.as_u16(),
            message: message.into(),
            data,
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }

    pub fn ok(data: Value) -> Self {
        Self::new(StatusCode::OK, "ok", Some(data))
    }

    pub fn error(status: StatusCode, message: impl Into<String>) -> Self {
        Self::new(status, message, None)
    }
}

impl IntoResponse for ApiResponse {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self)).into_response()
    }
}

/// Map a domain error to the envelope: bad submissions are the caller's
/// fault, backend failures are ours.
pub fn error_response(err: PushError) -> ApiResponse {
    let status = match &err {
        PushError::Validation(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    ApiResponse::error(status, err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_ok_envelope_shape() {
        let resp = ApiResponse::ok(json!({"action_id": "act-1"}));
        let value = serde_json::to_value(&resp).unwrap();

        assert_eq!(value["status"], 200);
        assert_eq!(value["message"], "ok");
        assert_eq!(value["data"]["action_id"], "act-1");
        assert!(value["timestamp"].is_i64());
    }

    #[test]
    fn test_error_envelope_omits_data() {
        let resp = ApiResponse::error(StatusCode::BAD_REQUEST, "app_ids is empty");
        let value = serde_json::to_value(&resp).unwrap();

        assert_eq!(value["status"], 400);
        assert!(value.get("data").is_none());
    }

    #[test]
    fn test_error_response_mapping() {
        let resp = error_response(PushError::Validation("bad".to_string()));
        assert_eq!(resp.status, 400);

        let resp = error_response(PushError::Backend("redis down".to_string()));
        assert_eq!(resp.status, 500);
    }
}

//! Data models for the push domain.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The logical notification content a caller submits.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseMessage {
    /// Notification title.
    #[serde(default)]
    pub title: String,
    /// Notification body.
    #[serde(default)]
    pub body: String,
    /// Custom key/value payload forwarded to the client.
    #[serde(default)]
    pub data: HashMap<String, String>,
}

impl BaseMessage {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            data: HashMap::new(),
        }
    }

    pub fn with_data(mut self, data: HashMap<String, String>) -> Self {
        self.data = data;
        self
    }

    /// A message with neither title nor body carries nothing to show.
    pub fn is_empty(&self) -> bool {
        self.title.is_empty() && self.body.is_empty()
    }
}

/// A single, fully-resolved delivery intent: one app id, one device token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushJob {
    /// Target app (APNs bundle id or FCM package name). Must resolve in the
    /// client registry at dispatch time.
    pub app_id: String,
    /// Device token to deliver to.
    pub token: String,
    /// Owning user, when known.
    pub user_id: Option<String>,
    /// Caller-supplied correlation id grouping jobs from one submission.
    pub action_id: Option<String>,
    /// Notification title.
    pub title: String,
    /// Notification body.
    pub body: String,
    /// Custom key/value payload.
    pub data: HashMap<String, String>,
}

impl PushJob {
    pub fn new(
        app_id: impl Into<String>,
        token: impl Into<String>,
        user_id: Option<String>,
        action_id: Option<String>,
        message: &BaseMessage,
    ) -> Self {
        Self {
            app_id: app_id.into(),
            token: token.into(),
            user_id,
            action_id,
            title: message.title.clone(),
            body: message.body.clone(),
            data: message.data.clone(),
        }
    }

    /// Token form safe for log lines.
    pub fn redacted_token(&self) -> String {
        redact_token(&self.token)
    }
}

/// Keep the first and last four characters of a token, mask the rest.
pub fn redact_token(token: &str) -> String {
    let chars: Vec<char> = token.chars().collect();
    if chars.len() <= 8 {
        "***".to_string()
    } else {
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{head}***{tail}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_message_is_empty() {
        assert!(BaseMessage::default().is_empty());
        assert!(!BaseMessage::new("t", "").is_empty());
        assert!(!BaseMessage::new("", "b").is_empty());
    }

    #[test]
    fn test_push_job_from_message() {
        let mut data = HashMap::new();
        data.insert("k".to_string(), "v".to_string());
        let message = BaseMessage::new("t", "b").with_data(data);

        let job = PushJob::new(
            "com.x.y",
            "tok1",
            Some("u1".to_string()),
            Some("act-1".to_string()),
            &message,
        );

        assert_eq!(job.app_id, "com.x.y");
        assert_eq!(job.token, "tok1");
        assert_eq!(job.title, "t");
        assert_eq!(job.data.get("k").map(String::as_str), Some("v"));
    }

    #[test]
    fn test_redact_token() {
        assert_eq!(redact_token("short"), "***");
        assert_eq!(redact_token("abcdefghijkl"), "abcd***ijkl");
    }
}

//! Flat field-map codec for `PushJob`.
//!
//! The stream wire contract is a flat string-to-string mapping so each
//! attribute is an individual entry field:
//!
//! ```text
//! app_id     target app id
//! token      device token
//! user_id    optional user id
//! action_id  optional correlation id
//! title      notification title
//! body       notification body
//! data       JSON-encoded object of string -> string
//! ```

use crate::error::{PushError, PushResult};
use crate::models::PushJob;
use std::collections::HashMap;
use stream_worker::StreamEntry;

pub const FIELD_APP_ID: &str = "app_id";
pub const FIELD_TOKEN: &str = "token";
pub const FIELD_USER_ID: &str = "user_id";
pub const FIELD_ACTION_ID: &str = "action_id";
pub const FIELD_TITLE: &str = "title";
pub const FIELD_BODY: &str = "body";
pub const FIELD_DATA: &str = "data";

/// Encode a job into the flat field list appended to the stream.
///
/// Optional fields are omitted when absent; `data` is omitted when empty.
pub fn encode(job: &PushJob) -> Vec<(String, String)> {
    let mut fields = vec![
        (FIELD_APP_ID.to_string(), job.app_id.clone()),
        (FIELD_TOKEN.to_string(), job.token.clone()),
        (FIELD_TITLE.to_string(), job.title.clone()),
        (FIELD_BODY.to_string(), job.body.clone()),
    ];

    if let Some(user_id) = &job.user_id {
        fields.push((FIELD_USER_ID.to_string(), user_id.clone()));
    }
    if let Some(action_id) = &job.action_id {
        fields.push((FIELD_ACTION_ID.to_string(), action_id.clone()));
    }
    if !job.data.is_empty() {
        // HashMap<String, String> serialization cannot fail
        let data_json = serde_json::to_string(&job.data).unwrap_or_else(|_| "{}".to_string());
        fields.push((FIELD_DATA.to_string(), data_json));
    }

    fields
}

/// Decode a job from an entry's field map.
pub fn decode(fields: &HashMap<String, String>) -> PushResult<PushJob> {
    let app_id = required(fields, FIELD_APP_ID)?;
    let token = required(fields, FIELD_TOKEN)?;

    let data = match fields.get(FIELD_DATA) {
        Some(raw) => serde_json::from_str::<HashMap<String, String>>(raw)
            .map_err(|e| PushError::Decode(format!("invalid '{FIELD_DATA}' field: {e}")))?,
        None => HashMap::new(),
    };

    Ok(PushJob {
        app_id,
        token,
        user_id: fields.get(FIELD_USER_ID).cloned(),
        action_id: fields.get(FIELD_ACTION_ID).cloned(),
        title: fields.get(FIELD_TITLE).cloned().unwrap_or_default(),
        body: fields.get(FIELD_BODY).cloned().unwrap_or_default(),
        data,
    })
}

/// Decode a job straight from a stream entry.
pub fn decode_entry(entry: &StreamEntry) -> PushResult<PushJob> {
    decode(&entry.fields)
}

fn required(fields: &HashMap<String, String>, key: &str) -> PushResult<String> {
    match fields.get(key) {
        Some(value) if !value.is_empty() => Ok(value.clone()),
        Some(_) => Err(PushError::Decode(format!("empty '{key}' field"))),
        None => Err(PushError::Decode(format!("missing '{key}' field"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BaseMessage;

    fn sample_job() -> PushJob {
        let mut data = HashMap::new();
        data.insert("k".to_string(), "v".to_string());
        data.insert("book_id".to_string(), "510000751".to_string());
        PushJob::new(
            "com.x.y",
            "tok1",
            Some("u1".to_string()),
            Some("act-1".to_string()),
            &BaseMessage::new("t", "b").with_data(data),
        )
    }

    #[test]
    fn test_round_trip() {
        let job = sample_job();
        let fields: HashMap<String, String> = encode(&job).into_iter().collect();
        let decoded = decode(&fields).unwrap();
        assert_eq!(decoded, job);
    }

    #[test]
    fn test_round_trip_without_optionals() {
        let job = PushJob::new("com.x.y", "tok1", None, None, &BaseMessage::new("t", "b"));
        let fields: HashMap<String, String> = encode(&job).into_iter().collect();

        assert!(!fields.contains_key(FIELD_USER_ID));
        assert!(!fields.contains_key(FIELD_ACTION_ID));
        assert!(!fields.contains_key(FIELD_DATA));

        let decoded = decode(&fields).unwrap();
        assert_eq!(decoded, job);
    }

    #[test]
    fn test_decode_missing_app_id() {
        let mut fields = HashMap::new();
        fields.insert(FIELD_TOKEN.to_string(), "tok1".to_string());

        let err = decode(&fields).unwrap_err();
        assert!(matches!(err, PushError::Decode(_)));
        assert!(err.to_string().contains("app_id"));
    }

    #[test]
    fn test_decode_empty_token() {
        let mut fields = HashMap::new();
        fields.insert(FIELD_APP_ID.to_string(), "com.x.y".to_string());
        fields.insert(FIELD_TOKEN.to_string(), String::new());

        let err = decode(&fields).unwrap_err();
        assert!(matches!(err, PushError::Decode(_)));
    }

    #[test]
    fn test_decode_invalid_data_json() {
        let mut fields = HashMap::new();
        fields.insert(FIELD_APP_ID.to_string(), "com.x.y".to_string());
        fields.insert(FIELD_TOKEN.to_string(), "tok1".to_string());
        fields.insert(FIELD_DATA.to_string(), "{not json".to_string());

        let err = decode(&fields).unwrap_err();
        assert!(matches!(err, PushError::Decode(_)));
    }

    #[test]
    fn test_decode_entry() {
        let job = sample_job();
        let fields: HashMap<String, String> = encode(&job).into_iter().collect();
        let entry = StreamEntry::new("1-0", fields);

        assert_eq!(decode_entry(&entry).unwrap(), job);
    }
}

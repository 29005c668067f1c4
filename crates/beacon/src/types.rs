//! Wire types and serialization.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;

/// SDK name reported in `context.library` and the `User-Agent` header.
pub const LIBRARY_NAME: &str = env!("CARGO_PKG_NAME");

/// SDK version reported in `context.library` and the `User-Agent` header.
pub const LIBRARY_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Kind of event, written to the payload's `type` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    Track,
    Identify,
    /// Legacy event shape keyed by `distinctId`.
    Alert,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Track => "track",
            EventType::Identify => "identify",
            EventType::Alert => "alert",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// SDK metadata.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Library {
    pub name: String,
    pub version: String,
}

impl Library {
    pub(crate) fn current() -> Self {
        Self {
            name: LIBRARY_NAME.into(),
            version: LIBRARY_VERSION.into(),
        }
    }
}

/// Event context. `library` always describes this SDK.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Context {
    pub library: Library,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Canonical wire form of one event.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Payload {
    #[serde(flatten)]
    pub fields: Map<String, Value>,
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub message_id: String,
    pub timestamp: DateTime<Utc>,
    pub sent_at: Option<DateTime<Utc>>,
    pub received_at: Option<DateTime<Utc>>,
    pub context: Context,
}

/// Body of `POST /event/batch/`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchRequest<'a> {
    pub batch: &'a [Payload],
    pub sent_at: DateTime<Utc>,
}

/// Result of a successful flush.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchResponse {
    /// Number of events sent in the request.
    pub batch_size: usize,
    /// Response body, `Value::Null` when empty or not JSON.
    pub body: Value,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn sample_payload() -> Payload {
        let mut fields = Map::new();
        fields.insert("event".into(), json!("signup"));
        fields.insert("userId".into(), json!("usr_123"));
        Payload {
            fields,
            event_type: EventType::Track,
            message_id: "msg_1".into(),
            timestamp: Utc.with_ymd_and_hms(2024, 1, 28, 0, 0, 0).unwrap(),
            sent_at: None,
            received_at: None,
            context: Context {
                library: Library::current(),
                extra: Map::new(),
            },
        }
    }

    #[test]
    fn test_payload_camel_case() {
        let json = serde_json::to_value(sample_payload()).unwrap();

        assert_eq!(json["type"], "track");
        assert_eq!(json["messageId"], "msg_1");
        assert_eq!(json["event"], "signup");
        assert_eq!(json["userId"], "usr_123");
        assert!(json.get("message_id").is_none());
    }

    #[test]
    fn test_payload_null_timestamps_serialized() {
        let json = serde_json::to_value(sample_payload()).unwrap();

        assert!(json["sentAt"].is_null());
        assert!(json["receivedAt"].is_null());
        assert_eq!(json["timestamp"], "2024-01-28T00:00:00Z");
    }

    #[test]
    fn test_context_library() {
        let json = serde_json::to_value(sample_payload()).unwrap();

        assert_eq!(json["context"]["library"]["name"], LIBRARY_NAME);
        assert_eq!(json["context"]["library"]["version"], LIBRARY_VERSION);
    }

    #[test]
    fn test_event_type_strings() {
        assert_eq!(EventType::Track.to_string(), "track");
        assert_eq!(EventType::Identify.to_string(), "identify");
        assert_eq!(
            serde_json::to_value(EventType::Alert).unwrap(),
            json!("alert")
        );
    }

    #[test]
    fn test_batch_request_structure() {
        let payloads = vec![sample_payload()];
        let request = BatchRequest {
            batch: &payloads,
            sent_at: Utc.with_ymd_and_hms(2024, 1, 28, 0, 0, 1).unwrap(),
        };

        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["batch"].as_array().unwrap().len(), 1);
        assert_eq!(json["sentAt"], "2024-01-28T00:00:01Z");
    }
}

//! Turns validated events into wire payloads.

use crate::event::Event;
use crate::types::{Context, EventType, Library, Payload};
use chrono::{DateTime, Utc};
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Length of generated message ids.
const SHORT_ID_LEN: usize = 21;

/// Fields owned by the SDK. Caller values are consumed or discarded.
const RESERVED_FIELDS: &[&str] = &["sentAt", "receivedAt"];

/// Build the payload for an already validated event.
pub(crate) fn build_payload(event_type: EventType, event: &Event) -> Payload {
    build_payload_with(event_type, event, Utc::now(), short_id)
}

/// Build a payload with an explicit clock reading and id generator.
pub(crate) fn build_payload_with(
    event_type: EventType,
    event: &Event,
    now: DateTime<Utc>,
    generate_id: impl FnOnce() -> String,
) -> Payload {
    let mut fields = event.fields().cloned().unwrap_or_default();

    fields.remove("type");
    for field in RESERVED_FIELDS {
        fields.remove(*field);
    }

    let timestamp = fields
        .remove("timestamp")
        .as_ref()
        .and_then(Value::as_str)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|ts| ts.with_timezone(&Utc))
        .unwrap_or(now);

    let caller_message_id = match fields.remove("messageId") {
        Some(Value::String(id)) if !id.is_empty() => Some(id),
        _ => None,
    };

    let mut extra = match fields.remove("context") {
        Some(Value::Object(map)) => map,
        _ => Map::new(),
    };
    extra.remove("library");

    let mut payload = Payload {
        fields,
        event_type,
        message_id: String::new(),
        timestamp,
        sent_at: None,
        received_at: None,
        context: Context {
            library: Library::current(),
            extra,
        },
    };

    payload.message_id = match caller_message_id {
        Some(id) => id,
        None => {
            let id = generate_id();
            if id.is_empty() {
                fallback_id(&payload)
            } else {
                id
            }
        }
    };

    payload
}

/// Random alphanumeric id.
pub(crate) fn short_id() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SHORT_ID_LEN)
        .map(char::from)
        .collect()
}

/// SHA-256 of the serialized payload salted with a random UUID.
fn fallback_id(payload: &Payload) -> String {
    let serialized = serde_json::to_string(payload).unwrap_or_default();
    let mut hasher = Sha256::new();
    hasher.update(serialized.as_bytes());
    hasher.update(Uuid::new_v4().to_string().as_bytes());
    hex::encode(hasher.finalize())
}

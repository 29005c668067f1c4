//! Event validation.
//!
//! Checks run synchronously before an event is queued:
//!
//! - the event must be a JSON object under [`MAX_EVENT_SIZE`] bytes once serialized;
//! - known fields, when set, must have one of the categories in [`FIELD_SCHEMA`];
//! - each [`EventType`] has fields that must be set.
//!
//! Unset optional fields (absent, `null`, `false`, `""` or `0`) are skipped.

use crate::error::ValidationError;
use crate::event::Event;
use crate::types::EventType;
use chrono::DateTime;
use serde_json::Value;
use std::fmt;

/// Serialized events must be strictly smaller than this many bytes.
pub const MAX_EVENT_SIZE: usize = 32 * 1024;

/// Structural category of a JSON value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    String,
    Number,
    Bool,
    Object,
    Array,
    /// An RFC 3339 timestamp string.
    Date,
}

impl FieldKind {
    /// Whether `value` belongs to this category.
    pub fn matches(self, value: &Value) -> bool {
        match (self, value) {
            (FieldKind::String, Value::String(_)) => true,
            (FieldKind::Number, Value::Number(_)) => true,
            (FieldKind::Bool, Value::Bool(_)) => true,
            (FieldKind::Object, Value::Object(_)) => true,
            (FieldKind::Array, Value::Array(_)) => true,
            (FieldKind::Date, Value::String(s)) => DateTime::parse_from_rfc3339(s).is_ok(),
            _ => false,
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldKind::String => "a string",
            FieldKind::Number => "a number",
            FieldKind::Bool => "a boolean",
            FieldKind::Object => "an object",
            FieldKind::Array => "an array",
            FieldKind::Date => "an RFC 3339 date",
        };
        f.write_str(name)
    }
}

/// Allowed categories for the fields the SDK knows about.
pub const FIELD_SCHEMA: &[(&str, &[FieldKind])] = &[
    ("event", &[FieldKind::String]),
    ("name", &[FieldKind::String]),
    ("message", &[FieldKind::String]),
    ("properties", &[FieldKind::Object]),
    ("traits", &[FieldKind::Object]),
    ("context", &[FieldKind::Object]),
    ("alias", &[FieldKind::String]),
    ("timestamp", &[FieldKind::Date]),
    ("distinctId", &[FieldKind::String, FieldKind::Number]),
    ("userId", &[FieldKind::String, FieldKind::Number]),
    ("messageId", &[FieldKind::String]),
    ("type", &[FieldKind::String]),
];

/// Fields that must be set for each event type.
pub fn required_fields(event_type: EventType) -> &'static [&'static str] {
    match event_type {
        EventType::Track => &["event", "userId"],
        EventType::Identify => &["userId"],
        EventType::Alert => &["message", "name"],
    }
}

/// Validate `event` as an event of `event_type`.
pub fn validate(event: &Event, event_type: EventType) -> Result<(), ValidationError> {
    let Some(fields) = event.fields() else {
        return Err(ValidationError::NotAnObject);
    };

    let size = event.as_value().to_string().len();
    if size >= MAX_EVENT_SIZE {
        return Err(ValidationError::TooLarge {
            size,
            limit: MAX_EVENT_SIZE,
        });
    }

    for &(field, kinds) in FIELD_SCHEMA {
        let Some(value) = fields.get(field) else {
            continue;
        };
        if is_unset(value) {
            continue;
        }
        if !kinds.iter().any(|kind| kind.matches(value)) {
            return Err(ValidationError::InvalidField {
                field,
                expected: describe(kinds),
            });
        }
    }

    for &field in required_fields(event_type) {
        if fields.get(field).map_or(true, is_unset) {
            return Err(ValidationError::MissingField {
                event_type: event_type.as_str(),
                field,
            });
        }
    }

    Ok(())
}

/// `null`, `false`, `""` and `0` count as not set.
pub(crate) fn is_unset(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::String(s) => s.is_empty(),
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::Array(_) | Value::Object(_) => false,
    }
}

fn describe(kinds: &[FieldKind]) -> String {
    kinds
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" or ")
}

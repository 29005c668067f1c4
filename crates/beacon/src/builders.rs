//! Event builders for fluent API.

use crate::event::Event;
use crate::types::EventType;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;

/// User identifier. Strings and integers are accepted.
#[derive(Debug, Clone, PartialEq)]
pub struct UserId(pub(crate) Value);

impl From<&str> for UserId {
    fn from(id: &str) -> Self {
        UserId(Value::from(id))
    }
}

impl From<String> for UserId {
    fn from(id: String) -> Self {
        UserId(Value::from(id))
    }
}

impl From<i64> for UserId {
    fn from(id: i64) -> Self {
        UserId(Value::from(id))
    }
}

impl From<u64> for UserId {
    fn from(id: u64) -> Self {
        UserId(Value::from(id))
    }
}

impl From<UserId> for Value {
    fn from(id: UserId) -> Value {
        id.0
    }
}

fn rfc3339(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Builders that produce a raw [`Event`] of a fixed type.
pub(crate) trait BuildEvent {
    const EVENT_TYPE: EventType;

    fn build(self) -> Event;
}

// ============================================
// TRACK BUILDER
// ============================================

/// Builder for track events.
#[derive(Debug)]
pub struct TrackBuilder {
    event: Event,
}

impl TrackBuilder {
    pub(crate) fn new(event_name: impl Into<String>, user_id: impl Into<UserId>) -> Self {
        let mut event = Event::new();
        event.set("event", Value::String(event_name.into()));
        let user_id: UserId = user_id.into();
        event.set("userId", user_id);
        Self { event }
    }

    /// Add a property.
    pub fn property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.event.set_nested("properties", key, value.into());
        self
    }

    /// Set a custom timestamp.
    pub fn timestamp(mut self, ts: DateTime<Utc>) -> Self {
        self.event.set("timestamp", rfc3339(ts));
        self
    }

    /// Set the idempotency key instead of generating one.
    pub fn message_id(mut self, id: impl Into<String>) -> Self {
        self.event.set("messageId", Value::String(id.into()));
        self
    }

    /// Add a context entry.
    pub fn context(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.event.set_nested("context", key, value.into());
        self
    }
}

impl BuildEvent for TrackBuilder {
    const EVENT_TYPE: EventType = EventType::Track;

    fn build(self) -> Event {
        self.event
    }
}

// ============================================
// IDENTIFY BUILDER
// ============================================

/// Builder for identify events.
#[derive(Debug)]
pub struct IdentifyBuilder {
    event: Event,
}

impl IdentifyBuilder {
    pub(crate) fn new(user_id: impl Into<UserId>) -> Self {
        let mut event = Event::new();
        let user_id: UserId = user_id.into();
        event.set("userId", user_id);
        Self { event }
    }

    /// Add a trait (using trait_ because trait is reserved).
    pub fn trait_(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.event.set_nested("traits", key, value.into());
        self
    }

    /// Set a custom timestamp.
    pub fn timestamp(mut self, ts: DateTime<Utc>) -> Self {
        self.event.set("timestamp", rfc3339(ts));
        self
    }

    /// Set the idempotency key instead of generating one.
    pub fn message_id(mut self, id: impl Into<String>) -> Self {
        self.event.set("messageId", Value::String(id.into()));
        self
    }
}

impl BuildEvent for IdentifyBuilder {
    const EVENT_TYPE: EventType = EventType::Identify;

    fn build(self) -> Event {
        self.event
    }
}

// ============================================
// ALERT BUILDER
// ============================================

/// Builder for legacy alert events.
#[derive(Debug)]
pub struct AlertBuilder {
    event: Event,
}

impl AlertBuilder {
    pub(crate) fn new(
        distinct_id: impl Into<UserId>,
        name: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        let mut event = Event::new();
        let distinct_id: UserId = distinct_id.into();
        event.set("distinctId", distinct_id);
        event.set("name", Value::String(name.into()));
        event.set("message", Value::String(message.into()));
        Self { event }
    }

    /// Add a property.
    pub fn property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.event.set_nested("properties", key, value.into());
        self
    }

    /// Set a custom timestamp.
    pub fn timestamp(mut self, ts: DateTime<Utc>) -> Self {
        self.event.set("timestamp", rfc3339(ts));
        self
    }
}

impl BuildEvent for AlertBuilder {
    const EVENT_TYPE: EventType = EventType::Alert;

    fn build(self) -> Event {
        self.event
    }
}

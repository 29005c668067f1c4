//! Raw caller events.

use serde_json::{Map, Value};

/// A caller-supplied event, before validation.
///
/// Usually produced by the fluent builders, but any JSON value can be
/// wrapped; non-objects are rejected at validation time.
#[derive(Debug, Clone, PartialEq)]
pub struct Event(Value);

impl Event {
    /// Empty event object.
    pub fn new() -> Self {
        Self(Value::Object(Map::new()))
    }

    /// Wrap an arbitrary JSON value.
    pub fn from_value(value: Value) -> Self {
        Self(value)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }

    /// Object fields, or `None` if the event is not an object.
    pub fn fields(&self) -> Option<&Map<String, Value>> {
        self.0.as_object()
    }

    /// Look up a top-level field.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Set a top-level field. Replaces a non-object event with an object.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        if !self.0.is_object() {
            self.0 = Value::Object(Map::new());
        }
        if let Value::Object(map) = &mut self.0 {
            map.insert(key.into(), value.into());
        }
    }

    /// Insert into a nested object field such as `properties` or `traits`.
    pub(crate) fn set_nested(&mut self, field: &str, key: impl Into<String>, value: Value) {
        if !matches!(self.get(field), Some(Value::Object(_))) {
            self.set(field, Value::Object(Map::new()));
        }
        if let Some(Value::Object(map)) = self.0.get_mut(field) {
            map.insert(key.into(), value);
        }
    }
}

impl Default for Event {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Value> for Event {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

impl From<Map<String, Value>> for Event {
    fn from(map: Map<String, Value>) -> Self {
        Self(Value::Object(map))
    }
}

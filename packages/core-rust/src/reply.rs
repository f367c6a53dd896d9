//! Procedure replies and their wire encoding.
//!
//! A [`Reply`] is what a procedure hands back on a structurally successful
//! call, including domain failures such as `"user already exists"`, which
//! are ordinary [`Reply::Str`] values. The response body is the reply
//! itself, never wrapped.
//!
//! Two shapes stand for "nothing":
//! - [`Reply::Unit`] encodes as bare `null` and means "done, no payload".
//! - [`Reply::NoValue`] encodes as `{"isNone": true, "val": null}` and means
//!   "looked for it, found nothing". It never overlaps a domain value.

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

/// Key that tags the no-value marker object.
pub const NO_VALUE_TAG: &str = "isNone";
/// Key holding the (always `null`) payload of the no-value marker.
pub const NO_VALUE_VAL: &str = "val";

/// The closed set of shapes a procedure may return.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// Side-effect-only success. Encodes as `null`.
    Unit,
    /// Lookup found nothing. Encodes as the tagged no-value marker.
    NoValue,
    /// A string, including domain error strings.
    Str(String),
    /// A structured record. Key order is preserved on the wire.
    Record(Map<String, Value>),
    /// Any other JSON value (numbers, booleans, sequences).
    Json(Value),
}

impl Reply {
    /// Shorthand for a string reply.
    #[must_use]
    pub fn text(s: impl Into<String>) -> Self {
        Self::Str(s.into())
    }

    /// Returns the string payload, if this is a string reply.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Converts the reply into the JSON value it encodes to.
    #[must_use]
    pub fn to_value(&self) -> Value {
        match self {
            Self::Unit => Value::Null,
            Self::NoValue => no_value_marker(),
            Self::Str(s) => Value::String(s.clone()),
            Self::Record(map) => Value::Object(map.clone()),
            Self::Json(v) => v.clone(),
        }
    }

    /// Encodes the reply as a response body.
    ///
    /// # Errors
    ///
    /// Returns an error only if a nested value cannot be represented as
    /// JSON, which `serde_json::Value` content never triggers.
    pub fn encode(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}

impl Serialize for Reply {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Unit => serializer.serialize_unit(),
            Self::NoValue => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry(NO_VALUE_TAG, &true)?;
                map.serialize_entry(NO_VALUE_VAL, &Value::Null)?;
                map.end()
            }
            Self::Str(s) => serializer.serialize_str(s),
            Self::Record(map) => map.serialize(serializer),
            Self::Json(v) => v.serialize(serializer),
        }
    }
}

impl From<String> for Reply {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<&str> for Reply {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<Map<String, Value>> for Reply {
    fn from(map: Map<String, Value>) -> Self {
        Self::Record(map)
    }
}

/// The no-value marker as a plain JSON value.
#[must_use]
pub fn no_value_marker() -> Value {
    let mut map = Map::with_capacity(2);
    map.insert(NO_VALUE_TAG.to_string(), Value::Bool(true));
    map.insert(NO_VALUE_VAL.to_string(), Value::Null);
    Value::Object(map)
}

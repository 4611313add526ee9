//! Typed constructors for log attributes.
//!
//! All call sites build fields through these helpers so that the value set
//! stays closed and every sink can serialize it without type inspection.

use crate::schema::{LABELS_KEY, SERVICE_CONTEXT_KEY};
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

/// A key/value pair attached to a log record.
#[derive(Debug, Clone, PartialEq)]
pub struct Attr {
    pub key: String,
    pub value: AttrValue,
}

/// Value of an [`Attr`].
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Duration(Duration),
    /// String representation of an error.
    Error(String),
    /// Pre-serialized structured payload.
    Structured(Value),
    /// Nested attributes, rendered as a JSON object.
    Group(Vec<Attr>),
}

impl Attr {
    pub fn new(key: impl Into<String>, value: AttrValue) -> Self {
        Attr {
            key: key.into(),
            value,
        }
    }

    /// A group with no members carries nothing and is skipped by sinks.
    pub fn is_empty_group(&self) -> bool {
        matches!(&self.value, AttrValue::Group(attrs) if attrs.is_empty())
    }
}

impl AttrValue {
    /// JSON rendering used by the stream sink.
    ///
    /// Durations are encoded as integer nanoseconds. Non-finite floats have no
    /// JSON number form and are written as strings.
    pub fn to_json(&self) -> Value {
        match self {
            AttrValue::Str(s) | AttrValue::Error(s) => Value::String(s.clone()),
            AttrValue::Int(i) => Value::from(*i),
            AttrValue::Float(f) => serde_json::Number::from_f64(*f)
                .map(Value::Number)
                .unwrap_or_else(|| Value::String(f.to_string())),
            AttrValue::Bool(b) => Value::Bool(*b),
            AttrValue::Duration(d) => {
                Value::from(u64::try_from(d.as_nanos()).unwrap_or(u64::MAX))
            }
            AttrValue::Structured(v) => v.clone(),
            AttrValue::Group(attrs) => {
                let mut map = serde_json::Map::new();
                for attr in attrs {
                    crate::json::insert_attr(&mut map, attr);
                }
                Value::Object(map)
            }
        }
    }
}

pub fn string(key: impl Into<String>, value: impl Into<String>) -> Attr {
    Attr::new(key, AttrValue::Str(value.into()))
}

pub fn int(key: impl Into<String>, value: i64) -> Attr {
    Attr::new(key, AttrValue::Int(value))
}

pub fn int32(key: impl Into<String>, value: i32) -> Attr {
    Attr::new(key, AttrValue::Int(i64::from(value)))
}

pub fn int64(key: impl Into<String>, value: i64) -> Attr {
    int(key, value)
}

pub fn float32(key: impl Into<String>, value: f32) -> Attr {
    Attr::new(key, AttrValue::Float(f64::from(value)))
}

pub fn float64(key: impl Into<String>, value: f64) -> Attr {
    Attr::new(key, AttrValue::Float(value))
}

pub fn boolean(key: impl Into<String>, value: bool) -> Attr {
    Attr::new(key, AttrValue::Bool(value))
}

pub fn duration(key: impl Into<String>, value: Duration) -> Attr {
    Attr::new(key, AttrValue::Duration(value))
}

/// Error attribute under the fixed key `error`.
pub fn error(err: &(dyn std::error::Error + '_)) -> Attr {
    Attr::new("error", AttrValue::Error(err.to_string()))
}

/// Catch-all for values that are already JSON.
///
/// Prefer the typed helpers when the type is known.
pub fn any(key: impl Into<String>, value: Value) -> Attr {
    match value {
        Value::String(s) => string(key, s),
        Value::Bool(b) => boolean(key, b),
        Value::Number(n) => match (n.as_i64(), n.as_f64()) {
            (Some(i), _) => int(key, i),
            (None, Some(f)) if n.is_f64() => float64(key, f),
            _ => Attr::new(key, AttrValue::Structured(Value::Number(n))),
        },
        other => Attr::new(key, AttrValue::Structured(other)),
    }
}

/// Serializes `value` into a structured payload.
///
/// Logging must not fail because a payload could not be encoded, so a
/// serialization failure yields an [`error`] attribute instead.
pub fn structured<T: Serialize + ?Sized>(key: impl Into<String>, value: &T) -> Attr {
    match serde_json::to_value(value) {
        Ok(v) => Attr::new(key, AttrValue::Structured(v)),
        Err(e) => error(&e),
    }
}

pub fn group(key: impl Into<String>, attrs: impl IntoIterator<Item = Attr>) -> Attr {
    Attr::new(key, AttrValue::Group(attrs.into_iter().collect()))
}

/// A single Cloud Logging label.
pub fn label(key: impl Into<String>, value: impl Into<String>) -> Attr {
    group(LABELS_KEY, [string(key, value)])
}

/// Several Cloud Logging labels given as flat `key, value` pairs.
///
/// An odd trailing key is kept with a `null` value rather than rejected.
pub fn labels<S: AsRef<str>>(pairs: &[S]) -> Attr {
    let attrs = pairs.chunks(2).map(|pair| {
        let key = pair[0].as_ref();
        match pair.get(1) {
            Some(value) => string(key, value.as_ref()),
            None => Attr::new(key, AttrValue::Structured(Value::Null)),
        }
    });
    group(LABELS_KEY, attrs)
}

/// The `serviceContext` group bound to every record of a logger.
pub fn service_context(service: impl Into<String>) -> Attr {
    group(SERVICE_CONTEXT_KEY, [string("service", service)])
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn labels_nest_under_reserved_group() {
        let attr = labels(&["user_id", "123", "role", "admin"]);
        assert_eq!(attr.key, LABELS_KEY);
        assert_eq!(
            attr.value.to_json(),
            json!({"user_id": "123", "role": "admin"})
        );
    }

    // Known edge case: an odd trailing key is padded with null, not rejected.
    #[test]
    fn labels_pad_odd_argument_with_null() {
        let attr = labels(&["user_id", "123", "role"]);
        assert_eq!(attr.value.to_json(), json!({"user_id": "123", "role": null}));
    }

    #[test]
    fn structured_falls_back_to_error_attr() {
        use std::collections::HashMap;

        let mut bad: HashMap<(i32, i32), i32> = HashMap::new();
        bad.insert((1, 2), 3);
        let attr = structured("payload", &bad);
        assert_eq!(attr.key, "error");
        assert!(matches!(attr.value, AttrValue::Error(_)));

        let ok = structured("payload", &json!({"id": 7}));
        assert_eq!(ok.value, AttrValue::Structured(json!({"id": 7})));
    }

    #[test]
    fn duration_renders_as_nanoseconds() {
        let attr = duration("elapsed", Duration::from_millis(3));
        assert_eq!(attr.value.to_json(), json!(3_000_000u64));
    }

    #[test]
    fn any_maps_json_scalars_to_typed_values() {
        assert_eq!(any("n", json!(5)).value, AttrValue::Int(5));
        assert_eq!(any("f", json!(1.5)).value, AttrValue::Float(1.5));
        assert_eq!(any("s", json!("x")).value, AttrValue::Str("x".into()));
        assert_eq!(
            any("o", json!({"a": 1})).value,
            AttrValue::Structured(json!({"a": 1}))
        );
    }
}

//! Conversion between engine values and idiomatic host values.
//!
//! [`HostValue`] is what an embedder reads and writes: `Undefined` becomes
//! `Null` on the way out, integral numbers narrow to `Int`, property
//! insertion order is preserved, and values the host cannot represent
//! (functions) degrade to `Null`.

use std::collections::HashSet;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::builtins::Prototypes;
use crate::object::{new_ref, JsObject, ObjectKind};
use crate::value::Value;
use crate::{Identifier, Shared};

/// A value crossing the embedding boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HostValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Array(Vec<HostValue>),
    Object(IndexMap<String, HostValue>),
    /// Raw byte buffer (a script-side `Uint8Array`).
    Bytes(Vec<u8>),
    /// Epoch milliseconds (a script-side `Date`).
    Date(i64),
}

impl HostValue {
    /// The numeric value, if this is `Int` or `Float`.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(n) => Some(*n as f64),
            Self::Float(n) => Some(*n),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }
}

impl From<bool> for HostValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for HostValue {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

impl From<i32> for HostValue {
    fn from(n: i32) -> Self {
        Self::Int(i64::from(n))
    }
}

impl From<f64> for HostValue {
    fn from(n: f64) -> Self {
        Self::Float(n)
    }
}

impl From<&str> for HostValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for HostValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<Vec<HostValue>> for HostValue {
    fn from(items: Vec<HostValue>) -> Self {
        Self::Array(items)
    }
}

/// Convert an engine value for the host. Cyclic object graphs terminate:
/// a back-reference converts to `Null`.
#[must_use]
pub fn value_to_host(value: &Value) -> HostValue {
    let mut seen = HashSet::new();
    to_host_inner(value, &mut seen)
}

fn to_host_inner(value: &Value, seen: &mut HashSet<*const ()>) -> HostValue {
    match value {
        Value::Undefined | Value::Null => HostValue::Null,
        Value::Bool(b) => HostValue::Bool(*b),
        Value::Number(n) => match Value::narrow_integer(*n) {
            Some(i) => HostValue::Int(i),
            None => HostValue::Float(*n),
        },
        Value::Str(s) => HostValue::String(s.to_string()),
        Value::External(host) => host.to_host().unwrap_or(HostValue::Null),
        Value::Object(obj) => {
            let ptr = Shared::as_ptr(obj).cast::<()>();
            if !seen.insert(ptr) {
                return HostValue::Null;
            }
            let result = {
                let guard = obj.borrow();
                match &guard.kind {
                    ObjectKind::Array(elements) => HostValue::Array(
                        elements
                            .iter()
                            .map(|element| to_host_inner(element, seen))
                            .collect(),
                    ),
                    ObjectKind::Date(millis) => {
                        if millis.is_finite() {
                            HostValue::Date(*millis as i64)
                        } else {
                            HostValue::Null
                        }
                    }
                    ObjectKind::Uint8Array(bytes) => HostValue::Bytes(bytes.clone()),
                    ObjectKind::Regex(regex) => {
                        HostValue::String(format!("/{}/{}", regex.source, regex.flags))
                    }
                    ObjectKind::Function(_) => HostValue::Null,
                    ObjectKind::Boxed(inner) => to_host_inner(inner, seen),
                    ObjectKind::Plain => {
                        let mut map = IndexMap::new();
                        for (key, prop) in &guard.props {
                            map.insert(key.to_string(), to_host_inner(prop, seen));
                        }
                        HostValue::Object(map)
                    }
                }
            };
            seen.remove(&ptr);
            result
        }
    }
}

/// Convert a host value into the engine, wiring up the built-in prototypes.
#[must_use]
pub fn host_to_value(host: &HostValue, protos: &Prototypes) -> Value {
    match host {
        HostValue::Null => Value::Null,
        HostValue::Bool(b) => Value::Bool(*b),
        HostValue::Int(n) => Value::Number(*n as f64),
        HostValue::Float(n) => Value::Number(*n),
        HostValue::String(s) => Value::str(s),
        HostValue::Array(items) => {
            let elements = items.iter().map(|item| host_to_value(item, protos)).collect();
            Value::Object(new_ref(JsObject::array(elements, Some(protos.array.clone()))))
        }
        HostValue::Object(map) => {
            let mut obj = JsObject::plain(Some(protos.object.clone()));
            for (key, prop) in map {
                obj.props
                    .insert(Identifier::from(key.as_str()), host_to_value(prop, protos));
            }
            Value::Object(new_ref(obj))
        }
        HostValue::Bytes(bytes) => Value::Object(new_ref(JsObject::with_kind(
            ObjectKind::Uint8Array(bytes.clone()),
            Some(protos.uint8array.clone()),
        ))),
        HostValue::Date(millis) => Value::Object(new_ref(JsObject::with_kind(
            ObjectKind::Date(*millis as f64),
            Some(protos.date.clone()),
        ))),
    }
}

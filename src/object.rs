//! Objects and the prototype chain.
//!
//! A [`JsObject`] pairs an insertion-ordered own-property map with a kind
//! tag carrying the payload of specialized objects (array elements, function
//! data, a date's epoch value, regex state, byte buffers, boxed primitives).
//! Member lookup goes `__proto__` -> own properties -> synthesized members
//! -> prototype chain. Prototype links are acyclic by construction: an
//! assignment that would close a cycle falls back to `null`.

use indexmap::IndexMap;

use crate::function::JsFunction;
use crate::value::Value;
use crate::{Identifier, Locked, Shared};

/// Shared handle to an object. Graphs may be cyclic (`prototype` /
/// `constructor` point at each other); identity is handle identity.
pub type ObjectRef = Shared<Locked<JsObject>>;

/// Insertion-ordered property map.
pub type PropMap = IndexMap<Identifier, Value, ahash::RandomState>;

#[must_use]
pub fn new_ref(obj: JsObject) -> ObjectRef {
    Shared::new(Locked::new(obj))
}

/// Compiled regex literal state. `last_index` is the stateful cursor used
/// by global regexes.
#[derive(Debug)]
pub struct JsRegex {
    pub source: String,
    pub flags: String,
    pub regex: Shared<fancy_regex::Regex>,
    pub last_index: usize,
}

impl JsRegex {
    #[inline]
    #[must_use]
    pub fn is_global(&self) -> bool {
        self.flags.contains('g')
    }
}

/// What an object is, plus its specialized payload.
pub enum ObjectKind {
    Plain,
    Array(Vec<Value>),
    Function(JsFunction),
    /// Epoch milliseconds; NaN marks an invalid date.
    Date(f64),
    Regex(JsRegex),
    Uint8Array(Vec<u8>),
    /// Auto-wrapped primitive (string/number/boolean) for member access.
    Boxed(Value),
}

impl ObjectKind {
    #[must_use]
    pub const fn tag(&self) -> &'static str {
        match self {
            Self::Plain => "Object",
            Self::Array(_) => "Array",
            Self::Function(_) => "Function",
            Self::Date(_) => "Date",
            Self::Regex(_) => "RegExp",
            Self::Uint8Array(_) => "Uint8Array",
            Self::Boxed(_) => "Object",
        }
    }
}

pub struct JsObject {
    pub props: PropMap,
    pub proto: Option<ObjectRef>,
    pub kind: ObjectKind,
    /// Built-in prototypes are frozen; writes fail with a `TypeError`.
    pub frozen: bool,
}

impl JsObject {
    #[must_use]
    pub fn plain(proto: Option<ObjectRef>) -> Self {
        Self {
            props: PropMap::default(),
            proto,
            kind: ObjectKind::Plain,
            frozen: false,
        }
    }

    #[must_use]
    pub fn array(elements: Vec<Value>, proto: Option<ObjectRef>) -> Self {
        Self {
            props: PropMap::default(),
            proto,
            kind: ObjectKind::Array(elements),
            frozen: false,
        }
    }

    #[must_use]
    pub fn function(function: JsFunction, proto: Option<ObjectRef>) -> Self {
        Self {
            props: PropMap::default(),
            proto,
            kind: ObjectKind::Function(function),
            frozen: false,
        }
    }

    #[must_use]
    pub fn with_kind(kind: ObjectKind, proto: Option<ObjectRef>) -> Self {
        Self {
            props: PropMap::default(),
            proto,
            kind,
            frozen: false,
        }
    }

    #[inline]
    #[must_use]
    pub fn is_array(&self) -> bool {
        matches!(self.kind, ObjectKind::Array(_))
    }

    #[inline]
    #[must_use]
    pub fn as_function(&self) -> Option<&JsFunction> {
        match &self.kind {
            ObjectKind::Function(function) => Some(function),
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    pub fn elements(&self) -> Option<&Vec<Value>> {
        match &self.kind {
            ObjectKind::Array(elements) => Some(elements),
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    pub fn elements_mut(&mut self) -> Option<&mut Vec<Value>> {
        match &mut self.kind {
            ObjectKind::Array(elements) => Some(elements),
            _ => None,
        }
    }

    /// Own-property lookup including synthesized members, without walking
    /// the prototype chain.
    #[must_use]
    pub fn own_get(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.props.get(name) {
            return Some(value.clone());
        }
        match &self.kind {
            ObjectKind::Array(elements) => {
                if name == "length" {
                    return Some(Value::Number(elements.len() as f64));
                }
                // Out-of-bounds reads fall through and come back undefined.
                index_key(name).and_then(|index| elements.get(index).cloned())
            }
            ObjectKind::Uint8Array(bytes) => {
                if name == "length" {
                    return Some(Value::Number(bytes.len() as f64));
                }
                index_key(name).and_then(|index| bytes.get(index).map(|b| Value::Number(f64::from(*b))))
            }
            ObjectKind::Regex(regex) => match name {
                "source" => Some(Value::str(&regex.source)),
                "flags" => Some(Value::str(&regex.flags)),
                "lastIndex" => Some(Value::Number(regex.last_index as f64)),
                "global" => Some(Value::Bool(regex.flags.contains('g'))),
                "ignoreCase" => Some(Value::Bool(regex.flags.contains('i'))),
                "multiline" => Some(Value::Bool(regex.flags.contains('m'))),
                "dotAll" => Some(Value::Bool(regex.flags.contains('s'))),
                _ => None,
            },
            ObjectKind::Function(function) => match name {
                "name" => Some(Value::str(function.name())),
                "length" => Some(Value::Number(function.arity() as f64)),
                _ => None,
            },
            ObjectKind::Boxed(inner) => match (name, inner) {
                ("length", Value::Str(s)) => Some(Value::Number(s.chars().count() as f64)),
                _ => None,
            },
            _ => None,
        }
    }

    /// The own keys visited by `for-in` and `Object.keys`: array indices
    /// first, then named properties, in insertion order.
    #[must_use]
    pub fn own_keys(&self) -> Vec<Identifier> {
        let mut keys = Vec::new();
        if let ObjectKind::Array(elements) = &self.kind {
            keys.extend((0..elements.len()).map(|i| Identifier::from(i.to_string())));
        }
        keys.extend(self.props.keys().cloned());
        keys
    }
}

/// Parse a canonical array index key ("0", "17", ...).
#[must_use]
pub fn index_key(name: &str) -> Option<usize> {
    if name.is_empty() || (name.len() > 1 && name.starts_with('0')) {
        return None;
    }
    if !name.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    name.parse().ok()
}

/// Full member lookup on a handle: `__proto__`, own properties, synthesized
/// members, then the prototype chain.
#[must_use]
pub fn get_member(obj: &ObjectRef, name: &str) -> Option<Value> {
    if name == "__proto__" {
        return Some(match &obj.borrow().proto {
            Some(proto) => Value::Object(proto.clone()),
            None => Value::Null,
        });
    }
    if let Some(value) = obj.borrow().own_get(name) {
        return Some(value);
    }
    let proto = obj.borrow().proto.clone();
    match proto {
        Some(proto) => get_member(&proto, name),
        None => None,
    }
}

/// Result of a member write.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum PutResult {
    Ok,
    /// The target is a frozen built-in prototype.
    Immutable,
}

/// Write an own member, including array index/length writes and
/// `__proto__` assignment.
pub fn put_member(obj: &ObjectRef, name: &str, value: Value) -> PutResult {
    if obj.borrow().frozen {
        return PutResult::Immutable;
    }
    if name == "__proto__" {
        let proto = match value {
            Value::Object(proto) => Some(proto),
            _ => None,
        };
        set_proto(obj, proto);
        return PutResult::Ok;
    }

    let mut guard = obj.borrow_mut();
    match &mut guard.kind {
        ObjectKind::Array(elements) => {
            if name == "length" {
                let len = value.to_number();
                if len.is_finite() && len >= 0.0 {
                    elements.resize(len as usize, Value::Undefined);
                }
                return PutResult::Ok;
            }
            if let Some(index) = index_key(name) {
                if index >= elements.len() {
                    elements.resize(index + 1, Value::Undefined);
                }
                elements[index] = value;
                return PutResult::Ok;
            }
        }
        ObjectKind::Uint8Array(bytes) => {
            if let Some(index) = index_key(name) {
                if index < bytes.len() {
                    let n = value.to_number();
                    bytes[index] = if n.is_finite() { (n as i64 & 0xff) as u8 } else { 0 };
                }
                // Out-of-range byte writes are dropped; the buffer is
                // fixed-size.
                return PutResult::Ok;
            }
        }
        ObjectKind::Regex(regex) => {
            if name == "lastIndex" {
                let n = value.to_number();
                regex.last_index = if n.is_finite() && n >= 0.0 { n as usize } else { 0 };
                return PutResult::Ok;
            }
        }
        _ => (),
    }
    guard.props.insert(Identifier::from(name), value);
    PutResult::Ok
}

/// Remove an own property. Returns whether something was removed.
pub fn remove_member(obj: &ObjectRef, name: &str) -> bool {
    let mut guard = obj.borrow_mut();
    if guard.frozen {
        return false;
    }
    if let Some(index) = index_key(name) {
        if let Some(elements) = guard.elements_mut() {
            if index < elements.len() {
                // A deleted element leaves a hole, not a shorter array.
                elements[index] = Value::Undefined;
                return true;
            }
            return false;
        }
    }
    guard.props.shift_remove(name).is_some()
}

/// Set the prototype link. A link that would close a cycle is rejected and
/// the prototype falls back to `null`.
pub fn set_proto(obj: &ObjectRef, proto: Option<ObjectRef>) {
    let accepted = match &proto {
        None => None,
        Some(candidate) => {
            if creates_cycle(obj, candidate) {
                None
            } else {
                Some(candidate.clone())
            }
        }
    };
    obj.borrow_mut().proto = accepted;
}

fn creates_cycle(obj: &ObjectRef, candidate: &ObjectRef) -> bool {
    let mut cursor = Some(candidate.clone());
    while let Some(current) = cursor {
        if Shared::ptr_eq(&current, obj) {
            return true;
        }
        cursor = current.borrow().proto.clone();
    }
    false
}

/// Walk `value.__proto__` looking for `target_proto` (the `instanceof`
/// operator).
#[must_use]
pub fn proto_chain_contains(value: &Value, target_proto: &ObjectRef) -> bool {
    let Some(obj) = value.as_object() else {
        return false;
    };
    let mut cursor = obj.borrow().proto.clone();
    while let Some(current) = cursor {
        if Shared::ptr_eq(&current, target_proto) {
            return true;
        }
        cursor = current.borrow().proto.clone();
    }
    false
}

//! Host interop contracts.
//!
//! The engine itself knows nothing about the host's object system; when a
//! member access cannot be satisfied by the value model, it consults the
//! installed [`ExternalBridge`] (if any). The bridge hands back
//! [`ExternalAccess`] implementations which resolve reads, writes, calls
//! and construction against host objects.

use crate::value::Value;

/// Resolves host types and instances to an access surface.
pub trait ExternalBridge {
    /// Access to a host type by dotted name (e.g. a registry key the
    /// embedder chose). [`None`] if the name is unknown.
    fn for_type(&self, dotted_name: &str) -> Option<Box<dyn ExternalAccess>>;
    /// Access to a concrete host instance.
    fn for_instance(&self, value: &Value) -> Option<Box<dyn ExternalAccess>>;
}

/// Late-bound access to a host type or instance. Every method defaults to
/// "not supported" so implementations only fill in what they have.
pub trait ExternalAccess {
    /// Read a static or instance property.
    fn read(&self, _name: &str) -> Option<Value> {
        None
    }
    /// Update a static or instance property; returns whether accepted.
    fn update(&self, _name: &str, _value: Value) -> bool {
        false
    }
    /// Invoke a named (static) method.
    fn call(&self, _name: &str, _args: &[Value]) -> Option<Value> {
        None
    }
    /// Late-bound method lookup for member-access expressions.
    fn get_method(&self, _name: &str) -> Option<Value> {
        None
    }
    /// Late-bound property lookup for member-access expressions.
    fn get_property(&self, _name: &str) -> Option<Value> {
        None
    }
    /// Construct an instance of the host type.
    fn construct(&self, _args: &[Value]) -> Option<Value> {
        None
    }
    /// Direct invocation when the host value itself is callable.
    fn invoke(&self, _args: &[Value]) -> Option<Value> {
        None
    }
}

/// Adapter presenting an [`ExternalAccess`] as an opaque host value, so a
/// bridge-resolved type can flow through member access, calls and `new`.
pub(crate) struct AccessValue(pub Box<dyn ExternalAccess>);

impl crate::value::HostObject for AccessValue {
    fn type_name(&self) -> &'static str {
        "host-type"
    }

    fn to_display(&self) -> String {
        "[host type]".to_string()
    }

    fn get_member(&self, name: &str) -> Option<Value> {
        self.0
            .get_property(name)
            .or_else(|| self.0.get_method(name))
            .or_else(|| self.0.read(name))
    }

    fn put_member(&self, name: &str, value: Value) -> bool {
        self.0.update(name, value)
    }

    fn call(&self, args: &[Value]) -> Option<Value> {
        self.0.invoke(args)
    }

    fn construct(&self, args: &[Value]) -> Option<Value> {
        self.0.construct(args)
    }
}

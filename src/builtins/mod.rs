//! Built-in prototypes and globals.
//!
//! Each submodule covers one built-in area and installs its methods onto
//! the prototype singletons collected in [`Prototypes`]. The prototypes
//! are created once per engine, wired together, and then frozen: script
//! writes against them fail with a `TypeError`.

pub(crate) mod array;
pub(crate) mod date;
pub(crate) mod global;
pub(crate) mod json;
pub(crate) mod math;
pub(crate) mod number;
pub(crate) mod object;
pub(crate) mod regexp;
pub(crate) mod string;
pub(crate) mod uint8array;

use crate::function::{JsFunction, NativeFn, Throw};
use crate::object::{new_ref, JsObject, ObjectRef};
use crate::scope::EnvRef;
use crate::value::Value;
use crate::Identifier;

/// The per-engine set of built-in prototype singletons.
pub struct Prototypes {
    pub object: ObjectRef,
    pub array: ObjectRef,
    pub string: ObjectRef,
    pub number: ObjectRef,
    pub boolean: ObjectRef,
    pub function: ObjectRef,
    pub date: ObjectRef,
    pub regexp: ObjectRef,
    pub uint8array: ObjectRef,
    pub error: ObjectRef,
    pub type_error: ObjectRef,
    pub range_error: ObjectRef,
    pub reference_error: ObjectRef,
    pub syntax_error: ObjectRef,
}

impl Prototypes {
    #[must_use]
    pub fn new() -> Self {
        let object = new_ref(JsObject::plain(None));
        let chain = |base: &ObjectRef| new_ref(JsObject::plain(Some(base.clone())));

        let error = chain(&object);
        let protos = Self {
            array: chain(&object),
            string: chain(&object),
            number: chain(&object),
            boolean: chain(&object),
            function: chain(&object),
            date: chain(&object),
            regexp: chain(&object),
            uint8array: chain(&object),
            type_error: chain(&error),
            range_error: chain(&error),
            reference_error: chain(&error),
            syntax_error: chain(&error),
            error,
            object,
        };

        object::install(&protos);
        array::install(&protos);
        string::install(&protos);
        number::install(&protos);
        date::install(&protos);
        regexp::install(&protos);
        uint8array::install(&protos);
        protos
    }

    /// Freeze every prototype; called once the globals are wired up.
    pub(crate) fn freeze(&self) {
        for proto in [
            &self.object,
            &self.array,
            &self.string,
            &self.number,
            &self.boolean,
            &self.function,
            &self.date,
            &self.regexp,
            &self.uint8array,
            &self.error,
            &self.type_error,
            &self.range_error,
            &self.reference_error,
            &self.syntax_error,
        ] {
            proto.borrow_mut().frozen = true;
        }
    }
}

impl Default for Prototypes {
    fn default() -> Self {
        Self::new()
    }
}

/// Install the global bindings (constructors, console, Math, JSON, the
/// global functions) into the root environment, then freeze the
/// prototypes.
pub(crate) fn install_globals(global: &EnvRef, protos: &Prototypes) {
    global::install(global, protos);
    protos.freeze();
}

// ----------------------------------------------------------------------
// Registration helpers shared by the submodules
// ----------------------------------------------------------------------

/// A native function as a value, chained to the function prototype.
#[must_use]
pub(crate) fn native_value(protos: &Prototypes, name: &'static str, func: NativeFn) -> Value {
    Value::Object(new_ref(JsObject::function(
        JsFunction::native(name, func),
        Some(protos.function.clone()),
    )))
}

/// Register a method on a prototype (or any object).
pub(crate) fn method(protos: &Prototypes, target: &ObjectRef, name: &'static str, func: NativeFn) {
    let value = native_value(protos, name, func);
    target
        .borrow_mut()
        .props
        .insert(Identifier::from(name), value);
}

/// Set a plain data property.
pub(crate) fn property(target: &ObjectRef, name: &str, value: Value) {
    target
        .borrow_mut()
        .props
        .insert(Identifier::from(name), value);
}

// ----------------------------------------------------------------------
// Argument helpers
// ----------------------------------------------------------------------

#[inline]
pub(crate) fn arg(args: &[Value], index: usize) -> Value {
    args.get(index).cloned().unwrap_or(Value::Undefined)
}

#[inline]
pub(crate) fn arg_f64(args: &[Value], index: usize) -> f64 {
    args.get(index).map_or(f64::NAN, Value::to_number)
}

/// Resolve a relative index the way `slice`-style methods do: negative
/// counts from the end, and the result clamps to `[0, len]`.
#[must_use]
pub(crate) fn rel_index(n: f64, len: usize) -> usize {
    if n.is_nan() {
        return 0;
    }
    if n < 0.0 {
        let back = (-n) as usize;
        len.saturating_sub(back)
    } else {
        (n as usize).min(len)
    }
}

/// The receiver's array object, or a `TypeError`.
pub(crate) fn this_array(
    ctx: &crate::interp::NativeContext<'_>,
    this: &Value,
    what: &str,
) -> Result<ObjectRef, Throw> {
    match this {
        Value::Object(obj) if obj.borrow().is_array() => Ok(obj.clone()),
        _ => Err(ctx.type_error(format!("{} called on a non-array", what))),
    }
}

/// The receiver as a string (strings and boxed strings).
pub(crate) fn this_string(this: &Value) -> String {
    this.to_display()
}

//! Object prototype methods and constructor statics.

use super::{arg, method, native_value, property, Prototypes};
use crate::function::NativeResult;
use crate::interp::NativeContext;
use crate::object::{get_member, new_ref, set_proto, JsObject, ObjectKind};
use crate::value::Value;
use crate::Identifier;

pub(crate) fn install(protos: &Prototypes) {
    let proto = &protos.object;
    method(protos, proto, "hasOwnProperty", has_own_property);
    method(protos, proto, "toString", to_string);

    // The error prototypes carry their identity and a readable toString.
    property(&protos.error, "name", Value::str("Error"));
    property(&protos.error, "message", Value::str(""));
    method(protos, &protos.error, "toString", error_to_string);
    property(&protos.type_error, "name", Value::str("TypeError"));
    property(&protos.range_error, "name", Value::str("RangeError"));
    property(&protos.reference_error, "name", Value::str("ReferenceError"));
    property(&protos.syntax_error, "name", Value::str("SyntaxError"));
}

pub(crate) fn constructor(protos: &Prototypes) -> Value {
    let ctor = native_value(protos, "Object", object_constructor);
    if let Value::Object(obj) = &ctor {
        property(obj, "prototype", Value::Object(protos.object.clone()));
        property(&protos.object, "constructor", ctor.clone());
        method(protos, obj, "keys", keys);
        method(protos, obj, "values", values);
        method(protos, obj, "entries", entries);
        method(protos, obj, "assign", assign);
        method(protos, obj, "fromEntries", from_entries);
        method(protos, obj, "is", is);
        method(protos, obj, "create", create);
        method(protos, obj, "getPrototypeOf", get_prototype_of);
        method(protos, obj, "setPrototypeOf", set_prototype_of);
    }
    ctor
}

fn object_constructor(ctx: &mut NativeContext<'_>, _this: &Value, args: &[Value]) -> NativeResult {
    match args.first() {
        None | Some(Value::Undefined) | Some(Value::Null) => Ok(ctx.new_object()),
        Some(Value::Object(obj)) => Ok(Value::Object(obj.clone())),
        Some(primitive) => {
            let proto = match primitive {
                Value::Str(_) => ctx.protos().string.clone(),
                Value::Number(_) => ctx.protos().number.clone(),
                _ => ctx.protos().boolean.clone(),
            };
            Ok(Value::Object(new_ref(JsObject::with_kind(
                ObjectKind::Boxed(primitive.clone()),
                Some(proto),
            ))))
        }
    }
}

fn has_own_property(_ctx: &mut NativeContext<'_>, this: &Value, args: &[Value]) -> NativeResult {
    let key = arg(args, 0).to_display();
    let result = match this {
        Value::Object(obj) => obj.borrow().own_get(&key).is_some(),
        _ => false,
    };
    Ok(Value::Bool(result))
}

fn to_string(_ctx: &mut NativeContext<'_>, this: &Value, _args: &[Value]) -> NativeResult {
    Ok(Value::str(this.to_display()))
}

fn error_to_string(_ctx: &mut NativeContext<'_>, this: &Value, _args: &[Value]) -> NativeResult {
    let (name, message) = match this {
        Value::Object(obj) => {
            let name = get_member(obj, "name").map_or_else(|| "Error".to_string(), |v| v.to_display());
            let message = get_member(obj, "message").map_or_else(String::new, |v| v.to_display());
            (name, message)
        }
        other => (other.to_display(), String::new()),
    };
    Ok(Value::str(if message.is_empty() {
        name
    } else {
        format!("{}: {}", name, message)
    }))
}

fn keys(ctx: &mut NativeContext<'_>, _this: &Value, args: &[Value]) -> NativeResult {
    let out = match args.first() {
        Some(Value::Object(obj)) => obj
            .borrow()
            .own_keys()
            .into_iter()
            .map(|key| Value::str(&key))
            .collect(),
        _ => Vec::new(),
    };
    Ok(ctx.new_array(out))
}

fn values(ctx: &mut NativeContext<'_>, _this: &Value, args: &[Value]) -> NativeResult {
    let out = match args.first() {
        Some(Value::Object(obj)) => {
            let guard = obj.borrow();
            guard
                .own_keys()
                .into_iter()
                .filter_map(|key| guard.own_get(&key))
                .collect()
        }
        _ => Vec::new(),
    };
    Ok(ctx.new_array(out))
}

fn entries(ctx: &mut NativeContext<'_>, _this: &Value, args: &[Value]) -> NativeResult {
    let pairs: Vec<(Identifier, Value)> = match args.first() {
        Some(Value::Object(obj)) => {
            let guard = obj.borrow();
            guard
                .own_keys()
                .into_iter()
                .filter_map(|key| guard.own_get(&key).map(|value| (key, value)))
                .collect()
        }
        _ => Vec::new(),
    };
    let out: Vec<Value> = pairs
        .into_iter()
        .map(|(key, value)| ctx.new_array(vec![Value::str(&key), value]))
        .collect();
    Ok(ctx.new_array(out))
}

fn assign(ctx: &mut NativeContext<'_>, _this: &Value, args: &[Value]) -> NativeResult {
    let Some(Value::Object(target)) = args.first() else {
        return Err(ctx.type_error("cannot convert undefined or null to object"));
    };
    for source in args.iter().skip(1) {
        if let Value::Object(source) = source {
            let entries: Vec<(Identifier, Value)> = {
                let guard = source.borrow();
                guard
                    .own_keys()
                    .into_iter()
                    .filter_map(|key| guard.own_get(&key).map(|value| (key, value)))
                    .collect()
            };
            for (key, value) in entries {
                crate::object::put_member(target, &key, value);
            }
        }
    }
    Ok(Value::Object(target.clone()))
}

fn from_entries(ctx: &mut NativeContext<'_>, _this: &Value, args: &[Value]) -> NativeResult {
    let mut object = JsObject::plain(Some(ctx.protos().object.clone()));
    if let Some(Value::Object(list)) = args.first() {
        if let Some(pairs) = list.borrow().elements() {
            for pair in pairs {
                if let Value::Object(pair) = pair {
                    if let Some(parts) = pair.borrow().elements() {
                        let key = parts.first().map_or_else(String::new, Value::to_display);
                        let value = parts.get(1).cloned().unwrap_or(Value::Undefined);
                        object.props.insert(Identifier::from(key), value);
                    }
                }
            }
        }
    }
    Ok(Value::Object(new_ref(object)))
}

/// `Object.is`: like `===` but NaN equals NaN and the zero signs differ.
fn is(_ctx: &mut NativeContext<'_>, _this: &Value, args: &[Value]) -> NativeResult {
    let a = arg(args, 0);
    let b = arg(args, 1);
    let result = match (&a, &b) {
        (Value::Number(x), Value::Number(y)) => {
            if x.is_nan() && y.is_nan() {
                true
            } else if *x == 0.0 && *y == 0.0 {
                x.is_sign_negative() == y.is_sign_negative()
            } else {
                x == y
            }
        }
        _ => a.strict_eq(&b),
    };
    Ok(Value::Bool(result))
}

fn create(ctx: &mut NativeContext<'_>, _this: &Value, args: &[Value]) -> NativeResult {
    let proto = match args.first() {
        Some(Value::Object(proto)) => Some(proto.clone()),
        Some(Value::Null) => None,
        _ => {
            return Err(ctx.type_error("object prototype may only be an object or null"));
        }
    };
    Ok(Value::Object(new_ref(JsObject::plain(proto))))
}

fn get_prototype_of(ctx: &mut NativeContext<'_>, _this: &Value, args: &[Value]) -> NativeResult {
    match args.first() {
        Some(Value::Object(obj)) => Ok(match &obj.borrow().proto {
            Some(proto) => Value::Object(proto.clone()),
            None => Value::Null,
        }),
        Some(Value::Str(_)) => Ok(Value::Object(ctx.protos().string.clone())),
        Some(Value::Number(_)) => Ok(Value::Object(ctx.protos().number.clone())),
        Some(Value::Bool(_)) => Ok(Value::Object(ctx.protos().boolean.clone())),
        _ => Err(ctx.type_error("cannot convert undefined or null to object")),
    }
}

fn set_prototype_of(ctx: &mut NativeContext<'_>, _this: &Value, args: &[Value]) -> NativeResult {
    let Some(Value::Object(target)) = args.first() else {
        return Err(ctx.type_error("Object.setPrototypeOf called on null or undefined"));
    };
    if target.borrow().frozen {
        return Err(ctx.type_error("cannot modify the prototype of an immutable object"));
    }
    let proto = match args.get(1) {
        Some(Value::Object(proto)) => Some(proto.clone()),
        _ => None,
    };
    // A cycle-producing link falls back to null inside `set_proto`.
    set_proto(target, proto);
    Ok(Value::Object(target.clone()))
}

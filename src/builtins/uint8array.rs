//! The Uint8Array builtin: a fixed-size unsigned byte buffer.

use super::{arg, arg_f64, method, native_value, property, rel_index, Prototypes};
use crate::function::{NativeResult, Throw};
use crate::interp::NativeContext;
use crate::object::{new_ref, JsObject, ObjectKind, ObjectRef};
use crate::value::Value;

pub(crate) fn install(protos: &Prototypes) {
    let proto = &protos.uint8array;
    method(protos, proto, "slice", slice);
    method(protos, proto, "fill", fill);
    method(protos, proto, "indexOf", index_of);
    method(protos, proto, "includes", includes);
    method(protos, proto, "toString", to_string);
}

pub(crate) fn constructor(protos: &Prototypes) -> Value {
    let ctor = native_value(protos, "Uint8Array", uint8array_constructor);
    if let Value::Object(obj) = &ctor {
        property(obj, "prototype", Value::Object(protos.uint8array.clone()));
        property(&protos.uint8array, "constructor", ctor.clone());
    }
    ctor
}

fn to_byte(value: &Value) -> u8 {
    let n = value.to_number();
    if n.is_finite() {
        (n as i64 & 0xff) as u8
    } else {
        0
    }
}

fn uint8array_constructor(
    ctx: &mut NativeContext<'_>,
    _this: &Value,
    args: &[Value],
) -> NativeResult {
    let bytes: Vec<u8> = match args.first() {
        None | Some(Value::Undefined) => Vec::new(),
        Some(Value::Number(n)) => {
            if *n < 0.0 || n.fract() != 0.0 {
                return Err(ctx.range_error("invalid typed array length"));
            }
            vec![0; *n as usize]
        }
        Some(Value::Object(obj)) => {
            let guard = obj.borrow();
            match &guard.kind {
                ObjectKind::Array(elements) => elements.iter().map(to_byte).collect(),
                ObjectKind::Uint8Array(bytes) => bytes.clone(),
                _ => Vec::new(),
            }
        }
        Some(other) => {
            return Err(ctx.type_error(format!("cannot create a byte buffer from {}", other)));
        }
    };
    Ok(Value::Object(new_ref(JsObject::with_kind(
        ObjectKind::Uint8Array(bytes),
        Some(ctx.protos().uint8array.clone()),
    ))))
}

fn this_bytes(
    ctx: &NativeContext<'_>,
    this: &Value,
    what: &str,
) -> Result<(ObjectRef, Vec<u8>), Throw> {
    match this {
        Value::Object(obj) => {
            let bytes = match &obj.borrow().kind {
                ObjectKind::Uint8Array(bytes) => bytes.clone(),
                _ => return Err(ctx.type_error(format!("{} called on a non-typed-array", what))),
            };
            Ok((obj.clone(), bytes))
        }
        _ => Err(ctx.type_error(format!("{} called on a non-typed-array", what))),
    }
}

fn slice(ctx: &mut NativeContext<'_>, this: &Value, args: &[Value]) -> NativeResult {
    let (_, bytes) = this_bytes(ctx, this, "slice")?;
    let len = bytes.len();
    let start = match args.first() {
        Some(Value::Undefined) | None => 0,
        Some(n) => rel_index(n.to_number(), len),
    };
    let end = match args.get(1) {
        Some(Value::Undefined) | None => len,
        Some(n) => rel_index(n.to_number(), len),
    };
    let out = bytes[start..end.max(start)].to_vec();
    Ok(Value::Object(new_ref(JsObject::with_kind(
        ObjectKind::Uint8Array(out),
        Some(ctx.protos().uint8array.clone()),
    ))))
}

fn fill(ctx: &mut NativeContext<'_>, this: &Value, args: &[Value]) -> NativeResult {
    let (obj, bytes) = this_bytes(ctx, this, "fill")?;
    let len = bytes.len();
    let byte = to_byte(&arg(args, 0));
    let start = match args.get(1) {
        Some(n) => rel_index(n.to_number(), len),
        None => 0,
    };
    let end = match args.get(2) {
        Some(n) => rel_index(n.to_number(), len),
        None => len,
    };
    if let ObjectKind::Uint8Array(slots) = &mut obj.borrow_mut().kind {
        for slot in slots.iter_mut().take(end).skip(start) {
            *slot = byte;
        }
    }
    Ok(this.clone())
}

fn index_of(ctx: &mut NativeContext<'_>, this: &Value, args: &[Value]) -> NativeResult {
    let (_, bytes) = this_bytes(ctx, this, "indexOf")?;
    let needle = arg_f64(args, 0);
    let found = bytes.iter().position(|b| f64::from(*b) == needle);
    Ok(Value::Number(found.map_or(-1.0, |i| i as f64)))
}

fn includes(ctx: &mut NativeContext<'_>, this: &Value, args: &[Value]) -> NativeResult {
    let (_, bytes) = this_bytes(ctx, this, "includes")?;
    let needle = arg_f64(args, 0);
    Ok(Value::Bool(bytes.iter().any(|b| f64::from(*b) == needle)))
}

fn to_string(ctx: &mut NativeContext<'_>, this: &Value, _args: &[Value]) -> NativeResult {
    let (_, bytes) = this_bytes(ctx, this, "toString")?;
    let parts: Vec<String> = bytes.iter().map(|b| b.to_string()).collect();
    Ok(Value::str(parts.join(",")))
}

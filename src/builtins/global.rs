//! Global bindings: constructors, `console`, `Math`, `JSON`, the global
//! functions and constants.

use super::{arg, method, native_value, property, Prototypes};
use crate::function::NativeResult;
use crate::interp::NativeContext;
use crate::object::{new_ref, JsObject, ObjectKind, ObjectRef};
use crate::scope::{EnvRef, Environment};
use crate::value::{HostObject, Value};
use crate::{Locked, Shared};

pub(crate) fn install(global: &EnvRef, protos: &Prototypes) {
    let declare = |name: &str, value: Value| {
        let _ = global.borrow_mut().declare_var(name, value);
    };

    declare("undefined", Value::Undefined);
    declare("NaN", Value::Number(f64::NAN));
    declare("Infinity", Value::Number(f64::INFINITY));
    declare(
        "globalThis",
        Value::External(Shared::new(GlobalView {
            env: Shared::downgrade(global),
        })),
    );

    declare("console", build_console(protos));
    declare("Math", super::math::build(protos));
    declare("JSON", super::json::build(protos));

    declare("parseInt", native_value(protos, "parseInt", parse_int));
    declare("parseFloat", native_value(protos, "parseFloat", parse_float));
    declare("isNaN", native_value(protos, "isNaN", global_is_nan));
    declare("isFinite", native_value(protos, "isFinite", global_is_finite));
    declare(
        "encodeURIComponent",
        native_value(protos, "encodeURIComponent", encode_uri_component),
    );
    declare(
        "decodeURIComponent",
        native_value(protos, "decodeURIComponent", decode_uri_component),
    );

    declare("Object", super::object::constructor(protos));
    declare("Array", super::array::constructor(protos));
    declare("String", super::string::constructor(protos));
    declare("Number", super::number::constructor(protos));
    declare("Boolean", boolean_constructor_value(protos));
    declare("Date", super::date::constructor(protos));
    declare("RegExp", super::regexp::constructor(protos));
    declare("Uint8Array", super::uint8array::constructor(protos));

    for (name, proto) in [
        ("Error", &protos.error),
        ("TypeError", &protos.type_error),
        ("RangeError", &protos.range_error),
        ("ReferenceError", &protos.reference_error),
        ("SyntaxError", &protos.syntax_error),
    ] {
        declare(name, error_constructor_value(protos, name, proto));
    }
}

// ----------------------------------------------------------------------
// globalThis
// ----------------------------------------------------------------------

/// Read-only view over the root bindings.
struct GlobalView {
    env: std::rc::Weak<Locked<Environment>>,
}

impl HostObject for GlobalView {
    fn type_name(&self) -> &'static str {
        "global"
    }

    fn to_display(&self) -> String {
        "[object global]".to_string()
    }

    fn get_member(&self, name: &str) -> Option<Value> {
        let env = self.env.upgrade()?;
        let binding = env.borrow().local(name)?;
        let value = binding.borrow().value.clone();
        Some(value)
    }
}

// ----------------------------------------------------------------------
// console
// ----------------------------------------------------------------------

fn build_console(protos: &Prototypes) -> Value {
    let console = new_ref(JsObject::plain(Some(protos.object.clone())));
    method(protos, &console, "log", console_log);
    method(protos, &console, "warn", console_log);
    method(protos, &console, "error", console_log);
    Value::Object(console)
}

fn console_log(ctx: &mut NativeContext<'_>, _this: &Value, args: &[Value]) -> NativeResult {
    let line = args
        .iter()
        .map(Value::to_display)
        .collect::<Vec<String>>()
        .join(" ");
    ctx.engine().console_print(&line);
    Ok(Value::Undefined)
}

// ----------------------------------------------------------------------
// Boolean
// ----------------------------------------------------------------------

fn boolean_constructor_value(protos: &Prototypes) -> Value {
    method(
        protos,
        &protos.boolean,
        "toString",
        super::number::boolean_to_string,
    );
    method(
        protos,
        &protos.boolean,
        "valueOf",
        super::number::boolean_value_of,
    );
    let ctor = native_value(protos, "Boolean", boolean_constructor);
    if let Value::Object(obj) = &ctor {
        property(obj, "prototype", Value::Object(protos.boolean.clone()));
        property(&protos.boolean, "constructor", ctor.clone());
    }
    ctor
}

fn boolean_constructor(ctx: &mut NativeContext<'_>, _this: &Value, args: &[Value]) -> NativeResult {
    let value = args.first().map_or(false, Value::truthy);
    if ctx.is_constructor_call() {
        return Ok(Value::Object(new_ref(JsObject::with_kind(
            ObjectKind::Boxed(Value::Bool(value)),
            Some(ctx.protos().boolean.clone()),
        ))));
    }
    Ok(Value::Bool(value))
}

// ----------------------------------------------------------------------
// Error family
// ----------------------------------------------------------------------

fn error_constructor_value(protos: &Prototypes, name: &'static str, proto: &ObjectRef) -> Value {
    let ctor = native_value(protos, name, error_constructor);
    if let Value::Object(obj) = &ctor {
        property(obj, "prototype", Value::Object(proto.clone()));
        property(proto, "constructor", ctor.clone());
    }
    ctor
}

/// Shared by the whole error family; the callee's name picks the kind, so
/// `Error`, `TypeError`, ... behave identically with and without `new`.
fn error_constructor(ctx: &mut NativeContext<'_>, _this: &Value, args: &[Value]) -> NativeResult {
    let kind = ctx
        .call_info
        .as_ref()
        .and_then(|info| info.callee.as_object().cloned())
        .and_then(|callee| {
            callee
                .borrow()
                .as_function()
                .map(|function| function.name().to_string())
        })
        .unwrap_or_else(|| "Error".to_string());
    let message = match args.first() {
        Some(Value::Undefined) | None => String::new(),
        Some(message) => message.to_display(),
    };
    Ok(ctx.engine().make_error(&kind, message))
}

// ----------------------------------------------------------------------
// Global functions
// ----------------------------------------------------------------------

pub(crate) fn parse_int(_ctx: &mut NativeContext<'_>, _this: &Value, args: &[Value]) -> NativeResult {
    let text = arg(args, 0).to_display();
    let mut rest = text.trim();
    let mut sign = 1.0;
    if let Some(stripped) = rest.strip_prefix('-') {
        sign = -1.0;
        rest = stripped;
    } else if let Some(stripped) = rest.strip_prefix('+') {
        rest = stripped;
    }

    let mut radix = match args.get(1) {
        Some(Value::Undefined) | None => 0,
        Some(r) => {
            let r = r.to_number();
            if r.is_nan() {
                0
            } else {
                r as i64
            }
        }
    };
    if radix == 16 || radix == 0 {
        if let Some(stripped) = rest.strip_prefix("0x").or_else(|| rest.strip_prefix("0X")) {
            rest = stripped;
            radix = 16;
        }
    }
    if radix == 0 {
        radix = 10;
    }
    if !(2..=36).contains(&radix) {
        return Ok(Value::Number(f64::NAN));
    }

    let mut value: Option<f64> = None;
    for c in rest.chars() {
        let digit = match c.to_digit(36) {
            Some(digit) if i64::from(digit) < radix => f64::from(digit),
            _ => break,
        };
        value = Some(value.unwrap_or(0.0) * radix as f64 + digit);
    }
    Ok(Value::Number(value.map_or(f64::NAN, |v| sign * v)))
}

pub(crate) fn parse_float(
    _ctx: &mut NativeContext<'_>,
    _this: &Value,
    args: &[Value],
) -> NativeResult {
    let text = arg(args, 0).to_display();
    let trimmed = text.trim_start();

    // Longest valid numeric prefix: sign, digits, fraction, exponent.
    let bytes = trimmed.as_bytes();
    let mut end = 0usize;
    let mut seen_digit = false;
    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        end += 1;
    }
    if trimmed[end..].starts_with("Infinity") {
        let value = if bytes.first() == Some(&b'-') {
            f64::NEG_INFINITY
        } else {
            f64::INFINITY
        };
        return Ok(Value::Number(value));
    }
    while matches!(bytes.get(end), Some(b) if b.is_ascii_digit()) {
        end += 1;
        seen_digit = true;
    }
    if bytes.get(end) == Some(&b'.') {
        end += 1;
        while matches!(bytes.get(end), Some(b) if b.is_ascii_digit()) {
            end += 1;
            seen_digit = true;
        }
    }
    if seen_digit && matches!(bytes.get(end), Some(b'e') | Some(b'E')) {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'+') | Some(b'-')) {
            exp_end += 1;
        }
        if matches!(bytes.get(exp_end), Some(b) if b.is_ascii_digit()) {
            end = exp_end;
            while matches!(bytes.get(end), Some(b) if b.is_ascii_digit()) {
                end += 1;
            }
        }
    }
    if !seen_digit {
        return Ok(Value::Number(f64::NAN));
    }
    Ok(Value::Number(trimmed[..end].parse().unwrap_or(f64::NAN)))
}

fn global_is_nan(_ctx: &mut NativeContext<'_>, _this: &Value, args: &[Value]) -> NativeResult {
    Ok(Value::Bool(arg(args, 0).to_number().is_nan()))
}

fn global_is_finite(_ctx: &mut NativeContext<'_>, _this: &Value, args: &[Value]) -> NativeResult {
    Ok(Value::Bool(arg(args, 0).to_number().is_finite()))
}

fn is_uri_unreserved(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '!' | '~' | '*' | '\'' | '(' | ')')
}

fn encode_uri_component(
    _ctx: &mut NativeContext<'_>,
    _this: &Value,
    args: &[Value],
) -> NativeResult {
    let text = arg(args, 0).to_display();
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if is_uri_unreserved(c) {
            out.push(c);
        } else {
            let mut buffer = [0u8; 4];
            for byte in c.encode_utf8(&mut buffer).bytes() {
                out.push_str(&format!("%{:02X}", byte));
            }
        }
    }
    Ok(Value::str(out))
}

fn decode_uri_component(
    ctx: &mut NativeContext<'_>,
    _this: &Value,
    args: &[Value],
) -> NativeResult {
    let text = arg(args, 0).to_display();
    let mut bytes = Vec::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '%' {
            let mut buffer = [0u8; 4];
            bytes.extend_from_slice(c.encode_utf8(&mut buffer).as_bytes());
            continue;
        }
        let hex: String = chars.clone().take(2).collect();
        let byte = u8::from_str_radix(&hex, 16)
            .map_err(|_| ctx.uri_error("malformed URI sequence"))?;
        bytes.push(byte);
        chars.next();
        chars.next();
    }
    match String::from_utf8(bytes) {
        Ok(decoded) => Ok(Value::str(decoded)),
        Err(_) => Err(ctx.uri_error("malformed URI sequence")),
    }
}

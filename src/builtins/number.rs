//! Number prototype methods and constructor statics.

use super::{arg_f64, method, native_value, property, Prototypes};
use crate::function::NativeResult;
use crate::interp::NativeContext;
use crate::object::{new_ref, JsObject, ObjectKind};
use crate::value::{format_number, Value};

pub(crate) fn install(protos: &Prototypes) {
    let proto = &protos.number;
    method(protos, proto, "toFixed", to_fixed);
    method(protos, proto, "toPrecision", to_precision);
    method(protos, proto, "toLocaleString", to_locale_string);
    method(protos, proto, "valueOf", value_of);
    method(protos, proto, "toString", to_string);
}

pub(crate) fn constructor(protos: &Prototypes) -> Value {
    let ctor = native_value(protos, "Number", number_constructor);
    if let Value::Object(obj) = &ctor {
        property(obj, "prototype", Value::Object(protos.number.clone()));
        property(&protos.number, "constructor", ctor.clone());
        method(protos, obj, "isFinite", is_finite);
        method(protos, obj, "isInteger", is_integer);
        method(protos, obj, "isNaN", is_nan);
        method(protos, obj, "isSafeInteger", is_safe_integer);
        method(protos, obj, "parseInt", parse_int);
        method(protos, obj, "parseFloat", parse_float);
        property(obj, "EPSILON", Value::Number(f64::EPSILON));
        property(obj, "MAX_VALUE", Value::Number(f64::MAX));
        property(obj, "MIN_VALUE", Value::Number(f64::MIN_POSITIVE));
        property(obj, "MAX_SAFE_INTEGER", Value::Number(Value::MAX_SAFE_INTEGER));
        property(obj, "MIN_SAFE_INTEGER", Value::Number(-Value::MAX_SAFE_INTEGER));
        property(obj, "POSITIVE_INFINITY", Value::Number(f64::INFINITY));
        property(obj, "NEGATIVE_INFINITY", Value::Number(f64::NEG_INFINITY));
        property(obj, "NaN", Value::Number(f64::NAN));
    }
    ctor
}

fn number_constructor(ctx: &mut NativeContext<'_>, _this: &Value, args: &[Value]) -> NativeResult {
    let n = match args.first() {
        Some(value) => value.to_number(),
        None => 0.0,
    };
    if ctx.is_constructor_call() {
        return Ok(Value::Object(new_ref(JsObject::with_kind(
            ObjectKind::Boxed(Value::Number(n)),
            Some(ctx.protos().number.clone()),
        ))));
    }
    Ok(Value::Number(n))
}

fn this_number(this: &Value) -> f64 {
    this.to_number()
}

fn to_fixed(ctx: &mut NativeContext<'_>, this: &Value, args: &[Value]) -> NativeResult {
    let n = this_number(this);
    let digits = arg_f64(args, 0);
    let digits = if digits.is_nan() { 0.0 } else { digits };
    if !(0.0..=100.0).contains(&digits) {
        return Err(ctx.range_error("toFixed() digits argument must be between 0 and 100"));
    }
    if !n.is_finite() {
        return Ok(Value::str(format_number(n)));
    }
    Ok(Value::str(format!("{:.*}", digits as usize, n)))
}

fn to_precision(ctx: &mut NativeContext<'_>, this: &Value, args: &[Value]) -> NativeResult {
    let n = this_number(this);
    let precision = match args.first() {
        Some(Value::Undefined) | None => return Ok(Value::str(format_number(n))),
        Some(p) => p.to_number(),
    };
    if !(1.0..=100.0).contains(&precision) {
        return Err(ctx.range_error("toPrecision() argument must be between 1 and 100"));
    }
    let precision = precision as usize;
    if !n.is_finite() {
        return Ok(Value::str(format_number(n)));
    }
    if n == 0.0 {
        return Ok(Value::str(format!("{:.*}", precision - 1, 0.0)));
    }
    let exponent = n.abs().log10().floor() as i32;
    if exponent < -6 || exponent >= precision as i32 {
        // Exponential form, with the explicit sign scripts expect.
        let formatted = format!("{:.*e}", precision - 1, n);
        return Ok(Value::str(fix_exponent(&formatted)));
    }
    let decimals = (precision as i32 - 1 - exponent).max(0) as usize;
    Ok(Value::str(format!("{:.*}", decimals, n)))
}

/// Rust renders `1.5e3`; scripts expect `1.5e+3`.
fn fix_exponent(formatted: &str) -> String {
    match formatted.find(|c| c == 'e' || c == 'E') {
        Some(index) if !matches!(formatted.as_bytes().get(index + 1), Some(b'+') | Some(b'-')) => {
            let mut out = formatted.to_string();
            out.insert(index + 1, '+');
            out
        }
        _ => formatted.to_string(),
    }
}

fn to_locale_string(_ctx: &mut NativeContext<'_>, this: &Value, _args: &[Value]) -> NativeResult {
    let n = this_number(this);
    if !n.is_finite() {
        return Ok(Value::str(format_number(n)));
    }
    // Minimal locale formatting: thousands separators, up to three
    // fraction digits.
    let negative = n < 0.0;
    let abs = n.abs();
    let integer = abs.trunc() as u64;
    let fraction = abs.fract();
    let digits = integer.to_string();
    let mut grouped = String::new();
    for (count, c) in digits.chars().rev().enumerate() {
        if count > 0 && count % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    let mut out: String = grouped.chars().rev().collect();
    if fraction > 0.0 {
        let frac = format!("{:.3}", fraction);
        let frac = frac.trim_start_matches('0').trim_end_matches('0');
        if frac.len() > 1 {
            out.push_str(frac);
        }
    }
    if negative {
        out.insert(0, '-');
    }
    Ok(Value::str(out))
}

fn value_of(_ctx: &mut NativeContext<'_>, this: &Value, _args: &[Value]) -> NativeResult {
    Ok(Value::Number(this_number(this)))
}

fn to_string(ctx: &mut NativeContext<'_>, this: &Value, args: &[Value]) -> NativeResult {
    let n = this_number(this);
    let radix = match args.first() {
        Some(Value::Undefined) | None => 10,
        Some(r) => r.to_number() as u32,
    };
    if radix == 10 {
        return Ok(Value::str(format_number(n)));
    }
    if !(2..=36).contains(&radix) {
        return Err(ctx.range_error("toString() radix must be between 2 and 36"));
    }
    if !n.is_finite() {
        return Ok(Value::str(format_number(n)));
    }
    Ok(Value::str(to_radix(n, radix)))
}

fn to_radix(n: f64, radix: u32) -> String {
    const DIGITS: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    let negative = n < 0.0;
    let mut integer = n.abs().trunc() as u64;
    let mut digits = Vec::new();
    if integer == 0 {
        digits.push(b'0');
    }
    while integer > 0 {
        digits.push(DIGITS[(integer % u64::from(radix)) as usize]);
        integer /= u64::from(radix);
    }
    digits.reverse();
    let mut out = String::from_utf8(digits).expect("radix digits are ASCII");

    let mut fraction = n.abs().fract();
    if fraction > 0.0 {
        out.push('.');
        for _ in 0..10 {
            fraction *= f64::from(radix);
            let digit = fraction.trunc() as usize;
            out.push(DIGITS[digit] as char);
            fraction -= fraction.trunc();
            if fraction <= 0.0 {
                break;
            }
        }
    }
    if negative {
        out.insert(0, '-');
    }
    out
}

fn is_finite(_ctx: &mut NativeContext<'_>, _this: &Value, args: &[Value]) -> NativeResult {
    Ok(Value::Bool(
        matches!(args.first(), Some(Value::Number(n)) if n.is_finite()),
    ))
}

fn is_integer(_ctx: &mut NativeContext<'_>, _this: &Value, args: &[Value]) -> NativeResult {
    Ok(Value::Bool(
        matches!(args.first(), Some(Value::Number(n)) if n.is_finite() && n.fract() == 0.0),
    ))
}

fn is_nan(_ctx: &mut NativeContext<'_>, _this: &Value, args: &[Value]) -> NativeResult {
    Ok(Value::Bool(
        matches!(args.first(), Some(Value::Number(n)) if n.is_nan()),
    ))
}

fn is_safe_integer(_ctx: &mut NativeContext<'_>, _this: &Value, args: &[Value]) -> NativeResult {
    Ok(Value::Bool(matches!(
        args.first(),
        Some(Value::Number(n))
            if n.is_finite() && n.fract() == 0.0 && n.abs() <= Value::MAX_SAFE_INTEGER
    )))
}

fn parse_int(ctx: &mut NativeContext<'_>, this: &Value, args: &[Value]) -> NativeResult {
    super::global::parse_int(ctx, this, args)
}

fn parse_float(ctx: &mut NativeContext<'_>, this: &Value, args: &[Value]) -> NativeResult {
    super::global::parse_float(ctx, this, args)
}

/// Receiver check shared with the global installer.
pub(crate) fn boolean_to_string(
    _ctx: &mut NativeContext<'_>,
    this: &Value,
    _args: &[Value],
) -> NativeResult {
    Ok(Value::str(this.to_display()))
}

pub(crate) fn boolean_value_of(
    _ctx: &mut NativeContext<'_>,
    this: &Value,
    _args: &[Value],
) -> NativeResult {
    let value = match this {
        Value::Object(obj) => match &obj.borrow().kind {
            ObjectKind::Boxed(inner) => inner.truthy(),
            _ => true,
        },
        other => other.truthy(),
    };
    Ok(Value::Bool(value))
}

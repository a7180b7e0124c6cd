//! The `Math` namespace object.

use super::{arg_f64, method, property, Prototypes};
use crate::function::NativeResult;
use crate::interp::NativeContext;
use crate::object::{new_ref, JsObject};
use crate::value::Value;

/// Build the `Math` global.
pub(crate) fn build(protos: &Prototypes) -> Value {
    let math = new_ref(JsObject::plain(Some(protos.object.clone())));
    property(&math, "PI", Value::Number(std::f64::consts::PI));
    property(&math, "E", Value::Number(std::f64::consts::E));
    property(&math, "LN2", Value::Number(std::f64::consts::LN_2));
    property(&math, "LN10", Value::Number(std::f64::consts::LN_10));
    property(&math, "LOG2E", Value::Number(std::f64::consts::LOG2_E));
    property(&math, "LOG10E", Value::Number(std::f64::consts::LOG10_E));
    property(&math, "SQRT2", Value::Number(std::f64::consts::SQRT_2));
    property(
        &math,
        "SQRT1_2",
        Value::Number(std::f64::consts::FRAC_1_SQRT_2),
    );
    method(protos, &math, "abs", abs);
    method(protos, &math, "ceil", ceil);
    method(protos, &math, "floor", floor);
    method(protos, &math, "round", round);
    method(protos, &math, "trunc", trunc);
    method(protos, &math, "sign", sign);
    method(protos, &math, "sqrt", sqrt);
    method(protos, &math, "cbrt", cbrt);
    method(protos, &math, "pow", pow);
    method(protos, &math, "exp", exp);
    method(protos, &math, "log", log);
    method(protos, &math, "log2", log2);
    method(protos, &math, "log10", log10);
    method(protos, &math, "min", min);
    method(protos, &math, "max", max);
    method(protos, &math, "hypot", hypot);
    method(protos, &math, "random", random);
    Value::Object(math)
}

fn abs(_ctx: &mut NativeContext<'_>, _this: &Value, args: &[Value]) -> NativeResult {
    Ok(Value::Number(arg_f64(args, 0).abs()))
}

fn ceil(_ctx: &mut NativeContext<'_>, _this: &Value, args: &[Value]) -> NativeResult {
    Ok(Value::Number(arg_f64(args, 0).ceil()))
}

fn floor(_ctx: &mut NativeContext<'_>, _this: &Value, args: &[Value]) -> NativeResult {
    Ok(Value::Number(arg_f64(args, 0).floor()))
}

fn round(_ctx: &mut NativeContext<'_>, _this: &Value, args: &[Value]) -> NativeResult {
    // Half-way cases round toward positive infinity.
    let n = arg_f64(args, 0);
    let rounded = if n.is_finite() { (n + 0.5).floor() } else { n };
    Ok(Value::Number(rounded))
}

fn trunc(_ctx: &mut NativeContext<'_>, _this: &Value, args: &[Value]) -> NativeResult {
    Ok(Value::Number(arg_f64(args, 0).trunc()))
}

fn sign(_ctx: &mut NativeContext<'_>, _this: &Value, args: &[Value]) -> NativeResult {
    let n = arg_f64(args, 0);
    let result = if n.is_nan() || n == 0.0 { n } else { n.signum() };
    Ok(Value::Number(result))
}

fn sqrt(_ctx: &mut NativeContext<'_>, _this: &Value, args: &[Value]) -> NativeResult {
    Ok(Value::Number(arg_f64(args, 0).sqrt()))
}

fn cbrt(_ctx: &mut NativeContext<'_>, _this: &Value, args: &[Value]) -> NativeResult {
    Ok(Value::Number(arg_f64(args, 0).cbrt()))
}

fn pow(_ctx: &mut NativeContext<'_>, _this: &Value, args: &[Value]) -> NativeResult {
    Ok(Value::Number(arg_f64(args, 0).powf(arg_f64(args, 1))))
}

fn exp(_ctx: &mut NativeContext<'_>, _this: &Value, args: &[Value]) -> NativeResult {
    Ok(Value::Number(arg_f64(args, 0).exp()))
}

fn log(_ctx: &mut NativeContext<'_>, _this: &Value, args: &[Value]) -> NativeResult {
    Ok(Value::Number(arg_f64(args, 0).ln()))
}

fn log2(_ctx: &mut NativeContext<'_>, _this: &Value, args: &[Value]) -> NativeResult {
    Ok(Value::Number(arg_f64(args, 0).log2()))
}

fn log10(_ctx: &mut NativeContext<'_>, _this: &Value, args: &[Value]) -> NativeResult {
    Ok(Value::Number(arg_f64(args, 0).log10()))
}

fn min(_ctx: &mut NativeContext<'_>, _this: &Value, args: &[Value]) -> NativeResult {
    let mut result = f64::INFINITY;
    for value in args {
        let n = value.to_number();
        if n.is_nan() {
            return Ok(Value::Number(f64::NAN));
        }
        result = result.min(n);
    }
    Ok(Value::Number(result))
}

fn max(_ctx: &mut NativeContext<'_>, _this: &Value, args: &[Value]) -> NativeResult {
    let mut result = f64::NEG_INFINITY;
    for value in args {
        let n = value.to_number();
        if n.is_nan() {
            return Ok(Value::Number(f64::NAN));
        }
        result = result.max(n);
    }
    Ok(Value::Number(result))
}

fn hypot(_ctx: &mut NativeContext<'_>, _this: &Value, args: &[Value]) -> NativeResult {
    let sum: f64 = args.iter().map(|v| v.to_number().powi(2)).sum();
    Ok(Value::Number(sum.sqrt()))
}

fn random(_ctx: &mut NativeContext<'_>, _this: &Value, _args: &[Value]) -> NativeResult {
    // A small xorshift seeded from the clock; the engine carries no RNG
    // dependency and scripts only need a uniform-ish [0, 1).
    use std::cell::Cell;
    use std::time::{SystemTime, UNIX_EPOCH};
    thread_local! {
        static STATE: Cell<u64> = Cell::new(0);
    }
    let value = STATE.with(|state| {
        let mut x = state.get();
        if x == 0 {
            x = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_nanos() as u64)
                .unwrap_or(0x9e3779b97f4a7c15)
                | 1;
        }
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        state.set(x);
        x
    });
    Ok(Value::Number((value >> 11) as f64 / (1u64 << 53) as f64))
}

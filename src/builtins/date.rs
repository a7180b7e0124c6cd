//! The Date builtin, backed by epoch milliseconds and chrono's UTC
//! calendar math. The engine runs on UTC semantics throughout, so the
//! local-time getters and the UTC getters coincide.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, TimeZone, Timelike, Utc};

use super::{arg_f64, method, native_value, property, Prototypes};
use crate::function::{NativeResult, Throw};
use crate::interp::NativeContext;
use crate::object::{new_ref, JsObject, ObjectKind, ObjectRef};
use crate::value::Value;

pub(crate) fn install(protos: &Prototypes) {
    let proto = &protos.date;
    method(protos, proto, "getTime", get_time);
    method(protos, proto, "valueOf", get_time);
    method(protos, proto, "getFullYear", get_full_year);
    method(protos, proto, "getMonth", get_month);
    method(protos, proto, "getDate", get_date);
    method(protos, proto, "getDay", get_day);
    method(protos, proto, "getHours", get_hours);
    method(protos, proto, "getMinutes", get_minutes);
    method(protos, proto, "getSeconds", get_seconds);
    method(protos, proto, "getMilliseconds", get_milliseconds);
    method(protos, proto, "setFullYear", set_full_year);
    method(protos, proto, "setMonth", set_month);
    method(protos, proto, "setDate", set_date);
    method(protos, proto, "setHours", set_hours);
    method(protos, proto, "setMinutes", set_minutes);
    method(protos, proto, "setSeconds", set_seconds);
    method(protos, proto, "setMilliseconds", set_milliseconds);
    method(protos, proto, "setTime", set_time);
    method(protos, proto, "toISOString", to_iso);
    method(protos, proto, "toUTCString", to_utc);
    method(protos, proto, "toLocaleString", to_locale);
    method(protos, proto, "toString", to_iso);
    method(protos, proto, "toJSON", to_iso);
}

pub(crate) fn constructor(protos: &Prototypes) -> Value {
    let ctor = native_value(protos, "Date", date_constructor);
    if let Value::Object(obj) = &ctor {
        property(obj, "prototype", Value::Object(protos.date.clone()));
        property(&protos.date, "constructor", ctor.clone());
        method(protos, obj, "now", now);
        method(protos, obj, "parse", parse);
        method(protos, obj, "UTC", utc);
    }
    ctor
}

fn now_millis() -> f64 {
    Utc::now().timestamp_millis() as f64
}

fn datetime(millis: f64) -> Option<DateTime<Utc>> {
    if !millis.is_finite() {
        return None;
    }
    DateTime::from_timestamp_millis(millis as i64)
}

/// ISO-8601 with milliseconds, the display form of every date here.
#[must_use]
pub(crate) fn to_iso_string(millis: f64) -> String {
    match datetime(millis) {
        Some(date) => date.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string(),
        None => "Invalid Date".to_string(),
    }
}

/// Parse ISO and UTC date strings; NaN for anything unrecognized.
#[must_use]
pub(crate) fn parse_date(text: &str) -> f64 {
    let text = text.trim();
    if let Ok(date) = DateTime::parse_from_rfc3339(text) {
        return date.timestamp_millis() as f64;
    }
    if let Ok(date) = DateTime::parse_from_rfc2822(text) {
        return date.timestamp_millis() as f64;
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return naive.and_utc().timestamp_millis() as f64;
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        if let Some(naive) = date.and_hms_opt(0, 0, 0) {
            return naive.and_utc().timestamp_millis() as f64;
        }
    }
    f64::NAN
}

/// Epoch millis from calendar components (month is 0-based).
fn components_to_millis(args: &[Value]) -> f64 {
    let year = arg_f64(args, 0);
    let month = if args.len() > 1 { arg_f64(args, 1) } else { 0.0 };
    let day = if args.len() > 2 { arg_f64(args, 2) } else { 1.0 };
    let hours = if args.len() > 3 { arg_f64(args, 3) } else { 0.0 };
    let minutes = if args.len() > 4 { arg_f64(args, 4) } else { 0.0 };
    let seconds = if args.len() > 5 { arg_f64(args, 5) } else { 0.0 };
    let millis = if args.len() > 6 { arg_f64(args, 6) } else { 0.0 };
    if !year.is_finite() || !month.is_finite() {
        return f64::NAN;
    }
    match Utc.with_ymd_and_hms(
        year as i32,
        month as u32 + 1,
        day as u32,
        hours as u32,
        minutes as u32,
        seconds as u32,
    ) {
        chrono::LocalResult::Single(date) => date.timestamp_millis() as f64 + millis,
        _ => f64::NAN,
    }
}

fn new_date(ctx: &NativeContext<'_>, millis: f64) -> Value {
    Value::Object(new_ref(JsObject::with_kind(
        ObjectKind::Date(millis),
        Some(ctx.protos().date.clone()),
    )))
}

fn date_constructor(ctx: &mut NativeContext<'_>, _this: &Value, args: &[Value]) -> NativeResult {
    let millis = match args {
        [] => now_millis(),
        [Value::Str(text)] => parse_date(text),
        [single] => match single {
            Value::Object(obj) => match &obj.borrow().kind {
                ObjectKind::Date(millis) => *millis,
                _ => single.to_number(),
            },
            other => other.to_number(),
        },
        _ => components_to_millis(args),
    };
    if ctx.is_constructor_call() {
        Ok(new_date(ctx, millis))
    } else {
        // A plain `Date(...)` call returns the string form.
        Ok(Value::str(to_iso_string(millis)))
    }
}

fn now(_ctx: &mut NativeContext<'_>, _this: &Value, _args: &[Value]) -> NativeResult {
    Ok(Value::Number(now_millis()))
}

fn parse(_ctx: &mut NativeContext<'_>, _this: &Value, args: &[Value]) -> NativeResult {
    let text = args.first().map_or_else(String::new, Value::to_display);
    Ok(Value::Number(parse_date(&text)))
}

fn utc(_ctx: &mut NativeContext<'_>, _this: &Value, args: &[Value]) -> NativeResult {
    Ok(Value::Number(components_to_millis(args)))
}

// ----------------------------------------------------------------------
// Prototype methods
// ----------------------------------------------------------------------

fn this_date(ctx: &NativeContext<'_>, this: &Value, what: &str) -> Result<(ObjectRef, f64), Throw> {
    match this {
        Value::Object(obj) => {
            let millis = match &obj.borrow().kind {
                ObjectKind::Date(millis) => *millis,
                _ => return Err(ctx.type_error(format!("{} called on a non-date", what))),
            };
            Ok((obj.clone(), millis))
        }
        _ => Err(ctx.type_error(format!("{} called on a non-date", what))),
    }
}

fn get_time(ctx: &mut NativeContext<'_>, this: &Value, _args: &[Value]) -> NativeResult {
    let (_, millis) = this_date(ctx, this, "getTime")?;
    Ok(Value::Number(millis))
}

fn get_part(
    ctx: &mut NativeContext<'_>,
    this: &Value,
    what: &str,
    part: fn(&DateTime<Utc>) -> f64,
) -> NativeResult {
    let (_, millis) = this_date(ctx, this, what)?;
    Ok(Value::Number(
        datetime(millis).map_or(f64::NAN, |date| part(&date)),
    ))
}

fn get_full_year(ctx: &mut NativeContext<'_>, this: &Value, _args: &[Value]) -> NativeResult {
    get_part(ctx, this, "getFullYear", |d| f64::from(d.year()))
}

fn get_month(ctx: &mut NativeContext<'_>, this: &Value, _args: &[Value]) -> NativeResult {
    // 0-based externally.
    get_part(ctx, this, "getMonth", |d| f64::from(d.month0()))
}

fn get_date(ctx: &mut NativeContext<'_>, this: &Value, _args: &[Value]) -> NativeResult {
    get_part(ctx, this, "getDate", |d| f64::from(d.day()))
}

fn get_day(ctx: &mut NativeContext<'_>, this: &Value, _args: &[Value]) -> NativeResult {
    get_part(ctx, this, "getDay", |d| {
        f64::from(d.weekday().num_days_from_sunday())
    })
}

fn get_hours(ctx: &mut NativeContext<'_>, this: &Value, _args: &[Value]) -> NativeResult {
    get_part(ctx, this, "getHours", |d| f64::from(d.hour()))
}

fn get_minutes(ctx: &mut NativeContext<'_>, this: &Value, _args: &[Value]) -> NativeResult {
    get_part(ctx, this, "getMinutes", |d| f64::from(d.minute()))
}

fn get_seconds(ctx: &mut NativeContext<'_>, this: &Value, _args: &[Value]) -> NativeResult {
    get_part(ctx, this, "getSeconds", |d| f64::from(d.second()))
}

fn get_milliseconds(ctx: &mut NativeContext<'_>, this: &Value, _args: &[Value]) -> NativeResult {
    get_part(ctx, this, "getMilliseconds", |d| {
        f64::from(d.timestamp_subsec_millis())
    })
}

fn store(obj: &ObjectRef, millis: f64) -> NativeResult {
    if let ObjectKind::Date(slot) = &mut obj.borrow_mut().kind {
        *slot = millis;
    }
    Ok(Value::Number(millis))
}

fn set_time(ctx: &mut NativeContext<'_>, this: &Value, args: &[Value]) -> NativeResult {
    let (obj, _) = this_date(ctx, this, "setTime")?;
    store(&obj, arg_f64(args, 0))
}

fn set_with(
    ctx: &mut NativeContext<'_>,
    this: &Value,
    what: &str,
    args: &[Value],
    apply: fn(DateTime<Utc>, &[f64]) -> Option<DateTime<Utc>>,
) -> NativeResult {
    let (obj, millis) = this_date(ctx, this, what)?;
    let Some(date) = datetime(millis) else {
        return store(&obj, f64::NAN);
    };
    let numbers: Vec<f64> = args.iter().map(Value::to_number).collect();
    if numbers.iter().any(|n| !n.is_finite()) {
        return store(&obj, f64::NAN);
    }
    match apply(date, &numbers) {
        Some(updated) => {
            let extra = millis.rem_euclid(1000.0).trunc();
            let base = updated.timestamp() as f64 * 1000.0 + extra;
            store(&obj, base)
        }
        None => store(&obj, f64::NAN),
    }
}

fn set_full_year(ctx: &mut NativeContext<'_>, this: &Value, args: &[Value]) -> NativeResult {
    set_with(ctx, this, "setFullYear", args, |date, n| {
        let mut date = date.with_year(*n.first()? as i32)?;
        if let Some(month) = n.get(1) {
            date = date.with_month0(*month as u32)?;
        }
        if let Some(day) = n.get(2) {
            date = date.with_day(*day as u32)?;
        }
        Some(date)
    })
}

fn set_month(ctx: &mut NativeContext<'_>, this: &Value, args: &[Value]) -> NativeResult {
    set_with(ctx, this, "setMonth", args, |date, n| {
        let mut date = date.with_month0(*n.first()? as u32)?;
        if let Some(day) = n.get(1) {
            date = date.with_day(*day as u32)?;
        }
        Some(date)
    })
}

fn set_date(ctx: &mut NativeContext<'_>, this: &Value, args: &[Value]) -> NativeResult {
    set_with(ctx, this, "setDate", args, |date, n| {
        date.with_day(*n.first()? as u32)
    })
}

fn set_hours(ctx: &mut NativeContext<'_>, this: &Value, args: &[Value]) -> NativeResult {
    set_with(ctx, this, "setHours", args, |date, n| {
        let mut date = date.with_hour(*n.first()? as u32)?;
        if let Some(minute) = n.get(1) {
            date = date.with_minute(*minute as u32)?;
        }
        if let Some(second) = n.get(2) {
            date = date.with_second(*second as u32)?;
        }
        Some(date)
    })
}

fn set_minutes(ctx: &mut NativeContext<'_>, this: &Value, args: &[Value]) -> NativeResult {
    set_with(ctx, this, "setMinutes", args, |date, n| {
        let mut date = date.with_minute(*n.first()? as u32)?;
        if let Some(second) = n.get(1) {
            date = date.with_second(*second as u32)?;
        }
        Some(date)
    })
}

fn set_seconds(ctx: &mut NativeContext<'_>, this: &Value, args: &[Value]) -> NativeResult {
    set_with(ctx, this, "setSeconds", args, |date, n| {
        date.with_second(*n.first()? as u32)
    })
}

fn set_milliseconds(ctx: &mut NativeContext<'_>, this: &Value, args: &[Value]) -> NativeResult {
    let (obj, millis) = this_date(ctx, this, "setMilliseconds")?;
    let ms = arg_f64(args, 0);
    if !millis.is_finite() || !ms.is_finite() {
        return store(&obj, f64::NAN);
    }
    let base = (millis / 1000.0).trunc() * 1000.0;
    store(&obj, base + ms)
}

fn to_iso(ctx: &mut NativeContext<'_>, this: &Value, _args: &[Value]) -> NativeResult {
    let (_, millis) = this_date(ctx, this, "toISOString")?;
    if !millis.is_finite() {
        return Err(ctx.range_error("invalid time value"));
    }
    Ok(Value::str(to_iso_string(millis)))
}

fn to_utc(ctx: &mut NativeContext<'_>, this: &Value, _args: &[Value]) -> NativeResult {
    let (_, millis) = this_date(ctx, this, "toUTCString")?;
    Ok(Value::str(match datetime(millis) {
        Some(date) => date.format("%a, %d %b %Y %H:%M:%S GMT").to_string(),
        None => "Invalid Date".to_string(),
    }))
}

fn to_locale(ctx: &mut NativeContext<'_>, this: &Value, _args: &[Value]) -> NativeResult {
    let (_, millis) = this_date(ctx, this, "toLocaleString")?;
    Ok(Value::str(match datetime(millis) {
        Some(date) => date.format("%-m/%-d/%Y, %H:%M:%S").to_string(),
        None => "Invalid Date".to_string(),
    }))
}

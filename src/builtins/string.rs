//! String prototype methods.
//!
//! Indices are character indices. Methods taking a regex delegate to the
//! RegExp builtin's match helpers; `replace` supports both string
//! templates (`$$`, `$&`, `$1`..) and function replacers.

use super::regexp::{self, MatchInfo};
use super::{arg, arg_f64, method, native_value, property, rel_index, this_string, Prototypes};
use crate::function::NativeResult;
use crate::interp::NativeContext;
use crate::object::ObjectKind;
use crate::value::Value;

pub(crate) fn install(protos: &Prototypes) {
    let proto = &protos.string;
    method(protos, proto, "indexOf", index_of);
    method(protos, proto, "lastIndexOf", last_index_of);
    method(protos, proto, "startsWith", starts_with);
    method(protos, proto, "endsWith", ends_with);
    method(protos, proto, "includes", includes);
    method(protos, proto, "split", split);
    method(protos, proto, "charAt", char_at);
    method(protos, proto, "charCodeAt", char_code_at);
    method(protos, proto, "codePointAt", code_point_at);
    method(protos, proto, "concat", concat);
    method(protos, proto, "padStart", pad_start);
    method(protos, proto, "padEnd", pad_end);
    method(protos, proto, "repeat", repeat);
    method(protos, proto, "slice", slice);
    method(protos, proto, "substring", substring);
    method(protos, proto, "toUpperCase", to_upper_case);
    method(protos, proto, "toLowerCase", to_lower_case);
    method(protos, proto, "trim", trim);
    method(protos, proto, "trimStart", trim_start);
    method(protos, proto, "trimEnd", trim_end);
    method(protos, proto, "replace", replace);
    method(protos, proto, "replaceAll", replace_all);
    method(protos, proto, "match", match_method);
    method(protos, proto, "search", search);
    method(protos, proto, "at", at);
    method(protos, proto, "valueOf", value_of);
    method(protos, proto, "toString", value_of);
}

pub(crate) fn constructor(protos: &Prototypes) -> Value {
    let ctor = native_value(protos, "String", string_constructor);
    if let Value::Object(obj) = &ctor {
        property(obj, "prototype", Value::Object(protos.string.clone()));
        property(&protos.string, "constructor", ctor.clone());
        method(protos, obj, "fromCharCode", from_char_code);
    }
    ctor
}

fn string_constructor(ctx: &mut NativeContext<'_>, _this: &Value, args: &[Value]) -> NativeResult {
    let text = match args.first() {
        Some(value) => value.to_display(),
        None => String::new(),
    };
    if ctx.is_constructor_call() {
        // `new String(x)` boxes the primitive.
        return Ok(Value::Object(crate::object::new_ref(
            crate::object::JsObject::with_kind(
                ObjectKind::Boxed(Value::str(&text)),
                Some(ctx.protos().string.clone()),
            ),
        )));
    }
    Ok(Value::str(text))
}

fn from_char_code(_ctx: &mut NativeContext<'_>, _this: &Value, args: &[Value]) -> NativeResult {
    let mut out = String::new();
    for code in args {
        let code = code.to_number();
        if code.is_finite() && code >= 0.0 {
            if let Some(c) = char::from_u32(code as u32) {
                out.push(c);
            }
        }
    }
    Ok(Value::str(out))
}

// ----------------------------------------------------------------------
// Search
// ----------------------------------------------------------------------

/// Character index of `needle` in `haystack` at or after `from`.
fn char_index_of(haystack: &str, needle: &str, from: usize) -> Option<usize> {
    let chars: Vec<char> = haystack.chars().collect();
    if from > chars.len() {
        return None;
    }
    let tail: String = chars[from..].iter().collect();
    tail.find(needle)
        .map(|byte| from + tail[..byte].chars().count())
}

fn index_of(_ctx: &mut NativeContext<'_>, this: &Value, args: &[Value]) -> NativeResult {
    let haystack = this_string(this);
    let needle = arg(args, 0).to_display();
    let from = match args.get(1) {
        Some(n) => {
            let n = n.to_number();
            if n.is_nan() || n < 0.0 {
                0
            } else {
                n as usize
            }
        }
        None => 0,
    };
    Ok(Value::Number(
        char_index_of(&haystack, &needle, from).map_or(-1.0, |i| i as f64),
    ))
}

fn last_index_of(_ctx: &mut NativeContext<'_>, this: &Value, args: &[Value]) -> NativeResult {
    let haystack = this_string(this);
    let needle = arg(args, 0).to_display();
    Ok(Value::Number(
        haystack
            .rfind(&needle)
            .map_or(-1.0, |byte| haystack[..byte].chars().count() as f64),
    ))
}

fn starts_with(_ctx: &mut NativeContext<'_>, this: &Value, args: &[Value]) -> NativeResult {
    let haystack = this_string(this);
    let needle = arg(args, 0).to_display();
    Ok(Value::Bool(haystack.starts_with(&needle)))
}

fn ends_with(_ctx: &mut NativeContext<'_>, this: &Value, args: &[Value]) -> NativeResult {
    let haystack = this_string(this);
    let needle = arg(args, 0).to_display();
    Ok(Value::Bool(haystack.ends_with(&needle)))
}

fn includes(_ctx: &mut NativeContext<'_>, this: &Value, args: &[Value]) -> NativeResult {
    let haystack = this_string(this);
    let needle = arg(args, 0).to_display();
    Ok(Value::Bool(haystack.contains(&needle)))
}

// ----------------------------------------------------------------------
// Slicing and padding
// ----------------------------------------------------------------------

fn char_at(_ctx: &mut NativeContext<'_>, this: &Value, args: &[Value]) -> NativeResult {
    let text = this_string(this);
    let index = arg_f64(args, 0);
    let index = if index.is_nan() { 0.0 } else { index };
    if index < 0.0 {
        return Ok(Value::str(""));
    }
    Ok(text
        .chars()
        .nth(index as usize)
        .map(|c| Value::str(c.to_string()))
        .unwrap_or_else(|| Value::str("")))
}

fn char_code_at(_ctx: &mut NativeContext<'_>, this: &Value, args: &[Value]) -> NativeResult {
    let text = this_string(this);
    let index = arg_f64(args, 0);
    let index = if index.is_nan() { 0.0 } else { index };
    if index < 0.0 {
        return Ok(Value::Number(f64::NAN));
    }
    Ok(text
        .chars()
        .nth(index as usize)
        .map(|c| Value::Number(f64::from(c as u32)))
        .unwrap_or(Value::Number(f64::NAN)))
}

fn code_point_at(_ctx: &mut NativeContext<'_>, this: &Value, args: &[Value]) -> NativeResult {
    let text = this_string(this);
    let index = arg_f64(args, 0);
    let index = if index.is_nan() || index < 0.0 { 0.0 } else { index };
    Ok(text
        .chars()
        .nth(index as usize)
        .map(|c| Value::Number(f64::from(c as u32)))
        .unwrap_or(Value::Undefined))
}

fn concat(_ctx: &mut NativeContext<'_>, this: &Value, args: &[Value]) -> NativeResult {
    let mut out = this_string(this);
    for part in args {
        out.push_str(&part.to_display());
    }
    Ok(Value::str(out))
}

fn pad(this: &Value, args: &[Value], at_start: bool) -> Value {
    let text = this_string(this);
    let len = text.chars().count();
    let target = arg_f64(args, 0);
    let target = if target.is_nan() || target < 0.0 { 0 } else { target as usize };
    if target <= len {
        return Value::str(text);
    }
    let filler = match args.get(1) {
        Some(Value::Undefined) | None => " ".to_string(),
        Some(filler) => filler.to_display(),
    };
    if filler.is_empty() {
        return Value::str(text);
    }
    let mut padding = String::new();
    while padding.chars().count() < target - len {
        padding.push_str(&filler);
    }
    let padding: String = padding.chars().take(target - len).collect();
    if at_start {
        Value::str(format!("{}{}", padding, text))
    } else {
        Value::str(format!("{}{}", text, padding))
    }
}

fn pad_start(_ctx: &mut NativeContext<'_>, this: &Value, args: &[Value]) -> NativeResult {
    Ok(pad(this, args, true))
}

fn pad_end(_ctx: &mut NativeContext<'_>, this: &Value, args: &[Value]) -> NativeResult {
    Ok(pad(this, args, false))
}

fn repeat(ctx: &mut NativeContext<'_>, this: &Value, args: &[Value]) -> NativeResult {
    let text = this_string(this);
    let count = arg_f64(args, 0);
    if count < 0.0 || count.is_infinite() {
        return Err(ctx.range_error("invalid count value"));
    }
    let count = if count.is_nan() { 0 } else { count as usize };
    Ok(Value::str(text.repeat(count)))
}

fn slice(_ctx: &mut NativeContext<'_>, this: &Value, args: &[Value]) -> NativeResult {
    let chars: Vec<char> = this_string(this).chars().collect();
    let len = chars.len();
    let start = match args.first() {
        Some(Value::Undefined) | None => 0,
        Some(n) => rel_index(n.to_number(), len),
    };
    let end = match args.get(1) {
        Some(Value::Undefined) | None => len,
        Some(n) => rel_index(n.to_number(), len),
    };
    let out: String = chars[start..end.max(start)].iter().collect();
    Ok(Value::str(out))
}

fn substring(_ctx: &mut NativeContext<'_>, this: &Value, args: &[Value]) -> NativeResult {
    let chars: Vec<char> = this_string(this).chars().collect();
    let len = chars.len();
    let clamp = |n: f64| -> usize {
        if n.is_nan() || n < 0.0 {
            0
        } else {
            (n as usize).min(len)
        }
    };
    let mut start = match args.first() {
        Some(Value::Undefined) | None => 0,
        Some(n) => clamp(n.to_number()),
    };
    let mut end = match args.get(1) {
        Some(Value::Undefined) | None => len,
        Some(n) => clamp(n.to_number()),
    };
    if start > end {
        std::mem::swap(&mut start, &mut end);
    }
    let out: String = chars[start..end].iter().collect();
    Ok(Value::str(out))
}

fn at(_ctx: &mut NativeContext<'_>, this: &Value, args: &[Value]) -> NativeResult {
    let chars: Vec<char> = this_string(this).chars().collect();
    let n = arg_f64(args, 0);
    let n = if n.is_nan() { 0.0 } else { n.trunc() };
    let index = if n < 0.0 {
        match chars.len().checked_sub((-n) as usize) {
            Some(index) => index,
            None => return Ok(Value::Undefined),
        }
    } else {
        n as usize
    };
    Ok(chars
        .get(index)
        .map(|c| Value::str(c.to_string()))
        .unwrap_or(Value::Undefined))
}

fn to_upper_case(_ctx: &mut NativeContext<'_>, this: &Value, _args: &[Value]) -> NativeResult {
    Ok(Value::str(this_string(this).to_uppercase()))
}

fn to_lower_case(_ctx: &mut NativeContext<'_>, this: &Value, _args: &[Value]) -> NativeResult {
    Ok(Value::str(this_string(this).to_lowercase()))
}

fn trim(_ctx: &mut NativeContext<'_>, this: &Value, _args: &[Value]) -> NativeResult {
    Ok(Value::str(this_string(this).trim()))
}

fn trim_start(_ctx: &mut NativeContext<'_>, this: &Value, _args: &[Value]) -> NativeResult {
    Ok(Value::str(this_string(this).trim_start()))
}

fn trim_end(_ctx: &mut NativeContext<'_>, this: &Value, _args: &[Value]) -> NativeResult {
    Ok(Value::str(this_string(this).trim_end()))
}

fn value_of(_ctx: &mut NativeContext<'_>, this: &Value, _args: &[Value]) -> NativeResult {
    Ok(Value::str(this_string(this)))
}

// ----------------------------------------------------------------------
// Split
// ----------------------------------------------------------------------

fn split(ctx: &mut NativeContext<'_>, this: &Value, args: &[Value]) -> NativeResult {
    let text = this_string(this);
    let limit = match args.get(1) {
        Some(Value::Undefined) | None => usize::MAX,
        Some(n) => {
            let n = n.to_number();
            if n.is_nan() || n < 0.0 {
                usize::MAX
            } else {
                n as usize
            }
        }
    };

    let mut parts: Vec<Value> = match args.first() {
        Some(Value::Undefined) | None => vec![Value::str(&text)],
        Some(Value::Object(obj)) if matches!(&obj.borrow().kind, ObjectKind::Regex(_)) => {
            let regex = {
                let guard = obj.borrow();
                let ObjectKind::Regex(regex) = &guard.kind else {
                    unreachable!("checked above");
                };
                regex.regex.clone()
            };
            let chars: Vec<char> = text.chars().collect();
            let mut out = Vec::new();
            let mut from = 0usize;
            for found in regexp::find_all(&regex, &text) {
                let piece: String = chars[from..found.start.max(from)].iter().collect();
                out.push(Value::str(piece));
                from = found.end.max(from);
            }
            let piece: String = chars[from.min(chars.len())..].iter().collect();
            out.push(Value::str(piece));
            out
        }
        Some(separator) => {
            let separator = separator.to_display();
            if separator.is_empty() {
                text.chars().map(|c| Value::str(c.to_string())).collect()
            } else {
                text.split(&separator).map(Value::str).collect()
            }
        }
    };
    parts.truncate(limit);
    Ok(ctx.new_array(parts))
}

// ----------------------------------------------------------------------
// Regex-powered methods
// ----------------------------------------------------------------------

/// Expand a replacement template: `$$`, `$&`, `$1`..`$99`.
fn expand_template(template: &str, found: &MatchInfo) -> String {
    let mut out = String::new();
    let mut chars = template.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '$' {
            out.push(c);
            continue;
        }
        match chars.peek() {
            Some('$') => {
                chars.next();
                out.push('$');
            }
            Some('&') => {
                chars.next();
                out.push_str(&found.text);
            }
            Some(d) if d.is_ascii_digit() => {
                let mut number = chars.next().expect("peeked").to_digit(10).expect("digit");
                if let Some(d2) = chars.peek().and_then(|c| c.to_digit(10)) {
                    let two = number * 10 + d2;
                    if two as usize <= found.groups.len() {
                        number = two;
                        chars.next();
                    }
                }
                match found.groups.get(number as usize - 1) {
                    Some(Some(group)) => out.push_str(group),
                    Some(None) => (),
                    None => {
                        out.push('$');
                        out.push_str(&number.to_string());
                    }
                }
            }
            _ => out.push('$'),
        }
    }
    out
}

/// Produce the replacement text for one match.
fn replacement_for(
    ctx: &mut NativeContext<'_>,
    replacer: &Value,
    found: &MatchInfo,
    input: &str,
) -> Result<String, crate::function::Throw> {
    let is_function = matches!(replacer, Value::Object(obj) if obj.borrow().as_function().is_some());
    if is_function {
        let mut call_args = vec![Value::str(&found.text)];
        call_args.extend(found.groups.iter().map(|group| match group {
            Some(text) => Value::str(text),
            None => Value::Undefined,
        }));
        call_args.push(Value::Number(found.start as f64));
        call_args.push(Value::str(input));
        let result = ctx.call_function(replacer, Value::Undefined, call_args)?;
        Ok(result.to_display())
    } else {
        Ok(expand_template(&replacer.to_display(), found))
    }
}

fn replace_matches(
    ctx: &mut NativeContext<'_>,
    text: &str,
    matches: &[MatchInfo],
    replacer: &Value,
) -> Result<String, crate::function::Throw> {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::new();
    let mut from = 0usize;
    for found in matches {
        let prefix: String = chars[from..found.start.max(from)].iter().collect();
        out.push_str(&prefix);
        out.push_str(&replacement_for(ctx, replacer, found, text)?);
        from = found.end.max(from);
    }
    let suffix: String = chars[from.min(chars.len())..].iter().collect();
    out.push_str(&suffix);
    Ok(out)
}

/// The compiled regex of a regex-object argument.
fn regex_arg(value: &Value) -> Option<(crate::Shared<fancy_regex::Regex>, bool)> {
    match value {
        Value::Object(obj) => {
            let guard = obj.borrow();
            match &guard.kind {
                ObjectKind::Regex(regex) => Some((regex.regex.clone(), regex.is_global())),
                _ => None,
            }
        }
        _ => None,
    }
}

fn replace(ctx: &mut NativeContext<'_>, this: &Value, args: &[Value]) -> NativeResult {
    let text = this_string(this);
    let pattern = arg(args, 0);
    let replacer = arg(args, 1);

    if let Some((regex, global)) = regex_arg(&pattern) {
        let matches = if global {
            regexp::find_all(&regex, &text)
        } else {
            regexp::find_at(&regex, &text, 0).into_iter().collect()
        };
        let out = replace_matches(ctx, &text, &matches, &replacer)?;
        return Ok(Value::str(out));
    }

    // String pattern: first occurrence only.
    let needle = pattern.to_display();
    match char_index_of(&text, &needle, 0) {
        Some(start) => {
            let found = MatchInfo {
                start,
                end: start + needle.chars().count(),
                text: needle,
                groups: Vec::new(),
            };
            let out = replace_matches(ctx, &text, &[found], &replacer)?;
            Ok(Value::str(out))
        }
        None => Ok(Value::str(text)),
    }
}

fn replace_all(ctx: &mut NativeContext<'_>, this: &Value, args: &[Value]) -> NativeResult {
    let text = this_string(this);
    let pattern = arg(args, 0);
    let replacer = arg(args, 1);

    if let Some((regex, global)) = regex_arg(&pattern) {
        if !global {
            return Err(ctx.type_error("replaceAll must be called with a global RegExp"));
        }
        let matches = regexp::find_all(&regex, &text);
        let out = replace_matches(ctx, &text, &matches, &replacer)?;
        return Ok(Value::str(out));
    }

    let needle = pattern.to_display();
    if needle.is_empty() {
        return Ok(Value::str(text));
    }
    let mut matches = Vec::new();
    let mut from = 0usize;
    while let Some(start) = char_index_of(&text, &needle, from) {
        let end = start + needle.chars().count();
        matches.push(MatchInfo {
            start,
            end,
            text: needle.clone(),
            groups: Vec::new(),
        });
        from = end;
    }
    let out = replace_matches(ctx, &text, &matches, &replacer)?;
    Ok(Value::str(out))
}

fn match_method(ctx: &mut NativeContext<'_>, this: &Value, args: &[Value]) -> NativeResult {
    let text = this_string(this);
    let pattern = arg(args, 0);
    let (regex, global) = match regex_arg(&pattern) {
        Some(found) => found,
        None => {
            let compiled = regexp::compile(&pattern.to_display(), "")
                .map_err(|message| ctx.syntax_error(message))?;
            (compiled.regex, false)
        }
    };

    if global {
        let matches = regexp::find_all(&regex, &text);
        if matches.is_empty() {
            return Ok(Value::Null);
        }
        let out: Vec<Value> = matches
            .iter()
            .map(|found| Value::str(&found.text))
            .collect();
        return Ok(ctx.new_array(out));
    }

    match regexp::find_at(&regex, &text, 0) {
        Some(found) => Ok(regexp::match_array(ctx, &found, &text)),
        None => Ok(Value::Null),
    }
}

fn search(ctx: &mut NativeContext<'_>, this: &Value, args: &[Value]) -> NativeResult {
    let text = this_string(this);
    let pattern = arg(args, 0);
    let regex = match regex_arg(&pattern) {
        Some((regex, _)) => regex,
        None => {
            let compiled = regexp::compile(&pattern.to_display(), "")
                .map_err(|message| ctx.syntax_error(message))?;
            compiled.regex
        }
    };
    Ok(Value::Number(
        regexp::find_at(&regex, &text, 0).map_or(-1.0, |found| found.start as f64),
    ))
}

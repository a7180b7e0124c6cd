//! The RegExp builtin.
//!
//! Patterns compile through `fancy-regex` (JS sources lean on lookaround
//! and backreferences, which the plain `regex` engine rejects). The `i`,
//! `m` and `s` flags translate to inline flags; `g` drives the stateful
//! `lastIndex` protocol implemented here. Indices exposed to scripts are
//! character indices.

use super::{arg, method, native_value, property, Prototypes};
use crate::function::NativeResult;
use crate::interp::NativeContext;
use crate::object::{new_ref, JsObject, JsRegex, ObjectKind, ObjectRef};
use crate::value::Value;
use crate::{Identifier, Shared};

pub(crate) fn install(protos: &Prototypes) {
    let proto = &protos.regexp;
    method(protos, proto, "test", test);
    method(protos, proto, "exec", exec);
    method(protos, proto, "toString", to_string);
}

pub(crate) fn constructor(protos: &Prototypes) -> Value {
    let ctor = native_value(protos, "RegExp", regexp_constructor);
    if let Value::Object(obj) = &ctor {
        property(obj, "prototype", Value::Object(protos.regexp.clone()));
        property(&protos.regexp, "constructor", ctor.clone());
    }
    ctor
}

fn regexp_constructor(ctx: &mut NativeContext<'_>, _this: &Value, args: &[Value]) -> NativeResult {
    let (source, flags) = match args.first() {
        Some(Value::Object(obj)) => {
            let guard = obj.borrow();
            match &guard.kind {
                ObjectKind::Regex(regex) => {
                    let flags = match args.get(1) {
                        Some(Value::Undefined) | None => regex.flags.clone(),
                        Some(flags) => flags.to_display(),
                    };
                    (regex.source.clone(), flags)
                }
                _ => (arg(args, 0).to_display(), arg_flags(args)),
            }
        }
        Some(Value::Undefined) | None => ("(?:)".to_string(), arg_flags(args)),
        Some(pattern) => (pattern.to_display(), arg_flags(args)),
    };
    match compile(&source, &flags) {
        Ok(regex) => Ok(Value::Object(new_ref(JsObject::with_kind(
            ObjectKind::Regex(regex),
            Some(ctx.protos().regexp.clone()),
        )))),
        Err(message) => Err(ctx.syntax_error(format!("invalid regular expression: {}", message))),
    }
}

fn arg_flags(args: &[Value]) -> String {
    match args.get(1) {
        Some(Value::Undefined) | None => String::new(),
        Some(flags) => flags.to_display(),
    }
}

/// Compile a JS regex source and flag string.
pub(crate) fn compile(source: &str, flags: &str) -> Result<JsRegex, String> {
    let mut inline = String::new();
    for flag in flags.chars() {
        match flag {
            'i' => inline.push('i'),
            'm' => inline.push('m'),
            's' => inline.push('s'),
            // `g` and `y` affect matching state, `u` is the default here.
            'g' | 'y' | 'u' => (),
            other => return Err(format!("unknown flag '{}'", other)),
        }
    }
    let pattern = if inline.is_empty() {
        source.to_string()
    } else {
        format!("(?{}){}", inline, source)
    };
    let regex = fancy_regex::Regex::new(&pattern).map_err(|err| err.to_string())?;
    Ok(JsRegex {
        source: source.to_string(),
        flags: flags.to_string(),
        regex: Shared::new(regex),
        last_index: 0,
    })
}

/// One match with character spans and captured groups.
pub(crate) struct MatchInfo {
    pub start: usize,
    pub end: usize,
    pub text: String,
    pub groups: Vec<Option<String>>,
}

fn char_to_byte(s: &str, char_index: usize) -> Option<usize> {
    if char_index == 0 {
        return Some(0);
    }
    s.char_indices()
        .nth(char_index)
        .map(|(byte, _)| byte)
        .or_else(|| {
            if s.chars().count() == char_index {
                Some(s.len())
            } else {
                None
            }
        })
}

fn byte_to_char(s: &str, byte_index: usize) -> usize {
    s[..byte_index].chars().count()
}

/// Find the first match at or after `from` (a character index).
pub(crate) fn find_at(regex: &fancy_regex::Regex, haystack: &str, from: usize) -> Option<MatchInfo> {
    let byte_from = char_to_byte(haystack, from)?;
    let captures = regex.captures_from_pos(haystack, byte_from).ok()??;
    let full = captures.get(0)?;
    Some(MatchInfo {
        start: byte_to_char(haystack, full.start()),
        end: byte_to_char(haystack, full.end()),
        text: full.as_str().to_string(),
        groups: (1..captures.len())
            .map(|i| captures.get(i).map(|g| g.as_str().to_string()))
            .collect(),
    })
}

/// All non-overlapping matches from the start of the string.
pub(crate) fn find_all(regex: &fancy_regex::Regex, haystack: &str) -> Vec<MatchInfo> {
    let mut out = Vec::new();
    let mut from = 0usize;
    let total = haystack.chars().count();
    while from <= total {
        let Some(found) = find_at(regex, haystack, from) else {
            break;
        };
        // An empty match still advances the cursor.
        from = if found.end > found.start {
            found.end
        } else {
            found.end + 1
        };
        out.push(found);
    }
    out
}

/// Build the exec-style result array: `[full, group1, ...]` with `index`
/// and `input` properties.
pub(crate) fn match_array(ctx: &NativeContext<'_>, found: &MatchInfo, input: &str) -> Value {
    let mut elements = vec![Value::str(&found.text)];
    elements.extend(found.groups.iter().map(|group| match group {
        Some(text) => Value::str(text),
        None => Value::Undefined,
    }));
    let array = new_ref(JsObject::array(elements, Some(ctx.protos().array.clone())));
    array.borrow_mut().props.insert(
        Identifier::from("index"),
        Value::Number(found.start as f64),
    );
    array
        .borrow_mut()
        .props
        .insert(Identifier::from("input"), Value::str(input));
    Value::Object(array)
}

/// The receiver's regex state, or a `TypeError`.
fn this_regex(ctx: &NativeContext<'_>, this: &Value, what: &str) -> Result<ObjectRef, crate::function::Throw> {
    match this {
        Value::Object(obj) if matches!(&obj.borrow().kind, ObjectKind::Regex(_)) => Ok(obj.clone()),
        _ => Err(ctx.type_error(format!("{} called on a non-regex", what))),
    }
}

fn test(ctx: &mut NativeContext<'_>, this: &Value, args: &[Value]) -> NativeResult {
    let result = exec(ctx, this, args)?;
    Ok(Value::Bool(!matches!(result, Value::Null)))
}

fn exec(ctx: &mut NativeContext<'_>, this: &Value, args: &[Value]) -> NativeResult {
    let obj = this_regex(ctx, this, "exec")?;
    let haystack = arg(args, 0).to_display();
    let (regex, global, from) = {
        let guard = obj.borrow();
        let ObjectKind::Regex(regex) = &guard.kind else {
            unreachable!("receiver checked");
        };
        (
            regex.regex.clone(),
            regex.is_global(),
            if regex.is_global() { regex.last_index } else { 0 },
        )
    };

    let found = find_at(&regex, &haystack, from);
    let mut guard = obj.borrow_mut();
    let ObjectKind::Regex(state) = &mut guard.kind else {
        unreachable!("receiver checked");
    };
    match found {
        Some(found) => {
            if global {
                state.last_index = if found.end > found.start {
                    found.end
                } else {
                    found.end + 1
                };
            }
            drop(guard);
            Ok(match_array(ctx, &found, &haystack))
        }
        None => {
            if global {
                state.last_index = 0;
            }
            Ok(Value::Null)
        }
    }
}

fn to_string(ctx: &mut NativeContext<'_>, this: &Value, _args: &[Value]) -> NativeResult {
    let obj = this_regex(ctx, this, "toString")?;
    let guard = obj.borrow();
    let ObjectKind::Regex(regex) = &guard.kind else {
        unreachable!("receiver checked");
    };
    Ok(Value::str(format!("/{}/{}", regex.source, regex.flags)))
}

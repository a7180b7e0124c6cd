//! The JSON namespace: a native serializer over engine values (insertion
//! order preserved, replacer and pretty-printing supported) and a parser
//! backed by serde_json.

use super::{arg, method, Prototypes};
use crate::function::{NativeResult, Throw};
use crate::interp::NativeContext;
use crate::object::{new_ref, JsObject, ObjectKind};
use crate::value::{format_number, Value};
use crate::{Identifier, Shared};

/// Build the `JSON` global.
pub(crate) fn build(protos: &Prototypes) -> Value {
    let json = new_ref(JsObject::plain(Some(protos.object.clone())));
    method(protos, &json, "stringify", stringify);
    method(protos, &json, "parse", parse);
    Value::Object(json)
}

// ----------------------------------------------------------------------
// stringify
// ----------------------------------------------------------------------

struct Stringifier {
    replacer_fn: Option<Value>,
    allowed_keys: Option<Vec<String>>,
    indent: String,
    seen: Vec<*const ()>,
}

fn stringify(ctx: &mut NativeContext<'_>, _this: &Value, args: &[Value]) -> NativeResult {
    let value = arg(args, 0);
    let replacer = arg(args, 1);

    let replacer_fn = match &replacer {
        Value::Object(obj) if obj.borrow().as_function().is_some() => Some(replacer.clone()),
        _ => None,
    };
    // A scalar-array replacer whitelists property names.
    let allowed_keys = match &replacer {
        Value::Object(obj) => obj.borrow().elements().map(|elements| {
            elements
                .iter()
                .filter(|item| matches!(item, Value::Str(_) | Value::Number(_)))
                .map(Value::to_display)
                .collect::<Vec<String>>()
        }),
        _ => None,
    };
    let indent = match arg(args, 2) {
        Value::Number(n) if n >= 1.0 => " ".repeat((n as usize).min(10)),
        Value::Str(s) => s.chars().take(10).collect(),
        _ => String::new(),
    };

    let mut state = Stringifier {
        replacer_fn,
        allowed_keys,
        indent,
        seen: Vec::new(),
    };
    match serialize(ctx, &mut state, "", &value, 0)? {
        Some(text) => Ok(Value::str(text)),
        None => Ok(Value::Undefined),
    }
}

/// Serialize one value; [`None`] means "omit this entry" (undefined or a
/// function).
fn serialize(
    ctx: &mut NativeContext<'_>,
    state: &mut Stringifier,
    key: &str,
    value: &Value,
    depth: usize,
) -> Result<Option<String>, Throw> {
    let mut value = value.clone();
    if let Some(replacer) = state.replacer_fn.clone() {
        value = ctx.call_function(
            &replacer,
            Value::Undefined,
            vec![Value::str(key), value.clone()],
        )?;
    }

    match &value {
        Value::Undefined => Ok(None),
        Value::Null => Ok(Some("null".to_string())),
        Value::Bool(b) => Ok(Some(b.to_string())),
        Value::Number(n) => Ok(Some(if n.is_finite() {
            format_number(*n)
        } else {
            "null".to_string()
        })),
        Value::Str(s) => Ok(Some(quote(s))),
        Value::External(host) => Ok(Some(quote(&host.to_display()))),
        Value::Object(obj) => {
            let ptr = Shared::as_ptr(obj).cast::<()>();
            if state.seen.contains(&ptr) {
                return Err(ctx.type_error("converting circular structure to JSON"));
            }

            enum Payload {
                Array(Vec<Value>),
                Object(Vec<(Identifier, Value)>),
            }
            let payload = {
                let guard = obj.borrow();
                match &guard.kind {
                    ObjectKind::Function(_) => return Ok(None),
                    ObjectKind::Date(millis) => {
                        return Ok(Some(quote(&super::date::to_iso_string(*millis))));
                    }
                    ObjectKind::Boxed(inner) => {
                        let inner = inner.clone();
                        drop(guard);
                        return serialize(ctx, state, key, &inner, depth);
                    }
                    ObjectKind::Regex(_) => return Ok(Some("{}".to_string())),
                    ObjectKind::Array(elements) => Payload::Array(elements.clone()),
                    ObjectKind::Uint8Array(bytes) => Payload::Object(
                        bytes
                            .iter()
                            .enumerate()
                            .map(|(index, byte)| {
                                (
                                    Identifier::from(index.to_string()),
                                    Value::Number(f64::from(*byte)),
                                )
                            })
                            .collect(),
                    ),
                    ObjectKind::Plain => Payload::Object(
                        guard
                            .props
                            .iter()
                            .map(|(name, prop)| (name.clone(), prop.clone()))
                            .collect(),
                    ),
                }
            };

            state.seen.push(ptr);
            let result = match payload {
                Payload::Array(elements) => serialize_array(ctx, state, &elements, depth),
                Payload::Object(pairs) => serialize_object(ctx, state, &pairs, depth),
            };
            state.seen.pop();
            result.map(Some)
        }
    }
}

fn serialize_array(
    ctx: &mut NativeContext<'_>,
    state: &mut Stringifier,
    elements: &[Value],
    depth: usize,
) -> Result<String, Throw> {
    if elements.is_empty() {
        return Ok("[]".to_string());
    }
    let mut parts = Vec::with_capacity(elements.len());
    for (index, element) in elements.iter().enumerate() {
        // Holes and functions render as null inside arrays.
        let text = serialize(ctx, state, &index.to_string(), element, depth + 1)?
            .unwrap_or_else(|| "null".to_string());
        parts.push(text);
    }
    Ok(wrap(state, &parts, depth, ('[', ']')))
}

fn serialize_object(
    ctx: &mut NativeContext<'_>,
    state: &mut Stringifier,
    pairs: &[(Identifier, Value)],
    depth: usize,
) -> Result<String, Throw> {
    let mut parts = Vec::new();
    for (name, prop) in pairs {
        if let Some(allowed) = &state.allowed_keys {
            if !allowed.iter().any(|k| k == name.as_str()) {
                continue;
            }
        }
        if let Some(text) = serialize(ctx, state, name, prop, depth + 1)? {
            let separator = if state.indent.is_empty() { ":" } else { ": " };
            parts.push(format!("{}{}{}", quote(name), separator, text));
        }
    }
    if parts.is_empty() {
        return Ok("{}".to_string());
    }
    Ok(wrap(state, &parts, depth, ('{', '}')))
}

fn wrap(state: &Stringifier, parts: &[String], depth: usize, brackets: (char, char)) -> String {
    if state.indent.is_empty() {
        return format!("{}{}{}", brackets.0, parts.join(","), brackets.1);
    }
    let inner_pad = state.indent.repeat(depth + 1);
    let outer_pad = state.indent.repeat(depth);
    format!(
        "{}\n{}{}\n{}{}",
        brackets.0,
        inner_pad,
        parts.join(&format!(",\n{}", inner_pad)),
        outer_pad,
        brackets.1
    )
}

fn quote(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for c in text.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{0008}' => out.push_str("\\b"),
            '\u{000C}' => out.push_str("\\f"),
            c if (c as u32) < 0x20 => {
                out.push_str(&format!("\\u{:04x}", c as u32));
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

// ----------------------------------------------------------------------
// parse
// ----------------------------------------------------------------------

fn parse(ctx: &mut NativeContext<'_>, _this: &Value, args: &[Value]) -> NativeResult {
    let text = arg(args, 0).to_display();
    let parsed: serde_json::Value = serde_json::from_str(&text)
        .map_err(|err| ctx.syntax_error(format!("unexpected token in JSON: {}", err)))?;
    Ok(from_serde(ctx, &parsed))
}

fn from_serde(ctx: &NativeContext<'_>, value: &serde_json::Value) -> Value {
    match value {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(*b),
        serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
        serde_json::Value::String(s) => Value::str(s),
        serde_json::Value::Array(items) => {
            let elements = items.iter().map(|item| from_serde(ctx, item)).collect();
            ctx.new_array(elements)
        }
        serde_json::Value::Object(map) => {
            let mut object = JsObject::plain(Some(ctx.protos().object.clone()));
            for (name, prop) in map {
                object
                    .props
                    .insert(Identifier::from(name.as_str()), from_serde(ctx, prop));
            }
            Value::Object(new_ref(object))
        }
    }
}

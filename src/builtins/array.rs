//! Array prototype methods and constructor statics.

use super::{arg, arg_f64, method, native_value, property, rel_index, this_array, Prototypes};
use crate::function::NativeResult;
use crate::interp::NativeContext;
use crate::object::{ObjectKind, ObjectRef};
use crate::value::Value;
use crate::Identifier;

pub(crate) fn install(protos: &Prototypes) {
    let proto = &protos.array;
    method(protos, proto, "map", map);
    method(protos, proto, "filter", filter);
    method(protos, proto, "forEach", for_each);
    method(protos, proto, "reduce", reduce);
    method(protos, proto, "reduceRight", reduce_right);
    method(protos, proto, "find", find);
    method(protos, proto, "findIndex", find_index);
    method(protos, proto, "findLast", find_last);
    method(protos, proto, "findLastIndex", find_last_index);
    method(protos, proto, "some", some);
    method(protos, proto, "every", every);
    method(protos, proto, "push", push);
    method(protos, proto, "pop", pop);
    method(protos, proto, "shift", shift);
    method(protos, proto, "unshift", unshift);
    method(protos, proto, "slice", slice);
    method(protos, proto, "splice", splice);
    method(protos, proto, "concat", concat);
    method(protos, proto, "flat", flat);
    method(protos, proto, "flatMap", flat_map);
    method(protos, proto, "sort", sort);
    method(protos, proto, "fill", fill);
    method(protos, proto, "copyWithin", copy_within);
    method(protos, proto, "includes", includes);
    method(protos, proto, "indexOf", index_of);
    method(protos, proto, "lastIndexOf", last_index_of);
    method(protos, proto, "join", join);
    method(protos, proto, "reverse", reverse);
    method(protos, proto, "at", at);
    method(protos, proto, "keys", keys);
    method(protos, proto, "values", values);
    method(protos, proto, "entries", entries);
    method(protos, proto, "with", with);
    method(protos, proto, "group", group);
    method(protos, proto, "toString", to_string);
}

/// The `Array` constructor value with its statics, for the global scope.
pub(crate) fn constructor(protos: &Prototypes) -> Value {
    let ctor = native_value(protos, "Array", array_constructor);
    if let Value::Object(obj) = &ctor {
        property(obj, "prototype", Value::Object(protos.array.clone()));
        property(&protos.array, "constructor", ctor.clone());
        method(protos, obj, "isArray", is_array);
        method(protos, obj, "from", from);
        method(protos, obj, "of", of);
    }
    ctor
}

fn elements_of(obj: &ObjectRef) -> Vec<Value> {
    obj.borrow().elements().cloned().unwrap_or_default()
}

fn array_constructor(ctx: &mut NativeContext<'_>, _this: &Value, args: &[Value]) -> NativeResult {
    // `Array(3)` makes a sparse array of length 3; `Array(a, b)` wraps the
    // arguments. Identical with and without `new`.
    if args.len() == 1 {
        if let Value::Number(n) = &args[0] {
            if n.fract() != 0.0 || *n < 0.0 {
                return Err(ctx.range_error("invalid array length"));
            }
            return Ok(ctx.new_array(vec![Value::Undefined; *n as usize]));
        }
    }
    Ok(ctx.new_array(args.to_vec()))
}

fn is_array(_ctx: &mut NativeContext<'_>, _this: &Value, args: &[Value]) -> NativeResult {
    let result = matches!(args.first(), Some(Value::Object(obj)) if obj.borrow().is_array());
    Ok(Value::Bool(result))
}

fn from(ctx: &mut NativeContext<'_>, _this: &Value, args: &[Value]) -> NativeResult {
    let source = arg(args, 0);
    let mut items: Vec<Value> = match &source {
        Value::Str(s) => s.chars().map(|c| Value::str(c.to_string())).collect(),
        Value::Object(obj) => {
            let direct = {
                let guard = obj.borrow();
                match &guard.kind {
                    ObjectKind::Array(elements) => Some(elements.clone()),
                    ObjectKind::Uint8Array(bytes) => {
                        Some(bytes.iter().map(|b| Value::Number(f64::from(*b))).collect())
                    }
                    _ => None,
                }
            };
            match direct {
                Some(items) => items,
                None => {
                    // Array-like: a numeric `length` plus index properties.
                    let len = obj
                        .borrow()
                        .own_get("length")
                        .map_or(0.0, |v| v.to_number());
                    let len = if len.is_finite() && len > 0.0 { len as usize } else { 0 };
                    (0..len)
                        .map(|i| {
                            obj.borrow()
                                .own_get(&i.to_string())
                                .unwrap_or(Value::Undefined)
                        })
                        .collect()
                }
            }
        }
        _ => Vec::new(),
    };
    if let Some(mapper) = args.get(1) {
        if !matches!(mapper, Value::Undefined) {
            let mut mapped = Vec::with_capacity(items.len());
            for (index, item) in items.iter().enumerate() {
                let value = ctx.call_function(
                    mapper,
                    Value::Undefined,
                    vec![item.clone(), Value::Number(index as f64)],
                )?;
                mapped.push(value);
            }
            items = mapped;
        }
    }
    Ok(ctx.new_array(items))
}

fn of(ctx: &mut NativeContext<'_>, _this: &Value, args: &[Value]) -> NativeResult {
    Ok(ctx.new_array(args.to_vec()))
}

// ----------------------------------------------------------------------
// Iteration methods
// ----------------------------------------------------------------------

fn map(ctx: &mut NativeContext<'_>, this: &Value, args: &[Value]) -> NativeResult {
    let obj = this_array(ctx, this, "map")?;
    let callback = arg(args, 0);
    let this_arg = arg(args, 1);
    let items = elements_of(&obj);
    let mut out = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        out.push(ctx.call_function(
            &callback,
            this_arg.clone(),
            vec![item.clone(), Value::Number(index as f64), this.clone()],
        )?);
    }
    Ok(ctx.new_array(out))
}

fn filter(ctx: &mut NativeContext<'_>, this: &Value, args: &[Value]) -> NativeResult {
    let obj = this_array(ctx, this, "filter")?;
    let callback = arg(args, 0);
    let this_arg = arg(args, 1);
    let mut out = Vec::new();
    for (index, item) in elements_of(&obj).iter().enumerate() {
        let keep = ctx.call_function(
            &callback,
            this_arg.clone(),
            vec![item.clone(), Value::Number(index as f64), this.clone()],
        )?;
        if keep.truthy() {
            out.push(item.clone());
        }
    }
    Ok(ctx.new_array(out))
}

fn for_each(ctx: &mut NativeContext<'_>, this: &Value, args: &[Value]) -> NativeResult {
    let obj = this_array(ctx, this, "forEach")?;
    let callback = arg(args, 0);
    let this_arg = arg(args, 1);
    for (index, item) in elements_of(&obj).iter().enumerate() {
        ctx.call_function(
            &callback,
            this_arg.clone(),
            vec![item.clone(), Value::Number(index as f64), this.clone()],
        )?;
    }
    Ok(Value::Undefined)
}

fn reduce(ctx: &mut NativeContext<'_>, this: &Value, args: &[Value]) -> NativeResult {
    let obj = this_array(ctx, this, "reduce")?;
    let callback = arg(args, 0);
    let items = elements_of(&obj);
    let mut iter = items.iter().enumerate();
    let mut acc = match args.get(1) {
        Some(initial) => initial.clone(),
        None => match iter.next() {
            Some((_, first)) => first.clone(),
            None => {
                return Err(ctx.type_error("reduce of empty array with no initial value"));
            }
        },
    };
    for (index, item) in iter {
        acc = ctx.call_function(
            &callback,
            Value::Undefined,
            vec![acc, item.clone(), Value::Number(index as f64), this.clone()],
        )?;
    }
    Ok(acc)
}

fn reduce_right(ctx: &mut NativeContext<'_>, this: &Value, args: &[Value]) -> NativeResult {
    let obj = this_array(ctx, this, "reduceRight")?;
    let callback = arg(args, 0);
    let items = elements_of(&obj);
    let mut iter = items.iter().enumerate().rev();
    let mut acc = match args.get(1) {
        Some(initial) => initial.clone(),
        None => match iter.next() {
            Some((_, last)) => last.clone(),
            None => {
                return Err(ctx.type_error("reduce of empty array with no initial value"));
            }
        },
    };
    for (index, item) in iter {
        acc = ctx.call_function(
            &callback,
            Value::Undefined,
            vec![acc, item.clone(), Value::Number(index as f64), this.clone()],
        )?;
    }
    Ok(acc)
}

fn find_impl(
    ctx: &mut NativeContext<'_>,
    this: &Value,
    args: &[Value],
    backwards: bool,
    want_index: bool,
    name: &'static str,
) -> NativeResult {
    let obj = this_array(ctx, this, name)?;
    let callback = arg(args, 0);
    let items = elements_of(&obj);
    let indexes: Vec<usize> = if backwards {
        (0..items.len()).rev().collect()
    } else {
        (0..items.len()).collect()
    };
    for index in indexes {
        let matched = ctx.call_function(
            &callback,
            Value::Undefined,
            vec![
                items[index].clone(),
                Value::Number(index as f64),
                this.clone(),
            ],
        )?;
        if matched.truthy() {
            return Ok(if want_index {
                Value::Number(index as f64)
            } else {
                items[index].clone()
            });
        }
    }
    Ok(if want_index {
        Value::Number(-1.0)
    } else {
        Value::Undefined
    })
}

fn find(ctx: &mut NativeContext<'_>, this: &Value, args: &[Value]) -> NativeResult {
    find_impl(ctx, this, args, false, false, "find")
}

fn find_index(ctx: &mut NativeContext<'_>, this: &Value, args: &[Value]) -> NativeResult {
    find_impl(ctx, this, args, false, true, "findIndex")
}

fn find_last(ctx: &mut NativeContext<'_>, this: &Value, args: &[Value]) -> NativeResult {
    find_impl(ctx, this, args, true, false, "findLast")
}

fn find_last_index(ctx: &mut NativeContext<'_>, this: &Value, args: &[Value]) -> NativeResult {
    find_impl(ctx, this, args, true, true, "findLastIndex")
}

fn some(ctx: &mut NativeContext<'_>, this: &Value, args: &[Value]) -> NativeResult {
    let obj = this_array(ctx, this, "some")?;
    let callback = arg(args, 0);
    for (index, item) in elements_of(&obj).iter().enumerate() {
        let matched = ctx.call_function(
            &callback,
            Value::Undefined,
            vec![item.clone(), Value::Number(index as f64), this.clone()],
        )?;
        if matched.truthy() {
            return Ok(Value::Bool(true));
        }
    }
    Ok(Value::Bool(false))
}

fn every(ctx: &mut NativeContext<'_>, this: &Value, args: &[Value]) -> NativeResult {
    let obj = this_array(ctx, this, "every")?;
    let callback = arg(args, 0);
    for (index, item) in elements_of(&obj).iter().enumerate() {
        let matched = ctx.call_function(
            &callback,
            Value::Undefined,
            vec![item.clone(), Value::Number(index as f64), this.clone()],
        )?;
        if !matched.truthy() {
            return Ok(Value::Bool(false));
        }
    }
    Ok(Value::Bool(true))
}

// ----------------------------------------------------------------------
// Mutators
// ----------------------------------------------------------------------

fn push(ctx: &mut NativeContext<'_>, this: &Value, args: &[Value]) -> NativeResult {
    let obj = this_array(ctx, this, "push")?;
    let mut guard = obj.borrow_mut();
    let elements = guard.elements_mut().expect("receiver checked");
    elements.extend(args.iter().cloned());
    Ok(Value::Number(elements.len() as f64))
}

fn pop(ctx: &mut NativeContext<'_>, this: &Value, _args: &[Value]) -> NativeResult {
    let obj = this_array(ctx, this, "pop")?;
    let mut guard = obj.borrow_mut();
    let elements = guard.elements_mut().expect("receiver checked");
    Ok(elements.pop().unwrap_or(Value::Undefined))
}

fn shift(ctx: &mut NativeContext<'_>, this: &Value, _args: &[Value]) -> NativeResult {
    let obj = this_array(ctx, this, "shift")?;
    let mut guard = obj.borrow_mut();
    let elements = guard.elements_mut().expect("receiver checked");
    if elements.is_empty() {
        Ok(Value::Undefined)
    } else {
        Ok(elements.remove(0))
    }
}

fn unshift(ctx: &mut NativeContext<'_>, this: &Value, args: &[Value]) -> NativeResult {
    let obj = this_array(ctx, this, "unshift")?;
    let mut guard = obj.borrow_mut();
    let elements = guard.elements_mut().expect("receiver checked");
    for (offset, item) in args.iter().enumerate() {
        elements.insert(offset, item.clone());
    }
    Ok(Value::Number(elements.len() as f64))
}

fn splice(ctx: &mut NativeContext<'_>, this: &Value, args: &[Value]) -> NativeResult {
    let obj = this_array(ctx, this, "splice")?;
    let mut guard = obj.borrow_mut();
    let elements = guard.elements_mut().expect("receiver checked");
    let len = elements.len();
    let start = rel_index(arg_f64(args, 0), len);
    let delete_count = match args.get(1) {
        Some(n) => {
            let n = n.to_number();
            if n.is_nan() || n < 0.0 {
                0
            } else {
                (n as usize).min(len - start)
            }
        }
        None => len - start,
    };
    let replacement: Vec<Value> = args.iter().skip(2).cloned().collect();
    let removed: Vec<Value> = elements
        .splice(start..start + delete_count, replacement)
        .collect();
    drop(guard);
    Ok(ctx.new_array(removed))
}

fn fill(ctx: &mut NativeContext<'_>, this: &Value, args: &[Value]) -> NativeResult {
    let obj = this_array(ctx, this, "fill")?;
    let value = arg(args, 0);
    let mut guard = obj.borrow_mut();
    let elements = guard.elements_mut().expect("receiver checked");
    let len = elements.len();
    let start = match args.get(1) {
        Some(n) => rel_index(n.to_number(), len),
        None => 0,
    };
    let end = match args.get(2) {
        Some(n) => rel_index(n.to_number(), len),
        None => len,
    };
    for slot in elements.iter_mut().take(end).skip(start) {
        *slot = value.clone();
    }
    drop(guard);
    Ok(this.clone())
}

fn copy_within(ctx: &mut NativeContext<'_>, this: &Value, args: &[Value]) -> NativeResult {
    let obj = this_array(ctx, this, "copyWithin")?;
    let mut guard = obj.borrow_mut();
    let elements = guard.elements_mut().expect("receiver checked");
    let len = elements.len();
    let target = rel_index(arg_f64(args, 0), len);
    let start = match args.get(1) {
        Some(n) => rel_index(n.to_number(), len),
        None => 0,
    };
    let end = match args.get(2) {
        Some(n) => rel_index(n.to_number(), len),
        None => len,
    };
    let window: Vec<Value> = elements[start..end.max(start)].to_vec();
    for (offset, item) in window.into_iter().enumerate() {
        let slot = target + offset;
        if slot >= len {
            break;
        }
        elements[slot] = item;
    }
    drop(guard);
    Ok(this.clone())
}

fn reverse(ctx: &mut NativeContext<'_>, this: &Value, _args: &[Value]) -> NativeResult {
    let obj = this_array(ctx, this, "reverse")?;
    obj.borrow_mut()
        .elements_mut()
        .expect("receiver checked")
        .reverse();
    Ok(this.clone())
}

fn sort(ctx: &mut NativeContext<'_>, this: &Value, args: &[Value]) -> NativeResult {
    let obj = this_array(ctx, this, "sort")?;
    let comparator = args.first().cloned();
    let mut items = elements_of(&obj);

    match comparator {
        Some(comparator) if !matches!(comparator, Value::Undefined) => {
            // Simple insertion sort so comparator errors can propagate.
            let mut sorted: Vec<Value> = Vec::with_capacity(items.len());
            for item in items {
                let mut at = sorted.len();
                for (index, placed) in sorted.iter().enumerate() {
                    let verdict = ctx.call_function(
                        &comparator,
                        Value::Undefined,
                        vec![item.clone(), placed.clone()],
                    )?;
                    if verdict.to_number() < 0.0 {
                        at = index;
                        break;
                    }
                }
                sorted.insert(at, item);
            }
            items = sorted;
        }
        _ => {
            // Default sort is lexicographic on the display form, with
            // undefined values last.
            items.sort_by(|a, b| match (a, b) {
                (Value::Undefined, Value::Undefined) => std::cmp::Ordering::Equal,
                (Value::Undefined, _) => std::cmp::Ordering::Greater,
                (_, Value::Undefined) => std::cmp::Ordering::Less,
                _ => a.to_display().cmp(&b.to_display()),
            });
        }
    }

    if let Some(elements) = obj.borrow_mut().elements_mut() {
        *elements = items;
    }
    Ok(this.clone())
}

// ----------------------------------------------------------------------
// Readers
// ----------------------------------------------------------------------

fn slice(ctx: &mut NativeContext<'_>, this: &Value, args: &[Value]) -> NativeResult {
    let obj = this_array(ctx, this, "slice")?;
    let items = elements_of(&obj);
    let len = items.len();
    let start = match args.first() {
        Some(n) if !matches!(n, Value::Undefined) => rel_index(n.to_number(), len),
        _ => 0,
    };
    let end = match args.get(1) {
        Some(n) if !matches!(n, Value::Undefined) => rel_index(n.to_number(), len),
        _ => len,
    };
    let out: Vec<Value> = items[start..end.max(start)].to_vec();
    Ok(ctx.new_array(out))
}

fn concat(ctx: &mut NativeContext<'_>, this: &Value, args: &[Value]) -> NativeResult {
    let obj = this_array(ctx, this, "concat")?;
    let mut out = elements_of(&obj);
    for item in args {
        match item {
            Value::Object(other) if other.borrow().is_array() => {
                out.extend(elements_of(other));
            }
            other => out.push(other.clone()),
        }
    }
    Ok(ctx.new_array(out))
}

fn flatten_into(out: &mut Vec<Value>, items: &[Value], depth: usize) {
    for item in items {
        match item {
            Value::Object(obj) if obj.borrow().is_array() && depth > 0 => {
                let inner = elements_of(obj);
                flatten_into(out, &inner, depth - 1);
            }
            other => out.push(other.clone()),
        }
    }
}

fn flat(ctx: &mut NativeContext<'_>, this: &Value, args: &[Value]) -> NativeResult {
    let obj = this_array(ctx, this, "flat")?;
    let depth = match args.first() {
        Some(n) if !matches!(n, Value::Undefined) => {
            let n = n.to_number();
            if n.is_infinite() && n > 0.0 {
                usize::MAX
            } else if n >= 1.0 {
                n as usize
            } else {
                0
            }
        }
        _ => 1,
    };
    let mut out = Vec::new();
    flatten_into(&mut out, &elements_of(&obj), depth);
    Ok(ctx.new_array(out))
}

fn flat_map(ctx: &mut NativeContext<'_>, this: &Value, args: &[Value]) -> NativeResult {
    let mapped = map(ctx, this, args)?;
    flat(ctx, &mapped, &[])
}

/// `includes` matches like `===` except that NaN finds NaN.
fn same_value_zero(a: &Value, b: &Value) -> bool {
    if let (Value::Number(x), Value::Number(y)) = (a, b) {
        if x.is_nan() && y.is_nan() {
            return true;
        }
    }
    a.strict_eq(b)
}

fn includes(ctx: &mut NativeContext<'_>, this: &Value, args: &[Value]) -> NativeResult {
    let obj = this_array(ctx, this, "includes")?;
    let needle = arg(args, 0);
    let found = elements_of(&obj)
        .iter()
        .any(|item| same_value_zero(item, &needle));
    Ok(Value::Bool(found))
}

fn index_of(ctx: &mut NativeContext<'_>, this: &Value, args: &[Value]) -> NativeResult {
    let obj = this_array(ctx, this, "indexOf")?;
    let needle = arg(args, 0);
    let found = elements_of(&obj)
        .iter()
        .position(|item| item.strict_eq(&needle));
    Ok(Value::Number(found.map_or(-1.0, |i| i as f64)))
}

fn last_index_of(ctx: &mut NativeContext<'_>, this: &Value, args: &[Value]) -> NativeResult {
    let obj = this_array(ctx, this, "lastIndexOf")?;
    let needle = arg(args, 0);
    let found = elements_of(&obj)
        .iter()
        .rposition(|item| item.strict_eq(&needle));
    Ok(Value::Number(found.map_or(-1.0, |i| i as f64)))
}

fn join(ctx: &mut NativeContext<'_>, this: &Value, args: &[Value]) -> NativeResult {
    let obj = this_array(ctx, this, "join")?;
    let separator = match args.first() {
        Some(Value::Undefined) | None => ",".to_string(),
        Some(sep) => sep.to_display(),
    };
    let parts: Vec<String> = elements_of(&obj)
        .iter()
        .map(|item| match item {
            Value::Undefined | Value::Null => String::new(),
            other => other.to_display(),
        })
        .collect();
    Ok(Value::str(parts.join(&separator)))
}

fn at(ctx: &mut NativeContext<'_>, this: &Value, args: &[Value]) -> NativeResult {
    let obj = this_array(ctx, this, "at")?;
    let items = elements_of(&obj);
    let n = arg_f64(args, 0);
    let n = if n.is_nan() { 0.0 } else { n.trunc() };
    let index = if n < 0.0 {
        let back = (-n) as usize;
        match items.len().checked_sub(back) {
            Some(index) => index,
            None => return Ok(Value::Undefined),
        }
    } else {
        n as usize
    };
    Ok(items.get(index).cloned().unwrap_or(Value::Undefined))
}

fn keys(ctx: &mut NativeContext<'_>, this: &Value, _args: &[Value]) -> NativeResult {
    let obj = this_array(ctx, this, "keys")?;
    let len = elements_of(&obj).len();
    let out: Vec<Value> = (0..len).map(|i| Value::Number(i as f64)).collect();
    Ok(ctx.new_array(out))
}

fn values(ctx: &mut NativeContext<'_>, this: &Value, _args: &[Value]) -> NativeResult {
    let obj = this_array(ctx, this, "values")?;
    let items = elements_of(&obj);
    Ok(ctx.new_array(items))
}

fn entries(ctx: &mut NativeContext<'_>, this: &Value, _args: &[Value]) -> NativeResult {
    let obj = this_array(ctx, this, "entries")?;
    let out: Vec<Value> = elements_of(&obj)
        .into_iter()
        .enumerate()
        .map(|(index, item)| ctx.new_array(vec![Value::Number(index as f64), item]))
        .collect();
    Ok(ctx.new_array(out))
}

fn with(ctx: &mut NativeContext<'_>, this: &Value, args: &[Value]) -> NativeResult {
    let obj = this_array(ctx, this, "with")?;
    let mut items = elements_of(&obj);
    let n = arg_f64(args, 0);
    let n = if n.is_nan() { 0.0 } else { n.trunc() };
    let index = if n < 0.0 {
        items.len() as f64 + n
    } else {
        n
    };
    if index < 0.0 || index >= items.len() as f64 {
        return Err(ctx.range_error(format!("invalid index: {}", n)));
    }
    items[index as usize] = arg(args, 1);
    Ok(ctx.new_array(items))
}

fn group(ctx: &mut NativeContext<'_>, this: &Value, args: &[Value]) -> NativeResult {
    let obj = this_array(ctx, this, "group")?;
    let callback = arg(args, 0);
    let grouped = ctx.new_object();
    for (index, item) in elements_of(&obj).iter().enumerate() {
        let key = ctx.call_function(
            &callback,
            Value::Undefined,
            vec![item.clone(), Value::Number(index as f64), this.clone()],
        )?;
        let key = Identifier::from(key.to_display());
        if let Value::Object(target) = &grouped {
            let bucket = target.borrow().props.get(&key).cloned();
            match bucket {
                Some(Value::Object(bucket)) => {
                    if let Some(elements) = bucket.borrow_mut().elements_mut() {
                        elements.push(item.clone());
                    }
                }
                _ => {
                    let bucket = ctx.new_array(vec![item.clone()]);
                    target.borrow_mut().props.insert(key, bucket);
                }
            }
        }
    }
    Ok(grouped)
}

fn to_string(_ctx: &mut NativeContext<'_>, this: &Value, _args: &[Value]) -> NativeResult {
    Ok(Value::str(this.to_display()))
}

use escript::{EcmaError, Engine, HostValue};

#[test]
fn test_stringify_scalars() -> Result<(), EcmaError> {
    let engine = Engine::new();
    assert_eq!(engine.eval("JSON.stringify(1)")?, HostValue::from("1"));
    assert_eq!(engine.eval("JSON.stringify('s')")?, HostValue::from(r#""s""#));
    assert_eq!(engine.eval("JSON.stringify(true)")?, HostValue::from("true"));
    assert_eq!(engine.eval("JSON.stringify(null)")?, HostValue::from("null"));
    assert_eq!(engine.eval("JSON.stringify(NaN)")?, HostValue::from("null"));
    assert_eq!(engine.eval("JSON.stringify(undefined)")?, HostValue::Null);
    assert_eq!(
        engine.eval(r#"JSON.stringify('quote " and \n newline')"#)?,
        HostValue::from(r#""quote \" and \n newline""#)
    );
    Ok(())
}

#[test]
fn test_stringify_structures() -> Result<(), EcmaError> {
    let engine = Engine::new();
    assert_eq!(
        engine.eval("JSON.stringify({b: 2, a: 1})")?,
        HostValue::from(r#"{"b":2,"a":1}"#)
    );
    assert_eq!(
        engine.eval("JSON.stringify([1, 'x', null, [2]])")?,
        HostValue::from(r#"[1,"x",null,[2]]"#)
    );
    // undefined and functions vanish from objects, become null in arrays.
    assert_eq!(
        engine.eval("JSON.stringify({keep: 1, drop: undefined, f: () => 1})")?,
        HostValue::from(r#"{"keep":1}"#)
    );
    assert_eq!(
        engine.eval("JSON.stringify([undefined, () => 1])")?,
        HostValue::from("[null,null]")
    );
    assert_eq!(engine.eval("JSON.stringify({})")?, HostValue::from("{}"));
    assert_eq!(engine.eval("JSON.stringify([])")?, HostValue::from("[]"));
    Ok(())
}

#[test]
fn test_stringify_pretty() -> Result<(), EcmaError> {
    let engine = Engine::new();
    assert_eq!(
        engine.eval("JSON.stringify({a: 1, b: [2]}, null, 2)")?,
        HostValue::from("{\n  \"a\": 1,\n  \"b\": [\n    2\n  ]\n}")
    );
    assert_eq!(
        engine.eval("JSON.stringify({a: 1}, null, '--')")?,
        HostValue::from("{\n--\"a\": 1\n}")
    );
    Ok(())
}

#[test]
fn test_stringify_replacers() -> Result<(), EcmaError> {
    let engine = Engine::new();
    // A key whitelist.
    assert_eq!(
        engine.eval("JSON.stringify({a: 1, b: 2, c: 3}, ['a', 'c'])")?,
        HostValue::from(r#"{"a":1,"c":3}"#)
    );
    // A function replacer applies recursively.
    assert_eq!(
        engine.eval(
            "JSON.stringify({a: 1, b: {c: 2}}, (k, v) => typeof v === 'number' ? v * 10 : v)"
        )?,
        HostValue::from(r#"{"a":10,"b":{"c":20}}"#)
    );
    Ok(())
}

#[test]
fn test_stringify_cycles() -> Result<(), EcmaError> {
    let engine = Engine::new();
    assert_eq!(
        engine.eval("const a = {}; a.self = a; try { JSON.stringify(a) } catch (e) { e.name }")?,
        HostValue::from("TypeError")
    );
    Ok(())
}

#[test]
fn test_parse() -> Result<(), EcmaError> {
    let engine = Engine::new();
    assert_eq!(
        engine.eval(r#"JSON.parse('{"x": [1, 2]}').x[1]"#)?,
        HostValue::Int(2)
    );
    assert_eq!(engine.eval("JSON.parse('3.5') * 2")?, HostValue::Int(7));
    assert_eq!(engine.eval("JSON.parse('null')")?, HostValue::Null);
    assert_eq!(engine.eval(r#"JSON.parse('"s"')"#)?, HostValue::from("s"));
    // Key order survives parsing.
    assert_eq!(
        engine.eval(r#"Object.keys(JSON.parse('{"z":0,"a":0}')).join(',')"#)?,
        HostValue::from("z,a")
    );
    assert_eq!(
        engine.eval("try { JSON.parse('{nope') } catch (e) { e.name }")?,
        HostValue::from("SyntaxError")
    );
    Ok(())
}

#[test]
fn test_round_trip() -> Result<(), EcmaError> {
    let engine = Engine::new();
    // parse(stringify(v)) reproduces plain trees exactly.
    assert_eq!(
        engine.eval(
            "
                const v = {b: 2, a: [1, 'x', null, true, {deep: 3.5}]};
                JSON.stringify(JSON.parse(JSON.stringify(v))) === JSON.stringify(v)
            "
        )?,
        HostValue::Bool(true)
    );
    Ok(())
}

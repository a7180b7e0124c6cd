use escript::{EcmaError, Engine, HostValue};

#[test]
fn test_array_patterns() -> Result<(), EcmaError> {
    let engine = Engine::new();
    assert_eq!(engine.eval("const [a, b] = [1, 2]; a + b")?, HostValue::Int(3));
    assert_eq!(
        engine.eval("const [x, , z] = [1, 2, 3]; x + z")?,
        HostValue::Int(4)
    );
    assert_eq!(
        engine.eval("const [h, ...t] = [1, 2, 3]; h + ':' + t.join(',')")?,
        HostValue::from("1:2,3")
    );
    assert_eq!(
        engine.eval("const [p = 9, q = 8] = [1]; p + q")?,
        HostValue::Int(9)
    );
    // Strings destructure by character.
    assert_eq!(engine.eval("const [c1, c2] = 'ab'; c1 + c2")?, HostValue::from("ab"));
    Ok(())
}

#[test]
fn test_object_patterns() -> Result<(), EcmaError> {
    let engine = Engine::new();
    assert_eq!(
        engine.eval("const {a, b} = {a: 1, b: 2}; a + b")?,
        HostValue::Int(3)
    );
    assert_eq!(
        engine.eval("const {a: renamed} = {a: 5}; renamed")?,
        HostValue::Int(5)
    );
    assert_eq!(engine.eval("const {missing = 7} = {}; missing")?, HostValue::Int(7));
    assert_eq!(
        engine.eval("const {a: {b}} = {a: {b: 'deep'}}; b")?,
        HostValue::from("deep")
    );
    assert_eq!(
        engine.eval(
            "const {first, ...others} = {first: 1, second: 2, third: 3}; Object.keys(others).join(',')"
        )?,
        HostValue::from("second,third")
    );
    Ok(())
}

#[test]
fn test_assignment_patterns() -> Result<(), EcmaError> {
    let engine = Engine::new();
    assert_eq!(engine.eval("let a, b; [a, b] = [1, 2]; a + b")?, HostValue::Int(3));
    assert_eq!(
        engine.eval("let a = 1, b = 2; [a, b] = [b, a]; '' + a + b")?,
        HostValue::from("21")
    );
    assert_eq!(engine.eval("let x; ({x} = {x: 5}); x")?, HostValue::Int(5));
    // Member targets work inside patterns.
    assert_eq!(
        engine.eval("const o = {}; [o.first, o.second] = [1, 2]; o.first + o.second")?,
        HostValue::Int(3)
    );
    Ok(())
}

#[test]
fn test_destructuring_null_fails() {
    let engine = Engine::new();
    let err = engine
        .eval("const {a} = null;")
        .expect_err("cannot destructure null");
    assert!(
        err.message().contains("destructure"),
        "unexpected message: {}",
        err.message()
    );
}

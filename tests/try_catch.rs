use escript::{EcmaError, Engine, HostValue};

#[test]
fn test_throw_and_catch() -> Result<(), EcmaError> {
    let engine = Engine::new();
    assert_eq!(
        engine.eval("try { throw {code: 42} } catch (e) { e.code } finally { /* runs */ }")?,
        HostValue::Int(42)
    );
    assert_eq!(
        engine.eval("try { throw 'oops' } catch (e) { 'caught:' + e }")?,
        HostValue::from("caught:oops")
    );
    // Catch without a binding.
    assert_eq!(
        engine.eval("try { throw 1 } catch { 'caught' }")?,
        HostValue::from("caught")
    );
    Ok(())
}

#[test]
fn test_catch_binding_is_scoped() {
    let engine = Engine::new();
    engine
        .eval("try { throw 'x' } catch (e) {}")
        .expect("catch should absorb");
    let err = engine.eval("e").expect_err("binding leaked out of catch");
    assert!(err.message().contains("is not defined"));
}

#[test]
fn test_finally_always_runs() -> Result<(), EcmaError> {
    let engine = Engine::new();
    assert_eq!(
        engine.eval(
            "
                let log = [];
                function happy() {
                    try { return 'r'; } finally { log.push('f1'); }
                }
                function sad() {
                    try { throw 'x'; } catch (e) { return 'c'; } finally { log.push('f2'); }
                }
                happy() + sad() + log.join('')
            "
        )?,
        HostValue::from("rcf1f2")
    );
    Ok(())
}

#[test]
fn test_finally_replaces_pending_exit() -> Result<(), EcmaError> {
    let engine = Engine::new();
    // A return inside finally wins over the pending throw.
    assert_eq!(
        engine.eval(
            "
                function f() {
                    try { throw 'x'; } finally { return 'fin'; }
                }
                f()
            "
        )?,
        HostValue::from("fin")
    );
    // A throw inside finally replaces the pending error.
    assert_eq!(
        engine.eval(
            "
                function g() {
                    try {
                        try { throw 'first'; } finally { throw 'second'; }
                    } catch (e) {
                        return e;
                    }
                }
                g()
            "
        )?,
        HostValue::from("second")
    );
    Ok(())
}

#[test]
fn test_engine_errors_are_catchable() -> Result<(), EcmaError> {
    let engine = Engine::new();
    assert_eq!(
        engine.eval("try { null.x } catch (e) { e instanceof TypeError }")?,
        HostValue::Bool(true)
    );
    assert_eq!(
        engine.eval("try { missing_name } catch (e) { e.name }")?,
        HostValue::from("ReferenceError")
    );
    assert_eq!(
        engine.eval("try { undefined.foo } catch (e) { e.message }")?,
        HostValue::from("cannot read properties of undefined (reading 'foo')")
    );
    Ok(())
}

#[test]
fn test_error_constructors() -> Result<(), EcmaError> {
    let engine = Engine::new();
    assert_eq!(
        engine.eval("const e = new Error('boom'); e.name + ':' + e.message")?,
        HostValue::from("Error:boom")
    );
    assert_eq!(
        engine.eval("new TypeError('t') instanceof TypeError")?,
        HostValue::Bool(true)
    );
    assert_eq!(
        engine.eval("new TypeError('t') instanceof Error")?,
        HostValue::Bool(true)
    );
    assert_eq!(
        engine.eval("try { throw new RangeError('r') } catch (e) { e.name }")?,
        HostValue::from("RangeError")
    );
    Ok(())
}

#[test]
fn test_uncaught_errors_surface() {
    let engine = Engine::new();
    let err = engine
        .eval("const a = 1;\nthrow new Error('kaboom');\n")
        .expect_err("uncaught throw");
    assert!(
        err.message().contains("kaboom"),
        "unexpected message: {}",
        err.message()
    );
    // The error carries the line of the failing statement.
    assert_eq!(err.position().line(), Some(2));
    let display = err.to_string();
    assert!(display.contains("throw new Error"), "display: {}", display);
}

#[test]
fn test_throw_through_call_frames() -> Result<(), EcmaError> {
    let engine = Engine::new();
    assert_eq!(
        engine.eval(
            "
                function deep(n) {
                    if (n === 0) throw 'bottom';
                    return deep(n - 1);
                }
                try { deep(5) } catch (e) { e }
            "
        )?,
        HostValue::from("bottom")
    );
    // An error thrown inside an array callback propagates out.
    assert_eq!(
        engine.eval(
            "
                try {
                    [1, 2, 3].map(x => { if (x === 2) throw 'stop'; return x; });
                } catch (e) { 'caught ' + e }
            "
        )?,
        HostValue::from("caught stop")
    );
    Ok(())
}

#[test]
fn test_rethrow() -> Result<(), EcmaError> {
    let engine = Engine::new();
    assert_eq!(
        engine.eval(
            "
                let trace = [];
                try {
                    try { throw 'inner'; } catch (e) { trace.push('first'); throw e; }
                } catch (e) {
                    trace.push('second:' + e);
                }
                trace.join(',')
            "
        )?,
        HostValue::from("first,second:inner")
    );
    Ok(())
}

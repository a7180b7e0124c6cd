use escript::{EcmaError, Engine, HostValue};

#[test]
fn test_optional_member_access() -> Result<(), EcmaError> {
    let engine = Engine::new();
    assert_eq!(engine.eval("null?.x")?, HostValue::Null);
    assert_eq!(engine.eval("undefined?.x")?, HostValue::Null);
    assert_eq!(
        engine.eval("const o = {a: {b: 1}}; o.a?.b")?,
        HostValue::Int(1)
    );
    assert_eq!(engine.eval("const p = {}; p.missing?.b")?, HostValue::Null);
    // Without the question mark the same access fails.
    let err = engine
        .eval("const q = {}; q.missing.b")
        .expect_err("reading through undefined");
    assert!(err.message().contains("cannot read properties"));
    Ok(())
}

#[test]
fn test_optional_bracket_and_call() -> Result<(), EcmaError> {
    let engine = Engine::new();
    assert_eq!(engine.eval("const arr = null; arr?.[0]")?, HostValue::Null);
    assert_eq!(engine.eval("[7]?.[0]")?, HostValue::Int(7));
    assert_eq!(engine.eval("const o = {}; o.f?.()")?, HostValue::Null);
    assert_eq!(
        engine.eval("const p = {f: () => 'ran'}; p.f?.()")?,
        HostValue::from("ran")
    );
    let err = engine.eval("const q = {}; q.f()").expect_err("calling undefined");
    assert!(err.message().contains("is not a function"));
    Ok(())
}

#[test]
fn test_nullish_coalescing_pairs_with_chaining() -> Result<(), EcmaError> {
    let engine = Engine::new();
    assert_eq!(
        engine.eval("const cfg = {}; cfg.timeout ?? 30")?,
        HostValue::Int(30)
    );
    assert_eq!(
        engine.eval("const cfg2 = {timeout: 0}; cfg2.timeout ?? 30")?,
        HostValue::Int(0)
    );
    assert_eq!(
        engine.eval("const user = null; user?.name ?? 'anonymous'")?,
        HostValue::from("anonymous")
    );
    Ok(())
}

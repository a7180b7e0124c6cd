use escript::{EcmaError, Engine, HostValue};

#[test]
fn test_var_basics() -> Result<(), EcmaError> {
    let engine = Engine::new();
    assert_eq!(engine.eval("var a = 1; a + 2")?, HostValue::Int(3));
    assert_eq!(engine.eval("var b = 1, c = 2; b + c")?, HostValue::Int(3));
    // `var` re-declaration overwrites.
    assert_eq!(engine.eval("var d = 1; var d = 2; d")?, HostValue::Int(2));
    Ok(())
}

#[test]
fn test_var_hoisting() -> Result<(), EcmaError> {
    let engine = Engine::new();
    assert_eq!(
        engine.eval("var seen = typeof v; var v = 1; seen")?,
        HostValue::from("undefined")
    );
    // Reading a hoisted var before assignment yields undefined, not an
    // error.
    assert_eq!(engine.eval("var r = w; var w = 5; r")?, HostValue::Null);
    // Function declarations hoist fully.
    assert_eq!(
        engine.eval("var out = f(); function f() { return 7; } out")?,
        HostValue::Int(7)
    );
    Ok(())
}

#[test]
fn test_block_shadowing() -> Result<(), EcmaError> {
    let engine = Engine::new();
    assert_eq!(
        engine.eval(
            "
                let x = 'v';
                let seen;
                {
                    let x = 'w';
                    seen = x;
                }
                seen + ':' + x
            "
        )?,
        HostValue::from("w:v")
    );
    Ok(())
}

#[test]
fn test_temporal_dead_zone() {
    let engine = Engine::new();
    let err = engine.eval("let a; a").expect_err("read before init");
    assert!(
        err.message().contains("before initialization"),
        "unexpected message: {}",
        err.message()
    );

    // The first write leaves the dead zone.
    let engine = Engine::new();
    assert_eq!(
        engine.eval("let b; b = 3; b").expect("write then read"),
        HostValue::Int(3)
    );
}

#[test]
fn test_const_rules() {
    let engine = Engine::new();
    let err = engine
        .eval("const c = 1; c = 2")
        .expect_err("constant reassignment");
    assert!(
        err.message().contains("assignment to constant"),
        "unexpected message: {}",
        err.message()
    );

    let engine = Engine::new();
    let err = engine.eval("const c;").expect_err("missing initializer");
    assert!(err.message().contains("missing initializer"));

    // Const objects stay mutable inside.
    let engine = Engine::new();
    assert_eq!(
        engine
            .eval("const o = {n: 1}; o.n = 2; o.n")
            .expect("interior mutation"),
        HostValue::Int(2)
    );
}

#[test]
fn test_redeclaration() {
    let engine = Engine::new();
    let err = engine
        .eval("let a = 1; let a = 2;")
        .expect_err("lexical redeclaration");
    assert!(
        err.message().contains("already been declared"),
        "unexpected message: {}",
        err.message()
    );

    // Shadowing in a nested block is not a redeclaration.
    let engine = Engine::new();
    assert_eq!(
        engine
            .eval("let a = 1; { let a = 2; } a")
            .expect("shadowing"),
        HostValue::Int(1)
    );
}

#[test]
fn test_reference_errors() {
    let engine = Engine::new();
    let err = engine.eval("definitelyMissing + 1").expect_err("unknown name");
    assert!(
        err.message().contains("is not defined"),
        "unexpected message: {}",
        err.message()
    );
}

#[test]
fn test_implicit_globals() -> Result<(), EcmaError> {
    let engine = Engine::new();
    assert_eq!(
        engine.eval("function f() { leaked = 7; } f(); leaked")?,
        HostValue::Int(7)
    );
    // The implicit global is visible to the embedder too.
    assert_eq!(engine.get("leaked"), Some(HostValue::Int(7)));
    Ok(())
}

#[test]
fn test_scope_levels_in_loops() -> Result<(), EcmaError> {
    let engine = Engine::new();
    // The loop variable re-declares per iteration without complaint.
    assert_eq!(
        engine.eval("let total = 0; for (let i = 0; i < 4; i++) { let i2 = i * 2; total += i2; } total")?,
        HostValue::Int(12)
    );
    Ok(())
}

#[test]
fn test_state_persists_across_evals() -> Result<(), EcmaError> {
    let engine = Engine::new();
    engine.eval("var counter = 1;")?;
    engine.eval("counter += 10;")?;
    assert_eq!(engine.eval("counter")?, HostValue::Int(11));
    assert_eq!(engine.get("counter"), Some(HostValue::Int(11)));
    Ok(())
}

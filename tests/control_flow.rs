use escript::{EcmaError, Engine, HostValue};

#[test]
fn test_if_else() -> Result<(), EcmaError> {
    let engine = Engine::new();
    assert_eq!(
        engine.eval("let r; if (1 < 2) { r = 'a'; } else { r = 'b'; } r")?,
        HostValue::from("a")
    );
    assert_eq!(
        engine.eval(
            "
                function grade(n) {
                    if (n >= 90) return 'A';
                    else if (n >= 80) return 'B';
                    else return 'C';
                }
                grade(85)
            "
        )?,
        HostValue::from("B")
    );
    // Truthiness drives the branch.
    assert_eq!(
        engine.eval("let hits = 0; if ('') hits++; if ('x') hits++; if (0) hits++; if ([]) hits++; hits")?,
        HostValue::Int(2)
    );
    Ok(())
}

#[test]
fn test_while_loops() -> Result<(), EcmaError> {
    let engine = Engine::new();
    assert_eq!(
        engine.eval("let s = 0, i = 1; while (i <= 10) { s += i; i++; } s")?,
        HostValue::Int(55)
    );
    // A do-while body runs at least once.
    assert_eq!(
        engine.eval("let n = 0; do { n++; } while (false); n")?,
        HostValue::Int(1)
    );
    Ok(())
}

#[test]
fn test_classic_for() -> Result<(), EcmaError> {
    let engine = Engine::new();
    assert_eq!(
        engine.eval("let s = 0; for (let i = 0; i < 5; i++) s += i; s")?,
        HostValue::Int(10)
    );
    // All three clauses are optional.
    assert_eq!(
        engine.eval("let i = 0; for (;;) { i++; if (i === 3) break; } i")?,
        HostValue::Int(3)
    );
    // Multiple declarators in the initializer.
    assert_eq!(
        engine.eval("let out = 0; for (let a = 0, b = 10; a < b; a++, b--) out++; out")?,
        HostValue::Int(5)
    );
    Ok(())
}

#[test]
fn test_break_and_continue() -> Result<(), EcmaError> {
    let engine = Engine::new();
    assert_eq!(
        engine.eval(
            "let odds = 0; for (let i = 0; i < 5; i++) { if (i % 2 === 0) continue; odds += i; } odds"
        )?,
        HostValue::Int(4)
    );
    assert_eq!(
        engine.eval(
            "let partial = 0; for (let i = 0; i < 100; i++) { if (i === 4) break; partial += i; } partial"
        )?,
        HostValue::Int(6)
    );
    // break only exits the innermost loop.
    assert_eq!(
        engine.eval(
            "
                let count = 0;
                for (let i = 0; i < 3; i++) {
                    for (let j = 0; j < 10; j++) {
                        if (j === 2) break;
                        count++;
                    }
                }
                count
            "
        )?,
        HostValue::Int(6)
    );
    Ok(())
}

#[test]
fn test_for_in() -> Result<(), EcmaError> {
    let engine = Engine::new();
    // Own string keys in insertion order.
    assert_eq!(
        engine.eval("let ks = []; for (let k in {b: 1, a: 2}) ks.push(k); ks.join(',')")?,
        HostValue::from("b,a")
    );
    // Array indices come back as string keys.
    assert_eq!(
        engine.eval("let is = []; for (const i in ['x', 'y']) is.push(i); is.join(',')")?,
        HostValue::from("0,1")
    );
    Ok(())
}

#[test]
fn test_for_of() -> Result<(), EcmaError> {
    let engine = Engine::new();
    assert_eq!(
        engine.eval("let sum = 0; for (const n of [1, 2, 3]) sum += n; sum")?,
        HostValue::Int(6)
    );
    assert_eq!(
        engine.eval("let cs = []; for (const c of 'abc') cs.push(c); cs.join('-')")?,
        HostValue::from("a-b-c")
    );
    // Destructuring the iteration value.
    assert_eq!(
        engine.eval(
            "let joined = ''; for (const [k, v] of [['a', 1], ['b', 2]]) joined += k + v; joined"
        )?,
        HostValue::from("a1b2")
    );
    Ok(())
}

#[test]
fn test_switch() -> Result<(), EcmaError> {
    let engine = Engine::new();
    assert_eq!(
        engine.eval(
            "
                function name(n) {
                    switch (n) {
                        case 1: return 'one';
                        case 2: return 'two';
                        default: return 'many';
                    }
                }
                name(2) + ',' + name(9)
            "
        )?,
        HostValue::from("two,many")
    );
    Ok(())
}

#[test]
fn test_switch_fall_through() -> Result<(), EcmaError> {
    let engine = Engine::new();
    assert_eq!(
        engine.eval(
            "
                let r = '';
                switch (1) {
                    case 1: r += 'a';
                    case 2: r += 'b'; break;
                    case 3: r += 'c';
                }
                r
            "
        )?,
        HostValue::from("ab")
    );
    // Matching is strict: no coercion.
    assert_eq!(
        engine.eval(
            "
                let verdict = 'none';
                switch ('1') {
                    case 1: verdict = 'number'; break;
                    default: verdict = 'default';
                }
                verdict
            "
        )?,
        HostValue::from("default")
    );
    Ok(())
}

#[test]
fn test_switch_default_position() -> Result<(), EcmaError> {
    let engine = Engine::new();
    // Cases after `default` are still checked first.
    assert_eq!(
        engine.eval(
            "
                let r = '';
                switch (3) {
                    default: r += 'd';
                    case 3: r += 'c';
                }
                r
            "
        )?,
        HostValue::from("c")
    );
    Ok(())
}

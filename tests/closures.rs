use escript::{EcmaError, Engine, HostValue};

#[test]
fn test_loop_closures_capture_per_iteration() -> Result<(), EcmaError> {
    let engine = Engine::new();
    let result = engine.eval(
        "
            let out = [];
            for (let i = 0; i < 3; i++) out.push(() => i);
            [out[0](), out[1](), out[2]()]
        ",
    )?;
    assert_eq!(
        serde_json::to_value(&result).unwrap(),
        serde_json::json!([0, 1, 2])
    );
    Ok(())
}

#[test]
fn test_loop_closures_many_iterations() -> Result<(), EcmaError> {
    let engine = Engine::new();
    assert_eq!(
        engine.eval(
            "
                const fns = [];
                for (let i = 0; i < 10; i++) fns.push(() => i);
                fns.every((f, k) => f() === k)
            "
        )?,
        HostValue::Bool(true)
    );
    Ok(())
}

#[test]
fn test_counter_closure() -> Result<(), EcmaError> {
    let engine = Engine::new();
    assert_eq!(
        engine.eval(
            "
                function counter() {
                    let n = 0;
                    return () => {
                        n += 1;
                        return n;
                    };
                }
                const tick = counter();
                tick();
                tick();
                tick()
            "
        )?,
        HostValue::Int(3)
    );
    Ok(())
}

#[test]
fn test_closures_share_one_cell() -> Result<(), EcmaError> {
    let engine = Engine::new();
    assert_eq!(
        engine.eval(
            "
                function make() {
                    let v = 0;
                    return [() => v += 10, () => v];
                }
                const [bump, read] = make();
                bump();
                bump();
                read()
            "
        )?,
        HostValue::Int(20)
    );
    Ok(())
}

#[test]
fn test_capture_survives_block_exit() -> Result<(), EcmaError> {
    let engine = Engine::new();
    assert_eq!(
        engine.eval(
            "
                let grab;
                {
                    let hidden = 'kept';
                    grab = () => hidden;
                }
                grab()
            "
        )?,
        HostValue::from("kept")
    );
    Ok(())
}

#[test]
fn test_closure_sees_later_mutations() -> Result<(), EcmaError> {
    let engine = Engine::new();
    assert_eq!(
        engine.eval(
            "
                let v = 'before';
                const read = () => v;
                v = 'after';
                read()
            "
        )?,
        HostValue::from("after")
    );
    Ok(())
}

#[test]
fn test_nested_closures() -> Result<(), EcmaError> {
    let engine = Engine::new();
    assert_eq!(
        engine.eval(
            "
                function adder(a) {
                    return function (b) {
                        return function (c) {
                            return a + b + c;
                        };
                    };
                }
                adder(1)(2)(3)
            "
        )?,
        HostValue::Int(6)
    );
    Ok(())
}

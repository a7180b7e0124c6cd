use escript::{EcmaError, Engine, HostValue};

#[test]
fn test_function_declarations() -> Result<(), EcmaError> {
    let engine = Engine::new();
    assert_eq!(
        engine.eval("function add(a, b) { return a + b; } add(2, 3)")?,
        HostValue::Int(5)
    );
    assert_eq!(
        engine.eval("function nothing() {} nothing()")?,
        HostValue::Null
    );
    Ok(())
}

#[test]
fn test_recursion() -> Result<(), EcmaError> {
    let engine = Engine::new();
    assert_eq!(
        engine.eval("const f = n => n < 2 ? n : f(n-1) + f(n-2); f(10)")?,
        HostValue::Int(55)
    );
    assert_eq!(
        engine.eval(
            "
                function fact(n) {
                    if (n <= 1) return 1;
                    return n * fact(n - 1);
                }
                fact(10)
            "
        )?,
        HostValue::Int(3628800)
    );
    Ok(())
}

#[test]
fn test_default_parameters() -> Result<(), EcmaError> {
    let engine = Engine::new();
    assert_eq!(
        engine.eval("function f(a, b = 10) { return a + b; } f(5)")?,
        HostValue::Int(15)
    );
    assert_eq!(
        engine.eval("function g(a, b = 10) { return a + b; } g(5, 1)")?,
        HostValue::Int(6)
    );
    // An explicit undefined takes the default.
    assert_eq!(
        engine.eval("function h(a = 'd') { return a; } h(undefined)")?,
        HostValue::from("d")
    );
    // Later defaults can see earlier parameters.
    assert_eq!(
        engine.eval("function k(a, b = a * 2) { return b; } k(4)")?,
        HostValue::Int(8)
    );
    Ok(())
}

#[test]
fn test_rest_and_spread() -> Result<(), EcmaError> {
    let engine = Engine::new();
    assert_eq!(
        engine.eval("function f(...xs) { return xs.length; } f(1, 2, 3)")?,
        HostValue::Int(3)
    );
    assert_eq!(
        engine.eval("function g(first, ...rest) { return first + rest.join(''); } g(1, 2, 3)")?,
        HostValue::from("123")
    );
    assert_eq!(
        engine.eval("function sum(a, b, c) { return a + b + c; } sum(...[1, 2, 3])")?,
        HostValue::Int(6)
    );
    assert_eq!(
        engine.eval("function t(a, b, c) { return c; } t(0, ...'hi')")?,
        HostValue::from("i")
    );
    Ok(())
}

#[test]
fn test_destructured_parameters() -> Result<(), EcmaError> {
    let engine = Engine::new();
    assert_eq!(
        engine.eval("function f({x, y}) { return x + y; } f({x: 1, y: 2})")?,
        HostValue::Int(3)
    );
    assert_eq!(
        engine.eval("function g([a, b]) { return a * b; } g([3, 4])")?,
        HostValue::Int(12)
    );
    assert_eq!(
        engine.eval("function h({n = 9}) { return n; } h({})")?,
        HostValue::Int(9)
    );
    Ok(())
}

#[test]
fn test_arguments_object() -> Result<(), EcmaError> {
    let engine = Engine::new();
    assert_eq!(
        engine.eval(
            "function f() { return arguments.length + ':' + arguments[0]; } f('a', 'b')"
        )?,
        HostValue::from("2:a")
    );
    Ok(())
}

#[test]
fn test_constructors_and_instanceof() -> Result<(), EcmaError> {
    let engine = Engine::new();
    assert_eq!(
        engine.eval("function C(x) { this.x = x } const o = new C(7); o.x")?,
        HostValue::Int(7)
    );
    assert_eq!(engine.eval("o instanceof C")?, HostValue::Bool(true));
    assert_eq!(
        engine.eval("o.constructor === C")?,
        HostValue::Bool(true)
    );
    // A constructor returning an object overrides the allocation.
    assert_eq!(
        engine.eval("function D() { return {marker: 1}; } new D().marker")?,
        HostValue::Int(1)
    );
    // A primitive return value is ignored.
    assert_eq!(
        engine.eval("function E() { this.v = 2; return 5; } new E().v")?,
        HostValue::Int(2)
    );
    Ok(())
}

#[test]
fn test_methods_and_this() -> Result<(), EcmaError> {
    let engine = Engine::new();
    assert_eq!(
        engine.eval(
            "
                const obj = {
                    name: 'thing',
                    describe: function () { return 'a ' + this.name; }
                };
                obj.describe()
            "
        )?,
        HostValue::from("a thing")
    );
    Ok(())
}

#[test]
fn test_arrows_inherit_this() -> Result<(), EcmaError> {
    let engine = Engine::new();
    assert_eq!(
        engine.eval(
            "
                function Holder() {
                    this.v = 42;
                    this.read = () => this.v;
                }
                new Holder().read()
            "
        )?,
        HostValue::Int(42)
    );
    Ok(())
}

#[test]
fn test_function_expressions_and_iife() -> Result<(), EcmaError> {
    let engine = Engine::new();
    assert_eq!(
        engine.eval("const double = function (n) { return n * 2; }; double(21)")?,
        HostValue::Int(42)
    );
    assert_eq!(
        engine.eval("(function (n) { return n + 1; })(41)")?,
        HostValue::Int(42)
    );
    assert_eq!(engine.eval("((x, y) => x * y)(6, 7)")?, HostValue::Int(42));
    Ok(())
}

#[test]
fn test_not_a_function() {
    let engine = Engine::new();
    let err = engine.eval("const n = 5; n()").expect_err("call a number");
    assert!(
        err.message().contains("is not a function"),
        "unexpected message: {}",
        err.message()
    );

    let engine = Engine::new();
    let err = engine
        .eval("const o = {}; o.missing()")
        .expect_err("call a missing member");
    assert!(err.message().contains("is not a function"));
}

#[test]
fn test_call_stack_limit() {
    let engine = Engine::new();
    let err = engine
        .eval("function f() { return f(); } f()")
        .expect_err("unbounded recursion");
    assert!(
        err.message().contains("call stack"),
        "unexpected message: {}",
        err.message()
    );
}

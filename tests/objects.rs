use escript::{EcmaError, Engine, HostValue};

#[test]
fn test_object_literals() -> Result<(), EcmaError> {
    let engine = Engine::new();
    assert_eq!(engine.eval("({a: 1}).a")?, HostValue::Int(1));
    assert_eq!(engine.eval("({'quoted key': 2})['quoted key']")?, HostValue::Int(2));
    assert_eq!(engine.eval("({1: 'one'})[1]")?, HostValue::from("one"));
    // Shorthand and nested literals.
    assert_eq!(
        engine.eval("const x = 5; const o = {x, deep: {y: 6}}; o.x + o.deep.y")?,
        HostValue::Int(11)
    );
    Ok(())
}

#[test]
fn test_computed_keys_and_spread() -> Result<(), EcmaError> {
    let engine = Engine::new();
    assert_eq!(
        engine.eval("const k = 'dyn'; const o = {[k + '1']: 5}; o.dyn1")?,
        HostValue::Int(5)
    );
    assert_eq!(
        engine.eval("const a = {x: 1, y: 9}; const b = {...a, y: 2}; b.x + b.y")?,
        HostValue::Int(3)
    );
    Ok(())
}

#[test]
fn test_insertion_order() -> Result<(), EcmaError> {
    let engine = Engine::new();
    assert_eq!(
        engine.eval("JSON.stringify({b: 2, a: 1})")?,
        HostValue::from(r#"{"b":2,"a":1}"#)
    );
    assert_eq!(
        engine.eval("Object.keys({z: 0, m: 0, a: 0}).join(',')")?,
        HostValue::from("z,m,a")
    );
    Ok(())
}

#[test]
fn test_member_access_and_delete() -> Result<(), EcmaError> {
    let engine = Engine::new();
    assert_eq!(
        engine.eval("const o = {a: 1, b: 2}; delete o.a; JSON.stringify(o)")?,
        HostValue::from(r#"{"b":2}"#)
    );
    assert_eq!(
        engine.eval("const p = {a: 1}; delete p.missing")?,
        HostValue::Bool(true)
    );
    // Reading a missing key is undefined, not an error.
    assert_eq!(engine.eval("({}).missing")?, HostValue::Null);
    // Bracket access coerces the key.
    assert_eq!(engine.eval("const q = {}; q[1 + 1] = 'two'; q['2']")?, HostValue::from("two"));
    Ok(())
}

#[test]
fn test_prototype_chain() -> Result<(), EcmaError> {
    let engine = Engine::new();
    assert_eq!(
        engine.eval(
            "
                const base = {greet: function () { return 'hi ' + this.name; }};
                const obj = {name: 'x'};
                obj.__proto__ = base;
                obj.greet()
            "
        )?,
        HostValue::from("hi x")
    );
    // Own properties shadow the prototype.
    assert_eq!(
        engine.eval(
            "
                const parent = {v: 'parent'};
                const child = Object.create(parent);
                const before = child.v;
                child.v = 'child';
                before + ':' + child.v + ':' + parent.v
            "
        )?,
        HostValue::from("parent:child:parent")
    );
    Ok(())
}

#[test]
fn test_prototype_cycles_rejected() -> Result<(), EcmaError> {
    let engine = Engine::new();
    // Closing a cycle falls back to null.
    assert_eq!(
        engine.eval(
            "
                const a = {};
                const b = {};
                Object.setPrototypeOf(a, b);
                Object.setPrototypeOf(b, a);
                Object.getPrototypeOf(b)
            "
        )?,
        HostValue::Null
    );
    assert_eq!(
        engine.eval("const c = {}; c.__proto__ = c; c.__proto__")?,
        HostValue::Null
    );
    Ok(())
}

#[test]
fn test_object_statics() -> Result<(), EcmaError> {
    let engine = Engine::new();
    assert_eq!(
        engine.eval("Object.values({a: 1, b: 2}).join(',')")?,
        HostValue::from("1,2")
    );
    assert_eq!(
        engine.eval("JSON.stringify(Object.entries({a: 1}))")?,
        HostValue::from(r#"[["a",1]]"#)
    );
    assert_eq!(
        engine.eval("const t = {a: 1}; Object.assign(t, {b: 2}, {c: 3}); Object.keys(t).join('')")?,
        HostValue::from("abc")
    );
    assert_eq!(
        engine.eval("Object.fromEntries([['x', 1], ['y', 2]]).y")?,
        HostValue::Int(2)
    );
    assert_eq!(engine.eval("Object.is(NaN, NaN)")?, HostValue::Bool(true));
    assert_eq!(engine.eval("Object.is(0, -0)")?, HostValue::Bool(false));
    assert_eq!(engine.eval("Object.is(1, 1)")?, HostValue::Bool(true));
    assert_eq!(
        engine.eval("const proto = {kind: 'p'}; Object.getPrototypeOf(Object.create(proto)) === proto")?,
        HostValue::Bool(true)
    );
    Ok(())
}

#[test]
fn test_has_own_property() -> Result<(), EcmaError> {
    let engine = Engine::new();
    assert_eq!(
        engine.eval("({a: 1}).hasOwnProperty('a')")?,
        HostValue::Bool(true)
    );
    assert_eq!(
        engine.eval("({a: 1}).hasOwnProperty('toString')")?,
        HostValue::Bool(false)
    );
    Ok(())
}

#[test]
fn test_immutable_builtin_prototypes() {
    let engine = Engine::new();
    let err = engine
        .eval("Object.prototype.polluted = 1;")
        .expect_err("prototype write should fail");
    assert!(
        err.message().contains("immutable"),
        "unexpected message: {}",
        err.message()
    );

    let engine = Engine::new();
    let err = engine
        .eval("Array.prototype.push = function () {};")
        .expect_err("array prototype write should fail");
    assert!(err.message().contains("immutable"));
}

#[test]
fn test_boxed_primitives() -> Result<(), EcmaError> {
    let engine = Engine::new();
    assert_eq!(engine.eval("new String('ab').length")?, HostValue::Int(2));
    assert_eq!(
        engine.eval("new Number(6).valueOf() * 7")?,
        HostValue::Int(42)
    );
    // Boxed primitives are truthy even when wrapping a falsy value.
    assert_eq!(
        engine.eval("new Boolean(false) ? 'truthy' : 'falsy'")?,
        HostValue::from("truthy")
    );
    // But they unwrap for loose equality.
    assert_eq!(engine.eval("new Number(5) == 5")?, HostValue::Bool(true));
    assert_eq!(engine.eval("new Number(5) === 5")?, HostValue::Bool(false));
    Ok(())
}

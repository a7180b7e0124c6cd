use escript::{EcmaError, Engine, HostValue};

#[test]
fn test_literals_and_flags() -> Result<(), EcmaError> {
    let engine = Engine::new();
    assert_eq!(engine.eval("/ab/.source")?, HostValue::from("ab"));
    assert_eq!(engine.eval("/ab/gi.flags")?, HostValue::from("gi"));
    assert_eq!(engine.eval("/a/g.global")?, HostValue::Bool(true));
    assert_eq!(engine.eval("/a/i.ignoreCase")?, HostValue::Bool(true));
    assert_eq!(engine.eval("/a/.global")?, HostValue::Bool(false));
    assert_eq!(engine.eval("'' + /x\\d/g")?, HostValue::from("/x\\d/g"));
    Ok(())
}

#[test]
fn test_test_method() -> Result<(), EcmaError> {
    let engine = Engine::new();
    assert_eq!(engine.eval(r"/\d+/.test('abc123')")?, HostValue::Bool(true));
    assert_eq!(engine.eval(r"/\d+/.test('abc')")?, HostValue::Bool(false));
    assert_eq!(engine.eval("/^a.c$/s.test('a\\nc')")?, HostValue::Bool(true));
    assert_eq!(engine.eval("/HELLO/i.test('hello')")?, HostValue::Bool(true));
    Ok(())
}

#[test]
fn test_exec_and_groups() -> Result<(), EcmaError> {
    let engine = Engine::new();
    assert_eq!(
        engine.eval("const m = /a(b)c/.exec('xabc'); m[0] + ',' + m[1] + ',' + m.index")?,
        HostValue::from("abc,b,1")
    );
    assert_eq!(engine.eval("/z/.exec('abc')")?, HostValue::Null);
    // An unmatched optional group is undefined.
    assert_eq!(
        engine.eval("const g = /a(x)?b/.exec('ab'); typeof g[1]")?,
        HostValue::from("undefined")
    );
    Ok(())
}

#[test]
fn test_global_last_index() -> Result<(), EcmaError> {
    let engine = Engine::new();
    assert_eq!(
        engine.eval(
            "
                const r = /\\d+/g;
                const first = r.exec('a1b22');
                const second = r.exec('a1b22');
                const third = r.exec('a1b22');
                first[0] + ',' + second[0] + ',' + (third === null) + ',' + r.lastIndex
            "
        )?,
        HostValue::from("1,22,true,0")
    );
    assert_eq!(
        engine.eval("const s = /a/g; s.exec('xa'); s.lastIndex")?,
        HostValue::Int(2)
    );
    // lastIndex is writable.
    assert_eq!(
        engine.eval("const t = /a/g; t.lastIndex = 5; t.lastIndex")?,
        HostValue::Int(5)
    );
    Ok(())
}

#[test]
fn test_constructor() -> Result<(), EcmaError> {
    let engine = Engine::new();
    assert_eq!(
        engine.eval("new RegExp('ab+', 'i').test('xABB')")?,
        HostValue::Bool(true)
    );
    assert_eq!(
        engine.eval("new RegExp(/seed/g).flags")?,
        HostValue::from("g")
    );
    let err = engine.eval("new RegExp('(unclosed')").expect_err("bad pattern");
    assert!(
        err.message().contains("regular expression"),
        "unexpected message: {}",
        err.message()
    );
    Ok(())
}

#[test]
fn test_lookahead_and_backreference() -> Result<(), EcmaError> {
    let engine = Engine::new();
    // The regex flavor keeps lookaround and backreferences.
    assert_eq!(
        engine.eval(r"/foo(?=bar)/.test('foobar')")?,
        HostValue::Bool(true)
    );
    assert_eq!(
        engine.eval(r"/foo(?=bar)/.test('foobaz')")?,
        HostValue::Bool(false)
    );
    assert_eq!(engine.eval(r"/(\w)\1/.test('aa')")?, HostValue::Bool(true));
    assert_eq!(engine.eval(r"/(\w)\1/.test('ab')")?, HostValue::Bool(false));
    Ok(())
}

#[test]
fn test_regex_through_string_methods() -> Result<(), EcmaError> {
    let engine = Engine::new();
    assert_eq!(
        engine.eval(r"'2021-07-04'.replace(/(\d+)-(\d+)-(\d+)/, '$3/$2/$1')")?,
        HostValue::from("04/07/2021")
    );
    assert_eq!(
        engine.eval(r"'one two  three'.split(/\s+/).length")?,
        HostValue::Int(3)
    );
    Ok(())
}

use escript::{EcmaError, Engine, HostValue};

#[test]
fn test_epoch_and_iso() -> Result<(), EcmaError> {
    let engine = Engine::new();
    assert_eq!(
        engine.eval("new Date(0).toISOString()")?,
        HostValue::from("1970-01-01T00:00:00.000Z")
    );
    assert_eq!(engine.eval("new Date(0).getTime()")?, HostValue::Int(0));
    assert_eq!(
        engine.eval("new Date(86400000).toISOString()")?,
        HostValue::from("1970-01-02T00:00:00.000Z")
    );
    Ok(())
}

#[test]
fn test_parsing() -> Result<(), EcmaError> {
    let engine = Engine::new();
    // ISO parsing agrees with component construction.
    assert_eq!(
        engine.eval(
            "new Date('2020-05-15T10:20:30Z').getTime() === Date.UTC(2020, 4, 15, 10, 20, 30)"
        )?,
        HostValue::Bool(true)
    );
    assert_eq!(
        engine.eval("new Date('2020-05-15').toISOString()")?,
        HostValue::from("2020-05-15T00:00:00.000Z")
    );
    assert_eq!(
        engine.eval("isNaN(Date.parse('definitely not a date'))")?,
        HostValue::Bool(true)
    );
    // Round-trip through the ISO string.
    assert_eq!(
        engine.eval("const d = new Date(1234567890123); new Date(d.toISOString()).getTime()")?,
        HostValue::Int(1234567890123)
    );
    Ok(())
}

#[test]
fn test_getters() -> Result<(), EcmaError> {
    let engine = Engine::new();
    let result = engine.eval(
        "
            const d = new Date(Date.UTC(2020, 0, 2, 3, 4, 5));
            [d.getFullYear(), d.getMonth(), d.getDate(), d.getHours(),
             d.getMinutes(), d.getSeconds(), d.getDay()]
        ",
    )?;
    assert_eq!(
        serde_json::to_value(&result).unwrap(),
        serde_json::json!([2020, 0, 2, 3, 4, 5, 4]) // 2020-01-02 is a Thursday
    );
    assert_eq!(
        engine.eval("new Date(1500).getMilliseconds()")?,
        HostValue::Int(500)
    );
    Ok(())
}

#[test]
fn test_setters() -> Result<(), EcmaError> {
    let engine = Engine::new();
    assert_eq!(
        engine.eval("const d = new Date(0); d.setFullYear(2000); d.getFullYear()")?,
        HostValue::Int(2000)
    );
    assert_eq!(
        engine.eval("const e = new Date(0); e.setMonth(11); e.getMonth()")?,
        HostValue::Int(11)
    );
    assert_eq!(
        engine.eval("const f = new Date(0); f.setDate(15); f.getDate()")?,
        HostValue::Int(15)
    );
    assert_eq!(
        engine.eval("const g = new Date(0); g.setHours(6, 30); g.getHours() * 100 + g.getMinutes()")?,
        HostValue::Int(630)
    );
    assert_eq!(
        engine.eval("const h = new Date(0); h.setTime(86400000); h.getDate()")?,
        HostValue::Int(2)
    );
    assert_eq!(
        engine.eval("const k = new Date(0); k.setMilliseconds(250); k.getMilliseconds()")?,
        HostValue::Int(250)
    );
    Ok(())
}

#[test]
fn test_now_and_arithmetic() -> Result<(), EcmaError> {
    let engine = Engine::new();
    assert_eq!(engine.eval("Date.now() > 1500000000000")?, HostValue::Bool(true));
    // Dates coerce to their epoch value in arithmetic.
    assert_eq!(
        engine.eval("new Date(2000) - new Date(500)")?,
        HostValue::Int(1500)
    );
    Ok(())
}

#[test]
fn test_formatting() -> Result<(), EcmaError> {
    let engine = Engine::new();
    assert_eq!(
        engine.eval("new Date(0).toUTCString()")?,
        HostValue::from("Thu, 01 Jan 1970 00:00:00 GMT")
    );
    // Dates serialize as ISO strings in JSON.
    assert_eq!(
        engine.eval("JSON.stringify({t: new Date(0)})")?,
        HostValue::from(r#"{"t":"1970-01-01T00:00:00.000Z"}"#)
    );
    // Invalid dates format as such.
    assert_eq!(
        engine.eval("'' + new Date('nope')")?,
        HostValue::from("Invalid Date")
    );
    Ok(())
}

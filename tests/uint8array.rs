use escript::{EcmaError, Engine, HostValue};

#[test]
fn test_construction() -> Result<(), EcmaError> {
    let engine = Engine::new();
    assert_eq!(engine.eval("new Uint8Array(3).length")?, HostValue::Int(3));
    assert_eq!(engine.eval("new Uint8Array(3)[0]")?, HostValue::Int(0));
    assert_eq!(
        engine.eval("new Uint8Array([1, 2, 3]).length")?,
        HostValue::Int(3)
    );
    assert_eq!(engine.eval("new Uint8Array().length")?, HostValue::Int(0));
    // Values wrap to unsigned bytes.
    assert_eq!(engine.eval("new Uint8Array([300])[0]")?, HostValue::Int(44));
    assert_eq!(engine.eval("new Uint8Array([-1])[0]")?, HostValue::Int(255));
    Ok(())
}

#[test]
fn test_reads_and_writes() -> Result<(), EcmaError> {
    let engine = Engine::new();
    assert_eq!(
        engine.eval("const b = new Uint8Array([1, 2, 3]); b[1]")?,
        HostValue::Int(2)
    );
    assert_eq!(
        engine.eval("const c = new Uint8Array([1, 2, 3]); c[1] = 300; c[1]")?,
        HostValue::Int(44)
    );
    // Out-of-bounds reads are undefined; the buffer does not grow.
    assert_eq!(engine.eval("new Uint8Array(2)[9]")?, HostValue::Null);
    assert_eq!(
        engine.eval("const d = new Uint8Array(2); d[9] = 1; d.length")?,
        HostValue::Int(2)
    );
    Ok(())
}

#[test]
fn test_methods() -> Result<(), EcmaError> {
    let engine = Engine::new();
    assert_eq!(
        engine.eval("new Uint8Array([1, 2, 3, 4]).slice(1, 3).toString()")?,
        HostValue::from("2,3")
    );
    assert_eq!(
        engine.eval("const b = new Uint8Array(3); b.fill(7); b.toString()")?,
        HostValue::from("7,7,7")
    );
    assert_eq!(
        engine.eval("new Uint8Array([5, 6]).indexOf(6)")?,
        HostValue::Int(1)
    );
    assert_eq!(
        engine.eval("new Uint8Array([5, 6]).includes(9)")?,
        HostValue::Bool(false)
    );
    Ok(())
}

#[test]
fn test_iteration_and_host_form() -> Result<(), EcmaError> {
    let engine = Engine::new();
    assert_eq!(
        engine.eval("let s = 0; for (const byte of new Uint8Array([1, 2, 3])) s += byte; s")?,
        HostValue::Int(6)
    );
    // Byte buffers cross the boundary as bytes.
    assert_eq!(
        engine.eval("new Uint8Array([1, 2])")?,
        HostValue::Bytes(vec![1, 2])
    );
    Ok(())
}

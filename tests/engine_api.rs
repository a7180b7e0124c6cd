use std::cell::RefCell;
use std::rc::Rc;

use escript::{
    ContextEvent, ContextListener, DebugPoint, DebugPointFactory, DebugPointKind, EcmaError,
    Engine, ExitResult, ExternalAccess, ExternalBridge, HostValue, Node, Position, RunInterceptor,
    StepAction, Value, VariableWriteKind,
};

#[test]
fn test_put_get_remove() {
    let engine = Engine::new();
    engine.put("answer", HostValue::Int(41));
    assert_eq!(engine.eval("answer + 1").unwrap(), HostValue::Int(42));

    engine.put("answer", HostValue::Int(10));
    assert_eq!(engine.get("answer"), Some(HostValue::Int(10)));

    assert!(engine.remove("answer"));
    assert!(!engine.remove("answer"));
    assert_eq!(engine.get("answer"), None);
}

#[test]
fn test_with_bindings() {
    let engine = Engine::with_bindings([
        ("a", HostValue::Int(40)),
        ("b", HostValue::Int(2)),
    ]);
    assert_eq!(engine.eval("a + b").unwrap(), HostValue::Int(42));
}

#[test]
fn test_structured_bindings_cross_the_boundary() {
    let engine = Engine::new();
    engine.put(
        "config",
        HostValue::Object(
            [
                ("name".to_string(), HostValue::from("svc")),
                ("retries".to_string(), HostValue::Int(3)),
            ]
            .into_iter()
            .collect(),
        ),
    );
    assert_eq!(
        engine.eval("config.name + ':' + config.retries").unwrap(),
        HostValue::from("svc:3")
    );

    // Script-built structures come back as host structures.
    let result = engine.eval("[1, 'two', {three: 3}, null]").unwrap();
    assert_eq!(
        serde_json::to_value(&result).unwrap(),
        serde_json::json!([1, "two", {"three": 3}, null])
    );
}

#[test]
fn test_eval_with_locals() {
    let engine = Engine::new();
    engine.put("base", HostValue::Int(1));
    assert_eq!(
        engine
            .eval_with("base + bonus", [("bonus", HostValue::Int(9))])
            .unwrap(),
        HostValue::Int(10)
    );
    // The overlay is gone afterwards.
    assert!(engine.eval("bonus").is_err());
}

#[test]
fn test_compile_once_eval_many() -> Result<(), EcmaError> {
    let engine = Engine::new();
    engine.put("n", HostValue::Int(0));
    let ast = engine.compile("n = n + 1; n * 10")?;
    assert_eq!(engine.eval_ast(&ast)?, HostValue::Int(10));
    assert_eq!(engine.eval_ast(&ast)?, HostValue::Int(20));
    assert_eq!(engine.eval_ast(&ast)?, HostValue::Int(30));
    Ok(())
}

#[test]
fn test_console_sink() {
    let lines: Rc<RefCell<Vec<String>>> = Rc::new(RefCell::new(Vec::new()));
    let sink = lines.clone();
    let mut engine = Engine::new();
    engine.set_on_console_log(move |line| sink.borrow_mut().push(line.to_string()));
    engine
        .eval("console.log('hello', 1, [2, 3]); console.warn('careful')")
        .unwrap();
    assert_eq!(
        lines.borrow().as_slice(),
        ["hello 1 2,3".to_string(), "careful".to_string()]
    );

    // Without a sink, logging is a quiet no-op.
    let engine = Engine::new();
    assert!(engine.eval("console.log('dropped')").is_ok());
}

#[derive(Default)]
struct CountingListener {
    statements: RefCell<usize>,
    writes: RefCell<Vec<String>>,
    calls: RefCell<usize>,
}

struct CountingListenerHandle(Rc<CountingListener>);

impl ContextListener for CountingListenerHandle {
    fn on_event(&self, event: ContextEvent, _node: &Node) {
        if event == ContextEvent::StatementEnter {
            *self.0.statements.borrow_mut() += 1;
        }
    }

    fn on_variable_write(&self, _kind: VariableWriteKind, name: &str, _value: &Value) {
        self.0.writes.borrow_mut().push(name.to_string());
    }

    fn on_function_call(&self, _callee: &Value, _args: &[Value]) {
        *self.0.calls.borrow_mut() += 1;
    }
}

#[test]
fn test_listener_observes_evaluation() {
    let listener = Rc::new(CountingListener::default());
    let mut engine = Engine::new();
    engine.set_listener(Box::new(CountingListenerHandle(listener.clone())));
    engine
        .eval("let a = 1; a = 2; Math.abs(-1);")
        .unwrap();
    assert_eq!(*listener.statements.borrow(), 3);
    assert!(listener.writes.borrow().iter().any(|w| w == "a"));
    assert!(*listener.calls.borrow() >= 1);
}

struct Suppressor;

impl ContextListener for Suppressor {
    fn on_error(&self, _node: &Node, _error: &Value) -> Option<ExitResult> {
        Some(ExitResult {
            ignore_error: true,
            return_value: Value::str("rescued"),
        })
    }
}

#[test]
fn test_listener_can_suppress_errors() {
    let mut engine = Engine::new();
    engine.set_listener(Box::new(Suppressor));
    // The failing statement is replaced by the substitute value and
    // evaluation continues.
    assert_eq!(
        engine.eval("missing_binding").unwrap(),
        HostValue::from("rescued")
    );
    assert_eq!(
        engine.eval("let after = 'ok'; missing_binding; after").unwrap(),
        HostValue::from("ok")
    );
}

struct SkipAll;

impl RunInterceptor for SkipAll {
    fn before_execute(&self, _point: &DebugPoint) -> StepAction {
        StepAction::Skip
    }
}

struct PointFactory;

impl DebugPointFactory for PointFactory {
    fn create(&self, kind: DebugPointKind, position: Position) -> DebugPoint {
        DebugPoint {
            kind,
            position,
            source: Some("test.js".to_string()),
        }
    }
}

#[test]
fn test_interceptor_can_skip_statements() {
    let mut engine = Engine::new();
    engine.set_debug_support(Box::new(SkipAll), Box::new(PointFactory));
    engine.eval("sideEffect = 1;").unwrap();
    // The statement never executed, so the implicit global never appeared.
    assert_eq!(engine.get("sideEffect"), None);
}

struct WaitOnce {
    waited: RefCell<bool>,
}

impl RunInterceptor for WaitOnce {
    fn before_execute(&self, _point: &DebugPoint) -> StepAction {
        if *self.waited.borrow() {
            StepAction::Continue
        } else {
            StepAction::Wait
        }
    }

    fn wait_for_resume(&self) -> StepAction {
        *self.waited.borrow_mut() = true;
        StepAction::Continue
    }
}

#[test]
fn test_interceptor_wait_resumes() {
    let mut engine = Engine::new();
    engine.set_debug_support(
        Box::new(WaitOnce {
            waited: RefCell::new(false),
        }),
        Box::new(PointFactory),
    );
    assert_eq!(engine.eval("6 * 7").unwrap(), HostValue::Int(42));
}

struct HostMath;

impl ExternalAccess for HostMath {
    fn read(&self, name: &str) -> Option<Value> {
        match name {
            "seed" => Some(Value::Number(99.0)),
            _ => None,
        }
    }

    fn get_property(&self, name: &str) -> Option<Value> {
        self.read(name)
    }
}

struct TestBridge;

impl ExternalBridge for TestBridge {
    fn for_type(&self, dotted_name: &str) -> Option<Box<dyn ExternalAccess>> {
        if dotted_name == "HostMath" {
            Some(Box::new(HostMath))
        } else {
            None
        }
    }

    fn for_instance(&self, _value: &Value) -> Option<Box<dyn ExternalAccess>> {
        None
    }
}

#[test]
fn test_external_bridge_resolves_types() {
    let mut engine = Engine::new();
    engine.set_external_bridge(Box::new(TestBridge));
    assert_eq!(engine.eval("HostMath.seed + 1").unwrap(), HostValue::Int(100));
    // Unknown names still fail normally.
    assert!(engine.eval("OtherType.x").is_err());
}

#[test]
fn test_put_root_binding() {
    let engine = Engine::new();
    engine.put_root_binding("VERSION", HostValue::from("1.2.3"));
    assert_eq!(
        engine.eval("'v' + VERSION").unwrap(),
        HostValue::from("v1.2.3")
    );
}

#[test]
fn test_global_this_view() {
    let engine = Engine::new();
    engine.put("shared", HostValue::Int(5));
    assert_eq!(engine.eval("globalThis.shared").unwrap(), HostValue::Int(5));
}

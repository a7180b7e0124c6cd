use escript::{EcmaError, Engine, NodeKind, Parser, TokenKind};

#[test]
fn test_syntax_errors_fail_eval() {
    let engine = Engine::new();
    let err = engine.eval("let = 5;").expect_err("missing binding name");
    assert!(matches!(err, EcmaError::Parse(_)));
    assert!(err.message().contains("expected"));

    let err = engine.eval("if (").expect_err("unterminated condition");
    assert!(matches!(err, EcmaError::Parse(_)));

    let err = engine.eval("const x = ;").expect_err("missing initializer expr");
    assert!(matches!(err, EcmaError::Parse(_)));
}

#[test]
fn test_error_positions() {
    let engine = Engine::new();
    let err = engine
        .eval("let ok = 1;\nlet broken = ;")
        .expect_err("second line fails");
    assert_eq!(err.position().line(), Some(2));
}

#[test]
fn test_recursion_limit() {
    let engine = Engine::new();
    let source = format!("{}1{}", "(".repeat(300), ")".repeat(300));
    let err = engine.eval(&source).expect_err("too deep");
    assert!(
        err.message().contains("too much recursion"),
        "unexpected message: {}",
        err.message()
    );
}

#[test]
fn test_parse_depth_is_configurable() {
    let mut engine = Engine::new();
    engine.set_max_parse_depth(10_000);
    let source = format!("{}1{}", "(".repeat(300), ")".repeat(300));
    assert!(engine.eval(&source).is_ok());
}

#[test]
fn test_recovery_mode_collects_errors() {
    let engine = Engine::new();
    let ast = engine.compile_lenient("let a = ; let b = 2;");
    assert!(!ast.errors().is_empty());
    // The tree is still a program with statements in it.
    assert_eq!(ast.root().kind(), Some(NodeKind::Program));
    assert!(ast.root().children().len() >= 2);

    // A clean source produces no errors in the same mode.
    let clean = engine.compile_lenient("let ok = 1;");
    assert!(clean.errors().is_empty());
}

#[test]
fn test_recover_to() {
    let tokens = escript::tokenize("@ @ ; let x = 1;");
    let mut parser = Parser::with_recovery(&tokens);
    parser.recover_to(&[TokenKind::Semicolon]);
    let root = parser.parse_program().expect("recovery mode still parses");
    assert_eq!(root.kind(), Some(NodeKind::Program));
}

#[test]
fn test_lenient_lexing_still_evaluates() {
    // The lexer never fails: an unterminated string just ends at EOF.
    let engine = Engine::new();
    assert_eq!(
        engine.eval("'abc").expect("unterminated string"),
        escript::HostValue::from("abc")
    );
}

#[test]
fn test_parse_determinism() {
    let source = "let a = [1, 2].map(x => x * 2); a.length";
    let one = escript::parse(source).expect("parses");
    let two = escript::parse(source).expect("parses");
    assert_eq!(format!("{:?}", one.root()), format!("{:?}", two.root()));
}

use escript::{tokenize, TokenKind};

fn round_trip(source: &str) {
    let tokens = tokenize(source);
    let rebuilt: String = tokens.iter().map(|t| t.text.as_ref()).collect();
    assert_eq!(rebuilt, source, "token texts must reproduce the source");
    assert_eq!(tokens.last().map(|t| t.kind), Some(TokenKind::Eof));
}

#[test]
fn test_round_trip() {
    round_trip("let a = 1;");
    round_trip("  // comment\n  a /* block\n comment */ + b");
    round_trip("const s = \"d\\\"quoted\" + 'single';");
    round_trip("`template ${x + 1} tail`");
    round_trip("a = b / c / d;");
    round_trip("x = /re[g/]ex/gi;");
    round_trip("o?.p ?? q ** 2 >>>= r");
    round_trip("for (let i = 0; i < 10; i++) {}\n");
    round_trip("0x1F .5 1e9 1.25");
    round_trip("broken 'unterminated");
}

#[test]
fn test_whitespace_kinds() {
    let tokens = tokenize("a b\nc");
    let kinds: Vec<TokenKind> = tokens.iter().map(|t| t.kind).collect();
    assert_eq!(
        kinds,
        vec![
            TokenKind::Ident,
            TokenKind::Ws,
            TokenKind::Ident,
            TokenKind::WsLf,
            TokenKind::Ident,
            TokenKind::Eof,
        ]
    );
}

#[test]
fn test_regex_vs_divide() {
    // After an identifier a slash divides.
    let tokens = tokenize("a / b / c");
    assert!(tokens.iter().all(|t| t.kind != TokenKind::Regex));
    assert_eq!(
        tokens.iter().filter(|t| t.kind == TokenKind::Slash).count(),
        2
    );

    // After `=` a slash opens a regex literal.
    let tokens = tokenize("a = /b/g");
    let regex: Vec<_> = tokens.iter().filter(|t| t.kind == TokenKind::Regex).collect();
    assert_eq!(regex.len(), 1);
    assert_eq!(regex[0].text.as_ref(), "/b/g");

    // After a closing parenthesis a slash divides.
    let tokens = tokenize("(1 + 2) / 3");
    assert!(tokens.iter().all(|t| t.kind != TokenKind::Regex));

    // A character class may contain an unescaped slash.
    let tokens = tokenize("x = /a[/]b/");
    assert_eq!(
        tokens.iter().filter(|t| t.kind == TokenKind::Regex).count(),
        1
    );
}

#[test]
fn test_multi_char_operators() {
    let source = "=== !== ** >>> >>>= ?? ?. => ... &&= ||= ??=";
    let kinds: Vec<TokenKind> = tokenize(source)
        .into_iter()
        .filter(|t| !t.kind.is_trivia() && t.kind != TokenKind::Eof)
        .map(|t| t.kind)
        .collect();
    assert_eq!(
        kinds,
        vec![
            TokenKind::StrictEq,
            TokenKind::StrictNotEq,
            TokenKind::Pow,
            TokenKind::UShr,
            TokenKind::UShrAssign,
            TokenKind::Coalesce,
            TokenKind::Optional,
            TokenKind::Arrow,
            TokenKind::Ellipsis,
            TokenKind::AndAssign,
            TokenKind::OrAssign,
            TokenKind::CoalesceAssign,
        ]
    );
}

#[test]
fn test_keywords_and_identifier_exceptions() {
    let kinds: Vec<TokenKind> = tokenize("var let const this void of instanceof")
        .into_iter()
        .filter(|t| !t.kind.is_trivia() && t.kind != TokenKind::Eof)
        .map(|t| t.kind)
        .collect();
    assert_eq!(
        kinds,
        vec![
            TokenKind::Var,
            TokenKind::Let,
            TokenKind::Const,
            TokenKind::Ident, // `this` stays an identifier
            TokenKind::Ident, // so does `void`
            TokenKind::Ident, // and the contextual `of`
            TokenKind::Instanceof,
        ]
    );
}

#[test]
fn test_string_cooking() {
    let tokens = tokenize(r#""a\nbA\q""#);
    assert_eq!(tokens[0].kind, TokenKind::DString);
    // Known escapes decode; unknown escapes keep the backslash.
    assert_eq!(tokens[0].cooked_text(), "a\nbA\\q");
}

#[test]
fn test_template_tokens() {
    let kinds: Vec<TokenKind> = tokenize("`a${b}c`")
        .into_iter()
        .map(|t| t.kind)
        .collect();
    assert_eq!(
        kinds,
        vec![
            TokenKind::Backtick,
            TokenKind::TString,
            TokenKind::DollarLCurly,
            TokenKind::Ident,
            TokenKind::RCurly,
            TokenKind::TString,
            TokenKind::Backtick,
            TokenKind::Eof,
        ]
    );
}

#[test]
fn test_positions() {
    let tokens = tokenize("a\n  b");
    let b = tokens
        .iter()
        .find(|t| t.kind == TokenKind::Ident && t.text.as_ref() == "b")
        .expect("b is lexed");
    assert_eq!(b.pos.line(), Some(2));
    assert_eq!(b.offset, 4);
}

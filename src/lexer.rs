//! The lexer: source text to a stream of [`Token`]s.
//!
//! One pass, character by character. A small state stack tracks template
//! literals so that `` ` ``-delimited text and `${ ... }` placeholders can
//! interleave with normal scanning. The lexer never fails: malformed input
//! (an unterminated string, regex or comment) still produces a best-effort
//! token ending at EOF, and the parser reports the position.

use crate::token::{Position, RegexHint, Token, TokenKind};

/// Tokenize an entire source string. The stream is terminated by an
/// [`Eof`][TokenKind::Eof] token and concatenating the `text` of every token
/// reproduces the input exactly.
#[must_use]
pub fn tokenize(src: &str) -> Vec<Token> {
    let mut lexer = Lexer::new(src);
    let mut tokens = Vec::new();
    loop {
        let token = lexer.next_token();
        let done = token.kind == TokenKind::Eof;
        tokens.push(token);
        if done {
            return tokens;
        }
    }
}

/// Scanner state for template literals.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
enum LexState {
    /// Inside `` `...` `` text, scanning raw chunks.
    Template,
    /// Inside a `${ ... }` placeholder; counts nested `{` so that object
    /// literals inside a placeholder do not pop the state early.
    Placeholder { depth: usize },
}

pub struct Lexer<'a> {
    src: &'a str,
    chars: Vec<(usize, char)>,
    idx: usize,
    pos: Position,
    regex_allowed: bool,
    states: Vec<LexState>,
}

impl<'a> Lexer<'a> {
    #[must_use]
    pub fn new(src: &'a str) -> Self {
        Self {
            src,
            chars: src.char_indices().collect(),
            idx: 0,
            pos: Position::START,
            // A regex may start at the very beginning of a script.
            regex_allowed: true,
            states: Vec::new(),
        }
    }

    #[inline]
    fn peek(&self) -> Option<char> {
        self.chars.get(self.idx).map(|&(_, c)| c)
    }

    #[inline]
    fn peek_at(&self, ahead: usize) -> Option<char> {
        self.chars.get(self.idx + ahead).map(|&(_, c)| c)
    }

    #[inline]
    fn offset(&self) -> usize {
        self.chars
            .get(self.idx)
            .map_or(self.src.len(), |&(off, _)| off)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.idx += 1;
        if c == '\n' {
            self.pos.new_line();
        } else {
            self.pos.advance();
        }
        Some(c)
    }

    fn eat(&mut self, c: char) -> bool {
        if self.peek() == Some(c) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn token(&self, kind: TokenKind, start: usize, pos: Position) -> Token {
        Token::new(kind, &self.src[start..self.offset()], start, pos)
    }

    /// Produce the next token.
    pub fn next_token(&mut self) -> Token {
        if self.states.last() == Some(&LexState::Template) {
            return self.scan_template_part();
        }

        let start = self.offset();
        let pos = self.pos;
        let c = match self.peek() {
            Some(c) => c,
            None => return Token::new(TokenKind::Eof, "", start, pos),
        };

        let token = match c {
            ' ' | '\t' | '\n' | '\r' => self.scan_whitespace(start, pos),
            '/' => match self.peek_at(1) {
                Some('/') => self.scan_line_comment(start, pos),
                Some('*') => self.scan_block_comment(start, pos),
                _ if self.regex_allowed => self.scan_regex(start, pos),
                _ => self.scan_operator(start, pos),
            },
            '"' | '\'' => self.scan_string(c, start, pos),
            '`' => {
                self.bump();
                self.states.push(LexState::Template);
                self.token(TokenKind::Backtick, start, pos)
            }
            '}' => {
                self.bump();
                match self.states.last_mut() {
                    Some(LexState::Placeholder { depth: 0 }) => {
                        self.states.pop();
                        debug_assert_eq!(self.states.last(), Some(&LexState::Template));
                    }
                    Some(LexState::Placeholder { depth }) => *depth -= 1,
                    _ => (),
                }
                self.token(TokenKind::RCurly, start, pos)
            }
            '{' => {
                self.bump();
                if let Some(LexState::Placeholder { depth }) = self.states.last_mut() {
                    *depth += 1;
                }
                self.token(TokenKind::LCurly, start, pos)
            }
            '0'..='9' => self.scan_number(start, pos),
            '.' if matches!(self.peek_at(1), Some('0'..='9')) => self.scan_number(start, pos),
            _ if is_ident_start(c) => self.scan_ident(start, pos),
            _ => self.scan_operator(start, pos),
        };

        match token.kind.regex_hint() {
            RegexHint::Allowed => self.regex_allowed = true,
            RegexHint::Disallowed => self.regex_allowed = false,
            RegexHint::Unset => (),
        }
        token
    }

    fn scan_whitespace(&mut self, start: usize, pos: Position) -> Token {
        let mut has_lf = false;
        while let Some(c) = self.peek() {
            match c {
                '\n' | '\r' => has_lf = true,
                ' ' | '\t' => (),
                _ => break,
            }
            self.bump();
        }
        let kind = if has_lf { TokenKind::WsLf } else { TokenKind::Ws };
        self.token(kind, start, pos)
    }

    fn scan_line_comment(&mut self, start: usize, pos: Position) -> Token {
        self.bump();
        self.bump();
        while let Some(c) = self.peek() {
            if c == '\n' || c == '\r' {
                break;
            }
            self.bump();
        }
        self.token(TokenKind::LineComment, start, pos)
    }

    fn scan_block_comment(&mut self, start: usize, pos: Position) -> Token {
        self.bump();
        self.bump();
        while let Some(c) = self.bump() {
            if c == '*' && self.peek() == Some('/') {
                self.bump();
                break;
            }
        }
        self.token(TokenKind::BlockComment, start, pos)
    }

    fn scan_string(&mut self, quote: char, start: usize, pos: Position) -> Token {
        self.bump();
        while let Some(c) = self.peek() {
            match c {
                '\\' => {
                    self.bump();
                    self.bump();
                }
                c if c == quote => {
                    self.bump();
                    break;
                }
                // Unterminated at end of line still ends at EOF; raw
                // newlines simply become part of the (malformed) literal.
                _ => {
                    self.bump();
                }
            }
        }
        let kind = if quote == '"' {
            TokenKind::DString
        } else {
            TokenKind::SString
        };
        let mut token = self.token(kind, start, pos);
        let cooked = {
            let raw: &str = &token.text;
            let body = raw.strip_prefix(quote).unwrap_or(raw);
            // An unterminated literal has no closing quote to strip.
            let body = body.strip_suffix(quote).unwrap_or(body);
            unescape(body)
        };
        token.cooked = Some(cooked.into());
        token
    }

    /// One step of template scanning: a raw text chunk, a `${`, or the
    /// closing backtick.
    fn scan_template_part(&mut self) -> Token {
        let start = self.offset();
        let pos = self.pos;

        match self.peek() {
            None => return Token::new(TokenKind::Eof, "", start, pos),
            Some('`') => {
                self.bump();
                self.states.pop();
                return self.token(TokenKind::Backtick, start, pos);
            }
            Some('$') if self.peek_at(1) == Some('{') => {
                self.bump();
                self.bump();
                self.states.push(LexState::Placeholder { depth: 0 });
                return self.token(TokenKind::DollarLCurly, start, pos);
            }
            Some(_) => (),
        }

        while let Some(c) = self.peek() {
            match c {
                '`' => break,
                '$' if self.peek_at(1) == Some('{') => break,
                '\\' => {
                    self.bump();
                    self.bump();
                }
                _ => {
                    self.bump();
                }
            }
        }
        let mut token = self.token(TokenKind::TString, start, pos);
        let cooked = unescape(&token.text);
        token.cooked = Some(cooked.into());
        token
    }

    fn scan_number(&mut self, start: usize, pos: Position) -> Token {
        if self.peek() == Some('0') && matches!(self.peek_at(1), Some('x') | Some('X')) {
            self.bump();
            self.bump();
            while matches!(self.peek(), Some(c) if c.is_ascii_hexdigit()) {
                self.bump();
            }
            return self.token(TokenKind::Number, start, pos);
        }

        while matches!(self.peek(), Some('0'..='9')) {
            self.bump();
        }
        if self.peek() == Some('.') && matches!(self.peek_at(1), Some('0'..='9')) {
            self.bump();
            while matches!(self.peek(), Some('0'..='9')) {
                self.bump();
            }
        } else if self.peek() == Some('.') && self.offset() > start {
            // Trailing fraction dot as in `1.` -- but not `1..toString()`.
            if self.peek_at(1) != Some('.') {
                self.bump();
            }
        }
        if matches!(self.peek(), Some('e') | Some('E')) {
            let mut ahead = 1;
            if matches!(self.peek_at(1), Some('+') | Some('-')) {
                ahead = 2;
            }
            if matches!(self.peek_at(ahead), Some('0'..='9')) {
                self.bump();
                if matches!(self.peek(), Some('+') | Some('-')) {
                    self.bump();
                }
                while matches!(self.peek(), Some('0'..='9')) {
                    self.bump();
                }
            }
        }
        self.token(TokenKind::Number, start, pos)
    }

    fn scan_ident(&mut self, start: usize, pos: Position) -> Token {
        self.bump();
        while matches!(self.peek(), Some(c) if is_ident_part(c)) {
            self.bump();
        }
        let text = &self.src[start..self.offset()];
        let kind = TokenKind::keyword(text).unwrap_or(TokenKind::Ident);
        Token::new(kind, text, start, pos)
    }

    fn scan_regex(&mut self, start: usize, pos: Position) -> Token {
        self.bump(); // opening `/`
        let mut in_class = false;
        while let Some(c) = self.peek() {
            match c {
                '\\' => {
                    self.bump();
                    self.bump();
                }
                '[' => {
                    in_class = true;
                    self.bump();
                }
                ']' => {
                    in_class = false;
                    self.bump();
                }
                '/' if !in_class => {
                    self.bump();
                    break;
                }
                '\n' | '\r' => break, // unterminated
                _ => {
                    self.bump();
                }
            }
        }
        while matches!(self.peek(), Some(c) if c.is_ascii_alphabetic()) {
            self.bump();
        }
        self.token(TokenKind::Regex, start, pos)
    }

    fn scan_operator(&mut self, start: usize, pos: Position) -> Token {
        use TokenKind::*;

        let c = self.bump().expect("caller checked a char is available");
        let kind = match c {
            '(' => LParen,
            ')' => RParen,
            '[' => LBracket,
            ']' => RBracket,
            ';' => Semicolon,
            ',' => Comma,
            ':' => Colon,
            '~' => BitNot,
            '.' => {
                if self.peek() == Some('.') && self.peek_at(1) == Some('.') {
                    self.bump();
                    self.bump();
                    Ellipsis
                } else {
                    Dot
                }
            }
            '?' => {
                if self.eat('?') {
                    if self.eat('=') {
                        CoalesceAssign
                    } else {
                        Coalesce
                    }
                } else if self.peek() == Some('.') {
                    self.bump();
                    Optional
                } else {
                    Question
                }
            }
            '=' => {
                if self.eat('=') {
                    if self.eat('=') {
                        StrictEq
                    } else {
                        Eq
                    }
                } else if self.eat('>') {
                    Arrow
                } else {
                    Assign
                }
            }
            '!' => {
                if self.eat('=') {
                    if self.eat('=') {
                        StrictNotEq
                    } else {
                        NotEq
                    }
                } else {
                    Not
                }
            }
            '<' => {
                if self.eat('<') {
                    if self.eat('=') {
                        ShlAssign
                    } else {
                        Shl
                    }
                } else if self.eat('=') {
                    Le
                } else {
                    Lt
                }
            }
            '>' => {
                if self.eat('>') {
                    if self.eat('>') {
                        if self.eat('=') {
                            UShrAssign
                        } else {
                            UShr
                        }
                    } else if self.eat('=') {
                        ShrAssign
                    } else {
                        Shr
                    }
                } else if self.eat('=') {
                    Ge
                } else {
                    Gt
                }
            }
            '+' => {
                if self.eat('+') {
                    Inc
                } else if self.eat('=') {
                    PlusAssign
                } else {
                    Plus
                }
            }
            '-' => {
                if self.eat('-') {
                    Dec
                } else if self.eat('=') {
                    MinusAssign
                } else {
                    Minus
                }
            }
            '*' => {
                if self.eat('*') {
                    if self.eat('=') {
                        PowAssign
                    } else {
                        Pow
                    }
                } else if self.eat('=') {
                    StarAssign
                } else {
                    Star
                }
            }
            '/' => {
                if self.eat('=') {
                    SlashAssign
                } else {
                    Slash
                }
            }
            '%' => {
                if self.eat('=') {
                    PercentAssign
                } else {
                    Percent
                }
            }
            '&' => {
                if self.eat('&') {
                    if self.eat('=') {
                        AndAssign
                    } else {
                        And
                    }
                } else if self.eat('=') {
                    BitAndAssign
                } else {
                    BitAnd
                }
            }
            '|' => {
                if self.eat('|') {
                    if self.eat('=') {
                        OrAssign
                    } else {
                        Or
                    }
                } else if self.eat('=') {
                    BitOrAssign
                } else {
                    BitOr
                }
            }
            '^' => {
                if self.eat('=') {
                    BitXorAssign
                } else {
                    BitXor
                }
            }
            // Anything unrecognized becomes a best-effort identifier token;
            // the parser reports the position.
            _ => Ident,
        };
        self.token(kind, start, pos)
    }
}

#[inline]
#[must_use]
pub(crate) fn is_ident_start(c: char) -> bool {
    c == '_' || c == '$' || c.is_alphabetic()
}

#[inline]
#[must_use]
pub(crate) fn is_ident_part(c: char) -> bool {
    c == '_' || c == '$' || c.is_alphanumeric()
}

/// Decode the escape sequences the engine commits to:
/// `\n \r \t \b \f \0 \\ \' \" \uXXXX` plus `` \` `` inside templates.
/// Unknown escapes keep the backslash.
#[must_use]
pub(crate) fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            None => out.push('\\'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some('b') => out.push('\u{0008}'),
            Some('f') => out.push('\u{000C}'),
            Some('0') => out.push('\0'),
            Some('\\') => out.push('\\'),
            Some('\'') => out.push('\''),
            Some('"') => out.push('"'),
            Some('`') => out.push('`'),
            Some('u') => {
                let hex: String = chars.clone().take(4).collect();
                if hex.len() == 4 {
                    if let Ok(code) = u32::from_str_radix(&hex, 16) {
                        if let Some(decoded) = char::from_u32(code) {
                            out.push(decoded);
                            for _ in 0..4 {
                                chars.next();
                            }
                            continue;
                        }
                    }
                }
                out.push('\\');
                out.push('u');
            }
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
        }
    }
    out
}

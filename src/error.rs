//! Error types surfaced to the embedder.

use std::error::Error;
use std::fmt;

use crate::token::Position;

/// A syntax error produced by the parser.
///
/// In error-recovery mode these are accumulated on the returned
/// [`Ast`][crate::Ast]; otherwise the first one fails the parse.
#[derive(Debug, Clone)]
pub struct ParseError {
    /// Human-readable description of the problem.
    pub message: String,
    /// What the parser expected at this point, if known.
    pub expected: Option<String>,
    /// Where the offending token starts.
    pub position: Position,
}

impl ParseError {
    #[must_use]
    pub(crate) fn new(message: impl Into<String>, position: Position) -> Self {
        Self {
            message: message.into(),
            expected: None,
            position,
        }
    }

    #[must_use]
    pub(crate) fn expecting(
        expected: impl Into<String>,
        actual: impl fmt::Display,
        position: Position,
    ) -> Self {
        let expected = expected.into();
        Self {
            message: format!("expected {} but found '{}'", expected, actual),
            expected: Some(expected),
            position,
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Syntax error: {}", self.message)?;
        if !self.position.is_none() {
            write!(f, " ({})", self.position)?;
        }
        Ok(())
    }
}

impl Error for ParseError {}

/// An error escaping one evaluation: a failed parse, or an uncaught thrown
/// value or engine error, wrapped once with its source location.
#[derive(Debug, Clone)]
pub enum EcmaError {
    /// The source failed to parse.
    Parse(ParseError),
    /// An uncaught runtime error or thrown value.
    Runtime {
        /// The message, or the display form of the thrown value.
        message: String,
        /// Location of the failing statement or expression.
        position: Position,
        /// The text of the offending source line, when available.
        line_text: Option<String>,
    },
}

impl EcmaError {
    #[must_use]
    pub(crate) fn runtime(
        message: impl Into<String>,
        position: Position,
        line_text: Option<String>,
    ) -> Self {
        Self::Runtime {
            message: message.into(),
            position,
            line_text,
        }
    }

    /// The source position attached to this error.
    #[must_use]
    pub fn position(&self) -> Position {
        match self {
            Self::Parse(err) => err.position,
            Self::Runtime { position, .. } => *position,
        }
    }

    /// The bare message without location decoration.
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::Parse(err) => err.message.clone(),
            Self::Runtime { message, .. } => message.clone(),
        }
    }
}

impl fmt::Display for EcmaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse(err) => write!(f, "{}", err),
            Self::Runtime {
                message,
                position,
                line_text,
            } => {
                write!(f, "script error: {}", message)?;
                if !position.is_none() {
                    write!(f, "\n  at {}", position)?;
                }
                if let Some(line) = line_text {
                    write!(f, "\n  {}", line.trim_end())?;
                }
                Ok(())
            }
        }
    }
}

impl Error for EcmaError {}

impl From<ParseError> for EcmaError {
    #[inline(always)]
    fn from(err: ParseError) -> Self {
        Self::Parse(err)
    }
}

//! # escript - embedded ECMAScript scripting for Rust
//!
//! An embeddable interpreter for a practical subset of ECMAScript (ES2020
//! flavor): `var`/`let`/`const`, classical and arrow functions with
//! closures, destructuring, spread/rest, template literals, optional
//! chaining, nullish coalescing, `try`/`catch`/`finally`, `switch`,
//! `for`/`for-in`/`for-of`, regex literals and the familiar built-in
//! prototypes (Array, String, Number, Object, Date, RegExp, JSON,
//! Uint8Array, Math).
//!
//! The engine is a tree walker: source text is lexed and parsed into an
//! immutable syntax tree which is evaluated directly. There is no bytecode,
//! no event loop and no `async`; one evaluation runs synchronously on the
//! caller's thread.
//!
//! # Example
//!
//! ```
//! use escript::{Engine, HostValue};
//!
//! let engine = Engine::new();
//! let result = engine.eval("const f = n => n < 2 ? n : f(n-1) + f(n-2); f(10)").unwrap();
//! assert_eq!(result, HostValue::Int(55));
//! ```
//!
//! State persists across evaluations through the engine's root scope:
//!
//! ```
//! use escript::{Engine, HostValue};
//!
//! let engine = Engine::new();
//! engine.put("base", HostValue::Int(40));
//! assert_eq!(engine.eval("base + 2").unwrap(), HostValue::Int(42));
//! ```

mod ast;
mod bridge;
mod builtins;
mod convert;
mod engine;
mod error;
mod events;
mod function;
mod interp;
mod lexer;
mod object;
mod parse;
mod scope;
mod token;
mod value;

/// Shared reference-counted handle.
pub type Shared<T> = std::rc::Rc<T>;
/// Interior-mutable cell used behind [`Shared`].
pub type Locked<T> = std::cell::RefCell<T>;
/// Identifier string type (variable and property names).
pub type Identifier = smartstring::SmartString<smartstring::LazyCompact>;
/// Inline-capacity vector for small collections.
pub type StaticVec<T> = smallvec::SmallVec<[T; 4]>;

pub use ast::{Ast, InnerNode, Node, NodeKind};
pub use bridge::{ExternalAccess, ExternalBridge};
pub use convert::HostValue;
pub use engine::Engine;
pub use error::{EcmaError, ParseError};
pub use events::{
    ContextEvent, ContextListener, DebugPoint, DebugPointFactory, DebugPointKind, ExitResult,
    RunInterceptor, StepAction, VariableWriteKind,
};
pub use builtins::Prototypes;
pub use function::{CallInfo, JsFunction, NativeFn, NativeFunction, NativeResult, Throw, UserFn};
pub use interp::NativeContext;
pub use lexer::{tokenize, Lexer};
pub use object::{JsObject, JsRegex, ObjectKind, ObjectRef, PropMap};
pub use parse::{parse, parse_recover, parse_with_depth, Parser, DEFAULT_MAX_DEPTH};
pub use scope::{Binding, BindingRef, DeclKind, EnvRef, Environment, ExitState, ScopeKind};
pub use token::{Position, RegexHint, Token, TokenKind};
pub use value::{HostObject, Value};

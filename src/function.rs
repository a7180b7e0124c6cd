//! Function values: script-defined functions and native built-ins.

use ahash::AHashMap;

use crate::ast::Node;
use crate::interp::NativeContext;
use crate::scope::{BindingRef, EnvRef};
use crate::value::Value;
use crate::{Identifier, Shared};

/// A thrown value escaping a native built-in; the evaluator turns it back
/// into the exit-state channel.
pub struct Throw(pub Value);

/// Result type for native built-ins.
pub type NativeResult = Result<Value, Throw>;

/// Signature of a native built-in: context, `this` receiver, arguments.
pub type NativeFn = fn(&mut NativeContext<'_>, &Value, &[Value]) -> NativeResult;

/// Per-call metadata attached to a function's fresh environment, letting
/// built-ins distinguish `Number(x)` from `new Number(x)`.
#[derive(Clone)]
pub struct CallInfo {
    pub is_constructor: bool,
    pub callee: Value,
}

/// A script-defined function: parameter nodes, body, declaring environment
/// and the captured binding cells.
pub struct UserFn {
    pub name: Identifier,
    /// `FnDeclArg` nodes in declaration order.
    pub params: Vec<Node>,
    /// A block for classical functions; a block or a bare expression for
    /// arrows.
    pub body: Node,
    /// The environment the function literal was evaluated in.
    pub env: EnvRef,
    /// Snapshot of every `let`/`const` cell visible at creation time.
    pub captured: AHashMap<Identifier, BindingRef>,
    pub is_arrow: bool,
}

/// A native built-in function.
#[derive(Clone, Copy)]
pub struct NativeFunction {
    pub name: &'static str,
    pub func: NativeFn,
}

/// Either a script-defined function or a native built-in. The shared handle
/// keeps closures cheap to copy between bindings.
#[derive(Clone)]
pub enum JsFunction {
    User(Shared<UserFn>),
    Native(NativeFunction),
}

impl JsFunction {
    #[must_use]
    pub fn native(name: &'static str, func: NativeFn) -> Self {
        Self::Native(NativeFunction { name, func })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::User(user) => &user.name,
            Self::Native(native) => native.name,
        }
    }

    /// Number of declared parameters (0 for natives).
    #[must_use]
    pub fn arity(&self) -> usize {
        match self {
            Self::User(user) => user.params.len(),
            Self::Native(_) => 0,
        }
    }

    #[inline]
    #[must_use]
    pub fn is_arrow(&self) -> bool {
        matches!(self, Self::User(user) if user.is_arrow)
    }
}

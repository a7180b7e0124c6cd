//! Observation hooks: the context listener and the debugger interceptor.
//!
//! Both are optional collaborators; the evaluator checks a nullable field
//! once per statement or expression boundary and pays nothing when no hook
//! is installed.

use crate::ast::Node;
use crate::token::Position;
use crate::value::Value;

/// Boundary events delivered to a [`ContextListener`].
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum ContextEvent {
    /// A function (or the program itself) began executing.
    ContextEnter,
    ContextExit,
    StatementEnter,
    StatementExit,
    ExpressionEnter,
    ExpressionExit,
}

/// What kind of write triggered [`ContextListener::on_variable_write`].
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum VariableWriteKind {
    Declare,
    Assign,
}

/// Returned by [`ContextListener::on_error`] to suppress an error and
/// substitute a value for the failed statement.
pub struct ExitResult {
    pub ignore_error: bool,
    pub return_value: Value,
}

/// Passive observer of evaluation. All methods default to no-ops.
pub trait ContextListener {
    fn on_event(&self, _event: ContextEvent, _node: &Node) {}
    fn on_variable_write(&self, _kind: VariableWriteKind, _name: &str, _value: &Value) {}
    fn on_function_call(&self, _callee: &Value, _args: &[Value]) {}
    /// Called when a statement is about to fail with `error`. Returning an
    /// [`ExitResult`] with `ignore_error` suppresses propagation.
    fn on_error(&self, _node: &Node, _error: &Value) -> Option<ExitResult> {
        None
    }
}

/// Verdict of [`RunInterceptor::before_execute`].
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum StepAction {
    /// Run the statement normally.
    Continue,
    /// Skip the statement entirely.
    Skip,
    /// Block until [`RunInterceptor::wait_for_resume`] returns.
    Wait,
}

/// Where a [`DebugPoint`] sits.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum DebugPointKind {
    Statement,
    FunctionCall,
}

/// An opaque token identifying one executable point, built by the
/// installed [`DebugPointFactory`].
#[derive(Debug, Clone)]
pub struct DebugPoint {
    pub kind: DebugPointKind,
    pub position: Position,
    /// Source path or label the embedder associated with the script.
    pub source: Option<String>,
}

/// Builds [`DebugPoint`]s; an external debugger keys breakpoints off them.
pub trait DebugPointFactory {
    fn create(&self, kind: DebugPointKind, position: Position) -> DebugPoint;
}

/// Debugger stepping hook, consulted before and after each statement.
/// `Wait` blocks the evaluating thread until the interceptor resumes.
pub trait RunInterceptor {
    fn before_execute(&self, point: &DebugPoint) -> StepAction;
    /// Called repeatedly after `Wait` until it returns `Continue` or
    /// `Skip`.
    fn wait_for_resume(&self) -> StepAction {
        StepAction::Continue
    }
    fn after_execute(&self, _point: &DebugPoint, _result: Option<&Value>, _error: Option<&Value>) {}
}

//! The [`Engine`]: the embedder-facing surface.
//!
//! An engine owns the root scope (shared across evaluations), the frozen
//! built-in prototypes, and the optional hooks: console sink, context
//! listener, external bridge and debugger interceptor. One engine serves
//! one logical caller at a time; evaluation is fully synchronous.

use std::cell::Cell;

use crate::ast::Ast;
use crate::bridge::ExternalBridge;
use crate::builtins::{self, Prototypes};
use crate::convert::{host_to_value, value_to_host, HostValue};
use crate::error::EcmaError;
use crate::events::{ContextListener, DebugPointFactory, RunInterceptor};
use crate::parse::{parse_recover, parse_with_depth, DEFAULT_MAX_DEPTH};
use crate::scope::{lookup, EnvRef, Environment, ExitState, ScopeKind};
use crate::token::Position;
use crate::value::Value;
use crate::{Locked, Shared};

/// Default bound on script call nesting.
const DEFAULT_MAX_CALL_DEPTH: usize = 256;

pub struct Engine {
    global: EnvRef,
    protos: Prototypes,
    pub(crate) on_console: Option<Box<dyn Fn(&str)>>,
    pub(crate) listener: Option<Box<dyn ContextListener>>,
    pub(crate) bridge: Option<Box<dyn ExternalBridge>>,
    pub(crate) interceptor: Option<Box<dyn RunInterceptor>>,
    pub(crate) point_factory: Option<Box<dyn DebugPointFactory>>,
    max_parse_depth: usize,
    pub(crate) max_call_depth: usize,
    pub(crate) call_depth: Cell<usize>,
    /// Position of the most recently entered statement, for wrapping
    /// uncaught errors with a location.
    pub(crate) last_pos: Cell<Position>,
}

impl Engine {
    /// Create an engine with the standard globals installed.
    #[must_use]
    pub fn new() -> Self {
        let protos = Prototypes::new();
        let global = Shared::new(Locked::new(Environment::global()));
        builtins::install_globals(&global, &protos);
        Self {
            global,
            protos,
            on_console: None,
            listener: None,
            bridge: None,
            interceptor: None,
            point_factory: None,
            max_parse_depth: DEFAULT_MAX_DEPTH,
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
            call_depth: Cell::new(0),
            last_pos: Cell::new(Position::NONE),
        }
    }

    /// Create an engine pre-loaded with bindings from the embedder.
    #[must_use]
    pub fn with_bindings<I, K>(bindings: I) -> Self
    where
        I: IntoIterator<Item = (K, HostValue)>,
        K: AsRef<str>,
    {
        let engine = Self::new();
        for (name, value) in bindings {
            engine.put(name.as_ref(), value);
        }
        engine
    }

    // ------------------------------------------------------------------
    // Evaluation
    // ------------------------------------------------------------------

    /// Parse source into a reusable [`Ast`].
    pub fn compile(&self, source: &str) -> Result<Ast, EcmaError> {
        parse_with_depth(source, self.max_parse_depth).map_err(EcmaError::from)
    }

    /// Parse in error-recovery mode; syntax errors are attached to the
    /// returned tree instead of failing.
    #[must_use]
    pub fn compile_lenient(&self, source: &str) -> Ast {
        parse_recover(source)
    }

    /// Evaluate source text and return the host form of the completion
    /// value (the value of the last statement).
    pub fn eval(&self, source: &str) -> Result<HostValue, EcmaError> {
        let ast = self.compile(source)?;
        self.eval_ast(&ast)
    }

    /// Evaluate a pre-parsed program. The tree is immutable and may back
    /// any number of evaluations.
    pub fn eval_ast(&self, ast: &Ast) -> Result<HostValue, EcmaError> {
        let value = self.run_program(ast, &self.global)?;
        Ok(value_to_host(&value))
    }

    /// Evaluate with a set of local variables layered over the root scope.
    /// The locals are dropped when the evaluation finishes.
    pub fn eval_with<I, K>(&self, source: &str, locals: I) -> Result<HostValue, EcmaError>
    where
        I: IntoIterator<Item = (K, HostValue)>,
        K: AsRef<str>,
    {
        let ast = self.compile(source)?;
        self.global.borrow_mut().enter_scope(ScopeKind::Block);
        for (name, value) in locals {
            let value = host_to_value(&value, &self.protos);
            let _ = self.global.borrow_mut().declare_lexical(
                name.as_ref(),
                crate::scope::DeclKind::Let,
                Some(value),
            );
        }
        let result = self.run_program(&ast, &self.global).map(|v| value_to_host(&v));
        self.global.borrow_mut().exit_scope();
        result
    }

    // ------------------------------------------------------------------
    // Root bindings
    // ------------------------------------------------------------------

    /// Read a top-level binding, auto-unwrapped to its host form.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<HostValue> {
        let binding = lookup(&self.global, name)?;
        let value = binding.borrow().value.clone();
        Some(value_to_host(&value))
    }

    /// Write a top-level binding.
    pub fn put(&self, name: &str, value: HostValue) {
        let value = host_to_value(&value, &self.protos);
        self.put_value(name, value);
    }

    pub(crate) fn put_value(&self, name: &str, value: Value) {
        if let Some(binding) = lookup(&self.global, name) {
            let mut cell = binding.borrow_mut();
            cell.value = value;
            cell.initialized = true;
            return;
        }
        let _ = self.global.borrow_mut().declare_var(name, value);
    }

    /// Remove a top-level binding. Returns whether it existed.
    pub fn remove(&self, name: &str) -> bool {
        self.global.borrow_mut().remove(name)
    }

    /// Install a durable global, reachable as a plain identifier from any
    /// later evaluation.
    pub fn put_root_binding(&self, name: &str, value: HostValue) {
        self.put(name, value);
    }

    // ------------------------------------------------------------------
    // Hooks and settings
    // ------------------------------------------------------------------

    /// Install the sink that receives `console.log` output.
    pub fn set_on_console_log(&mut self, sink: impl Fn(&str) + 'static) {
        self.on_console = Some(Box::new(sink));
    }

    /// Install a passive evaluation listener.
    pub fn set_listener(&mut self, listener: Box<dyn ContextListener>) {
        self.listener = Some(listener);
    }

    /// Install the host interop bridge.
    pub fn set_external_bridge(&mut self, bridge: Box<dyn ExternalBridge>) {
        self.bridge = Some(bridge);
    }

    /// Install debugger support: the stepping interceptor and the factory
    /// that builds its debug points.
    pub fn set_debug_support(
        &mut self,
        interceptor: Box<dyn RunInterceptor>,
        points: Box<dyn DebugPointFactory>,
    ) {
        self.interceptor = Some(interceptor);
        self.point_factory = Some(points);
    }

    /// Bound the parser's recursion depth.
    pub fn set_max_parse_depth(&mut self, depth: usize) {
        self.max_parse_depth = depth;
    }

    /// Bound script call nesting.
    pub fn set_max_call_depth(&mut self, depth: usize) {
        self.max_call_depth = depth;
    }

    // ------------------------------------------------------------------
    // Internals shared with the evaluator and builtins
    // ------------------------------------------------------------------

    #[inline]
    pub(crate) fn protos(&self) -> &Prototypes {
        &self.protos
    }

    pub(crate) fn console_print(&self, line: &str) {
        if let Some(sink) = &self.on_console {
            sink(line);
        }
    }

    /// Wrap an uncaught thrown value into the embedder-facing error, once.
    pub(crate) fn uncaught(&self, ast: &Ast, error: &Value) -> EcmaError {
        let position = self.last_pos.get();
        let line_text = position
            .line()
            .and_then(|line| ast.source_line(line))
            .map(str::to_string);
        EcmaError::runtime(error.to_display(), position, line_text)
    }

    /// Reset per-evaluation state on the root environment.
    pub(crate) fn reset_run_state(&self) {
        self.global.borrow_mut().exit = ExitState::Running;
        self.call_depth.set(0);
        self.last_pos.set(Position::NONE);
    }
}

impl Default for Engine {
    #[inline(always)]
    fn default() -> Self {
        Self::new()
    }
}

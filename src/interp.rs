//! The tree-walking evaluator.
//!
//! `eval_node` is a single dispatch over [`NodeKind`]. Non-local control
//! flow (`return`, `break`, `continue`, `throw` and engine errors) never
//! uses host panics or `Err` plumbing inside an evaluation: it travels on
//! the environment's [`ExitState`], checked at every statement and
//! sub-expression boundary. Loops absorb `Break`/`Continue`, calls absorb
//! `Return`, `try` absorbs `Throw`; whatever reaches the program root is
//! wrapped once with its source location and handed to the embedder.

use crate::ast::{Ast, Node, NodeKind};
use crate::builtins::Prototypes;
use crate::error::EcmaError;
use crate::events::{ContextEvent, DebugPoint, DebugPointKind, StepAction, VariableWriteKind};
use crate::function::{CallInfo, JsFunction, NativeResult, Throw, UserFn};
use crate::object::{
    self, get_member, new_ref, put_member, remove_member, JsObject, ObjectKind, PutResult,
};
use crate::scope::{
    capture_visible, global_of, lookup, this_of, DeclKind, EnvRef, Environment, ExitState,
    ScopeKind,
};
use crate::token::TokenKind;
use crate::value::{compare_numbers, HostObject, Value};
use crate::{Engine, Identifier, Locked, Shared};

/// Context handed to native built-ins: access to the engine, the calling
/// environment, and the per-call constructor flag.
pub struct NativeContext<'e> {
    pub(crate) engine: &'e Engine,
    pub(crate) env: EnvRef,
    pub(crate) call_info: Option<CallInfo>,
}

impl NativeContext<'_> {
    #[inline]
    #[must_use]
    pub fn protos(&self) -> &Prototypes {
        self.engine.protos()
    }

    #[inline]
    #[must_use]
    pub fn engine(&self) -> &Engine {
        self.engine
    }

    /// Was this built-in invoked through `new`?
    #[must_use]
    pub fn is_constructor_call(&self) -> bool {
        self.call_info
            .as_ref()
            .map_or(false, |info| info.is_constructor)
    }

    /// Call back into script (or another native) from a built-in, e.g. for
    /// `map`/`filter`/`sort` callbacks.
    pub fn call_function(&mut self, callee: &Value, this: Value, args: Vec<Value>) -> NativeResult {
        let result = self
            .engine
            .call_value(callee, this, args, false, &self.env);
        let thrown = {
            let mut guard = self.env.borrow_mut();
            match std::mem::take(&mut guard.exit) {
                ExitState::Throw(error) => Some(error),
                other => {
                    guard.exit = other;
                    None
                }
            }
        };
        match thrown {
            Some(error) => Err(Throw(error)),
            None => Ok(result),
        }
    }

    /// Build a fresh array value.
    #[must_use]
    pub fn new_array(&self, elements: Vec<Value>) -> Value {
        Value::Object(new_ref(JsObject::array(
            elements,
            Some(self.protos().array.clone()),
        )))
    }

    /// Build a fresh plain object value.
    #[must_use]
    pub fn new_object(&self) -> Value {
        Value::Object(new_ref(JsObject::plain(Some(self.protos().object.clone()))))
    }

    #[must_use]
    pub fn type_error(&self, message: impl Into<String>) -> Throw {
        Throw(self.engine.make_error("TypeError", message))
    }

    #[must_use]
    pub fn range_error(&self, message: impl Into<String>) -> Throw {
        Throw(self.engine.make_error("RangeError", message))
    }

    #[must_use]
    pub fn syntax_error(&self, message: impl Into<String>) -> Throw {
        Throw(self.engine.make_error("SyntaxError", message))
    }

    #[must_use]
    pub fn uri_error(&self, message: impl Into<String>) -> Throw {
        Throw(self.engine.make_error("URIError", message))
    }
}

/// A resolved assignment target: a variable, or a member of an
/// already-evaluated base object.
enum Place {
    Name(Identifier),
    Member { subject: Value, key: Identifier },
}

#[inline]
fn is_running(env: &EnvRef) -> bool {
    env.borrow().exit.is_running()
}

fn set_exit(env: &EnvRef, state: ExitState) {
    env.borrow_mut().exit = state;
}

fn take_exit(env: &EnvRef) -> ExitState {
    std::mem::take(&mut env.borrow_mut().exit)
}

impl Engine {
    // ==================================================================
    // Program entry
    // ==================================================================

    pub(crate) fn run_program(&self, ast: &Ast, env: &EnvRef) -> Result<Value, EcmaError> {
        self.reset_run_state();
        let root = ast.root();
        if let Some(listener) = &self.listener {
            listener.on_event(ContextEvent::ContextEnter, root);
        }

        self.hoist_vars(root, env);
        self.hoist_functions(root.children(), env);

        let mut last = Value::Undefined;
        for child in root.child_nodes() {
            last = self.eval_node(child, env);
            if !is_running(env) {
                break;
            }
        }

        if let Some(listener) = &self.listener {
            listener.on_event(ContextEvent::ContextExit, root);
        }

        match take_exit(env) {
            ExitState::Throw(error) => Err(self.uncaught(ast, &error)),
            ExitState::Return(value) => Ok(value),
            _ => Ok(last),
        }
    }

    /// Hoist `var` declarations (initialized to `undefined`) up to the
    /// nearest function/global scope, without descending into nested
    /// function bodies.
    fn hoist_vars(&self, node: &Node, env: &EnvRef) {
        match node.kind() {
            Some(NodeKind::FnExpr) | Some(NodeKind::FnArrowExpr) => return,
            Some(NodeKind::VarStmt) => {
                if node.children().first().map_or(false, |kw| kw.is_token(TokenKind::Var)) {
                    for target in node.children() {
                        self.hoist_var_target(target, env);
                    }
                }
            }
            _ => (),
        }
        for child in node.children() {
            self.hoist_vars(child, env);
        }
    }

    fn hoist_var_target(&self, target: &Node, env: &EnvRef) {
        match target {
            Node::Token(token) if token.kind == TokenKind::Ident => {
                let mut guard = env.borrow_mut();
                if guard.local(&token.text).is_none() {
                    let _ = guard.declare_var(&token.text, Value::Undefined);
                }
            }
            _ => (),
        }
    }

    /// Declare the named function declarations of a statement list before
    /// executing it, so calls may precede the declaration in source order.
    fn hoist_functions(&self, stmts: &[Node], env: &EnvRef) {
        for stmt in stmts {
            if stmt.kind() != Some(NodeKind::Statement) {
                continue;
            }
            let Some(inner) = stmt.child_nodes().next() else {
                continue;
            };
            if inner.kind() == Some(NodeKind::FnExpr) {
                if let Some(name) = function_decl_name(inner) {
                    let value = self.make_function(inner, env, false);
                    let _ = env.borrow_mut().declare_var(&name, value);
                }
            }
        }
    }

    // ==================================================================
    // Dispatch
    // ==================================================================

    pub(crate) fn eval_node(&self, node: &Node, env: &EnvRef) -> Value {
        let inner = match node {
            Node::Token(_) => return Value::Undefined,
            Node::Inner(inner) => inner,
        };
        if !is_running(env) {
            return Value::Undefined;
        }

        let kind = inner.kind;
        let observe_expr = self.listener.is_some() && !kind.is_statement();
        if observe_expr {
            if let Some(listener) = &self.listener {
                listener.on_event(ContextEvent::ExpressionEnter, node);
            }
        }

        let value = match kind {
            NodeKind::Program => {
                // Nested programs do not occur; treat as a statement list.
                let mut last = Value::Undefined;
                for child in node.child_nodes() {
                    last = self.eval_node(child, env);
                    if !is_running(env) {
                        break;
                    }
                }
                last
            }
            NodeKind::Statement => self.eval_statement(node, env),
            NodeKind::Block => self.eval_block(node, env),
            NodeKind::IfStmt => self.eval_if(node, env),
            NodeKind::WhileStmt => self.eval_while(node, env),
            NodeKind::DoWhileStmt => self.eval_do_while(node, env),
            NodeKind::ForStmt => self.eval_for(node, env),
            NodeKind::SwitchStmt => self.eval_switch(node, env),
            NodeKind::TryStmt => self.eval_try(node, env),
            NodeKind::ThrowStmt => {
                let value = match node.child_nodes().next() {
                    Some(expr) => self.eval_node(expr, env),
                    None => Value::Undefined,
                };
                if is_running(env) {
                    set_exit(env, ExitState::Throw(value));
                }
                Value::Undefined
            }
            NodeKind::ReturnStmt => {
                let value = match node.child_nodes().next() {
                    Some(expr) => self.eval_node(expr, env),
                    None => Value::Undefined,
                };
                if is_running(env) {
                    set_exit(env, ExitState::Return(value));
                }
                Value::Undefined
            }
            NodeKind::BreakStmt => {
                set_exit(env, ExitState::Break);
                Value::Undefined
            }
            NodeKind::ContinueStmt => {
                set_exit(env, ExitState::Continue);
                Value::Undefined
            }
            NodeKind::DeleteStmt => match node.child_nodes().next() {
                Some(target) => self.eval_delete(target, env),
                None => Value::Bool(true),
            },
            NodeKind::VarStmt => self.eval_var_stmt(node, env),
            NodeKind::CaseBlock | NodeKind::DefaultBlock => Value::Undefined,

            NodeKind::Expr => {
                let mut last = Value::Undefined;
                for child in node.child_nodes() {
                    last = self.eval_node(child, env);
                    if !is_running(env) {
                        break;
                    }
                }
                last
            }
            NodeKind::AssignExpr => self.eval_assign(node, env),
            NodeKind::TernaryExpr => self.eval_ternary(node, env),
            NodeKind::LogicExpr => self.eval_logic(node, env),
            NodeKind::MathExpr => self.eval_math(node, env),
            NodeKind::UnaryExpr => self.eval_unary(node, env),
            NodeKind::TypeofExpr => self.eval_typeof(node, env),
            NodeKind::InstanceofExpr => self.eval_instanceof(node, env),
            NodeKind::NewExpr => self.eval_new(node, env),
            NodeKind::FnExpr => self.make_function(node, env, false),
            NodeKind::FnArrowExpr => self.make_function(node, env, true),
            NodeKind::FnCallExpr => self.eval_call(node, env),
            NodeKind::FnDeclArg => Value::Undefined,
            NodeKind::RefExpr => self.eval_ref(node, env),
            NodeKind::RefDotExpr | NodeKind::RefBracketExpr => {
                self.eval_member(node, env).unwrap_or(Value::Undefined)
            }
            NodeKind::ParenExpr => match node.child_nodes().next() {
                Some(expr) => self.eval_node(expr, env),
                None => Value::Undefined,
            },
            NodeKind::LitExpr => self.eval_literal(node, env),
            NodeKind::LitArray => self.eval_array_literal(node, env),
            NodeKind::LitObject => self.eval_object_literal(node, env),
            NodeKind::LitTemplate => self.eval_template(node, env),
            NodeKind::LitRegex => self.eval_regex_literal(node, env),
        };

        if observe_expr {
            if let Some(listener) = &self.listener {
                listener.on_event(ContextEvent::ExpressionExit, node);
            }
        }
        value
    }

    // ==================================================================
    // Statements
    // ==================================================================

    fn eval_statement(&self, node: &Node, env: &EnvRef) -> Value {
        self.last_pos.set(node.position());
        let Some(inner) = node.child_nodes().next() else {
            return Value::Undefined; // empty statement
        };

        if let Some(listener) = &self.listener {
            listener.on_event(ContextEvent::StatementEnter, node);
        }

        // Debugger stepping.
        let point = if self.interceptor.is_some() {
            let point = match &self.point_factory {
                Some(factory) => factory.create(DebugPointKind::Statement, node.position()),
                None => DebugPoint {
                    kind: DebugPointKind::Statement,
                    position: node.position(),
                    source: None,
                },
            };
            let interceptor = self.interceptor.as_ref().expect("checked above");
            let mut action = interceptor.before_execute(&point);
            while action == StepAction::Wait {
                action = interceptor.wait_for_resume();
            }
            if action == StepAction::Skip {
                if let Some(listener) = &self.listener {
                    listener.on_event(ContextEvent::StatementExit, node);
                }
                return Value::Undefined;
            }
            Some(point)
        } else {
            None
        };

        // A named function expression in statement position is a
        // declaration (already hoisted; re-binding is harmless).
        let mut value = if inner.kind() == Some(NodeKind::FnExpr) {
            if let Some(name) = function_decl_name(inner) {
                let function = self.make_function(inner, env, false);
                let _ = env.borrow_mut().declare_var(&name, function);
                Value::Undefined
            } else {
                self.eval_node(inner, env)
            }
        } else {
            self.eval_node(inner, env)
        };

        // Give the listener a chance to suppress a failing statement.
        if let Some(listener) = &self.listener {
            let thrown = match &env.borrow().exit {
                ExitState::Throw(error) => Some(error.clone()),
                _ => None,
            };
            if let Some(error) = thrown {
                if let Some(exit) = listener.on_error(node, &error) {
                    if exit.ignore_error {
                        set_exit(env, ExitState::Running);
                        value = exit.return_value;
                    }
                }
            }
        }

        if let Some(point) = &point {
            let error = match &env.borrow().exit {
                ExitState::Throw(error) => Some(error.clone()),
                _ => None,
            };
            if let Some(interceptor) = &self.interceptor {
                interceptor.after_execute(point, Some(&value), error.as_ref());
            }
        }
        if let Some(listener) = &self.listener {
            listener.on_event(ContextEvent::StatementExit, node);
        }
        value
    }

    fn eval_block(&self, node: &Node, env: &EnvRef) -> Value {
        env.borrow_mut().enter_scope(ScopeKind::Block);
        self.hoist_functions(node.children(), env);
        let mut last = Value::Undefined;
        for child in node.child_nodes() {
            last = self.eval_node(child, env);
            if !is_running(env) {
                break;
            }
        }
        env.borrow_mut().exit_scope();
        last
    }

    fn eval_if(&self, node: &Node, env: &EnvRef) -> Value {
        let mut parts = node.child_nodes();
        let Some(cond) = parts.next() else {
            return Value::Undefined;
        };
        let condition = self.eval_node(cond, env);
        if !is_running(env) {
            return Value::Undefined;
        }
        let then_branch = parts.next();
        let else_branch = parts.next();
        if condition.truthy() {
            then_branch.map_or(Value::Undefined, |branch| self.eval_node(branch, env))
        } else {
            else_branch.map_or(Value::Undefined, |branch| self.eval_node(branch, env))
        }
    }

    /// Absorb a loop-body exit. Returns `false` when the loop must stop.
    fn absorb_loop_exit(&self, env: &EnvRef) -> bool {
        let state = take_exit(env);
        match state {
            ExitState::Running | ExitState::Continue => {
                set_exit(env, ExitState::Running);
                true
            }
            ExitState::Break => {
                set_exit(env, ExitState::Running);
                false
            }
            other => {
                set_exit(env, other);
                false
            }
        }
    }

    fn eval_while(&self, node: &Node, env: &EnvRef) -> Value {
        let mut parts = node.child_nodes();
        let (Some(cond), Some(body)) = (parts.next(), parts.next()) else {
            return Value::Undefined;
        };
        loop {
            let condition = self.eval_node(cond, env);
            if !is_running(env) || !condition.truthy() {
                break;
            }
            self.eval_node(body, env);
            if !self.absorb_loop_exit(env) {
                break;
            }
        }
        Value::Undefined
    }

    fn eval_do_while(&self, node: &Node, env: &EnvRef) -> Value {
        let mut parts = node.child_nodes();
        let (Some(body), Some(cond)) = (parts.next(), parts.next()) else {
            return Value::Undefined;
        };
        loop {
            self.eval_node(body, env);
            if !self.absorb_loop_exit(env) {
                break;
            }
            let condition = self.eval_node(cond, env);
            if !is_running(env) || !condition.truthy() {
                break;
            }
        }
        Value::Undefined
    }

    fn eval_for(&self, node: &Node, env: &EnvRef) -> Value {
        let has_semicolons = node
            .children()
            .iter()
            .any(|child| child.is_token(TokenKind::Semicolon));
        if has_semicolons {
            self.eval_for_classic(node, env)
        } else {
            self.eval_for_in_of(node, env)
        }
    }

    fn eval_for_classic(&self, node: &Node, env: &EnvRef) -> Value {
        // Children: for ( [init] ; [cond] ; [step] ) body
        let mut init = None;
        let mut cond = None;
        let mut step = None;
        let mut body = None;
        let mut section = 0usize;
        for child in node.children() {
            match child {
                Node::Token(token) if token.kind == TokenKind::Semicolon => section += 1,
                Node::Token(token) if token.kind == TokenKind::RParen => section = 3,
                Node::Token(_) => (),
                inner => match section {
                    0 => init = Some(inner),
                    1 => cond = Some(inner),
                    2 => step = Some(inner),
                    _ => body = Some(inner),
                },
            }
        }

        env.borrow_mut().enter_scope(ScopeKind::LoopInit);
        let mut per_iteration: Vec<Identifier> = Vec::new();
        if let Some(init) = init {
            self.eval_node(init, env);
            if init.kind() == Some(NodeKind::VarStmt) && var_stmt_is_lexical(init) {
                per_iteration = env.borrow().level_names();
            }
        }

        while is_running(env) {
            if let Some(cond) = cond {
                let condition = self.eval_node(cond, env);
                if !is_running(env) || !condition.truthy() {
                    break;
                }
            }

            if per_iteration.is_empty() {
                if let Some(body) = body {
                    self.eval_node(body, env);
                }
                if !self.absorb_loop_exit(env) {
                    break;
                }
            } else {
                // Fresh per-iteration bindings so closures created in the
                // body capture this iteration's values.
                let snapshot: Vec<(Identifier, Value, DeclKind)> = per_iteration
                    .iter()
                    .filter_map(|name| {
                        lookup(env, name).map(|binding| {
                            let cell = binding.borrow();
                            (name.clone(), cell.value.clone(), cell.kind)
                        })
                    })
                    .collect();
                env.borrow_mut().enter_scope(ScopeKind::LoopBody);
                for (name, value, kind) in &snapshot {
                    let _ = env
                        .borrow_mut()
                        .declare_lexical(name, *kind, Some(value.clone()));
                }
                if let Some(body) = body {
                    self.eval_node(body, env);
                }
                // Copy body mutations back so the step and condition see
                // them on the loop-init binding.
                let updates: Vec<(Identifier, Value)> = snapshot
                    .iter()
                    .filter_map(|(name, _, _)| {
                        env.borrow()
                            .local(name)
                            .map(|binding| (name.clone(), binding.borrow().value.clone()))
                    })
                    .collect();
                env.borrow_mut().exit_scope();
                for (name, value) in updates {
                    if let Some(binding) = lookup(env, &name) {
                        binding.borrow_mut().value = value;
                    }
                }
                if !self.absorb_loop_exit(env) {
                    break;
                }
            }

            if let Some(step) = step {
                self.eval_node(step, env);
                if !is_running(env) {
                    break;
                }
            }
        }
        env.borrow_mut().exit_scope();
        Value::Undefined
    }

    fn eval_for_in_of(&self, node: &Node, env: &EnvRef) -> Value {
        let is_of = node
            .children()
            .iter()
            .any(|child| matches!(child, Node::Token(t) if t.kind == TokenKind::Ident && &*t.text == "of"));

        let mut parts = node.child_nodes();
        let (Some(target), Some(iterable), Some(body)) = (parts.next(), parts.next(), parts.next())
        else {
            return Value::Undefined;
        };

        let subject = self.eval_node(iterable, env);
        if !is_running(env) {
            return Value::Undefined;
        }

        let items: Vec<Value> = if is_of {
            match self.for_of_values(&subject) {
                Some(items) => items,
                None => {
                    self.throw_error(env, "TypeError", format!("{} is not iterable", subject));
                    return Value::Undefined;
                }
            }
        } else {
            self.for_in_keys(&subject)
        };

        for item in items {
            env.borrow_mut().enter_scope(ScopeKind::LoopBody);
            self.bind_loop_target(target, item, env);
            if is_running(env) {
                self.eval_node(body, env);
            }
            env.borrow_mut().exit_scope();
            if !self.absorb_loop_exit(env) {
                break;
            }
        }
        Value::Undefined
    }

    fn bind_loop_target(&self, target: &Node, item: Value, env: &EnvRef) {
        if target.kind() == Some(NodeKind::VarStmt) {
            let kw = target
                .children()
                .first()
                .and_then(Node::token)
                .map(|token| token.kind);
            let decl = match kw {
                Some(TokenKind::Let) => DeclKind::Let,
                Some(TokenKind::Const) => DeclKind::Const,
                _ => DeclKind::Var,
            };
            if let Some(binding_target) = target.children().get(1) {
                self.bind_target(binding_target, item, env, Some(decl));
            }
        } else {
            self.bind_target(target, item, env, None);
        }
    }

    /// `for-in` visits own string keys.
    fn for_in_keys(&self, subject: &Value) -> Vec<Value> {
        match subject {
            Value::Object(obj) => obj
                .borrow()
                .own_keys()
                .into_iter()
                .map(|key| Value::str(&key))
                .collect(),
            Value::Str(s) => (0..s.chars().count())
                .map(|i| Value::str(i.to_string()))
                .collect(),
            _ => Vec::new(),
        }
    }

    /// `for-of` visits values: array elements, string characters, bytes,
    /// or (by convention) the property values of a plain object.
    fn for_of_values(&self, subject: &Value) -> Option<Vec<Value>> {
        match subject {
            Value::Str(s) => Some(s.chars().map(|c| Value::str(c.to_string())).collect()),
            Value::Object(obj) => {
                let guard = obj.borrow();
                match &guard.kind {
                    ObjectKind::Array(elements) => Some(elements.clone()),
                    ObjectKind::Uint8Array(bytes) => {
                        Some(bytes.iter().map(|b| Value::Number(f64::from(*b))).collect())
                    }
                    ObjectKind::Plain => Some(guard.props.values().cloned().collect()),
                    _ => None,
                }
            }
            _ => None,
        }
    }

    fn eval_switch(&self, node: &Node, env: &EnvRef) -> Value {
        let mut blocks = Vec::new();
        let mut discriminant = None;
        for child in node.child_nodes() {
            match child.kind() {
                Some(NodeKind::CaseBlock) | Some(NodeKind::DefaultBlock) => blocks.push(child),
                _ if discriminant.is_none() => discriminant = Some(child),
                _ => (),
            }
        }
        let Some(discriminant) = discriminant else {
            return Value::Undefined;
        };
        let subject = self.eval_node(discriminant, env);
        if !is_running(env) {
            return Value::Undefined;
        }

        env.borrow_mut().enter_scope(ScopeKind::Block);

        // Find the first strictly-equal case; fall back to `default`.
        let mut start = None;
        for (index, block) in blocks.iter().enumerate() {
            if block.kind() == Some(NodeKind::CaseBlock) {
                let Some(test) = block.child_nodes().next() else {
                    continue;
                };
                let candidate = self.eval_node(test, env);
                if !is_running(env) {
                    env.borrow_mut().exit_scope();
                    return Value::Undefined;
                }
                if subject.strict_eq(&candidate) {
                    start = Some(index);
                    break;
                }
            }
        }
        if start.is_none() {
            start = blocks
                .iter()
                .position(|block| block.kind() == Some(NodeKind::DefaultBlock));
        }

        if let Some(start) = start {
            'blocks: for block in &blocks[start..] {
                let is_case = block.kind() == Some(NodeKind::CaseBlock);
                for (index, stmt) in block.child_nodes().enumerate() {
                    // The first inner node of a case block is its test.
                    if is_case && index == 0 {
                        continue;
                    }
                    self.eval_node(stmt, env);
                    if !is_running(env) {
                        break 'blocks;
                    }
                }
            }
        }
        env.borrow_mut().exit_scope();

        // `break` ends the switch; other exits propagate.
        if matches!(env.borrow().exit, ExitState::Break) {
            set_exit(env, ExitState::Running);
        }
        Value::Undefined
    }

    fn eval_try(&self, node: &Node, env: &EnvRef) -> Value {
        let mut saw_catch = false;
        let mut saw_finally = false;
        let mut catch_var: Option<Identifier> = None;
        let mut try_block = None;
        let mut catch_block = None;
        let mut finally_block = None;
        for child in node.children() {
            match child {
                Node::Token(token) => match token.kind {
                    TokenKind::Catch => saw_catch = true,
                    TokenKind::Finally => saw_finally = true,
                    TokenKind::Ident if saw_catch && !saw_finally && catch_block.is_none() => {
                        catch_var = Some(Identifier::from(&*token.text));
                    }
                    _ => (),
                },
                inner if inner.kind() == Some(NodeKind::Block) => {
                    if saw_finally {
                        finally_block = Some(inner);
                    } else if saw_catch {
                        catch_block = Some(inner);
                    } else {
                        try_block = Some(inner);
                    }
                }
                _ => (),
            }
        }

        let mut value = match try_block {
            Some(try_block) => self.eval_node(try_block, env),
            None => Value::Undefined,
        };

        if let Some(catch_block) = catch_block {
            let thrown = match &env.borrow().exit {
                ExitState::Throw(error) => Some(error.clone()),
                _ => None,
            };
            if let Some(error) = thrown {
                set_exit(env, ExitState::Running);
                env.borrow_mut().enter_scope(ScopeKind::Catch);
                if let Some(name) = &catch_var {
                    let _ = env
                        .borrow_mut()
                        .declare_lexical(name, DeclKind::Let, Some(error));
                }
                value = self.eval_node(catch_block, env);
                env.borrow_mut().exit_scope();
            }
        }

        if let Some(finally_block) = finally_block {
            // `finally` runs under a clean state; an exit raised inside it
            // replaces the pending one, otherwise the pending one resumes.
            let pending = take_exit(env);
            set_exit(env, ExitState::Running);
            self.eval_node(finally_block, env);
            if is_running(env) {
                set_exit(env, pending);
            }
        }
        // The statement's value is that of whichever block ran last.
        value
    }

    fn eval_var_stmt(&self, node: &Node, env: &EnvRef) -> Value {
        let children = node.children();
        let Some(kw) = children.first().and_then(Node::token) else {
            return Value::Undefined;
        };
        let decl = match kw.kind {
            TokenKind::Let => DeclKind::Let,
            TokenKind::Const => DeclKind::Const,
            _ => DeclKind::Var,
        };

        let mut index = 1;
        while index < children.len() {
            // target [= expr] [, ...]
            let target = &children[index];
            index += 1;
            let mut init = None;
            if children.get(index).map_or(false, |c| c.is_token(TokenKind::Assign)) {
                index += 1;
                init = children.get(index);
                index += 1;
            }
            if children.get(index).map_or(false, |c| c.is_token(TokenKind::Comma)) {
                index += 1;
            }
            if matches!(target, Node::Token(t) if t.kind == TokenKind::Comma) {
                continue;
            }

            match init {
                Some(expr) => {
                    let value = self.eval_node(expr, env);
                    if !is_running(env) {
                        return Value::Undefined;
                    }
                    self.declare_target(target, value, env, decl);
                }
                None => {
                    if decl == DeclKind::Const {
                        self.throw_error(
                            env,
                            "SyntaxError",
                            "missing initializer in const declaration".to_string(),
                        );
                        return Value::Undefined;
                    }
                    // `let x;` stays in the dead zone until the first
                    // write; plain `var x;` was hoisted already.
                    if decl == DeclKind::Let {
                        if let Node::Token(token) = target {
                            let result = env.borrow_mut().declare_lexical(
                                &token.text,
                                DeclKind::Let,
                                None,
                            );
                            if result.is_err() {
                                self.throw_redeclaration(env, &token.text);
                                return Value::Undefined;
                            }
                        }
                    }
                }
            }
            if !is_running(env) {
                return Value::Undefined;
            }
        }
        Value::Undefined
    }

    // ==================================================================
    // Binding and assignment
    // ==================================================================

    fn declare_target(&self, target: &Node, value: Value, env: &EnvRef, decl: DeclKind) {
        self.bind_target(target, value, env, Some(decl));
    }

    /// Bind a declaration target or assignment target, recursing through
    /// destructuring patterns. `decl` of [`None`] means plain assignment.
    fn bind_target(&self, target: &Node, value: Value, env: &EnvRef, decl: Option<DeclKind>) {
        match target {
            Node::Token(token) if token.kind == TokenKind::Ident => {
                self.bind_name(&token.text, value, env, decl);
            }
            Node::Inner(inner) => match inner.kind {
                NodeKind::RefExpr => {
                    if let Some(token) = target.first_token() {
                        self.bind_name(&token.text, value, env, decl);
                    }
                }
                NodeKind::LitObject => self.bind_object_pattern(target, value, env, decl),
                NodeKind::LitArray => self.bind_array_pattern(target, value, env, decl),
                NodeKind::RefDotExpr | NodeKind::RefBracketExpr if decl.is_none() => {
                    self.assign_member(target, value, env);
                }
                NodeKind::ParenExpr => {
                    if let Some(inner_target) = target.child_nodes().next() {
                        self.bind_target(inner_target, value, env, decl);
                    }
                }
                NodeKind::AssignExpr => {
                    // Pattern element with default: target = default.
                    let mut parts = target.child_nodes();
                    let (Some(sub), default) = (parts.next(), parts.next()) else {
                        return;
                    };
                    let bound = if matches!(value, Value::Undefined) {
                        match default {
                            Some(default) => self.eval_node(default, env),
                            None => Value::Undefined,
                        }
                    } else {
                        value
                    };
                    if is_running(env) {
                        self.bind_target(sub, bound, env, decl);
                    }
                }
                _ => self.throw_error(
                    env,
                    "SyntaxError",
                    "invalid assignment target".to_string(),
                ),
            },
            _ => self.throw_error(env, "SyntaxError", "invalid assignment target".to_string()),
        }
    }

    fn bind_name(&self, name: &str, value: Value, env: &EnvRef, decl: Option<DeclKind>) {
        match decl {
            Some(DeclKind::Var) | Some(DeclKind::None) => {
                let result = env.borrow_mut().declare_var(name, value.clone());
                if result.is_err() {
                    self.throw_redeclaration(env, name);
                    return;
                }
                self.notify_write(VariableWriteKind::Declare, name, &value);
            }
            Some(kind) => {
                let result = env
                    .borrow_mut()
                    .declare_lexical(name, kind, Some(value.clone()));
                if result.is_err() {
                    self.throw_redeclaration(env, name);
                    return;
                }
                self.notify_write(VariableWriteKind::Declare, name, &value);
            }
            None => self.assign_name(name, value, env),
        }
    }

    fn bind_object_pattern(
        &self,
        pattern: &Node,
        value: Value,
        env: &EnvRef,
        decl: Option<DeclKind>,
    ) {
        if value.is_nullish() {
            self.throw_error(
                env,
                "TypeError",
                format!("cannot destructure '{}' as it is {}", pattern.text(), value),
            );
            return;
        }
        let children = pattern.children();
        let mut taken: Vec<Identifier> = Vec::new();
        let mut index = 0;
        while index < children.len() {
            if !is_running(env) {
                return;
            }
            match &children[index] {
                Node::Token(token)
                    if token.kind == TokenKind::Ident
                        || TokenKind::keyword(&token.text).is_some() =>
                {
                    let key = Identifier::from(&*token.text);
                    index += 1;
                    // Forms: `key`, `key = default`, `key: target`,
                    // `key: target = default` (parsed as AssignExpr).
                    let mut target_node: Option<&Node> = None;
                    let mut default: Option<&Node> = None;
                    if children.get(index).map_or(false, |c| c.is_token(TokenKind::Colon)) {
                        index += 1;
                        target_node = children.get(index);
                        index += 1;
                    } else if children
                        .get(index)
                        .map_or(false, |c| c.is_token(TokenKind::Assign))
                    {
                        index += 1;
                        default = children.get(index);
                        index += 1;
                    }
                    let mut item = self.read_property(&value, &key, env);
                    if !is_running(env) {
                        return;
                    }
                    if matches!(item, Value::Undefined) {
                        if let Some(default) = default {
                            item = self.eval_node(default, env);
                            if !is_running(env) {
                                return;
                            }
                        }
                    }
                    taken.push(key.clone());
                    match target_node {
                        Some(target) => self.bind_target(target, item, env, decl),
                        None => self.bind_name(&key, item, env, decl),
                    }
                }
                node if node.kind() == Some(NodeKind::UnaryExpr)
                    && node.children().first().map_or(false, |c| c.is_token(TokenKind::Ellipsis)) =>
                {
                    // Rest: remaining own properties.
                    let rest_target = node.child_nodes().next();
                    let mut rest = JsObject::plain(Some(self.protos().object.clone()));
                    if let Value::Object(obj) = &value {
                        for key in obj.borrow().own_keys() {
                            if taken.contains(&key) {
                                continue;
                            }
                            if let Some(prop) = obj.borrow().own_get(&key) {
                                rest.props.insert(key.clone(), prop);
                            }
                        }
                    }
                    if let Some(target) = rest_target {
                        self.bind_target(target, Value::Object(new_ref(rest)), env, decl);
                    }
                    index += 1;
                }
                _ => index += 1,
            }
        }
    }

    fn bind_array_pattern(
        &self,
        pattern: &Node,
        value: Value,
        env: &EnvRef,
        decl: Option<DeclKind>,
    ) {
        let items = match self.for_of_values(&value) {
            Some(items) => items,
            None => {
                self.throw_error(env, "TypeError", format!("{} is not iterable", value));
                return;
            }
        };
        let children = pattern.children();
        let mut slot = 0usize;
        let mut expecting_element = true;
        for child in children {
            if !is_running(env) {
                return;
            }
            match child {
                Node::Token(token) if token.kind == TokenKind::Comma => {
                    if expecting_element {
                        slot += 1; // hole
                    }
                    expecting_element = true;
                }
                Node::Token(_) => (),
                node if node.kind() == Some(NodeKind::UnaryExpr)
                    && node.children().first().map_or(false, |c| c.is_token(TokenKind::Ellipsis)) =>
                {
                    let rest: Vec<Value> = items.iter().skip(slot).cloned().collect();
                    let rest_value = Value::Object(new_ref(JsObject::array(
                        rest,
                        Some(self.protos().array.clone()),
                    )));
                    if let Some(target) = node.child_nodes().next() {
                        self.bind_target(target, rest_value, env, decl);
                    }
                    expecting_element = false;
                    slot = items.len();
                }
                node => {
                    let item = items.get(slot).cloned().unwrap_or(Value::Undefined);
                    self.bind_target(node, item, env, decl);
                    slot += 1;
                    expecting_element = false;
                }
            }
        }
    }

    fn assign_name(&self, name: &str, value: Value, env: &EnvRef) {
        if let Some(binding) = lookup(env, name) {
            let mut cell = binding.borrow_mut();
            if cell.kind == DeclKind::Const && cell.initialized {
                drop(cell);
                self.throw_error(
                    env,
                    "TypeError",
                    format!("assignment to constant: {}", name),
                );
                return;
            }
            cell.value = value.clone();
            cell.initialized = true;
            drop(cell);
            self.notify_write(VariableWriteKind::Assign, name, &value);
            return;
        }
        // Implicit global (non-strict semantics).
        let global = global_of(env);
        global.borrow_mut().declare_implicit(name, value.clone());
        self.notify_write(VariableWriteKind::Declare, name, &value);
    }

    fn assign_member(&self, target: &Node, value: Value, env: &EnvRef) {
        let Some(object_node) = target.child_nodes().next() else {
            return;
        };
        let subject = self.eval_node(object_node, env);
        if !is_running(env) {
            return;
        }
        let key = match self.member_key(target, env) {
            Some(key) => key,
            None => return,
        };
        self.write_property(&subject, &key, value, env);
    }

    /// The property key of a dot/bracket reference (evaluating the bracket
    /// expression when needed).
    fn member_key(&self, target: &Node, env: &EnvRef) -> Option<Identifier> {
        match target.kind() {
            Some(NodeKind::RefDotExpr) => target
                .children()
                .last()
                .and_then(Node::token)
                .map(|token| Identifier::from(&*token.text)),
            Some(NodeKind::RefBracketExpr) => {
                let key_node = target.child_nodes().nth(1)?;
                let key = self.eval_node(key_node, env);
                if !is_running(env) {
                    return None;
                }
                Some(Identifier::from(key.to_display()))
            }
            _ => None,
        }
    }

    fn eval_assign(&self, node: &Node, env: &EnvRef) -> Value {
        let children = node.children();
        let Some(op) = children.iter().find_map(|child| {
            child
                .token()
                .filter(|token| token.kind.is_assign_op())
                .map(|token| token.kind)
        }) else {
            return Value::Undefined;
        };
        let mut parts = node.child_nodes();
        let (Some(target), Some(rhs)) = (parts.next(), parts.next()) else {
            return Value::Undefined;
        };

        if op == TokenKind::Assign {
            // Member targets resolve before the right-hand side runs, so
            // side effects observe left-to-right order.
            if matches!(
                target.kind(),
                Some(NodeKind::RefDotExpr) | Some(NodeKind::RefBracketExpr)
            ) {
                let Some(place) = self.resolve_place(target, env) else {
                    return Value::Undefined;
                };
                let value = self.eval_node(rhs, env);
                if !is_running(env) {
                    return Value::Undefined;
                }
                self.write_place(&place, value.clone(), env);
                return value;
            }
            let value = self.eval_node(rhs, env);
            if !is_running(env) {
                return Value::Undefined;
            }
            self.bind_target(target, value.clone(), env, None);
            return value;
        }

        // Compound assignment: resolve the target once, read, combine,
        // write. The logical forms short-circuit the right-hand side.
        let Some(place) = self.resolve_place(target, env) else {
            return Value::Undefined;
        };
        let old = match self.read_place(&place, env) {
            Some(old) => old,
            None => return Value::Undefined,
        };
        let new_value = match op {
            TokenKind::AndAssign => {
                if !old.truthy() {
                    return old;
                }
                self.eval_node(rhs, env)
            }
            TokenKind::OrAssign => {
                if old.truthy() {
                    return old;
                }
                self.eval_node(rhs, env)
            }
            TokenKind::CoalesceAssign => {
                if !old.is_nullish() {
                    return old;
                }
                self.eval_node(rhs, env)
            }
            _ => {
                let rhs_value = self.eval_node(rhs, env);
                if !is_running(env) {
                    return Value::Undefined;
                }
                let math_op = match op {
                    TokenKind::PlusAssign => TokenKind::Plus,
                    TokenKind::MinusAssign => TokenKind::Minus,
                    TokenKind::StarAssign => TokenKind::Star,
                    TokenKind::SlashAssign => TokenKind::Slash,
                    TokenKind::PercentAssign => TokenKind::Percent,
                    TokenKind::PowAssign => TokenKind::Pow,
                    TokenKind::ShlAssign => TokenKind::Shl,
                    TokenKind::ShrAssign => TokenKind::Shr,
                    TokenKind::UShrAssign => TokenKind::UShr,
                    TokenKind::BitAndAssign => TokenKind::BitAnd,
                    TokenKind::BitOrAssign => TokenKind::BitOr,
                    TokenKind::BitXorAssign => TokenKind::BitXor,
                    _ => TokenKind::Plus,
                };
                binary_math(math_op, &old, &rhs_value)
            }
        };
        if !is_running(env) {
            return Value::Undefined;
        }
        self.write_place(&place, new_value.clone(), env);
        new_value
    }

    /// Resolve an assignment/update target once: the base object and key
    /// of a member reference are evaluated exactly one time.
    fn resolve_place(&self, target: &Node, env: &EnvRef) -> Option<Place> {
        match target.kind() {
            Some(NodeKind::RefExpr) => {
                let name = target.first_token()?;
                Some(Place::Name(Identifier::from(&*name.text)))
            }
            Some(NodeKind::RefDotExpr) | Some(NodeKind::RefBracketExpr) => {
                let object_node = target.child_nodes().next()?;
                let subject = self.eval_node(object_node, env);
                if !is_running(env) {
                    return None;
                }
                let key = self.member_key(target, env)?;
                Some(Place::Member { subject, key })
            }
            Some(NodeKind::ParenExpr) => {
                let inner = target.child_nodes().next()?;
                self.resolve_place(inner, env)
            }
            _ => {
                self.throw_error(env, "SyntaxError", "invalid assignment target".to_string());
                None
            }
        }
    }

    fn read_place(&self, place: &Place, env: &EnvRef) -> Option<Value> {
        match place {
            Place::Name(name) => self.read_name(name, env),
            Place::Member { subject, key } => {
                let value = self.read_property(subject, key, env);
                if is_running(env) {
                    Some(value)
                } else {
                    None
                }
            }
        }
    }

    fn write_place(&self, place: &Place, value: Value, env: &EnvRef) {
        match place {
            Place::Name(name) => self.assign_name(name, value, env),
            Place::Member { subject, key } => self.write_property(subject, key, value, env),
        }
    }

    // ==================================================================
    // Expressions
    // ==================================================================

    fn eval_ternary(&self, node: &Node, env: &EnvRef) -> Value {
        let mut parts = node.child_nodes();
        let (Some(cond), Some(then_expr), Some(else_expr)) =
            (parts.next(), parts.next(), parts.next())
        else {
            return Value::Undefined;
        };
        let condition = self.eval_node(cond, env);
        if !is_running(env) {
            return Value::Undefined;
        }
        if condition.truthy() {
            self.eval_node(then_expr, env)
        } else {
            self.eval_node(else_expr, env)
        }
    }

    fn eval_logic(&self, node: &Node, env: &EnvRef) -> Value {
        let Some(op) = operator_of(node) else {
            return Value::Undefined;
        };
        let mut parts = node.child_nodes();
        let (Some(lhs_node), Some(rhs_node)) = (parts.next(), parts.next()) else {
            return Value::Undefined;
        };
        let lhs = self.eval_node(lhs_node, env);
        if !is_running(env) {
            return Value::Undefined;
        }

        match op {
            TokenKind::And => {
                if !lhs.truthy() {
                    return lhs;
                }
                return self.eval_node(rhs_node, env);
            }
            TokenKind::Or => {
                if lhs.truthy() {
                    return lhs;
                }
                return self.eval_node(rhs_node, env);
            }
            TokenKind::Coalesce => {
                if !lhs.is_nullish() {
                    return lhs;
                }
                return self.eval_node(rhs_node, env);
            }
            _ => (),
        }

        let rhs = self.eval_node(rhs_node, env);
        if !is_running(env) {
            return Value::Undefined;
        }
        match op {
            TokenKind::Eq => Value::Bool(lhs.loose_eq(&rhs)),
            TokenKind::NotEq => Value::Bool(!lhs.loose_eq(&rhs)),
            TokenKind::StrictEq => Value::Bool(lhs.strict_eq(&rhs)),
            TokenKind::StrictNotEq => Value::Bool(!lhs.strict_eq(&rhs)),
            TokenKind::Lt => Value::Bool(matches!(
                compare_numbers(&lhs, &rhs),
                Some(std::cmp::Ordering::Less)
            )),
            TokenKind::Le => Value::Bool(matches!(
                compare_numbers(&lhs, &rhs),
                Some(std::cmp::Ordering::Less | std::cmp::Ordering::Equal)
            )),
            TokenKind::Gt => Value::Bool(matches!(
                compare_numbers(&lhs, &rhs),
                Some(std::cmp::Ordering::Greater)
            )),
            TokenKind::Ge => Value::Bool(matches!(
                compare_numbers(&lhs, &rhs),
                Some(std::cmp::Ordering::Greater | std::cmp::Ordering::Equal)
            )),
            TokenKind::In => match &rhs {
                Value::Object(obj) => {
                    let key = lhs.to_display();
                    Value::Bool(get_member(obj, &key).is_some())
                }
                _ => {
                    self.throw_error(
                        env,
                        "TypeError",
                        format!("cannot use 'in' operator to search in {}", rhs),
                    );
                    Value::Undefined
                }
            },
            _ => Value::Undefined,
        }
    }

    fn eval_math(&self, node: &Node, env: &EnvRef) -> Value {
        let Some(op) = operator_of(node) else {
            return Value::Undefined;
        };
        let mut parts = node.child_nodes();
        let (Some(lhs_node), Some(rhs_node)) = (parts.next(), parts.next()) else {
            return Value::Undefined;
        };
        let lhs = self.eval_node(lhs_node, env);
        if !is_running(env) {
            return Value::Undefined;
        }
        let rhs = self.eval_node(rhs_node, env);
        if !is_running(env) {
            return Value::Undefined;
        }
        binary_math(op, &lhs, &rhs)
    }

    fn eval_unary(&self, node: &Node, env: &EnvRef) -> Value {
        let children = node.children();
        // Prefix: the operator token comes first; postfix: it comes last.
        let prefix = children.first().map_or(false, |c| c.token().is_some());
        let op = if prefix {
            children.first()
        } else {
            children.last()
        }
        .and_then(Node::token)
        .map(|token| token.kind);
        let Some(op) = op else {
            return Value::Undefined;
        };
        let Some(operand) = node.child_nodes().next() else {
            return Value::Undefined;
        };

        match op {
            TokenKind::Inc | TokenKind::Dec => self.eval_update(op, operand, prefix, env),
            TokenKind::Delete => self.eval_delete(operand, env),
            TokenKind::Ellipsis => {
                // A bare spread outside a call/array/object context.
                self.throw_error(env, "SyntaxError", "unexpected spread".to_string());
                Value::Undefined
            }
            _ => {
                let value = self.eval_node(operand, env);
                if !is_running(env) {
                    return Value::Undefined;
                }
                match op {
                    TokenKind::Not => Value::Bool(!value.truthy()),
                    TokenKind::BitNot => Value::Number(f64::from(!to_int32(value.to_number()))),
                    TokenKind::Plus => Value::Number(value.to_number()),
                    TokenKind::Minus => Value::Number(-value.to_number()),
                    _ => Value::Undefined,
                }
            }
        }
    }

    fn eval_update(&self, op: TokenKind, target: &Node, prefix: bool, env: &EnvRef) -> Value {
        let Some(place) = self.resolve_place(target, env) else {
            return Value::Undefined;
        };
        let Some(old) = self.read_place(&place, env) else {
            return Value::Undefined;
        };
        let old_number = old.to_number();
        let new_number = match op {
            TokenKind::Inc => old_number + 1.0,
            _ => old_number - 1.0,
        };
        self.write_place(&place, Value::Number(new_number), env);
        if prefix {
            Value::Number(new_number)
        } else {
            Value::Number(old_number)
        }
    }

    fn eval_delete(&self, target: &Node, env: &EnvRef) -> Value {
        match target.kind() {
            Some(NodeKind::RefDotExpr) | Some(NodeKind::RefBracketExpr) => {
                let Some(object_node) = target.child_nodes().next() else {
                    return Value::Bool(true);
                };
                let subject = self.eval_node(object_node, env);
                if !is_running(env) {
                    return Value::Undefined;
                }
                let Some(key) = self.member_key(target, env) else {
                    return Value::Bool(true);
                };
                match subject.as_object() {
                    Some(obj) => {
                        let frozen = obj.borrow().frozen;
                        remove_member(obj, &key);
                        Value::Bool(!frozen)
                    }
                    None => Value::Bool(true),
                }
            }
            // Deleting a variable (or anything else) is refused.
            Some(NodeKind::RefExpr) => Value::Bool(false),
            Some(NodeKind::ParenExpr) => match target.child_nodes().next() {
                Some(inner) => self.eval_delete(inner, env),
                None => Value::Bool(true),
            },
            _ => Value::Bool(true),
        }
    }

    fn eval_typeof(&self, node: &Node, env: &EnvRef) -> Value {
        let Some(operand) = node.child_nodes().next() else {
            return Value::Undefined;
        };
        // `typeof unresolved` yields "undefined" instead of failing.
        if operand.kind() == Some(NodeKind::RefExpr) {
            if let Some(token) = operand.first_token() {
                if token.text.as_ref() != "this" && lookup(env, &token.text).is_none() {
                    return Value::str("undefined");
                }
            }
        }
        let value = self.eval_node(operand, env);
        if !is_running(env) {
            return Value::Undefined;
        }
        Value::str(value.type_of())
    }

    fn eval_instanceof(&self, node: &Node, env: &EnvRef) -> Value {
        let mut parts = node.child_nodes();
        let (Some(lhs_node), Some(rhs_node)) = (parts.next(), parts.next()) else {
            return Value::Undefined;
        };
        let lhs = self.eval_node(lhs_node, env);
        if !is_running(env) {
            return Value::Undefined;
        }
        let rhs = self.eval_node(rhs_node, env);
        if !is_running(env) {
            return Value::Undefined;
        }
        let Some(ctor) = rhs.as_object().filter(|obj| obj.borrow().as_function().is_some())
        else {
            self.throw_error(
                env,
                "TypeError",
                "right-hand side of 'instanceof' is not callable".to_string(),
            );
            return Value::Undefined;
        };
        let prototype = get_member(ctor, "prototype");
        match prototype {
            Some(Value::Object(proto)) => {
                Value::Bool(object::proto_chain_contains(&lhs, &proto))
            }
            _ => Value::Bool(false),
        }
    }

    fn eval_ref(&self, node: &Node, env: &EnvRef) -> Value {
        let Some(token) = node.first_token() else {
            return Value::Undefined;
        };
        if token.text.as_ref() == "this" {
            return this_of(env);
        }
        match self.read_name(&token.text, env) {
            Some(value) => value,
            None => Value::Undefined,
        }
    }

    /// Read an identifier with TDZ and not-defined errors; [`None`] means
    /// an error was raised on the exit channel.
    fn read_name(&self, name: &str, env: &EnvRef) -> Option<Value> {
        if let Some(binding) = lookup(env, name) {
            let cell = binding.borrow();
            if !cell.initialized && matches!(cell.kind, DeclKind::Let | DeclKind::Const) {
                drop(cell);
                self.throw_error(
                    env,
                    "ReferenceError",
                    format!("cannot access '{}' before initialization", name),
                );
                return None;
            }
            return Some(cell.value.clone());
        }
        // Unknown identifier: give the host bridge a chance to resolve a
        // type by name before failing.
        if let Some(bridge) = &self.bridge {
            if let Some(access) = bridge.for_type(name) {
                return Some(Value::External(Shared::new(
                    crate::bridge::AccessValue(access),
                )));
            }
        }
        self.throw_error(env, "ReferenceError", format!("{} is not defined", name));
        None
    }

    // ==================================================================
    // Member access
    // ==================================================================

    /// Evaluate a dot/bracket reference. [`None`] means an error was
    /// raised on the exit channel.
    fn eval_member(&self, node: &Node, env: &EnvRef) -> Option<Value> {
        let Some(object_node) = node.child_nodes().next() else {
            return Some(Value::Undefined);
        };
        let subject = self.eval_node(object_node, env);
        if !is_running(env) {
            return None;
        }
        let optional = node
            .children()
            .iter()
            .any(|child| child.is_token(TokenKind::Optional));
        if optional && subject.is_nullish() {
            return Some(Value::Undefined);
        }

        match node.kind() {
            Some(NodeKind::RefBracketExpr) => {
                let key_node = node.child_nodes().nth(1)?;
                let key = self.eval_node(key_node, env);
                if !is_running(env) {
                    return None;
                }
                Some(self.read_index(&subject, &key, env))
            }
            _ => {
                let name = node.children().last().and_then(Node::token)?;
                Some(self.read_property(&subject, &name.text, env))
            }
        }
    }

    /// Bracket access: numeric indexes hit elements/characters/bytes, any
    /// other key coerces to a property name.
    fn read_index(&self, subject: &Value, key: &Value, env: &EnvRef) -> Value {
        if let Value::Number(n) = key {
            if n.fract() == 0.0 && *n >= 0.0 {
                let index = *n as usize;
                match subject {
                    Value::Str(s) => {
                        return s
                            .chars()
                            .nth(index)
                            .map(|c| Value::str(c.to_string()))
                            .unwrap_or(Value::Undefined);
                    }
                    Value::Object(obj) => {
                        let guard = obj.borrow();
                        match &guard.kind {
                            ObjectKind::Array(elements) => {
                                return elements.get(index).cloned().unwrap_or(Value::Undefined);
                            }
                            ObjectKind::Uint8Array(bytes) => {
                                return bytes
                                    .get(index)
                                    .map(|b| Value::Number(f64::from(*b)))
                                    .unwrap_or(Value::Undefined);
                            }
                            _ => (),
                        }
                    }
                    _ => (),
                }
            } else if subject.as_object().map_or(false, |o| o.borrow().is_array()) {
                return Value::Undefined;
            }
        }
        self.read_property(subject, &key.to_display(), env)
    }

    /// Property read honoring primitives, prototype chains, host values
    /// and the external bridge.
    pub(crate) fn read_property(&self, subject: &Value, name: &str, env: &EnvRef) -> Value {
        match subject {
            Value::Undefined | Value::Null => {
                self.throw_error(
                    env,
                    "TypeError",
                    format!(
                        "cannot read properties of {} (reading '{}')",
                        subject.to_display(),
                        name
                    ),
                );
                Value::Undefined
            }
            Value::Str(s) => {
                if name == "length" {
                    return Value::Number(s.chars().count() as f64);
                }
                if let Some(index) = object::index_key(name) {
                    return s
                        .chars()
                        .nth(index)
                        .map(|c| Value::str(c.to_string()))
                        .unwrap_or(Value::Undefined);
                }
                get_member(&self.protos().string, name).unwrap_or(Value::Undefined)
            }
            Value::Number(_) => {
                get_member(&self.protos().number, name).unwrap_or(Value::Undefined)
            }
            Value::Bool(_) => {
                get_member(&self.protos().boolean, name).unwrap_or(Value::Undefined)
            }
            Value::Object(obj) => get_member(obj, name).unwrap_or(Value::Undefined),
            Value::External(host) => {
                if let Some(value) = host.get_member(name) {
                    return value;
                }
                if let Some(bridge) = &self.bridge {
                    if let Some(access) = bridge.for_instance(subject) {
                        if let Some(value) = access.get_property(name) {
                            return value;
                        }
                        if let Some(method) = access.get_method(name) {
                            return method;
                        }
                    }
                }
                Value::Undefined
            }
        }
    }

    fn write_property(&self, subject: &Value, name: &str, value: Value, env: &EnvRef) {
        match subject {
            Value::Undefined | Value::Null => {
                self.throw_error(
                    env,
                    "TypeError",
                    format!(
                        "cannot set properties of {} (setting '{}')",
                        subject.to_display(),
                        name
                    ),
                );
            }
            Value::Object(obj) => match put_member(obj, name, value) {
                PutResult::Ok => (),
                PutResult::Immutable => {
                    self.throw_error(
                        env,
                        "TypeError",
                        format!("cannot modify immutable prototype property '{}'", name),
                    );
                }
            },
            Value::External(host) => {
                if host.put_member(name, value.clone()) {
                    return;
                }
                if let Some(bridge) = &self.bridge {
                    if let Some(access) = bridge.for_instance(subject) {
                        access.update(name, value);
                    }
                }
            }
            // Property writes on primitives are silently dropped.
            _ => (),
        }
    }

    // ==================================================================
    // Calls and construction
    // ==================================================================

    fn eval_call(&self, node: &Node, env: &EnvRef) -> Value {
        let Some(callee_node) = node.child_nodes().next() else {
            return Value::Undefined;
        };
        let optional_call = node
            .children()
            .iter()
            .any(|child| child.is_token(TokenKind::Optional));

        // Resolve callee and receiver: `obj.m(...)` binds `obj` as `this`.
        let (callee, receiver) = match callee_node.kind() {
            Some(NodeKind::RefDotExpr) | Some(NodeKind::RefBracketExpr) => {
                let Some(object_node) = callee_node.child_nodes().next() else {
                    return Value::Undefined;
                };
                let receiver = self.eval_node(object_node, env);
                if !is_running(env) {
                    return Value::Undefined;
                }
                let inner_optional = callee_node
                    .children()
                    .iter()
                    .any(|child| child.is_token(TokenKind::Optional));
                if inner_optional && receiver.is_nullish() {
                    return Value::Undefined;
                }
                let method = match callee_node.kind() {
                    Some(NodeKind::RefBracketExpr) => {
                        let Some(key_node) = callee_node.child_nodes().nth(1) else {
                            return Value::Undefined;
                        };
                        let key = self.eval_node(key_node, env);
                        if !is_running(env) {
                            return Value::Undefined;
                        }
                        self.read_index(&receiver, &key, env)
                    }
                    _ => {
                        let Some(name) = callee_node.children().last().and_then(Node::token)
                        else {
                            return Value::Undefined;
                        };
                        self.read_property(&receiver, &name.text, env)
                    }
                };
                if !is_running(env) {
                    return Value::Undefined;
                }
                (method, receiver)
            }
            _ => {
                let callee = self.eval_node(callee_node, env);
                (callee, Value::Undefined)
            }
        };
        if !is_running(env) {
            return Value::Undefined;
        }
        if optional_call && callee.is_nullish() {
            return Value::Undefined;
        }

        let Some(args) = self.eval_arguments(node, env) else {
            return Value::Undefined;
        };
        if !self.check_callable(&callee, callee_node, env) {
            return Value::Undefined;
        }
        self.call_value(&callee, receiver, args, false, env)
    }

    /// Evaluate argument expressions left to right, flattening spreads.
    /// [`None`] means an error was raised.
    fn eval_arguments(&self, node: &Node, env: &EnvRef) -> Option<Vec<Value>> {
        let mut args = Vec::new();
        let mut in_args = false;
        for child in node.children() {
            match child {
                Node::Token(token) if token.kind == TokenKind::LParen => in_args = true,
                Node::Token(token) if token.kind == TokenKind::RParen => break,
                Node::Inner(_) if in_args => {
                    if is_spread(child) {
                        let Some(spread_node) = child.child_nodes().next() else {
                            continue;
                        };
                        let subject = self.eval_node(spread_node, env);
                        if !is_running(env) {
                            return None;
                        }
                        match self.spread_values(&subject) {
                            Some(items) => args.extend(items),
                            None => {
                                self.throw_error(
                                    env,
                                    "TypeError",
                                    format!("{} is not iterable", subject),
                                );
                                return None;
                            }
                        }
                    } else {
                        let value = self.eval_node(child, env);
                        if !is_running(env) {
                            return None;
                        }
                        args.push(value);
                    }
                }
                _ => (),
            }
        }
        Some(args)
    }

    /// Spread in calls and array literals: arrays, strings and byte
    /// buffers are iterable; plain objects are not.
    fn spread_values(&self, subject: &Value) -> Option<Vec<Value>> {
        match subject {
            Value::Str(s) => Some(s.chars().map(|c| Value::str(c.to_string())).collect()),
            Value::Object(obj) => {
                let guard = obj.borrow();
                match &guard.kind {
                    ObjectKind::Array(elements) => Some(elements.clone()),
                    ObjectKind::Uint8Array(bytes) => {
                        Some(bytes.iter().map(|b| Value::Number(f64::from(*b))).collect())
                    }
                    _ => None,
                }
            }
            _ => None,
        }
    }

    fn check_callable(&self, callee: &Value, callee_node: &Node, env: &EnvRef) -> bool {
        let callable = match callee {
            Value::Object(obj) => obj.borrow().as_function().is_some(),
            Value::External(_) => true,
            _ => false,
        };
        if !callable {
            self.throw_error(
                env,
                "TypeError",
                format!("{} is not a function", callee_node.text()),
            );
        }
        callable
    }

    fn eval_new(&self, node: &Node, env: &EnvRef) -> Value {
        let Some(callee_node) = node.child_nodes().next() else {
            return Value::Undefined;
        };
        let callee = self.eval_node(callee_node, env);
        if !is_running(env) {
            return Value::Undefined;
        }
        let Some(args) = self.eval_arguments(node, env) else {
            return Value::Undefined;
        };

        match &callee {
            Value::Object(obj) if obj.borrow().as_function().is_some() => {
                let is_native = matches!(
                    obj.borrow().as_function(),
                    Some(JsFunction::Native(_))
                );
                if is_native {
                    // Built-in constructors inspect the constructor flag
                    // and return the appropriate boxed form themselves.
                    return self.call_value(&callee, Value::Undefined, args, true, env);
                }
                // Allocate the instance, wire its prototype, run the body.
                let proto = match get_member(obj, "prototype") {
                    Some(Value::Object(proto)) => Some(proto),
                    _ => Some(self.protos().object.clone()),
                };
                let instance = new_ref(JsObject::plain(proto));
                let this = Value::Object(instance.clone());
                let returned =
                    self.call_value(&callee, this.clone(), args, true, env);
                if !is_running(env) {
                    return Value::Undefined;
                }
                // An object return value replaces the allocated instance.
                match returned {
                    Value::Object(_) => returned,
                    _ => this,
                }
            }
            Value::External(host) => match host.construct(&args) {
                Some(value) => value,
                None => {
                    self.throw_error(
                        env,
                        "TypeError",
                        format!("{} is not a constructor", callee_node.text()),
                    );
                    Value::Undefined
                }
            },
            _ => {
                self.throw_error(
                    env,
                    "TypeError",
                    format!("{} is not a constructor", callee_node.text()),
                );
                Value::Undefined
            }
        }
    }

    /// Unified call dispatch for user functions and built-ins.
    pub(crate) fn call_value(
        &self,
        callee: &Value,
        this: Value,
        args: Vec<Value>,
        is_constructor: bool,
        env: &EnvRef,
    ) -> Value {
        if let Some(listener) = &self.listener {
            listener.on_function_call(callee, &args);
        }

        let function = match callee {
            Value::Object(obj) => match obj.borrow().as_function() {
                Some(function) => function.clone(),
                None => {
                    self.throw_error(env, "TypeError", "value is not a function".to_string());
                    return Value::Undefined;
                }
            },
            Value::External(host) => {
                let host_args: Vec<Value> = args.iter().map(to_host_call_arg).collect();
                match host.call(&host_args) {
                    Some(value) => return value,
                    None => {
                        self.throw_error(
                            env,
                            "TypeError",
                            "host value is not callable".to_string(),
                        );
                        return Value::Undefined;
                    }
                }
            }
            _ => {
                self.throw_error(env, "TypeError", "value is not a function".to_string());
                return Value::Undefined;
            }
        };

        let depth = self.call_depth.get();
        if depth >= self.max_call_depth {
            self.throw_error(
                env,
                "RangeError",
                "maximum call stack size exceeded".to_string(),
            );
            return Value::Undefined;
        }
        self.call_depth.set(depth + 1);

        let result = match &function {
            JsFunction::Native(native) => {
                let mut ctx = NativeContext {
                    engine: self,
                    env: env.clone(),
                    call_info: Some(CallInfo {
                        is_constructor,
                        callee: callee.clone(),
                    }),
                };
                match (native.func)(&mut ctx, &this, &args) {
                    Ok(value) => value,
                    Err(Throw(error)) => {
                        set_exit(env, ExitState::Throw(error));
                        Value::Undefined
                    }
                }
            }
            JsFunction::User(user) => self.call_user(user, callee, this, args, is_constructor, env),
        };

        self.call_depth.set(self.call_depth.get().saturating_sub(1));
        result
    }

    fn call_user(
        &self,
        user: &Shared<UserFn>,
        callee: &Value,
        this: Value,
        args: Vec<Value>,
        is_constructor: bool,
        caller_env: &EnvRef,
    ) -> Value {
        let mut frame = Environment::function(user.env.clone());
        frame.captured = user.captured.clone();
        if !user.is_arrow {
            frame.this = Some(this);
        }
        frame.call_info = Some(CallInfo {
            is_constructor,
            callee: callee.clone(),
        });
        let frame: EnvRef = Shared::new(Locked::new(frame));

        if let Some(listener) = &self.listener {
            listener.on_event(ContextEvent::ContextEnter, &user.body);
        }

        // `arguments` is visible in classical functions only; arrows see
        // the enclosing function's binding through the scope chain.
        if !user.is_arrow {
            let arguments = Value::Object(new_ref(JsObject::array(
                args.clone(),
                Some(self.protos().array.clone()),
            )));
            let _ = frame.borrow_mut().declare_var("arguments", arguments);
        }

        self.bind_parameters(&user.params, &args, &frame);

        if is_running(&frame) {
            self.hoist_vars(&user.body, &frame);
            if user.body.kind() == Some(NodeKind::Block) {
                self.eval_node(&user.body, &frame);
            } else {
                // Arrow expression body: its value is the return value.
                let result = self.eval_node(&user.body, &frame);
                if is_running(&frame) {
                    set_exit(&frame, ExitState::Return(result));
                }
            }
        }

        if let Some(listener) = &self.listener {
            listener.on_event(ContextEvent::ContextExit, &user.body);
        }

        match take_exit(&frame) {
            ExitState::Return(result) => result,
            ExitState::Throw(error) => {
                set_exit(caller_env, ExitState::Throw(error));
                Value::Undefined
            }
            _ => Value::Undefined,
        }
    }

    fn bind_parameters(&self, params: &[Node], args: &[Value], frame: &EnvRef) {
        let mut arg_index = 0usize;
        for param in params {
            if !is_running(frame) {
                return;
            }
            let children = param.children();
            let is_rest = children.first().map_or(false, |c| c.is_token(TokenKind::Ellipsis));
            if is_rest {
                let rest: Vec<Value> = args.iter().skip(arg_index).cloned().collect();
                let rest_value = Value::Object(new_ref(JsObject::array(
                    rest,
                    Some(self.protos().array.clone()),
                )));
                if let Some(target) = children.iter().find(|c| !c.is_token(TokenKind::Ellipsis)) {
                    self.bind_target(target, rest_value, frame, Some(DeclKind::Var));
                }
                return;
            }

            let target = children.first();
            let default = if children.get(1).map_or(false, |c| c.is_token(TokenKind::Assign)) {
                children.get(2)
            } else {
                None
            };
            let mut value = args.get(arg_index).cloned().unwrap_or(Value::Undefined);
            arg_index += 1;
            if matches!(value, Value::Undefined) {
                if let Some(default) = default {
                    value = self.eval_node(default, frame);
                    if !is_running(frame) {
                        return;
                    }
                }
            }
            if let Some(target) = target {
                self.bind_target(target, value, frame, Some(DeclKind::Var));
            }
        }
    }

    // ==================================================================
    // Function literals
    // ==================================================================

    fn make_function(&self, node: &Node, env: &EnvRef, is_arrow: bool) -> Value {
        let name = if is_arrow {
            Identifier::new()
        } else {
            function_decl_name(node).unwrap_or_default()
        };

        let params: Vec<Node> = node
            .child_nodes()
            .filter(|child| child.kind() == Some(NodeKind::FnDeclArg))
            .cloned()
            .collect();
        let body = if is_arrow {
            // The last inner node after the arrow token.
            node.child_nodes()
                .filter(|child| child.kind() != Some(NodeKind::FnDeclArg))
                .last()
                .cloned()
        } else {
            node.child_nodes()
                .find(|child| child.kind() == Some(NodeKind::Block))
                .cloned()
        };
        let Some(body) = body else {
            return Value::Undefined;
        };

        let user = UserFn {
            name,
            params,
            body,
            env: env.clone(),
            captured: capture_visible(env),
            is_arrow,
        };
        let function = new_ref(JsObject::function(
            JsFunction::User(Shared::new(user)),
            Some(self.protos().function.clone()),
        ));
        let function_value = Value::Object(function.clone());

        // Classical functions carry a `prototype` object whose
        // `constructor` points back at the function.
        if !is_arrow {
            let mut proto = JsObject::plain(Some(self.protos().object.clone()));
            proto
                .props
                .insert(Identifier::from("constructor"), function_value.clone());
            function
                .borrow_mut()
                .props
                .insert(Identifier::from("prototype"), Value::Object(new_ref(proto)));
        }
        function_value
    }

    // ==================================================================
    // Literals
    // ==================================================================

    fn eval_literal(&self, node: &Node, env: &EnvRef) -> Value {
        let Some(token) = node.first_token() else {
            return Value::Undefined;
        };
        let _ = env;
        match token.kind {
            TokenKind::Number => Value::Number(parse_number_literal(&token.text)),
            TokenKind::DString | TokenKind::SString => Value::str(token.cooked_text()),
            TokenKind::True => Value::Bool(true),
            TokenKind::False => Value::Bool(false),
            TokenKind::Null => Value::Null,
            _ => Value::Undefined,
        }
    }

    fn eval_array_literal(&self, node: &Node, env: &EnvRef) -> Value {
        let mut elements = Vec::new();
        let mut expecting_element = true;
        for child in node.children() {
            if !is_running(env) {
                return Value::Undefined;
            }
            match child {
                Node::Token(token) if token.kind == TokenKind::Comma => {
                    if expecting_element {
                        elements.push(Value::Undefined); // elision hole
                    }
                    expecting_element = true;
                }
                Node::Token(_) => (),
                inner if is_spread(inner) => {
                    let Some(spread_node) = inner.child_nodes().next() else {
                        continue;
                    };
                    let subject = self.eval_node(spread_node, env);
                    if !is_running(env) {
                        return Value::Undefined;
                    }
                    match self.spread_values(&subject) {
                        Some(items) => elements.extend(items),
                        None => {
                            self.throw_error(
                                env,
                                "TypeError",
                                format!("{} is not iterable", subject),
                            );
                            return Value::Undefined;
                        }
                    }
                    expecting_element = false;
                }
                inner => {
                    elements.push(self.eval_node(inner, env));
                    expecting_element = false;
                }
            }
        }
        Value::Object(new_ref(JsObject::array(
            elements,
            Some(self.protos().array.clone()),
        )))
    }

    fn eval_object_literal(&self, node: &Node, env: &EnvRef) -> Value {
        let mut object = JsObject::plain(Some(self.protos().object.clone()));
        let children = node.children();
        let mut index = 0usize;
        while index < children.len() {
            if !is_running(env) {
                return Value::Undefined;
            }
            match &children[index] {
                Node::Token(token)
                    if matches!(
                        token.kind,
                        TokenKind::DString | TokenKind::SString | TokenKind::Number
                    ) || token.kind == TokenKind::Ident
                        || TokenKind::keyword(&token.text).is_some() =>
                {
                    let key = match token.kind {
                        TokenKind::DString | TokenKind::SString => {
                            Identifier::from(token.cooked_text())
                        }
                        TokenKind::Number => Identifier::from(
                            crate::value::format_number(parse_number_literal(&token.text)),
                        ),
                        _ => Identifier::from(&*token.text),
                    };
                    index += 1;
                    if children.get(index).map_or(false, |c| c.is_token(TokenKind::Colon)) {
                        index += 1;
                        let Some(value_node) = children.get(index) else {
                            break;
                        };
                        index += 1;
                        let value = self.eval_node(value_node, env);
                        if !is_running(env) {
                            return Value::Undefined;
                        }
                        object.props.insert(key, value);
                    } else {
                        // Shorthand: the value is the variable of the same
                        // name.
                        let Some(value) = self.read_name(&key, env) else {
                            return Value::Undefined;
                        };
                        object.props.insert(key, value);
                    }
                }
                Node::Token(token) if token.kind == TokenKind::LBracket => {
                    // Computed key: [expr]: value
                    index += 1;
                    let Some(key_node) = children.get(index) else {
                        break;
                    };
                    let key = self.eval_node(key_node, env);
                    if !is_running(env) {
                        return Value::Undefined;
                    }
                    // Skip to the value after `]` and `:`.
                    index += 1;
                    while children
                        .get(index)
                        .and_then(Node::token)
                        .map_or(false, |t| {
                            matches!(t.kind, TokenKind::RBracket | TokenKind::Colon)
                        })
                    {
                        index += 1;
                    }
                    let Some(value_node) = children.get(index) else {
                        break;
                    };
                    index += 1;
                    let value = self.eval_node(value_node, env);
                    if !is_running(env) {
                        return Value::Undefined;
                    }
                    object.props.insert(Identifier::from(key.to_display()), value);
                }
                inner if is_spread(inner) => {
                    let Some(spread_node) = inner.child_nodes().next() else {
                        index += 1;
                        continue;
                    };
                    let subject = self.eval_node(spread_node, env);
                    if !is_running(env) {
                        return Value::Undefined;
                    }
                    if let Value::Object(source) = &subject {
                        for key in source.borrow().own_keys() {
                            if let Some(prop) = source.borrow().own_get(&key) {
                                object.props.insert(key, prop);
                            }
                        }
                    }
                    index += 1;
                }
                _ => index += 1,
            }
        }
        Value::Object(new_ref(object))
    }

    fn eval_template(&self, node: &Node, env: &EnvRef) -> Value {
        let mut out = String::new();
        for child in node.children() {
            if !is_running(env) {
                return Value::Undefined;
            }
            match child {
                Node::Token(token) if token.kind == TokenKind::TString => {
                    out.push_str(token.cooked_text());
                }
                Node::Token(_) => (),
                inner => {
                    let value = self.eval_node(inner, env);
                    if !is_running(env) {
                        return Value::Undefined;
                    }
                    out.push_str(&value.to_display());
                }
            }
        }
        Value::str(out)
    }

    fn eval_regex_literal(&self, node: &Node, env: &EnvRef) -> Value {
        let Some(token) = node.first_token() else {
            return Value::Undefined;
        };
        let text = &token.text;
        let end = text.rfind('/').unwrap_or(0);
        // An unterminated literal has no closing slash.
        if end == 0 {
            self.throw_error(env, "SyntaxError", "invalid regular expression".to_string());
            return Value::Undefined;
        }
        let source = &text[1..end];
        let flags = &text[end + 1..];
        match crate::builtins::regexp::compile(source, flags) {
            Ok(regex) => Value::Object(new_ref(JsObject::with_kind(
                ObjectKind::Regex(regex),
                Some(self.protos().regexp.clone()),
            ))),
            Err(message) => {
                self.throw_error(
                    env,
                    "SyntaxError",
                    format!("invalid regular expression: {}", message),
                );
                Value::Undefined
            }
        }
    }

    // ==================================================================
    // Errors
    // ==================================================================

    /// Build an error object of the given kind, chained to the matching
    /// built-in prototype.
    pub(crate) fn make_error(&self, kind: &str, message: impl Into<String>) -> Value {
        let protos = self.protos();
        let proto = match kind {
            "TypeError" => &protos.type_error,
            "RangeError" => &protos.range_error,
            "ReferenceError" => &protos.reference_error,
            "SyntaxError" => &protos.syntax_error,
            _ => &protos.error,
        };
        let mut object = JsObject::plain(Some(proto.clone()));
        object
            .props
            .insert(Identifier::from("name"), Value::str(kind));
        object
            .props
            .insert(Identifier::from("message"), Value::Str(Shared::from(message.into())));
        Value::Object(new_ref(object))
    }

    pub(crate) fn throw_error(&self, env: &EnvRef, kind: &str, message: String) {
        let error = self.make_error(kind, message);
        set_exit(env, ExitState::Throw(error));
    }

    fn throw_redeclaration(&self, env: &EnvRef, name: &str) {
        self.throw_error(
            env,
            "SyntaxError",
            format!("identifier '{}' has already been declared", name),
        );
    }

    fn notify_write(&self, kind: VariableWriteKind, name: &str, value: &Value) {
        if let Some(listener) = &self.listener {
            listener.on_variable_write(kind, name, value);
        }
    }
}

// ======================================================================
// Free helpers
// ======================================================================

/// The declared name of a `function name(...)` expression, if any.
fn function_decl_name(node: &Node) -> Option<Identifier> {
    let children = node.children();
    match children.get(1).and_then(Node::token) {
        Some(token) if token.kind == TokenKind::Ident => Some(Identifier::from(&*token.text)),
        _ => None,
    }
}

/// Is this node a spread (`...expr`) element?
fn is_spread(node: &Node) -> bool {
    node.kind() == Some(NodeKind::UnaryExpr)
        && node
            .children()
            .first()
            .map_or(false, |c| c.is_token(TokenKind::Ellipsis))
}

/// The operator token of a binary node.
fn operator_of(node: &Node) -> Option<TokenKind> {
    node.children()
        .iter()
        .find_map(|child| child.token().map(|token| token.kind))
}

fn var_stmt_is_lexical(node: &Node) -> bool {
    matches!(
        node.children().first().and_then(Node::token).map(|t| t.kind),
        Some(TokenKind::Let) | Some(TokenKind::Const)
    )
}

/// Arguments crossing into host code: `undefined` becomes `null` and boxed
/// primitives unwrap.
fn to_host_call_arg(value: &Value) -> Value {
    match value {
        Value::Undefined => Value::Null,
        Value::Object(obj) => match &obj.borrow().kind {
            ObjectKind::Boxed(inner) => inner.clone(),
            _ => value.clone(),
        },
        _ => value.clone(),
    }
}

/// ECMA-style 32-bit signed truncation for bitwise operators.
#[must_use]
pub(crate) fn to_int32(n: f64) -> i32 {
    if !n.is_finite() || n == 0.0 {
        return 0;
    }
    let modulus = 4294967296.0;
    let mut m = n.trunc() % modulus;
    if m < 0.0 {
        m += modulus;
    }
    m as u32 as i32
}

#[must_use]
pub(crate) fn to_uint32(n: f64) -> u32 {
    to_int32(n) as u32
}

/// Arithmetic, bitwise and shift operators. `+` with any string operand is
/// concatenation; everything else is numeric and total.
pub(crate) fn binary_math(op: TokenKind, lhs: &Value, rhs: &Value) -> Value {
    match op {
        TokenKind::Plus => {
            let lhs_is_str = matches!(lhs, Value::Str(_))
                || matches!(lhs, Value::Object(o) if matches!(&o.borrow().kind, ObjectKind::Boxed(Value::Str(_))));
            let rhs_is_str = matches!(rhs, Value::Str(_))
                || matches!(rhs, Value::Object(o) if matches!(&o.borrow().kind, ObjectKind::Boxed(Value::Str(_))));
            if lhs_is_str || rhs_is_str {
                let mut out = lhs.to_display();
                out.push_str(&rhs.to_display());
                Value::Str(Shared::from(out))
            } else {
                Value::Number(lhs.to_number() + rhs.to_number())
            }
        }
        TokenKind::Minus => Value::Number(lhs.to_number() - rhs.to_number()),
        TokenKind::Star => Value::Number(lhs.to_number() * rhs.to_number()),
        TokenKind::Slash => Value::Number(lhs.to_number() / rhs.to_number()),
        TokenKind::Percent => Value::Number(lhs.to_number() % rhs.to_number()),
        TokenKind::Pow => Value::Number(lhs.to_number().powf(rhs.to_number())),
        TokenKind::BitAnd => {
            Value::Number(f64::from(to_int32(lhs.to_number()) & to_int32(rhs.to_number())))
        }
        TokenKind::BitOr => {
            Value::Number(f64::from(to_int32(lhs.to_number()) | to_int32(rhs.to_number())))
        }
        TokenKind::BitXor => {
            Value::Number(f64::from(to_int32(lhs.to_number()) ^ to_int32(rhs.to_number())))
        }
        TokenKind::Shl => {
            let shift = to_uint32(rhs.to_number()) & 31;
            Value::Number(f64::from(to_int32(lhs.to_number()).wrapping_shl(shift)))
        }
        TokenKind::Shr => {
            let shift = to_uint32(rhs.to_number()) & 31;
            Value::Number(f64::from(to_int32(lhs.to_number()).wrapping_shr(shift)))
        }
        TokenKind::UShr => {
            let shift = to_uint32(rhs.to_number()) & 31;
            Value::Number(f64::from(to_uint32(lhs.to_number()).wrapping_shr(shift)))
        }
        _ => Value::Undefined,
    }
}

/// Parse the text of a numeric literal token.
#[must_use]
pub(crate) fn parse_number_literal(text: &str) -> f64 {
    if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        return match u64::from_str_radix(hex, 16) {
            Ok(n) => n as f64,
            Err(_) => f64::NAN,
        };
    }
    text.parse::<f64>().unwrap_or(f64::NAN)
}

//! Lexical environments, bindings and the exit-state channel.
//!
//! One [`Environment`] exists per function context (and one for the global
//! scope). Nested blocks do not allocate environments: entering a block
//! pushes a scope *level*, and every binding records the level it was
//! introduced at. Leaving the level pops exactly those bindings. Closures
//! keep captured binding cells alive after their level is popped, which is
//! why bindings live in shared [`BindingRef`] cells rather than in the map
//! directly.

use ahash::AHashMap;

use crate::function::CallInfo;
use crate::value::Value;
use crate::{Identifier, Locked, Shared, StaticVec};

/// How a binding was declared.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum DeclKind {
    Var,
    Let,
    Const,
    /// Implicit global created by assignment to an undeclared name.
    None,
}

/// The flavor of a scope level.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum ScopeKind {
    Global,
    Function,
    Block,
    LoopInit,
    LoopBody,
    Catch,
}

/// A single variable cell.
pub struct Binding {
    pub value: Value,
    pub kind: DeclKind,
    /// `let`/`const` cells start uninitialized (the temporal dead zone);
    /// reads fail until the first write.
    pub initialized: bool,
    pub level: usize,
}

pub type BindingRef = Shared<Locked<Binding>>;

#[must_use]
pub fn new_binding(value: Value, kind: DeclKind, initialized: bool, level: usize) -> BindingRef {
    Shared::new(Locked::new(Binding {
        value,
        kind,
        initialized,
        level,
    }))
}

/// Non-local control flow, carried on the environment instead of as host
/// errors. Loops absorb `Break`/`Continue`, function calls absorb `Return`,
/// `try` absorbs `Throw`.
#[derive(Clone, Default)]
pub enum ExitState {
    #[default]
    Running,
    Break,
    Continue,
    Return(Value),
    Throw(Value),
}

impl ExitState {
    #[inline]
    #[must_use]
    pub const fn is_running(&self) -> bool {
        matches!(self, Self::Running)
    }
}

/// Errors from declaration bookkeeping; the evaluator raises them as thrown
/// error values.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum ScopeError {
    AlreadyDeclared,
}

struct Level {
    kind: ScopeKind,
    /// Names declared at this level, for pop-by-level on exit.
    names: StaticVec<Identifier>,
}

pub struct Environment {
    pub parent: Option<EnvRef>,
    /// Shadowing stack per name; the innermost binding is last.
    bindings: AHashMap<Identifier, Vec<BindingRef>>,
    levels: Vec<Level>,
    /// Cells captured by the function being executed in this environment.
    pub captured: AHashMap<Identifier, BindingRef>,
    /// The `this` receiver; [`None`] in arrow and global frames means the
    /// lookup continues in the parent chain.
    pub this: Option<Value>,
    pub call_info: Option<CallInfo>,
    pub exit: ExitState,
}

pub type EnvRef = Shared<Locked<Environment>>;

impl Environment {
    #[must_use]
    pub fn global() -> Self {
        Self::with_base(None, ScopeKind::Global)
    }

    #[must_use]
    pub fn function(parent: EnvRef) -> Self {
        Self::with_base(Some(parent), ScopeKind::Function)
    }

    fn with_base(parent: Option<EnvRef>, kind: ScopeKind) -> Self {
        Self {
            parent,
            bindings: AHashMap::new(),
            levels: vec![Level {
                kind,
                names: StaticVec::new(),
            }],
            captured: AHashMap::new(),
            this: None,
            call_info: None,
            exit: ExitState::Running,
        }
    }

    /// Current nesting depth; the base level is 1.
    #[inline]
    #[must_use]
    pub fn level(&self) -> usize {
        self.levels.len()
    }

    #[inline]
    #[must_use]
    pub fn scope_kind(&self) -> ScopeKind {
        self.levels.last().map_or(ScopeKind::Global, |l| l.kind)
    }

    /// Names declared at the current level (used for per-iteration loop
    /// bindings).
    #[must_use]
    pub fn level_names(&self) -> Vec<Identifier> {
        self.levels
            .last()
            .map(|level| level.names.to_vec())
            .unwrap_or_default()
    }

    /// Enter a nested scope level.
    pub fn enter_scope(&mut self, kind: ScopeKind) {
        self.levels.push(Level {
            kind,
            names: StaticVec::new(),
        });
    }

    /// Leave the current level, dropping every binding introduced there.
    /// Cells captured by closures stay alive through their own handles.
    pub fn exit_scope(&mut self) {
        let level = match self.levels.pop() {
            Some(level) => level,
            None => return,
        };
        for name in level.names {
            if let Some(stack) = self.bindings.get_mut(&name) {
                stack.pop();
                if stack.is_empty() {
                    self.bindings.remove(&name);
                }
            }
        }
    }

    /// The innermost binding for `name` in this environment only.
    #[must_use]
    pub fn local(&self, name: &str) -> Option<BindingRef> {
        self.bindings
            .get(name)
            .and_then(|stack| stack.last())
            .cloned()
    }

    /// Declare a `var`. It lands on the base (function/global) level no
    /// matter how deeply nested the statement is; re-declaring an existing
    /// `var` reuses the cell.
    pub fn declare_var(&mut self, name: &str, value: Value) -> Result<BindingRef, ScopeError> {
        if let Some(existing) = self.local(name) {
            let kind = existing.borrow().kind;
            match kind {
                DeclKind::Var | DeclKind::None => {
                    let mut cell = existing.borrow_mut();
                    cell.value = value;
                    cell.initialized = true;
                    drop(cell);
                    return Ok(existing);
                }
                DeclKind::Let | DeclKind::Const => return Err(ScopeError::AlreadyDeclared),
            }
        }
        let binding = new_binding(value, DeclKind::Var, true, 1);
        self.bindings
            .entry(Identifier::from(name))
            .or_default()
            .push(binding.clone());
        self.levels[0].names.push(Identifier::from(name));
        Ok(binding)
    }

    /// Create an implicit global for an assignment to an undeclared name.
    pub fn declare_implicit(&mut self, name: &str, value: Value) -> BindingRef {
        let binding = new_binding(value, DeclKind::None, true, 1);
        self.bindings
            .entry(Identifier::from(name))
            .or_default()
            .push(binding.clone());
        self.levels[0].names.push(Identifier::from(name));
        binding
    }

    /// Remove every binding for `name`. Returns whether one existed.
    pub fn remove(&mut self, name: &str) -> bool {
        self.bindings.remove(name).is_some()
    }

    /// Declare a `let`/`const` at the current level. Re-declaring the same
    /// name at the same level fails, except in loop scopes where each
    /// iteration re-declares the loop variable.
    pub fn declare_lexical(
        &mut self,
        name: &str,
        kind: DeclKind,
        value: Option<Value>,
    ) -> Result<BindingRef, ScopeError> {
        let level = self.level();
        let scope_kind = self.scope_kind();
        if let Some(existing) = self.local(name) {
            if existing.borrow().level == level
                && !matches!(scope_kind, ScopeKind::LoopInit | ScopeKind::LoopBody)
            {
                return Err(ScopeError::AlreadyDeclared);
            }
            if existing.borrow().level == level {
                // Per-iteration re-declaration: replace the top cell so the
                // previous iteration's capture stays intact.
                let initialized = value.is_some();
                let binding = new_binding(
                    value.unwrap_or(Value::Undefined),
                    kind,
                    initialized,
                    level,
                );
                if let Some(stack) = self.bindings.get_mut(name) {
                    stack.pop();
                    stack.push(binding.clone());
                }
                return Ok(binding);
            }
        }
        let initialized = value.is_some();
        let binding = new_binding(value.unwrap_or(Value::Undefined), kind, initialized, level);
        self.bindings
            .entry(Identifier::from(name))
            .or_default()
            .push(binding.clone());
        self.levels
            .last_mut()
            .expect("environment always has a base level")
            .names
            .push(Identifier::from(name));
        Ok(binding)
    }
}

/// Find the binding for `name`: local levels, then the executing closure's
/// captured cells, then the parent chain.
#[must_use]
pub fn lookup(env: &EnvRef, name: &str) -> Option<BindingRef> {
    let guard = env.borrow();
    if let Some(binding) = guard.local(name) {
        return Some(binding);
    }
    if let Some(binding) = guard.captured.get(name) {
        return Some(binding.clone());
    }
    let parent = guard.parent.clone();
    drop(guard);
    parent.and_then(|parent| lookup(&parent, name))
}

/// The global (root) environment of a chain.
#[must_use]
pub fn global_of(env: &EnvRef) -> EnvRef {
    let mut current = env.clone();
    loop {
        let parent = current.borrow().parent.clone();
        match parent {
            Some(parent) => current = parent,
            None => return current,
        }
    }
}

/// The `this` receiver visible from `env`: the nearest frame that bound one.
#[must_use]
pub fn this_of(env: &EnvRef) -> Value {
    let mut current = env.clone();
    loop {
        let (this, parent) = {
            let guard = current.borrow();
            (guard.this.clone(), guard.parent.clone())
        };
        if let Some(this) = this {
            return this;
        }
        match parent {
            Some(parent) => current = parent,
            None => return Value::Undefined,
        }
    }
}

/// Snapshot every `let`/`const` cell visible from `env`, innermost first,
/// for closure capture at function creation time.
#[must_use]
pub fn capture_visible(env: &EnvRef) -> AHashMap<Identifier, BindingRef> {
    let mut captured = AHashMap::new();
    let mut cursor = Some(env.clone());
    while let Some(current) = cursor {
        let guard = current.borrow();
        for (name, stack) in &guard.bindings {
            if captured.contains_key(name) {
                continue;
            }
            if let Some(top) = stack.last() {
                if matches!(top.borrow().kind, DeclKind::Let | DeclKind::Const) {
                    captured.insert(name.clone(), top.clone());
                }
            }
        }
        for (name, cell) in &guard.captured {
            captured.entry(name.clone()).or_insert_with(|| cell.clone());
        }
        cursor = guard.parent.clone();
    }
    captured
}

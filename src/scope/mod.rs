use std::collections::HashMap;

use crate::ast::Type;
use crate::ir::Value;


#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScopeError {
    #[error("exit scope when none exist")]
    NoScope,
}

/// What every stage knows about a variable name.
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub ty: Type,
    pub initialized: bool,
    /// Bound only by code generation: the global or stack slot holding it.
    pub storage: Option<Value>,
}

impl Variable {
    pub fn declared(ty: Type) -> Self {
        Variable {
            ty,
            initialized: false,
            storage: None,
        }
    }

    pub fn defined(ty: Type) -> Self {
        Variable {
            ty,
            initialized: true,
            storage: None,
        }
    }
}

/// Stack of name → record frames. The last frame is the innermost scope.
#[derive(Debug, Clone)]
pub struct ScopeStack<T> {
    frames: Vec<HashMap<String, T>>,
}

impl<T> Default for ScopeStack<T> {
    fn default() -> Self {
        ScopeStack { frames: vec![] }
    }
}

impl<T> ScopeStack<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// A stack that already holds the outermost (module) frame.
    pub fn with_global_scope() -> Self {
        let mut stack = Self::new();
        stack.create_scope();
        stack
    }

    pub fn create_scope(&mut self) {
        self.frames.push(HashMap::new());
    }

    pub fn exit_scope(&mut self) -> Result<HashMap<String, T>, ScopeError> {
        self.frames.pop().ok_or(ScopeError::NoScope)
    }

    /// Inserts into the innermost frame, returning the record it replaced.
    pub fn add_var_to_current_scope(
        &mut self,
        name: impl Into<String>,
        record: T,
    ) -> Result<Option<T>, ScopeError> {
        let frame = self.frames.last_mut().ok_or(ScopeError::NoScope)?;
        Ok(frame.insert(name.into(), record))
    }

    pub fn variable_lookup(&self, name: &str) -> Option<&T> {
        self.frames.iter().rev().find_map(|frame| frame.get(name))
    }

    pub fn variable_lookup_mut(&mut self, name: &str) -> Option<&mut T> {
        self.frames
            .iter_mut()
            .rev()
            .find_map(|frame| frame.get_mut(name))
    }

    pub fn variable_exists_in_current_scope(&self, name: &str) -> bool {
        self.frames
            .last()
            .is_some_and(|frame| frame.contains_key(name))
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// True while only the module frame is open.
    pub fn at_global_scope(&self) -> bool {
        self.frames.len() == 1
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionSignature {
    pub return_type: Type,
    pub params: Vec<Type>,
}

/// Every function defined in the compilation unit, by name. Not scoped.
#[derive(Debug, Clone, Default)]
pub struct FunctionTable {
    functions: HashMap<String, FunctionSignature>,
}

impl FunctionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false, leaving the table untouched, if the name is taken.
    pub fn add_function_defn(&mut self, name: impl Into<String>, sig: FunctionSignature) -> bool {
        let name = name.into();
        if self.functions.contains_key(&name) {
            return false;
        }
        self.functions.insert(name, sig);
        true
    }

    pub fn global_contains_func_defn(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&FunctionSignature> {
        self.functions.get(name)
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

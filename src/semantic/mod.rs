use crate::ast::{Expr, ExprKind, FunctionDefinition, Item, Location, Stmt, Type};
use crate::diagnostic::{CompileError, messages};
use crate::scope::{FunctionSignature, FunctionTable, ScopeStack, ScopeError, Variable};


/// Post-parse validation of a whole compilation unit.
///
/// Runs with its own scope stack and function table, independent of
/// whatever the parser tracked, and is the pass whose verdict counts.
pub struct Analyzer {
    scopes: ScopeStack<Variable>,
    functions: FunctionTable,
    enclosing: Option<(String, Type)>,
}

impl Default for Analyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl Analyzer {
    pub fn new() -> Self {
        Analyzer {
            scopes: ScopeStack::with_global_scope(),
            functions: FunctionTable::new(),
            enclosing: None,
        }
    }

    pub fn analyze_program(&mut self, items: &[Item]) -> Result<(), CompileError> {
        let mut previous: Option<&Stmt> = None;
        for item in items {
            match item {
                Item::Function(function) => {
                    self.analyze_function(function)?;
                    previous = None;
                }
                Item::Stmt(stmt) => {
                    self.check_else_placement(stmt, previous)?;
                    self.analyze_stmt(stmt)?;
                    previous = Some(stmt);
                }
            }
        }
        log::info!(
            "semantic analysis passed for {} item(s), {} function(s)",
            items.len(),
            self.functions.len()
        );
        Ok(())
    }

    pub fn analyze_function(&mut self, function: &FunctionDefinition) -> Result<(), CompileError> {
        log::debug!("analyzing function '{}'", function.name);

        if self.enclosing.is_some() {
            return Err(error(
                &function.loc,
                "functions can only be defined at the top level".to_string(),
            ));
        }

        let signature = FunctionSignature {
            return_type: function.return_type,
            params: function.param_types(),
        };
        if !self.functions.add_function_defn(function.name.clone(), signature) {
            return Err(error(
                &function.loc,
                messages::duplicate_function(&function.name),
            ));
        }

        self.scopes.create_scope();
        for param in &function.params {
            if param.ty == Type::Void {
                return Err(error(&param.loc, messages::void_variable(&param.name)));
            }
            if self.scopes.variable_exists_in_current_scope(&param.name) {
                return Err(error(&param.loc, messages::duplicate_parameter(&param.name)));
            }
            self.scopes
                .add_var_to_current_scope(param.name.clone(), Variable::defined(param.ty))
                .map_err(|err| scope_error(err, &param.loc))?;
        }

        self.enclosing = Some((function.name.clone(), function.return_type));
        let result = self.analyze_block(&function.body);
        self.enclosing = None;
        result?;

        self.scopes
            .exit_scope()
            .map_err(|err| scope_error(err, &function.loc))?;

        if function.return_type != Type::Void && !Stmt::always_returns(&function.body) {
            return Err(error(
                &function.loc,
                messages::missing_return(&function.name, function.return_type),
            ));
        }
        Ok(())
    }

    /// Statements of one block, in order. Opens no scope itself.
    fn analyze_block(&mut self, body: &[Stmt]) -> Result<(), CompileError> {
        let mut previous = None;
        for stmt in body {
            self.check_else_placement(stmt, previous)?;
            self.analyze_stmt(stmt)?;
            previous = Some(stmt);
        }
        Ok(())
    }

    fn check_else_placement(&self, stmt: &Stmt, previous: Option<&Stmt>) -> Result<(), CompileError> {
        if let Stmt::Else { loc, .. } = stmt {
            if !matches!(previous, Some(Stmt::If { .. })) {
                return Err(error(loc, "'else' without a matching 'if'".to_string()));
            }
        }
        Ok(())
    }

    pub fn analyze_stmt(&mut self, stmt: &Stmt) -> Result<(), CompileError> {
        match stmt {
            Stmt::VarDecl { name, ty, loc } => {
                self.check_new_variable(name, *ty, loc)?;
                self.scopes
                    .add_var_to_current_scope(name.clone(), Variable::declared(*ty))
                    .map_err(|err| scope_error(err, loc))?;
            }

            Stmt::VarDef {
                name,
                ty,
                value,
                loc,
            } => {
                self.check_new_variable(name, *ty, loc)?;
                self.scopes
                    .add_var_to_current_scope(name.clone(), Variable::declared(*ty))
                    .map_err(|err| scope_error(err, loc))?;

                self.analyze_expr(value)?;
                if value.ty() != *ty {
                    return Err(error(
                        &value.loc,
                        messages::definition_type_mismatch(name, *ty, value.ty()),
                    ));
                }
                if let Some(variable) = self.scopes.variable_lookup_mut(name) {
                    variable.initialized = true;
                }
            }

            Stmt::Assign { name, value, loc } => {
                let Some(declared) = self.scopes.variable_lookup(name).map(|var| var.ty) else {
                    return Err(error(loc, messages::undeclared_assignment(name)));
                };
                self.analyze_expr(value)?;
                if value.ty() != declared {
                    return Err(error(
                        &value.loc,
                        messages::assignment_type_mismatch(name, declared, value.ty()),
                    ));
                }
                if let Some(variable) = self.scopes.variable_lookup_mut(name) {
                    variable.initialized = true;
                }
            }

            Stmt::Return { value, loc } => {
                let Some((function, expected)) = self.enclosing.clone() else {
                    return Err(error(loc, messages::return_outside_function()));
                };
                if let Some(value) = value {
                    self.analyze_expr(value)?;
                    if value.ty() == Type::Void {
                        return Err(error(&value.loc, messages::void_return_value(&function)));
                    }
                }
                let found = value.as_ref().map_or(Type::Void, Expr::ty);
                if found != expected {
                    return Err(error(
                        loc,
                        messages::return_type_mismatch(&function, expected, found),
                    ));
                }
            }

            Stmt::Expr(expr) => self.analyze_expr(expr)?,

            Stmt::If {
                condition,
                body,
                loc,
            } => {
                if self.enclosing.is_none() {
                    return Err(error(
                        loc,
                        "'if' is only allowed inside a function body".to_string(),
                    ));
                }
                self.analyze_expr(condition)?;
                if condition.ty() != Type::Bool {
                    return Err(error(&condition.loc, messages::condition_type(condition.ty())));
                }
                self.analyze_scoped(body, loc)?;
            }

            Stmt::Else { body, loc } => self.analyze_scoped(body, loc)?,
        }
        Ok(())
    }

    fn analyze_scoped(&mut self, body: &[Stmt], loc: &Location) -> Result<(), CompileError> {
        self.scopes.create_scope();
        self.analyze_block(body)?;
        self.scopes
            .exit_scope()
            .map_err(|err| scope_error(err, loc))?;
        Ok(())
    }

    fn check_new_variable(&self, name: &str, ty: Type, loc: &Location) -> Result<(), CompileError> {
        if ty == Type::Void {
            return Err(error(loc, messages::void_variable(name)));
        }
        if self.scopes.variable_exists_in_current_scope(name) {
            return Err(error(loc, messages::redeclaration(name)));
        }
        Ok(())
    }

    pub fn analyze_expr(&self, expr: &Expr) -> Result<(), CompileError> {
        match &expr.kind {
            ExprKind::Int(_)
            | ExprKind::Float(_)
            | ExprKind::Char(_)
            | ExprKind::String(_)
            | ExprKind::Bool(_) => Ok(()),

            ExprKind::Identifier(name) => {
                let Some(variable) = self.scopes.variable_lookup(name) else {
                    return Err(error(&expr.loc, messages::undefined_variable(name)));
                };
                if !variable.initialized {
                    return Err(error(&expr.loc, messages::uninitialized_variable(name)));
                }
                if variable.ty != expr.ty() {
                    return Err(error(
                        &expr.loc,
                        messages::identifier_type(name, variable.ty, expr.ty()),
                    ));
                }
                Ok(())
            }

            ExprKind::Binary { op, lhs, rhs } => {
                self.analyze_expr(lhs)?;
                self.analyze_expr(rhs)?;
                if lhs.ty() != expr.ty() || rhs.ty() != expr.ty() {
                    return Err(error(
                        &expr.loc,
                        messages::binary_type_mismatch(*op, lhs.ty(), rhs.ty()),
                    ));
                }
                if expr.ty() == Type::Void {
                    return Err(error(&expr.loc, messages::void_operand(*op)));
                }
                Ok(())
            }

            ExprKind::Call { name, args } => {
                let Some(signature) = self.functions.get(name) else {
                    return Err(error(&expr.loc, messages::undefined_function(name)));
                };
                if args.len() != signature.params.len() {
                    return Err(error(
                        &expr.loc,
                        messages::argument_count(name, signature.params.len(), args.len()),
                    ));
                }
                for (index, (arg, expected)) in args.iter().zip(&signature.params).enumerate() {
                    self.analyze_expr(arg)?;
                    if arg.ty() != *expected {
                        return Err(error(
                            &arg.loc,
                            messages::argument_type(name, index, *expected, arg.ty()),
                        ));
                    }
                }
                if expr.ty() != signature.return_type {
                    return Err(error(
                        &expr.loc,
                        messages::identifier_type(name, signature.return_type, expr.ty()),
                    ));
                }
                Ok(())
            }
        }
    }

    pub fn functions(&self) -> &FunctionTable {
        &self.functions
    }
}

fn error(loc: &Location, message: String) -> CompileError {
    CompileError::semantic(message, loc.line, loc.range.clone())
}

fn scope_error(err: ScopeError, loc: &Location) -> CompileError {
    CompileError::scope(err, loc.line, loc.range.clone())
}

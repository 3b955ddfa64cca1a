pub mod expression;

#[cfg(test)]
pub mod test;

use crate::ast::{Expr, ExprKind, FunctionDefinition, Item, Location, Stmt, Type};
use crate::diagnostic::CompileError;
use crate::ir::{IRBuilder, IRType, IRValidator, Instruction, Module, Terminator, Value};
use crate::scope::{ScopeError, ScopeStack, Variable};

/// Function that runs the module-scope statements which could not be
/// folded into global initializers. Registered as a module constructor so
/// it runs before `main`.
pub const MODULE_INIT: &str = "__pyrx_module_init";

/// Lowers a validated tree into an IR `Module`.
///
/// Module-scope variables become globals, function locals become entry
/// block allocas; both are resolved through the generator's own scope stack.
pub struct CodeGenerator {
    builder: IRBuilder,
    scopes: ScopeStack<Variable>,
    // function and block index where module-scope code is appended
    init: Option<(usize, usize)>,
    // return type of the function being lowered
    returns: Option<Type>,
}

impl CodeGenerator {
    pub fn new(module_name: impl Into<String>) -> Self {
        CodeGenerator {
            builder: IRBuilder::new(module_name),
            scopes: ScopeStack::with_global_scope(),
            init: None,
            returns: None,
        }
    }

    /// Generates the whole unit. Nothing is handed back unless the finished
    /// module also passes `IRValidator`.
    pub fn generate(mut self, items: &[Item]) -> Result<Module, CompileError> {
        // First pass: function signatures, so globals can avoid their names
        for item in items {
            if let Item::Function(function) = item {
                self.declare_function(function)?;
            }
        }

        // Second pass: bodies and module-scope statements in source order
        for item in items {
            match item {
                Item::Function(function) => self.generate_function(function)?,
                Item::Stmt(stmt) => self.generate_global_stmt(stmt)?,
            }
        }

        if let Some((func_idx, block_idx)) = self.init {
            self.builder.position_at(func_idx, block_idx);
            self.builder.set_terminator(Terminator::Ret {
                value: None,
                ty: IRType::Void,
                span: 0..0,
            });
            self.builder.clear_position();
        }

        let module = self.builder.finish();
        if let Err(errors) = IRValidator::validate_module(&module) {
            return Err(CompileError::codegen(
                format!("generated IR is invalid: {}", errors.join("; ")),
                0,
                0..0,
            ));
        }

        log::info!(
            "generated module '{}': {} global(s), {} function(s)",
            module.name,
            module.globals.len(),
            module.functions.len()
        );
        Ok(module)
    }

    fn declare_function(&mut self, function: &FunctionDefinition) -> Result<(), CompileError> {
        if function.name == MODULE_INIT {
            return Err(error(
                &function.loc,
                format!("function name '{MODULE_INIT}' is reserved"),
            ));
        }
        let params = function
            .params
            .iter()
            .map(|param| (param.name.clone(), IRType::from(param.ty)))
            .collect();
        self.builder
            .declare_function(&function.name, params, function.return_type.into());
        Ok(())
    }

    fn generate_function(&mut self, function: &FunctionDefinition) -> Result<(), CompileError> {
        let Some(func_idx) = self.builder.function_index(&function.name) else {
            return Err(error(
                &function.loc,
                format!("function '{}' was never declared", function.name),
            ));
        };

        self.builder.position_at(func_idx, 0);
        let entry = self.create_block("entry", &function.loc)?;
        self.builder.set_current_block(entry);
        self.scopes.create_scope();

        for param in &function.params {
            let ty = IRType::from(param.ty);
            let slot = self.builder.new_slot(&param.name);
            self.builder
                .add_entry_alloca(slot.clone(), ty.clone(), param.loc.range.clone());
            self.builder.add_instruction(Instruction::Store {
                value: Value::Argument(param.name.clone()),
                ptr: Value::Register(slot.clone()),
                ty,
                span: param.loc.range.clone(),
            });
            self.bind(&param.name, param.ty, true, Value::Register(slot), &param.loc)?;
        }

        self.returns = Some(function.return_type);
        let result = self.generate_block(&function.body);
        self.returns = None;
        result?;

        // a non-void function can only fall off the end on a path that
        // analysis proved unreachable
        if !self.builder.is_terminated() {
            let span = function.loc.range.end..function.loc.range.end;
            if function.return_type == Type::Void {
                self.builder.set_terminator(Terminator::Ret {
                    value: None,
                    ty: IRType::Void,
                    span,
                });
            } else {
                self.builder
                    .set_terminator(Terminator::Unreachable { span });
            }
        }

        self.scopes
            .exit_scope()
            .map_err(|err| scope_error(err, &function.loc))?;
        self.builder.clear_position();
        log::debug!("lowered function '{}'", function.name);
        Ok(())
    }

    fn generate_global_stmt(&mut self, stmt: &Stmt) -> Result<(), CompileError> {
        match stmt {
            Stmt::VarDecl { name, ty, loc } => {
                let global = self.add_zeroed_global(name, *ty, loc)?;
                self.bind(name, *ty, false, global, loc)?;
            }

            Stmt::VarDef {
                name,
                ty,
                value,
                loc,
            } => {
                let global = if value.is_literal() {
                    let constant = self.generate_expr(value)?;
                    let global_name = self.global_name(name);
                    self.builder
                        .add_global(&global_name, IRType::from(*ty), constant)
                } else {
                    let global = self.add_zeroed_global(name, *ty, loc)?;
                    self.enter_init(loc)?;
                    let result = self.generate_expr(value);
                    if let Ok(result) = &result {
                        self.builder.add_instruction(Instruction::Store {
                            value: result.clone(),
                            ptr: global.clone(),
                            ty: IRType::from(*ty),
                            span: loc.range.clone(),
                        });
                    }
                    self.leave_init();
                    result?;
                    global
                };
                self.bind(name, *ty, true, global, loc)?;
            }

            Stmt::Assign { .. } | Stmt::Expr(_) => {
                self.enter_init(stmt.loc())?;
                let result = self.generate_stmt(stmt);
                self.leave_init();
                result?;
            }

            Stmt::Return { loc, .. } | Stmt::If { loc, .. } | Stmt::Else { loc, .. } => {
                return Err(error(loc, "statement is not allowed at module scope".to_string()));
            }
        }
        Ok(())
    }

    /// Statements of one block. An `If` consumes the `Else` right after it.
    fn generate_block(&mut self, body: &[Stmt]) -> Result<(), CompileError> {
        let mut index = 0;
        while index < body.len() {
            let stmt = &body[index];
            index += 1;

            if self.builder.is_terminated() {
                log::warn!("unreachable statement on line {}", stmt.loc().line);
                let dead = self.create_block("dead", stmt.loc())?;
                self.builder.set_current_block(dead);
            }

            match stmt {
                Stmt::If {
                    condition,
                    body: then_body,
                    loc,
                } => {
                    let else_body = match body.get(index) {
                        Some(Stmt::Else { body, .. }) => {
                            index += 1;
                            Some(body.as_slice())
                        }
                        _ => None,
                    };
                    self.generate_if_else(condition, then_body, else_body, loc)?;
                }
                Stmt::Else { loc, .. } => {
                    return Err(error(loc, "'else' without a matching 'if'".to_string()));
                }
                _ => self.generate_stmt(stmt)?,
            }
        }
        Ok(())
    }

    fn generate_stmt(&mut self, stmt: &Stmt) -> Result<(), CompileError> {
        match stmt {
            Stmt::VarDecl { name, ty, loc } => {
                let slot = self.add_local(name, *ty, loc);
                self.bind(name, *ty, false, slot, loc)?;
            }

            Stmt::VarDef {
                name,
                ty,
                value,
                loc,
            } => {
                let value = self.generate_expr(value)?;
                let slot = self.add_local(name, *ty, loc);
                self.builder.add_instruction(Instruction::Store {
                    value,
                    ptr: slot.clone(),
                    ty: IRType::from(*ty),
                    span: loc.range.clone(),
                });
                self.bind(name, *ty, true, slot, loc)?;
            }

            Stmt::Assign { name, value, loc } => {
                let value = self.generate_expr(value)?;
                let (ty, storage) = self.storage(name, loc)?;
                self.builder.add_instruction(Instruction::Store {
                    value,
                    ptr: storage,
                    ty: IRType::from(ty),
                    span: loc.range.clone(),
                });
                if let Some(variable) = self.scopes.variable_lookup_mut(name) {
                    variable.initialized = true;
                }
            }

            Stmt::Return { value, loc } => {
                let Some(returns) = self.returns else {
                    return Err(error(loc, "return outside of a function".to_string()));
                };
                let value = match value {
                    Some(expr) => Some(self.generate_expr(expr)?),
                    None => None,
                };
                self.builder.set_terminator(Terminator::Ret {
                    value,
                    ty: IRType::from(returns),
                    span: loc.range.clone(),
                });
            }

            Stmt::Expr(expr) => match &expr.kind {
                ExprKind::Call { name, args } => {
                    self.generate_call(name, args, expr.ty(), &expr.loc)?;
                }
                _ => {
                    self.generate_expr(expr)?;
                }
            },

            Stmt::If {
                condition,
                body,
                loc,
            } => self.generate_if_else(condition, body, None, loc)?,

            Stmt::Else { loc, .. } => {
                return Err(error(loc, "'else' without a matching 'if'".to_string()));
            }
        }
        Ok(())
    }

    fn generate_if_else(
        &mut self,
        condition: &Expr,
        then_body: &[Stmt],
        else_body: Option<&[Stmt]>,
        loc: &Location,
    ) -> Result<(), CompileError> {
        let cond = self.generate_expr(condition)?;

        let then_label = self.builder.new_label("then");
        let else_label = else_body.map(|_| self.builder.new_label("else"));
        let merge_label = self.builder.new_label("merge");

        self.builder.set_terminator(Terminator::CondBr {
            cond,
            then_label: then_label.clone(),
            else_label: else_label.clone().unwrap_or_else(|| merge_label.clone()),
            span: condition.loc.range.clone(),
        });

        // Then block
        let then_block = self.create_labeled_block(then_label, loc)?;
        self.builder.set_current_block(then_block);
        self.generate_scoped(then_body, loc)?;
        self.branch_to(&merge_label, loc);

        // Else block
        if let (Some(label), Some(body)) = (else_label, else_body) {
            let else_block = self.create_labeled_block(label, loc)?;
            self.builder.set_current_block(else_block);
            self.generate_scoped(body, loc)?;
            self.branch_to(&merge_label, loc);
        }

        // Merge block
        let merge_block = self.create_labeled_block(merge_label, loc)?;
        self.builder.set_current_block(merge_block);
        Ok(())
    }

    fn generate_scoped(&mut self, body: &[Stmt], loc: &Location) -> Result<(), CompileError> {
        self.scopes.create_scope();
        self.generate_block(body)?;
        self.scopes
            .exit_scope()
            .map_err(|err| scope_error(err, loc))?;
        Ok(())
    }

    fn branch_to(&mut self, label: &str, loc: &Location) {
        if !self.builder.is_terminated() {
            self.builder.set_terminator(Terminator::Br {
                label: label.to_string(),
                span: loc.range.clone(),
            });
        }
    }

    fn create_block(&mut self, prefix: &str, loc: &Location) -> Result<usize, CompileError> {
        let label = if prefix == "entry" {
            prefix.to_string()
        } else {
            self.builder.new_label(prefix)
        };
        self.create_labeled_block(label, loc)
    }

    fn create_labeled_block(&mut self, label: String, loc: &Location) -> Result<usize, CompileError> {
        self.builder
            .create_block(label)
            .ok_or_else(|| error(loc, "no function to add a block to".to_string()))
    }

    /// Positions the builder at the end of the module init function,
    /// creating it on first use.
    fn enter_init(&mut self, loc: &Location) -> Result<(), CompileError> {
        let (func_idx, block_idx) = match self.init {
            Some(position) => position,
            None => {
                let func_idx = self
                    .builder
                    .declare_function(MODULE_INIT, vec![], IRType::Void);
                self.builder.position_at(func_idx, 0);
                let entry = self.create_block("entry", loc)?;
                self.builder.add_constructor(MODULE_INIT);
                self.init = Some((func_idx, entry));
                (func_idx, entry)
            }
        };
        self.builder.position_at(func_idx, block_idx);
        Ok(())
    }

    fn leave_init(&mut self) {
        if let (Some(func_idx), Some(block_idx)) =
            (self.builder.current_function(), self.builder.current_block())
        {
            self.init = Some((func_idx, block_idx));
        }
        self.builder.clear_position();
    }

    /// Globals share a namespace with functions in the output, so a
    /// variable named like a function gets a suffix.
    fn global_name(&self, name: &str) -> String {
        if self.builder.function_index(name).is_some() {
            format!("{name}.var")
        } else {
            name.to_string()
        }
    }

    fn add_zeroed_global(&mut self, name: &str, ty: Type, loc: &Location) -> Result<Value, CompileError> {
        let ir_ty = IRType::from(ty);
        let Some(zero) = ir_ty.zero() else {
            return Err(error(loc, format!("cannot store a value of type {ty}")));
        };
        let global_name = self.global_name(name);
        Ok(self
            .builder
            .add_global(&global_name, ir_ty, Value::Constant(zero)))
    }

    fn add_local(&mut self, name: &str, ty: Type, loc: &Location) -> Value {
        let slot = self.builder.new_slot(name);
        self.builder
            .add_entry_alloca(slot.clone(), IRType::from(ty), loc.range.clone());
        Value::Register(slot)
    }

    fn bind(
        &mut self,
        name: &str,
        ty: Type,
        initialized: bool,
        storage: Value,
        loc: &Location,
    ) -> Result<(), CompileError> {
        let variable = Variable {
            ty,
            initialized,
            storage: Some(storage),
        };
        self.scopes
            .add_var_to_current_scope(name, variable)
            .map_err(|err| scope_error(err, loc))?;
        Ok(())
    }

    /// Declared type and bound storage of a variable in scope.
    fn storage(&self, name: &str, loc: &Location) -> Result<(Type, Value), CompileError> {
        match self.scopes.variable_lookup(name) {
            Some(Variable {
                ty,
                storage: Some(storage),
                ..
            }) => Ok((*ty, storage.clone())),
            _ => Err(error(loc, format!("no storage bound for variable '{name}'"))),
        }
    }
}

fn error(loc: &Location, message: String) -> CompileError {
    CompileError::codegen(message, loc.line, loc.range.clone())
}

fn scope_error(err: ScopeError, loc: &Location) -> CompileError {
    CompileError::scope(err, loc.line, loc.range.clone())
}

use crate::ast::{Location, Stmt, Type};
use crate::diagnostic::{CompileError, messages};
use crate::lexer::Token;
use crate::parser::Parser;
use crate::scope::Variable;

impl Parser<'_> {
    /// `<type> <name>` followed by either `;` or `= <expr>;`.
    pub fn parse_var_decl_defn(&mut self) -> Result<Stmt, CompileError> {
        let loc = self.location();
        let ty = self.parse_type()?;
        let name_loc = self.location();
        let name = self.expect_identifier()?;

        if ty == Type::Void {
            return Err(self.error_at(&name_loc, messages::void_variable(&name)));
        }

        match self.current {
            Token::Assign => self.parse_var_defn(name, ty, loc),
            Token::Semicolon => self.parse_var_decl(name, ty, loc),
            _ => Err(self.error(format!(
                "expected definition or declaration, found {}",
                self.current
            ))),
        }
    }

    pub fn parse_var_decl(
        &mut self,
        name: String,
        ty: Type,
        loc: Location,
    ) -> Result<Stmt, CompileError> {
        let end = self.expect_semicolon()?;
        self.symbols
            .add_var_to_current_scope(name.clone(), Variable::declared(ty))
            .map_err(|err| self.scope_error(err))?;

        log::debug!("parsed declaration of '{name}': {ty}");
        Ok(Stmt::VarDecl {
            name,
            ty,
            loc: loc.to(&end),
        })
    }

    pub fn parse_var_defn(
        &mut self,
        name: String,
        ty: Type,
        loc: Location,
    ) -> Result<Stmt, CompileError> {
        self.expect(Token::Assign)?;

        // visible but uninitialized while its own initializer is parsed
        self.symbols
            .add_var_to_current_scope(name.clone(), Variable::declared(ty))
            .map_err(|err| self.scope_error(err))?;

        let value = self.parse_expression()?;
        if value.ty() != ty {
            return Err(self.error_at(
                &value.loc,
                messages::definition_type_mismatch(&name, ty, value.ty()),
            ));
        }
        let end = self.expect_semicolon()?;

        if let Some(variable) = self.symbols.variable_lookup_mut(&name) {
            variable.initialized = true;
        }

        log::debug!("parsed definition of '{name}': {ty}");
        Ok(Stmt::VarDef {
            name,
            ty,
            value,
            loc: loc.to(&end),
        })
    }

    /// Called with the target name already consumed and `=` current.
    pub fn parse_var_assign(&mut self, name: String, loc: Location) -> Result<Stmt, CompileError> {
        let Some(declared) = self.symbols.variable_lookup(&name).map(|var| var.ty) else {
            return Err(self.error_at(&loc, messages::undeclared_assignment(&name)));
        };

        self.expect(Token::Assign)?;
        let value = self.parse_expression()?;
        if value.ty() != declared {
            return Err(self.error_at(
                &value.loc,
                messages::assignment_type_mismatch(&name, declared, value.ty()),
            ));
        }
        let end = self.expect_semicolon()?;

        if let Some(variable) = self.symbols.variable_lookup_mut(&name) {
            variable.initialized = true;
        }

        log::debug!("parsed assignment to '{name}'");
        Ok(Stmt::Assign {
            name,
            value,
            loc: loc.to(&end),
        })
    }
}

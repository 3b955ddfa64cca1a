use crate::ast::{FunctionDefinition, Location, Param, Stmt, Type};
use crate::diagnostic::{CompileError, messages};
use crate::lexer::Token;
use crate::parser::Parser;
use crate::scope::{FunctionSignature, Variable};

impl Parser<'_> {
    /// `def <type> name(<type> a, ...) { ... }`
    pub fn parse_function(&mut self) -> Result<FunctionDefinition, CompileError> {
        let loc = self.expect(Token::KeywordDef)?;
        let return_type = self.parse_type()?;
        let name_loc = self.location();
        let name = self.expect_identifier()?;

        if self.functions.global_contains_func_defn(&name) {
            return Err(self.error_at(&name_loc, messages::duplicate_function(&name)));
        }

        self.expect(Token::LParen)?;
        let mut params: Vec<Param> = vec![];
        if self.current != Token::RParen {
            loop {
                let ty = self.parse_type()?;
                let param_loc = self.location();
                let param = self.expect_identifier()?;
                if ty == Type::Void {
                    return Err(self.error_at(&param_loc, messages::void_variable(&param)));
                }
                if params.iter().any(|p| p.name == param) {
                    return Err(self.error_at(&param_loc, messages::duplicate_parameter(&param)));
                }
                params.push(Param {
                    name: param,
                    ty,
                    loc: param_loc,
                });

                if self.current != Token::Comma {
                    break;
                }
                self.advance()?;
            }
        }
        self.expect(Token::RParen)?;

        // registered before the body so the function can call itself
        self.functions.add_function_defn(
            name.clone(),
            FunctionSignature {
                return_type,
                params: params.iter().map(|p| p.ty).collect(),
            },
        );

        self.expect(Token::LBrace)?;
        self.symbols.create_scope();
        for param in &params {
            self.symbols
                .add_var_to_current_scope(param.name.clone(), Variable::defined(param.ty))
                .map_err(|err| self.scope_error(err))?;
        }

        self.enclosing = Some((name.clone(), return_type));
        let body = self.parse_block_contents();
        self.enclosing = None;
        let body = body?;

        let end = self.expect(Token::RBrace)?;
        self.symbols
            .exit_scope()
            .map_err(|err| self.scope_error(err))?;

        Ok(FunctionDefinition {
            name,
            return_type,
            params,
            body,
            loc: loc.to(&end),
        })
    }

    pub fn parse_return(&mut self) -> Result<Stmt, CompileError> {
        let loc = self.expect(Token::KeywordReturn)?;
        let Some((function, expected)) = self.enclosing.clone() else {
            return Err(self.error_at(&loc, messages::return_outside_function()));
        };

        let value = if self.current == Token::Semicolon {
            None
        } else {
            Some(self.parse_expression()?)
        };

        if let Some(value) = value.as_ref().filter(|value| value.ty() == Type::Void) {
            return Err(self.error_at(&value.loc, messages::void_return_value(&function)));
        }
        let found = value.as_ref().map_or(Type::Void, |value| value.ty());
        if found != expected {
            let at = value.as_ref().map_or(&loc, |value| &value.loc);
            return Err(self.error_at(at, messages::return_type_mismatch(&function, expected, found)));
        }

        let end = self.expect_semicolon()?;
        Ok(Stmt::Return {
            value,
            loc: loc.to(&end),
        })
    }

    /// `if (<cond>) { ... }` plus any `else` / `else if` chain, appended to
    /// `out` as sibling statements.
    pub fn parse_if(&mut self, out: &mut Vec<Stmt>) -> Result<(), CompileError> {
        let loc = self.expect(Token::KeywordIf)?;
        self.expect(Token::LParen)?;
        let condition = self.parse_expression()?;
        if condition.ty() != Type::Bool {
            return Err(self.error_at(&condition.loc, messages::condition_type(condition.ty())));
        }
        self.expect(Token::RParen)?;
        let (body, end) = self.parse_block()?;
        out.push(Stmt::If {
            condition,
            body,
            loc: loc.to(&end),
        });

        if self.current == Token::KeywordElse {
            let else_loc = self.expect(Token::KeywordElse)?;
            if self.current == Token::KeywordIf {
                let mut body = vec![];
                self.parse_if(&mut body)?;
                let end = body.last().map(|stmt| stmt.loc().clone()).unwrap_or_default();
                out.push(Stmt::Else {
                    body,
                    loc: else_loc.to(&end),
                });
            } else {
                let (body, end) = self.parse_block()?;
                out.push(Stmt::Else {
                    body,
                    loc: else_loc.to(&end),
                });
            }
        }
        Ok(())
    }

    /// `{ ... }` in a scope of its own. Returns the location of the `}`.
    fn parse_block(&mut self) -> Result<(Vec<Stmt>, Location), CompileError> {
        self.expect(Token::LBrace)?;
        self.symbols.create_scope();
        let body = self.parse_block_contents()?;
        let end = self.expect(Token::RBrace)?;
        self.symbols
            .exit_scope()
            .map_err(|err| self.scope_error(err))?;
        Ok((body, end))
    }

    /// Statements up to, not including, the closing `}`.
    fn parse_block_contents(&mut self) -> Result<Vec<Stmt>, CompileError> {
        let mut body = vec![];
        loop {
            match self.current {
                Token::RBrace => return Ok(body),
                Token::Eof => {
                    return Err(self.error("expected '}' but reached end of file"));
                }
                _ => self.parse_statement(&mut body)?,
            }
        }
    }
}

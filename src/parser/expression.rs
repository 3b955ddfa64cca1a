use crate::ast::{BinOp, Expr, Location, Type};
use crate::diagnostic::{CompileError, messages};
use crate::lexer::Token;
use crate::parser::Parser;

/// Binding strength of each binary operator. Higher binds tighter; every
/// operator is left-associative.
pub const PRECEDENCE: [(BinOp, u8); 4] = [
    (BinOp::Add, 10),
    (BinOp::Sub, 10),
    (BinOp::Mul, 20),
    (BinOp::Div, 20),
];

pub fn precedence(op: BinOp) -> u8 {
    PRECEDENCE
        .iter()
        .find(|(candidate, _)| *candidate == op)
        .map(|(_, prec)| *prec)
        .unwrap_or(0)
}

pub fn binary_operator(token: &Token) -> Option<BinOp> {
    match token {
        Token::Plus => Some(BinOp::Add),
        Token::Minus => Some(BinOp::Sub),
        Token::Mul => Some(BinOp::Mul),
        Token::Div => Some(BinOp::Div),
        _ => None,
    }
}

impl Parser<'_> {
    pub fn parse_expression(&mut self) -> Result<Expr, CompileError> {
        let lhs = self.parse_primary()?;
        self.parse_binary_rhs(0, lhs)
    }

    /// Precedence climbing: folds `<op> <primary>` pairs into `lhs` for as
    /// long as the next operator binds at least as tightly as `min_prec`.
    pub(super) fn parse_binary_rhs(&mut self, min_prec: u8, mut lhs: Expr) -> Result<Expr, CompileError> {
        while let Some(op) = binary_operator(&self.current) {
            let prec = precedence(op);
            if prec < min_prec {
                break;
            }
            let op_loc = self.location();
            self.advance()?;

            let mut rhs = self.parse_primary()?;
            while let Some(next) = binary_operator(&self.current) {
                if precedence(next) <= prec {
                    break;
                }
                rhs = self.parse_binary_rhs(prec + 1, rhs)?;
            }

            if lhs.ty() != rhs.ty() {
                return Err(self.error_at(
                    &op_loc,
                    messages::binary_type_mismatch(op, lhs.ty(), rhs.ty()),
                ));
            }
            let ty = lhs.ty();
            if ty == Type::Void {
                return Err(self.error_at(&op_loc, messages::void_operand(op)));
            }
            lhs = Expr::binary(op, lhs, rhs, ty);
        }
        Ok(lhs)
    }

    pub fn parse_primary(&mut self) -> Result<Expr, CompileError> {
        match &self.current {
            Token::IntVal(_) => self.parse_int(),
            Token::FloatVal(_) => self.parse_float(),
            Token::CharVal(_) => self.parse_char(),
            Token::StringVal(_) => self.parse_string(),
            Token::BoolVal(_) => self.parse_bool(),
            Token::Identifier(_) => self.parse_identifier_expr(),
            Token::LParen => self.parse_paren(),
            _ => Err(self.error(format!("expected an expression, found {}", self.current))),
        }
    }

    fn parse_int(&mut self) -> Result<Expr, CompileError> {
        let Token::IntVal(value) = self.current else {
            return Err(self.error("expected an integer literal"));
        };
        let expr = Expr::int(value, self.location());
        self.advance()?;
        Ok(expr)
    }

    fn parse_float(&mut self) -> Result<Expr, CompileError> {
        let Token::FloatVal(value) = self.current else {
            return Err(self.error("expected a float literal"));
        };
        let expr = Expr::float(value, self.location());
        self.advance()?;
        Ok(expr)
    }

    fn parse_char(&mut self) -> Result<Expr, CompileError> {
        let Token::CharVal(value) = self.current else {
            return Err(self.error("expected a character literal"));
        };
        let expr = Expr::char(value, self.location());
        self.advance()?;
        Ok(expr)
    }

    fn parse_string(&mut self) -> Result<Expr, CompileError> {
        let Token::StringVal(value) = &self.current else {
            return Err(self.error("expected a string literal"));
        };
        let expr = Expr::string(value.clone(), self.location());
        self.advance()?;
        Ok(expr)
    }

    fn parse_bool(&mut self) -> Result<Expr, CompileError> {
        let Token::BoolVal(value) = self.current else {
            return Err(self.error("expected a boolean literal"));
        };
        let expr = Expr::bool(value, self.location());
        self.advance()?;
        Ok(expr)
    }

    fn parse_paren(&mut self) -> Result<Expr, CompileError> {
        self.expect(Token::LParen)?;
        let expr = self.parse_expression()?;
        self.expect(Token::RParen)?;
        Ok(expr)
    }

    pub fn parse_identifier_expr(&mut self) -> Result<Expr, CompileError> {
        let loc = self.location();
        let name = self.expect_identifier()?;
        self.parse_identifier_tail(name, loc)
    }

    /// Finishes an identifier whose token is already consumed: a call if
    /// `(` follows, a variable read otherwise.
    pub(super) fn parse_identifier_tail(
        &mut self,
        name: String,
        loc: Location,
    ) -> Result<Expr, CompileError> {
        if self.current == Token::LParen {
            return self.parse_call(name, loc);
        }

        let Some(variable) = self.symbols.variable_lookup(&name) else {
            return Err(self.error_at(&loc, messages::undefined_variable(&name)));
        };
        if !variable.initialized {
            return Err(self.error_at(&loc, messages::uninitialized_variable(&name)));
        }
        Ok(Expr::identifier(name, variable.ty, loc))
    }

    fn parse_call(&mut self, name: String, loc: Location) -> Result<Expr, CompileError> {
        let Some(signature) = self.functions.get(&name).cloned() else {
            return Err(self.error_at(&loc, messages::undefined_function(&name)));
        };

        self.expect(Token::LParen)?;
        let mut args = vec![];
        if self.current != Token::RParen {
            loop {
                args.push(self.parse_expression()?);
                if self.current != Token::Comma {
                    break;
                }
                self.advance()?;
            }
        }
        let end = self.expect(Token::RParen)?;

        if args.len() != signature.params.len() {
            return Err(self.error_at(
                &loc,
                messages::argument_count(&name, signature.params.len(), args.len()),
            ));
        }
        for (index, (arg, expected)) in args.iter().zip(&signature.params).enumerate() {
            if arg.ty() != *expected {
                return Err(self.error_at(
                    &arg.loc,
                    messages::argument_type(&name, index, *expected, arg.ty()),
                ));
            }
        }

        Ok(Expr::call(name, args, signature.return_type, loc.to(&end)))
    }
}

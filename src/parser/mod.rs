pub mod expression;
pub mod function;
pub mod variable;

#[cfg(test)]
pub mod test;

use crate::ast::{Item, Location, Stmt, Type};
use crate::diagnostic::CompileError;
use crate::lexer::{Lexer, Token};
use crate::scope::{FunctionTable, ScopeStack, Variable};

use std::ops::Range;

/// Recursive-descent parser over a single token of lookahead.
///
/// The parser keeps its own scope stack and function table so it can turn
/// away obviously broken programs while building the tree. Those checks
/// are a fast path; `semantic::Analyzer` re-checks the finished tree.
pub struct Parser<'src> {
    lexer: Lexer<'src>,
    current: Token,
    span: Range<usize>,
    line: usize,
    symbols: ScopeStack<Variable>,
    functions: FunctionTable,
    // name and return type of the function whose body is being parsed
    enclosing: Option<(String, Type)>,
}

impl<'src> Parser<'src> {
    pub fn new(lexer: Lexer<'src>) -> Result<Self, CompileError> {
        Self::with_context(lexer, ScopeStack::with_global_scope(), FunctionTable::new())
    }

    /// Starts from caller-provided tables instead of empty ones.
    pub fn with_context(
        lexer: Lexer<'src>,
        symbols: ScopeStack<Variable>,
        functions: FunctionTable,
    ) -> Result<Self, CompileError> {
        let mut parser = Parser {
            lexer,
            current: Token::Eof,
            span: 0..0,
            line: 1,
            symbols,
            functions,
            enclosing: None,
        };
        parser.advance()?;
        Ok(parser)
    }

    pub fn parse_program(&mut self) -> Result<Vec<Item>, CompileError> {
        let mut items = vec![];
        loop {
            match self.current {
                Token::Eof => break,
                Token::KeywordDef => {
                    let function = self.parse_function()?;
                    log::debug!("parsed function '{}'", function.name);
                    items.push(Item::Function(function));
                }
                _ => {
                    let mut stmts = vec![];
                    self.parse_statement(&mut stmts)?;
                    items.extend(stmts.into_iter().map(Item::Stmt));
                }
            }
        }
        log::info!("parsed {} top-level item(s)", items.len());
        Ok(items)
    }

    /// Parses one statement, appending what it produced to `out`. An `if`
    /// followed by `else` produces two sibling statements, a lone `;` none.
    pub fn parse_statement(&mut self, out: &mut Vec<Stmt>) -> Result<(), CompileError> {
        match &self.current {
            token if token.is_type_keyword() => out.push(self.parse_var_decl_defn()?),
            Token::Identifier(_) => out.push(self.parse_identifier_statement()?),
            Token::KeywordReturn => out.push(self.parse_return()?),
            Token::KeywordIf => {
                if self.enclosing.is_none() {
                    return Err(self.error("'if' is only allowed inside a function body"));
                }
                self.parse_if(out)?;
            }
            Token::KeywordElse => {
                return Err(self.error("'else' without a matching 'if'"));
            }
            Token::KeywordDef => {
                return Err(self.error("functions can only be defined at the top level"));
            }
            Token::KeywordFor | Token::KeywordWhile | Token::KeywordClass | Token::KeywordGraph => {
                return Err(self.error(format!("{} is not supported", self.current)));
            }
            Token::Semicolon => self.advance()?,
            Token::IntVal(_)
            | Token::FloatVal(_)
            | Token::CharVal(_)
            | Token::StringVal(_)
            | Token::BoolVal(_)
            | Token::LParen => {
                let expr = self.parse_expression()?;
                self.expect_semicolon()?;
                out.push(Stmt::Expr(expr));
            }
            _ => {
                return Err(self.error(format!("expected a statement, found {}", self.current)));
            }
        }
        Ok(())
    }

    /// An identifier at statement start is either an assignment target or
    /// the beginning of an expression statement.
    fn parse_identifier_statement(&mut self) -> Result<Stmt, CompileError> {
        let loc = self.location();
        let name = self.expect_identifier()?;

        if self.current == Token::Assign {
            return self.parse_var_assign(name, loc);
        }

        let head = self.parse_identifier_tail(name, loc)?;
        let expr = self.parse_binary_rhs(0, head)?;
        self.expect_semicolon()?;
        Ok(Stmt::Expr(expr))
    }

    pub fn parse_type(&mut self) -> Result<Type, CompileError> {
        let ty = match self.current {
            Token::KeywordInt => Type::Int,
            Token::KeywordFloat => Type::Float,
            Token::KeywordChar => Type::Char,
            Token::KeywordString => Type::String,
            Token::KeywordBool => Type::Bool,
            Token::KeywordVoid => Type::Void,
            _ => return Err(self.error(format!("expected a type, found {}", self.current))),
        };
        self.advance()?;
        Ok(ty)
    }

    pub fn symbols(&self) -> &ScopeStack<Variable> {
        &self.symbols
    }

    pub fn functions(&self) -> &FunctionTable {
        &self.functions
    }

    fn advance(&mut self) -> Result<(), CompileError> {
        self.current = self.lexer.next_token()?;
        self.span = self.lexer.span();
        self.line = self.lexer.line();
        Ok(())
    }

    fn expect(&mut self, token: Token) -> Result<Location, CompileError> {
        if self.current != token {
            return Err(self.error(format!("expected {}, found {}", token, self.current)));
        }
        let loc = self.location();
        self.advance()?;
        Ok(loc)
    }

    fn expect_semicolon(&mut self) -> Result<Location, CompileError> {
        self.expect(Token::Semicolon)
    }

    fn expect_identifier(&mut self) -> Result<String, CompileError> {
        let Token::Identifier(name) = &self.current else {
            return Err(self.error(format!("expected an identifier, found {}", self.current)));
        };
        let name = name.clone();
        self.advance()?;
        Ok(name)
    }

    fn location(&self) -> Location {
        Location::new(self.span.clone(), self.line)
    }

    /// Error at the current token.
    fn error(&self, message: impl Into<String>) -> CompileError {
        CompileError::syntax(message, self.line, self.span.clone())
    }

    fn error_at(&self, loc: &Location, message: impl Into<String>) -> CompileError {
        CompileError::syntax(message, loc.line, loc.range.clone())
    }

    fn scope_error(&self, err: crate::scope::ScopeError) -> CompileError {
        CompileError::scope(err, self.line, self.span.clone())
    }
}

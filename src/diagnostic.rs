use ariadne::{Color, Label, Report, ReportKind, Source};
use yansi::Paint;

use std::fmt;
use std::ops::Range;

use crate::scope::ScopeError;

/// Which stage of the pipeline rejected the unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Lexical,
    Syntax,
    Semantic,
    Codegen,
    Internal,
}

impl ErrorKind {
    pub fn code(self) -> &'static str {
        match self {
            ErrorKind::Lexical => "Lexical Error",
            ErrorKind::Syntax => "Syntax Error",
            ErrorKind::Semantic => "Semantic Error",
            ErrorKind::Codegen => "Codegen Error",
            ErrorKind::Internal => "Internal Error",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// The single diagnostic a compilation produces before it aborts.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("Error: {message} on line {line}")]
pub struct CompileError {
    pub kind: ErrorKind,
    pub message: String,
    pub line: usize,
    pub span: Range<usize>,
}

impl CompileError {
    pub fn new(
        kind: ErrorKind,
        message: impl Into<String>,
        line: usize,
        span: Range<usize>,
    ) -> Self {
        CompileError {
            kind,
            message: message.into(),
            line,
            span,
        }
    }

    pub fn lexical(message: impl Into<String>, line: usize, span: Range<usize>) -> Self {
        Self::new(ErrorKind::Lexical, message, line, span)
    }

    pub fn syntax(message: impl Into<String>, line: usize, span: Range<usize>) -> Self {
        Self::new(ErrorKind::Syntax, message, line, span)
    }

    pub fn semantic(message: impl Into<String>, line: usize, span: Range<usize>) -> Self {
        Self::new(ErrorKind::Semantic, message, line, span)
    }

    pub fn codegen(message: impl Into<String>, line: usize, span: Range<usize>) -> Self {
        Self::new(ErrorKind::Codegen, message, line, span)
    }

    pub fn scope(err: ScopeError, line: usize, span: Range<usize>) -> Self {
        Self::new(ErrorKind::Internal, err.to_string(), line, span)
    }

    /// Builds the ariadne report pointing at the offending span of `file`.
    pub fn report(&self, file: &str) -> Report<'static, (String, Range<usize>)> {
        Report::build(ReportKind::Error, (file.to_string(), self.span.clone()))
            .with_code(self.kind.code())
            .with_message(self.to_string())
            .with_label(
                Label::new((file.to_string(), self.span.clone()))
                    .with_message(format!("{}", self.message.as_str().red().bold()))
                    .with_color(Color::Red),
            )
            .finish()
    }

    /// Prints the report to stderr against the given source text.
    pub fn eprint(&self, file: &str, source: &str) -> std::io::Result<()> {
        self.report(file)
            .eprint((file.to_string(), Source::from(source.to_string())))
    }
}

/// Message text shared by the parser's fast-path checks and the semantic
/// pass, so one defect class always reads the same way.
pub mod messages {
    use crate::ast::{BinOp, Type};

    pub fn undefined_variable(name: &str) -> String {
        format!("variable '{name}' not yet defined")
    }

    pub fn uninitialized_variable(name: &str) -> String {
        format!("variable '{name}' not yet initialized")
    }

    pub fn undeclared_assignment(name: &str) -> String {
        format!("variable '{name}' not yet declared")
    }

    pub fn redeclaration(name: &str) -> String {
        format!("variable '{name}' already declared or defined in the current scope")
    }

    pub fn definition_type_mismatch(name: &str, expected: Type, found: Type) -> String {
        format!(
            "defining a variable with incorrect type: '{name}' is {expected} but the value is {found}"
        )
    }

    pub fn assignment_type_mismatch(name: &str, expected: Type, found: Type) -> String {
        format!("assigning a value of type {found} to variable '{name}' of type {expected}")
    }

    pub fn binary_type_mismatch(op: BinOp, lhs: Type, rhs: Type) -> String {
        format!("invalid types connected in binary expression: {lhs} {op} {rhs}")
    }

    pub fn identifier_type(name: &str, declared: Type, resolved: Type) -> String {
        format!("'{name}' has type {declared} but was resolved as {resolved}")
    }

    pub fn void_variable(name: &str) -> String {
        format!("variable '{name}' cannot have type void")
    }

    pub fn undefined_function(name: &str) -> String {
        format!("function '{name}' not yet defined")
    }

    pub fn duplicate_function(name: &str) -> String {
        format!("function '{name}' already defined")
    }

    pub fn duplicate_parameter(name: &str) -> String {
        format!("parameter '{name}' already exists in the current scope")
    }

    pub fn argument_count(name: &str, expected: usize, found: usize) -> String {
        format!("function '{name}' expects {expected} argument(s) but {found} were given")
    }

    pub fn argument_type(name: &str, index: usize, expected: Type, found: Type) -> String {
        format!(
            "argument {} of call to '{name}' has type {found} but {expected} was expected",
            index + 1
        )
    }

    pub fn return_type_mismatch(name: &str, expected: Type, found: Type) -> String {
        format!("return type does not match type of the function: '{name}' returns {expected} but the value is {found}")
    }

    pub fn void_operand(op: BinOp) -> String {
        format!("operand of '{op}' has type void and produces no value")
    }

    pub fn void_return_value(name: &str) -> String {
        format!("function '{name}' returns void but a void value is returned")
    }

    pub fn missing_return(name: &str, expected: Type) -> String {
        format!("function '{name}' must return a value of type {expected}")
    }

    pub fn return_outside_function() -> String {
        "return statement outside of a function".to_string()
    }

    pub fn condition_type(found: Type) -> String {
        format!("if condition must be of type bool, found {found}")
    }
}

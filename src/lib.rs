pub mod ast;
pub mod codegen;
pub mod config;
pub mod diagnostic;
pub mod ir;
pub mod lexer;
#[cfg(feature = "llvm")]
pub mod llvm;
pub mod parser;
pub mod scope;
pub mod semantic;

use ast::Item;
use codegen::CodeGenerator;
use config::CompileOptions;
use diagnostic::CompileError;
use lexer::Lexer;
use parser::Parser;
use semantic::Analyzer;

/// Lexes and parses one unit. Tokens are pulled lazily by the parser.
pub fn parse(source: &str) -> Result<Vec<Item>, CompileError> {
    let mut parser = Parser::new(Lexer::new(source))?;
    parser.parse_program()
}

/// Parses and runs semantic analysis, returning the validated tree.
pub fn check(source: &str) -> Result<Vec<Item>, CompileError> {
    let items = parse(source)?;
    Analyzer::new().analyze_program(&items)?;
    Ok(items)
}

/// Runs the whole pipeline and hands back the validated IR module.
pub fn compile(source: &str, options: &CompileOptions) -> Result<ir::Module, CompileError> {
    log::info!("compiling '{}'", options.file_name);
    let items = check(source)?;
    CodeGenerator::new(options.module_name.clone()).generate(&items)
}

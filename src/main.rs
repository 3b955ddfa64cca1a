use clap::Parser;
use log::LevelFilter;

use pyroxene::config::CompileOptions;
use pyroxene::diagnostic::CompileError;

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(version, about = "Pyroxene compiler front end", long_about = None)]
struct Args {
    /// Source file ending in .pyrx; standard input when omitted
    input_path: Option<PathBuf>,

    /// Write the textual IR here instead of standard output
    #[arg(long, value_name = "PATH")]
    emit_ir: Option<PathBuf>,

    /// Name of the generated module
    #[arg(long)]
    module_name: Option<String>,

    /// Translate through LLVM and write its textual IR here
    #[cfg(feature = "llvm")]
    #[arg(long, value_name = "PATH")]
    emit_llvm: Option<PathBuf>,
}

fn main() -> ExitCode {
    env_logger::builder()
        .filter_level(LevelFilter::Warn)
        .parse_default_env()
        .init();

    let args = Args::parse();

    let (source, mut options) = match read_input(args.input_path.as_deref()) {
        Ok(input) => input,
        Err(message) => {
            eprintln!("Driver error: {message}");
            return ExitCode::FAILURE;
        }
    };
    if let Some(name) = &args.module_name {
        options = options.with_module_name(name.clone());
    }

    let module = match pyroxene::compile(&source, &options) {
        Ok(module) => module,
        Err(err) => return report(&err, &options, &source),
    };

    let written = match &args.emit_ir {
        Some(path) => fs::write(path, module.to_string()),
        None => {
            print!("{module}");
            Ok(())
        }
    };
    if let Err(err) = written {
        eprintln!("Driver error: could not write IR: {err}");
        return ExitCode::FAILURE;
    }

    #[cfg(feature = "llvm")]
    if let Some(path) = &args.emit_llvm {
        if let Err(err) = emit_llvm(&module, path) {
            return report(&err, &options, &source);
        }
    }

    ExitCode::SUCCESS
}

fn read_input(path: Option<&Path>) -> Result<(String, CompileOptions), String> {
    let Some(path) = path else {
        let mut source = String::new();
        io::stdin()
            .read_to_string(&mut source)
            .map_err(|err| format!("could not read standard input: {err}"))?;
        return Ok((source, CompileOptions::default()));
    };

    if path.extension().and_then(|ext| ext.to_str()) != Some("pyrx") {
        return Err(format!(
            "incorrect file extension on {}, please add a .pyrx extension",
            path.display()
        ));
    }
    let source = fs::read_to_string(path)
        .map_err(|err| format!("could not read {}: {err}", path.display()))?;
    Ok((source, CompileOptions::for_file(path)))
}

fn report(err: &CompileError, options: &CompileOptions, source: &str) -> ExitCode {
    if err.eprint(&options.file_name, source).is_err() {
        eprintln!("{err}");
    }
    ExitCode::FAILURE
}

#[cfg(feature = "llvm")]
fn emit_llvm(module: &pyroxene::ir::Module, path: &Path) -> Result<(), CompileError> {
    use inkwell::context::Context;
    use pyroxene::llvm::LLVMCodegen;

    let context = Context::create();
    let mut backend = LLVMCodegen::new(&context, &module.name);
    backend.generate_module(module)?;
    backend.emit_to_file(&path.to_string_lossy())?;
    Ok(())
}

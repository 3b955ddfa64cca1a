use std::fmt::{self, Display, Formatter};
use std::ops::Range;

use crate::ast::Type;

pub mod builder;
pub mod irvalidator;

#[cfg(test)]
pub mod test;

pub use builder::IRBuilder;
pub use irvalidator::IRValidator;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IRType {
    Void,
    I1,  // bool
    I8,  // char
    I64, // int
    F64, // float
    Ptr, // string, stack slot, global
    Array {
        element_type: Box<IRType>,
        size: usize,
    },
}

impl IRType {
    pub fn is_integer(&self) -> bool {
        matches!(self, IRType::I1 | IRType::I8 | IRType::I64)
    }

    pub fn is_float(&self) -> bool {
        matches!(self, IRType::F64)
    }

    /// The value a storage location of this type starts out with.
    pub fn zero(&self) -> Option<Constant> {
        match self {
            IRType::I1 => Some(Constant::Bool(false)),
            IRType::I8 => Some(Constant::I8(0)),
            IRType::I64 => Some(Constant::Int(0)),
            IRType::F64 => Some(Constant::Float(0.0)),
            IRType::Ptr => Some(Constant::Null),
            IRType::Void | IRType::Array { .. } => None,
        }
    }
}

impl From<Type> for IRType {
    fn from(ty: Type) -> Self {
        match ty {
            Type::Int => IRType::I64,
            Type::Float => IRType::F64,
            Type::Char => IRType::I8,
            Type::Bool => IRType::I1,
            Type::String => IRType::Ptr,
            Type::Void => IRType::Void,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Constant(Constant),
    Register(String),
    Global(String),
    Argument(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
    Bool(bool),
    I8(u8),
    Int(i64),
    Float(f64),
    /// Raw bytes of a string literal, no terminator.
    Bytes(Vec<u8>),
    Null,
}

impl Constant {
    pub fn ty(&self) -> IRType {
        match self {
            Constant::Bool(_) => IRType::I1,
            Constant::I8(_) => IRType::I8,
            Constant::Int(_) => IRType::I64,
            Constant::Float(_) => IRType::F64,
            Constant::Bytes(bytes) => IRType::Array {
                element_type: Box::new(IRType::I8),
                size: bytes.len(),
            },
            Constant::Null => IRType::Ptr,
        }
    }
}

/// A module-scope storage location.
#[derive(Debug, Clone, PartialEq)]
pub struct Global {
    pub name: String,
    pub ty: IRType,
    pub initializer: Value,
    pub is_constant: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BasicBlock {
    pub label: String,
    pub instructions: Vec<Instruction>,
    pub terminator: Option<Terminator>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
    // Memory operations
    Alloca {
        dest: String,
        ty: IRType,
        span: Range<usize>,
    },
    Load {
        dest: String,
        ptr: Value,
        ty: IRType,
        span: Range<usize>,
    },
    Store {
        value: Value,
        ptr: Value,
        ty: IRType,
        span: Range<usize>,
    },

    // Arithmetic operations, integer or floating point by `ty`
    Add {
        dest: String,
        lhs: Value,
        rhs: Value,
        ty: IRType,
        span: Range<usize>,
    },
    Sub {
        dest: String,
        lhs: Value,
        rhs: Value,
        ty: IRType,
        span: Range<usize>,
    },
    Mul {
        dest: String,
        lhs: Value,
        rhs: Value,
        ty: IRType,
        span: Range<usize>,
    },
    Div {
        dest: String,
        lhs: Value,
        rhs: Value,
        ty: IRType,
        span: Range<usize>,
    },

    Call {
        dest: Option<String>,
        func: Value,
        args: Vec<Value>,
        ty: IRType,
        span: Range<usize>,
    },
}

impl Instruction {
    /// Register written by this instruction, if any.
    pub fn dest(&self) -> Option<&str> {
        match self {
            Instruction::Alloca { dest, .. }
            | Instruction::Load { dest, .. }
            | Instruction::Add { dest, .. }
            | Instruction::Sub { dest, .. }
            | Instruction::Mul { dest, .. }
            | Instruction::Div { dest, .. } => Some(dest),
            Instruction::Call { dest, .. } => dest.as_deref(),
            Instruction::Store { .. } => None,
        }
    }

    pub fn span(&self) -> &Range<usize> {
        match self {
            Instruction::Alloca { span, .. }
            | Instruction::Load { span, .. }
            | Instruction::Store { span, .. }
            | Instruction::Add { span, .. }
            | Instruction::Sub { span, .. }
            | Instruction::Mul { span, .. }
            | Instruction::Div { span, .. }
            | Instruction::Call { span, .. } => span,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Terminator {
    Ret {
        value: Option<Value>,
        ty: IRType,
        span: Range<usize>,
    },
    Br {
        label: String,
        span: Range<usize>,
    },
    CondBr {
        cond: Value,
        then_label: String,
        else_label: String,
        span: Range<usize>,
    },
    Unreachable {
        span: Range<usize>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    pub name: String,
    pub params: Vec<(String, IRType)>,
    pub return_type: IRType,
    pub blocks: Vec<BasicBlock>,
}

impl Function {
    pub fn block(&self, label: &str) -> Option<&BasicBlock> {
        self.blocks.iter().find(|block| block.label == label)
    }
}

/// Priority of every entry in `@llvm.global_ctors`.
pub const CONSTRUCTOR_PRIORITY: u32 = 65535;

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Module {
    pub name: String,
    pub globals: Vec<Global>,
    pub functions: Vec<Function>,
    /// Functions run before any other code of the program, in order.
    pub constructors: Vec<String>,
}

impl Module {
    pub fn function(&self, name: &str) -> Option<&Function> {
        self.functions.iter().find(|function| function.name == name)
    }

    pub fn global(&self, name: &str) -> Option<&Global> {
        self.globals.iter().find(|global| global.name == name)
    }
}

// Display implementations

impl Display for IRType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            IRType::Void => write!(f, "void"),
            IRType::I1 => write!(f, "i1"),
            IRType::I8 => write!(f, "i8"),
            IRType::I64 => write!(f, "i64"),
            IRType::F64 => write!(f, "double"),
            IRType::Ptr => write!(f, "ptr"),
            IRType::Array { element_type, size } => {
                write!(f, "[{} x {}]", size, element_type)
            }
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Value::Constant(c) => write!(f, "{}", c),
            Value::Register(name) => write!(f, "{}", name),
            Value::Global(name) => write!(f, "@{}", name),
            Value::Argument(name) => write!(f, "%{}", name),
        }
    }
}

impl Display for Constant {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Constant::Bool(b) => write!(f, "{}", if *b { "true" } else { "false" }),
            Constant::I8(c) => write!(f, "{}", c),
            Constant::Int(i) => write!(f, "{}", i),
            Constant::Float(fl) => write!(f, "{:.6}", fl),
            Constant::Bytes(bytes) => {
                write!(f, "c\"")?;
                for byte in bytes {
                    let printable = (byte.is_ascii_graphic() || *byte == b' ')
                        && *byte != b'"'
                        && *byte != b'\\';
                    if printable {
                        write!(f, "{}", *byte as char)?;
                    } else {
                        write!(f, "\\{:02X}", byte)?;
                    }
                }
                write!(f, "\"")
            }
            Constant::Null => write!(f, "null"),
        }
    }
}

impl Display for Global {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.is_constant {
            write!(
                f,
                "@{} = private unnamed_addr constant {} {}",
                self.name, self.ty, self.initializer
            )
        } else {
            write!(f, "@{} = global {} {}", self.name, self.ty, self.initializer)
        }
    }
}

impl Display for Instruction {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::Alloca { dest, ty, .. } => {
                write!(f, "  {} = alloca {}", dest, ty)
            }
            Instruction::Load { dest, ptr, ty, .. } => {
                write!(f, "  {} = load {}, ptr {}", dest, ty, ptr)
            }
            Instruction::Store { value, ptr, ty, .. } => {
                write!(f, "  store {} {}, ptr {}", ty, value, ptr)
            }
            Instruction::Add {
                dest, lhs, rhs, ty, ..
            } => {
                let op = if ty.is_float() { "fadd" } else { "add" };
                write!(f, "  {} = {} {} {}, {}", dest, op, ty, lhs, rhs)
            }
            Instruction::Sub {
                dest, lhs, rhs, ty, ..
            } => {
                let op = if ty.is_float() { "fsub" } else { "sub" };
                write!(f, "  {} = {} {} {}, {}", dest, op, ty, lhs, rhs)
            }
            Instruction::Mul {
                dest, lhs, rhs, ty, ..
            } => {
                let op = if ty.is_float() { "fmul" } else { "mul" };
                write!(f, "  {} = {} {} {}, {}", dest, op, ty, lhs, rhs)
            }
            Instruction::Div {
                dest, lhs, rhs, ty, ..
            } => {
                let op = if ty.is_float() { "fdiv" } else { "sdiv" };
                write!(f, "  {} = {} {} {}, {}", dest, op, ty, lhs, rhs)
            }
            Instruction::Call {
                dest,
                func,
                args,
                ty,
                ..
            } => {
                write!(f, "  ")?;
                if let Some(d) = dest {
                    write!(f, "{} = ", d)?;
                }
                write!(f, "call {} {}(", ty, func)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
        }
    }
}

impl Display for Terminator {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Terminator::Ret {
                value: Some(val),
                ty,
                ..
            } => {
                write!(f, "  ret {} {}", ty, val)
            }
            Terminator::Ret { value: None, .. } => {
                write!(f, "  ret void")
            }
            Terminator::Br { label, .. } => {
                write!(f, "  br label %{}", label)
            }
            Terminator::CondBr {
                cond,
                then_label,
                else_label,
                ..
            } => {
                write!(
                    f,
                    "  br i1 {}, label %{}, label %{}",
                    cond, then_label, else_label
                )
            }
            Terminator::Unreachable { .. } => {
                write!(f, "  unreachable")
            }
        }
    }
}

impl Display for BasicBlock {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}:", self.label)?;
        for instruction in &self.instructions {
            writeln!(f, "{}", instruction)?;
        }
        if let Some(term) = &self.terminator {
            writeln!(f, "{}", term)?;
        }
        Ok(())
    }
}

impl Display for Function {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "define {} @{}(", self.return_type, self.name)?;

        for (i, (param_name, param_type)) in self.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{} %{}", param_type, param_name)?;
        }

        writeln!(f, ") {{")?;
        for block in &self.blocks {
            write!(f, "{}", block)?;
        }
        writeln!(f, "}}")
    }
}

impl Display for Module {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "; Module: {}", self.name)?;
        writeln!(f)?;

        if !self.globals.is_empty() || !self.constructors.is_empty() {
            for global in &self.globals {
                writeln!(f, "{}", global)?;
            }
            if !self.constructors.is_empty() {
                let entry = "{ i32, ptr, ptr }";
                write!(
                    f,
                    "@llvm.global_ctors = appending global [{} x {entry}] [",
                    self.constructors.len()
                )?;
                for (i, name) in self.constructors.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{entry} {{ i32 {CONSTRUCTOR_PRIORITY}, ptr @{name}, ptr null }}")?;
                }
                writeln!(f, "]")?;
            }
            writeln!(f)?;
        }

        for function in &self.functions {
            writeln!(f, "{}", function)?;
        }

        Ok(())
    }
}

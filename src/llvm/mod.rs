use inkwell::builder::{Builder, BuilderError};
use inkwell::context::Context;
use inkwell::module::{Linkage, Module as LLVMModule};
use inkwell::types::{BasicMetadataTypeEnum, BasicType, BasicTypeEnum};
use inkwell::values::{BasicValueEnum, FunctionValue};
use inkwell::AddressSpace;
use std::collections::HashMap;

use crate::diagnostic::CompileError;
use crate::ir::{CONSTRUCTOR_PRIORITY, Constant, IRType, Value};

pub mod function;
pub mod instruction;


#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error(transparent)]
    Builder(#[from] BuilderError),
    #[error("register {0} not found")]
    UnknownRegister(String),
    #[error("global @{0} not found")]
    UnknownGlobal(String),
    #[error("function @{0} not declared")]
    UnknownFunction(String),
    #[error("block '{0}' not found")]
    UnknownBlock(String),
    #[error("type {0} cannot be used as a value")]
    NotAValueType(IRType),
    #[error("{op} with unsupported type {ty}")]
    UnsupportedType { op: &'static str, ty: IRType },
    #[error("LLVM verification failed: {0}")]
    Verification(String),
    #[error("failed to emit LLVM IR: {0}")]
    Emit(String),
}

impl From<BackendError> for CompileError {
    fn from(err: BackendError) -> Self {
        CompileError::codegen(err.to_string(), 0, 0..0)
    }
}

/// Translates a validated IR module into an LLVM module.
pub struct LLVMCodegen<'ctx> {
    context: &'ctx Context,
    module: LLVMModule<'ctx>,
    builder: Builder<'ctx>,
    function_value_map: HashMap<String, FunctionValue<'ctx>>,
    value_map: HashMap<String, BasicValueEnum<'ctx>>,
}

impl<'ctx> LLVMCodegen<'ctx> {
    pub fn new(context: &'ctx Context, module_name: &str) -> Self {
        let module = context.create_module(module_name);
        let builder = context.create_builder();

        Self {
            context,
            module,
            builder,
            function_value_map: HashMap::new(),
            value_map: HashMap::new(),
        }
    }

    pub fn get_llvm_type(&self, ir_type: &IRType) -> Result<BasicTypeEnum<'ctx>, BackendError> {
        let ty = match ir_type {
            IRType::I1 => self.context.bool_type().as_basic_type_enum(),
            IRType::I8 => self.context.i8_type().as_basic_type_enum(),
            IRType::I64 => self.context.i64_type().as_basic_type_enum(),
            IRType::F64 => self.context.f64_type().as_basic_type_enum(),
            IRType::Ptr => self
                .context
                .ptr_type(AddressSpace::default())
                .as_basic_type_enum(),
            IRType::Array { element_type, size } => {
                let elem_ty = self.get_llvm_type(element_type)?;
                elem_ty.array_type(*size as u32).as_basic_type_enum()
            }
            IRType::Void => return Err(BackendError::NotAValueType(IRType::Void)),
        };
        Ok(ty)
    }

    pub fn declare_function(
        &mut self,
        function: &crate::ir::Function,
    ) -> Result<FunctionValue<'ctx>, BackendError> {
        if let Some(f) = self.module.get_function(&function.name) {
            self.function_value_map.insert(function.name.clone(), f);
            return Ok(f);
        }

        let param_types = function
            .params
            .iter()
            .map(|(_, ty)| self.get_llvm_type(ty).map(BasicMetadataTypeEnum::from))
            .collect::<Result<Vec<_>, _>>()?;

        let fn_type = if matches!(function.return_type, IRType::Void) {
            self.context.void_type().fn_type(&param_types, false)
        } else {
            let ret_type = self.get_llvm_type(&function.return_type)?;
            ret_type.fn_type(&param_types, false)
        };

        let fn_val = self.module.add_function(&function.name, fn_type, None);
        self.function_value_map
            .insert(function.name.clone(), fn_val);
        Ok(fn_val)
    }

    fn store_value(&mut self, name: String, value: BasicValueEnum<'ctx>) {
        self.value_map.insert(name, value);
    }

    pub fn codegen_value(&mut self, val: &Value) -> Result<BasicValueEnum<'ctx>, BackendError> {
        match val {
            Value::Constant(c) => Ok(self.codegen_constant(c)),
            Value::Register(name) | Value::Argument(name) => self
                .value_map
                .get(name)
                .cloned()
                .ok_or_else(|| BackendError::UnknownRegister(name.clone())),
            Value::Global(name) => {
                if let Some(global) = self.module.get_global(name) {
                    Ok(global.as_pointer_value().into())
                } else if let Some(func) = self.function_value_map.get(name) {
                    Ok(func.as_global_value().as_pointer_value().into())
                } else {
                    Err(BackendError::UnknownGlobal(name.clone()))
                }
            }
        }
    }

    fn codegen_constant(&self, constant: &Constant) -> BasicValueEnum<'ctx> {
        match constant {
            Constant::Int(i) => self.context.i64_type().const_int(*i as u64, true).into(),
            Constant::I8(c) => self.context.i8_type().const_int(u64::from(*c), false).into(),
            Constant::Bool(b) => self.context.bool_type().const_int(*b as u64, false).into(),
            Constant::Float(f) => self.context.f64_type().const_float(*f).into(),
            Constant::Bytes(bytes) => self.context.const_string(bytes, false).into(),
            Constant::Null => self
                .context
                .ptr_type(AddressSpace::default())
                .const_null()
                .into(),
        }
    }

    pub fn generate_module(&mut self, ir_module: &crate::ir::Module) -> Result<(), BackendError> {
        // Create every global first: initializers may point at one another
        for global in &ir_module.globals {
            let ty = self.get_llvm_type(&global.ty)?;
            let llvm_global = self.module.add_global(ty, None, &global.name);
            if global.is_constant {
                llvm_global.set_constant(true);
                llvm_global.set_linkage(Linkage::Private);
                llvm_global.set_unnamed_addr(true);
            }
        }
        for global in &ir_module.globals {
            let initializer = self.codegen_value(&global.initializer)?;
            if let Some(llvm_global) = self.module.get_global(&global.name) {
                llvm_global.set_initializer(&initializer);
            }
        }

        // Declare all functions first
        for function in &ir_module.functions {
            self.declare_function(function)?;
        }

        for function in &ir_module.functions {
            self.codegen_function(function)?;
        }

        self.add_constructors(&ir_module.constructors)?;

        self.module
            .verify()
            .map_err(|e| BackendError::Verification(e.to_string()))?;
        log::info!("LLVM module '{}' verified", ir_module.name);
        Ok(())
    }

    /// Lists the functions in `@llvm.global_ctors` so they run before `main`.
    fn add_constructors(&mut self, constructors: &[String]) -> Result<(), BackendError> {
        if constructors.is_empty() {
            return Ok(());
        }

        let i32_type = self.context.i32_type();
        let ptr_type = self.context.ptr_type(AddressSpace::default());
        let entry_type = self
            .context
            .struct_type(&[i32_type.into(), ptr_type.into(), ptr_type.into()], false);

        let entries = constructors
            .iter()
            .map(|name| {
                let function = self
                    .function_value_map
                    .get(name)
                    .ok_or_else(|| BackendError::UnknownFunction(name.clone()))?;
                Ok(entry_type.const_named_struct(&[
                    i32_type
                        .const_int(u64::from(CONSTRUCTOR_PRIORITY), false)
                        .into(),
                    function.as_global_value().as_pointer_value().into(),
                    ptr_type.const_null().into(),
                ]))
            })
            .collect::<Result<Vec<_>, BackendError>>()?;

        let ctors = self.module.add_global(
            entry_type.array_type(entries.len() as u32),
            None,
            "llvm.global_ctors",
        );
        ctors.set_linkage(Linkage::Appending);
        ctors.set_initializer(&entry_type.const_array(&entries));
        log::debug!("registered {} module constructor(s)", entries.len());
        Ok(())
    }

    pub fn emit_to_file(&self, filename: &str) -> Result<(), BackendError> {
        self.module
            .print_to_file(filename)
            .map_err(|e| BackendError::Emit(e.to_string()))
    }

    pub fn get_module(&self) -> &LLVMModule<'ctx> {
        &self.module
    }
}

use crate::ir::{Instruction, Value};
use crate::llvm::{BackendError, LLVMCodegen};

use inkwell::types::BasicTypeEnum;
use inkwell::values::{BasicMetadataValueEnum, BasicValueEnum};

impl<'ctx> LLVMCodegen<'ctx> {
    pub fn codegen_instruction(&mut self, instr: &Instruction) -> Result<(), BackendError> {
        match instr {
            Instruction::Add {
                dest, lhs, rhs, ty, ..
            } => {
                let lhs_val = self.codegen_value(lhs)?;
                let rhs_val = self.codegen_value(rhs)?;
                let res: BasicValueEnum = match self.get_llvm_type(ty)? {
                    BasicTypeEnum::IntType(_) => self
                        .builder
                        .build_int_add(lhs_val.into_int_value(), rhs_val.into_int_value(), value_name(dest))?
                        .into(),
                    BasicTypeEnum::FloatType(_) => self
                        .builder
                        .build_float_add(
                            lhs_val.into_float_value(),
                            rhs_val.into_float_value(),
                            value_name(dest),
                        )?
                        .into(),
                    _ => {
                        return Err(BackendError::UnsupportedType {
                            op: "add",
                            ty: ty.clone(),
                        });
                    }
                };
                self.store_value(dest.clone(), res);
            }

            Instruction::Sub {
                dest, lhs, rhs, ty, ..
            } => {
                let lhs_val = self.codegen_value(lhs)?;
                let rhs_val = self.codegen_value(rhs)?;
                let res: BasicValueEnum = match self.get_llvm_type(ty)? {
                    BasicTypeEnum::IntType(_) => self
                        .builder
                        .build_int_sub(lhs_val.into_int_value(), rhs_val.into_int_value(), value_name(dest))?
                        .into(),
                    BasicTypeEnum::FloatType(_) => self
                        .builder
                        .build_float_sub(
                            lhs_val.into_float_value(),
                            rhs_val.into_float_value(),
                            value_name(dest),
                        )?
                        .into(),
                    _ => {
                        return Err(BackendError::UnsupportedType {
                            op: "sub",
                            ty: ty.clone(),
                        });
                    }
                };
                self.store_value(dest.clone(), res);
            }

            Instruction::Mul {
                dest, lhs, rhs, ty, ..
            } => {
                let lhs_val = self.codegen_value(lhs)?;
                let rhs_val = self.codegen_value(rhs)?;
                let res: BasicValueEnum = match self.get_llvm_type(ty)? {
                    BasicTypeEnum::IntType(_) => self
                        .builder
                        .build_int_mul(lhs_val.into_int_value(), rhs_val.into_int_value(), value_name(dest))?
                        .into(),
                    BasicTypeEnum::FloatType(_) => self
                        .builder
                        .build_float_mul(
                            lhs_val.into_float_value(),
                            rhs_val.into_float_value(),
                            value_name(dest),
                        )?
                        .into(),
                    _ => {
                        return Err(BackendError::UnsupportedType {
                            op: "mul",
                            ty: ty.clone(),
                        });
                    }
                };
                self.store_value(dest.clone(), res);
            }

            Instruction::Div {
                dest, lhs, rhs, ty, ..
            } => {
                let lhs_val = self.codegen_value(lhs)?;
                let rhs_val = self.codegen_value(rhs)?;
                let res: BasicValueEnum = match self.get_llvm_type(ty)? {
                    BasicTypeEnum::IntType(_) => self
                        .builder
                        .build_int_signed_div(
                            lhs_val.into_int_value(),
                            rhs_val.into_int_value(),
                            value_name(dest),
                        )?
                        .into(),
                    BasicTypeEnum::FloatType(_) => self
                        .builder
                        .build_float_div(
                            lhs_val.into_float_value(),
                            rhs_val.into_float_value(),
                            value_name(dest),
                        )?
                        .into(),
                    _ => {
                        return Err(BackendError::UnsupportedType {
                            op: "div",
                            ty: ty.clone(),
                        });
                    }
                };
                self.store_value(dest.clone(), res);
            }

            Instruction::Alloca { dest, ty, .. } => {
                let alloca_type = self.get_llvm_type(ty)?;
                let alloca = self.builder.build_alloca(alloca_type, value_name(dest))?;
                self.store_value(dest.clone(), alloca.into());
            }

            Instruction::Load { dest, ptr, ty, .. } => {
                let ptr_val = self.codegen_value(ptr)?;
                let load_type = self.get_llvm_type(ty)?;
                let loaded = self
                    .builder
                    .build_load(load_type, ptr_val.into_pointer_value(), value_name(dest))?;
                self.store_value(dest.clone(), loaded);
            }

            Instruction::Store { value, ptr, .. } => {
                let val = self.codegen_value(value)?;
                let ptr_val = self.codegen_value(ptr)?;
                self.builder
                    .build_store(ptr_val.into_pointer_value(), val)?;
            }

            Instruction::Call {
                dest, func, args, ..
            } => {
                let func_val = match func {
                    Value::Global(name) => *self
                        .function_value_map
                        .get(name)
                        .ok_or_else(|| BackendError::UnknownFunction(name.clone()))?,
                    other => return Err(BackendError::UnknownFunction(other.to_string())),
                };

                let llvm_args = args
                    .iter()
                    .map(|arg| self.codegen_value(arg).map(BasicMetadataValueEnum::from))
                    .collect::<Result<Vec<_>, _>>()?;

                let call_site =
                    self.builder
                        .build_call(func_val, &llvm_args, dest.as_deref().map_or("", value_name))?;

                if let Some(dest_name) = dest {
                    if let Some(return_value) = call_site.try_as_basic_value().left() {
                        self.store_value(dest_name.clone(), return_value);
                    }
                }
            }
        }
        Ok(())
    }
}

/// LLVM adds its own sigil to local names.
fn value_name(dest: &str) -> &str {
    dest.trim_start_matches('%')
}

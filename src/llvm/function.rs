use crate::ir::Terminator;
use crate::llvm::{BackendError, LLVMCodegen};

use inkwell::basic_block::BasicBlock;

use std::collections::HashMap;

impl<'ctx> LLVMCodegen<'ctx> {
    pub fn codegen_function(&mut self, function: &crate::ir::Function) -> Result<(), BackendError> {
        let llvm_function = self.declare_function(function)?;

        // Registers are local to a function
        self.value_map.clear();

        for (i, (param_name, _param_type)) in function.params.iter().enumerate() {
            if let Some(param_value) = llvm_function.get_nth_param(i as u32) {
                param_value.set_name(param_name);
                self.value_map.insert(param_name.clone(), param_value);
            }
        }

        // Create basic blocks first so branches can target later ones
        let mut block_map = HashMap::new();
        for ir_block in &function.blocks {
            let bb = self
                .context
                .append_basic_block(llvm_function, &ir_block.label);
            block_map.insert(ir_block.label.clone(), bb);
        }

        for ir_block in &function.blocks {
            let bb = *block_map
                .get(&ir_block.label)
                .ok_or_else(|| BackendError::UnknownBlock(ir_block.label.clone()))?;
            self.builder.position_at_end(bb);

            for instr in &ir_block.instructions {
                self.codegen_instruction(instr)?;
            }

            if let Some(term) = &ir_block.terminator {
                self.codegen_terminator(term, &block_map)?;
            }
        }

        if !llvm_function.verify(true) {
            return Err(BackendError::Verification(format!(
                "function '{}'",
                function.name
            )));
        }
        log::debug!("function '{}' verified", function.name);

        Ok(())
    }

    fn codegen_terminator(
        &mut self,
        term: &Terminator,
        block_map: &HashMap<String, BasicBlock<'ctx>>,
    ) -> Result<(), BackendError> {
        let block = |label: &String| {
            block_map
                .get(label)
                .copied()
                .ok_or_else(|| BackendError::UnknownBlock(label.clone()))
        };

        match term {
            Terminator::Ret {
                value: Some(val), ..
            } => {
                let ret_val = self.codegen_value(val)?;
                self.builder.build_return(Some(&ret_val))?;
            }
            Terminator::Ret { value: None, .. } => {
                self.builder.build_return(None)?;
            }
            Terminator::Br { label, .. } => {
                self.builder.build_unconditional_branch(block(label)?)?;
            }
            Terminator::CondBr {
                cond,
                then_label,
                else_label,
                ..
            } => {
                let cond_val = self.codegen_value(cond)?;
                self.builder.build_conditional_branch(
                    cond_val.into_int_value(),
                    block(then_label)?,
                    block(else_label)?,
                )?;
            }
            Terminator::Unreachable { .. } => {
                self.builder.build_unreachable()?;
            }
        }
        Ok(())
    }
}

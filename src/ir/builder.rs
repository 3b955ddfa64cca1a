use super::*;
use std::collections::HashMap;

/// Insertion cursor over a `Module` under construction: knows which
/// function and block new instructions go to and hands out fresh names.
pub struct IRBuilder {
    module: Module,
    current_function: Option<usize>,
    current_block: Option<usize>,
    // registers are numbered per function, keyed by function index
    register_counters: HashMap<Option<usize>, usize>,
    label_counter: usize,
    string_literals: HashMap<Vec<u8>, String>,
}

impl IRBuilder {
    pub fn new(module_name: impl Into<String>) -> Self {
        Self {
            module: Module {
                name: module_name.into(),
                globals: Vec::new(),
                functions: Vec::new(),
                constructors: Vec::new(),
            },
            current_function: None,
            current_block: None,
            register_counters: HashMap::new(),
            label_counter: 0,
            string_literals: HashMap::new(),
        }
    }

    pub fn add_global(&mut self, name: &str, ty: IRType, initializer: Value) -> Value {
        self.module.globals.push(Global {
            name: name.to_string(),
            ty,
            initializer,
            is_constant: false,
        });
        Value::Global(name.to_string())
    }

    /// Interns the bytes as a private constant array and returns a pointer
    /// to it. Identical literals share one global.
    pub fn add_string_literal(&mut self, bytes: &[u8]) -> Value {
        if let Some(name) = self.string_literals.get(bytes) {
            return Value::Global(name.clone());
        }

        let name = format!(".str.{}", self.string_literals.len());
        let initializer = Constant::Bytes(bytes.to_vec());
        self.module.globals.push(Global {
            name: name.clone(),
            ty: initializer.ty(),
            initializer: Value::Constant(initializer),
            is_constant: true,
        });
        self.string_literals.insert(bytes.to_vec(), name.clone());
        Value::Global(name)
    }

    pub fn declare_function(
        &mut self,
        name: &str,
        params: Vec<(String, IRType)>,
        return_type: IRType,
    ) -> usize {
        self.module.functions.push(Function {
            name: name.to_string(),
            params,
            return_type,
            blocks: Vec::new(),
        });
        self.module.functions.len() - 1
    }

    pub fn function_index(&self, name: &str) -> Option<usize> {
        self.module.functions.iter().position(|f| f.name == name)
    }

    /// Moves the cursor to the end of the given block of the given function.
    pub fn position_at(&mut self, func_idx: usize, block_idx: usize) {
        self.current_function = Some(func_idx);
        self.current_block = Some(block_idx);
    }

    pub fn clear_position(&mut self) {
        self.current_function = None;
        self.current_block = None;
    }

    pub fn current_function(&self) -> Option<usize> {
        self.current_function
    }

    pub fn current_block(&self) -> Option<usize> {
        self.current_block
    }

    /// Registers the function to run before the rest of the program.
    pub fn add_constructor(&mut self, name: &str) {
        if !self.module.constructors.iter().any(|ctor| ctor == name) {
            self.module.constructors.push(name.to_string());
        }
    }

    pub fn new_register(&mut self) -> String {
        format!("%{}", self.next_register())
    }

    /// Register for the stack slot of a named local.
    pub fn new_slot(&mut self, name: &str) -> String {
        format!("%{}.addr{}", name, self.next_register())
    }

    fn next_register(&mut self) -> usize {
        let counter = self
            .register_counters
            .entry(self.current_function)
            .or_insert(0);
        *counter += 1;
        *counter
    }

    pub fn new_label(&mut self, prefix: &str) -> String {
        self.label_counter += 1;
        format!("{}{}", prefix, self.label_counter)
    }

    pub fn add_instruction(&mut self, instruction: Instruction) {
        if let Some(block) = self.block_mut() {
            block.instructions.push(instruction);
        }
    }

    /// Allocas live at the top of the entry block so every slot dominates
    /// all of its uses.
    pub fn add_entry_alloca(&mut self, dest: String, ty: IRType, span: Range<usize>) {
        let Some(func_idx) = self.current_function else {
            return;
        };
        if let Some(entry) = self
            .module
            .functions
            .get_mut(func_idx)
            .and_then(|function| function.blocks.first_mut())
        {
            let at = entry
                .instructions
                .iter()
                .take_while(|inst| matches!(inst, Instruction::Alloca { .. }))
                .count();
            entry
                .instructions
                .insert(at, Instruction::Alloca { dest, ty, span });
        }
    }

    pub fn set_terminator(&mut self, terminator: Terminator) {
        if let Some(block) = self.block_mut() {
            block.terminator = Some(terminator);
        }
    }

    pub fn is_terminated(&self) -> bool {
        let (Some(func_idx), Some(block_idx)) = (self.current_function, self.current_block) else {
            return false;
        };
        self.module
            .functions
            .get(func_idx)
            .and_then(|function| function.blocks.get(block_idx))
            .is_some_and(|block| block.terminator.is_some())
    }

    /// Appends an empty block to the current function. Does not move the cursor.
    pub fn create_block(&mut self, label: String) -> Option<usize> {
        let func_idx = self.current_function?;
        let function = self.module.functions.get_mut(func_idx)?;
        function.blocks.push(BasicBlock {
            label,
            instructions: Vec::new(),
            terminator: None,
        });
        Some(function.blocks.len() - 1)
    }

    pub fn set_current_block(&mut self, block_idx: usize) {
        self.current_block = Some(block_idx);
    }

    pub fn finish(self) -> Module {
        self.module
    }

    fn block_mut(&mut self) -> Option<&mut BasicBlock> {
        let func_idx = self.current_function?;
        let block_idx = self.current_block?;
        self.module
            .functions
            .get_mut(func_idx)?
            .blocks
            .get_mut(block_idx)
    }
}

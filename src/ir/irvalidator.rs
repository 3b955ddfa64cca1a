use super::*;
use std::collections::{HashMap, HashSet};

/// Structural checks over a finished module. Anything reported here is a
/// bug in lowering, not in the user's program.
pub struct IRValidator;

impl IRValidator {
    pub fn validate_module(module: &Module) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        let mut seen = HashSet::new();
        for global in &module.globals {
            if !seen.insert(global.name.as_str()) {
                errors.push(format!("global @{} defined more than once", global.name));
            }
            if let Value::Constant(c) = &global.initializer {
                if c.ty() != global.ty {
                    errors.push(format!(
                        "global @{} of type {} initialized with {}",
                        global.name,
                        global.ty,
                        c.ty()
                    ));
                }
            }
        }

        for name in &module.constructors {
            match module.function(name) {
                Some(ctor) if ctor.params.is_empty() && ctor.return_type == IRType::Void => {}
                Some(_) => errors.push(format!(
                    "constructor @{name} must take no arguments and return void"
                )),
                None => errors.push(format!("constructor @{name} is not defined")),
            }
        }

        for function in &module.functions {
            if let Err(mut func_errors) = Self::validate_function(module, function) {
                errors.append(&mut func_errors);
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    fn validate_function(module: &Module, function: &Function) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();
        let name = &function.name;

        if function.blocks.is_empty() {
            errors.push(format!("function @{name} has no blocks"));
        }

        let labels: HashSet<&str> = function.blocks.iter().map(|b| b.label.as_str()).collect();
        if labels.len() != function.blocks.len() {
            errors.push(format!("function @{name} has duplicate block labels"));
        }

        // blocks are emitted in an order where every definition precedes its uses
        let mut registers: HashMap<&str, IRType> = HashMap::new();

        for block in &function.blocks {
            for instruction in &block.instructions {
                Self::validate_instruction(module, function, &registers, instruction, &mut errors);

                if let Some(dest) = instruction.dest() {
                    let ty = match instruction {
                        Instruction::Alloca { .. } => IRType::Ptr,
                        Instruction::Load { ty, .. }
                        | Instruction::Add { ty, .. }
                        | Instruction::Sub { ty, .. }
                        | Instruction::Mul { ty, .. }
                        | Instruction::Div { ty, .. }
                        | Instruction::Call { ty, .. } => ty.clone(),
                        Instruction::Store { .. } => continue,
                    };
                    if registers.insert(dest, ty).is_some() {
                        errors.push(format!("register {dest} in @{name} assigned twice"));
                    }
                }
            }

            match &block.terminator {
                None => errors.push(format!(
                    "block '{}' in @{name} has no terminator",
                    block.label
                )),
                Some(Terminator::Ret { value, ty, .. }) => match value {
                    Some(value) => {
                        let found = Self::value_type(module, function, &registers, value);
                        if found.as_ref() != Some(&function.return_type) {
                            errors.push(format!(
                                "@{name} returns {} but a ret in '{}' yields {}",
                                function.return_type,
                                block.label,
                                Self::describe(found)
                            ));
                        }
                        if *ty != function.return_type {
                            errors.push(format!(
                                "ret in '{}' of @{name} is typed {ty}, function returns {}",
                                block.label, function.return_type
                            ));
                        }
                    }
                    None if function.return_type != IRType::Void => errors.push(format!(
                        "@{name} returns {} but '{}' has ret void",
                        function.return_type, block.label
                    )),
                    None => {}
                },
                Some(Terminator::Br { label, .. }) => {
                    if !labels.contains(label.as_str()) {
                        errors.push(format!("branch to unknown label '{label}' in @{name}"));
                    }
                }
                Some(Terminator::CondBr {
                    cond,
                    then_label,
                    else_label,
                    ..
                }) => {
                    let found = Self::value_type(module, function, &registers, cond);
                    if found != Some(IRType::I1) {
                        errors.push(format!(
                            "branch condition in @{name} is {}, expected i1",
                            Self::describe(found)
                        ));
                    }
                    for label in [then_label, else_label] {
                        if !labels.contains(label.as_str()) {
                            errors.push(format!("branch to unknown label '{label}' in @{name}"));
                        }
                    }
                }
                Some(Terminator::Unreachable { .. }) => {}
            }
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }

    fn validate_instruction(
        module: &Module,
        function: &Function,
        registers: &HashMap<&str, IRType>,
        instruction: &Instruction,
        errors: &mut Vec<String>,
    ) {
        let name = &function.name;
        let type_of = |value: &Value| Self::value_type(module, function, registers, value);

        match instruction {
            Instruction::Alloca { .. } => {}
            Instruction::Load { ptr, .. } => {
                if type_of(ptr) != Some(IRType::Ptr) {
                    errors.push(format!("load in @{name} from unknown storage {ptr}"));
                }
            }
            Instruction::Store { value, ptr, ty, .. } => {
                if type_of(ptr) != Some(IRType::Ptr) {
                    errors.push(format!("store in @{name} to unknown storage {ptr}"));
                }
                let found = type_of(value);
                if found.as_ref() != Some(ty) {
                    errors.push(format!(
                        "store of {} in @{name} declared as {ty}",
                        Self::describe(found)
                    ));
                }
            }
            Instruction::Add {
                lhs, rhs, ty, dest, ..
            }
            | Instruction::Sub {
                lhs, rhs, ty, dest, ..
            }
            | Instruction::Mul {
                lhs, rhs, ty, dest, ..
            }
            | Instruction::Div {
                lhs, rhs, ty, dest, ..
            } => {
                if !(ty.is_integer() || ty.is_float()) || *ty == IRType::I1 {
                    errors.push(format!("arithmetic on {ty} in @{name} ({dest})"));
                }
                for operand in [lhs, rhs] {
                    let found = type_of(operand);
                    if found.as_ref() != Some(ty) {
                        errors.push(format!(
                            "operand {operand} of {dest} in @{name} is {}, expected {ty}",
                            Self::describe(found)
                        ));
                    }
                }
            }
            Instruction::Call { func, args, ty, .. } => {
                let callee = match func {
                    Value::Global(callee) => module.function(callee),
                    _ => None,
                };
                let Some(callee) = callee else {
                    errors.push(format!("call in @{name} to unknown function {func}"));
                    return;
                };
                if callee.return_type != *ty {
                    errors.push(format!(
                        "call to @{} in @{name} typed {ty}, function returns {}",
                        callee.name, callee.return_type
                    ));
                }
                if callee.params.len() != args.len() {
                    errors.push(format!(
                        "call to @{} in @{name} passes {} argument(s), expected {}",
                        callee.name,
                        args.len(),
                        callee.params.len()
                    ));
                    return;
                }
                for (arg, (_, param_ty)) in args.iter().zip(&callee.params) {
                    let found = type_of(arg);
                    if found.as_ref() != Some(param_ty) {
                        errors.push(format!(
                            "argument {arg} to @{} in @{name} is {}, expected {param_ty}",
                            callee.name,
                            Self::describe(found)
                        ));
                    }
                }
            }
        }
    }

    fn value_type(
        module: &Module,
        function: &Function,
        registers: &HashMap<&str, IRType>,
        value: &Value,
    ) -> Option<IRType> {
        match value {
            Value::Constant(c) => Some(c.ty()),
            Value::Register(reg) => registers.get(reg.as_str()).cloned(),
            Value::Global(global) => module.global(global).map(|_| IRType::Ptr),
            Value::Argument(arg) => function
                .params
                .iter()
                .find(|(param, _)| param == arg)
                .map(|(_, ty)| ty.clone()),
        }
    }

    fn describe(ty: Option<IRType>) -> String {
        ty.map(|ty| ty.to_string())
            .unwrap_or_else(|| "undefined".to_string())
    }
}

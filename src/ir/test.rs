use super::*;

fn int(value: i64) -> Value {
    Value::Constant(Constant::Int(value))
}

fn ret(ty: IRType, value: Option<Value>) -> Terminator {
    Terminator::Ret {
        value,
        ty,
        span: 0..0,
    }
}

/// Builder positioned in the entry block of `@f`.
fn builder_in(return_type: IRType) -> IRBuilder {
    let mut builder = IRBuilder::new("test");
    let func_idx = builder.declare_function("f", vec![], return_type);
    builder.position_at(func_idx, 0);
    let entry = builder.create_block("entry".to_string()).unwrap();
    builder.set_current_block(entry);
    builder
}

fn validation_errors(module: &Module) -> Vec<String> {
    IRValidator::validate_module(module).unwrap_err()
}

#[test]
fn test_string_literals_are_interned() {
    let mut builder = IRBuilder::new("test");
    let first = builder.add_string_literal(b"hi");
    let second = builder.add_string_literal(b"there");
    let again = builder.add_string_literal(b"hi");

    assert_eq!(first, Value::Global(".str.0".to_string()));
    assert_eq!(second, Value::Global(".str.1".to_string()));
    assert_eq!(first, again);

    let module = builder.finish();
    assert_eq!(module.globals.len(), 2);
    assert!(module.globals.iter().all(|global| global.is_constant));
    assert_eq!(
        module.global(".str.1").unwrap().ty,
        IRType::Array {
            element_type: Box::new(IRType::I8),
            size: 5
        }
    );
}

#[test]
fn test_allocas_stay_at_top_of_entry() {
    let mut builder = builder_in(IRType::Void);
    let first = builder.new_slot("a");
    builder.add_entry_alloca(first.clone(), IRType::I64, 0..0);
    builder.add_instruction(Instruction::Store {
        value: int(1),
        ptr: Value::Register(first.clone()),
        ty: IRType::I64,
        span: 0..0,
    });
    let second = builder.new_slot("b");
    builder.add_entry_alloca(second.clone(), IRType::F64, 0..0);
    builder.set_terminator(ret(IRType::Void, None));

    let module = builder.finish();
    let entry = &module.functions[0].blocks[0];
    assert!(matches!(&entry.instructions[0], Instruction::Alloca { dest, .. } if *dest == first));
    assert!(matches!(&entry.instructions[1], Instruction::Alloca { dest, .. } if *dest == second));
    assert!(matches!(entry.instructions[2], Instruction::Store { .. }));
    assert_eq!(first, "%a.addr1");
    assert_eq!(second, "%b.addr2");
    IRValidator::validate_module(&module).unwrap();
}

#[test]
fn test_labels_are_unique() {
    let mut builder = IRBuilder::new("test");
    assert_eq!(builder.new_label("then"), "then1");
    assert_eq!(builder.new_label("merge"), "merge2");
    assert_eq!(builder.new_register(), "%1");
}

#[test]
fn test_registers_restart_per_function() {
    let mut builder = builder_in(IRType::Void);
    assert_eq!(builder.new_register(), "%1");
    assert_eq!(builder.new_slot("x"), "%x.addr2");

    let other = builder.declare_function("g", vec![], IRType::Void);
    builder.position_at(other, 0);
    assert_eq!(builder.new_register(), "%1");

    // going back continues where the first function left off
    builder.position_at(0, 0);
    assert_eq!(builder.new_register(), "%3");
}

#[test]
fn test_ret_type_must_match_function() {
    let mut builder = builder_in(IRType::I64);
    builder.set_terminator(ret(IRType::F64, Some(int(1))));
    let errors = validation_errors(&builder.finish());
    assert_eq!(
        errors,
        vec!["ret in 'entry' of @f is typed double, function returns i64"]
    );
}

#[test]
fn test_constructors() {
    let mut builder = builder_in(IRType::Void);
    builder.set_terminator(ret(IRType::Void, None));
    builder.add_constructor("f");
    builder.add_constructor("f");
    builder.add_constructor("missing");

    let module = builder.finish();
    assert_eq!(module.constructors, vec!["f", "missing"]);
    assert_eq!(
        validation_errors(&module),
        vec!["constructor @missing is not defined"]
    );

    let mut builder = builder_in(IRType::I64);
    builder.set_terminator(ret(IRType::I64, Some(int(0))));
    builder.add_constructor("f");
    let module = builder.finish();
    assert_eq!(
        validation_errors(&module),
        vec!["constructor @f must take no arguments and return void"]
    );
    assert!(module.to_string().contains(
        "@llvm.global_ctors = appending global [1 x { i32, ptr, ptr }] \
         [{ i32, ptr, ptr } { i32 65535, ptr @f, ptr null }]"
    ));
}

#[test]
fn test_is_terminated_without_position() {
    let builder = IRBuilder::new("test");
    assert!(!builder.is_terminated());
}

#[test]
fn test_missing_terminator() {
    let builder = builder_in(IRType::Void);
    let errors = validation_errors(&builder.finish());
    assert_eq!(errors, vec!["block 'entry' in @f has no terminator"]);
}

#[test]
fn test_register_used_before_definition() {
    let mut builder = builder_in(IRType::I64);
    builder.add_instruction(Instruction::Add {
        dest: "%2".to_string(),
        lhs: Value::Register("%1".to_string()),
        rhs: int(1),
        ty: IRType::I64,
        span: 0..0,
    });
    builder.set_terminator(ret(IRType::I64, Some(Value::Register("%2".to_string()))));

    let errors = validation_errors(&builder.finish());
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("operand %1"), "{errors:?}");
}

#[test]
fn test_arithmetic_on_booleans() {
    let mut builder = builder_in(IRType::Void);
    builder.add_instruction(Instruction::Mul {
        dest: "%1".to_string(),
        lhs: Value::Constant(Constant::Bool(true)),
        rhs: Value::Constant(Constant::Bool(false)),
        ty: IRType::I1,
        span: 0..0,
    });
    builder.set_terminator(ret(IRType::Void, None));

    let errors = validation_errors(&builder.finish());
    assert_eq!(errors, vec!["arithmetic on i1 in @f (%1)"]);
}

#[test]
fn test_mismatched_operands_and_stores() {
    let mut builder = builder_in(IRType::Void);
    let global = builder.add_global("g", IRType::I64, int(0));
    builder.add_instruction(Instruction::Store {
        value: Value::Constant(Constant::Float(1.0)),
        ptr: global,
        ty: IRType::I64,
        span: 0..0,
    });
    builder.add_instruction(Instruction::Load {
        dest: "%1".to_string(),
        ptr: Value::Global("missing".to_string()),
        ty: IRType::I64,
        span: 0..0,
    });
    builder.set_terminator(ret(IRType::Void, None));

    let errors = validation_errors(&builder.finish());
    assert_eq!(
        errors,
        vec![
            "store of double in @f declared as i64",
            "load in @f from unknown storage @missing",
        ]
    );
}

#[test]
fn test_return_and_branch_checks() {
    let mut builder = builder_in(IRType::I64);
    builder.set_terminator(Terminator::CondBr {
        cond: int(1),
        then_label: "yes".to_string(),
        else_label: "entry".to_string(),
        span: 0..0,
    });
    let errors = validation_errors(&builder.finish());
    assert_eq!(
        errors,
        vec![
            "branch condition in @f is i64, expected i1",
            "branch to unknown label 'yes' in @f",
        ]
    );

    let mut builder = builder_in(IRType::I64);
    builder.set_terminator(ret(IRType::Void, None));
    let errors = validation_errors(&builder.finish());
    assert_eq!(errors, vec!["@f returns i64 but 'entry' has ret void"]);
}

#[test]
fn test_call_checks() {
    let mut builder = IRBuilder::new("test");
    let callee = builder.declare_function("g", vec![("x".to_string(), IRType::F64)], IRType::F64);
    builder.position_at(callee, 0);
    let entry = builder.create_block("entry".to_string()).unwrap();
    builder.set_current_block(entry);
    builder.set_terminator(ret(IRType::F64, Some(Value::Argument("x".to_string()))));

    let caller = builder.declare_function("f", vec![], IRType::Void);
    builder.position_at(caller, 0);
    let entry = builder.create_block("entry".to_string()).unwrap();
    builder.set_current_block(entry);
    builder.add_instruction(Instruction::Call {
        dest: Some("%1".to_string()),
        func: Value::Global("g".to_string()),
        args: vec![int(2)],
        ty: IRType::F64,
        span: 0..0,
    });
    builder.add_instruction(Instruction::Call {
        dest: None,
        func: Value::Global("h".to_string()),
        args: vec![],
        ty: IRType::Void,
        span: 0..0,
    });
    builder.set_terminator(ret(IRType::Void, None));

    let errors = validation_errors(&builder.finish());
    assert_eq!(
        errors,
        vec![
            "argument 2 to @g in @f is i64, expected double",
            "call in @f to unknown function @h",
        ]
    );
}

#[test]
fn test_global_initializer_type() {
    let mut builder = IRBuilder::new("test");
    builder.add_global("g", IRType::F64, int(3));
    builder.add_global("g", IRType::I64, int(3));
    let errors = validation_errors(&builder.finish());
    assert_eq!(
        errors,
        vec![
            "global @g of type double initialized with i64",
            "global @g defined more than once",
        ]
    );
}

#[test]
fn test_display() {
    let mut builder = builder_in(IRType::F64);
    builder.add_string_literal(b"a \"q\"\n");
    builder.add_global("x", IRType::F64, Value::Constant(Constant::Float(1.5)));
    builder.add_instruction(Instruction::Load {
        dest: "%1".to_string(),
        ptr: Value::Global("x".to_string()),
        ty: IRType::F64,
        span: 0..0,
    });
    builder.add_instruction(Instruction::Div {
        dest: "%2".to_string(),
        lhs: Value::Register("%1".to_string()),
        rhs: Value::Constant(Constant::Float(2.0)),
        ty: IRType::F64,
        span: 0..0,
    });
    builder.set_terminator(ret(IRType::F64, Some(Value::Register("%2".to_string()))));

    let module = builder.finish();
    IRValidator::validate_module(&module).unwrap();
    let expected = "\
; Module: test

@.str.0 = private unnamed_addr constant [6 x i8] c\"a \\22q\\22\\0A\"
@x = global double 1.500000

define double @f() {
entry:
  %1 = load double, ptr @x
  %2 = fdiv double %1, 2.000000
  ret double %2
}

";
    assert_eq!(module.to_string(), expected);
}

use super::*;
use crate::ast::Param;
use crate::diagnostic::ErrorKind;
use crate::ir::{Constant, Global};

fn lower(src: &str) -> Module {
    let items = crate::check(src).unwrap();
    CodeGenerator::new("main").generate(&items).unwrap()
}

fn lower_err(src: &str) -> CompileError {
    let items = crate::check(src).unwrap();
    CodeGenerator::new("main").generate(&items).unwrap_err()
}

fn labels(function: &crate::ir::Function) -> Vec<&str> {
    function.blocks.iter().map(|block| block.label.as_str()).collect()
}

#[test]
fn test_module_scope_definitions() {
    let module = lower("int a = 5; int b = a;");

    assert_eq!(
        module.globals,
        vec![
            Global {
                name: "a".to_string(),
                ty: IRType::I64,
                initializer: Value::Constant(Constant::Int(5)),
                is_constant: false,
            },
            Global {
                name: "b".to_string(),
                ty: IRType::I64,
                initializer: Value::Constant(Constant::Int(0)),
                is_constant: false,
            },
        ]
    );

    let expected = "\
; Module: main

@a = global i64 5
@b = global i64 0
@llvm.global_ctors = appending global [1 x { i32, ptr, ptr }] [{ i32, ptr, ptr } { i32 65535, ptr @__pyrx_module_init, ptr null }]

define void @__pyrx_module_init() {
entry:
  %1 = load i64, ptr @a
  store i64 %1, ptr @b
  ret void
}

";
    assert_eq!(module.to_string(), expected);
}

#[test]
fn test_no_init_function_for_literals() {
    let module = lower("char c = 'a';\nfloat x = 1.5;\nbool t = true;\nint n;");
    assert!(module.function(MODULE_INIT).is_none());
    assert!(module.constructors.is_empty());
    assert_eq!(
        module.global("c").unwrap().initializer,
        Value::Constant(Constant::I8(97))
    );
    assert_eq!(
        module.global("x").unwrap().initializer,
        Value::Constant(Constant::Float(1.5))
    );
    assert_eq!(module.global("t").unwrap().ty, IRType::I1);
    assert_eq!(
        module.global("n").unwrap().initializer,
        Value::Constant(Constant::Int(0))
    );
}

#[test]
fn test_init_function_runs_as_constructor() {
    let module = lower("int a = 5;\nint b = a;\ndef int main() { return b; }");
    assert_eq!(module.constructors, vec![MODULE_INIT]);

    // registers restart in every function
    let main = module.function("main").unwrap();
    assert_eq!(
        main.to_string(),
        "define i64 @main() {\nentry:\n  %1 = load i64, ptr @b\n  ret i64 %1\n}\n"
    );
}

#[test]
fn test_locals_use_stack_slots() {
    let module = lower("def int add(int a, int b) {\n  int c = a + b;\n  return c;\n}");
    assert!(module.globals.is_empty());

    let expected = "\
define i64 @add(i64 %a, i64 %b) {
entry:
  %a.addr1 = alloca i64
  %b.addr2 = alloca i64
  %c.addr6 = alloca i64
  store i64 %a, ptr %a.addr1
  store i64 %b, ptr %b.addr2
  %3 = load i64, ptr %a.addr1
  %4 = load i64, ptr %b.addr2
  %5 = add i64 %3, %4
  store i64 %5, ptr %c.addr6
  %7 = load i64, ptr %c.addr6
  ret i64 %7
}
";
    assert_eq!(module.function("add").unwrap().to_string(), expected);
}

#[test]
fn test_float_arithmetic() {
    let module = lower("def float half(float x) { return x / 2.0; }");
    let half = module.function("half").unwrap();
    let entry = &half.blocks[0];
    assert!(entry.instructions.iter().any(|inst| matches!(
        inst,
        Instruction::Div { ty: IRType::F64, .. }
    )));
    assert!(half.to_string().contains("fdiv double"));
}

#[test]
fn test_if_else_blocks() {
    let module = lower("def int pick(bool c) {\n  if (c) { return 1; } else { return 2; }\n}");
    let pick = module.function("pick").unwrap();

    assert_eq!(labels(pick), vec!["entry", "then1", "else2", "merge3"]);
    assert!(matches!(
        &pick.blocks[0].terminator,
        Some(Terminator::CondBr { then_label, else_label, .. })
            if then_label == "then1" && else_label == "else2"
    ));
    assert!(matches!(
        pick.block("merge3").unwrap().terminator,
        Some(Terminator::Unreachable { .. })
    ));
}

#[test]
fn test_if_without_else_falls_through() {
    let module = lower("def void f(bool c) {\n  int x = 0;\n  if (c) { x = 1; }\n  return;\n}");
    let f = module.function("f").unwrap();

    assert_eq!(labels(f), vec!["entry", "then1", "merge2"]);
    assert!(matches!(
        &f.blocks[0].terminator,
        Some(Terminator::CondBr { else_label, .. }) if else_label == "merge2"
    ));
    assert!(matches!(
        &f.blocks[1].terminator,
        Some(Terminator::Br { label, .. }) if label == "merge2"
    ));
    assert!(matches!(
        f.blocks[2].terminator,
        Some(Terminator::Ret { value: None, .. })
    ));
}

#[test]
fn test_else_if_chain() {
    let src = "def int sign(bool neg, bool zero) {\n\
               if (neg) { return 0 - 1; } else if (zero) { return 0; } else { return 1; }\n\
               }";
    let module = lower(src);
    let sign = module.function("sign").unwrap();
    assert_eq!(
        labels(sign),
        vec!["entry", "then1", "else2", "then4", "else5", "merge6", "merge3"]
    );
}

#[test]
fn test_void_function_gets_implicit_return() {
    let module = lower("int g = 0;\ndef void bump() { g = g + 1; }");
    let bump = module.function("bump").unwrap();
    assert!(matches!(
        bump.blocks[0].terminator,
        Some(Terminator::Ret { value: None, .. })
    ));
}

#[test]
fn test_dead_code_after_return() {
    let module = lower("def int f() {\n  return 1;\n  int x = 2;\n  return x;\n}");
    let f = module.function("f").unwrap();
    assert_eq!(labels(f), vec!["entry", "dead1"]);
    assert!(matches!(
        f.blocks[1].terminator,
        Some(Terminator::Ret { value: Some(_), .. })
    ));
}

#[test]
fn test_string_literals() {
    let module = lower("string s = \"hi\";\nstring t = \"hi\";");

    let text = module.to_string();
    assert!(text.contains("@.str.0 = private unnamed_addr constant [2 x i8] c\"hi\""));
    assert!(text.contains("@s = global ptr @.str.0"));
    assert!(text.contains("@t = global ptr @.str.0"));
    assert_eq!(module.globals.len(), 3);
}

#[test]
fn test_calls() {
    let module = lower("def void hello() { return; }\nhello();\ndef int one() { return 1; }\nint x = one();");
    let init = module.function(MODULE_INIT).unwrap();
    let text = init.to_string();
    assert!(text.contains("  call void @hello()"), "{text}");
    assert!(text.contains("= call i64 @one()"), "{text}");
}

#[test]
fn test_global_named_like_function() {
    let module = lower("def int f() { return 1; }\nint f = 2;\nint g = f;");
    assert!(module.global("f.var").is_some());
    assert!(module.global("f").is_none());

    let init = module.function(MODULE_INIT).unwrap();
    assert!(init.to_string().contains("load i64, ptr @f.var"));
}

#[test]
fn test_shadowed_local_gets_own_slot() {
    let src = "def int f(bool c) {\n\
               int x = 1;\n\
               if (c) { int x = 2; x = 3; }\n\
               return x;\n\
               }";
    let module = lower(src);
    let f = module.function("f").unwrap();
    let allocas = f.blocks[0]
        .instructions
        .iter()
        .filter(|inst| matches!(inst, Instruction::Alloca { .. }))
        .count();
    assert_eq!(allocas, 3);

    // the return reads the outer slot
    let outer = "%x.addr2";
    let merge = f.block("merge2").unwrap();
    assert!(matches!(
        &merge.instructions[0],
        Instruction::Load { ptr: Value::Register(slot), .. } if slot == outer
    ));
}

#[test]
fn test_unsupported_arithmetic() {
    let err = lower_err("bool b = true + false;");
    assert_eq!(err.kind, ErrorKind::Codegen);
    assert_eq!(err.message, "operator '+' is not supported for type bool");
    assert_eq!(err.line, 1);

    let err = lower_err("string s = \"a\" * \"b\";");
    assert_eq!(err.message, "operator '*' is not supported for type string");
}

#[test]
fn test_reserved_function_name() {
    let err = lower_err("def void __pyrx_module_init() { return; }");
    assert_eq!(err.kind, ErrorKind::Codegen);
    assert_eq!(
        err.message,
        "function name '__pyrx_module_init' is reserved"
    );
}

#[test]
fn test_void_call_as_value() {
    let loc = Location::new(0..1, 1);
    let items = vec![
        Item::Function(FunctionDefinition {
            name: "v".to_string(),
            return_type: Type::Void,
            params: vec![],
            body: vec![],
            loc: loc.clone(),
        }),
        Item::Stmt(Stmt::VarDef {
            name: "x".to_string(),
            ty: Type::Int,
            value: Expr::call("v", vec![], Type::Void, loc.clone()),
            loc,
        }),
    ];
    let err = CodeGenerator::new("main").generate(&items).unwrap_err();
    assert_eq!(err.message, "call to void function 'v' used as a value");
}

#[test]
fn test_wide_character() {
    let loc = Location::new(0..3, 1);
    let items = vec![Item::Stmt(Stmt::VarDef {
        name: "c".to_string(),
        ty: Type::Char,
        value: Expr::char('é', loc.clone()),
        loc,
    })];
    let err = CodeGenerator::new("main").generate(&items).unwrap_err();
    assert_eq!(err.message, "character 'é' does not fit in 8 bits");
}

#[test]
fn test_parameter_types() {
    let loc = Location::default();
    let items = vec![Item::Function(FunctionDefinition {
        name: "f".to_string(),
        return_type: Type::Void,
        params: vec![
            Param {
                name: "s".to_string(),
                ty: Type::String,
                loc: loc.clone(),
            },
            Param {
                name: "c".to_string(),
                ty: Type::Char,
                loc: loc.clone(),
            },
        ],
        body: vec![],
        loc,
    })];
    let module = CodeGenerator::new("main").generate(&items).unwrap();
    let f = module.function("f").unwrap();
    assert_eq!(
        f.params,
        vec![("s".to_string(), IRType::Ptr), ("c".to_string(), IRType::I8)]
    );
}

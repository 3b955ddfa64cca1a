use super::*;
use crate::ast::{BinOp, Expr, ExprKind};
use crate::diagnostic::ErrorKind;

fn parse_str(input: &str) -> Result<Vec<Item>, CompileError> {
    let mut parser = Parser::new(Lexer::new(input))?;
    parser.parse_program()
}

fn parse_err(input: &str) -> CompileError {
    match parse_str(input) {
        Ok(items) => panic!("expected an error, parsed {items:?}"),
        Err(err) => err,
    }
}

fn var_def(item: &Item) -> (&str, Type, &Expr) {
    match item {
        Item::Stmt(Stmt::VarDef {
            name, ty, value, ..
        }) => (name, *ty, value),
        other => panic!("expected a variable definition, got {other:?}"),
    }
}

fn function(item: &Item) -> &crate::ast::FunctionDefinition {
    match item {
        Item::Function(function) => function,
        other => panic!("expected a function, got {other:?}"),
    }
}

#[test]
fn test_parse_two_definitions() {
    let items = parse_str("int a = 5; int b = a;").unwrap();
    assert_eq!(items.len(), 2);

    let (name, ty, value) = var_def(&items[0]);
    assert_eq!((name, ty), ("a", Type::Int));
    assert_eq!(value.kind, ExprKind::Int(5));

    let (name, ty, value) = var_def(&items[1]);
    assert_eq!((name, ty), ("b", Type::Int));
    assert_eq!(value.kind, ExprKind::Identifier("a".to_string()));
    assert_eq!(value.ty(), Type::Int);
}

#[test]
fn test_parse_literal_definitions() {
    let items =
        parse_str("float f = 1.5; char c = 'z'; string s = \"hi\"; bool t = true;").unwrap();
    assert_eq!(var_def(&items[0]).2.kind, ExprKind::Float(1.5));
    assert_eq!(var_def(&items[1]).2.kind, ExprKind::Char('z'));
    assert_eq!(var_def(&items[2]).2.kind, ExprKind::String("hi".to_string()));
    assert_eq!(var_def(&items[3]).2.kind, ExprKind::Bool(true));
}

#[test]
fn test_declaration_then_assignment() {
    let items = parse_str("float y;\ny = 2.5;").unwrap();
    assert!(matches!(
        &items[0],
        Item::Stmt(Stmt::VarDecl { name, ty: Type::Float, .. }) if name == "y"
    ));
    match &items[1] {
        Item::Stmt(Stmt::Assign { name, value, loc }) => {
            assert_eq!(name, "y");
            assert_eq!(value.ty(), Type::Float);
            assert_eq!(loc.line, 2);
        }
        other => panic!("expected an assignment, got {other:?}"),
    }
}

#[test]
fn test_definition_type_mismatch() {
    let mut parser = Parser::new(Lexer::new("int x = 3.5;")).unwrap();
    let err = parser.parse_program().unwrap_err();

    assert_eq!(err.kind, ErrorKind::Syntax);
    assert_eq!(
        err.message,
        "defining a variable with incorrect type: 'x' is int but the value is float"
    );
    assert_eq!(err.line, 1);

    let x = parser.symbols().variable_lookup("x").unwrap();
    assert!(!x.initialized);
}

#[test]
fn test_undefined_variable() {
    let err = parse_err("int a = 1;\nint b = c;");
    assert_eq!(err.message, "variable 'c' not yet defined");
    assert_eq!(err.line, 2);
    assert_eq!(err.to_string(), "Error: variable 'c' not yet defined on line 2");
}

#[test]
fn test_uninitialized_variable() {
    let err = parse_err("float y;\nfloat z = y + 1.0;");
    assert_eq!(err.message, "variable 'y' not yet initialized");
    assert_eq!(err.line, 2);
}

#[test]
fn test_self_reference_in_initializer() {
    let err = parse_err("int x = x + 1;");
    assert_eq!(err.message, "variable 'x' not yet initialized");
}

#[test]
fn test_assignment_to_undeclared() {
    let err = parse_err("q = 1;");
    assert_eq!(err.message, "variable 'q' not yet declared");
}

#[test]
fn test_assignment_type_mismatch() {
    let err = parse_err("char c;\nc = 1;");
    assert_eq!(
        err.message,
        "assigning a value of type int to variable 'c' of type char"
    );
}

#[test]
fn test_void_variable() {
    let err = parse_err("void v;");
    assert_eq!(err.message, "variable 'v' cannot have type void");
}

#[test]
fn test_precedence() {
    let items = parse_str("int a = 1 + 2 * 3 - 4;").unwrap();
    let (_, _, value) = var_def(&items[0]);

    // (1 + (2 * 3)) - 4
    let ExprKind::Binary { op, lhs, rhs } = &value.kind else {
        panic!("expected a binary expression, got {value:?}");
    };
    assert_eq!(*op, BinOp::Sub);
    assert_eq!(rhs.kind, ExprKind::Int(4));

    let ExprKind::Binary { op, lhs, rhs } = &lhs.kind else {
        panic!("expected an addition");
    };
    assert_eq!(*op, BinOp::Add);
    assert_eq!(lhs.kind, ExprKind::Int(1));
    assert!(matches!(rhs.kind, ExprKind::Binary { op: BinOp::Mul, .. }));
}

#[test]
fn test_left_associativity() {
    let items = parse_str("int a = 8 / 4 / 2;").unwrap();
    let (_, _, value) = var_def(&items[0]);

    // (8 / 4) / 2
    let ExprKind::Binary { op, lhs, rhs } = &value.kind else {
        panic!("expected a binary expression");
    };
    assert_eq!(*op, BinOp::Div);
    assert_eq!(rhs.kind, ExprKind::Int(2));
    assert!(matches!(lhs.kind, ExprKind::Binary { op: BinOp::Div, .. }));
}

#[test]
fn test_parentheses_override_precedence() {
    let items = parse_str("int a = (1 + 2) * 3;").unwrap();
    let (_, _, value) = var_def(&items[0]);
    let ExprKind::Binary { op, lhs, .. } = &value.kind else {
        panic!("expected a binary expression");
    };
    assert_eq!(*op, BinOp::Mul);
    assert!(matches!(lhs.kind, ExprKind::Binary { op: BinOp::Add, .. }));
}

#[test]
fn test_precedence_table() {
    assert!(expression::precedence(BinOp::Mul) > expression::precedence(BinOp::Add));
    assert_eq!(
        expression::precedence(BinOp::Add),
        expression::precedence(BinOp::Sub)
    );
    assert_eq!(
        expression::precedence(BinOp::Mul),
        expression::precedence(BinOp::Div)
    );
    assert_eq!(expression::binary_operator(&Token::Div), Some(BinOp::Div));
    assert_eq!(expression::binary_operator(&Token::Assign), None);
}

#[test]
fn test_binary_type_mismatch() {
    let err = parse_err("int a = 1 + 2.0;");
    assert_eq!(
        err.message,
        "invalid types connected in binary expression: int + float"
    );
}

#[test]
fn test_function_with_parameters() {
    let items = parse_str("def int add(int a, int b) {\n  return a + b;\n}").unwrap();
    let add = function(&items[0]);

    assert_eq!(add.name, "add");
    assert_eq!(add.return_type, Type::Int);
    assert_eq!(add.param_types(), vec![Type::Int, Type::Int]);
    assert!(matches!(
        add.return_expr().map(|expr| &expr.kind),
        Some(ExprKind::Binary { op: BinOp::Add, .. })
    ));
}

#[test]
fn test_parameters_leave_scope() {
    let err = parse_err("def int id(int a) { return a; }\nint b = a;");
    assert_eq!(err.message, "variable 'a' not yet defined");
    assert_eq!(err.line, 2);
}

#[test]
fn test_call_and_recursion() {
    let src = "def int f(int n) { return f(n - 1); }\nint r = f(3);";
    let items = parse_str(src).unwrap();

    let (_, ty, value) = var_def(&items[1]);
    assert_eq!(ty, Type::Int);
    let ExprKind::Call { name, args } = &value.kind else {
        panic!("expected a call, got {value:?}");
    };
    assert_eq!(name, "f");
    assert_eq!(args.len(), 1);
}

#[test]
fn test_call_checks() {
    let err = parse_err("int r = g();");
    assert_eq!(err.message, "function 'g' not yet defined");

    let err = parse_err("def int f(int n) { return n; }\nint r = f(1, 2);");
    assert_eq!(
        err.message,
        "function 'f' expects 1 argument(s) but 2 were given"
    );

    let err = parse_err("def int f(int n) { return n; }\nint r = f('c');");
    assert_eq!(
        err.message,
        "argument 1 of call to 'f' has type char but int was expected"
    );
}

#[test]
fn test_void_call_statement() {
    let items = parse_str("def void hello() { return; }\nhello();").unwrap();
    assert!(matches!(
        &items[1],
        Item::Stmt(Stmt::Expr(Expr { kind: ExprKind::Call { .. }, .. }))
    ));
}

#[test]
fn test_function_declaration_checks() {
    let err = parse_err("def int f() { return 1; }\ndef int f() { return 2; }");
    assert_eq!(err.message, "function 'f' already defined");
    assert_eq!(err.line, 2);

    let err = parse_err("def int f(int a, float a) { return 1; }");
    assert_eq!(
        err.message,
        "parameter 'a' already exists in the current scope"
    );

    let err = parse_err("def int f() { def int g() { return 1; } }");
    assert_eq!(err.message, "functions can only be defined at the top level");
}

#[test]
fn test_return_checks() {
    let err = parse_err("return 1;");
    assert_eq!(err.message, "return statement outside of a function");

    let err = parse_err("def int f() { return 1.0; }");
    assert_eq!(
        err.message,
        "return type does not match type of the function: 'f' returns int but the value is float"
    );

    let err = parse_err("def int f() { return; }");
    assert!(err.message.contains("returns int but the value is void"));
}

#[test]
fn test_void_call_results_are_rejected() {
    let err = parse_err("def void g() { return; }\ndef void f() { return g(); }");
    assert_eq!(err.kind, ErrorKind::Syntax);
    assert_eq!(
        err.message,
        "function 'f' returns void but a void value is returned"
    );
    assert_eq!(err.line, 2);

    let err = parse_err("def void g() { return; }\ng() + g();");
    assert_eq!(err.message, "operand of '+' has type void and produces no value");
    assert_eq!(err.line, 2);
}

#[test]
fn test_if_else_are_siblings() {
    let src = "def int pick(bool c) {\n  if (c) { return 1; } else { return 2; }\n}";
    let items = parse_str(src).unwrap();
    let pick = function(&items[0]);

    assert_eq!(pick.body.len(), 2);
    assert!(matches!(&pick.body[0], Stmt::If { body, .. } if body.len() == 1));
    assert!(matches!(&pick.body[1], Stmt::Else { body, .. } if body.len() == 1));
}

#[test]
fn test_else_if_nests_in_else() {
    let src = "def int pick(bool a, bool b) {\n\
               if (a) { return 1; } else if (b) { return 2; } else { return 3; }\n\
               }";
    let items = parse_str(src).unwrap();
    let pick = function(&items[0]);

    assert_eq!(pick.body.len(), 2);
    let Stmt::Else { body, .. } = &pick.body[1] else {
        panic!("expected an else");
    };
    assert!(matches!(body.as_slice(), [Stmt::If { .. }, Stmt::Else { .. }]));
}

#[test]
fn test_if_block_scope() {
    let err = parse_err(
        "def int f(bool c) {\n  if (c) { int t = 1; }\n  return t;\n}",
    );
    assert_eq!(err.message, "variable 't' not yet defined");
    assert_eq!(err.line, 3);
}

#[test]
fn test_if_condition_must_be_bool() {
    let err = parse_err("def void f(int n) { if (n) { return; } }");
    assert_eq!(err.message, "if condition must be of type bool, found int");
}

#[test]
fn test_if_outside_function() {
    let err = parse_err("if (true) { }");
    assert_eq!(err.message, "'if' is only allowed inside a function body");
}

#[test]
fn test_stray_else() {
    let err = parse_err("def void f() { else { } }");
    assert_eq!(err.message, "'else' without a matching 'if'");
}

#[test]
fn test_unsupported_keywords() {
    for (src, keyword) in [
        ("for", "for"),
        ("while", "while"),
        ("class", "class"),
        ("graph", "graph"),
    ] {
        let err = parse_err(src);
        assert_eq!(err.kind, ErrorKind::Syntax);
        assert_eq!(err.message, format!("'{keyword}' is not supported"));
    }
}

#[test]
fn test_empty_statements() {
    let items = parse_str(";; int a = 1;;").unwrap();
    assert_eq!(items.len(), 1);
}

#[test]
fn test_missing_semicolon() {
    let err = parse_err("int a = 1\nint b = 2;");
    assert!(err.message.starts_with("expected ';'"), "{}", err.message);
    assert_eq!(err.line, 2);
}

#[test]
fn test_unclosed_function_body() {
    let err = parse_err("def void f() {\n  int a = 1;\n");
    assert_eq!(err.message, "expected '}' but reached end of file");
}

#[test]
fn test_lexical_error_stops_parsing() {
    let err = parse_err("int a = 3..5;");
    assert_eq!(err.kind, ErrorKind::Lexical);
    assert_eq!(err.message, "too many decimal points");
    assert_eq!(err.line, 1);
}

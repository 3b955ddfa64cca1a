use std::fmt;
use std::ops::Range;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Type {
    Int,
    Float,
    Char,
    String,
    Bool,
    Void,
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Type::Int => "int",
            Type::Float => "float",
            Type::Char => "char",
            Type::String => "string",
            Type::Bool => "bool",
            Type::Void => "void",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl fmt::Display for BinOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
        };
        f.write_str(symbol)
    }
}

/// Where a node came from: byte range for reports, line for messages.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Location {
    pub range: Range<usize>,
    pub line: usize,
}

impl Location {
    pub fn new(range: Range<usize>, line: usize) -> Self {
        Location { range, line }
    }

    /// Covers both locations, keeping the line of the first.
    pub fn to(&self, other: &Location) -> Location {
        Location {
            range: self.range.start..other.range.end.max(self.range.end),
            line: self.line,
        }
    }
}

/// An expression with the type it was given when it was built.
///
/// The type is private so that nothing can rewrite it after construction;
/// validation may only reject a tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    ty: Type,
    pub loc: Location,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Int(i64),
    Float(f32),
    Char(char),
    String(String),
    Bool(bool),

    Identifier(String),

    Binary {
        op: BinOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },

    Call {
        name: String,
        args: Vec<Expr>,
    },
}

impl Expr {
    pub fn int(value: i64, loc: Location) -> Self {
        Expr {
            kind: ExprKind::Int(value),
            ty: Type::Int,
            loc,
        }
    }

    pub fn float(value: f32, loc: Location) -> Self {
        Expr {
            kind: ExprKind::Float(value),
            ty: Type::Float,
            loc,
        }
    }

    pub fn char(value: char, loc: Location) -> Self {
        Expr {
            kind: ExprKind::Char(value),
            ty: Type::Char,
            loc,
        }
    }

    pub fn string(value: impl Into<String>, loc: Location) -> Self {
        Expr {
            kind: ExprKind::String(value.into()),
            ty: Type::String,
            loc,
        }
    }

    pub fn bool(value: bool, loc: Location) -> Self {
        Expr {
            kind: ExprKind::Bool(value),
            ty: Type::Bool,
            loc,
        }
    }

    /// `ty` is the type the name resolved to when the reference was parsed.
    pub fn identifier(name: impl Into<String>, ty: Type, loc: Location) -> Self {
        Expr {
            kind: ExprKind::Identifier(name.into()),
            ty,
            loc,
        }
    }

    pub fn binary(op: BinOp, lhs: Expr, rhs: Expr, ty: Type) -> Self {
        let loc = lhs.loc.to(&rhs.loc);
        Expr {
            kind: ExprKind::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            },
            ty,
            loc,
        }
    }

    pub fn call(name: impl Into<String>, args: Vec<Expr>, ty: Type, loc: Location) -> Self {
        Expr {
            kind: ExprKind::Call {
                name: name.into(),
                args,
            },
            ty,
            loc,
        }
    }

    pub fn ty(&self) -> Type {
        self.ty
    }

    pub fn is_literal(&self) -> bool {
        matches!(
            self.kind,
            ExprKind::Int(_)
                | ExprKind::Float(_)
                | ExprKind::Char(_)
                | ExprKind::String(_)
                | ExprKind::Bool(_)
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    VarDecl {
        name: String,
        ty: Type,
        loc: Location,
    },

    VarDef {
        name: String,
        ty: Type,
        value: Expr,
        loc: Location,
    },

    Assign {
        name: String,
        value: Expr,
        loc: Location,
    },

    Return {
        value: Option<Expr>,
        loc: Location,
    },

    Expr(Expr),

    // an `Else` is always the statement right after its `If`
    If {
        condition: Expr,
        body: Vec<Stmt>,
        loc: Location,
    },

    Else {
        body: Vec<Stmt>,
        loc: Location,
    },
}

impl Stmt {
    pub fn loc(&self) -> &Location {
        match self {
            Stmt::VarDecl { loc, .. }
            | Stmt::VarDef { loc, .. }
            | Stmt::Assign { loc, .. }
            | Stmt::Return { loc, .. }
            | Stmt::If { loc, .. }
            | Stmt::Else { loc, .. } => loc,
            Stmt::Expr(expr) => &expr.loc,
        }
    }

    /// Whether every path through `body` ends in a `return`. An `if`
    /// only counts together with the `else` right after it.
    pub fn always_returns(body: &[Stmt]) -> bool {
        body.iter().enumerate().any(|(index, stmt)| match stmt {
            Stmt::Return { .. } => true,
            Stmt::If {
                body: then_body, ..
            } => matches!(
                body.get(index + 1),
                Some(Stmt::Else { body: else_body, .. })
                    if Stmt::always_returns(then_body) && Stmt::always_returns(else_body)
            ),
            _ => false,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub ty: Type,
    pub loc: Location,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDefinition {
    pub name: String,
    pub return_type: Type,
    pub params: Vec<Param>,
    pub body: Vec<Stmt>,
    pub loc: Location,
}

impl FunctionDefinition {
    /// Value of the last `return` written directly in the body, if any.
    pub fn return_expr(&self) -> Option<&Expr> {
        self.body.iter().rev().find_map(|stmt| match stmt {
            Stmt::Return { value, .. } => value.as_ref(),
            _ => None,
        })
    }

    pub fn param_types(&self) -> Vec<Type> {
        self.params.iter().map(|param| param.ty).collect()
    }
}

/// A top-level entry of a compilation unit.
#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    Function(FunctionDefinition),
    Stmt(Stmt),
}

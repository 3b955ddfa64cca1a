use crate::ast::{BinOp, Expr, ExprKind, Location, Type};
use crate::codegen::{CodeGenerator, error};
use crate::diagnostic::CompileError;
use crate::ir::{Constant, IRType, Instruction, Value};

impl CodeGenerator {
    pub fn generate_expr(&mut self, expr: &Expr) -> Result<Value, CompileError> {
        match &expr.kind {
            ExprKind::Int(val) => Ok(Value::Constant(Constant::Int(*val))),
            ExprKind::Float(val) => Ok(Value::Constant(Constant::Float(f64::from(*val)))),
            ExprKind::Bool(val) => Ok(Value::Constant(Constant::Bool(*val))),
            ExprKind::Char(c) => {
                let Ok(byte) = u8::try_from(*c) else {
                    return Err(error(
                        &expr.loc,
                        format!("character '{c}' does not fit in 8 bits"),
                    ));
                };
                Ok(Value::Constant(Constant::I8(byte)))
            }
            ExprKind::String(s) => Ok(self.builder.add_string_literal(s.as_bytes())),

            ExprKind::Identifier(name) => {
                let (ty, storage) = self.storage(name, &expr.loc)?;
                let result_reg = self.builder.new_register();
                self.builder.add_instruction(Instruction::Load {
                    dest: result_reg.clone(),
                    ptr: storage,
                    ty: IRType::from(ty),
                    span: expr.loc.range.clone(),
                });
                Ok(Value::Register(result_reg))
            }

            ExprKind::Binary { op, lhs, rhs } => self.generate_binary(*op, lhs, rhs, expr),

            ExprKind::Call { name, args } => {
                match self.generate_call(name, args, expr.ty(), &expr.loc)? {
                    Some(value) => Ok(value),
                    None => Err(error(
                        &expr.loc,
                        format!("call to void function '{name}' used as a value"),
                    )),
                }
            }
        }
    }

    /// Picks the arithmetic instruction for the operator. Integer and char
    /// operands use integer arithmetic at their own width, floats use
    /// floating point; nothing is widened.
    fn generate_binary(
        &mut self,
        op: BinOp,
        lhs: &Expr,
        rhs: &Expr,
        expr: &Expr,
    ) -> Result<Value, CompileError> {
        if lhs.ty() != rhs.ty() || lhs.ty() != expr.ty() {
            return Err(error(
                &expr.loc,
                format!(
                    "cannot apply '{op}' to {} and {} without a conversion",
                    lhs.ty(),
                    rhs.ty()
                ),
            ));
        }
        if !matches!(expr.ty(), Type::Int | Type::Float | Type::Char) {
            return Err(error(
                &expr.loc,
                format!("operator '{op}' is not supported for type {}", expr.ty()),
            ));
        }

        let lhs = self.generate_expr(lhs)?;
        let rhs = self.generate_expr(rhs)?;
        let dest = self.builder.new_register();
        let ty = IRType::from(expr.ty());
        let span = expr.loc.range.clone();

        let instruction = match op {
            BinOp::Add => Instruction::Add {
                dest: dest.clone(),
                lhs,
                rhs,
                ty,
                span,
            },
            BinOp::Sub => Instruction::Sub {
                dest: dest.clone(),
                lhs,
                rhs,
                ty,
                span,
            },
            BinOp::Mul => Instruction::Mul {
                dest: dest.clone(),
                lhs,
                rhs,
                ty,
                span,
            },
            BinOp::Div => Instruction::Div {
                dest: dest.clone(),
                lhs,
                rhs,
                ty,
                span,
            },
        };
        self.builder.add_instruction(instruction);
        Ok(Value::Register(dest))
    }

    /// Emits the call; the result register is absent for void functions.
    pub(super) fn generate_call(
        &mut self,
        name: &str,
        args: &[Expr],
        ty: Type,
        loc: &Location,
    ) -> Result<Option<Value>, CompileError> {
        if self.builder.function_index(name).is_none() {
            return Err(error(loc, format!("call to undeclared function '{name}'")));
        }

        let mut arg_values = Vec::with_capacity(args.len());
        for arg in args {
            arg_values.push(self.generate_expr(arg)?);
        }

        let dest = (ty != Type::Void).then(|| self.builder.new_register());
        self.builder.add_instruction(Instruction::Call {
            dest: dest.clone(),
            func: Value::Global(name.to_string()),
            args: arg_values,
            ty: IRType::from(ty),
            span: loc.range.clone(),
        });
        Ok(dest.map(Value::Register))
    }
}

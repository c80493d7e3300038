//! Integer arithmetic. Eager results use two's-complement wrapping;
//! division truncates toward zero and the remainder keeps the dividend's
//! sign. Division by zero is a reported error, not a crash.

use crate::ast::{AstNode, MathOp};
use crate::diag::{self, Diagnostic};
use crate::value::Value;

use super::lowered_node;

/// add : int -> int -> int
pub fn add(lhs: &Value, rhs: &Value) -> Value {
    binary_math(MathOp::Add, lhs, rhs)
}

/// sub : int -> int -> int
pub fn sub(lhs: &Value, rhs: &Value) -> Value {
    binary_math(MathOp::Sub, lhs, rhs)
}

/// mul : int -> int -> int
pub fn mul(lhs: &Value, rhs: &Value) -> Value {
    binary_math(MathOp::Mul, lhs, rhs)
}

/// div : int -> int -> int
pub fn div(lhs: &Value, rhs: &Value) -> Value {
    binary_math(MathOp::Div, lhs, rhs)
}

/// rem : int -> int -> int
pub fn rem(lhs: &Value, rhs: &Value) -> Value {
    binary_math(MathOp::Rem, lhs, rhs)
}

fn binary_math(op: MathOp, lhs: &Value, rhs: &Value) -> Value {
    if lhs.is_runtime() || rhs.is_runtime() {
        let (Some(l), Some(r)) = (lowered_node(lhs), lowered_node(rhs)) else {
            return Value::error();
        };
        return Value::runtime(AstNode::math(lhs.loc(), op, l, r));
    }
    if !lhs.is_int() && !lhs.is_error() {
        diag::report(lhs.loc(), Diagnostic::ArithmeticOperand(lhs.ty()));
        return Value::error();
    }
    if !rhs.is_int() && !rhs.is_error() {
        diag::report(rhs.loc(), Diagnostic::ArithmeticOperand(rhs.ty()));
        return Value::error();
    }
    if lhs.is_error() || rhs.is_error() {
        return Value::error();
    }
    let (a, b) = (lhs.as_int().unwrap_or(0), rhs.as_int().unwrap_or(0));
    let result = match op {
        MathOp::Add => a.wrapping_add(b),
        MathOp::Sub => a.wrapping_sub(b),
        MathOp::Mul => a.wrapping_mul(b),
        MathOp::Div | MathOp::Rem => {
            if b == 0 {
                diag::report(rhs.loc(), Diagnostic::DivisionByZero);
                return Value::error();
            }
            if op == MathOp::Div {
                a.wrapping_div(b)
            } else {
                a.wrapping_rem(b)
            }
        }
    };
    Value::int(result, lhs.loc())
}

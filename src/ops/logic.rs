//! Boolean connectives. All binary connectives are strict in both operands;
//! short-circuiting is a surface-syntax concern, not an operator one.

use crate::ast::{AstNode, LogicOp};
use crate::diag::{self, Diagnostic};
use crate::value::Value;

use super::lowered_node;

/// and : bool -> bool -> bool
pub fn logical_and(lhs: &Value, rhs: &Value) -> Value {
    binary_logic(LogicOp::And, lhs, rhs)
}

/// or : bool -> bool -> bool
pub fn logical_or(lhs: &Value, rhs: &Value) -> Value {
    binary_logic(LogicOp::Or, lhs, rhs)
}

/// xor : bool -> bool -> bool
pub fn logical_xor(lhs: &Value, rhs: &Value) -> Value {
    binary_logic(LogicOp::Xor, lhs, rhs)
}

/// not : bool -> bool
pub fn logical_not(v: &Value) -> Value {
    if v.is_runtime() {
        let Some(node) = lowered_node(v) else {
            return Value::error();
        };
        return Value::runtime(AstNode::not(v.loc(), node));
    }
    if !v.is_bool() && !v.is_error() {
        diag::report(v.loc(), Diagnostic::LogicalOperand(v.ty()));
        return Value::error();
    }
    if v.is_error() {
        return Value::error();
    }
    Value::boolean(!v.as_bool().unwrap_or(false), v.loc())
}

fn binary_logic(op: LogicOp, lhs: &Value, rhs: &Value) -> Value {
    if lhs.is_runtime() || rhs.is_runtime() {
        let (Some(l), Some(r)) = (lowered_node(lhs), lowered_node(rhs)) else {
            return Value::error();
        };
        return Value::runtime(AstNode::logic(lhs.loc(), op, l, r));
    }
    if !lhs.is_bool() && !lhs.is_error() {
        diag::report(lhs.loc(), Diagnostic::LogicalOperand(lhs.ty()));
        return Value::error();
    }
    if !rhs.is_bool() && !rhs.is_error() {
        diag::report(rhs.loc(), Diagnostic::LogicalOperand(rhs.ty()));
        return Value::error();
    }
    if lhs.is_error() || rhs.is_error() {
        return Value::error();
    }
    let (a, b) = (lhs.as_bool().unwrap_or(false), rhs.as_bool().unwrap_or(false));
    let result = match op {
        LogicOp::And => a && b,
        LogicOp::Or => a || b,
        LogicOp::Xor => a ^ b,
    };
    Value::boolean(result, lhs.loc())
}

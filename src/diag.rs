//! Diagnostics. Failures in the core never unwind: the offending operation
//! reports exactly one diagnostic through the sink and returns the ERROR
//! value, and ERROR inputs flow through later operations silently. The host
//! drains the sink after a pass to show everything at once.

use std::cell::RefCell;
use std::fmt::{self, Display};

use thiserror::Error;

use crate::loc::Loc;
use crate::symbol::Name;
use crate::types::TypeRef;

#[derive(Clone, Debug, PartialEq, Error)]
pub enum Diagnostic {
    #[error("expected integer value in arithmetic expression, given '{0}'")]
    ArithmeticOperand(TypeRef),

    #[error("expected boolean value in logical expression, given '{0}'")]
    LogicalOperand(TypeRef),

    #[error("expected integer or string value in relational expression, given '{0}'")]
    RelationalOperand(TypeRef),

    #[error("relational operands must share a type, given '{0}' and '{1}'")]
    RelationalMismatch(TypeRef, TypeRef),

    #[error("expected list value, given '{0}'")]
    ListOperand(TypeRef),

    #[error("tail of a cons cell must be a list or void, given '{0}'")]
    ConsTail(TypeRef),

    #[error("expected string or list value, given '{0}'")]
    LengthOperand(TypeRef),

    #[error("expected string value, given '{0}'")]
    StringOperand(TypeRef),

    #[error("expected integer index, given '{0}'")]
    IndexOperand(TypeRef),

    #[error("string index {0} out of bounds for length {1}")]
    IndexOutOfBounds(i64, usize),

    #[error("expected boolean condition, given '{0}'")]
    Condition(TypeRef),

    #[error("division by zero")]
    DivisionByZero,

    #[error("called value is not a procedure")]
    NotCallable,

    #[error("arguments were not provided as a product")]
    ArgumentsNotProduct,

    #[error("procedure requires {expected} arguments, {given} provided")]
    Arity { expected: usize, given: usize },

    #[error("expected keyword '{0}'")]
    Keyword(Name),

    #[error("could not deduce type for function parameter, resolved to '{0}'")]
    ParameterType(TypeRef),

    #[error("could not lower value '{0}' to runtime")]
    Unlowerable(String),

    #[error("invalid destination in assignment '{0}'")]
    AssignTarget(String),

    #[error("undefined variable '{0}'")]
    Undefined(Name),
}

/// One reported diagnostic, anchored to the offending operand.
#[derive(Clone, Debug, PartialEq)]
pub struct Report {
    pub loc: Loc,
    pub diagnostic: Diagnostic,
}

impl Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.loc, self.diagnostic)
    }
}

thread_local! {
    static SINK: RefCell<Vec<Report>> = const { RefCell::new(Vec::new()) };
}

pub fn report(loc: Loc, diagnostic: Diagnostic) {
    tracing::debug!(%loc, %diagnostic, "diagnostic");
    SINK.with(|s| s.borrow_mut().push(Report { loc, diagnostic }));
}

/// Takes every report accumulated so far, leaving the sink empty.
pub fn drain() -> Vec<Report> {
    SINK.with(|s| s.borrow_mut().drain(..).collect())
}

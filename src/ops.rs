//! The primitive operators. Every operator works in two modes: when all
//! operands are concrete it computes the result on the spot, and as soon as
//! any operand is a runtime value it lowers the rest and emits the matching
//! AST node instead. Type errors report one diagnostic and produce the ERROR
//! value; ERROR operands flow through silently.

pub mod compare;
pub mod list;
pub mod logic;
pub mod math;
pub mod string;

pub use compare::{equal, greater, greater_equal, inequal, less, less_equal};
pub use list::{cons, empty, head, is_empty, length, list_of, list_of_vec, tail};
pub use logic::{logical_and, logical_not, logical_or, logical_xor};
pub use math::{add, div, mul, rem, sub};
pub use string::char_at;

use crate::ast::{AstNode, AstRef};
use crate::lower::lower;
use crate::value::Value;

/// type_of : a -> type
///
/// Never lowered: the type of a runtime value is its runtime descriptor,
/// which is already known at compile time.
pub fn type_of(v: &Value) -> Value {
    Value::of_type(v.ty(), v.loc())
}

/// display : a -> ()
///
/// Printing is a runtime effect, so display always lowers its operand.
pub fn display(v: &Value) -> Value {
    match lower(v).as_runtime() {
        Some(node) => Value::runtime(AstNode::display(v.loc(), node.clone())),
        None => Value::error(),
    }
}

/// Lowers an operand that is about to be spliced into an AST node. Returns
/// None when the operand cannot be lowered; the diagnostic has already been
/// reported by `lower`.
pub(crate) fn lowered_node(v: &Value) -> Option<AstRef> {
    lower(v).as_runtime().cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::AstKind;
    use crate::loc::Loc;
    use crate::types;

    #[test]
    fn type_of_reports_the_descriptor() {
        let loc = Loc::default();
        assert_eq!(type_of(&Value::int(1, loc)).as_type(), Some(types::int()));
        let rt = Value::runtime(AstNode::int(loc, 1));
        assert_eq!(
            type_of(&rt).as_type(),
            Some(types::runtime(types::int()))
        );
    }

    #[test]
    fn display_always_lowers() {
        let loc = Loc::default();
        let out = display(&Value::int(3, loc));
        assert!(out.is_runtime());
        let node = out.as_runtime().unwrap();
        assert!(matches!(node.kind(), AstKind::Display(_)));
        assert_eq!(node.ty(), types::void());
    }
}

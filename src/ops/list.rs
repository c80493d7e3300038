//! List primitives. The empty list is the void value, so a cons chain is
//! always terminated by void and `is_empty` accepts both shapes.

use crate::ast::AstNode;
use crate::diag::{self, Diagnostic};
use crate::value::{to_vector, Value};

use super::lowered_node;

/// head : [a] -> a
pub fn head(v: &Value) -> Value {
    if v.is_runtime() {
        let Some(node) = lowered_node(v) else {
            return Value::error();
        };
        return Value::runtime(AstNode::head(v.loc(), node));
    }
    if !v.is_list() && !v.is_error() {
        diag::report(v.loc(), Diagnostic::ListOperand(v.ty()));
        return Value::error();
    }
    if v.is_error() {
        return Value::error();
    }
    match v.as_list() {
        Some(cell) => cell.head.clone(),
        None => Value::error(),
    }
}

/// tail : [a] -> [a]
pub fn tail(v: &Value) -> Value {
    if v.is_runtime() {
        let Some(node) = lowered_node(v) else {
            return Value::error();
        };
        return Value::runtime(AstNode::tail(v.loc(), node));
    }
    if !v.is_list() && !v.is_error() {
        diag::report(v.loc(), Diagnostic::ListOperand(v.ty()));
        return Value::error();
    }
    if v.is_error() {
        return Value::error();
    }
    match v.as_list() {
        Some(cell) => cell.tail.clone(),
        None => Value::error(),
    }
}

/// cons : a -> [a] -> [a]
pub fn cons(head: &Value, tail: &Value) -> Value {
    if head.is_runtime() || tail.is_runtime() {
        let (Some(h), Some(t)) = (lowered_node(head), lowered_node(tail)) else {
            return Value::error();
        };
        return Value::runtime(AstNode::cons(head.loc(), h, t));
    }
    if !tail.is_list() && !tail.is_void() && !tail.is_error() {
        diag::report(tail.loc(), Diagnostic::ConsTail(tail.ty()));
        return Value::error();
    }
    if head.is_error() || tail.is_error() {
        return Value::error();
    }
    Value::list(head.clone(), tail.clone(), head.loc())
}

/// is_empty : [a] -> bool
pub fn is_empty(v: &Value) -> Value {
    if v.is_runtime() {
        let Some(node) = lowered_node(v) else {
            return Value::error();
        };
        return Value::runtime(AstNode::is_empty(v.loc(), node));
    }
    if !v.is_list() && !v.is_void() && !v.is_error() {
        diag::report(v.loc(), Diagnostic::ListOperand(v.ty()));
        return Value::error();
    }
    if v.is_error() {
        return Value::error();
    }
    Value::boolean(v.is_void(), v.loc())
}

/// length : string|[a] -> int
pub fn length(v: &Value) -> Value {
    if v.is_error() {
        return Value::error();
    }
    if v.is_runtime() {
        let Some(node) = lowered_node(v) else {
            return Value::error();
        };
        return Value::runtime(AstNode::length(v.loc(), node));
    }
    if !v.is_string() && !v.is_list() {
        diag::report(v.loc(), Diagnostic::LengthOperand(v.ty()));
        return Value::error();
    }
    match v.as_str() {
        Some(s) => Value::int(s.len() as i64, v.loc()),
        None => Value::int(to_vector(v).len() as i64, v.loc()),
    }
}

pub fn empty() -> Value {
    Value::void(crate::loc::Loc::default())
}

/// A one-element list.
pub fn list_of(element: &Value) -> Value {
    if element.is_error() {
        return Value::error();
    }
    cons(element, &empty())
}

/// Builds a list from a slice, right to left.
pub fn list_of_vec(elements: &[Value]) -> Value {
    let mut out = empty();
    for element in elements.iter().rev() {
        out = cons(element, &out);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::AstKind;
    use crate::loc::Loc;
    use crate::types;

    fn int(i: i64) -> Value {
        Value::int(i, Loc::default())
    }

    #[test]
    fn cons_head_tail_roundtrip() {
        let l = cons(&int(1), &empty());
        assert_eq!(head(&l).as_int(), Some(1));
        assert!(tail(&l).is_void());
        let l2 = cons(&int(0), &l);
        assert_eq!(head(&l2).as_int(), Some(0));
        assert_eq!(tail(&l2), l);
        assert_eq!(l2.ty(), types::list(types::int()));
    }

    #[test]
    fn emptiness_covers_void_and_cons() {
        assert_eq!(is_empty(&empty()).as_bool(), Some(true));
        assert_eq!(is_empty(&cons(&int(1), &empty())).as_bool(), Some(false));
    }

    #[test]
    fn length_counts_elements_and_bytes() {
        let l = list_of_vec(&[int(1), int(2), int(3)]);
        assert_eq!(length(&l).as_int(), Some(3));
        assert_eq!(
            length(&Value::string("abc", Loc::default())).as_int(),
            Some(3)
        );
    }

    #[test]
    fn cons_tail_must_be_list_or_void() {
        diag::drain();
        assert!(cons(&int(1), &int(2)).is_error());
        assert_eq!(
            diag::drain()[0].diagnostic,
            Diagnostic::ConsTail(types::int())
        );
    }

    #[test]
    fn head_of_non_list_is_reported() {
        diag::drain();
        assert!(head(&int(3)).is_error());
        assert!(tail(&int(3)).is_error());
        assert_eq!(diag::drain().len(), 2);
    }

    #[test]
    fn length_rejects_void() {
        diag::drain();
        assert!(length(&empty()).is_error());
        assert_eq!(
            diag::drain()[0].diagnostic,
            Diagnostic::LengthOperand(types::void())
        );
    }

    #[test]
    fn runtime_lists_emit_nodes() {
        let rt = Value::runtime(AstNode::cons(
            Loc::default(),
            AstNode::int(Loc::default(), 1),
            AstNode::void(Loc::default()),
        ));
        assert!(matches!(
            head(&rt).as_runtime().unwrap().kind(),
            AstKind::Head(_)
        ));
        assert!(matches!(
            tail(&rt).as_runtime().unwrap().kind(),
            AstKind::Tail(_)
        ));
        assert!(matches!(
            is_empty(&rt).as_runtime().unwrap().kind(),
            AstKind::IsEmpty(_)
        ));
        assert!(matches!(
            length(&rt).as_runtime().unwrap().kind(),
            AstKind::Length(_)
        ));
        let consed = cons(&int(0), &rt);
        assert!(matches!(
            consed.as_runtime().unwrap().kind(),
            AstKind::Cons(_, _)
        ));
        assert_eq!(head(&rt).ty().runtime_base(), Some(types::int()));
    }

    #[test]
    fn errors_propagate_without_reports() {
        diag::drain();
        assert!(head(&Value::error()).is_error());
        assert!(cons(&Value::error(), &empty()).is_error());
        assert!(is_empty(&Value::error()).is_error());
        assert!(length(&Value::error()).is_error());
        assert!(list_of(&Value::error()).is_error());
        assert!(diag::drain().is_empty());
    }
}

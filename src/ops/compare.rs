//! Equality and ordering. Equality is structural and accepts any pair of
//! same-typed values; ordering is defined for integers and for strings, and
//! both sides must agree.

use crate::ast::{AstNode, EqualityOp, RelationOp};
use crate::diag::{self, Diagnostic};
use crate::value::Value;

use super::lowered_node;

/// equal : a -> a -> bool
pub fn equal(lhs: &Value, rhs: &Value) -> Value {
    if lhs.is_error() || rhs.is_error() {
        return Value::error();
    }
    if lhs.is_runtime() || rhs.is_runtime() {
        return equality_node(EqualityOp::Equal, lhs, rhs);
    }
    Value::boolean(lhs == rhs, lhs.loc())
}

/// inequal : a -> a -> bool
pub fn inequal(lhs: &Value, rhs: &Value) -> Value {
    if lhs.is_error() || rhs.is_error() {
        return Value::error();
    }
    if lhs.is_runtime() || rhs.is_runtime() {
        return equality_node(EqualityOp::Inequal, lhs, rhs);
    }
    Value::boolean(lhs != rhs, lhs.loc())
}

fn equality_node(op: EqualityOp, lhs: &Value, rhs: &Value) -> Value {
    let (Some(l), Some(r)) = (lowered_node(lhs), lowered_node(rhs)) else {
        return Value::error();
    };
    Value::runtime(AstNode::equality(lhs.loc(), op, l, r))
}

/// less : int|string -> int|string -> bool
pub fn less(lhs: &Value, rhs: &Value) -> Value {
    binary_relation(RelationOp::Less, lhs, rhs)
}

/// greater : int|string -> int|string -> bool
pub fn greater(lhs: &Value, rhs: &Value) -> Value {
    binary_relation(RelationOp::Greater, lhs, rhs)
}

/// less_equal : int|string -> int|string -> bool
pub fn less_equal(lhs: &Value, rhs: &Value) -> Value {
    binary_relation(RelationOp::LessEqual, lhs, rhs)
}

/// greater_equal : int|string -> int|string -> bool
pub fn greater_equal(lhs: &Value, rhs: &Value) -> Value {
    binary_relation(RelationOp::GreaterEqual, lhs, rhs)
}

fn binary_relation(op: RelationOp, lhs: &Value, rhs: &Value) -> Value {
    if lhs.is_runtime() || rhs.is_runtime() {
        let (Some(l), Some(r)) = (lowered_node(lhs), lowered_node(rhs)) else {
            return Value::error();
        };
        return Value::runtime(AstNode::relation(lhs.loc(), op, l, r));
    }
    if !lhs.is_int() && !lhs.is_string() && !lhs.is_error() {
        diag::report(lhs.loc(), Diagnostic::RelationalOperand(lhs.ty()));
        return Value::error();
    }
    if !rhs.is_int() && !rhs.is_string() && !rhs.is_error() {
        diag::report(rhs.loc(), Diagnostic::RelationalOperand(rhs.ty()));
        return Value::error();
    }
    if (lhs.is_int() && rhs.is_string()) || (lhs.is_string() && rhs.is_int()) {
        diag::report(
            rhs.loc(),
            Diagnostic::RelationalMismatch(lhs.ty(), rhs.ty()),
        );
        return Value::error();
    }
    if lhs.is_error() || rhs.is_error() {
        return Value::error();
    }
    let result = match (lhs.as_str(), rhs.as_str()) {
        (Some(a), Some(b)) => compare(op, a, b),
        _ => compare(op, &lhs.as_int().unwrap_or(0), &rhs.as_int().unwrap_or(0)),
    };
    Value::boolean(result, lhs.loc())
}

fn compare<T: PartialOrd + ?Sized>(op: RelationOp, a: &T, b: &T) -> bool {
    match op {
        RelationOp::Less => a < b,
        RelationOp::Greater => a > b,
        RelationOp::LessEqual => a <= b,
        RelationOp::GreaterEqual => a >= b,
    }
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

    fn s(text: &str) -> Value {
        Value::string(text, Loc::default())
    }

    #[test]
    fn equality_is_structural() {
        assert_eq!(
            equal(&Value::boolean(true, Loc::default()), &Value::boolean(false, Loc::default()))
                .as_bool(),
            Some(false)
        );
        assert_eq!(equal(&s("a"), &s("a")).as_bool(), Some(true));
        assert_eq!(inequal(&int(1), &int(2)).as_bool(), Some(true));
        assert_eq!(equal(&int(1), &s("1")).as_bool(), Some(false));
    }

    #[test]
    fn orderings_cover_ints_and_strings() {
        assert_eq!(less(&int(1), &int(2)).as_bool(), Some(true));
        assert_eq!(greater(&int(1), &int(2)).as_bool(), Some(false));
        assert_eq!(less_equal(&int(2), &int(2)).as_bool(), Some(true));
        assert_eq!(greater_equal(&s("b"), &s("a")).as_bool(), Some(true));
        assert_eq!(less(&s("ab"), &s("b")).as_bool(), Some(true));
    }

    #[test]
    fn mixed_orderings_are_rejected() {
        diag::drain();
        assert!(less(&int(1), &s("a")).is_error());
        let reports = diag::drain();
        assert_eq!(reports.len(), 1);
        assert_eq!(
            reports[0].diagnostic,
            Diagnostic::RelationalMismatch(types::int(), types::string())
        );
    }

    #[test]
    fn relational_operand_kinds_are_checked() {
        diag::drain();
        assert!(less(&Value::boolean(true, Loc::default()), &int(1)).is_error());
        assert_eq!(
            diag::drain()[0].diagnostic,
            Diagnostic::RelationalOperand(types::boolean())
        );
    }

    #[test]
    fn runtime_comparisons_lower() {
        let rt = Value::runtime(AstNode::int(Loc::default(), 2));
        let out = equal(&rt, &int(3));
        assert!(matches!(
            out.as_runtime().unwrap().kind(),
            AstKind::Equality(EqualityOp::Equal, _, _)
        ));
        let out = less(&int(3), &rt);
        assert!(matches!(
            out.as_runtime().unwrap().kind(),
            AstKind::Relation(RelationOp::Less, _, _)
        ));
        assert_eq!(out.ty().runtime_base(), Some(types::boolean()));
    }

    #[test]
    fn errors_stay_silent() {
        diag::drain();
        assert!(equal(&Value::error(), &int(1)).is_error());
        assert!(less(&Value::error(), &int(1)).is_error());
        assert!(diag::drain().is_empty());
    }
}

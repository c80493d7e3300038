//! Lowering turns a compile-time value into the AST of a program that
//! produces the same value at runtime. Runtime values pass through
//! unchanged, so lowering is idempotent.

use crate::ast::AstNode;
use crate::diag::{self, Diagnostic};
use crate::types;
use crate::value::{to_vector, Value};

pub fn lower(v: &Value) -> Value {
    if v.is_runtime() {
        return v.clone();
    }
    if v.is_void() {
        return Value::runtime(AstNode::void(v.loc()));
    }
    if v.is_error() {
        return Value::runtime(AstNode::singleton(v.loc(), types::error()));
    }
    if let Some(i) = v.as_int() {
        return Value::runtime(AstNode::int(v.loc(), i));
    }
    if let Some(b) = v.as_bool() {
        return Value::runtime(AstNode::boolean(v.loc(), b));
    }
    if let Some(n) = v.as_symbol() {
        return Value::runtime(AstNode::symbol(v.loc(), n));
    }
    if let Some(s) = v.as_str() {
        return Value::runtime(AstNode::string(v.loc(), s.to_string()));
    }
    if v.is_list() {
        let mut node = AstNode::void(v.loc());
        for element in to_vector(v).iter().rev() {
            let lowered = lower(element);
            match lowered.as_runtime() {
                Some(inner) => node = AstNode::cons(v.loc(), inner.clone(), node),
                None => return Value::error(),
            }
        }
        return Value::runtime(node);
    }
    diag::report(v.loc(), Diagnostic::Unlowerable(v.to_string()));
    Value::error()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::AstKind;
    use crate::env::Env;
    use crate::loc::Loc;
    use crate::value::FunctionValue;

    fn loc() -> Loc {
        Loc::default()
    }

    #[test]
    fn literals_lower_to_literal_nodes() {
        let lowered = lower(&Value::int(5, loc()));
        assert!(lowered.is_runtime());
        assert_eq!(lowered.ty().runtime_base(), Some(types::int()));
        assert!(matches!(
            lowered.as_runtime().unwrap().kind(),
            AstKind::Int(5)
        ));

        let lowered = lower(&Value::void(loc()));
        assert!(matches!(lowered.as_runtime().unwrap().kind(), AstKind::Void));

        let lowered = lower(&Value::error());
        assert!(matches!(
            lowered.as_runtime().unwrap().kind(),
            AstKind::Singleton
        ));
        assert_eq!(lowered.ty().runtime_base(), Some(types::error()));
    }

    #[test]
    fn lowering_is_idempotent_on_runtime_values() {
        let once = lower(&Value::int(1, loc()));
        let twice = lower(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn lists_fold_into_cons_chains() {
        let list = Value::list(
            Value::int(1, loc()),
            Value::list(Value::int(2, loc()), Value::void(loc()), loc()),
            loc(),
        );
        let lowered = lower(&list);
        let node = lowered.as_runtime().unwrap();
        assert_eq!(node.ty(), types::list(types::int()));
        let AstKind::Cons(head, tail) = node.kind() else {
            panic!("expected cons, got {node}");
        };
        assert!(matches!(head.kind(), AstKind::Int(1)));
        let AstKind::Cons(head, tail) = tail.kind() else {
            panic!("expected cons, got {tail}");
        };
        assert!(matches!(head.kind(), AstKind::Int(2)));
        assert!(matches!(tail.kind(), AstKind::Void));
    }

    #[test]
    fn functions_do_not_lower() {
        diag::drain();
        let env = Env::root();
        let f = FunctionValue::new(None, &env, vec![], Value::int(1, loc())).into_value(loc());
        let lowered = lower(&f);
        assert!(lowered.is_error());
        let reports = diag::drain();
        assert_eq!(reports.len(), 1);
        assert!(matches!(reports[0].diagnostic, Diagnostic::Unlowerable(_)));
    }
}

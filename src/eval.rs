//! The evaluator walks source forms: symbols resolve through the
//! environment, a handful of special forms are recognized by name, and every
//! other list is a function or macro application. Atoms evaluate to
//! themselves. The assignment protocol lives here too, since it is the one
//! place a binding escapes to runtime.

use std::rc::Rc;

use tracing::debug;

use crate::ast::AstNode;
use crate::call::call;
use crate::diag::{self, Diagnostic};
use crate::env::Env;
use crate::loc::Loc;
use crate::lower::lower;
use crate::ops;
use crate::symbol::Name;
use crate::value::{
    positional_slot, slot_is_keyword, slot_name, to_vector, Builtin, FunctionValue, MacroValue,
    Value,
};

pub fn eval(env: &Env, term: &Value) -> Value {
    if term.is_error() {
        return Value::error();
    }
    if let Some(name) = term.as_symbol() {
        return match env.lookup(name) {
            Some(value) => value,
            None => {
                diag::report(term.loc(), Diagnostic::Undefined(name));
                Value::error()
            }
        };
    }
    if !term.is_list() {
        return term.clone();
    }

    let forms = to_vector(term);
    if let Some(head_name) = forms[0].as_symbol() {
        if head_name == Name::intern("if") {
            return eval_if(env, &forms, term.loc());
        }
        if head_name == Name::intern("quote") {
            return match forms.get(1) {
                Some(quoted) => quoted.clone(),
                None => Value::void(term.loc()),
            };
        }
        if head_name == Name::intern("lambda") {
            return eval_lambda(env, &forms, term.loc());
        }
        if head_name == Name::intern("def") {
            return eval_def(env, &forms, term.loc());
        }
        if head_name == Name::intern("set") {
            return eval_set(env, &forms, term.loc());
        }
        if head_name == Name::intern("do") {
            let mut last = Value::void(term.loc());
            for form in &forms[1..] {
                last = eval(env, form);
            }
            return last;
        }
    }

    let callee = eval(env, &forms[0]);
    if let Some(makro) = callee.as_macro() {
        return apply_macro(env, makro, &forms[1..], term.loc());
    }
    let args = forms[1..].iter().map(|form| eval(env, form)).collect();
    call(env, &callee, &Value::product(args, term.loc()))
}

fn eval_if(env: &Env, forms: &[Value], loc: Loc) -> Value {
    if forms.len() != 4 {
        diag::report(
            loc,
            Diagnostic::Arity {
                expected: 3,
                given: forms.len() - 1,
            },
        );
        return Value::error();
    }
    let cond = eval(env, &forms[1]);
    if cond.is_error() {
        return Value::error();
    }
    if cond.is_runtime() {
        // The branch taken is only known at runtime: stage both.
        let then = eval(env, &forms[2]);
        let otherwise = eval(env, &forms[3]);
        if then.is_error() || otherwise.is_error() {
            return Value::error();
        }
        let (Some(c), Some(t), Some(e)) = (
            cond.as_runtime().cloned(),
            lower(&then).as_runtime().cloned(),
            lower(&otherwise).as_runtime().cloned(),
        ) else {
            return Value::error();
        };
        return Value::runtime(AstNode::if_(loc, c, t, e));
    }
    match cond.as_bool() {
        Some(true) => eval(env, &forms[2]),
        Some(false) => eval(env, &forms[3]),
        None => {
            diag::report(cond.loc(), Diagnostic::Condition(cond.ty()));
            Value::error()
        }
    }
}

fn eval_lambda(env: &Env, forms: &[Value], loc: Loc) -> Value {
    if forms.len() != 3 {
        diag::report(
            loc,
            Diagnostic::Arity {
                expected: 2,
                given: forms.len() - 1,
            },
        );
        return Value::error();
    }
    let mut slots = Vec::new();
    for param in to_vector(&forms[1]) {
        match param.as_symbol() {
            Some(name) => slots.push(positional_slot(name)),
            None => {
                diag::report(param.loc(), Diagnostic::AssignTarget(param.to_string()));
                return Value::error();
            }
        }
    }
    FunctionValue::new(None, env, slots, forms[2].clone()).into_value(loc)
}

fn eval_def(env: &Env, forms: &[Value], loc: Loc) -> Value {
    if forms.len() != 3 {
        diag::report(
            loc,
            Diagnostic::Arity {
                expected: 2,
                given: forms.len() - 1,
            },
        );
        return Value::error();
    }
    let Some(name) = forms[1].as_symbol() else {
        diag::report(forms[1].loc(), Diagnostic::AssignTarget(forms[1].to_string()));
        return Value::error();
    };
    let value = eval(env, &forms[2]);
    if value.is_error() {
        return Value::error();
    }
    env.define(name, value);
    Value::void(loc)
}

fn eval_set(env: &Env, forms: &[Value], loc: Loc) -> Value {
    if forms.len() != 3 {
        diag::report(
            loc,
            Diagnostic::Arity {
                expected: 2,
                given: forms.len() - 1,
            },
        );
        return Value::error();
    }
    let src = eval(env, &forms[2]);
    assign(env, &forms[1], &src)
}

fn apply_macro(env: &Env, makro: &Rc<MacroValue>, args: &[Value], loc: Loc) -> Value {
    if let Some(handler) = makro.builtin_handler() {
        return handler(env, &Value::product(args.to_vec(), loc));
    }
    if args.len() != makro.args().len() {
        diag::report(
            loc,
            Diagnostic::Arity {
                expected: makro.args().len(),
                given: args.len(),
            },
        );
        return Value::error();
    }
    for (&slot, arg) in makro.args().iter().zip(args) {
        if slot_is_keyword(slot) {
            let expected = slot_name(slot);
            if expected.is_none() || arg.as_symbol() != expected {
                if let Some(name) = expected {
                    diag::report(arg.loc(), Diagnostic::Keyword(name));
                }
                return Value::error();
            }
        } else if let Some(name) = slot_name(slot) {
            // Macro arguments arrive unevaluated.
            makro.env().update(name, arg.clone());
        }
    }
    let Some(body) = makro.body_expr() else {
        return Value::error();
    };
    let expansion = eval(makro.env(), body);
    if expansion.is_error() {
        return Value::error();
    }
    eval(env, &expansion)
}

/// True for the forms whose interior is scoped (or suspended) and therefore
/// not scanned by call-graph discovery.
pub fn introduces_env(term: &Value) -> bool {
    let Some(cell) = term.as_list() else {
        return false;
    };
    match cell.head.as_symbol() {
        Some(name) => {
            name == Name::intern("lambda")
                || name == Name::intern("def")
                || name == Name::intern("quote")
        }
        None => false,
    }
}

/// Rewrites the binding named by `dest`. While the binding still holds a
/// compile-time value, the first runtime write lowers the binding in place
/// and emits a define node, marking the introduction point of the runtime
/// variable; every later write emits an assign node.
pub fn assign(env: &Env, dest: &Value, src: &Value) -> Value {
    if dest.is_error() || src.is_error() {
        return Value::error();
    }
    let Some(name) = dest.as_symbol() else {
        diag::report(dest.loc(), Diagnostic::AssignTarget(dest.to_string()));
        return Value::error();
    };
    let Some(current) = env.lookup(name) else {
        diag::report(dest.loc(), Diagnostic::Undefined(name));
        return Value::error();
    };
    let lowered = if src.is_runtime() { src.clone() } else { lower(src) };
    let Some(node) = lowered.as_runtime().cloned() else {
        return Value::error();
    };
    if current.is_runtime() {
        Value::runtime(AstNode::assign(dest.loc(), env.clone(), name, node))
    } else {
        debug!(name = %name, "binding escapes to runtime");
        env.update(name, lower(&current));
        Value::runtime(AstNode::define(dest.loc(), env.clone(), name, node))
    }
}

fn expect_args(args: &Value, expected: usize) -> Option<&[Value]> {
    let members = args.as_product()?;
    if members.len() != expected {
        diag::report(
            args.loc(),
            Diagnostic::Arity {
                expected,
                given: members.len(),
            },
        );
        return None;
    }
    Some(members)
}

macro_rules! unary_prim {
    ($name:ident, $op:path) => {
        fn $name(_env: &Env, args: &Value) -> Value {
            match expect_args(args, 1) {
                Some(a) => $op(&a[0]),
                None => Value::error(),
            }
        }
    };
}

macro_rules! binary_prim {
    ($name:ident, $op:path) => {
        fn $name(_env: &Env, args: &Value) -> Value {
            match expect_args(args, 2) {
                Some(a) => $op(&a[0], &a[1]),
                None => Value::error(),
            }
        }
    };
}

binary_prim!(prim_add, ops::add);
binary_prim!(prim_sub, ops::sub);
binary_prim!(prim_mul, ops::mul);
binary_prim!(prim_div, ops::div);
binary_prim!(prim_rem, ops::rem);
binary_prim!(prim_and, ops::logical_and);
binary_prim!(prim_or, ops::logical_or);
binary_prim!(prim_xor, ops::logical_xor);
unary_prim!(prim_not, ops::logical_not);
binary_prim!(prim_equal, ops::equal);
binary_prim!(prim_inequal, ops::inequal);
binary_prim!(prim_less, ops::less);
binary_prim!(prim_greater, ops::greater);
binary_prim!(prim_less_equal, ops::less_equal);
binary_prim!(prim_greater_equal, ops::greater_equal);
unary_prim!(prim_head, ops::head);
unary_prim!(prim_tail, ops::tail);
binary_prim!(prim_cons, ops::cons);
unary_prim!(prim_is_empty, ops::is_empty);
unary_prim!(prim_length, ops::length);
binary_prim!(prim_char_at, ops::char_at);
unary_prim!(prim_type_of, ops::type_of);
unary_prim!(prim_display, ops::display);

/// Binds the primitive operators into `env` under their surface names.
pub fn install_builtins(env: &Env) {
    let register = |name: &str, handler: Builtin, arity: u64| {
        let name = Name::intern(name);
        let value =
            FunctionValue::builtin(Some(name), env, handler, arity).into_value(Loc::default());
        env.define(name, value);
    };
    register("add", prim_add, 2);
    register("sub", prim_sub, 2);
    register("mul", prim_mul, 2);
    register("div", prim_div, 2);
    register("rem", prim_rem, 2);
    register("and", prim_and, 2);
    register("or", prim_or, 2);
    register("xor", prim_xor, 2);
    register("not", prim_not, 1);
    register("equal", prim_equal, 2);
    register("inequal", prim_inequal, 2);
    register("less", prim_less, 2);
    register("greater", prim_greater, 2);
    register("less_equal", prim_less_equal, 2);
    register("greater_equal", prim_greater_equal, 2);
    register("head", prim_head, 1);
    register("tail", prim_tail, 1);
    register("cons", prim_cons, 2);
    register("is_empty", prim_is_empty, 1);
    register("length", prim_length, 1);
    register("char_at", prim_char_at, 2);
    register("type_of", prim_type_of, 1);
    register("display", prim_display, 1);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::AstKind;
    use crate::types;
    use crate::value::keyword_slot;

    fn loc() -> Loc {
        Loc::default()
    }

    fn int(i: i64) -> Value {
        Value::int(i, loc())
    }

    fn sym(text: &str) -> Value {
        Value::symbol(Name::intern(text), loc())
    }

    fn form(elements: &[Value]) -> Value {
        ops::list_of_vec(elements)
    }

    fn env() -> Env {
        let env = Env::root();
        install_builtins(&env);
        env
    }

    #[test]
    fn atoms_evaluate_to_themselves() {
        let env = env();
        assert_eq!(eval(&env, &int(5)).as_int(), Some(5));
        assert_eq!(eval(&env, &Value::string("a", loc())).as_str(), Some("a"));
    }

    #[test]
    fn symbols_resolve_through_the_environment() {
        diag::drain();
        let env = env();
        env.define(Name::intern("answer"), int(42));
        assert_eq!(eval(&env, &sym("answer")).as_int(), Some(42));
        assert!(eval(&env, &sym("nonsense")).is_error());
        assert!(matches!(
            diag::drain()[0].diagnostic,
            Diagnostic::Undefined(_)
        ));
    }

    #[test]
    fn applications_dispatch_to_builtins() {
        let env = env();
        let out = eval(&env, &form(&[sym("add"), int(2), int(3)]));
        assert_eq!(out.as_int(), Some(5));
    }

    #[test]
    fn if_selects_a_branch_eagerly() {
        let env = env();
        let term = form(&[
            sym("if"),
            form(&[sym("less"), int(1), int(2)]),
            int(10),
            int(20),
        ]);
        assert_eq!(eval(&env, &term).as_int(), Some(10));
    }

    #[test]
    fn if_over_a_runtime_condition_stages_both_branches() {
        let env = env();
        env.define(
            Name::intern("flag"),
            Value::runtime(AstNode::boolean(loc(), true)),
        );
        let term = form(&[sym("if"), sym("flag"), int(1), int(2)]);
        let out = eval(&env, &term);
        assert!(out.is_runtime());
        let node = out.as_runtime().unwrap();
        let AstKind::If(c, t, e) = node.kind() else {
            panic!("expected if node, got {node}");
        };
        assert!(matches!(c.kind(), AstKind::Bool(true)));
        assert!(matches!(t.kind(), AstKind::Int(1)));
        assert!(matches!(e.kind(), AstKind::Int(2)));
        assert_eq!(node.ty(), types::int());
    }

    #[test]
    fn lambda_builds_a_callable_function() {
        let env = env();
        let term = form(&[
            form(&[
                sym("lambda"),
                form(&[sym("n")]),
                form(&[sym("mul"), sym("n"), sym("n")]),
            ]),
            int(6),
        ]);
        assert_eq!(eval(&env, &term).as_int(), Some(36));
    }

    #[test]
    fn quote_suspends_evaluation() {
        let env = env();
        let out = eval(&env, &form(&[sym("quote"), sym("add")]));
        assert_eq!(out.as_symbol(), Some(Name::intern("add")));
    }

    #[test]
    fn def_then_set_follows_the_escape_protocol() {
        let env = env();
        eval(&env, &form(&[sym("def"), sym("counter"), int(0)]));
        assert_eq!(
            env.lookup(Name::intern("counter")).unwrap().as_int(),
            Some(0)
        );

        // First write: the binding is still compile-time, so it is lowered
        // in place and the write is a define node.
        let first = eval(&env, &form(&[sym("set"), sym("counter"), int(1)]));
        assert!(matches!(
            first.as_runtime().unwrap().kind(),
            AstKind::Define { .. }
        ));
        assert!(env.lookup(Name::intern("counter")).unwrap().is_runtime());

        // Later writes see a runtime binding and emit assign nodes.
        let second = eval(&env, &form(&[sym("set"), sym("counter"), int(2)]));
        assert!(matches!(
            second.as_runtime().unwrap().kind(),
            AstKind::Assign { .. }
        ));
    }

    #[test]
    fn assign_rejects_bad_destinations() {
        diag::drain();
        let env = env();
        assert!(assign(&env, &int(1), &int(2)).is_error());
        assert!(matches!(
            diag::drain()[0].diagnostic,
            Diagnostic::AssignTarget(_)
        ));
        assert!(assign(&env, &sym("missing"), &int(2)).is_error());
        assert!(matches!(
            diag::drain()[0].diagnostic,
            Diagnostic::Undefined(_)
        ));
    }

    #[test]
    fn macros_expand_before_evaluation() {
        let env = env();
        // (twice e) expands to (add e e).
        let e = Name::intern("e");
        let body = form(&[
            sym("cons"),
            form(&[sym("quote"), sym("add")]),
            form(&[
                sym("cons"),
                sym("e"),
                form(&[sym("cons"), sym("e"), form(&[sym("quote"), form(&[])])]),
            ]),
        ]);
        let makro = MacroValue::new(
            Some(Name::intern("twice")),
            &env,
            vec![positional_slot(e)],
            body,
        )
        .into_value(loc());
        env.define(Name::intern("twice"), makro);

        let out = eval(&env, &form(&[sym("twice"), int(21)]));
        assert_eq!(out.as_int(), Some(42));
    }

    #[test]
    fn macro_keyword_slots_are_validated() {
        diag::drain();
        let env = env();
        let to = Name::intern("to");
        let e = Name::intern("e");
        let makro = MacroValue::new(
            None,
            &env,
            vec![keyword_slot(to), positional_slot(e)],
            sym("e"),
        )
        .into_value(loc());
        env.define(Name::intern("emit"), makro);

        let ok = eval(&env, &form(&[sym("emit"), Value::symbol(to, loc()), int(9)]));
        assert_eq!(ok.as_int(), Some(9));

        let bad = eval(&env, &form(&[sym("emit"), sym("from"), int(9)]));
        assert!(bad.is_error());
        assert_eq!(diag::drain()[0].diagnostic, Diagnostic::Keyword(to));
    }

    #[test]
    fn scope_introducing_forms_are_recognized() {
        assert!(introduces_env(&form(&[sym("lambda"), form(&[]), int(1)])));
        assert!(introduces_env(&form(&[sym("quote"), sym("x")])));
        assert!(!introduces_env(&form(&[sym("add"), int(1), int(2)])));
        assert!(!introduces_env(&int(3)));
    }
}

//! The function-call protocol: call-graph discovery, on-demand
//! monomorphization, and the dispatcher that decides between eager
//! execution, builtin invocation, and runtime call emission.
//!
//! A user-defined call stays in the interpreter only while every argument is
//! concrete and the callee cannot reach itself. Otherwise the arguments are
//! lowered, the function body is instantiated once per argument-product
//! type, and a call node over the cached instantiation is emitted.

use std::rc::Rc;

use fxhash::FxHashSet;
use tracing::debug;

use crate::ast::{AstNode, AstRef};
use crate::diag::{self, Diagnostic};
use crate::env::Env;
use crate::eval::{eval, introduces_env};
use crate::loc::Loc;
use crate::lower::lower;
use crate::types::{self, Kind, TypeRef};
use crate::value::{slot_is_keyword, slot_name, FunctionValue, Value};

/// Walks `term` collecting every function reachable from it into `func`'s
/// call set. Visits each callee once and folds the callee's own set in
/// first, so the result is transitively closed; a function that reaches
/// itself ends up in its own set, which is the recursion test.
pub fn find_calls(
    func: &Rc<FunctionValue>,
    env: &Env,
    term: &Value,
    visited: &mut FxHashSet<usize>,
) {
    let head = match term.as_list() {
        Some(cell) => cell.head.clone(),
        None => return,
    };
    if let Some(name) = head.as_symbol() {
        if let Some(binding) = env.lookup(name) {
            if let Some(callee) = binding.as_function() {
                if visited.insert(callee.addr()) {
                    if callee.addr() != func.addr() {
                        if let Some(body) = callee.body_expr() {
                            find_calls(callee, callee.env(), body, visited);
                        }
                    }
                    func.add_call(callee);
                }
            }
        }
    }
    if !introduces_env(term) {
        let mut cursor = term.clone();
        loop {
            let (head, tail) = match cursor.as_list() {
                Some(cell) => (cell.head.clone(), cell.tail.clone()),
                None => break,
            };
            find_calls(func, env, &head, visited);
            cursor = tail;
        }
    }
}

/// Builds the monomorphized body of `func` for the argument-product type
/// `arg_ty` and stores it in the instantiation cache, replacing the
/// placeholder the caller installed. Returns None when the body fails to
/// evaluate; the cache is left holding the placeholder in that case.
pub(crate) fn instantiate(loc: Loc, func: &Rc<FunctionValue>, arg_ty: TypeRef) -> Option<AstRef> {
    let members = arg_ty.product_members()?;
    let scope = func.env().deep_clone();
    scope.make_runtime();

    let mut params = Vec::new();
    let mut next_member = 0;
    for &slot in func.args() {
        if slot_is_keyword(slot) {
            continue;
        }
        let name = slot_name(slot)?;
        let member = *members.get(next_member)?;
        scope.update(name, Value::runtime(AstNode::singleton(loc, member)));
        params.push(name);
        next_member += 1;
    }

    let body = func.body_expr()?.deep_clone();
    let result = eval(&scope, &body);
    if result.is_error() {
        return None;
    }
    let result = if result.is_runtime() { result } else { lower(&result) };
    let node = result.as_runtime()?.clone();

    let function = AstNode::function(loc, scope, arg_ty, params, node, func.name());
    func.install_instantiation(arg_ty, function.clone());
    debug!(ty = %arg_ty, name = %display_name(func), "instantiated function");
    Some(function)
}

fn display_name(func: &FunctionValue) -> String {
    match func.name() {
        Some(name) => name.to_string(),
        None => "<anonymous>".to_string(),
    }
}

/// The staged type of one positional argument, plus the value to splice in
/// later. Function-valued arguments keep their payload and are given a
/// skeleton type over fresh variables; their lowering waits until the
/// expected parameter type is known. Everything else is lowered now.
fn staged_argument(arg: &Value) -> Option<(TypeRef, Value)> {
    if let Some(func) = arg.as_function() {
        let inner = (0..func.arity()).map(|_| types::fresh_var()).collect();
        let ty = types::function(types::product(inner), types::fresh_var());
        Some((ty, arg.clone()))
    } else {
        let lowered = lower(arg);
        let base = lowered.ty().runtime_base()?;
        Some((base, lowered))
    }
}

/// Resolves one staged argument to the node that goes into the call. A
/// function-valued argument is monomorphized at the parameter type deduced
/// for its position; `strict` additionally demands the whole parameter type
/// be concrete, which is the rule for calls through runtime callees.
fn argument_node(member_ty: TypeRef, arg: &Value, strict: bool) -> Option<AstRef> {
    let Some(func) = arg.as_function() else {
        return arg.as_runtime().cloned();
    };
    let deduced = member_ty.resolve();
    let misfit = deduced.kind() != Kind::Function
        || match deduced.function_arg() {
            Some(param) => !param.resolve().concrete(),
            None => true,
        }
        || (strict && !deduced.concrete());
    if misfit {
        diag::report(arg.loc(), Diagnostic::ParameterType(deduced));
        return None;
    }
    let fn_arg = deduced.function_arg()?.canonical();
    if let Some(node) = func.instantiation(fn_arg) {
        return Some(node);
    }
    func.install_instantiation(fn_arg, AstNode::incomplete_fn(arg.loc(), fn_arg, func.name()));
    instantiate(arg.loc(), func, fn_arg)
}

fn keyword_matches(slot: u64, arg: &Value) -> bool {
    let expected = slot_name(slot);
    if expected.is_some() && arg.as_symbol() == expected {
        return true;
    }
    if let Some(name) = expected {
        diag::report(arg.loc(), Diagnostic::Keyword(name));
    }
    false
}

/// Applies `callee` to the argument product. See the module docs for the
/// three paths; the result is either the call's value or a runtime value
/// wrapping a call node.
pub fn call(env: &Env, callee: &Value, args: &Value) -> Value {
    if callee.is_runtime() {
        return call_runtime_callee(callee, args);
    }
    if !callee.is_function() && !callee.is_error() {
        diag::report(callee.loc(), Diagnostic::NotCallable);
        return Value::error();
    }
    if !args.is_product() && !args.is_error() {
        diag::report(args.loc(), Diagnostic::ArgumentsNotProduct);
        return Value::error();
    }
    if callee.is_error() || args.is_error() {
        return Value::error();
    }
    let Some(func) = callee.as_function() else {
        return Value::error();
    };
    if let Some(handler) = func.builtin_handler() {
        return handler(env, args);
    }
    let Some(members) = args.as_product() else {
        return Value::error();
    };
    if members.len() != func.args().len() {
        diag::report(
            callee.loc(),
            Diagnostic::Arity {
                expected: func.args().len(),
                given: members.len(),
            },
        );
        return Value::error();
    }

    let mut runtime_call = members.iter().any(Value::is_runtime);
    if !func.found_calls() {
        let mut visited = FxHashSet::default();
        if let Some(body) = func.body_expr() {
            find_calls(func, func.env(), body, &mut visited);
        }
        func.seal_calls();
        debug!(
            name = %display_name(func),
            recursive = func.recursive(),
            "analyzed call graph"
        );
    }
    if func.recursive() {
        runtime_call = true;
    }

    if runtime_call {
        call_staged(callee, func, members)
    } else {
        call_eager(func, members)
    }
}

fn call_runtime_callee(callee: &Value, args: &Value) -> Value {
    if args.is_error() {
        return Value::error();
    }
    let Some(members) = args.as_product() else {
        diag::report(args.loc(), Diagnostic::ArgumentsNotProduct);
        return Value::error();
    };
    let mut member_types = Vec::with_capacity(members.len());
    let mut staged = Vec::with_capacity(members.len());
    for arg in members {
        let Some((ty, value)) = staged_argument(arg) else {
            return Value::error();
        };
        member_types.push(ty);
        staged.push(value);
    }
    let arg_ty = types::product(member_types);
    let Some(nodes) = argument_nodes(arg_ty, &staged, true) else {
        return Value::error();
    };
    let Some(callee_node) = callee.as_runtime() else {
        return Value::error();
    };
    Value::runtime(AstNode::call(callee.loc(), callee_node.clone(), nodes))
}

fn call_staged(callee: &Value, func: &Rc<FunctionValue>, args: &[Value]) -> Value {
    let mut member_types = Vec::new();
    let mut staged = Vec::new();
    for (&slot, arg) in func.args().iter().zip(args) {
        if slot_is_keyword(slot) {
            // Keyword slots are compile-time assertions; they contribute
            // nothing to the argument type or the emitted call.
            if !keyword_matches(slot, arg) {
                return Value::error();
            }
        } else {
            let Some((ty, value)) = staged_argument(arg) else {
                return Value::error();
            };
            member_types.push(ty);
            staged.push(value);
        }
    }
    let arg_ty = types::product(member_types);

    let body = match func.instantiation(arg_ty) {
        Some(body) => body,
        None => {
            func.install_instantiation(
                arg_ty,
                AstNode::incomplete_fn(callee.loc(), arg_ty, func.name()),
            );
            match instantiate(callee.loc(), func, arg_ty) {
                Some(body) => body,
                None => return Value::error(),
            }
        }
    };

    let Some(nodes) = argument_nodes(arg_ty, &staged, false) else {
        return Value::error();
    };
    Value::runtime(AstNode::call(callee.loc(), body, nodes))
}

fn argument_nodes(arg_ty: TypeRef, staged: &[Value], strict: bool) -> Option<Vec<AstRef>> {
    let members = arg_ty.product_members()?;
    let mut nodes = Vec::with_capacity(staged.len());
    for (member, value) in members.iter().zip(staged) {
        nodes.push(argument_node(*member, value, strict)?);
    }
    Some(nodes)
}

fn call_eager(func: &Rc<FunctionValue>, args: &[Value]) -> Value {
    for (&slot, arg) in func.args().iter().zip(args) {
        if slot_is_keyword(slot) {
            if !keyword_matches(slot, arg) {
                return Value::error();
            }
        } else if let Some(name) = slot_name(slot) {
            func.env().update(name, arg.clone());
        }
    }
    match func.body_expr() {
        Some(body) => eval(func.env(), body),
        None => Value::error(),
    }
}

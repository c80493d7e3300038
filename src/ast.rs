//! Runtime AST nodes. A node is the deferred form of a value: code that will
//! produce the value once the program actually runs. Nodes are immutable
//! after construction and shared by handle; identity of the handle is the
//! identity of the node. Each value-producing node carries the base type the
//! surrounding RUNTIME descriptor mirrors.

use std::fmt;
use std::rc::Rc;

use crate::env::Env;
use crate::loc::Loc;
use crate::symbol::Name;
use crate::types::{self, TypeRef};

pub type AstRef = Rc<AstNode>;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum MathOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum LogicOp {
    And,
    Or,
    Xor,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum EqualityOp {
    Equal,
    Inequal,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum RelationOp {
    Less,
    Greater,
    LessEqual,
    GreaterEqual,
}

#[derive(Debug)]
pub struct AstNode {
    loc: Loc,
    ty: TypeRef,
    kind: AstKind,
}

#[derive(Debug)]
pub enum AstKind {
    Void,
    Int(i64),
    Bool(bool),
    Symbol(Name),
    String(String),
    /// A value of the carried type with no computation attached; stands in
    /// for error sentinels and for function parameters during
    /// monomorphization.
    Singleton,
    Cons(AstRef, AstRef),
    Head(AstRef),
    Tail(AstRef),
    IsEmpty(AstRef),
    Length(AstRef),
    Not(AstRef),
    Math(MathOp, AstRef, AstRef),
    Logic(LogicOp, AstRef, AstRef),
    Equality(EqualityOp, AstRef, AstRef),
    Relation(RelationOp, AstRef, AstRef),
    If(AstRef, AstRef, AstRef),
    Call(AstRef, Vec<AstRef>),
    Function {
        env: Env,
        arg: TypeRef,
        params: Vec<Name>,
        body: AstRef,
        name: Option<Name>,
    },
    /// Placeholder for a monomorphization that is still being built; a
    /// recursive reference resolves to this instead of re-entering the
    /// instantiation.
    IncompleteFn { arg: TypeRef, name: Option<Name> },
    NativeCall {
        name: &'static str,
        args: Vec<AstRef>,
        arg_types: Vec<TypeRef>,
    },
    Display(AstRef),
    Assign { env: Env, name: Name, value: AstRef },
    Define { env: Env, name: Name, value: AstRef },
}

impl AstNode {
    fn make(loc: Loc, ty: TypeRef, kind: AstKind) -> AstRef {
        Rc::new(AstNode { loc, ty, kind })
    }

    pub fn loc(&self) -> Loc {
        self.loc
    }

    /// The type of the value this node produces at runtime.
    pub fn ty(&self) -> TypeRef {
        self.ty
    }

    pub fn kind(&self) -> &AstKind {
        &self.kind
    }

    pub fn void(loc: Loc) -> AstRef {
        Self::make(loc, types::void(), AstKind::Void)
    }

    pub fn int(loc: Loc, value: i64) -> AstRef {
        Self::make(loc, types::int(), AstKind::Int(value))
    }

    pub fn boolean(loc: Loc, value: bool) -> AstRef {
        Self::make(loc, types::boolean(), AstKind::Bool(value))
    }

    pub fn symbol(loc: Loc, name: Name) -> AstRef {
        Self::make(loc, types::symbol(), AstKind::Symbol(name))
    }

    pub fn string(loc: Loc, value: String) -> AstRef {
        Self::make(loc, types::string(), AstKind::String(value))
    }

    pub fn singleton(loc: Loc, ty: TypeRef) -> AstRef {
        Self::make(loc, ty, AstKind::Singleton)
    }

    pub fn cons(loc: Loc, head: AstRef, tail: AstRef) -> AstRef {
        let ty = types::list(head.ty());
        Self::make(loc, ty, AstKind::Cons(head, tail))
    }

    pub fn head(loc: Loc, list: AstRef) -> AstRef {
        let ty = list.ty().resolve().list_element().unwrap_or_else(types::fresh_var);
        Self::make(loc, ty, AstKind::Head(list))
    }

    pub fn tail(loc: Loc, list: AstRef) -> AstRef {
        let ty = list.ty();
        Self::make(loc, ty, AstKind::Tail(list))
    }

    pub fn is_empty(loc: Loc, list: AstRef) -> AstRef {
        Self::make(loc, types::boolean(), AstKind::IsEmpty(list))
    }

    pub fn length(loc: Loc, value: AstRef) -> AstRef {
        Self::make(loc, types::int(), AstKind::Length(value))
    }

    pub fn not(loc: Loc, value: AstRef) -> AstRef {
        Self::make(loc, types::boolean(), AstKind::Not(value))
    }

    pub fn math(loc: Loc, op: MathOp, lhs: AstRef, rhs: AstRef) -> AstRef {
        Self::make(loc, types::int(), AstKind::Math(op, lhs, rhs))
    }

    pub fn logic(loc: Loc, op: LogicOp, lhs: AstRef, rhs: AstRef) -> AstRef {
        Self::make(loc, types::boolean(), AstKind::Logic(op, lhs, rhs))
    }

    pub fn equality(loc: Loc, op: EqualityOp, lhs: AstRef, rhs: AstRef) -> AstRef {
        Self::make(loc, types::boolean(), AstKind::Equality(op, lhs, rhs))
    }

    pub fn relation(loc: Loc, op: RelationOp, lhs: AstRef, rhs: AstRef) -> AstRef {
        Self::make(loc, types::boolean(), AstKind::Relation(op, lhs, rhs))
    }

    pub fn if_(loc: Loc, cond: AstRef, then: AstRef, otherwise: AstRef) -> AstRef {
        let ty = if then.ty() == otherwise.ty() {
            then.ty()
        } else {
            types::fresh_var()
        };
        Self::make(loc, ty, AstKind::If(cond, then, otherwise))
    }

    pub fn call(loc: Loc, callee: AstRef, args: Vec<AstRef>) -> AstRef {
        let callee_ty = callee.ty().resolve();
        // Deduce open parameter types from the argument nodes, so a later
        // call that inspects the callee's type sees what was actually passed.
        if let Some(param_ty) = callee_ty.function_arg() {
            if let Some(members) = param_ty.resolve().product_members() {
                for (member, arg) in members.iter().zip(&args) {
                    member.resolve().bind(arg.ty());
                }
            }
        }
        let ty = callee_ty.function_result().unwrap_or_else(types::fresh_var);
        Self::make(loc, ty, AstKind::Call(callee, args))
    }

    pub fn function(
        loc: Loc,
        env: Env,
        arg: TypeRef,
        params: Vec<Name>,
        body: AstRef,
        name: Option<Name>,
    ) -> AstRef {
        let ty = types::function(arg, body.ty());
        Self::make(
            loc,
            ty,
            AstKind::Function {
                env,
                arg,
                params,
                body,
                name,
            },
        )
    }

    pub fn incomplete_fn(loc: Loc, arg: TypeRef, name: Option<Name>) -> AstRef {
        let ty = types::function(arg, types::fresh_var());
        Self::make(loc, ty, AstKind::IncompleteFn { arg, name })
    }

    pub fn native_call(
        loc: Loc,
        name: &'static str,
        result: TypeRef,
        args: Vec<AstRef>,
        arg_types: Vec<TypeRef>,
    ) -> AstRef {
        Self::make(
            loc,
            result,
            AstKind::NativeCall {
                name,
                args,
                arg_types,
            },
        )
    }

    pub fn display(loc: Loc, value: AstRef) -> AstRef {
        Self::make(loc, types::void(), AstKind::Display(value))
    }

    pub fn assign(loc: Loc, env: Env, name: Name, value: AstRef) -> AstRef {
        Self::make(loc, types::void(), AstKind::Assign { env, name, value })
    }

    pub fn define(loc: Loc, env: Env, name: Name, value: AstRef) -> AstRef {
        Self::make(loc, types::void(), AstKind::Define { env, name, value })
    }

    pub fn is_incomplete(&self) -> bool {
        matches!(self.kind, AstKind::IncompleteFn { .. })
    }
}

impl fmt::Display for AstNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            AstKind::Void => write!(f, "()"),
            AstKind::Int(i) => write!(f, "{i}"),
            AstKind::Bool(b) => write!(f, "{b}"),
            AstKind::Symbol(n) => write!(f, "{n}"),
            AstKind::String(s) => write!(f, "{s:?}"),
            AstKind::Singleton => write!(f, "<{}>", self.ty),
            AstKind::Cons(h, t) => write!(f, "(cons {h} {t})"),
            AstKind::Head(l) => write!(f, "(head {l})"),
            AstKind::Tail(l) => write!(f, "(tail {l})"),
            AstKind::IsEmpty(l) => write!(f, "(empty? {l})"),
            AstKind::Length(v) => write!(f, "(length {v})"),
            AstKind::Not(v) => write!(f, "(not {v})"),
            AstKind::Math(op, l, r) => write!(f, "({op:?} {l} {r})"),
            AstKind::Logic(op, l, r) => write!(f, "({op:?} {l} {r})"),
            AstKind::Equality(op, l, r) => write!(f, "({op:?} {l} {r})"),
            AstKind::Relation(op, l, r) => write!(f, "({op:?} {l} {r})"),
            AstKind::If(c, t, e) => write!(f, "(if {c} {t} {e})"),
            AstKind::Call(callee, args) => {
                write!(f, "(call {callee}")?;
                for arg in args {
                    write!(f, " {arg}")?;
                }
                write!(f, ")")
            }
            AstKind::Function { name, body, .. } => match name {
                Some(n) => write!(f, "(fn {n} {body})"),
                None => write!(f, "(fn {body})"),
            },
            AstKind::IncompleteFn { name, .. } => match name {
                Some(n) => write!(f, "(fn* {n})"),
                None => write!(f, "(fn*)"),
            },
            AstKind::NativeCall { name, args, .. } => {
                write!(f, "(native {name}")?;
                for arg in args {
                    write!(f, " {arg}")?;
                }
                write!(f, ")")
            }
            AstKind::Display(v) => write!(f, "(display {v})"),
            AstKind::Assign { name, value, .. } => write!(f, "(assign {name} {value})"),
            AstKind::Define { name, value, .. } => write!(f, "(define {name} {value})"),
        }
    }
}

//! The tagged value universe. A value is a type descriptor, a payload, and a
//! source location. Scalar payloads are inline; everything else lives behind
//! a reference count, so `Clone` on a value is a cheap handle copy and
//! [`Value::deep_clone`] is the structural copy.

use std::cell::RefCell;
use std::fmt::{self, Display};
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use fxhash::{FxHashMap, FxHashSet};
use itertools::Itertools;

use crate::ast::AstRef;
use crate::env::Env;
use crate::loc::Loc;
use crate::symbol::Name;
use crate::types::{self, Kind, TypeRef};

/// High bit of a parameter slot marks a keyword slot: the caller must pass
/// the named symbol verbatim in that position. The low bits hold the name id
/// either way, so positional indexing is preserved.
pub const KEYWORD_SLOT_BIT: u64 = 1 << 63;
pub const SLOT_NAME_MASK: u64 = !KEYWORD_SLOT_BIT;

pub fn positional_slot(name: Name) -> u64 {
    name.raw()
}

pub fn keyword_slot(name: Name) -> u64 {
    name.raw() | KEYWORD_SLOT_BIT
}

pub fn slot_is_keyword(slot: u64) -> bool {
    slot & KEYWORD_SLOT_BIT != 0
}

pub fn slot_name(slot: u64) -> Option<Name> {
    Name::from_raw(slot & SLOT_NAME_MASK)
}

#[derive(Clone)]
pub struct Value {
    ty: TypeRef,
    loc: Loc,
    payload: Payload,
}

#[derive(Clone)]
enum Payload {
    Unit,
    Int(i64),
    Bool(bool),
    Symbol(Name),
    Type(TypeRef),
    Str(Rc<String>),
    List(Rc<ListCell>),
    Sum(Rc<Value>),
    Product(Rc<Vec<Value>>),
    Function(Rc<FunctionValue>),
    Alias(Rc<Value>),
    Macro(Rc<MacroValue>),
    Runtime(AstRef),
}

pub struct ListCell {
    pub head: Value,
    pub tail: Value,
}

/// A host-provided primitive; receives the calling environment and the
/// argument product, and its return value is the call result verbatim.
pub type Builtin = fn(&Env, &Value) -> Value;

pub enum FnBody {
    Expr(Value),
    Builtin { handler: Builtin, arity: u64 },
}

pub struct FunctionValue {
    name: Option<Name>,
    env: Env,
    args: Vec<u64>,
    body: FnBody,
    insts: RefCell<Option<FxHashMap<TypeRef, AstRef>>>,
    calls: RefCell<Option<CallSet>>,
}

/// The transitive-callee set of a function body. Identities are payload
/// addresses; non-self callees are pinned so the addresses stay unique for
/// as long as the set exists. A function never pins itself, which keeps the
/// payload free of self-cycles.
struct CallSet {
    seen: FxHashSet<usize>,
    pinned: Vec<Rc<FunctionValue>>,
}

pub struct MacroValue {
    name: Option<Name>,
    env: Env,
    args: Vec<u64>,
    body: FnBody,
}

impl Value {
    pub fn void(loc: Loc) -> Value {
        Value {
            ty: types::void(),
            loc,
            payload: Payload::Unit,
        }
    }

    pub fn error() -> Value {
        Value {
            ty: types::error(),
            loc: Loc::default(),
            payload: Payload::Unit,
        }
    }

    pub fn int(value: i64, loc: Loc) -> Value {
        Value {
            ty: types::int(),
            loc,
            payload: Payload::Int(value),
        }
    }

    pub fn boolean(value: bool, loc: Loc) -> Value {
        Value {
            ty: types::boolean(),
            loc,
            payload: Payload::Bool(value),
        }
    }

    pub fn symbol(name: Name, loc: Loc) -> Value {
        Value {
            ty: types::symbol(),
            loc,
            payload: Payload::Symbol(name),
        }
    }

    pub fn of_type(ty: TypeRef, loc: Loc) -> Value {
        Value {
            ty: types::typedesc(),
            loc,
            payload: Payload::Type(ty),
        }
    }

    pub fn string(text: impl Into<String>, loc: Loc) -> Value {
        Value {
            ty: types::string(),
            loc,
            payload: Payload::Str(Rc::new(text.into())),
        }
    }

    /// A cons cell. The list type follows the head; the tail must already be
    /// a list or void, which the `cons` operator checks before calling this.
    pub fn list(head: Value, tail: Value, loc: Loc) -> Value {
        let ty = types::list(head.ty());
        Value {
            ty,
            loc,
            payload: Payload::List(Rc::new(ListCell { head, tail })),
        }
    }

    pub fn sum(inner: Value, sum_ty: TypeRef, loc: Loc) -> Value {
        Value {
            ty: sum_ty,
            loc,
            payload: Payload::Sum(Rc::new(inner)),
        }
    }

    pub fn product(members: Vec<Value>, loc: Loc) -> Value {
        let ty = types::product(members.iter().map(|m| m.ty()).collect());
        Value {
            ty,
            loc,
            payload: Payload::Product(Rc::new(members)),
        }
    }

    pub fn alias(inner: Value, loc: Loc) -> Value {
        Value {
            ty: types::alias(),
            loc,
            payload: Payload::Alias(Rc::new(inner)),
        }
    }

    pub fn runtime(node: AstRef) -> Value {
        Value {
            ty: types::runtime(node.ty()),
            loc: node.loc(),
            payload: Payload::Runtime(node),
        }
    }

    fn with_function(payload: Rc<FunctionValue>, ty: TypeRef, loc: Loc) -> Value {
        Value {
            ty,
            loc,
            payload: Payload::Function(payload),
        }
    }

    pub fn ty(&self) -> TypeRef {
        self.ty
    }

    pub fn loc(&self) -> Loc {
        self.loc
    }

    pub fn with_loc(mut self, loc: Loc) -> Value {
        self.loc = loc;
        self
    }

    pub fn kind(&self) -> Kind {
        self.ty.kind()
    }

    pub fn is_void(&self) -> bool {
        self.kind() == Kind::Void
    }

    pub fn is_error(&self) -> bool {
        self.kind() == Kind::Error
    }

    pub fn is_int(&self) -> bool {
        self.kind() == Kind::Int
    }

    pub fn is_bool(&self) -> bool {
        self.kind() == Kind::Bool
    }

    pub fn is_symbol(&self) -> bool {
        self.kind() == Kind::Symbol
    }

    pub fn is_type(&self) -> bool {
        self.kind() == Kind::Type
    }

    pub fn is_string(&self) -> bool {
        self.kind() == Kind::String
    }

    pub fn is_list(&self) -> bool {
        self.kind() == Kind::List
    }

    pub fn is_sum(&self) -> bool {
        self.kind() == Kind::Sum
    }

    pub fn is_product(&self) -> bool {
        self.kind() == Kind::Product
    }

    pub fn is_function(&self) -> bool {
        self.kind() == Kind::Function
    }

    pub fn is_alias(&self) -> bool {
        self.kind() == Kind::Alias
    }

    pub fn is_macro(&self) -> bool {
        self.kind() == Kind::Macro
    }

    pub fn is_runtime(&self) -> bool {
        self.kind() == Kind::Runtime
    }

    pub fn as_int(&self) -> Option<i64> {
        match self.payload {
            Payload::Int(i) => Some(i),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self.payload {
            Payload::Bool(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_symbol(&self) -> Option<Name> {
        match self.payload {
            Payload::Symbol(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_type(&self) -> Option<TypeRef> {
        match self.payload {
            Payload::Type(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match &self.payload {
            Payload::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&ListCell> {
        match &self.payload {
            Payload::List(cell) => Some(cell),
            _ => None,
        }
    }

    fn list_cell(&self) -> Option<Rc<ListCell>> {
        match &self.payload {
            Payload::List(cell) => Some(cell.clone()),
            _ => None,
        }
    }

    pub fn as_sum(&self) -> Option<&Value> {
        match &self.payload {
            Payload::Sum(inner) => Some(inner),
            _ => None,
        }
    }

    pub fn as_alias(&self) -> Option<&Value> {
        match &self.payload {
            Payload::Alias(inner) => Some(inner),
            _ => None,
        }
    }

    pub fn as_product(&self) -> Option<&[Value]> {
        match &self.payload {
            Payload::Product(values) => Some(values),
            _ => None,
        }
    }

    pub fn as_function(&self) -> Option<&Rc<FunctionValue>> {
        match &self.payload {
            Payload::Function(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_macro(&self) -> Option<&Rc<MacroValue>> {
        match &self.payload {
            Payload::Macro(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_runtime(&self) -> Option<&AstRef> {
        match &self.payload {
            Payload::Runtime(node) => Some(node),
            _ => None,
        }
    }

    /// Structural copy. Lists copy their spine, strings their contents,
    /// functions and macros their captured frame and body. Scalars and
    /// runtime handles copy shallowly; an AST node is immutable and shared.
    pub fn deep_clone(&self) -> Value {
        match &self.payload {
            Payload::List(cell) => {
                Value::list(cell.head.deep_clone(), cell.tail.deep_clone(), self.loc)
            }
            Payload::Str(s) => Value::string(s.as_str(), self.loc),
            Payload::Sum(inner) => Value::sum((**inner).clone(), self.ty, self.loc),
            Payload::Product(values) => Value::product(values.to_vec(), self.loc),
            Payload::Alias(inner) => Value::alias((**inner).clone(), self.loc),
            Payload::Function(f) => {
                Value::with_function(Rc::new(f.deep_clone()), self.ty, self.loc)
            }
            Payload::Macro(m) => Value {
                ty: self.ty,
                loc: self.loc,
                payload: Payload::Macro(Rc::new(m.deep_clone())),
            },
            _ => self.clone(),
        }
    }

    /// A structural 64-bit hash; each kind mixes a distinct salt so values
    /// of the same shape but different constructors cannot collide.
    pub fn hash64(&self) -> u64 {
        match &self.payload {
            Payload::Unit if self.is_void() => 0x58c1_d9b4_91f3_0d17,
            Payload::Unit => 0xc6a4_a793_5bd1_e995,
            Payload::Int(i) => fxhash::hash64(i) ^ 0x9ae1_6a3b_2f90_404f,
            Payload::Bool(true) => 0x6c62_272e_07bb_0142,
            Payload::Bool(false) => 0x27d4_eb2f_1656_67c5,
            Payload::Symbol(n) => fxhash::hash64(&n.raw()) ^ 0x1657_6ccd_9c2a_731d,
            Payload::Type(t) => fxhash::hash64(t),
            Payload::Str(s) => fxhash::hash64(s.as_str()) ^ 0x7fb9_3c8c_0d52_4e85,
            Payload::List(_) => {
                let mut h = 0x8ebc_6af0_9c88_c6e3;
                let mut cursor = self.clone();
                while let Some(cell) = cursor.list_cell() {
                    h ^= cell.head.hash64();
                    cursor = cell.tail.clone();
                }
                h
            }
            Payload::Sum(inner) => inner.hash64() ^ 0x589d_6bcd_8e1b_2a45,
            Payload::Product(values) => {
                let mut h = 0x4cf5_ad43_2745_937f;
                for v in values.iter() {
                    h ^= v.hash64();
                }
                h
            }
            Payload::Function(f) => {
                let mut h = 0x52dc_e729_1b54_9a2d;
                match &f.body {
                    FnBody::Builtin { handler, .. } => h ^= fxhash::hash64(&(*handler as usize)),
                    FnBody::Expr(body) => {
                        h ^= body.hash64();
                        for slot in &f.args {
                            h ^= fxhash::hash64(slot);
                        }
                    }
                }
                h
            }
            Payload::Alias(inner) => inner.hash64() ^ 0x38b3_4f2c_5e96_d1a7,
            Payload::Macro(m) => {
                let mut h = 0xb492_b66f_be98_f273;
                match &m.body {
                    FnBody::Builtin { handler, .. } => h ^= fxhash::hash64(&(*handler as usize)),
                    FnBody::Expr(body) => {
                        h ^= body.hash64();
                        for slot in &m.args {
                            h ^= fxhash::hash64(slot);
                        }
                    }
                }
                h
            }
            Payload::Runtime(node) => {
                fxhash::hash64(&self.ty) ^ fxhash::hash64(&Rc::as_ptr(node))
            }
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        if self.ty != other.ty {
            return false;
        }
        match (&self.payload, &other.payload) {
            (Payload::Unit, Payload::Unit) => true,
            (Payload::Int(a), Payload::Int(b)) => a == b,
            (Payload::Bool(a), Payload::Bool(b)) => a == b,
            (Payload::Symbol(a), Payload::Symbol(b)) => a == b,
            (Payload::Type(a), Payload::Type(b)) => a == b,
            (Payload::Str(a), Payload::Str(b)) => a == b,
            (Payload::List(_), Payload::List(_)) => {
                let mut left = self.clone();
                let mut right = other.clone();
                loop {
                    match (left.list_cell(), right.list_cell()) {
                        (Some(l), Some(r)) => {
                            if l.head != r.head {
                                return false;
                            }
                            left = l.tail.clone();
                            right = r.tail.clone();
                        }
                        (None, None) => return left.is_void() && right.is_void(),
                        _ => return false,
                    }
                }
            }
            (Payload::Sum(a), Payload::Sum(b)) => a == b,
            (Payload::Product(a), Payload::Product(b)) => a == b,
            (Payload::Function(a), Payload::Function(b)) => a.structural_eq(b),
            (Payload::Alias(a), Payload::Alias(b)) => a == b,
            (Payload::Macro(a), Payload::Macro(b)) => a.structural_eq(b),
            (Payload::Runtime(a), Payload::Runtime(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.hash64());
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.payload {
            Payload::Unit if self.is_void() => write!(f, "()"),
            Payload::Unit => write!(f, "error"),
            Payload::Int(i) => write!(f, "{i}"),
            Payload::Bool(b) => write!(f, "{b}"),
            Payload::Symbol(n) => write!(f, "{n}"),
            Payload::Type(t) => write!(f, "{t}"),
            Payload::Str(s) => write!(f, "\"{s}\""),
            Payload::List(_) => {
                write!(f, "(")?;
                let mut cursor = self.clone();
                let mut first = true;
                while let Some(cell) = cursor.list_cell() {
                    if !first {
                        write!(f, " ")?;
                    }
                    write!(f, "{}", cell.head)?;
                    cursor = cell.tail.clone();
                    first = false;
                }
                write!(f, ")")
            }
            Payload::Sum(inner) => write!(f, "{inner}"),
            Payload::Product(values) => write!(f, "({})", values.iter().format(", ")),
            Payload::Function(_) => write!(f, "<#procedure>"),
            Payload::Alias(_) => write!(f, "<#alias>"),
            Payload::Macro(_) => write!(f, "<#macro>"),
            Payload::Runtime(_) => match self.ty.runtime_base() {
                Some(base) => write!(f, "<#runtime {base}>"),
                None => write!(f, "<#runtime>"),
            },
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self} : {}", self.ty)
    }
}

impl FunctionValue {
    /// A user-defined function. The closure scope is a child of the defining
    /// environment with every positional parameter pre-bound, so calls only
    /// rewrite slots. The captured environment may end up holding a binding
    /// back to this function; that cycle is accepted and never collected.
    pub fn new(name: Option<Name>, env: &Env, args: Vec<u64>, body: Value) -> Rc<FunctionValue> {
        let scope = env.child();
        for &slot in &args {
            if !slot_is_keyword(slot) {
                if let Some(param) = slot_name(slot) {
                    scope.define(param, Value::void(body.loc()));
                }
            }
        }
        Rc::new(FunctionValue {
            name,
            env: scope,
            args,
            body: FnBody::Expr(body),
            insts: RefCell::new(None),
            calls: RefCell::new(None),
        })
    }

    pub fn builtin(
        name: Option<Name>,
        env: &Env,
        handler: Builtin,
        arity: u64,
    ) -> Rc<FunctionValue> {
        Rc::new(FunctionValue {
            name,
            env: env.clone(),
            args: Vec::new(),
            body: FnBody::Builtin { handler, arity },
            insts: RefCell::new(None),
            calls: RefCell::new(None),
        })
    }

    /// Wraps the payload as a value. The function type starts as a fresh
    /// descriptor over two type variables; the concrete type is only pinned
    /// down per instantiation.
    pub fn into_value(self: Rc<Self>, loc: Loc) -> Value {
        let ty = types::function(types::fresh_var(), types::fresh_var());
        Value::with_function(self, ty, loc)
    }

    pub fn name(&self) -> Option<Name> {
        self.name
    }

    pub fn env(&self) -> &Env {
        &self.env
    }

    pub fn args(&self) -> &[u64] {
        &self.args
    }

    pub fn arity(&self) -> u64 {
        match &self.body {
            FnBody::Builtin { arity, .. } => *arity,
            FnBody::Expr(_) => self.args.len() as u64,
        }
    }

    pub fn is_builtin(&self) -> bool {
        matches!(self.body, FnBody::Builtin { .. })
    }

    pub fn builtin_handler(&self) -> Option<Builtin> {
        match &self.body {
            FnBody::Builtin { handler, .. } => Some(*handler),
            FnBody::Expr(_) => None,
        }
    }

    pub fn body_expr(&self) -> Option<&Value> {
        match &self.body {
            FnBody::Expr(body) => Some(body),
            FnBody::Builtin { .. } => None,
        }
    }

    pub fn addr(self: &Rc<Self>) -> usize {
        Rc::as_ptr(self) as usize
    }

    /// True once the call-graph pass has run for this function.
    pub fn found_calls(&self) -> bool {
        self.calls.borrow().is_some()
    }

    /// A function is recursive exactly when its own identity shows up in its
    /// transitive-callee set.
    pub fn recursive(self: &Rc<Self>) -> bool {
        match &*self.calls.borrow() {
            Some(set) => set.seen.contains(&self.addr()),
            None => false,
        }
    }

    /// Records `callee` as reachable from this body, folding in everything
    /// `callee` itself reaches so the set stays transitively closed.
    pub fn add_call(self: &Rc<Self>, callee: &Rc<FunctionValue>) {
        let self_addr = self.addr();
        let mut pins = Vec::new();
        let mut addrs = Vec::new();
        if callee.addr() != self_addr {
            if let Some(theirs) = &*callee.calls.borrow() {
                for &addr in &theirs.seen {
                    addrs.push(addr);
                }
                for pin in &theirs.pinned {
                    if pin.addr() != self_addr {
                        pins.push(pin.clone());
                    }
                }
            }
            pins.push(callee.clone());
        }
        addrs.push(callee.addr());

        let mut calls = self.calls.borrow_mut();
        let set = calls.get_or_insert_with(|| CallSet {
            seen: FxHashSet::default(),
            pinned: Vec::new(),
        });
        set.seen.extend(addrs);
        set.pinned.extend(pins);
    }

    /// Marks the call-graph pass complete even when no callee was found.
    pub fn seal_calls(&self) {
        let mut calls = self.calls.borrow_mut();
        if calls.is_none() {
            *calls = Some(CallSet {
                seen: FxHashSet::default(),
                pinned: Vec::new(),
            });
        }
    }

    pub fn instantiation_count(&self) -> usize {
        self.insts.borrow().as_ref().map_or(0, |map| map.len())
    }

    pub fn instantiation(&self, arg_ty: TypeRef) -> Option<AstRef> {
        self.insts
            .borrow()
            .as_ref()
            .and_then(|map| map.get(&arg_ty).cloned())
    }

    /// Stores a monomorphized body for `arg_ty`, replacing any placeholder
    /// installed while the body was being built.
    pub fn install_instantiation(&self, arg_ty: TypeRef, body: AstRef) {
        self.insts
            .borrow_mut()
            .get_or_insert_with(FxHashMap::default)
            .insert(arg_ty, body);
    }

    fn structural_eq(&self, other: &FunctionValue) -> bool {
        match (&self.body, &other.body) {
            (FnBody::Builtin { handler: a, .. }, FnBody::Builtin { handler: b, .. }) => a == b,
            (FnBody::Expr(a), FnBody::Expr(b)) => self.args == other.args && a == b,
            _ => false,
        }
    }

    /// Structural copy: fresh closure frame, deep-copied body, empty caches.
    pub fn deep_clone(&self) -> FunctionValue {
        FunctionValue {
            name: self.name,
            env: self.env.deep_clone(),
            args: self.args.clone(),
            body: self.body.deep_clone(),
            insts: RefCell::new(None),
            calls: RefCell::new(None),
        }
    }
}

impl FnBody {
    fn deep_clone(&self) -> FnBody {
        match self {
            FnBody::Expr(body) => FnBody::Expr(body.deep_clone()),
            FnBody::Builtin { handler, arity } => FnBody::Builtin {
                handler: *handler,
                arity: *arity,
            },
        }
    }
}

impl MacroValue {
    pub fn new(name: Option<Name>, env: &Env, args: Vec<u64>, body: Value) -> Rc<MacroValue> {
        let scope = env.child();
        for &slot in &args {
            if !slot_is_keyword(slot) {
                if let Some(param) = slot_name(slot) {
                    scope.define(param, Value::void(body.loc()));
                }
            }
        }
        Rc::new(MacroValue {
            name,
            env: scope,
            args,
            body: FnBody::Expr(body),
        })
    }

    pub fn builtin(name: Option<Name>, env: &Env, handler: Builtin, arity: u64) -> Rc<MacroValue> {
        Rc::new(MacroValue {
            name,
            env: env.clone(),
            args: Vec::new(),
            body: FnBody::Builtin { handler, arity },
        })
    }

    pub fn into_value(self: Rc<Self>, loc: Loc) -> Value {
        let ty = types::macro_ty(self.arity());
        Value {
            ty,
            loc,
            payload: Payload::Macro(self),
        }
    }

    pub fn name(&self) -> Option<Name> {
        self.name
    }

    pub fn env(&self) -> &Env {
        &self.env
    }

    pub fn args(&self) -> &[u64] {
        &self.args
    }

    pub fn arity(&self) -> u64 {
        match &self.body {
            FnBody::Builtin { arity, .. } => *arity,
            FnBody::Expr(_) => self.args.len() as u64,
        }
    }

    pub fn builtin_handler(&self) -> Option<Builtin> {
        match &self.body {
            FnBody::Builtin { handler, .. } => Some(*handler),
            FnBody::Expr(_) => None,
        }
    }

    pub fn body_expr(&self) -> Option<&Value> {
        match &self.body {
            FnBody::Expr(body) => Some(body),
            FnBody::Builtin { .. } => None,
        }
    }

    fn structural_eq(&self, other: &MacroValue) -> bool {
        match (&self.body, &other.body) {
            (FnBody::Builtin { handler: a, .. }, FnBody::Builtin { handler: b, .. }) => a == b,
            (FnBody::Expr(a), FnBody::Expr(b)) => self.args == other.args && a == b,
            _ => false,
        }
    }

    pub fn deep_clone(&self) -> MacroValue {
        MacroValue {
            name: self.name,
            env: self.env.deep_clone(),
            args: self.args.clone(),
            body: self.body.deep_clone(),
        }
    }
}

/// Linearizes a cons chain into a vector of its elements.
pub fn to_vector(list: &Value) -> Vec<Value> {
    let mut values = Vec::new();
    let mut cursor = list.clone();
    while let Some(cell) = cursor.list_cell() {
        values.push(cell.head.clone());
        cursor = cell.tail.clone();
    }
    values
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::AstNode;

    fn loc() -> Loc {
        Loc::default()
    }

    fn list_of(values: &[Value]) -> Value {
        let mut out = Value::void(loc());
        for v in values.iter().rev() {
            out = Value::list(v.clone(), out, loc());
        }
        out
    }

    #[test]
    fn formatting_follows_the_printed_forms() {
        assert_eq!(Value::void(loc()).to_string(), "()");
        assert_eq!(Value::error().to_string(), "error");
        assert_eq!(Value::int(-7, loc()).to_string(), "-7");
        assert_eq!(Value::boolean(true, loc()).to_string(), "true");
        assert_eq!(Value::string("hi", loc()).to_string(), "\"hi\"");
        assert_eq!(Value::symbol(Name::intern("x"), loc()).to_string(), "x");
        let l = list_of(&[Value::int(1, loc()), Value::int(2, loc())]);
        assert_eq!(l.to_string(), "(1 2)");
        let p = Value::product(vec![Value::int(1, loc()), Value::boolean(false, loc())], loc());
        assert_eq!(p.to_string(), "(1, false)");
        let rt = Value::runtime(AstNode::int(loc(), 3));
        assert_eq!(rt.to_string(), "<#runtime int>");
    }

    #[test]
    fn equality_requires_the_same_descriptor() {
        assert_eq!(Value::int(3, loc()), Value::int(3, loc()));
        assert_ne!(Value::int(3, loc()), Value::int(4, loc()));
        assert_ne!(Value::int(1, loc()), Value::boolean(true, loc()));
        assert_eq!(Value::void(loc()), Value::void(loc()));
        assert_ne!(Value::void(loc()), Value::error());
        assert_eq!(
            Value::string("a", loc()),
            Value::string("a", loc())
        );
    }

    #[test]
    fn list_equality_is_elementwise() {
        let a = list_of(&[Value::int(1, loc()), Value::int(2, loc())]);
        let b = list_of(&[Value::int(1, loc()), Value::int(2, loc())]);
        let c = list_of(&[Value::int(1, loc())]);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn product_equality_is_positional() {
        let a = Value::product(vec![Value::int(1, loc()), Value::int(2, loc())], loc());
        let b = Value::product(vec![Value::int(1, loc()), Value::int(2, loc())], loc());
        let c = Value::product(vec![Value::int(2, loc()), Value::int(1, loc())], loc());
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn runtime_equality_is_node_identity() {
        let node = AstNode::int(loc(), 5);
        let a = Value::runtime(node.clone());
        let b = Value::runtime(node);
        let c = Value::runtime(AstNode::int(loc(), 5));
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn equal_values_hash_alike() {
        let pairs = [
            (Value::int(42, loc()), Value::int(42, loc())),
            (Value::string("s", loc()), Value::string("s", loc())),
            (
                list_of(&[Value::int(1, loc())]),
                list_of(&[Value::int(1, loc())]),
            ),
            (
                Value::product(vec![Value::boolean(true, loc())], loc()),
                Value::product(vec![Value::boolean(true, loc())], loc()),
            ),
        ];
        for (a, b) in pairs {
            assert_eq!(a, b);
            assert_eq!(a.hash64(), b.hash64());
        }
        assert_ne!(Value::void(loc()).hash64(), Value::error().hash64());
        assert_ne!(
            Value::int(0, loc()).hash64(),
            Value::boolean(false, loc()).hash64()
        );
    }

    #[test]
    fn deep_clone_preserves_structure_and_type() {
        let values = [
            Value::int(9, loc()),
            Value::string("text", loc()),
            list_of(&[Value::int(1, loc()), Value::int(2, loc())]),
            Value::product(vec![Value::int(1, loc()), Value::string("x", loc())], loc()),
            Value::runtime(AstNode::boolean(loc(), true)),
        ];
        for v in values {
            let copy = v.deep_clone();
            assert_eq!(copy, v);
            assert_eq!(copy.ty(), v.ty());
        }
    }

    #[test]
    fn function_clone_compares_equal_and_keeps_its_type() {
        let env = Env::root();
        let body = Value::int(1, loc());
        let f = FunctionValue::new(
            Some(Name::intern("f")),
            &env,
            vec![positional_slot(Name::intern("x"))],
            body,
        )
        .into_value(loc());
        let copy = f.deep_clone();
        assert_eq!(copy, f);
        assert_eq!(copy.ty(), f.ty());
    }

    #[test]
    fn builtin_functions_compare_by_handler() {
        fn first(_: &Env, _: &Value) -> Value {
            Value::void(Loc::default())
        }
        fn second(_: &Env, _: &Value) -> Value {
            Value::error()
        }
        let env = Env::root();
        let a = FunctionValue::builtin(None, &env, first, 1).into_value(loc());
        let b = FunctionValue::builtin(None, &env, first, 1).into_value(loc());
        let c = FunctionValue::builtin(None, &env, second, 1).into_value(loc());
        assert!(a.as_function().unwrap().structural_eq(b.as_function().unwrap()));
        assert!(!a.as_function().unwrap().structural_eq(c.as_function().unwrap()));
    }

    #[test]
    fn keyword_slots_pack_and_unpack() {
        let by = Name::intern("by");
        let slot = keyword_slot(by);
        assert!(slot_is_keyword(slot));
        assert!(!slot_is_keyword(positional_slot(by)));
        assert_eq!(slot_name(slot), Some(by));
    }

    #[test]
    fn to_vector_linearizes_the_chain() {
        let l = list_of(&[Value::int(1, loc()), Value::int(2, loc()), Value::int(3, loc())]);
        let v = to_vector(&l);
        assert_eq!(v.len(), 3);
        assert_eq!(v[2].as_int(), Some(3));
        assert!(to_vector(&Value::void(loc())).is_empty());
    }

    #[test]
    fn call_set_records_recursion() {
        let env = Env::root();
        let f = FunctionValue::new(None, &env, vec![], Value::void(loc()));
        assert!(!f.found_calls());
        assert!(!f.recursive());
        f.add_call(&f);
        assert!(f.found_calls());
        assert!(f.recursive());
    }
}

//! The type-descriptor universe. Descriptors are interned: scalar kinds are
//! singletons, structured kinds are hash-consed, and type variables are
//! freshly allocated on every request. Equality between descriptors is
//! identity, so a [`TypeRef`] compares and hashes by address.

use std::cell::{Cell, RefCell};
use std::fmt::{self, Display};
use std::hash::{Hash, Hasher};

use fxhash::FxHashMap;
use itertools::Itertools;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Kind {
    Void,
    Error,
    Int,
    Bool,
    Symbol,
    Type,
    String,
    List,
    Sum,
    Product,
    Function,
    Alias,
    Macro,
    Runtime,
    Var,
}

#[derive(Debug)]
pub enum Ty {
    Void,
    Error,
    Int,
    Bool,
    Symbol,
    Type,
    String,
    Alias,
    List(TypeRef),
    Sum(Vec<TypeRef>),
    Product(Vec<TypeRef>),
    Function { arg: TypeRef, result: TypeRef },
    Macro(u64),
    Runtime(TypeRef),
    Var { id: u64, bound: Cell<Option<TypeRef>> },
}

/// Interned handle to a type descriptor. Compares and hashes by identity.
#[derive(Clone, Copy)]
pub struct TypeRef(&'static Ty);

impl PartialEq for TypeRef {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.0, other.0)
    }
}

impl Eq for TypeRef {}

impl Hash for TypeRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (self.0 as *const Ty as usize).hash(state);
    }
}

#[derive(PartialEq, Eq, Hash)]
enum TyKey {
    List(TypeRef),
    Sum(Vec<TypeRef>),
    Product(Vec<TypeRef>),
    Function(TypeRef, TypeRef),
    Macro(u64),
    Runtime(TypeRef),
}

#[derive(Default)]
struct Interner {
    singletons: FxHashMap<Kind, TypeRef>,
    structured: FxHashMap<TyKey, TypeRef>,
    next_var: u64,
}

thread_local! {
    static TYPES: RefCell<Interner> = RefCell::new(Interner::default());
}

fn alloc(ty: Ty) -> TypeRef {
    TypeRef(Box::leak(Box::new(ty)))
}

fn singleton(kind: Kind, make: fn() -> Ty) -> TypeRef {
    TYPES.with(|t| *t.borrow_mut().singletons.entry(kind).or_insert_with(|| alloc(make())))
}

fn structured(key: TyKey, make: impl FnOnce() -> Ty) -> TypeRef {
    TYPES.with(|t| *t.borrow_mut().structured.entry(key).or_insert_with(|| alloc(make())))
}

pub fn void() -> TypeRef {
    singleton(Kind::Void, || Ty::Void)
}

pub fn error() -> TypeRef {
    singleton(Kind::Error, || Ty::Error)
}

pub fn int() -> TypeRef {
    singleton(Kind::Int, || Ty::Int)
}

pub fn boolean() -> TypeRef {
    singleton(Kind::Bool, || Ty::Bool)
}

pub fn symbol() -> TypeRef {
    singleton(Kind::Symbol, || Ty::Symbol)
}

/// The type of first-class type values.
pub fn typedesc() -> TypeRef {
    singleton(Kind::Type, || Ty::Type)
}

pub fn string() -> TypeRef {
    singleton(Kind::String, || Ty::String)
}

pub fn alias() -> TypeRef {
    singleton(Kind::Alias, || Ty::Alias)
}

pub fn list(element: TypeRef) -> TypeRef {
    structured(TyKey::List(element), || Ty::List(element))
}

pub fn sum(members: Vec<TypeRef>) -> TypeRef {
    structured(TyKey::Sum(members.clone()), || Ty::Sum(members))
}

pub fn product(members: Vec<TypeRef>) -> TypeRef {
    structured(TyKey::Product(members.clone()), || Ty::Product(members))
}

pub fn function(arg: TypeRef, result: TypeRef) -> TypeRef {
    structured(TyKey::Function(arg, result), || Ty::Function { arg, result })
}

pub fn macro_ty(arity: u64) -> TypeRef {
    structured(TyKey::Macro(arity), || Ty::Macro(arity))
}

pub fn runtime(base: TypeRef) -> TypeRef {
    structured(TyKey::Runtime(base), || Ty::Runtime(base))
}

/// A fresh, unbound type variable. Every call yields a distinct descriptor.
pub fn fresh_var() -> TypeRef {
    let id = TYPES.with(|t| {
        let mut t = t.borrow_mut();
        t.next_var += 1;
        t.next_var
    });
    alloc(Ty::Var {
        id,
        bound: Cell::new(None),
    })
}

impl TypeRef {
    pub fn kind(self) -> Kind {
        match self.0 {
            Ty::Void => Kind::Void,
            Ty::Error => Kind::Error,
            Ty::Int => Kind::Int,
            Ty::Bool => Kind::Bool,
            Ty::Symbol => Kind::Symbol,
            Ty::Type => Kind::Type,
            Ty::String => Kind::String,
            Ty::Alias => Kind::Alias,
            Ty::List(_) => Kind::List,
            Ty::Sum(_) => Kind::Sum,
            Ty::Product(_) => Kind::Product,
            Ty::Function { .. } => Kind::Function,
            Ty::Macro(_) => Kind::Macro,
            Ty::Runtime(_) => Kind::Runtime,
            Ty::Var { .. } => Kind::Var,
        }
    }

    /// True when no unbound type variable is reachable from this descriptor.
    pub fn concrete(self) -> bool {
        match self.0 {
            Ty::List(e) => e.concrete(),
            Ty::Sum(ms) | Ty::Product(ms) => ms.iter().all(|m| m.concrete()),
            Ty::Function { arg, result } => arg.concrete() && result.concrete(),
            Ty::Runtime(b) => b.concrete(),
            Ty::Var { bound, .. } => match bound.get() {
                Some(t) => t.concrete(),
                None => false,
            },
            _ => true,
        }
    }

    /// Chases bound type variables to whatever they stand for. An unbound
    /// variable resolves to itself.
    pub fn resolve(self) -> TypeRef {
        let mut t = self;
        while let Ty::Var { bound, .. } = t.0 {
            match bound.get() {
                Some(next) => t = next,
                None => break,
            }
        }
        t
    }

    /// Rebuilds this descriptor with every bound variable replaced by what
    /// it stands for, re-interning along the way. Unbound variables stay.
    pub fn canonical(self) -> TypeRef {
        let t = self.resolve();
        match t.0 {
            Ty::List(e) => list(e.canonical()),
            Ty::Sum(ms) => sum(ms.iter().map(|m| m.canonical()).collect()),
            Ty::Product(ms) => product(ms.iter().map(|m| m.canonical()).collect()),
            Ty::Function { arg, result } => function(arg.canonical(), result.canonical()),
            Ty::Runtime(b) => runtime(b.canonical()),
            _ => t,
        }
    }

    /// Binds an unbound type variable. No effect on other kinds.
    pub fn bind(self, to: TypeRef) {
        if let Ty::Var { bound, .. } = self.0 {
            if bound.get().is_none() {
                bound.set(Some(to));
            }
        }
    }

    pub fn list_element(self) -> Option<TypeRef> {
        match self.0 {
            Ty::List(e) => Some(*e),
            _ => None,
        }
    }

    pub fn runtime_base(self) -> Option<TypeRef> {
        match self.0 {
            Ty::Runtime(b) => Some(*b),
            _ => None,
        }
    }

    pub fn product_members(self) -> Option<&'static [TypeRef]> {
        match self.0 {
            Ty::Product(ms) => Some(ms),
            _ => None,
        }
    }

    pub fn function_arg(self) -> Option<TypeRef> {
        match self.0 {
            Ty::Function { arg, .. } => Some(*arg),
            _ => None,
        }
    }

    pub fn function_result(self) -> Option<TypeRef> {
        match self.0 {
            Ty::Function { result, .. } => Some(*result),
            _ => None,
        }
    }
}

impl Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Ty::Void => write!(f, "void"),
            Ty::Error => write!(f, "error"),
            Ty::Int => write!(f, "int"),
            Ty::Bool => write!(f, "bool"),
            Ty::Symbol => write!(f, "symbol"),
            Ty::Type => write!(f, "type"),
            Ty::String => write!(f, "string"),
            Ty::Alias => write!(f, "alias"),
            Ty::List(e) => write!(f, "[{e}]"),
            Ty::Sum(ms) => write!(f, "({})", ms.iter().format(" | ")),
            Ty::Product(ms) => write!(f, "({})", ms.iter().format(", ")),
            Ty::Function { arg, result } => write!(f, "{arg} -> {result}"),
            Ty::Macro(arity) => write!(f, "macro/{arity}"),
            Ty::Runtime(b) => write!(f, "runtime<{b}>"),
            Ty::Var { id, bound } => match bound.get() {
                Some(t) => write!(f, "{t}"),
                None => write!(f, "'t{id}"),
            },
        }
    }
}

impl fmt::Debug for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self}")
    }
}

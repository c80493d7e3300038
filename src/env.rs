//! The environment is the context an expression is evaluated in: a chain of
//! scopes with one mutable value slot per binding. Cloning the handle shares
//! the scope; [`Env::deep_clone`] copies the local frame so monomorphization
//! can rebind parameters without disturbing the original.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use fxhash::FxBuildHasher;

use crate::symbol::Name;
use crate::value::Value;

/// A single binding. The slot is rewritten in place by eager calls and by
/// the assignment protocol.
#[derive(Clone)]
pub struct Def {
    pub value: Value,
}

type Bindings = im_rc::HashMap<Name, Def, FxBuildHasher>;

struct Scope {
    bindings: Bindings,
    parent: Option<Env>,
    runtime: bool,
}

#[derive(Clone)]
pub struct Env(Rc<RefCell<Scope>>);

impl Env {
    pub fn root() -> Env {
        Env(Rc::new(RefCell::new(Scope {
            bindings: Bindings::default(),
            parent: None,
            runtime: false,
        })))
    }

    /// A fresh scope whose lookups fall through to this one.
    pub fn child(&self) -> Env {
        Env(Rc::new(RefCell::new(Scope {
            bindings: Bindings::default(),
            parent: Some(self.clone()),
            runtime: false,
        })))
    }

    /// Copies the local frame, sharing every enclosing scope. Updates to the
    /// copy's own bindings are invisible to the original.
    pub fn deep_clone(&self) -> Env {
        let scope = self.0.borrow();
        Env(Rc::new(RefCell::new(Scope {
            bindings: scope.bindings.clone(),
            parent: scope.parent.clone(),
            runtime: scope.runtime,
        })))
    }

    pub fn define(&self, name: Name, value: Value) {
        self.0.borrow_mut().bindings.insert(name, Def { value });
    }

    pub fn lookup(&self, name: Name) -> Option<Value> {
        let scope = self.0.borrow();
        match scope.bindings.get(&name) {
            Some(def) => Some(def.value.clone()),
            None => scope.parent.as_ref().and_then(|p| p.lookup(name)),
        }
    }

    /// Rewrites the slot of an existing binding, wherever in the chain it
    /// lives. Returns false when the name is unbound.
    pub fn update(&self, name: Name, value: Value) -> bool {
        let mut scope = self.0.borrow_mut();
        if scope.bindings.contains_key(&name) {
            scope.bindings.insert(name, Def { value });
            true
        } else {
            match scope.parent.clone() {
                Some(parent) => {
                    drop(scope);
                    parent.update(name, value)
                }
                None => false,
            }
        }
    }

    /// Marks this scope as runtime: evaluation under it is producing code,
    /// not values.
    pub fn make_runtime(&self) {
        self.0.borrow_mut().runtime = true;
    }

    pub fn is_runtime(&self) -> bool {
        let scope = self.0.borrow();
        scope.runtime || scope.parent.as_ref().is_some_and(|p| p.is_runtime())
    }

    pub fn ptr_eq(&self, other: &Env) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Env {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Env").finish_non_exhaustive()
    }
}

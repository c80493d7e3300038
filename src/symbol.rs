//! The symbol interner. Names are mapped to dense identifiers in first-seen
//! order; the mapping lives for the whole process and is never unassigned.
//! Single-threaded by contract, like the rest of the evaluator.

use std::cell::RefCell;
use std::fmt::{self, Display};

use fxhash::FxBuildHasher;
use string_interner::backend::StringBackend;
use string_interner::{DefaultSymbol, StringInterner, Symbol as _};

type Interner = StringInterner<StringBackend<DefaultSymbol>, FxBuildHasher>;

thread_local! {
    static INTERNER: RefCell<Interner> = RefCell::new(Interner::with_hasher(FxBuildHasher::default()));
}

/// An interned name. Copyable handle over a dense identifier; two names are
/// equal exactly when their spellings are.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct Name(DefaultSymbol);

impl Name {
    /// Returns the existing id for `text` or assigns the next one.
    pub fn intern(text: &str) -> Name {
        INTERNER.with(|i| Name(i.borrow_mut().get_or_intern(text)))
    }

    /// The original spelling of this name.
    pub fn resolve(self) -> String {
        INTERNER.with(|i| {
            i.borrow()
                .resolve(self.0)
                .unwrap_or_default()
                .to_string()
        })
    }

    /// The dense identifier, for packing into parameter slots.
    pub fn raw(self) -> u64 {
        self.0.to_usize() as u64
    }

    /// Recovers a name from a packed identifier. The id must have come from
    /// [`Name::raw`].
    pub fn from_raw(raw: u64) -> Option<Name> {
        DefaultSymbol::try_from_usize(raw as usize).map(Name)
    }
}

impl Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        INTERNER.with(|i| match i.borrow().resolve(self.0) {
            Some(text) => write!(f, "{text}"),
            None => write!(f, "<name:{}>", self.raw()),
        })
    }
}

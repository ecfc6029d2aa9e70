//! Interned symbols

use std::{
    fmt,
    sync::{Arc, LazyLock},
};

use indexmap::IndexSet;
use parking_lot::RwLock;

/// An interned name. Type, component, field and annotation names are all
/// symbols, so comparing them is an integer comparison.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Symbol(pub(crate) u32);

static SYMTAB: LazyLock<RwLock<IndexSet<Arc<str>>>> =
    LazyLock::new(|| RwLock::new(IndexSet::new()));

impl Symbol {
    pub fn intern(s: &str) -> Self {
        if let Some(id) = SYMTAB.read().get_index_of(s) {
            return Self(id as u32);
        }
        let mut symtab = SYMTAB.write();
        // Someone may have beaten us to it between dropping the read lock and
        // acquiring the write lock.
        let (id, _) = symtab.insert_full(Arc::from(s));
        Self(id as u32)
    }

    /// The symbol for `s` if it has been interned. Never grows the table.
    pub fn lookup(s: &str) -> Option<Self> {
        SYMTAB.read().get_index_of(s).map(|id| Self(id as u32))
    }

    pub fn to_str(self) -> Arc<str> {
        let symtab = SYMTAB.read();
        symtab[self.0 as usize].clone()
    }
}

impl From<&str> for Symbol {
    fn from(s: &str) -> Self {
        Self::intern(s)
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_str())
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_str())
    }
}

impl PartialEq<&'_ str> for Symbol {
    fn eq(&self, rhs: &&str) -> bool {
        self.to_str().as_ref() == *rhs
    }
}

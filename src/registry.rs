//! Process-wide collection of declared types.
//!
//! Record types synthesized by `#[derive(Record)]` submit themselves through
//! `inventory` and are present in every registry built with
//! [`Registry::new`]. Other types are added with [`Registry::register`].

use std::{
    collections::HashMap,
    sync::{Arc, LazyLock},
};

use parking_lot::RwLock;

use crate::{
    classes::Class,
    exceptions::Condition,
    records::{ComponentSpec, RecordType},
    reflect::TypeRef,
    symbols::Symbol,
};

#[doc(hidden)]
pub struct StaticRecord {
    rtd: fn() -> Arc<RecordType>,
}

impl StaticRecord {
    pub const fn new(rtd: fn() -> Arc<RecordType>) -> Self {
        Self { rtd }
    }
}

inventory::collect!(StaticRecord);

/// Name to type table. Lookups proceed concurrently; each name is written
/// once.
#[derive(Default)]
pub struct Registry {
    types: RwLock<HashMap<Symbol, TypeRef>>,
}

impl Registry {
    /// Construct an empty registry
    pub fn empty() -> Self {
        Self::default()
    }

    /// Construct a registry with every derived record type.
    pub fn new() -> Self {
        let registry = Self::empty();
        for decl in inventory::iter::<StaticRecord>() {
            let rtd = (decl.rtd)();
            if let Err(condition) = registry.register(rtd) {
                tracing::warn!(%condition, "skipping derived record type");
            }
        }
        registry
    }

    /// Add a type under its own name. Registering the same type again is a
    /// no-op; registering a different type under a taken name fails.
    pub fn register(&self, ty: impl Into<TypeRef>) -> Result<(), Condition> {
        let ty = ty.into();
        let name = ty.name();
        let mut types = self.types.write();
        match types.get(&name) {
            Some(existing) if existing.ptr_eq(&ty) => Ok(()),
            Some(_) => Err(Condition::duplicate_type(name)),
            None => {
                tracing::debug!(name = %name, record = ty.is_record(), "registered type");
                types.insert(name, ty);
                Ok(())
            }
        }
    }

    pub fn lookup(&self, name: &str) -> Option<TypeRef> {
        self.types.read().get(&Symbol::lookup(name)?).cloned()
    }

    pub fn lookup_record(&self, name: &str) -> Option<Arc<RecordType>> {
        match self.lookup(name)? {
            TypeRef::Record(rtd) => Some(rtd),
            TypeRef::Class(_) => None,
        }
    }

    pub fn lookup_class(&self, name: &str) -> Option<Arc<Class>> {
        match self.lookup(name)? {
            TypeRef::Class(class) => Some(class),
            TypeRef::Record(_) => None,
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        Symbol::lookup(name).is_some_and(|name| self.types.read().contains_key(&name))
    }

    /// Declare a record type and register it in one step.
    pub fn declare_record<C>(
        &self,
        name: &str,
        components: impl IntoIterator<Item = C>,
    ) -> Result<Arc<RecordType>, Condition>
    where
        C: Into<ComponentSpec>,
    {
        if self.contains(name) {
            return Err(Condition::duplicate_type(Symbol::intern(name)));
        }
        let rtd = RecordType::declare(name, components)?;
        self.register(rtd.clone())?;
        Ok(rtd)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<Symbol> {
        let mut names: Vec<_> = self.types.read().keys().copied().collect();
        names.sort_by_key(|name| name.to_str());
        names
    }

    pub fn len(&self) -> usize {
        self.types.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.read().is_empty()
    }
}

static GLOBAL: LazyLock<Registry> = LazyLock::new(Registry::new);

/// The process-wide registry.
pub fn global() -> &'static Registry {
    &GLOBAL
}
